//! Integration tests for the recruiting conversation.
//!
//! This test suite validates:
//! - A query is parsed, fetched, ranked and shown one page at a time
//! - "A" walks the cached ranked pool and "B" ends the search
//! - The contact flow collects three answers and sends one invitation
//! - Idle conversations expire and follow-ups then report expiry
//! - The dispatcher keeps per-conversation order under bounded concurrency
//! - A panicking turn does not affect other turns

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use scout_core::{
    CandidateRecord, ConversationKey, Error, MediaRef, Messenger, QueryCriteria, QueryParser,
    Result,
};
use scout_db::MemoryCandidateStore;
use scout_jobs::render;
use scout_jobs::{
    ConversationConfig, ConversationService, DispatcherConfig, DispatcherEvent, TurnContext,
    TurnDispatcher, TurnHandler, TurnOutcome,
};
use scout_search::{CriteriaExpander, RankingPipeline, ScoringRuleSet};
use scout_session::{ConversationPhase, ConversationStateStore};

const RULES: &str = r#"
scoring_rules:
  initial_candidate_pool_size: 20
  dimensions:
    skills:
      enabled: true
      weight: 10
      logic:
        type: keyword_overlap
        required_value_path: query.criteria.skills
        candidate_value_path: candidate.query_tags.skills_normalized
    location:
      enabled: true
      weight: 1
      logic:
        type: exact_match
        required_value_path: query.criteria.location
        candidate_value_path: candidate.query_tags.location
"#;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Messenger double recording every outbound call.
#[derive(Default)]
struct RecordingMessenger {
    texts: Mutex<Vec<(String, Vec<String>)>>,
    files: Mutex<Vec<String>>,
    external: Mutex<Vec<(String, String, String)>>,
    fail_external: bool,
}

impl RecordingMessenger {
    fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    fn last_text(&self) -> String {
        self.texts().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, content: &str, recipients: &[String]) -> Result<()> {
        self.texts
            .lock()
            .unwrap()
            .push((content.to_string(), recipients.to_vec()));
        Ok(())
    }

    async fn upload_media(&self, path: &str) -> Result<MediaRef> {
        Ok(MediaRef(format!("media-{}", path)))
    }

    async fn send_file(&self, media: &MediaRef, _recipients: &[String]) -> Result<()> {
        self.files.lock().unwrap().push(media.as_str().to_string());
        Ok(())
    }

    async fn send_to_external_contact(
        &self,
        sender_id: &str,
        external_contact_id: &str,
        content: &str,
    ) -> Result<()> {
        if self.fail_external {
            return Err(Error::Messaging("external contact unreachable".into()));
        }
        self.external.lock().unwrap().push((
            sender_id.to_string(),
            external_contact_id.to_string(),
            content.to_string(),
        ));
        Ok(())
    }
}

/// Parser double: any message mentioning 上海 asks for BIM and 结构设计 there.
struct KeywordParser;

#[async_trait]
impl QueryParser for KeywordParser {
    async fn parse(&self, text: &str) -> Result<Option<QueryCriteria>> {
        if !text.contains("上海") {
            return Ok(None);
        }
        Ok(Some(QueryCriteria {
            location: Some("上海".into()),
            skills: BTreeSet::from(["BIM".to_string(), "结构设计".to_string()]),
            ..Default::default()
        }))
    }
}

fn candidate(id: &str, skills: &[&str]) -> CandidateRecord {
    let mut record = CandidateRecord::new(id, format!("候选人{}", id));
    record.query_tags.location = Some("上海".into());
    record.query_tags.skills_normalized = skills.iter().map(|s| s.to_string()).collect();
    record.external_contact_id = Some(format!("wm-{}", id));
    record.resume_path = Some(format!("/resumes/{}.pdf", id));
    record
}

/// Full skill matches b, d, e; half matches a, c.
fn candidates() -> Vec<CandidateRecord> {
    vec![
        candidate("a", &["BIM"]),
        candidate("b", &["BIM", "结构设计"]),
        candidate("c", &["结构设计"]),
        candidate("d", &["结构设计", "BIM"]),
        candidate("e", &["BIM", "结构设计", "Revit"]),
    ]
}

fn state_store() -> Arc<ConversationStateStore> {
    Arc::new(ConversationStateStore::with_limits(
        Duration::from_secs(180),
        64,
    ))
}

fn service_with(
    messenger: Arc<RecordingMessenger>,
    store: Arc<ConversationStateStore>,
) -> ConversationService {
    let rules = ScoringRuleSet::from_yaml_str(RULES).expect("valid rules");
    ConversationService::new(
        ConversationConfig::default()
            .with_authorized(["hr-1", "hr-2"])
            .with_display_limit(2),
        Arc::new(MemoryCandidateStore::with_records(candidates())),
        Arc::new(KeywordParser),
        messenger,
        RankingPipeline::new(store, CriteriaExpander::default()),
    )
    .with_rules(Some(rules))
}

async fn say(service: &ConversationService, text: &str) -> TurnOutcome {
    service.handle(TurnContext::new("hr-1", None, text)).await
}

// ============================================================================
// CONVERSATION FLOW
// ============================================================================

#[tokio::test]
async fn test_query_pages_through_ranked_pool() {
    let messenger = Arc::new(RecordingMessenger::default());
    let store = state_store();
    let service = service_with(messenger.clone(), store.clone());
    let key = ConversationKey::new("hr-1");

    assert_eq!(say(&service, "找上海的结构工程师").await, TurnOutcome::Handled);
    let first = messenger.last_text();
    assert!(first.starts_with("根据您的需求，共找到 5 位候选人，显示第 1 到 2 位："));
    assert!(first.contains("1. 候选人b"));
    assert!(first.contains("2. 候选人d"));
    assert!(first.contains("'A': 查看更多"));
    assert_eq!(store.phase(&key), ConversationPhase::WaitingSelection);

    say(&service, "A").await;
    let second = messenger.last_text();
    assert!(second.contains("显示第 3 到 4 位"));
    assert!(second.contains("3. 候选人e"));
    assert!(second.contains("4. 候选人a"));

    say(&service, "a").await;
    let third = messenger.last_text();
    assert!(third.contains("显示第 5 到 5 位"));
    assert!(third.contains("5. 候选人c"));
    assert!(!third.contains("'A'"));

    say(&service, "A").await;
    assert_eq!(messenger.last_text(), render::REPLY_NO_MORE);
    assert_eq!(store.phase(&key), ConversationPhase::Idle);
}

#[tokio::test]
async fn test_end_command_clears_conversation() {
    let messenger = Arc::new(RecordingMessenger::default());
    let store = state_store();
    let service = service_with(messenger.clone(), store.clone());

    say(&service, "上海").await;
    say(&service, "B").await;
    assert_eq!(messenger.last_text(), render::REPLY_ENDED);
    assert!(store.snapshot(&ConversationKey::new("hr-1")).is_none());

    // The next message is a fresh query again.
    say(&service, "上海").await;
    assert!(messenger.last_text().starts_with("根据您的需求"));
}

#[tokio::test]
async fn test_resume_and_details_use_global_ranks() {
    let messenger = Arc::new(RecordingMessenger::default());
    let service = service_with(messenger.clone(), state_store());

    say(&service, "上海").await;
    say(&service, "A").await;

    say(&service, "简历 3").await;
    assert_eq!(
        messenger.files.lock().unwrap().as_slice(),
        ["media-/resumes/e.pdf".to_string()]
    );
    assert_eq!(messenger.last_text(), render::REPLY_CONTINUE);

    say(&service, "信息 4").await;
    let texts = messenger.texts();
    assert!(texts[texts.len() - 2].contains("姓名: 候选人a"));

    say(&service, "信息 1").await;
    assert_eq!(messenger.last_text(), render::invalid_index(3, 4));

    say(&service, "简历").await;
    assert_eq!(messenger.last_text(), "请使用格式 '简历 X'，例如 '简历 1'。");

    say(&service, "随便说点什么").await;
    assert_eq!(messenger.last_text(), render::REPLY_INVALID_COMMAND);
}

#[tokio::test]
async fn test_contact_flow_sends_one_invitation() {
    let messenger = Arc::new(RecordingMessenger::default());
    let store = state_store();
    let service = service_with(messenger.clone(), store.clone());
    let key = ConversationKey::new("hr-1");

    say(&service, "上海").await;
    say(&service, "联系 1").await;
    assert_eq!(messenger.last_text(), render::ask_work_location("候选人b"));
    assert_eq!(store.phase(&key), ConversationPhase::ContactFlow);

    say(&service, "上海浦东").await;
    assert_eq!(messenger.last_text(), render::ask_job_content("候选人b", "上海浦东"));

    // Commands are answers while the flow is active.
    say(&service, "A").await;
    assert_eq!(messenger.last_text(), render::ask_time_arrangement("A"));

    say(&service, "下周一上午").await;
    assert_eq!(messenger.last_text(), render::REPLY_INVITATION_SENT);
    assert_eq!(store.phase(&key), ConversationPhase::Idle);

    let external = messenger.external.lock().unwrap().clone();
    assert_eq!(external.len(), 1);
    let (sender, handle, text) = &external[0];
    assert_eq!(sender, "hr-1");
    assert_eq!(handle, "wm-b");
    assert_eq!(
        text,
        "您好，候选人b，我们希望在 上海浦东 安排 A 的岗位洽谈，时间定在 下周一上午，请您确认，谢谢！"
    );
}

#[tokio::test]
async fn test_failed_invitation_is_reported_and_cleared() {
    let messenger = Arc::new(RecordingMessenger {
        fail_external: true,
        ..Default::default()
    });
    let store = state_store();
    let service = service_with(messenger.clone(), store.clone());

    for text in ["上海", "联络 2", "上海", "结构复核", "周三"] {
        say(&service, text).await;
    }
    assert_eq!(messenger.last_text(), render::REPLY_INVITATION_FAILED);
    assert_eq!(
        store.phase(&ConversationKey::new("hr-1")),
        ConversationPhase::Idle
    );
}

#[tokio::test]
async fn test_room_replies_go_to_room_and_state_is_per_sender() {
    let messenger = Arc::new(RecordingMessenger::default());
    let store = state_store();
    let service = service_with(messenger.clone(), store.clone());

    service
        .handle(TurnContext::new("hr-1", Some("room-7"), "上海"))
        .await;
    let (_, recipients) = messenger.texts.lock().unwrap().last().cloned().unwrap();
    assert_eq!(recipients, vec!["room-7".to_string()]);

    // Another sender in the same room has no context of their own.
    service
        .handle(TurnContext::new("hr-2", Some("room-7"), "A"))
        .await;
    assert!(messenger.last_text().starts_with("抱歉，我不太理解"));
    assert_eq!(
        store.phase(&ConversationKey::from_parts("hr-1", Some("room-7"))),
        ConversationPhase::WaitingSelection
    );
}

#[tokio::test(start_paused = true)]
async fn test_idle_conversation_expires() {
    let messenger = Arc::new(RecordingMessenger::default());
    let store = state_store();
    let service = service_with(messenger.clone(), store.clone());

    say(&service, "上海").await;
    tokio::time::advance(Duration::from_secs(120)).await;
    say(&service, "信息 1").await;
    assert!(messenger.texts()[1].contains("姓名: 候选人b"));

    // Acting on the page re-committed it, so expiry restarted at t=120s.
    tokio::time::advance(Duration::from_secs(179)).await;
    say(&service, "A").await;
    assert!(messenger.last_text().contains("显示第 3 到 4 位"));

    tokio::time::advance(Duration::from_secs(181)).await;
    say(&service, "A").await;
    assert_eq!(messenger.last_text(), render::REPLY_REPHRASE);
}

// ============================================================================
// DISPATCH
// ============================================================================

/// Handler recording per-key order and the peak number of concurrent turns.
#[derive(Default)]
struct SlowRecorder {
    seen: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl TurnHandler for SlowRecorder {
    async fn handle(&self, ctx: TurnContext) -> TurnOutcome {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.seen
            .lock()
            .unwrap()
            .push((ctx.key.to_string(), ctx.content.clone()));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if ctx.content == "panic" {
            panic!("handler exploded");
        }
        TurnOutcome::Handled
    }
}

async fn wait_for_terminal_events(
    events: &mut tokio::sync::broadcast::Receiver<DispatcherEvent>,
    count: usize,
) -> Vec<DispatcherEvent> {
    let mut terminal = Vec::new();
    while terminal.len() < count {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("dispatcher event")
            .expect("open event channel");
        if matches!(
            event,
            DispatcherEvent::TurnCompleted { .. } | DispatcherEvent::TurnFailed { .. }
        ) {
            terminal.push(event);
        }
    }
    terminal
}

#[tokio::test]
async fn test_dispatcher_orders_turns_per_conversation() {
    let handler = Arc::new(SlowRecorder::default());
    let dispatcher = TurnDispatcher::new(
        DispatcherConfig::default().with_max_concurrent(2),
        handler.clone(),
    );
    let mut events = dispatcher.events();
    let handle = dispatcher.start();

    for i in 0..4 {
        for sender in ["hr-1", "hr-2", "hr-3"] {
            handle
                .submit(TurnContext::new(sender, None, format!("{}", i)))
                .await
                .unwrap();
        }
    }
    wait_for_terminal_events(&mut events, 12).await;
    handle.shutdown().await.unwrap();

    assert!(handler.peak.load(Ordering::SeqCst) <= 2);
    let seen = handler.seen.lock().unwrap().clone();
    for sender in ["hr-1", "hr-2", "hr-3"] {
        let order: Vec<&str> = seen
            .iter()
            .filter(|(key, _)| key == sender)
            .map(|(_, content)| content.as_str())
            .collect();
        assert_eq!(order, ["0", "1", "2", "3"]);
    }
}

#[tokio::test]
async fn test_panicking_turn_is_isolated() {
    let handler = Arc::new(SlowRecorder::default());
    let dispatcher = TurnDispatcher::new(DispatcherConfig::default(), handler.clone());
    let mut events = dispatcher.events();
    let handle = dispatcher.start();

    handle
        .submit(TurnContext::new("hr-1", None, "panic"))
        .await
        .unwrap();
    handle
        .submit(TurnContext::new("hr-1", None, "after"))
        .await
        .unwrap();
    handle
        .submit(TurnContext::new("hr-2", None, "other"))
        .await
        .unwrap();

    let terminal = wait_for_terminal_events(&mut events, 3).await;
    let failed = terminal
        .iter()
        .filter(|e| matches!(e, DispatcherEvent::TurnFailed { .. }))
        .count();
    assert_eq!(failed, 1);
    assert_eq!(handler.seen.lock().unwrap().len(), 3);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dispatched_conversation_sees_its_own_state() {
    let messenger = Arc::new(RecordingMessenger::default());
    let service = Arc::new(service_with(messenger.clone(), state_store()));
    let dispatcher = TurnDispatcher::new(DispatcherConfig::default(), service);
    let mut events = dispatcher.events();
    let handle = dispatcher.start();

    for text in ["上海", "A", "B"] {
        handle
            .submit(TurnContext::new("hr-1", None, text))
            .await
            .unwrap();
    }
    wait_for_terminal_events(&mut events, 3).await;

    let texts = messenger.texts();
    assert_eq!(texts.len(), 3);
    assert!(texts[0].contains("显示第 1 到 2 位"));
    assert!(texts[1].contains("显示第 3 到 4 位"));
    assert_eq!(texts[2], render::REPLY_ENDED);

    handle.shutdown().await.unwrap();
    loop {
        match events.recv().await {
            Ok(DispatcherEvent::DispatcherStopped) => break,
            Ok(_) => continue,
            Err(e) => panic!("event channel closed before stop: {:?}", e),
        }
    }
}
