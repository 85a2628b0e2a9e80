//! Recruiting conversation: new queries, follow-up commands, contact flow.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use scout_core::{
    CandidateRecord, CandidateStore, CandidateSummary, Messenger, QueryParser, Result,
};
use scout_search::{RankingPipeline, ScoringRuleSet};
use scout_session::{
    ContactAnswer, ContactFlowState, ContactStep, ContactTarget, ConversationPhase,
    ConversationStateStore, PageCommit,
};

use crate::commands::{FollowUpCommand, ParsedReply};
use crate::config::ConversationConfig;
use crate::handler::{TurnContext, TurnHandler, TurnOutcome};
use crate::render;

/// Turn handler driving the recruiting assistant.
///
/// One instance serves every conversation; per-conversation context lives
/// in the pipeline's [`ConversationStateStore`].
pub struct ConversationService {
    config: ConversationConfig,
    candidates: Arc<dyn CandidateStore>,
    parser: Arc<dyn QueryParser>,
    messenger: Arc<dyn Messenger>,
    pipeline: RankingPipeline,
    rules: Option<Arc<ScoringRuleSet>>,
}

impl ConversationService {
    /// Create the service, loading scoring rules from
    /// `config.scoring_rules_path` when set.
    pub fn new(
        config: ConversationConfig,
        candidates: Arc<dyn CandidateStore>,
        parser: Arc<dyn QueryParser>,
        messenger: Arc<dyn Messenger>,
        pipeline: RankingPipeline,
    ) -> Self {
        let rules = config
            .scoring_rules_path
            .as_ref()
            .and_then(ScoringRuleSet::load_or_warn)
            .map(Arc::new);
        Self {
            config,
            candidates,
            parser,
            messenger,
            pipeline,
            rules,
        }
    }

    /// Replace the scoring rules. `None` ranks unscored.
    pub fn with_rules(mut self, rules: Option<ScoringRuleSet>) -> Self {
        self.rules = rules.map(Arc::new);
        self
    }

    pub fn rules(&self) -> Option<&ScoringRuleSet> {
        self.rules.as_deref()
    }

    fn states(&self) -> &ConversationStateStore {
        self.pipeline.store()
    }

    async fn reply(&self, ctx: &TurnContext, text: &str) -> Result<()> {
        self.messenger.send_text(text, &ctx.reply_to()).await
    }

    /// Reply, then drop the conversation back to idle.
    async fn reply_and_clear(&self, ctx: &TurnContext, text: &str) -> Result<TurnOutcome> {
        self.states().clear(&ctx.key);
        self.reply(ctx, text).await?;
        Ok(TurnOutcome::Handled)
    }

    // =========================================================================
    // NEW QUERY
    // =========================================================================

    async fn new_query(&self, ctx: &TurnContext, text: &str) -> Result<TurnOutcome> {
        let criteria = match self.parser.parse(text).await {
            Ok(Some(criteria)) if !criteria.is_empty() => criteria,
            Ok(_) => {
                debug!(turn_id = %ctx.turn_id, "No recruiting intent in message");
                return self.reply_and_clear(ctx, render::REPLY_REPHRASE).await;
            }
            Err(e) => {
                warn!(turn_id = %ctx.turn_id, error = %e, "Query parsing failed");
                return self.reply_and_clear(ctx, render::REPLY_REPHRASE).await;
            }
        };

        let resolved = self.pipeline.resolve(&criteria);
        let filter = resolved.to_filter();
        if filter.is_empty() {
            return self.reply_and_clear(ctx, render::REPLY_BE_SPECIFIC).await;
        }
        self.pipeline.expander().unrecognized_certifications(&criteria);

        let pool_size = self
            .rules
            .as_ref()
            .map_or(self.config.initial_pool_size, |r| r.initial_pool_size);
        let pool = match self.candidates.find(&filter, pool_size, 0).await {
            Ok(pool) => pool,
            Err(e) => {
                error!(
                    turn_id = %ctx.turn_id,
                    conversation_key = %ctx.key,
                    error = %e,
                    "Candidate query failed"
                );
                self.states().clear(&ctx.key);
                if let Err(reply_err) = self.reply(ctx, render::REPLY_RETRY).await {
                    warn!(error = %reply_err, "Failed to send retry notice");
                }
                return Ok(TurnOutcome::Failed(e.to_string()));
            }
        };
        if pool.is_empty() {
            info!(
                conversation_key = %ctx.key,
                clause_count = filter.len(),
                "No candidates matched"
            );
            return self.reply_and_clear(ctx, render::REPLY_NO_MATCHES).await;
        }

        let page = self.pipeline.rank_and_commit(
            &ctx.key,
            &criteria,
            filter,
            pool,
            self.config.display_limit,
            self.rules.as_deref(),
        );
        self.reply(ctx, &render::page(&page)).await?;
        Ok(TurnOutcome::Handled)
    }

    // =========================================================================
    // FOLLOW-UP COMMANDS
    // =========================================================================

    async fn follow_up(&self, ctx: &TurnContext, text: &str) -> Result<TurnOutcome> {
        let Some(results) = self.states().last_results(&ctx.key) else {
            return self.reply_and_clear(ctx, render::REPLY_SESSION_EXPIRED).await;
        };

        let command = match FollowUpCommand::parse(text) {
            ParsedReply::Command(command) => command,
            ParsedReply::Malformed(verb) => {
                self.reply(ctx, verb.usage()).await?;
                return Ok(TurnOutcome::Handled);
            }
            ParsedReply::Unknown => {
                self.reply(ctx, render::REPLY_INVALID_COMMAND).await?;
                return Ok(TurnOutcome::Handled);
            }
        };
        debug!(conversation_key = %ctx.key, ?command, "Follow-up command");

        match command {
            FollowUpCommand::Resume(n) => match select(&results, n) {
                Some(summary) => self.send_resume(ctx, summary, &results).await,
                None => self.reject_index(ctx, &results).await,
            },
            FollowUpCommand::Details(n) => match select(&results, n) {
                Some(summary) => self.send_details(ctx, summary, &results).await,
                None => self.reject_index(ctx, &results).await,
            },
            FollowUpCommand::Contact(n) => match select(&results, n) {
                Some(summary) => self.start_contact(ctx, summary).await,
                None => self.reject_index(ctx, &results).await,
            },
            FollowUpCommand::NextPage => self.show_next_page(ctx).await,
            FollowUpCommand::End => self.reply_and_clear(ctx, render::REPLY_ENDED).await,
        }
    }

    async fn reject_index(
        &self,
        ctx: &TurnContext,
        results: &[CandidateSummary],
    ) -> Result<TurnOutcome> {
        let first = results.first().map_or(1, |s| s.rank);
        let last = results.last().map_or(first, |s| s.rank);
        self.reply(ctx, &render::invalid_index(first, last)).await?;
        Ok(TurnOutcome::Handled)
    }

    /// Re-commit the shown page so the conversation's expiry restarts.
    fn keep_alive(&self, ctx: &TurnContext, results: &[CandidateSummary]) {
        let has_more = self.states().has_more(&ctx.key);
        self.states().commit_page(
            &ctx.key,
            PageCommit::new(ConversationPhase::WaitingSelection)
                .with_results(results.to_vec())
                .with_has_more(has_more),
        );
    }

    async fn send_resume(
        &self,
        ctx: &TurnContext,
        summary: &CandidateSummary,
        results: &[CandidateSummary],
    ) -> Result<TurnOutcome> {
        let Some(path) = summary.resume_path.as_deref().filter(|p| !p.trim().is_empty()) else {
            self.reply(ctx, &render::resume_unavailable(summary.rank)).await?;
            return Ok(TurnOutcome::Handled);
        };

        let sent = match self.messenger.upload_media(path).await {
            Ok(media) => self.messenger.send_file(&media, &ctx.reply_to()).await,
            Err(e) => Err(e),
        };
        match sent {
            Ok(()) => {
                info!(candidate_id = %summary.candidate_id, "Resume sent");
                self.keep_alive(ctx, results);
                self.reply(ctx, render::REPLY_CONTINUE).await?;
            }
            Err(e) => {
                warn!(candidate_id = %summary.candidate_id, error = %e, "Resume delivery failed");
                self.keep_alive(ctx, results);
                self.reply(ctx, render::REPLY_RESUME_FAILED).await?;
            }
        }
        Ok(TurnOutcome::Handled)
    }

    async fn send_details(
        &self,
        ctx: &TurnContext,
        summary: &CandidateSummary,
        results: &[CandidateSummary],
    ) -> Result<TurnOutcome> {
        let record = match self.candidates.find_by_id(&summary.candidate_id).await {
            Ok(Some(record)) => Some(record),
            Ok(None) => self.cached_record(ctx, &summary.candidate_id),
            Err(e) => {
                warn!(
                    candidate_id = %summary.candidate_id,
                    error = %e,
                    "Detail lookup failed, using cached record"
                );
                self.cached_record(ctx, &summary.candidate_id)
            }
        };

        let text = record.as_ref().map_or_else(
            || render::REPLY_NO_DETAILS.to_string(),
            render::details,
        );
        self.keep_alive(ctx, results);
        self.reply(ctx, &text).await?;
        self.reply(ctx, render::REPLY_CONTINUE).await?;
        Ok(TurnOutcome::Handled)
    }

    fn cached_record(&self, ctx: &TurnContext, candidate_id: &str) -> Option<CandidateRecord> {
        self.states()
            .ranked_pool(&ctx.key)?
            .iter()
            .find(|c| c.record.id == candidate_id)
            .map(|c| c.record.clone())
    }

    async fn start_contact(
        &self,
        ctx: &TurnContext,
        summary: &CandidateSummary,
    ) -> Result<TurnOutcome> {
        let name = summary.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let handle = summary
            .contact_handle
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty());
        let (Some(name), Some(handle)) = (name, handle) else {
            self.reply(ctx, &render::contact_unavailable(summary.rank)).await?;
            return Ok(TurnOutcome::Handled);
        };

        self.states().enter_contact_flow(
            &ctx.key,
            ContactStep::AwaitingWorkLocation,
            ContactTarget {
                candidate_id: summary.candidate_id.clone(),
                candidate_name: name.to_string(),
                contact_handle: handle.to_string(),
            },
            None,
        );
        self.reply(ctx, &render::ask_work_location(name)).await?;
        Ok(TurnOutcome::Handled)
    }

    async fn show_next_page(&self, ctx: &TurnContext) -> Result<TurnOutcome> {
        if !self.states().has_more(&ctx.key) {
            return self.reply_and_clear(ctx, render::REPLY_NO_MORE).await;
        }
        match self.pipeline.next_page(&ctx.key, self.config.display_limit) {
            None => self.reply_and_clear(ctx, render::REPLY_SESSION_EXPIRED).await,
            Some(page) if page.is_empty() => self.reply_and_clear(ctx, render::REPLY_NO_MORE).await,
            Some(page) => {
                self.reply(ctx, &render::page(&page)).await?;
                Ok(TurnOutcome::Handled)
            }
        }
    }

    // =========================================================================
    // CONTACT FLOW
    // =========================================================================

    async fn contact_step(&self, ctx: &TurnContext, text: &str) -> Result<TurnOutcome> {
        let Some(flow) = self.states().contact_flow(&ctx.key) else {
            return self.reply_and_clear(ctx, render::REPLY_SESSION_EXPIRED).await;
        };
        let answer = ContactAnswer::new(flow.step.field(), text);

        let Some(next) = flow.step.next() else {
            return self.send_invitation(ctx, flow, answer).await;
        };
        if !self.states().advance_contact_flow(&ctx.key, next, Some(answer)) {
            return self.reply_and_clear(ctx, render::REPLY_SESSION_EXPIRED).await;
        }

        let prompt = match next {
            ContactStep::AwaitingJobContent => {
                render::ask_job_content(&flow.target.candidate_name, text)
            }
            ContactStep::AwaitingTimeArrangement => render::ask_time_arrangement(text),
            ContactStep::AwaitingWorkLocation => {
                render::ask_work_location(&flow.target.candidate_name)
            }
        };
        debug!(conversation_key = %ctx.key, contact_step = next.as_str(), "Contact answer recorded");
        self.reply(ctx, &prompt).await?;
        Ok(TurnOutcome::Handled)
    }

    async fn send_invitation(
        &self,
        ctx: &TurnContext,
        flow: ContactFlowState,
        answer: ContactAnswer,
    ) -> Result<TurnOutcome> {
        let mut details = flow.collected;
        details.set(answer.field, answer.value);
        let invitation = render::invitation(&flow.target.candidate_name, &details);

        let reply = match self
            .messenger
            .send_to_external_contact(&ctx.sender_id, &flow.target.contact_handle, &invitation)
            .await
        {
            Ok(()) => {
                info!(
                    conversation_key = %ctx.key,
                    candidate_id = %flow.target.candidate_id,
                    "Contact invitation sent"
                );
                render::REPLY_INVITATION_SENT
            }
            Err(e) => {
                warn!(
                    conversation_key = %ctx.key,
                    candidate_id = %flow.target.candidate_id,
                    error = %e,
                    "Contact invitation failed"
                );
                render::REPLY_INVITATION_FAILED
            }
        };
        self.reply_and_clear(ctx, reply).await
    }
}

/// Entry of the shown page at global rank `n`.
fn select(results: &[CandidateSummary], n: usize) -> Option<&CandidateSummary> {
    results.iter().find(|s| s.rank == n)
}

#[async_trait]
impl TurnHandler for ConversationService {
    async fn handle(&self, ctx: TurnContext) -> TurnOutcome {
        if !self.config.is_authorized(&ctx.sender_id) {
            debug!(sender_id = %ctx.sender_id, "Ignoring unauthorized sender");
            return TurnOutcome::Ignored("sender not authorized".into());
        }
        let text = ctx.content.trim();
        if text.is_empty() {
            return TurnOutcome::Ignored("empty message".into());
        }

        let phase = self.states().phase(&ctx.key);
        debug!(turn_id = %ctx.turn_id, conversation_key = %ctx.key, %phase, "Handling turn");

        let result = match phase {
            ConversationPhase::Idle => self.new_query(&ctx, text).await,
            ConversationPhase::WaitingSelection => self.follow_up(&ctx, text).await,
            ConversationPhase::ContactFlow => self.contact_step(&ctx, text).await,
        };
        result.unwrap_or_else(|e| {
            error!(
                turn_id = %ctx.turn_id,
                conversation_key = %ctx.key,
                error = %e,
                "Turn processing failed"
            );
            TurnOutcome::Failed(e.to_string())
        })
    }
}
