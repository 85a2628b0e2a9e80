//! Chat reply rendering.

use scout_core::defaults;
use scout_core::{CandidateRecord, ScoredCandidate};
use scout_search::RankedPage;
use scout_session::ContactDetails;

// =============================================================================
// FIXED REPLIES
// =============================================================================

pub const REPLY_REPHRASE: &str = "抱歉，我不太理解您的需求，请换一种方式描述，或者更具体一些。";
pub const REPLY_BE_SPECIFIC: &str =
    "抱歉，根据您的描述无法构建有效的查询条件，请尝试提供更具体的招聘要求。";
pub const REPLY_NO_MATCHES: &str =
    "抱歉，目前没有找到完全符合您条件的候选人。您可以稍后调整条件再试。";
pub const REPLY_RETRY: &str = "抱歉，查询候选人时遇到问题，请稍后再试。";
pub const REPLY_SESSION_EXPIRED: &str = "抱歉，您的操作已超时或状态已丢失，请重新发起查询。";
pub const REPLY_NO_MORE: &str = "根据您之前的查询，没有更多符合条件的候选人了。";
pub const REPLY_ENDED: &str = "好的，已结束本次查询。";
pub const REPLY_INVALID_COMMAND: &str = "无效指令。请回复 '简历 X', '信息 X', '联系 X', 'A', 或 'B'。";
pub const REPLY_CONTINUE: &str =
    "您可以继续回复：'简历 X' 获取简历、'信息 X' 获取详细信息、'联系 X' 联系候选人、'A' 查看更多、'B' 结束。";
pub const REPLY_NO_DETAILS: &str = "暂无详细信息。";
pub const REPLY_RESUME_FAILED: &str = "发送简历时出错。";
pub const REPLY_INVITATION_SENT: &str = "已向候选人发送沟通邀请，流程结束。";
pub const REPLY_INVITATION_FAILED: &str = "发送沟通邀请失败，请稍后重试。";

pub fn invalid_index(first: usize, last: usize) -> String {
    format!("无效的序号。请输入 {} 到 {} 之间的数字。", first, last)
}

pub fn resume_unavailable(rank: usize) -> String {
    format!("抱歉，无法获取第{}位候选人的简历。", rank)
}

pub fn contact_unavailable(rank: usize) -> String {
    format!(
        "抱歉，无法获取第 {} 位候选人的外部联系ID或姓名，无法发起联系。",
        rank
    )
}

// =============================================================================
// CONTACT FLOW
// =============================================================================

pub fn ask_work_location(name: &str) -> String {
    format!("请提供候选人 [{}] 的工作地点：", name)
}

pub fn ask_job_content(name: &str, work_location: &str) -> String {
    format!(
        "已记录工作地点：{}。请提供候选人 [{}] 的工作内容：",
        work_location, name
    )
}

pub fn ask_time_arrangement(job_content: &str) -> String {
    format!("已记录工作内容：{}。请提供您希望的沟通时间：", job_content)
}

/// Invitation sent to the candidate once all three answers are in.
pub fn invitation(name: &str, details: &ContactDetails) -> String {
    format!(
        "您好，{}，我们希望在 {} 安排 {} 的岗位洽谈，时间定在 {}，请您确认，谢谢！",
        name,
        details.work_location.as_deref().unwrap_or_default(),
        details.job_content.as_deref().unwrap_or_default(),
        details.time_arrangement.as_deref().unwrap_or_default(),
    )
}

// =============================================================================
// RESULT PAGES
// =============================================================================

fn display_name(candidate: &ScoredCandidate, rank: usize) -> String {
    candidate
        .record
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("候选人{}", rank))
}

/// Ranked page with a comparison summary and the option list.
pub fn page(page: &RankedPage) -> String {
    let first = page.offset + 1;
    let last = page.offset + page.page.len();
    let mut lines = vec![format!(
        "根据您的需求，共找到 {} 位候选人，显示第 {} 到 {} 位：",
        page.total, first, last
    )];

    for (i, candidate) in page.page.iter().enumerate() {
        let rank = first + i;
        let score = candidate
            .score
            .map(|s| format!(" (匹配度: {:.1})", s))
            .unwrap_or_default();
        lines.push(format!("{}. {}{}", rank, display_name(candidate, rank), score));
    }

    lines.push("**对比分析摘要：**".to_string());
    for (i, candidate) in page.page.iter().enumerate() {
        let rank = first + i;
        let tags = &candidate.record.query_tags;
        let experience = tags
            .min_experience_years
            .map_or_else(|| "经验未知".to_string(), |y| format!("{}年经验", y));
        let certs = candidate.record.effective_certifications();
        let certs = if certs.is_empty() {
            "无职称信息".to_string()
        } else {
            certs.join("、")
        };
        lines.push(format!(
            "{}. **{}**：{}，**{}**。",
            rank,
            display_name(candidate, rank),
            experience,
            certs
        ));
    }

    lines.push(String::new());
    lines.push("您可以回复：".to_string());
    lines.push("  - '简历 X': 获取第X位候选人的简历".to_string());
    lines.push("  - '信息 X': 获取第X位候选人的详细信息".to_string());
    lines.push("  - '联系 X': 联系第X位候选人".to_string());
    if page.has_more {
        lines.push("  - 'A': 查看更多".to_string());
    }
    lines.push("  - 'B': 都不满意/结束".to_string());
    lines.join("\n")
}

// =============================================================================
// CANDIDATE DETAILS
// =============================================================================

fn excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

fn span(start: Option<&str>, end: Option<&str>) -> Option<String> {
    match (start, end) {
        (None, None) => None,
        (start, end) => Some(format!(
            "{} - {}",
            start.unwrap_or("?"),
            end.unwrap_or("至今")
        )),
    }
}

fn join_present(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Detail reply for one candidate.
pub fn details(record: &CandidateRecord) -> String {
    let info = &record.extracted_info;
    let mut lines = Vec::new();

    if let Some(name) = record.name.as_deref().filter(|n| !n.trim().is_empty()) {
        lines.push(format!("姓名: {}", name));
    }
    if let Some(location) = record.effective_location() {
        lines.push(format!("所在地: {}", location));
    }
    if let Some(years) = record.query_tags.min_experience_years {
        lines.push(format!("工作年限: {}年", years));
    }
    let certs = record.effective_certifications();
    if !certs.is_empty() {
        lines.push(format!("证书/职称: {}", certs.join("、")));
    }
    if !info.skills.is_empty() {
        lines.push(format!("技能: {}", info.skills.join("、")));
    }

    if !info.experience.is_empty() {
        lines.push("工作经历:".to_string());
        for exp in &info.experience {
            let period = span(exp.start_date.as_deref(), exp.end_date.as_deref());
            lines.push(format!(
                "  - {}",
                join_present(&[period.as_deref(), exp.company.as_deref(), exp.title.as_deref()])
            ));
        }
    }

    if !info.education.is_empty() {
        lines.push("教育经历:".to_string());
        for edu in &info.education {
            let period = span(edu.start_date.as_deref(), edu.end_date.as_deref());
            lines.push(format!(
                "  - {}",
                join_present(&[
                    period.as_deref(),
                    edu.school.as_deref(),
                    edu.degree.as_deref(),
                    edu.major.as_deref(),
                ])
            ));
        }
    }

    if let Some(summary) = info.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        lines.push(format!(
            "简介: {}",
            excerpt(summary, defaults::SUMMARY_EXCERPT_CHARS)
        ));
    }

    if lines.is_empty() {
        REPLY_NO_DETAILS.to_string()
    } else {
        lines.join("\n")
    }
}
