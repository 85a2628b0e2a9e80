//! Data models: query criteria, candidate records, and ranked projections.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Schema version written into every candidate record produced by this crate.
pub const CANDIDATE_SCHEMA_VERSION: u32 = 1;

// =============================================================================
// QUERY CRITERIA
// =============================================================================

/// Comparison applied between a required level and candidate levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelModifier {
    /// Exactly the named level.
    #[default]
    Eq,
    /// The named level or higher.
    Ge,
    /// Strictly higher than the named level.
    Gt,
}

impl LevelModifier {
    /// Parse leniently: anything other than `ge`/`gt` means `eq`.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ge => "ge",
            Self::Gt => "gt",
        }
    }
}

impl FromStr for LevelModifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eq" => Ok(Self::Eq),
            "ge" => Ok(Self::Ge),
            "gt" => Ok(Self::Gt),
            other => Err(format!("unknown level modifier: {}", other)),
        }
    }
}

impl fmt::Display for LevelModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LevelModifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse_lenient).unwrap_or_default())
    }
}

/// One certificate or professional-title requirement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CertificationRequirement {
    /// Profession or certificate base, e.g. "工程师". May be empty or the
    /// generic placeholder "职称" when only a level is demanded.
    #[serde(alias = "name", default)]
    pub base_name: String,
    #[serde(default)]
    pub level_keyword: Option<String>,
    #[serde(default)]
    pub modifier: LevelModifier,
}

impl CertificationRequirement {
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level_keyword: impl Into<String>, modifier: LevelModifier) -> Self {
        self.level_keyword = Some(level_keyword.into());
        self.modifier = modifier;
        self
    }

    /// Level keyword followed by base name, e.g. "中级" + "工程师".
    pub fn full_name(&self) -> String {
        match &self.level_keyword {
            Some(level) => format!("{}{}", level, self.base_name),
            None => self.base_name.clone(),
        }
    }
}

/// Structured search request produced by the query parser.
///
/// Immutable once parsed for a turn; reused across pagination.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryCriteria {
    pub position: Option<String>,
    pub experience_years_min: Option<u32>,
    pub experience_years_max: Option<u32>,
    pub skills: BTreeSet<String>,
    pub location: Option<String>,
    pub education_levels: BTreeSet<String>,
    pub certifications: Vec<CertificationRequirement>,
    pub previous_companies: BTreeSet<String>,
    pub design_category: Option<String>,
}

impl QueryCriteria {
    /// True when no field carries a requirement.
    pub fn is_empty(&self) -> bool {
        fn blank(v: &Option<String>) -> bool {
            v.as_deref().map_or(true, |s| s.trim().is_empty())
        }
        blank(&self.position)
            && self.experience_years_min.is_none()
            && self.experience_years_max.is_none()
            && self.skills.is_empty()
            && blank(&self.location)
            && self.education_levels.is_empty()
            && self.certifications.is_empty()
            && self.previous_companies.is_empty()
            && blank(&self.design_category)
    }
}

// =============================================================================
// CANDIDATE RECORD
// =============================================================================

/// One work-history entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub company: Option<String>,
    pub title: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

/// One education entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub school: Option<String>,
    pub degree: Option<String>,
    pub major: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// A certificate held by a candidate, split into base name and level.
///
/// Legacy records storing a bare string deserialize as a base name with no
/// level keyword.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "CertificateEntryRepr")]
pub struct CertificateEntry {
    pub base_name: String,
    pub level_keyword: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CertificateEntryRepr {
    Plain(String),
    Tagged {
        #[serde(alias = "name")]
        base_name: String,
        #[serde(default)]
        level_keyword: Option<String>,
    },
}

impl From<CertificateEntryRepr> for CertificateEntry {
    fn from(repr: CertificateEntryRepr) -> Self {
        match repr {
            CertificateEntryRepr::Plain(base_name) => Self {
                base_name,
                level_keyword: None,
            },
            CertificateEntryRepr::Tagged {
                base_name,
                level_keyword,
            } => Self {
                base_name,
                level_keyword,
            },
        }
    }
}

impl CertificateEntry {
    pub fn new(base_name: impl Into<String>, level_keyword: Option<&str>) -> Self {
        Self {
            base_name: base_name.into(),
            level_keyword: level_keyword.map(str::to_string),
        }
    }

    /// Level keyword followed by base name, skipping a level already present.
    pub fn full_name(&self) -> String {
        match &self.level_keyword {
            Some(level) if !self.base_name.starts_with(level.as_str()) => {
                format!("{}{}", level, self.base_name)
            }
            _ => self.base_name.clone(),
        }
    }
}

/// Authoritative information extracted from a resume.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedInfo {
    pub summary: Option<String>,
    pub current_location: Option<String>,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub skills: Vec<String>,
    pub certifications: Vec<CertificateEntry>,
}

/// Normalized tags derived from [`ExtractedInfo`] for retrieval and scoring.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryTags {
    pub positions: Vec<String>,
    pub min_experience_years: Option<u32>,
    pub skills_normalized: Vec<String>,
    pub location: Option<String>,
    pub certifications: Vec<String>,
    pub schools: Vec<String>,
    pub degrees: Vec<String>,
    pub design_category: Option<String>,
}

/// A candidate as stored in the candidate store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(alias = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub wxid: Option<String>,
    #[serde(alias = "external_wecom_id", default)]
    pub external_contact_id: Option<String>,
    #[serde(alias = "resume_pdf_path", default)]
    pub resume_path: Option<String>,
    #[serde(default)]
    pub source_file_original_name: Option<String>,
    #[serde(default)]
    pub extracted_info: ExtractedInfo,
    #[serde(default)]
    pub query_tags: QueryTags,
    #[serde(default)]
    pub last_processed_time: Option<DateTime<Utc>>,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

fn default_schema_version() -> u32 {
    CANDIDATE_SCHEMA_VERSION
}

impl CandidateRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            phone: None,
            email: None,
            wxid: None,
            external_contact_id: None,
            resume_path: None,
            source_file_original_name: None,
            extracted_info: ExtractedInfo::default(),
            query_tags: QueryTags::default(),
            last_processed_time: None,
            schema_version: CANDIDATE_SCHEMA_VERSION,
        }
    }

    /// Normalized skills, falling back to lower-cased extracted skills.
    pub fn effective_skills(&self) -> Vec<String> {
        if !self.query_tags.skills_normalized.is_empty() {
            return self.query_tags.skills_normalized.clone();
        }
        self.extracted_info
            .skills
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Certificate names, falling back to composed extracted certificates.
    pub fn effective_certifications(&self) -> Vec<String> {
        if !self.query_tags.certifications.is_empty() {
            return self.query_tags.certifications.clone();
        }
        self.extracted_info
            .certifications
            .iter()
            .map(CertificateEntry::full_name)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Location tag, falling back to the extracted current location.
    pub fn effective_location(&self) -> Option<&str> {
        self.query_tags
            .location
            .as_deref()
            .or(self.extracted_info.current_location.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// Companies from the work history, in resume order.
    pub fn previous_companies(&self) -> Vec<String> {
        self.extracted_info
            .experience
            .iter()
            .filter_map(|e| e.company.clone())
            .filter(|c| !c.trim().is_empty())
            .collect()
    }

    /// External contact id the invitation is sent to. A wxid is not a
    /// valid external-contact target and is never used here.
    pub fn contact_handle(&self) -> Option<&str> {
        self.external_contact_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// =============================================================================
// RANKED PROJECTIONS
// =============================================================================

/// A pool member with its aggregate score (`None` when ranked unscored).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub record: CandidateRecord,
    pub score: Option<f64>,
}

impl ScoredCandidate {
    pub fn unscored(record: CandidateRecord) -> Self {
        Self {
            record,
            score: None,
        }
    }

    /// Lightweight projection at a 1-based display rank.
    pub fn summarize(&self, rank: usize) -> CandidateSummary {
        CandidateSummary {
            rank,
            candidate_id: self.record.id.clone(),
            name: self.record.name.clone(),
            contact_handle: self.record.contact_handle().map(str::to_string),
            resume_path: self.record.resume_path.clone(),
            score: self.score,
        }
    }
}

/// Cached page entry: just enough to act on a follow-up command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    /// 1-based rank across the whole ranked pool.
    pub rank: usize,
    pub candidate_id: String,
    pub name: Option<String>,
    pub contact_handle: Option<String>,
    pub resume_path: Option<String>,
    pub score: Option<f64>,
}

// =============================================================================
// CONVERSATION KEY
// =============================================================================

/// Identity scoping one user's (or user-in-room's) conversation state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationKey(String);

impl ConversationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for a sender, scoped by room when the message came from one.
    pub fn from_parts(sender_id: &str, room_id: Option<&str>) -> Self {
        match room_id.filter(|r| !r.is_empty()) {
            Some(room) => Self(format!("{}:{}", room, sender_id)),
            None => Self(sender_id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
