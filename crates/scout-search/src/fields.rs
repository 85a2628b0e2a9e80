//! Typed accessors for scoring inputs.
//!
//! Rule documents name inputs with dot paths such as
//! `query.criteria.experience_years_min` or
//! `candidate.query_tags.skills_normalized`. Paths are resolved to these
//! enums once, when a rule set is loaded; scoring never walks paths.

use scout_core::CandidateRecord;

use crate::criteria::ResolvedCriteria;

/// A value read from criteria or a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Absent,
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    fn text(value: Option<&str>) -> Self {
        match value.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Self::Text(s.to_string()),
            None => Self::Absent,
        }
    }

    fn number(value: Option<u32>) -> Self {
        value.map_or(Self::Absent, |n| Self::Number(f64::from(n)))
    }

    fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::List(_) => "list",
        }
    }
}

/// Input read from the query side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    Position,
    ExperienceYearsMin,
    ExperienceYearsMax,
    Skills,
    Location,
    EducationLevels,
    /// Resolver-expanded certificate variants.
    Certifications,
    PreviousCompanies,
    DesignCategory,
}

impl RequiredField {
    /// Resolve `query.criteria.<field>` (prefix optional).
    pub fn from_path(path: &str) -> Option<Self> {
        let field = path.trim();
        let field = field.strip_prefix("query.criteria.").unwrap_or(field);
        Some(match field {
            "position" => Self::Position,
            "experience_years_min" => Self::ExperienceYearsMin,
            "experience_years_max" => Self::ExperienceYearsMax,
            "skills" => Self::Skills,
            "location" => Self::Location,
            "education_levels" => Self::EducationLevels,
            "certifications" => Self::Certifications,
            "previous_companies" => Self::PreviousCompanies,
            "design_category" => Self::DesignCategory,
            _ => return None,
        })
    }

    pub fn read(&self, resolved: &ResolvedCriteria) -> FieldValue {
        let c = &resolved.criteria;
        match self {
            Self::Position => FieldValue::text(c.position.as_deref()),
            Self::ExperienceYearsMin => FieldValue::number(c.experience_years_min),
            Self::ExperienceYearsMax => FieldValue::number(c.experience_years_max),
            Self::Skills => FieldValue::list(c.skills.iter().cloned()),
            Self::Location => FieldValue::text(c.location.as_deref()),
            Self::EducationLevels => FieldValue::list(c.education_levels.iter().cloned()),
            Self::Certifications => {
                FieldValue::list(resolved.certificate_variants.iter().cloned())
            }
            Self::PreviousCompanies => FieldValue::list(c.previous_companies.iter().cloned()),
            Self::DesignCategory => FieldValue::text(c.design_category.as_deref()),
        }
    }
}

/// Input read from a candidate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateField {
    Positions,
    MinExperienceYears,
    /// Normalized skills, falling back to extracted skills.
    Skills,
    /// Location tag, falling back to the extracted current location.
    Location,
    /// Certificate tags, falling back to extracted certificates.
    Certifications,
    Schools,
    Degrees,
    DesignCategory,
    ExtractedSkills,
    CurrentLocation,
    ExtractedCertifications,
    PreviousCompanies,
}

impl CandidateField {
    /// Resolve `candidate.<section>.<field>` (the `candidate.` prefix is optional).
    pub fn from_path(path: &str) -> Option<Self> {
        let field = path.trim();
        let field = field.strip_prefix("candidate.").unwrap_or(field);
        Some(match field {
            "query_tags.positions" => Self::Positions,
            "query_tags.min_experience_years" => Self::MinExperienceYears,
            "query_tags.skills_normalized" => Self::Skills,
            "query_tags.location" => Self::Location,
            "query_tags.certifications" => Self::Certifications,
            "query_tags.schools" => Self::Schools,
            "query_tags.degrees" => Self::Degrees,
            "query_tags.design_category" => Self::DesignCategory,
            "extracted_info.skills" => Self::ExtractedSkills,
            "extracted_info.current_location" => Self::CurrentLocation,
            "extracted_info.certifications" => Self::ExtractedCertifications,
            "extracted_info.experience.company" => Self::PreviousCompanies,
            _ => return None,
        })
    }

    pub fn read(&self, record: &CandidateRecord) -> FieldValue {
        let tags = &record.query_tags;
        let info = &record.extracted_info;
        match self {
            Self::Positions => FieldValue::list(tags.positions.iter().cloned()),
            Self::MinExperienceYears => FieldValue::number(tags.min_experience_years),
            Self::Skills => FieldValue::list(record.effective_skills()),
            Self::Location => FieldValue::text(record.effective_location()),
            Self::Certifications => FieldValue::list(record.effective_certifications()),
            Self::Schools => FieldValue::list(tags.schools.iter().cloned()),
            Self::Degrees => FieldValue::list(tags.degrees.iter().cloned()),
            Self::DesignCategory => FieldValue::text(tags.design_category.as_deref()),
            Self::ExtractedSkills => FieldValue::list(info.skills.iter().cloned()),
            Self::CurrentLocation => FieldValue::text(info.current_location.as_deref()),
            Self::ExtractedCertifications => {
                FieldValue::list(info.certifications.iter().map(|c| c.full_name()))
            }
            Self::PreviousCompanies => FieldValue::list(record.previous_companies()),
        }
    }
}
