//! Certificate and professional-title level resolution.
//!
//! Expands a requirement such as "中级 + 工程师, or higher" into every
//! textual variant a candidate record may carry that satisfies it.
//!
//! # Resolution order
//!
//! 1. Compose `full = level_keyword + base_name`.
//! 2. If `full` appears in a profession-specific rank table, select that
//!    table's variants by ordinal (`ge`, `gt`, otherwise equality).
//! 3. Else if the level keyword belongs to a generic system, select the
//!    system's keywords by index and compose them with the base name;
//!    registrable professions also get the `注册` variants.
//! 4. Else pass `full` through unchanged.
//!
//! An empty selection always falls back to `{full}`; resolution never fails.
//!
//! # Tier ordering
//!
//! The generic numeric system orders 一级 < 二级 < 三级, and the
//! 注册建造师 table likewise gives 一级 the lower ordinal, although in
//! practice a first-class registration outranks a second-class one. The
//! tables are kept exactly as authored so existing rule sets keep matching
//! the same candidates.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use scout_core::LevelModifier;

/// Placeholder base name meaning "any professional title".
pub const GENERIC_TITLE: &str = "职称";

/// Generic ordered keyword system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSystem {
    /// 助理 < 中级 < 高级
    Qualitative,
    /// 一级 < 二级 < 三级
    NumericTier,
}

/// Position of a level keyword within its system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub system: LevelSystem,
    pub index: usize,
}

/// Ranked variants of one profession; equal ordinals are synonyms.
#[derive(Debug, Clone)]
struct RankTable {
    profession: String,
    variants: Vec<(String, u8)>,
}

impl RankTable {
    fn ordinal_of(&self, name: &str) -> Option<u8> {
        self.variants
            .iter()
            .find(|(variant, _)| variant == name)
            .map(|(_, ordinal)| *ordinal)
    }
}

/// Resolves level requirements to satisfying certificate names.
#[derive(Debug, Clone)]
pub struct LevelResolver {
    tables: Vec<RankTable>,
    qualitative: Vec<String>,
    numeric: Vec<String>,
    aliases: Vec<(String, LevelInfo)>,
    registrable: Vec<String>,
}

impl Default for LevelResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LevelResolver {
    /// Resolver with no tables or systems; every lookup passes through.
    pub fn empty() -> Self {
        Self {
            tables: Vec::new(),
            qualitative: Vec::new(),
            numeric: Vec::new(),
            aliases: Vec::new(),
            registrable: Vec::new(),
        }
    }

    /// Built-in tables for architects, registered constructors and engineers.
    pub fn builtin() -> Self {
        Self::empty()
            .with_rank_table(
                "建筑师",
                &[
                    ("助理建筑师", 1),
                    ("中级建筑师", 2),
                    ("高级建筑师", 3),
                    ("教授级高级建筑师", 4),
                ],
            )
            .with_rank_table(
                "注册建造师",
                &[
                    ("一级注册建造师", 1),
                    ("一级建造师", 1),
                    ("二级注册建造师", 2),
                    ("二级建造师", 2),
                ],
            )
            .with_rank_table(
                "工程师",
                &[
                    ("助理工程师", 1),
                    ("工程师", 2),
                    ("中级工程师", 2),
                    ("高级工程师", 3),
                    ("教授级高级工程师", 4),
                ],
            )
            .with_system(LevelSystem::Qualitative, &["助理", "中级", "高级"])
            .with_system(LevelSystem::NumericTier, &["一级", "二级", "三级"])
            .with_alias("初级", LevelSystem::Qualitative, 0)
            .with_registrable(&["建筑师", "建造师", "工程师"])
    }

    /// Append a profession rank table. Earlier tables take precedence.
    pub fn with_rank_table(mut self, profession: &str, variants: &[(&str, u8)]) -> Self {
        self.tables.push(RankTable {
            profession: profession.to_string(),
            variants: variants
                .iter()
                .map(|(name, ordinal)| (name.to_string(), *ordinal))
                .collect(),
        });
        self
    }

    /// Replace the ordered keywords of a generic system, lowest first.
    pub fn with_system(mut self, system: LevelSystem, keywords: &[&str]) -> Self {
        let keywords = keywords.iter().map(|k| k.to_string()).collect();
        match system {
            LevelSystem::Qualitative => self.qualitative = keywords,
            LevelSystem::NumericTier => self.numeric = keywords,
        }
        self
    }

    /// Map an extra keyword onto a position of a generic system.
    pub fn with_alias(mut self, keyword: &str, system: LevelSystem, index: usize) -> Self {
        self.aliases
            .push((keyword.to_string(), LevelInfo { system, index }));
        self
    }

    /// Professions that also exist as a registered (`注册`) qualification.
    pub fn with_registrable(mut self, professions: &[&str]) -> Self {
        self.registrable
            .extend(professions.iter().map(|p| p.to_string()));
        self
    }

    fn system_keywords(&self, system: LevelSystem) -> &[String] {
        match system {
            LevelSystem::Qualitative => &self.qualitative,
            LevelSystem::NumericTier => &self.numeric,
        }
    }

    /// System and index of a generic level keyword.
    pub fn level_info(&self, keyword: &str) -> Option<LevelInfo> {
        let keyword = keyword.trim();
        let direct = [LevelSystem::Qualitative, LevelSystem::NumericTier]
            .into_iter()
            .find_map(|system| {
                self.system_keywords(system)
                    .iter()
                    .position(|k| k == keyword)
                    .map(|index| LevelInfo { system, index })
            });
        direct.or_else(|| {
            self.aliases
                .iter()
                .find(|(alias, _)| alias == keyword)
                .map(|(_, info)| *info)
        })
    }

    /// Keywords of the level's system that satisfy `modifier` relative to it.
    fn select_keywords(&self, info: LevelInfo, modifier: LevelModifier) -> Vec<String> {
        let keywords = self.system_keywords(info.system);
        let range = match modifier {
            LevelModifier::Ge => info.index..keywords.len(),
            LevelModifier::Gt => (info.index + 1)..keywords.len(),
            LevelModifier::Eq => info.index..(info.index + 1).min(keywords.len()),
        };
        keywords
            .get(range)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    /// Every certificate name satisfying `level_keyword + base_name` under
    /// `modifier`.
    pub fn resolve(
        &self,
        base_name: &str,
        level_keyword: Option<&str>,
        modifier: LevelModifier,
    ) -> BTreeSet<String> {
        let base_name = base_name.trim();
        let level_keyword = level_keyword.map(str::trim).filter(|k| !k.is_empty());
        let full_name = match level_keyword {
            Some(level) => format!("{}{}", level, base_name),
            None => base_name.to_string(),
        };

        if let Some(resolved) = self.resolve_from_tables(&full_name, modifier) {
            return resolved;
        }

        let Some(level) = level_keyword else {
            return BTreeSet::from([full_name]);
        };
        let Some(info) = self.level_info(level) else {
            debug!(full_name = %full_name, "No level rule applies, passing through");
            return BTreeSet::from([full_name]);
        };

        let selected = self.select_keywords(info, modifier);
        if selected.is_empty() {
            return BTreeSet::from([full_name]);
        }

        let mut resolved: BTreeSet<String> = selected
            .iter()
            .map(|kw| format!("{}{}", kw, base_name))
            .collect();
        if self.registrable.iter().any(|p| p == base_name) {
            resolved.extend(selected.iter().map(|kw| format!("{}注册{}", kw, base_name)));
            resolved.insert(format!("注册{}", base_name));
        }

        debug!(
            full_name = %full_name,
            modifier = %modifier,
            variants = resolved.len(),
            "Resolved generic level requirement"
        );
        resolved
    }

    fn resolve_from_tables(
        &self,
        full_name: &str,
        modifier: LevelModifier,
    ) -> Option<BTreeSet<String>> {
        let (table, ordinal) = self
            .tables
            .iter()
            .find_map(|t| t.ordinal_of(full_name).map(|o| (t, o)))?;

        let resolved: BTreeSet<String> = table
            .variants
            .iter()
            .filter(|(_, o)| match modifier {
                LevelModifier::Ge => *o >= ordinal,
                LevelModifier::Gt => *o > ordinal,
                LevelModifier::Eq => *o == ordinal,
            })
            .map(|(name, _)| name.clone())
            .collect();

        debug!(
            full_name = %full_name,
            profession = %table.profession,
            modifier = %modifier,
            variants = resolved.len(),
            "Resolved from rank table"
        );

        if resolved.is_empty() {
            Some(BTreeSet::from([full_name.to_string()]))
        } else {
            Some(resolved)
        }
    }

    /// Satisfying level keywords alone, for a title requirement with no
    /// profession (empty base or [`GENERIC_TITLE`]).
    pub fn resolve_bare_level(
        &self,
        level_keyword: &str,
        modifier: LevelModifier,
    ) -> BTreeSet<String> {
        match self.level_info(level_keyword) {
            Some(info) => self.select_keywords(info, modifier).into_iter().collect(),
            None => {
                warn!(level_keyword, "Unknown level keyword for bare title requirement");
                BTreeSet::new()
            }
        }
    }

    /// Whether `name` is a known certificate or follows a known
    /// `<level keyword><profession>` pattern.
    ///
    /// Used to flag unseen phrasings for manual review; never blocks a search.
    pub fn exists(&self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        if self.tables.iter().any(|t| t.ordinal_of(name).is_some()) {
            return true;
        }

        let mut keywords: Vec<&str> = self
            .qualitative
            .iter()
            .chain(self.numeric.iter())
            .map(String::as_str)
            .chain(self.aliases.iter().map(|(alias, _)| alias.as_str()))
            .collect();
        keywords.sort_by_key(|k| std::cmp::Reverse(k.chars().count()));

        keywords.into_iter().any(|kw| {
            name.strip_prefix(kw)
                .is_some_and(|rest| !rest.trim().is_empty())
        })
    }
}
