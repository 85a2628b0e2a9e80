//! Dispatcher and conversation configuration.

use std::collections::BTreeSet;
use std::path::PathBuf;

use scout_core::defaults;

/// Configuration for the turn dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum turns executing at once, across all conversations.
    pub max_concurrent_turns: usize,
    /// Inbound queue capacity; `submit` waits when full.
    pub queue_capacity: usize,
    /// Whether turn processing is enabled.
    pub enabled: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_turns: defaults::TURN_MAX_CONCURRENT,
            queue_capacity: defaults::TURN_QUEUE_CAPACITY,
            enabled: true,
        }
    }
}

impl DispatcherConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `TURN_WORKER_ENABLED` | `true` | Enable/disable turn processing |
    /// | `TURN_MAX_CONCURRENT` | `5` | Max concurrent turns |
    /// | `TURN_QUEUE_CAPACITY` | `256` | Inbound queue capacity |
    pub fn from_env() -> Self {
        let enabled = std::env::var("TURN_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent_turns = std::env::var("TURN_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::TURN_MAX_CONCURRENT)
            .max(1);

        let queue_capacity = std::env::var("TURN_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::TURN_QUEUE_CAPACITY)
            .max(1);

        Self {
            max_concurrent_turns,
            queue_capacity,
            enabled,
        }
    }

    /// Set maximum concurrent turns.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_turns = max.max(1);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Enable or disable turn processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Configuration for the recruiting conversation.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Pool size fetched per new query when no rule set provides one.
    pub initial_pool_size: usize,
    /// Candidates shown per page.
    pub display_limit: usize,
    /// Senders allowed to use the assistant. Empty means nobody.
    pub authorized_user_ids: BTreeSet<String>,
    /// Scoring rule document (YAML or JSON).
    pub scoring_rules_path: Option<PathBuf>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            initial_pool_size: defaults::INITIAL_POOL_SIZE,
            display_limit: defaults::DISPLAY_LIMIT,
            authorized_user_ids: BTreeSet::new(),
            scoring_rules_path: None,
        }
    }
}

impl ConversationConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `INITIAL_CANDIDATE_POOL_SIZE` | `30` | Pool size without a rule set |
    /// | `TOP_N_CANDIDATES` | `5` | Candidates per page |
    /// | `AUTHORIZED_USER_IDS` | (empty) | Comma-separated sender ids |
    /// | `SCORING_RULES_PATH` | (unset) | Scoring rule document |
    pub fn from_env() -> Self {
        let initial_pool_size = std::env::var("INITIAL_CANDIDATE_POOL_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults::INITIAL_POOL_SIZE);

        let display_limit = std::env::var("TOP_N_CANDIDATES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults::DISPLAY_LIMIT);

        let authorized_user_ids = std::env::var("AUTHORIZED_USER_IDS")
            .map(|v| parse_id_list(&v))
            .unwrap_or_default();

        let scoring_rules_path = std::env::var("SCORING_RULES_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            initial_pool_size,
            display_limit,
            authorized_user_ids,
            scoring_rules_path,
        }
    }

    pub fn with_display_limit(mut self, limit: usize) -> Self {
        self.display_limit = limit.max(1);
        self
    }

    pub fn with_initial_pool_size(mut self, size: usize) -> Self {
        self.initial_pool_size = size.max(1);
        self
    }

    pub fn with_authorized<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorized_user_ids
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_scoring_rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.scoring_rules_path = Some(path.into());
        self
    }

    pub fn is_authorized(&self, sender_id: &str) -> bool {
        self.authorized_user_ids.contains(sender_id)
    }
}

fn parse_id_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
