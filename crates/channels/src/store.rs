use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use bugseer_rules::ChannelRules;

use crate::candidates::FileCandidate;

/// Metadata of the upload a configuration was built from.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: String,
    pub title: String,
    pub name: String,
    pub timestamp: i64,
    pub permalink: String,
    pub url_private: String,
}

impl From<FileCandidate> for SourceFile {
    fn from(f: FileCandidate) -> Self {
        Self {
            id: f.id,
            title: f.title,
            name: f.name,
            timestamp: f.timestamp,
            permalink: f.permalink,
            url_private: f.url_private,
        }
    }
}

/// Load outcome carried by a cached configuration.
#[derive(Debug, Clone)]
pub enum LoadState {
    /// A refresh is in flight; the slot is provisionally occupied.
    Pending,
    Loaded(ChannelRules),
    Invalid { class: String, detail: String },
}

/// The authoritative configuration of one channel.
///
/// At most one exists per channel id; a refresh always replaces, never
/// merges. An entry whose load failed still occupies the slot under the
/// default policy, so repeated invalid uploads don't silently fall back to a
/// stale valid configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfiguration {
    pub channel_id: String,
    pub source: SourceFile,
    pub state: LoadState,
}

impl ChannelConfiguration {
    #[must_use]
    pub fn new(channel_id: String, source: SourceFile) -> Self {
        Self {
            channel_id,
            source,
            state: LoadState::Pending,
        }
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded(_))
    }

    #[must_use]
    pub fn rules(&self) -> Option<&ChannelRules> {
        match &self.state {
            LoadState::Loaded(rules) => Some(rules),
            _ => None,
        }
    }

    /// Number of loaded rule entries; 0 unless successfully loaded. Used for
    /// logging only.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.rules().map_or(0, ChannelRules::len)
    }
}

/// In-memory cache of active channel configurations, keyed by channel id.
///
/// Owned by the resolver; entries live until replaced or explicitly removed.
/// The inner lock is never held across await points.
#[derive(Default)]
pub struct ConfigStore {
    entries: RwLock<HashMap<String, Arc<ChannelConfiguration>>>,
}

impl ConfigStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, channel: &str) -> Option<Arc<ChannelConfiguration>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(channel)
            .cloned()
    }

    pub fn set(&self, config: ChannelConfiguration) -> Arc<ChannelConfiguration> {
        let config = Arc::new(config);
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(config.channel_id.clone(), Arc::clone(&config));
        config
    }

    pub fn remove(&self, channel: &str) -> Option<Arc<ChannelConfiguration>> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(channel)
    }

    #[must_use]
    pub fn contains(&self, channel: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(channel)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn source(ts: i64) -> SourceFile {
        SourceFile {
            id: "F1".into(),
            title: "bugseer.yaml".into(),
            name: "bugseer.yaml".into(),
            timestamp: ts,
            permalink: "https://acme.slack.com/files/F1".into(),
            url_private: "https://files.slack.com/F1".into(),
        }
    }

    #[test]
    fn set_replaces_existing_entry() {
        let store = ConfigStore::new();
        store.set(ChannelConfiguration::new("C1".into(), source(100)));
        store.set(ChannelConfiguration::new("C1".into(), source(200)));

        let got = store.get("C1").unwrap();
        assert_eq!(got.source.timestamp, 200);
    }

    #[test]
    fn remove_then_get_is_none() {
        let store = ConfigStore::new();
        store.set(ChannelConfiguration::new("C1".into(), source(100)));
        assert!(store.contains("C1"));
        store.remove("C1");
        assert!(store.get("C1").is_none());
    }

    #[test]
    fn entry_count_is_zero_until_loaded() {
        let mut config = ChannelConfiguration::new("C1".into(), source(100));
        assert_eq!(config.entry_count(), 0);
        assert!(!config.is_loaded());

        config.state = LoadState::Invalid {
            class: "SchemaError".into(),
            detail: "rules: at least one rule entry is required".into(),
        };
        assert_eq!(config.entry_count(), 0);

        config.state = LoadState::Loaded(
            ChannelRules::parse("rules:\n  - contains: x\n    emoji: y\n").unwrap(),
        );
        assert_eq!(config.entry_count(), 1);
        assert!(config.is_loaded());
    }
}
