use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    bugseer_rules::RulesLoader,
    serde::Serialize,
    tracing::{info, warn},
};

use crate::{
    candidates::{self, CONFIG_FILE_NAME, FileCandidate},
    error::{Error, Result},
    history::{self, HistoryLimits},
    platform::{ChannelHistory, Messenger},
    store::{ChannelConfiguration, ConfigStore, LoadState, SourceFile},
};

/// What to do with the cache slot when a refreshed file fails validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidConfigPolicy {
    /// The failing object replaces any previous entry, valid or not. Repeated
    /// invalid uploads never silently fall back to a stale configuration.
    #[default]
    Replace,
    /// A previously loaded configuration survives; the error is still
    /// reported to the channel and the uploader.
    KeepLastGood,
}

impl std::str::FromStr for InvalidConfigPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "replace" => Ok(Self::Replace),
            "keep-last-good" => Ok(Self::KeepLastGood),
            other => Err(format!(
                "unknown invalid-config policy \"{other}\"; expected \"replace\" or \"keep-last-good\""
            )),
        }
    }
}

impl std::fmt::Display for InvalidConfigPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::KeepLastGood => write!(f, "keep-last-good"),
        }
    }
}

/// Tunables for the resolver.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Recognized configuration file name prefix (exact, case-sensitive).
    pub file_prefix: String,
    /// Platform file type tag accepted during history recovery.
    pub file_type: String,
    pub invalid_policy: InvalidConfigPolicy,
    pub load_timeout: Duration,
    pub history: HistoryLimits,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            file_prefix: CONFIG_FILE_NAME.to_string(),
            file_type: "yaml".to_string(),
            invalid_policy: InvalidConfigPolicy::default(),
            load_timeout: Duration::from_secs(30),
            history: HistoryLimits::default(),
        }
    }
}

/// Result of a refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Loaded { entries: usize },
    Invalid { detail: String },
    /// No recognized configuration upload among the given files. Not an
    /// error; nothing happened.
    NoCandidates,
}

/// Flags for one refresh invocation.
#[derive(Debug, Clone, Default)]
pub struct RefreshOptions {
    /// The files come from a history replay rather than a live upload event;
    /// suppresses the public success notice.
    pub from_history: bool,
    /// Rebuild the configuration from the newest candidate instead of
    /// re-validating the cached source.
    pub force_create: bool,
    /// User who triggered the refresh; gets the detailed error privately when
    /// validation fails.
    pub requester: Option<String>,
}

/// Orchestrates candidate selection, loading, caching, and history recovery.
///
/// Owns the per-channel configuration store. Refreshes for the same channel
/// are serialized through a per-channel lock; duplicates queue behind the
/// in-flight one.
pub struct Resolver {
    store: ConfigStore,
    loader: Arc<dyn RulesLoader>,
    messenger: Arc<dyn Messenger>,
    history: Arc<dyn ChannelHistory>,
    settings: ResolverSettings,
    refresh_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Resolver {
    #[must_use]
    pub fn new(
        loader: Arc<dyn RulesLoader>,
        messenger: Arc<dyn Messenger>,
        history: Arc<dyn ChannelHistory>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            store: ConfigStore::new(),
            loader,
            messenger,
            history,
            settings,
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Currently cached configuration, loaded or not.
    #[must_use]
    pub fn get(&self, channel: &str) -> Option<Arc<ChannelConfiguration>> {
        self.store.get(channel)
    }

    /// Drop a channel's configuration, e.g. when the bot is removed.
    pub fn reset(&self, channel: &str) {
        if self.store.remove(channel).is_some() {
            info!(channel, "channel configuration reset");
        }
    }

    fn channel_lock(&self, channel: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.refresh_locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(channel.to_string()).or_default())
    }

    /// Re-evaluate a channel's configuration from the given uploaded files.
    ///
    /// Validation failures are recovered locally (cache updated per policy,
    /// channel and requester notified) and reported through the outcome; any
    /// other loader failure propagates to the caller.
    pub async fn refresh(
        &self,
        channel: &str,
        files: Vec<FileCandidate>,
        opts: RefreshOptions,
    ) -> Result<ResolutionOutcome> {
        let selected = candidates::select(&self.settings.file_prefix, &files);
        let Some(best) = selected.into_iter().next() else {
            return Ok(ResolutionOutcome::NoCandidates);
        };

        let lock = self.channel_lock(channel);
        let _guard = lock.lock().await;

        info!(channel, file = %best.title, "attempting to refresh channel configuration");

        let previous = self.store.get(channel);
        let source = match &previous {
            Some(prev) if !opts.force_create => prev.source.clone(),
            _ => SourceFile::from(best),
        };
        let mut config = ChannelConfiguration::new(channel.to_string(), source);
        // The slot is provisionally occupied while the load is in flight.
        self.store.set(config.clone());

        let loaded = tokio::time::timeout(
            self.settings.load_timeout,
            self.loader.load(&config.source.url_private),
        )
        .await
        .map_err(|_| Error::Timeout {
            what: "rules load",
            channel: channel.to_string(),
            seconds: self.settings.load_timeout.as_secs(),
        })?;

        match loaded {
            Ok(rules) => {
                let entries = rules.len();
                let remote_repository = rules.remote_repository.clone();
                config.state = LoadState::Loaded(rules);
                self.store.set(config.clone());
                info!(channel, entries, "channel configuration loaded");

                if !opts.from_history {
                    let mut text = format!(
                        "Bugseer configuration <{} | file> `{}` updated successfully",
                        config.source.permalink, config.source.name
                    );
                    if let Some(url) = remote_repository {
                        text.push_str(&format!(
                            ". Remote configurations can be found <{url} | here>."
                        ));
                    }
                    self.messenger.post_message(channel, &text, None).await?;
                }
                Ok(ResolutionOutcome::Loaded { entries })
            },
            Err(e) if e.is_validation() => {
                let class = e.class_name();
                let detail = e.to_string();
                config.state = LoadState::Invalid {
                    class: class.to_string(),
                    detail: detail.clone(),
                };

                let kept_last_good = self.settings.invalid_policy
                    == InvalidConfigPolicy::KeepLastGood
                    && match &previous {
                        Some(prev) if prev.is_loaded() => {
                            self.store.set((**prev).clone());
                            true
                        },
                        _ => false,
                    };
                if !kept_last_good {
                    self.store.set(config);
                }
                warn!(channel, error = %detail, kept_last_good, "channel configuration file is invalid");

                self.messenger
                    .post_message(channel, "Bugseer configuration file is invalid", None)
                    .await?;
                if let Some(user) = &opts.requester {
                    let text = format!(
                        "Bugseer configuration file is invalid. Full error ({class}) message: ```{}```",
                        detail.replace('`', "")
                    );
                    self.messenger.post_ephemeral(channel, user, &text).await?;
                }
                Ok(ResolutionOutcome::Invalid { detail })
            },
            Err(e) => Err(Error::Loader(e)),
        }
    }

    /// Configuration for a channel, recovering from history when the cache is
    /// cold. A cached entry is returned as-is, without re-validation.
    ///
    /// Returns `None` when nothing could be recovered; the channel gets one
    /// "invalid or missing" notice in that case.
    pub async fn ensure(
        &self,
        channel: &str,
        channel_name: &str,
    ) -> Result<Option<Arc<ChannelConfiguration>>> {
        if let Some(existing) = self.store.get(channel) {
            return Ok(Some(existing));
        }

        let records =
            history::fetch_all(self.history.as_ref(), channel, 0.0, &self.settings.history).await?;
        let uploads: Vec<FileCandidate> = records
            .into_iter()
            .flat_map(|r| r.files)
            .filter(|f| f.filetype == self.settings.file_type)
            .collect();

        self.refresh(channel, uploads, RefreshOptions {
            from_history: true,
            ..Default::default()
        })
        .await?;

        if let Some(config) = self.store.get(channel) {
            info!(
                channel,
                entries = config.entry_count(),
                loaded = config.is_loaded(),
                "configuration recovered from channel history"
            );
            return Ok(Some(config));
        }

        self.messenger
            .post_message(
                channel,
                &format!(
                    "Bugseer configuration file on channel `{channel_name}` is invalid or missing. \
                     Please add or fix the configuration file or remove the bot."
                ),
                None,
            )
            .await?;
        Ok(None)
    }
}
