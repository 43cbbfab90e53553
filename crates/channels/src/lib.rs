//! Channel configuration resolution.
//!
//! Each Slack channel the bot lives in is configured by an uploaded rules
//! file. This crate selects the right file among candidates, loads and
//! validates it through [`bugseer_rules`], caches the result per channel, and
//! recovers configurations from channel history on cold start. Platform I/O
//! goes through the collaborator traits in [`platform`], so everything here is
//! testable without a Slack workspace.

pub mod candidates;
pub mod error;
pub mod history;
pub mod platform;
pub mod resolver;
pub mod store;

pub use {
    candidates::{CONFIG_FILE_NAME, FileCandidate},
    error::{Error, Result},
    history::{HistoryLimits, fetch_all},
    platform::{
        ChannelHistory, FileStore, HistoryPage, HistoryRecord, MessageHandle, Messenger,
        PlatformError, PlatformErrorKind, add_reaction_with_fallback,
    },
    resolver::{InvalidConfigPolicy, RefreshOptions, ResolutionOutcome, Resolver, ResolverSettings},
    store::{ChannelConfiguration, ConfigStore, LoadState, SourceFile},
};
