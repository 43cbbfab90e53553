//! Slack channel plugin for bugseer.
//!
//! Socket Mode listener plus a thin Web API wrapper implementing the
//! collaborator traits from `bugseer-channels`. The slack-morphism client
//! covers Socket Mode and the chat/reactions endpoints; the file and
//! conversation endpoints it does not model go through a small `reqwest`
//! wrapper in [`api`].

pub mod api;
pub mod client;
pub mod config;
pub mod identity;
pub mod socket;

pub use {
    client::SlackPlatform,
    config::SlackAccountConfig,
    identity::BotIdentity,
    socket::run,
};
