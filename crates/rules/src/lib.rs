//! Channel rules files: parsing, schema validation, and loading.
//!
//! A rules file is a YAML document uploaded to a Slack channel. This crate
//! turns raw file bytes into a validated [`ChannelRules`] payload and defines
//! the [`RulesLoader`] trait the resolver loads through.

pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{HttpRulesLoader, RulesLoader},
    schema::{ChannelRules, RuleEntry},
};
