use {
    async_trait::async_trait,
    tracing::{debug, warn},
};

use crate::candidates::FileCandidate;

// ── Typed platform errors ───────────────────────────────────────────────────

/// Error kinds a platform call can fail with. Callers match on the kind
/// instead of inspecting error strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformErrorKind {
    /// Reaction emoji name is not known to the workspace.
    InvalidReactionName,
    /// The bot already reacted with this emoji on this message.
    AlreadyReacted,
    /// Credential rejected or expired.
    Auth,
    /// Anything else the platform reported.
    Api,
    /// The request never got a platform answer.
    Transport,
}

/// A failed platform call, classified by kind.
#[derive(Debug, Clone, thiserror::Error)]
#[error("platform call failed ({kind:?}): {message}")]
pub struct PlatformError {
    pub kind: PlatformErrorKind,
    pub message: String,
}

impl PlatformError {
    #[must_use]
    pub fn new(kind: PlatformErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a Slack Web API error code.
    #[must_use]
    pub fn from_api_code(code: &str) -> Self {
        let kind = match code {
            "invalid_name" => PlatformErrorKind::InvalidReactionName,
            "already_reacted" => PlatformErrorKind::AlreadyReacted,
            "invalid_auth" | "not_authed" | "account_inactive" | "token_revoked" => {
                PlatformErrorKind::Auth
            },
            _ => PlatformErrorKind::Api,
        };
        Self::new(kind, code)
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::Transport, message)
    }
}

// ── Collaborator contracts ──────────────────────────────────────────────────

/// Handle to a posted message.
#[derive(Debug, Clone)]
pub struct MessageHandle {
    pub channel: String,
    pub ts: String,
}

/// Send messages and reactions into a channel.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<MessageHandle, PlatformError>;

    /// Post a message only the given user can see.
    async fn post_ephemeral(
        &self,
        channel: &str,
        user: &str,
        text: &str,
    ) -> Result<MessageHandle, PlatformError>;

    async fn add_reaction(
        &self,
        channel: &str,
        emoji: &str,
        ts: &str,
    ) -> Result<(), PlatformError>;
}

/// List and inspect a channel's uploaded files.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn list_files(
        &self,
        channel: &str,
        file_type: &str,
    ) -> Result<Vec<FileCandidate>, PlatformError>;

    async fn file_info(&self, file_id: &str) -> Result<FileCandidate, PlatformError>;
}

/// One page of channel history.
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub records: Vec<HistoryRecord>,
    /// Opaque continuation cursor; absent when the history is exhausted.
    pub next_cursor: Option<String>,
}

/// A replayed channel message, possibly carrying file uploads.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub ts: String,
    pub user: Option<String>,
    pub text: String,
    pub files: Vec<FileCandidate>,
}

/// Paginated access to a channel's message history.
#[async_trait]
pub trait ChannelHistory: Send + Sync {
    /// Fetch one bounded page. The cursor returned by page N is required to
    /// request page N+1, so pages cannot be fetched in parallel.
    async fn history_page(
        &self,
        channel: &str,
        limit: u32,
        cursor: Option<&str>,
        since: f64,
    ) -> Result<HistoryPage, PlatformError>;
}

// ── Reaction recovery ───────────────────────────────────────────────────────

/// Add a reaction, recovering the two error kinds a bad rules file can
/// provoke: an unknown emoji name falls back to a threaded comment pointing
/// at the configuration, and a duplicate reaction is silently ignored.
/// Everything else propagates.
pub async fn add_reaction_with_fallback(
    messenger: &dyn Messenger,
    channel: &str,
    emoji: &str,
    ts: &str,
) -> Result<(), PlatformError> {
    match messenger.add_reaction(channel, emoji, ts).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind == PlatformErrorKind::InvalidReactionName => {
            warn!(channel, emoji, "invalid reaction name, posting fallback comment");
            messenger
                .post_message(
                    channel,
                    &format!("Invalid reaction `:{emoji}:`. Please check your configuration file"),
                    Some(ts),
                )
                .await?;
            Ok(())
        },
        Err(e) if e.kind == PlatformErrorKind::AlreadyReacted => {
            debug!(channel, emoji, "ignoring duplicate reaction");
            Ok(())
        },
        Err(e) => Err(e),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::sync::Mutex};

    #[derive(Default)]
    struct ReactionProbe {
        fail_with: Option<PlatformErrorKind>,
        posts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Messenger for ReactionProbe {
        async fn post_message(
            &self,
            channel: &str,
            text: &str,
            _thread_ts: Option<&str>,
        ) -> Result<MessageHandle, PlatformError> {
            self.posts.lock().unwrap().push(text.to_string());
            Ok(MessageHandle {
                channel: channel.to_string(),
                ts: "1.0".into(),
            })
        }

        async fn post_ephemeral(
            &self,
            channel: &str,
            _user: &str,
            _text: &str,
        ) -> Result<MessageHandle, PlatformError> {
            Ok(MessageHandle {
                channel: channel.to_string(),
                ts: "1.0".into(),
            })
        }

        async fn add_reaction(
            &self,
            _channel: &str,
            emoji: &str,
            _ts: &str,
        ) -> Result<(), PlatformError> {
            match self.fail_with {
                Some(kind) => Err(PlatformError::new(kind, format!("reaction {emoji}"))),
                None => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn invalid_name_falls_back_to_comment() {
        let probe = ReactionProbe {
            fail_with: Some(PlatformErrorKind::InvalidReactionName),
            ..Default::default()
        };
        add_reaction_with_fallback(&probe, "C1", "bad::name", "1.23")
            .await
            .unwrap();
        let posts = probe.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].contains(":bad::name:"));
    }

    #[tokio::test]
    async fn duplicate_reaction_is_ignored() {
        let probe = ReactionProbe {
            fail_with: Some(PlatformErrorKind::AlreadyReacted),
            ..Default::default()
        };
        add_reaction_with_fallback(&probe, "C1", "fire", "1.23")
            .await
            .unwrap();
        assert!(probe.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_kinds_propagate() {
        let probe = ReactionProbe {
            fail_with: Some(PlatformErrorKind::Api),
            ..Default::default()
        };
        let err = add_reaction_with_fallback(&probe, "C1", "fire", "1.23")
            .await
            .unwrap_err();
        assert_eq!(err.kind, PlatformErrorKind::Api);
        assert!(probe.posts.lock().unwrap().is_empty());
    }

    #[test]
    fn api_code_classification() {
        assert_eq!(
            PlatformError::from_api_code("invalid_name").kind,
            PlatformErrorKind::InvalidReactionName
        );
        assert_eq!(
            PlatformError::from_api_code("already_reacted").kind,
            PlatformErrorKind::AlreadyReacted
        );
        assert_eq!(
            PlatformError::from_api_code("invalid_auth").kind,
            PlatformErrorKind::Auth
        );
        assert_eq!(
            PlatformError::from_api_code("channel_not_found").kind,
            PlatformErrorKind::Api
        );
    }
}
