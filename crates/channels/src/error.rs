use crate::platform::PlatformError;

/// Crate-wide result type for resolution operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that escape a refresh or ensure cycle.
///
/// Validation failures never show up here; the resolver recovers them locally
/// and reports them through [`crate::resolver::ResolutionOutcome::Invalid`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A messaging or history call failed with a kind nobody recovers.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The rules loader failed outside the validation taxonomy (fetch errors
    /// and the like).
    #[error(transparent)]
    Loader(#[from] bugseer_rules::Error),

    /// A collaborator call exceeded its deadline.
    #[error("{what} timed out after {seconds}s on channel {channel}")]
    Timeout {
        what: &'static str,
        channel: String,
        seconds: u64,
    },
}
