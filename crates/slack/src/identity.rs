/// Bot identity resolved once through the `auth.test` handshake at startup,
/// immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct BotIdentity {
    pub bot_id: Option<String>,
    pub user_id: String,
    pub name: String,
    /// Workspace URL, e.g. `https://acme.slack.com/`.
    pub team_url: String,
}

impl std::fmt::Display for BotIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} {}",
            self.name,
            self.bot_id.as_deref().unwrap_or("-"),
            self.user_id
        )
    }
}
