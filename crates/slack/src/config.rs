use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Credentials for one Slack workspace connection.
#[derive(Clone, Serialize, Deserialize)]
pub struct SlackAccountConfig {
    /// Bot token (`xoxb-...`) for Web API calls and file downloads.
    #[serde(serialize_with = "serialize_secret")]
    pub bot_token: Secret<String>,

    /// App-level token (`xapp-...`) for the Socket Mode connection.
    #[serde(serialize_with = "serialize_secret")]
    pub app_token: Secret<String>,
}

impl SlackAccountConfig {
    #[must_use]
    pub fn new(bot_token: String, app_token: String) -> Self {
        Self {
            bot_token: Secret::new(bot_token),
            app_token: Secret::new(app_token),
        }
    }
}

impl std::fmt::Debug for SlackAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackAccountConfig")
            .field("bot_token", &"[REDACTED]")
            .field("app_token", &"[REDACTED]")
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
