use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
};

use crate::{
    error::{Error, Result},
    schema::ChannelRules,
};

/// Loads and validates a rules file from its private download URL.
#[async_trait]
pub trait RulesLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<ChannelRules>;
}

/// HTTP loader for Slack-hosted files. The download URL requires the bot
/// token as a bearer credential.
pub struct HttpRulesLoader {
    http: reqwest::Client,
    token: Secret<String>,
}

impl HttpRulesLoader {
    #[must_use]
    pub fn new(token: Secret<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
        }
    }
}

#[async_trait]
impl RulesLoader for HttpRulesLoader {
    async fn load(&self, url: &str) -> Result<ChannelRules> {
        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|source| Error::Fetch {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::FetchStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let raw = response.text().await.map_err(|source| Error::Fetch {
            url: url.to_string(),
            source,
        })?;
        debug!(url, bytes = raw.len(), "fetched rules file");
        ChannelRules::parse(&raw)
    }
}
