use std::sync::Arc;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    slack_morphism::{errors::SlackClientError, prelude::*},
    tracing::info,
};

use bugseer_channels::{
    ChannelHistory, FileCandidate, FileStore, HistoryPage, MessageHandle, Messenger, PlatformError,
};

use crate::{
    api::{FileObject, WebApi},
    identity::BotIdentity,
};

/// Credential-bearing platform client implementing the collaborator
/// contracts of `bugseer-channels` on top of the Slack Web API.
pub struct SlackPlatform {
    client: Arc<SlackHyperClient>,
    token: SlackApiToken,
    api: WebApi,
}

impl SlackPlatform {
    #[must_use]
    pub fn new(client: Arc<SlackHyperClient>, bot_token: Secret<String>) -> Self {
        let token = SlackApiToken::new(bot_token.expose_secret().clone().into());
        Self {
            client,
            token,
            api: WebApi::new(bot_token),
        }
    }

    /// Run the auth handshake. Called once at startup; a failure here is
    /// fatal for the connection.
    pub async fn identity(&self) -> Result<BotIdentity, PlatformError> {
        let session = self.client.open_session(&self.token);
        let auth = session.auth_test().await.map_err(map_client_error)?;
        let identity = BotIdentity {
            bot_id: auth.bot_id.map(|id| id.to_string()),
            user_id: auth.user_id.to_string(),
            name: auth.user.clone().unwrap_or_default(),
            team_url: auth.url.0.to_string(),
        };
        info!(identity = %identity, "bot authentication complete");
        Ok(identity)
    }

    /// Display name of a conversation, falling back to its id.
    pub async fn channel_name(&self, channel: &str) -> Result<String, PlatformError> {
        self.api.channel_name(channel).await
    }

    /// Raw file metadata, including the channels the file is shared into.
    pub async fn file_object(&self, file_id: &str) -> Result<FileObject, PlatformError> {
        self.api.file_info(file_id).await
    }
}

fn map_client_error(e: SlackClientError) -> PlatformError {
    match e {
        SlackClientError::ApiError(api) => PlatformError::from_api_code(&api.code),
        other => PlatformError::transport(other.to_string()),
    }
}

#[async_trait]
impl Messenger for SlackPlatform {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<MessageHandle, PlatformError> {
        let session = self.client.open_session(&self.token);
        let mut request = SlackApiChatPostMessageRequest::new(
            channel.to_string().into(),
            SlackMessageContent::new().with_text(text.to_string()),
        );
        if let Some(ts) = thread_ts {
            request = request.with_thread_ts(ts.to_string().into());
        }
        let response = session
            .chat_post_message(&request)
            .await
            .map_err(map_client_error)?;
        Ok(MessageHandle {
            channel: response.channel.to_string(),
            ts: response.ts.to_string(),
        })
    }

    async fn post_ephemeral(
        &self,
        channel: &str,
        user: &str,
        text: &str,
    ) -> Result<MessageHandle, PlatformError> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiChatPostEphemeralRequest::new(
            channel.to_string().into(),
            user.to_string().into(),
            SlackMessageContent::new().with_text(text.to_string()),
        );
        session
            .chat_post_ephemeral(&request)
            .await
            .map_err(map_client_error)?;
        // slack-morphism's ephemeral response models no fields (message_ts is
        // not exposed in this version); the returned handle's ts is unused by
        // callers.
        Ok(MessageHandle {
            channel: channel.to_string(),
            ts: String::new(),
        })
    }

    async fn add_reaction(
        &self,
        channel: &str,
        emoji: &str,
        ts: &str,
    ) -> Result<(), PlatformError> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiReactionsAddRequest::new(
            channel.to_string().into(),
            SlackReactionName::new(emoji.to_string()),
            ts.to_string().into(),
        );
        session
            .reactions_add(&request)
            .await
            .map_err(map_client_error)?;
        Ok(())
    }
}

#[async_trait]
impl FileStore for SlackPlatform {
    async fn list_files(
        &self,
        channel: &str,
        file_type: &str,
    ) -> Result<Vec<FileCandidate>, PlatformError> {
        Ok(self
            .api
            .files_list(channel, file_type)
            .await?
            .into_iter()
            .map(FileObject::into_candidate)
            .collect())
    }

    async fn file_info(&self, file_id: &str) -> Result<FileCandidate, PlatformError> {
        Ok(self.api.file_info(file_id).await?.into_candidate())
    }
}

#[async_trait]
impl ChannelHistory for SlackPlatform {
    async fn history_page(
        &self,
        channel: &str,
        limit: u32,
        cursor: Option<&str>,
        since: f64,
    ) -> Result<HistoryPage, PlatformError> {
        self.api
            .conversations_history(channel, limit, cursor, since)
            .await
    }
}
