//! Thin `reqwest` wrapper for the Web API endpoints slack-morphism does not
//! model (files, conversation metadata, history pagination).

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::Value,
    tracing::debug,
};

use bugseer_channels::{FileCandidate, HistoryPage, HistoryRecord, PlatformError};

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Bearer-authenticated Web API client.
pub struct WebApi {
    http: reqwest::Client,
    base_url: String,
    token: Secret<String>,
}

impl WebApi {
    #[must_use]
    pub fn new(token: Secret<String>) -> Self {
        Self::with_base_url(token, SLACK_API_BASE.to_string())
    }

    /// Point the client at a different API origin. Used by tests.
    #[must_use]
    pub fn with_base_url(token: Secret<String>, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        }
    }

    /// Uploaded files visible in a channel, filtered by platform file type.
    pub async fn files_list(
        &self,
        channel: &str,
        types: &str,
    ) -> Result<Vec<FileObject>, PlatformError> {
        let response: FilesListResponse = self
            .get("files.list", &[
                ("channel", channel.to_string()),
                ("types", types.to_string()),
            ])
            .await?;
        Ok(response.files)
    }

    pub async fn file_info(&self, file_id: &str) -> Result<FileObject, PlatformError> {
        let response: FileInfoResponse = self
            .get("files.info", &[("file", file_id.to_string())])
            .await?;
        Ok(response.file)
    }

    /// Display name of a conversation; falls back to the id for
    /// conversations without one (DMs).
    pub async fn channel_name(&self, channel: &str) -> Result<String, PlatformError> {
        let response: ConversationsInfoResponse = self
            .get("conversations.info", &[("channel", channel.to_string())])
            .await?;
        Ok(response.channel.name.unwrap_or(response.channel.id))
    }

    /// One page of channel history. An empty `next_cursor` from the platform
    /// is reported as exhaustion.
    pub async fn conversations_history(
        &self,
        channel: &str,
        limit: u32,
        cursor: Option<&str>,
        oldest: f64,
    ) -> Result<HistoryPage, PlatformError> {
        let mut params = vec![
            ("channel", channel.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }
        if oldest > 0.0 {
            params.push(("oldest", oldest.to_string()));
        }

        let response: HistoryResponse = self.get("conversations.history", &params).await?;
        let records = response
            .messages
            .into_iter()
            .map(MessageObject::into_record)
            .collect();
        let next_cursor = response
            .response_metadata
            .and_then(|m| m.next_cursor)
            .filter(|c| !c.is_empty());
        Ok(HistoryPage {
            records,
            next_cursor,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, PlatformError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.token.expose_secret())
            .query(params)
            .send()
            .await
            .map_err(|e| PlatformError::transport(format!("{method}: {e}")))?;

        let value: Value = response
            .json()
            .await
            .map_err(|e| PlatformError::transport(format!("{method}: {e}")))?;

        if !value.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            let code = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            debug!(method, code, "web api call failed");
            return Err(PlatformError::from_api_code(code));
        }

        serde_json::from_value(value).map_err(|e| {
            PlatformError::transport(format!("{method}: unexpected response shape: {e}"))
        })
    }
}

// ── Wire types ──────────────────────────────────────────────────────────────

/// File object as the Web API reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub filetype: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub url_private: Option<String>,
    /// Channels the file is shared into.
    #[serde(default)]
    pub channels: Vec<String>,
}

impl FileObject {
    #[must_use]
    pub fn into_candidate(self) -> FileCandidate {
        FileCandidate {
            id: self.id,
            title: self.title.or_else(|| self.name.clone()).unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            filetype: self.filetype.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or_default(),
            permalink: self.permalink.unwrap_or_default(),
            url_private: self.url_private.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct FilesListResponse {
    #[serde(default)]
    files: Vec<FileObject>,
}

#[derive(Deserialize)]
struct FileInfoResponse {
    file: FileObject,
}

#[derive(Deserialize)]
struct ConversationsInfoResponse {
    channel: ChannelObject,
}

#[derive(Deserialize)]
struct ChannelObject {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    messages: Vec<MessageObject>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct MessageObject {
    ts: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    files: Vec<FileObject>,
}

impl MessageObject {
    fn into_record(self) -> HistoryRecord {
        HistoryRecord {
            ts: self.ts,
            user: self.user,
            text: self.text.unwrap_or_default(),
            files: self
                .files
                .into_iter()
                .map(FileObject::into_candidate)
                .collect(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, bugseer_channels::PlatformErrorKind, mockito::Matcher};

    fn api(server: &mockito::Server) -> WebApi {
        WebApi::with_base_url(Secret::new("xoxb-test".into()), server.url())
    }

    #[tokio::test]
    async fn files_list_parses_candidates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/files.list")
            .match_query(Matcher::Any)
            .with_body(
                r#"{"ok": true, "files": [
                    {"id": "F1", "title": "bugseer.yaml", "name": "bugseer.yaml",
                     "filetype": "yaml", "timestamp": 100,
                     "permalink": "https://acme.slack.com/files/F1",
                     "url_private": "https://files.slack.com/F1"}
                ]}"#,
            )
            .create_async()
            .await;

        let files = api(&server).files_list("C1", "yaml").await.unwrap();
        assert_eq!(files.len(), 1);
        let candidate = files[0].clone().into_candidate();
        assert_eq!(candidate.id, "F1");
        assert_eq!(candidate.title, "bugseer.yaml");
        assert_eq!(candidate.timestamp, 100);
    }

    #[tokio::test]
    async fn api_error_is_classified() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/files.info")
            .match_query(Matcher::Any)
            .with_body(r#"{"ok": false, "error": "invalid_auth"}"#)
            .create_async()
            .await;

        let err = api(&server).file_info("F1").await.unwrap_err();
        assert_eq!(err.kind, PlatformErrorKind::Auth);
    }

    #[tokio::test]
    async fn empty_cursor_means_exhausted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/conversations.history")
            .match_query(Matcher::Any)
            .with_body(
                r#"{"ok": true,
                    "messages": [{"ts": "1.0", "user": "U1", "text": "boom",
                                  "files": [{"id": "F1", "filetype": "yaml"}]}],
                    "response_metadata": {"next_cursor": ""}}"#,
            )
            .create_async()
            .await;

        let page = api(&server)
            .conversations_history("C1", 20, None, 0.0)
            .await
            .unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].files.len(), 1);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn channel_name_falls_back_to_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/conversations.info")
            .match_query(Matcher::Any)
            .with_body(r#"{"ok": true, "channel": {"id": "D042"}}"#)
            .create_async()
            .await;

        let name = api(&server).channel_name("D042").await.unwrap();
        assert_eq!(name, "D042");
    }
}
