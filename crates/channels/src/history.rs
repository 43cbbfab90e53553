use std::time::Duration;

use tracing::warn;

use crate::{
    error::{Error, Result},
    platform::{ChannelHistory, HistoryRecord},
};

/// Bounds applied to a history replay.
#[derive(Debug, Clone)]
pub struct HistoryLimits {
    pub page_size: u32,
    /// Hard stop against a collaborator that never exhausts its cursor.
    pub max_pages: u32,
    pub page_timeout: Duration,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_pages: 200,
            page_timeout: Duration::from_secs(10),
        }
    }
}

/// Replay a channel's history from `since`, concatenating pages in order
/// until the platform stops returning a continuation cursor or `max_pages`
/// is hit. Pages are requested strictly sequentially because each cursor
/// comes from the previous page.
pub async fn fetch_all(
    history: &dyn ChannelHistory,
    channel: &str,
    since: f64,
    limits: &HistoryLimits,
) -> Result<Vec<HistoryRecord>> {
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;

    for _ in 0..limits.max_pages {
        let page = tokio::time::timeout(
            limits.page_timeout,
            history.history_page(channel, limits.page_size, cursor.as_deref(), since),
        )
        .await
        .map_err(|_| Error::Timeout {
            what: "history page",
            channel: channel.to_string(),
            seconds: limits.page_timeout.as_secs(),
        })??;

        records.extend(page.records);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(records),
        }
    }

    warn!(
        channel,
        max_pages = limits.max_pages,
        "history replay hit the page bound before cursor exhaustion"
    );
    Ok(records)
}
