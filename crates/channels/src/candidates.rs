use serde::Serialize;

/// Default recognized configuration file name. Uploads whose title starts
/// with this (exact, case-sensitive) are considered candidates.
pub const CONFIG_FILE_NAME: &str = "bugseer.yaml";

/// An uploaded file considered for promotion to a channel's active
/// configuration. Ephemeral; produced per refresh call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCandidate {
    pub id: String,
    /// Display title shown in Slack; the prefix filter runs against this.
    pub title: String,
    /// Underlying file name.
    pub name: String,
    /// Platform file type tag, e.g. "yaml".
    pub filetype: String,
    /// Upload time, seconds since the epoch.
    pub timestamp: i64,
    pub permalink: String,
    /// Authenticated download URL.
    pub url_private: String,
}

/// Filter `files` to recognized configuration uploads and order them most
/// recent first. Ties keep their input order (stable sort). An empty result
/// is a legitimate "nothing to do", not an error.
#[must_use]
pub fn select(prefix: &str, files: &[FileCandidate]) -> Vec<FileCandidate> {
    let mut matching: Vec<FileCandidate> = files
        .iter()
        .filter(|f| f.title.starts_with(prefix))
        .cloned()
        .collect();
    matching.sort_by_key(|f| std::cmp::Reverse(f.timestamp));
    matching
}
