//! Wire format of server-to-client notifications.

use serde::{Deserialize, Serialize};

/// Messages pushed to WebSocket clients, one text frame each.
///
/// ```json
/// {"type":"file.change","data":"css/site.css"}
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// A file below the watched root changed; the path is root-relative.
    #[serde(rename = "file.change")]
    FileChange(String),
}

impl ServerMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
