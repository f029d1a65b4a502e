//! `Document.plist` summary index.
//!
//! The summary is a human-browsable index written on every save. Loading
//! never depends on it: a missing, unreadable or stale summary is reported
//! through logs only.

use serde::{Deserialize, Serialize};

/// Contents of `Document.plist`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Attachment names in name order at the time of the last save.
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl DocumentSummary {
    /// Serializes as an XML property list.
    pub fn to_plist_bytes(&self) -> Result<Vec<u8>, plist::Error> {
        let mut bytes = Vec::new();
        plist::to_writer_xml(&mut bytes, self)?;
        Ok(bytes)
    }

    /// Parses an XML or binary property list.
    pub fn from_plist_bytes(bytes: &[u8]) -> Result<Self, plist::Error> {
        plist::from_bytes(bytes)
    }
}
