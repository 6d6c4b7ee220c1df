use chrono::Duration;

/// Capabilities / hard limits of a chat platform implementation.
#[derive(Clone, Copy, Debug)]
pub struct PlatformCapabilities {
    /// Maximum characters in one outgoing message.
    pub max_message_len: usize,
    /// Maximum messages returned by one history request.
    pub history_page_limit: usize,
    /// Maximum message ids in one bulk-delete request.
    pub bulk_delete_limit: usize,
    /// Messages at or beyond this age cannot be bulk-deleted.
    pub bulk_delete_max_age: Duration,
    /// Maximum files attached to one outgoing message.
    pub max_files_per_message: usize,
}

impl PlatformCapabilities {
    /// Discord's documented limits.
    pub fn discord() -> Self {
        Self {
            max_message_len: 2000,
            history_page_limit: 100,
            bulk_delete_limit: 100,
            bulk_delete_max_age: Duration::days(14),
            max_files_per_message: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// A message to post. Adapters must suppress mention pings when sending.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: String,
    pub files: Vec<OutgoingFile>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            files: Vec::new(),
        }
    }
}

/// How the final report reaches the invoker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportDelivery {
    /// Replace the acknowledgment ("thinking…") with the report.
    EditAcknowledgment,
    /// Post the report as a plain channel message.
    Broadcast,
}
