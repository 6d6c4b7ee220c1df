use serde::Serialize;
use tracing::warn;

use crate::{
    config::MigrationSettings,
    errors::Error,
    domain::{MessageId, SourceMessage, ThreadHandle},
    formatting::{attachment_failure_line, embed_marker, render_record, split_message},
    messaging::{
        port::ChatPlatform,
        types::{OutgoingFile, OutgoingMessage},
    },
};

/// A source message that could not be replayed. It stays in the source channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedMove {
    pub message: MessageId,
    pub reason: String,
}

#[derive(Clone, Debug, Default)]
pub struct Replayed {
    /// Source ids that now have a copy in the thread, in replay order.
    pub moved: Vec<MessageId>,
    pub failed: Vec<FailedMove>,
}

/// Why a record did not make it, and how many of its parts were posted first.
struct PartialCopy {
    error: Error,
    sent: usize,
    parts: usize,
}

pub struct MessageReplicator<'a> {
    platform: &'a dyn ChatPlatform,
    settings: &'a MigrationSettings,
}

impl<'a> MessageReplicator<'a> {
    pub fn new(platform: &'a dyn ChatPlatform, settings: &'a MigrationSettings) -> Self {
        Self { platform, settings }
    }

    /// Replay `messages` into `thread` in the order given (callers pass them
    /// oldest first). A failure is confined to the message it happened on.
    pub async fn replay(&self, thread: &ThreadHandle, messages: &[SourceMessage]) -> Replayed {
        let mut out = Replayed::default();
        for msg in messages {
            match self.replay_one(thread, msg).await {
                Ok(()) => out.moved.push(msg.id),
                Err(PartialCopy { error, sent, parts }) => {
                    warn!(
                        message = %msg.id,
                        thread = %thread.id,
                        error = %error,
                        sent,
                        parts,
                        "failed to replay message"
                    );
                    let mut reason =
                        format!("message {} by {}: {error}", msg.id, msg.author.display_name);
                    if sent > 0 {
                        reason.push_str(&format!(
                            " ({sent} of {parts} parts were already posted to the thread)"
                        ));
                    }
                    out.failed.push(FailedMove {
                        message: msg.id,
                        reason,
                    });
                }
            }
        }
        out
    }

    async fn replay_one(
        &self,
        thread: &ThreadHandle,
        msg: &SourceMessage,
    ) -> std::result::Result<(), PartialCopy> {
        let mut text = render_record(msg);
        let (files, attachment_notes) = self.carry_attachments(msg).await;
        for note in attachment_notes {
            text.push('\n');
            text.push_str(&note);
        }
        if let Some(marker) = embed_marker(msg.embed_count) {
            text.push('\n');
            text.push_str(&marker);
        }

        let max_len = self.platform.capabilities().max_message_len;
        let mut chunks = split_message(&text, max_len);
        let parts = chunks.len().max(1);
        let last = chunks.pop().unwrap_or_default();
        let fail = |error, sent| PartialCopy { error, sent, parts };

        for (sent, chunk) in chunks.into_iter().enumerate() {
            self.platform
                .send_message(thread.id, OutgoingMessage::text(chunk))
                .await
                .map_err(|e| fail(e, sent))?;
        }
        self.platform
            .send_message(
                thread.id,
                OutgoingMessage {
                    content: last,
                    files,
                },
            )
            .await
            .map_err(|e| fail(e, parts - 1))?;
        Ok(())
    }

    /// Fetch what can be carried; everything else becomes a "failed to copy" line.
    async fn carry_attachments(&self, msg: &SourceMessage) -> (Vec<OutgoingFile>, Vec<String>) {
        let cap = self
            .settings
            .attachment_cap
            .min(self.platform.capabilities().max_files_per_message);
        let mut files = Vec::new();
        let mut notes = Vec::new();

        for (idx, att) in msg.attachments.iter().enumerate() {
            if idx >= cap {
                notes.push(attachment_failure_line(
                    &att.filename,
                    &format!("limit of {cap} per message"),
                ));
                continue;
            }
            if att.size > self.settings.attachment_max_bytes {
                notes.push(attachment_failure_line(&att.filename, "too large"));
                continue;
            }
            match self.platform.fetch_attachment(att).await {
                Ok(data) => files.push(OutgoingFile {
                    filename: att.filename.clone(),
                    data,
                }),
                Err(e) => {
                    warn!(message = %msg.id, file = %att.filename, error = %e, "attachment fetch failed");
                    notes.push(attachment_failure_line(&att.filename, "download failed"));
                }
            }
        }
        (files, notes)
    }
}
