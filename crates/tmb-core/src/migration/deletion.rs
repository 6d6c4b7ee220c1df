use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    domain::{ChannelId, MessageId, SourceMessage},
    errors::Error,
    messaging::port::ChatPlatform,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeletionOutcome {
    Complete {
        deleted: usize,
    },
    /// Deletion stopped on a permission failure; the thread copies stand.
    PartialPermission {
        deleted: usize,
        remaining: usize,
    },
    PartialError {
        deleted: usize,
        failed: usize,
        first_error: String,
    },
}

impl DeletionOutcome {
    pub fn deleted(&self) -> usize {
        match self {
            DeletionOutcome::Complete { deleted }
            | DeletionOutcome::PartialPermission { deleted, .. }
            | DeletionOutcome::PartialError { deleted, .. } => *deleted,
        }
    }
}

/// Permission failures stop the whole phase.
struct Halt;

#[derive(Default)]
struct Tally {
    deleted: usize,
    failed: usize,
    first_error: Option<String>,
}

impl Tally {
    fn fail(&mut self, count: usize, e: &Error) {
        self.failed += count;
        if self.first_error.is_none() {
            self.first_error = Some(e.to_string());
        }
    }
}

pub struct DeletionScheduler<'a> {
    platform: &'a dyn ChatPlatform,
    pacing: Duration,
}

impl<'a> DeletionScheduler<'a> {
    pub fn new(platform: &'a dyn ChatPlatform, pacing: Duration) -> Self {
        Self { platform, pacing }
    }

    pub async fn delete(&self, channel: ChannelId, messages: &[SourceMessage]) -> DeletionOutcome {
        self.delete_at(channel, messages, Utc::now()).await
    }

    /// Bulk-delete what is younger than the platform's age ceiling (as of
    /// `now`), then delete the rest one by one with pacing.
    pub async fn delete_at(
        &self,
        channel: ChannelId,
        messages: &[SourceMessage],
        now: DateTime<Utc>,
    ) -> DeletionOutcome {
        let total = messages.len();
        match self.platform.can_delete_messages(channel).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(channel = %channel, "missing permission to delete messages");
                return DeletionOutcome::PartialPermission {
                    deleted: 0,
                    remaining: total,
                };
            }
            Err(e) if e.is_permission_denied() => {
                warn!(channel = %channel, error = %e, "permission check denied");
                return DeletionOutcome::PartialPermission {
                    deleted: 0,
                    remaining: total,
                };
            }
            // Unknown permissions: try anyway and let the requests tell us.
            Err(e) => warn!(channel = %channel, error = %e, "permission check failed"),
        }

        let caps = self.platform.capabilities();
        let ceiling = now - caps.bulk_delete_max_age;
        let (young, old): (Vec<MessageId>, Vec<MessageId>) = {
            let (y, o): (Vec<&SourceMessage>, Vec<&SourceMessage>) =
                messages.iter().partition(|m| m.created_at > ceiling);
            (
                y.into_iter().map(|m| m.id).collect(),
                o.into_iter().map(|m| m.id).collect(),
            )
        };

        let mut tally = Tally::default();
        let run = async {
            for chunk in young.chunks(caps.bulk_delete_limit.max(1)) {
                self.bulk(channel, chunk, &mut tally).await?;
            }
            for id in &old {
                self.single(channel, *id, &mut tally).await?;
            }
            Ok::<(), Halt>(())
        };
        let halted = run.await.is_err();

        info!(
            channel = %channel,
            bulk = young.len(),
            individual = old.len(),
            deleted = tally.deleted,
            failed = tally.failed,
            halted,
            "deletion finished"
        );

        if halted {
            return DeletionOutcome::PartialPermission {
                deleted: tally.deleted,
                remaining: total - tally.deleted,
            };
        }
        match tally.first_error {
            Some(first_error) => DeletionOutcome::PartialError {
                deleted: tally.deleted,
                failed: tally.failed,
                first_error,
            },
            None => DeletionOutcome::Complete {
                deleted: tally.deleted,
            },
        }
    }

    async fn bulk(
        &self,
        channel: ChannelId,
        chunk: &[MessageId],
        tally: &mut Tally,
    ) -> Result<(), Halt> {
        match self.platform.bulk_delete(channel, chunk).await {
            Ok(()) => {
                tally.deleted += chunk.len();
                Ok(())
            }
            Err(e) if e.is_permission_denied() => Err(Halt),
            // Some ids are already gone; settle the chunk one by one.
            Err(e) if e.is_not_found() => {
                for id in chunk {
                    self.single(channel, *id, tally).await?;
                }
                Ok(())
            }
            Err(e) => {
                warn!(channel = %channel, count = chunk.len(), error = %e, "bulk delete failed");
                tally.fail(chunk.len(), &e);
                Ok(())
            }
        }
    }

    async fn single(&self, channel: ChannelId, id: MessageId, tally: &mut Tally) -> Result<(), Halt> {
        let res = self.platform.delete_message(channel, id).await;
        sleep(self.pacing).await;
        match res {
            Ok(()) => tally.deleted += 1,
            Err(e) if e.is_not_found() => tally.deleted += 1,
            Err(e) if e.is_permission_denied() => return Err(Halt),
            Err(e) => {
                warn!(channel = %channel, message = %id, error = %e, "delete failed");
                tally.fail(1, &e);
            }
        }
        Ok(())
    }
}
