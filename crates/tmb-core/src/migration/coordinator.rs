use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::{
    config::MigrationSettings,
    domain::SourceMessage,
    messaging::port::{ChatPlatform, InvocationContext},
    migration::{
        collector::MessageCollector,
        deletion::{DeletionOutcome, DeletionScheduler},
        replicator::MessageReplicator,
        report::{MigrationOutcome, MigrationReport},
        request::{MigrationRequest, ResponsePlan},
        resolver::ThreadResolver,
    },
    Result,
};

/// Runs one migration end to end. Holds the injected platform client; cheap to
/// share behind an `Arc`.
pub struct MigrationCoordinator {
    platform: Arc<dyn ChatPlatform>,
    settings: MigrationSettings,
    clock: fn() -> DateTime<Utc>,
}

impl MigrationCoordinator {
    pub fn new(platform: Arc<dyn ChatPlatform>, settings: MigrationSettings) -> Self {
        Self {
            platform,
            settings,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock used for the bulk-delete age ceiling.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &MigrationSettings {
        &self.settings
    }

    /// Run the pipeline. Never fails: unexpected faults become `Failed`.
    pub async fn run(&self, req: &MigrationRequest) -> MigrationOutcome {
        info!(
            channel = %req.channel(),
            count = req.count(),
            thread = %req.thread().name,
            visibility = req.thread().visibility.as_str(),
            "migration started"
        );

        let outcome = match self.try_run(req).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(channel = %req.channel(), error = %e, "migration failed");
                MigrationOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        match serde_json::to_string(&outcome) {
            Ok(json) => info!(channel = %req.channel(), report = %json, "migration finished"),
            Err(e) => warn!(error = %e, "failed to serialize migration report"),
        }
        outcome
    }

    /// Acknowledge the invocation, run, and deliver the report per the
    /// request's response plan.
    pub async fn execute(
        &self,
        req: &MigrationRequest,
        invocation: &dyn InvocationContext,
    ) -> MigrationOutcome {
        self.execute_when(req, invocation, std::future::ready(())).await
    }

    /// Like [`execute`](Self::execute), but waits on `ready` between the
    /// acknowledgment and the run. The invocation is acknowledged before any
    /// waiting, so a queued request does not outlive its response window.
    /// Whatever `ready` yields is held until the report is delivered.
    pub async fn execute_when<G>(
        &self,
        req: &MigrationRequest,
        invocation: &dyn InvocationContext,
        ready: impl Future<Output = G>,
    ) -> MigrationOutcome {
        let plan = ResponsePlan::for_request(req);
        if let Err(e) = invocation.acknowledge(plan.ack_ephemeral).await {
            warn!(error = %e, "failed to acknowledge invocation");
        }

        let _guard = ready.await;
        let outcome = self.run(req).await;

        if let Err(e) = invocation.report(&outcome.render(), plan.delivery).await {
            error!(error = %e, "failed to deliver migration report");
        }
        if plan.retract_ack {
            if let Err(e) = invocation.retract_acknowledgment().await {
                warn!(error = %e, "failed to retract acknowledgment");
            }
        }
        outcome
    }

    async fn try_run(&self, req: &MigrationRequest) -> Result<MigrationOutcome> {
        let platform = self.platform.as_ref();

        let collected = MessageCollector::new(platform, &self.settings)
            .collect_before(req.channel(), req.count(), req.history_before())
            .await?;
        if collected.is_empty() {
            info!(channel = %req.channel(), bot_ignored = collected.bot_ignored, "nothing to move");
            return Ok(MigrationOutcome::NothingToMove {
                bot_ignored: collected.bot_ignored,
            });
        }

        let announcement = self
            .settings
            .announcement(&req.thread().name, collected.messages.len());
        let resolved = ThreadResolver::new(platform)
            .resolve(req.channel(), req.thread(), &announcement)
            .await?;

        let replayed = MessageReplicator::new(platform, &self.settings)
            .replay(&resolved.thread, &collected.messages)
            .await;

        // Only originals with a copy in the thread are removed.
        let moved: Vec<SourceMessage> = collected
            .messages
            .iter()
            .filter(|m| replayed.moved.contains(&m.id))
            .cloned()
            .collect();
        let deletion = if moved.is_empty() {
            info!(channel = %req.channel(), "nothing replayed; originals left in place");
            DeletionOutcome::Complete { deleted: 0 }
        } else {
            DeletionScheduler::new(platform, self.settings.delete_pacing)
                .delete_at(req.channel(), &moved, (self.clock)())
                .await
        };

        Ok(MigrationOutcome::Completed(MigrationReport {
            moved: replayed.moved.len(),
            bot_ignored: collected.bot_ignored,
            failed_moves: replayed.failed,
            thread: resolved.thread,
            thread_status: resolved.status,
            deletion,
        }))
    }
}
