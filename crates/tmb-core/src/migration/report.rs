use serde::Serialize;

use crate::{
    domain::ThreadHandle,
    migration::{deletion::DeletionOutcome, replicator::FailedMove, resolver::ThreadStatus},
};

/// Failures listed individually in the rendered report; the rest are summarized.
const MAX_LISTED_FAILURES: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub moved: usize,
    pub bot_ignored: usize,
    pub failed_moves: Vec<FailedMove>,
    pub thread: ThreadHandle,
    pub thread_status: ThreadStatus,
    pub deletion: DeletionOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// No eligible messages; nothing was created or deleted.
    NothingToMove { bot_ignored: usize },
    Completed(MigrationReport),
    /// An unexpected fault stopped the pipeline. Earlier phases' effects remain.
    Failed { reason: String },
}

impl MigrationOutcome {
    pub fn moved(&self) -> usize {
        match self {
            MigrationOutcome::Completed(r) => r.moved,
            _ => 0,
        }
    }

    pub fn report(&self) -> Option<&MigrationReport> {
        match self {
            MigrationOutcome::Completed(r) => Some(r),
            _ => None,
        }
    }

    /// User-facing text.
    pub fn render(&self) -> String {
        match self {
            MigrationOutcome::NothingToMove { bot_ignored } => {
                let mut s = "No messages to move.".to_string();
                if *bot_ignored > 0 {
                    s.push_str(&format!(" Ignored {}.", plural(*bot_ignored, "bot message")));
                }
                s
            }
            MigrationOutcome::Failed { .. } => {
                "Something went wrong while moving messages. Some messages may already have been copied; check the thread before retrying.".to_string()
            }
            MigrationOutcome::Completed(r) => render_report(r),
        }
    }
}

fn render_report(r: &MigrationReport) -> String {
    let status = match r.thread_status {
        ThreadStatus::Found => "existing thread",
        ThreadStatus::Created => "new thread",
    };
    let mut lines = vec![format!(
        "Moved {} to {} **{}** ({})",
        plural(r.moved, "message"),
        status,
        r.thread.name,
        r.thread.jump_url
    )];

    if r.bot_ignored > 0 {
        lines.push(format!("Ignored {}.", plural(r.bot_ignored, "bot message")));
    }

    if !r.failed_moves.is_empty() {
        lines.push(format!(
            "{} could not be moved and stayed in the channel:",
            plural(r.failed_moves.len(), "message")
        ));
        for f in r.failed_moves.iter().take(MAX_LISTED_FAILURES) {
            lines.push(format!("- {}", f.reason));
        }
        if r.failed_moves.len() > MAX_LISTED_FAILURES {
            lines.push(format!(
                "- …and {} more",
                r.failed_moves.len() - MAX_LISTED_FAILURES
            ));
        }
    }

    lines.push(match &r.deletion {
        DeletionOutcome::Complete { deleted: 0 } => "No originals were removed.".to_string(),
        DeletionOutcome::Complete { .. } => "Originals removed.".to_string(),
        DeletionOutcome::PartialPermission { deleted, remaining } => format!(
            "Removed {deleted} originals; {remaining} left in place: I lack the Manage Messages permission here."
        ),
        DeletionOutcome::PartialError {
            deleted,
            failed,
            first_error,
        } => format!(
            "Removed {deleted} originals; {failed} could not be removed ({first_error})."
        ),
    });

    lines.join("\n")
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}
