//! Batched removal of obsolete nodes.

use crate::config::DEFAULT_BATCH_SIZE;
use crate::error::{Error, Result};
use crate::report::{CleanupOutcome, CleanupReport};
use crate::repository::Session;
use tracing::{debug, info, warn};

/// Deletes reported paths through a caller session, committing every
/// `batch_size` entries.
#[derive(Debug, Clone, Copy)]
pub struct CleanupExecutor {
    batch_size: usize,
}

impl Default for CleanupExecutor {
    fn default() -> Self {
        CleanupExecutor {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl CleanupExecutor {
    /// A batch size of 0 is treated as 1.
    pub fn with_batch_size(batch_size: usize) -> Self {
        CleanupExecutor {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Remove every obsolete path of the report.
    ///
    /// Paths that no longer resolve are skipped, so running the same report
    /// twice is harmless. On failure, deletions staged since the last commit
    /// are discarded and the error carries how many nodes were already
    /// removed for good.
    pub fn cleanup<S: Session>(
        &self,
        session: &mut S,
        report: &CleanupReport,
    ) -> Result<CleanupOutcome> {
        info!(
            count = report.obsolete_paths.len(),
            "starting to remove obsolete nodes"
        );

        let mut outcome = CleanupOutcome::default();
        let mut staged = 0usize;

        match self.run(session, report, &mut outcome, &mut staged) {
            Ok(()) => {
                info!(
                    deleted = outcome.deleted,
                    skipped = outcome.skipped,
                    commits = outcome.commits,
                    "done"
                );
                Ok(outcome)
            }
            Err(err) => {
                warn!(
                    removed = outcome.deleted,
                    discarded = staged,
                    error = %err,
                    "cleanup failed, discarding uncommitted changes"
                );
                session.discard_pending_changes();
                Err(Error::Persistence {
                    removed: outcome.deleted,
                    message: err.to_string(),
                })
            }
        }
    }

    fn run<S: Session>(
        &self,
        session: &mut S,
        report: &CleanupReport,
        outcome: &mut CleanupOutcome,
        staged: &mut usize,
    ) -> Result<()> {
        for (index, path) in report.obsolete_paths.iter().enumerate() {
            match session.get_node(path)? {
                Some(node) => {
                    session.delete(&node)?;
                    *staged += 1;
                }
                None => {
                    debug!(path = %path, "already gone, skipping");
                    outcome.skipped += 1;
                }
            }

            if index % self.batch_size == 0 && session.has_pending_changes() {
                Self::commit(session, outcome, staged)?;
            }
        }

        if session.has_pending_changes() {
            Self::commit(session, outcome, staged)?;
        }
        Ok(())
    }

    fn commit<S: Session>(
        session: &mut S,
        outcome: &mut CleanupOutcome,
        staged: &mut usize,
    ) -> Result<()> {
        info!(pending = *staged, "persisting changes...");
        session.commit()?;
        outcome.deleted += *staged;
        outcome.commits += 1;
        *staged = 0;
        Ok(())
    }
}
