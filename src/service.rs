//! Caller-facing entry point for finding and removing obsolete nodes.
//!
//! A node is obsolete when:
//! - its resource type is within the configured inclusions and not in the
//!   configured exclusions
//! - its resource type doesn't exist in the repository

use crate::checker::ObsolescenceChecker;
use crate::config::{Config, Settings, SettingsHandle};
use crate::error::Result;
use crate::executor::CleanupExecutor;
use crate::report::{CleanupOutcome, CleanupReport};
use crate::repository::{Node, ResolverFactory, Session};
use crate::traverse::{collect_from_paths, collect_obsolete_paths};
use std::sync::Arc;
use tracing::{debug, error};

pub struct TypeCleanupService<F: ResolverFactory> {
    factory: F,
    settings: SettingsHandle,
}

impl<F: ResolverFactory> TypeCleanupService<F> {
    pub fn new(factory: F, config: &Config) -> Self {
        TypeCleanupService {
            factory,
            settings: SettingsHandle::new(config.settings()),
        }
    }

    /// Apply a new configuration. Operations already running keep the
    /// settings they started with.
    pub fn configure(&self, config: &Config) {
        self.settings.replace(config.settings());
    }

    /// Without inclusions, no node is ever reported.
    pub fn is_configured(&self) -> bool {
        self.settings.snapshot().rules.is_configured()
    }

    /// Settings the next operation will run with.
    pub fn settings(&self) -> Arc<Settings> {
        self.settings.snapshot()
    }

    /// Collect obsolete nodes in the subtree under `root`.
    ///
    /// The privileged resolver is released whether the walk succeeds or not.
    pub fn build_report<N: Node>(&self, root: N) -> Result<CleanupReport> {
        let settings = self.settings.snapshot();
        let mut report = CleanupReport::new();
        if !settings.rules.is_configured() {
            debug!("not configured, skipping traversal");
            return Ok(report);
        }

        let root_path = root.path().to_string();
        let resolver = self.factory.privileged_resolver(&settings.search_paths)?;
        let checker = ObsolescenceChecker::new(&settings.rules, &resolver);

        if let Err(err) = collect_obsolete_paths(&mut report, &checker, root, settings.max_depth) {
            error!(
                root = %root_path,
                visited = report.visited,
                error = %err,
                "unable to properly retrieve the paths"
            );
            return Err(err);
        }
        Ok(report)
    }

    /// Classify an explicit list of paths, e.g. submitted by an operator.
    pub fn build_report_from_paths<S: AsRef<str>>(&self, paths: &[S]) -> Result<CleanupReport> {
        let settings = self.settings.snapshot();
        let mut report = CleanupReport::new();
        if !settings.rules.is_configured() {
            debug!("not configured, skipping path list");
            return Ok(report);
        }

        let resolver = self.factory.privileged_resolver(&settings.search_paths)?;
        let checker = ObsolescenceChecker::new(&settings.rules, &resolver);
        if let Err(err) = collect_from_paths(&mut report, &checker, paths) {
            error!(visited = report.visited, error = %err, "unable to resolve requested paths");
            return Err(err);
        }
        Ok(report)
    }

    /// Remove the reported nodes through the caller's own session.
    pub fn cleanup<S: Session>(
        &self,
        session: &mut S,
        report: &CleanupReport,
    ) -> Result<CleanupOutcome> {
        let batch_size = self.settings.snapshot().batch_size;
        CleanupExecutor::with_batch_size(batch_size).cleanup(session, report)
    }

    /// Find and remove obsolete nodes under `root` in one go.
    pub fn remove_obsolete<S, N>(&self, session: &mut S, root: N) -> Result<CleanupOutcome>
    where
        S: Session,
        N: Node,
    {
        let report = self.build_report(root)?;
        self.cleanup(session, &report)
    }
}
