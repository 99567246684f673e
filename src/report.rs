//! Per-call results of obsolete node discovery and removal.

use std::fmt;

/// Obsolete and ignored paths collected by a single report-building call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Obsolete node paths, in discovery order
    pub obsolete_paths: Vec<String>,
    /// Requested paths that were skipped because they don't exist or aren't obsolete
    pub ignored_paths: Vec<String>,
    /// Number of nodes examined
    pub visited: u64,
}

impl CleanupReport {
    pub fn new() -> Self {
        CleanupReport::default()
    }

    pub fn add(&mut self, path: impl Into<String>) {
        self.obsolete_paths.push(path.into());
    }

    pub fn add_ignored(&mut self, path: impl Into<String>) {
        self.ignored_paths.push(path.into());
    }

    pub fn traverse(&mut self) {
        self.visited += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.obsolete_paths.is_empty()
    }
}

/// Plain-text listing: counts first, then one path per line.
impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} nodes traversed, {} obsolete nodes",
            self.visited,
            self.obsolete_paths.len()
        )?;
        for path in &self.obsolete_paths {
            writeln!(f, "{}", path)?;
        }
        if !self.ignored_paths.is_empty() {
            writeln!(f, "{} ignored paths", self.ignored_paths.len())?;
            for path in &self.ignored_paths {
                writeln!(f, "{}", path)?;
            }
        }
        Ok(())
    }
}

/// What a cleanup run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupOutcome {
    /// Nodes deleted and committed
    pub deleted: usize,
    /// Paths that no longer resolved
    pub skipped: usize,
    pub commits: usize,
}
