//! typecleanup - Obsolete Node Cleaner
//!
//! Finds content nodes whose resource type falls within the configured
//! inclusion prefixes (and outside the exclusion prefixes) but no longer
//! resolves in the repository, and removes them in committed batches.
//!
//! ## Architecture
//!
//! - [`rules`] decides which resource types are checked at all
//! - [`checker`] decides whether one node is obsolete, using a privileged resolver
//! - [`traverse`] walks a subtree or an explicit path list into a [`CleanupReport`]
//! - [`executor`] deletes reported nodes through the caller's session
//! - [`service`] ties these together behind [`TypeCleanupService`]

pub mod checker;
pub mod config;
pub mod error;
pub mod executor;
pub mod memory;
pub mod report;
pub mod repository;
pub mod rules;
pub mod service;
pub mod traverse;

// Re-export commonly used items
pub use checker::ObsolescenceChecker;
pub use config::{Config, Settings, SettingsHandle};
pub use error::{Error, Result};
pub use executor::CleanupExecutor;
pub use memory::{ContentNode, ContentRepository, ContentResolver, ContentSession};
pub use report::{CleanupOutcome, CleanupReport};
pub use repository::{Node, ResolverFactory, Session, TypeResolver};
pub use rules::InclusionRules;
pub use service::TypeCleanupService;
pub use traverse::split_path_list;
