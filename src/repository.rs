//! Collaborator interfaces the cleanup core needs from a content repository.
//!
//! Two roles are kept apart: a [`TypeResolver`] has elevated read rights and
//! is only used to check whether resource types still exist, while a
//! [`Session`] belongs to the caller and is the only thing that mutates.

use crate::error::Result;

/// A node of the content tree.
pub trait Node: Sized {
    /// Absolute, `/`-separated path.
    fn path(&self) -> &str;

    /// Declared resource type, possibly empty.
    fn resource_type(&self) -> &str;

    /// Children in repository order.
    fn children(&self) -> Result<Vec<Self>>;
}

/// Read-only handle with elevated privileges.
///
/// Handles are released when dropped, which covers every exit path of the
/// operation that acquired them.
pub trait TypeResolver {
    type Node: Node;

    /// Does the given resource type resolve to something in the repository?
    fn type_exists(&self, resource_type: &str) -> Result<bool>;

    fn get_node(&self, path: &str) -> Result<Option<Self::Node>>;
}

/// Source of short-lived privileged resolvers.
pub trait ResolverFactory {
    type Resolver: TypeResolver;

    /// Acquire a resolver that looks relative resource types up under
    /// `search_paths`, in order.
    fn privileged_resolver(&self, search_paths: &[String]) -> Result<Self::Resolver>;
}

/// Caller-scoped, mutating access to the repository.
///
/// Deletions are staged until [`Session::commit`] persists them.
pub trait Session {
    type Node: Node;

    /// Resolve a path, hiding nodes already staged for deletion.
    fn get_node(&self, path: &str) -> Result<Option<Self::Node>>;

    fn delete(&mut self, node: &Self::Node) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn has_pending_changes(&self) -> bool;

    /// Drop every change staged since the last successful commit.
    fn discard_pending_changes(&mut self);
}
