//! Obsolete node discovery, over a subtree or an explicit list of paths.

use crate::checker::ObsolescenceChecker;
use crate::error::{Error, Result};
use crate::report::CleanupReport;
use crate::repository::{Node, TypeResolver};
use tracing::debug;

/// Walk the tree under `root` depth-first and list obsolete paths:
/// - an obsolete node is added to the report and its children are not visited
/// - any other node has its children walked, in repository order
///
/// Fails with [`Error::DepthLimit`] when a node sits deeper than `max_depth`.
pub fn collect_obsolete_paths<R, N>(
    report: &mut CleanupReport,
    checker: &ObsolescenceChecker<'_, R>,
    root: N,
    max_depth: usize,
) -> Result<()>
where
    R: TypeResolver,
    N: Node,
{
    let mut stack = vec![(root, 0usize)];

    while let Some((node, depth)) = stack.pop() {
        if depth > max_depth {
            return Err(Error::DepthLimit {
                path: node.path().to_string(),
                limit: max_depth,
            });
        }

        report.traverse();

        if checker.is_obsolete(&node)? {
            debug!(path = node.path(), resource_type = node.resource_type(), "obsolete node");
            report.add(node.path());
            continue;
        }

        // Reversed so the first child is popped first
        let children = node.children()?;
        stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }

    Ok(())
}

/// Classify each requested path on its own.
///
/// Paths are trimmed before lookup. Entries that don't resolve, or resolve to
/// a node that is not obsolete, are recorded as ignored in their original
/// untrimmed form.
pub fn collect_from_paths<R, S>(
    report: &mut CleanupReport,
    checker: &ObsolescenceChecker<'_, R>,
    paths: &[S],
) -> Result<()>
where
    R: TypeResolver,
    S: AsRef<str>,
{
    for raw in paths {
        let raw = raw.as_ref();
        let path = raw.trim();
        report.traverse();

        let node = if path.is_empty() {
            None
        } else {
            checker.resolver().get_node(path)?
        };

        match node {
            Some(node) if checker.is_obsolete(&node)? => report.add(node.path()),
            _ => {
                debug!(path = raw, "ignoring requested path");
                report.add_ignored(raw);
            }
        }
    }

    Ok(())
}

/// Split a comma-separated path list, keeping each piece untrimmed.
pub fn split_path_list(list: &str) -> Vec<String> {
    list.split(',')
        .filter(|piece| !piece.trim().is_empty())
        .map(str::to_string)
        .collect()
}
