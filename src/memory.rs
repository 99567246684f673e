//! In-memory content repository, optionally backed by a JSON file.
//!
//! Content documents follow the usual JSON content-loader layout: object
//! properties are child nodes, in document order, and the resource type is
//! read from `sling:resourceType` (falling back to `jcr:primaryType`).
//!
//! ```json
//! { "toClean": { "notexisting": { "sling:resourceType": "/apps/blah/gone" } } }
//! ```

use crate::error::{Error, Result};
use crate::repository::{Node, ResolverFactory, Session, TypeResolver};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

pub const RESOURCE_TYPE_PROPERTY: &str = "sling:resourceType";
pub const PRIMARY_TYPE_PROPERTY: &str = "jcr:primaryType";

#[derive(Debug, Clone, Default)]
struct NodeRecord {
    properties: Map<String, Value>,
    children: Vec<String>,
}

impl NodeRecord {
    fn resource_type(&self) -> &str {
        [RESOURCE_TYPE_PROPERTY, PRIMARY_TYPE_PROPERTY]
            .iter()
            .find_map(|key| self.properties.get(*key).and_then(Value::as_str))
            .unwrap_or("")
    }
}

/// Path-indexed node table. The root `/` always exists.
#[derive(Debug, Clone)]
struct Tree {
    nodes: HashMap<String, NodeRecord>,
}

impl Default for Tree {
    fn default() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), NodeRecord::default());
        Tree { nodes }
    }
}

impl Tree {
    fn get(&self, path: &str) -> Option<&NodeRecord> {
        self.nodes.get(path)
    }

    /// Create the node at `path` (and missing ancestors) if absent.
    fn ensure(&mut self, path: &str) -> &mut NodeRecord {
        if !self.nodes.contains_key(path) {
            if let Some((parent, name)) = split_parent(path) {
                let parent_record = self.ensure(&parent);
                parent_record.children.push(name.to_string());
            }
            self.nodes.insert(path.to_string(), NodeRecord::default());
        }
        self.nodes.entry(path.to_string()).or_default()
    }

    fn load(&mut self, path: &str, document: &Map<String, Value>) {
        let mut children = Vec::new();
        {
            let record = self.ensure(path);
            for (key, value) in document {
                match value {
                    Value::Object(child) => children.push((key.clone(), child)),
                    other => {
                        record.properties.insert(key.clone(), other.clone());
                    }
                }
            }
        }
        for (name, child) in children {
            self.load(&join(path, &name), child);
        }
    }

    /// Remove `path` and everything below it.
    fn remove(&mut self, path: &str) {
        if path == "/" || !self.nodes.contains_key(path) {
            return;
        }
        let subtree = format!("{}/", path);
        self.nodes
            .retain(|candidate, _| candidate != path && !candidate.starts_with(&subtree));
        if let Some((parent, name)) = split_parent(path) {
            if let Some(record) = self.nodes.get_mut(&parent) {
                record.children.retain(|child| child != name);
            }
        }
    }

    fn to_json(&self, path: &str) -> Value {
        let mut document = Map::new();
        if let Some(record) = self.get(path) {
            document.extend(record.properties.clone());
            for name in &record.children {
                document.insert(name.clone(), self.to_json(&join(path, name)));
            }
        }
        Value::Object(document)
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Node names are single path segments.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/')
}

fn check_child_names(path: &str, document: &Map<String, Value>) -> Result<()> {
    for (key, value) in document {
        if let Value::Object(child) = value {
            if !is_valid_name(key) {
                return Err(Error::Content(format!(
                    "invalid child name {:?} under {}",
                    key, path
                )));
            }
            check_child_names(&join(path, key), child)?;
        }
    }
    Ok(())
}

fn split_parent(path: &str) -> Option<(String, &str)> {
    if path == "/" {
        return None;
    }
    let index = path.rfind('/')?;
    let parent = if index == 0 { "/" } else { &path[..index] };
    Some((parent.to_string(), &path[index + 1..]))
}

#[derive(Debug)]
struct Inner {
    tree: RwLock<Tree>,
    file: Option<PathBuf>,
    open_resolvers: AtomicUsize,
}

/// Shared content repository. Clones refer to the same content.
#[derive(Debug, Clone)]
pub struct ContentRepository {
    inner: Arc<Inner>,
}

impl Default for ContentRepository {
    fn default() -> Self {
        ContentRepository::new()
    }
}

impl ContentRepository {
    /// An empty repository that is never written to disk.
    pub fn new() -> Self {
        ContentRepository::with_file(None)
    }

    fn with_file(file: Option<PathBuf>) -> Self {
        ContentRepository {
            inner: Arc::new(Inner {
                tree: RwLock::new(Tree::default()),
                file,
                open_resolvers: AtomicUsize::new(0),
            }),
        }
    }

    /// Load a repository from a JSON file; commits are written back to it.
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let document: Value = serde_json::from_str(&content)?;
        let repo = ContentRepository::with_file(Some(path.to_path_buf()));
        repo.load_json(&document, "/")?;
        Ok(repo)
    }

    /// Mount a JSON content document at `path`, creating missing ancestors.
    pub fn load_json(&self, document: &Value, path: &str) -> Result<()> {
        let Value::Object(document) = document else {
            return Err(Error::Content(format!(
                "content for {} must be a JSON object",
                path
            )));
        };
        if !path.starts_with('/') {
            return Err(Error::Content(format!("{} is not an absolute path", path)));
        }
        let path = normalize(path);
        if path != "/" && !path[1..].split('/').all(is_valid_name) {
            return Err(Error::Content(format!("invalid mount path {}", path)));
        }
        check_child_names(&path, document)?;
        self.write_tree().load(&path, document);
        Ok(())
    }

    /// A caller session on this repository.
    pub fn session(&self) -> ContentSession {
        ContentSession {
            repo: self.clone(),
            pending: Vec::new(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.read_tree().get(&normalize(path)).is_some()
    }

    /// Number of nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.read_tree().nodes.len()
    }

    /// Privileged resolvers currently acquired and not yet dropped.
    pub fn open_resolvers(&self) -> usize {
        self.inner.open_resolvers.load(Ordering::SeqCst)
    }

    pub fn to_json(&self) -> Value {
        self.read_tree().to_json("/")
    }

    /// Write the whole repository back to its file, if it has one.
    pub fn save(&self) -> Result<()> {
        let tree = self.read_tree();
        self.persist(&tree)
    }

    fn persist(&self, tree: &Tree) -> Result<()> {
        let Some(file) = &self.inner.file else {
            return Ok(());
        };
        let dir = file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        // Write next to the target and rename over it
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &tree.to_json("/"))?;
        tmp.write_all(b"\n")?;
        tmp.persist(file).map_err(|e| Error::Io(e.error))?;
        debug!(file = %file.display(), "content written");
        Ok(())
    }

    fn node(&self, path: &str) -> Option<ContentNode> {
        let path = normalize(path);
        let tree = self.read_tree();
        tree.get(&path).map(|record| ContentNode {
            repo: self.clone(),
            resource_type: record.resource_type().to_string(),
            path,
        })
    }

    fn read_tree(&self) -> RwLockReadGuard<'_, Tree> {
        self.inner.tree.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_tree(&self) -> RwLockWriteGuard<'_, Tree> {
        self.inner.tree.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl ResolverFactory for ContentRepository {
    type Resolver = ContentResolver;

    fn privileged_resolver(&self, search_paths: &[String]) -> Result<ContentResolver> {
        self.inner.open_resolvers.fetch_add(1, Ordering::SeqCst);
        Ok(ContentResolver {
            repo: self.clone(),
            search_paths: search_paths.iter().map(|p| normalize(p)).collect(),
        })
    }
}

/// A node handle. Reads go to the live repository.
#[derive(Debug, Clone)]
pub struct ContentNode {
    repo: ContentRepository,
    path: String,
    resource_type: String,
}

impl Node for ContentNode {
    fn path(&self) -> &str {
        &self.path
    }

    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn children(&self) -> Result<Vec<Self>> {
        let names = match self.repo.read_tree().get(&self.path) {
            Some(record) => record.children.clone(),
            None => return Ok(Vec::new()),
        };
        Ok(names
            .iter()
            .filter_map(|name| self.repo.node(&join(&self.path, name)))
            .collect())
    }
}

/// Privileged, read-only handle. Released on drop.
#[derive(Debug)]
pub struct ContentResolver {
    repo: ContentRepository,
    search_paths: Vec<String>,
}

impl TypeResolver for ContentResolver {
    type Node = ContentNode;

    /// Absolute types resolve to the node at that path, relative ones are
    /// looked up under each search path.
    fn type_exists(&self, resource_type: &str) -> Result<bool> {
        let resource_type = resource_type.trim();
        if resource_type.is_empty() {
            return Ok(false);
        }
        if resource_type.starts_with('/') {
            return Ok(self.repo.contains(resource_type));
        }
        Ok(self
            .search_paths
            .iter()
            .any(|base| self.repo.contains(&join(base, resource_type))))
    }

    fn get_node(&self, path: &str) -> Result<Option<ContentNode>> {
        Ok(self.repo.node(path))
    }
}

impl Drop for ContentResolver {
    fn drop(&mut self) {
        self.repo.inner.open_resolvers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Caller session staging deletions until commit.
#[derive(Debug)]
pub struct ContentSession {
    repo: ContentRepository,
    pending: Vec<String>,
}

impl ContentSession {
    fn is_staged(&self, path: &str) -> bool {
        self.pending.iter().any(|staged| {
            path == staged
                || (path.starts_with(staged.as_str())
                    && path.as_bytes().get(staged.len()) == Some(&b'/'))
        })
    }
}

impl Session for ContentSession {
    type Node = ContentNode;

    fn get_node(&self, path: &str) -> Result<Option<ContentNode>> {
        Ok(self.repo.node(path).filter(|node| !self.is_staged(&node.path)))
    }

    fn delete(&mut self, node: &ContentNode) -> Result<()> {
        if node.path == "/" {
            return Err(Error::Content("the root node cannot be deleted".to_string()));
        }
        if !self.is_staged(&node.path) {
            self.pending.push(node.path.clone());
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut tree = self.repo.write_tree();
        let mut next = tree.clone();
        for path in &self.pending {
            next.remove(path);
        }
        self.repo.persist(&next)?;
        *tree = next;
        debug!(removed = self.pending.len(), "changes committed");
        self.pending.clear();
        Ok(())
    }

    fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    fn discard_pending_changes(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repository() -> ContentRepository {
        let repo = ContentRepository::new();
        repo.load_json(&json!({ "blah": { "component": {} } }), "/apps")
            .unwrap();
        repo.load_json(&json!({ "text": {} }), "/libs/foundation")
            .unwrap();
        repo.load_json(
            &json!({
                "jcr:primaryType": "nt:unstructured",
                "page": {
                    "sling:resourceType": "/apps/blah/component",
                    "title": "hello",
                    "par": { "sling:resourceType": "foundation/text" }
                },
                "other": { "jcr:primaryType": "nt:folder" }
            }),
            "/content",
        )
        .unwrap();
        repo
    }

    fn search_paths(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_load_preserves_child_order_and_types() {
        let repo = repository();
        let resolver = repo.privileged_resolver(&[]).unwrap();
        let content = resolver.get_node("/content").unwrap().unwrap();
        assert_eq!(content.resource_type(), "nt:unstructured");

        let children = content.children().unwrap();
        let paths: Vec<&str> = children.iter().map(|c| c.path()).collect();
        assert_eq!(paths, vec!["/content/page", "/content/other"]);
        assert_eq!(children[0].resource_type(), "/apps/blah/component");
        assert_eq!(children[1].resource_type(), "nt:folder");
    }

    #[test]
    fn test_type_resolution() {
        let repo = repository();
        let resolver = repo
            .privileged_resolver(&search_paths(&["/apps", "/libs/"]))
            .unwrap();
        assert!(resolver.type_exists("/apps/blah/component").unwrap());
        assert!(resolver.type_exists("blah/component").unwrap());
        assert!(resolver.type_exists("foundation/text").unwrap());
        assert!(!resolver.type_exists("/apps/blah/gone").unwrap());
        assert!(!resolver.type_exists("").unwrap());

        let resolver = repo.privileged_resolver(&search_paths(&["/libs"])).unwrap();
        assert!(!resolver.type_exists("blah/component").unwrap());
        assert!(resolver.type_exists("foundation/text").unwrap());
        assert!(resolver.type_exists("/apps/blah/component").unwrap());
    }

    #[test]
    fn test_resolvers_are_counted_until_dropped() {
        let repo = repository();
        let first = repo.privileged_resolver(&[]).unwrap();
        let second = repo.privileged_resolver(&[]).unwrap();
        assert_eq!(repo.open_resolvers(), 2);
        drop(first);
        drop(second);
        assert_eq!(repo.open_resolvers(), 0);
    }

    #[test]
    fn test_session_stages_until_commit() {
        let repo = repository();
        let mut session = repo.session();
        let page = session.get_node("/content/page").unwrap().unwrap();

        session.delete(&page).unwrap();
        assert!(session.has_pending_changes());
        assert!(session.get_node("/content/page/par").unwrap().is_none());
        assert!(repo.contains("/content/page/par"));

        session.commit().unwrap();
        assert!(!session.has_pending_changes());
        assert!(!repo.contains("/content/page"));
        assert!(!repo.contains("/content/page/par"));
        assert!(repo.contains("/content/other"));
    }

    #[test]
    fn test_discard_drops_staged_deletions() {
        let repo = repository();
        let mut session = repo.session();
        let page = session.get_node("/content/page").unwrap().unwrap();

        session.delete(&page).unwrap();
        session.discard_pending_changes();
        session.commit().unwrap();
        assert!(repo.contains("/content/page"));
    }

    #[test]
    fn test_sibling_with_common_prefix_is_not_hidden() {
        let repo = ContentRepository::new();
        repo.load_json(&json!({ "a": {}, "ab": {} }), "/content")
            .unwrap();
        let mut session = repo.session();
        let a = session.get_node("/content/a").unwrap().unwrap();
        session.delete(&a).unwrap();
        assert!(session.get_node("/content/ab").unwrap().is_some());
    }

    #[test]
    fn test_commit_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("content.json");
        fs::write(
            &file,
            r#"{"content": {"a": {"sling:resourceType": "x"}, "b": {"title": "keep"}}}"#,
        )
        .unwrap();

        let repo = ContentRepository::open(&file).unwrap();
        let mut session = repo.session();
        let a = session.get_node("/content/a").unwrap().unwrap();
        session.delete(&a).unwrap();
        session.commit().unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(written, json!({ "content": { "b": { "title": "keep" } } }));
    }

    #[test]
    fn test_load_rejects_invalid_child_names() {
        for name in ["", ".", "..", "a/b"] {
            let repo = ContentRepository::new();
            let mut document = Map::new();
            document.insert(name.to_string(), json!({}));
            document.insert(
                "a".to_string(),
                json!({ "sling:resourceType": "/apps/blah/gone" }),
            );

            let result = repo.load_json(&Value::Object(document), "/content");
            assert!(
                matches!(result, Err(Error::Content(_))),
                "child name {:?} should be rejected",
                name
            );
            assert!(!repo.contains("/content"), "nothing is loaded on error");
        }
    }

    #[test]
    fn test_nested_invalid_child_name_is_rejected() {
        let repo = ContentRepository::new();
        let result = repo.load_json(&json!({ "a": { "b": { "": {} } } }), "/content");
        assert!(matches!(result, Err(Error::Content(_))));
        assert_eq!(repo.node_count(), 1);
    }

    #[test]
    fn test_load_rejects_invalid_mount_path() {
        let repo = ContentRepository::new();
        for path in ["/content//a", "/content/../a", "/./content"] {
            assert!(matches!(
                repo.load_json(&json!({}), path),
                Err(Error::Content(_))
            ));
        }
        assert!(repo.load_json(&json!({}), "/content/").is_ok());
        assert!(repo.contains("/content"));
    }

    #[test]
    fn test_load_rejects_non_object() {
        let repo = ContentRepository::new();
        assert!(matches!(
            repo.load_json(&json!([1, 2]), "/content"),
            Err(Error::Content(_))
        ));
        assert!(matches!(
            repo.load_json(&json!({}), "content"),
            Err(Error::Content(_))
        ));
    }
}
