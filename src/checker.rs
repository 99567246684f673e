//! Obsolescence check for a single node.

use crate::error::Result;
use crate::repository::{Node, TypeResolver};
use crate::rules::InclusionRules;

/// Classifies nodes against one rule snapshot and one privileged resolver.
pub struct ObsolescenceChecker<'a, R: TypeResolver> {
    rules: &'a InclusionRules,
    resolver: &'a R,
}

impl<'a, R: TypeResolver> ObsolescenceChecker<'a, R> {
    pub fn new(rules: &'a InclusionRules, resolver: &'a R) -> Self {
        ObsolescenceChecker { rules, resolver }
    }

    pub fn rules(&self) -> &InclusionRules {
        self.rules
    }

    pub fn resolver(&self) -> &R {
        self.resolver
    }

    /// Checked with the privileged resolver: the node's own session might not
    /// be able to read the type definition.
    pub fn type_exists<N: Node>(&self, node: &N) -> Result<bool> {
        self.resolver.type_exists(node.resource_type())
    }

    /// A node is obsolete when its type is checked and no longer resolves.
    pub fn is_obsolete<N: Node>(&self, node: &N) -> Result<bool> {
        if !self.rules.is_included(node.resource_type()) {
            return Ok(false);
        }
        Ok(!self.type_exists(node)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ContentRepository;
    use crate::repository::ResolverFactory;
    use serde_json::json;

    #[test]
    fn test_is_obsolete() {
        let repo = ContentRepository::new();
        repo.load_json(&json!({ "blah": { "there": {} } }), "/apps")
            .unwrap();
        repo.load_json(
            &json!({
                "missing": { "sling:resourceType": "/apps/blah/gone" },
                "present": { "sling:resourceType": "/apps/blah/there" },
                "unchecked": { "sling:resourceType": "/apps/other/gone" },
                "blank": {}
            }),
            "/content",
        )
        .unwrap();
        let rules = InclusionRules::new(["/apps/blah"], Vec::<String>::new());
        let resolver = repo.privileged_resolver(&[]).unwrap();
        let checker = ObsolescenceChecker::new(&rules, &resolver);

        let node = |path: &str| resolver.get_node(path).unwrap().unwrap();

        assert!(checker.is_obsolete(&node("/content/missing")).unwrap());
        assert!(!checker.is_obsolete(&node("/content/present")).unwrap());
        assert!(!checker.is_obsolete(&node("/content/unchecked")).unwrap());
        assert!(!checker.is_obsolete(&node("/content/blank")).unwrap());
        assert!(!checker.type_exists(&node("/content/unchecked")).unwrap());
    }
}
