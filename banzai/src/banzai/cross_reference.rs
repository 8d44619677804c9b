//! Resolution of the namespace a reference string points into.
//!
//! `other-group/other-project#5` names its project explicitly; `#5` relies on
//! the context's default parent. Issue, merge request, commit and label
//! references only ever resolve to projects. Milestones and epics may also
//! live in groups.

use std::collections::HashMap;

use crate::banzai::store::DataStore;
use crate::banzai::types::Parent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionScope {
    Projects,
    Namespaces,
}

pub struct ParentResolver<'a> {
    store: &'a dyn DataStore,
    default: Option<Parent>,
    scope: ResolutionScope,
    cache: HashMap<String, Option<Parent>>,
    lookups: usize,
}

impl<'a> ParentResolver<'a> {
    pub fn new(store: &'a dyn DataStore, default: Option<Parent>, scope: ResolutionScope) -> Self {
        Self {
            store,
            default,
            scope,
            cache: HashMap::new(),
            lookups: 0,
        }
    }

    /// The parent named by `path`, or the default parent when no path was
    /// written. A path that names nothing resolves to nothing.
    pub fn resolve(&mut self, path: Option<&str>) -> Option<Parent> {
        match path.filter(|p| !p.is_empty()) {
            Some(path) => {
                let found = self.lookup(path);
                if found.is_none() {
                    log::debug!("{path} did not resolve, leaving the reference unlinked");
                }
                found
            }
            None => self.default.clone(),
        }
    }

    pub fn default_parent(&self) -> Option<&Parent> {
        self.default.as_ref()
    }

    /// Store lookups made so far; repeated paths are served from the cache.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    fn lookup(&mut self, path: &str) -> Option<Parent> {
        if let Some(hit) = self.cache.get(path) {
            return hit.clone();
        }

        self.lookups += 1;
        let found = self
            .store
            .find_project_by_full_path(path)
            .map(Parent::Project)
            .or_else(|| match self.scope {
                ResolutionScope::Namespaces => {
                    self.store.find_group_by_full_path(path).map(Parent::Group)
                }
                ResolutionScope::Projects => None,
            });

        self.cache.insert(path.to_string(), found.clone());
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banzai::store::MemoryStore;
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = r#"
groups:
  - { id: 1, full_path: other-group }
projects:
  - { id: 10, full_path: my-group/my-project }
  - { id: 11, full_path: other-group/other-project, group_id: 1 }
"#;

    fn default_parent(store: &MemoryStore) -> Option<Parent> {
        store.project("my-group/my-project").map(Parent::Project)
    }

    #[test]
    fn explicit_namespace_wins_over_default() {
        let store = MemoryStore::from_yaml(FIXTURE).unwrap();
        let mut resolver =
            ParentResolver::new(&store, default_parent(&store), ResolutionScope::Projects);

        let parent = resolver.resolve(Some("other-group/other-project")).unwrap();

        assert_eq!(parent.full_path(), "other-group/other-project");
    }

    #[test]
    fn unresolved_path_does_not_fall_back() {
        let store = MemoryStore::from_yaml(FIXTURE).unwrap();
        let mut resolver =
            ParentResolver::new(&store, default_parent(&store), ResolutionScope::Projects);

        assert_eq!(resolver.resolve(Some("nobody/nothing")), None);
    }

    #[test]
    fn missing_path_uses_default() {
        let store = MemoryStore::from_yaml(FIXTURE).unwrap();
        let mut resolver =
            ParentResolver::new(&store, default_parent(&store), ResolutionScope::Projects);

        assert_eq!(
            resolver.resolve(None).map(|p| p.full_path().to_string()),
            Some("my-group/my-project".to_string())
        );
    }

    #[test]
    fn repeated_paths_hit_the_cache() {
        let store = MemoryStore::from_yaml(FIXTURE).unwrap();
        let mut resolver = ParentResolver::new(&store, None, ResolutionScope::Projects);

        resolver.resolve(Some("other-group/other-project"));
        resolver.resolve(Some("other-group/other-project"));
        resolver.resolve(Some("missing/project"));
        resolver.resolve(Some("missing/project"));

        assert_eq!(resolver.lookups(), 2);
    }

    #[test]
    fn groups_only_resolve_in_namespace_scope() {
        let store = MemoryStore::from_yaml(FIXTURE).unwrap();

        let mut projects = ParentResolver::new(&store, None, ResolutionScope::Projects);
        assert_eq!(projects.resolve(Some("other-group")), None);

        let mut namespaces = ParentResolver::new(&store, None, ResolutionScope::Namespaces);
        assert!(matches!(
            namespaces.resolve(Some("other-group")),
            Some(Parent::Group(_))
        ));
    }
}
