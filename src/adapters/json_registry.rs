//! Declaration registry backed by a JSON index produced by a source scanner.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DeclLocation, Region};
use crate::domain::ports::{DeclarationRegistry, InitializerCandidate};

/// One declaration of the target module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationRecord {
    pub location: DeclLocation,
    /// Visible outside the target module.
    #[serde(default)]
    pub public: bool,
    /// Declared type (or return type) is a reference type.
    #[serde(default = "default_true")]
    pub non_primitive: bool,
    #[serde(default)]
    pub super_member: Option<DeclLocation>,
    #[serde(default)]
    pub impacted_regions: BTreeSet<Region>,
}

const fn default_true() -> bool {
    true
}

/// On-disk shape of the declaration index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeclarationIndex {
    #[serde(default)]
    pub declarations: Vec<DeclarationRecord>,
    /// Initializer candidates per fully qualified class name.
    #[serde(default)]
    pub initializers: BTreeMap<String, Vec<InitializerCandidate>>,
}

#[derive(Debug, Default)]
pub struct JsonDeclarationRegistry {
    records: BTreeMap<DeclLocation, DeclarationRecord>,
    by_region: HashMap<Region, DeclLocation>,
    initializers: BTreeMap<String, Vec<InitializerCandidate>>,
}

impl JsonDeclarationRegistry {
    pub fn from_index(index: DeclarationIndex) -> Self {
        let mut by_region = HashMap::new();
        let mut records = BTreeMap::new();
        for record in index.declarations {
            if !record.location.is_parameter() {
                by_region.insert(record.location.region(), record.location.clone());
            }
            records.insert(record.location.clone(), record);
        }
        Self {
            records,
            by_region,
            initializers: index.initializers,
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).await.map_err(|e| {
            DomainError::RegistryError(format!("cannot read {}: {e}", path.display()))
        })?;
        let index: DeclarationIndex = serde_json::from_slice(&bytes)?;
        let registry = Self::from_index(index);
        info!(declarations = registry.len(), path = %path.display(), "declaration index loaded");
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DeclarationRegistry for JsonDeclarationRegistry {
    fn contains(&self, location: &DeclLocation) -> bool {
        self.records.contains_key(location)
    }

    fn lookup(&self, region: &Region) -> Option<DeclLocation> {
        self.by_region.get(region).cloned()
    }

    fn super_member(&self, location: &DeclLocation) -> Option<DeclLocation> {
        match location {
            DeclLocation::Parameter { class, method, index } => {
                let method = DeclLocation::method(class.clone(), method.clone());
                match self.records.get(&method)?.super_member.as_ref()? {
                    DeclLocation::Method { class, method } => {
                        Some(DeclLocation::parameter(class.clone(), method.clone(), *index))
                    }
                    _ => None,
                }
            }
            _ => self.records.get(location)?.super_member.clone(),
        }
    }

    fn impacted_regions(&self, location: &DeclLocation) -> BTreeSet<Region> {
        self.records
            .get(location)
            .map(|record| record.impacted_regions.clone())
            .unwrap_or_default()
    }

    fn public_members(&self) -> Vec<DeclLocation> {
        self.records
            .values()
            .filter(|record| record.public && record.non_primitive)
            .filter(|record| record.location.is_method() || record.location.is_field())
            .map(|record| record.location.clone())
            .collect()
    }

    fn initializer_candidates(&self, class: &str) -> Vec<InitializerCandidate> {
        self.initializers.get(class).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"{
        "declarations": [
            {"location": {"kind": "method", "class": "a.Repo", "method": "find(int)"}, "public": true,
             "super_member": {"kind": "method", "class": "a.Base", "method": "find(int)"},
             "impacted_regions": [{"class": "a.Service", "member": "load()"}]},
            {"location": {"kind": "method", "class": "a.Repo", "method": "size()"}, "public": true, "non_primitive": false},
            {"location": {"kind": "field", "class": "a.Repo", "field": "cache"}},
            {"location": {"kind": "parameter", "class": "a.Repo", "method": "find(int)", "index": 0}}
        ],
        "initializers": {"a.Repo": [{"method": {"kind": "method", "class": "a.Repo", "method": "init()"},
                                     "initialized_fields": [{"kind": "field", "class": "a.Repo", "field": "cache"}]}]}
    }"#;

    fn registry() -> JsonDeclarationRegistry {
        JsonDeclarationRegistry::from_index(serde_json::from_str(INDEX).unwrap())
    }

    #[test]
    fn test_lookup_by_region() {
        let registry = registry();
        assert_eq!(
            registry.lookup(&Region::member("a.Repo", "cache")),
            Some(DeclLocation::field("a.Repo", "cache"))
        );
        assert_eq!(
            registry.lookup(&Region::member("a.Repo", "find(int)")),
            Some(DeclLocation::method("a.Repo", "find(int)"))
        );
        assert_eq!(registry.lookup(&Region::member("a.Repo", "missing")), None);
    }

    #[test]
    fn test_public_members_skip_primitives() {
        assert_eq!(
            registry().public_members(),
            vec![DeclLocation::method("a.Repo", "find(int)")]
        );
    }

    #[test]
    fn test_super_member_of_parameter() {
        let registry = registry();
        assert_eq!(
            registry.super_member(&DeclLocation::parameter("a.Repo", "find(int)", 0)),
            Some(DeclLocation::parameter("a.Base", "find(int)", 0))
        );
        assert_eq!(registry.impacted_regions(&DeclLocation::method("a.Repo", "find(int)")).len(), 1);
    }

    #[test]
    fn test_initializer_candidates() {
        let registry = registry();
        assert_eq!(registry.initializer_candidates("a.Repo").len(), 1);
        assert!(registry.initializer_candidates("a.Other").is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        assert!(matches!(
            JsonDeclarationRegistry::load("/nonexistent/declarations.json").await,
            Err(DomainError::RegistryError(_))
        ));
    }
}
