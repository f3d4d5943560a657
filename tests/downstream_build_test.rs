//! Downstream impact precomputation against a real build command.

use std::collections::BTreeSet;
use std::sync::Arc;

use nullsweep::adapters::{CommandChecker, DeclarationIndex, DeclarationRecord, JsonDeclarationRegistry};
use nullsweep::domain::models::DeclLocation;
use nullsweep::services::{DownstreamImpactAnalyzer, RunLog};

/// Writes one attributed diagnostic for `dep` whenever `fetch()` is assumed nullable.
const BUILD: &str = r#"sleep 0.3
mkdir -p "$NULLSWEEP_OUTPUT_DIR/dep"
if grep -q 'fetch()' "$NULLSWEEP_ASSUMPTIONS"; then
  printf '%s' '[{"kind":"DEREFERENCE_NULLABLE","message":"use of fetch()","region":{"class":"dep.Client","member":"run()"},"origin":{"kind":"method","class":"a.Repo","method":"fetch()"}}]' > "$NULLSWEEP_OUTPUT_DIR/dep/diagnostics.json"
else
  printf '[]' > "$NULLSWEEP_OUTPUT_DIR/dep/diagnostics.json"
fi"#;

fn fetch() -> DeclLocation {
    DeclLocation::method("a.Repo", "fetch()")
}

fn registry() -> JsonDeclarationRegistry {
    JsonDeclarationRegistry::from_index(DeclarationIndex {
        declarations: vec![DeclarationRecord {
            location: fetch(),
            public: true,
            non_primitive: true,
            super_member: None,
            impacted_regions: BTreeSet::new(),
        }],
        ..DeclarationIndex::default()
    })
}

async fn upper_bound_with_workers(max_workers: usize) -> i64 {
    let dir = tempfile::tempdir().unwrap();
    let checker = Arc::new(CommandChecker::new(BUILD, dir.path()));
    let mut log = RunLog::new();

    let analyzer = DownstreamImpactAnalyzer::analyze(
        checker,
        &registry(),
        &["dep".to_string()],
        max_workers,
        &mut log,
    )
    .await
    .unwrap();

    assert_eq!(log.builds, 2);
    analyzer.upper_bound(&BTreeSet::from([fetch()]))
}

#[tokio::test]
async fn test_concurrent_dependent_builds_attribute_impact() {
    assert_eq!(upper_bound_with_workers(4).await, 1);
}

#[tokio::test]
async fn test_sequential_dependent_builds_attribute_impact() {
    assert_eq!(upper_bound_with_workers(1).await, 1);
}
