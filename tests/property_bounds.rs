//! Property-based tests for bound estimation, cache convergence and
//! exploration depth.

mod common;

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

use common::{chain_project, test_config, TARGET};
use nullsweep::domain::models::{CandidateFix, DeclLocation, Diagnostic, Region, Report};
use nullsweep::services::diagnostic_store::snapshot;
use nullsweep::services::{
    DownstreamImpactAnalyzer, Explorer, ExplorerSettings, MemberImpact, ReportCache, RunLog,
};

fn member(i: usize) -> DeclLocation {
    DeclLocation::method("a.Api", format!("m{i}()"))
}

fn impact(i: usize, count: usize) -> MemberImpact {
    (0..count).fold(MemberImpact::new(member(i)), |impact, n| {
        let diagnostic = Diagnostic::new(
            "DEREFERENCE_NULLABLE",
            format!("use of m{i} #{n}"),
            Region::member("dep.Client", format!("use{i}_{n}()")),
        )
        .with_origin(member(i));
        impact.with_diagnostic("dep", diagnostic, false)
    })
}

proptest! {
    /// Lower bound never exceeds upper bound and both are non-negative.
    #[test]
    fn prop_lower_bound_at_most_upper_bound(
        counts in prop::collection::vec(0usize..6, 1..6),
        picks in prop::collection::vec(any::<bool>(), 6),
    ) {
        let analyzer = DownstreamImpactAnalyzer::from_impacts(
            counts.iter().enumerate().map(|(i, &count)| impact(i, count)),
        );
        let tree: BTreeSet<DeclLocation> = (0..counts.len())
            .filter(|&i| picks[i])
            .map(member)
            .collect();

        let lower = analyzer.lower_bound(&tree);
        let upper = analyzer.upper_bound(&tree);
        prop_assert!(lower >= 0);
        prop_assert!(lower <= upper);

        let expected: usize = (0..counts.len()).filter(|&i| picks[i]).map(|i| counts[i]).sum();
        prop_assert_eq!(upper, i64::try_from(expected).unwrap());
    }

    /// Injected members stop contributing to any bound.
    #[test]
    fn prop_injected_members_are_free(counts in prop::collection::vec(1usize..5, 1..5)) {
        let mut analyzer = DownstreamImpactAnalyzer::from_impacts(
            counts.iter().enumerate().map(|(i, &count)| impact(i, count)),
        );
        let all: BTreeSet<DeclLocation> = (0..counts.len()).map(member).collect();
        analyzer.update_impacts_after_injection(&all);

        prop_assert_eq!(analyzer.upper_bound(&all), 0);
        prop_assert!(!analyzer.is_destructive(&all));
    }

    /// Once a round brings no unseen root the cache reports no update, and a
    /// round with a new root always does.
    #[test]
    fn prop_cache_signals_only_new_roots(rounds in prop::collection::vec(prop::collection::vec(0usize..8, 0..5), 1..8)) {
        let mut cache = ReportCache::new(true);
        let mut seen = BTreeSet::new();
        for round in rounds {
            let fresh = round.iter().any(|i| !seen.contains(i));
            cache.update(round.iter().map(|&i| Report::new(CandidateFix::new(member(i), "RETURN_NULLABLE"))));
            seen.extend(round);
            prop_assert_eq!(cache.is_updated(), fresh);
            prop_assert_eq!(cache.len(), seen.len());
        }
    }

    /// A chain of single-fix obligations is followed exactly as far as the
    /// depth limit allows.
    #[test]
    fn prop_chain_explored_to_depth_limit(length in 1usize..6, depth in 1usize..6) {
        let (tree_len, reached) = tokio_test::block_on(async {
            let project = Arc::new(chain_project(length));
            let registry = Arc::new(project.registry());
            let mut settings = ExplorerSettings::from_config(&test_config());
            settings.depth = depth;

            let mut log = RunLog::new();
            let baseline = snapshot(project.as_ref(), TARGET, &mut log).await.unwrap();
            let mut explorer = Explorer::new(project.clone(), project.clone(), registry, settings);
            let reports = explorer
                .evaluate(&baseline.fixes(), &baseline, &DownstreamImpactAnalyzer::disabled(), &mut log)
                .await
                .unwrap();
            (reports[0].tree.len(), reports[0].depth)
        });

        prop_assert_eq!(tree_len, length.min(depth));
        prop_assert_eq!(reached, length.min(depth));
    }
}
