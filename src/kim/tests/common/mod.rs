//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use routeflow_kim::graph::InMemoryRoleGraph;
use routeflow_kim::resolver::{ResolverConfig, RoleResolver};
use routeflow_kim::role_type::{ExactMatchValidator, HierarchicalValidator, ValidatorRegistry};
use routeflow_kim::types::Role;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install a test subscriber once; `RUST_LOG` overrides the default filter
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn roles(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// Exact matching under "default", subject roll-up under "subject"
pub fn validators() -> Arc<ValidatorRegistry> {
    Arc::new(
        ValidatorRegistry::new()
            .with(ExactMatchValidator::new("default"))
            .with(
                HierarchicalValidator::new("subject", "subject")
                    .with_parent("CHEM", "PHYS")
                    .with_parent("PHYS", "SCI"),
            ),
    )
}

/// Graph holding `ids` as active roles of type "default"
pub fn graph_with_roles(ids: &[&str]) -> Arc<InMemoryRoleGraph> {
    let graph = Arc::new(InMemoryRoleGraph::new());
    for id in ids {
        graph.add_role(Role::new(*id, "KR-WKFLW", *id, "default")).unwrap();
    }
    graph
}

pub fn resolver(graph: Arc<InMemoryRoleGraph>, config: ResolverConfig) -> RoleResolver {
    RoleResolver::new(graph, validators(), config)
}
