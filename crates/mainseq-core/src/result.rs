use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::graph::EdgePolicy;
use crate::metrics::ComputedMetrics;
use crate::types::{AnalysisWarning, Component, ComponentId};

/// Metrics snapshot for a single component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentMetrics {
    pub identifier: ComponentId,
    pub abstractness: f64,
    pub instability: f64,
    pub distance: f64,
    pub in_cycle: bool,
    pub exceeds_threshold: bool,
}

/// Final analysis result. Immutable once produced and owned solely by the
/// caller; everything here serializes deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResult {
    pub components: Vec<ComponentMetrics>,
    pub average_distance: f64,
    pub cycles: Vec<Vec<ComponentId>>,
    pub worst_offenders: Vec<ComponentId>,
    pub edge_policy: EdgePolicy,
    pub component_count: usize,
    pub dependency_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<AnalysisWarning>,
}

/// Package computed metrics, cycles, and warnings into the final result.
/// Pure aggregation: the only failure is a structurally inconsistent input,
/// a metric entry naming a component the registry never saw.
pub fn assemble(
    components: &[Component],
    computed: ComputedMetrics,
    cycles: Vec<Vec<ComponentId>>,
    edge_policy: EdgePolicy,
    dependency_count: usize,
    warnings: Vec<AnalysisWarning>,
) -> Result<MetricsResult, AnalysisError> {
    let registered: HashSet<&ComponentId> = components.iter().map(|c| &c.id).collect();
    for entry in &computed.components {
        if !registered.contains(&entry.identifier) {
            return Err(AnalysisError::Integrity {
                identifier: entry.identifier.clone(),
                detail: "metric entry has no matching registry entry".to_string(),
            });
        }
    }

    Ok(MetricsResult {
        components: computed.components,
        average_distance: computed.average_distance,
        cycles,
        worst_offenders: computed.worst_offenders,
        edge_policy,
        component_count: components.len(),
        dependency_count,
        warnings,
    })
}
