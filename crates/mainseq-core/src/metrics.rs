use std::cmp::Ordering;
use std::collections::HashSet;

use crate::config::MetricsConfig;
use crate::result::ComponentMetrics;
use crate::types::{Component, ComponentId};

/// Per-component metrics plus the graph-wide aggregates derived from them.
#[derive(Debug, Clone)]
pub struct ComputedMetrics {
    pub components: Vec<ComponentMetrics>,
    pub average_distance: f64,
    pub worst_offenders: Vec<ComponentId>,
}

/// Abstractness: fraction of a component's classes that are abstract.
/// A component with no classes counts as fully concrete.
pub fn abstractness(component: &Component) -> f64 {
    let n = component.class_count();
    if n > 0 {
        component.abstract_classes as f64 / n as f64
    } else {
        0.0
    }
}

/// Instability: fraction of a component's dependencies that leave the
/// analyzed tree. A component with no dependencies counts as maximally
/// stable.
pub fn instability(component: &Component) -> f64 {
    let c = component.dependency_count();
    if c > 0 {
        component.external_dependencies as f64 / c as f64
    } else {
        0.0
    }
}

/// Distance from the main sequence A + I = 1. Lower is better.
pub fn distance(abstractness: f64, instability: f64) -> f64 {
    (abstractness + instability - 1.0).abs()
}

/// Compute metrics for every component.
///
/// The distance formula is total: a component with no classes and no
/// dependencies lands at A = 0, I = 0, D = 1.0. Such no-data components
/// appear in the per-component list but are excluded from the average and
/// from the worst-offenders ranking so they cannot dominate either.
pub fn compute(
    components: &[Component],
    cycles: &[Vec<ComponentId>],
    config: &MetricsConfig,
) -> ComputedMetrics {
    let in_cycle: HashSet<&ComponentId> = cycles.iter().flatten().collect();

    let entries: Vec<ComponentMetrics> = components
        .iter()
        .map(|component| {
            let a = abstractness(component);
            let i = instability(component);
            let d = distance(a, i);
            ComponentMetrics {
                identifier: component.id.clone(),
                abstractness: a,
                instability: i,
                distance: d,
                in_cycle: in_cycle.contains(&component.id),
                // the offender flag tracks the offender ranking, which
                // no-data components are excluded from
                exceeds_threshold: component.has_data() && d > config.distance_threshold,
            }
        })
        .collect();

    let with_data: Vec<&ComponentMetrics> = components
        .iter()
        .zip(&entries)
        .filter(|(component, _)| component.has_data())
        .map(|(_, entry)| entry)
        .collect();

    let average_distance = if with_data.is_empty() {
        0.0
    } else {
        with_data.iter().map(|m| m.distance).sum::<f64>() / with_data.len() as f64
    };

    let mut offenders = with_data;
    offenders.sort_by(|a, b| {
        b.distance
            .partial_cmp(&a.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
    let worst_offenders = offenders.into_iter().map(|m| m.identifier.clone()).collect();

    ComputedMetrics {
        components: entries,
        average_distance,
        worst_offenders,
    }
}
