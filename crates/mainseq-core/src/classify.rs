use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::registry::ComponentRegistry;
use crate::types::{
    ClassFact, ClassKind, Classification, ComponentId, DependencyEdge, DependencyFact,
};

/// Decide internal vs. external for one raw dependency reference.
///
/// Resolution happens in the scanner; a resolved target is trusted as
/// internal here. If the scanner resolved a target the registry never saw,
/// graph construction rejects the resulting edge as dangling.
pub fn classify_dependency(fact: &DependencyFact) -> Classification {
    match &fact.target {
        Some(id) => Classification::Internal(id.clone()),
        None => Classification::External,
    }
}

/// Decide abstract vs. concrete for one class declaration.
///
/// Priority order: explicit abstract marker, then unimplemented members.
/// Anything else (including missing facts) counts as concrete, so
/// abstractness is under-counted rather than over-counted.
pub fn classify_class(fact: &ClassFact) -> ClassKind {
    if fact.explicit_abstract_marker || fact.has_unimplemented_members {
        ClassKind::Abstract
    } else {
        ClassKind::Concrete
    }
}

/// Per-origin classification totals plus the internal edges it produced.
#[derive(Debug, Clone)]
pub struct OriginTally {
    pub origin: ComponentId,
    pub abstract_classes: usize,
    pub concrete_classes: usize,
    pub internal_dependencies: usize,
    pub external_dependencies: usize,
    pub edges: Vec<DependencyEdge>,
}

/// Classify every fact, sharded by origin component.
///
/// Each origin's counters are the only state its shard touches, so shards
/// run in parallel; the returned tallies are ordered by origin identifier,
/// which keeps the later fold deterministic.
pub fn classify_all(
    class_facts: &[ClassFact],
    dependency_facts: &[DependencyFact],
) -> Vec<OriginTally> {
    let mut shards: BTreeMap<&ComponentId, (Vec<&ClassFact>, Vec<&DependencyFact>)> =
        BTreeMap::new();
    for fact in class_facts {
        shards.entry(&fact.owner).or_default().0.push(fact);
    }
    for fact in dependency_facts {
        shards.entry(&fact.origin).or_default().1.push(fact);
    }

    let shards: Vec<_> = shards.into_iter().collect();
    shards
        .par_iter()
        .map(|(origin, (classes, deps))| {
            let mut tally = OriginTally {
                origin: (*origin).clone(),
                abstract_classes: 0,
                concrete_classes: 0,
                internal_dependencies: 0,
                external_dependencies: 0,
                edges: Vec::new(),
            };
            for fact in classes {
                match classify_class(fact) {
                    ClassKind::Abstract => tally.abstract_classes += 1,
                    ClassKind::Concrete => tally.concrete_classes += 1,
                }
            }
            for fact in deps {
                match classify_dependency(fact) {
                    Classification::Internal(target) => {
                        tally.internal_dependencies += 1;
                        tally.edges.push(DependencyEdge {
                            origin: (*origin).clone(),
                            target,
                        });
                    }
                    Classification::External => tally.external_dependencies += 1,
                }
            }
            tally
        })
        .collect()
}

/// Fold tallies into the registry and return the full internal edge list.
/// Origins the scanner never described explicitly are created on first
/// observation, matching the registry's get-or-create contract.
pub fn apply_tallies(
    registry: &mut ComponentRegistry,
    tallies: Vec<OriginTally>,
) -> Vec<DependencyEdge> {
    let mut edges = Vec::new();
    for tally in tallies {
        registry.ensure(&tally.origin);
        let component = registry
            .get_mut(&tally.origin)
            .expect("origin was just ensured");
        component.abstract_classes += tally.abstract_classes;
        component.concrete_classes += tally.concrete_classes;
        component.internal_dependencies += tally.internal_dependencies;
        component.external_dependencies += tally.external_dependencies;
        edges.extend(tally.edges);
    }
    edges
}
