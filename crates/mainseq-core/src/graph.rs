use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::config::GraphConfig;
use crate::error::AnalysisError;
use crate::registry::ComponentRegistry;
use crate::types::{AnalysisWarning, ComponentId, DependencyEdge};

/// How repeated references between the same pair are stored.
/// The chosen policy is stated in the result so readers can interpret
/// edge counts consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolicy {
    /// One edge per raw reference.
    MultiEdge,
    /// One weighted edge per pair; the weight is the reference count.
    Collapsed,
}

/// Directed graph of internal dependencies between registered components.
/// Nodes are components, edges carry reference counts. External
/// dependencies never appear here; they exist only as counters on the
/// origin component.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<ComponentId, u32>,
    index: HashMap<ComponentId, NodeIndex>,
    policy: EdgePolicy,
    include_self_loops: bool,
}

impl DependencyGraph {
    /// Build the graph from a frozen registry snapshot and the classified
    /// internal edges. Every edge endpoint must be registered; a dangling
    /// endpoint aborts construction rather than being dropped.
    pub fn build(
        registry: &ComponentRegistry,
        edges: &[DependencyEdge],
        config: &GraphConfig,
    ) -> Result<Self, AnalysisError> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for component in registry.components() {
            let idx = graph.add_node(component.id.clone());
            index.insert(component.id.clone(), idx);
        }

        let policy = if config.collapse_multi_edges {
            EdgePolicy::Collapsed
        } else {
            EdgePolicy::MultiEdge
        };

        for edge in edges {
            let dangling = || AnalysisError::DanglingEdge {
                origin: edge.origin.clone(),
                target: edge.target.clone(),
            };
            let from = *index.get(&edge.origin).ok_or_else(dangling)?;
            let to = *index.get(&edge.target).ok_or_else(dangling)?;

            match policy {
                EdgePolicy::Collapsed => {
                    if let Some(existing) = graph.find_edge(from, to) {
                        *graph.edge_weight_mut(existing).expect("edge just found") += 1;
                    } else {
                        graph.add_edge(from, to, 1);
                    }
                }
                EdgePolicy::MultiEdge => {
                    graph.add_edge(from, to, 1);
                }
            }
        }

        Ok(Self {
            graph,
            index,
            policy,
            include_self_loops: config.include_self_loops_in_cycles,
        })
    }

    pub fn policy(&self) -> EdgePolicy {
        self.policy
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Stored edges. Under the collapsed policy this is the number of
    /// distinct pairs, not the number of references.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Outgoing internal references from a component. Counts raw references
    /// regardless of edge policy, so it is directly comparable to the
    /// component's stored `internal_dependencies`.
    pub fn out_degree(&self, id: &ComponentId) -> usize {
        self.degree(id, Direction::Outgoing)
    }

    /// Incoming internal references to a component.
    pub fn in_degree(&self, id: &ComponentId) -> usize {
        self.degree(id, Direction::Incoming)
    }

    fn degree(&self, id: &ComponentId, direction: Direction) -> usize {
        match self.index.get(id) {
            Some(&idx) => self
                .graph
                .edges_directed(idx, direction)
                .map(|e| *e.weight() as usize)
                .sum(),
            None => 0,
        }
    }

    /// Cross-check graph degrees against the counts the classifier stored.
    /// A mismatch means a classifier or construction bug: fatal in debug
    /// builds, surfaced as a warning in release builds.
    pub fn verify_degrees(&self, registry: &ComponentRegistry) -> Vec<AnalysisWarning> {
        let mut warnings = Vec::new();
        for component in registry.components() {
            let expected = component.internal_dependencies;
            let actual = self.out_degree(&component.id);
            if expected != actual {
                debug_assert!(
                    false,
                    "degree mismatch for '{}': stored {expected}, graph has {actual}",
                    component.id
                );
                warnings.push(AnalysisWarning::DegreeMismatch {
                    identifier: component.id.clone(),
                    expected,
                    actual,
                });
            }
        }
        warnings
    }

    /// Report dependency cycles, each as a closed walk of component
    /// identifiers starting at the cycle's lexicographically smallest
    /// member. Cycles are ordered by that smallest member. Self-loops are
    /// reported as single-member cycles only when configured.
    pub fn detect_cycles(&self) -> Vec<Vec<ComponentId>> {
        let mut cycles: Vec<Vec<ComponentId>> = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| self.order_cycle(&scc))
            .collect();

        if self.include_self_loops {
            for idx in self.graph.node_indices() {
                if self.graph.find_edge(idx, idx).is_some() {
                    cycles.push(vec![self.graph[idx].clone()]);
                }
            }
        }

        cycles.sort();
        cycles
    }

    /// Group components into dependency levels: level 0 holds components
    /// with no internal dependencies, level n+1 holds components whose
    /// deepest internal dependency sits at level n. Mutually dependent
    /// components share a level. Each level is ordered by identifier.
    pub fn topological_levels(&self) -> Vec<Vec<ComponentId>> {
        let sccs = petgraph::algo::tarjan_scc(&self.graph);

        let mut scc_of = vec![usize::MAX; self.graph.node_count()];
        for (scc_idx, scc) in sccs.iter().enumerate() {
            for &node in scc {
                scc_of[node.index()] = scc_idx;
            }
        }

        // tarjan_scc yields SCCs in reverse topological order, so every
        // successor's level is known before its dependents are visited.
        let mut scc_level = vec![0usize; sccs.len()];
        for (scc_idx, scc) in sccs.iter().enumerate() {
            let mut level = 0;
            for &node in scc {
                for e in self.graph.edges_directed(node, Direction::Outgoing) {
                    let target_scc = scc_of[e.target().index()];
                    if target_scc != scc_idx {
                        level = level.max(scc_level[target_scc] + 1);
                    }
                }
            }
            scc_level[scc_idx] = level;
        }

        let depth = scc_level.iter().max().map(|&d| d + 1).unwrap_or(0);
        let mut levels: Vec<Vec<ComponentId>> = vec![Vec::new(); depth];
        for (scc_idx, scc) in sccs.iter().enumerate() {
            for &node in scc {
                levels[scc_level[scc_idx]].push(self.graph[node].clone());
            }
        }
        for level in &mut levels {
            level.sort();
        }
        levels
    }

    /// Order one strongly connected component as a walk: start at the
    /// smallest identifier, then greedily follow the smallest unvisited
    /// successor inside the component.
    fn order_cycle(&self, scc: &[NodeIndex]) -> Vec<ComponentId> {
        let members: HashSet<NodeIndex> = scc.iter().copied().collect();
        let start = scc
            .iter()
            .copied()
            .min_by(|a, b| self.graph[*a].cmp(&self.graph[*b]))
            .expect("SCC is non-empty");

        let mut walk = vec![start];
        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        let mut current = start;
        while let Some(next) = self
            .graph
            .edges_directed(current, Direction::Outgoing)
            .map(|e| e.target())
            .filter(|t| members.contains(t) && !visited.contains(t))
            .min_by(|a, b| self.graph[*a].cmp(&self.graph[*b]))
        {
            visited.insert(next);
            walk.push(next);
            current = next;
        }

        // A greedy dead end can leave members unvisited in dense SCCs;
        // append them in identifier order so the output stays deterministic.
        let mut rest: Vec<NodeIndex> = members
            .iter()
            .copied()
            .filter(|n| !visited.contains(n))
            .collect();
        rest.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        walk.extend(rest);

        walk.into_iter().map(|n| self.graph[n].clone()).collect()
    }
}
