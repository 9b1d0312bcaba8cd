//! Dependency graph construction and analysis.
//!
//! Turns a step list into nodes and "blocks" edges, then derives a
//! topological execution order, the critical path and the groups of steps
//! that share a dependency level.

use crate::core::Step;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// A node of the dependency graph, one per step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Step number.
    pub step_number: u32,
    /// Step id.
    pub id: String,
    /// Declared dependencies.
    pub depends_on: Vec<u32>,
    /// Declared dependents.
    pub blocks: Vec<u32>,
}

/// A directed "blocks" edge: `from` must finish before `to` may start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Id of the blocking step.
    pub from: String,
    /// Id of the blocked step.
    pub to: String,
    /// Number of the blocking step.
    pub from_step: u32,
    /// Number of the blocked step.
    pub to_step: u32,
}

/// The analysed dependency graph of a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    /// One node per step, in plan order.
    pub nodes: Vec<GraphNode>,
    /// Deduplicated edges.
    pub edges: Vec<GraphEdge>,
    /// Topological order of step numbers. Steps caught in a cycle are omitted.
    pub execution_order: Vec<u32>,
    /// Longest dependency chain.
    pub critical_path: Vec<u32>,
    /// Steps sharing a dependency level, only groups with more than one member.
    pub parallel_groups: Vec<Vec<u32>>,
}

impl DependencyGraph {
    /// Returns true if the topological order left steps out.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        self.execution_order.len() < self.nodes.len()
    }

    /// Returns the steps that the topological sort could not place.
    #[must_use]
    pub fn unordered_steps(&self) -> Vec<u32> {
        let placed: HashSet<u32> = self.execution_order.iter().copied().collect();
        self.nodes
            .iter()
            .map(|n| n.step_number)
            .filter(|n| !placed.contains(n))
            .collect()
    }

    /// Returns the position of a step in the execution order.
    #[must_use]
    pub fn position(&self, step_number: u32) -> Option<usize> {
        self.execution_order.iter().position(|&s| s == step_number)
    }
}

/// Builds [`DependencyGraph`]s. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyGraphBuilder;

impl DependencyGraphBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Builds the graph for an ordered step list.
    ///
    /// References to step numbers that are not in `steps` are dropped.
    #[must_use]
    pub fn build(&self, steps: &[Step]) -> DependencyGraph {
        let mut nodes: Vec<GraphNode> = Vec::with_capacity(steps.len());
        let mut index: HashMap<u32, usize> = HashMap::with_capacity(steps.len());

        for step in steps {
            if index.contains_key(&step.step_number) {
                tracing::warn!(step = step.step_number, "Duplicate step number ignored by graph builder");
                continue;
            }
            index.insert(step.step_number, nodes.len());
            nodes.push(GraphNode {
                step_number: step.step_number,
                id: step.id.clone(),
                depends_on: step.depends_on.clone(),
                blocks: step.blocks.clone(),
            });
        }

        let pairs = collect_edges(&nodes, &index);
        let edges = pairs
            .iter()
            .map(|&(u, v)| GraphEdge {
                from: nodes[u].id.clone(),
                to: nodes[v].id.clone(),
                from_step: nodes[u].step_number,
                to_step: nodes[v].step_number,
            })
            .collect();

        let order = topological_order(nodes.len(), &pairs);
        let critical = critical_path(nodes.len(), &pairs, &order);
        let groups = parallel_groups(nodes.len(), &pairs);

        let number = |i: usize| nodes[i].step_number;
        DependencyGraph {
            execution_order: order.iter().map(|&i| number(i)).collect(),
            critical_path: critical.iter().map(|&i| number(i)).collect(),
            parallel_groups: groups
                .into_iter()
                .map(|g| g.into_iter().map(number).collect())
                .collect(),
            edges,
            nodes,
        }
    }
}

/// Convenience wrapper around [`DependencyGraphBuilder::build`].
#[must_use]
pub fn build_dependency_graph(steps: &[Step]) -> DependencyGraph {
    DependencyGraphBuilder::new().build(steps)
}

/// Collects `(from, to)` index pairs: `depends_on` first, then `blocks` entries
/// that do not restate an existing edge.
fn collect_edges(nodes: &[GraphNode], index: &HashMap<u32, usize>) -> Vec<(usize, usize)> {
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut pairs = Vec::new();

    for (to, node) in nodes.iter().enumerate() {
        for dep in &node.depends_on {
            if let Some(&from) = index.get(dep) {
                if seen.insert((from, to)) {
                    pairs.push((from, to));
                }
            }
        }
    }

    for (from, node) in nodes.iter().enumerate() {
        for blocked in &node.blocks {
            if let Some(&to) = index.get(blocked) {
                if seen.insert((from, to)) {
                    pairs.push((from, to));
                }
            }
        }
    }

    pairs
}

fn adjacency(n: usize, pairs: &[(usize, usize)]) -> (Vec<Vec<usize>>, Vec<usize>) {
    let mut adj = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    for &(u, v) in pairs {
        adj[u].push(v);
        in_degree[v] += 1;
    }
    (adj, in_degree)
}

/// Kahn's algorithm seeded in plan order.
fn topological_order(n: usize, pairs: &[(usize, usize)]) -> Vec<usize> {
    let (adj, mut in_degree) = adjacency(n, pairs);
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(u) = queue.pop_front() {
        order.push(u);
        for &v in &adj[u] {
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push_back(v);
            }
        }
    }

    order
}

/// Longest path by single-pass relaxation in topological order.
///
/// Ties for the maximum distance go to the earliest step in plan order.
fn critical_path(n: usize, pairs: &[(usize, usize)], order: &[usize]) -> Vec<usize> {
    let (adj, in_degree) = adjacency(n, pairs);
    let mut dist: Vec<Option<usize>> = (0..n)
        .map(|i| (in_degree[i] == 0).then_some(0))
        .collect();
    let mut pred: Vec<Option<usize>> = vec![None; n];

    for &u in order {
        let Some(du) = dist[u] else { continue };
        for &v in &adj[u] {
            if dist[v].map_or(true, |dv| du + 1 > dv) {
                dist[v] = Some(du + 1);
                pred[v] = Some(u);
            }
        }
    }

    let mut end: Option<(usize, usize)> = None;
    for (i, d) in dist.iter().enumerate() {
        if let Some(d) = *d {
            if end.map_or(true, |(_, best)| d > best) {
                end = Some((i, d));
            }
        }
    }

    let mut path = Vec::new();
    let mut cursor = end.map(|(i, _)| i);
    while let Some(i) = cursor {
        path.push(i);
        cursor = pred[i];
    }
    path.reverse();
    path
}

/// Levels by fixed-point relaxation over edges, grouped in ascending order.
fn parallel_groups(n: usize, pairs: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut level = vec![0usize; n];

    // A DAG converges within n passes; the bound keeps cyclic input finite.
    for _ in 0..=n {
        let mut changed = false;
        for &(u, v) in pairs {
            if level[v] < level[u] + 1 {
                level[v] = level[u] + 1;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut by_level: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, l) in level.into_iter().enumerate() {
        by_level.entry(l).or_default().push(i);
    }

    by_level.into_values().filter(|g| g.len() > 1).collect()
}
