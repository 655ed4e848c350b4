// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Dependency graph over the packages being built in one run

use crate::error::{Result, SchedulerError};
use crate::extract::{extract_buildable, PrefixClassifier};
use crate::types::{PackageName, RequirementMap};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Directed graph with an edge `P -> D` for each buildable requirement `D` of `P`
///
/// Only packages that are keys of the requirement mapping become nodes.
/// Requirements outside the mapping are treated as already available.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph
    graph: DiGraph<PackageName, ()>,
    /// Map from package name to node index
    node_indices: HashMap<PackageName, NodeIndex>,
}

/// Serializable snapshot used by `to_json`
#[derive(Debug, Serialize)]
struct GraphExport<'a> {
    packages: Vec<&'a PackageName>,
    dependencies: Vec<(&'a PackageName, &'a PackageName)>,
}

impl DependencyGraph {
    /// Create a new empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from a normalized requirement mapping
    #[must_use]
    pub fn build(requirements: &RequirementMap, classifier: &PrefixClassifier) -> Self {
        let mut graph = Self::new();

        for pkg in requirements.keys() {
            graph.add_package(pkg.clone());
        }

        for (pkg, reqs) in requirements {
            for dep in extract_buildable(reqs, classifier) {
                if !graph.add_dependency(pkg.as_str(), dep.as_str()) {
                    tracing::trace!("{} requires {}, which is not built in this run", pkg, dep);
                }
            }
        }

        tracing::debug!(
            "Dependency graph: {} packages, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    /// Add a package node; adding an existing package is a no-op
    pub fn add_package(&mut self, name: PackageName) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(&name) {
            return idx;
        }
        let idx = self.graph.add_node(name.clone());
        self.node_indices.insert(name, idx);
        idx
    }

    /// Record that `from` requires `to`
    ///
    /// Returns `false` without changing the graph if either package is
    /// unknown. Repeated edges are collapsed.
    pub fn add_dependency(&mut self, from: &str, to: &str) -> bool {
        match (self.node_indices.get(from), self.node_indices.get(to)) {
            (Some(&from_idx), Some(&to_idx)) => {
                self.graph.update_edge(from_idx, to_idx, ());
                true
            }
            _ => false,
        }
    }

    /// Check whether a package is part of this run
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    /// All packages in insertion order
    pub fn packages(&self) -> impl Iterator<Item = &PackageName> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// Direct dependencies of a package, in the order they were declared
    #[must_use]
    pub fn dependencies(&self, name: &str) -> Vec<&PackageName> {
        match self.node_indices.get(name) {
            Some(&idx) => self
                .children(idx)
                .into_iter()
                .map(|child| &self.graph[child])
                .collect(),
            None => vec![],
        }
    }

    /// Get node count
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if the graph is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Outgoing neighbours in edge insertion order
    ///
    /// Edges are never removed, so edge indices follow insertion order.
    fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges(idx)
            .map(|e| (e.id(), e.target()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Find one dependency cycle, returned as `a -> b -> ... -> a`
    ///
    /// When several cycles exist, the one touching the earliest inserted
    /// package is reported.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<PackageName>> {
        let component = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || scc.first().is_some_and(|&n| self.graph.contains_edge(n, n))
            })
            .min_by_key(|scc| scc.iter().min().copied())?;

        let members: HashSet<NodeIndex> = component.iter().copied().collect();
        let start = *component.iter().min()?;

        let mut path = vec![start];
        let mut position = HashMap::from([(start, 0usize)]);
        let mut current = start;
        loop {
            let next = self
                .children(current)
                .into_iter()
                .find(|c| members.contains(c))?;
            if let Some(&at) = position.get(&next) {
                let mut cycle: Vec<PackageName> =
                    path[at..].iter().map(|&i| self.graph[i].clone()).collect();
                cycle.push(self.graph[next].clone());
                return Some(cycle);
            }
            position.insert(next, path.len());
            path.push(next);
            current = next;
        }
    }

    /// Topological order with dependencies first
    ///
    /// Kahn's algorithm by generations: the first generation is every
    /// package nothing depends on, in insertion order; children are released
    /// in edge insertion order. The resulting dependents-first order is then
    /// reversed. Identical input always yields the identical order.
    pub fn topological_order(&self) -> Result<Vec<PackageName>> {
        if let Some(cycle) = self.find_cycle() {
            return Err(SchedulerError::DependencyCycle {
                path: cycle.into_iter().map(|p| p.as_str().to_string()).collect(),
            });
        }

        let mut indegree = vec![0usize; self.graph.node_count()];
        for edge in self.graph.edge_references() {
            indegree[edge.target().index()] += 1;
        }

        let mut ready: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|idx| indegree[idx.index()] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.graph.node_count());

        while !ready.is_empty() {
            let generation = std::mem::take(&mut ready);
            for &node in &generation {
                for child in self.children(node) {
                    indegree[child.index()] -= 1;
                    if indegree[child.index()] == 0 {
                        ready.push(child);
                    }
                }
            }
            order.extend(generation);
        }

        order.reverse();
        Ok(order.into_iter().map(|idx| self.graph[idx].clone()).collect())
    }

    /// Export to DOT format for Graphviz
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph dependencies {\n");
        dot.push_str("  rankdir=BT;\n");
        dot.push_str("  node [shape=box, style=rounded];\n\n");

        for pkg in self.packages() {
            dot.push_str(&format!("  \"{pkg}\";\n"));
        }

        dot.push('\n');

        for edge in self.graph.edge_references() {
            dot.push_str(&format!(
                "  \"{}\" -> \"{}\";\n",
                self.graph[edge.source()],
                self.graph[edge.target()]
            ));
        }

        dot.push_str("}\n");
        dot
    }

    /// Export to JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        let export = GraphExport {
            packages: self.packages().collect(),
            dependencies: self
                .graph
                .edge_references()
                .map(|e| (&self.graph[e.source()], &self.graph[e.target()]))
                .collect(),
        };
        serde_json::to_string_pretty(&export)
    }
}
