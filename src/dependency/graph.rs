use crate::dependency::DependencyError;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A directed graph where an edge `a -> b` means "`a` depends on `b`".
///
/// Adjacency is kept in ordered sets so that traversals are deterministic.
#[derive(Debug, Clone)]
pub struct DependencyGraph<N> {
    adjacency: BTreeMap<N, BTreeSet<N>>,
}

impl<N> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self {
            adjacency: BTreeMap::new(),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

impl<N: Ord + Copy> DependencyGraph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: N) {
        self.adjacency.entry(node).or_default();
    }

    /// Records that `node` depends on `dependency`.
    pub fn add_edge(&mut self, node: N, dependency: N) {
        self.add_node(dependency);
        self.adjacency.entry(node).or_default().insert(dependency);
    }

    pub fn has_node(&self, node: &N) -> bool {
        self.adjacency.contains_key(node)
    }

    pub fn has_edge(&self, node: &N, dependency: &N) -> bool {
        self.adjacency
            .get(node)
            .map(|deps| deps.contains(dependency))
            .unwrap_or(false)
    }

    pub fn num_nodes(&self) -> usize {
        self.adjacency.len()
    }

    pub fn clear(&mut self) {
        self.adjacency.clear();
    }

    fn dependencies(&self, node: &N) -> impl Iterator<Item = &N> {
        self.adjacency.get(node).into_iter().flatten()
    }

    /// Breadth-first traversal from `roots`. Consumers come before their dependencies.
    pub fn bfs(&self, roots: &[N]) -> Vec<N> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        let mut order = Vec::new();
        for &root in roots {
            if visited.insert(root) {
                queue.push_back(root);
            }
        }
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &dep in self.dependencies(&node) {
                if visited.insert(dep) {
                    queue.push_back(dep);
                }
            }
        }
        order
    }

    /// Depth-first traversal from `roots` in pre-order.
    pub fn dfs(&self, roots: &[N]) -> Vec<N> {
        let mut visited = BTreeSet::new();
        let mut stack: Vec<N> = roots.iter().rev().copied().collect();
        let mut order = Vec::new();
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            order.push(node);
            for &dep in self.dependencies(&node) {
                if !visited.contains(&dep) {
                    stack.push(dep);
                }
            }
        }
        order
    }

    /// Orders every node reachable from `roots` so that each node comes after all of its
    /// dependencies.
    ///
    /// Ties are broken by the order of `roots` and then by node order, so the result is
    /// deterministic.
    pub fn topological_sort(&self, roots: &[N]) -> Result<Vec<N>, DependencyError> {
        let mut marks = BTreeMap::new();
        let mut order = Vec::new();
        for &root in roots {
            self.visit_post_order(root, &mut marks, &mut order)?;
        }
        Ok(order)
    }

    fn visit_post_order(
        &self,
        root: N,
        marks: &mut BTreeMap<N, Mark>,
        order: &mut Vec<N>,
    ) -> Result<(), DependencyError> {
        if marks.contains_key(&root) {
            return Ok(());
        }

        // Stack of (node, dependencies not yet visited), popped from the back
        let pending_of = |node: &N| {
            let mut deps: Vec<N> = self.dependencies(node).copied().collect();
            deps.reverse();
            deps
        };
        let mut stack = vec![(root, pending_of(&root))];
        marks.insert(root, Mark::InProgress);
        while let Some((node, pending)) = stack.last_mut() {
            let node = *node;
            if let Some(dep) = pending.pop() {
                match marks.get(&dep) {
                    Some(Mark::InProgress) => return Err(DependencyError::CyclicDependency),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(dep, Mark::InProgress);
                        stack.push((dep, pending_of(&dep)));
                    }
                }
            } else {
                marks.insert(node, Mark::Done);
                order.push(node);
                stack.pop();
            }
        }
        Ok(())
    }
}
