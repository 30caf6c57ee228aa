//! Undirected adjacency over Stops (§4.F), used only to bound transfer
//! candidates during search — never to compute shortest paths directly.

use std::collections::HashMap;

use model::stop::StopId;

/// Enumeration ceiling for `get_paths`: exhaustive simple-path DFS is
/// cheap on the small adjacency graphs real line-graph extracts produce,
/// but a dense graph could blow up combinatorially. Capped rather than
/// left unbounded.
const MAX_LINE_GRAPH_PATHS: usize = 64;

#[derive(Debug, Clone)]
pub struct LineGraph {
    adjacency: HashMap<StopId, Vec<StopId>>,
    transfer_weight: HashMap<StopId, u32>,
}

impl LineGraph {
    pub fn new(edges: &[(StopId, StopId)], transfer_weight: HashMap<StopId, u32>) -> Self {
        let mut adjacency: HashMap<StopId, Vec<StopId>> = HashMap::new();
        for (a, b) in edges {
            adjacency.entry(a.clone()).or_default().push(b.clone());
            adjacency.entry(b.clone()).or_default().push(a.clone());
        }
        Self { adjacency, transfer_weight }
    }

    fn neighbors(&self, stop: &StopId) -> &[StopId] {
        self.adjacency.get(stop).map_or(&[], Vec::as_slice)
    }

    /// All simple paths (no repeated vertex) from `origin` to `destination`,
    /// capped at `MAX_LINE_GRAPH_PATHS`. Exhaustive DFS below the cap.
    pub fn get_paths(&self, origin: &StopId, destination: &StopId) -> Vec<Vec<StopId>> {
        let mut paths = Vec::new();
        let mut visited = vec![origin.clone()];
        self.dfs(origin, destination, &mut visited, &mut paths);
        paths
    }

    fn dfs(
        &self,
        current: &StopId,
        destination: &StopId,
        visited: &mut Vec<StopId>,
        paths: &mut Vec<Vec<StopId>>,
    ) {
        if paths.len() >= MAX_LINE_GRAPH_PATHS {
            return;
        }
        if current == destination {
            paths.push(visited.clone());
            return;
        }
        for next in self.neighbors(current).to_vec() {
            if paths.len() >= MAX_LINE_GRAPH_PATHS {
                return;
            }
            if visited.contains(&next) {
                continue;
            }
            visited.push(next.clone());
            self.dfs(&next, destination, visited, paths);
            visited.pop();
        }
    }

    /// Stop ids that appear strictly after `stop` on any path from `origin`
    /// to `destination`, deduplicated and sorted by transfer-weight
    /// descending.
    pub fn get_next_stops(&self, origin: &StopId, destination: &StopId, stop: &StopId) -> Vec<StopId> {
        let mut seen = std::collections::HashSet::new();
        for path in self.get_paths(origin, destination) {
            if let Some(position) = path.iter().position(|s| s == stop) {
                for next in &path[position + 1..] {
                    seen.insert(next.clone());
                }
            }
        }
        let mut result: Vec<StopId> = seen.into_iter().collect();
        result.sort_by_key(|stop_id| std::cmp::Reverse(self.transfer_weight.get(stop_id).copied().unwrap_or(0)));
        result
    }
}

#[cfg(test)]
mod tests {
    use utility::id::Id;

    use super::*;

    fn stop(id: &str) -> StopId {
        Id::new(id.to_owned())
    }

    #[test]
    fn finds_direct_and_indirect_paths() {
        let a = stop("a");
        let b = stop("b");
        let c = stop("c");
        let graph = LineGraph::new(
            &[(a.clone(), b.clone()), (b.clone(), c.clone()), (a.clone(), c.clone())],
            HashMap::new(),
        );
        let mut paths = graph.get_paths(&a, &c);
        paths.sort_by_key(Vec::len);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], vec![a.clone(), c.clone()]);
        assert_eq!(paths[1], vec![a, b, c]);
    }

    #[test]
    fn next_stops_sorted_by_transfer_weight_descending() {
        let a = stop("a");
        let b = stop("b");
        let c = stop("c");
        let d = stop("d");
        let graph = LineGraph::new(
            &[(a.clone(), b.clone()), (a.clone(), c.clone()), (b.clone(), d.clone()), (c.clone(), d.clone())],
            HashMap::from([(b.clone(), 2), (c.clone(), 5)]),
        );
        let next = graph.get_next_stops(&a, &d, &a);
        assert_eq!(next, vec![c, b]);
    }
}
