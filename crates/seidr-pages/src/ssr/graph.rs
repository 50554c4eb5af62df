//! Dependency graph builder
//!
//! Converts the parent links accumulated by a capture scope into an
//! index-based adjacency structure and walks it.
//!
//! ## Numbering
//!
//! Nodes are numbered by their position in the registration order handed to
//! [`build_graph`]. A node's `parents` hold the numeric ids of its parents in
//! the exact order they were supplied at derivation, which is what gives
//! path steps their meaning:
//!
//! ```text
//! a = 0 (root)   b = 1 (root)   sum = 2, parents [0, 1]
//!
//! find_paths_to_roots(sum) = [[0], [1]]   // sum.parents[0] -> a, sum.parents[1] -> b
//! find_paths_to_roots(a)   = [[]]         // a is itself a root
//! ```
//!
//! Parents may be registered after their children (forward references), so
//! traversal does not rely on numeric order. Every walk tracks the nodes on
//! its current stack and fails with [`GraphError::Cycle`] instead of looping,
//! and is capped at [`MAX_TRAVERSAL_DEPTH`]. Path enumeration is also capped
//! at [`MAX_PATH_COUNT`], since stacked diamonds double the count per layer.

use std::collections::{BTreeSet, HashMap};

use seidr_core::reactive::NodeId;
use serde::{Deserialize, Serialize};

/// Maximum number of steps a single path may take.
pub const MAX_TRAVERSAL_DEPTH: usize = 1024;

/// Maximum number of paths [`find_paths_to_roots`] returns for one node.
pub const MAX_PATH_COUNT: usize = 4096;

/// Walk from a node to one of its ancestor roots, as parent-list indices.
pub type Path = Vec<usize>;

/// Errors raised while building or walking a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
	/// A numeric id does not index into the node list.
	#[error("node {id} is out of range (graph has {len} nodes)")]
	NodeOutOfRange {
		/// The offending id.
		id: usize,
		/// Number of nodes in the graph.
		len: usize,
	},

	/// A path step selects a parent slot the node does not have.
	#[error("path step {index} is out of range for node {node} with {arity} parent(s)")]
	ParentIndexOutOfRange {
		/// Node the step was taken from.
		node: usize,
		/// The requested parent slot.
		index: usize,
		/// Number of parents the node has.
		arity: usize,
	},

	/// A derived value names a parent that was never registered.
	#[error("value {node} was derived from {parent}, which is not registered in this scope")]
	UnknownParent {
		/// The derived value.
		node: NodeId,
		/// The missing parent.
		parent: NodeId,
	},

	/// A node is reachable from itself through its parents.
	#[error("dependency cycle detected at node {0}")]
	Cycle(usize),

	/// A traversal exceeded [`MAX_TRAVERSAL_DEPTH`].
	#[error("traversal exceeded the maximum depth of {0}")]
	MaxDepthExceeded(usize),

	/// A node has more than [`MAX_PATH_COUNT`] paths to its roots.
	#[error("node has more than {0} paths to its roots")]
	TooManyPaths(usize),

	/// A path ended on a node that still has parents.
	#[error("path from node {from} ends at derived node {to}")]
	NotARoot {
		/// Where the walk started.
		from: usize,
		/// Where the walk stopped.
		to: usize,
	},

	/// A node's `id` does not match its position.
	#[error("node at position {index} carries id {id}")]
	Misnumbered {
		/// Position in the node list.
		index: usize,
		/// The id stored on the node.
		id: usize,
	},

	/// `rootIds` does not list exactly the parentless nodes.
	#[error("root id list does not match the parentless nodes")]
	RootMismatch,
}

/// One node of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
	/// Numeric id (equal to the node's position).
	pub id: usize,
	/// Parent ids in derivation order; empty for roots.
	pub parents: Vec<usize>,
}

impl GraphNode {
	/// Whether this node has no parents.
	pub fn is_root(&self) -> bool {
		self.parents.is_empty()
	}
}

/// Normalized dependency graph of one render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
	/// Nodes in registration order.
	pub nodes: Vec<GraphNode>,
	/// Ids of every node without parents, ascending.
	pub root_ids: Vec<usize>,
}

impl DependencyGraph {
	/// Number of nodes.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Whether the graph has no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Looks up a node by numeric id.
	pub fn node(&self, id: usize) -> Result<&GraphNode, GraphError> {
		self.nodes.get(id).ok_or(GraphError::NodeOutOfRange {
			id,
			len: self.nodes.len(),
		})
	}

	/// Whether `id` names a root. Out-of-range ids are not roots.
	pub fn is_root(&self, id: usize) -> bool {
		self.nodes.get(id).is_some_and(GraphNode::is_root)
	}

	/// Checks structural consistency: ids match positions, parent ids are in
	/// range, `root_ids` lists the parentless nodes and no node is its own
	/// ancestor.
	pub fn validate(&self) -> Result<(), GraphError> {
		let len = self.nodes.len();
		for (index, node) in self.nodes.iter().enumerate() {
			if node.id != index {
				return Err(GraphError::Misnumbered { index, id: node.id });
			}
			if let Some(&id) = node.parents.iter().find(|&&p| p >= len) {
				return Err(GraphError::NodeOutOfRange { id, len });
			}
		}

		let expected: Vec<usize> = self
			.nodes
			.iter()
			.filter(|node| node.is_root())
			.map(|node| node.id)
			.collect();
		if expected != self.root_ids {
			return Err(GraphError::RootMismatch);
		}

		detect_cycles(self)
	}
}

/// Builds the graph for `entries` (stable ids in registration order).
///
/// `parents` maps each derived value to its ordered parent list. Entries
/// without a recorded parent list become roots.
///
/// # Errors
///
/// [`GraphError::UnknownParent`] when a recorded parent is not itself among
/// `entries`.
pub fn build_graph<I>(
	entries: I,
	parents: &HashMap<NodeId, Vec<NodeId>>,
) -> Result<DependencyGraph, GraphError>
where
	I: IntoIterator<Item = NodeId>,
{
	let order: Vec<NodeId> = entries.into_iter().collect();
	let index: HashMap<NodeId, usize> = order
		.iter()
		.enumerate()
		.map(|(position, id)| (*id, position))
		.collect();

	let mut graph = DependencyGraph::default();
	for (position, stable_id) in order.iter().enumerate() {
		let node_parents = match parents.get(stable_id) {
			Some(list) => list
				.iter()
				.map(|parent| {
					index
						.get(parent)
						.copied()
						.ok_or(GraphError::UnknownParent {
							node: *stable_id,
							parent: *parent,
						})
				})
				.collect::<Result<Vec<_>, _>>()?,
			None => Vec::new(),
		};
		if node_parents.is_empty() {
			graph.root_ids.push(position);
		}
		graph.nodes.push(GraphNode {
			id: position,
			parents: node_parents,
		});
	}
	Ok(graph)
}

/// Returns every path from `node` to each ancestor root.
///
/// A root yields the single empty path `[[]]`. Paths are produced in
/// depth-first order following parent order, so a node derived from `[a, b]`
/// lists the paths through `a` before those through `b`.
pub fn find_paths_to_roots(graph: &DependencyGraph, node: usize) -> Result<Vec<Path>, GraphError> {
	let mut on_stack = vec![false; graph.len()];
	let mut path = Vec::new();
	let mut paths = Vec::new();
	walk_paths(graph, node, &mut path, &mut on_stack, &mut paths)?;
	Ok(paths)
}

fn walk_paths(
	graph: &DependencyGraph,
	node: usize,
	path: &mut Path,
	on_stack: &mut [bool],
	paths: &mut Vec<Path>,
) -> Result<(), GraphError> {
	let current = graph.node(node)?;
	if current.is_root() {
		if paths.len() >= MAX_PATH_COUNT {
			return Err(GraphError::TooManyPaths(MAX_PATH_COUNT));
		}
		paths.push(path.clone());
		return Ok(());
	}
	if path.len() >= MAX_TRAVERSAL_DEPTH {
		return Err(GraphError::MaxDepthExceeded(MAX_TRAVERSAL_DEPTH));
	}
	if on_stack[node] {
		return Err(GraphError::Cycle(node));
	}

	on_stack[node] = true;
	for (step, &parent) in current.parents.iter().enumerate() {
		path.push(step);
		walk_paths(graph, parent, path, on_stack, paths)?;
		path.pop();
	}
	on_stack[node] = false;
	Ok(())
}

/// Follows `path` from `node` and returns the root it ends at.
pub fn resolve_path(graph: &DependencyGraph, node: usize, path: &[usize]) -> Result<usize, GraphError> {
	if path.len() > MAX_TRAVERSAL_DEPTH {
		return Err(GraphError::MaxDepthExceeded(MAX_TRAVERSAL_DEPTH));
	}

	let mut current = graph.node(node)?;
	for &step in path {
		let parent = current
			.parents
			.get(step)
			.copied()
			.ok_or(GraphError::ParentIndexOutOfRange {
				node: current.id,
				index: step,
				arity: current.parents.len(),
			})?;
		current = graph.node(parent)?;
	}

	if current.is_root() {
		Ok(current.id)
	} else {
		Err(GraphError::NotARoot {
			from: node,
			to: current.id,
		})
	}
}

/// Returns `nodes` together with all of their transitive ancestors.
pub fn ancestors<I>(graph: &DependencyGraph, nodes: I) -> Result<BTreeSet<usize>, GraphError>
where
	I: IntoIterator<Item = usize>,
{
	let mut seen = BTreeSet::new();
	let mut worklist: Vec<usize> = nodes.into_iter().collect();
	while let Some(id) = worklist.pop() {
		let node = graph.node(id)?;
		if seen.insert(id) {
			worklist.extend(node.parents.iter().copied());
		}
	}
	Ok(seen)
}

fn detect_cycles(graph: &DependencyGraph) -> Result<(), GraphError> {
	#[derive(Clone, Copy, PartialEq)]
	enum Mark {
		Unvisited,
		Active,
		Done,
	}

	let mut marks = vec![Mark::Unvisited; graph.len()];
	for start in 0..graph.len() {
		if marks[start] != Mark::Unvisited {
			continue;
		}
		// Explicit stack of (node, next parent slot) so deep chains cannot
		// overflow the call stack.
		let mut stack = vec![(start, 0usize)];
		marks[start] = Mark::Active;
		while let Some((id, slot)) = stack.last_mut() {
			let id = *id;
			if let Some(&parent) = graph.nodes[id].parents.get(*slot) {
				*slot += 1;
				match marks[parent] {
					Mark::Active => return Err(GraphError::Cycle(parent)),
					Mark::Unvisited => {
						marks[parent] = Mark::Active;
						stack.push((parent, 0));
					}
					Mark::Done => {}
				}
			} else {
				marks[id] = Mark::Done;
				stack.pop();
			}
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	fn graph_of(parents: &[&[usize]]) -> DependencyGraph {
		let nodes: Vec<GraphNode> = parents
			.iter()
			.enumerate()
			.map(|(id, p)| GraphNode {
				id,
				parents: p.to_vec(),
			})
			.collect();
		let root_ids = nodes.iter().filter(|n| n.is_root()).map(|n| n.id).collect();
		DependencyGraph { nodes, root_ids }
	}

	/// a(0) <- b(1) <- c(2); x(3) root; sum(4) over [c, x]
	#[fixture]
	fn chain_and_sum() -> DependencyGraph {
		graph_of(&[&[], &[0], &[1], &[], &[2, 3]])
	}

	#[rstest]
	fn test_build_graph_numbers_by_registration_order() {
		let a = NodeId::new();
		let b = NodeId::new();
		let sum = NodeId::new();
		let mut parents = HashMap::new();
		parents.insert(sum, vec![b, a]);

		let graph = build_graph([a, b, sum], &parents).unwrap();

		assert_eq!(graph.root_ids, vec![0, 1]);
		assert_eq!(graph.nodes[2].parents, vec![1, 0]);
		assert!(graph.validate().is_ok());
	}

	#[rstest]
	fn test_build_graph_accepts_forward_reference() {
		let child = NodeId::new();
		let parent = NodeId::new();
		let mut parents = HashMap::new();
		parents.insert(child, vec![parent]);

		let graph = build_graph([child, parent], &parents).unwrap();

		assert_eq!(graph.nodes[0].parents, vec![1]);
		assert_eq!(graph.root_ids, vec![1]);
		assert_eq!(find_paths_to_roots(&graph, 0).unwrap(), vec![vec![0]]);
	}

	#[rstest]
	fn test_build_graph_unknown_parent() {
		let child = NodeId::new();
		let ghost = NodeId::new();
		let mut parents = HashMap::new();
		parents.insert(child, vec![ghost]);

		let err = build_graph([child], &parents).unwrap_err();
		assert_eq!(
			err,
			GraphError::UnknownParent {
				node: child,
				parent: ghost
			}
		);
	}

	#[rstest]
	#[case::root(0, vec![vec![]])]
	#[case::chain(2, vec![vec![0, 0]])]
	#[case::multi_root(4, vec![vec![0, 0, 0], vec![1]])]
	fn test_find_paths_to_roots(
		chain_and_sum: DependencyGraph,
		#[case] node: usize,
		#[case] expected: Vec<Path>,
	) {
		assert_eq!(find_paths_to_roots(&chain_and_sum, node).unwrap(), expected);
	}

	#[rstest]
	fn test_paths_resolve_to_roots(chain_and_sum: DependencyGraph) {
		let paths = find_paths_to_roots(&chain_and_sum, 4).unwrap();
		let roots: Vec<usize> = paths
			.iter()
			.map(|p| resolve_path(&chain_and_sum, 4, p).unwrap())
			.collect();
		assert_eq!(roots, vec![0, 3]);
	}

	#[rstest]
	fn test_diamond_yields_one_path_per_route() {
		// a(0); l(1) <- a; r(2) <- a; j(3) <- [l, r]
		let graph = graph_of(&[&[], &[0], &[0], &[1, 2]]);
		let paths = find_paths_to_roots(&graph, 3).unwrap();
		assert_eq!(paths, vec![vec![0, 0], vec![1, 0]]);
	}

	#[rstest]
	fn test_cycle_is_detected() {
		let graph = graph_of(&[&[], &[2], &[1]]);
		assert_eq!(find_paths_to_roots(&graph, 1), Err(GraphError::Cycle(1)));
		assert!(matches!(graph.validate(), Err(GraphError::Cycle(_))));
	}

	#[rstest]
	fn test_self_loop_is_detected() {
		let graph = graph_of(&[&[0]]);
		assert_eq!(find_paths_to_roots(&graph, 0), Err(GraphError::Cycle(0)));
	}

	#[rstest]
	fn test_depth_cap() {
		let parents: Vec<Vec<usize>> = (0..=MAX_TRAVERSAL_DEPTH + 1)
			.map(|i| if i == 0 { vec![] } else { vec![i - 1] })
			.collect();
		let refs: Vec<&[usize]> = parents.iter().map(Vec::as_slice).collect();
		let graph = graph_of(&refs);

		assert_eq!(
			find_paths_to_roots(&graph, MAX_TRAVERSAL_DEPTH + 1),
			Err(GraphError::MaxDepthExceeded(MAX_TRAVERSAL_DEPTH))
		);
		assert_eq!(
			find_paths_to_roots(&graph, MAX_TRAVERSAL_DEPTH).unwrap().len(),
			1
		);
	}

	/// `layers` diamonds stacked on one root: each layer adds a left and a
	/// right value over the previous join, then joins them.
	fn stacked_diamonds(layers: usize) -> DependencyGraph {
		let mut parents: Vec<Vec<usize>> = vec![vec![]];
		for _ in 0..layers {
			let top = parents.len() - 1;
			parents.push(vec![top]);
			parents.push(vec![top]);
			parents.push(vec![top + 1, top + 2]);
		}
		let refs: Vec<&[usize]> = parents.iter().map(Vec::as_slice).collect();
		graph_of(&refs)
	}

	#[rstest]
	fn test_path_count_cap() {
		let at_cap = stacked_diamonds(12);
		let paths = find_paths_to_roots(&at_cap, at_cap.len() - 1).unwrap();
		assert_eq!(paths.len(), MAX_PATH_COUNT);
		assert!(paths.iter().all(|path| path.len() == 24));

		let over_cap = stacked_diamonds(13);
		assert_eq!(
			find_paths_to_roots(&over_cap, over_cap.len() - 1),
			Err(GraphError::TooManyPaths(MAX_PATH_COUNT))
		);
		// Ancestor collection visits each node once and is unaffected.
		assert_eq!(ancestors(&over_cap, [over_cap.len() - 1]).unwrap().len(), over_cap.len());
	}

	#[rstest]
	fn test_resolve_path_errors(chain_and_sum: DependencyGraph) {
		assert_eq!(
			resolve_path(&chain_and_sum, 9, &[]),
			Err(GraphError::NodeOutOfRange { id: 9, len: 5 })
		);
		assert_eq!(
			resolve_path(&chain_and_sum, 4, &[2]),
			Err(GraphError::ParentIndexOutOfRange {
				node: 4,
				index: 2,
				arity: 2
			})
		);
		assert_eq!(
			resolve_path(&chain_and_sum, 4, &[0]),
			Err(GraphError::NotARoot { from: 4, to: 2 })
		);
	}

	#[rstest]
	fn test_ancestors_closure(chain_and_sum: DependencyGraph) {
		let closure = ancestors(&chain_and_sum, [2]).unwrap();
		assert_eq!(closure.into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
	}

	#[rstest]
	fn test_validate_rejects_bad_shapes(chain_and_sum: DependencyGraph) {
		let mut graph = chain_and_sum.clone();
		graph.root_ids.pop();
		assert_eq!(graph.validate(), Err(GraphError::RootMismatch));

		let mut graph = chain_and_sum.clone();
		graph.nodes[1].id = 7;
		assert_eq!(
			graph.validate(),
			Err(GraphError::Misnumbered { index: 1, id: 7 })
		);

		let mut graph = chain_and_sum;
		graph.nodes[2].parents = vec![42];
		assert_eq!(
			graph.validate(),
			Err(GraphError::NodeOutOfRange { id: 42, len: 5 })
		);
	}

	#[rstest]
	fn test_wire_names() {
		let graph = graph_of(&[&[], &[0]]);
		let json = serde_json::to_value(&graph).unwrap();
		assert_eq!(
			json,
			serde_json::json!({
				"nodes": [{"id": 0, "parents": []}, {"id": 1, "parents": [0]}],
				"rootIds": [0]
			})
		);
	}
}
