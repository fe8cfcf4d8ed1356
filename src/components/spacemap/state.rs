//! Layout state: the current constraint graph plus everything derived from it
//! that must survive between ticks.
//!
//! A rebuild compiles the new graph off to the side and swaps it in only
//! when every accessor succeeded, so a failing configuration leaves the
//! previous layout on screen.

use std::collections::HashMap;

use log::info;

use super::error::{Error, Result};
use super::graph::{ConstraintGraph, LayoutEdge, LayoutNode, NodeKey, NodeRole, build};
use super::types::{Datum, Point, Size, SpacemapOptions, canonical_key};

/// How positions survive a rebuild.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CarryForward {
	/// Node `i` of the new graph inherits the position of node `i` of the old
	/// one. Reordering nodes reassigns positions to unrelated nodes.
	#[default]
	ByIndex,
	/// Positions follow [`NodeKey`]: datum index, constraint index and value.
	ByIdentity,
}

/// The graph currently on screen, its labels and its generation counter.
#[derive(Debug, Default)]
pub struct LayoutState {
	graph: ConstraintGraph,
	labels: Vec<String>,
	size: Option<Size>,
	generation: u64,
	carry: CarryForward,
}

impl LayoutState {
	/// Empty state with the given carry-forward policy.
	pub fn new(carry: CarryForward) -> Self {
		Self {
			carry,
			..Default::default()
		}
	}

	/// The current graph.
	pub fn graph(&self) -> &ConstraintGraph {
		&self.graph
	}

	/// Nodes of the current graph.
	pub fn nodes(&self) -> &[LayoutNode] {
		&self.graph.nodes
	}

	/// Edges of the current graph.
	pub fn edges(&self) -> &[LayoutEdge] {
		&self.graph.edges
	}

	/// Node positions may change in place; the node set itself only changes
	/// through [`LayoutState::rebuild`].
	pub fn nodes_mut(&mut self) -> &mut [LayoutNode] {
		&mut self.graph.nodes
	}

	/// Mutable nodes alongside the edges, for handing to the physics engine.
	pub fn split_mut(&mut self) -> (&mut [LayoutNode], &[LayoutEdge]) {
		(&mut self.graph.nodes, &self.graph.edges)
	}

	/// Display label per node, parallel to [`LayoutState::nodes`].
	pub fn labels(&self) -> &[String] {
		&self.labels
	}

	/// Canvas size of the last successful rebuild.
	pub fn size(&self) -> Option<Size> {
		self.size
	}

	/// Incremented on every successful rebuild.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Current carry-forward policy.
	pub fn carry_forward(&self) -> CarryForward {
		self.carry
	}

	/// Policy for subsequent rebuilds.
	pub fn set_carry_forward(&mut self, carry: CarryForward) {
		self.carry = carry;
	}

	/// Replaces the graph wholesale. On error nothing is modified.
	pub fn rebuild(&mut self, options: &SpacemapOptions, size: Size) -> Result<()> {
		let mut next = build(&options.data, &options.constraints, size)?;
		let labels = compute_labels(&next, &options.data, options)?;
		self.import_positions(&mut next);

		info!(
			"spacemap: rebuilt layout with {} nodes ({} data), {} links, {} constraints",
			next.nodes.len(),
			next.primary_count,
			next.edges.len(),
			options.constraints.len()
		);

		self.graph = next;
		self.labels = labels;
		self.size = Some(size);
		self.generation += 1;
		Ok(())
	}

	fn import_positions(&self, next: &mut ConstraintGraph) {
		match self.carry {
			CarryForward::ByIndex => {
				for (new, old) in next.nodes.iter_mut().zip(&self.graph.nodes) {
					new.pos = old.pos;
				}
			}
			CarryForward::ByIdentity => {
				let previous: HashMap<NodeKey, Point> = self
					.graph
					.nodes
					.iter()
					.filter_map(|n| n.pos.map(|p| (n.key(), p)))
					.collect();
				for node in &mut next.nodes {
					node.pos = previous.get(&node.key()).copied();
				}
			}
		}
	}

	/// Hard-snaps every constrained node onto its target.
	pub fn apply_constraints(&mut self) {
		for node in &mut self.graph.nodes {
			node.apply_constraint();
		}
	}
}

fn compute_labels(graph: &ConstraintGraph, data: &[Datum], options: &SpacemapOptions) -> Result<Vec<String>> {
	graph
		.nodes
		.iter()
		.map(|node| match &node.role {
			NodeRole::Primary => options
				.label
				.get(&data[node.datum])
				.map(|v| canonical_key(&v))
				.map_err(|source| Error::Label {
					datum: node.datum,
					source,
				}),
			NodeRole::Auxiliary { kind, value, .. } if kind.labels_value() => Ok(value.clone()),
			NodeRole::Auxiliary { .. } => Ok(String::new()),
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::components::spacemap::error::AccessorError;
	use crate::components::spacemap::types::{Accessor, ConstraintDecl, ConstraintKind};

	fn size() -> Size {
		Size::new(200.0, 100.0)
	}

	fn options(data: Vec<Datum>, constraints: Vec<ConstraintDecl>) -> SpacemapOptions {
		SpacemapOptions {
			data,
			constraints,
			label: Accessor::field("name"),
			..Default::default()
		}
	}

	fn place_all(state: &mut LayoutState) {
		for (i, node) in state.nodes_mut().iter_mut().enumerate() {
			node.pos = Some(Point::new(i as f64, i as f64 * 10.0));
		}
	}

	#[test]
	fn labels_follow_node_roles() {
		let data = vec![json!({"name": "alpha", "c": "A", "v": 1}), json!({"name": "beta", "c": "B", "v": 2})];
		let constraints = vec![
			ConstraintDecl::new(ConstraintKind::X, Accessor::field("v"), 1.0),
			ConstraintDecl::new(ConstraintKind::OrdinalY, Accessor::field("c"), 1.0),
		];
		let mut state = LayoutState::default();
		state.rebuild(&options(data, constraints), size()).unwrap();

		assert_eq!(state.labels(), &["alpha", "beta", "", "", "A", "B"]);
		assert_eq!(state.generation(), 1);
	}

	#[test]
	fn positions_carry_forward_by_index() {
		let data = vec![json!({"name": "a", "c": "A"}), json!({"name": "b", "c": "B"})];
		let link = ConstraintDecl::new(ConstraintKind::Link, Accessor::field("c"), 1.0);
		let mut state = LayoutState::default();
		state.rebuild(&options(data.clone(), vec![link.clone()]), size()).unwrap();
		place_all(&mut state);

		let mut grown = data;
		grown.push(json!({"name": "c", "c": "C"}));
		state.rebuild(&options(grown, vec![link]), size()).unwrap();

		let positions: Vec<_> = state.nodes().iter().map(|n| n.pos).collect();
		for (i, pos) in positions[..4].iter().enumerate() {
			assert_eq!(*pos, Some(Point::new(i as f64, i as f64 * 10.0)));
		}
		assert_eq!(positions[4..], [None, None]);
	}

	#[test]
	fn positions_carry_forward_by_identity() {
		let data = vec![json!({"name": "a", "c": "A"}), json!({"name": "b", "c": "B"})];
		let link = ConstraintDecl::new(ConstraintKind::Link, Accessor::field("c"), 1.0);
		let mut state = LayoutState::new(CarryForward::ByIdentity);
		state.rebuild(&options(data.clone(), vec![link.clone()]), size()).unwrap();
		place_all(&mut state);
		let hub_b = state.nodes()[3].pos;

		// swapping the data reorders the hubs
		let swapped = vec![data[1].clone(), data[0].clone()];
		state.rebuild(&options(swapped, vec![link]), size()).unwrap();

		let hub = state.graph().auxiliary_index[0]["B"];
		assert_eq!(hub, 2);
		assert_eq!(state.nodes()[hub].pos, hub_b);
	}

	#[test]
	fn failed_rebuild_keeps_the_previous_layout() {
		let data = vec![json!({"name": "a", "v": 1})];
		let good = options(data.clone(), vec![ConstraintDecl::new(ConstraintKind::X, Accessor::field("v"), 1.0)]);
		let mut state = LayoutState::default();
		state.rebuild(&good, size()).unwrap();
		place_all(&mut state);

		let bad = options(data, vec![ConstraintDecl::new(ConstraintKind::X, Accessor::field("missing"), 1.0)]);
		assert!(matches!(state.rebuild(&bad, size()), Err(Error::Accessor { .. })));
		assert_eq!(state.generation(), 1);
		assert_eq!(state.nodes().len(), 2);
		assert_eq!(state.nodes()[1].pos, Some(Point::new(1.0, 10.0)));
	}

	#[test]
	fn label_failures_abort_the_rebuild() {
		let mut opts = options(vec![json!({"v": 1})], Vec::new());
		opts.label = Accessor::func(|_| Err(AccessorError::Custom("no label".into())));
		let mut state = LayoutState::default();
		assert!(matches!(
			state.rebuild(&opts, size()),
			Err(Error::Label { datum: 0, .. })
		));
		assert_eq!(state.generation(), 0);
	}

	#[test]
	fn constraints_snap_positioned_nodes_only() {
		let data = vec![json!({"name": "a", "v": 1}), json!({"name": "b", "v": 3})];
		let mut state = LayoutState::default();
		state
			.rebuild(&options(data, vec![ConstraintDecl::new(ConstraintKind::X, Accessor::field("v"), 1.0)]), size())
			.unwrap();
		state.nodes_mut()[3].pos = Some(Point::new(5.0, 7.0));
		state.apply_constraints();

		assert_eq!(state.nodes()[2].pos, None);
		assert_eq!(state.nodes()[3].pos, Some(Point::new(200.0, 7.0)));
	}
}
