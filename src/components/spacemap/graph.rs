//! Compiles a dataset and an ordered constraint list into a node/edge graph.
//!
//! The node sequence always starts with one primary node per datum, in
//! dataset order. Constraints are then visited in declaration order and
//! append their auxiliary nodes, so declaration order also fixes colour index
//! and drawing order. Every edge points from a primary node to an auxiliary
//! node.

use std::collections::{HashMap, HashSet};

use super::constraint::{ConstraintScale, Evaluation, Snap, category_keys, evaluate};
use super::error::{Error, Result};
use super::geo::{GeographicBounds, LatLngBounds};
use super::types::{ConstraintDecl, ConstraintKind, Datum, Point, Size};

/// What a layout node stands for.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeRole {
	/// The node for one datum.
	Primary,
	/// The projection of a datum through one constraint. Under a `link`
	/// constraint it is a hub shared by every datum with the same value.
	Auxiliary {
		/// Index of the owning constraint.
		constraint: usize,
		/// Type of the owning constraint.
		kind: ConstraintKind,
		/// Canonical key of the accessor output.
		value: String,
		/// Strength of the owning constraint.
		strength: f64,
	},
}

/// Stable semantic identity of a node, independent of its array position.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKey {
	/// Primary node of a datum.
	Primary(usize),
	/// Unshared auxiliary node.
	Auxiliary {
		/// Owning constraint.
		constraint: usize,
		/// Projected datum.
		datum: usize,
		/// Canonical value.
		value: String,
	},
	/// `link` hub, shared across data.
	Hub {
		/// Owning constraint.
		constraint: usize,
		/// Canonical value.
		value: String,
	},
}

/// One node of the force graph.
#[derive(Clone, Debug)]
pub struct LayoutNode {
	/// Index of the datum this node projects. For hubs, the first datum seen.
	pub datum: usize,
	/// Primary or auxiliary.
	pub role: NodeRole,
	/// Hard target re-applied after every step.
	pub snap: Snap,
	/// Simulation-owned position. `None` until the engine seeds it.
	pub pos: Option<Point>,
	/// Pixel anchor written by the projection adapter for map snaps.
	pub map: Option<Point>,
}

impl LayoutNode {
	fn primary(datum: usize) -> Self {
		Self {
			datum,
			role: NodeRole::Primary,
			snap: Snap::Free,
			pos: None,
			map: None,
		}
	}

	/// Whether this is the node of a datum itself.
	pub fn is_primary(&self) -> bool {
		matches!(self.role, NodeRole::Primary)
	}

	/// Index of the owning constraint, `None` for primary nodes.
	pub fn constraint(&self) -> Option<usize> {
		match self.role {
			NodeRole::Primary => None,
			NodeRole::Auxiliary { constraint, .. } => Some(constraint),
		}
	}

	/// Identity used by [`CarryForward::ByIdentity`](super::CarryForward::ByIdentity).
	pub fn key(&self) -> NodeKey {
		match &self.role {
			NodeRole::Primary => NodeKey::Primary(self.datum),
			NodeRole::Auxiliary {
				constraint,
				kind: ConstraintKind::Link,
				value,
				..
			} => NodeKey::Hub {
				constraint: *constraint,
				value: value.clone(),
			},
			NodeRole::Auxiliary {
				constraint, value, ..
			} => NodeKey::Auxiliary {
				constraint: *constraint,
				datum: self.datum,
				value: value.clone(),
			},
		}
	}

	/// Hard-snaps the node onto its constraint target.
	pub fn apply_constraint(&mut self) {
		self.snap.apply(&mut self.pos, self.map);
	}
}

/// A spring from a primary node to an auxiliary node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutEdge {
	/// Index of the primary node.
	pub source: usize,
	/// Index of the auxiliary node.
	pub target: usize,
	/// Strength of the target's owning constraint.
	pub strength: f64,
}

/// Output of one graph build.
#[derive(Clone, Debug, Default)]
pub struct ConstraintGraph {
	/// Primary nodes first, then auxiliaries in constraint order.
	pub nodes: Vec<LayoutNode>,
	/// Springs, primary to auxiliary.
	pub edges: Vec<LayoutEdge>,
	/// Per constraint: canonical value to hub node index. Only `link`
	/// constraints share nodes, so other entries stay empty.
	pub auxiliary_index: Vec<HashMap<String, usize>>,
	/// Per constraint, in declaration order.
	pub scales: Vec<ConstraintScale>,
	/// Background map opacity: the largest `map` constraint strength.
	pub overlay_opacity: f64,
	/// Number of primary nodes, equal to the dataset length.
	pub primary_count: usize,
}

impl ConstraintGraph {
	/// The leading primary nodes.
	pub fn primaries(&self) -> &[LayoutNode] {
		&self.nodes[..self.primary_count]
	}

	/// Nodes owned by constraint `index`.
	pub fn auxiliaries(&self, index: usize) -> impl Iterator<Item = &LayoutNode> {
		self.nodes.iter().filter(move |n| n.constraint() == Some(index))
	}

	/// Whether any node follows a map anchor.
	pub fn has_map_constraint(&self) -> bool {
		self.nodes.iter().any(|n| matches!(n.snap, Snap::Map(_)))
	}

	/// Smallest box around every map anchor.
	pub fn map_bounds(&self) -> Option<LatLngBounds> {
		let mut anchors = self.nodes.iter().filter_map(|n| match n.snap {
			Snap::Map(anchor) => Some(anchor),
			_ => None,
		});
		let mut bounds = LatLngBounds::from_point(anchors.next()?);
		anchors.for_each(|a| bounds.extend(a));
		Some(bounds)
	}
}

/// Builds the constraint graph. Runs every accessor; nothing is returned
/// unless every constraint evaluated cleanly.
pub fn build(data: &[Datum], constraints: &[ConstraintDecl], size: Size) -> Result<ConstraintGraph> {
	let mut names = HashSet::new();
	for decl in constraints {
		if let Some(name) = &decl.name {
			if !names.insert(name.as_str()) {
				return Err(Error::DuplicateConstraint(name.clone()));
			}
		}
	}

	let mut graph = ConstraintGraph {
		nodes: (0..data.len()).map(LayoutNode::primary).collect(),
		primary_count: data.len(),
		..Default::default()
	};

	for (index, decl) in constraints.iter().enumerate() {
		let eval = evaluate(index, decl, data, size)?;
		let mut hubs: HashMap<String, usize> = HashMap::new();

		if eval.kind == ConstraintKind::Map {
			graph.overlay_opacity = graph.overlay_opacity.max(eval.strength);
		}

		for (datum, output) in eval.outputs.iter().enumerate() {
			for value in category_keys(output) {
				let target = if eval.kind == ConstraintKind::Link {
					match hubs.get(&value) {
						Some(&hub) => hub,
						None => {
							let hub = push_auxiliary(&mut graph.nodes, datum, index, &eval, value.clone(), Snap::Free);
							hubs.insert(value, hub);
							hub
						}
					}
				} else {
					push_auxiliary(&mut graph.nodes, datum, index, &eval, value, eval.snaps[datum])
				};
				graph.edges.push(LayoutEdge {
					source: datum,
					target,
					strength: eval.strength,
				});
			}
		}

		graph.auxiliary_index.push(hubs);
		graph.scales.push(eval.scale);
	}

	Ok(graph)
}

fn push_auxiliary(
	nodes: &mut Vec<LayoutNode>,
	datum: usize,
	constraint: usize,
	eval: &Evaluation,
	value: String,
	snap: Snap,
) -> usize {
	nodes.push(LayoutNode {
		datum,
		role: NodeRole::Auxiliary {
			constraint,
			kind: eval.kind,
			value,
			strength: eval.strength,
		},
		snap,
		pos: None,
		map: None,
	});
	nodes.len() - 1
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::components::spacemap::types::Accessor;

	fn size() -> Size {
		Size::new(100.0, 100.0)
	}

	#[test]
	fn primaries_lead_in_dataset_order() {
		let data = vec![json!({"c": "a"}), json!({"c": "b"}), json!({"c": "a"})];
		let constraints = vec![ConstraintDecl::new(ConstraintKind::Link, Accessor::field("c"), 0.5)];
		let graph = build(&data, &constraints, size()).unwrap();

		assert_eq!(graph.primary_count, 3);
		for (i, node) in graph.primaries().iter().enumerate() {
			assert!(node.is_primary());
			assert_eq!(node.datum, i);
		}
	}

	#[test]
	fn link_values_share_one_hub() {
		let data = vec![json!({"c": "A"}), json!({"c": "A"})];
		let constraints = vec![ConstraintDecl::new(ConstraintKind::Link, Accessor::field("c"), 1.0)];
		let graph = build(&data, &constraints, size()).unwrap();

		assert_eq!(graph.nodes.len(), 3);
		assert_eq!(graph.edges.len(), 2);
		assert!(graph.edges.iter().all(|e| e.target == 2));
		assert_eq!(graph.auxiliary_index[0].get("A"), Some(&2));
	}

	#[test]
	fn non_link_constraints_never_share() {
		let data = vec![json!({"c": "A"}), json!({"c": "A"})];
		let constraints = vec![ConstraintDecl::new(ConstraintKind::OrdinalX, Accessor::field("c"), 1.0)];
		let graph = build(&data, &constraints, size()).unwrap();

		assert_eq!(graph.nodes.len(), 4);
		assert_eq!(
			graph.edges,
			vec![
				LayoutEdge { source: 0, target: 2, strength: 1.0 },
				LayoutEdge { source: 1, target: 3, strength: 1.0 },
			]
		);
		assert!(graph.auxiliary_index[0].is_empty());
	}

	#[test]
	fn array_outputs_fan_out_per_value() {
		let data = vec![json!({"tags": ["x", "y"]}), json!({"tags": ["y"]})];
		let constraints = vec![ConstraintDecl::new(ConstraintKind::Link, Accessor::field("tags"), 0.3)];
		let graph = build(&data, &constraints, size()).unwrap();

		assert_eq!(graph.auxiliary_index[0].len(), 2);
		assert_eq!(graph.edges.len(), 3);
		let hub_y = graph.auxiliary_index[0]["y"];
		assert_eq!(graph.edges.iter().filter(|e| e.target == hub_y).count(), 2);
	}

	#[test]
	fn overlay_opacity_is_the_strongest_map_constraint() {
		let data = vec![json!({"lat": 0, "lng": 0}), json!({"lat": 10, "lng": -20})];
		let geo = || Accessor::LatLng {
			lat: "lat".into(),
			lng: "lng".into(),
		};
		let constraints = vec![
			ConstraintDecl::new(ConstraintKind::Map, geo(), 0.25),
			ConstraintDecl::new(ConstraintKind::Map, geo(), 0.75),
		];
		let graph = build(&data, &constraints, size()).unwrap();
		assert_eq!(graph.overlay_opacity, 0.75);
		assert!(graph.has_map_constraint());
		let bounds = graph.map_bounds().unwrap();
		assert_eq!(bounds.get_center(), crate::components::spacemap::geo::LatLng::new(5.0, -10.0));
	}

	#[test]
	fn duplicate_names_abort_the_build() {
		let constraints = vec![
			ConstraintDecl::new(ConstraintKind::X, Accessor::field("v"), 1.0).named("pos"),
			ConstraintDecl::new(ConstraintKind::Y, Accessor::field("v"), 1.0).named("pos"),
		];
		assert!(matches!(
			build(&[json!({"v": 1})], &constraints, size()),
			Err(Error::DuplicateConstraint(ref n)) if n == "pos"
		));
	}

	#[test]
	fn node_keys_identify_hubs_by_value() {
		let data = vec![json!({"c": "A", "v": 1}), json!({"c": "A", "v": 2})];
		let constraints = vec![
			ConstraintDecl::new(ConstraintKind::X, Accessor::field("v"), 1.0),
			ConstraintDecl::new(ConstraintKind::Link, Accessor::field("c"), 1.0),
		];
		let graph = build(&data, &constraints, size()).unwrap();
		assert_eq!(graph.nodes[0].key(), NodeKey::Primary(0));
		assert_eq!(
			graph.nodes[3].key(),
			NodeKey::Auxiliary {
				constraint: 0,
				datum: 1,
				value: "2".into()
			}
		);
		assert_eq!(
			graph.nodes[4].key(),
			NodeKey::Hub {
				constraint: 1,
				value: "A".into()
			}
		);
	}
}
