//! Graph construction and rebuild properties through the public API.

use approx::assert_relative_eq;
use serde_json::json;
use spacemap::components::spacemap::{
	Accessor, CarryForward, ConstraintDecl, ConstraintKind, ConstraintScale, Datum, LayoutState, NodeRole, Point,
	Size, SpacemapOptions, build, evaluate,
};

fn size() -> Size {
	Size::new(300.0, 200.0)
}

fn dataset() -> Vec<Datum> {
	vec![
		json!({"name": "ant", "v": 4, "cat": "insect", "tags": ["small", "social"], "pos": {"x": 1, "y": 2}}),
		json!({"name": "bee", "v": 9, "cat": "insect", "tags": ["social"], "pos": {"x": 3, "y": 8}}),
		json!({"name": "cat", "v": 1, "cat": "mammal", "tags": [], "pos": {"x": 2, "y": 5}}),
	]
}

fn every_kind() -> Vec<ConstraintDecl> {
	vec![
		ConstraintDecl::new(ConstraintKind::X, Accessor::field("v"), 1.0),
		ConstraintDecl::new(ConstraintKind::OrdinalY, Accessor::field("cat"), 0.8),
		ConstraintDecl::new(ConstraintKind::Xy, Accessor::field("pos"), 0.5),
		ConstraintDecl::new(ConstraintKind::Link, Accessor::field("tags"), 0.2),
		ConstraintDecl::new(ConstraintKind::Link, Accessor::field("cat"), 0.4),
	]
}

#[test]
fn primaries_match_the_dataset_for_any_constraint_list() {
	let data = dataset();
	let all = every_kind();
	for n in 0..=all.len() {
		let graph = build(&data, &all[..n], size()).unwrap();
		assert_eq!(graph.primary_count, data.len());
		assert_eq!(graph.nodes.iter().filter(|n| n.is_primary()).count(), data.len());
		for (i, node) in graph.nodes[..data.len()].iter().enumerate() {
			assert!(node.is_primary());
			assert_eq!(node.datum, i);
		}
		assert!(graph.edges.iter().all(|e| graph.nodes[e.source].is_primary()));
		assert!(graph.edges.iter().all(|e| !graph.nodes[e.target].is_primary()));
	}
}

#[test]
fn link_hubs_equal_distinct_values() {
	let graph = build(&dataset(), &every_kind(), size()).unwrap();

	// tags: small, social
	assert_eq!(graph.auxiliaries(3).count(), 2);
	assert_eq!(graph.auxiliary_index[3].len(), 2);
	// cat: insect, mammal
	assert_eq!(graph.auxiliaries(4).count(), 2);

	let insect = graph.auxiliary_index[4]["insect"];
	let sources: Vec<_> = graph.edges.iter().filter(|e| e.target == insect).map(|e| e.source).collect();
	assert_eq!(sources, vec![0, 1]);
	assert!(graph.edges.iter().filter(|e| e.target == insect).all(|e| e.strength == 0.4));
}

#[test]
fn constraints_keep_declaration_order() {
	let graph = build(&dataset(), &every_kind(), size()).unwrap();
	let owners: Vec<_> = graph.nodes.iter().filter_map(|n| n.constraint()).collect();
	let mut sorted = owners.clone();
	sorted.sort();
	assert_eq!(owners, sorted);
}

#[test]
fn x_scale_maps_the_documented_example() {
	let data = vec![json!({"v": 1}), json!({"v": 2}), json!({"v": 3})];
	let decl = ConstraintDecl::new(ConstraintKind::X, Accessor::func(|d| Ok(d["v"].clone())), 1.0);
	let eval = evaluate(0, &decl, &data, Size::new(640.0, 480.0)).unwrap();
	let ConstraintScale::Linear { scale, .. } = eval.scale else {
		panic!("x constraints build a linear scale");
	};
	assert_eq!(scale.domain, (1.0, 3.0));
	assert_relative_eq!(scale.apply(1.0), 0.0);
	assert_relative_eq!(scale.apply(2.0), 320.0);
	assert_relative_eq!(scale.apply(3.0), 640.0);
}

#[test]
fn rebuilding_unchanged_input_is_idempotent() {
	let data = dataset();
	let constraints = every_kind();
	let first = build(&data, &constraints, size()).unwrap();
	let second = build(&data, &constraints, size()).unwrap();
	assert_eq!(first.scales, second.scales);
	assert_eq!(first.edges, second.edges);
	let snaps = |g: &spacemap::components::spacemap::ConstraintGraph| g.nodes.iter().map(|n| n.snap).collect::<Vec<_>>();
	assert_eq!(snaps(&first), snaps(&second));

	let ConstraintScale::Plane { x, y } = &first.scales[2] else {
		panic!("xy constraints build a plane scale");
	};
	assert_eq!(x.domain, (1.0, 3.0));
	assert_eq!(y.domain, (2.0, 8.0));
}

#[test]
fn shared_category_example_has_one_hub() {
	let data = vec![json!({"cat": "A"}), json!({"cat": "A"})];
	let constraints = vec![ConstraintDecl::new(ConstraintKind::Link, Accessor::field("cat"), 1.0)];
	let graph = build(&data, &constraints, size()).unwrap();

	let hubs: Vec<_> = graph.auxiliaries(0).collect();
	assert_eq!(hubs.len(), 1);
	assert!(matches!(&hubs[0].role, NodeRole::Auxiliary { value, .. } if value == "A"));
	assert_eq!(graph.edges.len(), 2);
	assert!(graph.edges.iter().all(|e| e.target == 2));
}

#[test]
fn structurally_equal_values_collapse() {
	let data = vec![json!({"k": {"a": 1}}), json!({"k": {"a": 1}}), json!({"k": 1}), json!({"k": "1"})];
	let constraints = vec![ConstraintDecl::new(ConstraintKind::Link, Accessor::field("k"), 1.0)];
	let graph = build(&data, &constraints, size()).unwrap();
	// {"a":1} once, then 1 and "1" share the key "1"
	assert_eq!(graph.auxiliary_index[0].len(), 2);
}

#[test]
fn integral_floats_share_a_hub_with_integers() {
	let data = vec![json!({"k": 1}), json!({"k": 1.0}), json!({"k": [2.0, {"n": 3.0}]}), json!({"k": [2, {"n": 3}]})];
	let constraints = vec![ConstraintDecl::new(ConstraintKind::Link, Accessor::field("k"), 1.0)];
	let options = SpacemapOptions {
		data: data.clone(),
		constraints: constraints.clone(),
		..Default::default()
	};
	let graph = build(&data, &constraints, size()).unwrap();
	// 1, then the array elements 2 and {"n":3}
	assert_eq!(graph.auxiliary_index[0].len(), 3);
	assert!(graph.auxiliary_index[0].contains_key("1"));
	assert!(graph.auxiliary_index[0].contains_key(r#"{"n":3}"#));
	assert_eq!(graph.edges.iter().filter(|e| e.target == graph.auxiliary_index[0]["1"]).count(), 2);

	let mut state = LayoutState::default();
	state.rebuild(&options, size()).unwrap();
	assert_eq!(state.labels()[4], "1");
}

#[test]
fn shrinking_and_growing_carries_positions_by_index() {
	let mut options = SpacemapOptions {
		data: dataset(),
		constraints: every_kind(),
		..Default::default()
	};
	let mut state = LayoutState::default();
	state.rebuild(&options, size()).unwrap();
	for (i, node) in state.nodes_mut().iter_mut().enumerate() {
		node.pos = Some(Point::new(i as f64, 0.0));
	}
	let before = state.nodes().len();

	options.constraints.truncate(1);
	state.rebuild(&options, size()).unwrap();
	let after = state.nodes().len();
	assert!(after < before);
	for (i, node) in state.nodes().iter().enumerate() {
		assert_eq!(node.pos, Some(Point::new(i as f64, 0.0)));
	}

	options.constraints = every_kind();
	state.rebuild(&options, size()).unwrap();
	for (i, node) in state.nodes().iter().enumerate() {
		let expected = (i < after).then(|| Point::new(i as f64, 0.0));
		assert_eq!(node.pos, expected, "node {i}");
	}
	assert_eq!(state.generation(), 3);
}

#[test]
fn identity_policy_survives_a_removed_constraint() {
	let mut options = SpacemapOptions {
		data: dataset(),
		constraints: every_kind(),
		..Default::default()
	};
	let mut state = LayoutState::new(CarryForward::ByIdentity);
	state.rebuild(&options, size()).unwrap();
	for (i, node) in state.nodes_mut().iter_mut().enumerate() {
		node.pos = Some(Point::new(i as f64, 1.0));
	}
	let social_before = state.graph().auxiliary_index[3]["social"];

	// dropping the x constraint shifts every later node down by three slots
	options.constraints.remove(0);
	state.rebuild(&options, size()).unwrap();
	let social_after = state.graph().auxiliary_index[2]["social"];
	assert_eq!(social_after + 3, social_before);
	// constraint indices shift too, so the hub is a new identity
	assert_eq!(state.nodes()[social_after].pos, None);
	assert_eq!(state.nodes()[0].pos, Some(Point::new(0.0, 1.0)));
}

#[test]
fn json_configuration_builds_end_to_end() {
	let options = SpacemapOptions::from_json(
		r#"{
			"data": [{"name": "a", "g": "x", "lat": 1, "lng": 2}, {"name": "b", "g": "y", "lat": 3, "lng": 4}],
			"constraints": [
				{"type": "ordinalx", "accessor": {"field": "g"}, "strength": 0.7, "name": "group"},
				{"type": "map", "accessor": {"lat": "lat", "lng": "lng"}, "strength": 0.3}
			],
			"linkDistance": 40,
			"label": "name"
		}"#,
	)
	.unwrap();
	assert_eq!(options.link_distance, 40.0);

	let mut state = LayoutState::default();
	state.rebuild(&options, size()).unwrap();
	assert_eq!(state.labels()[..2], ["a", "b"]);
	assert_eq!(state.labels()[2..4], ["x", "y"]);
	assert_eq!(state.labels()[4..], ["", ""]);
	assert_eq!(state.graph().overlay_opacity, 0.3);
}

#[test]
fn unknown_types_are_rejected_at_parse_time() {
	let err = SpacemapOptions::from_json(r#"{"constraints": [{"type": "radial", "accessor": "v"}]}"#).unwrap_err();
	assert!(err.to_string().contains("radial"));
}
