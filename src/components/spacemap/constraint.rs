//! Constraint evaluation: one declaration plus the dataset in, a scale and a
//! per-datum snapping rule out.
//!
//! Accessors are evaluated exactly once per datum during a rebuild. The
//! resulting [`Snap`] targets are plain data, so applying constraints during
//! a tick can never fail.

use serde_json::Value;

use super::error::{AccessorError, Error, Result};
use super::geo::LatLng;
use super::scale::{LinearScale, PointScale};
use super::types::{ConstraintDecl, ConstraintKind, Datum, Point, Size, canonical_key, describe};

/// Hard position target for an auxiliary node, re-applied after every step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Snap {
	/// Unconstrained; only forces move the node.
	#[default]
	Free,
	/// Fixed horizontal pixel coordinate.
	X(f64),
	/// Fixed vertical pixel coordinate.
	Y(f64),
	/// Fixed pixel position.
	Xy(Point),
	/// Follows the pixel anchor projected from this coordinate, when one exists.
	Map(LatLng),
}

impl Snap {
	/// Snaps `pos` to the target. A node without a position yet, or a map
	/// snap without a projected anchor, is left untouched.
	pub fn apply(&self, pos: &mut Option<Point>, anchor: Option<Point>) {
		let Some(p) = pos.as_mut() else {
			return;
		};
		match *self {
			Snap::Free => {}
			Snap::X(x) => p.x = x,
			Snap::Y(y) => p.y = y,
			Snap::Xy(target) => *p = target,
			Snap::Map(_) => {
				if let Some(target) = anchor {
					*p = target;
				}
			}
		}
	}
}

/// Canvas axis a one-dimensional constraint acts on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
	/// Horizontal, spanning the width.
	X,
	/// Vertical, spanning the height.
	Y,
}

/// The scale a constraint built over the dataset.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintScale {
	/// `x` / `y`. Absent when the dataset is empty.
	Linear {
		/// Axis the scale spans.
		axis: Axis,
		/// Accessor value to pixel.
		scale: LinearScale,
	},
	/// `ordinalx` / `ordinaly`.
	Ordinal {
		/// Axis the categories are spread over.
		axis: Axis,
		/// Category key to pixel.
		scale: PointScale,
	},
	/// `xy`.
	Plane {
		/// Horizontal scale of the point's `x`.
		x: LinearScale,
		/// Vertical scale of the point's `y`.
		y: LinearScale,
	},
	/// `map` and `link` have no intrinsic scale.
	None,
}

/// Result of evaluating one constraint against the whole dataset.
#[derive(Clone, Debug)]
pub struct Evaluation {
	/// Type of the evaluated constraint.
	pub kind: ConstraintKind,
	/// Declared strength, validated to lie in [0, 1].
	pub strength: f64,
	/// Scale built over the dataset.
	pub scale: ConstraintScale,
	/// Raw accessor output per datum, in dataset order.
	pub outputs: Vec<Value>,
	/// Snapping rule per datum, in dataset order.
	pub snaps: Vec<Snap>,
}

/// Evaluates constraint `index` over `data` for a canvas of `size`.
pub fn evaluate(index: usize, decl: &ConstraintDecl, data: &[Datum], size: Size) -> Result<Evaluation> {
	if !(0.0..=1.0).contains(&decl.strength) {
		return Err(Error::InvalidStrength {
			constraint: index,
			strength: decl.strength,
		});
	}
	let accessor = decl
		.accessor
		.as_ref()
		.ok_or(Error::MissingAccessor { index })?;
	let outputs = data
		.iter()
		.enumerate()
		.map(|(datum, d)| {
			accessor.get(d).map_err(|source| Error::Accessor {
				constraint: index,
				datum,
				source,
			})
		})
		.collect::<Result<Vec<_>>>()?;
	let fail = |datum: usize, source: AccessorError| Error::Accessor {
		constraint: index,
		datum,
		source,
	};

	let (scale, snaps) = match decl.kind {
		ConstraintKind::X | ConstraintKind::Y => {
			let values = numbers(&outputs).map_err(|(i, e)| fail(i, e))?;
			let (axis, extent) = axis_extent(decl.kind, size);
			let scale = LinearScale::from_extent(values.iter().copied(), extent);
			let snaps = values
				.iter()
				.map(|&v| match (&scale, axis) {
					(Some(s), Axis::X) => Snap::X(s.apply(v)),
					(Some(s), Axis::Y) => Snap::Y(s.apply(v)),
					(None, _) => Snap::Free,
				})
				.collect();
			let scale = scale.map_or(ConstraintScale::None, |scale| ConstraintScale::Linear { axis, scale });
			(scale, snaps)
		}
		ConstraintKind::OrdinalX | ConstraintKind::OrdinalY => {
			let (axis, extent) = axis_extent(decl.kind, size);
			let keys: Vec<String> = outputs.iter().map(canonical_key).collect();
			let scale = PointScale::new(keys.iter().cloned(), extent);
			let snaps = keys
				.iter()
				.map(|k| match (scale.apply(k), axis) {
					(Some(v), Axis::X) => Snap::X(v),
					(Some(v), Axis::Y) => Snap::Y(v),
					(None, _) => Snap::Free,
				})
				.collect();
			(ConstraintScale::Ordinal { axis, scale }, snaps)
		}
		ConstraintKind::Xy => {
			let points = outputs
				.iter()
				.enumerate()
				.map(|(i, v)| {
					let x = field_number(v, "x").map_err(|e| fail(i, e))?;
					let y = field_number(v, "y").map_err(|e| fail(i, e))?;
					Ok(Point::new(x, y))
				})
				.collect::<Result<Vec<_>>>()?;
			let xs = LinearScale::from_extent(points.iter().map(|p| p.x), (0.0, size.width));
			let ys = LinearScale::from_extent(points.iter().map(|p| p.y), (0.0, size.height));
			match (xs, ys) {
				(Some(x), Some(y)) => {
					let snaps = points
						.iter()
						.map(|p| Snap::Xy(Point::new(x.apply(p.x), y.apply(p.y))))
						.collect();
					(ConstraintScale::Plane { x, y }, snaps)
				}
				_ => (ConstraintScale::None, vec![Snap::Free; points.len()]),
			}
		}
		ConstraintKind::Map => {
			let snaps = outputs
				.iter()
				.enumerate()
				.map(|(i, v)| {
					let lat = field_number(v, "lat").map_err(|e| fail(i, e))?;
					let lng = field_number(v, "lng").map_err(|e| fail(i, e))?;
					Ok(Snap::Map(LatLng::new(lat, lng)))
				})
				.collect::<Result<Vec<_>>>()?;
			(ConstraintScale::None, snaps)
		}
		ConstraintKind::Link => (ConstraintScale::None, vec![Snap::Free; outputs.len()]),
	};

	Ok(Evaluation {
		kind: decl.kind,
		strength: decl.strength,
		scale,
		outputs,
		snaps,
	})
}

fn axis_extent(kind: ConstraintKind, size: Size) -> (Axis, (f64, f64)) {
	match kind {
		ConstraintKind::X | ConstraintKind::OrdinalX => (Axis::X, (0.0, size.width)),
		_ => (Axis::Y, (0.0, size.height)),
	}
}

fn numbers(outputs: &[Value]) -> std::result::Result<Vec<f64>, (usize, AccessorError)> {
	outputs
		.iter()
		.enumerate()
		.map(|(i, v)| number(v).map_err(|e| (i, e)))
		.collect()
}

fn number(value: &Value) -> std::result::Result<f64, AccessorError> {
	value.as_f64().ok_or_else(|| AccessorError::Expected {
		expected: "a number",
		found: describe(value),
	})
}

fn field_number(value: &Value, field: &'static str) -> std::result::Result<f64, AccessorError> {
	match value.get(field) {
		Some(v) => number(v),
		None if value.is_object() => Err(AccessorError::MissingField(field.to_string())),
		None => Err(AccessorError::Expected {
			expected: "an object",
			found: describe(value),
		}),
	}
}

/// Splits an accessor output into category memberships: each element of an
/// array is its own category, anything else is a single category.
pub fn category_keys(output: &Value) -> Vec<String> {
	match output {
		Value::Array(items) => items.iter().map(canonical_key).collect(),
		other => vec![canonical_key(other)],
	}
}

#[cfg(test)]
mod tests {
	use approx::assert_relative_eq;
	use serde_json::json;

	use super::*;
	use crate::components::spacemap::types::Accessor;

	fn decl(kind: ConstraintKind, path: &str) -> ConstraintDecl {
		ConstraintDecl::new(kind, Accessor::field(path), 1.0)
	}

	#[test]
	fn x_scale_spans_the_width() {
		let data = vec![json!({"v": 1}), json!({"v": 2}), json!({"v": 3})];
		let eval = evaluate(0, &decl(ConstraintKind::X, "v"), &data, Size::new(600.0, 400.0)).unwrap();
		let ConstraintScale::Linear { axis, scale } = &eval.scale else {
			panic!("expected a linear scale, got {:?}", eval.scale);
		};
		assert_eq!(*axis, Axis::X);
		assert_eq!(scale.domain, (1.0, 3.0));
		assert_eq!(eval.snaps, vec![Snap::X(0.0), Snap::X(300.0), Snap::X(600.0)]);
	}

	#[test]
	fn ordinal_y_uses_first_seen_order() {
		let data = vec![json!({"c": "b"}), json!({"c": "a"}), json!({"c": "b"})];
		let eval = evaluate(0, &decl(ConstraintKind::OrdinalY, "c"), &data, Size::new(10.0, 200.0)).unwrap();
		assert_eq!(eval.snaps, vec![Snap::Y(50.0), Snap::Y(150.0), Snap::Y(50.0)]);
	}

	#[test]
	fn xy_builds_independent_scales() {
		let data = vec![json!({"p": {"x": 0, "y": 10}}), json!({"p": {"x": 5, "y": 20}})];
		let eval = evaluate(0, &decl(ConstraintKind::Xy, "p"), &data, Size::new(100.0, 50.0)).unwrap();
		let ConstraintScale::Plane { x, y } = &eval.scale else {
			panic!("expected a plane scale");
		};
		assert_eq!(x.domain, (0.0, 5.0));
		assert_eq!(y.domain, (10.0, 20.0));
		assert_eq!(eval.snaps[1], Snap::Xy(Point::new(100.0, 50.0)));
	}

	#[test]
	fn map_reads_lat_lng_anchors() {
		let data = vec![json!({"lat": 1.5, "lng": -3})];
		let accessor = Accessor::LatLng {
			lat: "lat".into(),
			lng: "lng".into(),
		};
		let eval = evaluate(
			0,
			&ConstraintDecl::new(ConstraintKind::Map, accessor, 0.5),
			&data,
			Size::new(1.0, 1.0),
		)
		.unwrap();
		assert_eq!(eval.snaps, vec![Snap::Map(LatLng::new(1.5, -3.0))]);
	}

	#[test]
	fn wrong_shapes_report_the_datum() {
		let data = vec![json!({"v": 1}), json!({"v": "two"})];
		let err = evaluate(3, &decl(ConstraintKind::Y, "v"), &data, Size::new(1.0, 1.0)).unwrap_err();
		assert!(matches!(
			err,
			Error::Accessor { constraint: 3, datum: 1, source: AccessorError::Expected { .. } }
		));
	}

	#[test]
	fn missing_accessor_and_bad_strength_are_configuration_errors() {
		let mut d = decl(ConstraintKind::Link, "v");
		d.accessor = None;
		assert!(matches!(
			evaluate(2, &d, &[], Size::new(1.0, 1.0)),
			Err(Error::MissingAccessor { index: 2 })
		));

		let d = ConstraintDecl::new(ConstraintKind::Link, Accessor::field("v"), 1.5);
		assert!(matches!(
			evaluate(0, &d, &[], Size::new(1.0, 1.0)),
			Err(Error::InvalidStrength { .. })
		));
	}

	#[test]
	fn snap_applies_only_constrained_axes() {
		let mut pos = Some(Point::new(1.0, 2.0));
		Snap::X(9.0).apply(&mut pos, None);
		assert_eq!(pos, Some(Point::new(9.0, 2.0)));
		Snap::Map(LatLng::default()).apply(&mut pos, None);
		assert_eq!(pos, Some(Point::new(9.0, 2.0)));
		Snap::Map(LatLng::default()).apply(&mut pos, Some(Point::new(4.0, 4.0)));
		assert_relative_eq!(pos.unwrap().y, 4.0);
	}

	#[test]
	fn arrays_split_into_categories() {
		assert_eq!(category_keys(&json!(["a", 1])), vec!["a", "1"]);
		assert_eq!(category_keys(&json!({"k": 1})), vec![r#"{"k":1}"#]);
	}
}
