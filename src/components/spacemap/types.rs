//! Configuration and data structures consumed by the spacemap component.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{AccessorError, Error};

/// One element of the input dataset. Identity is its position in `data`.
pub type Datum = Value;

/// A position in canvas pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	/// Horizontal pixel offset from the left edge.
	pub x: f64,
	/// Vertical pixel offset from the top edge.
	pub y: f64,
}

impl Point {
	/// Creates a point at `(x, y)`.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Euclidean distance to `other`.
	pub fn distance(self, other: Point) -> f64 {
		let (dx, dy) = (other.x - self.x, other.y - self.y);
		(dx * dx + dy * dy).sqrt()
	}
}

/// Canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
	/// Width in pixels.
	pub width: f64,
	/// Height in pixels.
	pub height: f64,
}

impl Size {
	/// Creates a size of `width` by `height` pixels.
	pub const fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}

	/// Centre of a canvas of this size.
	pub fn center(self) -> Point {
		Point::new(self.width / 2.0, self.height / 2.0)
	}
}

/// The closed set of constraint types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ConstraintKind {
	/// Linear scale on the horizontal axis.
	X,
	/// Linear scale on the vertical axis.
	Y,
	/// Evenly spaced categories on the horizontal axis.
	OrdinalX,
	/// Evenly spaced categories on the vertical axis.
	OrdinalY,
	/// Independent linear scales for a 2D point.
	Xy,
	/// Pixel position projected from a geographic coordinate.
	Map,
	/// Purely topological: data sharing a value meet at a hub node.
	Link,
}

impl ConstraintKind {
	/// Configuration name of the kind, e.g. `"ordinalx"`.
	pub fn as_str(self) -> &'static str {
		match self {
			ConstraintKind::X => "x",
			ConstraintKind::Y => "y",
			ConstraintKind::OrdinalX => "ordinalx",
			ConstraintKind::OrdinalY => "ordinaly",
			ConstraintKind::Xy => "xy",
			ConstraintKind::Map => "map",
			ConstraintKind::Link => "link",
		}
	}

	/// Whether auxiliary nodes of this kind display their category value.
	pub fn labels_value(self) -> bool {
		matches!(
			self,
			ConstraintKind::OrdinalX | ConstraintKind::OrdinalY | ConstraintKind::Link
		)
	}
}

impl FromStr for ConstraintKind {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"x" => Ok(ConstraintKind::X),
			"y" => Ok(ConstraintKind::Y),
			"ordinalx" => Ok(ConstraintKind::OrdinalX),
			"ordinaly" => Ok(ConstraintKind::OrdinalY),
			"xy" => Ok(ConstraintKind::Xy),
			"map" => Ok(ConstraintKind::Map),
			"link" => Ok(ConstraintKind::Link),
			other => Err(Error::UnknownConstraintType(other.to_string())),
		}
	}
}

impl TryFrom<String> for ConstraintKind {
	type Error = Error;

	fn try_from(s: String) -> Result<Self, Self::Error> {
		s.parse()
	}
}

impl From<ConstraintKind> for String {
	fn from(kind: ConstraintKind) -> Self {
		kind.as_str().to_string()
	}
}

impl fmt::Display for ConstraintKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

type AccessorFn = dyn Fn(&Datum) -> Result<Value, AccessorError> + Send + Sync;

/// Maps a datum to the value a constraint or label works with.
///
/// Declarative variants can be written in JSON configuration; `Func` wraps a
/// Rust closure for callers building options in code.
#[derive(Clone)]
pub enum Accessor {
	/// Always returns the same value.
	Value(Value),
	/// Dotted path lookup, e.g. `"address.city"` or `"tags.0"`.
	Field(String),
	/// Builds `{"x": .., "y": ..}` from two paths.
	Point { x: String, y: String },
	/// Builds `{"lat": .., "lng": ..}` from two paths.
	LatLng { lat: String, lng: String },
	/// Arbitrary Rust closure.
	Func(Arc<AccessorFn>),
}

impl Accessor {
	/// Dotted path lookup.
	pub fn field(path: impl Into<String>) -> Self {
		Accessor::Field(path.into())
	}

	/// Wraps a closure.
	pub fn func<F>(f: F) -> Self
	where
		F: Fn(&Datum) -> Result<Value, AccessorError> + Send + Sync + 'static,
	{
		Accessor::Func(Arc::new(f))
	}

	/// Evaluates the accessor on one datum.
	pub fn get(&self, datum: &Datum) -> Result<Value, AccessorError> {
		match self {
			Accessor::Value(v) => Ok(v.clone()),
			Accessor::Field(path) => lookup(datum, path).cloned(),
			Accessor::Point { x, y } => {
				let (x, y) = (lookup(datum, x)?, lookup(datum, y)?);
				Ok(serde_json::json!({ "x": x, "y": y }))
			}
			Accessor::LatLng { lat, lng } => {
				let (lat, lng) = (lookup(datum, lat)?, lookup(datum, lng)?);
				Ok(serde_json::json!({ "lat": lat, "lng": lng }))
			}
			Accessor::Func(f) => f(datum),
		}
	}
}

impl Default for Accessor {
	fn default() -> Self {
		Accessor::Value(Value::String(String::new()))
	}
}

impl fmt::Debug for Accessor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Accessor::Value(v) => f.debug_tuple("Value").field(v).finish(),
			Accessor::Field(p) => f.debug_tuple("Field").field(p).finish(),
			Accessor::Point { x, y } => f.debug_struct("Point").field("x", x).field("y", y).finish(),
			Accessor::LatLng { lat, lng } => f
				.debug_struct("LatLng")
				.field("lat", lat)
				.field("lng", lng)
				.finish(),
			Accessor::Func(_) => f.write_str("Func(..)"),
		}
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AccessorSpec {
	Path(String),
	Field { field: String },
	Value { value: Value },
	Point { x: String, y: String },
	LatLng { lat: String, lng: String },
}

impl<'de> Deserialize<'de> for Accessor {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		Ok(match AccessorSpec::deserialize(deserializer)? {
			AccessorSpec::Path(field) | AccessorSpec::Field { field } => Accessor::Field(field),
			AccessorSpec::Value { value } => Accessor::Value(value),
			AccessorSpec::Point { x, y } => Accessor::Point { x, y },
			AccessorSpec::LatLng { lat, lng } => Accessor::LatLng { lat, lng },
		})
	}
}

fn lookup<'a>(datum: &'a Datum, path: &str) -> Result<&'a Value, AccessorError> {
	if path.is_empty() {
		return Ok(datum);
	}
	path.split('.').try_fold(datum, |value, key| {
		let next = match value {
			Value::Object(map) => map.get(key),
			Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
			_ => None,
		};
		next.ok_or_else(|| AccessorError::MissingField(path.to_string()))
	})
}

/// Canonical string key for an accessor output. Strings are used as-is, any
/// other value is serialized so structurally equal values share a key.
pub fn canonical_key(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => integral(other).to_string(),
	}
}

/// Largest magnitude at which every integer is exactly representable as f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Rewrites integral floats as integers, at any depth, so `1.0` and `1`
/// serialize identically.
fn integral(value: &Value) -> Value {
	match value {
		Value::Number(n) if n.is_f64() => match n.as_f64() {
			Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => Value::from(f as i64),
			_ => value.clone(),
		},
		Value::Array(items) => Value::Array(items.iter().map(integral).collect()),
		Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), integral(v))).collect()),
		other => other.clone(),
	}
}

/// Describes a short form of a value for error messages.
pub(crate) fn describe(value: &Value) -> String {
	match value {
		Value::Null => "null".into(),
		Value::Bool(_) => "a boolean".into(),
		Value::Number(n) => format!("number {n}"),
		Value::String(s) => format!("string {s:?}"),
		Value::Array(_) => "an array".into(),
		Value::Object(_) => "an object".into(),
	}
}

fn default_strength() -> f64 {
	1.0
}

/// One constraint declaration as supplied in configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ConstraintDecl {
	/// Constraint type, `type` in JSON.
	#[serde(rename = "type")]
	pub kind: ConstraintKind,
	/// Required; a missing accessor rejects the configuration.
	#[serde(default)]
	pub accessor: Option<Accessor>,
	/// Spring strength, node opacity and map blend weight, in [0, 1].
	#[serde(default = "default_strength")]
	pub strength: f64,
	/// Optional unique name, used to refer to the constraint in diagnostics.
	#[serde(default)]
	pub name: Option<String>,
}

impl ConstraintDecl {
	/// Declares an unnamed constraint.
	pub fn new(kind: ConstraintKind, accessor: Accessor, strength: f64) -> Self {
		Self {
			kind,
			accessor: Some(accessor),
			strength,
			name: None,
		}
	}

	/// Sets the constraint name.
	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}
}

/// Recognized component options. Changing any of them triggers a full rebuild.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpacemapOptions {
	/// The dataset; one primary node per element.
	pub data: Vec<Datum>,
	/// Constraint declarations, in the order they are compiled.
	pub constraints: Vec<ConstraintDecl>,
	/// Rest length of every spring.
	pub link_distance: f64,
	/// Many-body charge; negative values repel.
	pub charge: f64,
	/// Pull toward the canvas centre.
	pub gravity: f64,
	/// Barnes-Hut accuracy; lower is more exact.
	pub theta: f64,
	/// Velocity retained per step.
	pub friction: f64,
	/// Label for primary nodes.
	pub label: Accessor,
	/// Explicit canvas width. Sized to the container when absent.
	pub width: Option<f64>,
	/// Explicit canvas height. Sized to the container when absent.
	pub height: Option<f64>,
}

impl Default for SpacemapOptions {
	fn default() -> Self {
		Self {
			data: Vec::new(),
			constraints: Vec::new(),
			link_distance: 20.0,
			charge: -30.0,
			gravity: 0.1,
			theta: 0.1,
			friction: 0.9,
			label: Accessor::default(),
			width: None,
			height: None,
		}
	}
}

impl SpacemapOptions {
	/// Parses options from a JSON document.
	pub fn from_json(json: &str) -> Result<Self, Error> {
		Ok(serde_json::from_str(json)?)
	}
}
