//! Data scales mapping accessor outputs onto canvas coordinates.
//!
//! # Scale Kinds
//!
//! - [`LinearScale`]: continuous domain `[min, max]` mapped linearly onto a pixel
//!   range. Built from the extent of an accessor over the dataset.
//! - [`PointScale`]: discrete domain of category keys (first-seen order) mapped
//!   onto evenly spaced points. With the default padding of one step, each
//!   category sits in the middle of its own band, so a single category lands
//!   in the centre of the range.

use std::collections::HashMap;

/// Continuous linear mapping from a data domain onto a pixel range.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearScale {
	/// Input extent `(min, max)`.
	pub domain: (f64, f64),
	/// Output pixel interval.
	pub range: (f64, f64),
}

impl LinearScale {
	/// Creates a scale from explicit domain and range.
	pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
		Self { domain, range }
	}

	/// Builds a scale over the extent of `values`, ignoring non-finite entries.
	/// Returns `None` when no finite value is present.
	pub fn from_extent(values: impl IntoIterator<Item = f64>, range: (f64, f64)) -> Option<Self> {
		let (lo, hi) = values
			.into_iter()
			.filter(|v| v.is_finite())
			.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
				(lo.min(v), hi.max(v))
			});
		(lo <= hi).then(|| Self::new((lo, hi), range))
	}

	/// Maps a domain value onto the range. A degenerate domain maps everything
	/// to the start of the range.
	pub fn apply(&self, value: f64) -> f64 {
		let (d0, d1) = self.domain;
		let (r0, r1) = self.range;
		let span = d1 - d0;
		let t = if span == 0.0 { 0.0 } else { (value - d0) / span };
		r0 + (r1 - r0) * t
	}
}

/// Discrete mapping from category keys onto evenly spaced points.
#[derive(Clone, Debug, PartialEq)]
pub struct PointScale {
	domain: Vec<String>,
	index: HashMap<String, usize>,
	/// Output pixel interval.
	pub range: (f64, f64),
	/// Outer padding, in multiples of the step between points.
	pub padding: f64,
}

impl PointScale {
	/// Builds the domain from `keys` in first-seen order, dropping repeats.
	pub fn new(keys: impl IntoIterator<Item = String>, range: (f64, f64)) -> Self {
		let mut domain = Vec::new();
		let mut index = HashMap::new();
		for key in keys {
			if !index.contains_key(&key) {
				index.insert(key.clone(), domain.len());
				domain.push(key);
			}
		}
		Self {
			domain,
			index,
			range,
			padding: 1.0,
		}
	}

	/// Category keys in first-seen order.
	pub fn domain(&self) -> &[String] {
		&self.domain
	}

	/// Distance between neighbouring points.
	pub fn step(&self) -> f64 {
		let n = self.domain.len() as f64;
		let slots = (n - 1.0 + self.padding).max(1.0);
		(self.range.1 - self.range.0) / slots
	}

	/// Position of `key`, or `None` for a key outside the domain.
	pub fn apply(&self, key: &str) -> Option<f64> {
		let i = *self.index.get(key)? as f64;
		let step = self.step();
		Some(self.range.0 + step * self.padding / 2.0 + step * i)
	}
}
