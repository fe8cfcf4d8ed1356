//! Barnes-Hut quadtree for many-body repulsion.
//!
//! Each cell aggregates the charge of the points below it at their
//! charge-weighted centroid. A cell whose width is small relative to its
//! distance from the query point (`width² / θ² < distance²`) is treated as a
//! single body.

use super::types::Point;

/// Recursion limit; points still sharing a leaf at this depth stay together.
const MAX_DEPTH: usize = 24;
/// Manhattan distance under which two points count as coincident.
const COINCIDENT: f64 = 0.01;

#[derive(Debug)]
struct Cell {
	x0: f64,
	y0: f64,
	x1: f64,
	y1: f64,
	children: Option<Box<[Cell; 4]>>,
	points: Vec<usize>,
	charge: f64,
	cx: f64,
	cy: f64,
}

impl Cell {
	fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
		Self {
			x0,
			y0,
			x1,
			y1,
			children: None,
			points: Vec::new(),
			charge: 0.0,
			cx: 0.0,
			cy: 0.0,
		}
	}

	fn quadrant(&self, p: Point) -> usize {
		let (mx, my) = ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0);
		(p.x >= mx) as usize | (((p.y >= my) as usize) << 1)
	}

	fn split(&mut self) {
		let (mx, my) = ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0);
		self.children = Some(Box::new([
			Cell::new(self.x0, self.y0, mx, my),
			Cell::new(mx, self.y0, self.x1, my),
			Cell::new(self.x0, my, mx, self.y1),
			Cell::new(mx, my, self.x1, self.y1),
		]));
	}

	fn insert(&mut self, i: usize, positions: &[Point], depth: usize, crowded: &mut Vec<usize>) {
		let p = positions[i];
		let q = self.quadrant(p);
		if let Some(children) = self.children.as_mut() {
			children[q].insert(i, positions, depth + 1, crowded);
			return;
		}
		let Some(&first) = self.points.first() else {
			self.points.push(i);
			return;
		};
		let q = positions[first];
		if depth >= MAX_DEPTH || (p.x - q.x).abs() + (p.y - q.y).abs() < COINCIDENT {
			self.points.push(i);
			crowded.push(i);
			return;
		}
		self.split();
		for j in std::mem::take(&mut self.points) {
			self.insert(j, positions, depth, crowded);
		}
		self.insert(i, positions, depth, crowded);
	}

	fn accumulate(&mut self, positions: &[Point], charges: &[f64]) {
		let (mut charge, mut cx, mut cy) = (0.0, 0.0, 0.0);
		if let Some(children) = self.children.as_mut() {
			for child in children.iter_mut() {
				child.accumulate(positions, charges);
				charge += child.charge;
				cx += child.charge * child.cx;
				cy += child.charge * child.cy;
			}
		}
		for &i in &self.points {
			let k = charges[i];
			charge += k;
			cx += k * positions[i].x;
			cy += k * positions[i].y;
		}
		self.charge = charge;
		if charge != 0.0 {
			self.cx = cx / charge;
			self.cy = cy / charge;
		}
	}

	fn repulse(&self, i: usize, p: Point, positions: &[Point], charges: &[f64], theta2: f64, out: &mut Point) {
		if self.charge == 0.0 {
			return;
		}
		let (dx, dy) = (self.cx - p.x, self.cy - p.y);
		let dw = self.x1 - self.x0;
		let dn = dx * dx + dy * dy;
		if dw * dw / theta2 < dn {
			let k = self.charge / dn;
			out.x += dx * k;
			out.y += dy * k;
			return;
		}
		for &j in &self.points {
			if j == i {
				continue;
			}
			let (dx, dy) = (positions[j].x - p.x, positions[j].y - p.y);
			let dn = dx * dx + dy * dy;
			if dn > 0.0 {
				let k = charges[j] / dn;
				out.x += dx * k;
				out.y += dy * k;
			}
		}
		if let Some(children) = &self.children {
			for child in children.iter() {
				child.repulse(i, p, positions, charges, theta2, out);
			}
		}
	}
}

/// A Barnes-Hut tree built over a snapshot of positions.
#[derive(Debug)]
pub struct QuadTree<'a> {
	root: Cell,
	positions: &'a [Point],
	charges: &'a [f64],
	/// Points inserted on top of an existing point.
	crowded: Vec<usize>,
}

impl<'a> QuadTree<'a> {
	/// Builds the tree and aggregates `charges` (one per position).
	pub fn new(positions: &'a [Point], charges: &'a [f64]) -> Self {
		let (mut x0, mut y0, mut x1, mut y1) = (
			f64::INFINITY,
			f64::INFINITY,
			f64::NEG_INFINITY,
			f64::NEG_INFINITY,
		);
		for p in positions {
			x0 = x0.min(p.x);
			y0 = y0.min(p.y);
			x1 = x1.max(p.x);
			y1 = y1.max(p.y);
		}
		if positions.is_empty() {
			(x0, y0, x1, y1) = (0.0, 0.0, 1.0, 1.0);
		}
		// square the bounds so cells stay square
		let span = (x1 - x0).max(y1 - y0).max(f64::EPSILON);
		let mut root = Cell::new(x0, y0, x0 + span, y0 + span);
		let mut crowded = Vec::new();
		for i in 0..positions.len() {
			root.insert(i, positions, 0, &mut crowded);
		}
		root.accumulate(positions, charges);
		crowded.sort_unstable();
		crowded.dedup();
		Self {
			root,
			positions,
			charges,
			crowded,
		}
	}

	pub fn crowded(&self) -> &[usize] {
		&self.crowded
	}

	/// Total aggregated charge.
	pub fn charge(&self) -> f64 {
		self.root.charge
	}

	/// Displacement to subtract from the previous position of point `i`.
	/// With negative charges this pushes `i` away from its neighbours.
	pub fn repulsion(&self, i: usize, theta: f64) -> Point {
		let mut out = Point::default();
		let theta2 = (theta * theta).max(f64::EPSILON);
		self.root
			.repulse(i, self.positions[i], self.positions, self.charges, theta2, &mut out);
		out
	}
}
