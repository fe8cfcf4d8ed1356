//! Physics engine driving the layout.
//!
//! [`PhysicsEngine`] is the seam the driver talks to. [`ForceSimulation`] is a
//! position-Verlet integrator in the style of the classic d3 force layout:
//!
//! 1. Springs pull each edge toward `link_distance`, scaled by the edge's
//!    strength and split between endpoints by node degree.
//! 2. Gravity pulls every node toward the centre of the canvas.
//! 3. Many-body charge (Barnes-Hut, see [`QuadTree`]) pushes nodes apart by
//!    adjusting their previous positions.
//! 4. Verlet integration with friction applies the implicit velocity.
//!
//! All forces scale with `alpha`, which cools by 1% per step; once it drops
//! below [`ALPHA_MIN`] the engine stops.

use super::graph::{LayoutEdge, LayoutNode};
use super::quadtree::QuadTree;
use super::types::{Point, Size, SpacemapOptions};

/// Temperature after `start` or `resume`.
pub const ALPHA_START: f64 = 0.1;
/// Temperature under which the simulation is considered settled.
pub const ALPHA_MIN: f64 = 0.005;
const ALPHA_DECAY: f64 = 0.99;

const FIXED_DRAG: u8 = 2;

/// Simulation parameters, mirroring the layout options.
#[derive(Clone, Debug, PartialEq)]
pub struct ForceParams {
	/// Spring rest length.
	pub link_distance: f64,
	/// Per-node charge; negative repels.
	pub charge: f64,
	/// Pull toward the canvas centre.
	pub gravity: f64,
	/// Barnes-Hut opening criterion.
	pub theta: f64,
	/// Velocity retained per step.
	pub friction: f64,
	/// Canvas extent; gravity pulls toward its centre.
	pub size: Size,
}

impl ForceParams {
	/// Parameters from layout options.
	pub fn from_options(options: &SpacemapOptions, size: Size) -> Self {
		Self {
			link_distance: options.link_distance,
			charge: options.charge,
			gravity: options.gravity,
			theta: options.theta,
			friction: options.friction,
			size,
		}
	}
}

impl Default for ForceParams {
	fn default() -> Self {
		Self::from_options(&SpacemapOptions::default(), Size::new(800.0, 600.0))
	}
}

/// Contract between the simulation driver and a physics integrator.
pub trait PhysicsEngine {
	/// Replaces the force parameters. Takes effect on the next step.
	fn configure(&mut self, params: &ForceParams);
	/// Seeds missing positions and heats the simulation up.
	fn start(&mut self, nodes: &mut [LayoutNode], edges: &[LayoutEdge]);
	/// Reheats without reseeding.
	fn resume(&mut self);
	/// Advances one step. Returns `false` once the simulation has cooled.
	fn step(&mut self, nodes: &mut [LayoutNode], edges: &[LayoutEdge]) -> bool;
	/// Cools the simulation immediately.
	fn stop(&mut self);
	/// Current temperature; zero when stopped.
	fn alpha(&self) -> f64;

	/// Whether further steps will move anything.
	fn is_running(&self) -> bool {
		self.alpha() > 0.0
	}

	/// Pins node `index` while it is dragged.
	fn drag_start(&mut self, index: usize);
	/// Moves a dragged node and reheats.
	fn drag_to(&mut self, index: usize, point: Point);
	/// Releases a dragged node.
	fn drag_end(&mut self, index: usize);
}

#[derive(Clone, Copy, Debug, Default)]
struct Body {
	x: f64,
	y: f64,
	px: f64,
	py: f64,
	weight: f64,
	fixed: u8,
}

/// Deterministic pseudo-random sequence for seeding and jitter.
#[derive(Clone, Debug, Default)]
struct Jitter {
	seed: f64,
}

impl Jitter {
	fn next(&mut self) -> f64 {
		self.seed += 1.0;
		let x = (self.seed * 12.9898 + self.seed * 78.233).sin() * 43758.5453;
		x - x.floor()
	}
}

/// Verlet force simulation with springs, gravity and Barnes-Hut charge.
#[derive(Clone, Debug, Default)]
pub struct ForceSimulation {
	params: ForceParams,
	alpha: f64,
	bodies: Vec<Body>,
	jitter: Jitter,
}

impl ForceSimulation {
	/// A cold simulation with `params`.
	pub fn new(params: ForceParams) -> Self {
		Self {
			params,
			..Default::default()
		}
	}

	/// Parameters in use.
	pub fn params(&self) -> &ForceParams {
		&self.params
	}

	fn seed(&mut self, nodes: &mut [LayoutNode], edges: &[LayoutEdge]) {
		let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
		let mut weights = vec![0.0; nodes.len()];
		for e in edges {
			neighbors[e.source].push(e.target);
			neighbors[e.target].push(e.source);
			weights[e.source] += 1.0;
			weights[e.target] += 1.0;
		}

		let size = self.params.size;
		for i in 0..nodes.len() {
			if nodes[i].pos.is_some() {
				continue;
			}
			let seeded = neighbors[i].iter().find_map(|&j| nodes[j].pos);
			nodes[i].pos = Some(seeded.unwrap_or_else(|| {
				Point::new(self.jitter.next() * size.width, self.jitter.next() * size.height)
			}));
		}

		self.bodies = nodes
			.iter()
			.zip(weights)
			.map(|(node, weight)| {
				let p = node.pos.unwrap_or_default();
				Body {
					x: p.x,
					y: p.y,
					px: p.x,
					py: p.y,
					weight,
					fixed: 0,
				}
			})
			.collect();
	}

	fn apply_links(&mut self, edges: &[LayoutEdge]) {
		for e in edges {
			let (s, t) = (self.bodies[e.source], self.bodies[e.target]);
			let (mut dx, mut dy) = (t.x - s.x, t.y - s.y);
			let l2 = dx * dx + dy * dy;
			if l2 == 0.0 {
				continue;
			}
			let l = l2.sqrt();
			let k = self.alpha * e.strength * (l - self.params.link_distance) / l;
			dx *= k;
			dy *= k;
			let total = s.weight + t.weight;
			let share = if total > 0.0 { s.weight / total } else { 0.5 };
			let target = &mut self.bodies[e.target];
			target.x -= dx * share;
			target.y -= dy * share;
			let source = &mut self.bodies[e.source];
			source.x += dx * (1.0 - share);
			source.y += dy * (1.0 - share);
		}
	}

	fn apply_gravity(&mut self) {
		let k = self.alpha * self.params.gravity;
		if k == 0.0 {
			return;
		}
		let c = self.params.size.center();
		for b in &mut self.bodies {
			b.x += (c.x - b.x) * k;
			b.y += (c.y - b.y) * k;
		}
	}

	fn apply_charge(&mut self) {
		if self.params.charge == 0.0 || self.bodies.is_empty() {
			return;
		}
		let mut positions: Vec<Point> = self.bodies.iter().map(|b| Point::new(b.x, b.y)).collect();
		let charges = vec![self.alpha * self.params.charge; positions.len()];

		// coincident points cannot be split by the tree; nudge them apart first
		let crowded = QuadTree::new(&positions, &charges).crowded().to_vec();
		for i in crowded {
			positions[i].x += self.jitter.next() - 0.5;
			positions[i].y += self.jitter.next() - 0.5;
			self.bodies[i].x = positions[i].x;
			self.bodies[i].y = positions[i].y;
		}

		let tree = QuadTree::new(&positions, &charges);
		for (i, b) in self.bodies.iter_mut().enumerate() {
			if b.fixed != 0 {
				continue;
			}
			let push = tree.repulsion(i, self.params.theta);
			b.px -= push.x;
			b.py -= push.y;
		}
	}

	fn integrate(&mut self) {
		let friction = self.params.friction;
		for b in &mut self.bodies {
			if b.fixed != 0 {
				b.x = b.px;
				b.y = b.py;
			} else {
				let (vx, vy) = ((b.x - b.px) * friction, (b.y - b.py) * friction);
				b.px = b.x;
				b.py = b.y;
				b.x += vx;
				b.y += vy;
			}
		}
	}
}

impl PhysicsEngine for ForceSimulation {
	fn configure(&mut self, params: &ForceParams) {
		self.params = params.clone();
	}

	fn start(&mut self, nodes: &mut [LayoutNode], edges: &[LayoutEdge]) {
		self.seed(nodes, edges);
		self.resume();
	}

	fn resume(&mut self) {
		self.alpha = ALPHA_START;
	}

	fn step(&mut self, nodes: &mut [LayoutNode], edges: &[LayoutEdge]) -> bool {
		if self.alpha <= 0.0 {
			return false;
		}
		self.alpha *= ALPHA_DECAY;
		if self.alpha < ALPHA_MIN {
			self.alpha = 0.0;
			return false;
		}
		if self.bodies.len() != nodes.len() {
			self.seed(nodes, edges);
		}

		for (b, node) in self.bodies.iter_mut().zip(nodes.iter()) {
			if let Some(p) = node.pos {
				b.x = p.x;
				b.y = p.y;
			}
		}

		self.apply_links(edges);
		self.apply_gravity();
		self.apply_charge();
		self.integrate();

		for (b, node) in self.bodies.iter().zip(nodes.iter_mut()) {
			node.pos = Some(Point::new(b.x, b.y));
		}
		true
	}

	fn stop(&mut self) {
		self.alpha = 0.0;
	}

	fn alpha(&self) -> f64 {
		self.alpha
	}

	fn drag_start(&mut self, index: usize) {
		if let Some(b) = self.bodies.get_mut(index) {
			b.fixed |= FIXED_DRAG;
		}
	}

	fn drag_to(&mut self, index: usize, point: Point) {
		if let Some(b) = self.bodies.get_mut(index) {
			b.px = point.x;
			b.py = point.y;
			b.x = point.x;
			b.y = point.y;
		}
		self.resume();
	}

	fn drag_end(&mut self, index: usize) {
		if let Some(b) = self.bodies.get_mut(index) {
			b.fixed &= !FIXED_DRAG;
		}
	}
}
