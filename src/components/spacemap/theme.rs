//! Visual theming for the spacemap canvas.
//!
//! Provides the categorical palette and the per-primitive styles used by the
//! scene builder and the canvas renderer.

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	/// Red channel.
	pub r: u8,
	/// Green channel.
	pub g: u8,
	/// Blue channel.
	pub b: u8,
	/// Opacity in [0, 1].
	pub a: f64,
}

/// Drawn for every node when a palette has no entries.
const FALLBACK: Color = Color::rgb(0x7f, 0x7f, 0x7f);

impl Color {
	/// An opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Same color at opacity `a`.
	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// CSS color string: hex when opaque, `rgba(..)` otherwise.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

/// Categorical palette. Index 0 is reserved for primary nodes; constraint
/// `i` takes entry `i + 1`, wrapping around.
#[derive(Clone, Debug)]
pub struct NodePalette {
	/// Entries in lookup order.
	pub colors: Vec<Color>,
}

impl NodePalette {
	/// The ten-color categorical scale.
	pub fn category10() -> Self {
		Self {
			colors: vec![
				Color::rgb(0x1f, 0x77, 0xb4), // Blue
				Color::rgb(0xff, 0x7f, 0x0e), // Orange
				Color::rgb(0x2c, 0xa0, 0x2c), // Green
				Color::rgb(0xd6, 0x27, 0x28), // Red
				Color::rgb(0x94, 0x67, 0xbd), // Purple
				Color::rgb(0x8c, 0x56, 0x4b), // Brown
				Color::rgb(0xe3, 0x77, 0xc2), // Pink
				Color::rgb(0x7f, 0x7f, 0x7f), // Gray
				Color::rgb(0xbc, 0xbd, 0x22), // Olive
				Color::rgb(0x17, 0xbe, 0xcf), // Cyan
			],
		}
	}

	/// Entry `index`, wrapping around.
	pub fn get(&self, index: usize) -> Color {
		match self.colors.len() {
			0 => FALLBACK,
			n => self.colors[index % n],
		}
	}

	/// Color for a node owned by `constraint`, or the primary color for `None`.
	pub fn for_constraint(&self, constraint: Option<usize>) -> Color {
		self.get(constraint.map_or(0, |i| i + 1))
	}
}

/// Background style configuration.
#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	/// Canvas fill.
	pub color: Color,
	/// Graticule line color drawn as the map overlay.
	pub graticule: Color,
	/// Degrees between graticule lines.
	pub graticule_step: f64,
}

/// Edge visual style.
#[derive(Clone, Debug)]
pub struct EdgeStyle {
	/// Stroke color.
	pub color: Color,
	/// Stroke width in pixels.
	pub width: f64,
}

/// Node visual style.
#[derive(Clone, Debug)]
pub struct NodeStyle {
	/// Radius of data nodes.
	pub primary_radius: f64,
	/// Radius of constraint nodes.
	pub auxiliary_radius: f64,
	/// Border/stroke width (0 = no border)
	pub border_width: f64,
	/// Border/stroke color.
	pub border_color: Color,
}

/// Label text style.
#[derive(Clone, Debug)]
pub struct LabelStyle {
	/// CSS font shorthand.
	pub font: String,
	/// Text fill.
	pub color: Color,
	/// Gap between the node's edge and the text.
	pub offset: f64,
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	/// Canvas and map overlay.
	pub background: BackgroundStyle,
	/// Springs.
	pub edge: EdgeStyle,
	/// Node discs.
	pub node: NodeStyle,
	/// Node labels.
	pub label: LabelStyle,
	/// Node fill colors.
	pub palette: NodePalette,
}

impl Default for Theme {
	fn default() -> Self {
		Self {
			background: BackgroundStyle {
				color: Color::rgb(255, 255, 255),
				graticule: Color::rgb(160, 180, 200),
				graticule_step: 15.0,
			},
			edge: EdgeStyle {
				color: Color::rgb(0x99, 0x99, 0x99),
				width: 1.0,
			},
			node: NodeStyle {
				primary_radius: 6.0,
				auxiliary_radius: 4.0,
				border_width: 0.5,
				border_color: Color::rgb(255, 255, 255),
			},
			label: LabelStyle {
				font: "10px sans-serif".into(),
				color: Color::rgb(34, 34, 34),
				offset: 3.0,
			},
			palette: NodePalette::category10(),
		}
	}
}
