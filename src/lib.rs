//! spacemap: constraint-driven force-directed layout on a canvas.
//!
//! This crate provides a WASM-based component that places data points by
//! combining positional constraints (axes, categories, 2D projections, map
//! anchors and shared-value links) into one force simulation.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;

pub use components::spacemap::{
	Accessor, ConstraintDecl, ConstraintKind, Spacemap, SpacemapOptions,
};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("spacemap: logging initialized");
}

/// Load options from a script element with id="spacemap-config".
/// Expected format: JSON with { data: [...], constraints: [...], ... }
fn load_options() -> Option<SpacemapOptions> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id("spacemap-config")?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	let json_text = script.text().ok()?;

	match SpacemapOptions::from_json(&json_text) {
		Ok(options) => {
			info!(
				"spacemap: loaded {} data, {} constraints",
				options.data.len(),
				options.constraints.len()
			);
			Some(options)
		}
		Err(e) => {
			warn!("spacemap: failed to parse options: {}", e);
			None
		}
	}
}

/// Main application component.
/// Loads options from the DOM and renders the spacemap with a map surface
/// whenever a `map` constraint is declared.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let options = load_options().unwrap_or_default();
	let map = options
		.constraints
		.iter()
		.any(|c| c.kind == ConstraintKind::Map);
	let options = Signal::derive(move || options.clone());

	view! {
		<Html attr:lang="en" attr:dir="ltr" />
		<Title text="Spacemap" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-spacemap">
			<Spacemap options=options fullscreen=true map=map />
			<div class="spacemap-overlay">
				<h1>"Spacemap"</h1>
				<p class="subtitle">"Drag nodes to reposition. Drag the background to pan the map, scroll to zoom."</p>
			</div>
		</div>
	}
}
