//! Leptos components.

pub mod spacemap;
