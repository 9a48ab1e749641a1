//! ---
//! rra_section: "01-core-functionality"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Shared primitives and utilities for the editor bridge."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
//! Shared primitives for the RRA editor bridge workspace.
//! This crate exposes configuration loading, logging initialisation and the
//! map viewport helpers used to address the embedded editor.

pub mod config;
pub mod geo;
pub mod logging;

pub use config::{AppConfig, EditorConfig, LoadedAppConfig, LoggingConfig, MetricsConfig};
pub use geo::{bounds_to_map_location, editor_url, Bbox, LatLng, MapLocation};
pub use logging::{init, init_tracing, LogFormat};
