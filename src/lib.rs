//! County choropleth of US educational attainment.
//!
//! Boundaries (TopoJSON) and per-county statistics are loaded together,
//! joined by FIPS code through a [`join::StatIndex`], bucketed by a
//! [`classify::ColorClassifier`] and rendered to SVG by [`render`].

pub mod classify;
pub mod config;
pub mod data;
pub mod join;
pub mod render;
pub mod server;
pub mod topology;
pub mod types;
