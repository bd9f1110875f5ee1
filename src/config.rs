use crate::classify::ColorClassifier;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const EDUCATION_DATA_URL: &str =
    "https://cdn.freecodecamp.org/testable-projects-fcc/data/choropleth_map/for_user_education.json";
pub const COUNTY_DATA_URL: &str =
    "https://cdn.freecodecamp.org/testable-projects-fcc/data/choropleth_map/counties.json";

/// ColorBrewer "Blues", nine classes.
pub const BLUES_9: [&str; 9] = [
    "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c",
    "#08306b",
];

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub map: MapConfig,
    pub legend: LegendConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    /// URL or local path of the county boundaries (TopoJSON or GeoJSON).
    pub counties: String,
    /// URL or local path of the education statistics.
    pub education: String,
    /// Topology object holding the county geometries.
    pub counties_object: String,
    /// GeoJSON property holding the FIPS code when features carry no `id`.
    pub id_property: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            counties: COUNTY_DATA_URL.to_string(),
            education: EDUCATION_DATA_URL.to_string(),
            counties_object: "counties".to_string(),
            id_property: "fips".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub width: u32,
    pub height: u32,
    pub thresholds: Vec<f64>,
    pub colors: Vec<String>, // Hex codes, one per threshold
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            width: 960,
            height: 600,
            thresholds: vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0],
            colors: BLUES_9.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LegendConfig {
    pub title: String,
    pub x: f64,
    pub y: f64,
    pub width: u32,
    pub height: u32,
    pub scale_width: f64,
    pub tick_values: Vec<f64>,
}

impl Default for LegendConfig {
    fn default() -> Self {
        LegendConfig {
            title: "Education Level (%)".to_string(),
            x: 600.0,
            y: 20.0,
            width: 300,
            height: 40,
            scale_width: 200.0,
            tick_values: vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { port: 8080 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise falls back to the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn classifier(&self) -> Result<ColorClassifier> {
        ColorClassifier::new(self.map.thresholds.clone(), self.map.colors.clone())
            .context("Invalid [map] thresholds/colors")
    }
}
