use crate::config::AppConfig;
use crate::join::StatIndex;
use crate::topology::Topology;
use crate::types::{region_id_from_json, County, StatRecord};
use anyhow::{anyhow, Context, Result};
use geo::MultiPolygon;
use geojson::GeoJson;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Where a dataset comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

impl Source {
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Source::Url(location.to_string())
        } else {
            Source::File(PathBuf::from(location))
        }
    }

    pub async fn fetch(&self, client: &reqwest::Client) -> Result<Vec<u8>> {
        match self {
            Source::Url(url) => {
                let response = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("Failed to fetch {}", url))?
                    .error_for_status()
                    .with_context(|| format!("Bad response from {}", url))?;
                let bytes = response
                    .bytes()
                    .await
                    .with_context(|| format!("Failed to read body of {}", url))?;
                Ok(bytes.to_vec())
            }
            Source::File(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {:?}", path)),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{}", url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Everything the renderer needs, loaded once.
#[derive(Debug)]
pub struct Dataset {
    pub counties: Vec<County>,
    pub stats: StatIndex,
}

/// Fetches both datasets concurrently. Either failure fails the whole load.
pub async fn load_dataset(config: &AppConfig) -> Result<Dataset> {
    let counties_source = Source::parse(&config.input.counties);
    let education_source = Source::parse(&config.input.education);
    info!("Loading counties from {}", counties_source);
    info!("Loading education data from {}", education_source);

    let client = reqwest::Client::new();
    let (county_bytes, education_bytes) = tokio::try_join!(
        counties_source.fetch(&client),
        education_source.fetch(&client)
    )?;

    let counties = parse_counties(config, &county_bytes)
        .with_context(|| format!("Invalid county data from {}", counties_source))?;
    info!("Loaded geometry for {} counties", counties.len());

    let records = parse_stats(&education_bytes)
        .with_context(|| format!("Invalid education data from {}", education_source))?;
    info!("Loaded education data for {} counties", records.len());

    Ok(Dataset {
        counties,
        stats: StatIndex::new(records),
    })
}

pub fn parse_stats(bytes: &[u8]) -> Result<Vec<StatRecord>> {
    serde_json::from_slice(bytes).context("Failed to parse education JSON")
}

/// Accepts a TopoJSON topology or a GeoJSON FeatureCollection.
pub fn parse_counties(config: &AppConfig, bytes: &[u8]) -> Result<Vec<County>> {
    let document: serde_json::Value =
        serde_json::from_slice(bytes).context("Failed to parse county JSON")?;

    match document.get("type").and_then(|t| t.as_str()) {
        Some("Topology") => {
            let topology: Topology =
                serde_json::from_value(document).context("Failed to parse TopoJSON")?;
            topology.counties(&config.input.counties_object)
        }
        Some("FeatureCollection") => {
            let geojson = GeoJson::from_json_value(document).context("Failed to parse GeoJSON")?;
            counties_from_geojson(config, geojson)
        }
        Some(other) => Err(anyhow!("Unsupported county document type: {}", other)),
        None => Err(anyhow!("County document has no \"type\"")),
    }
}

fn counties_from_geojson(config: &AppConfig, geojson: GeoJson) -> Result<Vec<County>> {
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut counties = Vec::new();

    for feature in collection.features {
        // 1. Get ID, from the feature itself or its properties
        let id_val = match &feature.id {
            Some(geojson::feature::Id::String(s)) => Some(serde_json::Value::String(s.clone())),
            Some(geojson::feature::Id::Number(n)) => Some(serde_json::Value::Number(n.clone())),
            None => feature
                .properties
                .as_ref()
                .and_then(|props| props.get(&config.input.id_property))
                .cloned(),
        };

        let id = match id_val.as_ref().and_then(region_id_from_json) {
            Some(id) => id,
            None => {
                debug!("Skipping feature without a FIPS id");
                continue;
            }
        };

        // 2. Get Geometry
        let geometry = match feature.geometry {
            Some(geo) => {
                let valid_geo: geo::Geometry<f64> = geo
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

                match valid_geo {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        debug!("Skipping non-polygonal feature {}", id);
                        continue;
                    }
                }
            }
            None => continue,
        };

        counties.push(County { id, geometry });
    }

    Ok(counties)
}
