use geo::MultiPolygon;
use serde::{Deserialize, Deserializer, Serialize};

/// County FIPS code shared by the boundary and statistics datasets.
pub type RegionId = u32;

#[derive(Debug, Clone)]
pub struct County {
    pub id: RegionId,
    pub geometry: MultiPolygon<f64>,
}

/// One row of the education dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    #[serde(deserialize_with = "deserialize_region_id")]
    pub fips: RegionId,
    #[serde(default)]
    pub state: String,
    pub area_name: String,
    #[serde(rename = "bachelorsOrHigher")]
    pub bachelors_or_higher: f64,
}

/// A county paired with its resolved statistic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinedValue<'a> {
    pub id: RegionId,
    pub value: f64,
    pub name: &'a str,
    pub state: &'a str,
    pub matched: bool,
}

impl<'a> JoinedValue<'a> {
    pub const UNKNOWN_NAME: &'static str = "Unknown";

    pub fn unmatched(id: RegionId) -> Self {
        JoinedValue {
            id,
            value: 0.0,
            name: Self::UNKNOWN_NAME,
            state: "",
            matched: false,
        }
    }

    pub fn from_record(record: &'a StatRecord) -> Self {
        JoinedValue {
            id: record.fips,
            value: record.bachelors_or_higher,
            name: &record.area_name,
            state: &record.state,
            matched: true,
        }
    }
}

/// Parses a FIPS code from a JSON number or a numeric string ("01001").
pub fn region_id_from_json(value: &serde_json::Value) -> Option<RegionId> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|v| RegionId::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn deserialize_region_id<'de, D>(deserializer: D) -> Result<RegionId, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    region_id_from_json(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid FIPS code: {}", value)))
}
