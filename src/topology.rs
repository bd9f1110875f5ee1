//! TopoJSON decoding.
//!
//! Arcs are shared between neighbouring polygons and, when the topology is
//! quantized, stored as integer deltas. Decoding turns every arc into
//! absolute coordinates once, then stitches rings from arc references.

use crate::types::{region_id_from_json, County};
use anyhow::{anyhow, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub transform: Option<Transform>,
    pub arcs: Vec<Vec<Vec<f64>>>,
    pub objects: HashMap<String, TopoGeometry>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum TopoGeometry {
    GeometryCollection {
        geometries: Vec<TopoGeometry>,
    },
    Polygon {
        #[serde(default)]
        id: Option<serde_json::Value>,
        arcs: Vec<Vec<i64>>,
    },
    MultiPolygon {
        #[serde(default)]
        id: Option<serde_json::Value>,
        arcs: Vec<Vec<Vec<i64>>>,
    },
    #[serde(other)]
    Unsupported,
}

impl Topology {
    /// Decodes the polygons of `object` into counties.
    ///
    /// Geometries without a numeric id or a polygonal shape are skipped.
    pub fn counties(&self, object: &str) -> Result<Vec<County>> {
        let root = self
            .objects
            .get(object)
            .ok_or_else(|| anyhow!("Topology has no object named '{}'", object))?;

        let arcs = self.decode_arcs();
        let mut counties = Vec::new();
        collect_counties(root, &arcs, &mut counties)?;
        Ok(counties)
    }

    fn decode_arcs(&self) -> Vec<Vec<Coord<f64>>> {
        self.arcs
            .iter()
            .map(|arc| match self.transform {
                Some(t) => {
                    let (mut x, mut y) = (0.0, 0.0);
                    arc.iter()
                        .map(|p| {
                            x += position(p, 0);
                            y += position(p, 1);
                            Coord {
                                x: x * t.scale[0] + t.translate[0],
                                y: y * t.scale[1] + t.translate[1],
                            }
                        })
                        .collect()
                }
                None => arc
                    .iter()
                    .map(|p| Coord {
                        x: position(p, 0),
                        y: position(p, 1),
                    })
                    .collect(),
            })
            .collect()
    }
}

fn position(p: &[f64], axis: usize) -> f64 {
    p.get(axis).copied().unwrap_or(0.0)
}

fn collect_counties(
    geometry: &TopoGeometry,
    arcs: &[Vec<Coord<f64>>],
    out: &mut Vec<County>,
) -> Result<()> {
    match geometry {
        TopoGeometry::GeometryCollection { geometries } => {
            for g in geometries {
                collect_counties(g, arcs, out)?;
            }
        }
        TopoGeometry::Polygon { id, arcs: rings } => {
            if let Some(id) = id.as_ref().and_then(region_id_from_json) {
                let shape = polygon(rings, arcs)?;
                out.push(County {
                    id,
                    geometry: MultiPolygon::new(vec![shape]),
                });
            } else {
                debug!("Skipping polygon without a FIPS id");
            }
        }
        TopoGeometry::MultiPolygon { id, arcs: polygons } => {
            if let Some(id) = id.as_ref().and_then(region_id_from_json) {
                let polygons = polygons
                    .iter()
                    .map(|rings| polygon(rings, arcs))
                    .collect::<Result<Vec<_>>>()?;
                out.push(County {
                    id,
                    geometry: MultiPolygon::new(polygons),
                });
            } else {
                debug!("Skipping multipolygon without a FIPS id");
            }
        }
        TopoGeometry::Unsupported => {}
    }
    Ok(())
}

fn polygon(rings: &[Vec<i64>], arcs: &[Vec<Coord<f64>>]) -> Result<Polygon<f64>> {
    let mut rings = rings
        .iter()
        .map(|r| ring(r, arcs))
        .collect::<Result<Vec<_>>>()?;
    if rings.is_empty() {
        return Ok(Polygon::new(LineString::new(vec![]), vec![]));
    }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

fn ring(refs: &[i64], arcs: &[Vec<Coord<f64>>]) -> Result<LineString<f64>> {
    let mut points: Vec<Coord<f64>> = Vec::new();

    for &r in refs {
        // Negative references (~i) walk arc i backwards.
        let (index, reversed) = if r < 0 { (!r, true) } else { (r, false) };
        let arc = usize::try_from(index)
            .ok()
            .and_then(|i| arcs.get(i))
            .ok_or_else(|| anyhow!("Arc reference {} out of range ({} arcs)", r, arcs.len()))?;

        // Consecutive arcs share their junction point.
        points.pop();
        if reversed {
            points.extend(arc.iter().rev().copied());
        } else {
            points.extend(arc.iter().copied());
        }
    }

    if let Some(&first) = points.first() {
        while points.len() < 4 {
            points.push(first);
        }
    }

    Ok(LineString::new(points))
}
