use crate::classify::ColorClassifier;
use crate::config::AppConfig;
use crate::join::StatIndex;
use crate::types::{County, RegionId};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

// Wrapper for RTree indexing
pub struct CountyEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for CountyEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub counties: Vec<County>,
    pub county_ids: HashSet<RegionId>,
    pub tree: RTree<CountyEnvelope>,
    pub stats: StatIndex,
    pub classifier: ColorClassifier,
}

#[derive(Deserialize)]
pub struct LocateParams {
    x: f64,
    y: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CountyResponse {
    fips: RegionId,
    name: String,
    state: String,
    education: f64,
    matched: bool,
    color: String,
}

impl AppState {
    pub fn new(counties: Vec<County>, stats: StatIndex, classifier: ColorClassifier) -> Self {
        info!("Building spatial index for {} counties...", counties.len());
        // Counties with empty geometry have no envelope and can never be located.
        let items: Vec<CountyEnvelope> = counties
            .iter()
            .enumerate()
            .filter_map(|(index, county)| {
                let rect = county.geometry.bounding_rect()?;
                Some(CountyEnvelope {
                    index,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();

        let county_ids = counties.iter().map(|c| c.id).collect();

        AppState {
            counties,
            county_ids,
            tree: RTree::bulk_load(items),
            stats,
            classifier,
        }
    }

    pub fn describe(&self, fips: RegionId) -> CountyResponse {
        let joined = self.stats.join(fips);
        CountyResponse {
            fips,
            name: joined.name.to_string(),
            state: joined.state.to_string(),
            education: joined.value,
            matched: joined.matched,
            color: self.classifier.color_for(joined.value).to_string(),
        }
    }

    /// County whose geometry contains the map coordinate `(x, y)`.
    pub fn locate(&self, x: f64, y: f64) -> Option<&County> {
        let point = Point::new(x, y);
        let envelope = AABB::from_point([x, y]);

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|candidate| self.counties.get(candidate.index))
            .find(|county| county.geometry.contains(&point))
    }

    fn has_county(&self, fips: RegionId) -> bool {
        self.county_ids.contains(&fips)
    }
}

pub fn router(config: &AppConfig, state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/county/:fips", get(county_handler))
        .route("/api/locate", get(locate_handler))
        .fallback_service(ServeDir::new(&config.output.dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, state: AppState) -> Result<()> {
    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let app = router(&config, Arc::new(state));

    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn county_handler(
    State(state): State<Arc<AppState>>,
    Path(fips): Path<RegionId>,
) -> Result<Json<CountyResponse>, StatusCode> {
    if state.has_county(fips) || state.stats.get(fips).is_some() {
        Ok(Json(state.describe(fips)))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn locate_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LocateParams>,
) -> Json<Option<CountyResponse>> {
    Json(
        state
            .locate(params.x, params.y)
            .map(|county| state.describe(county.id)),
    )
}
