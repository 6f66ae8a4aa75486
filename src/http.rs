//! HTTP clients for the routing and elevation collaborators.
//!
//! The planner core never talks to the network itself; these clients
//! implement the collaborator interfaces against public-API wire formats:
//! an OSRM-style `/route/v1` endpoint for routing and an open-elevation
//! style batch lookup for elevation. [`HttpSpanResolver`] composes the two
//! into a [`SpanResolver`], filling in elevations the routing polyline
//! lacks.

use std::time::Duration;

use futures::future::join_all;
use log::warn;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::builder::SpanResolver;
use crate::error::{Result, RoutePlanError};
use crate::{GpsPoint, RoutePoint, TrackId};

const MAX_RETRIES: u32 = 3;
const ELEVATION_BATCH_SIZE: usize = 100; // API limit per request

/// Client for an OSRM-style routing service.
pub struct RoutingClient {
    client: Client,
    base_url: String,
    profile: String,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// GeoJSON order: [lng, lat]
    coordinates: Vec<[f64; 2]>,
}

impl RoutingClient {
    /// Create a client against the public OSRM demo server.
    pub fn new() -> Self {
        Self::with_url("https://router.project-osrm.org", "cycling")
    }

    /// Create a client with a custom base URL and routing profile.
    pub fn with_url(base_url: &str, profile: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            profile: profile.to_string(),
        }
    }

    /// Resolve the road-network polyline between two positions.
    pub async fn resolve(&self, from: GpsPoint, to: GpsPoint) -> Result<Vec<GpsPoint>> {
        let url = format!(
            "{}/route/v1/{}/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url,
            self.profile,
            from.longitude,
            from.latitude,
            to.longitude,
            to.latitude
        );

        let mut retries = 0;
        loop {
            match self.client.get(&url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if !status.is_success() {
                        return Err(RoutePlanError::HttpError {
                            message: "routing request failed".to_string(),
                            status_code: Some(status.as_u16()),
                        });
                    }

                    let data: OsrmResponse =
                        resp.json().await.map_err(|e| RoutePlanError::HttpError {
                            message: format!("routing parse error: {}", e),
                            status_code: None,
                        })?;

                    if data.code != "Ok" {
                        return Err(RoutePlanError::HttpError {
                            message: format!("routing service returned '{}'", data.code),
                            status_code: None,
                        });
                    }

                    let route =
                        data.routes
                            .into_iter()
                            .next()
                            .ok_or_else(|| RoutePlanError::HttpError {
                                message: "routing service returned no routes".to_string(),
                                status_code: None,
                            })?;

                    return Ok(route
                        .geometry
                        .coordinates
                        .into_iter()
                        .map(|c| GpsPoint::new(c[1], c[0]))
                        .collect());
                }
                Err(e) => {
                    retries += 1;
                    if retries > MAX_RETRIES {
                        return Err(RoutePlanError::HttpError {
                            message: format!("routing request error: {}", e),
                            status_code: None,
                        });
                    }
                    let backoff = Duration::from_millis(500 * (1 << retries));
                    warn!(
                        "[RoutingClient] request error: {}, retry {} after {:?}",
                        e, retries, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

impl Default for RoutingClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for an open-elevation style batch lookup service.
pub struct ElevationClient {
    client: Client,
    base_url: String,
    batch_size: usize,
}

#[derive(Debug, Clone, Serialize)]
struct Location {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
struct ElevationRequest {
    locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    results: Vec<ElevationResult>,
}

#[derive(Debug, Deserialize)]
struct ElevationResult {
    elevation: f64,
}

impl ElevationClient {
    /// Create a client against the public open-elevation API.
    pub fn new() -> Self {
        Self::with_url("https://api.open-elevation.com/api/v1/lookup")
    }

    /// Create a client with a custom base URL (for testing or self-hosted).
    pub fn with_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
            batch_size: ELEVATION_BATCH_SIZE,
        }
    }

    /// Fetch elevations aligned to the input points. Batches are fetched
    /// concurrently; a misaligned response is an error, never a silently
    /// shifted profile.
    pub async fn sample(&self, points: &[GpsPoint]) -> Result<Vec<f64>> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let batches = join_all(points.chunks(self.batch_size).map(|c| self.fetch_batch(c))).await;

        let mut elevations = Vec::with_capacity(points.len());
        for batch in batches {
            elevations.extend(batch?);
        }

        if elevations.len() != points.len() {
            return Err(RoutePlanError::HttpError {
                message: format!(
                    "elevation response misaligned: {} values for {} points",
                    elevations.len(),
                    points.len()
                ),
                status_code: None,
            });
        }

        Ok(elevations)
    }

    async fn fetch_batch(&self, points: &[GpsPoint]) -> Result<Vec<f64>> {
        let request = ElevationRequest {
            locations: points
                .iter()
                .map(|p| Location {
                    latitude: p.latitude,
                    longitude: p.longitude,
                })
                .collect(),
        };

        let resp = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RoutePlanError::HttpError {
                message: format!("elevation request error: {}", e),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RoutePlanError::HttpError {
                message: "elevation request failed".to_string(),
                status_code: Some(status.as_u16()),
            });
        }

        let data: ElevationResponse =
            resp.json().await.map_err(|e| RoutePlanError::HttpError {
                message: format!("elevation parse error: {}", e),
                status_code: None,
            })?;

        Ok(data.results.into_iter().map(|r| r.elevation).collect())
    }
}

impl Default for ElevationClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Synchronous [`SpanResolver`] backed by the two HTTP clients, for hosts
/// that drive the planner without their own async runtime.
pub struct HttpSpanResolver {
    routing: RoutingClient,
    elevation: ElevationClient,
    runtime: tokio::runtime::Runtime,
}

impl HttpSpanResolver {
    /// Create a resolver against the default public services.
    pub fn new() -> Result<Self> {
        Self::with_clients(RoutingClient::new(), ElevationClient::new())
    }

    /// Create a resolver with custom clients.
    pub fn with_clients(routing: RoutingClient, elevation: ElevationClient) -> Result<Self> {
        let runtime =
            tokio::runtime::Runtime::new().map_err(|e| RoutePlanError::Internal {
                message: format!("failed to create runtime: {}", e),
            })?;
        Ok(Self {
            routing,
            elevation,
            runtime,
        })
    }

    /// Fetch one span's points: routing polyline plus elevations.
    pub async fn fetch_span(
        routing: &RoutingClient,
        elevation: &ElevationClient,
        from: GpsPoint,
        to: GpsPoint,
    ) -> Result<Vec<RoutePoint>> {
        let polyline = routing.resolve(from, to).await?;
        let elevations = elevation.sample(&polyline).await?;
        Ok(polyline
            .into_iter()
            .zip(elevations)
            .map(|(position, elevation)| RoutePoint::new(position, elevation))
            .collect())
    }
}

impl SpanResolver for HttpSpanResolver {
    fn route_between(&mut self, from: GpsPoint, to: GpsPoint) -> Result<Vec<RoutePoint>> {
        self.runtime
            .block_on(Self::fetch_span(&self.routing, &self.elevation, from, to))
    }

    fn track_points(&mut self, track_id: TrackId) -> Result<Vec<RoutePoint>> {
        // Tracks come from the catalog, not from the routing stack.
        Err(RoutePlanError::TrackNotFound { track_id })
    }
}
