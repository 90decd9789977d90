use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const SEARCH_RADIUS_M: u32 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> AppResult<GeoPoint> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(AppError::invalid_input("Longitude and latitude must be finite numbers."));
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::invalid_input("Longitude or latitude out of range."));
        }
        Ok(GeoPoint { latitude, longitude })
    }

    /// Parses textual coordinates (e.g. from request headers). Anything that
    /// isn't a float is rejected rather than read as zero.
    pub fn parse(longitude: &str, latitude: &str) -> AppResult<GeoPoint> {
        let parse = |value: &str, name: &str| {
            value.trim()
                .parse::<f64>()
                .map_err(|_| AppError::invalid_input(format!("{name} must be a number.")))
        };
        GeoPoint::new(parse(longitude, "Longitude")?, parse(latitude, "Latitude")?)
    }
}

/// Great-circle distance in kilometers.
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos() * to.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HospitalCandidate {
    pub hospital_name: String,
    pub location: GeoPoint,
    pub distance: f64,
}

impl HospitalCandidate {
    pub fn summary(&self) -> String {
        format!(
            "{} ({} km away, at {}, {})",
            self.hospital_name, self.distance, self.location.latitude, self.location.longitude
        )
    }
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct Center {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<Center>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl OverpassElement {
    fn point(&self) -> Option<GeoPoint> {
        match self.kind.as_str() {
            "node" => Some(GeoPoint { latitude: self.lat?, longitude: self.lon? }),
            "way" | "relation" => self.center.as_ref().map(|c| GeoPoint { latitude: c.lat, longitude: c.lon }),
            _ => None,
        }
    }
}

fn overpass_query(point: GeoPoint) -> String {
    let around = format!("around:{SEARCH_RADIUS_M},{},{}", point.latitude, point.longitude);
    format!(
        "[out:json];(node[\"amenity\"=\"hospital\"]({around});way[\"amenity\"=\"hospital\"]({around});relation[\"amenity\"=\"hospital\"]({around}););out center;"
    )
}

fn nearest(origin: GeoPoint, elements: Vec<OverpassElement>) -> Option<HospitalCandidate> {
    let mut candidates: Vec<HospitalCandidate> = elements
        .into_iter()
        .filter_map(|element| {
            let location = element.point()?;
            Some(HospitalCandidate {
                hospital_name: element.tags.get("name").cloned().unwrap_or_else(|| "Unknown".to_owned()),
                location,
                distance: haversine_km(origin, location),
            })
        })
        .collect();

    candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    let mut closest = candidates.into_iter().next()?;
    closest.distance = (closest.distance * 100.0).round() / 100.0;
    Some(closest)
}

#[derive(Debug, Clone)]
pub struct HospitalLocator {
    http_client: reqwest::Client,
    url: String,
}

impl HospitalLocator {
    pub fn new(http_client: reqwest::Client, url: impl Into<String>) -> Self {
        HospitalLocator { http_client, url: url.into() }
    }

    pub async fn find_nearest(&self, point: GeoPoint) -> AppResult<Option<HospitalCandidate>> {
        let response: OverpassResponse = self.http_client
            .post(&self.url)
            .form(&[("data", overpass_query(point))])
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("hospital lookup failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::upstream(format!("hospital lookup rejected: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("unreadable hospital data: {e}")))?;

        tracing::debug!(candidates = response.elements.len(), "hospital lookup returned");
        Ok(nearest(point, response.elements))
    }
}
