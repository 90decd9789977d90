pub mod locator;

use axum::{debug_handler, extract::State, http::HeaderMap, response::IntoResponse, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{auth::Principal, AppError, AppResult, JsonBody, AppState};

use locator::{GeoPoint, HospitalLocator};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/nearest", post(nearest))
}

/// Reads the optional `long`/`lat` headers. Both absent means no location;
/// one without the other, or anything unparseable, is an input error.
pub fn location_from_headers(headers: &HeaderMap) -> AppResult<Option<GeoPoint>> {
    fn header<'a>(headers: &'a HeaderMap, name: &str) -> AppResult<Option<&'a str>> {
        headers.get(name)
            .map(|value| value.to_str().map_err(|_| AppError::invalid_input(format!("{name} header is not text."))))
            .transpose()
    }

    match (header(headers, "long")?, header(headers, "lat")?) {
        (None, None) => Ok(None),
        (Some(longitude), Some(latitude)) => GeoPoint::parse(longitude, latitude).map(Some),
        _ => Err(AppError::invalid_input("Both long and lat headers are required.")),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NearestRequest {
    long: Option<Value>,
    lat: Option<Value>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn nearest(
    _principal: Principal,
    State(locator): State<HospitalLocator>,
    JsonBody(NearestRequest { long, lat }): JsonBody<NearestRequest>,
) -> AppResult<impl IntoResponse> {
    let (Some(longitude), Some(latitude)) = (long.as_ref().and_then(Value::as_f64), lat.as_ref().and_then(Value::as_f64)) else {
        return Err(AppError::invalid_input("Longitude and latitude must be numbers."));
    };

    let hospitals = locator.find_nearest(GeoPoint::new(longitude, latitude)?).await?;
    Ok(Json(json!({ "hospitals": hospitals })))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_location_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(location_from_headers(&headers).unwrap(), None);

        headers.insert("long", HeaderValue::from_static("77.08"));
        assert!(matches!(location_from_headers(&headers), Err(AppError::InvalidInput(_))));

        headers.insert("lat", HeaderValue::from_static("28.96"));
        let point = location_from_headers(&headers).unwrap().unwrap();
        assert_eq!(point.longitude, 77.08);
        assert_eq!(point.latitude, 28.96);

        headers.insert("lat", HeaderValue::from_static("twenty"));
        assert!(matches!(location_from_headers(&headers), Err(AppError::InvalidInput(_))));
    }
}
