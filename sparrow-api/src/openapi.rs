//! `GET /openapi`: content-negotiated rendering of the controller's
//! generated OpenAPI document (§4.8).

use axum::http::header::ACCEPT;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

/// Render `doc` as JSON if the request asked for `application/json`,
/// otherwise as YAML (the default).
pub fn render(doc: &Value, headers: &HeaderMap) -> Response {
    let wants_json = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"));

    if wants_json {
        return axum::Json(doc).into_response();
    }

    match serde_yaml::to_string(doc) {
        Ok(yaml) => ([("content-type", "application/yaml")], yaml).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("rendering openapi document: {err}")).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn defaults_to_yaml() {
        let doc = serde_json::json!({"openapi": "3.0.3"});
        let response = render(&doc, &HeaderMap::new());
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn honors_json_accept_header() {
        let doc = serde_json::json!({"openapi": "3.0.3"});
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let response = render(&doc, &headers);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
