//! Integration tests for `MapboxClient` using wiremock HTTP mocks.

use vecino_geocode::{MapboxClient, Provider};
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> MapboxClient {
    MapboxClient::with_base_url("test-token", "es", 30, base_url)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn forward_parses_features_into_candidates() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "features": [
            {
                "id": "address.100",
                "text": "Siempre Viva",
                "place_name": "Av. Siempre Viva 742, Springfield, Buenos Aires",
                "center": [-58.381592, -34.603722],
                "context": [
                    { "id": "postcode.1", "text": "B1675" },
                    { "id": "place.2", "text": "Springfield" },
                    { "id": "region.3", "text": "Buenos Aires" }
                ]
            },
            {
                "id": "poi.200",
                "text": "Parque Centenario",
                "place_name": "Parque Centenario, Caballito",
                "center": [-58.435, -34.606],
                "context": []
            }
        ]
    });

    Mock::given(method("GET"))
        .and(query_param("access_token", "test-token"))
        .and(query_param("limit", "5"))
        .and(query_param("language", "es"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let candidates = client.forward("Siempre Viva", 5).await;

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].id, "mapbox:address.100");
    assert_eq!(
        candidates[0].label,
        "Av. Siempre Viva 742, Springfield, Buenos Aires"
    );
    assert_eq!(candidates[0].extra.city, "Springfield");
    assert_eq!(candidates[0].extra.postcode, "B1675");
    assert_eq!(candidates[0].provider, Provider::Mapbox);
    assert_eq!(candidates[1].extra.city, "");
}

#[tokio::test]
async fn forward_drops_invalid_features_and_respects_limit() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "features": [
            { "id": "a", "place_name": "No center at all" },
            { "id": "b", "place_name": "", "center": [-58.4, -34.6] },
            { "id": "c", "place_name": "Uno", "center": [-58.41, -34.61] },
            { "id": "d", "place_name": "Dos", "center": [-58.42, -34.62] },
            { "id": "e", "place_name": "Tres", "center": [-58.43, -34.63] }
        ]
    });

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let candidates = client.forward("algo", 2).await;

    let labels: Vec<&str> = candidates.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["Uno", "Dos"], "invalid features dropped, limit applied after");
}

#[tokio::test]
async fn forward_absorbs_http_failure_into_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    assert!(client.forward("algo", 5).await.is_empty());
}

#[tokio::test]
async fn forward_absorbs_malformed_body_into_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    assert!(client.forward("algo", 5).await.is_empty());
}

#[tokio::test]
async fn try_forward_surfaces_http_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.try_forward("algo", 5).await;
    assert!(result.is_err(), "try_forward must not absorb failures");
}

#[tokio::test]
async fn reverse_maps_first_feature_into_address_fields() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "features": [
            {
                "id": "address.9",
                "place_name": "Calle Falsa 123, Springfield",
                "center": [-58.40, -34.60],
                "context": [
                    { "id": "place.2", "text": "Springfield" },
                    { "id": "region.3", "text": "Buenos Aires" }
                ]
            }
        ]
    });

    Mock::given(method("GET"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let fields = client.reverse(-34.60, -58.40).await;

    assert_eq!(fields.address, "Calle Falsa 123, Springfield");
    assert_eq!(fields.city, "Springfield");
    assert_eq!(fields.state, "Buenos Aires");
    assert_eq!(fields.postcode, "");
}

#[tokio::test]
async fn reverse_absorbs_failure_into_empty_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let fields = client.reverse(-34.60, -58.40).await;
    assert!(fields.is_empty());
}

#[tokio::test]
async fn reverse_with_no_features_yields_empty_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "features": [] })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    assert!(client.reverse(-34.60, -58.40).await.is_empty());
}
