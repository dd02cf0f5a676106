//! HTTP behavior of the annotation client against a mock service.

use chronomark_client::config::{AnnotationsConfig, AuthConfig, ClientConfig, TagQueryConfig};
use chronomark_client::{AnnotationClient, ApiClientError};
use chronomark_core::{Annotation, AnnotationRange};
use serde_json::json;
use std::collections::BTreeMap;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX: &str = "/chronograf/v1/sources/1/annotations";
const PROXY: &str = "/chronograf/v1/sources/1/proxy";
const JAN_1: i64 = 1_704_067_200_000;

fn config(base_url: &str) -> ClientConfig {
    ClientConfig {
        api_base_url: base_url.to_string(),
        request_timeout_ms: 2_000,
        auth: AuthConfig {
            api_key: Some("test-key".to_string()),
            jwt: Some("test-jwt".to_string()),
        },
        annotations: AnnotationsConfig {
            index_url: INDEX.to_string(),
        },
        tags: TagQueryConfig {
            proxy_url: PROXY.to_string(),
            database: "chronograf".to_string(),
            measurement: "annotations".to_string(),
        },
    }
}

async fn client(server: &MockServer) -> AnnotationClient {
    AnnotationClient::new(&config(&server.uri())).expect("client builds")
}

#[tokio::test]
async fn test_create_posts_rfc3339_and_returns_ms() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INDEX))
        .and(header("x-api-key", "test-key"))
        .and(header("authorization", "Bearer test-jwt"))
        .and(body_partial_json(json!({
            "startTime": "2024-01-01T00:00:00.000Z",
            "endTime": "2024-01-01T00:00:00.000Z",
            "text": "deploy"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "srv-1",
            "startTime": "2024-01-01T00:00:00Z",
            "endTime": "2024-01-01T00:00:00Z",
            "text": "deploy",
            "links": {"self": format!("{INDEX}/srv-1")}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server)
        .await
        .create_annotation(INDEX, &Annotation::point("tmp", "deploy", JAN_1))
        .await
        .unwrap();

    assert_eq!(created.id.as_str(), "srv-1");
    assert_eq!(created.start_time, Some(JAN_1));
    assert_eq!(created.links.self_link, format!("{INDEX}/srv-1"));
}

#[tokio::test]
async fn test_get_sends_range_and_tag_params() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(INDEX))
        .and(query_param("since", "2024-01-01T00:00:00.000Z"))
        .and(query_param("until", "2024-01-01T01:00:00.000Z"))
        .and(query_param("tag", "host=web1"))
        .and(query_param("tag", "region=eu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "annotations": [
                {
                    "id": "a",
                    "startTime": "2024-01-01T00:10:00.000Z",
                    "endTime": "2024-01-01T00:20:00.000Z",
                    "text": "outage",
                    "labels": ["incident"],
                    "tags": {"host": "web1", "region": "eu"},
                    "links": {"self": format!("{INDEX}/a")}
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut tags = BTreeMap::new();
    tags.insert("host".to_string(), "web1".to_string());
    tags.insert("region".to_string(), "eu".to_string());

    let annotations = client(&server)
        .await
        .get_annotations(INDEX, AnnotationRange::new(JAN_1, JAN_1 + 3_600_000), &tags)
        .await
        .unwrap();

    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].bounds(), Some((JAN_1 + 600_000, JAN_1 + 1_200_000)));
    assert!(annotations[0].has_label("incident"));
}

#[tokio::test]
async fn test_update_patches_self_link() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{INDEX}/a")))
        .and(body_partial_json(json!({"text": "renamed"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("ignored"))
        .expect(1)
        .mount(&server)
        .await;

    let annotation = Annotation::point("a", "renamed", JAN_1).with_self_link(format!("{INDEX}/a"));
    client(&server).await.update_annotation(&annotation).await.unwrap();
}

#[tokio::test]
async fn test_delete_uses_absolute_link_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("{INDEX}/a")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let other_base = config("http://unused.invalid");
    let client = AnnotationClient::new(&other_base).unwrap();
    let annotation =
        Annotation::point("a", "x", JAN_1).with_self_link(format!("{}{INDEX}/a", server.uri()));
    client.delete_annotation(&annotation).await.unwrap();
}

#[tokio::test]
async fn test_error_body_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"code": 404, "message": "annotation not found"})),
        )
        .mount(&server)
        .await;

    let annotation = Annotation::point("a", "x", JAN_1).with_self_link(format!("{INDEX}/a"));
    let err = client(&server)
        .await
        .delete_annotation(&annotation)
        .await
        .unwrap_err();
    match err {
        ApiClientError::InvalidResponse(message) => {
            assert_eq!(message, "404: annotation not found")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_update_without_self_link_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = client(&server)
        .await
        .update_annotation(&Annotation::point("a", "x", JAN_1))
        .await;
    assert!(matches!(result, Err(ApiClientError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_tag_keys_query_proxy() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PROXY))
        .and(body_json(json!({
            "query": "SHOW TAG KEYS ON \"chronograf\" FROM \"annotations\"",
            "db": "chronograf"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"statement_id": 0, "series": [
                {"name": "annotations", "columns": ["tagKey"], "values": [["host"], ["region"]]}
            ]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let keys = client(&server).await.tag_keys(PROXY).await.unwrap();
    assert_eq!(keys, vec!["host", "region"]);
}

#[tokio::test]
async fn test_tag_values_query_proxy() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PROXY))
        .and(body_partial_json(json!({
            "query": "SHOW TAG VALUES ON \"chronograf\" FROM \"annotations\" WITH KEY = \"host\""
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"statement_id": 0, "series": [
                {"name": "annotations", "columns": ["key", "value"],
                 "values": [["host", "web1"], ["host", "web2"]]}
            ]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let values = client(&server).await.tag_values(PROXY, "host").await.unwrap();
    assert_eq!(values, vec!["web1", "web2"]);
}

#[tokio::test]
async fn test_query_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PROXY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"statement_id": 0, "error": "database not found: chronograf"}]
        })))
        .mount(&server)
        .await;

    let err = client(&server).await.tag_keys(PROXY).await.unwrap_err();
    assert!(err.to_string().contains("database not found"));
}
