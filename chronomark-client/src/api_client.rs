//! REST client for the annotation service.

use crate::config::{AuthConfig, ClientConfig};
use crate::wire::{
    show_tag_keys_query, show_tag_values_query, ListAnnotationsResponse, ProxyQuery,
    QueryResponse, ServerAnnotation, ServerError,
};
use chronomark_core::{ms_to_rfc3339, Annotation, AnnotationRange, TimeError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Timestamp error: {0}")]
    Time(#[from] TimeError),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Config error: {0}")]
    Config(String),
}

/// Client for annotation CRUD and tag suggestions.
///
/// Every request carries the configured auth headers. Links returned by the
/// service are usually relative and resolve against `api_base_url`.
#[derive(Clone)]
pub struct AnnotationClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
    tag_database: String,
    tag_measurement: String,
}

impl AnnotationClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiClientError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let auth_header = build_auth_headers(&config.auth)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_header,
            tag_database: config.tags.database.clone(),
            tag_measurement: config.tags.measurement.clone(),
        })
    }

    /// POSTs the annotation and returns the server's copy, which carries the
    /// assigned id and self link.
    pub async fn create_annotation(
        &self,
        create_url: &str,
        annotation: &Annotation,
    ) -> Result<Annotation, ApiClientError> {
        let body = ServerAnnotation::from_annotation(annotation)?;
        let created: ServerAnnotation = self.send_json(Method::POST, create_url, Some(&body)).await?;
        Ok(created.into_annotation()?)
    }

    /// Annotations overlapping `range`, narrowed server-side to records
    /// carrying every tag in `tags`.
    pub async fn get_annotations(
        &self,
        index_url: &str,
        range: AnnotationRange,
        tags: &BTreeMap<String, String>,
    ) -> Result<Vec<Annotation>, ApiClientError> {
        let mut query = vec![
            ("since".to_string(), ms_to_rfc3339(range.since)?),
            ("until".to_string(), ms_to_rfc3339(range.until)?),
        ];
        query.extend(
            tags.iter()
                .map(|(key, value)| ("tag".to_string(), format!("{key}={value}"))),
        );

        let url = self.resolve(index_url);
        debug!(%url, since = range.since, until = range.until, tags = tags.len(), "Fetching annotations");
        let response = self
            .client
            .get(&url)
            .headers(self.auth_header.clone())
            .query(&query)
            .send()
            .await?;
        let list: ListAnnotationsResponse = self.parse_response(response).await?;
        list.annotations
            .into_iter()
            .map(|a| a.into_annotation().map_err(ApiClientError::from))
            .collect()
    }

    /// PATCHes the annotation at its self link. The response body is ignored.
    pub async fn update_annotation(&self, annotation: &Annotation) -> Result<(), ApiClientError> {
        let url = self_link(annotation)?;
        let body = ServerAnnotation::from_annotation(annotation)?;
        self.send_no_content(Method::PATCH, url, Some(&body)).await
    }

    pub async fn delete_annotation(&self, annotation: &Annotation) -> Result<(), ApiClientError> {
        let url = self_link(annotation)?;
        self.send_no_content::<()>(Method::DELETE, url, None).await
    }

    pub async fn tag_keys(&self, proxy_url: &str) -> Result<Vec<String>, ApiClientError> {
        let query = show_tag_keys_query(&self.tag_database, &self.tag_measurement);
        let response = self.proxy_query(proxy_url, query).await?;
        Ok(response.column_strings(0))
    }

    pub async fn tag_values(&self, proxy_url: &str, tag_key: &str) -> Result<Vec<String>, ApiClientError> {
        let query = show_tag_values_query(&self.tag_database, &self.tag_measurement, tag_key);
        let response = self.proxy_query(proxy_url, query).await?;
        Ok(response.column_strings(1))
    }

    async fn proxy_query(&self, proxy_url: &str, query: String) -> Result<QueryResponse, ApiClientError> {
        let body = ProxyQuery {
            query,
            db: self.tag_database.clone(),
        };
        let response: QueryResponse = self.send_json(Method::POST, proxy_url, Some(&body)).await?;
        if let Some(error) = response.error() {
            return Err(ApiClientError::InvalidResponse(format!("Query failed: {error}")));
        }
        Ok(response)
    }

    /// Relative links resolve against the base URL; absolute ones are used
    /// as given.
    pub fn resolve(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else if link.starts_with('/') {
            format!("{}{}", self.base_url, link)
        } else {
            format!("{}/{}", self.base_url, link)
        }
    }

    async fn send_json<T, B>(&self, method: Method, link: &str, body: Option<&B>) -> Result<T, ApiClientError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let response = self.send(method, link, body).await?;
        self.parse_response(response).await
    }

    async fn send_no_content<B>(&self, method: Method, link: &str, body: Option<&B>) -> Result<(), ApiClientError>
    where
        B: serde::Serialize + ?Sized,
    {
        let response = self.send(method, link, body).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(error_from_body(status, response.text().await?))
    }

    async fn send<B>(&self, method: Method, link: &str, body: Option<&B>) -> Result<reqwest::Response, ApiClientError>
    where
        B: serde::Serialize + ?Sized,
    {
        let url = self.resolve(link);
        debug!(%method, %url, "Sending annotation request");
        let mut request = self
            .client
            .request(method, &url)
            .headers(self.auth_header.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(error_from_body(status, response.text().await?))
        }
    }
}

fn self_link(annotation: &Annotation) -> Result<&str, ApiClientError> {
    let link = annotation.links.self_link.as_str();
    if link.is_empty() {
        return Err(ApiClientError::InvalidResponse(format!(
            "Annotation {} has no self link",
            annotation.id
        )));
    }
    Ok(link)
}

fn error_from_body(status: reqwest::StatusCode, text: String) -> ApiClientError {
    warn!(status = status.as_u16(), "Annotation service returned an error");
    if let Ok(server_error) = serde_json::from_str::<ServerError>(&text) {
        return ApiClientError::InvalidResponse(format!(
            "{}: {}",
            server_error.code, server_error.message
        ));
    }
    ApiClientError::InvalidResponse(format!("HTTP {}: {}", status.as_u16(), text))
}

fn build_auth_headers(auth: &AuthConfig) -> Result<HeaderMap, ApiClientError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &auth.api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    if let Some(jwt) = &auth.jwt {
        let value = format!("Bearer {}", jwt);
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&value).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    Ok(headers)
}
