//! HTTP catalog feed client.
//!
//! Implements the abstract page contract for both observed upstream
//! shapes: POST with a JSON body whose pagination payload is echoed
//! back (opaque cursor or `[score, id]` tuple built from the last
//! record), and GET with query parameters including a page number
//! where a `next` field signals more pages.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{PaginationMode, SourceConfig};
use crate::pipeline::{Cursor, Page, PageFetcher};

/// Page fetcher for one configured catalog source.
pub struct CatalogClient {
    client: Client,
    source: SourceConfig,
}

impl CatalogClient {
    /// Create a client for one source, sharing the process-wide
    /// reqwest client.
    pub fn new(client: Client, source: SourceConfig) -> Self {
        Self { client, source }
    }

    /// Build the request for a page. Sources with a body template are
    /// POSTed; the cursor is injected into the body. Sources without
    /// one are fetched via GET query parameters.
    fn build_request(&self, cursor: Option<&Cursor>) -> reqwest::RequestBuilder {
        if let Some(template) = &self.source.body {
            let mut body = template.clone();
            if let Value::Object(map) = &mut body {
                map.insert("size".to_string(), json!(self.source.page_size));
                if let Some(cursor) = cursor {
                    let (field, payload) = self.cursor_body_entry(cursor);
                    map.insert(field, payload);
                }
            }
            self.client.post(&self.source.endpoint).json(&body)
        } else {
            let page = match cursor {
                Some(Cursor::Page(n)) => *n,
                _ => 1,
            };
            let mut query: Vec<(String, String)> = self
                .source
                .query
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            query.push(("size".to_string(), self.source.page_size.to_string()));
            if let PaginationMode::PageNumber { page_param, .. } = &self.source.mode {
                query.push((page_param.clone(), page.to_string()));
            }
            self.client.get(&self.source.endpoint).query(&query)
        }
    }

    /// Body key and payload carrying the cursor for POST sources.
    fn cursor_body_entry(&self, cursor: &Cursor) -> (String, Value) {
        match (&self.source.mode, cursor) {
            (PaginationMode::Cursor { request_field, .. }, Cursor::Opaque(token)) => {
                (request_field.clone(), token.clone())
            }
            (PaginationMode::ScoreId { request_field, .. }, Cursor::ScoreId { score, id }) => {
                (request_field.clone(), json!([score, id]))
            }
            // Mode/cursor mismatch cannot be built from config, but a
            // stale cursor is safer echoed opaquely than dropped.
            (_, Cursor::Opaque(token)) => ("cursor".to_string(), token.clone()),
            (_, _) => ("cursor".to_string(), Value::Null),
        }
    }

    /// Extract records and the next cursor from a response document.
    fn extract_page(&self, response: &Value, cursor: Option<&Cursor>) -> Page {
        let records: Vec<Value> = response
            .get(&self.source.records_path)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        if records.is_empty() {
            return Page::default();
        }

        let next = match &self.source.mode {
            PaginationMode::Cursor { response_field, .. } => response
                .get(response_field)
                .filter(|v| !v.is_null())
                .map(|v| Cursor::Opaque(v.clone())),

            PaginationMode::ScoreId {
                score_field,
                id_field,
                ..
            } => {
                // Cursor comes from the last record of the batch
                let last = records.last();
                let score = last.and_then(|r| r.get(score_field)).filter(|v| !v.is_null());
                let id = last
                    .and_then(|r| r.get(id_field))
                    .map(scalar_string)
                    .filter(|s| !s.is_empty());
                match (score, id) {
                    (Some(score), Some(id)) => Some(Cursor::ScoreId {
                        score: score.clone(),
                        id,
                    }),
                    _ => None,
                }
            }

            PaginationMode::PageNumber { next_field, .. } => {
                let current = match cursor {
                    Some(Cursor::Page(n)) => *n,
                    _ => 1,
                };
                response
                    .get(next_field)
                    .filter(|v| !v.is_null())
                    .map(|_| Cursor::Page(current + 1))
            }
        };

        Page { records, next }
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

#[async_trait]
impl PageFetcher for CatalogClient {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<Page> {
        let slug = &self.source.slug;
        let response = self
            .build_request(cursor)
            .send()
            .await
            .map_err(|e| AppError::fetch(slug, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(slug, format!("HTTP {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::fetch(slug, format!("invalid JSON response: {}", e)))?;

        Ok(self.extract_page(&body, cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_partial_json, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::models::FieldMap;
    use crate::pipeline::PageWalker;

    fn fields() -> FieldMap {
        FieldMap {
            id: "id".to_string(),
            name: vec!["name".to_string()],
            price: "price".to_string(),
            attributes: BTreeMap::new(),
        }
    }

    fn page_number_source(endpoint: String) -> SourceConfig {
        SourceConfig {
            slug: "spinny".to_string(),
            endpoint,
            mode: PaginationMode::PageNumber {
                page_param: "page".to_string(),
                next_field: "next".to_string(),
            },
            query: BTreeMap::from([("city".to_string(), "bangalore".to_string())]),
            body: None,
            page_size: 2,
            records_path: "results".to_string(),
            fields: fields(),
        }
    }

    fn score_id_source(endpoint: String) -> SourceConfig {
        SourceConfig {
            slug: "cars24".to_string(),
            endpoint,
            mode: PaginationMode::ScoreId {
                score_field: "score".to_string(),
                id_field: "appointmentId".to_string(),
                request_field: "searchAfter".to_string(),
            },
            query: BTreeMap::new(),
            body: Some(serde_json::json!({ "cityId": "4709", "sort": "bestmatch" })),
            page_size: 2,
            records_path: "content".to_string(),
            fields: fields(),
        }
    }

    #[tokio::test]
    async fn test_page_number_walk() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("page", "1"))
            .and(query_param("city", "bangalore"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{ "id": 1 }, { "id": 2 }],
                "next": "page=2"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{ "id": 3 }],
                "next": null
            })))
            .mount(&server)
            .await;

        let fetcher = CatalogClient::new(Client::new(), page_number_source(server.uri()));
        let outcome = PageWalker::new(std::time::Duration::ZERO, 0)
            .walk(&fetcher)
            .await;
        assert_eq!(outcome.records.len(), 3);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_score_id_cursor_echoed_in_body() {
        let server = MockServer::start().await;

        // The follow-up request must echo the last record's [score, id]
        // tuple. Mounted first: both requests carry the cityId filter,
        // so the more specific matcher has to win.
        Mock::given(method("POST"))
            .and(body_partial_json(
                serde_json::json!({ "searchAfter": [8.1, "A2"] }),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        // First page: POST without searchAfter
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({ "cityId": "4709" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [
                    { "appointmentId": "A1", "score": 9.5 },
                    { "appointmentId": "A2", "score": 8.1 }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = CatalogClient::new(Client::new(), score_id_source(server.uri()));
        let walker = PageWalker::new(std::time::Duration::ZERO, 3);
        let outcome = walker.walk(&fetcher).await;
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_opaque_cursor_echoed_in_body() {
        let server = MockServer::start().await;

        // Follow-up request must echo the response token verbatim.
        // Mounted first: both requests carry the city filter, so the
        // more specific matcher has to win.
        Mock::given(method("POST"))
            .and(body_partial_json(
                serde_json::json!({ "searchAfter": "pg2tok" }),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        // First page: no token yet, response carries the next one
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({ "city": "bangalore" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{ "id": 1 }, { "id": 2 }],
                "searchAfter": "pg2tok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = SourceConfig {
            slug: "spinny".to_string(),
            endpoint: server.uri(),
            mode: PaginationMode::Cursor {
                response_field: "searchAfter".to_string(),
                request_field: "searchAfter".to_string(),
            },
            query: BTreeMap::new(),
            body: Some(serde_json::json!({ "city": "bangalore" })),
            page_size: 2,
            records_path: "results".to_string(),
            fields: fields(),
        };

        let fetcher = CatalogClient::new(Client::new(), source);
        let outcome = PageWalker::new(std::time::Duration::ZERO, 3)
            .walk(&fetcher)
            .await;
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_non_2xx_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = CatalogClient::new(Client::new(), page_number_source(server.uri()));
        let err = fetcher.fetch_page(None).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_missing_records_path_ends_walk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "unexpected": true })),
            )
            .mount(&server)
            .await;

        let fetcher = CatalogClient::new(Client::new(), page_number_source(server.uri()));
        let page = fetcher.fetch_page(None).await.unwrap();
        assert!(page.records.is_empty());
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn test_missing_score_ends_pagination() {
        let server = MockServer::start().await;
        // Records present but the last one carries no score: schema
        // drift, walk must stop after this page.
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{ "appointmentId": "A1" }]
            })))
            .mount(&server)
            .await;

        let fetcher = CatalogClient::new(Client::new(), score_id_source(server.uri()));
        let page = fetcher.fetch_page(None).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert!(page.next.is_none());
    }
}
