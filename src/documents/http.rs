//! Realtime-database REST dialect.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | push | `POST {base}/orders.json` with `"createdAt": {".sv": "timestamp"}`, answers `{"name": id}` |
//! | delete | `DELETE {base}/orders/{id}.json` |
//! | watch | `GET {base}/orders.json` on an interval, answers `null` or `{id: document}` |
//!
//! An optional token is sent as the `auth` query parameter.
//!
//! Deletes and reads are retried on any transport error or 5xx answer. A push is not idempotent,
//! so it is only retried when the connection was never made; otherwise a second try could store
//! the order twice.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::{
    ChangeFeed, DocumentCollection, DocumentSnapshot, NewOrderDocument, OrderDocument, RemoteError,
    ORDERS_COLLECTION,
};
use crate::lifecycle::AbortOnDrop;
use crate::model::OrderId;

/// Bounded retry with exponential backoff for transport errors and 5xx answers.
///
/// Only requests that are safe to repeat use every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of tries, including the first one.
    pub attempts: u32,
    /// Wait before the second try; doubled before each later one.
    pub backoff: Duration,
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

/// How far a failed try got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    /// No connection was made, so the server never saw the request.
    NotSent,
    /// The request went out and may have been applied.
    Sent,
}

/// Whether a failed try can be repeated without risking a duplicate effect.
fn may_retry(idempotent: bool, failure: Failure) -> bool {
    idempotent || failure == Failure::NotSent
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

/// A document collection behind a realtime-database REST endpoint.
#[derive(Debug, Clone)]
pub struct HttpDocuments {
    client: Client,
    base_url: String,
    auth: Option<String>,
    retry: RetryPolicy,
    poll_interval: Duration,
}

impl HttpDocuments {
    /// `timeout` bounds every single request.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: None,
            retry: RetryPolicy::default(),
            poll_interval: Duration::from_millis(250),
        })
    }

    pub fn with_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(token.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn collection_url(&self) -> String {
        format!("{}/{}.json", self.base_url, ORDERS_COLLECTION)
    }

    fn document_url(&self, id: &OrderId) -> String {
        format!("{}/{}/{}.json", self.base_url, ORDERS_COLLECTION, id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }

    /// Sends the request built by `build`, retrying per the policy.
    ///
    /// A request that is not `idempotent` is only tried again when it never left.
    async fn send(
        &self,
        idempotent: bool,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<Response, RemoteError> {
        let mut attempt = 1;
        loop {
            let (failure, reason) = match self.authorize(build()).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if response.status().is_client_error() => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    warn!(status, %body, "Remote store rejected request");
                    return Err(RemoteError::Rejected { status, body });
                }
                Ok(response) => (Failure::Sent, format!("server answered {}", response.status())),
                Err(e) if e.is_connect() => (Failure::NotSent, e.to_string()),
                Err(e) => (Failure::Sent, e.to_string()),
            };

            if attempt >= self.retry.attempts || !may_retry(idempotent, failure) {
                warn!(attempt, ?failure, error = %reason, "Remote request failed, giving up");
                return Err(RemoteError::Unavailable(reason));
            }
            let delay = self.retry.delay(attempt);
            warn!(attempt, ?delay, error = %reason, "Remote request failed, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Reads the whole collection once.
    pub async fn fetch(&self) -> Result<DocumentSnapshot, RemoteError> {
        let url = self.collection_url();
        let response = self.send(true, || self.client.get(&url)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
        parse_collection(&body)
    }
}

#[async_trait]
impl DocumentCollection for HttpDocuments {
    #[instrument(skip(self, document), fields(customer = %document.customer))]
    async fn push(&self, document: NewOrderDocument) -> Result<OrderId, RemoteError> {
        let mut body = serde_json::to_value(&document).map_err(|e| RemoteError::Decode(e.to_string()))?;
        if let Value::Object(fields) = &mut body {
            fields.insert("createdAt".to_string(), json!({ ".sv": "timestamp" }));
        }

        let url = self.collection_url();
        let response = self.send(false, || self.client.post(&url).json(&body)).await?;
        let answer = response
            .text()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
        let id = parse_push_response(&answer)?;
        debug!(%id, "Document pushed");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &OrderId) -> Result<(), RemoteError> {
        let url = self.document_url(id);
        self.send(true, || self.client.delete(&url)).await?;
        debug!("Document deleted");
        Ok(())
    }

    fn watch(&self) -> ChangeFeed {
        let (sender, receiver) = watch::channel(None);
        let documents = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(documents.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(url = %documents.collection_url(), "Change feed poller started");

            loop {
                ticker.tick().await;
                let snapshot = match documents.fetch().await {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        warn!(error = %e, "Change feed poll failed");
                        continue;
                    }
                };
                let changed = sender.send_if_modified(move |current| {
                    if current.as_deref() == Some(&snapshot) {
                        return false;
                    }
                    *current = Some(Arc::new(snapshot));
                    true
                });
                if changed {
                    debug!("Remote collection changed");
                }
                if sender.is_closed() {
                    break;
                }
            }
        });
        ChangeFeed::new(receiver, Duration::ZERO, Some(AbortOnDrop::new(handle)))
    }
}

/// Decodes a collection read. Documents that do not decode are skipped.
fn parse_collection(body: &str) -> Result<DocumentSnapshot, RemoteError> {
    let raw: Option<BTreeMap<String, Value>> =
        serde_json::from_str(body).map_err(|e| RemoteError::Decode(e.to_string()))?;

    let mut snapshot = DocumentSnapshot::new();
    for (key, value) in raw.unwrap_or_default() {
        match serde_json::from_value::<OrderDocument>(value) {
            Ok(document) => {
                snapshot.insert(key, document);
            }
            Err(e) => warn!(%key, error = %e, "Skipping undecodable document"),
        }
    }
    Ok(snapshot)
}

fn parse_push_response(body: &str) -> Result<OrderId, RemoteError> {
    let PushResponse { name } =
        serde_json::from_str(body).map_err(|e| RemoteError::Decode(e.to_string()))?;
    OrderId::parse(&name).map_err(|_| RemoteError::InvalidId(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MenuItem, OrderDraft, OrderKind};

    #[test]
    fn test_parse_collection() {
        assert!(parse_collection("null").unwrap().is_empty());

        let body = r#"{
            "-Nb1": {"customer": "Sam", "items": [{"name": "Moscow Mule"}], "createdAt": 1718000000000},
            "-Nb2": "not a document",
            "-Nb3": {"items": [{"name": "Miso Salmon"}], "type": "food"}
        }"#;
        let snapshot = parse_collection(body).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["-Nb1"].created_at, Some(1_718_000_000_000));
        assert_eq!(snapshot["-Nb3"].kind, OrderKind::Food);
        assert_eq!(snapshot["-Nb3"].created_at, None);

        assert!(matches!(parse_collection("[1"), Err(RemoteError::Decode(_))));
    }

    #[test]
    fn test_parse_push_response() {
        let id = parse_push_response(r#"{"name": "-Nb4xQ"}"#).unwrap();
        assert_eq!(id.as_str(), "-Nb4xQ");
        assert_eq!(
            parse_push_response(r#"{"name": "a/b"}"#),
            Err(RemoteError::InvalidId("a/b".to_string()))
        );
        assert!(matches!(parse_push_response("{}"), Err(RemoteError::Decode(_))));
    }

    #[test]
    fn test_backoff_doubles() {
        let retry = RetryPolicy {
            attempts: 4,
            backoff: Duration::from_millis(100),
        };
        assert_eq!(retry.delay(1), Duration::from_millis(100));
        assert_eq!(retry.delay(2), Duration::from_millis(200));
        assert_eq!(retry.delay(3), Duration::from_millis(400));
    }

    #[test]
    fn test_push_is_only_retried_when_never_sent() {
        // Push
        assert!(may_retry(false, Failure::NotSent));
        assert!(!may_retry(false, Failure::Sent));
        // Delete and fetch
        assert!(may_retry(true, Failure::NotSent));
        assert!(may_retry(true, Failure::Sent));
    }

    #[test]
    fn test_urls() {
        let documents = HttpDocuments::new("https://demo.example.com/", Duration::from_secs(1)).unwrap();
        let id = OrderId::parse("-Nb1").unwrap();
        assert_eq!(documents.collection_url(), "https://demo.example.com/orders.json");
        assert_eq!(documents.document_url(&id), "https://demo.example.com/orders/-Nb1.json");
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        // Nothing listens on the discard port
        let documents = HttpDocuments::new("http://127.0.0.1:9", Duration::from_millis(500))
            .unwrap()
            .with_retry(RetryPolicy {
                attempts: 2,
                backoff: Duration::from_millis(1),
            });
        let draft = OrderDraft::new(
            "Sam",
            vec![MenuItem::new("Moscow Mule", "🥃", "Classic")],
            "",
            OrderKind::Drink,
        )
        .unwrap();

        let result = documents.push(NewOrderDocument::from(draft)).await;
        assert!(matches!(result, Err(RemoteError::Unavailable(_))));
    }
}
