//! HTTP transport for a table-style REST backend.
//!
//! Inserts are `POST /tables/{table}`, updates `PATCH` and deletes `DELETE`
//! on `/tables/{table}/{id}` with `If-Match: "<version>"`. Pulls are
//! `GET /tables/{table}?__includeDeleted=true` plus an optional `$filter`.

use std::marker::PhantomData;
use std::time::Duration;

use reqwest::header::IF_MATCH;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;

use super::{PullQuery, SyncTransport, TransportError};
use crate::config::SyncConfig;
use crate::models::{OperationKind, PendingOperation};
use crate::sync::{CompletedPush, PushFailure, PushReport, PushStatus, SyncRecord};
use crate::util::body_excerpt;

const API_VERSION_HEADER: &str = "ZUMO-API-VERSION";
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Map an HTTP status onto the push status vocabulary
pub fn normalize_status(status: StatusCode) -> PushStatus {
    match status {
        StatusCode::NOT_FOUND => PushStatus::NotFound,
        StatusCode::CONFLICT => PushStatus::VersionConflict,
        StatusCode::PRECONDITION_FAILED => PushStatus::PreconditionFailed,
        other => PushStatus::TransportError(Some(other.as_u16())),
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport<R> {
    client: reqwest::Client,
    table_url: String,
    api_version: String,
    _record: PhantomData<fn() -> R>,
}

impl<R: SyncRecord> HttpTransport<R> {
    pub fn new(config: &SyncConfig) -> crate::Result<Self> {
        let base_url = config.remote_base_url()?;
        let table = config.table_name()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(TransportError::from)?;

        Ok(Self {
            client,
            table_url: format!("{base_url}/tables/{table}"),
            api_version: config.api_version.clone(),
            _record: PhantomData,
        })
    }

    pub fn table_url(&self) -> &str {
        &self.table_url
    }

    fn record_url(&self, record_id: &str) -> String {
        format!("{}/{}", self.table_url, record_id)
    }

    fn request(&self, operation: &PendingOperation<R>) -> Result<RequestBuilder, TransportError> {
        let record = &operation.record;
        let builder = match operation.kind {
            OperationKind::Insert => self
                .client
                .post(&self.table_url)
                .json(&Self::request_body(record)?),
            OperationKind::Update => self
                .client
                .patch(self.record_url(record.record_id()))
                .json(&Self::request_body(record)?),
            OperationKind::Delete => self.client.delete(self.record_url(record.record_id())),
        };

        let builder = builder.header(API_VERSION_HEADER, &self.api_version);
        Ok(match (operation.kind, record.version()) {
            (OperationKind::Update | OperationKind::Delete, Some(version)) => {
                builder.header(IF_MATCH, format!("\"{version}\""))
            }
            _ => builder,
        })
    }

    /// Version travels in `If-Match`; the tombstone flag is never written
    /// directly.
    fn request_body(record: &R) -> Result<Value, TransportError> {
        let mut body = serde_json::to_value(record)
            .map_err(|error| TransportError::InvalidPayload(error.to_string()))?;
        if let Value::Object(fields) = &mut body {
            fields.remove("version");
            fields.remove("deleted");
        }
        Ok(body)
    }
}

impl<R: SyncRecord> SyncTransport for HttpTransport<R> {
    type Record = R;

    async fn push(
        &self,
        operations: &[PendingOperation<R>],
    ) -> Result<PushReport<R>, TransportError> {
        let mut report = PushReport::default();

        for operation in operations {
            let record_id = operation.record_id().to_string();
            let response = self.request(operation)?.send().await?;
            let status = response.status();

            if status.is_success() {
                let remote = match operation.kind {
                    OperationKind::Delete => None,
                    OperationKind::Insert | OperationKind::Update => response.json::<R>().await.ok(),
                };
                tracing::debug!("Pushed {} {}", operation.kind, record_id);
                report.completed.push(CompletedPush { record_id, remote });
                continue;
            }

            let push_status = normalize_status(status);
            let body = response.text().await.unwrap_or_default();
            // Only 404/409/412 are conflicts; anything else rejects the whole
            // push so no queued operation is resolved against an outage.
            let remote = match push_status {
                PushStatus::VersionConflict | PushStatus::PreconditionFailed => {
                    serde_json::from_str::<R>(&body).ok()
                }
                PushStatus::NotFound => None,
                PushStatus::TransportError(_) => {
                    return Err(TransportError::Status {
                        status: status.as_u16(),
                        body: body_excerpt(&body),
                    });
                }
            };
            tracing::debug!(
                "Remote rejected {} {}: {} {}",
                operation.kind,
                record_id,
                push_status,
                body_excerpt(&body)
            );
            report.failures.push(PushFailure::new(
                operation.kind,
                push_status,
                operation.record.clone(),
                remote,
            ));
        }

        Ok(report)
    }

    async fn pull(&self, query: &PullQuery) -> Result<Vec<R>, TransportError> {
        let mut params = vec![("__includeDeleted", "true")];
        if let Some(filter) = query.filter.as_deref() {
            params.push(("$filter", filter));
        }

        let response = self
            .client
            .get(&self.table_url)
            .header(API_VERSION_HEADER, &self.api_version)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body_excerpt(&body),
            });
        }

        Ok(response.json::<Vec<R>>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemId, TodoItem};
    use crate::sync::{
        FixedAnswerGateway, MemoryQueue, SyncOrchestrator, SyncSession, TracingReporter,
    };
    use pretty_assertions::assert_eq;
    use std::env;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn config(url: &str) -> SyncConfig {
        SyncConfig {
            remote_url: Some(url.to_string()),
            ..SyncConfig::default()
        }
    }

    fn item(id: &str, text: &str, version: Option<&str>) -> TodoItem {
        TodoItem {
            id: ItemId::from(id),
            text: text.to_string(),
            complete: false,
            version: version.map(str::to_string),
            deleted: false,
        }
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let head = text[..end].to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .map_or(0, |value| value.trim().parse::<usize>().unwrap());
                if buf.len() >= end + 4 + length {
                    return text;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Answers one connection per canned response; yields the raw requests
    async fn canned_server(
        responses: Vec<(u16, &'static str)>,
    ) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut stream).await);
                let response = format!(
                    "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
            requests
        });
        (url, handle)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn push_insert_adopts_server_copy() {
        let (url, server) = canned_server(vec![(
            201,
            r#"{"id":"A","text":"foo","complete":false,"version":"v1"}"#,
        )])
        .await;
        let transport = HttpTransport::<TodoItem>::new(&config(&url)).unwrap();

        let report = transport
            .push(&[PendingOperation::new(
                OperationKind::Insert,
                item("A", "foo", None),
                1,
            )])
            .await
            .unwrap();

        assert!(report.failures.is_empty());
        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.completed[0].record_id, "A");
        assert_eq!(report.completed[0].remote, Some(item("A", "foo", Some("v1"))));

        let requests = server.await.unwrap();
        let request = requests[0].to_ascii_lowercase();
        assert!(request.starts_with("post /tables/todoitem http/1.1"));
        assert!(request.contains("zumo-api-version: 2.0.0"));
        assert!(!request.contains("if-match"));
        assert!(request.contains(r#""text":"foo""#));
        assert!(!request.contains("version\":"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn push_update_sends_if_match_and_reads_conflict_copy() {
        let (url, server) = canned_server(vec![(
            412,
            r#"{"id":"A","text":"bar","complete":false,"version":"v2"}"#,
        )])
        .await;
        let transport = HttpTransport::<TodoItem>::new(&config(&url)).unwrap();

        let report = transport
            .push(&[PendingOperation::new(
                OperationKind::Update,
                item("A", "foo", Some("v1")),
                1,
            )])
            .await
            .unwrap();

        assert!(report.completed.is_empty());
        let failure = &report.failures[0];
        assert_eq!(failure.kind, OperationKind::Update);
        assert_eq!(failure.status, PushStatus::PreconditionFailed);
        assert_eq!(failure.local, item("A", "foo", Some("v1")));
        assert_eq!(failure.remote, Some(item("A", "bar", Some("v2"))));

        let requests = server.await.unwrap();
        let request = requests[0].to_ascii_lowercase();
        assert!(request.starts_with("patch /tables/todoitem/a http/1.1"));
        assert!(request.contains("if-match: \"v1\""));
        assert!(request.contains("zumo-api-version: 2.0.0"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn push_delete_not_found_has_no_server_copy() {
        let (url, server) = canned_server(vec![(404, "")]).await;
        let transport = HttpTransport::<TodoItem>::new(&config(&url)).unwrap();

        let report = transport
            .push(&[PendingOperation::new(
                OperationKind::Delete,
                item("B", "old", Some("v4")),
                1,
            )])
            .await
            .unwrap();

        assert_eq!(report.failures[0].status, PushStatus::NotFound);
        assert_eq!(report.failures[0].remote, None);

        let requests = server.await.unwrap();
        let request = requests[0].to_ascii_lowercase();
        assert!(request.starts_with("delete /tables/todoitem/b http/1.1"));
        assert!(request.contains("if-match: \"v4\""));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn push_server_error_rejects_whole_push() {
        let (url, server) = canned_server(vec![
            (201, r#"{"id":"A","text":"foo","version":"v1"}"#),
            (503, "down for maintenance"),
        ])
        .await;
        let transport = HttpTransport::<TodoItem>::new(&config(&url)).unwrap();

        let error = transport
            .push(&[
                PendingOperation::new(OperationKind::Insert, item("A", "foo", None), 1),
                PendingOperation::new(OperationKind::Update, item("B", "bar", Some("v3")), 2),
            ])
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            TransportError::Status { status: 503, ref body } if body == "down for maintenance"
        ));
        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn push_fails_when_remote_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let transport = HttpTransport::<TodoItem>::new(&config(&url)).unwrap();

        let error = transport
            .push(&[PendingOperation::new(
                OperationKind::Insert,
                item("A", "foo", None),
                1,
            )])
            .await
            .unwrap_err();

        assert!(matches!(error, TransportError::Http(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn outage_during_push_keeps_insert_queued() {
        let (url, server) = canned_server(vec![(503, "")]).await;
        let queue = Arc::new(MemoryQueue::new());
        queue
            .enqueue(OperationKind::Insert, item("A", "foo", None))
            .unwrap();
        let sync = SyncOrchestrator::new(
            SyncSession::new(
                HttpTransport::<TodoItem>::new(&config(&url)).unwrap(),
                Arc::clone(&queue),
            ),
            FixedAnswerGateway::server_wins(),
            TracingReporter,
        );

        let error = sync.push().await.unwrap_err();

        assert!(matches!(
            error,
            crate::Error::Transport(TransportError::Status { status: 503, .. })
        ));
        let pending = queue.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, OperationKind::Insert);
        assert!(queue.conflicts().is_empty());
        server.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_asks_for_tombstones_and_filter() {
        let (url, server) = canned_server(vec![(
            200,
            r#"[{"id":"A","text":"foo","version":"v1"},{"id":"B","text":"","version":"v2","deleted":true}]"#,
        )])
        .await;
        let transport = HttpTransport::<TodoItem>::new(&config(&url)).unwrap();

        let records = transport
            .pull(&PullQuery::filtered("complete eq false"))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], item("A", "foo", Some("v1")));
        assert!(records[1].deleted);

        let requests = server.await.unwrap();
        let request_line = requests[0].lines().next().unwrap().to_string();
        assert!(request_line.starts_with("GET /tables/todoitem?"));
        assert!(request_line.contains("__includeDeleted=true"));
        assert!(request_line.contains("filter=complete+eq+false"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pull_error_status_is_returned() {
        let (url, server) = canned_server(vec![(500, "boom")]).await;
        let transport = HttpTransport::<TodoItem>::new(&config(&url)).unwrap();

        let error = transport.pull(&PullQuery::all()).await.unwrap_err();

        assert!(matches!(error, TransportError::Status { status: 500, .. }));
        server.await.unwrap();
    }

    #[test]
    fn normalize_status_maps_conflict_codes() {
        assert_eq!(normalize_status(StatusCode::NOT_FOUND), PushStatus::NotFound);
        assert_eq!(normalize_status(StatusCode::CONFLICT), PushStatus::VersionConflict);
        assert_eq!(
            normalize_status(StatusCode::PRECONDITION_FAILED),
            PushStatus::PreconditionFailed
        );
        assert_eq!(
            normalize_status(StatusCode::SERVICE_UNAVAILABLE),
            PushStatus::TransportError(Some(503))
        );
    }

    #[test]
    fn table_url_is_built_from_config() {
        let transport =
            HttpTransport::<TodoItem>::new(&config("https://todo.example.com/")).unwrap();
        assert_eq!(
            transport.table_url(),
            "https://todo.example.com/tables/todoitem"
        );
    }

    #[test]
    fn new_rejects_missing_remote() {
        assert!(HttpTransport::<TodoItem>::new(&SyncConfig::default()).is_err());
    }

    #[test]
    fn request_body_strips_version_and_tombstone() {
        let item = TodoItem {
            id: ItemId::from("A"),
            text: "foo".into(),
            complete: true,
            version: Some("v2".into()),
            deleted: false,
        };
        let body = HttpTransport::<TodoItem>::request_body(&item).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"id": "A", "text": "foo", "complete": true})
        );
    }

    /// Run with: TANDEM_REMOTE_URL=... cargo test pull_from_remote -- --ignored
    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "Requires TANDEM_REMOTE_URL"]
    async fn pull_from_remote() {
        let url = env::var("TANDEM_REMOTE_URL").expect("TANDEM_REMOTE_URL must be set");
        let transport = HttpTransport::<TodoItem>::new(&config(&url)).unwrap();
        transport.pull(&PullQuery::all()).await.expect("pull should succeed");
    }
}
