//! Typed client for the remote store.
//!
//! Every method maps one endpoint. Non-2xx responses become
//! [`ApiError::Status`] carrying the body text so callers can show it.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::{ApiError, ApiResult};
use super::types::{
    BatchDeleteRequest, ChatRequest, ChatResponse, ClearScope, DeleteResponse, MessagesResponse,
    SessionMessages, SessionsResponse, SummaryResponse,
};
use crate::models::{Session, SessionSummary};

/// Phrase the server requires before it performs a bulk delete.
pub const CONFIRM_PHRASE: &str = "CONFIRM_DELETE";

/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    /// Create a client for `base` (e.g. `http://127.0.0.1:8000/api`).
    pub fn new(base: &str, timeout: Duration) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn session_url(&self, session_id: &str, suffix: &str) -> String {
        self.url(&format!(
            "/sessions/{}{suffix}",
            urlencoding::encode(session_id)
        ))
    }

    /// `POST /chat`: send one user turn and return the assistant reply.
    pub async fn chat(&self, message: &str, session_id: &str) -> ApiResult<String> {
        let body = ChatRequest {
            message,
            session_id,
        };
        let resp: ChatResponse = self
            .send_json(self.http.post(self.url("/chat")).json(&body))
            .await?;

        if let Some(stored) = resp.session_id.as_deref() {
            if stored != session_id {
                warn!(sent = session_id, stored, "server stored the turn under another session");
            }
        }
        Ok(resp.reply)
    }

    /// `GET /sessions`.
    pub async fn list_sessions(&self) -> ApiResult<Vec<Session>> {
        let resp: SessionsResponse = self.send_json(self.http.get(self.url("/sessions"))).await?;
        Ok(resp.sessions)
    }

    /// `GET /sessions/{id}/messages`.
    pub async fn session_messages(&self, session_id: &str) -> ApiResult<SessionMessages> {
        let resp: MessagesResponse = self
            .send_json(self.http.get(self.session_url(session_id, "/messages")))
            .await?;

        if resp.status.as_deref() == Some("error") {
            return Err(ApiError::Server(
                resp.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let count = resp.count.unwrap_or(resp.messages.len());
        Ok(SessionMessages {
            count,
            messages: resp.messages,
        })
    }

    /// `GET /sessions/{id}/summary`.
    pub async fn session_summary(&self, session_id: &str) -> ApiResult<SessionSummary> {
        let resp: SummaryResponse = self
            .send_json(self.http.get(self.session_url(session_id, "/summary")))
            .await?;

        match (resp.summary, resp.error) {
            (Some(summary), _) => Ok(summary),
            (None, Some(err)) => Err(ApiError::Server(err)),
            (None, None) => Err(ApiError::Decode("summary missing from response".to_string())),
        }
    }

    /// `DELETE /sessions/{id}`.
    pub async fn delete_session(&self, session_id: &str) -> ApiResult<DeleteResponse> {
        self.send_delete(self.http.delete(self.session_url(session_id, "")))
            .await
    }

    /// `DELETE /sessions?action=...&confirm=...`.
    ///
    /// A `confirmation` other than [`CONFIRM_PHRASE`] is rejected without
    /// contacting the server.
    pub async fn clear_sessions(
        &self,
        scope: ClearScope,
        confirmation: &str,
    ) -> ApiResult<DeleteResponse> {
        check_confirmation(confirmation)?;

        let mut query = vec![("confirm", confirmation.to_string())];
        match scope {
            ClearScope::All => query.push(("action", "all".to_string())),
            ClearScope::KeepLatest(n) => {
                query.push(("action", "keep_latest".to_string()));
                query.push(("keep_latest", n.to_string()));
            }
        }

        self.send_delete(self.http.delete(self.url("/sessions")).query(&query))
            .await
    }

    /// `DELETE /sessions/batch`, same confirmation rule as [`Self::clear_sessions`].
    pub async fn delete_sessions(
        &self,
        session_ids: &[String],
        confirmation: &str,
    ) -> ApiResult<DeleteResponse> {
        check_confirmation(confirmation)?;

        let body = BatchDeleteRequest {
            session_ids,
            confirm_password: confirmation,
        };
        self.send_delete(self.http.delete(self.url("/sessions/batch")).json(&body))
            .await
    }

    /// `GET /status`: `Ok(())` when the server answers with 2xx.
    pub async fn status(&self) -> ApiResult<()> {
        let resp = self.http.get(self.url("/status")).send().await?;
        check_status(resp).await.map(|_| ())
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> ApiResult<T> {
        let resp = req.send().await?;
        debug!(url = %resp.url(), status = resp.status().as_u16(), "remote store response");
        let resp = check_status(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    /// The delete endpoints report some failures as a 2xx `status: "error"` body.
    async fn send_delete(&self, req: RequestBuilder) -> ApiResult<DeleteResponse> {
        let resp: DeleteResponse = self.send_json(req).await?;
        if resp.status.as_deref() == Some("error") {
            return Err(ApiError::Server(
                resp.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(resp)
    }
}

fn check_confirmation(confirmation: &str) -> ApiResult<()> {
    if confirmation == CONFIRM_PHRASE {
        Ok(())
    } else {
        Err(ApiError::Confirmation)
    }
}

async fn check_status(resp: Response) -> ApiResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "remote store returned an error status");
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&format!("{}/api/", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn chat_posts_message_and_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(json!({"message": "hello", "session_id": "s1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "reply": "hi there",
                "session_id": "s1",
                "status": "success"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server).chat("hello", "s1").await.unwrap();
        assert_eq!(reply, "hi there");
    }

    #[tokio::test]
    async fn error_status_carries_body_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model offline"))
            .mount(&server)
            .await;

        let err = client(&server).chat("hello", "s1").await.unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "model offline");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn session_messages_encodes_id_and_reads_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sessions/a%20b/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "session_id": "a b",
                "count": 2,
                "messages": [
                    {"id": 1, "role": "user", "content": "q", "created_at": "2024-05-01T10:00:00"},
                    {"id": 2, "role": "assistant", "content": "a", "created_at": null}
                ],
                "status": "success"
            })))
            .mount(&server)
            .await;

        let page = client(&server).session_messages("a b").await.unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.messages.len(), 2);
        assert!(page.messages[1].created_at.is_none());
    }

    #[tokio::test]
    async fn session_messages_error_body_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sessions/s1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "session_id": "s1",
                "error": "db locked",
                "status": "error"
            })))
            .mount(&server)
            .await;

        let err = client(&server).session_messages("s1").await.unwrap_err();
        assert!(matches!(err, ApiError::Server(ref m) if m == "db locked"));
    }

    #[tokio::test]
    async fn clear_with_wrong_phrase_never_reaches_server() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let api = client(&server);
        let err = api.clear_sessions(ClearScope::All, "confirm_delete").await.unwrap_err();
        assert!(matches!(err, ApiError::Confirmation));

        let err = api
            .delete_sessions(&["s1".to_string()], "")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Confirmation));
    }

    #[tokio::test]
    async fn clear_keep_latest_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/sessions"))
            .and(query_param("action", "keep_latest"))
            .and(query_param("keep_latest", "3"))
            .and(query_param("confirm", CONFIRM_PHRASE))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "message": "deleted 4 sessions"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client(&server)
            .clear_sessions(ClearScope::KeepLatest(3), CONFIRM_PHRASE)
            .await
            .unwrap();
        assert_eq!(resp.message.as_deref(), Some("deleted 4 sessions"));
    }

    #[tokio::test]
    async fn delete_error_body_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/sessions/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "error",
                "message": "session is locked"
            })))
            .mount(&server)
            .await;

        let err = client(&server).delete_session("s1").await.unwrap_err();
        assert!(matches!(err, ApiError::Server(ref m) if m == "session is locked"));
    }

    #[tokio::test]
    async fn status_reports_unreachable_server_as_transport() {
        let api = ApiClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = api.status().await.unwrap_err();
        assert!(err.is_transport());
    }
}
