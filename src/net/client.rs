//! Authenticated HTTP client for the support backend.
//!
//! ARCHITECTURE
//! ============
//! One `ApiClient` per logical session. The bearer token is read from the
//! session store once, at construction, and baked into the client's default
//! headers; a fresh login needs a fresh client.
//!
//! A 401 on any session-bound call clears the store and emits
//! [`SessionEvent::Invalidated`]. Clones share a latch so that a burst of
//! concurrent 401s tears the session down exactly once. A client only tears
//! down the session it was built from: once a newer login has replaced the
//! token, its 401s are reported and nothing else. The failing call still
//! returns [`ApiError::Unauthorized`].
//!
//! TRADE-OFFS
//! ==========
//! No retries and no token refresh. A timeout or dropped connection is
//! reported once to the caller.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::download::{Download, FileKind};
use super::error::{ApiError, error_body_message};
use crate::config::ClientConfig;
use crate::session::{SessionEvent, SessionEvents, SessionStore};

/// What a 401 means for a given call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OnUnauthorized {
    /// The token was rejected: tear the session down.
    Teardown,
    /// Credentials were rejected (login): report it like any other error.
    Report,
}

/// An API path as literal segments; each segment is percent-encoded on use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    segments: Vec<String>,
}

impl Endpoint {
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
        }
    }

    /// Append one raw segment (a student code, a track name).
    #[must_use]
    pub fn push(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    fn url(&self, base_url: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(base_url).map_err(|e| ApiError::Transport(format!("bad base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport("base URL cannot carry a path".to_owned()))?
            .pop_if_empty()
            .extend(&self.segments);
        Ok(url)
    }
}

impl From<&str> for Endpoint {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for Endpoint {
    fn from(path: String) -> Self {
        Self::new(&path)
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    session: Arc<dyn SessionStore>,
    events: SessionEvents,
    /// Token read at construction; teardown only clears this one.
    bound_token: Option<String>,
    has_token: bool,
    torn_down: Arc<AtomicBool>,
}

impl ApiClient {
    /// Build a client bound to the session's current token.
    ///
    /// A missing token is fine: requests go out without `Authorization` and
    /// the backend decides.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, session: Arc<dyn SessionStore>, events: SessionEvents) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut has_token = false;
        let bound_token = session.token();
        if let Some(token) = &bound_token {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                    has_token = true;
                }
                Err(_) => tracing::warn!("stored token is not a valid header value; sending requests without it"),
            }
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("http client build failed: {e}")))?;

        Ok(Self {
            http,
            config: Arc::new(config),
            session,
            events,
            bound_token,
            has_token,
            torn_down: Arc::new(AtomicBool::new(false)),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    #[must_use]
    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    /// Whether this client sends an `Authorization` header.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.has_token
    }

    /// Same configuration, re-reading the token from the store.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn renewed(&self) -> Result<Self, ApiError> {
        Self::new((*self.config).clone(), Arc::clone(&self.session), self.events.clone())
    }

    // =========================================================================
    // JSON CALLS
    // =========================================================================

    /// `GET` and decode JSON.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; a 401 also tears the session down.
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: impl Into<Endpoint>) -> Result<T, ApiError> {
        let response = self.execute(Method::GET, &endpoint.into(), |req| req, OnUnauthorized::Teardown).await?;
        decode_json(response).await
    }

    /// `GET` with query parameters and decode JSON.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; a 401 also tears the session down.
    pub async fn get_json_with_query<T, Q>(&self, endpoint: impl Into<Endpoint>, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self
            .execute(Method::GET, &endpoint.into(), |req| req.query(query), OnUnauthorized::Teardown)
            .await?;
        decode_json(response).await
    }

    /// `POST` a JSON body and decode JSON.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; a 401 also tears the session down.
    pub async fn post_json<T, B>(&self, endpoint: impl Into<Endpoint>, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::POST, endpoint.into(), body, OnUnauthorized::Teardown).await
    }

    /// `POST` a JSON body where a 401 means "bad credentials", not "session
    /// expired". Used by login only.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; 401 surfaces as [`ApiError::Application`].
    pub(crate) async fn post_json_public<T, B>(&self, endpoint: impl Into<Endpoint>, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::POST, endpoint.into(), body, OnUnauthorized::Report).await
    }

    /// `PUT` a JSON body and decode JSON.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; a 401 also tears the session down.
    pub async fn put_json<T, B>(&self, endpoint: impl Into<Endpoint>, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::PUT, endpoint.into(), body, OnUnauthorized::Teardown).await
    }

    /// `DELETE` and decode JSON.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; a 401 also tears the session down.
    pub async fn delete_json<T: DeserializeOwned>(&self, endpoint: impl Into<Endpoint>) -> Result<T, ApiError> {
        let response = self.execute(Method::DELETE, &endpoint.into(), |req| req, OnUnauthorized::Teardown).await?;
        decode_json(response).await
    }

    // =========================================================================
    // DOWNLOADS
    // =========================================================================

    /// `GET` an opaque file. The filename comes from `Content-Disposition`
    /// when present, otherwise `<stem>_<timestamp>.<ext>`.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`]; a 401 also tears the session down.
    pub async fn download(&self, endpoint: impl Into<Endpoint>, stem: &str, kind: FileKind) -> Result<Download, ApiError> {
        let response = self.execute(Method::GET, &endpoint.into(), |req| req, OnUnauthorized::Teardown).await?;
        let headers = response.headers();
        let disposition = headers.get(CONTENT_DISPOSITION).and_then(|v| v.to_str().ok()).map(ToOwned::to_owned);
        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(ToOwned::to_owned);
        let bytes = response.bytes().await?.to_vec();
        Ok(Download::from_response(disposition.as_deref(), content_type, bytes, stem, kind))
    }

    // =========================================================================
    // PLUMBING
    // =========================================================================

    async fn send_json<T, B>(&self, method: Method, endpoint: Endpoint, body: &B, policy: OnUnauthorized) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.execute(method, &endpoint, |req| req.json(body), policy).await?;
        decode_json(response).await
    }

    async fn execute<F>(&self, method: Method, endpoint: &Endpoint, build: F, policy: OnUnauthorized) -> Result<Response, ApiError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let url = endpoint.url(&self.config.base_url)?;
        let path = endpoint.path();
        tracing::debug!(%method, %path, authenticated = self.has_token, "api request");

        let response = build(self.http.request(method.clone(), url)).send().await.map_err(|e| {
            let err = ApiError::from(e);
            tracing::debug!(%method, %path, error = %err, "api request failed");
            err
        })?;

        let status = response.status();
        tracing::debug!(%method, %path, status = status.as_u16(), "api response");

        if status == StatusCode::UNAUTHORIZED && policy == OnUnauthorized::Teardown {
            self.tear_down_session(&path);
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(ApiError::Application { status: status.as_u16(), message: error_body_message(&body) });
        }
        Ok(response)
    }

    fn tear_down_session(&self, path: &str) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        if !self.session.clear_if_token(self.bound_token.as_deref()) {
            tracing::debug!(%path, "stale token rejected; session already replaced");
            return;
        }
        tracing::warn!(%path, "token rejected by server; clearing session");
        self.events.emit(SessionEvent::Invalidated { path: path.to_owned() });
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

// =============================================================================
// TEST HELPERS
// =============================================================================
