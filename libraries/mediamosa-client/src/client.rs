//! Main MediaMosa client.

use crate::auth::Authenticator;
use crate::config::MediaMosaConfig;
use crate::error::{MediaMosaError, Result};
use crate::response::{RequestResult, ResultCode};
use crate::session::Session;
use crate::transport::{HttpMethod, HttpRequest, ReqwestTransport, Transport};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Client for a MediaMosa back-end.
///
/// Holds one session per instance. Calls are made with the current session
/// cookie; when the server answers "authentication required" the client logs
/// in again and retries the call once.
///
/// # Example
///
/// ```ignore
/// use mediamosa_client::{MediaMosaClient, MediaMosaConfig};
///
/// let client = MediaMosaClient::new(MediaMosaConfig::new("mediamosa.local", "app", "secret"))?;
///
/// let asset_id = client.create_asset().await?;
/// let mediafile_id = client.create_mediafile(&asset_id).await?;
/// let upload_url = client.create_upload_ticket(&mediafile_id).await?;
/// ```
#[derive(Clone)]
pub struct MediaMosaClient {
    transport: Arc<dyn Transport>,
    config: Arc<MediaMosaConfig>,
    session: Arc<Session>,
}

impl MediaMosaClient {
    /// Create a client talking HTTP to the configured host.
    pub fn new(config: MediaMosaConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client on top of a custom transport.
    pub fn with_transport(config: MediaMosaConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        debug!(base_url = %config.base_url(), user = %config.user, "Creating MediaMosa client");

        Ok(Self {
            transport,
            config: Arc::new(config),
            session: Arc::new(Session::new()),
        })
    }

    /// Login user of this client.
    pub fn user(&self) -> &str {
        &self.config.user
    }

    pub fn base_url(&self) -> String {
        self.config.base_url()
    }

    /// Current session cookie, empty when not logged in.
    pub async fn cookie(&self) -> String {
        self.session.cookie().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }

    /// Run the login handshake now instead of waiting for the server to ask.
    pub async fn login(&self) -> Result<()> {
        let stale = self.session.cookie().await;
        self.reauthenticate(&stale).await.map(|_| ())
    }

    /// Forget the session cookie.
    pub async fn logout(&self) {
        self.session.clear().await;
        info!("Logged out");
    }

    /// Issue a GET. The caller builds the full path including query.
    pub async fn get(&self, path: &str) -> Result<RequestResult> {
        self.dispatch(HttpMethod::Get, path, None).await
    }

    /// Issue a POST with a form-encoded body.
    pub async fn post(&self, path: &str, body: &str) -> Result<RequestResult> {
        self.dispatch(HttpMethod::Post, path, Some(body)).await
    }

    /// Execute one API call, re-authenticating and retrying once on `1601`.
    pub async fn dispatch(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&str>,
    ) -> Result<RequestResult> {
        if path.is_empty() {
            return Err(MediaMosaError::InvalidRequest("path cannot be empty".into()));
        }

        let cookie = self.session.cookie().await;
        let result = self.send(method, path, body, &cookie).await?;

        match result.code {
            ResultCode::Ok => Ok(result),
            ResultCode::AuthRequired => {
                warn!(method = %method, path = %path, "Session expired, logging in again");

                let cookie = self.reauthenticate(&cookie).await?;

                // One retry only; a second 1601 is reported as an API error.
                self.send(method, path, body, &cookie)
                    .await?
                    .into_api_result()
                    .map_err(|e| {
                        warn!(method = %method, path = %path, error = %e, "Retry after login failed");
                        e
                    })
            }
            ResultCode::Other(_) => {
                warn!(
                    method = %method,
                    path = %path,
                    code = %result.code_str(),
                    description = %result.description,
                    "MediaMosa call failed"
                );
                result.into_api_result()
            }
        }
    }

    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&str>,
        cookie: &str,
    ) -> Result<RequestResult> {
        let mut request = HttpRequest::new(method, path);
        if let Some(body) = body {
            debug!(method = %method, path = %path, body = %body, "MediaMosa request");
            request = request.with_form_body(body);
        } else {
            debug!(method = %method, path = %path, "MediaMosa request");
        }
        let request = request.with_cookie(cookie);

        let response = self.transport.send(request).await?;
        RequestResult::parse(&response.body)
    }

    /// Log in unless another caller already replaced `stale`; returns the
    /// cookie to use from now on.
    async fn reauthenticate(&self, stale: &str) -> Result<String> {
        let guard = match self.session.begin_login(stale).await {
            Ok(guard) => guard,
            Err(renewed) => {
                debug!("Session renewed by a concurrent login");
                return Ok(renewed);
            }
        };

        let authenticator = Authenticator::new(
            self.transport.as_ref(),
            &self.config.user,
            &self.config.password,
        );

        match authenticator.login().await {
            Ok(cookie) => {
                guard.commit(cookie.clone()).await;
                Ok(cookie)
            }
            Err(e) => {
                guard.fail().await;
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for MediaMosaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaMosaClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transport::{HttpResponse, MockTransport};
    use mockall::Sequence;

    pub(crate) fn xml(code: &str, description: &str, item: &str) -> String {
        format!(
            "<response><header>\
             <request_result_id>{}</request_result_id>\
             <request_result_description>{}</request_result_description>\
             </header><items><item id=\"1\">{}</item></items></response>",
            code, description, item
        )
    }

    pub(crate) fn ok(body: String) -> Result<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body,
        })
    }

    fn is_login(req: &HttpRequest) -> bool {
        req.path == crate::auth::LOGIN_PATH
    }

    /// Expect one successful handshake issuing `cookie`.
    pub(crate) fn expect_login(transport: &mut MockTransport, seq: &mut Sequence, cookie: &'static str) {
        transport
            .expect_send()
            .times(1)
            .in_sequence(seq)
            .withf(|req| is_login(req) && req.body.as_deref().unwrap_or_default().contains("AUTH"))
            .returning(move |_| {
                Ok(HttpResponse {
                    status: 200,
                    headers: vec![("Set-Cookie".to_string(), format!("{}; path=/", cookie))],
                    body: xml("601", "", "<dbus>DATA vpx 0 challenge</dbus>"),
                })
            });
        transport
            .expect_send()
            .times(1)
            .in_sequence(seq)
            .withf(|req| is_login(req) && req.body.as_deref().unwrap_or_default().contains("DATA"))
            .returning(|_| ok(xml("601", "", "<dbus>OK server_guid</dbus>")));
    }

    pub(crate) fn client(transport: MockTransport) -> MediaMosaClient {
        MediaMosaClient::with_transport(
            MediaMosaConfig::new("mediamosa.local", "app", "secret"),
            Arc::new(transport),
        )
        .unwrap()
    }

    #[test]
    fn test_constructor_requires_credentials() {
        for (host, user, password) in [("", "app", "secret"), ("h", "", "secret"), ("h", "app", "")] {
            let result = MediaMosaClient::new(MediaMosaConfig::new(host, user, password));
            assert!(matches!(result, Err(MediaMosaError::InvalidConfiguration(_))));
        }
    }

    #[tokio::test]
    async fn test_new_client_has_empty_cookie() {
        let client = MediaMosaClient::new(MediaMosaConfig::new("h", "app", "secret")).unwrap();
        assert_eq!(client.cookie().await, "");
        assert!(!client.is_authenticated().await);
        assert_eq!(client.user(), "app");
    }

    #[tokio::test]
    async fn test_empty_path_makes_no_call() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();

        let err = client(transport).get("").await.unwrap_err();
        assert!(matches!(err, MediaMosaError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_auth_required_then_retry_succeeds() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();

        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|req| req.path == "/asset/1" && req.header("Cookie").is_none())
            .returning(|_| ok(xml("1601", "Authentication required", "")));
        expect_login(&mut transport, &mut seq, "SESS=new");
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|req| req.path == "/asset/1" && req.header("Cookie") == Some("SESS=new"))
            .returning(|_| ok(xml("601", "", "<asset_id>1</asset_id>")));

        let client = client(transport);
        let result = client.get("/asset/1").await.unwrap();

        assert_eq!(result.first_field("asset_id").unwrap(), "1");
        assert_eq!(client.cookie().await, "SESS=new");
    }

    #[tokio::test]
    async fn test_second_auth_required_is_not_retried() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();

        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ok(xml("1601", "", "")));
        expect_login(&mut transport, &mut seq, "SESS=new");
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ok(xml("1601", "still not allowed", "")));

        let err = client(transport).get("/asset/1").await.unwrap_err();
        match err {
            MediaMosaError::Api { code, description } => {
                assert_eq!(code, "1601");
                assert_eq!(description, "still not allowed");
            }
            e => panic!("Expected Api error, got: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_failed_login_skips_retry_and_clears_cookie() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();

        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ok(xml("1601", "", "")));
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .withf(is_login)
            .returning(|_| ok(xml("1800", "Invalid credentials", "")));

        let client = client(transport);
        client.session.set("SESS=old").await;

        let err = client.post("/asset/create", "user_id=app").await.unwrap_err();
        assert!(matches!(err, MediaMosaError::AuthenticationFailed(_)));
        assert_eq!(client.cookie().await, "");
    }

    #[tokio::test]
    async fn test_other_status_fails_without_retry() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| ok(xml("500", "Internal error", "")));

        let err = client(transport).get("/asset/1").await.unwrap_err();
        match err {
            MediaMosaError::Api { code, description } => {
                assert_eq!(code, "500");
                assert_eq!(description, "Internal error");
            }
            e => panic!("Expected Api error, got: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_transport_and_empty_errors_pass_through() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(MediaMosaError::transport("timed out")));
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ok(String::new()));

        let client = client(transport);
        assert!(matches!(
            client.get("/asset/1").await,
            Err(MediaMosaError::Transport(_))
        ));
        assert!(matches!(
            client.get("/asset/1").await,
            Err(MediaMosaError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_valid_cookie_means_one_call_per_request() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(2)
            .withf(|req| req.header("Cookie") == Some("SESS=valid") && !is_login(req))
            .returning(|_| ok(xml("601", "", "<asset_id>1</asset_id>")));

        let client = client(transport);
        client.session.set("SESS=valid").await;

        client.get("/asset/1").await.unwrap();
        client.get("/asset/1").await.unwrap();
    }

    #[tokio::test]
    async fn test_post_sends_form_body() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|req| {
                req.method == HttpMethod::Post
                    && req.body.as_deref() == Some("user_id=app")
                    && req.header("Content-Type") == Some(crate::transport::FORM_CONTENT_TYPE)
            })
            .returning(|_| ok(xml("601", "", "")));

        client(transport).post("/asset/create", "user_id=app").await.unwrap();
    }

    #[tokio::test]
    async fn test_explicit_login_and_logout() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        expect_login(&mut transport, &mut seq, "SESS=explicit");

        let client = client(transport);
        client.login().await.unwrap();
        assert_eq!(client.cookie().await, "SESS=explicit");

        client.logout().await;
        assert!(!client.is_authenticated().await);
    }

    /// Holds unauthenticated API calls until both of them are in flight.
    struct BarrierTransport {
        inner: MockTransport,
        barrier: tokio::sync::Barrier,
    }

    #[async_trait::async_trait]
    impl Transport for BarrierTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            if !is_login(&request) && request.header("Cookie").is_none() {
                self.barrier.wait().await;
            }
            self.inner.send(request).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_auth_required_runs_one_login() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| !is_login(req) && req.header("Cookie").is_none())
            .times(2)
            .returning(|_| ok(xml("1601", "", "")));
        transport
            .expect_send()
            .withf(|req| is_login(req) && req.body.as_deref().unwrap_or_default().contains("AUTH"))
            .times(1)
            .returning(|_| {
                Ok(HttpResponse {
                    status: 200,
                    headers: vec![("Set-Cookie".to_string(), "SESS=shared".to_string())],
                    body: xml("601", "", "<dbus>DATA vpx 0 challenge</dbus>"),
                })
            });
        transport
            .expect_send()
            .withf(|req| is_login(req) && req.body.as_deref().unwrap_or_default().contains("DATA"))
            .times(1)
            .returning(|_| ok(xml("601", "", "<dbus>OK server_guid</dbus>")));
        transport
            .expect_send()
            .withf(|req| !is_login(req) && req.header("Cookie") == Some("SESS=shared"))
            .times(2)
            .returning(|_| ok(xml("601", "", "<asset_id>1</asset_id>")));

        let client = MediaMosaClient::with_transport(
            MediaMosaConfig::new("mediamosa.local", "app", "secret"),
            Arc::new(BarrierTransport {
                inner: transport,
                barrier: tokio::sync::Barrier::new(2),
            }),
        )
        .unwrap();

        let (a, b) = tokio::join!(client.get("/asset/1"), client.get("/asset/2"));

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(client.cookie().await, "SESS=shared");
    }
}
