//! HTTP client implementation.
//!
//! Provides the main HTTP client for interacting with the Gavel REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use super::config::ClientConfig;
use super::error::ClientError;
use crate::auth::SharedCredentials;
use crate::store::AuctionSource;
use crate::types::account::LoginResponse;
use crate::types::{
    AuctionId, AuctionResource, AuctionSnapshot, AuctionSummary, AuthSession, BidRequest,
    LoginRequest, RegisterRequest,
};

/// Message shown when a bid is rejected without details.
pub const BID_REJECTED_MESSAGE: &str = "Error processing bid.";

/// Message shown when login fails.
pub const LOGIN_FAILED_MESSAGE: &str = "Email or password incorrect.";

/// Message shown when registration fails without details.
pub const REGISTER_FAILED_MESSAGE: &str = "Error creating account. Please check your details.";

/// Problem details body returned on rejected requests.
#[derive(Debug, Default, Deserialize)]
struct ProblemDetails {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl ProblemDetails {
    fn message(self) -> Option<String> {
        self.detail
            .filter(|d| !d.trim().is_empty())
            .or(self.title.filter(|t| !t.trim().is_empty()))
    }
}

/// Auction listing response.
#[derive(Debug, Deserialize)]
struct AuctionsResponse {
    items: Vec<AuctionSummary>,
}

/// HTTP client for the Gavel REST API.
#[derive(Debug, Clone)]
pub struct GavelClient {
    config: ClientConfig,
    http: reqwest::Client,
    credentials: Option<SharedCredentials>,
}

impl GavelClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .user_agent(&config.user_agent)
            .build()
            .map_err(ClientError::Request)?;

        Ok(Self {
            config,
            http,
            credentials: None,
        })
    }

    /// Creates a new client with the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::new(ClientConfig::new(base_url))
    }

    /// Attaches a credential provider used for bearer authentication.
    #[must_use]
    pub fn with_credentials(mut self, credentials: SharedCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.as_ref().and_then(|c| c.access_token()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends a request, retrying rate limits and timeouts up to
    /// `max_retries` times.
    ///
    /// Any other response, successful or not, is returned to the caller.
    async fn send_with_retry<F>(&self, request_fn: F) -> Result<reqwest::Response, ClientError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut retry_count = 0;

        loop {
            match self.authorize(request_fn()).send().await {
                Ok(resp) => {
                    if resp.status() != StatusCode::TOO_MANY_REQUESTS {
                        return Ok(resp);
                    }

                    let retry_after = resp
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse().ok());

                    if retry_count >= self.config.max_retries {
                        return Err(ClientError::RateLimited { retry_after });
                    }

                    retry_count += 1;
                    let wait_time = retry_after.unwrap_or(1);
                    warn!(retry_count, wait_time, "rate limited, backing off");
                    tokio::time::sleep(Duration::from_secs(wait_time)).await;
                }
                Err(e) => {
                    if e.is_timeout() && retry_count < self.config.max_retries {
                        retry_count += 1;
                        tokio::time::sleep(timeout_backoff(retry_count)).await;
                        continue;
                    }
                    return Err(ClientError::from(e));
                }
            }
        }
    }

    /// Reads a successful JSON body.
    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        let body = resp
            .text()
            .await
            .map_err(|e| ClientError::Deserialization(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| ClientError::Deserialization(e.to_string()))
    }

    /// Maps a non-success response to an error.
    ///
    /// Client-side rejections (400, 409, 422) carry a user-facing message:
    /// the problem `detail`, else its `title`, else `fallback`.
    async fn error_for(resp: reqwest::Response, resource: &str, fallback: &str) -> ClientError {
        let status = resp.status();

        if status == StatusCode::NOT_FOUND {
            return ClientError::NotFound(resource.to_string());
        }

        if status == StatusCode::UNAUTHORIZED {
            return ClientError::Unauthorized;
        }

        let body = resp.text().await.unwrap_or_default();

        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            let message = serde_json::from_str::<ProblemDetails>(&body)
                .ok()
                .and_then(ProblemDetails::message)
                .unwrap_or_else(|| fallback.to_string());
            return ClientError::Validation(message);
        }

        let message = serde_json::from_str::<ProblemDetails>(&body)
            .ok()
            .and_then(ProblemDetails::message)
            .unwrap_or(body);

        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }

    /// Gets all listed auctions.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_auctions(&self) -> Result<Vec<AuctionSummary>, ClientError> {
        let url = self.config.endpoint("AuctionItem");
        let resp = self.send_with_retry(|| self.http.get(&url)).await?;

        if !resp.status().is_success() {
            return Err(Self::error_for(resp, "auction list", "").await);
        }

        let response: AuctionsResponse = Self::read_json(resp).await?;
        debug!(count = response.items.len(), "auctions listed");
        Ok(response.items)
    }

    /// Gets one auction.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the auction does not exist, or
    /// another error if the request fails or the body is malformed.
    pub async fn get_auction(&self, id: &AuctionId) -> Result<AuctionSnapshot, ClientError> {
        let url = self.config.endpoint(&format!("AuctionItem/{}", id));
        let resp = self.send_with_retry(|| self.http.get(&url)).await?;

        if !resp.status().is_success() {
            return Err(Self::error_for(resp, &format!("auction {}", id), "").await);
        }

        let resource: AuctionResource = Self::read_json(resp).await?;
        Ok(resource.into_snapshot(id))
    }

    /// Submits a bid.
    ///
    /// A successful submission does not change any local snapshot; the new
    /// price arrives through the live channel.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` with the backend's message if the
    /// bid is rejected.
    pub async fn place_bid(&self, bid: &BidRequest) -> Result<(), ClientError> {
        let url = self.config.endpoint("Bid");
        let resp = self
            .send_with_retry(|| self.http.post(&url).json(bid))
            .await?;

        if !resp.status().is_success() {
            return Err(Self::error_for(
                resp,
                &format!("auction {}", bid.auction_item_id),
                BID_REJECTED_MESSAGE,
            )
            .await);
        }

        debug!(auction = %bid.auction_item_id, amount = %bid.amount, "bid accepted");
        Ok(())
    }

    /// Logs in and returns the session.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if the credentials are rejected.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthSession, ClientError> {
        let url = self.config.endpoint("auth/login-user");
        let resp = self
            .send_with_retry(|| self.http.post(&url).json(request))
            .await?;

        let status = resp.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND
        ) {
            return Err(ClientError::Validation(LOGIN_FAILED_MESSAGE.to_string()));
        }
        if !status.is_success() {
            return Err(Self::error_for(resp, "login", LOGIN_FAILED_MESSAGE).await);
        }

        let response: LoginResponse = Self::read_json(resp).await?;
        Ok(response.into_session())
    }

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if the request fails local checks or
    /// is rejected by the backend.
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ClientError> {
        request.validate().map_err(ClientError::Validation)?;

        let url = self.config.endpoint("Auth");
        let resp = self
            .send_with_retry(|| self.http.post(&url).json(request))
            .await?;

        if !resp.status().is_success() {
            return Err(Self::error_for(resp, "account", REGISTER_FAILED_MESSAGE).await);
        }

        Ok(())
    }
}

/// Delay before retrying a timed out request: 200 ms doubling per attempt,
/// capped at 102.4 s.
fn timeout_backoff(retry_count: u32) -> Duration {
    Duration::from_millis(100u64 << retry_count.min(10))
}

#[async_trait]
impl AuctionSource for GavelClient {
    async fn fetch_auction(&self, id: &AuctionId) -> Result<AuctionSnapshot, ClientError> {
        self.get_auction(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::types::Amount;
    use axum::extract::Path;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::Arc;

    async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{}/api", addr)
    }

    fn backend() -> Router {
        Router::new()
            .route(
                "/api/AuctionItem",
                get(|| async {
                    Json(json!({"items": [
                        {"id": 1, "name": "Clock", "currentPrice": 100},
                        {"id": 2, "name": "Lamp", "currentPrice": 12.5, "status": 2}
                    ]}))
                }),
            )
            .route(
                "/api/AuctionItem/{id}",
                get(|Path(id): Path<String>| async move {
                    match id.as_str() {
                        "1" => (
                            AxumStatus::OK,
                            Json(json!({
                                "id": 1,
                                "name": "Clock",
                                "description": "Brass",
                                "currentPrice": 100,
                                "endTime": "2030-01-01T00:00:00Z",
                                "status": 1
                            })),
                        ),
                        "broken" => (AxumStatus::OK, Json(json!({"name": "no price"}))),
                        "error" => (AxumStatus::INTERNAL_SERVER_ERROR, Json(json!({}))),
                        _ => (AxumStatus::NOT_FOUND, Json(json!({}))),
                    }
                }),
            )
            .route(
                "/api/Bid",
                post(|headers: AxumHeaders, Json(body): Json<Value>| async move {
                    if headers.get("authorization").is_none() {
                        return (AxumStatus::UNAUTHORIZED, Json(json!({})));
                    }
                    if body["amount"].as_f64().unwrap_or_default() <= 100.0 {
                        return (
                            AxumStatus::BAD_REQUEST,
                            Json(json!({"title": "Bad Request", "detail": "Bid must exceed the current price."})),
                        );
                    }
                    (AxumStatus::OK, Json(json!({"id": 99})))
                }),
            )
            .route(
                "/api/auth/login-user",
                post(|Json(body): Json<Value>| async move {
                    if body["password"] == "secret1" {
                        (AxumStatus::OK, Json(json!({"token": "tok", "firstName": "Ana"})))
                    } else {
                        (AxumStatus::UNAUTHORIZED, Json(json!({})))
                    }
                }),
            )
            .route(
                "/api/Auth",
                post(|Json(body): Json<Value>| async move {
                    if body["email"] == "taken@example.com" {
                        (AxumStatus::CONFLICT, Json(json!({"title": "Email already registered"})))
                    } else {
                        (AxumStatus::CREATED, Json(json!({})))
                    }
                }),
            )
    }

    fn id(value: &str) -> AuctionId {
        AuctionId::new(value).expect("id")
    }

    #[test]
    fn test_timeout_backoff_is_capped() {
        assert_eq!(timeout_backoff(1), Duration::from_millis(200));
        assert_eq!(timeout_backoff(3), Duration::from_millis(800));
        assert_eq!(timeout_backoff(10), Duration::from_millis(102_400));
        assert_eq!(timeout_backoff(64), timeout_backoff(10));
        assert_eq!(timeout_backoff(u32::MAX), timeout_backoff(10));
    }

    #[test]
    fn test_client_new() {
        let client = GavelClient::new(ClientConfig::new("https://api.example.com"));
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_invalid_config() {
        let client = GavelClient::new(ClientConfig::new(""));
        assert!(client.is_err());
    }

    #[test]
    fn test_client_config_access() {
        let client = GavelClient::with_base_url("https://api.example.com").expect("client");
        assert_eq!(client.config().base_url, "https://api.example.com");
    }

    #[tokio::test]
    async fn test_list_auctions() {
        let base = spawn_backend(backend()).await;
        let client = GavelClient::with_base_url(base).expect("client");

        let auctions = client.list_auctions().await.expect("list");
        assert_eq!(auctions.len(), 2);
        assert_eq!(auctions[0].name, "Clock");
        assert!(auctions[1].status().is_ended());
    }

    #[tokio::test]
    async fn test_get_auction() {
        let base = spawn_backend(backend()).await;
        let client = GavelClient::with_base_url(base).expect("client");

        let snapshot = client.get_auction(&id("1")).await.expect("auction");
        assert_eq!(snapshot.name, "Clock");
        assert_eq!(snapshot.current_price, Amount::from(100));
    }

    #[tokio::test]
    async fn test_get_auction_errors() {
        let base = spawn_backend(backend()).await;
        let client = GavelClient::with_base_url(base).expect("client");

        let err = client.get_auction(&id("404")).await.expect_err("missing");
        assert!(matches!(err, ClientError::NotFound(_)));

        let err = client.get_auction(&id("broken")).await.expect_err("malformed");
        assert!(matches!(err, ClientError::Deserialization(_)));
        assert!(err.is_transport());

        let err = client.get_auction(&id("error")).await.expect_err("server error");
        assert!(matches!(err, ClientError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_place_bid_surfaces_detail() {
        let base = spawn_backend(backend()).await;
        let client = GavelClient::with_base_url(base)
            .expect("client")
            .with_credentials(Arc::new(StaticToken::new("tok")));

        let low = BidRequest {
            auction_item_id: id("1"),
            amount: Amount::from(90),
            bidder_name: Some("Ana".to_string()),
        };
        let err = client.place_bid(&low).await.expect_err("rejected");
        assert_eq!(err.to_string(), "Bid must exceed the current price.");

        let high = BidRequest {
            amount: Amount::from(150),
            ..low
        };
        assert!(client.place_bid(&high).await.is_ok());
    }

    #[tokio::test]
    async fn test_place_bid_requires_credentials() {
        let base = spawn_backend(backend()).await;
        let client = GavelClient::with_base_url(base).expect("client");

        let bid = BidRequest {
            auction_item_id: id("1"),
            amount: Amount::from(150),
            bidder_name: None,
        };
        let err = client.place_bid(&bid).await.expect_err("unauthorized");
        assert!(matches!(err, ClientError::Unauthorized));
    }

    #[tokio::test]
    async fn test_login() {
        let base = spawn_backend(backend()).await;
        let client = GavelClient::with_base_url(base).expect("client");

        let session = client
            .login(&LoginRequest {
                email: "ana@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .expect("login");
        assert_eq!(session.token, "tok");
        assert_eq!(session.display_name.as_deref(), Some("Ana"));

        let err = client
            .login(&LoginRequest {
                email: "ana@example.com".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .expect_err("bad password");
        assert_eq!(err.to_string(), LOGIN_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_register() {
        let base = spawn_backend(backend()).await;
        let client = GavelClient::with_base_url(base).expect("client");

        let mut request = RegisterRequest {
            first_name: "Ana".to_string(),
            last_name: "Lima".to_string(),
            email: "ana@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        };
        assert!(client.register(&request).await.is_ok());

        request.email = "taken@example.com".to_string();
        let err = client.register(&request).await.expect_err("conflict");
        assert_eq!(err.to_string(), "Email already registered");

        request.confirm_password = "other".to_string();
        let err = client.register(&request).await.expect_err("mismatch");
        assert_eq!(err.to_string(), "Passwords do not match.");
    }
}
