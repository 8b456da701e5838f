//! Wallet and Ledger Service Client
//!
//! Typed access to the two upstream HTTP services:
//!
//! | Operation | Request |
//! |---|---|
//! | `fetch_primary_address` | `GET {wallet}/primary_address` |
//! | `list_address_records` | `GET {wallet}/addresses` |
//! | `get_unlocked_balance` | `GET {wallet}/balance/{address}` |
//! | `sweep_address` | `POST {wallet}/sweep_all` |
//! | `delete_address_record` | `DELETE {wallet}/addresses/{id}` |
//! | `credit_user` | `POST {ledger}/balance/{user_id}/increase` |
//!
//! The client never retries. Callers decide whether a failure is worth
//! another attempt.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::common::config::{CreditKind, ServiceKind, SweeperConfig};
use crate::common::logging::{log_event, EventCategory, LogLevel};
use crate::types::{AddressRecord, RecordId};

/// Longest upstream body quoted in an error message
const MAX_ERROR_BODY: usize = 200;

/// Service client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service could not be reached (connect, timeout, dropped body)
    #[error("{service} service unreachable: {source}")]
    Transport {
        service: ServiceKind,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a failure status or an unusable payload
    #[error("{service} service error ({}): {message}", describe_status(.status))]
    Upstream {
        service: ServiceKind,
        status: Option<u16>,
        message: String,
    },
}

impl ClientError {
    pub fn upstream(service: ServiceKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service,
            status,
            message: message.into(),
        }
    }

    /// HTTP status, when the service answered with one
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Upstream { status, .. } => *status,
            ClientError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }

    pub fn service(&self) -> ServiceKind {
        match self {
            ClientError::Transport { service, .. } | ClientError::Upstream { service, .. } => {
                *service
            }
        }
    }
}

fn describe_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {}", code),
        None => "bad payload".to_string(),
    }
}

/// Operations the sweeper needs from the upstream services
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Wallet's default/primary address
    async fn fetch_primary_address(&self) -> Result<String, ClientError>;

    /// Current deposit-address inventory, malformed entries dropped
    async fn list_address_records(&self) -> Result<Vec<AddressRecord>, ClientError>;

    /// Unlocked balance in XMR; a missing field reads as zero
    async fn get_unlocked_balance(&self, address: &str) -> Result<f64, ClientError>;

    /// Sweep everything from `from_address` to `to_address`, returning the XMR moved
    async fn sweep_address(&self, from_address: &str, to_address: &str)
        -> Result<f64, ClientError>;

    /// Increase a user's ledger balance; no request is made for `amount_xmr <= 0`
    async fn credit_user(
        &self,
        user_id: u64,
        amount_xmr: f64,
        kind: CreditKind,
    ) -> Result<(), ClientError>;

    /// Delete a mapping record, `true` when the service confirms it
    async fn delete_address_record(&self, record_id: &RecordId) -> Result<bool, ClientError>;
}

/// Opens one client per cycle
///
/// The client (and its connection pool) is dropped when the cycle ends,
/// whichever way it ends.
pub trait Connector: Send + Sync + 'static {
    type Client: ServiceClient + 'static;

    fn connect(&self) -> Result<Self::Client, ClientError>;
}

/// Upstream base URLs and timeouts
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub wallet_url: String,
    pub ledger_url: String,
    pub read_timeout: Duration,
    pub sweep_timeout: Duration,
}

impl Endpoints {
    pub fn from_config(config: &SweeperConfig) -> Self {
        Self {
            wallet_url: config.wallet_url.trim_end_matches('/').to_string(),
            ledger_url: config.ledger_url.trim_end_matches('/').to_string(),
            read_timeout: config.read_timeout,
            sweep_timeout: config.sweep_timeout,
        }
    }
}

/// Connector producing [`HttpServiceClient`]s
#[derive(Debug, Clone)]
pub struct HttpConnector {
    endpoints: Endpoints,
}

impl HttpConnector {
    pub fn new(endpoints: Endpoints) -> Self {
        Self { endpoints }
    }

    pub fn from_config(config: &SweeperConfig) -> Self {
        Self::new(Endpoints::from_config(config))
    }
}

impl Connector for HttpConnector {
    type Client = HttpServiceClient;

    fn connect(&self) -> Result<HttpServiceClient, ClientError> {
        HttpServiceClient::new(self.endpoints.clone())
    }
}

/// `GET /primary_address` response
#[derive(Debug, Default, Deserialize)]
struct PrimaryAddressResponse {
    #[serde(default)]
    address: Option<String>,
}

/// `GET /balance/{address}` response
#[derive(Debug, Default, Deserialize)]
struct BalanceResponse {
    #[serde(default)]
    unlocked_balance_xmr: Option<f64>,
}

/// `POST /sweep_all` request
#[derive(Debug, Serialize)]
struct SweepRequest<'a> {
    from_address: &'a str,
    to_address: &'a str,
}

/// `POST /sweep_all` response
#[derive(Debug, Default, Deserialize)]
struct SweepResponse {
    #[serde(default)]
    total_xmr: Option<f64>,
}

/// `POST /balance/{user_id}/increase` request
#[derive(Debug, Serialize)]
struct CreditRequest {
    amount_xmr: f64,
    kind: &'static str,
}

/// reqwest-backed [`ServiceClient`]
#[derive(Debug, Clone)]
pub struct HttpServiceClient {
    http: Client,
    endpoints: Endpoints,
}

impl HttpServiceClient {
    /// Create a client with a fresh connection pool
    pub fn new(endpoints: Endpoints) -> Result<Self, ClientError> {
        let http = Client::builder()
            .build()
            .map_err(|source| ClientError::Transport {
                service: ServiceKind::Wallet,
                source,
            })?;

        Ok(Self { http, endpoints })
    }

    async fn send(
        &self,
        service: ServiceKind,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        let resp = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|source| ClientError::Transport { service, source })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::upstream(
                service,
                Some(status.as_u16()),
                summarize_body(status, &body),
            ));
        }

        Ok(resp)
    }

    /// Decode a JSON body; an empty or `null` body yields `None`
    async fn read_json<T: DeserializeOwned>(
        service: ServiceKind,
        resp: Response,
    ) -> Result<Option<T>, ClientError> {
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| ClientError::Transport { service, source })?;

        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(None);
        }

        serde_json::from_slice::<Option<T>>(&bytes)
            .map_err(|e| ClientError::upstream(service, None, format!("invalid JSON: {}", e)))
    }
}

#[async_trait]
impl ServiceClient for HttpServiceClient {
    async fn fetch_primary_address(&self) -> Result<String, ClientError> {
        let url = format!("{}/primary_address", self.endpoints.wallet_url);
        let resp = self
            .send(ServiceKind::Wallet, self.http.get(&url), self.endpoints.read_timeout)
            .await?;

        let body: PrimaryAddressResponse = Self::read_json(ServiceKind::Wallet, resp)
            .await?
            .unwrap_or_default();

        body.address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or_else(|| {
                ClientError::upstream(ServiceKind::Wallet, None, "primary_address returned no address")
            })
    }

    async fn list_address_records(&self) -> Result<Vec<AddressRecord>, ClientError> {
        let url = format!("{}/addresses", self.endpoints.wallet_url);
        let resp = self
            .send(ServiceKind::Wallet, self.http.get(&url), self.endpoints.read_timeout)
            .await?;

        let entries: Vec<serde_json::Value> = Self::read_json(ServiceKind::Wallet, resp)
            .await?
            .unwrap_or_default();

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let address = entry.get("address").cloned();
            let id = entry.get("id").cloned();
            match AddressRecord::from_value(entry) {
                Ok(record) => records.push(record),
                Err(reason) => log_event(
                    LogLevel::Debug,
                    EventCategory::Address,
                    "address_record_skipped",
                    None,
                    serde_json::json!({
                        "reason": reason.as_str(),
                        "address": address,
                        "id": id,
                    }),
                ),
            }
        }

        Ok(records)
    }

    async fn get_unlocked_balance(&self, address: &str) -> Result<f64, ClientError> {
        let url = format!("{}/balance/{}", self.endpoints.wallet_url, address);
        let resp = self
            .send(ServiceKind::Wallet, self.http.get(&url), self.endpoints.read_timeout)
            .await?;

        let body: BalanceResponse = Self::read_json(ServiceKind::Wallet, resp)
            .await?
            .unwrap_or_default();

        Ok(body.unlocked_balance_xmr.unwrap_or(0.0))
    }

    async fn sweep_address(
        &self,
        from_address: &str,
        to_address: &str,
    ) -> Result<f64, ClientError> {
        let url = format!("{}/sweep_all", self.endpoints.wallet_url);
        let request = self.http.post(&url).json(&SweepRequest {
            from_address,
            to_address,
        });
        let resp = self
            .send(ServiceKind::Wallet, request, self.endpoints.sweep_timeout)
            .await?;

        let body: SweepResponse = Self::read_json(ServiceKind::Wallet, resp)
            .await?
            .unwrap_or_default();

        Ok(body.total_xmr.unwrap_or(0.0))
    }

    async fn credit_user(
        &self,
        user_id: u64,
        amount_xmr: f64,
        kind: CreditKind,
    ) -> Result<(), ClientError> {
        if amount_xmr <= 0.0 || amount_xmr.is_nan() {
            return Ok(());
        }

        let url = format!("{}/balance/{}/increase", self.endpoints.ledger_url, user_id);
        let request = self.http.post(&url).json(&CreditRequest {
            amount_xmr,
            kind: kind.as_str(),
        });
        self.send(ServiceKind::Ledger, request, self.endpoints.read_timeout)
            .await?;

        Ok(())
    }

    async fn delete_address_record(&self, record_id: &RecordId) -> Result<bool, ClientError> {
        let url = format!("{}/addresses/{}", self.endpoints.wallet_url, record_id);
        let resp = self
            .send(ServiceKind::Wallet, self.http.delete(&url), self.endpoints.read_timeout)
            .await?;

        Ok(matches!(resp.status(), StatusCode::OK | StatusCode::NO_CONTENT))
    }
}

/// Short, single-line description of a failed response
fn summarize_body(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }

    let mut text: String = body
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(MAX_ERROR_BODY)
        .collect();
    if body.chars().count() > MAX_ERROR_BODY {
        text.push_str("...");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints {
            wallet_url: "http://monero:8004".to_string(),
            ledger_url: "http://transactions:8003".to_string(),
            read_timeout: Duration::from_secs(20),
            sweep_timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_endpoints_from_config() {
        let mut config = SweeperConfig::default();
        config.wallet_url = "http://wallet.local/".to_string();

        let endpoints = Endpoints::from_config(&config);
        assert_eq!(endpoints.wallet_url, "http://wallet.local");
        assert_eq!(endpoints.ledger_url, "http://transactions:8003");
        assert_eq!(endpoints.sweep_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_connector_opens_fresh_clients() {
        let connector = HttpConnector::new(endpoints());
        let first = connector.connect().unwrap();
        let second = connector.connect().unwrap();
        assert_eq!(first.endpoints.wallet_url, "http://monero:8004");
        assert_eq!(second.endpoints.ledger_url, "http://transactions:8003");
    }

    #[test]
    fn test_upstream_error_display() {
        let err = ClientError::upstream(ServiceKind::Ledger, Some(503), "maintenance");
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_transport());
        assert_eq!(err.service(), ServiceKind::Ledger);
        assert_eq!(
            err.to_string(),
            "ledger service error (HTTP 503): maintenance"
        );

        let err = ClientError::upstream(ServiceKind::Wallet, None, "primary_address returned no address");
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("bad payload"));
    }

    #[test]
    fn test_summarize_body() {
        assert_eq!(summarize_body(StatusCode::BAD_GATEWAY, ""), "Bad Gateway");
        assert_eq!(
            summarize_body(StatusCode::BAD_REQUEST, "{\"detail\":\n\"nope\"}"),
            "{\"detail\": \"nope\"}"
        );

        let long = "x".repeat(500);
        let summary = summarize_body(StatusCode::INTERNAL_SERVER_ERROR, &long);
        assert_eq!(summary.len(), MAX_ERROR_BODY + 3);
    }
}
