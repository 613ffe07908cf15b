//! Outbound integration with the external purchasing system.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockcare_core::{PurchaseRequestId, SupplyItemId};
use std::sync::Arc;

/// Payload announced to the purchasing system for a new request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseNotice {
    pub request_id: PurchaseRequestId,
    pub item_id: SupplyItemId,
    pub quantity: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Transport failure (connection refused, timeout, ...).
    #[error("purchasing system unreachable: {0}")]
    Unreachable(String),

    /// The purchasing system answered but refused the request.
    #[error("purchasing system rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// External purchasing integration.
pub trait PurchasingGateway: Send + Sync {
    fn submit(&self, notice: &PurchaseNotice) -> Result<(), GatewayError>;
}

impl<G> PurchasingGateway for Arc<G>
where
    G: PurchasingGateway + ?Sized,
{
    fn submit(&self, notice: &PurchaseNotice) -> Result<(), GatewayError> {
        (**self).submit(notice)
    }
}

/// JSON-over-HTTP gateway posting each notice to a fixed endpoint.
#[cfg(feature = "http-gateway")]
#[derive(Debug, Clone)]
pub struct HttpPurchasingGateway {
    client: reqwest::blocking::Client,
    endpoint: String,
}

#[cfg(feature = "http-gateway")]
impl HttpPurchasingGateway {
    pub fn new(endpoint: impl Into<String>, timeout: std::time::Duration) -> Result<Self, GatewayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &crate::config::StockCareConfig) -> Result<Self, GatewayError> {
        Self::new(config.purchasing_url.clone(), config.purchasing_timeout)
    }
}

#[cfg(feature = "http-gateway")]
impl PurchasingGateway for HttpPurchasingGateway {
    fn submit(&self, notice: &PurchaseNotice) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(notice)
            .send()
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            message: response.text().unwrap_or_default(),
        })
    }
}
