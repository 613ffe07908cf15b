//! Purchase request orchestration.
//!
//! Each command follows the same pipeline:
//!
//! ```text
//! load snapshot → handle(cmd) → apply(events) → save(expected version)
//! ```
//!
//! Opening a request also announces it to the external purchasing system. The
//! announcement is best-effort: if the gateway fails the request stays `Pending`
//! and can be resubmitted later.

pub mod gateway;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use stockcare_core::{
    Aggregate, AggregateRoot, DomainError, Event, ExpectedVersion, PurchaseRequestId,
    SupplyItemId,
};
use stockcare_purchasing::{
    CancelRequest, MarkReceived, MarkSent, OpenRequest, PurchaseRequest, PurchaseRequestCommand,
    PurchaseRequestEvent, PurchaseRequestStatus,
};

use crate::store::{MovementStore, PurchaseRequestStore, StoreError};

pub use gateway::{GatewayError, PurchaseNotice, PurchasingGateway};
#[cfg(feature = "http-gateway")]
pub use gateway::HttpPurchasingGateway;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PurchasingError {
    #[error("validation failed: {0}")]
    Validation(String),
    /// Unknown purchase request or supply item.
    #[error("not found")]
    NotFound,
    /// Status transition not allowed from the current status.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    /// Concurrent modification detected.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<DomainError> for PurchasingError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                PurchasingError::Validation(msg)
            }
            DomainError::InvariantViolation(msg) => PurchasingError::InvalidTransition(msg),
            DomainError::Conflict(msg) => PurchasingError::Conflict(msg),
            DomainError::NotFound => PurchasingError::NotFound,
        }
    }
}

impl From<StoreError> for PurchasingError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => PurchasingError::Conflict(msg),
            other => PurchasingError::Store(other),
        }
    }
}

/// Purchase request service over injected request store, gateway and item lookup.
#[derive(Debug)]
pub struct PurchasingService<S, G, M> {
    requests: S,
    gateway: G,
    items: M,
}

impl<S, G, M> PurchasingService<S, G, M>
where
    S: PurchaseRequestStore,
    G: PurchasingGateway,
    M: MovementStore,
{
    pub fn new(requests: S, gateway: G, items: M) -> Self {
        Self {
            requests,
            gateway,
            items,
        }
    }

    /// Open a request for `quantity` units of an existing item and announce it.
    ///
    /// Returns the request as stored: `Sent` if the gateway accepted it,
    /// otherwise `Pending`.
    pub fn request_purchase(
        &self,
        item_id: SupplyItemId,
        quantity: i64,
    ) -> Result<PurchaseRequest, PurchasingError> {
        if self.items.find_supply_item(item_id)?.is_none() {
            return Err(PurchasingError::NotFound);
        }

        let request_id = PurchaseRequestId::new();
        let request = self.execute(
            request_id,
            PurchaseRequestCommand::Open(OpenRequest {
                request_id,
                item_id,
                quantity,
                occurred_at: Utc::now(),
            }),
        )?;

        self.announce(request)
    }

    /// Retry the gateway for a request left `Pending` by an earlier failure.
    pub fn resubmit(&self, request_id: PurchaseRequestId) -> Result<PurchaseRequest, PurchasingError> {
        let request = self.get(request_id)?;
        if request.status() != PurchaseRequestStatus::Pending {
            return Err(PurchasingError::InvalidTransition(format!(
                "only pending purchase requests can be resubmitted (status: {:?})",
                request.status()
            )));
        }
        self.announce(request)
    }

    pub fn mark_received(
        &self,
        request_id: PurchaseRequestId,
    ) -> Result<PurchaseRequest, PurchasingError> {
        self.execute(
            request_id,
            PurchaseRequestCommand::MarkReceived(MarkReceived {
                request_id,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn cancel(
        &self,
        request_id: PurchaseRequestId,
        reason: Option<String>,
    ) -> Result<PurchaseRequest, PurchasingError> {
        self.execute(
            request_id,
            PurchaseRequestCommand::Cancel(CancelRequest {
                request_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn get(&self, request_id: PurchaseRequestId) -> Result<PurchaseRequest, PurchasingError> {
        self.requests
            .load(request_id)?
            .ok_or(PurchasingError::NotFound)
    }

    pub fn list(&self) -> Result<Vec<PurchaseRequest>, PurchasingError> {
        Ok(self.requests.list()?)
    }

    fn announce(&self, request: PurchaseRequest) -> Result<PurchaseRequest, PurchasingError> {
        let Some(item_id) = request.item_id() else {
            return Err(PurchasingError::NotFound);
        };
        let notice = PurchaseNotice {
            request_id: request.id_typed(),
            item_id,
            quantity: request.quantity(),
        };

        match self.gateway.submit(&notice) {
            Ok(()) => self.execute(
                notice.request_id,
                PurchaseRequestCommand::MarkSent(MarkSent {
                    request_id: notice.request_id,
                    occurred_at: Utc::now(),
                }),
            ),
            Err(err) => {
                warn!(
                    request_id = %notice.request_id,
                    error = %err,
                    "purchasing integration failed; request stays pending"
                );
                Ok(request)
            }
        }
    }

    fn execute(
        &self,
        request_id: PurchaseRequestId,
        command: PurchaseRequestCommand,
    ) -> Result<PurchaseRequest, PurchasingError> {
        let mut request = self
            .requests
            .load(request_id)?
            .unwrap_or_else(|| PurchaseRequest::empty(request_id));
        let expected = ExpectedVersion::Exact(request.version());

        let events: Vec<PurchaseRequestEvent> = request.handle(&command)?;
        for event in &events {
            request.apply(event);
        }

        self.requests.save(request.clone(), expected)?;
        for event in &events {
            info!(request_id = %request_id, event_type = event.event_type(), "purchase request updated");
        }
        Ok(request)
    }
}
