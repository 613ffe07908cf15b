use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockcare_core::{
    Aggregate, AggregateRoot, DomainError, Event, PurchaseRequestId, SupplyItemId,
};

/// Purchase request status lifecycle.
///
/// `Pending → Sent → Received`, with `Pending | Sent → Cancelled`.
/// `Received` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseRequestStatus {
    Pending,
    Sent,
    Received,
    Cancelled,
}

impl PurchaseRequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Received | Self::Cancelled)
    }
}

/// Aggregate root: PurchaseRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    id: PurchaseRequestId,
    item_id: Option<SupplyItemId>,
    quantity: i64,
    status: PurchaseRequestStatus,
    opened_at: Option<DateTime<Utc>>,
    cancel_reason: Option<String>,
    version: u64,
    created: bool,
}

impl PurchaseRequest {
    /// Create an empty, not-yet-opened aggregate instance.
    pub fn empty(id: PurchaseRequestId) -> Self {
        Self {
            id,
            item_id: None,
            quantity: 0,
            status: PurchaseRequestStatus::Pending,
            opened_at: None,
            cancel_reason: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseRequestId {
        self.id
    }

    pub fn item_id(&self) -> Option<SupplyItemId> {
        self.item_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn status(&self) -> PurchaseRequestStatus {
        self.status
    }

    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for PurchaseRequest {
    type Id = PurchaseRequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRequest {
    pub request_id: PurchaseRequestId,
    pub item_id: SupplyItemId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkSent (the purchasing integration accepted the request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSent {
    pub request_id: PurchaseRequestId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkReceived {
    pub request_id: PurchaseRequestId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub request_id: PurchaseRequestId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseRequestCommand {
    Open(OpenRequest),
    MarkSent(MarkSent),
    MarkReceived(MarkReceived),
    Cancel(CancelRequest),
}

/// Event: RequestOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOpened {
    pub request_id: PurchaseRequestId,
    pub item_id: SupplyItemId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSent {
    pub request_id: PurchaseRequestId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestReceived.
///
/// Carries item and quantity so a caller can record the matching stock entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestReceived {
    pub request_id: PurchaseRequestId,
    pub item_id: SupplyItemId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCancelled {
    pub request_id: PurchaseRequestId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseRequestEvent {
    Opened(RequestOpened),
    Sent(RequestSent),
    Received(RequestReceived),
    Cancelled(RequestCancelled),
}

impl Event for PurchaseRequestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseRequestEvent::Opened(_) => "purchasing.request.opened",
            PurchaseRequestEvent::Sent(_) => "purchasing.request.sent",
            PurchaseRequestEvent::Received(_) => "purchasing.request.received",
            PurchaseRequestEvent::Cancelled(_) => "purchasing.request.cancelled",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseRequestEvent::Opened(e) => e.occurred_at,
            PurchaseRequestEvent::Sent(e) => e.occurred_at,
            PurchaseRequestEvent::Received(e) => e.occurred_at,
            PurchaseRequestEvent::Cancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseRequest {
    type Command = PurchaseRequestCommand;
    type Event = PurchaseRequestEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseRequestEvent::Opened(e) => {
                self.id = e.request_id;
                self.item_id = Some(e.item_id);
                self.quantity = e.quantity;
                self.status = PurchaseRequestStatus::Pending;
                self.opened_at = Some(e.occurred_at);
                self.created = true;
            }
            PurchaseRequestEvent::Sent(_) => {
                self.status = PurchaseRequestStatus::Sent;
            }
            PurchaseRequestEvent::Received(_) => {
                self.status = PurchaseRequestStatus::Received;
            }
            PurchaseRequestEvent::Cancelled(e) => {
                self.status = PurchaseRequestStatus::Cancelled;
                self.cancel_reason = e.reason.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseRequestCommand::Open(cmd) => self.handle_open(cmd),
            PurchaseRequestCommand::MarkSent(cmd) => self.handle_mark_sent(cmd),
            PurchaseRequestCommand::MarkReceived(cmd) => self.handle_mark_received(cmd),
            PurchaseRequestCommand::Cancel(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl PurchaseRequest {
    fn ensure_request_id(&self, request_id: PurchaseRequestId) -> Result<(), DomainError> {
        if self.id != request_id {
            return Err(DomainError::invariant("request_id mismatch"));
        }
        Ok(())
    }

    fn ensure_open(&self, request_id: PurchaseRequestId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_request_id(request_id)
    }

    fn handle_open(&self, cmd: &OpenRequest) -> Result<Vec<PurchaseRequestEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase request already exists"));
        }
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        Ok(vec![PurchaseRequestEvent::Opened(RequestOpened {
            request_id: cmd.request_id,
            item_id: cmd.item_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_sent(&self, cmd: &MarkSent) -> Result<Vec<PurchaseRequestEvent>, DomainError> {
        self.ensure_open(cmd.request_id)?;

        if self.status != PurchaseRequestStatus::Pending {
            return Err(DomainError::invariant(
                "only pending purchase requests can be sent",
            ));
        }

        Ok(vec![PurchaseRequestEvent::Sent(RequestSent {
            request_id: cmd.request_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_received(
        &self,
        cmd: &MarkReceived,
    ) -> Result<Vec<PurchaseRequestEvent>, DomainError> {
        self.ensure_open(cmd.request_id)?;

        if self.status != PurchaseRequestStatus::Sent {
            return Err(DomainError::invariant(
                "cannot receive a purchase request that was not sent",
            ));
        }

        let item_id = self
            .item_id
            .ok_or_else(|| DomainError::invariant("purchase request has no item"))?;

        Ok(vec![PurchaseRequestEvent::Received(RequestReceived {
            request_id: cmd.request_id,
            item_id,
            quantity: self.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelRequest) -> Result<Vec<PurchaseRequestEvent>, DomainError> {
        self.ensure_open(cmd.request_id)?;

        if self.status.is_terminal() {
            return Err(DomainError::invariant(format!(
                "purchase request is already {:?}",
                self.status
            )));
        }

        Ok(vec![PurchaseRequestEvent::Cancelled(RequestCancelled {
            request_id: cmd.request_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn opened(request_id: PurchaseRequestId, quantity: i64) -> PurchaseRequest {
        let mut request = PurchaseRequest::empty(request_id);
        let events = request
            .handle(&PurchaseRequestCommand::Open(OpenRequest {
                request_id,
                item_id: SupplyItemId::new(),
                quantity,
                occurred_at: test_time(),
            }))
            .unwrap();
        for e in &events {
            request.apply(e);
        }
        request
    }

    fn run(request: &mut PurchaseRequest, cmd: PurchaseRequestCommand) -> Result<(), DomainError> {
        let events = request.handle(&cmd)?;
        for e in &events {
            request.apply(e);
        }
        Ok(())
    }

    fn sent(id: PurchaseRequestId) -> PurchaseRequestCommand {
        PurchaseRequestCommand::MarkSent(MarkSent { request_id: id, occurred_at: test_time() })
    }

    fn received(id: PurchaseRequestId) -> PurchaseRequestCommand {
        PurchaseRequestCommand::MarkReceived(MarkReceived { request_id: id, occurred_at: test_time() })
    }

    fn cancel(id: PurchaseRequestId) -> PurchaseRequestCommand {
        PurchaseRequestCommand::Cancel(CancelRequest {
            request_id: id,
            reason: Some("duplicated".to_string()),
            occurred_at: test_time(),
        })
    }

    #[test]
    fn open_starts_pending() {
        let id = PurchaseRequestId::new();
        let request = opened(id, 50);
        assert_eq!(request.status(), PurchaseRequestStatus::Pending);
        assert_eq!(request.quantity(), 50);
        assert_eq!(request.version(), 1);
    }

    #[test]
    fn open_rejects_non_positive_quantity() {
        let id = PurchaseRequestId::new();
        let err = PurchaseRequest::empty(id)
            .handle(&PurchaseRequestCommand::Open(OpenRequest {
                request_id: id,
                item_id: SupplyItemId::new(),
                quantity: 0,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn open_twice_conflicts() {
        let id = PurchaseRequestId::new();
        let mut request = opened(id, 5);
        let err = run(
            &mut request,
            PurchaseRequestCommand::Open(OpenRequest {
                request_id: id,
                item_id: SupplyItemId::new(),
                quantity: 5,
                occurred_at: test_time(),
            }),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn full_lifecycle_emits_received_with_item_and_quantity() {
        let id = PurchaseRequestId::new();
        let mut request = opened(id, 12);
        run(&mut request, sent(id)).unwrap();
        assert_eq!(request.status(), PurchaseRequestStatus::Sent);

        let events = request.handle(&received(id)).unwrap();
        match &events[0] {
            PurchaseRequestEvent::Received(e) => {
                assert_eq!(Some(e.item_id), request.item_id());
                assert_eq!(e.quantity, 12);
            }
            other => panic!("expected Received, got {other:?}"),
        }
        request.apply(&events[0]);
        assert_eq!(request.status(), PurchaseRequestStatus::Received);
        assert_eq!(events[0].event_type(), "purchasing.request.received");
    }

    #[test]
    fn cannot_receive_before_sent() {
        let id = PurchaseRequestId::new();
        let mut request = opened(id, 3);
        let err = run(&mut request, received(id)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn cancel_records_reason_and_is_terminal() {
        let id = PurchaseRequestId::new();
        let mut request = opened(id, 3);
        run(&mut request, cancel(id)).unwrap();
        assert_eq!(request.status(), PurchaseRequestStatus::Cancelled);
        assert_eq!(request.cancel_reason(), Some("duplicated"));
        assert!(run(&mut request, sent(id)).is_err());
        assert!(run(&mut request, cancel(id)).is_err());
    }

    #[test]
    fn commands_on_unopened_request_are_not_found() {
        let id = PurchaseRequestId::new();
        let request = PurchaseRequest::empty(id);
        assert_eq!(request.handle(&sent(id)).unwrap_err(), DomainError::NotFound);
    }

    proptest! {
        /// Property: once a request reaches a terminal status, no command sequence
        /// moves it anywhere else.
        #[test]
        fn terminal_states_are_sticky(steps in prop::collection::vec(0u8..3, 1..20)) {
            let id = PurchaseRequestId::new();
            let mut request = opened(id, 1);
            let mut terminal: Option<PurchaseRequestStatus> = None;

            for step in steps {
                let cmd = match step {
                    0 => sent(id),
                    1 => received(id),
                    _ => cancel(id),
                };
                let _ = run(&mut request, cmd);
                if let Some(t) = terminal {
                    prop_assert_eq!(request.status(), t);
                } else if request.status().is_terminal() {
                    terminal = Some(request.status());
                }
            }
        }
    }
}
