use chrono::{DateTime, Utc};
use thiserror::Error;

use stockcare_core::{ExpectedVersion, PurchaseRequestId, SupplierId, SupplyItemId};
use stockcare_inventory::{Movement, MovementKind, NewMovement, Supplier, SupplyItem};
use stockcare_purchasing::PurchaseRequest;
use std::sync::Arc;

/// Store operation error.
///
/// These are **infrastructure errors** (availability, integrity, concurrency) as
/// opposed to domain errors (validation, invariants). Every write is a single
/// record, so a failed write leaves nothing behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unreachable or failing.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Referential or uniqueness constraint rejected the write.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Optimistic concurrency check failed.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// An in-process lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

/// Inclusive time window `[from, to]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }
}

/// Optional narrowing applied to movement queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub kind: Option<MovementKind>,
    pub range: Option<DateRange>,
}

impl MovementFilter {
    /// No narrowing: full history.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn entries() -> Self {
        Self {
            kind: Some(MovementKind::Entry),
            range: None,
        }
    }

    pub fn exits() -> Self {
        Self {
            kind: Some(MovementKind::Exit),
            range: None,
        }
    }

    pub fn within(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn matches(&self, movement: &Movement) -> bool {
        self.kind.is_none_or(|k| k == movement.kind)
            && self.range.is_none_or(|r| r.contains(movement.occurred_at))
    }
}

/// Persistence boundary for stock movements and the items they belong to.
///
/// Movements are append-only: there is no update or delete. Implementations must:
/// - reject `insert_movement` for an item that does not exist (`Integrity`)
/// - assign a fresh `MovementId` on insert
/// - return movements in insertion order
pub trait MovementStore: Send + Sync {
    fn find_supply_item(&self, item_id: SupplyItemId) -> Result<Option<SupplyItem>, StoreError>;

    /// All supply items, ordered by name.
    fn list_supply_items(&self) -> Result<Vec<SupplyItem>, StoreError>;

    fn find_movements_by_item(
        &self,
        item_id: SupplyItemId,
        filter: &MovementFilter,
    ) -> Result<Vec<Movement>, StoreError>;

    /// Movements across all items.
    fn list_movements(&self, filter: &MovementFilter) -> Result<Vec<Movement>, StoreError>;

    fn insert_movement(&self, movement: NewMovement) -> Result<Movement, StoreError>;
}

/// Administrative persistence for suppliers and supply items.
///
/// Implementations enforce the references a relational schema would:
/// - a supplier's CNPJ is unique
/// - an item must point at an existing supplier
/// - a supplier still referenced by items can't be removed
/// - an item with recorded movements can't be removed
pub trait CatalogStore: Send + Sync {
    fn find_supplier(&self, supplier_id: SupplierId) -> Result<Option<Supplier>, StoreError>;

    /// All suppliers, ordered by name.
    fn list_suppliers(&self) -> Result<Vec<Supplier>, StoreError>;

    /// Insert or replace.
    fn save_supplier(&self, supplier: Supplier) -> Result<(), StoreError>;

    /// Returns `false` when no such supplier existed.
    fn remove_supplier(&self, supplier_id: SupplierId) -> Result<bool, StoreError>;

    /// Insert or replace.
    fn save_supply_item(&self, item: SupplyItem) -> Result<(), StoreError>;

    /// Returns `false` when no such item existed.
    fn remove_supply_item(&self, item_id: SupplyItemId) -> Result<bool, StoreError>;
}

/// Snapshot persistence for purchase requests with optimistic locking.
pub trait PurchaseRequestStore: Send + Sync {
    fn load(&self, request_id: PurchaseRequestId) -> Result<Option<PurchaseRequest>, StoreError>;

    /// Persist a request whose previously stored version must match `expected_version`
    /// (`Exact(0)` for a request that was never stored).
    fn save(
        &self,
        request: PurchaseRequest,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError>;

    /// All requests, oldest first.
    fn list(&self) -> Result<Vec<PurchaseRequest>, StoreError>;
}

impl<S> MovementStore for Arc<S>
where
    S: MovementStore + ?Sized,
{
    fn find_supply_item(&self, item_id: SupplyItemId) -> Result<Option<SupplyItem>, StoreError> {
        (**self).find_supply_item(item_id)
    }

    fn list_supply_items(&self) -> Result<Vec<SupplyItem>, StoreError> {
        (**self).list_supply_items()
    }

    fn find_movements_by_item(
        &self,
        item_id: SupplyItemId,
        filter: &MovementFilter,
    ) -> Result<Vec<Movement>, StoreError> {
        (**self).find_movements_by_item(item_id, filter)
    }

    fn list_movements(&self, filter: &MovementFilter) -> Result<Vec<Movement>, StoreError> {
        (**self).list_movements(filter)
    }

    fn insert_movement(&self, movement: NewMovement) -> Result<Movement, StoreError> {
        (**self).insert_movement(movement)
    }
}

impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    fn find_supplier(&self, supplier_id: SupplierId) -> Result<Option<Supplier>, StoreError> {
        (**self).find_supplier(supplier_id)
    }

    fn list_suppliers(&self) -> Result<Vec<Supplier>, StoreError> {
        (**self).list_suppliers()
    }

    fn save_supplier(&self, supplier: Supplier) -> Result<(), StoreError> {
        (**self).save_supplier(supplier)
    }

    fn remove_supplier(&self, supplier_id: SupplierId) -> Result<bool, StoreError> {
        (**self).remove_supplier(supplier_id)
    }

    fn save_supply_item(&self, item: SupplyItem) -> Result<(), StoreError> {
        (**self).save_supply_item(item)
    }

    fn remove_supply_item(&self, item_id: SupplyItemId) -> Result<bool, StoreError> {
        (**self).remove_supply_item(item_id)
    }
}

impl<S> PurchaseRequestStore for Arc<S>
where
    S: PurchaseRequestStore + ?Sized,
{
    fn load(&self, request_id: PurchaseRequestId) -> Result<Option<PurchaseRequest>, StoreError> {
        (**self).load(request_id)
    }

    fn save(
        &self,
        request: PurchaseRequest,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError> {
        (**self).save(request, expected_version)
    }

    fn list(&self) -> Result<Vec<PurchaseRequest>, StoreError> {
        (**self).list()
    }
}
