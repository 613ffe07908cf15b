//! Stock ledger: quantity on hand derived from movement history.
//!
//! The ledger answers two questions for a supply item:
//!
//! - what is its current balance (`Σ entries − Σ exits`, recomputed on every read)
//! - may `q` units leave right now (`q ≤ balance`)
//!
//! ## Write serialization
//!
//! Checking the history and appending a movement is a check-then-act sequence.
//! Two concurrent exits for the same item could both pass the check and jointly
//! overdraw stock, and two large entries could jointly push the entry total past
//! `i64::MAX`. Both writes therefore run the check and the append while holding a
//! mutex dedicated to that item. Different items never contend.
//!
//! The lock map lives in the ledger, so all writers of a store must go through the
//! same `StockLedger` instance (share it behind an `Arc`). A lock is dropped from
//! the map once no writer holds it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use stockcare_core::{DomainError, Entity, MovementId, SupplyItemId, UserId};
use stockcare_inventory::{
    Movement, MovementKind, MovementTotals, NewMovement, SupplyItem, days_remaining,
    ensure_positive_quantity, expires_within, is_below_minimum,
};

use crate::store::{DateRange, MovementFilter, MovementStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Unknown supply item.
    #[error("supply item {0} not found")]
    NotFound(SupplyItemId),

    /// Zero or negative movement quantity.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Exit larger than the quantity on hand.
    #[error(
        "insufficient stock for supply item {item_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        item_id: SupplyItemId,
        requested: i64,
        available: i64,
    },

    /// The item's movement totals no longer fit in an `i64`.
    #[error("movement totals for supply item {0} overflow")]
    QuantityOverflow(SupplyItemId),

    /// Persistence failure; no movement was written.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl LedgerError {
    /// Movement construction only rejects quantities.
    fn from_domain(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => LedgerError::InvalidQuantity(msg),
            other => LedgerError::InvalidQuantity(other.to_string()),
        }
    }
}

/// Request: record inbound stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub item_id: SupplyItemId,
    pub quantity: i64,
    pub expiry_date: Option<NaiveDate>,
    pub author: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Request: record outbound stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordExit {
    pub item_id: SupplyItemId,
    pub quantity: i64,
    pub destination: Option<String>,
    pub author: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Quantity on hand for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub item: SupplyItem,
    pub balance: i64,
}

/// An item whose balance is strictly below its (possibly overridden) minimum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriticalItem {
    pub item: SupplyItem,
    pub balance: i64,
    pub minimum: i64,
}

/// An entry whose expiry date falls inside the alert window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiringEntry {
    pub item: SupplyItem,
    pub movement_id: MovementId,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
    pub days_remaining: i64,
}

/// Narrowing for critical stock queries.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CriticalQuery {
    /// Use this threshold for every item instead of each item's own minimum.
    pub threshold_override: Option<i64>,
    /// Only consider this item.
    pub item_id: Option<SupplyItemId>,
}

/// Movement-history based stock ledger over an injected [`MovementStore`].
#[derive(Debug)]
pub struct StockLedger<S> {
    store: S,
    item_locks: Mutex<HashMap<SupplyItemId, Arc<Mutex<()>>>>,
}

impl<S> StockLedger<S>
where
    S: MovementStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            item_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current balance of an existing item.
    #[instrument(skip(self))]
    pub fn compute_balance(&self, item_id: SupplyItemId) -> Result<i64, LedgerError> {
        self.require_item(item_id)?;
        Ok(self.balance_of_item(item_id, &MovementFilter::all())?)
    }

    /// Balance contributed by movements inside `range` (reporting variant).
    pub fn balance_between(
        &self,
        item_id: SupplyItemId,
        range: DateRange,
    ) -> Result<i64, LedgerError> {
        self.require_item(item_id)?;
        Ok(self.balance_of_item(item_id, &MovementFilter::all().within(range))?)
    }

    /// Check whether `quantity` units may leave `item_id` now.
    ///
    /// Mutates nothing. The answer can be stale by the time a caller acts on it;
    /// use [`StockLedger::record_exit`] to check and write atomically.
    pub fn validate_exit(&self, item_id: SupplyItemId, quantity: i64) -> Result<(), LedgerError> {
        ensure_positive_quantity(quantity).map_err(LedgerError::from_domain)?;
        self.require_item(item_id)?;
        let available = self.balance_of_item(item_id, &MovementFilter::all())?;
        ensure_available(item_id, quantity, available)
    }

    /// Append an entry. The only ceiling is the item's entry total fitting in an `i64`.
    #[instrument(skip(self, request), fields(item_id = %request.item_id, quantity = request.quantity))]
    pub fn record_entry(&self, request: RecordEntry) -> Result<Movement, LedgerError> {
        let movement = NewMovement::entry(
            request.item_id,
            request.quantity,
            request.expiry_date,
            request.author,
            request.occurred_at,
        )
        .map_err(LedgerError::from_domain)?;

        self.with_item_lock(request.item_id, || {
            self.require_item(request.item_id)?;
            self.totals_of_item(request.item_id, &MovementFilter::all())?
                .with(MovementKind::Entry, request.quantity)
                .map_err(|_| LedgerError::QuantityOverflow(request.item_id))?;

            let stored = self.store.insert_movement(movement)?;
            info!(movement_id = %stored.id, "stock entry recorded");
            Ok(stored)
        })
    }

    /// Validate and append an exit inside the item's critical section.
    #[instrument(skip(self, request), fields(item_id = %request.item_id, quantity = request.quantity))]
    pub fn record_exit(&self, request: RecordExit) -> Result<Movement, LedgerError> {
        let movement = NewMovement::exit(
            request.item_id,
            request.quantity,
            request.destination,
            request.author,
            request.occurred_at,
        )
        .map_err(LedgerError::from_domain)?;

        self.with_item_lock(request.item_id, || {
            self.require_item(request.item_id)?;
            let available = self.balance_of_item(request.item_id, &MovementFilter::all())?;
            if let Err(err) = ensure_available(request.item_id, request.quantity, available) {
                warn!(available, "stock exit rejected");
                return Err(err);
            }

            let stored = self.store.insert_movement(movement)?;
            info!(
                movement_id = %stored.id,
                remaining = available - request.quantity,
                "stock exit recorded"
            );
            Ok(stored)
        })
    }

    /// Items whose balance is below their minimum (or `threshold_override`).
    ///
    /// The item list is read up front; each balance is computed as the iterator
    /// advances. Calling again starts a fresh pass.
    pub fn critical_items(
        &self,
        threshold_override: Option<i64>,
    ) -> Result<CriticalItems<'_, S>, LedgerError> {
        self.critical_items_matching(CriticalQuery {
            threshold_override,
            item_id: None,
        })
    }

    pub fn critical_items_matching(
        &self,
        query: CriticalQuery,
    ) -> Result<CriticalItems<'_, S>, LedgerError> {
        let items = match query.item_id {
            Some(id) => vec![self.require_item(id)?],
            None => self.store.list_supply_items()?,
        };
        Ok(CriticalItems {
            ledger: self,
            items,
            position: 0,
            threshold_override: query.threshold_override,
        })
    }

    /// Entries expiring within `within_days` days of today (UTC).
    pub fn expiring_entries(&self, within_days: u32) -> Result<Vec<ExpiringEntry>, LedgerError> {
        self.expiring_entries_as_of(within_days, Utc::now().date_naive())
    }

    /// Entries whose expiry lies in `[today, today + within_days]`, soonest first.
    pub fn expiring_entries_as_of(
        &self,
        within_days: u32,
        today: NaiveDate,
    ) -> Result<Vec<ExpiringEntry>, LedgerError> {
        let items: HashMap<SupplyItemId, SupplyItem> = self
            .store
            .list_supply_items()?
            .into_iter()
            .map(|i| (i.id(), i))
            .collect();

        let mut expiring = Vec::new();
        for movement in self.store.list_movements(&MovementFilter::entries())? {
            let Some(expiry_date) = movement.expiry_date else {
                continue;
            };
            if !expires_within(expiry_date, today, within_days) {
                continue;
            }
            let Some(item) = items.get(&movement.item_id) else {
                debug!(movement_id = %movement.id, "skipping entry of unknown supply item");
                continue;
            };
            expiring.push(ExpiringEntry {
                item: item.clone(),
                movement_id: movement.id,
                quantity: movement.quantity,
                expiry_date,
                days_remaining: days_remaining(expiry_date, today),
            });
        }

        expiring.sort_by(|a, b| {
            a.expiry_date
                .cmp(&b.expiry_date)
                .then_with(|| a.item.name().cmp(b.item.name()))
        });
        Ok(expiring)
    }

    /// Balance of every item (inventory listing).
    pub fn stock_levels(&self) -> Result<Vec<StockLevel>, LedgerError> {
        let mut levels = Vec::new();
        for item in self.store.list_supply_items()? {
            let balance = self.balance_of_item(item.id(), &MovementFilter::all())?;
            levels.push(StockLevel { item, balance });
        }
        Ok(levels)
    }

    fn require_item(&self, item_id: SupplyItemId) -> Result<SupplyItem, LedgerError> {
        self.store
            .find_supply_item(item_id)?
            .ok_or(LedgerError::NotFound(item_id))
    }

    fn totals_of_item(
        &self,
        item_id: SupplyItemId,
        filter: &MovementFilter,
    ) -> Result<MovementTotals, LedgerError> {
        let movements = self.store.find_movements_by_item(item_id, filter)?;
        MovementTotals::of(&movements).map_err(|_| LedgerError::QuantityOverflow(item_id))
    }

    fn balance_of_item(
        &self,
        item_id: SupplyItemId,
        filter: &MovementFilter,
    ) -> Result<i64, LedgerError> {
        Ok(self.totals_of_item(item_id, filter)?.balance())
    }

    /// Run `write` while holding the item's lock, then forget the lock if no
    /// other writer is waiting on it.
    fn with_item_lock<T>(
        &self,
        item_id: SupplyItemId,
        write: impl FnOnce() -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let lock = self.item_lock(item_id)?;
        let result = {
            // The guarded value is `()`, so a poisoned lock carries no broken state.
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            write()
        };
        self.release_item_lock(item_id, lock);
        result
    }

    fn item_lock(&self, item_id: SupplyItemId) -> Result<Arc<Mutex<()>>, LedgerError> {
        let mut locks = self
            .item_locks
            .lock()
            .map_err(|_| StoreError::Poisoned("ledger item locks".to_string()))?;
        Ok(locks.entry(item_id).or_default().clone())
    }

    fn release_item_lock(&self, item_id: SupplyItemId, lock: Arc<Mutex<()>>) {
        let mut locks = self.item_locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Two references left: the map's and ours. Any other writer holds a third.
        let idle = locks
            .get(&item_id)
            .is_some_and(|held| Arc::ptr_eq(held, &lock) && Arc::strong_count(&lock) == 2);
        if idle {
            locks.remove(&item_id);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.item_locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}

fn ensure_available(
    item_id: SupplyItemId,
    requested: i64,
    available: i64,
) -> Result<(), LedgerError> {
    if requested > available {
        return Err(LedgerError::InsufficientStock {
            item_id,
            requested,
            available,
        });
    }
    Ok(())
}

/// Lazy iterator over critical items; see [`StockLedger::critical_items`].
pub struct CriticalItems<'a, S> {
    ledger: &'a StockLedger<S>,
    items: Vec<SupplyItem>,
    position: usize,
    threshold_override: Option<i64>,
}

impl<S> CriticalItems<'_, S> {
    /// Rewind to the first item. Balances are recomputed on the next pass.
    pub fn restart(&mut self) {
        self.position = 0;
    }
}

impl<S> Iterator for CriticalItems<'_, S>
where
    S: MovementStore,
{
    type Item = Result<CriticalItem, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(item) = self.items.get(self.position) {
            self.position += 1;
            let minimum = self.threshold_override.unwrap_or(item.minimum_quantity());
            match self.ledger.balance_of_item(item.id(), &MovementFilter::all()) {
                Ok(balance) if is_below_minimum(balance, minimum) => {
                    return Some(Ok(CriticalItem {
                        item: item.clone(),
                        balance,
                        minimum,
                    }));
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.items.len().saturating_sub(self.position)))
    }
}
