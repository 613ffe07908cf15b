//! Read-only report rows built from the ledger and catalog.
//!
//! Rows are flat, `Serialize`-able records meant for export. Names that can't be
//! resolved render as [`NOT_AVAILABLE`].

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

use stockcare_core::{Entity, MovementId, SupplierId, SupplyItemId};
use stockcare_inventory::{MovementKind, Supplier, SupplyItem};

use crate::ledger::{CriticalQuery, LedgerError, StockLedger};
use crate::store::{CatalogStore, DateRange, MovementFilter, MovementStore, StoreError};

/// Placeholder for an unresolved name or an absent optional field.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Entries and exits normalized into one shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementRow {
    pub movement_id: MovementId,
    pub kind: MovementKind,
    pub occurred_at: DateTime<Utc>,
    pub quantity: i64,
    pub destination: String,
    pub item: String,
    pub unit: String,
    pub supplier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryRow {
    pub item_id: SupplyItemId,
    pub item: String,
    pub unit: String,
    pub supplier: String,
    pub balance: i64,
    pub minimum: i64,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriticalRow {
    pub item_id: SupplyItemId,
    pub item: String,
    pub supplier: String,
    pub balance: i64,
    pub minimum: i64,
    /// Units needed to get back to the minimum.
    pub shortfall: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryAlertRow {
    pub movement_id: MovementId,
    pub item: String,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
    pub days_remaining: i64,
}

/// Narrowing for [`Reports::movement_report`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementReportFilter {
    pub kind: Option<MovementKind>,
    pub item_id: Option<SupplyItemId>,
    /// Defaults to January 1st of the current year.
    pub from: Option<DateTime<Utc>>,
    /// Defaults to now.
    pub to: Option<DateTime<Utc>>,
    /// Case-insensitive substring matched against exits; entries are unaffected.
    pub destination: Option<String>,
}

impl MovementReportFilter {
    fn range(&self, now: DateTime<Utc>) -> DateRange {
        let from = self.from.unwrap_or_else(|| start_of_year(now));
        DateRange::new(from, self.to.unwrap_or(now))
    }

    fn destination_needle(&self) -> Option<String> {
        self.destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_lowercase)
    }
}

fn start_of_year(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Report builder over a shared ledger.
pub struct Reports<'a, S> {
    ledger: &'a StockLedger<S>,
}

impl<'a, S> Reports<'a, S>
where
    S: MovementStore + CatalogStore,
{
    pub fn new(ledger: &'a StockLedger<S>) -> Self {
        Self { ledger }
    }

    /// Movements matching `filter`, newest first.
    pub fn movement_report(
        &self,
        filter: &MovementReportFilter,
    ) -> Result<Vec<MovementRow>, ReportError> {
        self.movement_report_at(filter, Utc::now())
    }

    /// As [`Self::movement_report`], with the default range anchored at `now`.
    pub fn movement_report_at(
        &self,
        filter: &MovementReportFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<MovementRow>, ReportError> {
        let store = self.ledger.store();
        let query = MovementFilter {
            kind: filter.kind,
            range: Some(filter.range(now)),
        };
        let movements = match filter.item_id {
            Some(item_id) => store.find_movements_by_item(item_id, &query)?,
            None => store.list_movements(&query)?,
        };

        let names = self.names()?;
        let needle = filter.destination_needle();

        let mut rows: Vec<MovementRow> = movements
            .into_iter()
            .filter(|m| match (&needle, m.kind) {
                (Some(needle), MovementKind::Exit) => m
                    .destination
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(needle.as_str())),
                _ => true,
            })
            .map(|m| {
                let item = names.items.get(&m.item_id);
                MovementRow {
                    movement_id: m.id,
                    kind: m.kind,
                    occurred_at: m.occurred_at,
                    quantity: m.quantity,
                    destination: m.destination.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                    item: item.map_or(NOT_AVAILABLE, |i| i.name()).to_string(),
                    unit: item.map_or(NOT_AVAILABLE, |i| i.unit_of_measure()).to_string(),
                    supplier: names.supplier_of(item),
                }
            })
            .collect();

        rows.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(rows)
    }

    /// Every item with its current balance, ordered by name.
    pub fn inventory_report(&self) -> Result<Vec<InventoryRow>, ReportError> {
        let suppliers = self.suppliers()?;
        Ok(self
            .ledger
            .stock_levels()?
            .into_iter()
            .map(|level| InventoryRow {
                item_id: level.item.id(),
                item: level.item.name().to_string(),
                unit: level.item.unit_of_measure().to_string(),
                supplier: supplier_name(&suppliers, level.item.supplier_id()),
                balance: level.balance,
                minimum: level.item.minimum_quantity(),
                unit_price_cents: level.item.unit_price_cents(),
            })
            .collect())
    }

    pub fn critical_report(&self, query: CriticalQuery) -> Result<Vec<CriticalRow>, ReportError> {
        let suppliers = self.suppliers()?;
        let mut rows = Vec::new();
        for critical in self.ledger.critical_items_matching(query)? {
            let critical = critical?;
            rows.push(CriticalRow {
                item_id: critical.item.id(),
                item: critical.item.name().to_string(),
                supplier: supplier_name(&suppliers, critical.item.supplier_id()),
                balance: critical.balance,
                minimum: critical.minimum,
                shortfall: critical.minimum - critical.balance,
            });
        }
        Ok(rows)
    }

    pub fn expiry_alerts(&self, within_days: u32) -> Result<Vec<ExpiryAlertRow>, ReportError> {
        self.expiry_alerts_as_of(within_days, Utc::now().date_naive())
    }

    pub fn expiry_alerts_as_of(
        &self,
        within_days: u32,
        today: NaiveDate,
    ) -> Result<Vec<ExpiryAlertRow>, ReportError> {
        Ok(self
            .ledger
            .expiring_entries_as_of(within_days, today)?
            .into_iter()
            .map(|e| ExpiryAlertRow {
                movement_id: e.movement_id,
                item: e.item.name().to_string(),
                quantity: e.quantity,
                expiry_date: e.expiry_date,
                days_remaining: e.days_remaining,
            })
            .collect())
    }

    fn suppliers(&self) -> Result<HashMap<SupplierId, Supplier>, StoreError> {
        Ok(self
            .ledger
            .store()
            .list_suppliers()?
            .into_iter()
            .map(|s| (s.id(), s))
            .collect())
    }

    fn names(&self) -> Result<Names, StoreError> {
        let items = self
            .ledger
            .store()
            .list_supply_items()?
            .into_iter()
            .map(|i| (i.id(), i))
            .collect();
        Ok(Names {
            items,
            suppliers: self.suppliers()?,
        })
    }
}

struct Names {
    items: HashMap<SupplyItemId, SupplyItem>,
    suppliers: HashMap<SupplierId, Supplier>,
}

impl Names {
    fn supplier_of(&self, item: Option<&SupplyItem>) -> String {
        match item {
            Some(item) => supplier_name(&self.suppliers, item.supplier_id()),
            None => NOT_AVAILABLE.to_string(),
        }
    }
}

fn supplier_name(suppliers: &HashMap<SupplierId, Supplier>, id: SupplierId) -> String {
    suppliers
        .get(&id)
        .map_or(NOT_AVAILABLE, |s| s.name())
        .to_string()
}

/// Pretty-printed JSON array of report rows.
pub fn to_json<T: Serialize>(rows: &[T]) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(rows)?)
}
