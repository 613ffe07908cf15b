//! Administrative operations on suppliers and supply items.

use thiserror::Error;
use tracing::info;

use stockcare_core::{DomainError, Entity, SupplierId, SupplyItemId};
use stockcare_inventory::{Supplier, SupplierDetails, SupplyItem, SupplyItemDetails};

use crate::store::{CatalogStore, MovementStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Input failed validation (deterministic).
    #[error("validation failed: {0}")]
    Validation(String),
    /// No such supplier / item.
    #[error("not found")]
    NotFound,
    /// The write would break a reference or uniqueness rule.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Persistence failed.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<DomainError> for CatalogError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                CatalogError::Validation(msg)
            }
            DomainError::InvariantViolation(msg) | DomainError::Conflict(msg) => {
                CatalogError::Conflict(msg)
            }
            DomainError::NotFound => CatalogError::NotFound,
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Integrity(msg) | StoreError::Concurrency(msg) => {
                CatalogError::Conflict(msg)
            }
            other => CatalogError::Store(other),
        }
    }
}

/// Supplier and supply item administration over an injected store.
#[derive(Debug)]
pub struct Catalog<S> {
    store: S,
}

impl<S> Catalog<S>
where
    S: CatalogStore + MovementStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn create_supplier(&self, details: SupplierDetails) -> Result<Supplier, CatalogError> {
        let supplier = Supplier::register(SupplierId::new(), details)?;
        self.store.save_supplier(supplier.clone())?;
        info!(supplier_id = %supplier.id(), "supplier created");
        Ok(supplier)
    }

    pub fn update_supplier(
        &self,
        supplier_id: SupplierId,
        details: SupplierDetails,
    ) -> Result<Supplier, CatalogError> {
        let mut supplier = self.get_supplier(supplier_id)?;
        supplier.revise(details)?;
        self.store.save_supplier(supplier.clone())?;
        info!(%supplier_id, "supplier updated");
        Ok(supplier)
    }

    pub fn get_supplier(&self, supplier_id: SupplierId) -> Result<Supplier, CatalogError> {
        self.store
            .find_supplier(supplier_id)?
            .ok_or(CatalogError::NotFound)
    }

    pub fn list_suppliers(&self) -> Result<Vec<Supplier>, CatalogError> {
        Ok(self.store.list_suppliers()?)
    }

    /// Fails with `Conflict` while any supply item still references the supplier.
    pub fn delete_supplier(&self, supplier_id: SupplierId) -> Result<(), CatalogError> {
        if !self.store.remove_supplier(supplier_id)? {
            return Err(CatalogError::NotFound);
        }
        info!(%supplier_id, "supplier deleted");
        Ok(())
    }

    pub fn create_item(&self, details: SupplyItemDetails) -> Result<SupplyItem, CatalogError> {
        self.ensure_supplier(details.supplier_id)?;
        let item = SupplyItem::register(SupplyItemId::new(), details)?;
        self.store.save_supply_item(item.clone())?;
        info!(item_id = %item.id(), name = item.name(), "supply item created");
        Ok(item)
    }

    pub fn update_item(
        &self,
        item_id: SupplyItemId,
        details: SupplyItemDetails,
    ) -> Result<SupplyItem, CatalogError> {
        let mut item = self.get_item(item_id)?;
        self.ensure_supplier(details.supplier_id)?;
        item.revise(details)?;
        self.store.save_supply_item(item.clone())?;
        info!(%item_id, "supply item updated");
        Ok(item)
    }

    pub fn get_item(&self, item_id: SupplyItemId) -> Result<SupplyItem, CatalogError> {
        self.store
            .find_supply_item(item_id)?
            .ok_or(CatalogError::NotFound)
    }

    pub fn list_items(&self) -> Result<Vec<SupplyItem>, CatalogError> {
        Ok(self.store.list_supply_items()?)
    }

    /// Fails with `Conflict` once the item has any recorded movement.
    pub fn delete_item(&self, item_id: SupplyItemId) -> Result<(), CatalogError> {
        if !self.store.remove_supply_item(item_id)? {
            return Err(CatalogError::NotFound);
        }
        info!(%item_id, "supply item deleted");
        Ok(())
    }

    fn ensure_supplier(&self, supplier_id: SupplierId) -> Result<(), CatalogError> {
        match self.store.find_supplier(supplier_id)? {
            Some(_) => Ok(()),
            None => Err(CatalogError::Validation(format!(
                "supplier {supplier_id} does not exist"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use stockcare_core::UserId;

    use crate::ledger::{RecordEntry, StockLedger};
    use crate::store::InMemoryStockStore;

    fn supplier_details(cnpj: &str) -> SupplierDetails {
        SupplierDetails {
            name: "Distribuidora Vida".to_string(),
            email: "pedidos@vida.com.br".to_string(),
            phone: "(31) 3333-4444".to_string(),
            cnpj: cnpj.to_string(),
        }
    }

    fn item_details(supplier_id: SupplierId) -> SupplyItemDetails {
        SupplyItemDetails {
            name: "Esparadrapo".to_string(),
            description: "Rolo 10cm x 4,5m".to_string(),
            unit_of_measure: "rl".to_string(),
            minimum_quantity: 12,
            unit_price_cents: 890,
            barcode: Some("7891234567895".to_string()),
            supplier_id,
        }
    }

    fn catalog() -> Catalog<InMemoryStockStore> {
        Catalog::new(InMemoryStockStore::new())
    }

    #[test]
    fn create_and_fetch_item() {
        let catalog = catalog();
        let supplier = catalog.create_supplier(supplier_details("11111111000191")).unwrap();
        let item = catalog.create_item(item_details(supplier.id())).unwrap();

        let fetched = catalog.get_item(item.id()).unwrap();
        assert_eq!(fetched, item);
        assert_eq!(fetched.unit_of_measure(), "RL");
        assert_eq!(catalog.list_items().unwrap().len(), 1);
    }

    #[test]
    fn item_requires_existing_supplier() {
        let catalog = catalog();
        let err = catalog.create_item(item_details(SupplierId::new())).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[test]
    fn update_item_keeps_identity() {
        let catalog = catalog();
        let supplier = catalog.create_supplier(supplier_details("11111111000191")).unwrap();
        let item = catalog.create_item(item_details(supplier.id())).unwrap();

        let mut details = item_details(supplier.id());
        details.minimum_quantity = 30;
        let updated = catalog.update_item(item.id(), details).unwrap();
        assert_eq!(updated.id(), item.id());
        assert_eq!(catalog.get_item(item.id()).unwrap().minimum_quantity(), 30);
    }

    #[test]
    fn missing_records_are_not_found() {
        let catalog = catalog();
        assert_eq!(catalog.get_item(SupplyItemId::new()), Err(CatalogError::NotFound));
        assert_eq!(
            catalog.delete_supplier(SupplierId::new()),
            Err(CatalogError::NotFound)
        );
        assert_eq!(
            catalog.update_supplier(SupplierId::new(), supplier_details("11111111000191")),
            Err(CatalogError::NotFound)
        );
    }

    #[test]
    fn duplicate_cnpj_conflicts() {
        let catalog = catalog();
        catalog.create_supplier(supplier_details("11.111.111/0001-91")).unwrap();
        assert!(matches!(
            catalog.create_supplier(supplier_details("11111111000191")),
            Err(CatalogError::Conflict(_))
        ));
    }

    #[test]
    fn referenced_supplier_and_item_with_history_cannot_be_deleted() {
        let store = Arc::new(InMemoryStockStore::new());
        let catalog = Catalog::new(Arc::clone(&store));
        let ledger = StockLedger::new(Arc::clone(&store));

        let supplier = catalog.create_supplier(supplier_details("11111111000191")).unwrap();
        let item = catalog.create_item(item_details(supplier.id())).unwrap();
        assert!(matches!(
            catalog.delete_supplier(supplier.id()),
            Err(CatalogError::Conflict(_))
        ));

        ledger
            .record_entry(RecordEntry {
                item_id: item.id(),
                quantity: 5,
                expiry_date: None,
                author: UserId::new(),
                occurred_at: Utc::now(),
            })
            .unwrap();
        assert!(matches!(
            catalog.delete_item(item.id()),
            Err(CatalogError::Conflict(_))
        ));
    }

    #[test]
    fn unused_item_then_supplier_can_be_deleted() {
        let catalog = catalog();
        let supplier = catalog.create_supplier(supplier_details("11111111000191")).unwrap();
        let item = catalog.create_item(item_details(supplier.id())).unwrap();

        catalog.delete_item(item.id()).unwrap();
        catalog.delete_supplier(supplier.id()).unwrap();
        assert!(catalog.list_suppliers().unwrap().is_empty());
    }
}
