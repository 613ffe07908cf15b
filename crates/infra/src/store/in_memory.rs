use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use stockcare_core::{
    AggregateRoot, Entity, ExpectedVersion, MovementId, PurchaseRequestId, SupplierId,
    SupplyItemId,
};
use stockcare_inventory::{Movement, NewMovement, Supplier, SupplyItem};
use stockcare_purchasing::PurchaseRequest;

use super::r#trait::{
    CatalogStore, MovementFilter, MovementStore, PurchaseRequestStore, StoreError,
};

fn read<'a, T>(lock: &'a RwLock<T>, what: &str) -> Result<RwLockReadGuard<'a, T>, StoreError> {
    lock.read().map_err(|_| StoreError::Poisoned(what.to_string()))
}

fn write<'a, T>(lock: &'a RwLock<T>, what: &str) -> Result<RwLockWriteGuard<'a, T>, StoreError> {
    lock.write().map_err(|_| StoreError::Poisoned(what.to_string()))
}

/// In-memory supplier / item / movement store.
///
/// Intended for tests/dev. Locks are always taken in the order
/// suppliers → items → movements.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    suppliers: RwLock<HashMap<SupplierId, Supplier>>,
    items: RwLock<HashMap<SupplyItemId, SupplyItem>>,
    movements: RwLock<Vec<Movement>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MovementStore for InMemoryStockStore {
    fn find_supply_item(&self, item_id: SupplyItemId) -> Result<Option<SupplyItem>, StoreError> {
        Ok(read(&self.items, "items")?.get(&item_id).cloned())
    }

    fn list_supply_items(&self) -> Result<Vec<SupplyItem>, StoreError> {
        let mut items: Vec<SupplyItem> = read(&self.items, "items")?.values().cloned().collect();
        items.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().cmp(&b.id())));
        Ok(items)
    }

    fn find_movements_by_item(
        &self,
        item_id: SupplyItemId,
        filter: &MovementFilter,
    ) -> Result<Vec<Movement>, StoreError> {
        Ok(read(&self.movements, "movements")?
            .iter()
            .filter(|m| m.item_id == item_id && filter.matches(m))
            .cloned()
            .collect())
    }

    fn list_movements(&self, filter: &MovementFilter) -> Result<Vec<Movement>, StoreError> {
        Ok(read(&self.movements, "movements")?
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    fn insert_movement(&self, movement: NewMovement) -> Result<Movement, StoreError> {
        // Hold the item map while appending so the item can't be removed mid-insert.
        let items = read(&self.items, "items")?;
        if !items.contains_key(&movement.item_id()) {
            return Err(StoreError::Integrity(format!(
                "movement references unknown supply item {}",
                movement.item_id()
            )));
        }

        let stored = movement.into_movement(MovementId::new());
        write(&self.movements, "movements")?.push(stored.clone());
        Ok(stored)
    }
}

impl CatalogStore for InMemoryStockStore {
    fn find_supplier(&self, supplier_id: SupplierId) -> Result<Option<Supplier>, StoreError> {
        Ok(read(&self.suppliers, "suppliers")?.get(&supplier_id).cloned())
    }

    fn list_suppliers(&self) -> Result<Vec<Supplier>, StoreError> {
        let mut suppliers: Vec<Supplier> =
            read(&self.suppliers, "suppliers")?.values().cloned().collect();
        suppliers.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().cmp(&b.id())));
        Ok(suppliers)
    }

    fn save_supplier(&self, supplier: Supplier) -> Result<(), StoreError> {
        let mut suppliers = write(&self.suppliers, "suppliers")?;
        let duplicate = suppliers
            .values()
            .any(|s| s.id() != supplier.id() && s.cnpj() == supplier.cnpj());
        if duplicate {
            return Err(StoreError::Integrity(format!(
                "cnpj {} already registered",
                supplier.cnpj()
            )));
        }
        suppliers.insert(supplier.id(), supplier);
        Ok(())
    }

    fn remove_supplier(&self, supplier_id: SupplierId) -> Result<bool, StoreError> {
        let mut suppliers = write(&self.suppliers, "suppliers")?;
        let items = read(&self.items, "items")?;
        if items.values().any(|i| i.supplier_id() == supplier_id) {
            return Err(StoreError::Integrity(format!(
                "supplier {supplier_id} is still referenced by supply items"
            )));
        }
        Ok(suppliers.remove(&supplier_id).is_some())
    }

    fn save_supply_item(&self, item: SupplyItem) -> Result<(), StoreError> {
        let suppliers = read(&self.suppliers, "suppliers")?;
        if !suppliers.contains_key(&item.supplier_id()) {
            return Err(StoreError::Integrity(format!(
                "supply item references unknown supplier {}",
                item.supplier_id()
            )));
        }
        write(&self.items, "items")?.insert(item.id(), item);
        Ok(())
    }

    fn remove_supply_item(&self, item_id: SupplyItemId) -> Result<bool, StoreError> {
        let mut items = write(&self.items, "items")?;
        let movements = read(&self.movements, "movements")?;
        if movements.iter().any(|m| m.item_id == item_id) {
            return Err(StoreError::Integrity(format!(
                "supply item {item_id} has recorded movements"
            )));
        }
        Ok(items.remove(&item_id).is_some())
    }
}

/// In-memory purchase request store.
#[derive(Debug, Default)]
pub struct InMemoryPurchaseRequestStore {
    inner: RwLock<HashMap<PurchaseRequestId, PurchaseRequest>>,
}

impl InMemoryPurchaseRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PurchaseRequestStore for InMemoryPurchaseRequestStore {
    fn load(&self, request_id: PurchaseRequestId) -> Result<Option<PurchaseRequest>, StoreError> {
        Ok(read(&self.inner, "purchase_requests")?.get(&request_id).cloned())
    }

    fn save(
        &self,
        request: PurchaseRequest,
        expected_version: ExpectedVersion,
    ) -> Result<(), StoreError> {
        let mut map = write(&self.inner, "purchase_requests")?;
        let current = map.get(request.id()).map(|r| r.version()).unwrap_or(0);
        if !expected_version.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "purchase request {} (expected: {expected_version:?}, actual: {current})",
                request.id()
            )));
        }
        map.insert(*request.id(), request);
        Ok(())
    }

    fn list(&self) -> Result<Vec<PurchaseRequest>, StoreError> {
        let mut requests: Vec<PurchaseRequest> =
            read(&self.inner, "purchase_requests")?.values().cloned().collect();
        // UUIDv7 ids are time-ordered.
        requests.sort_by_key(|r| *r.id());
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockcare_core::{Aggregate, UserId};
    use stockcare_inventory::{MovementKind, SupplierDetails, SupplyItemDetails};
    use stockcare_purchasing::{OpenRequest, PurchaseRequestCommand};

    fn supplier() -> Supplier {
        Supplier::register(
            SupplierId::new(),
            SupplierDetails {
                name: "Cirúrgica Paulista".to_string(),
                email: "vendas@cirurgica.com".to_string(),
                phone: String::new(),
                cnpj: "11222333000181".to_string(),
            },
        )
        .unwrap()
    }

    fn item(name: &str, supplier_id: SupplierId) -> SupplyItem {
        SupplyItem::register(
            SupplyItemId::new(),
            SupplyItemDetails {
                name: name.to_string(),
                description: String::new(),
                unit_of_measure: "un".to_string(),
                minimum_quantity: 5,
                unit_price_cents: 100,
                barcode: None,
                supplier_id,
            },
        )
        .unwrap()
    }

    fn seeded() -> (InMemoryStockStore, SupplyItem) {
        let store = InMemoryStockStore::new();
        let s = supplier();
        let i = item("Seringa 5ml", s.id());
        store.save_supplier(s).unwrap();
        store.save_supply_item(i.clone()).unwrap();
        (store, i)
    }

    #[test]
    fn insert_assigns_ids_and_filters_by_item_and_kind() {
        let (store, i) = seeded();
        let entry = NewMovement::entry(i.id(), 10, None, UserId::new(), Utc::now()).unwrap();
        let exit = NewMovement::exit(i.id(), 3, None, UserId::new(), Utc::now()).unwrap();
        let a = store.insert_movement(entry).unwrap();
        let b = store.insert_movement(exit).unwrap();
        assert_ne!(a.id, b.id);

        let all = store.find_movements_by_item(i.id(), &MovementFilter::all()).unwrap();
        assert_eq!(all.len(), 2);

        let exits = store.find_movements_by_item(i.id(), &MovementFilter::exits()).unwrap();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].kind, MovementKind::Exit);

        let other = store
            .find_movements_by_item(SupplyItemId::new(), &MovementFilter::all())
            .unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn insert_for_unknown_item_is_an_integrity_error() {
        let store = InMemoryStockStore::new();
        let m = NewMovement::entry(SupplyItemId::new(), 1, None, UserId::new(), Utc::now()).unwrap();
        assert!(matches!(store.insert_movement(m), Err(StoreError::Integrity(_))));
        assert!(store.list_movements(&MovementFilter::all()).unwrap().is_empty());
    }

    #[test]
    fn referenced_records_cannot_be_removed() {
        let (store, i) = seeded();
        assert!(matches!(
            store.remove_supplier(i.supplier_id()),
            Err(StoreError::Integrity(_))
        ));

        let m = NewMovement::entry(i.id(), 1, None, UserId::new(), Utc::now()).unwrap();
        store.insert_movement(m).unwrap();
        assert!(matches!(
            store.remove_supply_item(i.id()),
            Err(StoreError::Integrity(_))
        ));
    }

    #[test]
    fn duplicate_cnpj_is_rejected() {
        let store = InMemoryStockStore::new();
        store.save_supplier(supplier()).unwrap();
        assert!(matches!(
            store.save_supplier(supplier()),
            Err(StoreError::Integrity(_))
        ));
    }

    #[test]
    fn items_are_listed_by_name() {
        let store = InMemoryStockStore::new();
        let s = supplier();
        store.save_supply_item(item("Gaze", s.id())).unwrap_err();
        let sid = s.id();
        store.save_supplier(s).unwrap();
        store.save_supply_item(item("Gaze", sid)).unwrap();
        store.save_supply_item(item("Álcool 70%", sid)).unwrap();
        store.save_supply_item(item("Atadura", sid)).unwrap();

        let names: Vec<String> = store
            .list_supply_items()
            .unwrap()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        assert_eq!(names, vec!["Atadura", "Gaze", "Álcool 70%"]);
    }

    #[test]
    fn purchase_request_save_checks_expected_version() {
        let store = InMemoryPurchaseRequestStore::new();
        let id = PurchaseRequestId::new();
        let mut request = PurchaseRequest::empty(id);
        let events = request
            .handle(&PurchaseRequestCommand::Open(OpenRequest {
                request_id: id,
                item_id: SupplyItemId::new(),
                quantity: 10,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        request.apply(&events[0]);

        store.save(request.clone(), ExpectedVersion::Exact(0)).unwrap();
        assert!(matches!(
            store.save(request.clone(), ExpectedVersion::Exact(0)),
            Err(StoreError::Concurrency(_))
        ));
        store.save(request, ExpectedVersion::Exact(1)).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
