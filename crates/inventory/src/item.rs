use serde::{Deserialize, Serialize};

use stockcare_core::{DomainError, DomainResult, Entity, SupplierId, SupplyItemId};

/// Supply item (insumo): the unit of stock aggregation.
///
/// Quantity on hand is never stored here; it is always derived from the
/// item's movement history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyItem {
    id: SupplyItemId,
    name: String,
    description: String,
    unit_of_measure: String,
    minimum_quantity: i64,
    unit_price_cents: i64,
    barcode: Option<String>,
    supplier_id: SupplierId,
}

/// Editable supply item attributes, used for both registration and revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyItemDetails {
    pub name: String,
    pub description: String,
    pub unit_of_measure: String,
    pub minimum_quantity: i64,
    pub unit_price_cents: i64,
    pub barcode: Option<String>,
    pub supplier_id: SupplierId,
}

impl SupplyItem {
    pub fn register(id: SupplyItemId, details: SupplyItemDetails) -> DomainResult<Self> {
        let d = normalize(details)?;
        Ok(Self {
            id,
            name: d.name,
            description: d.description,
            unit_of_measure: d.unit_of_measure,
            minimum_quantity: d.minimum_quantity,
            unit_price_cents: d.unit_price_cents,
            barcode: d.barcode,
            supplier_id: d.supplier_id,
        })
    }

    /// Replace all editable attributes; identity (and thus history) is preserved.
    pub fn revise(&mut self, details: SupplyItemDetails) -> DomainResult<()> {
        let d = normalize(details)?;
        self.name = d.name;
        self.description = d.description;
        self.unit_of_measure = d.unit_of_measure;
        self.minimum_quantity = d.minimum_quantity;
        self.unit_price_cents = d.unit_price_cents;
        self.barcode = d.barcode;
        self.supplier_id = d.supplier_id;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Unit of measure, upper-cased on registration (e.g. "CX", "UN", "ML").
    pub fn unit_of_measure(&self) -> &str {
        &self.unit_of_measure
    }

    pub fn minimum_quantity(&self) -> i64 {
        self.minimum_quantity
    }

    pub fn unit_price_cents(&self) -> i64 {
        self.unit_price_cents
    }

    pub fn barcode(&self) -> Option<&str> {
        self.barcode.as_deref()
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }
}

impl Entity for SupplyItem {
    type Id = SupplyItemId;

    fn id(&self) -> SupplyItemId {
        self.id
    }
}

fn normalize(details: SupplyItemDetails) -> DomainResult<SupplyItemDetails> {
    let name = details.name.trim().to_string();
    if name.is_empty() {
        return Err(DomainError::validation("item name cannot be empty"));
    }

    let unit_of_measure = details.unit_of_measure.trim().to_uppercase();
    if unit_of_measure.is_empty() {
        return Err(DomainError::validation("unit of measure cannot be empty"));
    }

    if details.minimum_quantity < 0 {
        return Err(DomainError::validation("minimum quantity cannot be negative"));
    }

    if details.unit_price_cents < 0 {
        return Err(DomainError::validation("unit price cannot be negative"));
    }

    let barcode = details
        .barcode
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty());

    Ok(SupplyItemDetails {
        name,
        description: details.description.trim().to_string(),
        unit_of_measure,
        minimum_quantity: details.minimum_quantity,
        unit_price_cents: details.unit_price_cents,
        barcode,
        supplier_id: details.supplier_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> SupplyItemDetails {
        SupplyItemDetails {
            name: "Luva de procedimento M".to_string(),
            description: "Caixa com 100 unidades".to_string(),
            unit_of_measure: " cx ".to_string(),
            minimum_quantity: 20,
            unit_price_cents: 3_990,
            barcode: Some("  ".to_string()),
            supplier_id: SupplierId::new(),
        }
    }

    #[test]
    fn register_uppercases_unit_and_drops_blank_barcode() {
        let item = SupplyItem::register(SupplyItemId::new(), details()).unwrap();
        assert_eq!(item.unit_of_measure(), "CX");
        assert_eq!(item.barcode(), None);
        assert_eq!(item.minimum_quantity(), 20);
    }

    #[test]
    fn negative_minimum_is_rejected() {
        let mut d = details();
        d.minimum_quantity = -1;
        assert!(matches!(
            SupplyItem::register(SupplyItemId::new(), d),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn zero_minimum_is_allowed() {
        let mut d = details();
        d.minimum_quantity = 0;
        assert!(SupplyItem::register(SupplyItemId::new(), d).is_ok());
    }

    #[test]
    fn revise_validates_before_mutating() {
        let mut item = SupplyItem::register(SupplyItemId::new(), details()).unwrap();
        let before = item.clone();
        let mut d = details();
        d.unit_of_measure = String::new();
        assert!(item.revise(d).is_err());
        assert_eq!(item, before);
    }
}
