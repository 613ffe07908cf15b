use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockcare_core::{DomainError, DomainResult, Entity, MovementId, SupplyItemId, UserId};

/// Direction of a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Inbound stock (entrada).
    Entry,
    /// Outbound stock (saida).
    Exit,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Entry => "entry",
            MovementKind::Exit => "exit",
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of stock entering or leaving for one supply item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub kind: MovementKind,
    pub item_id: SupplyItemId,
    /// Always positive; direction comes from `kind`.
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
    pub author: UserId,
    /// Entries only.
    pub expiry_date: Option<NaiveDate>,
    /// Exits only.
    pub destination: Option<String>,
}

impl Movement {
    /// Quantity with sign applied: positive for entries, negative for exits.
    pub fn signed_quantity(&self) -> i64 {
        match self.kind {
            MovementKind::Entry => self.quantity,
            MovementKind::Exit => -self.quantity,
        }
    }
}

impl Entity for Movement {
    type Id = MovementId;

    fn id(&self) -> MovementId {
        self.id
    }
}

/// A validated movement that has not been persisted yet (no id assigned).
///
/// Only constructible through [`NewMovement::entry`] / [`NewMovement::exit`], so
/// kind-specific fields can't be mixed up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    kind: MovementKind,
    item_id: SupplyItemId,
    quantity: i64,
    occurred_at: DateTime<Utc>,
    author: UserId,
    expiry_date: Option<NaiveDate>,
    destination: Option<String>,
}

impl NewMovement {
    pub fn entry(
        item_id: SupplyItemId,
        quantity: i64,
        expiry_date: Option<NaiveDate>,
        author: UserId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        ensure_positive_quantity(quantity)?;
        Ok(Self {
            kind: MovementKind::Entry,
            item_id,
            quantity,
            occurred_at,
            author,
            expiry_date,
            destination: None,
        })
    }

    pub fn exit(
        item_id: SupplyItemId,
        quantity: i64,
        destination: Option<String>,
        author: UserId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        ensure_positive_quantity(quantity)?;
        let destination = destination
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok(Self {
            kind: MovementKind::Exit,
            item_id,
            quantity,
            occurred_at,
            author,
            expiry_date: None,
            destination,
        })
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn item_id(&self) -> SupplyItemId {
        self.item_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Assign an identity, producing the record a store persists.
    pub fn into_movement(self, id: MovementId) -> Movement {
        Movement {
            id,
            kind: self.kind,
            item_id: self.item_id,
            quantity: self.quantity,
            occurred_at: self.occurred_at,
            author: self.author,
            expiry_date: self.expiry_date,
            destination: self.destination,
        }
    }
}

/// Movement quantities must be strictly positive.
pub fn ensure_positive_quantity(quantity: i64) -> DomainResult<i64> {
    if quantity <= 0 {
        return Err(DomainError::validation(format!(
            "quantity must be positive (got {quantity})"
        )));
    }
    Ok(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_keeps_expiry_and_has_no_destination() {
        let expiry = NaiveDate::from_ymd_opt(2027, 3, 1).unwrap();
        let m = NewMovement::entry(SupplyItemId::new(), 10, Some(expiry), UserId::new(), Utc::now())
            .unwrap()
            .into_movement(MovementId::new());
        assert_eq!(m.kind, MovementKind::Entry);
        assert_eq!(m.expiry_date, Some(expiry));
        assert_eq!(m.destination, None);
        assert_eq!(m.signed_quantity(), 10);
    }

    #[test]
    fn exit_trims_destination_and_negates_quantity() {
        let m = NewMovement::exit(
            SupplyItemId::new(),
            4,
            Some("  UTI Adulto ".to_string()),
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
        .into_movement(MovementId::new());
        assert_eq!(m.destination.as_deref(), Some("UTI Adulto"));
        assert_eq!(m.expiry_date, None);
        assert_eq!(m.signed_quantity(), -4);
    }

    #[test]
    fn blank_destination_becomes_none() {
        let m = NewMovement::exit(SupplyItemId::new(), 1, Some("   ".into()), UserId::new(), Utc::now())
            .unwrap();
        assert_eq!(m.into_movement(MovementId::new()).destination, None);
    }

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        for q in [0, -5] {
            assert!(matches!(
                NewMovement::entry(SupplyItemId::new(), q, None, UserId::new(), Utc::now()),
                Err(DomainError::Validation(_))
            ));
            assert!(NewMovement::exit(SupplyItemId::new(), q, None, UserId::new(), Utc::now()).is_err());
        }
    }
}
