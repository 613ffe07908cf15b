//! Inventory domain: suppliers, supply items, stock movements and the balance
//! arithmetic derived from them. No storage or IO lives here.

pub mod balance;
pub mod item;
pub mod movement;
pub mod supplier;

pub use balance::{MovementTotals, balance_of, days_remaining, expires_within, is_below_minimum};
pub use item::{SupplyItem, SupplyItemDetails};
pub use movement::{Movement, MovementKind, NewMovement, ensure_positive_quantity};
pub use supplier::{Supplier, SupplierDetails};
