//! Persistence boundary for the stock ledger, catalog and purchasing.
//!
//! This module defines infrastructure-facing abstractions for storing movements,
//! catalog records and purchase requests without making any storage assumptions.
//! The in-memory implementations back tests and local development.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryPurchaseRequestStore, InMemoryStockStore};
pub use r#trait::{
    CatalogStore, DateRange, MovementFilter, MovementStore, PurchaseRequestStore, StoreError,
};
