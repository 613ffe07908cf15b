//! Infrastructure layer: stores, ledger services, reports, purchasing integration, config.

pub mod catalog;
pub mod config;
pub mod ledger;
pub mod purchasing;
pub mod reports;
pub mod store;
