//! `stockcare-core`: ids, domain errors and the aggregate / entity / event traits
//! the domain crates build on.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{MovementId, PurchaseRequestId, SupplierId, SupplyItemId, UserId};
