//! Purchase request aggregate for restocking supply items.

pub mod request;

pub use request::{
    CancelRequest, MarkReceived, MarkSent, OpenRequest, PurchaseRequest, PurchaseRequestCommand,
    PurchaseRequestEvent, PurchaseRequestStatus, RequestCancelled, RequestOpened,
    RequestReceived, RequestSent,
};
