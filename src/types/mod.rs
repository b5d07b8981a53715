//! Wire types shared by the transport layer.

pub mod decision;
pub mod request;

pub use decision::{ErrorEvent, RiskDecision};
pub use request::ScoreRequest;
