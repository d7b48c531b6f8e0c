//! This crate builds chat messages from raw server data and lets independently developed extensions attach extra
//! fields to every message through registered decorators, e.g. the EDI attachment audit trail.
pub mod audit;
pub mod config;
pub mod decorator;
pub mod diagnostics;
pub mod error;
pub mod factory;
pub mod message;

pub use error::{DecoratorError, FactoryError, FactoryResult};
pub use factory::MessageFactory;
pub use message::{AuxiliaryField, Message, RawMessageData};
