//! luxlight: device control core for Luxafor USB status lights.

pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod hooks;
pub mod led;
pub mod protocol;
pub mod reconnect;
pub mod store;
pub mod transport;

pub use error::LuxlightError;
