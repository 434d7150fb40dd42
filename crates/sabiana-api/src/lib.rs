// sabiana-api: Async Rust client for the Sabiana Cloud vent controller API

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::SabianaClient;
pub use error::{Error, ErrorKind};
pub use transport::TransportConfig;
pub use types::{Group, Unit, VentCommand, VentUnit};
