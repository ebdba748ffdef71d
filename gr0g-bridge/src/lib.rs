//! Gr0G Attribute Bridge
//!
//! Exposes the grow chamber's sensor and setpoint values as BLE GATT
//! characteristics and translates every attribute read or write into a call
//! against the control daemon, reached over HTTP (fan) or the local control
//! socket (everything else).
//!
//! The BLE peripheral stack itself is consumed through the
//! [`PeripheralStack`] trait; platform crates implement it against their
//! host stack (see `gr0g-bluez`), tests use an in-process fake.

pub mod advertisement;
pub mod bootstrap;
pub mod characteristic;
pub mod codec;
pub mod fault;
pub mod rest;
pub mod rpc;
pub mod service;
pub mod stack;

pub use advertisement::Advertisement;
pub use bootstrap::{BootstrapError, BootstrapState};
pub use fault::Fault;
pub use rest::RestClient;
pub use rpc::RpcClient;
pub use service::{Application, Characteristic, Service};
pub use stack::{AdapterId, PairingAgent, PeripheralStack};
