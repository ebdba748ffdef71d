//! Surface of the host BLE peripheral stack the bridge drives at startup.
//!
//! Platform crates implement [`PeripheralStack`] against their stack (see
//! `gr0g-bluez`); tests use an in-process fake. Every registration call is
//! result-bearing, so the bootstrap sequencer can fail fast without
//! callback plumbing.

use std::sync::Arc;

use crate::advertisement::Advertisement;
use crate::service::Application;

/// Identifier of a host Bluetooth adapter (e.g. "hci0")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterId(pub String);

impl std::fmt::Display for AdapterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pairing capability the agent announces to the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCapability {
    NoInputNoOutput,
}

impl IoCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            IoCapability::NoInputNoOutput => "NoInputNoOutput",
        }
    }
}

/// Authorization agent the bridge exposes to the stack.
///
/// Present so that pairing succeeds without user interaction; it carries no
/// behavior of its own.
#[derive(Debug, Clone)]
pub struct PairingAgent {
    pub path: String,
    pub capability: IoCapability,
}

impl Default for PairingAgent {
    fn default() -> Self {
        Self {
            path: gr0g_proto::ble::AGENT_PATH.to_string(),
            capability: IoCapability::NoInputNoOutput,
        }
    }
}

/// Host BLE peripheral stack as consumed by the bootstrap sequencer.
///
/// Once `register_application` has been called the stack holds a non-owning
/// reference to the tree and routes remote read/write requests through
/// [`Application::characteristic`]; the bridge keeps ownership of every
/// attribute's state. `serve` parks on the stack's event loop until process
/// termination.
#[allow(async_fn_in_trait)]
pub trait PeripheralStack {
    type Error: std::fmt::Display;

    async fn find_adapter(&mut self) -> Result<Option<AdapterId>, Self::Error>;

    async fn power_on(&mut self, adapter: &AdapterId) -> Result<(), Self::Error>;

    async fn register_advertisement(
        &mut self,
        adapter: &AdapterId,
        advertisement: Advertisement,
    ) -> Result<(), Self::Error>;

    async fn register_application(
        &mut self,
        adapter: &AdapterId,
        application: Arc<Application>,
    ) -> Result<(), Self::Error>;

    async fn register_agent(&mut self, agent: &PairingAgent) -> Result<(), Self::Error>;

    async fn request_default_agent(&mut self, agent: &PairingAgent) -> Result<(), Self::Error>;

    async fn serve(&mut self) -> Result<(), Self::Error>;
}
