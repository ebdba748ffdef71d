//! Startup registration sequence.
//!
//! Linear state machine, no branching back-edges:
//! adapter discovery and power-on, then advertisement, application and
//! agent registration in fixed order. Any failure before `Running` is
//! terminal: it is logged at error severity and returned, the caller exits.
//! Nothing already registered is rolled back.

use std::sync::Arc;

use crate::advertisement::Advertisement;
use crate::service::Application;
use crate::stack::{AdapterId, PairingAgent, PeripheralStack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    AdapterFound,
    AdapterPowered,
    AdvertisementRegistering,
    AdvertisementRegistered,
    ApplicationRegistering,
    ApplicationRegistered,
    AgentRegistered,
    DefaultAgentRequested,
    Running,
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("no usable Bluetooth adapter found")]
    NoAdapter,
    #[error("adapter discovery failed: {0}")]
    Discovery(String),
    #[error("failed to power adapter {0}: {1}")]
    Power(AdapterId, String),
    #[error("failed to register advertisement: {0}")]
    Advertisement(String),
    #[error("failed to register application: {0}")]
    Application(String),
    #[error("failed to register pairing agent: {0}")]
    Agent(String),
    #[error("failed to request default agent: {0}")]
    DefaultAgent(String),
}

/// Walk the registration sequence to `Running`.
///
/// Returns the terminal [`BootstrapState::Running`] on success; the caller
/// then parks on [`PeripheralStack::serve`]. On failure the already-taken
/// registration steps stay in place, matching the stack's own behavior when
/// a registering process dies.
pub async fn run<S: PeripheralStack>(
    stack: &mut S,
    advertisement: Advertisement,
    application: Arc<Application>,
    agent: &PairingAgent,
) -> Result<BootstrapState, BootstrapError> {
    let adapter = match stack.find_adapter().await {
        Ok(Some(adapter)) => adapter,
        Ok(None) => {
            tracing::error!("no Bluetooth adapter found");
            return Err(BootstrapError::NoAdapter);
        }
        Err(err) => {
            tracing::error!("adapter discovery failed: {err}");
            return Err(BootstrapError::Discovery(err.to_string()));
        }
    };
    let mut state = BootstrapState::AdapterFound;
    tracing::info!(?state, %adapter, "using adapter");

    if let Err(err) = stack.power_on(&adapter).await {
        tracing::error!("failed to power adapter {adapter}: {err}");
        return Err(BootstrapError::Power(adapter, err.to_string()));
    }
    state = BootstrapState::AdapterPowered;
    tracing::info!(?state, "adapter powered");

    state = BootstrapState::AdvertisementRegistering;
    tracing::info!(?state, "registering advertisement");
    if let Err(err) = stack.register_advertisement(&adapter, advertisement).await {
        tracing::error!("failed to register advertisement: {err}");
        return Err(BootstrapError::Advertisement(err.to_string()));
    }
    state = BootstrapState::AdvertisementRegistered;
    tracing::info!(?state, "advertisement registered");

    state = BootstrapState::ApplicationRegistering;
    tracing::info!(?state, "registering GATT application");
    if let Err(err) = stack.register_application(&adapter, application).await {
        tracing::error!("failed to register application: {err}");
        return Err(BootstrapError::Application(err.to_string()));
    }
    state = BootstrapState::ApplicationRegistered;
    tracing::info!(?state, "GATT application registered");

    if let Err(err) = stack.register_agent(agent).await {
        tracing::error!("failed to register pairing agent: {err}");
        return Err(BootstrapError::Agent(err.to_string()));
    }
    state = BootstrapState::AgentRegistered;
    tracing::info!(?state, "pairing agent registered");

    if let Err(err) = stack.request_default_agent(agent).await {
        tracing::error!("failed to request default agent: {err}");
        return Err(BootstrapError::DefaultAgent(err.to_string()));
    }
    state = BootstrapState::DefaultAgentRequested;
    tracing::info!(?state, "default agent requested");

    state = BootstrapState::Running;
    tracing::info!(?state, "bridge is reachable");
    Ok(state)
}
