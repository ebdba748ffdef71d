//! Attribute handlers: one per exposed value.
//!
//! A handler's `read` fetches a fresh backend status, extracts its field and
//! encodes it; on a backend failure it logs and falls back to the last
//! in-memory value (the fan falls back to the `UNKNOWN` sentinel instead).
//! A `write` validates through the codec before any backend call, submits
//! the command, and only updates the in-memory value once the backend
//! accepted it.
//!
//! Per-handler state sits behind its own `tokio::sync::Mutex`, so
//! invocations on one attribute serialize while distinct attributes do not
//! block each other.

use std::sync::Arc;

use tokio::sync::Mutex;

use gr0g_proto::ble::commands;
use gr0g_proto::Status;

use crate::codec::{self, FanState};
use crate::fault::Fault;
use crate::rest::RestClient;
use crate::rpc::RpcClient;

/// Status field a read-only gauge exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusField {
    Light,
    Temperature,
    Humidity,
    TemperatureSetpoint,
    HumiditySetpoint,
}

impl StatusField {
    pub fn name(&self) -> &'static str {
        match self {
            StatusField::Light => "light",
            StatusField::Temperature => "temperature",
            StatusField::Humidity => "humidity",
            StatusField::TemperatureSetpoint => "temperature_setpoint",
            StatusField::HumiditySetpoint => "humidity_setpoint",
        }
    }

    fn extract(&self, status: &Status) -> Option<f64> {
        match self {
            StatusField::Light => status.light,
            StatusField::Temperature => status.temperature,
            StatusField::Humidity => status.humidity,
            StatusField::TemperatureSetpoint => status.temperature_setpoint,
            StatusField::HumiditySetpoint => status.humidity_setpoint,
        }
    }
}

/// Fan state, read and written over the daemon's REST surface
pub struct FanControl {
    rest: Arc<RestClient>,
    value: Mutex<Vec<u8>>,
}

impl FanControl {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self {
            rest,
            value: Mutex::new(vec![0xFF]),
        }
    }

    pub async fn read(&self) -> Vec<u8> {
        let mut value = self.value.lock().await;
        match self.rest.status().await {
            Ok(status) => {
                let fan = status
                    .fan
                    .unwrap_or_else(|| FanState::Unknown.as_str().to_string());
                *value = fan.into_bytes();
            }
            Err(err) => {
                tracing::error!("error getting status: {err}");
                *value = FanState::Unknown.as_bytes().to_vec();
            }
        }
        tracing::debug!("fan read: {:?}", value);
        value.clone()
    }

    pub async fn write(&self, payload: &[u8]) -> Result<(), Fault> {
        tracing::debug!("fan write: {:?}", payload);
        let state = FanState::from_bytes(payload).inspect_err(|_| {
            tracing::info!("invalid fan state written: {:?}", payload);
        })?;

        tracing::info!("writing {} to fan", state.command());
        if let Err(err) = self.rest.send_cmd(state.command()).await {
            tracing::error!("error updating fan state: {err}");
            return Err(Fault::Failed);
        }

        *self.value.lock().await = payload.to_vec();
        Ok(())
    }
}

/// Read-only scalar fetched from the daemon's status snapshot
pub struct ScalarGauge {
    rpc: Arc<RpcClient>,
    field: StatusField,
    value: Mutex<Vec<u8>>,
}

impl ScalarGauge {
    pub fn new(rpc: Arc<RpcClient>, field: StatusField) -> Self {
        Self {
            rpc,
            field,
            value: Mutex::new(Vec::new()),
        }
    }

    pub async fn read(&self) -> Vec<u8> {
        let mut value = self.value.lock().await;
        match self.rpc.status().await {
            Ok(status) => match self.field.extract(&status) {
                Some(v) => *value = codec::encode_f64(v).to_vec(),
                None => tracing::error!("status snapshot missing {}", self.field.name()),
            },
            Err(err) => tracing::error!("error getting status: {err}"),
        }
        tracing::info!("{} read: {:?}", self.field.name(), value);
        value.clone()
    }
}

/// Grow light switch: reads the last accepted state, writes a tri-state
/// command (0, 1 or 2)
pub struct LightSwitch {
    rpc: Arc<RpcClient>,
    last: Mutex<u8>,
}

impl LightSwitch {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self {
            rpc,
            last: Mutex::new(0),
        }
    }

    pub async fn read(&self) -> Vec<u8> {
        let last = *self.last.lock().await;
        tracing::info!("light switch read: {last}");
        vec![last]
    }

    pub async fn write(&self, payload: &[u8]) -> Result<(), Fault> {
        tracing::info!("light switch write: {:?}", payload);
        let state = codec::decode_tri_state(payload).inspect_err(|_| {
            tracing::info!("invalid light state written: {:?}", payload);
        })?;

        tracing::info!("writing {state} to light");
        let args = serde_json::json!({ "state": state.to_string() });
        match self.rpc.cmd(commands::SET_LIGHT, args).await {
            Ok(result) => tracing::info!("light switch result: {result}"),
            Err(err) => {
                tracing::error!("error updating machine state: {err}");
                return Err(Fault::Failed);
            }
        }

        *self.last.lock().await = state;
        Ok(())
    }
}

/// Temperature setpoint: 8-byte double in both directions
pub struct TemperatureSetpoint {
    rpc: Arc<RpcClient>,
    value: Mutex<Vec<u8>>,
}

impl TemperatureSetpoint {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self {
            rpc,
            value: Mutex::new(Vec::new()),
        }
    }

    pub async fn read(&self) -> Vec<u8> {
        let mut value = self.value.lock().await;
        match self.rpc.status().await {
            Ok(status) => match StatusField::TemperatureSetpoint.extract(&status) {
                Some(v) => *value = codec::encode_f64(v).to_vec(),
                None => tracing::error!("status snapshot missing temperature_setpoint"),
            },
            Err(err) => tracing::error!("error getting status: {err}"),
        }
        tracing::info!("temperature setpoint read: {:?}", value);
        value.clone()
    }

    pub async fn write(&self, payload: &[u8]) -> Result<(), Fault> {
        tracing::info!("temperature setpoint write: {:?}", payload);
        let setpoint = codec::decode_f64(payload)?;

        tracing::info!("writing {setpoint} to temperature_setpoint");
        let args = serde_json::json!({ "value": setpoint });
        match self.rpc.cmd(commands::TEMPERATURE_SETPOINT, args).await {
            Ok(result) => tracing::info!("temperature setpoint result: {result}"),
            Err(err) => {
                tracing::error!("error updating machine state: {err}");
                return Err(Fault::Failed);
            }
        }

        *self.value.lock().await = payload.to_vec();
        Ok(())
    }
}

/// Humidity setpoint: reads an 8-byte double, writes a 4-byte integer.
///
/// The width mismatch mirrors what the control daemon currently accepts;
/// see DESIGN.md before changing either side.
pub struct HumiditySetpoint {
    rpc: Arc<RpcClient>,
    value: Mutex<Vec<u8>>,
}

impl HumiditySetpoint {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self {
            rpc,
            value: Mutex::new(Vec::new()),
        }
    }

    pub async fn read(&self) -> Vec<u8> {
        let mut value = self.value.lock().await;
        match self.rpc.status().await {
            Ok(status) => match StatusField::HumiditySetpoint.extract(&status) {
                Some(v) => *value = codec::encode_f64(v).to_vec(),
                None => tracing::error!("status snapshot missing humidity_setpoint"),
            },
            Err(err) => tracing::error!("error getting status: {err}"),
        }
        tracing::info!("humidity setpoint read: {:?}", value);
        value.clone()
    }

    pub async fn write(&self, payload: &[u8]) -> Result<(), Fault> {
        tracing::info!("humidity setpoint write: {:?}", payload);
        let setpoint = codec::decode_i32(payload)?;

        tracing::info!("writing {setpoint} to humidity_setpoint");
        let args = serde_json::json!({ "value": setpoint });
        match self.rpc.cmd(commands::HUMIDITY_SETPOINT, args).await {
            Ok(result) => tracing::info!("humidity setpoint result: {result}"),
            Err(err) => {
                tracing::error!("error updating machine state: {err}");
                return Err(Fault::Failed);
            }
        }

        *self.value.lock().await = payload.to_vec();
        Ok(())
    }
}

/// The fixed set of handlers an attribute can dispatch to
pub enum Handler {
    Fan(FanControl),
    Gauge(ScalarGauge),
    LightSwitch(LightSwitch),
    TemperatureSetpoint(TemperatureSetpoint),
    HumiditySetpoint(HumiditySetpoint),
}

impl Handler {
    pub async fn read(&self) -> Result<Vec<u8>, Fault> {
        Ok(match self {
            Handler::Fan(h) => h.read().await,
            Handler::Gauge(h) => h.read().await,
            Handler::LightSwitch(h) => h.read().await,
            Handler::TemperatureSetpoint(h) => h.read().await,
            Handler::HumiditySetpoint(h) => h.read().await,
        })
    }

    pub async fn write(&self, payload: &[u8]) -> Result<(), Fault> {
        match self {
            Handler::Fan(h) => h.write(payload).await,
            Handler::Gauge(_) => Err(Fault::NotSupported),
            Handler::LightSwitch(h) => h.write(payload).await,
            Handler::TemperatureSetpoint(h) => h.write(payload).await,
            Handler::HumiditySetpoint(h) => h.write(payload).await,
        }
    }
}
