//! The attribute tree: one service, a fixed set of characteristics, each
//! with a read-only user-description descriptor.
//!
//! The tree is built once at startup and handed to the peripheral stack as
//! an [`Application`]; its shape never changes afterwards, only the values
//! behind the handlers do. Access modes are enforced here, ahead of any
//! handler dispatch, so a read-only characteristic refuses writes no matter
//! what its handler would do.

use std::sync::Arc;

use uuid::Uuid;

use gr0g_proto::ble;

use crate::characteristic::{
    FanControl, Handler, HumiditySetpoint, LightSwitch, ScalarGauge, StatusField,
    TemperatureSetpoint,
};
use crate::fault::Fault;
use crate::rest::RestClient;
use crate::rpc::RpcClient;

fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).expect("invalid UUID in gr0g_proto")
}

/// Which operations the stack may route to a characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessModes {
    pub read: bool,
    pub write: bool,
}

impl AccessModes {
    pub const READ: AccessModes = AccessModes {
        read: true,
        write: false,
    };
    pub const READ_WRITE: AccessModes = AccessModes {
        read: true,
        write: true,
    };
}

/// Read-only sub-attribute carrying descriptive metadata
pub struct Descriptor {
    pub uuid: Uuid,
    value: Vec<u8>,
}

impl Descriptor {
    /// Characteristic User Description (0x2901)
    pub fn user_description(text: &str) -> Self {
        Self {
            uuid: parse_uuid(ble::USER_DESCRIPTION_UUID),
            value: text.as_bytes().to_vec(),
        }
    }

    pub fn read(&self) -> Vec<u8> {
        self.value.clone()
    }

    pub fn write(&self, _payload: &[u8]) -> Result<(), Fault> {
        Err(Fault::NotPermitted)
    }
}

/// One exposed attribute: identity, access modes, description and handler
pub struct Characteristic {
    pub uuid: Uuid,
    pub access: AccessModes,
    pub description: &'static str,
    pub descriptors: Vec<Descriptor>,
    handler: Handler,
}

impl Characteristic {
    fn new(uuid: &str, access: AccessModes, description: &'static str, handler: Handler) -> Self {
        Self {
            uuid: parse_uuid(uuid),
            access,
            description,
            descriptors: vec![Descriptor::user_description(description)],
            handler,
        }
    }

    pub async fn read(&self) -> Result<Vec<u8>, Fault> {
        if !self.access.read {
            return Err(Fault::NotPermitted);
        }
        self.handler.read().await
    }

    pub async fn write(&self, payload: &[u8]) -> Result<(), Fault> {
        if !self.access.write {
            return Err(Fault::NotSupported);
        }
        self.handler.write(payload).await
    }

    pub fn fan_state(rest: Arc<RestClient>) -> Self {
        Self::new(
            ble::FAN_STATE_UUID,
            AccessModes::READ_WRITE,
            ble::descriptions::FAN_STATE,
            Handler::Fan(FanControl::new(rest)),
        )
    }

    pub fn light_level(rpc: Arc<RpcClient>) -> Self {
        Self::new(
            ble::LIGHT_LEVEL_UUID,
            AccessModes::READ,
            ble::descriptions::LIGHT_LEVEL,
            Handler::Gauge(ScalarGauge::new(rpc, StatusField::Light)),
        )
    }

    pub fn light_switch(rpc: Arc<RpcClient>) -> Self {
        Self::new(
            ble::LIGHT_SWITCH_UUID,
            AccessModes::READ_WRITE,
            ble::descriptions::LIGHT_SWITCH,
            Handler::LightSwitch(LightSwitch::new(rpc)),
        )
    }

    pub fn temperature(rpc: Arc<RpcClient>) -> Self {
        Self::new(
            ble::TEMPERATURE_UUID,
            AccessModes::READ,
            ble::descriptions::TEMPERATURE,
            Handler::Gauge(ScalarGauge::new(rpc, StatusField::Temperature)),
        )
    }

    pub fn temperature_setpoint(rpc: Arc<RpcClient>) -> Self {
        Self::new(
            ble::TEMPERATURE_SETPOINT_UUID,
            AccessModes::READ_WRITE,
            ble::descriptions::TEMPERATURE_SETPOINT,
            Handler::TemperatureSetpoint(TemperatureSetpoint::new(rpc)),
        )
    }

    pub fn humidity(rpc: Arc<RpcClient>) -> Self {
        Self::new(
            ble::HUMIDITY_UUID,
            AccessModes::READ,
            ble::descriptions::HUMIDITY,
            Handler::Gauge(ScalarGauge::new(rpc, StatusField::Humidity)),
        )
    }

    pub fn humidity_setpoint(rpc: Arc<RpcClient>) -> Self {
        Self::new(
            ble::HUMIDITY_SETPOINT_UUID,
            AccessModes::READ_WRITE,
            ble::descriptions::HUMIDITY_SETPOINT,
            Handler::HumiditySetpoint(HumiditySetpoint::new(rpc)),
        )
    }
}

/// The status service: fixed characteristic order, built once at startup
pub struct Service {
    pub uuid: Uuid,
    pub primary: bool,
    pub characteristics: Vec<Characteristic>,
}

impl Service {
    /// The deployed tree. The fan characteristic stays unmounted until the
    /// machine's fan relay ships; use [`Service::status_with_fan`] then.
    pub fn status(rpc: Arc<RpcClient>) -> Self {
        Self {
            uuid: parse_uuid(ble::SERVICE_UUID),
            primary: true,
            characteristics: vec![
                Characteristic::light_level(rpc.clone()),
                Characteristic::light_switch(rpc.clone()),
                Characteristic::temperature(rpc.clone()),
                Characteristic::temperature_setpoint(rpc.clone()),
                Characteristic::humidity(rpc.clone()),
                Characteristic::humidity_setpoint(rpc),
            ],
        }
    }

    /// The status tree with the fan characteristic mounted first
    pub fn status_with_fan(rest: Arc<RestClient>, rpc: Arc<RpcClient>) -> Self {
        let mut service = Self::status(rpc);
        service
            .characteristics
            .insert(0, Characteristic::fan_state(rest));
        service
    }
}

/// The attribute tree handed to the peripheral stack
pub struct Application {
    pub services: Vec<Service>,
}

impl Application {
    pub fn new(service: Service) -> Self {
        Self {
            services: vec![service],
        }
    }

    pub fn characteristic(&self, uuid: Uuid) -> Option<&Characteristic> {
        self.services
            .iter()
            .flat_map(|service| service.characteristics.iter())
            .find(|characteristic| characteristic.uuid == uuid)
    }
}
