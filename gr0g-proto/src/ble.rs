//! BLE GATT protocol constants for the Gr0G grow chamber
//!
//! This module defines the service and characteristic UUIDs the bridge
//! exposes, the user-description text attached to each characteristic, the
//! advertisement payload, and the command names the control daemon accepts.

/// Status Service UUID
pub const SERVICE_UUID: &str = "00001802-0000-1000-8000-00805f9b38fb";

/// Fan state characteristic UUID (read/write, currently unmounted)
pub const FAN_STATE_UUID: &str = "304cf226-411e-11eb-b378-0242ac130002";

/// Light level characteristic UUID (read)
pub const LIGHT_LEVEL_UUID: &str = "00002a06-0000-1000-8000-00805f9b34fe";

/// Light switch characteristic UUID (read/write)
pub const LIGHT_SWITCH_UUID: &str = "00002a06-0000-1000-8000-00805f9b35fe";

/// Temperature characteristic UUID (read)
pub const TEMPERATURE_UUID: &str = "00002a06-0000-1000-8000-00805f9b34fc";

/// Temperature setpoint characteristic UUID (read/write)
pub const TEMPERATURE_SETPOINT_UUID: &str = "00002a06-0000-1000-8000-00805f9b36fc";

/// Humidity characteristic UUID (read)
pub const HUMIDITY_UUID: &str = "00002a06-0000-1000-8000-00805f9b34fd";

/// Humidity setpoint characteristic UUID (read/write)
pub const HUMIDITY_SETPOINT_UUID: &str = "00002a06-0000-1000-8000-00805f9b35fd";

/// Characteristic User Description descriptor UUID (Bluetooth assigned, 0x2901)
pub const USER_DESCRIPTION_UUID: &str = "00002901-0000-1000-8000-00805f9b34fb";

/// User-description text per characteristic
pub mod descriptions {
    pub const FAN_STATE: &str = "Get/set machine fan state {'ON', 'OFF', 'UNKNOWN'}";
    pub const LIGHT_LEVEL: &str = "Get light level";
    pub const LIGHT_SWITCH: &str = "Set light light state can be `on` or `off`";
    pub const TEMPERATURE: &str = "Get temperature";
    pub const TEMPERATURE_SETPOINT: &str = "Get/set temperature setpoint";
    pub const HUMIDITY: &str = "Get humidity";
    pub const HUMIDITY_SETPOINT: &str = "Get/set humidity setpoint";
}

/// Local name broadcast in the advertisement
pub const LOCAL_NAME: &str = "Gr0G";

/// Manufacturer id used in the advertisement payload
pub const MANUFACTURER_ID: u16 = 0xFFFF;

/// Manufacturer payload bytes ("pt")
pub const MANUFACTURER_DATA: [u8; 2] = [0x70, 0x74];

/// Object path the pairing agent registers under
pub const AGENT_PATH: &str = "/gr0g";

/// Command names the control daemon accepts
pub mod commands {
    /// Switch the grow light; takes a `state` of "0", "1" or "2"
    pub const SET_LIGHT: &str = "setlight";

    /// Update the temperature setpoint; takes a float `value`
    pub const TEMPERATURE_SETPOINT: &str = "temperature_setpoint";

    /// Update the humidity setpoint; takes an integer `value`
    pub const HUMIDITY_SETPOINT: &str = "humidity_setpoint";

    /// RPC method returning the machine status snapshot
    pub const STATUS: &str = "status";
}
