//! The advertisement descriptor broadcast while the bridge runs.
//!
//! Pure data; it is handed to the peripheral stack exactly once during
//! bootstrap.

use uuid::Uuid;

use gr0g_proto::ble;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisementKind {
    Peripheral,
    Broadcast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub kind: AdvertisementKind,
    pub manufacturer_id: u16,
    pub manufacturer_data: Vec<u8>,
    pub service_uuids: Vec<Uuid>,
    pub local_name: String,
    pub include_tx_power: bool,
}

impl Advertisement {
    /// The Gr0G broadcast payload
    pub fn gr0g() -> Self {
        Self {
            kind: AdvertisementKind::Peripheral,
            manufacturer_id: ble::MANUFACTURER_ID,
            manufacturer_data: ble::MANUFACTURER_DATA.to_vec(),
            service_uuids: vec![Uuid::parse_str(ble::SERVICE_UUID)
                .expect("invalid UUID in gr0g_proto")],
            local_name: ble::LOCAL_NAME.to_string(),
            include_tx_power: true,
        }
    }
}
