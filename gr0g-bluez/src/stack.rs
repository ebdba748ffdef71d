//! BlueZ implementation of the bridge's peripheral-stack contract.
//!
//! Registration handles are kept for the life of the process; dropping them
//! would unregister the advertisement and application with BlueZ.

use std::collections::BTreeMap;
use std::sync::Arc;

use bluer::adv::Feature;
use bluer::gatt::local::{
    Application as GattApplication, Characteristic as GattCharacteristic, CharacteristicRead,
    CharacteristicWrite, CharacteristicWriteMethod, Descriptor as GattDescriptor, DescriptorRead,
    ReqError, Service as GattService,
};

use gr0g_bridge::advertisement::{Advertisement, AdvertisementKind};
use gr0g_bridge::fault::Fault;
use gr0g_bridge::service::Application;
use gr0g_bridge::stack::{AdapterId, PairingAgent, PeripheralStack};

pub struct BlueZStack {
    session: bluer::Session,
    adapter: Option<bluer::Adapter>,
    adv_handle: Option<bluer::adv::AdvertisementHandle>,
    app_handle: Option<bluer::gatt::local::ApplicationHandle>,
    agent_handle: Option<bluer::agent::AgentHandle>,
}

impl BlueZStack {
    pub async fn new() -> bluer::Result<Self> {
        let session = bluer::Session::new().await?;
        Ok(Self {
            session,
            adapter: None,
            adv_handle: None,
            app_handle: None,
            agent_handle: None,
        })
    }

    fn adapter(&self) -> bluer::Result<&bluer::Adapter> {
        self.adapter.as_ref().ok_or_else(|| bluer::Error {
            kind: bluer::ErrorKind::NotFound,
            message: "adapter not discovered yet".to_string(),
        })
    }
}

impl PeripheralStack for BlueZStack {
    type Error = bluer::Error;

    async fn find_adapter(&mut self) -> Result<Option<AdapterId>, Self::Error> {
        let names = self.session.adapter_names().await?;
        match names.first() {
            Some(name) => {
                self.adapter = Some(self.session.adapter(name)?);
                Ok(Some(AdapterId(name.clone())))
            }
            None => Ok(None),
        }
    }

    async fn power_on(&mut self, _adapter: &AdapterId) -> Result<(), Self::Error> {
        self.adapter()?.set_powered(true).await
    }

    async fn register_advertisement(
        &mut self,
        _adapter: &AdapterId,
        advertisement: Advertisement,
    ) -> Result<(), Self::Error> {
        let le_advertisement = bluer::adv::Advertisement {
            advertisement_type: match advertisement.kind {
                AdvertisementKind::Peripheral => bluer::adv::Type::Peripheral,
                AdvertisementKind::Broadcast => bluer::adv::Type::Broadcast,
            },
            service_uuids: advertisement.service_uuids.iter().copied().collect(),
            manufacturer_data: BTreeMap::from([(
                advertisement.manufacturer_id,
                advertisement.manufacturer_data.clone(),
            )]),
            local_name: Some(advertisement.local_name.clone()),
            system_includes: if advertisement.include_tx_power {
                [Feature::TxPower].into_iter().collect()
            } else {
                Default::default()
            },
            ..Default::default()
        };

        self.adv_handle = Some(self.adapter()?.advertise(le_advertisement).await?);
        Ok(())
    }

    async fn register_application(
        &mut self,
        _adapter: &AdapterId,
        application: Arc<Application>,
    ) -> Result<(), Self::Error> {
        let app = gatt_application(application);
        self.app_handle = Some(self.adapter()?.serve_gatt_application(app).await?);
        Ok(())
    }

    async fn register_agent(&mut self, _agent: &PairingAgent) -> Result<(), Self::Error> {
        // No callbacks registered: BlueZ treats the agent as NoInputNoOutput.
        let handle = self
            .session
            .register_agent(bluer::agent::Agent::default())
            .await?;
        self.agent_handle = Some(handle);
        Ok(())
    }

    async fn request_default_agent(&mut self, _agent: &PairingAgent) -> Result<(), Self::Error> {
        // BlueZ exposes RequestDefaultAgent as a separate call; bluer folds
        // it into registration, so requesting default re-registers.
        self.agent_handle = None;
        let handle = self
            .session
            .register_agent(bluer::agent::Agent {
                request_default: true,
                ..Default::default()
            })
            .await?;
        self.agent_handle = Some(handle);
        Ok(())
    }

    async fn serve(&mut self) -> Result<(), Self::Error> {
        tracing::info!("serving GATT requests until shutdown");
        let _ = tokio::signal::ctrl_c().await;
        Ok(())
    }
}

fn req_error(fault: Fault) -> ReqError {
    match fault {
        Fault::NotPermitted => ReqError::NotPermitted,
        Fault::InvalidValueLength => ReqError::InvalidValueLength,
        Fault::NotSupported => ReqError::NotSupported,
        Fault::InvalidArgs | Fault::Failed => ReqError::Failed,
    }
}

/// Map the bridge's attribute tree onto bluer's GATT application.
///
/// Each read/write closure routes back into the shared tree by UUID, so the
/// bridge keeps exclusive ownership of attribute state while BlueZ holds
/// the callback relationship.
fn gatt_application(application: Arc<Application>) -> GattApplication {
    let mut services = Vec::new();

    for service in &application.services {
        let mut characteristics = Vec::new();

        for characteristic in &service.characteristics {
            let uuid = characteristic.uuid;

            let read = characteristic.access.read.then(|| {
                let application = application.clone();
                CharacteristicRead {
                    read: true,
                    fun: Box::new(move |_req| {
                        let application = application.clone();
                        Box::pin(async move {
                            let characteristic =
                                application.characteristic(uuid).ok_or(ReqError::Failed)?;
                            characteristic.read().await.map_err(req_error)
                        })
                    }),
                    ..Default::default()
                }
            });

            let write = characteristic.access.write.then(|| {
                let application = application.clone();
                CharacteristicWrite {
                    write: true,
                    method: CharacteristicWriteMethod::Fun(Box::new(move |data, _req| {
                        let application = application.clone();
                        Box::pin(async move {
                            let characteristic =
                                application.characteristic(uuid).ok_or(ReqError::Failed)?;
                            characteristic.write(&data).await.map_err(req_error)
                        })
                    })),
                    ..Default::default()
                }
            });

            let descriptors = characteristic
                .descriptors
                .iter()
                .map(|descriptor| {
                    let value = descriptor.read();
                    GattDescriptor {
                        uuid: descriptor.uuid,
                        read: Some(DescriptorRead {
                            read: true,
                            fun: Box::new(move |_req| {
                                let value = value.clone();
                                Box::pin(async move { Ok(value) })
                            }),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }
                })
                .collect();

            characteristics.push(GattCharacteristic {
                uuid,
                read,
                write,
                descriptors,
                ..Default::default()
            });
        }

        services.push(GattService {
            uuid: service.uuid,
            primary: service.primary,
            characteristics,
            ..Default::default()
        });
    }

    GattApplication {
        services,
        ..Default::default()
    }
}
