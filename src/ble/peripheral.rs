use embassy_futures::select::{Either, select};
use nrf_sdc::Error;
use nrf_sdc::SoftdeviceController;
use trouble_host::BleHostError;
use trouble_host::att::AttErrorCode;
use trouble_host::gatt::{GattConnection, GattConnectionEvent, GattEvent};
use trouble_host::prelude::{
    AdStructure, Advertisement, AdvertisementParameters, BR_EDR_NOT_SUPPORTED, DefaultPacketPool,
    LE_GENERAL_DISCOVERABLE, Peripheral, PhyKind, TxPower,
};

use crate::ble::ble_server::{MIDI_SERVICE_UUID, Server};
use crate::config::BLE_NAME;
use crate::settings::SETTINGS;
use crate::{BLE_CONNECTED, MIDI_OUTBOX, delay_ms};

/// Advertise, serve one central at a time, repeat.
pub async fn serve(
    peripheral: &mut Peripheral<'_, SoftdeviceController<'static>, DefaultPacketPool>,
    server: &Server<'_>,
) -> ! {
    let connected = BLE_CONNECTED.sender();
    connected.send(false);

    loop {
        // notes played while nobody listens are dropped
        let advertised = match select(advertise(peripheral, server), discard_midi()).await {
            Either::First(result) => result,
            Either::Second(never) => match never {},
        };

        match advertised {
            Ok(conn) => {
                info!("[ble] central connected");
                MIDI_OUTBOX.clear();
                connected.send(true);

                let _ = select(
                    gatt_events_handler(&conn, server),
                    midi_service_task(&conn, server),
                )
                .await;

                connected.send(false);
                warn!("[ble] session ended, advertising");
            }
            Err(e) => {
                error!("[ble] advertise error: {:?}", e);
                delay_ms(1000).await;
            }
        }
    }
}

async fn discard_midi() -> ! {
    loop {
        let _ = MIDI_OUTBOX.receive().await;
    }
}

/// Advertiser task
async fn advertise<'a, 'b>(
    peripheral: &mut Peripheral<'a, SoftdeviceController<'static>, DefaultPacketPool>,
    server: &'b Server<'_>,
) -> Result<GattConnection<'a, 'b, DefaultPacketPool>, BleHostError<Error>> {
    let mut advertiser_data = [0; 31];
    let mut scan_data = [0; 31];

    AdStructure::encode_slice(
        &[
            AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
            AdStructure::CompleteLocalName(BLE_NAME.as_bytes()),
        ],
        &mut advertiser_data[..],
    )?;

    AdStructure::encode_slice(
        &[AdStructure::ServiceUuids128(&[MIDI_SERVICE_UUID])],
        &mut scan_data[..],
    )?;

    let ad_params = AdvertisementParameters {
        primary_phy: PhyKind::Le1M,
        secondary_phy: PhyKind::Le1M,
        tx_power: TxPower::ZerodBm,
        ..Default::default()
    };

    #[cfg(feature = "debug")]
    info!("[ble] advertising, waiting for connection...");

    let advertiser = peripheral
        .advertise(
            &ad_params,
            Advertisement::ConnectableScannableUndirected {
                adv_data: &advertiser_data[..],
                scan_data: &scan_data[..],
            },
        )
        .await?;

    let gatt_conn = advertiser.accept().await?.with_attribute_server(server)?;

    info!("[ble] connection established");

    Ok(gatt_conn)
}

/// Gatt event handler task
async fn gatt_events_handler<'stack, 'server>(
    conn: &GattConnection<'stack, 'server, DefaultPacketPool>,
    server: &'server Server<'_>,
) {
    let reason = loop {
        match conn.next().await {
            GattConnectionEvent::Disconnected { reason } => break reason,
            GattConnectionEvent::Gatt { event } => {
                // settings write accepted, value to write back once replied
                let mut write_back = None;

                let rejected = match &event {
                    GattEvent::Write(write) => match server.setting(write.handle()) {
                        Some((setting, characteristic)) => {
                            match SETTINGS.write(setting, write.data()) {
                                Ok(stored) => {
                                    write_back = Some((characteristic, stored));
                                    None
                                }
                                Err(e) => {
                                    warn!("[gatt] {:?} write rejected: {:?}", setting, e);
                                    Some(AttErrorCode::INVALID_ATTRIBUTE_VALUE_LENGTH)
                                }
                            }
                        }
                        None => {
                            #[cfg(feature = "debug")]
                            info!("[gatt] write to {}: {:?}", write.handle(), write.data());
                            None
                        }
                    },
                    _ => None,
                };

                let reply = match rejected {
                    Some(code) => event.reject(code),
                    None => event.accept(),
                };
                match reply {
                    Ok(reply) => reply.send().await,
                    Err(e) => error!("[gatt] error sending response: {:?}", e),
                };

                // reads report the clamped value
                if let Some((characteristic, stored)) = write_back {
                    if let Err(e) = server.set(&characteristic, &stored) {
                        error!("[gatt] write back failed: {:?}", e);
                    }
                }
            }
            _ => {} // ignore other Gatt connection events
        }
    };

    info!("[gatt] disconnected: {:?}", reason);
}

/// Drain the MIDI outbox into notifications
async fn midi_service_task<'stack, 'server>(
    conn: &GattConnection<'stack, 'server, DefaultPacketPool>,
    server: &'server Server<'_>,
) {
    let io = server.midi_service.io;

    loop {
        let packet = MIDI_OUTBOX.receive().await;

        match io.notify(conn, &packet).await {
            Ok(_) => {
                #[cfg(feature = "debug")]
                info!("[notify] midi {:?}", packet);
            }
            Err(e) => {
                info!("[notify] midi error: {:?}", e);
                break;
            }
        }
    }
}
