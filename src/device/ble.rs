//! Bluetooth LE transport backed by btleplug.

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, Characteristic, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter,
    WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{info, warn};
use uuid::Uuid;

use crate::protocol::DEVICE_NAME_FRAGMENT;

use super::error::{DeviceError, TransportError};
use super::ports::{Frame, Transport};

const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Capacity of the frame channel between the notification stream and the
/// session controller. Tests emit a handful of frames per second at most.
const NOTIFICATION_BUFFER: usize = 32;

/// A connected BACtrack peripheral.
pub struct BleTransport {
    peripheral: Peripheral,
    device_name: Option<String>,
    forwarder: Option<JoinHandle<()>>,
}

impl BleTransport {
    /// Discover and connect to a breathalyzer.
    ///
    /// With no address, the first peripheral whose advertised name contains
    /// [`DEVICE_NAME_FRAGMENT`] (case-insensitive) is selected; with one,
    /// the address is matched instead. Fails with
    /// [`DeviceError::DeviceNotFound`] when the scan window closes without a
    /// match.
    pub async fn connect(
        address: Option<&str>,
        scan_timeout: Duration,
    ) -> Result<Self, DeviceError> {
        let manager = Manager::new().await.map_err(TransportError::from)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(TransportError::from)?
            .into_iter()
            .next()
            .ok_or(TransportError::NoAdapter)?;

        adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(TransportError::from)?;
        let found = Self::await_match(&adapter, address, scan_timeout).await;
        if let Err(err) = adapter.stop_scan().await {
            warn!(error = %err, "failed to stop the discovery scan");
        }
        let (peripheral, device_name) = found?;

        info!(
            device = device_name.as_deref().unwrap_or("<unnamed>"),
            address = %peripheral.address(),
            "connecting"
        );
        peripheral.connect().await.map_err(TransportError::from)?;
        peripheral
            .discover_services()
            .await
            .map_err(TransportError::from)?;

        Ok(Self {
            peripheral,
            device_name,
            forwarder: None,
        })
    }

    async fn await_match(
        adapter: &Adapter,
        address: Option<&str>,
        scan_timeout: Duration,
    ) -> Result<(Peripheral, Option<String>), DeviceError> {
        let deadline = Instant::now() + scan_timeout;
        loop {
            for peripheral in adapter.peripherals().await.map_err(TransportError::from)? {
                let Some(properties) = peripheral
                    .properties()
                    .await
                    .map_err(TransportError::from)?
                else {
                    continue;
                };
                if Self::matches(&properties, address) {
                    return Ok((peripheral, properties.local_name));
                }
            }
            if Instant::now() >= deadline {
                return Err(DeviceError::DeviceNotFound);
            }
            sleep(SCAN_POLL_INTERVAL).await;
        }
    }

    fn matches(properties: &PeripheralProperties, address: Option<&str>) -> bool {
        match address {
            Some(address) => properties.address.to_string().eq_ignore_ascii_case(address),
            None => properties
                .local_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(DEVICE_NAME_FRAGMENT)),
        }
    }

    /// Bluetooth address of the connected device.
    pub fn address(&self) -> String {
        self.peripheral.address().to_string()
    }

    /// Advertised name captured at discovery time.
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    /// Disconnect from the device. Safe to call when already disconnected.
    pub async fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(task) = self.forwarder.take() {
            task.abort();
        }
        if self.peripheral.is_connected().await.unwrap_or(false) {
            self.peripheral.disconnect().await?;
        }
        Ok(())
    }

    fn find_characteristic(&self, uuid: Uuid) -> Result<Characteristic, TransportError> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(TransportError::CharacteristicNotFound(uuid))
    }
}

#[async_trait]
impl Transport for BleTransport {
    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn write(
        &mut self,
        characteristic: Uuid,
        payload: &[u8],
        with_response: bool,
    ) -> Result<(), TransportError> {
        let target = self.find_characteristic(characteristic)?;
        let write_type = if with_response {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };
        self.peripheral.write(&target, payload, write_type).await?;
        Ok(())
    }

    async fn subscribe(
        &mut self,
        characteristic: Uuid,
    ) -> Result<mpsc::Receiver<Frame>, TransportError> {
        let target = self.find_characteristic(characteristic)?;
        // Take the stream before subscribing so no early frame is missed.
        let mut notifications = self.peripheral.notifications().await?;
        self.peripheral.subscribe(&target).await?;

        let (tx, rx) = mpsc::channel(NOTIFICATION_BUFFER);
        self.forwarder = Some(tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                if notification.uuid != characteristic {
                    continue;
                }
                // The receiver hung up; the session is over.
                if tx.send(notification.value).await.is_err() {
                    break;
                }
            }
        }));

        Ok(rx)
    }

    async fn unsubscribe(&mut self, characteristic: Uuid) -> Result<(), TransportError> {
        if let Some(task) = self.forwarder.take() {
            task.abort();
        }
        let target = self.find_characteristic(characteristic)?;
        self.peripheral.unsubscribe(&target).await?;
        Ok(())
    }
}
