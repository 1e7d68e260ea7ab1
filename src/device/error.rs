use thiserror::Error;
use uuid::Uuid;

/// Failures raised by a [`Transport`](super::Transport) implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no Bluetooth adapter available on this host")]
    NoAdapter,

    #[error("characteristic {0} not present on the connected device")]
    CharacteristicNotFound(Uuid),

    #[error("bluetooth operation failed")]
    Backend(#[from] btleplug::Error),
}

/// Failures surfaced by device discovery and the breath-test session.
///
/// A timed-out, cancelled, or errored test is not an error: those resolve to
/// an absent result, observable through the notification callback.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// A test was requested before a transport connection existed.
    #[error("not connected to a breathalyzer")]
    NotConnected,

    /// Discovery exhausted its scan window without a matching device.
    #[error("no BACtrack device found within the scan window")]
    DeviceNotFound,

    /// The start-test command could not be delivered. Fatal to the attempt;
    /// nothing is retried.
    #[error("failed to deliver the start-test command")]
    WriteFailed(#[source] TransportError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
