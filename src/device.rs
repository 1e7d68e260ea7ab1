mod ble;
mod error;
mod ports;
mod session;

pub use ble::BleTransport;
pub use error::{DeviceError, TransportError};
pub use ports::{Frame, Transport};
pub use session::BreathTester;
