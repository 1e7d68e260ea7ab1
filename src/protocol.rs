mod notification;

pub use notification::{Notification, NotificationKind};

use uuid::{Uuid, uuid};

/// GATT service advertised by BACtrack breathalyzers.
pub const SERVICE_UUID: Uuid = uuid!("862bfff0-7d59-4359-8b59-a96db28bc679");

/// Characteristic that accepts the start command and streams status
/// notifications back.
pub const STATUS_CHARACTERISTIC: Uuid = uuid!("862bfff1-7d59-4359-8b59-a96db28bc679");

/// Payload written to [`STATUS_CHARACTERISTIC`] to start a breath test.
pub const START_TEST_COMMAND: [u8; 2] = [0x00, 0x01];

/// Substring of the advertised device name identifying the product family.
/// Matched case-insensitively during discovery.
pub const DEVICE_NAME_FRAGMENT: &str = "bactrack";
