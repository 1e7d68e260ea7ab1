//! Decoder for the reverse-engineered BACtrack status protocol.
//!
//! The byte layout is not documented by the vendor; prefixes and the result
//! divisor were determined empirically against a physical device. Decoding is
//! total: a frame always decodes to exactly one [`NotificationKind`], with
//! unrecognized prefixes degrading to [`NotificationKind::Unknown`] and
//! frames shorter than two bytes to [`NotificationKind::Invalid`].

use std::fmt;

/// A decoded status notification paired with the frame it came from.
///
/// The raw bytes are retained on every notification so a misclassified frame
/// can be diagnosed without re-running a physical test.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub frame: Vec<u8>,
}

/// Meaning of a status frame.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationKind {
    /// Warm-up countdown before the blow phase, in seconds.
    Countdown { seconds: u8 },
    /// The device is ready for breath input.
    StartBlow,
    /// Breath input in progress, remaining seconds.
    KeepBlowing { remaining_seconds: u8 },
    Analyzing,
    Finalizing,
    WrappingUp,
    /// The device cancelled the test.
    Cancelled,
    /// Insufficient breath detected.
    BlowError,
    /// Final reading. `raw_value` is the little-endian word one byte past
    /// the BAC field, retained for protocol diagnostics.
    Result { bac_percent: f64, raw_value: u16 },
    /// Prefix not covered by the known table.
    Unknown,
    /// Frame shorter than two bytes.
    Invalid,
    /// The session deadline elapsed. Never produced by the decoder; emitted
    /// by the session controller.
    Timeout,
}

impl Notification {
    /// Decode a raw frame. Total and pure: identical input always yields an
    /// identical notification, and no input fails.
    pub fn decode(frame: &[u8]) -> Self {
        Self {
            kind: classify(frame),
            frame: frame.to_vec(),
        }
    }

    /// The notification delivered to the caller when a test times out.
    pub(crate) fn timed_out() -> Self {
        Self {
            kind: NotificationKind::Timeout,
            frame: Vec::new(),
        }
    }

    /// Hex rendering of the originating frame.
    pub fn raw_hex(&self) -> String {
        hex::encode(&self.frame)
    }
}

fn classify(frame: &[u8]) -> NotificationKind {
    if frame.len() < 2 {
        return NotificationKind::Invalid;
    }

    // Result frames are dispatched on the first byte alone. Anything
    // 0x81-prefixed but too short to carry a reading is unknown.
    if frame[0] == 0x81 {
        if frame.len() < 5 {
            return NotificationKind::Unknown;
        }
        let value = u16::from_le_bytes([frame[2], frame[3]]);
        let raw_value = u16::from_le_bytes([frame[3], frame[4]]);
        return NotificationKind::Result {
            bac_percent: f64::from(value) / 10_000.0,
            raw_value,
        };
    }

    match [frame[0], frame[1]] {
        // Missing trailing count bytes report as 0 rather than failing.
        [0x80, 0x01] => NotificationKind::Countdown {
            seconds: frame.get(2).copied().unwrap_or(0),
        },
        [0x80, 0x02] => NotificationKind::StartBlow,
        [0x80, 0x03] => NotificationKind::KeepBlowing {
            remaining_seconds: frame.get(2).copied().unwrap_or(0),
        },
        [0x80, 0x04] => NotificationKind::Analyzing,
        [0x80, 0x05] => NotificationKind::Finalizing,
        [0x80, 0x06] => NotificationKind::WrappingUp,
        [0x80, 0x07] => NotificationKind::Cancelled,
        [0x80, 0x08] => NotificationKind::BlowError,
        _ => NotificationKind::Unknown,
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NotificationKind::Countdown { seconds } => {
                write!(f, "Warming up... {seconds}s")
            }
            NotificationKind::StartBlow => write!(f, "BEGIN BLOWING NOW!"),
            NotificationKind::KeepBlowing { remaining_seconds } => {
                write!(f, "Keep blowing... {remaining_seconds}s")
            }
            NotificationKind::Analyzing => write!(f, "Analyzing sample..."),
            NotificationKind::Finalizing => write!(f, "Finalizing results..."),
            NotificationKind::WrappingUp => write!(f, "Test wrapping up..."),
            NotificationKind::Cancelled => write!(f, "Test cancelled by the device"),
            NotificationKind::BlowError => {
                write!(f, "Blow error - insufficient breath detected")
            }
            NotificationKind::Result { bac_percent, .. } => {
                write!(f, "BAC result: {bac_percent:.4}%")
            }
            NotificationKind::Unknown => write!(f, "Unknown notification: {}", self.raw_hex()),
            NotificationKind::Invalid => write!(f, "Invalid frame: {}", self.raw_hex()),
            NotificationKind::Timeout => write!(f, "Test timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_frames_are_invalid() {
        assert_eq!(Notification::decode(&[]).kind, NotificationKind::Invalid);
        assert_eq!(Notification::decode(&[0x80]).kind, NotificationKind::Invalid);
    }

    #[test]
    fn test_countdown_extracts_seconds() {
        let n = Notification::decode(&[0x80, 0x01, 0x05]);
        assert_eq!(n.kind, NotificationKind::Countdown { seconds: 5 });
    }

    #[test]
    fn test_countdown_below_minimum_length_defaults_to_zero() {
        let n = Notification::decode(&[0x80, 0x01]);
        assert_eq!(n.kind, NotificationKind::Countdown { seconds: 0 });
    }

    #[test]
    fn test_keep_blowing_below_minimum_length_defaults_to_zero() {
        let n = Notification::decode(&[0x80, 0x03]);
        assert_eq!(
            n.kind,
            NotificationKind::KeepBlowing {
                remaining_seconds: 0
            }
        );
    }

    #[test]
    fn test_marker_prefixes() {
        assert_eq!(
            Notification::decode(&[0x80, 0x02]).kind,
            NotificationKind::StartBlow
        );
        assert_eq!(
            Notification::decode(&[0x80, 0x04]).kind,
            NotificationKind::Analyzing
        );
        assert_eq!(
            Notification::decode(&[0x80, 0x05]).kind,
            NotificationKind::Finalizing
        );
        assert_eq!(
            Notification::decode(&[0x80, 0x06]).kind,
            NotificationKind::WrappingUp
        );
        assert_eq!(
            Notification::decode(&[0x80, 0x07]).kind,
            NotificationKind::Cancelled
        );
        assert_eq!(
            Notification::decode(&[0x80, 0x08]).kind,
            NotificationKind::BlowError
        );
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let n = Notification::decode(&[0x80, 0x02, 0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(n.kind, NotificationKind::StartBlow);

        let n = Notification::decode(&[0x80, 0x03, 0x04, 0xFF, 0xFF]);
        assert_eq!(
            n.kind,
            NotificationKind::KeepBlowing {
                remaining_seconds: 4
            }
        );
    }

    #[test]
    fn test_result_little_endian_extraction() {
        // 0x2710 = 10000 at offset 2, divided by 10000 -> 1.0000%
        let n = Notification::decode(&[0x81, 0x00, 0x10, 0x27, 0x00]);
        match n.kind {
            NotificationKind::Result {
                bac_percent,
                raw_value,
            } => {
                assert!((bac_percent - 1.0).abs() < 1e-9);
                assert_eq!(raw_value, 0x0027);
            }
            other => panic!("expected a result, got {other:?}"),
        }
    }

    #[test]
    fn test_result_sober_reading_is_zero_not_absent() {
        let n = Notification::decode(&[0x81, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(
            n.kind,
            NotificationKind::Result {
                bac_percent: 0.0,
                raw_value: 0
            }
        );
    }

    #[test]
    fn test_short_result_frame_is_unknown() {
        let n = Notification::decode(&[0x81, 0x00, 0x10]);
        assert_eq!(n.kind, NotificationKind::Unknown);
    }

    #[test]
    fn test_unrecognized_prefix_is_unknown_and_keeps_raw_hex() {
        let n = Notification::decode(&[0x90, 0x01, 0x02]);
        assert_eq!(n.kind, NotificationKind::Unknown);
        assert_eq!(n.raw_hex(), "900102");
    }

    #[test]
    fn test_decode_is_pure() {
        let frame = [0x80, 0x01, 0x07];
        assert_eq!(Notification::decode(&frame), Notification::decode(&frame));
    }

    #[test]
    fn test_raw_frame_retained_on_every_notification() {
        let frame = [0x80, 0x04, 0xAB];
        let n = Notification::decode(&frame);
        assert_eq!(n.frame, frame.to_vec());
        assert_eq!(n.raw_hex(), "8004ab");
    }
}
