//! Transport port the session controller drives a device through.

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::error::TransportError;

/// A raw notification frame as delivered by the transport.
pub type Frame = Vec<u8>;

/// Logical channel to one breathalyzer.
///
/// Implementations deliver notification frames through the receiver returned
/// by [`subscribe`](Transport::subscribe), in arrival order, from a single
/// producer. The session controller is the sole consumer; it never processes
/// two frames concurrently.
#[async_trait]
pub trait Transport: Send {
    /// Whether a device connection currently exists.
    async fn is_connected(&self) -> bool;

    /// Write `payload` to `characteristic`, requesting delivery
    /// acknowledgment when `with_response` is set.
    async fn write(
        &mut self,
        characteristic: Uuid,
        payload: &[u8],
        with_response: bool,
    ) -> Result<(), TransportError>;

    /// Start notification delivery for `characteristic` and hand back the
    /// frame channel.
    async fn subscribe(
        &mut self,
        characteristic: Uuid,
    ) -> Result<mpsc::Receiver<Frame>, TransportError>;

    /// Stop notification delivery for `characteristic`.
    async fn unsubscribe(&mut self, characteristic: Uuid) -> Result<(), TransportError>;
}
