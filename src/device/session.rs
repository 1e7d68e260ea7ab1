//! Breath-test session controller.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::{Notification, NotificationKind, START_TEST_COMMAND, STATUS_CHARACTERISTIC};

use super::error::DeviceError;
use super::ports::{Frame, Transport};

/// Drives breath tests over a [`Transport`].
///
/// One test at a time: [`take_test`](Self::take_test) borrows the tester
/// mutably for the whole session, so a second test cannot start while one is
/// in flight.
pub struct BreathTester<T: Transport> {
    transport: T,
}

impl<T: Transport> BreathTester<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Run one breath test to completion.
    ///
    /// Every inbound frame is decoded and reported to `on_notification` in
    /// arrival order before being folded into the session. Returns the BAC
    /// percent once the device reports a result; `None` uniformly covers
    /// cancellation, blow errors, and timeout — callers distinguish those
    /// through the notifications they observed. The deadline elapsing is not
    /// an error: the callback sees a single `Timeout` notification.
    ///
    /// # Errors
    ///
    /// [`DeviceError::NotConnected`] if no connection exists (checked before
    /// any I/O), [`DeviceError::WriteFailed`] if the start command cannot be
    /// delivered, [`DeviceError::Transport`] if the subscription cannot be
    /// established. The notification subscription is torn down on every exit
    /// path, including a failed write.
    pub async fn take_test<F>(
        &mut self,
        mut on_notification: F,
        timeout: Duration,
    ) -> Result<Option<f64>, DeviceError>
    where
        F: FnMut(&Notification),
    {
        if !self.transport.is_connected().await {
            return Err(DeviceError::NotConnected);
        }

        let mut frames = self.transport.subscribe(STATUS_CHARACTERISTIC).await?;

        let outcome = match self
            .transport
            .write(STATUS_CHARACTERISTIC, &START_TEST_COMMAND, true)
            .await
        {
            Ok(()) => Ok(run_session(&mut frames, &mut on_notification, timeout).await),
            Err(err) => Err(DeviceError::WriteFailed(err)),
        };

        if let Err(err) = self.transport.unsubscribe(STATUS_CHARACTERISTIC).await {
            warn!(error = %err, "failed to tear down the status subscription");
        }

        outcome
    }
}

/// Consume frames until a terminal notification, channel close, or the
/// deadline, whichever comes first.
async fn run_session<F>(
    frames: &mut mpsc::Receiver<Frame>,
    on_notification: &mut F,
    timeout: Duration,
) -> Option<f64>
where
    F: FnMut(&Notification),
{
    let mut session = Session::new();
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => {
                session.state = SessionState::TimedOut;
                on_notification(&Notification::timed_out());
                break;
            }
            frame = frames.recv() => match frame {
                Some(frame) => {
                    let notification = Notification::decode(&frame);
                    debug!(
                        frame = %notification.raw_hex(),
                        kind = ?notification.kind,
                        "device notification"
                    );
                    on_notification(&notification);
                    if session.fold(&notification.kind) {
                        break;
                    }
                }
                // The transport dropped its end of the channel; nothing
                // more can arrive, so stop waiting.
                None => break,
            }
        }
    }

    session.finish()
}

/// State owned by one test, created fresh per call and consumed by it.
#[derive(Debug)]
struct Session {
    state: SessionState,
    bac: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    AwaitingCompletion,
    ResultReady,
    Cancelled,
    BlowErrored,
    TimedOut,
}

impl Session {
    fn new() -> Self {
        Self {
            state: SessionState::AwaitingCompletion,
            bac: None,
        }
    }

    /// Fold one decoded notification into the session. Returns true once the
    /// session is terminal; notifications arriving after that must not
    /// mutate state further.
    fn fold(&mut self, kind: &NotificationKind) -> bool {
        if self.state != SessionState::AwaitingCompletion {
            return true;
        }

        match kind {
            NotificationKind::Result { bac_percent, .. } => {
                self.bac = Some(*bac_percent);
                self.state = SessionState::ResultReady;
            }
            NotificationKind::Cancelled => self.state = SessionState::Cancelled,
            NotificationKind::BlowError => self.state = SessionState::BlowErrored,
            // Progress and diagnostic notifications carry no transition.
            NotificationKind::Countdown { .. }
            | NotificationKind::StartBlow
            | NotificationKind::KeepBlowing { .. }
            | NotificationKind::Analyzing
            | NotificationKind::Finalizing
            | NotificationKind::WrappingUp
            | NotificationKind::Unknown
            | NotificationKind::Invalid
            | NotificationKind::Timeout => {}
        }

        self.state != SessionState::AwaitingCompletion
    }

    fn finish(self) -> Option<f64> {
        self.bac
    }
}
