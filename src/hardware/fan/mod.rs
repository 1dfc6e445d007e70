use std::{
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll},
};

use bytes::Bytes;
use tokio::task::JoinHandle;

use crate::{config::Defaults, registry::DeviceRecord};

use self::{defs::*, protocol::*};

pub mod defs;
pub mod protocol;

/// Drives one fan. The active state tracks the last command that was
/// dispatched, the fan itself never reports back.
pub struct FanController {
    record: Arc<DeviceRecord>,
    transport: Arc<dyn Transport>,
    active: AtomicBool,
    /// Reported only, the fans have no speed codes.
    rotation_speed: u8,
}

/// Completion of a single command datagram.
///
/// The send runs on its own task and is not cancelled if this is dropped.
#[must_use = "dropping a Dispatch detaches the send, await it to observe failures"]
pub struct Dispatch(JoinHandle<Result<(), TransmitError>>);

impl FanController {
    pub const MAX_ROTATION_SPEED: u8 = 100;

    pub fn new(
        record: Arc<DeviceRecord>,
        transport: Arc<dyn Transport>,
        defaults: Defaults,
    ) -> Self {
        Self {
            record,
            transport,
            active: AtomicBool::new(defaults.active.is_on()),
            rotation_speed: defaults.rotation_speed.min(Self::MAX_ROTATION_SPEED),
        }
    }

    /* == Public API == */

    pub fn active(&self) -> PowerState {
        self.active.load(Ordering::Relaxed).into()
    }

    /// Records `target` as the active state and sends the matching code.
    ///
    /// Must be called from within a Tokio runtime. Returns as soon as the send
    /// has been spawned; the state is not rolled back if it fails.
    pub fn set_active(&self, target: PowerState) -> Dispatch {
        let payload = self.record.payload(target).clone();

        self.active.store(target.is_on(), Ordering::Relaxed);

        tracing::info!(
            "Set active for {} ({}) as {target}",
            self.record.display_name,
            self.record.address
        );

        let task = dispatch_task(
            self.transport.clone(),
            self.record.id.clone(),
            self.control_address(),
            target,
            payload,
        );

        Dispatch(tokio::spawn(task))
    }

    pub fn rotation_speed(&self) -> u8 {
        self.rotation_speed
    }

    pub fn record(&self) -> &Arc<DeviceRecord> {
        &self.record
    }

    pub fn control_address(&self) -> SocketAddr {
        self.record.control_address()
    }
}

#[tracing::instrument(skip_all, fields(device = %id, state = %target))]
async fn dispatch_task(
    transport: Arc<dyn Transport>,
    id: String,
    addr: SocketAddr,
    target: PowerState,
    payload: Bytes,
) -> Result<(), TransmitError> {
    match transport.send(addr, &payload).await {
        Ok(()) => {
            tracing::debug!("Sent {} B to {addr}", payload.len());
            Ok(())
        }

        Err(e) => {
            tracing::error!("Failed to send command: {e}");
            Err(e)
        }
    }
}

impl Future for Dispatch {
    type Output = Result<(), TransmitError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|e| Err(TransmitError::Aborted(e.to_string()))))
    }
}
