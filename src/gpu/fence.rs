use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use super::surface::PixelBuffer;
use crate::error::ReadbackError;

/// Polls allowed before a readback gives up waiting on its fence
pub const DEFAULT_MAX_ATTEMPTS: u32 = 120;

#[derive(Debug, Clone, PartialEq)]
pub enum FenceStatus {
    Pending,
    Signaled,
    Failed(ReadbackError),
}

#[derive(Debug)]
struct FenceState {
    status: FenceStatus,
    waker: Option<Waker>,
}

/// Sync object signaled once the device has flushed the work queued before it.
#[derive(Debug, Clone)]
pub struct Fence {
    state: Arc<Mutex<FenceState>>,
}

impl Fence {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FenceState {
                status: FenceStatus::Pending,
                waker: None,
            })),
        }
    }

    pub fn status(&self) -> FenceStatus {
        self.state.lock().status.clone()
    }

    pub(crate) fn signal(&self) {
        self.resolve(FenceStatus::Signaled);
    }

    pub(crate) fn fail(&self, error: ReadbackError) {
        self.resolve(FenceStatus::Failed(error));
    }

    fn resolve(&self, status: FenceStatus) {
        let waker = {
            let mut state = self.state.lock();
            if state.status != FenceStatus::Pending {
                return;
            }
            state.status = status;
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn register(&self, waker: &Waker) {
        self.state.lock().waker = Some(waker.clone());
    }
}

/// An in-flight pixel readback.
///
/// The pixels were copied into a pack buffer when the readback was issued;
/// they are released to the caller only after the fence signals. Each poll
/// that finds the fence pending counts as one attempt, and the device wakes
/// the task when it flushes, so polling happens at most once per frame and
/// never blocks the render loop.
#[derive(Debug)]
pub struct Readback {
    fence: Fence,
    pack: Option<PixelBuffer>,
    attempts: u32,
    max_attempts: u32,
}

impl Readback {
    pub(crate) fn new(fence: Fence, pack: PixelBuffer, max_attempts: u32) -> Self {
        Self {
            fence,
            pack: Some(pack),
            attempts: 0,
            max_attempts,
        }
    }

    pub fn fence(&self) -> &Fence {
        &self.fence
    }
}

impl Future for Readback {
    type Output = Result<PixelBuffer, ReadbackError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match this.fence.status() {
            FenceStatus::Signaled => Poll::Ready(this.pack.take().ok_or(ReadbackError::SyncFailed)),
            FenceStatus::Failed(error) => {
                this.pack = None;
                Poll::Ready(Err(error))
            }
            FenceStatus::Pending => {
                this.attempts += 1;
                if this.attempts > this.max_attempts {
                    this.pack = None;
                    log::warn!("readback fence still pending after {} polls", this.max_attempts);
                    return Poll::Ready(Err(ReadbackError::Timeout {
                        attempts: this.max_attempts,
                    }));
                }
                this.fence.register(cx.waker());
                // The device may have signaled between the status check and registration.
                if this.fence.status() != FenceStatus::Pending {
                    cx.waker().wake_by_ref();
                }
                Poll::Pending
            }
        }
    }
}
