//! Background encoding workers.
//!
//! Each worker is a thread fed through an mpsc channel. Requests move their
//! `PixelBuffer` into the worker and responses move it back, so a buffer is
//! never shared between threads.

mod encode;
mod export;
mod thumbnail;

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::EncodeError;

pub use encode::{encode_png, png_data_url, to_dynamic_image};
pub use export::{export_png, ExportRequest, ExportResponse};
pub use thumbnail::{make_thumbnail, ThumbnailRequest, ThumbnailResponse, THUMBNAIL_SIZE};

/// A named thread that maps each request to one response, in order.
#[derive(Debug)]
pub struct Worker<Req, Resp> {
    name: String,
    requests: Option<Sender<Req>>,
    responses: Receiver<Resp>,
    handle: Option<JoinHandle<()>>,
    in_flight: usize,
}

impl<Req, Resp> Worker<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    pub fn spawn<F>(name: &str, mut job: F) -> Result<Self, EncodeError>
    where
        F: FnMut(Req) -> Resp + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<Req>();
        let (response_tx, response_rx) = mpsc::channel::<Resp>();
        let handle = thread::Builder::new().name(name.to_owned()).spawn(move || {
            for request in request_rx {
                if response_tx.send(job(request)).is_err() {
                    break;
                }
            }
        })?;
        log::debug!("started worker {name}");
        Ok(Self {
            name: name.to_owned(),
            requests: Some(request_tx),
            responses: response_rx,
            handle: Some(handle),
            in_flight: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hands a request (and the buffer inside it) to the worker.
    pub fn send(&mut self, request: Req) -> Result<(), EncodeError> {
        let sender = self.requests.as_ref().ok_or(EncodeError::Disconnected)?;
        sender.send(request).map_err(|_| EncodeError::Disconnected)?;
        self.in_flight += 1;
        Ok(())
    }

    /// Returns a finished response without blocking.
    pub fn try_recv(&mut self) -> Option<Resp> {
        let response = self.responses.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(response)
    }

    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Resp>, EncodeError> {
        match self.responses.recv_timeout(timeout) {
            Ok(response) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Ok(Some(response))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(EncodeError::Disconnected),
        }
    }

    /// Requests sent but not yet received
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

impl<Req, Resp> Drop for Worker<Req, Resp> {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("worker {} panicked", self.name);
            }
        }
    }
}

pub type ThumbnailWorker = Worker<ThumbnailRequest, ThumbnailResponse>;
pub type ExportWorker = Worker<ExportRequest, ExportResponse>;

pub fn spawn_thumbnail_worker(max_side: u32) -> Result<ThumbnailWorker, EncodeError> {
    Worker::spawn("thumbnail", move |request| make_thumbnail(request, max_side))
}

pub fn spawn_export_worker() -> Result<ExportWorker, EncodeError> {
    Worker::spawn("export", export_png)
}
