//! Background per-chunk averaging
//!
//! The waveform view draws one column per chunk, scaled by the mean of the
//! chunk's left and right channels. Computing those means on the capture path
//! would eat into the audio budget, so a dedicated worker thread does it.
//!
//! The worker is stateless: it receives `(generation, index, samples)`
//! requests and answers with `(generation, index, result)` responses over
//! typed channels. Nothing mutable is shared with it; the samples travel as
//! an immutable `Arc<[f32]>`. Responses may arrive in any order and the
//! receiver routes them by index.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;

/// Errors reported by the averager
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AveragerError {
    #[error("Chunk {0} has no samples")]
    EmptyBlock(usize),

    #[error("Chunk {index} has a non-finite sample at offset {offset}")]
    NonFinite { index: usize, offset: usize },

    #[error("Averager worker is not running")]
    Disconnected,

    #[error("Failed to spawn averager worker: {0}")]
    Spawn(String),
}

/// A chunk handed to the worker
#[derive(Debug, Clone)]
pub struct AverageRequest {
    pub generation: u64,
    pub index: usize,
    pub samples: Arc<[f32]>,
}

/// The worker's answer for one request
#[derive(Debug, Clone)]
pub struct AverageResponse {
    pub generation: u64,
    pub index: usize,
    pub result: Result<(f32, f32), AveragerError>,
}

/// Running mean of interleaved stereo samples.
///
/// Even offsets are the left channel, odd offsets the right channel. The
/// incremental form `avg += (x - avg) / n` keeps precision on long blocks.
pub fn stereo_average(index: usize, samples: &[f32]) -> Result<(f32, f32), AveragerError> {
    if samples.is_empty() {
        return Err(AveragerError::EmptyBlock(index));
    }
    if let Some(offset) = samples.iter().position(|s| !s.is_finite()) {
        return Err(AveragerError::NonFinite { index, offset });
    }

    let mut left = 0.0_f32;
    let mut right = 0.0_f32;
    for (n, pair) in samples.chunks(2).enumerate() {
        let inv_count = 1.0 / (n + 1) as f32;
        left += (pair[0] - left) * inv_count;
        if let Some(&r) = pair.get(1) {
            right += (r - right) * inv_count;
        }
    }

    Ok((left, right))
}

/// Handle to the averaging worker thread
pub struct Averager {
    requests: Option<Sender<AverageRequest>>,
    responses: Receiver<AverageResponse>,
    handle: Option<JoinHandle<()>>,
}

impl Averager {
    /// Spawn the worker thread
    pub fn spawn() -> Result<Self, AveragerError> {
        let (request_tx, request_rx) = unbounded::<AverageRequest>();
        let (response_tx, response_rx) = unbounded::<AverageResponse>();

        let handle = thread::Builder::new()
            .name("averager".to_string())
            .spawn(move || worker_loop(request_rx, response_tx))
            .map_err(|e| AveragerError::Spawn(e.to_string()))?;

        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            handle: Some(handle),
        })
    }

    /// Queue a chunk for averaging. Never blocks.
    pub fn submit(&self, request: AverageRequest) -> Result<(), AveragerError> {
        match &self.requests {
            Some(tx) => tx.send(request).map_err(|_| AveragerError::Disconnected),
            None => Err(AveragerError::Disconnected),
        }
    }

    /// Take the next finished response, if any
    pub fn try_recv(&self) -> Option<AverageResponse> {
        self.responses.try_recv().ok()
    }

    /// Response channel, for callers that want to wait
    pub fn responses(&self) -> &Receiver<AverageResponse> {
        &self.responses
    }
}

impl Drop for Averager {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.requests = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop(requests: Receiver<AverageRequest>, responses: Sender<AverageResponse>) {
    log::debug!("Averager worker started");
    for request in requests.iter() {
        let response = AverageResponse {
            generation: request.generation,
            index: request.index,
            result: stereo_average(request.index, &request.samples),
        };
        if responses.send(response).is_err() {
            break;
        }
    }
    log::debug!("Averager worker stopped");
}
