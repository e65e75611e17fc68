//! Block transport between the device rings and the looper
//!
//! A dedicated thread cuts the captured sample stream into fixed-size blocks
//! for [`Looper::process_input`] and keeps the playback ring a few blocks
//! ahead with [`Looper::process_output`]. The looper lock is taken for one
//! block at a time; the device callbacks themselves never wait on it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ringbuf::traits::{Consumer, Observer, Producer};

use super::device::DeviceIo;
use crate::looper::Looper;

/// Output blocks kept queued ahead of the device
const OUTPUT_BLOCKS_AHEAD: usize = 2;

/// Idle wait between polls of the rings
const POLL_INTERVAL: Duration = Duration::from_millis(1);

pub type SharedLooper = Arc<Mutex<Looper>>;

/// Lock the looper, recovering from a poisoned lock
pub fn lock(looper: &SharedLooper) -> MutexGuard<'_, Looper> {
    looper.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to the transport thread; stops it on drop
pub struct Transport {
    is_running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Transport {
    pub fn spawn(looper: SharedLooper, io: DeviceIo, block_len: usize) -> std::io::Result<Self> {
        let is_running = Arc::new(AtomicBool::new(true));
        let running = Arc::clone(&is_running);

        let thread_handle = thread::Builder::new()
            .name("transport".to_string())
            .spawn(move || transport_thread(looper, io, block_len, running))?;

        Ok(Self {
            is_running,
            thread_handle: Some(thread_handle),
        })
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

fn transport_thread(looper: SharedLooper, mut io: DeviceIo, block_len: usize, running: Arc<AtomicBool>) {
    log::debug!("Transport started, block length {}", block_len);

    let mut input_block = vec![0.0_f32; block_len];
    let mut output_block = vec![0.0_f32; block_len];

    while running.load(Ordering::Relaxed) {
        pump(&looper, &mut io, &mut input_block, &mut output_block);
        thread::sleep(POLL_INTERVAL);
    }

    log::debug!("Transport stopped");
}

/// Move every complete block that is ready. Returns the number of blocks moved.
fn pump(looper: &SharedLooper, io: &mut DeviceIo, input_block: &mut [f32], output_block: &mut [f32]) -> usize {
    let block_len = input_block.len();
    let mut moved = 0;

    while io.input.occupied_len() >= block_len {
        io.input.pop_slice(input_block);
        lock(looper).process_input(input_block);
        moved += 1;
    }
    if moved > 0 {
        lock(looper).poll_averages();
    }

    while io.output.vacant_len() >= block_len && io.output.occupied_len() < block_len * OUTPUT_BLOCKS_AHEAD {
        lock(looper).process_output(output_block);
        io.output.push_slice(output_block);
        moved += 1;
    }

    moved
}
