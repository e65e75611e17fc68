//! Captured audio chunks and the append-only store that holds them
//!
//! Every audio block that arrives while recording becomes a [`Chunk`]. The
//! store assigns indices densely in arrival order, so `chunk(i).index == i`
//! always holds. A new recording replaces the whole store; chunks are never
//! removed or reordered individually.
//!
//! Each `clear()` bumps a generation counter. Averager requests carry the
//! generation they were issued under, so a result computed for a previous
//! recording can never land on a chunk of the current one.

use std::sync::Arc;

/// One fixed-size block of captured audio plus its derived channel averages
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    /// Owned copy of the captured block, shared read-only with the averager
    pub samples: Arc<[f32]>,
    pub left_average: f32,
    pub right_average: f32,
    averaged: bool,
}

impl Chunk {
    fn new(index: usize, samples: Arc<[f32]>) -> Self {
        Self {
            index,
            samples,
            left_average: 0.0,
            right_average: 0.0,
            averaged: false,
        }
    }

    /// Whether an averager result has been applied yet
    pub fn is_averaged(&self) -> bool {
        self.averaged
    }
}

/// Ordered, append-only sequence of chunks for one recording session
#[derive(Debug, Default)]
pub struct SampleStore {
    chunks: Vec<Chunk>,
    generation: u64,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a copy of `samples` as the next chunk and return its index
    pub fn append(&mut self, samples: &[f32]) -> usize {
        let index = self.chunks.len();
        self.chunks.push(Chunk::new(index, Arc::from(samples)));
        index
    }

    /// Drop every chunk and start a new generation
    pub fn clear(&mut self) {
        self.chunks = Vec::new();
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    pub fn count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Read-only view of all chunks
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Apply an averager result.
    ///
    /// Returns `false` when the result is stale (older generation, unknown
    /// index) or the chunk already has its averages; nothing changes then.
    pub fn apply_average(&mut self, generation: u64, index: usize, left: f32, right: f32) -> bool {
        if generation != self.generation {
            return false;
        }
        match self.chunks.get_mut(index) {
            Some(chunk) if !chunk.averaged => {
                chunk.left_average = left;
                chunk.right_average = right;
                chunk.averaged = true;
                true
            }
            _ => false,
        }
    }
}
