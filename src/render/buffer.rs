//! Scratch buffers for building the root container

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// Buffers larger than this are dropped instead of returned to the pool.
const MAX_RETAINED_CAPACITY: usize = 256 * 1024;

/// A small pool of reusable string buffers.
///
/// Each render takes a buffer through [`BufferPool::acquire`] and the guard
/// hands it back on drop, on error paths too. A buffer is never shared
/// between live renders.
#[derive(Debug)]
pub(crate) struct BufferPool {
    buffers: Mutex<Vec<String>>,
    max_idle: usize,
}

impl BufferPool {
    pub(crate) fn new(max_idle: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    pub(crate) fn acquire(&self) -> PooledBuffer<'_> {
        let buf = self
            .buffers
            .lock()
            .ok()
            .and_then(|mut buffers| buffers.pop())
            .unwrap_or_default();

        PooledBuffer { pool: self, buf }
    }

    fn release(&self, mut buf: String) {
        if buf.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        buf.clear();

        if let Ok(mut buffers) = self.buffers.lock() {
            if buffers.len() < self.max_idle {
                buffers.push(buf);
            }
        }
    }

    #[cfg(test)]
    fn idle(&self) -> usize {
        self.buffers.lock().map(|b| b.len()).unwrap_or(0)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(16)
    }
}

/// A buffer on loan from a [`BufferPool`].
pub(crate) struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: String,
}

impl Deref for PooledBuffer<'_> {
    type Target = String;

    fn deref(&self) -> &String {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut String {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
