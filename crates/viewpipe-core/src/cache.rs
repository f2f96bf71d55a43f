//! Single-slot store for the most recent captured frame.
//!
//! The cache decouples still-image consumers from the render thread: the
//! capture worker overwrites the slot at its own cadence and any consumer
//! may poll it asynchronously. Capacity is exactly one: storing a new
//! frame always drops the previous one.

use parking_lot::Mutex;

use crate::frame::CapturedFrame;

/// Thread-safe cache holding at most one [`CapturedFrame`].
///
/// Built once at the composition root and shared as `Arc<FrameCache>`
/// between the capture worker and frame consumers. There is no waiter
/// notification; readers poll.
pub struct FrameCache {
    slot: Mutex<Option<CapturedFrame>>,
}

impl FrameCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Replaces the slot contents with `frame`.
    ///
    /// The previous frame, if any, is dropped. The replacement is atomic:
    /// readers observe either the old or the new frame, never a torn value.
    pub fn store(&self, frame: CapturedFrame) {
        *self.slot.lock() = Some(frame);
    }

    /// Returns the current frame without removing it.
    pub fn peek(&self) -> Option<CapturedFrame> {
        self.slot.lock().clone()
    }

    /// Returns the current frame and clears the slot in one atomic step.
    ///
    /// A `store` racing with this call resolves last-writer-wins: the
    /// reader gets either the pre- or post-store frame, and eviction
    /// removes whatever was in the slot at that moment.
    pub fn peek_and_evict(&self) -> Option<CapturedFrame> {
        self.slot.lock().take()
    }
}

impl Default for FrameCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameBuffer;
    use std::sync::Arc;

    fn frame(width: u32, height: u32) -> CapturedFrame {
        FrameBuffer::rgba(width, height).into_frame()
    }

    #[test]
    fn store_then_peek() {
        let cache = FrameCache::new();
        assert!(cache.peek().is_none());

        cache.store(frame(4, 4));
        let got = cache.peek().unwrap();
        assert_eq!(got.dimensions(), (4, 4));
        assert_eq!(got.data().len(), 4 * 4 * 4);
    }

    #[test]
    fn second_store_replaces_first() {
        let cache = FrameCache::new();
        cache.store(frame(2, 2));
        cache.store(frame(8, 8));

        // Capacity is 1: only the most recent frame survives.
        assert_eq!(cache.peek().unwrap().dimensions(), (8, 8));
    }

    #[test]
    fn peek_does_not_evict() {
        let cache = FrameCache::new();
        cache.store(frame(2, 2));

        assert!(cache.peek().is_some());
        assert!(cache.peek().is_some());
    }

    #[test]
    fn peek_and_evict_clears_slot() {
        let cache = FrameCache::new();
        cache.store(frame(2, 2));

        assert!(cache.peek_and_evict().is_some());
        assert!(cache.peek().is_none());
        assert!(cache.peek_and_evict().is_none());
    }

    #[test]
    fn concurrent_store_and_evict() {
        let cache = Arc::new(FrameCache::new());

        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    cache.store(frame(16, 16));
                }
            })
        };
        let reader = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    if let Some(f) = cache.peek_and_evict() {
                        // Never a torn frame: dimensions and data agree.
                        assert_eq!(f.data().len(), 16 * 16 * 4);
                    }
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
    }
}
