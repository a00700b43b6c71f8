//! Primitives shared between the management and render contexts.

use crate::compat::{Arc, AtomicBool, AtomicI64, AtomicU64, Ordering};
use crate::time::RenderTime;

/// Cache-line aligned atomic bool.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFlag {
    value: AtomicBool,
}

impl AtomicFlag {
    pub fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: bool) -> bool {
        self.value.swap(value, Ordering::AcqRel)
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Last render timestamp of a node, written from render threads without locking.
///
/// Concurrent renders of one node may leave fields from different calls.
#[derive(Debug, Default)]
pub struct RenderClock {
    valid: AtomicBool,
    sample_time: AtomicI64,
    sample_rate: AtomicU64,
    host_time: AtomicU64,
    has_host_time: AtomicBool,
}

impl RenderClock {
    #[inline]
    pub fn store(&self, when: &RenderTime) {
        self.sample_time.store(when.sample_time, Ordering::Relaxed);
        self.sample_rate
            .store(when.sample_rate.to_bits(), Ordering::Relaxed);
        self.host_time
            .store(when.host_time.unwrap_or(0), Ordering::Relaxed);
        self.has_host_time
            .store(when.host_time.is_some(), Ordering::Relaxed);
        self.valid.store(true, Ordering::Release);
    }

    pub fn load(&self) -> Option<RenderTime> {
        if !self.valid.load(Ordering::Acquire) {
            return None;
        }
        let host_time = self
            .has_host_time
            .load(Ordering::Relaxed)
            .then(|| self.host_time.load(Ordering::Relaxed));
        Some(RenderTime {
            sample_time: self.sample_time.load(Ordering::Relaxed),
            sample_rate: f64::from_bits(self.sample_rate.load(Ordering::Relaxed)),
            host_time,
        })
    }

    pub fn clear(&self) {
        self.valid.store(false, Ordering::Release);
    }
}

/// Values retired by the management context that a renderer may still be reading.
///
/// Anything pushed here is only dropped by [`collect`](Self::collect) once the list holds the
/// only reference, strong or weak. With no weak left nothing can upgrade back to the value, so
/// the final release never lands on a render thread.
#[derive(Debug)]
pub struct RetireList<T> {
    items: Vec<Arc<T>>,
}

impl<T> RetireList<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn retire(&mut self, item: Arc<T>) {
        self.items.push(item);
    }

    /// Drop every entry nobody else references. Returns how many are still pending.
    pub fn collect(&mut self) -> usize {
        self.items
            .retain(|item| Arc::strong_count(item) > 1 || Arc::weak_count(item) > 0);
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> + '_ {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for RetireList<T> {
    fn default() -> Self {
        Self::new()
    }
}
