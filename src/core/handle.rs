// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

use std::sync::atomic::{AtomicU32, Ordering};

/// Handle factory for incrementing sequences of numbers, safe to share between threads.
/// Handles wrap back to `first` once `u32::MAX` has been issued.
#[derive(Debug)]
pub struct AtomicHandle {
    next: AtomicU32,
    first: u32,
}

impl AtomicHandle {
    pub fn new(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first),
            first,
        }
    }

    pub fn next(&self) -> u32 {
        let mut val = self.next.fetch_add(1, Ordering::Acquire);

        while val < self.first {
            // On overflow, try to reset the next value to first + 1
            match self.next.compare_exchange(
                val + 1,
                self.first + 1,
                Ordering::Release,
                Ordering::SeqCst,
            ) {
                // If it succeeds, just use first directly.
                Ok(_) => val = self.first,
                Err(v) => {
                    if v >= self.first {
                        val = self.next.fetch_add(1, Ordering::Acquire);
                    } else {
                        val = v;
                    }
                }
            }
        }
        val
    }

    /// The handle that the next call to `next()` would issue, ignoring wrap around.
    pub fn peek(&self) -> u32 {
        self.next.load(Ordering::Acquire)
    }

    /// Makes sure that no handle below or equal to `handle` is issued again. Used when a handle
    /// was assigned from elsewhere, e.g. adopted from a server during a transfer.
    pub fn raise_to(&self, handle: u32) {
        if handle >= self.first && handle < u32::MAX {
            self.next.fetch_max(handle + 1, Ordering::AcqRel);
        }
    }

    pub fn set_next(&self, next: u32) {
        debug_assert!(next >= self.first);
        self.next.store(next, Ordering::Relaxed);
    }

    /// Resets the handle to its initial state
    pub fn reset(&self) {
        self.set_next(self.first);
    }
}

impl Default for AtomicHandle {
    fn default() -> Self {
        Self::new(1)
    }
}
