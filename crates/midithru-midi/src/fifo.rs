//! Lock-free SPSC ring holding event records between ingestion and render.
//!
//! One thread writes, one thread reads, never more of either. Each side
//! claims a slot, fills or inspects it, then commits; an uncommitted claim
//! leaves the queue exactly as it was. Cursors only ever advance through a
//! successfully claimed slot's commit.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::event::RawMidiEvent;

/// Cache line size for padding to avoid false sharing between the cursors.
const CACHE_LINE: usize = 64;

/// Bounded SPSC queue of event records.
///
/// Safety contract: one thread calls `try_write`/`push`, one thread calls
/// `try_read`/`pop`. Using either role from two threads concurrently is
/// undefined behavior.
#[repr(C)]
pub struct EventFifo {
    /// Write position (only advanced by the producer).
    head: AtomicUsize,
    _pad_head: [u8; CACHE_LINE - std::mem::size_of::<AtomicUsize>()],

    /// Read position (only advanced by the consumer).
    tail: AtomicUsize,
    _pad_tail: [u8; CACHE_LINE - std::mem::size_of::<AtomicUsize>()],

    /// Pre-allocated slots; no allocation happens after construction.
    slots: Box<[UnsafeCell<RawMidiEvent>]>,
    capacity: usize,
}

// SAFETY: SPSC contract. Head is only written by the producer, tail only by
// the consumer, and each slot is touched by exactly one role at a time. The
// acquire/release pairing on the cursors publishes slot contents across the
// two threads.
unsafe impl Send for EventFifo {}
unsafe impl Sync for EventFifo {}

impl EventFifo {
    /// Creates a queue with `capacity` slots. Capacity must be a nonzero
    /// power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity > 0 && capacity.is_power_of_two(),
            "capacity must be a power of two"
        );

        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            slots.push(UnsafeCell::new(RawMidiEvent::default()));
        }

        Self {
            head: AtomicUsize::new(0),
            _pad_head: [0u8; CACHE_LINE - std::mem::size_of::<AtomicUsize>()],
            tail: AtomicUsize::new(0),
            _pad_tail: [0u8; CACHE_LINE - std::mem::size_of::<AtomicUsize>()],
            slots: slots.into_boxed_slice(),
            capacity,
        }
    }

    /// Claims the next free slot for writing, or `None` when the queue is
    /// full. The queue is unchanged until the returned slot is committed.
    ///
    /// Must only be called from the producer thread.
    #[inline]
    pub fn try_write(&self) -> Option<WriteSlot<'_>> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        if head.wrapping_sub(tail) >= self.capacity {
            return None;
        }

        Some(WriteSlot {
            fifo: self,
            head,
            idx: head & (self.capacity - 1), // Power-of-two mask
        })
    }

    /// Claims the oldest queued record for reading, or `None` when empty.
    /// The record stays queued until the returned slot is committed.
    ///
    /// Must only be called from the consumer thread.
    #[inline]
    pub fn try_read(&self) -> Option<ReadSlot<'_>> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if tail == head {
            return None;
        }

        Some(ReadSlot {
            fifo: self,
            tail,
            idx: tail & (self.capacity - 1),
        })
    }

    /// Claim-write-commit in one call. Returns false (event dropped) when
    /// the queue is full.
    #[inline]
    pub fn push(&self, event: RawMidiEvent) -> bool {
        match self.try_write() {
            Some(mut slot) => {
                slot.write(event);
                slot.commit();
                true
            }
            None => false,
        }
    }

    /// Claim-copy-commit in one call. Returns `None` when the queue is empty.
    #[inline]
    pub fn pop(&self) -> Option<RawMidiEvent> {
        let slot = self.try_read()?;
        let event = *slot.event();
        slot.commit();
        Some(event)
    }

    /// Records currently queued. Exact within one role; a snapshot across
    /// roles.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Exclusive claim on the next free slot. Dropping it without `commit`
/// abandons the write; the consumer never sees the slot.
pub struct WriteSlot<'a> {
    fifo: &'a EventFifo,
    head: usize,
    idx: usize,
}

impl WriteSlot<'_> {
    /// Fills the claimed slot. May be called repeatedly; only the last
    /// record written is published.
    #[inline]
    pub fn write(&mut self, event: RawMidiEvent) {
        // SAFETY: the producer holds the only claim on this slot, and the
        // consumer cannot reach it until the commit below advances head.
        unsafe {
            *self.fifo.slots[self.idx].get() = event;
        }
    }

    /// Publishes the slot to the consumer.
    #[inline]
    pub fn commit(self) {
        // Release ordering ensures the record write is visible before head
        // advances.
        self.fifo
            .head
            .store(self.head.wrapping_add(1), Ordering::Release);
    }
}

/// Exclusive claim on the oldest queued record. Dropping it without
/// `commit` leaves the record queued for a later read.
pub struct ReadSlot<'a> {
    fifo: &'a EventFifo,
    tail: usize,
    idx: usize,
}

impl ReadSlot<'_> {
    #[inline]
    pub fn event(&self) -> &RawMidiEvent {
        // SAFETY: the consumer holds the only claim on this slot, and the
        // producer has moved past it (head > tail) and cannot reuse it until
        // the commit below advances tail.
        unsafe { &*self.fifo.slots[self.idx].get() }
    }

    /// Releases the slot for reuse by the producer.
    #[inline]
    pub fn commit(self) {
        // Release ordering ensures the read is finished before tail advances.
        self.fifo
            .tail
            .store(self.tail.wrapping_add(1), Ordering::Release);
    }
}

impl std::ops::Deref for ReadSlot<'_> {
    type Target = RawMidiEvent;

    fn deref(&self) -> &RawMidiEvent {
        self.event()
    }
}
