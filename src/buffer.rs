//! Preallocated per-bucket output storage.
//!
//! ```text
//!  slots (one arena, K * capacity records)
//! ┌──────────────────┬──────────────────┬─────┬──────────────────┐
//! │ bucket 0         │ bucket 1         │ ... │ bucket K-1       │
//! │ [0, fill_0) used │ [0, fill_1) used │     │                  │
//! └──────────────────┴──────────────────┴─────┴──────────────────┘
//! ```
//!
//! Workers never hold `&mut` into the arena. They write through a
//! [`ScatterTarget`], which checks the slot against the bucket capacity and
//! relies on the caller to hand out each `(bucket, position)` exactly once.
use std::marker::PhantomData;

use crate::Partitioned;
use crate::config::arena_slots;
use crate::error::{ConfigError, Error, Result};
use crate::record::Record;

/// Wrapper to send raw pointers across thread boundaries.
///
/// Safety: callers must ensure threads write to disjoint memory regions.
#[derive(Copy, Clone)]
pub(crate) struct SendPtr<T>(*mut T);
unsafe impl<T> Send for SendPtr<T> {}
unsafe impl<T> Sync for SendPtr<T> {}

impl<T> SendPtr<T> {
    pub(crate) fn new(ptr: *mut T) -> Self {
        Self(ptr)
    }

    #[inline(always)]
    pub(crate) fn get(self) -> *mut T {
        self.0
    }
}

#[derive(Debug)]
pub struct BucketBuffers {
    slots: Vec<Record>,
    fills: Vec<usize>,
    capacity: usize,
}

impl BucketBuffers {
    /// Allocates `num_buckets * capacity` slots, failing with
    /// [`ConfigError::ArenaTooLarge`] when the allocator refuses.
    pub fn new(num_buckets: usize, capacity: usize) -> Result<Self, ConfigError> {
        let too_large = ConfigError::ArenaTooLarge {
            buckets: num_buckets,
            capacity,
        };
        let len = arena_slots(num_buckets, capacity).ok_or_else(|| too_large.clone())?;
        let mut slots = Vec::new();
        slots.try_reserve_exact(len).map_err(|_| too_large)?;
        slots.resize(len, Record::default());
        Ok(Self {
            slots,
            fills: vec![0; num_buckets],
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn fill(&self, bucket: usize) -> usize {
        self.fills[bucket]
    }

    pub fn fills(&self) -> &[usize] {
        &self.fills
    }

    /// Raw writer over the whole arena. Borrowing `self` mutably keeps the
    /// arena alive and unaliased for as long as the target is in use.
    pub(crate) fn scatter_target(&mut self) -> ScatterTarget<'_> {
        ScatterTarget {
            base: SendPtr::new(self.slots.as_mut_ptr()),
            num_buckets: self.fills.len(),
            capacity: self.capacity,
            _arena: PhantomData,
        }
    }

    /// Publishes the final fill counts once every writer is done.
    pub(crate) fn set_fills(&mut self, fills: Vec<usize>) {
        debug_assert_eq!(fills.len(), self.fills.len());
        debug_assert!(fills.iter().all(|&f| f <= self.capacity));
        self.fills = fills;
    }
}

impl Partitioned for BucketBuffers {
    fn num_buckets(&self) -> usize {
        self.fills.len()
    }

    fn bucket(&self, bucket: usize) -> &[Record] {
        let start = bucket * self.capacity;
        &self.slots[start..start + self.fills[bucket]]
    }
}

#[derive(Copy, Clone)]
pub(crate) struct ScatterTarget<'a> {
    base: SendPtr<Record>,
    num_buckets: usize,
    capacity: usize,
    _arena: PhantomData<&'a mut [Record]>,
}

impl ScatterTarget<'_> {
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stores `record` at `position` within `bucket`.
    ///
    /// # Safety
    ///
    /// No other writer may be handed the same `(bucket, position)` while the
    /// target is alive.
    #[inline(always)]
    pub(crate) unsafe fn write(self, bucket: usize, position: usize, record: Record) -> Result<()> {
        assert!(bucket < self.num_buckets);
        if position >= self.capacity {
            return Err(Error::CapacityExceeded {
                bucket,
                capacity: self.capacity,
            });
        }
        unsafe {
            self.base
                .get()
                .add(bucket * self.capacity + position)
                .write(record);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffers_have_no_records() {
        let buffers = BucketBuffers::new(4, 3).unwrap();
        assert_eq!(buffers.num_buckets(), 4);
        assert_eq!(buffers.capacity(), 3);
        for b in 0..4 {
            assert!(buffers.bucket(b).is_empty());
        }
        assert_eq!(buffers.len(), 0);
    }

    #[test]
    fn write_then_publish() {
        let mut buffers = BucketBuffers::new(2, 2).unwrap();
        let target = buffers.scatter_target();
        unsafe {
            target.write(1, 0, Record::new(1, 10)).unwrap();
            target.write(1, 1, Record::new(3, 30)).unwrap();
            target.write(0, 0, Record::new(2, 20)).unwrap();
        }
        buffers.set_fills(vec![1, 2]);
        assert_eq!(buffers.bucket(0), &[Record::new(2, 20)]);
        assert_eq!(buffers.bucket(1), &[Record::new(1, 10), Record::new(3, 30)]);
        assert_eq!(buffers.occupancy(), vec![1, 2]);
    }

    #[test]
    fn write_past_capacity_is_rejected() {
        let mut buffers = BucketBuffers::new(2, 1).unwrap();
        let target = buffers.scatter_target();
        let err = unsafe { target.write(0, 1, Record::new(0, 0)) }.unwrap_err();
        assert_eq!(
            err,
            Error::CapacityExceeded {
                bucket: 0,
                capacity: 1
            }
        );
        // The neighbouring bucket was not touched.
        assert_eq!(buffers.slots[1], Record::default());
    }

    #[test]
    fn unallocatable_arena_is_an_error() {
        // Addressable, but far beyond any address space.
        let capacity = isize::MAX as usize / size_of::<Record>() / crate::MAX_BUCKETS;
        assert!(arena_slots(crate::MAX_BUCKETS, capacity).is_some());
        assert_eq!(
            BucketBuffers::new(crate::MAX_BUCKETS, capacity).err(),
            Some(ConfigError::ArenaTooLarge {
                buckets: crate::MAX_BUCKETS,
                capacity
            })
        );
        assert!(matches!(
            BucketBuffers::new(2, usize::MAX),
            Err(ConfigError::ArenaTooLarge { .. })
        ));
    }
}
