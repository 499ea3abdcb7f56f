//! Buddy allocator for physical page frames.
//!
//! Memory is tracked as power-of-two-sized, address-aligned blocks of
//! page frames, one free list per order. [`allocate`] finds or creates
//! a block of the requested order by splitting larger free blocks,
//! [`free`] gives one back and merges it with its buddy into larger
//! blocks as far as possible, and [`reserve`] carves one specific page
//! frame out of whatever block currently contains it.
//!
//! The allocator never touches the memory it manages. It arranges
//! opaque [`Frame`] handles into lists, and the translation between a
//! handle and its physical location is supplied from the outside
//! through the [`FrameMap`] trait.
//!
//! The allocator itself carries no locking; callers serialize access,
//! either themselves or through the [`LockedBuddy`] wrapper.
//!
//! [`allocate`]: BuddyAllocator::allocate
//! [`free`]: BuddyAllocator::free
//! [`reserve`]: BuddyAllocator::reserve

#![deny(rust_2018_idioms, rustdoc::broken_intra_doc_links)]
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod buddy;
pub mod frame;
pub mod free_list;
pub mod order;
pub mod unit;

pub use buddy::BuddyAllocator;
pub use frame::{Frame, FrameMap, LinearFrameMap, Pfn};
pub use order::{order_for_pages, pages_for_order, MAX_ORDER, ORDER_COUNT};

use core::fmt;
use displaydoc_lite::displaydoc;
use spin::Mutex;
use crate::unit::KIB;

/// The size of a single page frame in bytes.
///
/// This is also the size of an order-0 block inside
/// the buddy allocator.
pub const PAGE_SIZE: usize = 4 * KIB;

/// Result for every allocator operation.
pub type Result<T, E = Error> = core::result::Result<T, E>;

displaydoc! {
    /// Any expected, recoverable condition an allocator operation can
    /// report. Invariant violations are not represented here, they
    /// abort the allocator instead.
    #[derive(Debug)]
    pub enum Error {
        /// tried to allocate an order that exceeded the maximum order.
        OrderTooLarge,
        /// tried to allocate, but there was no free block of sufficient size left.
        NoMemoryAvailable,
        /// tried to reserve a page frame that is not free.
        FrameNotFree,
        /// tried to allocate zero pages using `alloc_pages`.
        AllocateZeroPages,
    }
}

/// Statistics for a frame allocator, counted in page frames.
#[derive(Debug, Clone)]
pub struct AllocStats {
    /// The name of the allocator that collected these stats.
    pub name: &'static str,
    /// The number of page frames that are currently allocated.
    pub allocated: usize,
    /// The number of page frames that are left for allocation.
    pub free: usize,
    /// The total number of page frames this allocator manages.
    pub total: usize,
}

impl AllocStats {
    /// Create a new [`AllocStats`] instance for the given allocator name.
    pub const fn with_name(name: &'static str) -> Self {
        Self {
            name,
            allocated: 0,
            free: 0,
            total: 0,
        }
    }
}

impl fmt::Display for AllocStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        self.name.chars().try_for_each(|_| write!(f, "~"))?;
        writeln!(
            f,
            "\nAllocated: {} pages ({})",
            self.allocated,
            unit::bytes(self.allocated * PAGE_SIZE)
        )?;
        writeln!(
            f,
            "Free: {} pages ({})",
            self.free,
            unit::bytes(self.free * PAGE_SIZE)
        )?;
        writeln!(
            f,
            "Total: {} pages ({})",
            self.total,
            unit::bytes(self.total * PAGE_SIZE)
        )?;
        self.name.chars().try_for_each(|_| write!(f, "~"))?;
        writeln!(f)?;
        Ok(())
    }
}

/// A [`BuddyAllocator`] behind a spin lock, so the rest of the memory
/// manager can share one allocator between callers.
///
/// This is the serialization discipline the bare allocator demands:
/// every operation takes the lock for its whole duration.
pub struct LockedBuddy<M>(Mutex<BuddyAllocator<M>>);

impl<M: FrameMap> LockedBuddy<M> {
    /// Create an empty locked allocator on top of the given frame map.
    pub fn new(map: M) -> Self {
        Self(Mutex::new(BuddyAllocator::new(map)))
    }

    /// Partition the managed range and make it available for
    /// allocation. Returns the number of page frames in the pool.
    pub fn init(&self) -> usize {
        self.0.lock().init()
    }

    /// The name of the allocation algorithm behind this lock.
    pub fn name(&self) -> &'static str {
        "buddy"
    }

    /// Allocate a block of `2^order` contiguous page frames.
    pub fn allocate(&self, order: usize) -> Result<Frame> {
        self.0.lock().allocate(order)
    }

    /// Allocate enough contiguous page frames to cover `count` pages.
    ///
    /// The block handed out is the smallest power-of-two block that
    /// holds `count` pages, so anything that is not a power of two
    /// over-allocates.
    pub fn alloc_pages(&self, count: usize) -> Result<Frame> {
        if count == 0 {
            return Err(Error::AllocateZeroPages);
        }

        let order = order_for_pages(count);
        if order > MAX_ORDER {
            return Err(Error::OrderTooLarge);
        }

        self.0.lock().allocate(order)
    }

    /// Free a block of `2^order` contiguous page frames.
    pub fn free(&self, block: Frame, order: usize) {
        self.0.lock().free(block, order)
    }

    /// Remove one specific page frame from circulation.
    pub fn reserve(&self, target: Frame) -> Result<()> {
        self.0.lock().reserve(target)
    }

    /// Return the statistics for this allocator.
    pub fn stats(&self) -> AllocStats {
        self.0.lock().stats()
    }

    /// Log the per-order free lists of this allocator.
    pub fn dump_state(&self) {
        self.0.lock().dump_state()
    }
}
