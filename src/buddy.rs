//! Implementation of the Buddy Allocator that is responsible for
//! handing out physical page frames to the rest of the memory manager.
//!
//! Memory is tracked as power-of-two-sized, address-aligned blocks.
//! An allocation takes the first free block of the requested order, or
//! splits a larger one down to size; a free re-inserts the block and
//! merges it with its buddy as long as the buddy is free as well.

use crate::frame::{Frame, FrameMap, Pfn};
use crate::free_list::FreeLists;
use crate::order::{pages_for_order, MAX_ORDER, ORDER_COUNT};
use crate::{unit, AllocStats, Error, Result, PAGE_SIZE};
use core::fmt;
use log::{debug, trace};

/// The central structure that is responsible for allocating page
/// frames using the buddy allocation algorithm.
///
/// The allocator only arranges [`Frame`] handles into per-order free
/// lists; a block is allocated exactly when it is reachable from none
/// of the lists. All operations assume the caller serializes access,
/// see [`LockedBuddy`](crate::LockedBuddy) for the locked wrapper.
pub struct BuddyAllocator<M> {
    map: M,
    lists: FreeLists,
    stats: AllocStats,
}

impl<M: FrameMap> BuddyAllocator<M> {
    /// Create an empty allocator on top of the given frame map.
    ///
    /// No memory is available for allocation until [`init`](Self::init)
    /// has partitioned the pool.
    pub fn new(map: M) -> Self {
        Self {
            lists: FreeLists::new(map.frames()),
            stats: AllocStats::with_name("buddy"),
            map,
        }
    }

    /// The name of this allocation algorithm, used by an external
    /// registry to select it among alternatives.
    pub fn name(&self) -> &'static str {
        "buddy"
    }

    /// Partitions the whole managed range into maximal blocks and
    /// makes them available for allocation.
    ///
    /// Any remainder smaller than one maximal block is not tracked and
    /// stays outside the pool. Returns the number of page frames made
    /// available.
    ///
    /// # Panics
    ///
    /// Panics if the pool's base pfn is not aligned for the maximum
    /// order. The range supplier has to hand over an aligned base,
    /// otherwise no block in the pool would ever find its buddy.
    pub fn init(&mut self) -> usize {
        let ppb = pages_for_order(MAX_ORDER);
        let blocks = self.map.frames() / ppb;

        if blocks != 0 {
            let base = self.map.pfn_of(Frame(0));
            assert!(
                base.0 % ppb == 0,
                "pool base pfn {:#x} is not aligned for order {}",
                base.0,
                MAX_ORDER
            );
        }

        for idx in 0..blocks {
            self.lists.insert(Frame(idx * ppb), MAX_ORDER);
        }

        let total = blocks * ppb;
        self.stats.total = total;
        self.stats.free = total;
        self.stats.allocated = 0;

        debug!(
            "made {} pages ({}) available for allocation in {} maximal blocks",
            total,
            unit::bytes(total * PAGE_SIZE),
            blocks
        );
        total
    }

    /// Returns whether the block's page-frame position is correctly
    /// aligned for the given order.
    pub fn is_aligned(&self, block: Frame, order: usize) -> bool {
        self.map.pfn_of(block).0 % pages_for_order(order) == 0
    }

    /// Calculate the buddy of the given block, in the given order.
    ///
    /// The buddy can sit to either side of the block: if the block is
    /// also aligned to the next order, the buddy is the adjacent block
    /// above, otherwise it is the adjacent block below. Returns `None`
    /// if `order` has no higher order to merge into, if the block is
    /// misaligned for `order`, or if the buddy falls outside the
    /// managed range.
    pub fn buddy_of(&self, block: Frame, order: usize) -> Option<Frame> {
        if order >= MAX_ORDER || !self.is_aligned(block, order) {
            return None;
        }

        let pfn = self.map.pfn_of(block).0;
        let pages = pages_for_order(order);

        let buddy = if self.is_aligned(block, order + 1) {
            pfn + pages
        } else {
            pfn - pages
        };

        self.map.frame_of(Pfn(buddy))
    }

    /// Returns whether the given block is currently free at the given
    /// order.
    pub fn is_free(&self, block: Frame, order: usize) -> bool {
        self.lists.contains(block, order)
    }

    /// Splits a free block of the given order into its two halves and
    /// inserts both into the order below. Returns the lower half.
    fn split_block(&mut self, block: Frame, order: usize) -> Frame {
        assert!(order > 0, "cannot split an order 0 block");
        assert!(
            self.is_aligned(block, order),
            "splitting a misaligned block at order {}",
            order
        );

        let target = order - 1;
        // fatal if the block is not actually free
        self.lists.remove(block, order);

        let upper = self
            .buddy_of(block, target)
            .expect("lower half of a split always has a buddy");
        debug_assert!(block < upper);

        self.lists.insert(block, target);
        self.lists.insert(upper, target);

        trace!(
            "split block at {:#x} from order {} into order {}",
            self.map.pfn_of(block).0,
            order,
            target
        );
        block
    }

    /// Merges a free block with its buddy into the order above.
    /// Returns the combined block, which is always described by the
    /// lower of the two addresses.
    ///
    /// Both halves have to be present in the order's free list,
    /// otherwise the removal traps.
    fn merge_block(&mut self, block: Frame, order: usize) -> Frame {
        let buddy = self
            .buddy_of(block, order)
            .expect("merge requires an aligned block below the maximum order");

        let (lower, upper) = if block < buddy {
            (block, buddy)
        } else {
            (buddy, block)
        };

        self.lists.remove(lower, order);
        self.lists.remove(upper, order);
        self.lists.insert(lower, order + 1);

        trace!(
            "merged blocks at {:#x} and {:#x} into order {}",
            self.map.pfn_of(lower).0,
            self.map.pfn_of(upper).0,
            order + 1
        );
        lower
    }

    /// Allocates a block of `2^order` contiguous page frames.
    ///
    /// Searches upward from the requested order for the first free
    /// block and splits it down to size. Exhaustion is an ordinary
    /// outcome reported as [`Error::NoMemoryAvailable`]; the returned
    /// block is owned by the caller and absent from every free list.
    pub fn allocate(&mut self, order: usize) -> Result<Frame> {
        if order > MAX_ORDER {
            return Err(Error::OrderTooLarge);
        }

        // search upward for the first order that holds a free block
        let mut current = order;
        let mut block = loop {
            if current > MAX_ORDER {
                debug!("out of memory: no free block at order {} or above", order);
                return Err(Error::NoMemoryAvailable);
            }

            match self.lists.first(current) {
                Some(block) => break block,
                None => current += 1,
            }
        };

        // split the found block down to the requested order
        while current > order {
            block = self.split_block(block, current);
            current -= 1;
        }

        self.lists.remove(block, order);
        self.alloc_stats(pages_for_order(order));

        trace!(
            "allocated block at {:#x} with order {}",
            self.map.pfn_of(block).0,
            order
        );
        Ok(block)
    }

    /// Frees a block of `2^order` contiguous page frames and merges it
    /// upward with its buddy as long as the buddy is free.
    ///
    /// # Panics
    ///
    /// Panics if `order` is out of range, if the block is misaligned
    /// for `order`, or if the block is already free at `order` — all of
    /// these mean the caller handed back something it did not own.
    pub fn free(&mut self, block: Frame, order: usize) {
        assert!(
            order <= MAX_ORDER,
            "freeing a block at out-of-range order {}",
            order
        );
        assert!(
            self.is_aligned(block, order),
            "freeing a misaligned block at order {}",
            order
        );

        // fatal if the block is already present
        self.lists.insert(block, order);
        self.dealloc_stats(pages_for_order(order));

        let mut current = order;
        let mut block = block;
        while current < MAX_ORDER {
            let buddy = match self.buddy_of(block, current) {
                Some(buddy) => buddy,
                None => break,
            };

            if !self.is_free(buddy, current) {
                break;
            }

            block = self.merge_block(block, current);
            current += 1;
        }
    }

    /// Removes one specific page frame from circulation, whatever size
    /// block currently contains it.
    ///
    /// Walks the orders top down and splits the free block containing
    /// the target at each order, narrowing the free region around the
    /// target down to order 0 without touching unrelated free blocks.
    /// Fails with [`Error::FrameNotFree`] if the page is already
    /// allocated.
    pub fn reserve(&mut self, target: Frame) -> Result<()> {
        let pfn = self.map.pfn_of(target).0;

        for order in (1..ORDER_COUNT).rev() {
            let pages = pages_for_order(order);
            let start = Pfn(pfn / pages * pages);

            if let Some(block) = self.map.frame_of(start) {
                if self.is_free(block, order) {
                    self.split_block(block, order);
                }
            }
        }

        if self.is_free(target, 0) {
            self.lists.remove(target, 0);
            self.alloc_stats(1);
            trace!("reserved page frame {:#x}", pfn);
            Ok(())
        } else {
            Err(Error::FrameNotFree)
        }
    }

    /// Return a copy of the statistics for this allocator.
    pub fn stats(&self) -> AllocStats {
        self.stats.clone()
    }

    /// Logs, per order, the ordered list of free-block addresses.
    ///
    /// Purely observational, the allocator state is left untouched.
    pub fn dump_state(&self) {
        debug!("buddy allocator state:\n{}", self);
    }

    fn alloc_stats(&mut self, pages: usize) {
        self.stats.free = self.stats.free.saturating_sub(pages);
        self.stats.allocated = self.stats.allocated.saturating_add(pages);
    }

    fn dealloc_stats(&mut self, pages: usize) {
        self.stats.free = self.stats.free.saturating_add(pages);
        self.stats.allocated = self.stats.allocated.saturating_sub(pages);
    }
}

impl<M: FrameMap> fmt::Display for BuddyAllocator<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for order in 0..ORDER_COUNT {
            write!(f, "[{:>2}]", order)?;
            for block in self.lists.iter(order) {
                write!(f, " {:#x}", self.map.pfn_of(block).0)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
