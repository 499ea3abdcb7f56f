//! The per-order free lists backing the buddy allocator.
//!
//! Each order owns one singly-linked list of free blocks, kept in
//! strictly ascending address order. The links live in a flat arena
//! indexed by frame handle, so a frame carries exactly one link cell
//! and can never sit on two lists at the same time.

use crate::frame::Frame;
use crate::order::ORDER_COUNT;
use alloc::vec;
use alloc::vec::Vec;

/// The free-list table: one address-sorted list per order.
pub struct FreeLists {
    heads: [Option<Frame>; ORDER_COUNT],
    links: Vec<Option<Frame>>,
}

impl FreeLists {
    /// Create an empty table with room for `frames` link cells.
    pub fn new(frames: usize) -> Self {
        Self {
            heads: [None; ORDER_COUNT],
            links: vec![None; frames],
        }
    }

    /// Returns whether the list for `order` holds no blocks.
    pub fn is_empty(&self, order: usize) -> bool {
        self.heads[order].is_none()
    }

    /// The lowest-address block in the list for `order`.
    pub fn first(&self, order: usize) -> Option<Frame> {
        self.heads[order]
    }

    /// Inserts `frame` into the list for `order`, preserving ascending
    /// address order.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is already present in the list. A double
    /// insert means some earlier bookkeeping already went wrong, and
    /// continuing would corrupt the accounting.
    pub fn insert(&mut self, frame: Frame, order: usize) {
        let mut prev = None;
        let mut cursor = self.heads[order];

        while let Some(cur) = cursor {
            assert!(
                cur != frame,
                "block {} is already free at order {}",
                frame.0,
                order
            );
            if cur > frame {
                break;
            }
            prev = Some(cur);
            cursor = self.links[cur.0];
        }

        self.links[frame.0] = cursor;
        match prev {
            Some(prev) => self.links[prev.0] = Some(frame),
            None => self.heads[order] = Some(frame),
        }
    }

    /// Unlinks `frame` from the list for `order`.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is not present in the list. The caller
    /// believed the block was free when it was not, which is an
    /// invariant violation, not a recoverable condition.
    pub fn remove(&mut self, frame: Frame, order: usize) {
        let mut prev: Option<Frame> = None;
        let mut cursor = self.heads[order];

        while let Some(cur) = cursor {
            if cur == frame {
                let next = self.links[cur.0];
                match prev {
                    Some(prev) => self.links[prev.0] = next,
                    None => self.heads[order] = next,
                }
                self.links[cur.0] = None;
                return;
            }
            prev = Some(cur);
            cursor = self.links[cur.0];
        }

        panic!("block {} is not free at order {}", frame.0, order);
    }

    /// Returns whether `frame` is present in the list for `order`.
    pub fn contains(&self, frame: Frame, order: usize) -> bool {
        self.iter(order).any(|cur| cur == frame)
    }

    /// Iterate over the blocks in the list for `order`, in ascending
    /// address order.
    pub fn iter(&self, order: usize) -> Iter<'_> {
        Iter {
            lists: self,
            cursor: self.heads[order],
        }
    }
}

/// Iterator over the blocks of one order's free list.
pub struct Iter<'list> {
    lists: &'list FreeLists,
    cursor: Option<Frame>,
}

impl Iterator for Iter<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.cursor?;
        self.cursor = self.lists.links[cur.0];
        Some(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(lists: &FreeLists, order: usize) -> Vec<usize> {
        lists.iter(order).map(|frame| frame.0).collect()
    }

    #[test]
    fn insert_keeps_ascending_order() {
        let mut lists = FreeLists::new(64);

        lists.insert(Frame(32), 0);
        lists.insert(Frame(8), 0);
        lists.insert(Frame(16), 0);
        lists.insert(Frame(0), 0);

        assert_eq!(collect(&lists, 0), vec![0, 8, 16, 32]);
        assert_eq!(lists.first(0), Some(Frame(0)));
    }

    #[test]
    fn remove_relinks_head_middle_and_tail() {
        let mut lists = FreeLists::new(64);
        for idx in &[0, 8, 16, 32] {
            lists.insert(Frame(*idx), 2);
        }

        lists.remove(Frame(16), 2);
        assert_eq!(collect(&lists, 2), vec![0, 8, 32]);

        lists.remove(Frame(0), 2);
        assert_eq!(collect(&lists, 2), vec![8, 32]);

        lists.remove(Frame(32), 2);
        assert_eq!(collect(&lists, 2), vec![8]);

        lists.remove(Frame(8), 2);
        assert!(lists.is_empty(2));
    }

    #[test]
    fn orders_are_independent() {
        let mut lists = FreeLists::new(64);

        lists.insert(Frame(4), 0);
        lists.insert(Frame(8), 3);

        assert!(lists.contains(Frame(4), 0));
        assert!(!lists.contains(Frame(4), 3));
        assert!(lists.contains(Frame(8), 3));
        assert!(!lists.contains(Frame(8), 0));
    }

    #[test]
    #[should_panic(expected = "already free")]
    fn double_insert_is_fatal() {
        let mut lists = FreeLists::new(64);
        lists.insert(Frame(4), 1);
        lists.insert(Frame(4), 1);
    }

    #[test]
    #[should_panic(expected = "is not free")]
    fn removing_absent_block_is_fatal() {
        let mut lists = FreeLists::new(64);
        lists.insert(Frame(4), 1);
        lists.remove(Frame(8), 1);
    }
}
