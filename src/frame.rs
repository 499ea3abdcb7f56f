//! Block identities and the mapping between them and physical
//! page-frame numbers.
//!
//! The allocator never touches memory itself, it only arranges opaque
//! [`Frame`] handles into free lists. Translating a handle to the
//! physical location it stands for (and back) is the job of an
//! externally supplied [`FrameMap`], which must be a stable bijection
//! over the whole managed range.

/// A physical page-frame number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pfn(pub usize);

/// Opaque handle to one page-frame descriptor.
///
/// A `Frame` names the first page of a block; which block size it
/// stands for is always given by the order of the operation it is
/// used in. The ordering of handles follows ascending physical
/// address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frame(pub(crate) usize);

impl Frame {
    /// Create a handle from a raw descriptor index.
    ///
    /// Only meant for [`FrameMap`] implementations outside this crate,
    /// everything else receives handles from the allocator itself.
    pub fn from_index(idx: usize) -> Self {
        Self(idx)
    }

    /// The raw descriptor index behind this handle.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The bijection between page-frame numbers and frame handles.
///
/// The mapping must stay stable for the whole lifetime of the
/// allocator that consumes it, and [`frame_of`](FrameMap::frame_of)
/// followed by [`pfn_of`](FrameMap::pfn_of) must be the identity for
/// every pfn inside the managed range.
pub trait FrameMap {
    /// The total number of page frames in the managed range.
    fn frames(&self) -> usize;

    /// Translate a handle to the page-frame number it stands for.
    fn pfn_of(&self, frame: Frame) -> Pfn;

    /// Translate a page-frame number back into a handle.
    ///
    /// Returns `None` if `pfn` lies outside the managed range.
    fn frame_of(&self, pfn: Pfn) -> Option<Frame>;
}

/// A [`FrameMap`] over one contiguous run of page frames starting at a
/// fixed base pfn.
#[derive(Debug, Clone, Copy)]
pub struct LinearFrameMap {
    base: Pfn,
    count: usize,
}

impl LinearFrameMap {
    /// Create a map for `count` page frames starting at `base`.
    pub fn new(base: Pfn, count: usize) -> Self {
        Self { base, count }
    }

    /// The first page-frame number of the managed range.
    pub fn base(&self) -> Pfn {
        self.base
    }
}

impl FrameMap for LinearFrameMap {
    fn frames(&self) -> usize {
        self.count
    }

    fn pfn_of(&self, frame: Frame) -> Pfn {
        Pfn(self.base.0 + frame.0)
    }

    fn frame_of(&self, pfn: Pfn) -> Option<Frame> {
        let idx = pfn.0.checked_sub(self.base.0)?;
        if idx < self.count {
            Some(Frame(idx))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_map_round_trip() {
        let map = LinearFrameMap::new(Pfn(0x100), 64);

        for idx in 0..64 {
            let frame = Frame(idx);
            let pfn = map.pfn_of(frame);
            assert_eq!(pfn, Pfn(0x100 + idx));
            assert_eq!(map.frame_of(pfn), Some(frame));
        }
    }

    #[test]
    fn linear_map_rejects_out_of_range() {
        let map = LinearFrameMap::new(Pfn(0x100), 64);

        assert_eq!(map.frame_of(Pfn(0xFF)), None);
        assert_eq!(map.frame_of(Pfn(0x100 + 64)), None);
        assert_eq!(map.frame_of(Pfn(0)), None);
    }

    #[test]
    fn handle_order_follows_address() {
        let map = LinearFrameMap::new(Pfn(8), 16);

        let a = map.frame_of(Pfn(9)).unwrap();
        let b = map.frame_of(Pfn(12)).unwrap();
        assert!(a < b);
        assert!(map.pfn_of(a) < map.pfn_of(b));
    }
}
