//! Utilities for working with raw byte units.

use core::fmt;

/// `1 KiB`
pub const KIB: usize = 1 << 10;
/// `1 MiB`
pub const MIB: usize = 1 << 20;
/// `1 GiB`
pub const GIB: usize = 1 << 30;
/// `1 TiB`
pub const TIB: usize = 1 << 40;

/// Wrap a raw byte count so it pretty-prints through its
/// [`Display`](core::fmt::Display) implementation.
pub fn bytes(count: usize) -> ByteUnit {
    ByteUnit(count)
}

/// Wrapper around a raw byte count that pretty-prints it.
#[derive(Debug, Clone, Copy)]
pub struct ByteUnit(pub usize);

impl fmt::Display for ByteUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.0 as f32;

        if self.0 < KIB {
            write!(f, "{} B", self.0)
        } else if self.0 < MIB {
            write!(f, "{:.2} KiB", count / KIB as f32)
        } else if self.0 < GIB {
            write!(f, "{:.2} MiB", count / MIB as f32)
        } else if self.0 < TIB {
            write!(f, "{:.2} GiB", count / GIB as f32)
        } else {
            write!(f, "{:.2} TiB", count / TIB as f32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_boundaries() {
        assert_eq!(bytes(512).to_string(), "512 B");
        assert_eq!(bytes(KIB).to_string(), "1.00 KiB");
        assert_eq!(bytes(4 * KIB).to_string(), "4.00 KiB");
        assert_eq!(bytes(3 * MIB / 2).to_string(), "1.50 MiB");
        assert_eq!(bytes(GIB).to_string(), "1.00 GiB");
    }
}
