//! The order model: every block tracked by the allocator spans
//! `2^order` page frames.

/// The maximum order for the buddy allocator (inclusive).
///
/// The largest block the allocator will ever track spans
/// `2^MAX_ORDER` page frames.
pub const MAX_ORDER: usize = 16;

/// The size of the free-list table inside the buddy allocator.
pub const ORDER_COUNT: usize = MAX_ORDER + 1;

/// Calculates the number of page frames inside a block of the given order.
pub fn pages_for_order(order: usize) -> usize {
    1 << order
}

/// Calculates the first order whose block holds at least `count` pages.
///
/// This function may return an order that is larger than [`MAX_ORDER`],
/// so callers have to range-check the result.
pub fn order_for_pages(count: usize) -> usize {
    let count = core::cmp::max(count, 1);
    count.next_power_of_two().trailing_zeros() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_per_block() {
        assert_eq!(pages_for_order(0), 1);
        assert_eq!(pages_for_order(1), 2);
        assert_eq!(pages_for_order(4), 16);
        assert_eq!(pages_for_order(MAX_ORDER), 1 << 16);
    }

    #[test]
    fn order_for_page_counts() {
        assert_eq!(order_for_pages(0), 0);
        assert_eq!(order_for_pages(1), 0);
        assert_eq!(order_for_pages(2), 1);
        assert_eq!(order_for_pages(3), 2);
        assert_eq!(order_for_pages(4), 2);
        assert_eq!(order_for_pages(5), 3);
        assert_eq!(order_for_pages(1 << MAX_ORDER), MAX_ORDER);
        assert!(order_for_pages((1 << MAX_ORDER) + 1) > MAX_ORDER);
    }

    #[test]
    fn orders_round_trip() {
        for order in 0..ORDER_COUNT {
            assert_eq!(order_for_pages(pages_for_order(order)), order);
        }
    }
}
