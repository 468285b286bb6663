//! Saturating size arithmetic for allocation requests.
//!
//! Every computation here clamps to the largest value aligned to the
//! requested alignment instead of wrapping, so that an overflowed size
//! fails deterministically in [`crate::raw`] rather than producing an
//! undersized allocation.

/// Round `size` down to a multiple of `align`.
///
/// `align` must be a power of two.
#[inline]
pub fn align_floor(align: usize, size: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    size & !(align - 1)
}

/// Round `size` up to a multiple of `align`, saturating near `usize::MAX`.
///
/// `align` must be a power of two.
#[inline]
pub fn align_ceil(align: usize, size: usize) -> usize {
    align_floor(align, size.saturating_add(align - 1))
}

/// Saturating array size.
///
/// Returns `size * count` when the product is exact, or the saturating
/// sentinel `!(align - 1)` — the largest `align`-aligned value — on
/// overflow. Never anything in between.
#[inline]
pub fn array_size(align: usize, size: usize, count: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    match size.checked_mul(count) {
        Some(total) => total,
        None => !(align - 1),
    }
}

/// Saturating array size for a concrete element type.
pub fn array_size_of<T>(count: usize) -> usize {
    array_size(std::mem::align_of::<T>(), std::mem::size_of::<T>(), count)
}

/// Saturating flexible struct size.
///
/// Computes the allocation size of a struct of minimum size `min` and
/// alignment `align`, whose trailing array of `size`-byte elements starts
/// at byte `offset` and holds `count` elements. Saturates to the largest
/// aligned value on overflow.
///
/// The result is always a multiple of `align` and at least `min`, even
/// when the base struct carries more tail padding than alignment alone
/// requires.
pub fn flex_size(align: usize, min: usize, offset: usize, size: usize, count: usize) -> usize {
    debug_assert!(align.is_power_of_two());

    let ret = size
        .checked_mul(count)
        .and_then(|bytes| bytes.checked_add(offset))
        .and_then(|bytes| bytes.checked_add(align - 1))
        .unwrap_or(usize::MAX);
    let mut ret = align_floor(align, ret);

    // flex_size(.., 0) must cover the whole base struct, including any
    // padding beyond what the flexible array's offset implies.
    if min > align_ceil(align, offset) && ret < min {
        ret = min;
    }

    ret
}

/// Ceiling of log2, for positive `x`.
#[inline]
pub(crate) fn ceil_log2(x: usize) -> u32 {
    debug_assert!(x > 0);
    usize::BITS - (x - 1).leading_zeros()
}
