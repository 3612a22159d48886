//! Line-width arithmetic for hex dumps.
//!
//! A dump line has the shape
//!
//! ```text
//! <prefix> HH HH ... HH  | <ascii>
//! ```
//!
//! For `k` byte groups the line needs `prefix + 4k + (k - 1) / 10 + 4`
//! columns: one leading space, three columns per group, one extra space
//! between every run of ten groups, the ` | ` separator, and one ASCII column
//! per group. [`bytes_per_line`] budgets with `k / 10` grouping spaces, which
//! is never smaller, so every line fits.

/// Narrowest line width a sink accepts (a VT100 terminal).
pub const MIN_LINE_WIDTH: usize = 80;

/// Line width used when none is configured.
pub const DEFAULT_LINE_WIDTH: usize = 120;

/// Lower bound on byte groups per line, applied regardless of width.
pub const MIN_BYTES_PER_LINE: usize = 5;

/// Number of byte groups between grouping spaces.
pub const GROUP_SIZE: usize = 10;

/// Columns a line of `count` groups occupies, as budgeted.
pub const fn budgeted_width(count: usize, prefix_len: usize) -> usize {
    4 * count + count / GROUP_SIZE + 4 + prefix_len
}

/// Returns how many byte groups fit on one hex-dump line.
///
/// `line_width` is clamped to [`MIN_LINE_WIDTH`] first. The result is the
/// largest `k` with `4k + k/10 + 4 + prefix_len <= line_width`, but never
/// less than [`MIN_BYTES_PER_LINE`].
pub const fn bytes_per_line(line_width: usize, prefix_len: usize) -> usize {
    let width = if line_width < MIN_LINE_WIDTH {
        MIN_LINE_WIDTH
    } else {
        line_width
    };

    let mut count = width.saturating_sub(4 + prefix_len) / 4;
    while count > 0 && budgeted_width(count, prefix_len) > width {
        count -= 1;
    }

    if count < MIN_BYTES_PER_LINE {
        MIN_BYTES_PER_LINE
    } else {
        count
    }
}
