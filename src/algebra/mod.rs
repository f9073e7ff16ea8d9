//! Interval and value-set algebra.
//!
//! Partition parts are named by tokens: `]10;20]` for a numerical interval,
//! `{a, b}` for a categorical group. Folding needs to sort, coalesce and
//! union these tokens.
//!
//! ```text
//! ]-inf;0]  ]0;10]  ]10;20]  ]20;+inf[     simplify    ]-inf;+inf[
//! {a, b}    c       {b, d}                 merge       {a, b, c, d}
//! ```

mod interval;
mod sets;

pub use interval::{
    find_included_intervals, parse_bound, parse_interval, simplify_intervals, sort_intervals,
    IntervalToken,
};
pub(crate) use interval::cmp_parts;
pub use sets::{merge_categorical_sets, set_values, union_value_groups};
