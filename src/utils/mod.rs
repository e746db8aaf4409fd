//! Small helpers shared by several modules

pub mod comparison;
pub mod duration;

pub use comparison::{argmax, safe_float_cmp};
pub use duration::{format_duration, parse_duration};
