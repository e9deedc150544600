//! Shared constants and small utilities.

mod constants;
mod date_utils;
mod type_utils;

pub use constants::*;
pub use date_utils::*;
pub use type_utils::*;
