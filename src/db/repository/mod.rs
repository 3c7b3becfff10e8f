//! Table-scoped database operations.

mod preference;

pub use preference::*;
