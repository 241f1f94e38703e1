//! Pipeline step implementations.

mod chop;
mod finalize;
mod separate;

pub use chop::ChopStep;
pub use finalize::{cleanup_after_abort, FinalizeStep};
pub use separate::SeparateStep;
