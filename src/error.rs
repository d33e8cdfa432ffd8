//! Growth failures reported by the table engine.

use core::alloc::Layout;
use thiserror::Error;

/// The only ways a table operation can fail. Both come from growing the
/// combined bucket/metadata allocation; lookups and removals never fail.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TableError {
    /// The requested bucket count does not fit in `usize` or in a `Layout`.
    #[error("capacity overflow")]
    CapacityOverflow,
    /// The global allocator returned null for `layout`.
    #[error("memory allocation of {} bytes failed", .layout.size())]
    AllocError { layout: Layout },
}

impl TableError {
    /// Escalate the error the way std collections do for infallible
    /// entry points.
    #[cold]
    pub(crate) fn abort(self) -> ! {
        match self {
            TableError::CapacityOverflow => panic!("capacity overflow"),
            TableError::AllocError { layout } => std::alloc::handle_alloc_error(layout),
        }
    }
}
