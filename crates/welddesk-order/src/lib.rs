//! Welddesk Order - sparse sibling ordering
//!
//! Integer `order` keys with a fixed gap between siblings:
//! - `OrderAllocator`: keys for new items, batches and positions
//! - `move_within_list`: single-step reorder of an in-memory list
//! - `OrderAllocator::plan_move`: minimal key changes to persist a move
//!
//! # Example
//!
//! ```rust,ignore
//! use welddesk_order::prelude::*;
//!
//! let alloc = OrderAllocator::default();
//! assert_eq!(alloc.order_values_for_batch(3, SortDirection::Ascending), vec![1000, 2000, 3000]);
//! assert_eq!(alloc.next_order(Some(3000)), 4000);
//! ```

#![warn(unreachable_pub)]

pub mod allocator;
pub mod moves;

pub use allocator::{MovePlan, OrderAllocator, OrderConfig, SortDirection};
pub use moves::{move_target, move_within_list, MoveDirection};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for ordering siblings
    pub use crate::{move_within_list, MoveDirection, OrderAllocator, OrderConfig, SortDirection};
}
