//! State module for tracking frontier item progress
//!
//! # Components
//!
//! - `ItemState`: `Pending -> Skipped | Merged | Fetched`, one per dequeued item

mod item_state;

pub use item_state::ItemState;
