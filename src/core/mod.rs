//! Control plane between inputs and the run
//!
//! - `Action` / `ControlEvent` - what to do and when
//! - `Dispatcher` - applies events to the run one at a time
//! - `Notification` - what observers receive afterwards

mod actions;
mod dispatcher;
mod events;

pub use actions::{Action, ControlEvent, Source};
pub use dispatcher::Dispatcher;
pub use events::{Notification, Subscribers};
