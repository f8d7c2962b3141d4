//! NYA Core Timer
//!
//! Split timer core for speedrunning: a run of named segments, a timing state
//! machine with personal best and gold tracking, and a TCP listener for
//! external autosplitters.
//!
//! This crate can be used as:
//! - A Rust library (rlib) for direct integration
//! - A dynamic library (cdylib) for FFI-based loading, see [`ffi`]
//!
//! ```no_run
//! use nyacore_timer::{Action, AutosplitListener, Dispatcher, Run, Segment, TimerConfig};
//!
//! let run = Run::with_segments("Any%", vec![Segment::new("Tutorial"), Segment::new("Boss")]);
//! let dispatcher = Dispatcher::new(run);
//!
//! let config = TimerConfig::default();
//! let mut listener = AutosplitListener::new(config.server, dispatcher.clone());
//! listener.start()?;
//!
//! dispatcher.dispatch_now(Action::Start);
//! # Ok::<(), nyacore_timer::TimerError>(())
//! ```

pub mod config;
pub mod core;
mod error;
pub mod ffi;
pub mod run;
pub mod server;
pub mod time;

// Re-export commonly used types
pub use config::{Accuracy, FormatConfig, ServerConfig, TimerConfig, DEFAULT_PORT};
pub use core::{Action, ControlEvent, Dispatcher, Notification, Source};
pub use error::{Result, TimerError};
pub use run::{Run, RunDefinition, RunEvent, RunSnapshot, RunState, Segment, TimeKind};
pub use server::AutosplitListener;
pub use time::{MonotonicClock, TimeValue, Timestamp};
