//! Autosplit protocol support
//!
//! An external tool (usually a memory-reading autosplitter) connects over TCP
//! and sends one event per line. `codec` turns lines into control events and
//! `AutosplitListener` owns the socket and the thread that reads it.

pub mod codec;
mod listener;

pub use codec::{Decoded, ServerEvent};
pub use listener::AutosplitListener;
