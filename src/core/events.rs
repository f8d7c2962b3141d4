//! Notifications delivered to observers

use std::net::SocketAddr;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::run::RunEvent;

/// Notification published by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The run changed
    Run(RunEvent),
    /// An autosplit client connected
    Connected { peer: SocketAddr },
    /// The autosplit client went away
    Disconnected,
}

/// Fan-out of notifications to every live subscriber
pub struct Subscribers {
    senders: Vec<Sender<Notification>>,
}

impl Subscribers {
    /// Create an empty subscriber list
    pub fn new() -> Self {
        Self {
            senders: Vec::new(),
        }
    }

    /// Add a subscriber and return its receiving end
    pub fn subscribe(&mut self) -> Receiver<Notification> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        rx
    }

    /// Deliver a notification to all subscribers, dropping closed ones
    pub fn emit(&mut self, notification: Notification) {
        self.senders.retain(|sender| sender.send(notification.clone()).is_ok());
    }
}

impl Default for Subscribers {
    fn default() -> Self {
        Self::new()
    }
}
