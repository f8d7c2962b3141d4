//! Action dispatcher: the single serialization point in front of the run

use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use super::actions::{Action, ControlEvent};
use super::events::{Notification, Subscribers};
use crate::run::{Run, RunSnapshot, RunState};
use crate::time::MonotonicClock;
use crate::Result;

struct Shared {
    run: Mutex<Run>,
    subscribers: Mutex<Subscribers>,
    clock: MonotonicClock,
}

/// Funnels manual input and autosplit events into run transitions.
///
/// Cloning yields another handle to the same run. Every transition, and the
/// notifications it produces, happens under one lock, so events from
/// different threads apply in arrival order and never interleave.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Take ownership of a run
    pub fn new(run: Run) -> Self {
        Self {
            shared: Arc::new(Shared {
                run: Mutex::new(run),
                subscribers: Mutex::new(Subscribers::new()),
                clock: MonotonicClock::new(),
            }),
        }
    }

    /// Apply one control event. Never fails; invalid requests change nothing.
    pub fn dispatch(&self, event: impl Into<ControlEvent>) {
        let event = event.into();
        if event.is_noop() {
            return;
        }

        let mut run = self.shared.run.lock();
        log::debug!(
            "Dispatching {:?} at {} from {:?}",
            event.action,
            event.timestamp,
            event.source
        );

        match event.action {
            Action::Start => run.start(event.timestamp),
            Action::Split => run.split(event.timestamp),
            Action::Unsplit => run.unsplit(),
            Action::Pause => run.pause(event.timestamp),
            Action::Resume => run.resume(event.timestamp),
            Action::Reset => run.reset(),
            Action::End => run.end(),
            Action::DoNothing => {}
        }

        self.publish_run_events(&mut run);
    }

    /// Apply a manual action stamped with the dispatcher's clock
    pub fn dispatch_now(&self, action: Action) {
        self.dispatch(ControlEvent::manual(action, self.shared.clock.now()));
    }

    /// Apply a structural edit. The run rejects edits outside READY.
    pub fn edit<R>(&self, edit: impl FnOnce(&mut Run) -> Result<R>) -> Result<R> {
        let mut run = self.shared.run.lock();
        let result = edit(&mut *run);
        self.publish_run_events(&mut run);
        result
    }

    /// Read the run under the lock
    pub fn with_run<R>(&self, read: impl FnOnce(&Run) -> R) -> R {
        read(&*self.shared.run.lock())
    }

    pub fn state(&self) -> RunState {
        self.with_run(Run::state)
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.with_run(Run::snapshot)
    }

    /// Clock used for manual input
    pub fn clock(&self) -> &MonotonicClock {
        &self.shared.clock
    }

    /// Receive every notification published from now on
    pub fn subscribe(&self) -> Receiver<Notification> {
        self.shared.subscribers.lock().subscribe()
    }

    pub fn notify_connected(&self, peer: SocketAddr) {
        self.publish(Notification::Connected { peer });
    }

    pub fn notify_disconnected(&self) {
        self.publish(Notification::Disconnected);
    }

    fn publish(&self, notification: Notification) {
        let _run = self.shared.run.lock();
        self.shared.subscribers.lock().emit(notification);
    }

    fn publish_run_events(&self, run: &mut Run) {
        let events = run.take_events();
        if events.is_empty() {
            return;
        }

        let mut subscribers = self.shared.subscribers.lock();
        for event in events {
            subscribers.emit(Notification::Run(event));
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Run::default())
    }
}
