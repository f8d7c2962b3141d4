//! C ABI for hosts that load the timer as a dynamic library
//!
//! One timer per process. Strings returned to the caller must be released
//! with `timer_free_string`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use parking_lot::Mutex;

use crate::config::ServerConfig;
use crate::core::{Action, ControlEvent, Dispatcher};
use crate::run::{Run, RunDefinition, RunSnapshot};
use crate::server::AutosplitListener;
use crate::time::Timestamp;

struct FfiTimer {
    dispatcher: Dispatcher,
    listener: Option<AutosplitListener>,
}

static TIMER: Mutex<Option<FfiTimer>> = parking_lot::const_mutex(None);

fn into_c_string(text: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(text).unwrap_or_default().into_raw()
}

/// Read a caller string; `None` for null pointers
unsafe fn read_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

fn parse_action(action: *const c_char) -> Option<Action> {
    let name = unsafe { read_c_str(action) }?;
    match name.parse() {
        Ok(action) => Some(action),
        Err(e) => {
            log::warn!("{}", e);
            None
        }
    }
}

/// Create the timer from a run definition
/// definition_json: `{"name": ..., "segments": [...]}`, or null for an empty run
/// Returns error message or null on success (caller must free error string)
#[no_mangle]
pub extern "C" fn timer_init(definition_json: *const c_char) -> *mut c_char {
    let run = match unsafe { read_c_str(definition_json) } {
        Some(text) => match RunDefinition::from_json(&text) {
            Ok(definition) => Run::from_definition(definition),
            Err(e) => return into_c_string(format!("Failed to parse run definition: {}", e)),
        },
        None => Run::default(),
    };

    let mut timer = TIMER.lock();
    if let Some(mut old) = timer.take() {
        if let Some(listener) = old.listener.as_mut() {
            listener.stop();
        }
    }

    log::info!("Timer initialized with {} segments", run.len());
    *timer = Some(FfiTimer {
        dispatcher: Dispatcher::new(run),
        listener: None,
    });
    std::ptr::null_mut()
}

/// Check if the timer is initialized
#[no_mangle]
pub extern "C" fn timer_is_initialized() -> bool {
    TIMER.lock().is_some()
}

/// Stop listening and drop the timer
#[no_mangle]
pub extern "C" fn timer_shutdown() {
    if let Some(mut timer) = TIMER.lock().take() {
        if let Some(listener) = timer.listener.as_mut() {
            listener.stop();
        }
        log::info!("Timer shut down");
    }
}

/// Apply an action at a caller-supplied timestamp (nanoseconds)
/// action: "start", "split", "unsplit", "pause", "resume", "reset", "end"
/// Returns false if the timer is not initialized or the action is unknown
#[no_mangle]
pub extern "C" fn timer_dispatch(action: *const c_char, timestamp: Timestamp) -> bool {
    let Some(action) = parse_action(action) else {
        return false;
    };

    match TIMER.lock().as_ref() {
        Some(timer) => {
            timer.dispatcher.dispatch(ControlEvent::manual(action, timestamp));
            true
        }
        None => false,
    }
}

/// Apply an action stamped with the timer's own clock
#[no_mangle]
pub extern "C" fn timer_dispatch_now(action: *const c_char) -> bool {
    let Some(action) = parse_action(action) else {
        return false;
    };

    match TIMER.lock().as_ref() {
        Some(timer) => {
            timer.dispatcher.dispatch_now(action);
            true
        }
        None => false,
    }
}

/// Current timer clock reading, for callers that stamp their own events
#[no_mangle]
pub extern "C" fn timer_now() -> Timestamp {
    TIMER
        .lock()
        .as_ref()
        .map(|timer| timer.dispatcher.clock().now())
        .unwrap_or(0)
}

/// Get the run snapshot as JSON string
/// Caller must free the returned string with timer_free_string
#[no_mangle]
pub extern "C" fn timer_state_json() -> *mut c_char {
    let snapshot = TIMER
        .lock()
        .as_ref()
        .map(|timer| timer.dispatcher.snapshot())
        .unwrap_or_else(|| RunSnapshot::capture(&Run::default()));

    let json = serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".to_string());
    into_c_string(json)
}

/// Start accepting an autosplit client on all interfaces
/// Returns error message or null on success (caller must free error string)
#[no_mangle]
pub extern "C" fn timer_listen(port: u16) -> *mut c_char {
    let mut guard = TIMER.lock();
    let Some(timer) = guard.as_mut() else {
        return into_c_string("Timer not initialized");
    };

    let config = ServerConfig {
        port,
        ..ServerConfig::default()
    };

    let listening = timer
        .listener
        .as_ref()
        .is_some_and(AutosplitListener::is_running);
    if listening {
        return into_c_string(crate::TimerError::AlreadyRunning.to_string());
    }

    let listener = timer
        .listener
        .insert(AutosplitListener::new(config, timer.dispatcher.clone()));
    match listener.start() {
        Ok(_) => std::ptr::null_mut(),
        Err(e) => into_c_string(e.to_string()),
    }
}

/// Check if the autosplit listener is waiting or connected
#[no_mangle]
pub extern "C" fn timer_is_listening() -> bool {
    TIMER
        .lock()
        .as_ref()
        .and_then(|timer| timer.listener.as_ref())
        .map(AutosplitListener::is_running)
        .unwrap_or(false)
}

/// Stop the autosplit listener, disconnecting any client
#[no_mangle]
pub extern "C" fn timer_stop_listening() {
    if let Some(timer) = TIMER.lock().as_mut() {
        if let Some(listener) = timer.listener.as_mut() {
            listener.stop();
        }
    }
}

/// Free a string returned by the timer
#[no_mangle]
pub extern "C" fn timer_free_string(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            let _ = CString::from_raw(s);
        }
    }
}

/// Get library version
#[no_mangle]
pub extern "C" fn timer_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cs(text: &str) -> CString {
        CString::new(text).unwrap()
    }

    fn take_string(ptr: *mut c_char) -> Option<String> {
        if ptr.is_null() {
            return None;
        }
        let text = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
        timer_free_string(ptr);
        Some(text)
    }

    // The timer is process-global, so the whole lifecycle lives in one test
    #[test]
    fn test_ffi_lifecycle() {
        timer_shutdown();
        assert!(!timer_dispatch(cs("split").as_ptr(), 0));
        assert!(take_string(timer_listen(0)).is_some());

        let bad = take_string(timer_init(cs("{not json").as_ptr()));
        assert!(bad.unwrap().starts_with("Failed to parse run definition"));

        let definition = cs(r#"{"name":"Any%","segments":[{"name":"A"},{"name":"B"}]}"#);
        assert!(take_string(timer_init(definition.as_ptr())).is_none());
        assert!(timer_is_initialized());

        assert!(timer_dispatch(cs("start").as_ptr(), 0));
        assert!(timer_dispatch(cs("split").as_ptr(), 100));
        assert!(!timer_dispatch(cs("restart").as_ptr(), 0));
        assert!(!timer_dispatch(std::ptr::null(), 0));

        let json = take_string(timer_state_json()).unwrap();
        let state: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(state["name"], "Any%");
        assert_eq!(state["state"], "ongoing");
        assert_eq!(state["current_index"], 1);

        assert!(take_string(timer_listen(0)).is_none());
        assert!(timer_is_listening());
        timer_stop_listening();
        assert!(!timer_is_listening());

        let version = unsafe { CStr::from_ptr(timer_version()) };
        assert_eq!(version.to_str().unwrap(), env!("CARGO_PKG_VERSION"));

        timer_shutdown();
        assert!(!timer_is_initialized());
    }
}
