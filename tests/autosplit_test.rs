//! Autosplit listener over loopback

use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::{Duration, Instant};

use nyacore_timer::{
    AutosplitListener, Dispatcher, Notification, Run, RunState, Segment, ServerConfig, TimeValue,
};

const WAIT: Duration = Duration::from_secs(5);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(Run::with_segments(
        "Any%",
        vec![Segment::new("A"), Segment::new("B")],
    ))
}

fn config() -> ServerConfig {
    ServerConfig {
        poll_interval_ms: 10,
        ..ServerConfig::localhost(0)
    }
}

/// Wait for the first notification matching `pred`
fn wait_for(rx: &Receiver<Notification>, pred: impl Fn(&Notification) -> bool) -> Notification {
    let deadline = Instant::now() + WAIT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let notification = rx
            .recv_timeout(remaining)
            .expect("timed out waiting for notification");
        if pred(&notification) {
            return notification;
        }
    }
}

fn wait_until_stopped(listener: &AutosplitListener) {
    let deadline = Instant::now() + WAIT;
    while listener.is_running() {
        assert!(Instant::now() < deadline, "listener thread did not exit");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_client_drives_run_then_exits() {
    init_logging();
    let d = dispatcher();
    let rx = d.subscribe();

    let mut listener = AutosplitListener::new(config(), d.clone());
    let addr = listener.start().unwrap();

    let mut client = TcpStream::connect(addr).unwrap();
    let connected = wait_for(&rx, |n| matches!(n, Notification::Connected { .. }));
    assert_eq!(
        connected,
        Notification::Connected {
            peer: client.local_addr().unwrap()
        }
    );

    // Second line is written in two pieces
    client.write_all(b"1:1000\r\nbogus\n3:11").unwrap();
    client.flush().unwrap();
    thread::sleep(Duration::from_millis(50));
    client.write_all(b"00\n\n\0:3:1250\n").unwrap();
    client.write_all(b"EXIT\n").unwrap();

    wait_for(&rx, |n| *n == Notification::Disconnected);
    wait_until_stopped(&listener);

    assert_eq!(d.state(), RunState::Stopped);
    assert_eq!(d.with_run(|run| run.live_time(0)), TimeValue::from_nanos(100));
    assert_eq!(d.with_run(|run| run.live_time(1)), TimeValue::from_nanos(250));

    // The listener does not take another client after the first one leaves
    assert!(TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_err());
}

#[test]
fn test_end_of_stream_disconnects() {
    init_logging();
    let d = dispatcher();
    let rx = d.subscribe();

    let mut listener = AutosplitListener::new(config(), d.clone());
    let addr = listener.start().unwrap();

    let mut client = TcpStream::connect(addr).unwrap();
    wait_for(&rx, |n| matches!(n, Notification::Connected { .. }));

    client.write_all(b"1:0\n").unwrap();
    client.shutdown(Shutdown::Write).unwrap();

    wait_for(&rx, |n| *n == Notification::Disconnected);
    wait_until_stopped(&listener);
    assert_eq!(d.state(), RunState::Ongoing);

    // Listening again accepts a new client
    let addr = listener.start().unwrap();
    let _client = TcpStream::connect(addr).unwrap();
    wait_for(&rx, |n| matches!(n, Notification::Connected { .. }));
    listener.stop();
    wait_for(&rx, |n| *n == Notification::Disconnected);
}

#[test]
fn test_final_line_without_newline_after_pause() {
    init_logging();
    let d = dispatcher();
    let rx = d.subscribe();

    let mut listener = AutosplitListener::new(config(), d.clone());
    let addr = listener.start().unwrap();

    let mut client = TcpStream::connect(addr).unwrap();
    wait_for(&rx, |n| matches!(n, Notification::Connected { .. }));

    // Several read timeouts pass before the stream closes
    client.write_all(b"1:0").unwrap();
    thread::sleep(Duration::from_millis(100));
    client.shutdown(Shutdown::Write).unwrap();

    wait_for(&rx, |n| *n == Notification::Disconnected);
    wait_until_stopped(&listener);
    assert_eq!(d.state(), RunState::Ongoing);
}

#[test]
fn test_stop_without_client() {
    init_logging();
    let d = dispatcher();
    let rx = d.subscribe();

    let mut listener = AutosplitListener::new(config(), d);
    listener.start().unwrap();
    assert!(listener.is_running());

    listener.stop();
    assert!(!listener.is_running());
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_drop_stops_connected_listener() {
    init_logging();
    let d = dispatcher();
    let rx = d.subscribe();

    let mut listener = AutosplitListener::new(config(), d);
    let addr = listener.start().unwrap();
    let _client = TcpStream::connect(addr).unwrap();
    wait_for(&rx, |n| matches!(n, Notification::Connected { .. }));

    drop(listener);
    assert_eq!(rx.try_recv().unwrap(), Notification::Disconnected);
}
