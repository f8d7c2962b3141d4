//! Autosplit TCP listener
//!
//! Accepts a single client, feeds each line through the codec into the
//! dispatcher, and exits when the client leaves. It does not accept another
//! client afterwards; call `start` again to listen for a new one.

use std::io::{self, BufRead, BufReader, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::codec;
use crate::config::ServerConfig;
use crate::core::Dispatcher;
use crate::{Result, TimerError};

/// Background listener for the autosplit protocol
pub struct AutosplitListener {
    config: ServerConfig,
    dispatcher: Dispatcher,
    /// Set while the worker thread is alive
    running: Arc<AtomicBool>,
    /// Checked by the worker on every accept/read wakeup
    stop_requested: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl AutosplitListener {
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher,
            running: Arc::new(AtomicBool::new(false)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            worker: None,
            local_addr: None,
        }
    }

    /// Bind the socket and start waiting for a client.
    ///
    /// Binding happens before this returns, so address errors surface here.
    pub fn start(&mut self) -> Result<SocketAddr> {
        if self.is_running() {
            return Err(TimerError::AlreadyRunning);
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }

        let listener = TcpListener::bind(self.config.socket_addr()?)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        self.stop_requested.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let stop_requested = self.stop_requested.clone();
        let dispatcher = self.dispatcher.clone();
        let poll_interval = self.config.poll_interval();

        let spawned = thread::Builder::new()
            .name("autosplit-listener".to_string())
            .spawn(move || {
                serve(listener, &dispatcher, &stop_requested, poll_interval);
                running.store(false, Ordering::SeqCst);
                log::info!("Autosplit listener thread exited");
            });

        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        }

        self.local_addr = Some(local_addr);
        log::info!("Autosplit listener waiting on {}", local_addr);
        Ok(local_addr)
    }

    /// Ask the worker to stop and wait for it
    pub fn stop(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);

        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
            log::info!("Autosplit listener stopped");
        }
    }

    /// Whether the worker thread is still waiting or connected
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Address bound by the last `start`
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Configured port
    pub fn port(&self) -> u16 {
        self.config.port
    }
}

impl Drop for AutosplitListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker body: one client, then exit
fn serve(
    listener: TcpListener,
    dispatcher: &Dispatcher,
    stop_requested: &AtomicBool,
    poll_interval: Duration,
) {
    let Some((stream, peer)) = accept(&listener, stop_requested, poll_interval) else {
        return;
    };
    // Only one client is ever served
    drop(listener);

    log::info!("Autosplit client connected from {}", peer);
    dispatcher.notify_connected(peer);

    if let Err(e) = read_lines(stream, dispatcher, stop_requested, poll_interval) {
        log::error!("Autosplit connection with {} failed: {}", peer, e);
    }

    log::info!("Autosplit client {} disconnected", peer);
    dispatcher.notify_disconnected();
}

fn accept(
    listener: &TcpListener,
    stop_requested: &AtomicBool,
    poll_interval: Duration,
) -> Option<(TcpStream, SocketAddr)> {
    while !stop_requested.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok(client) => return Some(client),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(poll_interval);
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                log::error!("Autosplit accept failed: {}", e);
                return None;
            }
        }
    }
    None
}

/// Read newline-delimited messages until exit, end of stream, or a stop request
fn read_lines(
    stream: TcpStream,
    dispatcher: &Dispatcher,
    stop_requested: &AtomicBool,
    poll_interval: Duration,
) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(poll_interval))?;

    let mut reader = BufReader::new(stream);
    // Survives read timeouts so a line split across wakeups is not lost
    let mut buffer = Vec::with_capacity(codec::MAX_LINE_LEN);
    // Inside an over-long line; everything up to the next newline is dropped
    let mut discarding = false;

    while !stop_requested.load(Ordering::SeqCst) {
        // Never zero: the buffer is cleared once it reaches the limit
        let remaining = (codec::MAX_LINE_LEN - buffer.len()) as u64;

        match reader.by_ref().take(remaining).read_until(b'\n', &mut buffer) {
            Ok(0) => {
                // A final line may arrive without its newline
                if !discarding && !buffer.is_empty() {
                    handle_line(&buffer, dispatcher);
                }
                log::debug!("Autosplit client closed the stream");
                return Ok(());
            }
            Ok(_) if buffer.last() == Some(&b'\n') => {
                let exit = !discarding && handle_line(&buffer, dispatcher);
                buffer.clear();
                discarding = false;
                if exit {
                    log::debug!("Autosplit client sent exit");
                    return Ok(());
                }
            }
            Ok(_) => {
                if buffer.len() >= codec::MAX_LINE_LEN {
                    if !discarding {
                        log::warn!(
                            "Discarding autosplit line longer than {} bytes",
                            codec::MAX_LINE_LEN
                        );
                    }
                    buffer.clear();
                    discarding = true;
                }
            }
            Err(ref e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => return Err(e),
        }
    }

    log::debug!("Autosplit listener asked to stop");
    Ok(())
}

/// Decode and dispatch one raw line; returns whether the client sent exit
fn handle_line(raw: &[u8], dispatcher: &Dispatcher) -> bool {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim_end_matches(['\r', '\n']);
    let decoded = codec::decode(line);

    dispatcher.dispatch(decoded.event);
    decoded.exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::{Run, RunState, Segment};
    use std::io::Write;
    use std::net::Shutdown;
    use std::time::Instant;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Run::with_segments(
            "test",
            vec![Segment::new("A"), Segment::new("B")],
        ))
    }

    #[test]
    fn test_handle_line_strips_terminators() {
        let d = dispatcher();

        assert!(!handle_line(b"1:100\r\n", &d));
        assert_eq!(d.state(), RunState::Ongoing);

        assert!(handle_line(b"exit\r\n", &d));
        assert_eq!(d.state(), RunState::Ongoing);
    }

    #[test]
    fn test_handle_line_invalid_utf8_is_noop() {
        let d = dispatcher();
        assert!(!handle_line(&[0xff, 0xfe, b'\n'], &d));
        assert_eq!(d.state(), RunState::Ready);
    }

    #[test]
    fn test_start_twice_fails() {
        let mut listener = AutosplitListener::new(ServerConfig::localhost(0), dispatcher());
        let addr = listener.start().unwrap();
        assert_ne!(addr.port(), 0);
        assert!(listener.is_running());
        assert!(matches!(listener.start(), Err(TimerError::AlreadyRunning)));

        listener.stop();
        assert!(!listener.is_running());
    }

    #[test]
    fn test_stop_while_waiting_for_client() {
        let mut listener = AutosplitListener::new(ServerConfig::localhost(0), dispatcher());
        listener.start().unwrap();
        listener.stop();
        assert!(!listener.is_running());

        // Can listen again afterwards
        listener.start().unwrap();
        assert!(listener.is_running());
    }

    #[test]
    fn test_bind_error_is_returned() {
        let config = ServerConfig {
            bind_address: "256.0.0.1".to_string(),
            ..ServerConfig::localhost(0)
        };
        let mut listener = AutosplitListener::new(config, dispatcher());
        assert!(listener.start().is_err());
        assert!(!listener.is_running());
    }

    /// Send `bytes` to a fresh listener, close, and wait for the worker to exit
    fn feed(bytes: &[u8]) -> Dispatcher {
        let d = dispatcher();
        let config = ServerConfig {
            poll_interval_ms: 5,
            ..ServerConfig::localhost(0)
        };
        let mut listener = AutosplitListener::new(config, d.clone());
        let addr = listener.start().unwrap();

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(bytes).unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while listener.is_running() {
            assert!(Instant::now() < deadline, "listener thread did not exit");
            thread::sleep(Duration::from_millis(5));
        }
        d
    }

    #[test]
    fn test_over_long_line_is_discarded() {
        let mut bytes = vec![b'x'; codec::MAX_LINE_LEN * 3];
        // Tail of the long line; would start the run if it were decoded
        bytes.extend_from_slice(b"1:0\n");
        bytes.extend_from_slice(b"3:5\n1:7\n");

        let d = feed(&bytes);

        assert_eq!(d.state(), RunState::Ongoing);
        assert_eq!(d.with_run(Run::current_index), 0);
    }

    #[test]
    fn test_line_at_limit_without_newline_is_discarded() {
        // Leading zeros still parse, so only the cap keeps this from starting
        let mut bytes = vec![b'0'; codec::MAX_LINE_LEN - 3];
        bytes.extend_from_slice(b"1:0");

        let d = feed(&bytes);
        assert_eq!(d.state(), RunState::Ready);
    }

    #[test]
    fn test_final_line_without_newline_is_decoded() {
        let d = feed(b"1:0\n3:5");
        assert_eq!(d.with_run(Run::current_index), 1);
    }
}
