use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::client::SignalCli;
use super::error::{Result, SignalError};
use super::events::EventBus;
use super::link_state::LinkStore;
use super::types::{ProcessState, SignalEvent, Source, Stream};
use crate::chat::LineReader;

const SOCKET_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Outcome of asking for a provisioning link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStart {
    Started,
    AlreadyLinked,
    InProgress,
}

/// Owns the daemon, link and receive processes.
///
/// Every state transition happens in a method on this type. Output is read on
/// one thread per stream and published as [`SignalEvent::Output`]; exits are
/// only noticed by [`poll`](Self::poll), which the owner calls regularly.
pub struct Supervisor {
    cli: SignalCli,
    bus: EventBus,
    link_store: Box<dyn LinkStore>,
    daemon: ProcessState,
    link: ProcessState,
    receive: ProcessState,
}

impl Supervisor {
    pub fn new(cli: SignalCli, bus: EventBus, link_store: Box<dyn LinkStore>) -> Self {
        Self {
            cli,
            bus,
            link_store,
            daemon: ProcessState::NotStarted,
            link: ProcessState::NotStarted,
            receive: ProcessState::NotStarted,
        }
    }

    pub fn cli(&self) -> &SignalCli {
        &self.cli
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn is_linked(&self) -> bool {
        self.link_store.is_linked()
    }

    pub fn state(&self, source: Source) -> &ProcessState {
        match source {
            Source::Daemon => &self.daemon,
            Source::Link => &self.link,
            Source::Receive => &self.receive,
        }
    }

    fn state_mut(&mut self, source: Source) -> &mut ProcessState {
        match source {
            Source::Daemon => &mut self.daemon,
            Source::Link => &mut self.link,
            Source::Receive => &mut self.receive,
        }
    }

    /// Start `signal-cli daemon --socket <path>` and announce readiness once
    /// the socket shows up or the ready timeout passes
    pub fn start_daemon(&mut self) -> Result<()> {
        if self.daemon.is_running() {
            return Err(SignalError::AlreadyRunning(Source::Daemon));
        }

        let socket = self.cli.daemon_config().socket_path();
        if socket.exists() {
            debug!("Removing stale socket {}", socket.display());
            if let Err(e) = std::fs::remove_file(&socket) {
                warn!("Could not remove stale socket {}: {}", socket.display(), e);
            }
        }

        let mut cmd = self.cli.command(["daemon", "--socket"]);
        cmd.arg(&socket);
        let child = self.spawn(Source::Daemon, cmd)?;
        self.daemon = ProcessState::Running(child);

        let bus = self.bus.clone();
        let timeout = Duration::from_millis(self.cli.daemon_config().ready_timeout_ms);
        thread::Builder::new()
            .name("daemon-ready".to_string())
            .spawn(move || announce_when_ready(&socket, timeout, &bus))?;
        Ok(())
    }

    /// Run `signal-cli link -n <device>` unless this install is already linked.
    /// The provisioning URI arrives as [`SignalEvent::LinkCode`].
    pub fn start_link(&mut self) -> Result<LinkStart> {
        if self.link_store.is_linked() {
            info!("Already linked, not starting link process");
            return Ok(LinkStart::AlreadyLinked);
        }
        if self.link.is_running() {
            return Ok(LinkStart::InProgress);
        }

        let device_name = self.cli.daemon_config().device_name.clone();
        let cmd = self.cli.command(["link", "-n", device_name.as_str()]);
        let child = self.spawn(Source::Link, cmd)?;
        self.link = ProcessState::Running(child);
        Ok(LinkStart::Started)
    }

    /// Run one `receive`; its stdout lines are meant for the envelope parser
    pub fn start_receive(&mut self) -> Result<()> {
        if self.receive.is_running() {
            return Err(SignalError::AlreadyRunning(Source::Receive));
        }

        let timeout = self.cli.daemon_config().receive_timeout.to_string();
        let cmd = self.cli.account_command(["receive", "-t", timeout.as_str()]);
        let child = self.spawn(Source::Receive, cmd)?;
        info!("Receiving for {}", self.cli.account());
        self.receive = ProcessState::Running(child);
        Ok(())
    }

    /// Check running processes for exit without blocking
    pub fn poll(&mut self) {
        for source in [Source::Daemon, Source::Link, Source::Receive] {
            if let Some(code) = self.reap(source) {
                self.on_exit(source, code);
            }
        }
    }

    pub fn stop(&mut self, source: Source) {
        let slot = self.state_mut(source);
        let ProcessState::Running(child) = slot else {
            return;
        };

        if let Err(e) = child.kill() {
            debug!("Killing {} process: {}", source, e);
        }
        let code = match child.wait() {
            Ok(status) => status.code(),
            Err(e) => {
                warn!("Waiting for {} process: {}", source, e);
                None
            }
        };
        *slot = ProcessState::Exited(code);
        info!("Stopped {} process", source);
        self.bus.publish(SignalEvent::Exited { source, code });
    }

    pub fn stop_daemon(&mut self) {
        self.stop(Source::Daemon);
    }

    /// Kill and reap everything still running
    pub fn shutdown(&mut self) {
        for source in [Source::Receive, Source::Link, Source::Daemon] {
            self.stop(source);
        }
    }

    fn spawn(&self, source: Source, mut cmd: Command) -> Result<Child> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("Spawning {} process: {:?}", source, cmd);

        let mut child = cmd.spawn().map_err(|e| SignalError::Spawn {
            process: source,
            source: e,
        })?;
        info!("Started {} process (pid {})", source, child.id());

        // Only the link process prints a provisioning URI
        let capture_code = source == Source::Link;
        if let Some(stdout) = child.stdout.take() {
            pump(source, Stream::Stdout, stdout, self.bus.clone(), capture_code);
        }
        if let Some(stderr) = child.stderr.take() {
            pump(source, Stream::Stderr, stderr, self.bus.clone(), false);
        }
        Ok(child)
    }

    fn reap(&mut self, source: Source) -> Option<Option<i32>> {
        let slot = self.state_mut(source);
        let ProcessState::Running(child) = slot else {
            return None;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                let code = status.code();
                *slot = ProcessState::Exited(code);
                Some(code)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Checking {} process: {}", source, e);
                None
            }
        }
    }

    fn on_exit(&mut self, source: Source, code: Option<i32>) {
        info!("{} process exited with {:?}", source, code);

        if source == Source::Link {
            if code == Some(0) {
                if let Err(e) = self.link_store.set_linked(true) {
                    warn!("Failed to persist link state: {:#}", e);
                }
                info!("Link completed");
                self.bus.publish(SignalEvent::Linked);
            } else {
                warn!("Link failed with {:?}", code);
                self.bus.publish(SignalEvent::LinkFailed { code });
            }
        }

        self.bus.publish(SignalEvent::Exited { source, code });
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Read one child stream on its own thread and publish complete lines.
/// With `capture_code`, the first non-blank line becomes a `LinkCode` event.
fn pump<R>(source: Source, stream: Stream, mut reader: R, bus: EventBus, capture_code: bool)
where
    R: Read + Send + 'static,
{
    let name = format!("{}-{:?}", source, stream).to_lowercase();
    let spawned = thread::Builder::new().name(name).spawn(move || {
        let mut lines = LineReader::new();
        let mut code_pending = capture_code;
        let mut buf = [0u8; 4096];

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("{} {:?} closed: {}", source, stream, e);
                    break;
                }
            };

            for line in lines.push_bytes(&buf[..n]) {
                if code_pending && !line.trim().is_empty() {
                    code_pending = false;
                    info!("Provisioning URI received");
                    bus.publish(SignalEvent::LinkCode(line.trim().to_string()));
                    continue;
                }
                bus.publish(SignalEvent::Output {
                    source,
                    stream,
                    line,
                });
            }
        }

        let rest = lines.pending();
        if !rest.is_empty() {
            debug!("{} {:?} ended mid-line, dropping {:?}", source, stream, rest);
        }
    });

    if let Err(e) = spawned {
        warn!("Could not start reader for {} {:?}: {}", source, stream, e);
    }
}

fn announce_when_ready(socket: &Path, timeout: Duration, bus: &EventBus) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if socket.exists() {
            info!("Daemon socket ready at {}", socket.display());
            bus.publish(SignalEvent::DaemonReady);
            return;
        }
        thread::sleep(SOCKET_POLL_INTERVAL);
    }

    warn!(
        "Daemon socket {} not up after {:?}, continuing anyway",
        socket.display(),
        timeout
    );
    bus.publish(SignalEvent::DaemonReady);
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::chat::EnvelopeParser;
    use crate::config::DaemonConfig;
    use crate::signal::link_state::MemoryLinkStore;
    use crate::signal::Subscription;

    fn temp_socket(dir: &Path) -> PathBuf {
        dir.join("spark.sock")
    }

    fn supervisor(script: &str, linked: bool, tweak: impl FnOnce(&mut DaemonConfig)) -> Supervisor {
        let mut daemon = DaemonConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            ..DaemonConfig::default()
        };
        tweak(&mut daemon);
        Supervisor::new(
            SignalCli::new(daemon, "+2222"),
            EventBus::new(),
            Box::new(MemoryLinkStore::new(linked)),
        )
    }

    /// Poll and collect events until `done` holds or five seconds pass
    fn collect_until(
        sup: &mut Supervisor,
        sub: &Subscription,
        done: impl Fn(&[SignalEvent]) -> bool,
    ) -> Vec<SignalEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while Instant::now() < deadline {
            sup.poll();
            events.extend(sub.drain());
            if done(&events) {
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }
        events
    }

    fn has_exit(events: &[SignalEvent], source: Source) -> bool {
        events
            .iter()
            .any(|e| matches!(e, SignalEvent::Exited { source: s, .. } if *s == source))
    }

    #[test]
    fn test_link_publishes_code_then_links() {
        let mut sup = supervisor(
            "echo 'sgnl://linkdevice?uuid=abc&pub_key=xyz'; sleep 0.2; echo 'Associated with: +2222'",
            false,
            |_| {},
        );
        let sub = sup.bus().subscribe();

        assert_eq!(sup.start_link().unwrap(), LinkStart::Started);
        assert_eq!(sup.start_link().unwrap(), LinkStart::InProgress);

        let events = collect_until(&mut sup, &sub, |ev| {
            has_exit(ev, Source::Link) && ev.contains(&SignalEvent::Linked)
                && ev.iter().any(|e| matches!(e, SignalEvent::Output { .. }))
        });

        assert!(events.contains(&SignalEvent::LinkCode(
            "sgnl://linkdevice?uuid=abc&pub_key=xyz".to_string()
        )));
        assert!(events.contains(&SignalEvent::Output {
            source: Source::Link,
            stream: Stream::Stdout,
            line: "Associated with: +2222".to_string(),
        }));
        assert!(sup.is_linked());
        assert!(matches!(sup.state(Source::Link), ProcessState::Exited(Some(0))));
        assert_eq!(sup.state(Source::Link).label(), "exited (0)");
        assert_eq!(sup.start_link().unwrap(), LinkStart::AlreadyLinked);
    }

    #[test]
    fn test_link_failure() {
        let mut sup = supervisor("echo 'error: no network' >&2; exit 2", false, |_| {});
        let sub = sup.bus().subscribe();
        sup.start_link().unwrap();

        let events = collect_until(&mut sup, &sub, |ev| has_exit(ev, Source::Link));
        assert!(events.contains(&SignalEvent::LinkFailed { code: Some(2) }));
        assert!(!events.contains(&SignalEvent::Linked));
        assert!(!sup.is_linked());
    }

    #[test]
    fn test_already_linked_skips_process() {
        let mut sup = supervisor("exit 0", true, |_| {});
        assert_eq!(sup.start_link().unwrap(), LinkStart::AlreadyLinked);
        assert!(matches!(sup.state(Source::Link), ProcessState::NotStarted));
        assert_eq!(sup.state(Source::Link).label(), "not started");
    }

    #[test]
    fn test_receive_output_feeds_parser() {
        let mut sup = supervisor(
            "printf 'Envelope from: \"A\" +1111 (device: 1) to +2222\\nBody: hello\\n\\n'",
            true,
            |_| {},
        );
        let sub = sup.bus().subscribe();
        sup.start_receive().unwrap();

        // Exit can be reaped before the reader thread drains the pipe
        let events = collect_until(&mut sup, &sub, |ev| {
            has_exit(ev, Source::Receive)
                && ev.iter().any(|e| {
                    matches!(e, SignalEvent::Output { line, .. } if line.starts_with("Body:"))
                })
        });
        let mut parser = EnvelopeParser::new("+2222");
        let messages: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SignalEvent::Output {
                    source: Source::Receive,
                    stream: Stream::Stdout,
                    line,
                } => parser.parse_line(line),
                _ => None,
            })
            .collect();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].contact, "+1111");
        assert_eq!(messages[0].body, "hello");
        assert!(!messages[0].from_self);
    }

    #[test]
    fn test_receive_already_running() {
        let mut sup = supervisor("sleep 5", true, |_| {});
        sup.start_receive().unwrap();
        assert!(matches!(
            sup.start_receive(),
            Err(SignalError::AlreadyRunning(Source::Receive))
        ));

        sup.stop(Source::Receive);
        assert!(matches!(sup.state(Source::Receive), ProcessState::Exited(_)));
    }

    #[test]
    fn test_daemon_ready_when_socket_appears() {
        let dir = tempfile::tempdir().unwrap();
        let socket = temp_socket(dir.path());
        std::fs::write(&socket, "stale").unwrap();

        // sh -c '<script>' daemon --socket <path>: the path is $2
        let mut sup = supervisor("sleep 0.3; touch \"$2\"; sleep 5", true, |d| {
            d.socket = socket.to_string_lossy().to_string();
            d.ready_timeout_ms = 4000;
        });
        let sub = sup.bus().subscribe();
        sup.start_daemon().unwrap();
        assert!(!socket.exists(), "stale socket should be removed");
        assert!(matches!(
            sup.start_daemon(),
            Err(SignalError::AlreadyRunning(Source::Daemon))
        ));

        let events = collect_until(&mut sup, &sub, |ev| ev.contains(&SignalEvent::DaemonReady));
        assert!(events.contains(&SignalEvent::DaemonReady));
        assert!(socket.exists());

        sup.stop_daemon();
        assert!(!sup.state(Source::Daemon).is_running());
        let events = collect_until(&mut sup, &sub, |ev| has_exit(ev, Source::Daemon));
        assert!(has_exit(&events, Source::Daemon));
    }

    #[test]
    fn test_daemon_ready_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let socket = temp_socket(dir.path());
        let mut sup = supervisor("sleep 5", true, |d| {
            d.socket = socket.to_string_lossy().to_string();
            d.ready_timeout_ms = 100;
        });
        let sub = sup.bus().subscribe();
        sup.start_daemon().unwrap();

        let event = sub.recv_timeout(Duration::from_secs(3));
        assert_eq!(event, Some(SignalEvent::DaemonReady));
        sup.shutdown();
    }

    #[test]
    fn test_spawn_failure_is_typed() {
        let mut sup = supervisor("exit 0", false, |d| {
            d.program = "/nonexistent/signal-cli".to_string();
        });
        assert!(matches!(
            sup.start_link(),
            Err(SignalError::Spawn {
                process: Source::Link,
                ..
            })
        ));
        assert!(matches!(sup.state(Source::Link), ProcessState::NotStarted));
    }
}
