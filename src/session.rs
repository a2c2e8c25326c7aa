//! The running debugger: child process, stdout reader task, and the
//! coordinator task that owns stdin and the pending-command table.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::command::{MiCommand, TokenSequence};
use crate::error::{MiError, Result};
use crate::event::{decode_async, Event};
use crate::record::{classify, decode_result, Outcome, Record, ResultClass};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// How long shutdown waits for the debugger to exit on its own once
/// stdin is closed before killing it.
const CLOSE_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Console,
    /// Inferior stdout; sentinel-less lines land here too.
    Target,
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    pub kind: StreamKind,
    pub text: String,
}

/// Background trouble the session survived: advisory, best-effort
/// delivery, unlike the ordered event and stream channels.
#[derive(Debug)]
pub enum Diagnostic {
    /// A result record nobody was waiting for.
    OrphanResult {
        token: Option<u64>,
        class: String,
        rest: String,
    },
    /// An async record whose payload would not decode.
    DecodeError { class: String, message: String },
}

/// Configuration for a session before the debugger is started. The
/// `GDB` environment variable overrides the default binary name.
#[derive(Debug)]
pub struct MiSessionBuilder {
    gdb_path: PathBuf,
    env: Vec<(String, String)>,
    capacity: usize,
    stderr_sink: Option<mpsc::Sender<String>>,
}

impl MiSessionBuilder {
    pub fn open(gdb_path: impl Into<PathBuf>) -> Self {
        MiSessionBuilder {
            gdb_path: gdb_path.into(),
            env: Vec::new(),
            capacity: DEFAULT_CHANNEL_CAPACITY,
            stderr_sink: None,
        }
    }

    pub fn from_env() -> Self {
        let gdb = std::env::var("GDB").unwrap_or_else(|_| "gdb".to_string());
        Self::open(gdb)
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Bound of the event, stream and record channels. A slow consumer
    /// throttles the coordinator and, through it, the debugger; records
    /// are never dropped.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Receive the debugger's stderr line by line. Without a sink,
    /// stderr is discarded.
    pub fn stderr_sink(mut self, sink: mpsc::Sender<String>) -> Self {
        self.stderr_sink = Some(sink);
        self
    }

    /// Spawn the debugger in MI mode against `executable` and enter the
    /// running state.
    pub async fn start(self, executable: &str, args: &[String]) -> Result<MiSession> {
        let mut command = Command::new(&self.gdb_path);
        command.arg("-q").arg("-i").arg("mi").arg(executable);
        for arg in args {
            command.arg(arg);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if self.stderr_sink.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(MiError::Spawn)?;
        let stdin = child.stdin.take().ok_or_else(|| {
            MiError::Spawn(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "debugger stdin not captured",
            ))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            MiError::Spawn(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "debugger stdout not captured",
            ))
        })?;
        if let Some(sink) = self.stderr_sink {
            if let Some(stderr) = child.stderr.take() {
                tokio::spawn(forward_stderr(stderr, sink));
            }
        }

        Ok(MiSession::wire(
            stdout,
            stdin,
            Some(child),
            self.capacity,
            TokenSequence::new(),
        ))
    }
}

/// Handle to a running debugger. Commands may be issued from any task;
/// the session is shared behind `&self` (wrap in `Arc` to move across
/// tasks).
#[derive(Debug)]
pub struct MiSession {
    inbox: mpsc::Sender<SessionRequest>,
    events: Option<mpsc::Receiver<Event>>,
    streams: Option<mpsc::Receiver<StreamRecord>>,
    diagnostics: Option<mpsc::Receiver<Diagnostic>>,
    reader: Option<JoinHandle<()>>,
    coordinator: Option<JoinHandle<()>>,
}

impl MiSession {
    pub(crate) fn wire<R, W>(
        stdout: R,
        stdin: W,
        child: Option<Child>,
        capacity: usize,
        tokens: TokenSequence,
    ) -> MiSession
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (record_tx, record_rx) = mpsc::channel(capacity);
        let (inbox_tx, inbox_rx) = mpsc::channel(capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (stream_tx, stream_rx) = mpsc::channel(capacity);
        let (diag_tx, diag_rx) = mpsc::channel(capacity);

        let reader = tokio::spawn(read_records(stdout, record_tx));
        let coordinator = tokio::spawn(
            Coordinator {
                stdin,
                inbox: inbox_rx,
                records: record_rx,
                events: event_tx,
                streams: stream_tx,
                diagnostics: diag_tx,
                pending: BTreeMap::new(),
                tokens,
                child,
            }
            .run(),
        );

        MiSession {
            inbox: inbox_tx,
            events: Some(event_rx),
            streams: Some(stream_rx),
            diagnostics: Some(diag_rx),
            reader: Some(reader),
            coordinator: Some(coordinator),
        }
    }

    /// Submit one command and wait for its correlated result record.
    /// An `^error` reply surfaces as [`MiError::Protocol`]; the session
    /// keeps running.
    pub async fn execute(&self, command: MiCommand) -> Result<Outcome> {
        let (reply, slot) = oneshot::channel();
        self.inbox
            .send(SessionRequest::Command { command, reply })
            .await
            .map_err(|_| MiError::SessionClosed)?;
        slot.await.map_err(|_| MiError::SessionClosed)?
    }

    /// The ordered async-event subscription. Single consumer; yields
    /// `None` once taken before.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<Event>> {
        self.events.take()
    }

    /// The ordered console/target/log stream subscription.
    pub fn take_streams(&mut self) -> Option<mpsc::Receiver<StreamRecord>> {
        self.streams.take()
    }

    pub fn take_diagnostics(&mut self) -> Option<mpsc::Receiver<Diagnostic>> {
        self.diagnostics.take()
    }

    /// Shut the session down: pending and queued commands fail with
    /// `SessionClosed`, outbound channels close, the child is reaped.
    /// Further `execute` calls fail immediately.
    pub async fn close(&self) {
        let _ = self.inbox.send(SessionRequest::Close).await;
        // The coordinator drops its inbox receiver as the very last step
        // of shutdown, after the child has been reaped.
        self.inbox.closed().await;
    }
}

impl Drop for MiSession {
    fn drop(&mut self) {
        if let Some(coordinator) = self.coordinator.take() {
            coordinator.abort();
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

enum SessionRequest {
    Command {
        command: MiCommand,
        reply: oneshot::Sender<Result<Outcome>>,
    },
    Close,
}

async fn read_records<R>(stdout: R, records: mpsc::Sender<Record>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                trace!(target: "gdbmi", %line, "debugger output");
                if records.send(classify(&line)).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!(target: "gdbmi", %err, "debugger stdout read failed");
                break;
            }
        }
    }
}

async fn forward_stderr<R>(stderr: R, sink: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if sink.send(line).await.is_err() {
            break;
        }
    }
}

struct Coordinator<W> {
    stdin: W,
    inbox: mpsc::Receiver<SessionRequest>,
    records: mpsc::Receiver<Record>,
    events: mpsc::Sender<Event>,
    streams: mpsc::Sender<StreamRecord>,
    diagnostics: mpsc::Sender<Diagnostic>,
    /// Tokens are strictly increasing, so the first entry is the oldest
    /// in-flight command.
    pending: BTreeMap<u64, oneshot::Sender<Result<Outcome>>>,
    tokens: TokenSequence,
    child: Option<Child>,
}

enum Step {
    Request(Option<SessionRequest>),
    Record(Option<Record>),
}

impl<W> Coordinator<W>
where
    W: AsyncWrite + Unpin,
{
    async fn run(mut self) {
        loop {
            let step = tokio::select! {
                request = self.inbox.recv() => Step::Request(request),
                record = self.records.recv() => Step::Record(record),
            };
            match step {
                Step::Request(Some(SessionRequest::Command { command, reply })) => {
                    if !self.submit(command, reply).await {
                        break;
                    }
                }
                // Close requested, or every session handle is gone.
                Step::Request(Some(SessionRequest::Close)) | Step::Request(None) => break,
                Step::Record(Some(record)) => self.route(record).await,
                // stdout hit EOF: the debugger is gone.
                Step::Record(None) => break,
            }
        }
        self.shutdown().await;
    }

    /// Encode, write and register one command. Returns false on a stdin
    /// failure, which is fatal to the session.
    async fn submit(
        &mut self,
        command: MiCommand,
        reply: oneshot::Sender<Result<Outcome>>,
    ) -> bool {
        let token = self.tokens.next();
        let line = command.encode(token);
        debug!(target: "gdbmi", %line, "submit");
        match self.write_line(&line).await {
            Ok(()) => {
                self.pending.insert(token, reply);
                true
            }
            Err(err) => {
                warn!(target: "gdbmi", %err, "debugger stdin write failed");
                let _ = reply.send(Err(MiError::Io(err)));
                false
            }
        }
    }

    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await
    }

    async fn route(&mut self, record: Record) {
        match record {
            Record::Prompt => {}
            Record::Result { token, class, rest } => self.deliver(token, class, rest),
            Record::ExecAsync { class, rest, .. }
            | Record::StatusAsync { class, rest, .. }
            | Record::NotifyAsync { class, rest, .. } => match decode_async(&class, &rest) {
                Ok(event) => {
                    // Bounded send: a slow consumer throttles us here,
                    // which preserves ordering. A dropped receiver means
                    // the caller opted out of events.
                    let _ = self.events.send(event).await;
                }
                Err(err) => self.diagnose(Diagnostic::DecodeError {
                    class,
                    message: err.to_string(),
                }),
            },
            Record::ConsoleStream(text) => self.stream(StreamKind::Console, text).await,
            Record::TargetStream(text) => self.stream(StreamKind::Target, text).await,
            Record::LogStream(text) => self.stream(StreamKind::Log, text).await,
            // Some debuggers let inferior output through without a
            // sentinel; keep it as target output.
            Record::Raw(line) => self.stream(StreamKind::Target, line).await,
        }
    }

    async fn stream(&mut self, kind: StreamKind, text: String) {
        let _ = self.streams.send(StreamRecord { kind, text }).await;
    }

    fn deliver(&mut self, token: Option<u64>, class: String, rest: String) {
        let slot = match token {
            Some(token) => self.pending.remove(&token),
            // An untokenised result answers the oldest in-flight
            // command; the debugger replies in submission order.
            None => self.pending.pop_first().map(|(_, slot)| slot),
        };
        let Some(slot) = slot else {
            warn!(target: "gdbmi", ?token, %class, "result record without awaiter");
            self.diagnose(Diagnostic::OrphanResult { token, class, rest });
            return;
        };
        let payload = match decode_result(&class, &rest) {
            Ok(outcome) if outcome.class == ResultClass::Error => {
                Err(MiError::Protocol(outcome.error_message()))
            }
            Ok(outcome) => Ok(outcome),
            Err(err) => Err(err),
        };
        if slot.send(payload).is_err() {
            // The caller stopped waiting between submit and reply.
            self.diagnose(Diagnostic::OrphanResult { token, class, rest });
        }
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) {
        let _ = self.diagnostics.try_send(diagnostic);
    }

    async fn shutdown(self) {
        let Coordinator {
            stdin,
            mut inbox,
            mut records,
            events,
            streams,
            diagnostics,
            pending,
            child,
            ..
        } = self;

        // Refuse everything already queued, then every in-flight slot.
        inbox.close();
        while let Ok(request) = inbox.try_recv() {
            if let SessionRequest::Command { reply, .. } = request {
                let _ = reply.send(Err(MiError::SessionClosed));
            }
        }
        for (_, slot) in pending {
            let _ = slot.send(Err(MiError::SessionClosed));
        }

        // Close the outbound channels before draining so consumers see
        // the end of the session promptly.
        drop(events);
        drop(streams);
        drop(diagnostics);

        // Closing stdin asks the debugger to exit; give the reader a
        // moment to observe EOF, then reap (or kill) the child.
        drop(stdin);
        let drained = async {
            while records.recv().await.is_some() {}
        };
        let _ = tokio::time::timeout(CLOSE_GRACE, drained).await;

        if let Some(mut child) = child {
            match tokio::time::timeout(CLOSE_GRACE, child.wait()).await {
                Ok(_) => {}
                Err(_) => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                }
            }
        }
        // `inbox` drops here, which is what `close()` waits on.
    }
}
