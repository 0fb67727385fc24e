//! Single-consumer command queue in front of a `CaptureSession`.
//!
//! The session lives on its own thread and processes commands strictly in
//! arrival order, so accumulators are never touched concurrently and no lock
//! guards them. Capture devices and the control layer talk to it through
//! cloneable [`SessionHandle`]s.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::models::audio_models::{ChannelLevels, SessionDiagnostics};
use crate::models::config::SessionConfig;
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordedFile, StreamChunk};
use crate::models::sample_block::SampleBlock;
use crate::models::state::CaptureState;
use crate::session::capture::CaptureSession;
use crate::traits::capture_device::{BlockCallback, CaptureDevice};

type Reply<T> = Sender<Result<T, CaptureError>>;

enum Command {
    Configure(SessionConfig, Reply<()>),
    Start(Reply<()>),
    Record(SampleBlock),
    Pause(Reply<()>),
    Resume(Reply<()>),
    Stop(Reply<RecordedFile>),
    ExportStreamingChunk(Reply<StreamChunk>),
    Clear(Reply<()>),
    Shutdown,
}

/// Snapshot of the session published after every command.
///
/// Readable from any thread without queueing behind pending commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStatus {
    pub state: CaptureState,
    pub levels: Vec<ChannelLevels>,
    pub diagnostics: SessionDiagnostics,
    pub buffered_frames: usize,
}

impl SessionStatus {
    fn capture(session: &CaptureSession) -> Self {
        Self {
            state: session.state(),
            levels: session.levels().to_vec(),
            diagnostics: session.diagnostics().clone(),
            buffered_frames: session.buffered_frames(),
        }
    }
}

/// Cloneable sender side of a running `SessionWorker`.
///
/// Control methods block until the worker has processed the command.
/// `record` only enqueues, so capture callbacks never wait on an export.
#[derive(Clone)]
pub struct SessionHandle {
    commands: Sender<Command>,
    status: Arc<Mutex<SessionStatus>>,
}

impl SessionHandle {
    pub fn configure(&self, config: SessionConfig) -> Result<(), CaptureError> {
        self.request(|reply| Command::Configure(config, reply))
    }

    pub fn start(&self) -> Result<(), CaptureError> {
        self.request(Command::Start)
    }

    /// Enqueue a block. Rejections are reported through the session delegate.
    pub fn record(&self, block: SampleBlock) -> Result<(), CaptureError> {
        self.commands
            .send(Command::Record(block))
            .map_err(|_| CaptureError::SessionClosed)
    }

    pub fn pause(&self) -> Result<(), CaptureError> {
        self.request(Command::Pause)
    }

    pub fn resume(&self) -> Result<(), CaptureError> {
        self.request(Command::Resume)
    }

    /// Stop and export, after every block enqueued before this call.
    pub fn stop(&self) -> Result<RecordedFile, CaptureError> {
        self.request(Command::Stop)
    }

    pub fn export_streaming_chunk(&self) -> Result<StreamChunk, CaptureError> {
        self.request(Command::ExportStreamingChunk)
    }

    /// Discard the take. Queued behind any export already in flight; that
    /// export still completes and its result is the caller's to discard.
    pub fn clear(&self) -> Result<(), CaptureError> {
        self.request(Command::Clear)
    }

    /// Latest published status.
    pub fn status(&self) -> SessionStatus {
        self.status.lock().clone()
    }

    pub fn state(&self) -> CaptureState {
        self.status.lock().state
    }

    /// Callback that forwards device blocks into this session's queue.
    pub fn block_callback(&self) -> BlockCallback {
        let commands = self.commands.clone();
        Arc::new(move |block: SampleBlock| {
            if commands.send(Command::Record(block)).is_err() {
                log::debug!("dropping captured block: session worker stopped");
            }
        })
    }

    /// Start `device`, feeding its blocks into this session.
    pub fn attach<D: CaptureDevice + ?Sized>(&self, device: &mut D) -> Result<(), CaptureError> {
        if !device.is_available() {
            return Err(CaptureError::ConfigurationFailed("capture device not available".into()));
        }
        device.start(self.block_callback())
    }

    fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, CaptureError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.commands
            .send(command(reply_tx))
            .map_err(|_| CaptureError::SessionClosed)?;
        reply_rx.recv().map_err(|_| CaptureError::SessionClosed)?
    }
}

/// Owns the thread a `CaptureSession` runs on.
///
/// Dropping the worker shuts the thread down; handles then return
/// `CaptureError::SessionClosed`.
pub struct SessionWorker {
    handle: SessionHandle,
    thread: Option<thread::JoinHandle<CaptureSession>>,
}

impl SessionWorker {
    /// Move `session` onto a dedicated thread.
    pub fn spawn(session: CaptureSession) -> Result<Self, CaptureError> {
        let (commands_tx, commands_rx) = crossbeam_channel::unbounded();
        let status = Arc::new(Mutex::new(SessionStatus::capture(&session)));

        let published = Arc::clone(&status);
        let thread = thread::Builder::new()
            .name("wav-capture-session".into())
            .spawn(move || run(session, commands_rx, published))
            .map_err(|e| CaptureError::WorkerFailed(format!("failed to spawn session thread: {}", e)))?;

        Ok(Self {
            handle: SessionHandle {
                commands: commands_tx,
                status,
            },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Process every command already queued, stop the thread and return the
    /// session.
    pub fn shutdown(mut self) -> Result<CaptureSession, CaptureError> {
        self.join()?
            .ok_or_else(|| CaptureError::WorkerFailed("session thread already joined".into()))
    }

    fn join(&mut self) -> Result<Option<CaptureSession>, CaptureError> {
        let Some(thread) = self.thread.take() else {
            return Ok(None);
        };
        // The thread may already be gone; joining reports that.
        let _ = self.handle.commands.send(Command::Shutdown);
        thread
            .join()
            .map(Some)
            .map_err(|_| CaptureError::WorkerFailed("session thread panicked".into()))
    }
}

impl Drop for SessionWorker {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            log::error!("{}", e);
        }
    }
}

fn run(
    mut session: CaptureSession,
    commands: Receiver<Command>,
    status: Arc<Mutex<SessionStatus>>,
) -> CaptureSession {
    log::debug!("session worker started");
    for command in commands.iter() {
        match command {
            Command::Configure(config, reply) => {
                let _ = reply.send(session.configure(config));
            }
            Command::Start(reply) => {
                let _ = reply.send(session.start());
            }
            Command::Record(block) => {
                // Malformed blocks already reached the delegate inside `record`.
                if let Err(e) = session.record(block) {
                    log::debug!("block not recorded: {}", e);
                }
            }
            Command::Pause(reply) => {
                let _ = reply.send(session.pause());
            }
            Command::Resume(reply) => {
                let _ = reply.send(session.resume());
            }
            Command::Stop(reply) => {
                let _ = reply.send(session.stop());
            }
            Command::ExportStreamingChunk(reply) => {
                let _ = reply.send(session.export_streaming_chunk());
            }
            Command::Clear(reply) => {
                session.clear();
                let _ = reply.send(Ok(()));
            }
            Command::Shutdown => break,
        }
        *status.lock() = SessionStatus::capture(&session);
    }
    log::debug!("session worker stopped");
    session
}
