// ============================================================================
// composer-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: Encoder Process Management and Abstraction
//
// This module provides abstractions for spawning and interacting with encoder
// processes, and the registry that lets a shutdown forcibly terminate every
// process that is still running.
//
// KEY COMPONENTS:
// - FfmpegProcess: Trait representing an active encoder process
// - FfmpegSpawner: Trait for creating new encoder processes
// - SidecarSpawner / SidecarProcess: Implementation using ffmpeg-sidecar
// - ProcessRegistry: Shared set of live processes, keyed by a monotonic id
//
// ARCHITECTURE:
// The runner only talks to the traits, so tests inject a spawner that
// records argument lists and scripts the encoder output.

use std::collections::BTreeMap;
use std::io;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use ffmpeg_sidecar::child::FfmpegChild as SidecarChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;

use crate::command::CompiledCommand;
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error, command_wait_error};

// --- FFmpeg Execution Abstraction ---

/// Something that can forcibly stop a running process from another thread.
pub trait Terminate: Send {
    fn terminate(&self) -> io::Result<()>;
}

/// Trait representing an active encoder process instance.
pub trait FfmpegProcess {
    /// Processes events from the running command using a provided handler closure.
    fn handle_events<F>(&mut self, handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>;

    /// Waits for the command to complete and returns its exit status.
    fn wait(&mut self) -> CoreResult<ExitStatus>;

    /// Kills the process if it is still running. Callers still `wait` to reap it.
    fn kill(&mut self) -> CoreResult<()>;

    /// Handle used by [`ProcessRegistry::terminate_all`]. Processes that
    /// cannot be killed from outside return `None`.
    fn terminator(&self) -> Option<Box<dyn Terminate>> {
        None
    }
}

/// Trait representing something that can spawn an FfmpegProcess.
pub trait FfmpegSpawner {
    type Process: FfmpegProcess;
    /// Spawns the encoder command, consuming the command object.
    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process>;
}

/// Converts a compiled command into an ffmpeg-sidecar command.
pub fn to_ffmpeg_command(command: &CompiledCommand) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new_with_path(command.program());
    cmd.args(command.arguments());
    cmd
}

// --- Concrete Implementation using ffmpeg-sidecar ---

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild` implementing `FfmpegProcess`.
///
/// The child sits behind a mutex so the registry can kill it while the
/// runner is still reading its output.
pub struct SidecarProcess(Arc<Mutex<SidecarChild>>);

impl SidecarProcess {
    fn lock(&self) -> CoreResult<std::sync::MutexGuard<'_, SidecarChild>> {
        self.0
            .lock()
            .map_err(|_| CoreError::InvalidInput("encoder process lock poisoned".to_string()))
    }
}

impl FfmpegProcess for SidecarProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        // the lock is released before iterating so terminate() stays possible
        let iterator = self.lock()?.iter().map_err(|e| {
            log::error!("Failed to get ffmpeg event iterator: {e}");
            command_wait_error("ffmpeg (sidecar - get iter)", io::Error::other(e.to_string()))
        })?;
        for event in iterator {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        loop {
            let status = self
                .lock()?
                .as_inner_mut()
                .try_wait()
                .map_err(|e| command_wait_error("ffmpeg (sidecar)", e))?;
            if let Some(status) = status {
                return Ok(status);
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
    }

    fn kill(&mut self) -> CoreResult<()> {
        SidecarTerminator(Arc::clone(&self.0))
            .terminate()
            .map_err(|e| command_wait_error("ffmpeg (sidecar - kill)", e))
    }

    fn terminator(&self) -> Option<Box<dyn Terminate>> {
        Some(Box::new(SidecarTerminator(Arc::clone(&self.0))))
    }
}

struct SidecarTerminator(Arc<Mutex<SidecarChild>>);

impl Terminate for SidecarTerminator {
    fn terminate(&self) -> io::Result<()> {
        let mut child = self
            .0
            .lock()
            .map_err(|_| io::Error::other("encoder process lock poisoned"))?;
        match child.as_inner_mut().try_wait()? {
            Some(_) => Ok(()),
            None => child.kill(),
        }
    }
}

/// Concrete implementation of `FfmpegSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, mut cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        cmd.spawn()
            .map(|child| SidecarProcess(Arc::new(Mutex::new(child))))
            .map_err(|e| command_start_error("ffmpeg (sidecar)", e))
    }
}

// --- Process Registry ---

/// Shared registry of running encoder processes.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    next_id: Arc<AtomicU64>,
    live: Arc<Mutex<BTreeMap<u64, Box<dyn Terminate>>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a process and returns its id.
    pub fn register(&self, terminator: Box<dyn Terminate>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut live) = self.live.lock() {
            live.insert(id, terminator);
        }
        id
    }

    pub fn unregister(&self, id: u64) {
        if let Ok(mut live) = self.live.lock() {
            live.remove(&id);
        }
    }

    /// Number of processes currently tracked.
    pub fn len(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kills every tracked process and empties the registry.
    pub fn terminate_all(&self) {
        let drained = match self.live.lock() {
            Ok(mut live) => std::mem::take(&mut *live),
            Err(_) => return,
        };
        for (id, process) in drained {
            match process.terminate() {
                Ok(()) => log::info!("Terminated encoder process #{id}"),
                Err(e) => log::warn!("Could not terminate encoder process #{id}: {e}"),
            }
        }
    }
}

impl std::fmt::Debug for ProcessRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRegistry").field("live", &self.len()).finish()
    }
}

/// Builds the error for a process whose exit status is not success.
pub(crate) fn exit_error(command: &CompiledCommand, status: ExitStatus, output: String) -> CoreError {
    command_failed_error(command.to_string(), status, output)
}
