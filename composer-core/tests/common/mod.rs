// composer-core/tests/common/mod.rs

// --- Mocking Infrastructure (for integration tests) ---

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::os::unix::process::ExitStatusExt; // For ExitStatus::from_raw
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::rc::Rc;

use composer_core::{CoreError, CoreResult, FfmpegProcess, FfmpegSpawner};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};

/// Mock implementation of FfmpegProcess.
pub struct MockFfmpegProcess {
    events_to_emit: Vec<FfmpegEvent>,
    exit_status: ExitStatus,
    break_stream: bool,
    lifecycle: Rc<RefCell<Vec<&'static str>>>,
}

impl FfmpegProcess for MockFfmpegProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        for event in self.events_to_emit.drain(..) {
            handler(event)?;
        }
        if self.break_stream {
            return Err(CoreError::InvalidInput("encoder output stream closed".to_string()));
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.lifecycle.borrow_mut().push("wait");
        Ok(self.exit_status)
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.lifecycle.borrow_mut().push("kill");
        Ok(())
    }
}

/// What one scripted encoder run does.
#[derive(Debug, Clone)]
pub struct MockRun {
    /// Exit code of the encoder
    pub exit_code: i32,
    /// Whether output files are created and announced
    pub write_outputs: bool,
    /// Extra log lines emitted before the output announcements
    pub lines: Vec<String>,
    /// Whether reading the encoder output fails after all events
    pub break_stream: bool,
}

impl MockRun {
    pub fn success() -> Self {
        Self {
            exit_code: 0,
            write_outputs: true,
            lines: Vec::new(),
            break_stream: false,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            exit_code,
            write_outputs: true,
            lines: vec!["Conversion failed!".to_string()],
            break_stream: false,
        }
    }

    pub fn silent() -> Self {
        Self {
            exit_code: 0,
            write_outputs: false,
            lines: Vec::new(),
            break_stream: false,
        }
    }

    /// Writes its outputs, then loses the output stream.
    pub fn broken_stream() -> Self {
        Self {
            break_stream: true,
            ..Self::success()
        }
    }
}

/// Mock implementation of FfmpegSpawner.
///
/// Every spawn records its argument list and plays the next scripted run
/// (a successful run once the script is exhausted). Output files are the
/// arguments that name a file in an existing directory and are not inputs.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    script: Rc<RefCell<VecDeque<MockRun>>>,
    received_calls: Rc<RefCell<Vec<Vec<String>>>>,
    lifecycle: Rc<RefCell<Vec<&'static str>>>,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push_run(&self, run: MockRun) {
        self.script.borrow_mut().push_back(run);
    }

    pub fn get_received_calls(&self) -> Vec<Vec<String>> {
        self.received_calls.borrow().clone()
    }

    /// `kill` and `wait` calls made on spawned processes, in order.
    pub fn get_lifecycle(&self) -> Vec<&'static str> {
        self.lifecycle.borrow().clone()
    }
}

fn output_args(args: &[String]) -> Vec<PathBuf> {
    let mut outputs = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 && args[i - 1] == "-i" {
            continue;
        }
        if arg.starts_with('-') || arg.starts_with('[') {
            continue;
        }
        let path = Path::new(arg);
        let in_existing_dir = path.parent().is_some_and(|p| !p.as_os_str().is_empty() && p.is_dir());
        if path.is_absolute() && path.extension().is_some() && in_existing_dir {
            outputs.push(path.to_path_buf());
        }
    }
    outputs
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        let args: Vec<String> = cmd
            .get_args()
            .map(|s| s.to_string_lossy().into_owned())
            .collect();
        self.received_calls.borrow_mut().push(args.clone());

        let run = self
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(MockRun::success);

        let mut events: Vec<FfmpegEvent> = vec![FfmpegEvent::Log(
            LogLevel::Info,
            "ffmpeg version 6.1 Copyright (c) 2000-2023 the FFmpeg developers".to_string(),
        )];
        events.extend(
            run.lines
                .iter()
                .map(|line| FfmpegEvent::Log(LogLevel::Info, line.clone())),
        );
        if run.write_outputs {
            for (index, output) in output_args(&args).iter().enumerate() {
                std::fs::write(output, b"mock output").expect("failed to create mock output");
                let format = output
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default();
                events.push(FfmpegEvent::Log(
                    LogLevel::Info,
                    format!("Output #{index}, {format}, to '{}':", output.display()),
                ));
            }
        }

        Ok(MockFfmpegProcess {
            events_to_emit: events,
            exit_status: ExitStatus::from_raw(run.exit_code << 8),
            break_stream: run.break_stream,
            lifecycle: Rc::clone(&self.lifecycle),
        })
    }
}

/// Files directly inside `dir`.
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .expect("failed to list directory")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}

/// Creates an empty input file.
pub fn create_dummy_file(dir: &Path, filename: &str) -> PathBuf {
    let path = dir.join(filename);
    std::fs::write(&path, b"dummy content").expect("failed to create dummy file");
    path
}
