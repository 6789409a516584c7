//! External separation engine invoker
//!
//! Spawns the engine once per pass and exposes its stdout and stderr as a
//! single ordered stream of lines. The engine redraws progress bars with
//! carriage returns, so both `\n` and `\r` end a line.
//!
//! The process is registered in the [`JobRegistry`] before the first line is
//! returned and released when the run is exhausted or dropped. Dropping an
//! unfinished run kills and reaps the process.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use super::config::EngineConfig;
use super::error::{Result, SeparationError};
use super::registry::{killed_by_sigkill, JobRegistry, ProcessHandle};

/// Lines of engine output kept for error reports
const ERROR_TAIL_LINES: usize = 20;

/// Exit polling interval once both output streams have closed
const EXIT_POLL: Duration = Duration::from_millis(10);

/// One engine invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRequest {
    /// Audio file to separate
    pub input: PathBuf,
    /// `-o` root; the engine writes `{root}/{model}/{input stem}/…`
    pub output_root: PathBuf,
    pub model: String,
    pub device: String,
    /// `--two-stems` target for second-pass splits
    pub two_stems: Option<String>,
    /// Registry key for this process
    pub job_key: String,
}

impl EngineRequest {
    /// Human-readable name of the pass, used in errors and logs
    pub fn pass_label(&self) -> String {
        match &self.two_stems {
            Some(target) => format!("{} split", target),
            None => "pass 1".to_string(),
        }
    }

    /// Directory the engine will write this request's stems into
    pub fn stem_dir(&self) -> PathBuf {
        engine_stem_dir(&self.output_root, &self.model, &self.input)
    }

    fn command(&self, config: &EngineConfig) -> Command {
        let mut command = Command::new(&config.program);
        command
            .args(&config.args)
            .arg("-n")
            .arg(&self.model)
            .arg("-d")
            .arg(&self.device)
            .arg("-o")
            .arg(&self.output_root);
        if let Some(target) = &self.two_stems {
            command.arg("--two-stems").arg(target);
        }
        command
            .arg(&self.input)
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

/// A running engine process, iterated line by line
///
/// Yields `Ok(line)` for every non-blank output line, then at most one
/// `Err(EngineFailure)` if the process exited unsuccessfully. A run that was
/// cancelled through the registry ends without an error; check
/// [`was_cancelled`](Self::was_cancelled).
pub struct EngineRun {
    request: EngineRequest,
    registry: Arc<JobRegistry>,
    handle: ProcessHandle,
    lines: Receiver<String>,
    readers: Vec<JoinHandle<()>>,
    tail: VecDeque<String>,
    finished: bool,
    released: bool,
    cancelled: bool,
}

impl EngineRun {
    /// Spawn the engine and register it under `request.job_key`
    pub fn spawn(
        config: &EngineConfig,
        request: EngineRequest,
        registry: Arc<JobRegistry>,
    ) -> Result<Self> {
        log::info!(
            "[ENGINE] {} {}: {:?} (model {}, device {})",
            request.job_key,
            request.pass_label(),
            request.input,
            request.model,
            request.device
        );

        let mut child = request
            .command(config)
            .spawn()
            .map_err(|e| SeparationError::EngineSpawn {
                program: config.program.clone(),
                source: e,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let handle = ProcessHandle::new(child);
        registry.register(&request.job_key, handle.clone());

        let (tx, rx) = channel::unbounded();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = stdout {
            readers.extend(spawn_reader("stdout", stdout, tx.clone()));
        }
        if let Some(stderr) = stderr {
            readers.extend(spawn_reader("stderr", stderr, tx.clone()));
        }
        drop(tx);

        Ok(Self {
            request,
            registry,
            handle,
            lines: rx,
            readers,
            tail: VecDeque::with_capacity(ERROR_TAIL_LINES),
            finished: false,
            released: false,
            cancelled: false,
        })
    }

    pub fn request(&self) -> &EngineRequest {
        &self.request
    }

    pub fn pid(&self) -> u32 {
        self.handle.pid()
    }

    /// True if the process was killed through the registry
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    fn remember(&mut self, line: &str) {
        if self.tail.len() == ERROR_TAIL_LINES {
            self.tail.pop_front();
        }
        self.tail.push_back(line.to_string());
    }

    fn wait_for_exit(&self) -> std::io::Result<ExitStatus> {
        loop {
            if let Some(status) = self.handle.try_wait()? {
                return Ok(status);
            }
            std::thread::sleep(EXIT_POLL);
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.registry.release(&self.request.job_key, &self.handle);
            self.released = true;
        }
    }

    /// Both streams closed: reap the process and classify the exit
    fn finish(&mut self) -> Option<Result<String>> {
        self.finished = true;

        let status = self.wait_for_exit();
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        self.release();

        let status = match status {
            Ok(status) => status,
            Err(e) => return Some(Err(SeparationError::Io(e))),
        };

        if self.handle.is_cancelled() || killed_by_sigkill(&status) {
            log::info!("[ENGINE] {} {} cancelled", self.request.job_key, self.request.pass_label());
            self.cancelled = true;
            return None;
        }

        if status.success() {
            log::info!("[ENGINE] {} {} finished", self.request.job_key, self.request.pass_label());
            return None;
        }

        let code = status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| status.to_string());
        let message = if self.tail.is_empty() {
            "no output".to_string()
        } else {
            self.tail.iter().cloned().collect::<Vec<_>>().join("\n")
        };

        log::error!(
            "[ENGINE] {} {} failed with exit {}",
            self.request.job_key,
            self.request.pass_label(),
            code
        );

        Some(Err(SeparationError::EngineFailure {
            pass: self.request.pass_label(),
            code,
            message,
        }))
    }
}

impl Iterator for EngineRun {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.lines.recv() {
            Ok(line) => {
                log::debug!("[ENGINE] {}: {}", self.request.job_key, line);
                self.remember(&line);
                Some(Ok(line))
            }
            Err(_) => self.finish(),
        }
    }
}

impl Drop for EngineRun {
    fn drop(&mut self) {
        if !self.finished {
            log::debug!(
                "[ENGINE] {} abandoned, terminating pid {}",
                self.request.job_key,
                self.handle.pid()
            );
            self.handle.terminate();
        }
        self.release();
    }
}

fn spawn_reader<R>(name: &'static str, source: R, tx: Sender<String>) -> Option<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    match std::thread::Builder::new()
        .name(format!("engine-{}", name))
        .spawn(move || pump_lines(source, &tx))
    {
        Ok(handle) => Some(handle),
        Err(e) => {
            // The pipe is dropped with the closure, so the engine sees EPIPE
            log::error!("[ENGINE] Failed to start {} reader: {}", name, e);
            None
        }
    }
}

/// Forward `\n`/`\r`-terminated lines until EOF or the receiver goes away
fn pump_lines<R: Read>(source: R, tx: &Sender<String>) {
    let mut reader = BufReader::new(source);
    let mut line: Vec<u8> = Vec::new();

    loop {
        let (consumed, open) = match reader.fill_buf() {
            Ok([]) => (0, false),
            Ok(buf) => {
                for &byte in buf {
                    if byte == b'\n' || byte == b'\r' {
                        if !emit(&mut line, tx) {
                            return;
                        }
                    } else {
                        line.push(byte);
                    }
                }
                (buf.len(), true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => (0, true),
            Err(e) => {
                log::debug!("[ENGINE] Output stream error: {}", e);
                (0, false)
            }
        };

        if !open {
            break;
        }
        reader.consume(consumed);
    }

    emit(&mut line, tx);
}

/// Send the buffered line if it has content; false if the receiver is gone
fn emit(line: &mut Vec<u8>, tx: &Sender<String>) -> bool {
    let text = String::from_utf8_lossy(line).trim().to_string();
    line.clear();
    if text.is_empty() {
        return true;
    }
    tx.send(text).is_ok()
}

/// Where the engine will put the stems for `input` under `output_root`
pub fn engine_stem_dir(output_root: &Path, model: &str, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_root.join(model).join(stem)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn script_engine(script: &str) -> EngineConfig {
        EngineConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "fake-engine".to_string()],
        }
    }

    fn request(key: &str) -> EngineRequest {
        EngineRequest {
            input: PathBuf::from("/music/in.wav"),
            output_root: PathBuf::from("/out"),
            model: "htdemucs".to_string(),
            device: "cpu".to_string(),
            two_stems: None,
            job_key: key.to_string(),
        }
    }

    #[test]
    fn test_splits_on_newline_and_carriage_return() {
        let registry = Arc::new(JobRegistry::new());
        let run = EngineRun::spawn(
            &script_engine("printf 'a\\rb\\n\\n  \\nc'"),
            request("split"),
            registry.clone(),
        )
        .unwrap();

        let lines: Vec<String> = run.map(|r| r.unwrap()).collect();
        assert_eq!(lines, vec!["a", "b", "c"]);
        assert!(!registry.contains("split"));
    }

    #[test]
    fn test_passes_arguments_in_order() {
        let registry = Arc::new(JobRegistry::new());
        let mut req = request("args");
        req.two_stems = Some("vocals".to_string());
        let run = EngineRun::spawn(&script_engine("printf '%s\\n' \"$*\""), req, registry).unwrap();

        let lines: Vec<String> = run.map(|r| r.unwrap()).collect();
        assert_eq!(
            lines,
            vec!["-n htdemucs -d cpu -o /out --two-stems vocals /music/in.wav"]
        );
    }

    #[test]
    fn test_nonzero_exit_is_engine_failure() {
        let registry = Arc::new(JobRegistry::new());
        let run = EngineRun::spawn(
            &script_engine("echo working; echo 'model not found' >&2; exit 3"),
            request("fail"),
            registry.clone(),
        )
        .unwrap();

        let results: Vec<Result<String>> = run.collect();
        let err = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        match err {
            SeparationError::EngineFailure { pass, code, message } => {
                assert_eq!(pass, "pass 1");
                assert_eq!(code, "3");
                assert!(message.contains("model not found"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(results.last().unwrap().is_err());
        assert!(!registry.contains("fail"));
    }

    #[test]
    fn test_cancel_ends_quietly() {
        let registry = Arc::new(JobRegistry::new());
        let mut run = EngineRun::spawn(
            &script_engine("echo started; exec sleep 30"),
            request("cancel"),
            registry.clone(),
        )
        .unwrap();

        assert_eq!(run.next().unwrap().unwrap(), "started");
        assert!(registry.cancel("cancel"));
        assert!(run.next().is_none());
        assert!(run.was_cancelled());
        assert!(!registry.contains("cancel"));
    }

    #[test]
    fn test_abandoned_run_is_killed_and_released() {
        let registry = Arc::new(JobRegistry::new());
        let mut run = EngineRun::spawn(
            &script_engine("echo started; exec sleep 30"),
            request("abandon"),
            registry.clone(),
        )
        .unwrap();
        assert!(run.next().is_some());
        let handle = registry.lookup("abandon").unwrap();

        drop(run);

        assert!(!registry.contains("abandon"));
        assert!(handle.try_wait().unwrap().is_some());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let registry = Arc::new(JobRegistry::new());
        let config = EngineConfig {
            program: "/nonexistent/engine".to_string(),
            args: Vec::new(),
        };
        let err = EngineRun::spawn(&config, request("missing"), registry.clone())
            .err()
            .unwrap();
        assert!(matches!(err, SeparationError::EngineSpawn { .. }));
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn test_stem_dir_layout() {
        assert_eq!(request("x").stem_dir(), PathBuf::from("/out/htdemucs/in"));
    }
}
