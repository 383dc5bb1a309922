//! The external surgeon as a pluggable capability.
//!
//! A [`Processor`] takes an argument vector and yields output chunks followed
//! by exactly one exit outcome. [`CommandProcessor`] runs a real OS process;
//! tests substitute scripted processors without touching the runner.

use std::io;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Pipe read size. Each read becomes one chunk.
const CHUNK_SIZE: usize = 8 * 1024;

/// Buffered events per invocation before the pipe readers wait.
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} was not captured")]
    MissingPipe(&'static str),
}

/// How the processor ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited(i32),
    /// Terminated by a signal; no exit code.
    Signalled,
    /// Killed because the job's cancellation token fired.
    Cancelled,
}

impl ExitOutcome {
    pub fn code(self) -> Option<i32> {
        match self {
            ExitOutcome::Exited(code) => Some(code),
            ExitOutcome::Signalled | ExitOutcome::Cancelled => None,
        }
    }

    pub fn success(self) -> bool {
        self == ExitOutcome::Exited(0)
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => ExitOutcome::Exited(code),
            None => ExitOutcome::Signalled,
        }
    }
}

/// One observation of a running processor. `Exited` is always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorEvent {
    Stdout(String),
    Stderr(String),
    Exited(ExitOutcome),
}

/// Receiving side of a running invocation.
pub struct Invocation {
    events: mpsc::Receiver<ProcessorEvent>,
}

impl Invocation {
    /// A sender/invocation pair for processor implementations.
    pub fn channel() -> (mpsc::Sender<ProcessorEvent>, Self) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (tx, Self { events: rx })
    }

    /// Next event, or `None` if the processor went away without reporting an
    /// exit.
    pub async fn next(&mut self) -> Option<ProcessorEvent> {
        self.events.recv().await
    }
}

/// Runs the surgeon for one argument vector.
///
/// Implementations must stop the work and report [`ExitOutcome::Cancelled`]
/// once `cancel` fires.
pub trait Processor: Send + Sync {
    fn invoke(&self, args: &[String], cancel: CancellationToken)
        -> Result<Invocation, ProcessorError>;
}

/// Runs `program base_args... job_args...` as a child process.
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    program: String,
    base_args: Vec<String>,
}

impl CommandProcessor {
    pub fn new<I, S>(program: impl Into<String>, base_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            base_args: base_args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Processor for CommandProcessor {
    fn invoke(
        &self,
        args: &[String],
        cancel: CancellationToken,
    ) -> Result<Invocation, ProcessorError> {
        let mut child = Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or(ProcessorError::MissingPipe("stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or(ProcessorError::MissingPipe("stderr"))?;

        tracing::debug!(pid = ?child.id(), program = %self.program, "Processor spawned");

        let (tx, invocation) = Invocation::channel();
        let stdout_task = tokio::spawn(pump(stdout, tx.clone(), ProcessorEvent::Stdout));
        let stderr_task = tokio::spawn(pump(stderr, tx.clone(), ProcessorEvent::Stderr));

        tokio::spawn(async move {
            let outcome = tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => ExitOutcome::from(status),
                    Err(e) => {
                        tracing::warn!(error = %e, "Waiting on processor failed");
                        ExitOutcome::Signalled
                    }
                },
                _ = cancel.cancelled() => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(error = %e, "Failed to kill processor");
                    }
                    ExitOutcome::Cancelled
                }
            };

            if outcome == ExitOutcome::Cancelled {
                // Grandchildren may still hold the pipes open.
                stdout_task.abort();
                stderr_task.abort();
            } else {
                // Drain remaining output so Exited stays the last event.
                let _ = stdout_task.await;
                let _ = stderr_task.await;
            }

            let _ = tx.send(ProcessorEvent::Exited(outcome)).await;
        });

        Ok(invocation)
    }
}

/// Incremental UTF-8 decoding across pipe reads.
///
/// A character split between two reads is held back until its remaining
/// bytes arrive. Genuinely invalid bytes become U+FFFD.
#[derive(Debug, Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    /// Decode everything complete so far; an unfinished trailing sequence
    /// stays pending.
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    /// Whatever is left once the pipe closes.
    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(rest)
    }
}

async fn pump<R>(mut reader: R, tx: mpsc::Sender<ProcessorEvent>, wrap: fn(String) -> ProcessorEvent)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut carry = Utf8Carry::default();
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = carry.decode(&buf[..n]);
                if chunk.is_empty() {
                    continue;
                }
                if tx.send(wrap(chunk)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Processor pipe read failed");
                break;
            }
        }
    }
    if let Some(rest) = carry.finish() {
        let _ = tx.send(wrap(rest)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_outcome_codes() {
        assert!(ExitOutcome::Exited(0).success());
        assert!(!ExitOutcome::Exited(1).success());
        assert_eq!(ExitOutcome::Exited(7).code(), Some(7));
        assert_eq!(ExitOutcome::Cancelled.code(), None);
        assert!(!ExitOutcome::Signalled.success());
    }

    #[test]
    fn test_utf8_carry_holds_split_character() {
        let bytes = "굴림\n".as_bytes();
        let mut carry = Utf8Carry::default();
        assert_eq!(carry.decode(&bytes[..2]), "");
        assert_eq!(carry.decode(&bytes[2..4]), "굴");
        assert_eq!(carry.decode(&bytes[4..]), "림\n");
        assert_eq!(carry.finish(), None);
    }

    #[test]
    fn test_utf8_carry_replaces_invalid_bytes() {
        let mut carry = Utf8Carry::default();
        assert_eq!(carry.decode(b"a\xffb"), "a\u{FFFD}b");
        // Truncated sequence at EOF.
        assert_eq!(carry.decode(b"c\xea\xb5"), "c");
        assert_eq!(carry.finish().as_deref(), Some("\u{FFFD}"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let processor = CommandProcessor::new("/nonexistent/pptx-surgeon", Vec::<String>::new());
        let result = processor.invoke(&["-d".into()], CancellationToken::new());
        assert!(matches!(result, Err(ProcessorError::Spawn { .. })));
    }

    #[cfg(unix)]
    async fn collect(mut invocation: Invocation) -> (String, String, Option<ExitOutcome>) {
        let mut stdout = String::new();
        let mut stderr = String::new();
        while let Some(event) = invocation.next().await {
            match event {
                ProcessorEvent::Stdout(chunk) => stdout.push_str(&chunk),
                ProcessorEvent::Stderr(chunk) => stderr.push_str(&chunk),
                ProcessorEvent::Exited(outcome) => return (stdout, stderr, Some(outcome)),
            }
        }
        (stdout, stderr, None)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_job_args_follow_base_args() {
        let processor = CommandProcessor::new("sh", ["-c", r#"echo "$@""#, "surgeon"]);
        let invocation = processor
            .invoke(&["-d".into(), "deck.pptx".into()], CancellationToken::new())
            .unwrap();
        let (stdout, _, outcome) = collect(invocation).await;
        assert_eq!(stdout.trim(), "-d deck.pptx");
        assert_eq!(outcome, Some(ExitOutcome::Exited(0)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_streams_both_pipes_then_exit_code() {
        let processor =
            CommandProcessor::new("sh", ["-c", "echo fonts; echo broken >&2; exit 3", "surgeon"]);
        let invocation = processor.invoke(&[], CancellationToken::new()).unwrap();
        let (stdout, stderr, outcome) = collect(invocation).await;
        assert_eq!(stdout, "fonts\n");
        assert_eq!(stderr, "broken\n");
        assert_eq!(outcome, Some(ExitOutcome::Exited(3)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_font_name_split_across_writes() {
        let processor = CommandProcessor::new(
            "sh",
            [
                "-c",
                r"printf '\352\265'; sleep 0.2; printf '\264\353\246\274\n'",
                "surgeon",
            ],
        );
        let invocation = processor.invoke(&[], CancellationToken::new()).unwrap();
        let (stdout, _, outcome) = collect(invocation).await;
        assert_eq!(stdout, "굴림\n");
        assert_eq!(outcome, Some(ExitOutcome::Exited(0)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_kills_child() {
        let processor = CommandProcessor::new("sh", ["-c", "sleep 30", "surgeon"]);
        let cancel = CancellationToken::new();
        let invocation = processor.invoke(&[], cancel.clone()).unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cancel.cancel();

        let (_, _, outcome) =
            tokio::time::timeout(std::time::Duration::from_secs(5), collect(invocation))
                .await
                .expect("processor did not stop after cancellation");
        assert_eq!(outcome, Some(ExitOutcome::Cancelled));
    }
}
