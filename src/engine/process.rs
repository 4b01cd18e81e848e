//! Engine facade backed by a CLIPS command-line subprocess
//!
//! The `clips` executable is driven over its stdin/stdout. Rules may print
//! anything, the prompt included, so every command is followed by a
//! `printout` of a fresh sentinel and the reply is read up to that sentinel
//! and the prompt after it.

use super::{Engine, EngineError, EngineLoader, EnginePath};
use regex::Regex;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::OnceLock;
use uuid::Uuid;

const PROMPT: &[u8] = b"CLIPS> ";
const BINARY_NAME: &str = "clips";

/// CLIPS error diagnostics start with a bracketed tag such as `[PRNTUTIL2]`
fn error_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^\s*\[[A-Z]+[0-9]+\]").expect("error line pattern is valid")
    })
}

/// Emitted after each run while `(watch statistics)` is on
fn fired_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^\s*([0-9]+) rules? fired").expect("fired pattern is valid")
    })
}

/// Loader that starts one `clips` process per engine
#[derive(Debug, Clone)]
pub struct ProcessLoader {
    binary: PathBuf,
}

impl ProcessLoader {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Use `explicit` when given, otherwise look `clips` up on `PATH`
    pub fn locate(explicit: Option<&Path>) -> Result<Self, EngineError> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }
        which::which(BINARY_NAME)
            .map(Self::new)
            .map_err(|e| EngineError::load(format!("cannot find `{BINARY_NAME}` on PATH: {e}")))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl EngineLoader for ProcessLoader {
    fn load(&self, path: &EnginePath) -> Result<Box<dyn Engine>, EngineError> {
        Ok(Box::new(ProcessEngine::spawn(&self.binary, path)?))
    }
}

/// A live `clips` REPL with one script loaded
pub struct ProcessEngine {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ProcessEngine {
    /// Start `binary`, load `script` and enable firing statistics
    pub fn spawn(binary: &Path, script: &EnginePath) -> Result<Self, EngineError> {
        if !script.as_path().is_file() {
            return Err(EngineError::load(format!("rule script not found: {script}")));
        }

        let mut child = Command::new(binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::load(format!("failed to start {}: {e}", binary.display())))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(EngineError::load("clips process has no stdio pipes"));
        };

        let mut engine = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        // Banner
        engine.command("")?;

        let reply = engine.command(&format!("(load {})", quote(script.as_str())))?;
        if let Some(message) = detect_error(&reply) {
            return Err(EngineError::load(message));
        }
        if last_line(&reply) == Some("FALSE") {
            return Err(EngineError::load(format!("clips could not load {script}")));
        }

        engine.checked("(watch statistics)")?;

        tracing::debug!(script = %script, pid = engine.child.id(), "Started clips process");
        Ok(engine)
    }

    /// Send one command and return its output without the trailing prompt
    fn command(&mut self, command: &str) -> Result<String, EngineError> {
        let sentinel = format!("<<end {}>>", Uuid::new_v4().simple());
        writeln!(self.stdin, "{command}")?;
        writeln!(self.stdin, "(printout t \"{sentinel}\" crlf)")?;
        self.stdin.flush()?;
        self.read_through(sentinel.as_bytes())
    }

    /// Like [`command`](Self::command) but diagnostics become errors
    fn checked(&mut self, command: &str) -> Result<String, EngineError> {
        let reply = self.command(command)?;
        match detect_error(&reply) {
            Some(message) => Err(EngineError::command(message)),
            None => Ok(reply),
        }
    }

    fn read_through(&mut self, sentinel: &[u8]) -> Result<String, EngineError> {
        let mut buf = Vec::new();
        loop {
            let chunk = self.stdout.fill_buf()?;
            if chunk.is_empty() {
                return Err(EngineError::io("clips process closed its output"));
            }
            let len = chunk.len();
            buf.extend_from_slice(chunk);
            self.stdout.consume(len);
            if let Some(reply) = split_reply(&buf, sentinel) {
                return Ok(reply);
            }
        }
    }
}

impl Engine for ProcessEngine {
    fn reset(&mut self) -> Result<(), EngineError> {
        self.checked("(reset)").map(|_| ())
    }

    fn run(&mut self) -> Result<u64, EngineError> {
        self.checked("(run)").map(|out| rules_fired(&out))
    }

    fn step(&mut self) -> Result<u64, EngineError> {
        self.checked("(run 1)").map(|out| rules_fired(&out))
    }

    fn fact_list_text(&mut self) -> Result<String, EngineError> {
        self.checked("(facts)")
    }

    fn agenda_text(&mut self) -> Result<String, EngineError> {
        self.checked("(agenda)")
    }
}

impl Drop for ProcessEngine {
    fn drop(&mut self) {
        let _ = self.stdin.write_all(b"(exit)\n");
        let _ = self.stdin.flush();
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Render `text` as a CLIPS string literal
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn detect_error(output: &str) -> Option<String> {
    error_line_pattern()
        .is_match(output)
        .then(|| output.trim().to_string())
}

/// The command's output, once `buf` holds it followed by the prompt, the
/// sentinel line and the final prompt
fn split_reply(buf: &[u8], sentinel: &[u8]) -> Option<String> {
    if !buf.ends_with(PROMPT) {
        return None;
    }
    let at = buf.windows(sentinel.len()).rposition(|w| w == sentinel)?;
    let tail = buf.get(at + sentinel.len()..buf.len() - PROMPT.len())?;
    if !tail.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    let head = buf.get(..at)?;
    let head = head.strip_suffix(PROMPT).unwrap_or(head);
    Some(String::from_utf8_lossy(head).into_owned())
}

fn rules_fired(output: &str) -> u64 {
    fired_pattern()
        .captures(output)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

fn last_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).rfind(|l| !l.is_empty())
}
