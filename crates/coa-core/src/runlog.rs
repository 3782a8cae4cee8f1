//! Run log: a `log::Log` implementation writing to swappable sinks
//!
//! Until a run folder exists, records are held in a [`BufferedSink`]. Once
//! the folder is known, [`RunLogHandle::attach_file`] drains the buffer into
//! a [`FileSink`] and every later record is appended directly. Every line
//! passes through a [`RedactingSink`], so no known secret value reaches a
//! sink in its literal form.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{LevelFilter, Metadata, Record};

/// File name of the run log inside an output folder
pub const RUN_LOG_FILE: &str = "runlog.txt";

/// Destination for formatted log lines
pub trait LogSink: Send {
    /// Write one line (without trailing newline)
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Hand back any lines held in memory
    fn drain(&mut self) -> Vec<String> {
        Vec::new()
    }

    /// Lines held in memory, without draining them
    fn buffered(&self) -> &[String] {
        &[]
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Holds lines in memory until a file sink is attached
#[derive(Debug, Default)]
pub struct BufferedSink {
    lines: Vec<String>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines buffered so far
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl LogSink for BufferedSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }

    fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    fn buffered(&self) -> &[String] {
        &self.lines
    }
}

/// Appends lines to a file
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: File,
}

impl FileSink {
    /// Open `path` for appending, creating it if needed
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.file, "{}", line)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Mask a secret: first and last character kept, `*` in between.
///
/// Values of two characters or fewer are masked completely.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 2 {
        return "*".repeat(chars.len());
    }
    let mut out = String::with_capacity(secret.len());
    out.push(chars[0]);
    out.extend(std::iter::repeat('*').take(chars.len() - 2));
    out.push(chars[chars.len() - 1]);
    out
}

/// Replace every occurrence of each secret in `line` with its mask.
///
/// Longer secrets are replaced first so a secret containing another is
/// never partially revealed.
pub fn redact(line: &str, secrets: &[String]) -> String {
    let mut ordered: Vec<&String> = secrets.iter().filter(|s| !s.is_empty()).collect();
    ordered.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    let mut out = line.to_string();
    for secret in ordered {
        if out.contains(secret.as_str()) {
            out = out.replace(secret.as_str(), &mask(secret));
        }
    }
    out
}

/// Sink decorator that redacts secrets before writing
pub struct RedactingSink<S: LogSink> {
    inner: S,
    secrets: Vec<String>,
}

impl<S: LogSink> RedactingSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            secrets: Vec::new(),
        }
    }

    /// Replace the known secret values
    pub fn set_secrets(&mut self, secrets: Vec<String>) {
        self.secrets = secrets;
    }

    /// Apply redaction without writing
    pub fn redact(&self, line: &str) -> String {
        redact(line, &self.secrets)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Swap the wrapped sink, returning the old one
    pub fn replace_inner(&mut self, inner: S) -> S {
        std::mem::replace(&mut self.inner, inner)
    }
}

impl<S: LogSink> LogSink for RedactingSink<S> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let clean = redact(line, &self.secrets);
        self.inner.write_line(&clean)
    }

    fn drain(&mut self) -> Vec<String> {
        self.inner.drain()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RunLogState {
    sink: RedactingSink<Box<dyn LogSink>>,
    echo: bool,
}

impl LogSink for Box<dyn LogSink> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }

    fn drain(&mut self) -> Vec<String> {
        (**self).drain()
    }

    fn buffered(&self) -> &[String] {
        (**self).buffered()
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Logger for one collector run
pub struct RunLog {
    level: LevelFilter,
    state: Arc<Mutex<RunLogState>>,
}

/// Handle kept by the caller after the logger is installed
#[derive(Clone)]
pub struct RunLogHandle {
    state: Arc<Mutex<RunLogState>>,
}

impl RunLog {
    /// New buffered run log. With `echo`, lines are also printed to stderr.
    pub fn new(level: LevelFilter, echo: bool) -> Self {
        let sink: Box<dyn LogSink> = Box::new(BufferedSink::new());
        Self {
            level,
            state: Arc::new(Mutex::new(RunLogState {
                sink: RedactingSink::new(sink),
                echo,
            })),
        }
    }

    pub fn handle(&self) -> RunLogHandle {
        RunLogHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Install as the global `log` logger
    pub fn install(self) -> Result<RunLogHandle, log::SetLoggerError> {
        let handle = self.handle();
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(handle)
    }

    fn format(record: &Record) -> String {
        format!(
            "{} {:<5} {}",
            chrono::Local::now().format("%H:%M:%S"),
            record.level(),
            record.args()
        )
    }
}

impl log::Log for RunLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Self::format(record);
        if let Ok(mut state) = self.state.lock() {
            if state.echo {
                eprintln!("{}", state.sink.redact(&line));
            }
            let _ = state.sink.write_line(&line);
        }
    }

    fn flush(&self) {
        if let Ok(mut state) = self.state.lock() {
            let _ = state.sink.flush();
        }
    }
}

impl RunLogHandle {
    /// Register secret values to mask from now on
    pub fn set_secrets(&self, secrets: Vec<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.sink.set_secrets(secrets);
        }
    }

    /// Switch to direct mode: drain buffered lines into `path` and append
    /// every later line there.
    pub fn attach_file(&self, path: &Path) -> io::Result<()> {
        let file: Box<dyn LogSink> = Box::new(FileSink::open(path)?);
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("run log lock poisoned"))?;
        let mut previous = state.sink.replace_inner(file);
        for line in previous.drain() {
            state.sink.write_line(&line)?;
        }
        // lines already in a previous file stay there
        let _ = previous.flush();
        state.sink.flush()
    }

    /// Mask known secrets in `line` the same way logged lines are masked
    pub fn redact(&self, line: &str) -> String {
        self.state
            .lock()
            .map(|state| state.sink.redact(line))
            .unwrap_or_else(|_| line.to_string())
    }

    /// Lines still held in memory (empty once a file is attached)
    pub fn buffered(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.sink.inner().buffered().to_vec())
            .unwrap_or_default()
    }
}
