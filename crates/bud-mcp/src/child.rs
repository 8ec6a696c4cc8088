//! Child process capability used by proxy sessions.
//!
//! A session talks to its child only through [`ChildProcess`], so tests can
//! drive the session with in-memory fakes instead of real processes.

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::error::{McpError, Result};
use crate::proxy::ChildServerConfig;

/// A line-oriented child process.
#[async_trait]
pub trait ChildProcess: Send {
    /// OS process id, if known.
    fn id(&self) -> Option<u32>;

    /// Write one line (a newline is appended) and flush.
    async fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Read the next line without its terminator; `None` at end of output.
    async fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Close the child's input. Further writes fail.
    async fn close_stdin(&mut self) -> io::Result<()>;

    /// Ask the process to terminate.
    async fn kill(&mut self) -> io::Result<()>;

    /// Wait for the process to exit, returning its exit code if it has one.
    async fn wait(&mut self) -> io::Result<Option<i32>>;
}

/// Splits a byte stream into lines.
///
/// Bytes of an unfinished line survive a cancelled read, so a read dropped by
/// a timeout resumes mid-line on the next call.
#[derive(Debug)]
pub(crate) struct LineReader<R> {
    reader: R,
    partial: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            partial: Vec::new(),
        }
    }

    /// The next line without its terminator; `None` at end of input.
    pub(crate) async fn next_line(&mut self) -> io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.partial).await?;
        if read == 0 && self.partial.is_empty() {
            return Ok(None);
        }
        let mut line = std::mem::take(&mut self.partial);
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

/// A real child process with piped stdin/stdout and inherited stderr.
pub struct StdioChild {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    stdout: LineReader<BufReader<ChildStdout>>,
}

impl StdioChild {
    /// Spawn the configured command.
    ///
    /// The child inherits the parent's environment plus the configured
    /// overrides. It is killed if the handle is dropped without `kill`.
    pub fn spawn(config: &ChildServerConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(config.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            McpError::spawn_failed(format!("failed to spawn '{}': {}", config.command, e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::spawn_failed("failed to capture stdin"))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::spawn_failed("failed to capture stdout"))?;

        Ok(Self {
            child,
            stdin: Some(BufWriter::new(stdin)),
            stdout: LineReader::new(BufReader::new(stdout)),
        })
    }
}

#[async_trait]
impl ChildProcess for StdioChild {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin closed"))?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await
    }

    async fn read_line(&mut self) -> io::Result<Option<String>> {
        self.stdout.next_line().await
    }

    async fn close_stdin(&mut self) -> io::Result<()> {
        match self.stdin.take() {
            Some(mut stdin) => stdin.shutdown().await,
            None => Ok(()),
        }
    }

    async fn kill(&mut self) -> io::Result<()> {
        match self.child.start_kill() {
            // Already reaped.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }

    async fn wait(&mut self) -> io::Result<Option<i32>> {
        Ok(self.child.wait().await?.code())
    }
}

/// Starts child processes for proxy sessions.
#[async_trait]
pub trait ChildLauncher: Send + Sync {
    /// Start the child described by `config`.
    async fn launch(&self, config: &ChildServerConfig) -> Result<Box<dyn ChildProcess>>;
}

/// Launches real OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

#[async_trait]
impl ChildLauncher for ProcessLauncher {
    async fn launch(&self, config: &ChildServerConfig) -> Result<Box<dyn ChildProcess>> {
        Ok(Box::new(StdioChild::spawn(config)?))
    }
}
