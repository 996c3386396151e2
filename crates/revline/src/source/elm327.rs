//! Thin ELM327 client.
//!
//! Speaks just enough of the ELM327 text interface to poll the handful of
//! single-frame Mode 01 PIDs the dashboard needs. Protocol selection is left to
//! the chip (`ATSP0`); headers stay off so every answer line starts with `41`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use super::{SourceKind, TelemetrySource};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::sample::{Pid, Reading};

/// Sent once after connecting. `ATZ` answers with the version banner, the
/// rest with `OK`.
const INIT_COMMANDS: [&str; 5] = ["ATZ", "ATE0", "ATL0", "ATS0", "ATSP0"];

/// Supported-PIDs request, used to check an ECU is actually answering.
const PROBE_COMMAND: &str = "0100";

/// Prompt the chip prints when ready for the next command.
const PROMPT: u8 = b'>';

/// Time limits for talking to the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Opening the socket.
    pub connect: Duration,
    /// Any single command.
    pub response: Duration,
    /// The first `0100`, which may trigger a protocol search.
    pub probe: Duration,
}

impl Timeouts {
    /// Timeouts from the `[adapter]` section.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            connect: config.connect_timeout(),
            response: config.response_timeout(),
            probe: config.probe_timeout(),
        }
    }
}

/// An initialized ELM327 link over any byte stream.
#[derive(Debug)]
pub struct Elm327<S> {
    stream: S,
    response_timeout: Duration,
    probe_timeout: Duration,
    connected: bool,
    /// Bytes read but not yet consumed, possibly past a prompt.
    pending: Vec<u8>,
    /// Prompts still owed by commands that timed out.
    stale_prompts: usize,
}

impl Elm327<TcpStream> {
    /// Connect to a WiFi adapter and initialize it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdapterConnect`] if the socket cannot be opened in
    /// time, or any initialization error.
    pub async fn connect_tcp(address: &str, timeouts: Timeouts) -> Result<Self> {
        debug!(address, "Connecting to adapter");
        let stream = timeout(timeouts.connect, TcpStream::connect(address))
            .await
            .map_err(|_| Error::adapter_connect(address, "connection timed out"))?
            .map_err(|e| Error::adapter_connect(address, e.to_string()))?;
        stream.set_nodelay(true)?;

        let mut link = Self::new(stream, timeouts.response).with_probe_timeout(timeouts.probe);
        link.initialize().await?;
        Ok(link)
    }
}

impl<S> Elm327<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap a stream. Call [`Elm327::initialize`] before querying.
    #[must_use]
    pub fn new(stream: S, response_timeout: Duration) -> Self {
        Self {
            stream,
            response_timeout,
            probe_timeout: response_timeout,
            connected: false,
            pending: Vec::new(),
            stale_prompts: 0,
        }
    }

    /// Allow the probe longer than other commands.
    #[must_use]
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout.max(self.response_timeout);
        self
    }

    /// Reset the chip, configure it and check an ECU answers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdapterProtocol`] if a setting is refused or no ECU
    /// answers the probe.
    pub async fn initialize(&mut self) -> Result<()> {
        for command in INIT_COMMANDS {
            let response = self.command(command).await?;
            if command != "ATZ" && !response.contains("OK") {
                return Err(Error::adapter_protocol(command, response.trim()));
            }
        }

        let probe = self
            .command_within(PROBE_COMMAND, self.probe_timeout)
            .await?;
        if !compact_hex_lines(&probe).any(|line| line.starts_with("4100")) {
            return Err(Error::adapter_protocol(PROBE_COMMAND, probe.trim()));
        }

        self.connected = true;
        debug!("Adapter initialized");
        Ok(())
    }

    /// Send one command and return the text before the prompt.
    ///
    /// An answer that misses its timeout is still owed; it is drained before
    /// the next command is written so answers never pair with the wrong
    /// command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if no prompt arrives in time, including a
    /// late answer that still has not arrived, and
    /// [`Error::AdapterDisconnected`] if the link is closed.
    pub async fn command(&mut self, command: &str) -> Result<String> {
        self.command_within(command, self.response_timeout).await
    }

    async fn command_within(&mut self, command: &str, limit: Duration) -> Result<String> {
        self.resync().await?;

        trace!(command, "Adapter <-");
        if let Err(e) = self.stream.write_all(format!("{command}\r").as_bytes()).await {
            debug!(error = %e, "Adapter write failed");
            self.connected = false;
            return Err(Error::AdapterDisconnected);
        }

        let Ok(response) = timeout(limit, self.read_until_prompt()).await else {
            self.stale_prompts += 1;
            return Err(Error::timeout(format!("adapter response to {command}")));
        };
        let response = response?;
        trace!(command, response = %response.trim(), "Adapter ->");
        Ok(response)
    }

    /// Discard answers to commands that timed out.
    async fn resync(&mut self) -> Result<()> {
        while self.stale_prompts > 0 {
            let stale = timeout(self.response_timeout, self.read_until_prompt())
                .await
                .map_err(|_| Error::timeout("late adapter response"))??;
            debug!(response = %stale.trim(), "Discarded late adapter response");
            self.stale_prompts -= 1;
        }
        Ok(())
    }

    /// Query one PID. `Ok(None)` means the vehicle does not report it.
    ///
    /// # Errors
    ///
    /// Returns an error if the command itself fails.
    pub async fn query(&mut self, pid: Pid) -> Result<Option<f64>> {
        let command = format!("01{:02X}", pid.code());
        let response = self.command(&command).await?;
        Ok(parse_pid_response(pid, &response))
    }

    /// Read up to the next prompt. Cancel-safe: bytes already read stay in
    /// `pending`, and anything after the prompt is kept for the next call.
    async fn read_until_prompt(&mut self) -> Result<String> {
        let mut chunk = [0u8; 128];
        loop {
            if let Some(end) = self.pending.iter().position(|&b| b == PROMPT) {
                let rest = self.pending.split_off(end + 1);
                let mut response = std::mem::replace(&mut self.pending, rest);
                response.truncate(end);
                return Ok(String::from_utf8_lossy(&response).into_owned());
            }
            let n = match self.stream.read(&mut chunk).await {
                Ok(0) | Err(_) => {
                    self.connected = false;
                    return Err(Error::AdapterDisconnected);
                }
                Ok(n) => n,
            };
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }
}

#[async_trait]
impl<S> TelemetrySource for Elm327<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn kind(&self) -> SourceKind {
        SourceKind::Adapter
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn read(&mut self) -> Result<Reading> {
        if !self.connected {
            return Err(Error::AdapterDisconnected);
        }
        let mut values = [None; Pid::ALL.len()];
        for (slot, pid) in values.iter_mut().zip(Pid::ALL) {
            *slot = self.query(pid).await?;
        }

        let mut reading = Reading::at(Utc::now());
        for (value, pid) in values.into_iter().zip(Pid::ALL) {
            reading.set(pid, value);
        }
        Ok(reading)
    }
}

/// Response lines with whitespace removed, keeping only pure hex lines.
///
/// Drops `SEARCHING...`, `NO DATA`, `?`, `OK` and similar status text.
fn compact_hex_lines(response: &str) -> impl Iterator<Item = String> + '_ {
    response
        .split(['\r', '\n'])
        .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|line| {
            !line.is_empty() && line.len() % 2 == 0 && line.chars().all(|c| c.is_ascii_hexdigit())
        })
}

/// Extract and decode a Mode 01 answer for `pid` from raw adapter text.
#[must_use]
pub fn parse_pid_response(pid: Pid, response: &str) -> Option<f64> {
    compact_hex_lines(response).find_map(|line| {
        let bytes = (0..line.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&line[i..i + 2], 16))
            .collect::<std::result::Result<Vec<u8>, _>>()
            .ok()?;
        match bytes.as_slice() {
            [0x41, code, data @ ..] if *code == pid.code() => pid.decode(data),
            _ => None,
        }
    })
}
