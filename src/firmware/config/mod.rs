mod channels;

use core::fmt;

use log::{debug, warn};

use super::types::SERVER_NAME_MAX;

pub use channels::{
    ClockCommitChannels, ClockView, CLOCK_VIEW, COMMIT_CHANNELS, EXIT_REQUESTED, UI_EVENTS,
    UI_EVENT_QUEUE,
};

pub const DEFAULT_SERVER: &str = "us.pool.ntp.org";
pub const DEFAULT_SERVER_PORT: u16 = 123;
pub const SERVER_RESPONSE_TIMEOUT_MS: u32 = 3_000;
pub const SEND_WAIT_MS: u32 = 2_000;
pub const RECEIVE_WAIT_MS: u32 = 1_000;
pub const UDP_RECEIVE_POLL_US: u32 = 100;
pub const UDP_SEND_POLL_US: u32 = 100;
pub const MAX_RETRIES: u8 = 5;
pub const MAX_RECEIVE_POLLS: u32 = 3_000;
pub const COMMIT_ACK_TIMEOUT_MS: u32 = 1_500;
pub const COMMIT_ENQUEUE_TIMEOUT_MS: u32 = 500;
pub const FRAME_PERIOD_MS: u32 = 16;
pub const CLOCK_TOLERANCE_PPM: u32 = 500;
pub const DESIRED_ACCURACY_MS: u32 = 300;
pub const SYNC_CONFIG_FILE_MAX: usize = 512;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    pub server: heapless::String<SERVER_NAME_MAX>,
    pub port: u16,
    pub max_retries: u8,
    pub response_timeout_ms: u32,
    pub send_wait_ms: u32,
    pub receive_wait_ms: u32,
    pub receive_poll_us: u32,
    pub send_poll_us: u32,
    pub max_receive_polls: u32,
    pub ack_timeout_ms: u32,
    pub frame_ms: u32,
    pub tolerance_ppm: u32,
    pub accuracy_ms: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    TooLarge,
    EmptyServer,
    ServerTooLong,
    InvalidNumber,
    ZeroPort,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::TooLarge => "config file too large",
            Self::EmptyServer => "empty server name",
            Self::ServerTooLong => "server name too long",
            Self::InvalidNumber => "invalid numeric value",
            Self::ZeroPort => "port must be non-zero",
        };
        f.write_str(label)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        let mut server = heapless::String::new();
        let _ = server.push_str(DEFAULT_SERVER);
        Self {
            server,
            port: DEFAULT_SERVER_PORT,
            max_retries: MAX_RETRIES,
            response_timeout_ms: SERVER_RESPONSE_TIMEOUT_MS,
            send_wait_ms: SEND_WAIT_MS,
            receive_wait_ms: RECEIVE_WAIT_MS,
            receive_poll_us: UDP_RECEIVE_POLL_US,
            send_poll_us: UDP_SEND_POLL_US,
            max_receive_polls: MAX_RECEIVE_POLLS,
            ack_timeout_ms: COMMIT_ACK_TIMEOUT_MS,
            frame_ms: FRAME_PERIOD_MS,
            tolerance_ppm: CLOCK_TOLERANCE_PPM,
            accuracy_ms: DESIRED_ACCURACY_MS,
        }
    }
}

impl SyncConfig {
    /// Reads `key=value` lines over the defaults. Blank lines, `#` comments
    /// and unknown keys are skipped.
    pub fn parse(buf: &[u8]) -> Result<Self, ConfigError> {
        if buf.len() > SYNC_CONFIG_FILE_MAX {
            return Err(ConfigError::TooLarge);
        }
        let mut config = Self::default();

        for raw_line in buf.split(|b| *b == b'\n') {
            let line = trim_ascii_line(raw_line);
            if line.is_empty() || line.starts_with(b"#") {
                continue;
            }
            let Some(eq) = line.iter().position(|b| *b == b'=') else {
                continue;
            };
            let key = trim_ascii_line(&line[..eq]);
            let value = trim_ascii_line(&line[eq + 1..]);

            match key {
                b"server" => config.server = parse_server(value)?,
                b"port" => {
                    config.port = parse_number(value)?;
                    if config.port == 0 {
                        return Err(ConfigError::ZeroPort);
                    }
                }
                b"max_retries" => config.max_retries = parse_number(value)?,
                b"response_timeout_ms" => config.response_timeout_ms = parse_number(value)?,
                b"send_wait_ms" => config.send_wait_ms = parse_number(value)?,
                b"receive_wait_ms" => config.receive_wait_ms = parse_number(value)?,
                b"receive_poll_us" => config.receive_poll_us = parse_number(value)?,
                b"send_poll_us" => config.send_poll_us = parse_number(value)?,
                b"max_receive_polls" => config.max_receive_polls = parse_number(value)?,
                b"ack_timeout_ms" => config.ack_timeout_ms = parse_number(value)?,
                b"frame_ms" => config.frame_ms = parse_number(value)?,
                b"tolerance_ppm" => config.tolerance_ppm = parse_number(value)?,
                b"accuracy_ms" => config.accuracy_ms = parse_number(value)?,
                _ => debug!("config: unknown_key len={}", key.len()),
            }
        }
        Ok(config)
    }

    /// Seconds between periodic corrections while synced, `None` when the
    /// configured tolerance and accuracy cannot produce one.
    pub fn poll_interval_secs(&self) -> Option<u32> {
        let interval = poll_interval_secs(self.tolerance_ppm, self.accuracy_ms);
        if interval.is_none() {
            warn!(
                "config: poll_interval_unavailable tolerance_ppm={} accuracy_ms={}",
                self.tolerance_ppm, self.accuracy_ms
            );
        }
        interval
    }
}

/// Largest power-of-two number of seconds over which a clock drifting at
/// `tolerance_ppm` stays within `accuracy_ms`.
pub fn poll_interval_secs(tolerance_ppm: u32, accuracy_ms: u32) -> Option<u32> {
    if tolerance_ppm == 0 || accuracy_ms == 0 {
        return None;
    }
    let exact = (accuracy_ms as u64 * 1_000) / tolerance_ppm as u64;
    if exact == 0 {
        return None;
    }
    let exponent = 63 - exact.leading_zeros();
    u32::try_from(1u64 << exponent).ok()
}

fn parse_server(value: &[u8]) -> Result<heapless::String<SERVER_NAME_MAX>, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::EmptyServer);
    }
    let text = core::str::from_utf8(value).map_err(|_| ConfigError::InvalidNumber)?;
    let mut server = heapless::String::new();
    server
        .push_str(text)
        .map_err(|_| ConfigError::ServerTooLong)?;
    Ok(server)
}

fn parse_number<T: core::str::FromStr>(value: &[u8]) -> Result<T, ConfigError> {
    core::str::from_utf8(value)
        .ok()
        .and_then(|text| text.parse::<T>().ok())
        .ok_or(ConfigError::InvalidNumber)
}

fn trim_ascii_line(mut line: &[u8]) -> &[u8] {
    while matches!(line.last(), Some(b'\r' | b' ' | b'\t')) {
        line = &line[..line.len().saturating_sub(1)];
    }
    while matches!(line.first(), Some(b' ' | b'\t')) {
        line = &line[1..];
    }
    line
}
