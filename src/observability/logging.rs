//! Structured logging.
//!
//! # Responsibilities
//! - Pick a sink: the local syslog socket when present, stderr otherwise
//! - Install the global `tracing` subscriber
//! - Configure log level from config, overridable through `RUST_LOG`
//!
//! # Design Decisions
//! - Guards only emit `tracing` events; choosing and probing the sink happens here
//! - Syslog receives one datagram per event, prefixed with its `<PRI>`, never in the multi-line pretty format

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::config::schema::{LogFormat, ObservabilityConfig, SinkKind};
use crate::config::validation::parse_level;

#[cfg(target_os = "macos")]
pub const SYSLOG_PATH: &str = "/var/run/syslog";
#[cfg(not(target_os = "macos"))]
pub const SYSLOG_PATH: &str = "/dev/log";

/// Syslog facility `user`.
const FACILITY_USER: u8 = 1;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level '{0}'")]
    InvalidLevel(String),

    #[error("failed to connect to syslog socket {path}: {source}")]
    Syslog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("syslog sink is only supported on unix")]
    Unsupported,

    #[error("failed to install subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Destination for log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Syslog(PathBuf),
    Stderr,
}

impl LogSink {
    /// Syslog at the platform socket if it exists, else stderr.
    pub fn detect() -> Self {
        Self::detect_at(Path::new(SYSLOG_PATH))
    }

    pub fn detect_at(path: &Path) -> Self {
        if path.exists() {
            LogSink::Syslog(path.to_path_buf())
        } else {
            LogSink::Stderr
        }
    }

    pub fn from_config(config: &ObservabilityConfig) -> Self {
        let path = config
            .syslog_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SYSLOG_PATH));

        match config.sink {
            SinkKind::Auto => Self::detect_at(&path),
            SinkKind::Stderr => LogSink::Stderr,
            SinkKind::Syslog => LogSink::Syslog(path),
        }
    }

    /// Format actually used on this sink. Pretty output spans several lines
    /// per event, which syslog would store as one multi-line record, so
    /// syslog falls back to compact.
    pub fn format_for(&self, requested: LogFormat) -> LogFormat {
        match (self, requested) {
            (LogSink::Syslog(_), LogFormat::Pretty) => LogFormat::Compact,
            (_, format) => format,
        }
    }
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let level = parse_level(&config.log_level)
        .ok_or_else(|| LoggingError::InvalidLevel(config.log_level.clone()))?;
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let sink = LogSink::from_config(config);
    let format = sink.format_for(config.format);
    match sink {
        LogSink::Stderr => install(filter, format, io::stderr, true),
        LogSink::Syslog(path) => install(filter, format, syslog_writer(&path)?, false),
    }
}

#[cfg(unix)]
fn syslog_writer(path: &Path) -> Result<syslog::SyslogMakeWriter, LoggingError> {
    syslog::SyslogMakeWriter::connect(path).map_err(|source| LoggingError::Syslog {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(not(unix))]
fn syslog_writer(_path: &Path) -> Result<fn() -> io::Stderr, LoggingError> {
    Err(LoggingError::Unsupported)
}

fn install<W>(filter: EnvFilter, format: LogFormat, writer: W, ansi: bool) -> Result<(), LoggingError>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer().with_writer(writer).with_ansi(ansi);

    match format {
        LogFormat::Pretty => registry.with(layer.pretty()).try_init()?,
        LogFormat::Compact => registry.with(layer.compact()).try_init()?,
        LogFormat::Json => registry.with(layer.json()).try_init()?,
    }
    Ok(())
}

/// Syslog `<PRI>` value for an event at `level`.
pub fn syslog_priority(level: &Level) -> u8 {
    let severity = match *level {
        Level::ERROR => 3,
        Level::WARN => 4,
        Level::INFO => 6,
        _ => 7,
    };
    FACILITY_USER * 8 + severity
}

#[cfg(unix)]
mod syslog {
    use std::io::{self, Write};
    use std::os::unix::net::UnixDatagram;
    use std::path::Path;
    use std::sync::Arc;

    use tracing::{Level, Metadata};
    use tracing_subscriber::fmt::MakeWriter;

    use super::syslog_priority;

    /// Hands out one writer per event, all sharing a connected socket.
    #[derive(Debug, Clone)]
    pub struct SyslogMakeWriter {
        socket: Arc<UnixDatagram>,
    }

    impl SyslogMakeWriter {
        pub fn connect(path: &Path) -> io::Result<Self> {
            let socket = UnixDatagram::unbound()?;
            socket.connect(path)?;
            Ok(Self {
                socket: Arc::new(socket),
            })
        }

        fn writer(&self, level: &Level) -> SyslogWriter {
            SyslogWriter {
                socket: Arc::clone(&self.socket),
                priority: syslog_priority(level),
                buf: Vec::new(),
            }
        }
    }

    impl<'a> MakeWriter<'a> for SyslogMakeWriter {
        type Writer = SyslogWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.writer(&Level::INFO)
        }

        fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
            self.writer(meta.level())
        }
    }

    /// Buffers one formatted event and sends it as a single datagram.
    pub struct SyslogWriter {
        socket: Arc<UnixDatagram>,
        priority: u8,
        buf: Vec<u8>,
    }

    impl SyslogWriter {
        fn send(&mut self) -> io::Result<()> {
            let line = trim_newlines(&self.buf);
            if line.is_empty() {
                return Ok(());
            }
            let mut datagram = format!("<{}>", self.priority).into_bytes();
            datagram.extend_from_slice(line);
            self.socket.send(&datagram)?;
            self.buf.clear();
            Ok(())
        }
    }

    fn trim_newlines(buf: &[u8]) -> &[u8] {
        let end = buf
            .iter()
            .rposition(|b| *b != b'\n' && *b != b'\r')
            .map_or(0, |i| i + 1);
        &buf[..end]
    }

    impl Write for SyslogWriter {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.buf.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.send()
        }
    }

    impl Drop for SyslogWriter {
        fn drop(&mut self) {
            // Nowhere to report a failed send from here.
            let _ = self.send();
        }
    }

}
