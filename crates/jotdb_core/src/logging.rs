//! Logging facade over `tracing`.
//!
//! The engine itself logs through the `tracing` macros. This module owns
//! the default subscriber: timestamped lines, written to stdout, filtered
//! at `Info`. The filter can be retargeted at runtime through
//! [`set_level`] and the byte sink through [`set_output`]; both are
//! process-wide, since the tracing subscriber is.
//!
//! If the embedding application installed its own global subscriber
//! before the first database was opened, this module steps aside and the
//! two setters become no-ops.

use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::{Arc, OnceLock};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, Registry};

/// Verbosity of the default log output, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// No output at all.
    Off = 0,
    /// Errors only.
    Error = 1,
    /// Warnings and errors.
    Warn = 2,
    /// Informational messages and below.
    Info = 3,
    /// Everything, including per-operation detail.
    Debug = 4,
}

impl LogLevel {
    fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
        }
    }
}

struct Handles {
    level: reload::Handle<LevelFilter, Registry>,
    sink: SharedSink,
}

static HANDLES: OnceLock<Option<Handles>> = OnceLock::new();

/// A writer that can be swapped out underneath the subscriber.
#[derive(Clone)]
struct SharedSink(Arc<Mutex<Box<dyn Write + Send>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for SharedSink {
    type Writer = SharedSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Installs the default subscriber once per process. Called on every
/// database open; subsequent calls are free.
pub(crate) fn init() {
    HANDLES.get_or_init(|| {
        let sink = SharedSink(Arc::new(Mutex::new(
            Box::new(io::stdout()) as Box<dyn Write + Send>
        )));
        let (filter, level) = reload::Layer::new(LogLevel::Info.as_filter());
        let fmt_layer = tracing_subscriber::fmt::layer().with_writer(sink.clone());

        match tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
        {
            Ok(()) => Some(Handles { level, sink }),
            // Someone else owns the global subscriber; defer to them.
            Err(_) => None,
        }
    });
}

/// Sets the verbosity of the default log output.
pub fn set_level(level: LogLevel) {
    if let Some(Some(handles)) = HANDLES.get() {
        let _ = handles.level.reload(level.as_filter());
    }
}

/// Redirects the default log output to an arbitrary byte sink.
pub fn set_output(sink: Box<dyn Write + Send>) {
    if let Some(Some(handles)) = HANDLES.get() {
        *handles.sink.0.lock() = sink;
    }
}
