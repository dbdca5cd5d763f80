//! Tracing subscriber setup: console formatter, file layer, and initialisation.
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use super::utils::{format_utc_datetime, format_utc_time, log_file_path, strip_ansi};

/// Target of stage headers.
pub(super) const STAGE_TARGET: &str = "sharehost::stage";
/// Target of dry-run notices.
pub(super) const DRY_RUN_TARGET: &str = "sharehost::dry_run";
/// Target of forwarded daemon output.
pub const DAEMON_TARGET: &str = "sharehost::daemon";
/// Target of authentication events.
pub const AUTH_TARGET: &str = "sharehost::auth";

/// Console output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event, including structured fields.
    Json,
}

/// Extracts the `message`, `channel` and `daemon` fields from a [`tracing::Event`].
#[derive(Default)]
struct FieldExtractor {
    message: String,
    channel: Option<String>,
    daemon: Option<String>,
}

impl FieldExtractor {
    fn store(&mut self, name: &str, value: String) {
        match name {
            "message" => self.message = value,
            "channel" => self.channel = Some(value),
            "daemon" => self.daemon = Some(value),
            _ => {}
        }
    }

    /// `[channel/daemon] ` prefix for daemon lines, empty otherwise.
    fn source_prefix(&self) -> String {
        match (&self.channel, &self.daemon) {
            (Some(channel), Some(daemon)) => format!("[{channel}/{daemon}] "),
            (Some(channel), None) => format!("[{channel}] "),
            _ => String::new(),
        }
    }
}

impl tracing::field::Visit for FieldExtractor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.store(field.name(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.store(field.name(), value.to_string());
    }
}

/// A [`tracing_subscriber::Layer`] that appends all events to the persistent
/// log file with timestamps and ANSI codes stripped.
///
/// Always captures events at `DEBUG` level and above regardless of the
/// console verbosity setting.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Open the log file for `command` under the log directory.
    ///
    /// Returns `None` if the directory cannot be created or the file
    /// cannot be opened.
    pub(super) fn new(command: &str) -> Option<Self> {
        Self::at(&log_file_path(command)?)
    }

    /// Truncate `path`, write a run header, and return a layer appending to it.
    pub(super) fn at(path: &Path) -> Option<Self> {
        let version = option_env!("SHAREHOST_VERSION")
            .unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let header = format!(
            "==========================================\n\
             sharehost {version} {}\n\
             ==========================================\n",
            format_utc_datetime(),
        );
        fs::write(path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let level = *metadata.level();
        let target = metadata.target();

        let mut fields = FieldExtractor::default();
        event.record(&mut fields);
        let msg = strip_ansi(&fields.message);
        let ts = format_utc_time();

        let line = match (level, target) {
            (tracing::Level::INFO, STAGE_TARGET) => format!("[{ts}] ==> {msg}"),
            (tracing::Level::INFO, DRY_RUN_TARGET) => format!("[{ts}]     [dry run] {msg}"),
            (_, DAEMON_TARGET) => format!("[{ts}]     {}{msg}", fields.source_prefix()),
            (_, AUTH_TARGET) => format!("[{ts}]     [auth] {msg}"),
            (tracing::Level::ERROR, _) => format!("[{ts}]     [error] {msg}"),
            (tracing::Level::WARN, _) => format!("[{ts}]     [warn] {msg}"),
            (tracing::Level::DEBUG, _) => format!("[{ts}]     [debug] {msg}"),
            _ => format!("[{ts}]     {msg}"),
        };

        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] that emits sharehost-style
/// console output.
struct ShareHostFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ShareHostFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let level = *metadata.level();
        let target = metadata.target();

        let mut fields = FieldExtractor::default();
        event.record(&mut fields);
        let msg = &fields.message;

        match (level, target) {
            (_, DAEMON_TARGET) => {
                writeln!(writer, "  \x1b[2m{}\x1b[0m{msg}", fields.source_prefix())
            }
            (tracing::Level::WARN, AUTH_TARGET) => writeln!(writer, "\x1b[33mAUTH\x1b[0m  {msg}"),
            (_, AUTH_TARGET) => writeln!(writer, "\x1b[32mAUTH\x1b[0m  {msg}"),
            (tracing::Level::ERROR, _) => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}"),
            (tracing::Level::WARN, _) => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}"),
            (tracing::Level::INFO, STAGE_TARGET) => {
                writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m")
            }
            (tracing::Level::INFO, DRY_RUN_TARGET) => {
                writeln!(writer, "  \x1b[33m[DRY RUN]\x1b[0m {msg}")
            }
            (tracing::Level::INFO, _) => writeln!(writer, "  {msg}"),
            _ => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// The console layer honours `SHAREHOST_LOG` (an `EnvFilter` directive) and
/// otherwise shows `INFO` and above, or `DEBUG` with `verbose`. The file
/// layer writes every event at `DEBUG` and above to `<log dir>/<command>.log`.
/// Must be called once at program startup, before any logging.
pub fn init_subscriber(verbose: bool, command: &str, format: LogFormat) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        EnvFilter, Layer as _, Registry, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let default_level = if verbose { "debug" } else { "info" };
    let console_filter = EnvFilter::try_from_env("SHAREHOST_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let console_layer: Box<dyn tracing_subscriber::Layer<Registry> + Send + Sync> = match format {
        LogFormat::Text => {
            let make_writer = std::io::stderr
                .with_max_level(tracing::Level::WARN)
                .and(std::io::stdout.with_min_level(tracing::Level::INFO));
            fmt::layer()
                .event_format(ShareHostFormatter)
                .with_writer(make_writer)
                .with_filter(console_filter)
                .boxed()
        }
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .with_filter(console_filter)
            .boxed(),
    };

    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
