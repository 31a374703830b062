use crate::config::{LoggingConfig, Section};
use parking_lot::Mutex;
use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::{
    filter::{FilterFn, Targets},
    fmt,
};

use file_rotate::{
    compression::Compression,
    suffix::AppendCount,
    ContentLimit, FileRotate,
};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// Returns true if target == subsystem or target starts with "subsystem::"
fn matches_subsystem(target: &str, subsystem: &str) -> bool {
    target
        .strip_prefix(subsystem)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

type CatchAllFilter = FilterFn<Box<dyn Fn(&tracing::Metadata<'_>) -> bool + Send + Sync + 'static>>;

/// Events outside every explicit subsystem, up to `max_level`.
fn catch_all_filter(subsystems: &[String], max_level: Level) -> CatchAllFilter {
    let subsystems = subsystems.to_vec();
    FilterFn::new(Box::new(move |meta: &tracing::Metadata<'_>| {
        let target = meta.target();
        !subsystems.iter().any(|s| matches_subsystem(target, s)) && meta.level() <= &max_level
    }))
}

// -------- rotating file writers --------

type SharedRotate = Arc<Mutex<FileRotate<AppendCount>>>;

#[derive(Clone)]
struct FileHandle(Option<SharedRotate>);

impl Write for FileHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &self.0 {
            Some(w) => w.lock().write(buf),
            // no file for this target: drop
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &self.0 {
            Some(w) => w.lock().flush(),
            None => Ok(()),
        }
    }
}

/// Routes JSON records to a file per subsystem, falling back to the default file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<SharedRotate>,
    // longest prefix first
    by_subsystem: Vec<(String, SharedRotate)>,
}

impl FileRouter {
    fn resolve(&self, target: &str) -> Option<SharedRotate> {
        self.by_subsystem
            .iter()
            .find(|(s, _)| matches_subsystem(target, s))
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = FileHandle;

    fn make_writer(&'a self) -> Self::Writer {
        FileHandle(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        FileHandle(self.resolve(meta.target()))
    }
}

/// Resolve a log file path against `base_dir` (home_dir).
/// Absolute paths are kept as-is; relative paths are joined with `base_dir`.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating_file(log_path: &Path, section: &Section) -> std::io::Result<SharedRotate> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);

    let rot = FileRotate::new(
        log_path,
        AppendCount::new(backups),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(Arc::new(Mutex::new(rot)))
}

/// Open the file of `section`, or None when it has no file or cannot be opened.
fn section_writer(name: &str, section: &Section, base_dir: &Path) -> Option<SharedRotate> {
    if section.file.trim().is_empty() {
        return None;
    }
    let log_path = resolve_log_path(&section.file, base_dir);
    match open_rotating_file(&log_path, section) {
        Ok(w) => Some(w),
        Err(e) => {
            eprintln!(
                "Failed to open log file for '{}': {} ({})",
                name,
                log_path.display(),
                e
            );
            None
        }
    }
}

// -------- plan --------

/// Logging config split into the catch-all section and explicit subsystems.
struct LoggingPlan<'a> {
    default_section: Option<&'a Section>,
    subsystems: Vec<(String, &'a Section)>,
}

impl<'a> LoggingPlan<'a> {
    fn from_config(cfg: &'a LoggingConfig) -> Self {
        let mut subsystems: Vec<(String, &Section)> = cfg
            .iter()
            .filter(|(k, _)| k.as_str() != DEFAULT_SECTION)
            .map(|(k, v)| (k.clone(), v))
            .collect();
        // Longest prefix first so nested subsystems win over their parents.
        subsystems.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Self {
            default_section: cfg.get(DEFAULT_SECTION),
            subsystems,
        }
    }

    fn subsystem_names(&self) -> Vec<String> {
        self.subsystems.iter().map(|(n, _)| n.clone()).collect()
    }

    fn console_targets(&self) -> Targets {
        self.subsystems
            .iter()
            .filter_map(|(name, s)| {
                parse_tracing_level(&s.console_level)
                    .map(|l| (name.clone(), LevelFilter::from_level(l)))
            })
            .fold(Targets::new().with_default(LevelFilter::OFF), |t, (n, l)| {
                t.with_target(n, l)
            })
    }

    fn file_targets(&self) -> Targets {
        self.subsystems
            .iter()
            .filter(|(_, s)| !s.file.trim().is_empty())
            .filter_map(|(name, s)| {
                parse_tracing_level(&s.file_level).map(|l| (name.clone(), LevelFilter::from_level(l)))
            })
            .fold(Targets::new().with_default(LevelFilter::OFF), |t, (n, l)| {
                t.with_target(n, l)
            })
    }

    fn file_router(&self, base_dir: &Path) -> FileRouter {
        FileRouter {
            default: self
                .default_section
                .and_then(|s| section_writer(DEFAULT_SECTION, s, base_dir)),
            by_subsystem: self
                .subsystems
                .iter()
                .filter_map(|(name, s)| section_writer(name, s, base_dir).map(|w| (name.clone(), w)))
                .collect(),
        }
    }
}

// -------- public init --------

/// Initialize logging from a configuration.
/// - `cfg`: subsystem → section map; `default` is the catch-all
/// - `base_dir`: base directory used to resolve relative log file paths (usually server.home_dir)
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

    // Bridge `log` → `tracing` *before* installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let plan = LoggingPlan::from_config(cfg);
    let names = plan.subsystem_names();
    let router = plan.file_router(base_dir);
    let ansi = atty::is(atty::Stream::Stdout);

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    layers.push(
        fmt::layer()
            .with_ansi(ansi)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_filter(plan.console_targets())
            .boxed(),
    );

    if !router.by_subsystem.is_empty() {
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(router.clone())
                .with_filter(plan.file_targets())
                .boxed(),
        );
    }

    if let Some(default_section) = plan.default_section {
        if let Some(level) = parse_tracing_level(&default_section.console_level) {
            layers.push(
                fmt::layer()
                    .with_ansi(ansi)
                    .with_target(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .with_filter(catch_all_filter(&names, level))
                    .boxed(),
            );
        }
        if router.default.is_some() {
            if let Some(level) = parse_tracing_level(&default_section.file_level) {
                layers.push(
                    fmt::layer()
                        .json()
                        .with_ansi(false)
                        .with_target(true)
                        .with_timer(fmt::time::UtcTime::rfc_3339())
                        .with_writer(router.clone())
                        .with_filter(catch_all_filter(&names, level))
                        .boxed(),
                );
            }
        }
    }

    let _ = Registry::default().with(layers).try_init();
}

fn init_default_logging() {
    let _ = fmt()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}
