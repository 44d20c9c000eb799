use crate::{config::LogLevel, error::Error};
use lazy_static::lazy_static;
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::{Mutex, PoisonError},
};
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    reload,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

enum Subscriber {
    NotInstalled,
    Installed(FilterHandle),
    /// Somebody else set the global subscriber; events go wherever it sends them.
    Foreign,
}

lazy_static! {
    static ref LOG_FILE: Mutex<Option<File>> = Mutex::new(None);
    static ref SUBSCRIBER: Mutex<Subscriber> = Mutex::new(Subscriber::NotInstalled);
}

/// Sends `tracing` output to `log_path`, filtered at `level` unless `RUST_LOG` says otherwise.
///
/// The global subscriber is installed on the first call. Later calls switch its file and level,
/// so each session logs where its own configuration says.
pub fn init<P: AsRef<Path>>(log_path: P, level: LogLevel) -> Result<(), Error> {
    let log_path = log_path.as_ref();
    if let Some(parent) = log_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    *LOG_FILE.lock().unwrap_or_else(PoisonError::into_inner) = Some(file);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let mut subscriber = SUBSCRIBER.lock().unwrap_or_else(PoisonError::into_inner);
    if matches!(*subscriber, Subscriber::NotInstalled) {
        let (filter, handle) = reload::Layer::new(filter);
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(SessionLog).with_ansi(false))
            .try_init()
            .is_ok();

        *subscriber = if installed {
            Subscriber::Installed(handle)
        } else {
            Subscriber::Foreign
        };
    } else if let Subscriber::Installed(handle) = &*subscriber {
        handle
            .reload(filter)
            .map_err(|e| Error::LoggingFailed(e.to_string()))?;
    }
    drop(subscriber);

    tracing::info!(path = %log_path.display(), level = level.as_directive(), "logging initialised");

    Ok(())
}

/// Closes the current log file. Events are dropped until the next [`init`].
pub fn close() {
    if let Some(mut file) = LOG_FILE.lock().unwrap_or_else(PoisonError::into_inner).take() {
        let _ = file.flush();
    }
}

#[derive(Debug, Clone, Copy)]
struct SessionLog;

impl<'a> MakeWriter<'a> for SessionLog {
    type Writer = SessionLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SessionLogWriter
    }
}

struct SessionLogWriter;

impl Write for SessionLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // whole buffer under one lock so lines from different threads don't interleave
        if let Some(file) = LOG_FILE
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            file.write_all(buf)?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match LOG_FILE
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}
