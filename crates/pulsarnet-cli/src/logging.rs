// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Explicitly constructed logging context. Built once at startup from the
/// config, handed around by reference, and shut down explicitly so the log
/// file is flushed before exit. The tracing subscriber installation is the
/// only process-wide effect.
pub struct LogContext {
    file: Option<(PathBuf, Arc<File>)>,
}

#[derive(Clone)]
struct SharedFileWriter(Arc<File>);

impl Write for SharedFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self.0).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self.0).flush()
    }
}

impl LogContext {
    /// `level` is the default filter; `RUST_LOG` still wins when set.
    pub fn init(level: &str, file: Option<&Path>) -> Result<Self> {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

        let file_handle = file
            .map(|path| -> Result<(PathBuf, Arc<File>)> {
                let handle = File::create(path)
                    .with_context(|| format!("create log file {}", path.display()))?;
                Ok((path.to_path_buf(), Arc::new(handle)))
            })
            .transpose()?;

        let file_layer = file_handle.as_ref().map(|(_, handle)| {
            let writer = SharedFileWriter(Arc::clone(handle));
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(move || writer.clone())
        });

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(false),
            )
            .with(file_layer)
            .try_init()
            .context("install tracing subscriber")?;

        Ok(Self { file: file_handle })
    }

    pub fn shutdown(self) -> Result<()> {
        if let Some((path, handle)) = self.file {
            (&*handle)
                .flush()
                .with_context(|| format!("flush log file {}", path.display()))?;
            handle
                .sync_all()
                .with_context(|| format!("sync log file {}", path.display()))?;
        }
        Ok(())
    }
}
