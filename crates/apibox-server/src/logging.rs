//! Rotating file logger: `./apibox.log`, 5 MB per file, 10 backups, 28-day
//! retention, plus a stdout mirror when `debug` is set.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;

const MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;
const MAX_BACKUPS: u32 = 10;
const MAX_BACKUP_AGE: Duration = Duration::from_secs(28 * 24 * 60 * 60);

struct RollingFile {
    path: PathBuf,
    file: File,
    current_size: u64,
}

impl RollingFile {
    fn open(path: PathBuf) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let current_size = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            current_size,
        })
    }

    fn backup_path(&self, n: u32) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        for i in (1..MAX_BACKUPS).rev() {
            let from = self.backup_path(i);
            let to = self.backup_path(i + 1);
            if from.exists() {
                std::fs::rename(&from, &to)?;
            }
        }
        std::fs::rename(&self.path, self.backup_path(1))?;
        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.current_size = 0;
        self.prune_expired_backups();
        Ok(())
    }

    fn prune_expired_backups(&self) {
        let now = SystemTime::now();
        for i in 1..=MAX_BACKUPS {
            let path = self.backup_path(i);
            let Ok(meta) = std::fs::metadata(&path) else {
                continue;
            };
            let Ok(modified) = meta.modified() else {
                continue;
            };
            if now.duration_since(modified).unwrap_or_default() > MAX_BACKUP_AGE {
                let _ = std::fs::remove_file(&path);
            }
        }
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.current_size + buf.len() as u64 > MAX_LOG_FILE_SIZE {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.current_size += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[derive(Clone)]
struct LogWriter(Arc<Mutex<RollingFile>>);

impl LogWriter {
    fn open(path: &Path) -> io::Result<Self> {
        Ok(Self(Arc::new(Mutex::new(RollingFile::open(
            path.to_path_buf(),
        )?))))
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub fn init_logging(debug: bool) -> anyhow::Result<()> {
    let file_writer = LogWriter::open(Path::new("./apibox.log"))?;
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false);
    let stdout_layer =
        debug.then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stdout));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .init();
    Ok(())
}
