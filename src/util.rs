use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(io::stderr).try_init();
    });
}

// -------- file ops with backoff (sync drives, AV scanners, network shares) --------

const IO_TRIES: usize = 16;
const IO_DELAY_MS: u64 = 50;

/// Transient OS errors worth retrying: sharing/lock violations, AV blocks and
/// flaky devices on Windows, EBUSY/EAGAIN elsewhere.
fn is_retriable_io_error(e: &io::Error) -> bool {
    if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) {
        return true;
    }
    if cfg!(windows) {
        matches!(e.raw_os_error(), Some(5 | 21 | 32 | 33 | 225 | 1006 | 1117 | 1224))
    } else {
        matches!(e.raw_os_error(), Some(11 | 16))
    }
}

/// Run `op` up to `tries` times, sleeping `delay_ms * attempt` between transient failures.
pub fn retry_io<T>(tries: usize, delay_ms: u64, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let tries = tries.max(1);
    let mut attempt = 0usize;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if attempt + 1 < tries && is_retriable_io_error(&e) => {
                attempt += 1;
                sleep(Duration::from_millis(delay_ms.saturating_mul(attempt as u64)));
            }
            Err(e) => return Err(e),
        }
    }
}

pub fn open_with_backoff(path: &Path) -> io::Result<File> {
    retry_io(IO_TRIES, IO_DELAY_MS, || File::open(path))
}

pub fn create_with_backoff(path: &Path) -> io::Result<File> {
    retry_io(IO_TRIES, IO_DELAY_MS, || File::create(path))
}

pub fn append_with_backoff(path: &Path) -> io::Result<File> {
    retry_io(IO_TRIES, IO_DELAY_MS, || OpenOptions::new().append(true).open(path))
}

/// Replace `dest` with `tmp`. Falls back to copy+remove when rename fails
/// (e.g. across filesystems).
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    if retry_io(IO_TRIES, IO_DELAY_MS, || fs::rename(tmp, dest)).is_ok() {
        return Ok(());
    }
    retry_io(IO_TRIES, IO_DELAY_MS, || fs::copy(tmp, dest))
        .with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
    retry_io(IO_TRIES, IO_DELAY_MS, || match fs::remove_file(tmp) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    })
    .with_context(|| format!("remove {}", tmp.display()))?;
    Ok(())
}

/// Sleep unless `d` is zero.
#[inline]
pub fn pause(d: Duration) {
    if !d.is_zero() {
        sleep(d);
    }
}
