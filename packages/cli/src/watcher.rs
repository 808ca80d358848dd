use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    CreateError(#[from] notify::Error),

    #[error("Cannot watch {0}: it has no parent directory")]
    NoParent(PathBuf),

    #[error("Watch channel closed")]
    Disconnected,
}

pub type WatcherResult<T> = Result<T, WatcherError>;

/// Watches the directory of one markup file and reports writes to it
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<notify::Result<Event>>,
    file: PathBuf,
}

impl FileWatcher {
    pub fn new(file: PathBuf) -> WatcherResult<Self> {
        let file = file.canonicalize().unwrap_or(file);
        let dir = file
            .parent()
            .ok_or_else(|| WatcherError::NoParent(file.clone()))?
            .to_path_buf();
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        // editors often replace the file, so watch its directory
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::debug!("watching {}", dir.display());

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            file,
        })
    }

    fn touches_file(&self, event: &Event) -> bool {
        matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
            && event.paths.iter().any(|path| same_file(path, &self.file))
    }

    /// Block until the watched file changes
    pub fn next_change(&self) -> WatcherResult<()> {
        loop {
            match self.receiver.recv() {
                Ok(Ok(event)) if self.touches_file(&event) => return Ok(()),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!("watch error: {}", e),
                Err(_) => return Err(WatcherError::Disconnected),
            }
        }
    }

    /// Like [`FileWatcher::next_change`] but gives up after `timeout`
    pub fn next_change_timeout(&self, timeout: Duration) -> WatcherResult<bool> {
        loop {
            match self.receiver.recv_timeout(timeout) {
                Ok(Ok(event)) if self.touches_file(&event) => return Ok(true),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!("watch error: {}", e),
                Err(RecvTimeoutError::Timeout) => return Ok(false),
                Err(RecvTimeoutError::Disconnected) => return Err(WatcherError::Disconnected),
            }
        }
    }

    /// Swallow the burst of events a single save usually produces
    pub fn debounce(&self, quiet: Duration) {
        while matches!(self.next_change_timeout(quiet), Ok(true)) {}
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.file_name() == b.file_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;

    #[test]
    fn test_file_watcher() {
        let temp_dir = tempfile::tempdir().unwrap();
        let page = temp_dir.path().join("Default.aspx");
        fs::write(&page, "<html></html>").unwrap();

        let watcher = FileWatcher::new(page.clone()).unwrap();

        let writer = {
            let page = page.clone();
            let sibling = temp_dir.path().join("Other.aspx");
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                fs::write(sibling, "<p></p>").unwrap();
                fs::write(page, "<html><body></body></html>").unwrap();
            })
        };

        assert!(watcher.next_change_timeout(Duration::from_secs(5)).unwrap());
        writer.join().unwrap();
    }

    #[test]
    fn test_quiet_file_times_out() {
        let temp_dir = tempfile::tempdir().unwrap();
        let page = temp_dir.path().join("Quiet.aspx");
        fs::write(&page, "<html></html>").unwrap();

        let watcher = FileWatcher::new(page).unwrap();
        assert!(!watcher
            .next_change_timeout(Duration::from_millis(200))
            .unwrap());
    }
}
