use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// Identity and scratch files of one request.
///
/// Every path handed out by [`RequestContext::allocate`] is removed when the
/// context drops, whichever way the request ends.
#[derive(Debug)]
pub struct RequestContext {
    id: Uuid,
    dir: PathBuf,
    owned: Vec<PathBuf>,
}

impl RequestContext {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            dir: dir.into(),
            owned: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Reserves `{dir}/{id}_{suffix}` for this request.
    pub fn allocate(&mut self, suffix: &str) -> PathBuf {
        let path = self.dir.join(format!("{}_{suffix}", self.id));
        self.owned.push(path.clone());
        path
    }

    /// `{id}_input.{extension}`.
    pub fn input_path(&mut self, extension: &str) -> PathBuf {
        self.allocate(&format!("input.{extension}"))
    }

    /// `{id}_processed.wav`.
    pub fn processed_path(&mut self) -> PathBuf {
        self.allocate("processed.wav")
    }

    pub fn owned(&self) -> &[PathBuf] {
        &self.owned
    }
}

fn remove(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed temp file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temp file"),
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        for path in &self.owned {
            remove(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_embed_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = RequestContext::new(dir.path());
        let input = ctx.input_path("mp3");
        let processed = ctx.processed_path();

        let id = ctx.id().to_string();
        assert_eq!(input, dir.path().join(format!("{id}_input.mp3")));
        assert_eq!(processed, dir.path().join(format!("{id}_processed.wav")));
        assert_eq!(ctx.owned().len(), 2);
    }

    #[test]
    fn test_ids_unique() {
        let a = RequestContext::new("/tmp");
        let b = RequestContext::new("/tmp");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_drop_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut ctx = RequestContext::new(dir.path());
            std::fs::write(ctx.input_path("wav"), b"data").unwrap();
            std::fs::write(ctx.processed_path(), b"data").unwrap();
            assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_tolerates_unwritten_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = RequestContext::new(dir.path());
        ctx.input_path("wav");
        drop(ctx);
    }

    #[test]
    fn test_drop_on_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();
        let result = std::panic::catch_unwind(move || {
            let mut ctx = RequestContext::new(&path);
            std::fs::write(ctx.input_path("ogg"), b"data").unwrap();
            panic!("handler failed");
        });
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
