//! Probe bodies for the standard service checks.
//!
//! Each function is a complete probe: wrap it in a closure and register it
//! with [`Validator::register`](crate::Validator::register).

use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use libloading::Library;

use crate::error::DependencyError;
use crate::validator::CheckOutcome;

/// Directories searched for accelerator libraries besides `LD_LIBRARY_PATH`.
pub const SYSTEM_LIBRARY_DIRS: &[&str] = &["/usr/local/TensorRT/lib", "/usr/lib/x86_64-linux-gnu"];

/// Reports the crate version and platform. Passes on Linux only.
pub fn runtime(version: &str) -> anyhow::Result<CheckOutcome> {
    let detail = format!("visage {version} on {}/{}", env::consts::OS, env::consts::ARCH);
    if cfg!(target_os = "linux") {
        Ok(CheckOutcome::pass(detail))
    } else {
        Ok(CheckOutcome::fail(format!("{detail}: unsupported platform")))
    }
}

/// Passes when the shared library `name` can be loaded.
pub fn library_loadable(name: &str) -> anyhow::Result<CheckOutcome> {
    // Loading runs the library's initializers; the library is unloaded again
    // when the handle drops.
    match unsafe { Library::new(name) } {
        Ok(_) => Ok(CheckOutcome::pass(format!("{name} loaded"))),
        Err(e) => Ok(DependencyError::Unloadable {
            name: name.to_string(),
            reason: e.to_string(),
        }
        .into()),
    }
}

/// Looks for files whose name starts with `prefix` in the directories of
/// `LD_LIBRARY_PATH` followed by `extra_dirs`.
pub fn library_on_search_path(prefix: &str, extra_dirs: &[&str]) -> anyhow::Result<CheckOutcome> {
    let mut dirs: Vec<PathBuf> = env::var_os("LD_LIBRARY_PATH")
        .map(|v| env::split_paths(&v).collect())
        .unwrap_or_default();
    dirs.extend(extra_dirs.iter().map(PathBuf::from));

    match find_with_prefix(&dirs, prefix) {
        Some(found) => Ok(CheckOutcome::pass(format!("found {}", found.display()))),
        None => Ok(DependencyError::NotFound {
            prefix: prefix.to_string(),
            searched: dirs.len(),
        }
        .into()),
    }
}

fn find_with_prefix(dirs: &[PathBuf], prefix: &str) -> Option<PathBuf> {
    dirs.iter()
        .filter_map(|dir| std::fs::read_dir(dir).ok())
        .flat_map(|entries| entries.filter_map(Result::ok))
        .map(|entry| entry.path())
        .find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
}

/// Creates `dir` if needed and writes a scratch file into it.
pub fn writable_dir(dir: &Path) -> anyhow::Result<CheckOutcome> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let mut probe = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create scratch file in {}", dir.display()))?;
    probe.write_all(b"visage").context("write scratch file")?;
    Ok(CheckOutcome::pass(format!("{} is writable", dir.display())))
}

/// Passes when `path` names an existing file.
pub fn file_exists(label: &str, path: &Path) -> anyhow::Result<CheckOutcome> {
    if path.is_file() {
        Ok(CheckOutcome::pass(format!("{label} {}", path.display())))
    } else {
        Ok(CheckOutcome::fail(format!("{label} not found: {}", path.display())))
    }
}
