//! Shared helpers for the subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// The benchmark path without extension, split into directory and stem.
pub struct Benchmark {
    /// Directory holding the input files.
    pub dir: PathBuf,
    /// Benchmark name (file stem).
    pub name: String,
    /// Full path without extension.
    pub base: PathBuf,
}

impl Benchmark {
    /// Interpret the CLI's benchmark argument.
    pub fn from_arg(arg: &str) -> Self {
        let base = PathBuf::from(arg);
        let dir = base
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let name = base
            .file_name()
            .map_or_else(|| arg.to_string(), |n| n.to_string_lossy().into_owned());
        Self { dir, name, base }
    }

    /// Read a sibling input file (`.lpfs`, `.freq`, ...).
    pub fn read_input(&self, ext: &str) -> Result<String> {
        let path = self.base.with_extension(ext);
        std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))
    }

    /// Write a report under `<dir>/<subdir>/<file>`, creating the
    /// directory as needed. Returns the written path.
    pub fn write_report(&self, subdir: &str, file: &str, contents: &str) -> Result<PathBuf> {
        let out_dir = self.dir.join(subdir);
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("creating {}", out_dir.display()))?;
        let path = out_dir.join(file);
        std::fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}
