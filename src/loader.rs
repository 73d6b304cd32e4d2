//! Resolution of `#include` names against the configured search list.
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::report::{self, Severity};

/// The ordered include search list. The first entry is always the empty
/// path, so relative include names resolve against the current working
/// directory before any configured directory.
#[derive(Debug)]
pub struct FileLoader {
	incl_dirs: Vec<PathBuf>,
}

impl Default for FileLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl FileLoader {
	pub fn new() -> Self {
		Self { incl_dirs: vec![PathBuf::new()] }
	}

	pub fn reset(&mut self) {
		self.incl_dirs = vec![PathBuf::new()];
	}

	/// Add a directory to the include search list.
	///
	/// A file path is mapped to its parent directory. Nonexistent paths are
	/// reported and skipped. Duplicates are suppressed.
	pub fn add_include_dir(&mut self, dir: &Path) {
		info!("Adding include directory '{}'.", dir.display());
		let mut resolved = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
		if resolved.is_file() {
			resolved = resolved.parent().map(Path::to_path_buf).unwrap_or_default();
		}
		if resolved.is_dir() {
			if !self.incl_dirs.contains(&resolved) {
				self.incl_dirs.push(resolved);
			}
		} else {
			report::error(&format!("Include dir '{}' not found", dir.display()), Severity::Warning);
		}
	}

	/// Find `name` in the search list and return its contents.
	///
	/// Returns an empty string when no candidate is readable; callers treat
	/// empty as "nothing to include".
	pub fn read(&self, name: &str) -> String {
		for dir in &self.incl_dirs {
			let candidate = dir.join(name);
			if candidate.is_file() {
				if let Ok(contents) = fs::read_to_string(&candidate) {
					return contents;
				}
			}
		}
		report::error(&format!("File '{name}' not found"), Severity::Warning);
		String::new()
	}
}
