//! Splitting raw source into typed logical segments.
//!
//! The chunker walks the input line by line and merges the lines that belong
//! together: a run of continuation lines, the body of a multi-line comment,
//! or a stretch of blank lines. Every merged segment is classified so the
//! engine can decide whether to dispatch it as a directive, expand it as
//! code, or just carry it through.
use crate::report::{self, Severity};

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum ChunkKind {
	Code,
	Directive,
	Comment,
	Space,
}

/// One logical segment of input.
#[derive(Clone,Debug,PartialEq)]
pub struct Chunk {
	pub kind: ChunkKind,
	pub text: String,
	/// Zero-based line the segment starts on, for diagnostics.
	pub start_line: usize,
}

pub struct Chunker<'a> {
	lines: Vec<&'a str>,
	idx: usize,
}

impl<'a> Chunker<'a> {
	pub fn new(code: &'a str) -> Self {
		Self { lines: code.lines().collect(), idx: 0 }
	}
}

impl Iterator for Chunker<'_> {
	type Item = Chunk;

	fn next(&mut self) -> Option<Chunk> {
		if self.idx >= self.lines.len() {
			return None;
		}
		let start_line = self.idx;
		report::set_line(start_line);
		let first = self.lines[self.idx].trim_end();
		let mut merged = vec![first];
		self.idx += 1;

		if first.ends_with('\\') {
			// A continued line; accumulate until one does not end in `\`.
			while self.idx < self.lines.len() {
				let line = self.lines[self.idx].trim_end();
				merged.push(line);
				self.idx += 1;
				if !line.ends_with('\\') {
					break;
				}
			}
		} else if first.contains("/*") && !first.contains("*/") {
			// A multi-line comment; accumulate until the terminator.
			let mut terminated = false;
			while self.idx < self.lines.len() {
				let line = self.lines[self.idx].trim_end();
				merged.push(line);
				self.idx += 1;
				if line.contains("*/") {
					terminated = true;
					break;
				}
			}
			if !terminated {
				report::error("Unterminated comment detected", Severity::Critical);
			}
		} else if first.is_empty() {
			// A run of blank lines.
			while self.idx < self.lines.len() && self.lines[self.idx].trim().is_empty() {
				merged.push("");
				self.idx += 1;
			}
		}

		let text = merged.join("\n");
		let stripped = text.trim();
		let kind = if stripped.starts_with('#') {
			ChunkKind::Directive
		} else if stripped.is_empty() {
			ChunkKind::Space
		} else if (stripped.starts_with("/*") && stripped.ends_with("*/")) || stripped.starts_with("//") {
			ChunkKind::Comment
		} else {
			ChunkKind::Code
		};
		Some(Chunk { kind, text, start_line })
	}
}
