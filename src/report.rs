//! Diagnostics reporting for the preprocessor.
//!
//! Progress messages go through the `log` crate like everything else in this
//! crate; the diagnostics in this module are a separate stream with their own
//! severity scale, so that callers of the engine can observe errors without
//! scraping log output. The active `Reporter` is held in a thread local,
//! which fits the engine's single-threaded model.
use std::cell::RefCell;
use std::fmt::Display;

thread_local! {
	/// The reporter used by the whole engine.
	///
	/// Thread local, so it can be freely mutated without locking.
	pub static REPORTER: RefCell<Reporter> = RefCell::new(Reporter::new());
}

/// How bad a diagnostic is. `Info` and `Warning` leave the offending segment
/// verbatim and move on; `Critical` and `Severe` mean the output may be
/// incomplete, but processing still continues best-effort.
#[derive(Clone,Copy,Debug,PartialEq,Eq,PartialOrd,Ord)]
pub enum Severity {
	Info,
	Warning,
	Critical,
	Severe,
}

impl Display for Severity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Info => write!(f, "INFO"),
			Self::Warning => write!(f, "WARNING"),
			Self::Critical => write!(f, "CRITICAL"),
			Self::Severe => write!(f, "SEVERE"),
		}
	}
}

/// A sink for diagnostics. Receives the formatted text (location suffix
/// included) and its severity.
pub type ErrPrinter = Box<dyn Fn(&str, Severity)>;

pub struct Reporter {
	min_severity: Severity,
	printer: Option<ErrPrinter>,
	/// Name of the file currently being processed. Empty for raw code input.
	pub file: String,
	/// Zero-based start line of the segment currently being processed.
	pub line: usize,
}

impl Default for Reporter {
	fn default() -> Self {
		Self::new()
	}
}

impl Reporter {
	pub fn new() -> Self {
		Self {
			min_severity: Severity::Info,
			printer: None,
			file: String::new(),
			line: 0,
		}
	}

	fn location(&self) -> String {
		if self.file.is_empty() {
			format!("Processed start line: {}", self.line + 1)
		} else {
			format!("Processed file: {}, start line: {}", self.file, self.line + 1)
		}
	}

	fn error(&self, text: &str, severity: Severity) {
		if severity < self.min_severity {
			return;
		}
		let msg = format!("{text} ({}).", self.location());
		match &self.printer {
			Some(printer) => printer(&msg, severity),
			None => eprintln!("ERROR ({severity}): {msg}"),
		}
	}
}

/// Report a diagnostic at the current source location.
pub fn error(text: &str, severity: Severity) {
	REPORTER.with_borrow(|r| r.error(text, severity));
}

/// Install a custom diagnostic sink, or restore the default stderr printer
/// with `None`.
pub fn set_printer(printer: Option<ErrPrinter>) {
	REPORTER.with_borrow_mut(|r| r.printer = printer);
}

/// Set the source name used in the location suffix. Returns the previous
/// name so nested `#include` processing can restore it.
pub fn set_file(name: &str) -> String {
	REPORTER.with_borrow_mut(|r| std::mem::replace(&mut r.file, name.to_string()))
}

/// Set the zero-based line the current segment starts on.
pub fn set_line(line: usize) {
	REPORTER.with_borrow_mut(|r| r.line = line);
}

/// First 80 characters of `code`, flattened onto one line. Used to keep
/// progress messages readable.
pub fn code_sample(code: &str) -> String {
	let flat = code.replace('\n', "");
	let flat = flat.trim_start();
	let mut sample: String = flat.chars().take(80).collect();
	if flat.chars().count() > 80 {
		sample.push_str(" ...");
	}
	sample
}
