//! The preprocessing engine: directive dispatch and the public facade.
//!
//! `Preproc` owns every piece of mutable state — the macro table, the
//! conditional branch stack, the include search list and the output buffers.
//! Two instances are fully independent. Processing is a single synchronous
//! pass: each chunk of input either dispatches as a directive or flows,
//! macro-expanded when in an active branch, into the output assembler.
use std::io;
use std::path::Path;
use std::sync::LazyLock;

use log::{debug, info};
use regex::{Captures, Regex};

use crate::chunk::{ChunkKind, Chunker};
use crate::cond::ConditionStack;
use crate::expr;
use crate::loader::FileLoader;
use crate::macros::{Macro, MacroTable};
use crate::output::Output;
use crate::report::{self, Severity};
use crate::textops;

static RE_IF: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[ \t]*#[ \t]*if[ \t]+(?P<expr>.*)").unwrap());
static RE_ELIF: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[ \t]*#[ \t]*elif[ \t]+(?P<expr>.*)").unwrap());
static RE_ELSE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[ \t]*#[ \t]*else(\s|$)").unwrap());
static RE_ENDIF: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[ \t]*#[ \t]*endif(\s|$)").unwrap());
static RE_IFDEF: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[ \t]*#[ \t]*ifdef[ \t]+(?P<ident>.*)").unwrap());
static RE_IFNDEF: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[ \t]*#[ \t]*ifndef[ \t]+(?P<ident>.*)").unwrap());
static RE_DEFINE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[ \t]*#[ \t]*define[ \t]+(?P<ident>\w+)(?:\((?P<params>[^)]*)\))?").unwrap());
static RE_UNDEF: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[ \t]*#[ \t]*undef[ \t]+(?P<ident>\w+)").unwrap());
static RE_INCLUDE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r#"^[ \t]*#[ \t]*include[ \t]+["<](?P<file>[^">]+)[">]"#).unwrap());

/// The preprocessor engine.
#[derive(Default)]
pub struct Preproc {
	loader: FileLoader,
	output: Output,
	cond: ConditionStack,
	pub macros: MacroTable,
}

impl Preproc {
	pub fn new() -> Self {
		Self::default()
	}

	/// The trimmed output accumulated so far.
	pub fn output(&self) -> &str {
		&self.output.code
	}

	/// The verbatim output accumulated so far, directives included.
	pub fn output_full(&self) -> &str {
		&self.output.code_all
	}

	/// Clear macros, include dirs, branch state and output.
	pub fn reset(&mut self) {
		self.loader.reset();
		self.output.reset();
		self.cond.reset();
		self.macros.reset();
	}

	/// Clear only the output buffers; macros and includes persist.
	pub fn reset_output(&mut self) {
		self.output.reset();
	}

	pub fn add_include_dir(&mut self, dir: &Path) {
		self.loader.add_include_dir(dir);
	}

	pub fn save_output(&self, path: &Path, full: bool) -> io::Result<()> {
		info!("Saving processed output to file '{}'.", path.display());
		let output = if full { &self.output.code_all } else { &self.output.code };
		std::fs::write(path, output)
	}

	/// Read a file through the include search list and process it.
	pub fn process_file(&mut self, path: &str, global_output: bool, full_local_output: bool) -> String {
		let code = self.loader.read(path);
		if code.is_empty() {
			return String::new();
		}
		let name = Path::new(path)
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_else(|| path.to_string());
		self.process_code(&code, global_output, full_local_output, &name)
	}

	/// Process a piece of source text.
	///
	/// Returns the local trimmed output, or the local verbatim stream when
	/// `full_local_output` is set. The engine's own output buffers are
	/// updated too unless `global_output` is false, which is how `#include`
	/// keeps an included file's text out of the including file's output
	/// while retaining its macro and branch effects.
	pub fn process_code(
		&mut self,
		code: &str,
		global_output: bool,
		full_local_output: bool,
		source_name: &str,
	) -> String {
		if source_name.is_empty() {
			info!("Processing source code '{}'.", report::code_sample(code));
		} else {
			info!("Processing file '{source_name}'.");
		}
		report::set_file(source_name);
		let orig_depth = self.cond.depth();
		let code = textops::expand_tabs(code, 4);
		let mut local = Output::new();
		for chunk in Chunker::new(&code) {
			report::set_line(chunk.start_line);
			let mut part = chunk.text;
			if chunk.kind == ChunkKind::Directive {
				debug!("    Processing directive '{}'.", report::code_sample(&part));
				self.process_directive(&part);
			} else if self.cond.active() && chunk.kind == ChunkKind::Code {
				part = self.macros.expand(&part);
			}
			let suppressed = chunk.kind != ChunkKind::Directive && !self.cond.active();
			if global_output {
				self.output.push(&part, chunk.kind, suppressed);
			}
			local.push(&part, chunk.kind, suppressed);
		}
		if self.cond.depth() != orig_depth {
			report::error("Unterminated #if detected in a previous code", Severity::Critical);
		}
		if full_local_output { local.code_all } else { local.code }
	}

	/// Evaluate a `#if`-style expression to a signed 64-bit integer.
	pub fn evaluate(&self, expr_code: &str) -> Option<i64> {
		expr::evaluate(expr_code, &self.macros)
	}

	/// Evaluate an expression for truthiness. Failures are false.
	pub fn is_true(&self, expr_code: &str) -> bool {
		expr::is_true(expr_code, &self.macros)
	}

	/// Expand every macro reference in `code`.
	pub fn expand_macros(&self, code: &str) -> String {
		self.macros.expand(code)
	}

	fn process_directive(&mut self, code: &str) {
		let joined = textops::remove_line_escapes(code, false);
		// Conditional directives always run, so the branch stack stays in
		// step even inside suppressed regions. Their conditions are only
		// evaluated where the outcome can matter.
		if let Some(caps) = RE_IF.captures(&joined) {
			let state = self.cond.active() && self.is_true(&caps["expr"]);
			self.cond.enter_if(state);
		} else if let Some(caps) = RE_ELIF.captures(&joined) {
			let state = self.cond.search_active() && self.is_true(&caps["expr"]);
			self.cond.enter_elif(state);
		} else if RE_ELSE.is_match(&joined) {
			self.cond.enter_else();
		} else if RE_ENDIF.is_match(&joined) {
			self.cond.exit_if();
		} else if let Some(caps) = RE_IFDEF.captures(&joined) {
			self.cond.enter_if(self.macros.contains(caps["ident"].trim()));
		} else if let Some(caps) = RE_IFNDEF.captures(&joined) {
			self.cond.enter_if(!self.macros.contains(caps["ident"].trim()));
		} else if !self.cond.active() {
			// Standard directives only act inside active branches.
		} else if let Some(caps) = RE_DEFINE.captures(&joined) {
			self.define(&caps, code);
		} else if let Some(caps) = RE_UNDEF.captures(&joined) {
			self.macros.undef(&caps["ident"]);
		} else if let Some(caps) = RE_INCLUDE.captures(&joined) {
			self.include(&caps["file"]);
		}
		// Anything else passes through to the verbatim stream untouched.
	}

	fn define(&mut self, caps: &Captures, code: &str) {
		let ident = &caps["ident"];
		let params = caps.name("params").map(|m| m.as_str());
		if let Some(mac) = Macro::from_define(ident, params, code) {
			self.macros.define(mac);
		}
	}

	fn include(&mut self, file: &str) {
		let enclosing = report::set_file("");
		self.process_file(file, false, false);
		report::set_file(&enclosing);
	}
}
