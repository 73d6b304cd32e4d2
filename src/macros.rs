//! Macro definitions and the recursive expander.
//!
//! This is the heart of the preprocessor. Macros are stored in definition
//! order and expansion walks the table, replacing every whole-word reference
//! that is not hiding inside a string or a comment. Function-like references
//! get their arguments pre-expanded, then substituted into the body with the
//! `#`/`##` operators applied, and the finished expansion is spliced back
//! into the source with the call site's indentation.
use std::sync::LazyLock;

use itertools::Itertools;
use log::debug;
use regex::{Captures, Regex};

use crate::report::{self, Severity};
use crate::textops;

/// Expansion depth cap. Self-referential macros bottom out here.
const MAX_EXPANSION_DEPTH: u32 = 512;

static RE_PASTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\\]*##[\s\\]*").unwrap());

/// A single `#define` entry.
#[derive(Clone,Debug,PartialEq)]
pub struct Macro {
	pub ident: String,
	/// Parameter names in declaration order. Empty for object-like macros.
	/// A trailing `...` marks a variadic macro.
	pub params: Vec<String>,
	pub body: String,
}

impl Macro {
	pub fn new(ident: impl Into<String>, params: Vec<String>, body: impl Into<String>) -> Self {
		Self { ident: ident.into(), params, body: body.into() }
	}

	/// Build a macro from the matched parts of a `#define` directive.
	///
	/// `code` is the raw directive text with continuations intact. A body
	/// that starts on the line of the definition is trimmed; a body on its
	/// own continuation lines is kept as a block and dedented.
	pub fn from_define(ident: &str, params: Option<&str>, code: &str) -> Option<Self> {
		let param_list: Vec<String> = params
			.map(|list| {
				list.split(',')
					.map(|p| p.trim().to_string())
					.filter(|p| !p.is_empty())
					.collect()
			})
			.unwrap_or_default();

		let multiline = textops::remove_line_escapes(code, true);
		// The body starts after the closing parenthesis of the parameter
		// list, or after the identifier for object-like macros.
		let body_start = if let Some(last) = param_list.last() {
			format!(r"{}\s*\)", regex::escape(last))
		} else if params.is_some() {
			format!(r"{}[ \t]*\([ \t]*\)[ \t]*", regex::escape(ident))
		} else {
			format!(r"{}[ \t]*", regex::escape(ident))
		};
		let re_body_start = Regex::new(&body_start).unwrap();
		let Some(m) = re_body_start.find(&multiline) else {
			report::error(&format!("Macro body not detected:\n{code}"), Severity::Critical);
			return None;
		};
		let rest = multiline[m.end()..].trim_end();
		let body = match rest.strip_prefix('\n') {
			Some(block) => textops::dedent(block),
			None => rest.trim_start().to_string(),
		};
		Some(Self::new(ident, param_list, body))
	}

	pub fn is_function_like(&self) -> bool {
		!self.params.is_empty()
	}

	/// Substitute the call-site arguments into the body.
	///
	/// `raw` holds the argument text exactly as written and `expanded` the
	/// fully macro-expanded counterparts. `##` and `#` operate on the raw
	/// values; plain parameter occurrences get the expanded ones. The `##`
	/// operators themselves survive until the final sweep, so both operands
	/// of a paste are substituted before the concatenation happens.
	fn substitute(&self, raw: &[String], expanded: &[String]) -> String {
		let mut out = self.body.clone();
		for (idx, param) in self.params.iter().enumerate() {
			let (name, raw_val, exp_val) = if param == "..." {
				(
					"__VA_ARGS__".to_string(),
					raw.iter().skip(idx).join(", "),
					expanded.iter().skip(idx).join(", "),
				)
			} else {
				(
					param.clone(),
					raw.get(idx).cloned().unwrap_or_default(),
					expanded.get(idx).cloned().unwrap_or_default(),
				)
			};
			let word = regex::escape(&name);
			// A parameter next to ## takes its raw value.
			let re_paste_left = Regex::new(&format!(r"(?m)(##[\s\\]*){word}\b")).unwrap();
			out = re_paste_left
				.replace_all(&out, |caps: &Captures| format!("{}{}", &caps[1], raw_val))
				.into_owned();
			let re_paste_right = Regex::new(&format!(r"(?m)\b{word}([\s\\]*##)")).unwrap();
			out = re_paste_right
				.replace_all(&out, |caps: &Captures| format!("{}{}", raw_val, &caps[1]))
				.into_owned();
			// Stringification wraps the raw value in double quotes.
			let re_stringify = Regex::new(&format!(r"(?m)(^|[^#])#\s*{word}($|[^\w])")).unwrap();
			out = re_stringify
				.replace_all(&out, |caps: &Captures| format!("{}\"{}\"{}", &caps[1], raw_val, &caps[2]))
				.into_owned();
			// Every remaining whole-word occurrence gets the expanded value.
			out = replace_word(&out, &name, &exp_val);
		}
		// Leftover ## operators concatenate by deletion, whitespace included.
		out = RE_PASTE.replace_all(&out, "").into_owned();
		// Empty leading arguments must not introduce indentation.
		out.trim_start().to_string()
	}
}

/// The macro table. Kept as a vector so iteration follows first-definition
/// order, which makes the scan-and-expand pass deterministic. Redefinition
/// replaces the entry in place, keeping its original position.
#[derive(Debug)]
pub struct MacroTable {
	macros: Vec<Macro>,
}

impl Default for MacroTable {
	fn default() -> Self {
		Self::new()
	}
}

impl MacroTable {
	pub fn new() -> Self {
		Self { macros: vec![] }
	}

	pub fn reset(&mut self) {
		self.macros.clear();
	}

	pub fn get(&self, ident: &str) -> Option<&Macro> {
		self.macros.iter().find(|m| m.ident == ident)
	}

	pub fn contains(&self, ident: &str) -> bool {
		self.get(ident).is_some()
	}

	/// Insert a macro. Redefinition wins silently apart from a warning.
	pub fn define(&mut self, mac: Macro) {
		if let Some(existing) = self.macros.iter_mut().find(|m| m.ident == mac.ident) {
			report::error(&format!("Macro '{}' redefined", mac.ident), Severity::Warning);
			*existing = mac;
		} else {
			self.macros.push(mac);
		}
	}

	/// Remove a macro. Removing an unknown identifier is a no-op.
	pub fn undef(&mut self, ident: &str) {
		self.macros.retain(|m| m.ident != ident);
	}

	/// Expand every macro reference in `code`.
	pub fn expand(&self, code: &str) -> String {
		self.expand_depth(code, 0)
	}

	pub(crate) fn expand_depth(&self, code: &str, depth: u32) -> String {
		let mut out = if depth == 0 {
			textops::remove_line_escapes(code, false)
		} else {
			code.to_string()
		};
		if depth > MAX_EXPANSION_DEPTH {
			report::error(
				&format!("Macro expansion depth limit {MAX_EXPANSION_DEPTH} exceeded"),
				Severity::Severe,
			);
			return out;
		}
		for mac in &self.macros {
			let mut search_from = 0;
			while let Some(start) = find_reference(&out, &mac.ident, mac.is_function_like(), search_from) {
				if textops::is_in_comment(&out, start) || textops::is_in_string(&out, start) {
					search_from = start + mac.ident.len();
					continue;
				}
				debug!("{}Expanding macro '{}'.", "    ".repeat(depth as usize + 1), mac.ident);
				let mut end = start + mac.ident.len();
				let expansion = if mac.is_function_like() {
					let mut raw_args: Vec<String> = vec![];
					if let Some((args_start, args_end)) = textops::find_enclosed(&out, end, '(', ')') {
						end = args_end + 1;
						raw_args = split_args(&out[args_start + 1..args_end]);
					}
					if raw_args.len() < mac.params.len() {
						report::error(
							&format!(
								"{} macro reference is missing some of its {} arguments",
								mac.ident,
								mac.params.len()
							),
							Severity::Critical,
						);
					}
					let exp_args: Vec<String> =
						raw_args.iter().map(|arg| self.expand_depth(arg, depth + 1)).collect();
					mac.substitute(&raw_args, &exp_args)
				} else {
					mac.substitute(&[], &[])
				};
				// The body may reference other macros, including ones that
				// were defined after this one.
				let expansion = self.expand_depth(&expansion, depth + 1);
				let removed = end - start;
				let before_len = out.len();
				out = insert_expansion(&out, start, end, &expansion);
				let inserted = out.len() - (before_len - removed);
				search_from = start + inserted;
			}
		}
		out
	}
}

fn is_word_char(ch: char) -> bool {
	ch.is_ascii_alphanumeric() || ch == '_'
}

/// Find the next whole-word reference to `ident` at or after `from`.
///
/// Function-like references must additionally be followed by an opening
/// parenthesis, whitespace permitting.
fn find_reference(code: &str, ident: &str, function_like: bool, from: usize) -> Option<usize> {
	let mut pos = from;
	while let Some(found) = code.get(pos..)?.find(ident) {
		let start = pos + found;
		let end = start + ident.len();
		pos = end;
		if code[..start].chars().next_back().is_some_and(is_word_char) {
			continue;
		}
		let tail = &code[end..];
		if function_like {
			if tail.trim_start().starts_with('(') {
				return Some(start);
			}
		} else if !tail.chars().next().is_some_and(is_word_char) {
			return Some(start);
		}
	}
	None
}

/// Replace every whole-word occurrence of `word` in `text`. Unlike a naive
/// `str::replace`, adjacent occurrences separated by a single delimiter are
/// all caught, and the replacement value is never rescanned.
fn replace_word(text: &str, word: &str, value: &str) -> String {
	let mut out = String::with_capacity(text.len());
	let mut pos = 0;
	while let Some(found) = text[pos..].find(word) {
		let start = pos + found;
		let end = start + word.len();
		let bounded = !text[..start].chars().next_back().is_some_and(is_word_char)
			&& !text[end..].chars().next().is_some_and(is_word_char);
		out.push_str(&text[pos..start]);
		out.push_str(if bounded { value } else { word });
		pos = end;
	}
	out.push_str(&text[pos..]);
	out
}

/// Split a parenthesized argument list on top-level commas.
///
/// A comma inside nested parentheses or behind an unbalanced quote belongs
/// to the current argument. Embedded newlines are removed and every final
/// argument is trimmed.
fn split_args(args_code: &str) -> Vec<String> {
	let args_code = args_code.trim().replace('\n', "");
	if args_code.is_empty() {
		return vec![];
	}
	let mut args: Vec<String> = vec![];
	for piece in args_code.split(',') {
		if let Some(last) = args.last_mut() {
			let unbalanced = last.matches('"').count() & 1 == 1
				|| last.matches('\'').count() & 1 == 1
				|| last.matches('(').count() != last.matches(')').count();
			if unbalanced {
				last.push_str(", ");
				last.push_str(piece.trim_start());
				continue;
			}
		}
		args.push(piece.to_string());
	}
	args.into_iter().map(|arg| arg.trim().to_string()).collect()
}

/// Splice an expansion into the source text. A multi-line expansion gets
/// lines 2+ indented with the leading whitespace of the reference line, so
/// the output stays aligned with the surrounding code.
fn insert_expansion(code: &str, start: usize, end: usize, expansion: &str) -> String {
	let head = &code[..start];
	let expansion = if expansion.contains('\n') {
		let ref_line = head.rsplit('\n').next().unwrap_or(head);
		let indent = &ref_line[..ref_line.len() - ref_line.trim_start().len()];
		expansion
			.lines()
			.enumerate()
			.map(|(idx, line)| {
				if idx > 0 {
					format!("{indent}{line}").trim_end().to_string()
				} else {
					line.to_string()
				}
			})
			.join("\n")
	} else {
		expansion.to_string()
	};
	format!("{head}{expansion}{}", &code[end..])
}
