//! Pure text utilities shared by the chunker, the macro expander and the
//! expression evaluator: tab expansion, comment handling, line-continuation
//! joining, balanced-delimiter scanning and the in-string/in-comment checks.
use std::sync::LazyLock;

use regex::{Captures, Regex};

static RE_MLINE_CMNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static RE_SLINE_CMNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]*//[^\n]*").unwrap());
static RE_LINE_CONT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]*\\[ \t]*\n").unwrap());
static RE_NUM_CONST: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?P<num>0[xX][0-9a-fA-F]+|\d[\d.]*)(?P<suffix>[uUlLfF]+)?").unwrap());

/// What to put in place of a removed comment.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum CommentMode {
	/// Drop the comment entirely.
	Remove,
	/// Replace every non-newline character with a space, preserving column
	/// offsets.
	Spaces,
	/// Keep only the newlines, preserving line numbers.
	Newlines,
}

/// Replace tabs with spaces that advance to the next multiple of `tab_size`,
/// measured from the start of each line.
pub fn expand_tabs(code: &str, tab_size: usize) -> String {
	let mut out = String::with_capacity(code.len());
	for line in code.lines() {
		let mut col = 0;
		for ch in line.chars() {
			if ch == '\t' {
				let pad = tab_size - (col % tab_size);
				out.extend(std::iter::repeat_n(' ', pad));
				col += pad;
			} else {
				out.push(ch);
				col += 1;
			}
		}
		out.push('\n');
	}
	out
}

/// Join lines split with a trailing backslash. With `keep_newlines` the
/// escape is replaced by a newline instead, preserving the line count.
pub fn remove_line_escapes(code: &str, keep_newlines: bool) -> String {
	let repl = if keep_newlines { "\n" } else { "" };
	RE_LINE_CONT.replace_all(code, repl).into_owned()
}

/// Drop lines that hold nothing but whitespace.
pub fn remove_empty_lines(code: &str) -> String {
	code.lines().filter(|line| !line.trim().is_empty()).collect::<Vec<_>>().join("\n")
}

/// Remove `/*…*/` and `//…` comments, substituting per `mode`.
pub fn remove_comments(code: &str, mode: CommentMode) -> String {
	let repl = |caps: &Captures| -> String {
		let matched = caps.get(0).unwrap().as_str();
		match mode {
			CommentMode::Remove => String::new(),
			CommentMode::Spaces => matched.chars().map(|c| if c == '\n' { '\n' } else { ' ' }).collect(),
			CommentMode::Newlines => "\n".repeat(matched.matches('\n').count()),
		}
	};
	let out = RE_MLINE_CMNT.replace_all(code, repl).into_owned();
	RE_SLINE_CMNT.replace_all(&out, repl).into_owned()
}

/// Strip C type suffixes (`u`, `U`, `l`, `L`, `f`, `F` combinations) from
/// numeric literals. Hex digits are not mistaken for suffixes.
pub fn remove_num_type_suffix(code: &str) -> String {
	RE_NUM_CONST.replace_all(code, |caps: &Captures| caps["num"].to_string()).into_owned()
}

/// Remove the longest common leading whitespace from every non-blank line.
pub fn dedent(code: &str) -> String {
	let mut prefix: Option<&str> = None;
	for line in code.lines() {
		if line.trim().is_empty() {
			continue;
		}
		let ws = &line[..line.len() - line.trim_start().len()];
		prefix = Some(match prefix {
			None => ws,
			Some(common) => {
				let shared = common
					.chars()
					.zip(ws.chars())
					.take_while(|(a, b)| a == b)
					.count();
				&common[..shared]
			}
		});
	}
	let prefix = prefix.unwrap_or("");
	code.lines()
		.map(|line| line.strip_prefix(prefix).unwrap_or(line))
		.collect::<Vec<_>>()
		.join("\n")
}

/// Locate the next `open` at or after `from`, preceded only by whitespace,
/// and the matching `close` such that the enclosed span holds equal counts
/// of both delimiters. Returns the byte positions of the two delimiters.
pub fn find_enclosed(code: &str, from: usize, open: char, close: char) -> Option<(usize, usize)> {
	let s_pos = code.get(from..)?.find(open)? + from;
	if !code[from..s_pos].chars().all(char::is_whitespace) {
		return None;
	}
	let mut e_pos = code[s_pos + open.len_utf8()..].find(close)? + s_pos + open.len_utf8();
	loop {
		let span = &code[s_pos..e_pos + close.len_utf8()];
		if span.matches(open).count() == span.matches(close).count() {
			return Some((s_pos, e_pos));
		}
		e_pos = code[e_pos + close.len_utf8()..].find(close)? + e_pos + close.len_utf8();
	}
}

/// Whether `pos` lies inside a `/*…*/` block or a `//` line comment.
pub fn is_in_comment(code: &str, pos: usize) -> bool {
	if pos >= code.len() {
		return false;
	}
	let Some(head) = code.get(..pos) else {
		return false;
	};
	if let Some(start) = head.rfind("/*") {
		if head[start..].find("*/").is_none() {
			return true;
		}
	}
	if let Some(start) = head.rfind("//") {
		if head[start..].find('\n').is_none() {
			return true;
		}
	}
	false
}

/// Whether `pos` lies inside a quoted literal, judged by counting quotes
/// from the start of the current line. Escaped quotes are not recognized;
/// the check is deliberately line-local.
pub fn is_in_string(code: &str, pos: usize) -> bool {
	if pos >= code.len() {
		return false;
	}
	let Some(head) = code.get(..pos) else {
		return false;
	};
	let line_start = head.rfind('\n').map(|p| p + 1).unwrap_or(0);
	let line = &head[line_start..];
	line.matches('"').count() & 1 == 1 || line.matches('\'').count() & 1 == 1
}
