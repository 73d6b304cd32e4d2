//! Evaluation of `#if`/`#elif` expressions.
//!
//! The expression is first normalized: `defined` references become `1`/`0`,
//! macros are expanded, continuations, comments and numeric type suffixes
//! are stripped. What remains is parsed and evaluated directly by a small
//! Pratt parser over signed 64-bit integers. Undefined identifiers evaluate
//! to zero, and every lexing, parsing or arithmetic failure makes the whole
//! expression false, which lines up with the usual C preprocessor rules.
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::macros::MacroTable;
use crate::textops::{self, CommentMode};

static RE_DEFINED: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\bdefined[ \t]*\(?\s*(?P<ident>\w+)[ \t]*\)?").unwrap());

/// Evaluate an expression against the given macro table. `None` means the
/// expression could not be evaluated.
pub fn evaluate(expr_code: &str, macros: &MacroTable) -> Option<i64> {
	eval_expr(&normalize(expr_code, macros))
}

/// Truthiness of an expression: non-zero is true, failure is false.
pub fn is_true(expr_code: &str, macros: &MacroTable) -> bool {
	evaluate(expr_code, macros).is_some_and(|v| v != 0)
}

fn normalize(expr_code: &str, macros: &MacroTable) -> String {
	let mut out = eval_defined(expr_code, macros);
	out = macros.expand(&out);
	out = textops::remove_line_escapes(&out, false);
	out = textops::remove_comments(&out, CommentMode::Remove);
	out = textops::remove_num_type_suffix(&out);
	// Expanded macros may have produced new `defined` references.
	out = eval_defined(&out, macros);
	textops::remove_empty_lines(&out)
}

/// Replace `defined IDENT` and `defined(IDENT)` with `1` or `0`.
fn eval_defined(code: &str, macros: &MacroTable) -> String {
	RE_DEFINED
		.replace_all(code, |caps: &Captures| {
			if macros.contains(&caps["ident"]) { " 1".to_string() } else { " 0".to_string() }
		})
		.into_owned()
}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
enum Tok {
	Num(i64),
	LParen,
	RParen,
	Question,
	Colon,
	Plus,
	Minus,
	Star,
	Slash,
	Percent,
	Shl,
	Shr,
	Lt,
	Le,
	Gt,
	Ge,
	Eq,
	Ne,
	BitAnd,
	BitXor,
	BitOr,
	AndAnd,
	OrOr,
	Not,
	Tilde,
}

fn lex(code: &str) -> Option<Vec<Tok>> {
	let mut toks = vec![];
	let mut chars = code.chars().peekable();
	while let Some(&ch) = chars.peek() {
		match ch {
			c if c.is_whitespace() => {
				chars.next();
			}
			c if c.is_ascii_digit() => {
				let mut lit = String::new();
				while let Some(&c) = chars.peek() {
					if c.is_ascii_alphanumeric() || c == '.' {
						lit.push(c);
						chars.next();
					} else {
						break;
					}
				}
				toks.push(Tok::Num(parse_int(&lit)?));
			}
			c if c.is_ascii_alphabetic() || c == '_' => {
				while chars.peek().is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_') {
					chars.next();
				}
				// An identifier that survived expansion is undefined; it
				// evaluates to zero.
				toks.push(Tok::Num(0));
			}
			'(' => {
				chars.next();
				toks.push(Tok::LParen);
			}
			')' => {
				chars.next();
				toks.push(Tok::RParen);
			}
			'?' => {
				chars.next();
				toks.push(Tok::Question);
			}
			':' => {
				chars.next();
				toks.push(Tok::Colon);
			}
			'+' => {
				chars.next();
				toks.push(Tok::Plus);
			}
			'-' => {
				chars.next();
				toks.push(Tok::Minus);
			}
			'*' => {
				chars.next();
				toks.push(Tok::Star);
			}
			'/' => {
				chars.next();
				toks.push(Tok::Slash);
			}
			'%' => {
				chars.next();
				toks.push(Tok::Percent);
			}
			'~' => {
				chars.next();
				toks.push(Tok::Tilde);
			}
			'^' => {
				chars.next();
				toks.push(Tok::BitXor);
			}
			'&' => {
				chars.next();
				toks.push(if chars.next_if_eq(&'&').is_some() { Tok::AndAnd } else { Tok::BitAnd });
			}
			'|' => {
				chars.next();
				toks.push(if chars.next_if_eq(&'|').is_some() { Tok::OrOr } else { Tok::BitOr });
			}
			'<' => {
				chars.next();
				toks.push(match chars.peek() {
					Some('<') => {
						chars.next();
						Tok::Shl
					}
					Some('=') => {
						chars.next();
						Tok::Le
					}
					_ => Tok::Lt,
				});
			}
			'>' => {
				chars.next();
				toks.push(match chars.peek() {
					Some('>') => {
						chars.next();
						Tok::Shr
					}
					Some('=') => {
						chars.next();
						Tok::Ge
					}
					_ => Tok::Gt,
				});
			}
			'=' => {
				chars.next();
				chars.next_if_eq(&'=')?;
				toks.push(Tok::Eq);
			}
			'!' => {
				chars.next();
				toks.push(if chars.next_if_eq(&'=').is_some() { Tok::Ne } else { Tok::Not });
			}
			_ => return None,
		}
	}
	Some(toks)
}

fn parse_int(lit: &str) -> Option<i64> {
	if lit.contains('.') {
		// Floating point constants are out of scope.
		return None;
	}
	if let Some(hex) = lit.strip_prefix("0x").or_else(|| lit.strip_prefix("0X")) {
		return i64::from_str_radix(hex, 16).ok();
	}
	if lit.len() > 1 && lit.starts_with('0') {
		return i64::from_str_radix(&lit[1..], 8).ok();
	}
	lit.parse().ok()
}

struct Parser {
	toks: Vec<Tok>,
	pos: usize,
}

/// Binding power of a unary operator; higher than every binary one.
const UNARY_BP: u8 = 23;

/// Left/right binding powers per binary operator, following C precedence.
/// `?:` sits at the bottom and associates to the right.
fn binding_power(tok: Tok) -> Option<(u8, u8)> {
	Some(match tok {
		Tok::Question => (2, 1),
		Tok::OrOr => (3, 4),
		Tok::AndAnd => (5, 6),
		Tok::BitOr => (7, 8),
		Tok::BitXor => (9, 10),
		Tok::BitAnd => (11, 12),
		Tok::Eq | Tok::Ne => (13, 14),
		Tok::Lt | Tok::Le | Tok::Gt | Tok::Ge => (15, 16),
		Tok::Shl | Tok::Shr => (17, 18),
		Tok::Plus | Tok::Minus => (19, 20),
		Tok::Star | Tok::Slash | Tok::Percent => (21, 22),
		_ => return None,
	})
}

impl Parser {
	fn peek(&self) -> Option<Tok> {
		self.toks.get(self.pos).copied()
	}

	fn next(&mut self) -> Option<Tok> {
		let tok = self.peek()?;
		self.pos += 1;
		Some(tok)
	}

	fn expr(&mut self, min_bp: u8) -> Option<i64> {
		let mut lhs = match self.next()? {
			Tok::Num(n) => n,
			Tok::LParen => {
				let val = self.expr(0)?;
				match self.next()? {
					Tok::RParen => val,
					_ => return None,
				}
			}
			Tok::Plus => self.expr(UNARY_BP)?,
			Tok::Minus => self.expr(UNARY_BP)?.wrapping_neg(),
			Tok::Not => (self.expr(UNARY_BP)? == 0) as i64,
			Tok::Tilde => !self.expr(UNARY_BP)?,
			_ => return None,
		};
		while let Some(op) = self.peek() {
			let Some((lbp, rbp)) = binding_power(op) else { break };
			if lbp < min_bp {
				break;
			}
			self.next();
			if op == Tok::Question {
				let then_val = self.expr(0)?;
				if self.next()? != Tok::Colon {
					return None;
				}
				let else_val = self.expr(rbp)?;
				lhs = if lhs != 0 { then_val } else { else_val };
				continue;
			}
			let rhs = self.expr(rbp)?;
			lhs = apply(op, lhs, rhs)?;
		}
		Some(lhs)
	}
}

fn apply(op: Tok, lhs: i64, rhs: i64) -> Option<i64> {
	Some(match op {
		Tok::Plus => lhs.wrapping_add(rhs),
		Tok::Minus => lhs.wrapping_sub(rhs),
		Tok::Star => lhs.wrapping_mul(rhs),
		Tok::Slash => lhs.checked_div(rhs)?,
		Tok::Percent => lhs.checked_rem(rhs)?,
		Tok::Shl => lhs.checked_shl(u32::try_from(rhs).ok()?)?,
		Tok::Shr => lhs.checked_shr(u32::try_from(rhs).ok()?)?,
		Tok::Lt => (lhs < rhs) as i64,
		Tok::Le => (lhs <= rhs) as i64,
		Tok::Gt => (lhs > rhs) as i64,
		Tok::Ge => (lhs >= rhs) as i64,
		Tok::Eq => (lhs == rhs) as i64,
		Tok::Ne => (lhs != rhs) as i64,
		Tok::BitAnd => lhs & rhs,
		Tok::BitXor => lhs ^ rhs,
		Tok::BitOr => lhs | rhs,
		Tok::AndAnd => (lhs != 0 && rhs != 0) as i64,
		Tok::OrOr => (lhs != 0 || rhs != 0) as i64,
		_ => return None,
	})
}

fn eval_expr(code: &str) -> Option<i64> {
	let toks = lex(code)?;
	if toks.is_empty() {
		return None;
	}
	let mut parser = Parser { toks, pos: 0 };
	let val = parser.expr(0)?;
	// Trailing tokens mean the expression was not fully parsed.
	if parser.pos != parser.toks.len() {
		return None;
	}
	Some(val)
}
