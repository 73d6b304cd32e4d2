use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::Preproc;
use crate::report::{self, Severity};
use pretty_assertions::assert_eq;

pub mod engine;
pub mod files;

/// Route diagnostics into a buffer so tests can assert on text and severity.
/// The reporter is thread local, so the capture only sees this test's
/// diagnostics.
pub fn capture_errors() -> Rc<RefCell<Vec<(String, Severity)>>> {
	let collected: Rc<RefCell<Vec<(String, Severity)>>> = Rc::new(RefCell::new(vec![]));
	let sink = Rc::clone(&collected);
	report::set_printer(Some(Box::new(move |text: &str, severity: Severity| {
		sink.borrow_mut().push((text.to_string(), severity));
	})));
	collected
}

/// Run a snippet through a fresh engine and return its trimmed output.
pub fn process(code: &str) -> String {
	Preproc::new().process_code(code, true, false, "")
}

/// Run a snippet through a fresh engine and return its verbatim stream.
pub fn process_full(code: &str) -> String {
	Preproc::new().process_code(code, true, true, "")
}

// Integration tests:

#[test]
fn plain_code_is_preserved() {
	let input = "int main(void) {\n    int a = 1;\n\n    /* result */\n    return a;\n}\n";
	let output = process(input);
	assert_eq!(output.trim(), input.trim());
}

#[test]
fn crlf_input_is_normalized() {
	let output = process("int a;\r\nint b;\r\n");
	assert_eq!(output, "int a;\nint b;\n");
}

#[test]
fn tabs_are_expanded_in_output() {
	let output = process("\tint a;\n");
	assert_eq!(output, "    int a;\n");
}
