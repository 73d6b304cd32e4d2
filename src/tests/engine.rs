use crate::engine::Preproc;
use crate::report::Severity;
use crate::tests::{capture_errors, process, process_full};
use pretty_assertions::assert_eq;

#[test]
fn function_macro_call_replaced_inline() {
	let output = process("#define SUM(A,B) A + B\nSUM(11, 22)\n");
	assert_eq!(output, "11 + 22\n");
}

#[test]
fn macro_defined_inside_active_conditional() {
	let mut cpp = Preproc::new();
	let code = "#define SQR(A) A*A\n#define A 5\n#ifdef A\n#define A_SQR SQR(A)\n#endif\nA_SQR";
	let output = cpp.process_code(code, true, false, "");
	assert_eq!(output, "5*5\n");
	assert_eq!(cpp.evaluate("A_SQR"), Some(25));
}

#[test]
fn expression_uses_defined_macros() {
	let mut cpp = Preproc::new();
	cpp.process_code("#define SUM(A,B) A + B", false, false, "");
	assert!(cpp.is_true("SUM(1,2) >= 3"));
	assert!(!cpp.is_true("SUM(1,2) > 3"));
}

#[test]
fn expansion_mixes_object_and_function_macros() {
	let mut cpp = Preproc::new();
	cpp.process_code("#define SQR(A) A*A\n#define A 5\n#define SUM(A,B) A + B", false, false, "");
	assert_eq!(cpp.expand_macros("A + A == SUM(3, 7)"), "5 + 5 == 3 + 7");
}

#[test]
fn inactive_branch_suppressed_in_trimmed_output() {
	let mut cpp = Preproc::new();
	let output = cpp.process_code("#if 0\nX\n#else\nY\n#endif", true, false, "");
	assert_eq!(output, "Y\n");
	assert_eq!(cpp.output_full(), "#if 0\nX\n#else\nY\n#endif\n");
}

#[test]
fn variadic_macro_forwards_arguments() {
	let output = process("#define LOG(fmt, ...) printf(fmt, __VA_ARGS__)\nLOG(\"x=%d y=%d\", x, y)\n");
	assert_eq!(output, "printf(\"x=%d y=%d\", x, y)\n");
}

#[test]
fn token_pasting_end_to_end() {
	let output = process("#define CAT(a,b) a##b\nCAT(foo,bar)\n");
	assert_eq!(output, "foobar\n");
}

#[test]
fn stringification_end_to_end() {
	let output = process("#define STR(x) #x\nSTR(hello world)\n");
	assert_eq!(output, "\"hello world\"\n");
}

#[test]
fn self_referential_macro_reported_and_kept() {
	let errors = capture_errors();
	let output = process("#define X X\nX\n");
	assert_eq!(output, "X\n");
	assert!(errors.borrow().iter().any(|(_, sev)| *sev == Severity::Severe));
}

#[test]
fn elif_chain_picks_first_true_branch() {
	let code = "#define MODE 2\n\
		#if MODE == 1\n\
		one\n\
		#elif MODE == 2\n\
		two\n\
		#elif MODE == 3\n\
		three\n\
		#else\n\
		other\n\
		#endif\n";
	assert_eq!(process(code), "two\n");
}

#[test]
fn ifndef_guard_admits_first_pass() {
	let code = "#ifndef GUARD\n#define GUARD\nbody\n#endif\n";
	let mut cpp = Preproc::new();
	assert_eq!(cpp.process_code(code, true, false, ""), "body\n");
	// Second pass: the guard is now defined.
	assert_eq!(cpp.process_code(code, false, false, ""), "");
}

#[test]
fn nested_conditionals_resolve_inner_branches() {
	let code = "#if 1\n#if 0\na\n#else\nb\n#endif\n#endif\n";
	assert_eq!(process(code), "b\n");
}

#[test]
fn dead_branch_keeps_stack_but_skips_directives() {
	// The #define inside the dead branch must not take effect.
	let code = "#if 0\n#define HIDDEN 1\n#endif\nHIDDEN\n";
	assert_eq!(process(code), "HIDDEN\n");
}

#[test]
fn conditions_in_dead_branches_not_evaluated() {
	// `1 / 0` would evaluate false anyway; the point is that the chain
	// nests and unwinds correctly inside an ignored region.
	let code = "#if 0\n#if UNKNOWN(\nx\n#endif\ny\n#endif\nz\n";
	assert_eq!(process(code), "z\n");
}

#[test]
fn unknown_directives_pass_through_verbatim() {
	let output = process_full("#pragma once\nint x;\n");
	assert_eq!(output, "#pragma once\nint x;\n");
	assert_eq!(process("#pragma once\nint x;\n"), "int x;\n");
}

#[test]
fn verbatim_stream_holds_every_line() {
	let code = "#define A 1\n// note\n\n#if 0\nhidden\n#endif\nA\n";
	let full = process_full(code);
	assert_eq!(full, "#define A 1\n// note\n\n#if 0\nhidden\n#endif\n1\n");
}

#[test]
fn comments_and_blanks_attach_to_following_code() {
	let code = "first;\n\n// keep me\nsecond;\n";
	assert_eq!(process(code), "first;\n\n// keep me\nsecond;\n");
}

#[test]
fn attachments_to_suppressed_code_dropped() {
	let code = "code;\n\n// gone\n#if 0\nhidden\n#endif\nafter;\n";
	assert_eq!(process(code), "code;\nafter;\n");
}

#[test]
fn leading_blank_lines_dropped_in_trimmed_output() {
	assert_eq!(process("\n\nint a;\n"), "int a;\n");
}

#[test]
fn directives_clear_pending_attachments() {
	let code = "a;\n// lost to the directive\n#define B 1\nc;\n";
	assert_eq!(process(code), "a;\nc;\n");
}

#[test]
fn unterminated_if_reported() {
	let errors = capture_errors();
	process("#if 1\nx\n");
	let errors = errors.borrow();
	assert!(errors.iter().any(|(text, sev)| {
		*sev == Severity::Critical && text.contains("Unterminated #if")
	}));
}

#[test]
fn stray_endif_reported() {
	let errors = capture_errors();
	process("#endif\n");
	let errors = errors.borrow();
	assert!(errors.iter().any(|(text, sev)| {
		*sev == Severity::Critical && text.contains("Unexpected #endif")
	}));
}

#[test]
fn balanced_input_reports_nothing() {
	let errors = capture_errors();
	process("#if 1\n#if 0\na\n#endif\nb\n#endif\nc\n");
	assert!(errors.borrow().is_empty());
}

#[test]
fn continued_directives_processed_as_one() {
	let code = "#define LONG_SUM(A,B) \\\n    A + B\nLONG_SUM(1, 2)\n";
	assert_eq!(process(code), "1 + 2\n");
}

#[test]
fn global_output_accumulates_across_calls() {
	let mut cpp = Preproc::new();
	cpp.process_code("one;\n", true, false, "");
	cpp.process_code("two;\n", true, false, "");
	assert_eq!(cpp.output(), "one;\ntwo;\n");
	cpp.reset_output();
	assert_eq!(cpp.output(), "");
	// Macros survive an output reset but not a full reset.
	cpp.process_code("#define K 1", false, false, "");
	assert!(cpp.macros.contains("K"));
	cpp.reset();
	assert!(!cpp.macros.contains("K"));
}

#[test]
fn local_output_kept_out_of_global_stream() {
	let mut cpp = Preproc::new();
	let local = cpp.process_code("int x;\n", false, false, "");
	assert_eq!(local, "int x;\n");
	assert_eq!(cpp.output(), "");
}

#[test]
fn full_local_output_returns_verbatim_stream() {
	let mut cpp = Preproc::new();
	let local = cpp.process_code("#define A 1\nA\n", false, true, "");
	assert_eq!(local, "#define A 1\n1\n");
}

#[test]
fn expansion_idempotent_through_engine() {
	let mut cpp = Preproc::new();
	cpp.process_code("#define SUM(A,B) A + B", false, false, "");
	let once = cpp.expand_macros("SUM(4, 5)");
	assert_eq!(cpp.expand_macros(&once), once);
}
