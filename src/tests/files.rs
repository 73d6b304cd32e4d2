use std::fs;

use crate::engine::Preproc;
use crate::loader::FileLoader;
use crate::report::Severity;
use crate::tests::capture_errors;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

#[test]
fn loader_searches_directories_in_order() {
	let first = tempdir().unwrap();
	let second = tempdir().unwrap();
	fs::write(first.path().join("x.h"), "from first\n").unwrap();
	fs::write(second.path().join("x.h"), "from second\n").unwrap();

	let mut loader = FileLoader::new();
	loader.add_include_dir(first.path());
	loader.add_include_dir(second.path());
	assert_eq!(loader.read("x.h"), "from first\n");
}

#[test]
fn loader_maps_file_path_to_parent_dir() {
	let dir = tempdir().unwrap();
	let header = dir.path().join("a.h");
	fs::write(&header, "int a;\n").unwrap();

	let mut loader = FileLoader::new();
	loader.add_include_dir(&header);
	assert_eq!(loader.read("a.h"), "int a;\n");
}

#[test]
fn loader_reports_missing_directory() {
	let errors = capture_errors();
	let mut loader = FileLoader::new();
	loader.add_include_dir(std::path::Path::new("/no/such/dir/anywhere"));
	let errors = errors.borrow();
	assert!(errors.iter().any(|(text, sev)| *sev == Severity::Warning && text.contains("not found")));
}

#[test]
fn loader_reports_missing_file_and_returns_empty() {
	let errors = capture_errors();
	let loader = FileLoader::new();
	assert_eq!(loader.read("missing.h"), "");
	let errors = errors.borrow();
	assert!(errors.iter().any(|(text, sev)| *sev == Severity::Warning && text.contains("missing.h")));
}

#[test]
fn include_pulls_in_macros_but_not_text() {
	let dir = tempdir().unwrap();
	fs::write(dir.path().join("defs.h"), "#define VALUE 42\nint unrelated;\n").unwrap();

	let mut cpp = Preproc::new();
	cpp.add_include_dir(dir.path());
	let output = cpp.process_code("#include \"defs.h\"\nVALUE\n", true, false, "");
	assert_eq!(output, "42\n");
	// The included file's text stays out of the including file's streams.
	assert!(!cpp.output().contains("unrelated"));
	assert!(cpp.output_full().contains("#include \"defs.h\""));
	assert!(!cpp.output_full().contains("unrelated"));
}

#[test]
fn angle_bracket_include_accepted() {
	let dir = tempdir().unwrap();
	fs::write(dir.path().join("sys.h"), "#define SYS 1\n").unwrap();

	let mut cpp = Preproc::new();
	cpp.add_include_dir(dir.path());
	cpp.process_code("#include <sys.h>\n", true, false, "");
	assert!(cpp.macros.contains("SYS"));
}

#[test]
fn nested_includes_resolve_transitively() {
	let dir = tempdir().unwrap();
	fs::write(dir.path().join("inner.h"), "#define B 2\n").unwrap();
	fs::write(dir.path().join("outer.h"), "#include \"inner.h\"\n#define A B\n").unwrap();

	let mut cpp = Preproc::new();
	cpp.add_include_dir(dir.path());
	let output = cpp.process_code("#include \"outer.h\"\nA\n", true, false, "");
	assert_eq!(output, "2\n");
}

#[test]
fn include_conditional_on_macro_state() {
	let dir = tempdir().unwrap();
	fs::write(dir.path().join("feature.h"), "#define FEATURE_ON 1\n").unwrap();

	let mut cpp = Preproc::new();
	cpp.add_include_dir(dir.path());
	let code = "#include \"feature.h\"\n#if FEATURE_ON\nenabled\n#else\ndisabled\n#endif\n";
	assert_eq!(cpp.process_code(code, true, false, ""), "enabled\n");
}

#[test]
fn missing_include_leaves_processing_alive() {
	let errors = capture_errors();
	let mut cpp = Preproc::new();
	let output = cpp.process_code("#include \"nope.h\"\nint x;\n", true, false, "");
	assert_eq!(output, "int x;\n");
	assert!(errors.borrow().iter().any(|(text, _)| text.contains("nope.h")));
}

#[test]
fn unbalanced_include_reported() {
	let dir = tempdir().unwrap();
	fs::write(dir.path().join("open.h"), "#if 1\nx\n").unwrap();

	let errors = capture_errors();
	let mut cpp = Preproc::new();
	cpp.add_include_dir(dir.path());
	cpp.process_code("#include \"open.h\"\n", true, false, "");
	let errors = errors.borrow();
	assert!(errors.iter().any(|(text, sev)| {
		*sev == Severity::Critical && text.contains("Unterminated #if")
	}));
}

#[test]
fn process_file_and_save_output_round_trip() {
	let dir = tempdir().unwrap();
	let src = dir.path().join("in.c");
	fs::write(&src, "#define N 3\nint a[N];\n").unwrap();

	let mut cpp = Preproc::new();
	let output = cpp.process_file(&src.to_string_lossy(), true, false);
	assert_eq!(output, "int a[3];\n");

	let trimmed = dir.path().join("out.c");
	cpp.save_output(&trimmed, false).unwrap();
	assert_eq!(fs::read_to_string(&trimmed).unwrap(), "int a[3];\n");

	let full = dir.path().join("out_full.c");
	cpp.save_output(&full, true).unwrap();
	assert_eq!(fs::read_to_string(&full).unwrap(), "#define N 3\nint a[3];\n");
}

#[test]
fn macros_persist_between_files_like_cli_pairs() {
	let dir = tempdir().unwrap();
	let prelude = dir.path().join("prelude.h");
	let src = dir.path().join("in.c");
	fs::write(&prelude, "#define GREETING \"hi\"\n").unwrap();
	fs::write(&src, "puts(GREETING);\n").unwrap();

	let mut cpp = Preproc::new();
	// Prelude processed for side effects only, the way `-p` does it.
	cpp.process_file(&prelude.to_string_lossy(), false, false);
	assert_eq!(cpp.output(), "");
	let output = cpp.process_file(&src.to_string_lossy(), true, false);
	assert_eq!(output, "puts(\"hi\");\n");
}

#[test]
fn diagnostics_name_the_processed_file() {
	let dir = tempdir().unwrap();
	let src = dir.path().join("bad.c");
	fs::write(&src, "#endif\n").unwrap();

	let errors = capture_errors();
	let mut cpp = Preproc::new();
	cpp.process_file(&src.to_string_lossy(), true, false);
	let errors = errors.borrow();
	assert!(errors.iter().any(|(text, _)| text.contains("Processed file: bad.c, start line: 1")));
}
