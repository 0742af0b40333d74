use std::sync::Arc;

use gossa_diagnostic::ErrorCode;
use gossa_ir::ast::{Decl, File, StmtKind};
use gossa_ir::NodeIdGen;
use gossa_parse::parse_file;
use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;

use crate::{
    check_package, intrinsic_package, CallKind, CheckOutput, ConstValue, Member, PackageExports,
    Sizes, Type,
};

type Packages = FxHashMap<String, Arc<PackageExports>>;

fn intrinsics() -> Packages {
    let mut packages = Packages::default();
    for path in ["runtime", "os", "unsafe"] {
        if let Some(exports) = intrinsic_package(path, "linux", "amd64") {
            packages.insert(path.to_string(), exports);
        }
    }
    packages
}

fn parse_all(sources: &[&str], ids: &mut NodeIdGen) -> Vec<File> {
    let mut base = 0;
    sources
        .iter()
        .map(|src| {
            let out = parse_file(src, base, ids);
            assert!(out.diagnostics.is_empty(), "{:#?}", out.diagnostics);
            base += src.len() as u32 + 1;
            out.file.unwrap_or_else(|| panic!("no file parsed"))
        })
        .collect()
}

fn check_with(path: &str, sources: &[&str], packages: &Packages) -> (Vec<File>, CheckOutput) {
    let mut ids = NodeIdGen::new();
    let files = parse_all(sources, &mut ids);
    let output = check_package(path, &files, packages, Sizes::default());
    (files, output)
}

fn check(src: &str) -> CheckOutput {
    check_with("main", &[src], &intrinsics()).1
}

fn errors(src: &str) -> Vec<(ErrorCode, String)> {
    check(src)
        .diagnostics
        .into_iter()
        .map(|d| (d.code, d.message))
        .collect()
}

fn in_main(stmts: &str) -> String {
    format!("package main\n\nfunc main() {{\n{stmts}\n}}\n")
}

fn assert_clean(src: &str) {
    let errs = errors(src);
    assert!(errs.is_empty(), "unexpected errors: {errs:#?}");
}

fn assert_error(src: &str, code: ErrorCode, message: &str) {
    let errs = errors(src);
    assert!(
        errs.iter().any(|(c, m)| *c == code && m == message),
        "expected {code:?} {message:?}, got {errs:#?}"
    );
}

#[test]
fn accepts_a_complete_program() {
    assert_clean(
        r#"package main

import (
	"os"
	"runtime"
)

const (
	a = iota
	b
	c
)

var total = sum([]int{a, b, c})

func sum(xs []int) int {
	n := 0
	for _, x := range xs {
		n += x
	}
	return n
}

func pair() (int, string) { return 1, "one" }

func main() {
	n, s := pair()
	println(n, s, total, runtime.GOOS)
	ch := make(chan int, 1)
	ch <- 3
	v, ok := <-ch
	if !ok || v != 3 {
		os.Exit(1)
	}
	defer func() {
		if r := recover(); r != nil {
			println(r)
		}
	}()
	var any interface{} = "x"
	if str, ok := any.(string); ok {
		println(len(str))
	}
}
"#,
    );
}

#[test]
fn unused_local_is_reported() {
    assert_error(
        &in_main("x := 1"),
        ErrorCode::E2003,
        "declared and not used: x",
    );
}

#[test]
fn assignment_does_not_count_as_use() {
    assert_error(
        &in_main("x := 1\nx = 2"),
        ErrorCode::E2003,
        "declared and not used: x",
    );
}

#[test]
fn unused_import_is_reported() {
    assert_error(
        "package main\n\nimport \"os\"\n\nfunc main() {}\n",
        ErrorCode::E2004,
        "\"os\" imported and not used",
    );
}

#[test]
fn missing_package_is_reported() {
    assert_error(
        "package main\n\nimport \"fmt\"\n\nfunc main() { fmt.Println() }\n",
        ErrorCode::E3001,
        "could not import fmt (package not found)",
    );
}

#[test]
fn undefined_name() {
    assert_error(&in_main("println(y)"), ErrorCode::E2002, "undefined: y");
}

#[test]
fn mismatched_assignment() {
    assert_error(
        &in_main("var s string = 1\nprintln(s)"),
        ErrorCode::E2001,
        "cannot use 1 (untyped int constant) as string value in variable declaration",
    );
}

#[test]
fn mismatched_binary_operands() {
    assert_error(
        &in_main("a, b := 1, \"x\"\nprintln(a + b)"),
        ErrorCode::E2007,
        "invalid operation: a + b (mismatched types int and string)",
    );
}

#[test]
fn constant_overflow() {
    assert_error(
        &in_main("var b byte = 256\nprintln(b)"),
        ErrorCode::E2013,
        "cannot use 256 (untyped int constant) as uint8 value in variable declaration (overflows)",
    );
}

#[test]
fn defaulted_constant_overflows_int() {
    let big = "1 << 63 (untyped int constant 9223372036854775808)";
    assert_error(
        &in_main("x := 1 << 63\nprintln(x)"),
        ErrorCode::E2013,
        &format!("cannot use {big} as int value in assignment (overflows)"),
    );
    assert_error(
        &in_main("println(1 << 63)"),
        ErrorCode::E2013,
        &format!("cannot use {big} as int value in argument to built-in println (overflows)"),
    );
    assert_error(
        &in_main("var a any = 1 << 63\nprintln(a)"),
        ErrorCode::E2013,
        &format!("cannot use {big} as any value in variable declaration (overflows)"),
    );
    assert_clean(&in_main("x := 1<<63 - 1\nvar a any = -1 << 63\nprintln(x, a)"));
}

#[test]
fn constant_division_by_zero() {
    assert_error(
        &in_main("println(1 / 0)"),
        ErrorCode::E2013,
        "invalid operation: division by zero",
    );
}

#[test]
fn missing_return() {
    assert_error(
        "package main\n\nfunc f(x int) int {\n\tif x > 0 {\n\t\treturn 1\n\t}\n}\n\nfunc main() { f(1) }\n",
        ErrorCode::E2006,
        "missing return",
    );
}

#[test]
fn terminating_statements_need_no_return() {
    assert_clean(
        r#"package main

func a(x int) int {
	if x > 0 {
		return 1
	} else {
		return 2
	}
}

func b() int {
	for {
	}
}

func c(x int) int {
	switch x {
	case 1:
		return 1
	default:
		panic("no")
	}
}

func main() { a(1); b(); c(1) }
"#,
    );
}

#[test]
fn return_count_mismatch() {
    let errs = errors("package main\n\nfunc f() (int, int) { return 1 }\n\nfunc main() { f() }\n");
    assert_eq!(errs.len(), 1, "{errs:#?}");
    assert_eq!(errs[0].0, ErrorCode::E2008);
    assert!(errs[0].1.starts_with("not enough return values"), "{}", errs[0].1);
}

#[test]
fn call_argument_count() {
    let errs = errors("package main\n\nfunc f(a, b int) {}\n\nfunc main() { f(1) }\n");
    assert_eq!(errs.len(), 1, "{errs:#?}");
    assert_eq!(errs[0].0, ErrorCode::E2008);
    assert!(errs[0].1.starts_with("not enough arguments in call to f"), "{}", errs[0].1);
}

#[test]
fn multi_value_call_as_arguments() {
    assert_clean(
        "package main\n\nfunc two() (int, string) { return 1, \"a\" }\n\nfunc take(n int, s string) {}\n\nfunc main() { take(two()) }\n",
    );
}

#[test]
fn println_spreads_a_multi_value_call() {
    assert_clean("package main\n\nfunc two() (int, bool) { return 1, true }\n\nfunc main() { println(two()) }\n");
    assert_error(
        "package main\n\nfunc two() (int, int) { return 1, 2 }\n\nfunc main() { println(two(), 3) }\n",
        ErrorCode::E2019,
        "multiple-value two() (value of type (int, int)) in single-value context",
    );
}

#[test]
fn multi_value_in_single_value_context() {
    let errs = errors(
        "package main\n\nfunc two() (int, int) { return 1, 2 }\n\nfunc main() { println(two() + 1) }\n",
    );
    assert!(errs.iter().any(|(c, _)| *c == ErrorCode::E2019), "{errs:#?}");
}

#[test]
fn assignment_count_mismatch() {
    assert_error(
        &in_main("a, b := 1\nprintln(a, b)"),
        ErrorCode::E2014,
        "assignment mismatch: 2 variables but 1 value",
    );
}

#[test]
fn no_new_variables() {
    assert_error(
        &in_main("a := 1\na := 2\nprintln(a)"),
        ErrorCode::E2005,
        "no new variables on left side of :=",
    );
}

#[test]
fn redeclared_in_block() {
    let errs = errors("package main\n\nfunc f() {}\nfunc f() {}\n\nfunc main() {}\n");
    assert_eq!(errs.len(), 1, "{errs:#?}");
    assert_eq!(errs[0], (ErrorCode::E2009, "f redeclared in this block".to_string()));
}

#[test]
fn break_outside_loop() {
    assert_error(
        &in_main("break"),
        ErrorCode::E2015,
        "break is not in a loop, switch, or select",
    );
}

#[test]
fn unused_expression_statement() {
    assert_error(
        &in_main("x := 1\nx + 1"),
        ErrorCode::E2007,
        "x + 1 (value of type int) is not used",
    );
}

#[test]
fn go_needs_a_call() {
    assert_error(
        &in_main("go int(1)"),
        ErrorCode::E2007,
        "go requires function call, not conversion",
    );
}

#[test]
fn main_package_without_main_checks() {
    // The interpreter reports the missing entry point at run time.
    assert_eq!(errors("package main\n\nfunc helper() {}\n"), vec![]);
}

#[test]
fn main_signature() {
    assert_error(
        "package main\n\nfunc main() int { return 0 }\n",
        ErrorCode::E2011,
        "func main must have no arguments and no return values",
    );
}

#[test]
fn initialization_cycle() {
    let errs = errors("package main\n\nvar x = x + 1\n\nfunc main() { println(x) }\n");
    assert!(
        errs.iter()
            .any(|(c, m)| *c == ErrorCode::E2007 && m == "initialization cycle: x refers to itself"),
        "{errs:#?}"
    );
}

#[test]
fn later_globals_resolve_lazily() {
    let (_, out) = check_with(
        "main",
        &["package main\n\nvar a = b * 2\nvar b = 21\n\nfunc main() { println(a) }\n"],
        &intrinsics(),
    );
    assert!(out.diagnostics.is_empty(), "{:#?}", out.diagnostics);
    let types: Vec<_> = out.package.globals.iter().map(|g| (g.name.as_str(), g.ty.clone())).collect();
    assert_eq!(types, vec![("a", Type::INT), ("b", Type::INT)]);
}

#[test]
fn type_assertion_needs_interface() {
    assert_error(
        &in_main("x := 1\n_ = x.(int)"),
        ErrorCode::E2018,
        "invalid operation: x (variable of type int) is not an interface",
    );
}

#[test]
fn conversions() {
    assert_clean(&in_main(
        "s := \"héllo\"\nb := []byte(s)\nr := []rune(s)\nprintln(string(b), string(r), string(rune(65)), int64(len(s)))",
    ));
    assert_error(
        &in_main("s := \"x\"\nprintln(int(s))"),
        ErrorCode::E2017,
        "cannot convert s (variable of type string) to type int",
    );
    assert_error(
        &in_main("println(int8(300))"),
        ErrorCode::E2013,
        "cannot convert 300 (untyped int constant) to type int8 (overflows)",
    );
}

#[test]
fn builtin_argument_checks() {
    assert_error(
        &in_main("x := 1\nprintln(len(x))"),
        ErrorCode::E2007,
        "invalid argument: x (variable of type int) for built-in len",
    );
    assert_error(
        &in_main("println(len())"),
        ErrorCode::E2008,
        "not enough arguments for len() (expected 1, found 0)",
    );
    assert_error(
        &in_main("xs := make([]int, 3, 1)\nprintln(xs)"),
        ErrorCode::E2007,
        "invalid argument: length and capacity swapped",
    );
}

#[test]
fn len_of_constant_string_is_constant() {
    let out = check(&in_main("const n = len(\"abc\")\nvar xs []int = make([]int, n)\nprintln(xs)"));
    assert!(out.diagnostics.is_empty(), "{:#?}", out.diagnostics);
    assert!(out.package.info.consts.values().any(|v| *v == ConstValue::Int(3)));
}

#[test]
fn append_spread_of_string_into_bytes() {
    assert_clean(&in_main("b := []byte(\"ab\")\nb = append(b, \"cd\"...)\nprintln(len(b))"));
}

#[test]
fn intrinsic_calls_are_classified() {
    let src = "package main\n\nimport (\n\t\"runtime\"\n\t\"unsafe\"\n)\n\nfunc main() {\n\truntime.Gosched()\n\tprintln(unsafe.Sizeof(1))\n}\n";
    let out = check(src);
    assert!(out.diagnostics.is_empty(), "{:#?}", out.diagnostics);
    let mut kinds: Vec<_> = out
        .package
        .info
        .calls
        .values()
        .filter_map(|k| match k {
            CallKind::Intrinsic(i) => Some(i.qualified_name()),
            _ => None,
        })
        .collect();
    kinds.sort_unstable();
    assert_eq!(kinds, vec!["runtime.Gosched", "unsafe.Sizeof"]);
}

#[test]
fn untyped_constants_take_their_context_type() {
    let (files, out) = check_with(
        "main",
        &["package main\n\nfunc main() {\n\tvar x int8 = 1 + 2\n\tprintln(x)\n}\n"],
        &intrinsics(),
    );
    assert!(out.diagnostics.is_empty(), "{:#?}", out.diagnostics);
    let Decl::Func(main) = &files[0].decls[0] else {
        panic!("expected func");
    };
    let body = main.body.as_ref().unwrap_or_else(|| panic!("no body"));
    let StmtKind::Var(specs) = &body.stmts[0].kind else {
        panic!("expected var");
    };
    let init = &specs[0].values[0];
    assert_eq!(out.package.info.type_of(init.id), Some(&Type::Int(crate::IntKind::Int8)));
    assert_eq!(out.package.info.consts.get(&init.id), Some(&ConstValue::Int(3)));
}

#[test]
fn imported_package_members() {
    let mut packages = intrinsics();
    let (_, lib) = check_with(
        "example.com/lib",
        &["package lib\n\nconst Answer = 42\n\nvar Count int\n\nfunc Double(n int) int { return n * 2 }\n\nfunc hidden() {}\n"],
        &packages,
    );
    assert!(lib.diagnostics.is_empty(), "{:#?}", lib.diagnostics);
    let exports = Arc::clone(&lib.package.exports);
    assert!(matches!(exports.members.get("Double"), Some(Member::Func(_))));
    assert!(exports.members.get("hidden").is_none());
    packages.insert("example.com/lib".to_string(), exports);

    let (_, main) = check_with(
        "main",
        &["package main\n\nimport \"example.com/lib\"\n\nfunc main() {\n\tlib.Count = lib.Double(lib.Answer)\n}\n"],
        &packages,
    );
    assert!(main.diagnostics.is_empty(), "{:#?}", main.diagnostics);

    let (_, bad) = check_with(
        "main",
        &["package main\n\nimport \"example.com/lib\"\n\nfunc main() {\n\tlib.hidden()\n}\n"],
        &packages,
    );
    assert_eq!(
        bad.diagnostics[0].message,
        "name hidden not exported by package lib"
    );
}

#[test]
fn duplicate_switch_case() {
    assert_error(
        &in_main("x := 1\nswitch x {\ncase 1:\ncase 1:\n}"),
        ErrorCode::E2007,
        "duplicate case 1 in expression switch",
    );
}

#[test]
fn imports_are_per_file() {
    let (_, out) = check_with(
        "main",
        &[
            "package main\n\nimport \"os\"\n\nfunc main() { os.Exit(helper()) }\n",
            "package main\n\nfunc helper() int { return os.Exit }\n",
        ],
        &intrinsics(),
    );
    assert!(
        out.diagnostics.iter().any(|d| d.message == "undefined: os"),
        "{:#?}",
        out.diagnostics
    );
}
