use std::fs;

use gossa_loader::{BuildContext, Config, CREATED_PACKAGE_PATH};
use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;

use crate::ir::{Callee, Function, InstrKind, Program, ValueId};
use crate::BuilderMode;

/// Load `source` as `cmd/main.go` (plus any library files) and build it
/// with sanity checking on.
fn build_with(source: &str, libs: &[(&str, &str)]) -> (gossa_loader::LoadedProgram, Program) {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let mut files = vec![("cmd/main.go", source)];
    files.extend_from_slice(libs);
    for (rel, text) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|e| panic!("mkdir: {e}"));
        }
        fs::write(&path, text).unwrap_or_else(|e| panic!("write: {e}"));
    }
    let args = vec!["cmd/main.go".to_string()];
    let mut config = Config::from_args(BuildContext::new(dir.path()), &args, true)
        .unwrap_or_else(|e| panic!("{e}"));
    config.import("runtime");
    let loaded = config.load().unwrap_or_else(|e| panic!("{e}"));
    let program = Program::build(&loaded, BuilderMode::SANITY_CHECK_FUNCTIONS)
        .unwrap_or_else(|e| panic!("{e}"));
    (loaded, program)
}

fn build(source: &str) -> Program {
    build_with(source, &[]).1
}

fn function<'p>(program: &'p Program, name: &str) -> &'p Function {
    program
        .functions
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("no function {name}"))
}

fn instrs(f: &Function) -> impl Iterator<Item = &InstrKind> {
    f.blocks.iter().flat_map(|b| &b.instrs).map(|i| &i.kind)
}

fn count(f: &Function, pred: impl Fn(&InstrKind) -> bool) -> usize {
    instrs(f).filter(|k| pred(k)).count()
}

#[test]
fn names_functions_literals_and_inits() {
    let program = build(
        "package main

func init() {}
func init() {}

func helper() func() int {
	return func() int { return 1 }
}

func main() {
	f := func() {}
	f()
	_ = helper()()
}
",
    );
    let mut names: Vec<&str> = program
        .functions
        .iter()
        .filter(|f| f.package == CREATED_PACKAGE_PATH)
        .map(|f| f.name.as_str())
        .collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "main.helper",
            "main.helper$1",
            "main.init",
            "main.init#1",
            "main.init#2",
            "main.main",
            "main.main$1",
        ]
    );

    let package = program
        .package(CREATED_PACKAGE_PATH)
        .unwrap_or_else(|| panic!("no main package"));
    assert!(package.func("main").is_some());
    assert!(package.func("init").is_none());

    // The synthetic initializer calls each init in order.
    let init = program.function(package.init);
    let called: Vec<&str> = instrs(init)
        .filter_map(|k| match k {
            InstrKind::FuncRef(id) => Some(program.function(*id).name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(called, vec!["main.init#1", "main.init#2"]);
}

#[test]
fn created_package_lookup() {
    let (loaded, program) = build_with("package main\n\nfunc main() {}\n", &[]);
    let package = program
        .created_package(&loaded, 0)
        .unwrap_or_else(|| panic!("no created package"));
    assert_eq!(package.name, "main");
    assert!(program.created_package(&loaded, 1).is_none());
    // runtime is imported by the loader and built as an intrinsic package.
    assert!(program.package("runtime").is_some_and(|p| p.intrinsic));
}

#[test]
fn closures_capture_cells() {
    let program = build(
        "package main

func main() {
	x := 1
	inc := func() { x++ }
	inc()
	println(x)
}
",
    );
    let literal = function(&program, "main.main$1");
    assert_eq!(literal.free_vars.len(), 1);
    // The literal loads and stores through its free variable.
    let free = literal.free_vars[0];
    assert!(instrs(literal).any(|k| matches!(k, InstrKind::Store { cell, .. } if *cell == free)));

    let main = function(&program, "main.main");
    let bindings: Vec<usize> = instrs(main)
        .filter_map(|k| match k {
            InstrKind::MakeClosure { bindings, .. } => Some(bindings.len()),
            _ => None,
        })
        .collect();
    assert_eq!(bindings, vec![1]);
}

#[test]
fn literal_without_captures_is_a_function_reference() {
    let program = build(
        "package main

func main() {
	f := func(a int) int { return a * 2 }
	println(f(2))
}
",
    );
    let main = function(&program, "main.main");
    assert_eq!(count(main, |k| matches!(k, InstrKind::MakeClosure { .. })), 0);
    assert!(function(&program, "main.main$1").free_vars.is_empty());
}

#[test]
fn nested_literals_capture_through_the_middle() {
    let program = build(
        "package main

func main() {
	n := 0
	outer := func() func() {
		return func() { n = n + 1 }
	}
	outer()()
	println(n)
}
",
    );
    assert_eq!(function(&program, "main.main$1$1").free_vars.len(), 1);
    assert_eq!(function(&program, "main.main$1").free_vars.len(), 1);
}

#[test]
fn short_circuit_merges_with_phi() {
    let program = build(
        "package main

func f(a, b bool) bool {
	return a && b
}

func main() { println(f(true, false)) }
",
    );
    let f = function(&program, "main.f");
    let phi_block = f
        .blocks
        .iter()
        .find(|b| b.instrs.iter().any(|i| matches!(i.kind, InstrKind::Phi { .. })))
        .unwrap_or_else(|| panic!("no phi"));
    assert_eq!(phi_block.preds.len(), 2);
}

#[test]
fn three_clause_loop_gets_per_iteration_cells() {
    let program = build(
        "package main

func main() {
	var fs []func() int
	for i := 0; i < 3; i++ {
		fs = append(fs, func() int { return i })
	}
	for _, f := range fs {
		println(f())
	}
}
",
    );
    let main = function(&program, "main.main");
    let header = main
        .blocks
        .iter()
        .find(|b| b.instrs.iter().any(|i| matches!(i.kind, InstrKind::Phi { .. })))
        .unwrap_or_else(|| panic!("no loop header phi"));
    // Entered from the preheader and from the post statement.
    assert_eq!(header.preds.len(), 2);
    // One cell for the init, one fresh cell per iteration; the range
    // loop adds its hidden counter and a cell per iteration variable.
    assert!(count(main, |k| matches!(k, InstrKind::Alloc)) >= 4);
    assert_eq!(function(&program, "main.main$1").free_vars.len(), 1);
}

#[test]
fn defer_gets_a_recover_block() {
    let program = build(
        "package main

func f() (n int) {
	defer func() {
		if recover() != nil {
			n = 7
		}
	}()
	panic(\"boom\")
}

func g() int {
	return 1
}

func main() { println(f(), g()) }
",
    );
    let f = function(&program, "main.f");
    assert!(f.has_defer);
    let recover = f.recover.unwrap_or_else(|| panic!("no recover block"));
    let block = f.block(recover);
    assert!(block.preds.is_empty());
    assert!(matches!(
        block.terminator().map(|t| &t.kind),
        Some(InstrKind::Return(values)) if values.len() == 1
    ));
    assert_eq!(count(f, |k| matches!(k, InstrKind::Defer(_))), 1);
    assert_eq!(count(f, |k| matches!(k, InstrKind::Panic { .. })), 1);

    let g = function(&program, "main.g");
    assert!(!g.has_defer);
    assert!(g.recover.is_none());
}

#[test]
fn return_runs_defers_first() {
    let program = build(
        "package main

func f() int {
	defer println(\"deferred\")
	return 3
}

func main() { println(f()) }
",
    );
    let f = function(&program, "main.f");
    let block = f
        .blocks
        .iter()
        .find(|b| b.instrs.iter().any(|i| matches!(i.kind, InstrKind::RunDefers)))
        .unwrap_or_else(|| panic!("no rundefers"));
    let kinds: Vec<&InstrKind> = block.instrs.iter().map(|i| &i.kind).collect();
    let n = kinds.len();
    assert!(matches!(kinds[n - 2], InstrKind::RunDefers));
    assert!(matches!(kinds[n - 1], InstrKind::Return(_)));
    assert_eq!(
        count(f, |k| matches!(k, InstrKind::Defer(c) if c.callee == Callee::Builtin(gossa_types::Builtin::Println))),
        1
    );
}

#[test]
fn unreachable_code_is_dropped() {
    let program = build(
        "package main

func f() {
	println(\"once\")
	return
	println(\"never\")
}

func main() { f() }
",
    );
    let f = function(&program, "main.f");
    assert_eq!(f.blocks.len(), 1);
    assert_eq!(count(f, |k| matches!(k, InstrKind::Call(_))), 1);
}

#[test]
fn globals_initialize_in_dependency_order() {
    let program = build(
        "package main

var a = b + 1
var b = f()
var c = 2

func f() int { return c }

func main() { println(a, b, c) }
",
    );
    let package = program
        .package(CREATED_PACKAGE_PATH)
        .unwrap_or_else(|| panic!("no main package"));
    let init = program.function(package.init);
    let mut cells: FxHashMap<ValueId, &str> = FxHashMap::default();
    let mut stored = Vec::new();
    for block in &init.blocks {
        for instr in &block.instrs {
            match (&instr.kind, instr.dst) {
                (InstrKind::Global(g), Some(dst)) => {
                    cells.insert(dst, program.global(*g).name.as_str());
                }
                (InstrKind::Store { cell, .. }, _) => {
                    if let Some(name) = cells.get(cell) {
                        stored.push(*name);
                    }
                }
                _ => {}
            }
        }
    }
    assert_eq!(stored, vec!["main.c", "main.b", "main.a"]);
}

#[test]
fn intrinsic_package_variables_become_globals() {
    let program = build(
        "package main

import \"os\"

func main() { println(len(os.Args)) }
",
    );
    assert!(program.globals.iter().any(|g| g.name == "os.Args"));
    let os = program.package("os").unwrap_or_else(|| panic!("no os package"));
    assert!(os.intrinsic);
    assert!(os.global("Args").is_some());
    // Intrinsic packages still get an (empty) initializer.
    assert_eq!(program.function(os.init).blocks.len(), 1);
}

#[test]
fn switch_range_and_channels_are_well_formed() {
    // Building with sanity checking already validates every function.
    let program = build(
        "package main

func classify(x interface{}) string {
	switch x {
	case 1:
		return \"one\"
	case \"a\", nil:
		return \"a or nil\"
	default:
		return \"other\"
	}
}

func main() {
	ch := make(chan int, 3)
	go func() {
		for i := range 3 {
			ch <- i
		}
		close(ch)
	}()
	total := 0
	for v := range ch {
		total += v
	}
	for i, r := range \"héllo\" {
		total += i + int(r)
	}
	s := []int{1, 2, 3}
	for i := range s {
		s[i] *= 2
	}
	switch {
	case total > 10:
		println(\"big\")
	}
	v, ok := <-ch
	println(classify(total), v, ok, s[1:])
}
",
    );
    let main = function(&program, "main.main");
    assert_eq!(count(main, |k| matches!(k, InstrKind::Go(_))), 1);
    assert_eq!(count(main, |k| matches!(k, InstrKind::RangeIter { .. })), 1);
    assert!(count(main, |k| matches!(k, InstrKind::StoreIndex { .. })) >= 1);
    let classify = function(&program, "main.classify");
    assert!(count(classify, |k| matches!(k, InstrKind::MakeInterface { .. })) >= 2);
}

#[test]
fn multi_value_calls_are_extracted() {
    let program = build(
        "package main

func pair() (int, string) { return 1, \"x\" }

func take(n int, s string) {}

func main() {
	a, b := pair()
	take(pair())
	println(a, b)
	println(pair())
}
",
    );
    let main = function(&program, "main.main");
    assert_eq!(count(main, |k| matches!(k, InstrKind::Extract { .. })), 6);
}

#[test]
fn printer_renders_signature_and_blocks() {
    let program = build(
        "package main

func add(a, b int) int { return a + b }

func main() { println(add(1, 2)) }
",
    );
    let package = program
        .package(CREATED_PACKAGE_PATH)
        .unwrap_or_else(|| panic!("no main package"));
    let id = package.func("add").unwrap_or_else(|| panic!("no add"));
    let text = program.display_function(id).to_string();
    assert!(text.starts_with("# Name: main.add\n# Package: command-line-arguments\n"), "{text}");
    assert!(text.contains("func main.add(t0 int, t1 int) int:\n"), "{text}");
    assert!(text.contains(" = t"), "{text}");
    assert!(text.contains("\treturn t"), "{text}");

    let members = program.display_package(package).to_string();
    assert_eq!(
        members,
        "package main (\"command-line-arguments\"):\n  func  add   func(int, int) int\n  func  init  func()\n  func  main  func()\n"
    );
}

#[test]
fn references_across_packages_resolve_to_members() {
    let (_, program) = build_with(
        "package main

import \"util\"

func main() { println(util.Double(util.Count)) }
",
        &[(
            "src/util/util.go",
            "package util\n\nvar Count = 3\n\nfunc Double(n int) int { return n * 2 }\n",
        )],
    );
    let order: Vec<&str> = program.packages.iter().map(|p| p.path.as_str()).collect();
    let util_at = order.iter().position(|p| *p == "util");
    let main_at = order.iter().position(|p| *p == CREATED_PACKAGE_PATH);
    assert!(util_at < main_at, "{order:?}");

    let util = program.package("util").unwrap_or_else(|| panic!("no util"));
    let double = util.func("Double").unwrap_or_else(|| panic!("no Double"));
    let count_var = util.global("Count").unwrap_or_else(|| panic!("no Count"));
    assert_eq!(program.global(count_var).name, "util.Count");

    let main = function(&program, "main.main");
    assert_eq!(count(main, |k| *k == InstrKind::FuncRef(double)), 1);
    assert_eq!(count(main, |k| *k == InstrKind::Global(count_var)), 1);
}
