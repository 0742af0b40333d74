use std::fs;

use gossa_loader::{BuildContext, Config};
use gossa_ssa::{BuilderMode, Program};
use pretty_assertions::assert_eq;

use crate::{interpret, CapturedOutput, Mode};

/// Build `source` as `cmd/main.go` and run it; returns the exit code and
/// everything it printed.
fn run_with(source: &str, mode: Mode, args: &[&str]) -> (i32, String) {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let path = dir.path().join("cmd/main.go");
    fs::create_dir_all(dir.path().join("cmd")).unwrap_or_else(|e| panic!("mkdir: {e}"));
    fs::write(&path, source).unwrap_or_else(|e| panic!("write: {e}"));

    let build = BuildContext::new(dir.path());
    let sizes = build.sizes();
    let mut config = Config::from_args(build, &["cmd/main.go".to_string()], true)
        .unwrap_or_else(|e| panic!("{e}"));
    config.import("runtime");
    let loaded = config.load().unwrap_or_else(|e| panic!("{e}"));
    let program = Program::build(&loaded, BuilderMode::SANITY_CHECK_FUNCTIONS)
        .unwrap_or_else(|e| panic!("{e}"));
    let package = program
        .created_package(&loaded, 0)
        .unwrap_or_else(|| panic!("no main package"));

    let out = CapturedOutput::new();
    let args: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
    let code = interpret(&program, package, mode, sizes, "main.go", &args, Some(&out));
    (code, out.text())
}

fn run(source: &str) -> (i32, String) {
    run_with(source, Mode::empty(), &[])
}

#[test]
fn prints_and_exits_cleanly() {
    let (code, out) = run(
        "package main

func main() {
	println(\"hello\", 42, true)
	print(\"a\", \"b\")
	print(\"\\n\")
}
",
    );
    assert_eq!(code, 0);
    assert_eq!(out, "hello 42 true\nab\n");
}

#[test]
fn missing_main_is_exit_code_one() {
    let (code, out) = run("package main\n\nfunc helper() {}\n");
    assert_eq!(code, 1);
    assert_eq!(out, "");
}

#[test]
fn os_exit_sets_the_code_and_skips_defers() {
    let (code, out) = run(
        "package main

import \"os\"

func main() {
	defer println(\"deferred\")
	println(\"before\")
	os.Exit(3)
	println(\"after\")
}
",
    );
    assert_eq!(code, 3);
    assert_eq!(out, "before\n");
}

#[test]
fn unrecovered_panic_is_exit_code_two() {
    let (code, out) = run(
        "package main

func main() {
	defer println(\"still runs\")
	var s []int
	println(s[1])
}
",
    );
    assert_eq!(code, 2);
    assert_eq!(out, "still runs\n");
}

#[test]
fn recover_sets_named_results() {
    let (code, out) = run(
        "package main

func safeDiv(a, b int) (q int, failed bool) {
	defer func() {
		if r := recover(); r != nil {
			println(\"recovered:\", r)
			failed = true
		}
	}()
	q = a / b
	return q, false
}

func main() {
	println(safeDiv(7, 2))
	println(safeDiv(1, 0))
}
",
    );
    assert_eq!(code, 0);
    assert_eq!(
        out,
        "3 false\nrecovered: runtime error: integer divide by zero\n0 true\n"
    );
}

#[test]
fn recover_outside_a_panic_is_nil() {
    let (code, out) = run(
        "package main

func main() {
	println(recover() == nil)
	defer func() {
		println(recover())
	}()
}
",
    );
    assert_eq!(code, 0);
    assert_eq!(out, "true\n<nil>\n");
}

#[test]
fn recover_in_a_helper_of_a_deferred_call_is_nil() {
    let (code, out) = run(
        "package main

func helper() {
	println(recover() == nil)
}

func main() {
	defer func() {
		helper()
	}()
	panic(\"boom\")
}
",
    );
    assert_eq!(code, 2);
    assert_eq!(out, "true\n");
}

#[test]
fn disabled_recover_lets_panics_through() {
    let source = "package main

func main() {
	defer func() {
		recover()
	}()
	panic(\"boom\")
}
";
    assert_eq!(run(source).0, 0);
    assert_eq!(run_with(source, Mode::DISABLE_RECOVER, &[]).0, 2);
}

#[test]
fn defers_run_last_in_first_out_with_evaluated_arguments() {
    let (code, out) = run(
        "package main

func main() {
	for i := 0; i < 3; i++ {
		defer println(\"defer\", i)
	}
	println(\"body\")
}
",
    );
    assert_eq!(code, 0);
    assert_eq!(out, "body\ndefer 2\ndefer 1\ndefer 0\n");
}

#[test]
fn closures_share_captured_variables() {
    let (code, out) = run(
        "package main

func counter() (func() int, func()) {
	n := 0
	return func() int { n++; return n }, func() { n = 100 }
}

func main() {
	next, reset := counter()
	println(next(), next())
	reset()
	println(next())
	var fs []func() int
	for i := 0; i < 3; i++ {
		fs = append(fs, func() int { return i * 10 })
	}
	for _, f := range fs {
		print(f(), \" \")
	}
	println()
}
",
    );
    assert_eq!(code, 0);
    assert_eq!(out, "1 2\n101\n0 10 20 \n");
}

#[test]
fn goroutines_and_unbuffered_channels() {
    let (code, out) = run(
        "package main

func produce(n int, out chan int) {
	for i := 1; i <= n; i++ {
		out <- i
	}
	close(out)
}

func main() {
	ch := make(chan int)
	done := make(chan bool)
	go produce(5, ch)
	sum := 0
	go func() {
		for v := range ch {
			sum += v
		}
		done <- true
	}()
	<-done
	println(sum)
}
",
    );
    assert_eq!(code, 0);
    assert_eq!(out, "15\n");
}

#[test]
fn main_returning_stops_other_goroutines() {
    let (code, out) = run(
        "package main

func main() {
	block := make(chan int)
	go func() {
		<-block
		println(\"never\")
	}()
	println(\"done\")
}
",
    );
    assert_eq!(code, 0);
    assert_eq!(out, "done\n");
}

#[test]
fn deadlock_is_exit_code_two() {
    let (code, _) = run(
        "package main

func main() {
	ch := make(chan int)
	ch <- 1
}
",
    );
    assert_eq!(code, 2);

    let (code, out) = run(
        "package main

func main() {
	a := make(chan int)
	b := make(chan int)
	go func() {
		<-a
		b <- 1
	}()
	println(\"waiting\")
	<-b
}
",
    );
    assert_eq!(code, 2);
    assert_eq!(out, "waiting\n");
}

#[test]
fn panic_in_a_goroutine_ends_the_program() {
    let (code, _) = run(
        "package main

func main() {
	done := make(chan bool)
	go func() {
		panic(\"from goroutine\")
	}()
	<-done
}
",
    );
    assert_eq!(code, 2);
}

#[test]
fn ranges_over_strings_slices_and_ints() {
    let (code, out) = run(
        "package main

func main() {
	for i, r := range \"aé!\" {
		print(i, \":\", r, \" \")
	}
	println()
	total := 0
	for _, v := range []int{4, 5, 6} {
		total += v
	}
	for i := range 4 {
		total += i
	}
	println(total)
}
",
    );
    assert_eq!(code, 0);
    assert_eq!(out, "0:97 1:233 3:33 \n21\n");
}

#[test]
fn slices_alias_until_append_reallocates() {
    let (code, out) = run(
        "package main

func main() {
	a := make([]int, 3, 4)
	b := a[1:3]
	b[0] = 9
	println(a[1], len(b), cap(b))
	c := append(a, 7)
	c[0] = 1
	println(a[0], c[0])
	d := append(c, 8)
	d[0] = 2
	println(c[0], d[0], len(d))
	e := append([]int(nil), d...)
	println(len(e), e[4])
	n := copy(e, []int{5, 5})
	println(n, e)
	println(append([]byte(\"ab\"), \"cd\"...))
}
",
    );
    assert_eq!(code, 0);
    assert_eq!(
        out,
        "9 2 3\n1 1\n1 2 5\n5 8\n2 [5 5 0 7 8]\n[97 98 99 100]\n"
    );
}

#[test]
fn slice_bounds_are_checked_at_run_time() {
    let (code, out) = run(
        "package main

func main() {
	defer func() {
		println(recover())
	}()
	s := []int{1, 2, 3}
	i := 5
	println(len(s[:i]))
}
",
    );
    assert_eq!(code, 0);
    assert_eq!(out, "runtime error: slice bounds out of range [:5] with capacity 3\n");
}

#[test]
fn integers_wrap_at_their_width() {
    let (code, out) = run(
        "package main

func main() {
	var b byte = 250
	b += 10
	var i8 int8 = 127
	i8++
	var u uint32 = 0
	u--
	x := 1
	x <<= 63
	println(b, i8, u, x)
	println(string(rune(19990)), string([]rune{104, 105}))
}
",
    );
    assert_eq!(code, 0);
    assert_eq!(out, "4 -128 4294967295 -9223372036854775808\n世 hi\n");
}

#[test]
fn type_assertions_check_the_dynamic_type() {
    let (code, out) = run(
        "package main

func main() {
	var x any = 7
	n, ok := x.(int)
	s, ok2 := x.(string)
	println(n, ok, s == \"\", ok2)
	defer func() {
		println(recover())
	}()
	println(x.(string))
}
",
    );
    assert_eq!(code, 0);
    assert_eq!(
        out,
        "7 true true false\ninterface conversion: interface {} is int, not string\n"
    );
}

#[test]
fn os_args_holds_the_filename_and_arguments() {
    let (code, out) = run_with(
        "package main

import \"os\"

func main() {
	println(len(os.Args), os.Args[0], os.Args[2])
}
",
        Mode::empty(),
        &["first", "second"],
    );
    assert_eq!(code, 0);
    assert_eq!(out, "3 main.go second\n");
}

#[test]
fn package_initialization_runs_before_main() {
    let (code, out) = run(
        "package main

var total = sum(3)

func sum(n int) int {
	s := 0
	for i := 1; i <= n; i++ {
		s += i
	}
	return s
}

func init() {
	total *= 10
}

func main() {
	println(total)
}
",
    );
    assert_eq!(code, 0);
    assert_eq!(out, "60\n");
}

#[test]
fn runtime_and_unsafe_intrinsics() {
    let (code, out) = run(
        "package main

import (
	\"runtime\"
	\"unsafe\"
)

func main() {
	runtime.GC()
	runtime.Gosched()
	println(runtime.NumGoroutine(), runtime.GOARCH)
	var x int32
	var s string
	println(unsafe.Sizeof(x), unsafe.Sizeof(s), unsafe.Alignof(s))
}
",
    );
    assert_eq!(code, 0);
    assert_eq!(out, "1 amd64\n4 16 8\n");
}
