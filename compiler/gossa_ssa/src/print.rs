//! Text form of functions and packages, for `gossa dump` and the
//! `-build=F`/`-build=P` flags.
//!
//! ```text
//! # Name: main.main
//! # Package: command-line-arguments
//! func main.main():
//! b0:                                   preds [] succs [b1]
//!     t0: int = const 1
//!     jump b1
//! ```

use std::fmt::{self, Write};

use crate::ir::{Block, CallCommon, Callee, Const, FuncId, InstrKind, Member, Package, Program, ValueId};

impl Program {
    pub fn display_function(&self, id: FuncId) -> FunctionDisplay<'_> {
        FunctionDisplay { program: self, id }
    }

    pub fn display_package<'p>(&'p self, package: &'p Package) -> PackageDisplay<'p> {
        PackageDisplay {
            program: self,
            package,
        }
    }
}

pub struct FunctionDisplay<'p> {
    program: &'p Program,
    id: FuncId,
}

impl fmt::Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let func = self.program.function(self.id);
        writeln!(f, "# Name: {}", func.name)?;
        writeln!(f, "# Package: {}", func.package)?;
        if !func.free_vars.is_empty() {
            f.write_str("# Free variables:")?;
            for v in &func.free_vars {
                write!(f, " {v} {}", func.value_type(*v))?;
            }
            f.write_char('\n')?;
        }
        if let Some(recover) = func.recover {
            writeln!(f, "# Recover: {recover}")?;
        }

        write!(f, "func {}(", func.name)?;
        for (i, p) in func.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p} {}", func.value_type(*p))?;
        }
        f.write_char(')')?;
        match func.signature.results.as_slice() {
            [] => {}
            [single] => write!(f, " {single}")?,
            _ => write!(f, " {}", func.signature.result_type())?,
        }
        if func.blocks.is_empty() {
            return f.write_str(" (external)\n");
        }
        f.write_str(":\n")?;

        for (i, block) in func.blocks.iter().enumerate() {
            let header = format!("b{i}:");
            let preds = list(block.preds.iter());
            let succs = list(block.succs.iter());
            writeln!(f, "{header:<38}preds [{preds}] succs [{succs}]")?;
            for instr in &block.instrs {
                f.write_str("\t")?;
                if let Some(dst) = instr.dst {
                    write!(f, "{dst}: {} = ", func.value_type(dst))?;
                }
                self.instr(f, block, &instr.kind)?;
                f.write_char('\n')?;
            }
        }
        Ok(())
    }
}

impl FunctionDisplay<'_> {
    fn instr(&self, f: &mut fmt::Formatter<'_>, block: &Block, kind: &InstrKind) -> fmt::Result {
        let program = self.program;
        match kind {
            InstrKind::Const(c) => match c {
                Const::Int(v) => write!(f, "const {v}"),
                Const::Bool(b) => write!(f, "const {b}"),
                Const::Str(s) => write!(f, "const {s:?}"),
                Const::Zero => f.write_str("const zero"),
            },
            InstrKind::Alloc => f.write_str("alloc"),
            InstrKind::Load { cell } => write!(f, "load {cell}"),
            InstrKind::Store { cell, value } => write!(f, "store {cell} <- {value}"),
            InstrKind::Global(g) => write!(f, "global {}", program.global(*g).name),
            InstrKind::BinOp { op, left, right } => {
                write!(f, "{left} {} {right}", op.as_symbol())
            }
            InstrKind::UnOp { op, operand } => write!(f, "{}{operand}", op.as_symbol()),
            InstrKind::Phi { edges } => {
                f.write_str("phi [")?;
                for (i, edge) in edges.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match block.preds.get(i) {
                        Some(pred) => write!(f, "{pred}: {edge}")?,
                        None => write!(f, "{edge}")?,
                    }
                }
                f.write_char(']')
            }
            InstrKind::Call(call) => write_call(f, "call", call),
            InstrKind::Go(call) => write_call(f, "go", call),
            InstrKind::Defer(call) => write_call(f, "defer", call),
            InstrKind::MakeClosure { func: id, bindings } => write!(
                f,
                "make closure {} [{}]",
                program.function(*id).name,
                list(bindings.iter())
            ),
            InstrKind::FuncRef(id) => write!(f, "func {}", program.function(*id).name),
            InstrKind::MakeSlice { len, cap } => write!(f, "make slice {len} {cap}"),
            InstrKind::SliceLit { elems } => write!(f, "slice literal [{}]", list(elems.iter())),
            InstrKind::Index { base, index } => write!(f, "{base}[{index}]"),
            InstrKind::StoreIndex { base, index, value } => {
                write!(f, "{base}[{index}] <- {value}")
            }
            InstrKind::Slice { base, low, high } => {
                let bound = |b: &Option<ValueId>| b.map(|v| v.to_string()).unwrap_or_default();
                write!(f, "slice {base}[{}:{}]", bound(low), bound(high))
            }
            InstrKind::MakeChan { size } => match size {
                Some(size) => write!(f, "make chan {size}"),
                None => f.write_str("make chan"),
            },
            InstrKind::Send { chan, value } => write!(f, "send {chan} <- {value}"),
            InstrKind::Recv { chan, comma_ok } => {
                write!(f, "<-{chan}{}", if *comma_ok { ",ok" } else { "" })
            }
            InstrKind::MakeInterface { value } => write!(f, "make interface {{}} <- {value}"),
            InstrKind::TypeAssert { value, ty, comma_ok } => {
                write!(f, "typeassert{} {value}.({ty})", if *comma_ok { ",ok" } else { "" })
            }
            InstrKind::Convert { value } => write!(f, "convert {value}"),
            InstrKind::Extract { tuple, index } => write!(f, "extract {tuple} #{index}"),
            InstrKind::RangeIter { value } => write!(f, "range {value}"),
            InstrKind::Next { iter } => write!(f, "next {iter}"),
            InstrKind::RunDefers => f.write_str("rundefers"),
            InstrKind::Jump(target) => write!(f, "jump {target}"),
            InstrKind::If { cond, then, els } => write!(f, "if {cond} goto {then} else {els}"),
            InstrKind::Return(values) => {
                if values.is_empty() {
                    f.write_str("return")
                } else {
                    write!(f, "return {}", list(values.iter()))
                }
            }
            InstrKind::Panic { value } => write!(f, "panic {value}"),
        }
    }
}

fn write_call(f: &mut fmt::Formatter<'_>, keyword: &str, call: &CallCommon) -> fmt::Result {
    match call.callee {
        Callee::Value(v) => write!(f, "{keyword} {v}(")?,
        Callee::Builtin(b) => write!(f, "{keyword} {}(", b.name())?,
        Callee::Intrinsic(i) => write!(f, "{keyword} {}(", i.qualified_name())?,
    }
    f.write_str(&list(call.args.iter()))?;
    if call.spread {
        f.write_str("...")?;
    }
    f.write_char(')')
}

fn list<T: fmt::Display>(items: impl Iterator<Item = T>) -> String {
    let mut out = String::new();
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{item}");
    }
    out
}

pub struct PackageDisplay<'p> {
    program: &'p Program,
    package: &'p Package,
}

impl fmt::Display for PackageDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let package = self.package;
        writeln!(f, "package {} ({:?}):", package.name, package.path)?;
        let mut members: Vec<(&str, String, String)> = package
            .members
            .iter()
            .map(|(name, member)| match *member {
                Member::Func(id) => {
                    let sig = &self.program.function(id).signature;
                    (name.as_str(), "func".to_string(), format!("func{sig}"))
                }
                Member::Global(id) => {
                    let ty = &self.program.global(id).ty;
                    (name.as_str(), "var".to_string(), ty.to_string())
                }
            })
            .collect();
        members.push(("init", "func".to_string(), "func()".to_string()));
        members.sort();
        let width = members.iter().map(|m| m.0.len()).max().unwrap_or(0);
        for (name, kind, ty) in members {
            writeln!(f, "  {kind:<5} {name:<width$}  {ty}")?;
        }
        Ok(())
    }
}
