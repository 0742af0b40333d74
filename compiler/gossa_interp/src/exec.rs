//! Execution of IR functions on one goroutine.
//!
//! Each Go call is one Rust call of [`Goroutine::call_function`] with a
//! fresh [`Frame`] of registers indexed by [`ValueId`]. Blocks run until
//! their terminator; a phi reads the edge of the block control came from.
//!
//! # Panics and deferred calls
//!
//! A panic is an `Err(Unwind::Panic)` climbing the Rust stack. A frame with
//! deferred calls catches it, runs the deferred calls newest first and, if
//! one of them recovered, resumes at the function's recover block, which
//! returns the named results (or zero values). `Unwind::Exit` passes every
//! frame untouched.

use std::sync::Arc;
use std::thread::{self, Scope};

use gossa_ssa::{
    BlockId, CallCommon, Callee, Const, Function, InstrKind, Package, ValueId,
};
use gossa_stack::ensure_sufficient_stack;
use gossa_types::{Builtin, Intrinsic, Type};
use parking_lot::Mutex;
use smallvec::{smallvec, SmallVec};

use crate::errors::{
    channel_panic, interface_conversion, nil_dereference, panic_with, runtime_error, ExecResult,
    Unwind,
};
use crate::machine::Machine;
use crate::ops;
use crate::value::{index_out_of_range, new_cell, Closure, SliceValue, StringIter, Value};
use crate::Mode;

/// `panic(nil)` panics with this message instead.
const NIL_PANIC_MESSAGE: &str = "panic called with nil argument (goexit?)";

/// Largest length `make` accepts.
const MAX_ALLOC: i128 = 1 << 32;

type Args = SmallVec<[Value; 4]>;

/// What a call invokes.
#[derive(Clone, Debug)]
enum Target {
    Func(Closure),
    Builtin(Builtin),
    Intrinsic(Intrinsic),
}

/// A call with its callee and arguments evaluated, ready to run now
/// (`Call`), later (`Defer`) or elsewhere (`Go`).
#[derive(Clone, Debug)]
pub(crate) struct PreparedCall {
    target: Target,
    args: Args,
    spread: bool,
    /// Static result type, for builtins that build values.
    result: Type,
}

struct Frame<'p> {
    func: &'p Function,
    regs: Vec<Value>,
    /// Pending deferred calls, oldest first.
    defers: Vec<PreparedCall>,
    /// Invoked as a deferred call while a panic unwinds; only such frames
    /// may recover it.
    recovering: bool,
}

impl Frame<'_> {
    #[inline]
    fn get(&self, v: ValueId) -> &Value {
        &self.regs[v.index()]
    }

    fn args(&self, values: &[ValueId]) -> Args {
        values.iter().map(|v| self.get(*v).clone()).collect()
    }

    fn ty(&self, v: ValueId) -> &Type {
        self.func.value_type(v)
    }
}

/// One goroutine: a thread running calls against the shared machine.
pub(crate) struct Goroutine<'scope, 'env, 'p>
where
    'env: 'scope,
    'p: 'scope,
{
    machine: &'scope Machine<'p>,
    scope: &'scope Scope<'scope, 'env>,
    id: u64,
    /// The panic being unwound, if any, for `recover` to take.
    panic: Option<Value>,
    tracing: bool,
}

impl<'scope, 'env, 'p> Goroutine<'scope, 'env, 'p>
where
    'env: 'scope,
    'p: 'scope,
{
    pub fn new(machine: &'scope Machine<'p>, scope: &'scope Scope<'scope, 'env>, id: u64) -> Self {
        Goroutine {
            machine,
            scope,
            id,
            panic: None,
            tracing: machine.mode.contains(Mode::ENABLE_TRACING),
        }
    }

    /// The main goroutine: set `os.Args`, run every package initializer,
    /// then `main.main`. Records the exit code.
    pub fn run_main(&mut self, package: &Package, filename: &str, args: &[String]) {
        let program = self.machine.program;
        if let Some(global) = program.package("os").and_then(|os| os.global("Args")) {
            let values = std::iter::once(filename)
                .chain(args.iter().map(String::as_str))
                .map(Value::str)
                .collect();
            *self.machine.globals[global.index()].lock() = Value::Slice(SliceValue::from_vec(values));
        }

        let result = self.run_inits().and_then(|()| match package.func("main") {
            Some(main) => {
                let main = Closure {
                    func: main,
                    bindings: Arc::from(Vec::new()),
                };
                self.call_function(&main, SmallVec::new(), false).map(|_| 0)
            }
            None => {
                eprintln!("No main function.");
                Ok(1)
            }
        });
        match result {
            Ok(code) => self.machine.finish(code),
            Err(Unwind::Exit) => {}
            Err(Unwind::Panic(value)) => self.machine.fatal_panic(&value),
        }
    }

    /// Package initializers, dependencies first.
    fn run_inits(&mut self) -> ExecResult<()> {
        for package in &self.machine.program.packages {
            let init = Closure {
                func: package.init,
                bindings: Arc::from(Vec::new()),
            };
            self.call_function(&init, SmallVec::new(), false)?;
        }
        Ok(())
    }

    /// Body of a goroutine started by `go`.
    fn run_spawned(&mut self, call: PreparedCall) {
        if self.tracing {
            tracing::debug!(goroutine = self.id, "goroutine start");
        }
        match self.invoke(call, false) {
            Ok(_) | Err(Unwind::Exit) => {}
            Err(Unwind::Panic(value)) => self.machine.fatal_panic(&value),
        }
        self.machine.goroutine_exited();
    }

    fn spawn(&mut self, call: PreparedCall) -> ExecResult<()> {
        let id = self.machine.goroutine_started();
        let machine = self.machine;
        let scope = self.scope;
        let spawned = thread::Builder::new()
            .name(format!("goroutine-{id}"))
            .spawn_scoped(scope, move || {
                Goroutine::new(machine, scope, id).run_spawned(call);
            });
        match spawned {
            Ok(_) => Ok(()),
            Err(e) => {
                self.machine.goroutine_exited();
                Err(runtime_error(format!("cannot start goroutine: {e}")))
            }
        }
    }

    // Calls

    fn call_function(&mut self, closure: &Closure, args: Args, recovering: bool) -> ExecResult<Value> {
        self.machine.check_running()?;
        let func = self.machine.program.function(closure.func);
        if func.blocks.is_empty() {
            return Err(runtime_error(format!("call of {} without a body", func.name)));
        }
        if self.tracing {
            tracing::debug!(goroutine = self.id, function = %func.name, args = args.len(), "call");
        }
        let mut frame = Frame {
            func,
            regs: vec![Value::default(); func.num_values()],
            defers: Vec::new(),
            recovering,
        };
        for (param, arg) in func.params.iter().zip(args) {
            frame.regs[param.index()] = arg;
        }
        for (free, cell) in func.free_vars.iter().zip(closure.bindings.iter()) {
            frame.regs[free.index()] = cell.clone();
        }
        let result = ensure_sufficient_stack(|| self.run_frame(&mut frame));
        if self.tracing {
            tracing::debug!(goroutine = self.id, function = %func.name, ok = result.is_ok(), "return");
        }
        result
    }

    fn run_frame(&mut self, frame: &mut Frame<'p>) -> ExecResult<Value> {
        match self.run_blocks(frame, BlockId::new(0)) {
            Err(Unwind::Panic(value)) if frame.func.has_defer => {
                self.unwind_defers(frame, value)?;
                match frame.func.recover {
                    Some(block) => self.run_blocks(frame, block),
                    None => Ok(Value::zero(&frame.func.signature.result_type())),
                }
            }
            other => other,
        }
    }

    /// Run the deferred calls of a panicking frame. `Ok` means a deferred
    /// call recovered the panic.
    fn unwind_defers(&mut self, frame: &mut Frame<'p>, value: Value) -> ExecResult<()> {
        let outer = self.panic.replace(value);
        while let Some(call) = frame.defers.pop() {
            // `defer recover()` is not called by a deferred function.
            let recovering = self.panic.is_some() && matches!(call.target, Target::Func(_));
            match self.invoke(call, recovering) {
                Ok(_) => {}
                // A panic in a deferred call replaces the one in flight.
                Err(Unwind::Panic(next)) => self.panic = Some(next),
                Err(Unwind::Exit) => {
                    self.panic = outer;
                    return Err(Unwind::Exit);
                }
            }
        }
        match std::mem::replace(&mut self.panic, outer) {
            Some(value) => Err(Unwind::Panic(value)),
            None => Ok(()),
        }
    }

    /// Deferred calls of a normal return.
    fn run_defers(&mut self, frame: &mut Frame<'p>) -> ExecResult<()> {
        while let Some(call) = frame.defers.pop() {
            self.invoke(call, false)?;
        }
        Ok(())
    }

    fn invoke(&mut self, call: PreparedCall, recovering: bool) -> ExecResult<Value> {
        match call.target {
            Target::Func(closure) => self.call_function(&closure, call.args, recovering),
            Target::Builtin(b) => self.call_builtin(b, &call.args, call.spread, &call.result, recovering),
            Target::Intrinsic(i) => self.call_intrinsic(i, &call.args),
        }
    }

    fn prepare(&self, frame: &Frame<'p>, call: &CallCommon, result: Type) -> ExecResult<PreparedCall> {
        let target = match call.callee {
            Callee::Value(v) => match frame.get(v) {
                Value::Func(Some(closure)) => Target::Func(closure.clone()),
                _ => return Err(nil_dereference()),
            },
            Callee::Builtin(b) => Target::Builtin(b),
            // The operand is measured, never evaluated further.
            Callee::Intrinsic(i @ (Intrinsic::Sizeof | Intrinsic::Alignof)) => {
                let sizes = &self.machine.sizes;
                let ty = call.args.first().map_or(&Type::Invalid, |a| frame.ty(*a));
                let n = if i == Intrinsic::Sizeof {
                    sizes.sizeof(ty)
                } else {
                    sizes.alignof(ty)
                };
                return Ok(PreparedCall {
                    target: Target::Intrinsic(i),
                    args: smallvec![Value::Int(i128::from(n))],
                    spread: false,
                    result,
                });
            }
            Callee::Intrinsic(i) => Target::Intrinsic(i),
        };
        Ok(PreparedCall {
            target,
            args: frame.args(&call.args),
            spread: call.spread,
            result,
        })
    }

    // Blocks and instructions

    fn run_blocks(&mut self, frame: &mut Frame<'p>, start: BlockId) -> ExecResult<Value> {
        let func = frame.func;
        let mut block = start;
        let mut pred: Option<BlockId> = None;
        'blocks: loop {
            self.machine.check_running()?;
            let b = func.block(block);
            let phis = b
                .instrs
                .iter()
                .take_while(|i| matches!(i.kind, InstrKind::Phi { .. }))
                .count();
            if phis > 0 {
                // All phis read the old registers before any is written.
                let edge = pred
                    .and_then(|p| b.preds.iter().position(|q| *q == p))
                    .unwrap_or(0);
                let values: SmallVec<[Value; 4]> = b.instrs[..phis]
                    .iter()
                    .map(|instr| match &instr.kind {
                        InstrKind::Phi { edges } => edges
                            .get(edge)
                            .map(|v| frame.get(*v).clone())
                            .unwrap_or_default(),
                        _ => Value::default(),
                    })
                    .collect();
                for (instr, value) in b.instrs[..phis].iter().zip(values) {
                    if let Some(dst) = instr.dst {
                        frame.regs[dst.index()] = value;
                    }
                }
            }

            for instr in &b.instrs[phis..] {
                if self.tracing {
                    tracing::trace!(
                        goroutine = self.id,
                        function = %func.name,
                        %block,
                        dst = ?instr.dst,
                        instr = ?instr.kind,
                        "step"
                    );
                }
                match &instr.kind {
                    InstrKind::Jump(target) => {
                        pred = Some(block);
                        block = *target;
                        continue 'blocks;
                    }
                    InstrKind::If { cond, then, els } => {
                        pred = Some(block);
                        block = if frame.get(*cond).as_bool() { *then } else { *els };
                        continue 'blocks;
                    }
                    InstrKind::Return(values) => {
                        return Ok(match values.as_slice() {
                            [] => Value::unit(),
                            [single] => frame.get(*single).clone(),
                            many => Value::Tuple(many.iter().map(|v| frame.get(*v).clone()).collect()),
                        });
                    }
                    InstrKind::Panic { value } => return Err(self.panic_value(frame.get(*value))),
                    kind => {
                        let value = self.step(frame, kind, instr.dst)?;
                        if let Some(dst) = instr.dst {
                            frame.regs[dst.index()] = value;
                        }
                    }
                }
            }
            // Sanity-checked functions always end blocks in a terminator.
            return Err(runtime_error(format!("{block} of {} fell off its end", func.name)));
        }
    }

    fn panic_value(&self, value: &Value) -> Unwind {
        if value.is_nil() {
            return panic_with(Type::String, Value::str(NIL_PANIC_MESSAGE));
        }
        Unwind::Panic(value.clone())
    }

    fn step(&mut self, frame: &mut Frame<'p>, kind: &InstrKind, dst: Option<ValueId>) -> ExecResult<Value> {
        let machine = self.machine;
        let func = frame.func;
        let dst_ty = dst.map_or(&Type::Invalid, |d| func.value_type(d));
        Ok(match kind {
            InstrKind::Const(c) => match c {
                Const::Int(v) => Value::Int(*v),
                Const::Bool(b) => Value::Bool(*b),
                Const::Str(s) => Value::str(s),
                Const::Zero => Value::zero(dst_ty),
            },
            InstrKind::Alloc => Value::Cell(new_cell(Value::zero(dst_ty))),
            InstrKind::Load { cell } => match frame.get(*cell) {
                Value::Cell(cell) => cell.lock().clone(),
                _ => return Err(nil_dereference()),
            },
            InstrKind::Store { cell, value } => {
                let value = frame.get(*value).clone();
                match frame.get(*cell) {
                    Value::Cell(cell) => *cell.lock() = value,
                    _ => return Err(nil_dereference()),
                }
                Value::unit()
            }
            InstrKind::Global(g) => Value::Cell(Arc::clone(&machine.globals[g.index()])),
            InstrKind::BinOp { op, left, right } => {
                ops::binary(*op, frame.get(*left), frame.get(*right), dst_ty, &machine.sizes)?
            }
            InstrKind::UnOp { op, operand } => ops::unary(*op, frame.get(*operand), dst_ty, &machine.sizes),
            InstrKind::Call(call) => {
                let prepared = self.prepare(frame, call, dst_ty.clone())?;
                // Only `recover` called directly by a deferred function
                // sees the panic.
                let recovering =
                    frame.recovering && matches!(prepared.target, Target::Builtin(Builtin::Recover));
                self.invoke(prepared, recovering)?
            }
            InstrKind::MakeClosure { func: id, bindings } => Value::Func(Some(Closure {
                func: *id,
                bindings: bindings.iter().map(|b| frame.get(*b).clone()).collect(),
            })),
            InstrKind::FuncRef(id) => Value::Func(Some(Closure {
                func: *id,
                bindings: Arc::from(Vec::new()),
            })),
            InstrKind::MakeSlice { len, cap } => {
                let (len, cap) = (frame.get(*len).as_int(), frame.get(*cap).as_int());
                if !(0..=MAX_ALLOC).contains(&len) {
                    return Err(runtime_error("makeslice: len out of range"));
                }
                if cap < len || cap > MAX_ALLOC {
                    return Err(runtime_error("makeslice: cap out of range"));
                }
                let zero = Value::zero(dst_ty.elem().unwrap_or(&Type::Invalid));
                SliceValue {
                    array: Some(Arc::new(Mutex::new(vec![zero; cap as usize]))),
                    offset: 0,
                    len: len as usize,
                    cap: cap as usize,
                }
                .into()
            }
            InstrKind::SliceLit { elems } => SliceValue::from_vec(frame.args(elems).into_vec()).into(),
            InstrKind::Index { base, index } => {
                let index = frame.get(*index).as_int();
                match frame.get(*base) {
                    Value::Slice(s) => s.get(index)?,
                    Value::Str(s) => match usize::try_from(index).ok().and_then(|i| s.get(i)) {
                        Some(byte) => Value::Int(i128::from(*byte)),
                        None => return Err(index_out_of_range(index, s.len())),
                    },
                    _ => return Err(nil_dereference()),
                }
            }
            InstrKind::StoreIndex { base, index, value } => {
                let index = frame.get(*index).as_int();
                let value = frame.get(*value).clone();
                match frame.get(*base) {
                    Value::Slice(s) => s.set(index, value)?,
                    _ => return Err(nil_dereference()),
                }
                Value::unit()
            }
            InstrKind::Slice { base, low, high } => {
                let low = low.map(|l| frame.get(l).as_int());
                let high = high.map(|h| frame.get(h).as_int());
                slice(frame.get(*base), low, high)?
            }
            InstrKind::MakeChan { size } => {
                let size = size.map_or(0, |s| frame.get(s).as_int());
                if !(0..=MAX_ALLOC).contains(&size) {
                    return Err(runtime_error("makechan: size out of range"));
                }
                let elem = dst_ty.elem().cloned().unwrap_or(Type::Invalid);
                Value::Chan(Some(machine.make_chan(elem, size as usize)))
            }
            InstrKind::Send { chan, value } => {
                let Value::Chan(chan) = frame.get(*chan) else {
                    return Err(nil_dereference());
                };
                machine.send(*chan, frame.get(*value).clone())?;
                Value::unit()
            }
            InstrKind::Recv { chan, comma_ok } => {
                let Value::Chan(chan) = frame.get(*chan) else {
                    return Err(nil_dereference());
                };
                let (value, ok) = machine.recv(*chan)?;
                if *comma_ok {
                    Value::tuple(vec![value, Value::Bool(ok)])
                } else {
                    value
                }
            }
            InstrKind::MakeInterface { value } => {
                Value::boxed(frame.ty(*value).clone(), frame.get(*value).clone())
            }
            InstrKind::TypeAssert { value, ty, comma_ok } => type_assert(frame.get(*value), ty, *comma_ok)?,
            InstrKind::Convert { value } => {
                ops::convert(frame.get(*value), frame.ty(*value), dst_ty, &machine.sizes)
            }
            InstrKind::Extract { tuple, index } => match frame.get(*tuple) {
                Value::Tuple(items) => items.get(*index).cloned().unwrap_or_default(),
                other => other.clone(),
            },
            InstrKind::RangeIter { value } => match frame.get(*value) {
                Value::Str(bytes) => Value::Iter(Arc::new(Mutex::new(StringIter {
                    bytes: Arc::clone(bytes),
                    pos: 0,
                }))),
                _ => Value::unit(),
            },
            InstrKind::Next { iter } => match frame.get(*iter) {
                Value::Iter(iter) => {
                    let mut iter = iter.lock();
                    if iter.pos >= iter.bytes.len() {
                        Value::tuple(vec![Value::Bool(false), Value::Int(0), Value::Int(0)])
                    } else {
                        let at = iter.pos;
                        let (rune, width) = ops::decode_rune(&iter.bytes[at..]);
                        iter.pos += width.max(1);
                        Value::tuple(vec![
                            Value::Bool(true),
                            Value::Int(at as i128),
                            Value::Int(i128::from(rune)),
                        ])
                    }
                }
                _ => Value::tuple(vec![Value::Bool(false), Value::Int(0), Value::Int(0)]),
            },
            InstrKind::Go(call) => {
                let prepared = self.prepare(frame, call, Type::unit())?;
                self.spawn(prepared)?;
                Value::unit()
            }
            InstrKind::Defer(call) => {
                let prepared = self.prepare(frame, call, Type::unit())?;
                frame.defers.push(prepared);
                Value::unit()
            }
            InstrKind::RunDefers => {
                self.run_defers(frame)?;
                Value::unit()
            }
            // Phis are handled on block entry and terminators by the block
            // loop.
            InstrKind::Phi { .. }
            | InstrKind::Jump(_)
            | InstrKind::If { .. }
            | InstrKind::Return(_)
            | InstrKind::Panic { .. } => Value::unit(),
        })
    }

    // Builtins and intrinsics

    fn call_builtin(
        &mut self,
        b: Builtin,
        args: &[Value],
        spread: bool,
        result: &Type,
        recovering: bool,
    ) -> ExecResult<Value> {
        let machine = self.machine;
        let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
        Ok(match b {
            Builtin::Append => {
                let Value::Slice(slice) = arg(0) else {
                    return Ok(arg(0));
                };
                let items: Vec<Value> = if spread {
                    match arg(1) {
                        Value::Slice(s) => s.elems(),
                        Value::Str(s) => s.iter().map(|b| Value::Int(i128::from(*b))).collect(),
                        _ => Vec::new(),
                    }
                } else {
                    args.get(1..).unwrap_or_default().to_vec()
                };
                let zero = Value::zero(result.elem().unwrap_or(&Type::Invalid));
                append(slice, items, &zero).into()
            }
            Builtin::Len => Value::Int(match arg(0) {
                Value::Str(s) => s.len() as i128,
                Value::Slice(s) => s.len as i128,
                Value::Chan(c) => machine.chan_len_cap(c).0 as i128,
                _ => 0,
            }),
            Builtin::Cap => Value::Int(match arg(0) {
                Value::Slice(s) => s.cap as i128,
                Value::Chan(c) => machine.chan_len_cap(c).1 as i128,
                _ => 0,
            }),
            Builtin::Close => {
                match arg(0) {
                    Value::Chan(c) => machine.close(c)?,
                    _ => return Err(channel_panic("close of nil channel")),
                }
                Value::unit()
            }
            Builtin::Copy => {
                let Value::Slice(dst) = arg(0) else {
                    return Ok(Value::Int(0));
                };
                let src: Vec<Value> = match arg(1) {
                    Value::Slice(s) => s.elems(),
                    Value::Str(s) => s.iter().map(|b| Value::Int(i128::from(*b))).collect(),
                    _ => Vec::new(),
                };
                let n = dst.len.min(src.len());
                if let Some(array) = &dst.array {
                    let mut array = array.lock();
                    for (k, value) in src.into_iter().take(n).enumerate() {
                        array[dst.offset + k] = value;
                    }
                }
                Value::Int(n as i128)
            }
            Builtin::Print | Builtin::Println => {
                let mut out = Vec::new();
                for (i, value) in args.iter().enumerate() {
                    if i > 0 && b == Builtin::Println {
                        out.push(b' ');
                    }
                    value.write_to(&mut out);
                }
                if b == Builtin::Println {
                    out.push(b'\n');
                }
                machine.write_output(&out);
                Value::unit()
            }
            Builtin::Panic => return Err(self.panic_value(&arg(0))),
            Builtin::Recover => {
                if recovering && !machine.mode.contains(Mode::DISABLE_RECOVER) {
                    let recovered = self.panic.take().unwrap_or(Value::Interface(None));
                    if self.tracing {
                        tracing::debug!(goroutine = self.id, value = %recovered.to_display_string(), "recovered");
                    }
                    recovered
                } else {
                    Value::Interface(None)
                }
            }
            // Lowered to `MakeSlice` and `MakeChan`.
            Builtin::Make => Value::unit(),
        })
    }

    fn call_intrinsic(&mut self, i: Intrinsic, args: &[Value]) -> ExecResult<Value> {
        Ok(match i {
            Intrinsic::Gosched => {
                thread::yield_now();
                Value::unit()
            }
            Intrinsic::Gc => Value::unit(),
            Intrinsic::NumGoroutine => Value::Int(self.machine.num_goroutines() as i128),
            Intrinsic::Exit => {
                let code = args.first().map_or(0, Value::as_int);
                tracing::debug!(goroutine = self.id, code, "os.Exit");
                self.machine.finish(code as i32);
                return Err(Unwind::Exit);
            }
            // Measured when the call was prepared.
            Intrinsic::Sizeof | Intrinsic::Alignof => args.first().cloned().unwrap_or(Value::Int(0)),
        })
    }
}

impl From<SliceValue> for Value {
    fn from(slice: SliceValue) -> Self {
        Value::Slice(slice)
    }
}

/// `append(slice, items...)`: in place when the capacity allows, otherwise
/// into a new array with the old elements copied.
fn append(slice: SliceValue, items: Vec<Value>, zero: &Value) -> SliceValue {
    if items.is_empty() {
        return slice;
    }
    let needed = slice.len + items.len();
    if let Some(array) = slice.array.as_ref().filter(|_| needed <= slice.cap) {
        {
            let mut array = array.lock();
            for (k, item) in items.into_iter().enumerate() {
                array[slice.offset + slice.len + k] = item;
            }
        }
        return SliceValue {
            len: needed,
            ..slice
        };
    }
    let cap = needed.max(slice.cap * 2);
    let mut elems = slice.elems();
    elems.extend(items);
    elems.resize(cap, zero.clone());
    SliceValue {
        array: Some(Arc::new(Mutex::new(elems))),
        offset: 0,
        len: needed,
        cap,
    }
}

/// `base[low:high]` of a string or slice.
fn slice(base: &Value, low: Option<i128>, high: Option<i128>) -> ExecResult<Value> {
    let (len, cap) = match base {
        Value::Str(s) => (s.len(), s.len()),
        Value::Slice(s) => (s.len, s.cap),
        _ => return Err(nil_dereference()),
    };
    let l = low.unwrap_or(0);
    let h = high.unwrap_or(len as i128);
    if h < 0 || h > cap as i128 {
        let what = if matches!(base, Value::Str(_)) { "length" } else { "capacity" };
        return Err(runtime_error(format!("slice bounds out of range [:{h}] with {what} {cap}")));
    }
    if l < 0 || l > h {
        return Err(runtime_error(format!("slice bounds out of range [{l}:{h}]")));
    }
    let (l, h) = (l as usize, h as usize);
    Ok(match base {
        Value::Str(s) => Value::Str(Arc::from(&s[l..h])),
        Value::Slice(s) => match &s.array {
            Some(array) => Value::Slice(SliceValue {
                array: Some(Arc::clone(array)),
                offset: s.offset + l,
                len: h - l,
                cap: s.cap - l,
            }),
            None => Value::Slice(SliceValue::default()),
        },
        _ => return Err(nil_dereference()),
    })
}

/// `x.(T)` on an `any` value.
fn type_assert(value: &Value, ty: &Type, comma_ok: bool) -> ExecResult<Value> {
    let boxed = match value {
        Value::Interface(boxed) => boxed.as_ref(),
        _ => None,
    };
    let asserted = match boxed {
        Some(_) if *ty == Type::Any => Some(value.clone()),
        Some(boxed) if boxed.0 == *ty => Some(boxed.1.clone()),
        _ => None,
    };
    match (asserted, comma_ok) {
        (Some(v), true) => Ok(Value::tuple(vec![v, Value::Bool(true)])),
        (Some(v), false) => Ok(v),
        (None, true) => Ok(Value::tuple(vec![Value::zero(ty), Value::Bool(false)])),
        (None, false) => Err(interface_conversion(boxed.map(|b| &b.0), ty)),
    }
}
