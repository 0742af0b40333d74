//! State shared by every goroutine of one interpretation.
//!
//! Channels, the goroutine counts and the program's outcome live under one
//! lock, [`Machine::sched`], with one condition variable. A goroutine that
//! cannot proceed waits on the condition variable; any change to shared
//! state bumps the epoch, resets the blocked count and wakes everyone.
//!
//! Deadlock detection: a waiter counts itself blocked for the current
//! epoch before it sleeps. When every live goroutine is blocked in the same
//! epoch, nothing can ever change again.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use gossa_ssa::Program;
use gossa_types::{Sizes, Type};
use parking_lot::{Condvar, Mutex, MutexGuard};
use rustc_hash::FxHashSet;

use crate::errors::{channel_panic, ExecResult, Unwind};
use crate::value::{new_cell, Cell, ChanId, Value};
use crate::{CapturedOutput, Mode};

pub(crate) const DEADLOCK_MESSAGE: &str = "fatal error: all goroutines are asleep - deadlock!";

/// Exit code of an unrecovered panic or a deadlock.
pub(crate) const FATAL_EXIT_CODE: i32 = 2;

pub(crate) struct Channel {
    pub elem: Type,
    pub cap: usize,
    pub buf: VecDeque<Value>,
    /// Unbuffered sends waiting for a receiver, by ticket.
    pub pending: VecDeque<(u64, Value)>,
    /// Tickets of unbuffered sends a receiver has taken.
    pub delivered: FxHashSet<u64>,
    pub closed: bool,
}

pub(crate) struct SchedState {
    pub channels: Vec<Channel>,
    /// Goroutines started and not yet finished, `main` included.
    pub alive: usize,
    /// Goroutines waiting in the current epoch.
    pub blocked: usize,
    pub epoch: u64,
    next_ticket: u64,
    /// Set once; the first outcome wins.
    pub exit_code: Option<i32>,
}

impl SchedState {
    /// Record a change that may unblock a waiter.
    pub fn changed(&mut self) {
        self.epoch += 1;
        self.blocked = 0;
    }

    pub fn channel(&mut self, id: ChanId) -> &mut Channel {
        &mut self.channels[id.index()]
    }
}

/// Outcome of one poll of a blocking operation.
pub(crate) enum Poll<T> {
    Ready(T),
    Pending,
}

pub(crate) enum Output<'o> {
    Stdout,
    Captured(&'o CapturedOutput),
}

pub(crate) struct Machine<'p> {
    pub program: &'p Program,
    pub mode: Mode,
    pub sizes: Sizes,
    pub globals: Vec<Cell>,
    sched: Mutex<SchedState>,
    wake: Condvar,
    /// Mirrors `exit_code.is_some()` for cheap polling by running code.
    stopping: AtomicBool,
    next_goroutine: AtomicU64,
    output: Output<'p>,
}

impl<'p> Machine<'p> {
    pub fn new(program: &'p Program, mode: Mode, sizes: Sizes, output: Output<'p>) -> Self {
        let globals = program
            .globals
            .iter()
            .map(|g| new_cell(Value::zero(&g.ty)))
            .collect();
        Machine {
            program,
            mode,
            sizes,
            globals,
            sched: Mutex::new(SchedState {
                channels: Vec::new(),
                alive: 1,
                blocked: 0,
                epoch: 0,
                next_ticket: 0,
                exit_code: None,
            }),
            wake: Condvar::new(),
            stopping: AtomicBool::new(false),
            next_goroutine: AtomicU64::new(1),
            output,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, SchedState> {
        self.sched.lock()
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Fail fast once the program is over.
    #[inline]
    pub fn check_running(&self) -> ExecResult<()> {
        if self.is_stopping() {
            Err(Unwind::Exit)
        } else {
            Ok(())
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.lock().exit_code
    }

    /// Record the program's exit code (if none is set yet) and wake every
    /// goroutine so it can unwind.
    pub fn finish(&self, code: i32) {
        let mut state = self.lock();
        self.finish_locked(&mut state, code);
    }

    fn finish_locked(&self, state: &mut SchedState, code: i32) {
        if state.exit_code.is_none() {
            tracing::debug!(code, "program finished");
            state.exit_code = Some(code);
        }
        self.stopping.store(true, Ordering::Release);
        self.wake.notify_all();
    }

    /// An unrecovered panic ends the whole program.
    pub fn fatal_panic(&self, value: &Value) {
        let mut state = self.lock();
        if state.exit_code.is_none() {
            eprintln!("panic: {}", value.to_display_string());
        }
        self.finish_locked(&mut state, FATAL_EXIT_CODE);
    }

    // Goroutines

    /// Count a new goroutine as alive and return its id. `main` is 0.
    pub fn goroutine_started(&self) -> u64 {
        let mut state = self.lock();
        state.alive += 1;
        self.next_goroutine.fetch_add(1, Ordering::Relaxed)
    }

    pub fn goroutine_exited(&self) {
        let mut state = self.lock();
        state.alive = state.alive.saturating_sub(1);
        if state.alive > 0 && state.blocked >= state.alive && state.exit_code.is_none() {
            self.deadlock(&mut state);
        }
    }

    pub fn num_goroutines(&self) -> usize {
        self.lock().alive
    }

    fn deadlock(&self, state: &mut SchedState) {
        if state.exit_code.is_none() {
            eprintln!("{DEADLOCK_MESSAGE}");
        }
        self.finish_locked(state, FATAL_EXIT_CODE);
    }

    /// Run `poll` under the machine lock until it is ready, sleeping
    /// between attempts. `poll` calls [`SchedState::changed`] whenever it
    /// modifies shared state.
    pub fn block_on<T>(&self, mut poll: impl FnMut(&mut SchedState) -> ExecResult<Poll<T>>) -> ExecResult<T> {
        let mut state = self.lock();
        loop {
            if state.exit_code.is_some() {
                return Err(Unwind::Exit);
            }
            let before = state.epoch;
            let result = poll(&mut *state);
            if state.epoch != before {
                self.wake.notify_all();
            }
            match result? {
                Poll::Ready(value) => return Ok(value),
                Poll::Pending => {}
            }
            let epoch = state.epoch;
            state.blocked += 1;
            if state.blocked >= state.alive {
                self.deadlock(&mut state);
                return Err(Unwind::Exit);
            }
            while state.epoch == epoch && state.exit_code.is_none() {
                self.wake.wait(&mut state);
            }
        }
    }

    // Channels

    pub fn make_chan(&self, elem: Type, cap: usize) -> ChanId {
        let mut state = self.lock();
        let id = ChanId(state.channels.len() as u32);
        state.channels.push(Channel {
            elem,
            cap,
            buf: VecDeque::new(),
            pending: VecDeque::new(),
            delivered: FxHashSet::default(),
            closed: false,
        });
        id
    }

    pub fn send(&self, chan: Option<ChanId>, value: Value) -> ExecResult<()> {
        let Some(id) = chan else {
            return self.block_on(|_| Ok(Poll::<()>::Pending));
        };
        let mut value = Some(value);
        let mut ticket = None;
        self.block_on(|state| {
            let unbuffered = state.channel(id).cap == 0;
            if unbuffered {
                let t = match ticket {
                    Some(t) => t,
                    None => {
                        if state.channel(id).closed {
                            return Err(channel_panic("send on closed channel"));
                        }
                        let t = state.next_ticket;
                        state.next_ticket += 1;
                        let v = value.take().unwrap_or_default();
                        state.channel(id).pending.push_back((t, v));
                        state.changed();
                        ticket = Some(t);
                        t
                    }
                };
                let ch = state.channel(id);
                if ch.delivered.remove(&t) {
                    return Ok(Poll::Ready(()));
                }
                if ch.closed {
                    ch.pending.retain(|(p, _)| *p != t);
                    return Err(channel_panic("send on closed channel"));
                }
                return Ok(Poll::Pending);
            }
            let ch = state.channel(id);
            if ch.closed {
                return Err(channel_panic("send on closed channel"));
            }
            if ch.buf.len() < ch.cap {
                ch.buf.push_back(value.take().unwrap_or_default());
                state.changed();
                return Ok(Poll::Ready(()));
            }
            Ok(Poll::Pending)
        })
    }

    /// Receive a value; the flag is false once the channel is closed and
    /// drained, with the element's zero value.
    pub fn recv(&self, chan: Option<ChanId>) -> ExecResult<(Value, bool)> {
        let Some(id) = chan else {
            return self.block_on(|_| Ok(Poll::<(Value, bool)>::Pending));
        };
        self.block_on(|state| {
            let ch = state.channel(id);
            if let Some(v) = ch.buf.pop_front() {
                state.changed();
                return Ok(Poll::Ready((v, true)));
            }
            if let Some((ticket, v)) = ch.pending.pop_front() {
                ch.delivered.insert(ticket);
                state.changed();
                return Ok(Poll::Ready((v, true)));
            }
            if ch.closed {
                return Ok(Poll::Ready((Value::zero(&ch.elem), false)));
            }
            Ok(Poll::Pending)
        })
    }

    pub fn close(&self, chan: Option<ChanId>) -> ExecResult<()> {
        let Some(id) = chan else {
            return Err(channel_panic("close of nil channel"));
        };
        let mut state = self.lock();
        if state.channel(id).closed {
            return Err(channel_panic("close of closed channel"));
        }
        state.channel(id).closed = true;
        state.changed();
        self.wake.notify_all();
        Ok(())
    }

    /// `len` and `cap` of a channel.
    pub fn chan_len_cap(&self, chan: Option<ChanId>) -> (usize, usize) {
        match chan {
            Some(id) => {
                let mut state = self.lock();
                let ch = state.channel(id);
                (ch.buf.len(), ch.cap)
            }
            None => (0, 0),
        }
    }

    // Output

    pub fn write_output(&self, bytes: &[u8]) {
        match self.output {
            Output::Captured(buffer) => buffer.write(bytes),
            Output::Stdout => {
                let mut stdout = std::io::stdout().lock();
                let _ = stdout.write_all(bytes);
                let _ = stdout.flush();
            }
        }
    }
}
