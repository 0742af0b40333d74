//! Structural checks over built functions.
//!
//! Checked per function:
//! - the entry block has no predecessors
//! - every block ends in exactly one terminator and contains no other
//! - successor lists match terminator targets, and every successor lists
//!   the block among its predecessors (and vice versa)
//! - phis come first in their block, with one edge per predecessor
//! - every operand is defined in the function, and no value twice
//! - `Return` carries as many values as the signature has results
//! - every block but the recover block is reachable from the entry
//! - `Defer` and `RunDefers` appear only in functions marked `has_defer`

use std::fmt;

use thiserror::Error;

use crate::ir::{BlockId, Function, InstrKind, ValueId};

/// One violated invariant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SanityProblem {
    pub function: String,
    pub message: String,
}

impl fmt::Display for SanityProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.function, self.message)
    }
}

/// Every problem found in a built program.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("sanity check failed:\n{}", render(.problems))]
pub struct SanityError {
    pub problems: Vec<SanityProblem>,
}

fn render(problems: &[SanityProblem]) -> String {
    problems
        .iter()
        .map(|p| format!("  {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check one function; an empty result means it is well formed.
///
/// Functions without blocks (declared but never built) are skipped.
pub fn sanity_check(function: &Function) -> Vec<SanityProblem> {
    if function.blocks.is_empty() {
        return Vec::new();
    }
    let mut checker = Checker {
        function,
        problems: Vec::new(),
    };
    checker.run();
    checker.problems
}

struct Checker<'f> {
    function: &'f Function,
    problems: Vec<SanityProblem>,
}

impl Checker<'_> {
    fn report(&mut self, message: String) {
        self.problems.push(SanityProblem {
            function: self.function.name.clone(),
            message,
        });
    }

    fn run(&mut self) {
        let f = self.function;
        let n = f.blocks.len();
        let in_range = |b: BlockId| b.index() < n;

        if !f.blocks[0].preds.is_empty() {
            self.report(format!("entry block has predecessors {:?}", f.blocks[0].preds));
        }

        let defined = self.definitions();

        for (i, block) in f.blocks.iter().enumerate() {
            let id = BlockId::new(i as u32);

            // Terminators
            let terminators = block
                .instrs
                .iter()
                .filter(|instr| instr.kind.is_terminator())
                .count();
            match block.terminator() {
                None => self.report(format!("{id} does not end in a terminator")),
                Some(_) if terminators > 1 => {
                    self.report(format!("{id} has {terminators} terminators"));
                }
                Some(term) => {
                    let targets = term.kind.targets();
                    if targets.as_slice() != block.succs.as_slice() {
                        self.report(format!(
                            "{id} successors {:?} do not match its terminator targets {:?}",
                            block.succs, targets
                        ));
                    }
                }
            }

            // Edges
            for &succ in &block.succs {
                if !in_range(succ) {
                    self.report(format!("{id} has out-of-range successor {succ}"));
                } else if !f.block(succ).preds.contains(&id) {
                    self.report(format!("{succ} is a successor of {id} but does not list it as a predecessor"));
                }
            }
            for &pred in &block.preds {
                if !in_range(pred) {
                    self.report(format!("{id} has out-of-range predecessor {pred}"));
                } else if !f.block(pred).succs.contains(&id) {
                    self.report(format!("{pred} is a predecessor of {id} but does not list it as a successor"));
                }
            }

            // Instructions
            let mut phis_done = false;
            for instr in &block.instrs {
                match &instr.kind {
                    InstrKind::Phi { edges } => {
                        if phis_done {
                            self.report(format!("{id}: phi after a non-phi instruction"));
                        }
                        if edges.len() != block.preds.len() {
                            self.report(format!(
                                "{id}: phi has {} edges for {} predecessors",
                                edges.len(),
                                block.preds.len()
                            ));
                        }
                    }
                    _ => phis_done = true,
                }
                for operand in instr.kind.operands() {
                    if !defined.get(operand.index()).copied().unwrap_or(false) {
                        self.report(format!("{id}: operand {operand} is never defined"));
                    }
                }
                match &instr.kind {
                    InstrKind::Return(values) if values.len() != f.signature.results.len() => {
                        self.report(format!(
                            "{id}: return of {} values from a function with {} results",
                            values.len(),
                            f.signature.results.len()
                        ));
                    }
                    InstrKind::Defer(_) | InstrKind::RunDefers if !f.has_defer => {
                        self.report(format!("{id}: defer in a function not marked has_defer"));
                    }
                    _ => {}
                }
            }
        }

        self.reachability();
    }

    /// Which values are defined, reporting duplicates.
    fn definitions(&mut self) -> Vec<bool> {
        let f = self.function;
        let mut defined = vec![false; f.num_values()];
        let dsts = f
            .blocks
            .iter()
            .flat_map(|b| &b.instrs)
            .filter_map(|instr| instr.dst);
        let all: Vec<ValueId> = f
            .params
            .iter()
            .chain(&f.free_vars)
            .copied()
            .chain(dsts)
            .collect();
        for v in all {
            match defined.get_mut(v.index()) {
                Some(seen) if *seen => self.report(format!("{v} is defined more than once")),
                Some(seen) => *seen = true,
                None => self.report(format!("{v} has no recorded type")),
            }
        }
        defined
    }

    fn reachability(&mut self) {
        let f = self.function;
        let mut reachable = vec![false; f.blocks.len()];
        let mut work = vec![BlockId::new(0)];
        while let Some(b) = work.pop() {
            let Some(seen) = reachable.get_mut(b.index()) else {
                continue;
            };
            if std::mem::replace(seen, true) {
                continue;
            }
            work.extend(f.block(b).succs.iter().copied());
        }
        for (i, live) in reachable.iter().enumerate() {
            let id = BlockId::new(i as u32);
            if !live && f.recover != Some(id) {
                self.report(format!("{id} is unreachable"));
            }
        }
    }
}

#[cfg(test)]
mod tests;
