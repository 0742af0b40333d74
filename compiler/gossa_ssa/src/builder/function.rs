//! In-progress function: blocks, values and the insertion point.

use std::sync::Arc;

use gossa_types::{LocalId, Signature, Type};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::ir::{Block, BlockId, Function, Instr, InstrKind, ValueId};

/// Builder for one function.
///
/// Follows the "position at a block, emit instructions, terminate" pattern.
/// Emitting into a block that already has a terminator opens a fresh,
/// unreachable block, so code after `return` or `panic` still has a home;
/// [`finish`](FnState::finish) removes such blocks.
pub(super) struct FnState {
    pub name: String,
    pub package: String,
    pub sig: Arc<Signature>,
    blocks: Vec<Block>,
    current: BlockId,
    value_types: Vec<Type>,
    pub params: Vec<ValueId>,
    pub free_vars: Vec<ValueId>,
    /// Locals of enclosing functions captured by `free_vars`, in order.
    pub free_locals: Vec<LocalId>,
    /// The cell holding each local visible here.
    pub cells: FxHashMap<LocalId, ValueId>,
    /// Cells of named results.
    pub results: Vec<ValueId>,
    pub has_defer: bool,
    pub recover: Option<BlockId>,
    /// Innermost last.
    pub breaks: Vec<BlockId>,
    pub continues: Vec<BlockId>,
    /// Function literals built so far, for naming.
    pub literals: u32,
}

impl FnState {
    pub fn new(name: String, package: String, sig: Arc<Signature>) -> Self {
        FnState {
            name,
            package,
            sig,
            blocks: vec![Block::default()],
            current: BlockId::new(0),
            value_types: Vec::new(),
            params: Vec::new(),
            free_vars: Vec::new(),
            free_locals: Vec::new(),
            cells: FxHashMap::default(),
            results: Vec::new(),
            has_defer: false,
            recover: None,
            breaks: Vec::new(),
            continues: Vec::new(),
            literals: 0,
        }
    }

    // Blocks

    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push(Block::default());
        id
    }

    pub fn position_at(&mut self, block: BlockId) {
        debug_assert!(block.index() < self.blocks.len(), "{block} out of bounds");
        self.current = block;
    }

    pub fn is_terminated(&self) -> bool {
        self.blocks[self.current.index()].terminator().is_some()
    }

    fn ensure_open(&mut self) {
        if self.is_terminated() {
            let dead = self.new_block();
            self.position_at(dead);
        }
    }

    // Values

    pub fn new_value(&mut self, ty: Type) -> ValueId {
        let id = ValueId::new(self.value_types.len() as u32);
        self.value_types.push(ty);
        id
    }

    pub fn value_type(&self, v: ValueId) -> &Type {
        self.value_types.get(v.index()).unwrap_or(&Type::Invalid)
    }

    pub fn param(&mut self, ty: Type) -> ValueId {
        let v = self.new_value(ty);
        self.params.push(v);
        v
    }

    /// Bind a local of an enclosing function to a new free variable.
    pub fn capture(&mut self, local: LocalId, ty: Type) -> ValueId {
        let v = self.new_value(ty);
        self.free_vars.push(v);
        self.free_locals.push(local);
        self.cells.insert(local, v);
        v
    }

    // Emission

    /// Emit an instruction defining a value of type `ty`.
    pub fn emit(&mut self, kind: InstrKind, ty: Type) -> ValueId {
        self.ensure_open();
        let dst = self.new_value(ty);
        self.blocks[self.current.index()].instrs.push(Instr {
            dst: Some(dst),
            kind,
        });
        dst
    }

    /// Emit an instruction that defines nothing.
    pub fn emit_effect(&mut self, kind: InstrKind) {
        self.ensure_open();
        self.blocks[self.current.index()]
            .instrs
            .push(Instr { dst: None, kind });
    }

    /// Terminate the current block, wiring up successors and predecessors.
    /// Returns the block that was terminated.
    pub fn terminate(&mut self, kind: InstrKind) -> BlockId {
        debug_assert!(kind.is_terminator());
        self.ensure_open();
        let from = self.current;
        for target in kind.targets() {
            self.blocks[from.index()].succs.push(target);
            self.blocks[target.index()].preds.push(from);
        }
        self.blocks[from.index()]
            .instrs
            .push(Instr { dst: None, kind });
        from
    }

    pub fn jump(&mut self, target: BlockId) -> BlockId {
        self.terminate(InstrKind::Jump(target))
    }

    pub fn branch(&mut self, cond: ValueId, then: BlockId, els: BlockId) -> BlockId {
        self.terminate(InstrKind::If { cond, then, els })
    }

    /// Jump to `target` unless the current block already ended.
    pub fn jump_if_open(&mut self, target: BlockId) {
        if !self.is_terminated() {
            self.jump(target);
        }
    }

    /// Emit a phi at the start of `block` with one edge per predecessor, as
    /// chosen by `edge`. The phi goes before any other instruction.
    pub fn phi(&mut self, block: BlockId, ty: Type, edge: impl Fn(BlockId) -> ValueId) -> ValueId {
        let edges: SmallVec<[ValueId; 2]> = self.blocks[block.index()]
            .preds
            .iter()
            .map(|p| edge(*p))
            .collect();
        let dst = self.new_value(ty);
        let instrs = &mut self.blocks[block.index()].instrs;
        let at = instrs
            .iter()
            .position(|i| !matches!(i.kind, InstrKind::Phi { .. }))
            .unwrap_or(instrs.len());
        instrs.insert(
            at,
            Instr {
                dst: Some(dst),
                kind: InstrKind::Phi { edges },
            },
        );
        dst
    }

    /// Recompute the edges of an existing phi once all predecessors exist.
    pub fn set_phi_edges(&mut self, block: BlockId, phi: ValueId, edge: impl Fn(BlockId) -> ValueId) {
        let preds = self.blocks[block.index()].preds.clone();
        for instr in &mut self.blocks[block.index()].instrs {
            if instr.dst == Some(phi) {
                if let InstrKind::Phi { edges } = &mut instr.kind {
                    *edges = preds.iter().map(|p| edge(*p)).collect();
                }
            }
        }
    }

    // Finalization

    /// Produce the function, dropping blocks unreachable from the entry
    /// (the recover block is kept) and renumbering the rest.
    pub fn finish(self) -> Function {
        let n = self.blocks.len();
        let mut reachable = vec![false; n];
        let mut work = vec![BlockId::new(0)];
        work.extend(self.recover);
        while let Some(b) = work.pop() {
            if std::mem::replace(&mut reachable[b.index()], true) {
                continue;
            }
            work.extend(self.blocks[b.index()].succs.iter().copied());
        }

        let mut renumber = vec![None; n];
        let mut next = 0u32;
        for (i, live) in reachable.iter().enumerate() {
            if *live {
                renumber[i] = Some(BlockId::new(next));
                next += 1;
            }
        }
        let map = |b: BlockId| renumber[b.index()].unwrap_or(b);

        let mut blocks = Vec::with_capacity(next as usize);
        for (i, mut block) in self.blocks.into_iter().enumerate() {
            if !reachable[i] {
                continue;
            }
            let keep: Vec<bool> = block.preds.iter().map(|p| reachable[p.index()]).collect();
            if keep.iter().any(|k| !k) {
                for instr in &mut block.instrs {
                    if let InstrKind::Phi { edges } = &mut instr.kind {
                        *edges = edges
                            .iter()
                            .zip(&keep)
                            .filter(|(_, k)| **k)
                            .map(|(e, _)| *e)
                            .collect();
                    }
                }
            }
            block.preds = block
                .preds
                .iter()
                .filter(|p| reachable[p.index()])
                .map(|p| map(*p))
                .collect();
            block.succs = block.succs.iter().map(|s| map(*s)).collect();
            if let Some(last) = block.instrs.last_mut() {
                match &mut last.kind {
                    InstrKind::Jump(target) => *target = map(*target),
                    InstrKind::If { then, els, .. } => {
                        *then = map(*then);
                        *els = map(*els);
                    }
                    _ => {}
                }
            }
            blocks.push(block);
        }
        if blocks.len() < n {
            tracing::trace!(function = %self.name, removed = n - blocks.len(), "removed unreachable blocks");
        }

        Function {
            name: self.name,
            package: self.package,
            signature: self.sig,
            params: self.params,
            free_vars: self.free_vars,
            blocks,
            value_types: self.value_types,
            recover: self.recover.map(map),
            has_defer: self.has_defer,
        }
    }
}
