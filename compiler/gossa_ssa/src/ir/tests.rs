use pretty_assertions::assert_eq;
use smallvec::smallvec;

use crate::ir::{Block, BlockId, CallCommon, Callee, FuncId, Instr, InstrKind, ValueId};

fn v(n: u32) -> ValueId {
    ValueId::new(n)
}

#[test]
fn ids_print_with_prefixes() {
    assert_eq!(v(3).to_string(), "t3");
    assert_eq!(format!("{:?}", BlockId::new(0)), "b0");
    assert_eq!(FuncId::new(12).to_string(), "f12");
    assert_eq!(v(7).index(), 7);
}

#[test]
fn terminators_and_targets() {
    let jump = InstrKind::Jump(BlockId::new(2));
    let branch = InstrKind::If {
        cond: v(0),
        then: BlockId::new(1),
        els: BlockId::new(4),
    };
    assert!(jump.is_terminator());
    assert!(branch.is_terminator());
    assert!(InstrKind::Panic { value: v(0) }.is_terminator());
    assert!(!InstrKind::RunDefers.is_terminator());

    assert_eq!(jump.targets().as_slice(), &[BlockId::new(2)]);
    assert_eq!(branch.targets().as_slice(), &[BlockId::new(1), BlockId::new(4)]);
    assert!(InstrKind::Return(smallvec![v(1)]).targets().is_empty());
}

#[test]
fn operands_include_callee_and_optional_bounds() {
    let call = InstrKind::Call(CallCommon {
        callee: Callee::Value(v(1)),
        args: smallvec![v(2), v(3)],
        spread: false,
    });
    assert_eq!(call.operands().as_slice(), &[v(1), v(2), v(3)]);

    let builtin = InstrKind::Defer(CallCommon {
        callee: Callee::Builtin(gossa_types::Builtin::Println),
        args: smallvec![v(4)],
        spread: false,
    });
    assert_eq!(builtin.operands().as_slice(), &[v(4)]);

    let slice = InstrKind::Slice {
        base: v(0),
        low: None,
        high: Some(v(5)),
    };
    assert_eq!(slice.operands().as_slice(), &[v(0), v(5)]);
    assert!(InstrKind::MakeChan { size: None }.operands().is_empty());
}

#[test]
fn block_terminator_is_the_last_instruction() {
    let mut block = Block::default();
    assert!(block.terminator().is_none());
    block.instrs.push(Instr {
        dst: None,
        kind: InstrKind::RunDefers,
    });
    assert!(block.terminator().is_none());
    block.instrs.push(Instr {
        dst: None,
        kind: InstrKind::Return(smallvec![]),
    });
    assert_eq!(
        block.terminator().map(|i| &i.kind),
        Some(&InstrKind::Return(smallvec![]))
    );
}
