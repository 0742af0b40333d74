use std::sync::Arc;

use gossa_types::{Signature, Type};
use pretty_assertions::assert_eq;
use smallvec::smallvec;

use crate::ir::{Block, BlockId, Const, Function, Instr, InstrKind, ValueId};
use crate::sanity_check;

fn v(n: u32) -> ValueId {
    ValueId::new(n)
}

fn b(n: u32) -> BlockId {
    BlockId::new(n)
}

fn instr(dst: Option<u32>, kind: InstrKind) -> Instr {
    Instr {
        dst: dst.map(ValueId::new),
        kind,
    }
}

/// `func f() int`: b0 branches on a constant to b1 or b2, both of which
/// jump to b3, which merges two constants with a phi and returns it.
fn diamond() -> Function {
    let mut f = Function::declared(
        "main.f".to_string(),
        "main".to_string(),
        Arc::new(Signature::new(Vec::new(), vec![Type::INT])),
    );
    f.value_types = vec![Type::Bool, Type::INT, Type::INT, Type::INT];
    f.blocks = vec![
        Block {
            instrs: vec![
                instr(Some(0), InstrKind::Const(Const::Bool(true))),
                instr(
                    None,
                    InstrKind::If {
                        cond: v(0),
                        then: b(1),
                        els: b(2),
                    },
                ),
            ],
            preds: vec![],
            succs: vec![b(1), b(2)],
        },
        Block {
            instrs: vec![
                instr(Some(1), InstrKind::Const(Const::Int(1))),
                instr(None, InstrKind::Jump(b(3))),
            ],
            preds: vec![b(0)],
            succs: vec![b(3)],
        },
        Block {
            instrs: vec![
                instr(Some(2), InstrKind::Const(Const::Int(2))),
                instr(None, InstrKind::Jump(b(3))),
            ],
            preds: vec![b(0)],
            succs: vec![b(3)],
        },
        Block {
            instrs: vec![
                instr(
                    Some(3),
                    InstrKind::Phi {
                        edges: smallvec![v(1), v(2)],
                    },
                ),
                instr(None, InstrKind::Return(smallvec![v(3)])),
            ],
            preds: vec![b(1), b(2)],
            succs: vec![],
        },
    ];
    f
}

fn messages(f: &Function) -> Vec<String> {
    sanity_check(f).into_iter().map(|p| p.message).collect()
}

#[test]
fn well_formed_function_passes() {
    assert_eq!(messages(&diamond()), Vec::<String>::new());
}

#[test]
fn declared_function_is_skipped() {
    let f = Function::declared("main.g".to_string(), "main".to_string(), Arc::default());
    assert!(sanity_check(&f).is_empty());
}

#[test]
fn missing_terminator() {
    let mut f = diamond();
    f.blocks[1].instrs.pop();
    f.blocks[1].succs.clear();
    f.blocks[3].preds = vec![b(2)];
    if let InstrKind::Phi { edges } = &mut f.blocks[3].instrs[0].kind {
        edges.remove(0);
    }
    assert_eq!(messages(&f), vec!["b1 does not end in a terminator".to_string()]);
}

#[test]
fn terminator_in_the_middle() {
    let mut f = diamond();
    f.blocks[1]
        .instrs
        .insert(0, instr(None, InstrKind::Jump(b(3))));
    assert_eq!(messages(&f), vec!["b1 has 2 terminators".to_string()]);
}

#[test]
fn phi_edges_must_match_predecessors() {
    let mut f = diamond();
    if let InstrKind::Phi { edges } = &mut f.blocks[3].instrs[0].kind {
        edges.push(v(1));
    }
    assert_eq!(
        messages(&f),
        vec!["b3: phi has 3 edges for 2 predecessors".to_string()]
    );
}

#[test]
fn phi_must_come_first() {
    let mut f = diamond();
    f.value_types.push(Type::INT);
    f.blocks[3]
        .instrs
        .insert(0, instr(Some(4), InstrKind::Const(Const::Int(0))));
    assert_eq!(
        messages(&f),
        vec!["b3: phi after a non-phi instruction".to_string()]
    );
}

#[test]
fn undefined_and_duplicate_values() {
    let mut f = diamond();
    f.blocks[2].instrs[0].dst = Some(v(1));
    let problems = messages(&f);
    assert!(problems.contains(&"t1 is defined more than once".to_string()), "{problems:?}");
    assert!(problems.contains(&"b3: operand t2 is never defined".to_string()), "{problems:?}");
}

#[test]
fn edge_lists_must_agree() {
    let mut f = diamond();
    f.blocks[2].succs.clear();
    let problems = messages(&f);
    assert!(problems.contains(
        &"b2 successors [] do not match its terminator targets [b3]".to_string()
    ));
    assert!(problems.contains(
        &"b2 is a predecessor of b3 but does not list it as a successor".to_string()
    ));
}

#[test]
fn entry_with_predecessors_and_unreachable_blocks() {
    let mut f = diamond();
    // b3 loops back to the entry and a stray block hangs off nothing.
    f.blocks[0].preds.push(b(3));
    f.blocks.push(Block {
        instrs: vec![instr(None, InstrKind::Return(smallvec![v(1)]))],
        preds: vec![],
        succs: vec![],
    });
    let problems = messages(&f);
    assert!(problems.contains(&"entry block has predecessors [b3]".to_string()), "{problems:?}");
    assert!(problems.contains(&"b4 is unreachable".to_string()), "{problems:?}");

    // The same stray block is fine as the recover block.
    let mut g = diamond();
    g.blocks.push(Block {
        instrs: vec![instr(None, InstrKind::Return(smallvec![v(1)]))],
        preds: vec![],
        succs: vec![],
    });
    g.recover = Some(b(4));
    g.has_defer = true;
    assert_eq!(messages(&g), Vec::<String>::new());
}

#[test]
fn return_arity_and_defer_flag() {
    let mut f = diamond();
    f.blocks[3].instrs[1] = instr(None, InstrKind::Return(smallvec![]));
    f.blocks[1]
        .instrs
        .insert(0, instr(None, InstrKind::RunDefers));
    assert_eq!(
        messages(&f),
        vec![
            "b1: defer in a function not marked has_defer".to_string(),
            "b3: return of 0 values from a function with 1 results".to_string(),
        ]
    );
}

#[test]
fn error_lists_every_problem() {
    let mut f = diamond();
    f.blocks[1].instrs.pop();
    let problems = sanity_check(&f);
    let error = crate::SanityError { problems };
    let text = error.to_string();
    assert!(text.starts_with("sanity check failed:\n  main.f: "), "{text}");
}
