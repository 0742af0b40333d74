//! Terminating statements, for "missing return".

use gossa_ir::ast::{ExprKind, Stmt, StmtKind};

use crate::{Builtin, CallKind, TypeInfo};

/// Whether a statement list ends in a terminating statement.
pub(crate) fn is_terminating_list(stmts: &[Stmt], info: &TypeInfo) -> bool {
    stmts
        .iter()
        .rev()
        .find(|s| !matches!(s.kind, StmtKind::Empty))
        .is_some_and(|s| is_terminating(s, info))
}

pub(crate) fn is_terminating(stmt: &Stmt, info: &TypeInfo) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::Expr(e) => {
            let call = e.unparen();
            matches!(call.kind, ExprKind::Call { .. })
                && info.calls.get(&call.id) == Some(&CallKind::Builtin(Builtin::Panic))
        }
        StmtKind::Block(block) => is_terminating_list(&block.stmts, info),
        StmtKind::If {
            then,
            els: Some(els),
            ..
        } => is_terminating_list(&then.stmts, info) && is_terminating(els, info),
        StmtKind::For {
            cond: None, body, ..
        } => !has_break(&body.stmts),
        StmtKind::Switch { clauses, .. } => {
            clauses.iter().any(|c| c.is_default)
                && clauses
                    .iter()
                    .all(|c| is_terminating_list(&c.body, info) && !has_break(&c.body))
        }
        _ => false,
    }
}

/// Whether an unlabeled `break` in these statements leaves the enclosing
/// statement. Breaks inside nested loops and switches do not.
fn has_break(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| match &stmt.kind {
        StmtKind::Break => true,
        StmtKind::Block(block) => has_break(&block.stmts),
        StmtKind::If { then, els, .. } => {
            has_break(&then.stmts) || els.as_deref().is_some_and(|e| has_break(std::slice::from_ref(e)))
        }
        _ => false,
    })
}
