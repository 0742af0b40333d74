use super::*;

fn ident_expr(id: u32, name: &str) -> Expr {
    Expr {
        id: NodeId::new(id),
        kind: ExprKind::Ident(name.to_string()),
        span: Span::new(0, name.len() as u32),
    }
}

#[test]
fn unparen_strips_nested_parentheses() {
    let inner = ident_expr(0, "x");
    let wrapped = Expr {
        id: NodeId::new(2),
        kind: ExprKind::Paren(Box::new(Expr {
            id: NodeId::new(1),
            kind: ExprKind::Paren(Box::new(inner.clone())),
            span: Span::new(0, 3),
        })),
        span: Span::new(0, 5),
    };
    assert_eq!(wrapped.unparen(), &inner);
    assert_eq!(wrapped.as_ident(), Some("x"));
}

#[test]
fn precedence_follows_go() {
    assert!(BinaryOp::Mul.precedence() > BinaryOp::Add.precedence());
    assert!(BinaryOp::Add.precedence() > BinaryOp::Lt.precedence());
    assert!(BinaryOp::Lt.precedence() > BinaryOp::LogAnd.precedence());
    assert!(BinaryOp::LogAnd.precedence() > BinaryOp::LogOr.precedence());
    assert_eq!(BinaryOp::AndNot.precedence(), BinaryOp::Shl.precedence());
}

#[test]
fn operator_classification() {
    assert!(BinaryOp::GtEq.is_comparison());
    assert!(!BinaryOp::Add.is_comparison());
    assert!(BinaryOp::Shr.is_shift());
    assert_eq!(BinaryOp::AndNot.as_symbol(), "&^");
    assert_eq!(UnaryOp::Recv.as_symbol(), "<-");
}

#[test]
fn blank_identifier() {
    let blank = Ident {
        id: NodeId::new(0),
        name: "_".to_string(),
        span: Span::DUMMY,
    };
    assert!(blank.is_blank());
}
