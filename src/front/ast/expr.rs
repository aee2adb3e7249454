use super::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLiteral(i32, Span),
    // 变量或常量引用：由 LVal 产生
    LVal(LVal),
    UnaryOp(UnaryOp, Box<Expr>, Span),
    BinaryOp(BinaryOp, Box<Expr>, Box<Expr>, Span),
    RelOp(RelOp, Box<Expr>, Box<Expr>, Span),
    EqOp(EqOp, Box<Expr>, Box<Expr>, Span),
    LAndOp(LAndOp, Box<Expr>, Box<Expr>, Span),
    LOrOp(LOrOp, Box<Expr>, Box<Expr>, Span),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Plus,   // +
    Minus,  // -
    Not,    // !
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelOp {
    Lt,   // <
    Gt,   // >
    Le,   // <=
    Ge,   // >=
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EqOp {
    Eq,   // ==
    Ne,   // !=
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LAndOp {
    And,  // &&
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LOrOp {
    Or,   // ||
}

// LVal ::= IDENT;
#[derive(Debug, Clone, PartialEq)]
pub struct LVal {
    pub name: String,
    pub span: Span,
}
