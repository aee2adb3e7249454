//! 编译期常量求值
//!
//! 对表达式做纯函数式的折叠：任一子表达式引用了非常量左值，
//! 或出现除零/模零，整个表达式就不可折叠，返回 None。
//! 数值语义为 32 位补码（加减乘为 wrapping）。

use crate::front::ast::*;
use crate::front::symtab::{SymbolKind, SymbolTable};

impl Expr {
    pub fn eval(&self, symtab: &SymbolTable) -> Option<i32> {
        match self {
            Expr::IntLiteral(n, _) => Some(*n),
            Expr::LVal(lval) => {
                let symbol = symtab.lookup(&lval.name)?;
                if symbol.kind == SymbolKind::Const {
                    symbol.value
                } else {
                    None
                }
            }
            Expr::UnaryOp(op, expr, _) => {
                let val = expr.eval(symtab)?;
                match op {
                    UnaryOp::Plus => Some(val),
                    UnaryOp::Minus => Some(val.wrapping_neg()),
                    UnaryOp::Not => Some(if val == 0 { 1 } else { 0 }),
                }
            }
            Expr::BinaryOp(op, lhs, rhs, _) => {
                let lval = lhs.eval(symtab)?;
                let rval = rhs.eval(symtab)?;
                match op {
                    BinaryOp::Add => Some(lval.wrapping_add(rval)),
                    BinaryOp::Sub => Some(lval.wrapping_sub(rval)),
                    BinaryOp::Mul => Some(lval.wrapping_mul(rval)),
                    BinaryOp::Div => {
                        if rval == 0 {
                            None
                        } else {
                            Some(lval.wrapping_div(rval))
                        }
                    }
                    BinaryOp::Mod => {
                        if rval == 0 {
                            None
                        } else {
                            Some(lval.wrapping_rem(rval))
                        }
                    }
                }
            }
            Expr::RelOp(op, lhs, rhs, _) => {
                let lval = lhs.eval(symtab)?;
                let rval = rhs.eval(symtab)?;
                let result = match op {
                    RelOp::Lt => lval < rval,
                    RelOp::Gt => lval > rval,
                    RelOp::Le => lval <= rval,
                    RelOp::Ge => lval >= rval,
                };
                Some(if result { 1 } else { 0 })
            }
            Expr::EqOp(op, lhs, rhs, _) => {
                let lval = lhs.eval(symtab)?;
                let rval = rhs.eval(symtab)?;
                let result = match op {
                    EqOp::Eq => lval == rval,
                    EqOp::Ne => lval != rval,
                };
                Some(if result { 1 } else { 0 })
            }
            // 逻辑与/或要求两侧都可折叠，不做编译期短路
            Expr::LAndOp(_, lhs, rhs, _) => {
                let lval = lhs.eval(symtab)?;
                let rval = rhs.eval(symtab)?;
                Some(if lval != 0 && rval != 0 { 1 } else { 0 })
            }
            Expr::LOrOp(_, lhs, rhs, _) => {
                let lval = lhs.eval(symtab)?;
                let rval = rhs.eval(symtab)?;
                Some(if lval != 0 || rval != 0 { 1 } else { 0 })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::front::ast::*;
    use crate::front::symtab::{Symbol, SymbolTable};

    fn num(n: i32) -> Expr {
        Expr::IntLiteral(n, Span::default())
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::BinaryOp(op, Box::new(lhs), Box::new(rhs), Span::default())
    }

    #[test]
    fn folds_arithmetic() {
        let symtab = SymbolTable::new();
        // 1 + 2 * 3
        let e = binary(BinaryOp::Add, num(1), binary(BinaryOp::Mul, num(2), num(3)));
        assert_eq!(e.eval(&symtab), Some(7));
        assert_eq!(binary(BinaryOp::Mod, num(7), num(3)).eval(&symtab), Some(1));
        assert_eq!(binary(BinaryOp::Div, num(-7), num(2)).eval(&symtab), Some(-3));
    }

    #[test]
    fn division_by_zero_does_not_fold() {
        let symtab = SymbolTable::new();
        assert_eq!(binary(BinaryOp::Div, num(1), num(0)).eval(&symtab), None);
        assert_eq!(binary(BinaryOp::Mod, num(1), num(0)).eval(&symtab), None);
        // 除零向上传播
        let e = binary(BinaryOp::Add, num(1), binary(BinaryOp::Div, num(2), num(0)));
        assert_eq!(e.eval(&symtab), None);
    }

    #[test]
    fn comparison_and_logic_yield_zero_or_one() {
        let symtab = SymbolTable::new();
        let lt = Expr::RelOp(RelOp::Lt, Box::new(num(1)), Box::new(num(2)), Span::default());
        assert_eq!(lt.eval(&symtab), Some(1));
        let ne = Expr::EqOp(EqOp::Ne, Box::new(num(5)), Box::new(num(5)), Span::default());
        assert_eq!(ne.eval(&symtab), Some(0));
        let not = Expr::UnaryOp(UnaryOp::Not, Box::new(num(9)), Span::default());
        assert_eq!(not.eval(&symtab), Some(0));
        let and = Expr::LAndOp(LAndOp::And, Box::new(num(1)), Box::new(num(0)), Span::default());
        assert_eq!(and.eval(&symtab), Some(0));
        let or = Expr::LOrOp(LOrOp::Or, Box::new(num(0)), Box::new(num(3)), Span::default());
        assert_eq!(or.eval(&symtab), Some(1));
    }

    #[test]
    fn logic_needs_both_sides_even_when_left_decides() {
        let mut symtab = SymbolTable::new();
        assert!(symtab.add(Symbol::variable("v".to_string())));
        let var = Expr::LVal(LVal { name: "v".to_string(), span: Span::default() });
        // 0 && v：左侧已经决定结果，但右侧不可折叠，整体不折叠
        let e = Expr::LAndOp(LAndOp::And, Box::new(num(0)), Box::new(var), Span::default());
        assert_eq!(e.eval(&symtab), None);
    }

    #[test]
    fn const_symbols_fold_and_vars_do_not() {
        let mut symtab = SymbolTable::new();
        assert!(symtab.add(Symbol::constant("c".to_string(), 5)));
        assert!(symtab.add(Symbol::variable("v".to_string())));
        let c = Expr::LVal(LVal { name: "c".to_string(), span: Span::default() });
        let v = Expr::LVal(LVal { name: "v".to_string(), span: Span::default() });
        assert_eq!(c.eval(&symtab), Some(5));
        assert_eq!(v.eval(&symtab), None);
        let missing = Expr::LVal(LVal { name: "w".to_string(), span: Span::default() });
        assert_eq!(missing.eval(&symtab), None);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let mut symtab = SymbolTable::new();
        assert!(symtab.add(Symbol::constant("c".to_string(), 4)));
        let c = Expr::LVal(LVal { name: "c".to_string(), span: Span::default() });
        let e = binary(BinaryOp::Mul, c, num(3));
        let first = e.eval(&symtab);
        assert_eq!(first, Some(12));
        assert_eq!(e.eval(&symtab), first);
    }
}
