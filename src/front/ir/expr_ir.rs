use crate::front::ast::*;
use crate::front::ir::{GenerateIr, IrContext};
use crate::front::symtab::SymbolKind;
use crate::CompilerError;

// 辅助函数：生成二元运算指令，返回结果临时变量
fn push_binary_instruction(
    op: &str,
    lhs: String,
    rhs: String,
    ctx: &mut IrContext,
) -> String {
    let result = ctx.new_temp();
    ctx.push_inst(format!("%{} = {} {}, {}", result, op, lhs, rhs));
    format!("%{}", result)
}

/// 左值引用：常量直接替换为字面值，变量生成 load
pub fn generate_lval_ir(lval: &LVal, ctx: &mut IrContext) -> Result<String, CompilerError> {
    let symbol = ctx
        .symtab
        .lookup(&lval.name)
        .cloned()
        .ok_or_else(|| ctx.error_at_span(format!("Variable `{}` not found", lval.name), lval.span))?;
    match symbol.kind {
        SymbolKind::Const => {
            let value = symbol.value.ok_or_else(|| {
                ctx.error_at_span(format!("Constant `{}` has no value", lval.name), lval.span)
            })?;
            Ok(value.to_string())
        }
        SymbolKind::Var => {
            let result = ctx.new_temp();
            ctx.push_inst(format!("%{} = load @{}", result, symbol.ir_name()));
            Ok(format!("%{}", result))
        }
        SymbolKind::Func => Err(ctx.error_at_span(
            format!("`{}` is a function, not a value", lval.name),
            lval.span,
        )),
    }
}

pub fn generate_unary_op_ir(
    op: &UnaryOp,
    expr: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let operand = expr.generate_ir(ctx)?;
    match op {
        UnaryOp::Plus => Ok(operand),
        UnaryOp::Minus => Ok(push_binary_instruction("sub", "0".to_string(), operand, ctx)),
        UnaryOp::Not => Ok(push_binary_instruction("eq", operand, "0".to_string(), ctx)),
    }
}

pub fn generate_binary_op_ir(
    op: &BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let lhs_tok = lhs.generate_ir(ctx)?;
    let rhs_tok = rhs.generate_ir(ctx)?;
    let op_name = match op {
        BinaryOp::Add => "add",
        BinaryOp::Sub => "sub",
        BinaryOp::Mul => "mul",
        BinaryOp::Div => "div",
        BinaryOp::Mod => "mod",
    };
    Ok(push_binary_instruction(op_name, lhs_tok, rhs_tok, ctx))
}

pub fn generate_rel_op_ir(
    op: &RelOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let lhs_tok = lhs.generate_ir(ctx)?;
    let rhs_tok = rhs.generate_ir(ctx)?;
    let op_name = match op {
        RelOp::Lt => "lt",
        RelOp::Gt => "gt",
        RelOp::Le => "le",
        RelOp::Ge => "ge",
    };
    Ok(push_binary_instruction(op_name, lhs_tok, rhs_tok, ctx))
}

pub fn generate_eq_op_ir(
    op: &EqOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let lhs_tok = lhs.generate_ir(ctx)?;
    let rhs_tok = rhs.generate_ir(ctx)?;
    let op_name = match op {
        EqOp::Eq => "eq",
        EqOp::Ne => "ne",
    };
    Ok(push_binary_instruction(op_name, lhs_tok, rhs_tok, ctx))
}

/// 逻辑与：两侧都求值，各自用 `ne _, 0` 归一化为布尔后按位与。
/// 运行期不短路。
pub fn generate_land_op_ir(
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let lhs_tok = lhs.generate_ir(ctx)?;
    let rhs_tok = rhs.generate_ir(ctx)?;
    let lhs_bool = push_binary_instruction("ne", lhs_tok, "0".to_string(), ctx);
    let rhs_bool = push_binary_instruction("ne", rhs_tok, "0".to_string(), ctx);
    Ok(push_binary_instruction("and", lhs_bool, rhs_bool, ctx))
}

pub fn generate_lor_op_ir(
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<String, CompilerError> {
    let lhs_tok = lhs.generate_ir(ctx)?;
    let rhs_tok = rhs.generate_ir(ctx)?;
    let lhs_bool = push_binary_instruction("ne", lhs_tok, "0".to_string(), ctx);
    let rhs_bool = push_binary_instruction("ne", rhs_tok, "0".to_string(), ctx);
    Ok(push_binary_instruction("or", lhs_bool, rhs_bool, ctx))
}
