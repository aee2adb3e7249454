use crate::front::ast::{Block, BlockItem, Expr, LVal, Span, Stmt};
use crate::front::ir::{GenerateIr, IrContext};
use crate::front::symtab::SymbolKind;
use crate::CompilerError;

pub fn generate_return_stmt_ir(
    expr: &Option<Expr>,
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    match expr {
        Some(e) => {
            let token = e.generate_ir(ctx)?;
            ctx.push_inst(format!("ret {}", token));
        }
        None => ctx.push_inst("ret void".to_string()),
    }
    Ok(())
}

pub fn generate_assign_stmt_ir(
    lval: &LVal,
    expr: &Expr,
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    let symbol = ctx
        .symtab
        .lookup(&lval.name)
        .cloned()
        .ok_or_else(|| ctx.error_at_span(format!("Variable `{}` not found", lval.name), lval.span))?;
    if symbol.kind != SymbolKind::Var {
        return Err(ctx.error_at_span(
            format!("Cannot assign to `{}`: not a variable", lval.name),
            lval.span,
        ));
    }
    let token = expr.generate_ir(ctx)?;
    ctx.push_inst(format!("store {}, @{}", token, symbol.ir_name()));
    Ok(())
}

pub fn generate_block_stmt_ir(block: &Block, ctx: &mut IrContext) -> Result<(), CompilerError> {
    ctx.symtab.enter_scope();
    for item in block {
        item.generate_ir(ctx)?;
    }
    ctx.symtab.exit_scope();
    Ok(())
}

pub fn generate_expr_stmt_ir(
    expr: &Option<Expr>,
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    // 表达式语句只为副作用求值, 丢弃结果
    if let Some(e) = expr {
        e.generate_ir(ctx)?;
    }
    Ok(())
}

pub fn generate_if_stmt_ir(
    cond: &Expr,
    then_stmt: &Stmt,
    else_stmt: Option<&Stmt>,
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    let cond_tok = cond.generate_ir(ctx)?;
    let k = ctx.new_label_id();
    ctx.push_inst(format!("br {}, %then_{}, %else_{}", cond_tok, k, k));

    // then 分支
    ctx.push_inst(format!("%then_{}:", k));
    ctx.symtab.enter_scope();
    then_stmt.generate_ir(ctx)?;
    ctx.symtab.exit_scope();
    if !ctx.last_is_terminator() {
        ctx.push_inst(format!("jump %end_{}", k));
    }

    // else 分支（没有 else 时留空块，直接汇合）
    ctx.push_inst(format!("%else_{}:", k));
    if let Some(else_s) = else_stmt {
        ctx.symtab.enter_scope();
        else_s.generate_ir(ctx)?;
        ctx.symtab.exit_scope();
    }
    if !ctx.last_is_terminator() {
        ctx.push_inst(format!("jump %end_{}", k));
    }

    ctx.push_inst(format!("%end_{}:", k));
    Ok(())
}

pub fn generate_while_stmt_ir(
    cond: &Expr,
    body: &Stmt,
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    let k = ctx.new_label_id();

    ctx.push_inst(format!("jump %while_entry_{}", k));
    ctx.push_inst(format!("%while_entry_{}:", k));
    ctx.symtab.enter_scope();
    let cond_tok = cond.generate_ir(ctx)?;
    ctx.push_inst(format!("br {}, %while_body_{}, %while_end_{}", cond_tok, k, k));

    ctx.push_inst(format!("%while_body_{}:", k));
    ctx.loop_stack.push(k);
    let body_result = body.generate_ir(ctx);
    ctx.loop_stack.pop();
    body_result?;
    ctx.symtab.exit_scope();
    if !ctx.last_is_terminator() {
        ctx.push_inst(format!("jump %while_entry_{}", k));
    }

    ctx.push_inst(format!("%while_continue_{}:", k));
    ctx.push_inst(format!("jump %while_entry_{}", k));
    ctx.push_inst(format!("%while_end_{}:", k));
    Ok(())
}

pub fn generate_break_stmt_ir(span: &Span, ctx: &mut IrContext) -> Result<(), CompilerError> {
    let k = *ctx
        .loop_stack
        .last()
        .ok_or_else(|| ctx.error_at_span("break used outside of loop", *span))?;
    ctx.push_inst(format!("jump %while_end_{}", k));
    Ok(())
}

pub fn generate_continue_stmt_ir(span: &Span, ctx: &mut IrContext) -> Result<(), CompilerError> {
    let k = *ctx
        .loop_stack
        .last()
        .ok_or_else(|| ctx.error_at_span("continue used outside of loop", *span))?;
    ctx.push_inst(format!("jump %while_continue_{}", k));
    Ok(())
}

impl GenerateIr for BlockItem {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        match self {
            BlockItem::Decl(decl) => decl.generate_ir(ctx),
            BlockItem::Stmt(stmt) => stmt.generate_ir(ctx),
        }
    }
}
