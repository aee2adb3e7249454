pub mod cleanup;
pub mod context;
pub mod expr_ir;
pub mod stmt_ir;

use crate::front::ast::*;
use crate::front::ir::cleanup::{clean_instructions, is_label};
use crate::front::ir::expr_ir::*;
use crate::front::ir::stmt_ir::*;
use crate::front::symtab::Symbol;
use crate::CompilerError;

pub use crate::front::ir::context::IrContext;

pub trait GenerateIr {
    type Output;
    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError>;
}

impl GenerateIr for CompUnit {
    type Output = String;

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        self.func.generate_ir(ctx)
    }
}

impl GenerateIr for FuncDef {
    type Output = String;

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        ctx.reset_for_function();

        // 函数体自身是一层作用域
        ctx.symtab.enter_scope();
        for item in &self.body {
            item.generate_ir(ctx)?;
        }
        ctx.symtab.exit_scope();

        // 函数体没有以终结指令收尾时补默认返回
        if !ctx.last_is_terminator() {
            match self.ty {
                DataType::Int => ctx.push_inst("ret 0".to_string()),
                DataType::Void => ctx.push_inst("ret void".to_string()),
            }
        }

        let is_entry_fun = self.name == "main" && self.ty == DataType::Int;

        // 组装：%entry 标签 + alloc 前导区 + 函数体，再过一遍清理
        let mut lines = Vec::new();
        if is_entry_fun {
            lines.push("%entry:".to_string());
        }
        lines.append(&mut ctx.allocs);
        lines.append(&mut ctx.insts);
        let lines = clean_instructions(lines);

        let ty_name = match self.ty {
            DataType::Int => "i32",
            DataType::Void => "void",
        };
        let mut result = format!("fun @{}(): {} {{\n", self.name, ty_name);
        for line in &lines {
            if is_label(line) {
                result.push_str(line);
            } else {
                result.push_str("  ");
                result.push_str(line);
            }
            result.push('\n');
        }
        result.push_str("}\n");
        Ok(result)
    }
}

impl GenerateIr for Stmt {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        match self {
            Stmt::Return(expr) => generate_return_stmt_ir(expr, ctx),
            Stmt::Assign(lval, expr) => generate_assign_stmt_ir(lval, expr, ctx),
            Stmt::Block(block) => generate_block_stmt_ir(block, ctx),
            Stmt::Expr(expr) => generate_expr_stmt_ir(expr, ctx),
            Stmt::If { cond, then_stmt, else_stmt, .. } => {
                generate_if_stmt_ir(cond, then_stmt, else_stmt.as_deref(), ctx)
            }
            Stmt::While { cond, body, .. } => generate_while_stmt_ir(cond, body, ctx),
            Stmt::Break(span) => generate_break_stmt_ir(span, ctx),
            Stmt::Continue(span) => generate_continue_stmt_ir(span, ctx),
        }
    }
}

impl GenerateIr for Expr {
    type Output = String;

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        match self {
            Expr::IntLiteral(n, _) => Ok(n.to_string()),
            Expr::LVal(lval) => generate_lval_ir(lval, ctx),
            Expr::UnaryOp(op, expr, _) => generate_unary_op_ir(op, expr, ctx),
            Expr::BinaryOp(op, lhs, rhs, _) => generate_binary_op_ir(op, lhs, rhs, ctx),
            Expr::RelOp(op, lhs, rhs, _) => generate_rel_op_ir(op, lhs, rhs, ctx),
            Expr::EqOp(op, lhs, rhs, _) => generate_eq_op_ir(op, lhs, rhs, ctx),
            Expr::LAndOp(_, lhs, rhs, _) => generate_land_op_ir(lhs, rhs, ctx),
            Expr::LOrOp(_, lhs, rhs, _) => generate_lor_op_ir(lhs, rhs, ctx),
        }
    }
}

impl GenerateIr for Decl {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        match self {
            Decl::ConstDecl(decl) => decl.generate_ir(ctx),
            Decl::VarDecl(decl) => decl.generate_ir(ctx),
        }
    }
}

impl GenerateIr for ConstDecl {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        for def in &self.defs {
            // 常量初始化表达式必须能在编译期求值
            let value = def.init.eval(&ctx.symtab).ok_or_else(|| {
                ctx.error_at_span(
                    format!("Initializer of constant `{}` is not a compile-time constant", def.name),
                    def.span,
                )
            })?;
            if !ctx.symtab.add(Symbol::constant(def.name.clone(), value)) {
                return Err(ctx.error_at_span(
                    format!("Symbol `{}` already declared in this scope", def.name),
                    def.span,
                ));
            }
        }
        Ok(())
    }
}

impl GenerateIr for VarDecl {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        for def in &self.defs {
            if !ctx.symtab.add(Symbol::variable(def.name.clone())) {
                return Err(ctx.error_at_span(
                    format!("Symbol `{}` already declared in this scope", def.name),
                    def.span,
                ));
            }
            let ir_name = ctx
                .symtab
                .lookup(&def.name)
                .map(|symbol| symbol.ir_name())
                .ok_or_else(|| {
                    CompilerError::IRGenerationError(format!(
                        "Symbol `{}` vanished after insertion",
                        def.name
                    ))
                })?;
            ctx.push_alloc(format!("@{} = alloc i32", ir_name));

            if let Some(init) = &def.init {
                // 能折叠就直接 store 字面值, 否则先生成初始化表达式
                match init.eval(&ctx.symtab) {
                    Some(value) => ctx.push_inst(format!("store {}, @{}", value, ir_name)),
                    None => {
                        let token = init.generate_ir(ctx)?;
                        ctx.push_inst(format!("store {}, @{}", token, ir_name));
                    }
                }
            }
        }
        Ok(())
    }
}
