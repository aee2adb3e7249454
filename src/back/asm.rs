//! 汇编代码生成
//!
//! 把原始程序翻译为 RV32 汇编：
//!
//! 1. **栈帧布局**
//!    - 预扫描统计栈槽（alloc、load、二元运算各占一个）
//!    - 帧大小 = 槽数 x 4 向上对齐到 16 字节
//!    - 序言调整 sp，尾声在每个 ret 前还原
//!
//! 2. **值放置**
//!    - 整数 0 直接用 x0，其余立即数按需 li
//!    - alloc 绑定栈槽；load 和二元运算结果进寄存器
//!    - `used_by` 超过一次的结果立即落栈，之后从栈槽取用
//!    - 暂存寄存器 t0-t2 按取模下标轮转
//!
//! 3. **算术化简**
//!    - 与 0 / 1 相关的恒等和吸收模式不发指令，直接传位置
//!    - 与 0 比较退化为 seqz / snez

use crate::back::context::Context;
use crate::back::insts::{Instruction, Reg};
use crate::back::raw::*;
use crate::back::regalloc::Loc;
use crate::CompilerError;

pub trait GenerateAsm {
    fn generate(&self, program: &RawProgram, ctx: &mut Context) -> Result<(), CompilerError>;
}

impl GenerateAsm for RawProgram {
    fn generate(&self, program: &RawProgram, ctx: &mut Context) -> Result<(), CompilerError> {
        ctx.program.push(Instruction::Section(".text".to_string()));
        ctx.program.push(Instruction::Global("main".to_string()));
        for func in &self.funcs {
            func.generate(program, ctx)?;
        }
        Ok(())
    }
}

impl GenerateAsm for RawFunction {
    fn generate(&self, _program: &RawProgram, ctx: &mut Context) -> Result<(), CompilerError> {
        ctx.reset_for_function();

        // 预扫描：统计需要栈槽的指令, 计算对齐后的帧大小
        let stack_slots = count_stack_slots(self);
        ctx.frame_size = align_to(stack_slots * 4, 16);

        ctx.program.push(Instruction::Label(self.name.clone()));
        if ctx.frame_size > 0 {
            ctx.update_stack_pointer(-ctx.frame_size);
        }

        for bb in &self.bbs {
            ctx.program.push(Instruction::Label(bb.name.clone()));
            for &inst in &bb.insts {
                generate_inst(inst, self, ctx)?;
            }
        }
        Ok(())
    }
}

fn generate_inst(
    inst: RawValue,
    func: &RawFunction,
    ctx: &mut Context,
) -> Result<(), CompilerError> {
    match func.value(inst).kind.clone() {
        RawValueKind::Alloc => generate_alloc(inst, func, ctx),
        RawValueKind::Load { src } => generate_load(inst, src, func, ctx),
        RawValueKind::Store { value, dest } => generate_store(value, dest, func, ctx),
        RawValueKind::Binary { op, lhs, rhs } => generate_binary(inst, op, lhs, rhs, func, ctx),
        RawValueKind::Branch { cond, true_bb, false_bb } => {
            generate_branch(cond, &true_bb, &false_bb, func, ctx)
        }
        RawValueKind::Jump { target } => generate_jump(&target, ctx),
        RawValueKind::Return { value } => generate_return(value, func, ctx),
        RawValueKind::Integer(_) => Ok(()),
    }
}

// alloc 只绑定栈槽, 不发指令
fn generate_alloc(
    inst: RawValue,
    func: &RawFunction,
    ctx: &mut Context,
) -> Result<(), CompilerError> {
    let offset = ctx.alloc_slot();
    if let Some(name) = &func.value(inst).name {
        ctx.var_offsets.insert(name.clone(), offset);
    }
    ctx.value_loc.insert(inst, Loc::Slot(offset));
    Ok(())
}

fn slot_offset(loc: Loc, what: &str) -> Result<i32, CompilerError> {
    match loc {
        Loc::Slot(offset) => Ok(offset),
        _ => Err(CompilerError::CodeGenerationError(format!(
            "{} is not a stack slot",
            what
        ))),
    }
}

fn generate_load(
    inst: RawValue,
    src: RawValue,
    func: &RawFunction,
    ctx: &mut Context,
) -> Result<(), CompilerError> {
    let offset = slot_offset(ctx.operand_loc(func, src)?, "Load source")?;
    let reg = ctx.alloc_reg();
    ctx.load_from_slot(reg, offset);
    set_result(inst, Loc::Reg(reg), func, ctx);
    Ok(())
}

fn generate_store(
    value: RawValue,
    dest: RawValue,
    func: &RawFunction,
    ctx: &mut Context,
) -> Result<(), CompilerError> {
    let value_loc = ctx.operand_loc(func, value)?;
    let reg = ctx.materialize(value_loc);
    let offset = slot_offset(ctx.operand_loc(func, dest)?, "Store destination")?;
    ctx.store_to_slot(reg, offset);
    Ok(())
}

fn is_zero(loc: Loc) -> bool {
    matches!(loc, Loc::Imm(0) | Loc::Reg(Reg::X0))
}

fn generate_binary(
    inst: RawValue,
    op: RawBinaryOp,
    lhs: RawValue,
    rhs: RawValue,
    func: &RawFunction,
    ctx: &mut Context,
) -> Result<(), CompilerError> {
    let lhs_loc = ctx.operand_loc(func, lhs)?;
    let rhs_loc = ctx.operand_loc(func, rhs)?;

    let result = match op {
        RawBinaryOp::Add => {
            if is_zero(lhs_loc) {
                rhs_loc
            } else if is_zero(rhs_loc) {
                lhs_loc
            } else {
                let l = ctx.materialize(lhs_loc);
                let r = ctx.materialize(rhs_loc);
                let dest = ctx.alloc_reg();
                ctx.program.push(Instruction::Add(dest, l, r));
                Loc::Reg(dest)
            }
        }
        RawBinaryOp::Sub => {
            if is_zero(rhs_loc) {
                lhs_loc
            } else if is_zero(lhs_loc) {
                let r = ctx.materialize(rhs_loc);
                let dest = ctx.alloc_reg();
                ctx.program.push(Instruction::Sub(dest, Reg::X0, r));
                Loc::Reg(dest)
            } else {
                let l = ctx.materialize(lhs_loc);
                let r = ctx.materialize(rhs_loc);
                let dest = ctx.alloc_reg();
                ctx.program.push(Instruction::Sub(dest, l, r));
                Loc::Reg(dest)
            }
        }
        RawBinaryOp::Mul => {
            if is_zero(lhs_loc) || is_zero(rhs_loc) {
                Loc::Reg(Reg::X0)
            } else if rhs_loc == Loc::Imm(1) {
                lhs_loc
            } else {
                let l = ctx.materialize(lhs_loc);
                let r = ctx.materialize(rhs_loc);
                let dest = ctx.alloc_reg();
                ctx.program.push(Instruction::Mul(dest, l, r));
                Loc::Reg(dest)
            }
        }
        RawBinaryOp::Div => {
            if is_zero(rhs_loc) {
                return Err(CompilerError::CodeGenerationError(
                    "Division by zero".to_string(),
                ));
            }
            if is_zero(lhs_loc) {
                Loc::Reg(Reg::X0)
            } else {
                let l = ctx.materialize(lhs_loc);
                let r = ctx.materialize(rhs_loc);
                let dest = ctx.alloc_reg();
                ctx.program.push(Instruction::Div(dest, l, r));
                Loc::Reg(dest)
            }
        }
        RawBinaryOp::Mod => {
            if is_zero(rhs_loc) {
                return Err(CompilerError::CodeGenerationError(
                    "Modulo by zero".to_string(),
                ));
            }
            let l = ctx.materialize(lhs_loc);
            let r = ctx.materialize(rhs_loc);
            let dest = ctx.alloc_reg();
            ctx.program.push(Instruction::Rem(dest, l, r));
            Loc::Reg(dest)
        }
        RawBinaryOp::Eq => {
            if is_zero(rhs_loc) {
                let l = ctx.materialize(lhs_loc);
                let dest = ctx.alloc_reg();
                ctx.program.push(Instruction::Seqz(dest, l));
                Loc::Reg(dest)
            } else {
                let l = ctx.materialize(lhs_loc);
                let r = ctx.materialize(rhs_loc);
                let dest = ctx.alloc_reg();
                ctx.program.push(Instruction::Xor(dest, l, r));
                ctx.program.push(Instruction::Seqz(dest, dest));
                Loc::Reg(dest)
            }
        }
        RawBinaryOp::NotEq => {
            if is_zero(rhs_loc) {
                let l = ctx.materialize(lhs_loc);
                let dest = ctx.alloc_reg();
                ctx.program.push(Instruction::Snez(dest, l));
                Loc::Reg(dest)
            } else {
                let l = ctx.materialize(lhs_loc);
                let r = ctx.materialize(rhs_loc);
                let dest = ctx.alloc_reg();
                ctx.program.push(Instruction::Xor(dest, l, r));
                ctx.program.push(Instruction::Snez(dest, dest));
                Loc::Reg(dest)
            }
        }
        RawBinaryOp::Lt => {
            let l = ctx.materialize(lhs_loc);
            let r = ctx.materialize(rhs_loc);
            let dest = ctx.alloc_reg();
            ctx.program.push(Instruction::Slt(dest, l, r));
            Loc::Reg(dest)
        }
        RawBinaryOp::Gt => {
            let l = ctx.materialize(lhs_loc);
            let r = ctx.materialize(rhs_loc);
            let dest = ctx.alloc_reg();
            ctx.program.push(Instruction::Sgt(dest, l, r));
            Loc::Reg(dest)
        }
        // a <= b 即 !(a > b)
        RawBinaryOp::Le => {
            let l = ctx.materialize(lhs_loc);
            let r = ctx.materialize(rhs_loc);
            let dest = ctx.alloc_reg();
            ctx.program.push(Instruction::Sgt(dest, l, r));
            ctx.program.push(Instruction::Seqz(dest, dest));
            Loc::Reg(dest)
        }
        // a >= b 即 !(a < b)
        RawBinaryOp::Ge => {
            let l = ctx.materialize(lhs_loc);
            let r = ctx.materialize(rhs_loc);
            let dest = ctx.alloc_reg();
            ctx.program.push(Instruction::Slt(dest, l, r));
            ctx.program.push(Instruction::Seqz(dest, dest));
            Loc::Reg(dest)
        }
        RawBinaryOp::And => {
            let l = ctx.materialize(lhs_loc);
            let r = ctx.materialize(rhs_loc);
            let dest = ctx.alloc_reg();
            ctx.program.push(Instruction::And(dest, l, r));
            Loc::Reg(dest)
        }
        RawBinaryOp::Or => {
            let l = ctx.materialize(lhs_loc);
            let r = ctx.materialize(rhs_loc);
            let dest = ctx.alloc_reg();
            ctx.program.push(Instruction::Or(dest, l, r));
            Loc::Reg(dest)
        }
    };

    set_result(inst, result, func, ctx);
    Ok(())
}

/// 记录指令结果的位置；被多次使用的结果立即落栈
fn set_result(inst: RawValue, result: Loc, func: &RawFunction, ctx: &mut Context) {
    if func.value(inst).used_by.len() > 1 {
        let reg = ctx.materialize(result);
        let offset = ctx.alloc_slot();
        ctx.store_to_slot(reg, offset);
        ctx.value_loc.insert(inst, Loc::Slot(offset));
    } else {
        ctx.value_loc.insert(inst, result);
    }
}

fn generate_branch(
    cond: RawValue,
    true_bb: &str,
    false_bb: &str,
    func: &RawFunction,
    ctx: &mut Context,
) -> Result<(), CompilerError> {
    let cond_loc = ctx.operand_loc(func, cond)?;
    let reg = ctx.materialize(cond_loc);
    ctx.program.push(Instruction::Bnez(reg, true_bb.to_string()));
    ctx.program.push(Instruction::J(false_bb.to_string()));
    Ok(())
}

fn generate_jump(target: &str, ctx: &mut Context) -> Result<(), CompilerError> {
    ctx.program.push(Instruction::J(target.to_string()));
    Ok(())
}

fn generate_return(
    value: Option<RawValue>,
    func: &RawFunction,
    ctx: &mut Context,
) -> Result<(), CompilerError> {
    if let Some(value) = value {
        match ctx.operand_loc(func, value)? {
            Loc::Imm(n) => ctx.program.push(Instruction::Li(Reg::A0, n)),
            Loc::Reg(reg) => ctx.program.push(Instruction::Mv(Reg::A0, reg)),
            Loc::Slot(offset) => ctx.load_from_slot(Reg::A0, offset),
        }
    }
    // 尾声：还原栈指针
    if ctx.frame_size > 0 {
        ctx.update_stack_pointer(ctx.frame_size);
    }
    ctx.program.push(Instruction::Ret);
    Ok(())
}

fn count_stack_slots(func: &RawFunction) -> i32 {
    let mut slots = 0;
    for bb in &func.bbs {
        for &inst in &bb.insts {
            if matches!(
                func.value(inst).kind,
                RawValueKind::Alloc | RawValueKind::Load { .. } | RawValueKind::Binary { .. }
            ) {
                slots += 1;
            }
        }
    }
    slots
}

fn align_to(x: i32, alignment: i32) -> i32 {
    (x + alignment - 1) / alignment * alignment
}

#[cfg(test)]
mod tests {
    use crate::back::generate_asm;

    #[test]
    fn trivial_return_has_no_frame() {
        let asm = generate_asm("fun @main(): i32 {\n%entry:\n  ret 0\n}\n").unwrap();
        assert!(asm.contains("  .text"));
        assert!(asm.contains("  .globl main"));
        assert!(asm.contains("main:"));
        assert!(asm.contains("entry:"));
        let ret_value = asm.find("li a0, 0").unwrap();
        let ret = asm.rfind("  ret").unwrap();
        assert!(ret_value < ret);
        assert!(!asm.contains("addi sp"));
    }

    #[test]
    fn frame_size_is_aligned_to_sixteen() {
        // 1 alloc + 1 load + 1 mul = 3 槽 -> 16 字节
        let asm = generate_asm(
            "fun @main(): i32 {\n%entry:\n  @x_0 = alloc i32\n  store 3, @x_0\n  %0 = load @x_0\n  %1 = mul %0, %0\n  ret %1\n}\n",
        )
        .unwrap();
        assert!(asm.contains("addi sp, sp, -16"));
        assert!(asm.contains("addi sp, sp, 16"));
    }

    #[test]
    fn multi_use_values_are_spilled() {
        let asm = generate_asm(
            "fun @main(): i32 {\n%entry:\n  @x_0 = alloc i32\n  store 3, @x_0\n  %0 = load @x_0\n  %1 = mul %0, %0\n  ret %1\n}\n",
        )
        .unwrap();
        // %0 被使用两次, 先落栈再两次取回
        assert!(asm.contains("sw t1, 4(sp)"));
        assert_eq!(asm.matches("lw").count(), 3);
    }

    #[test]
    fn zero_operands_fold_away() {
        let asm = generate_asm(
            "fun @main(): i32 {\n%entry:\n  @x_0 = alloc i32\n  store 5, @x_0\n  %0 = load @x_0\n  %1 = add 0, %0\n  %2 = sub %1, 0\n  %3 = mul %2, 1\n  ret %3\n}\n",
        )
        .unwrap();
        assert!(!asm.contains("add t"));
        assert!(!asm.contains("sub t"));
        assert!(!asm.contains("mul t"));
    }

    #[test]
    fn multiply_by_zero_returns_x0() {
        let asm = generate_asm(
            "fun @main(): i32 {\n%entry:\n  @x_0 = alloc i32\n  store 7, @x_0\n  %0 = load @x_0\n  %1 = mul %0, 0\n  ret %1\n}\n",
        )
        .unwrap();
        assert!(!asm.contains("mul"));
        assert!(asm.contains("mv a0, x0"));
    }

    #[test]
    fn compare_with_zero_uses_seqz_and_snez() {
        let asm = generate_asm(
            "fun @main(): i32 {\n%entry:\n  @x_0 = alloc i32\n  store 3, @x_0\n  %0 = load @x_0\n  %1 = eq %0, 0\n  ret %1\n}\n",
        )
        .unwrap();
        assert!(asm.contains("seqz"));
        assert!(!asm.contains("xor"));

        let asm = generate_asm(
            "fun @main(): i32 {\n%entry:\n  @x_0 = alloc i32\n  store 3, @x_0\n  %0 = load @x_0\n  %1 = ne %0, 0\n  ret %1\n}\n",
        )
        .unwrap();
        assert!(asm.contains("snez"));
        assert!(!asm.contains("xor"));
    }

    #[test]
    fn general_equality_goes_through_xor() {
        let asm = generate_asm(
            "fun @main(): i32 {\n%entry:\n  %0 = eq 4, 5\n  ret %0\n}\n",
        )
        .unwrap();
        assert!(asm.contains("xor"));
        assert!(asm.contains("seqz"));
    }

    #[test]
    fn le_and_ge_negate_the_strict_compare() {
        let asm = generate_asm(
            "fun @main(): i32 {\n%entry:\n  %0 = le 4, 5\n  %1 = ge %0, 2\n  ret %1\n}\n",
        )
        .unwrap();
        assert!(asm.contains("sgt"));
        assert!(asm.contains("slt"));
        assert_eq!(asm.matches("seqz").count(), 2);
    }

    #[test]
    fn branch_lowers_to_bnez_plus_jump() {
        let asm = generate_asm(
            "fun @main(): i32 {\n%entry:\n  br 1, %then_0, %else_0\n%then_0:\n  jump %end_0\n%else_0:\n  jump %end_0\n%end_0:\n  ret 0\n}\n",
        )
        .unwrap();
        assert!(asm.contains("bnez t0, then_0"));
        assert!(asm.contains("  j else_0"));
        assert!(asm.contains("then_0:"));
        assert!(asm.contains("else_0:"));
        assert!(asm.contains("end_0:"));
    }

    #[test]
    fn division_by_constant_zero_is_a_codegen_error() {
        let err = generate_asm("fun @main(): i32 {\n%entry:\n  %0 = div 1, 0\n  ret %0\n}\n")
            .unwrap_err();
        assert!(err.to_string().contains("Division by zero"));
        let err = generate_asm("fun @main(): i32 {\n%entry:\n  %0 = mod 1, 0\n  ret %0\n}\n")
            .unwrap_err();
        assert!(err.to_string().contains("Modulo by zero"));
    }

    #[test]
    fn generation_is_deterministic() {
        let ir = "fun @main(): i32 {\n%entry:\n  @a_0 = alloc i32\n  @b_1 = alloc i32\n  store 1, @a_0\n  store 2, @b_1\n  %0 = load @a_0\n  %1 = load @b_1\n  %2 = add %0, %1\n  ret %2\n}\n";
        let first = generate_asm(ir).unwrap();
        let second = generate_asm(ir).unwrap();
        assert_eq!(first, second);
    }
}
