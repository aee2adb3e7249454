//! # 后端模块
//!
//! 后端把前端输出的文本 IR 翻译为 RISC-V 汇编代码。
//!
//! ## 主要功能
//!
//! 1. **IR 解析**
//!    - 把文本 IR 解析为原始程序（函数、基本块、带 `used_by` 边的值）
//!    - 校验基本块终结指令和操作数定义
//!
//! 2. **指令选择**
//!    - 将每种 IR 指令映射到 RISC-V 指令
//!    - 对 0 / 1 操作数做本地化简，与 0 比较用 seqz / snez
//!
//! 3. **寄存器与栈帧**
//!    - 暂存寄存器 t0-t2 轮转分配，多次使用的值落栈
//!    - 栈帧大小按槽数计算并对齐到 16 字节
//!
//! ## 模块结构
//!
//! - `parser`: 文本 IR -> 原始程序
//! - `raw`: 原始程序模型
//! - `asm`: 汇编生成，为每种指令实现生成逻辑
//! - `insts`: RISC-V 指令定义
//! - `program`: 汇编程序表示和格式化输出
//! - `context`: 代码生成上下文，管理寄存器、栈、值位置
//! - `regalloc`: 值位置与暂存寄存器池
//! - `target`: 目标寄存器信息

pub mod asm;
pub mod context;
pub mod insts;
pub mod parser;
pub mod program;
pub mod raw;
pub mod regalloc;
pub mod target;

use crate::back::asm::GenerateAsm;
use crate::back::context::Context;
use crate::back::target::TargetRegInfo;
use crate::CompilerError;

/// 从文本 IR 生成 RISC-V 汇编代码
pub fn generate_asm(ir: &str) -> Result<String, CompilerError> {
    let raw_program = parser::parse_program(ir)?;

    let target = TargetRegInfo::riscv();
    let mut ctx = Context::new(target);
    raw_program.generate(&raw_program, &mut ctx)?;

    Ok(ctx.program.dump())
}
