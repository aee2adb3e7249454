use std::collections::HashMap;

use crate::back::insts::{Instruction, Reg};
use crate::back::program::AsmProgram;
use crate::back::raw::{RawFunction, RawValue, RawValueKind};
use crate::back::regalloc::{Loc, RegPool};
use crate::back::target::TargetRegInfo;
use crate::CompilerError;

/// 栈偏移能否直接放进 lw/sw/addi 的 12 位立即数
fn imm12(offset: i32) -> Option<i32> {
    if (-2048..=2047).contains(&offset) {
        Some(offset)
    } else {
        None
    }
}

/// 汇编代码生成上下文
///
/// 维护单个函数生成期间的全部状态：
/// - 值到位置（寄存器 / 栈槽 / 立即数）的映射
/// - 变量名到栈偏移的映射
/// - 暂存寄存器轮转和栈槽分配游标
/// - 栈帧大小（16 字节对齐）
pub struct Context {
    pub program: AsmProgram,
    pub target: TargetRegInfo,
    pub value_loc: HashMap<RawValue, Loc>,
    pub var_offsets: HashMap<String, i32>,
    pub frame_size: i32,
    pool: RegPool,
    cur_offset: i32,
}

impl Context {
    pub fn new(target: TargetRegInfo) -> Self {
        let pool = RegPool::new(target.scratch.clone());
        Self {
            program: AsmProgram::new(),
            target,
            value_loc: HashMap::new(),
            var_offsets: HashMap::new(),
            frame_size: 0,
            pool,
            cur_offset: 0,
        }
    }

    pub fn reset_for_function(&mut self) {
        self.value_loc.clear();
        self.var_offsets.clear();
        self.frame_size = 0;
        self.pool.reset();
        self.cur_offset = 0;
    }

    /// 轮转分配一个暂存寄存器
    pub fn alloc_reg(&mut self) -> Reg {
        self.pool.next()
    }

    /// 分配下一个 4 字节栈槽, 返回相对 sp 的偏移
    pub fn alloc_slot(&mut self) -> i32 {
        let offset = self.cur_offset;
        self.cur_offset += 4;
        offset
    }

    /// 取操作数当前的位置；整数字面量退化为立即数
    pub fn operand_loc(&self, func: &RawFunction, value: RawValue) -> Result<Loc, CompilerError> {
        if let Some(loc) = self.value_loc.get(&value) {
            return Ok(*loc);
        }
        match func.value(value).kind {
            RawValueKind::Integer(n) => Ok(Loc::Imm(n)),
            _ => Err(CompilerError::CodeGenerationError(
                "Operand has no assigned location".to_string(),
            )),
        }
    }

    /// 把一个位置变成寄存器：0 用 x0，其余立即数 li，栈上的值 lw
    pub fn materialize(&mut self, loc: Loc) -> Reg {
        match loc {
            Loc::Reg(reg) => reg,
            Loc::Imm(0) => Reg::X0,
            Loc::Imm(value) => {
                let reg = self.alloc_reg();
                self.program.push(Instruction::Li(reg, value));
                reg
            }
            Loc::Slot(offset) => {
                let reg = self.alloc_reg();
                self.load_from_slot(reg, offset);
                reg
            }
        }
    }

    /// 从栈槽读入寄存器；偏移超出 imm12 时经暂存寄存器合成地址
    pub fn load_from_slot(&mut self, reg: Reg, offset: i32) {
        match imm12(offset) {
            Some(imm) => self.program.push(Instruction::Lw(reg, imm, Reg::Sp)),
            None => {
                let addr = self.slot_address(offset);
                self.program.push(Instruction::Lw(reg, 0, addr));
            }
        }
    }

    /// 把寄存器写入栈槽
    pub fn store_to_slot(&mut self, reg: Reg, offset: i32) {
        match imm12(offset) {
            Some(imm) => self.program.push(Instruction::Sw(reg, imm, Reg::Sp)),
            None => {
                let addr = self.slot_address(offset);
                self.program.push(Instruction::Sw(reg, 0, addr));
            }
        }
    }

    fn slot_address(&mut self, offset: i32) -> Reg {
        let addr = self.alloc_reg();
        self.program.push(Instruction::Li(addr, offset));
        self.program.push(Instruction::Add(addr, Reg::Sp, addr));
        addr
    }

    /// 生成调整栈指针的指令
    ///
    /// offset 超出 imm12 时经由 t0 中转
    pub fn update_stack_pointer(&mut self, offset: i32) {
        match imm12(offset) {
            Some(imm) => self.program.push(Instruction::Addi(Reg::Sp, Reg::Sp, imm)),
            None => {
                self.program.push(Instruction::Li(Reg::T0, offset));
                self.program.push(Instruction::Add(Reg::Sp, Reg::Sp, Reg::T0));
            }
        }
    }
}
