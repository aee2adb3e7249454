use std::fmt;

use crate::back::insts::Instruction;

/// 汇编指令缓冲，按生成顺序持有指令并负责整体排版。
/// 每条指令的文本形式由 `Instruction` 的 Display 给出，
/// 这里只负责逐行拼接。
pub struct AsmProgram {
    instructions: Vec<Instruction>,
}

impl AsmProgram {
    pub fn new() -> Self {
        Self { instructions: Vec::new() }
    }

    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AsmProgram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for inst in &self.instructions {
            writeln!(f, "{}", inst)?;
        }
        Ok(())
    }
}
