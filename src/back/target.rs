use crate::back::insts::Reg;

#[derive(Clone)]
pub struct TargetRegInfo {
    /// 轮转使用的暂存寄存器池
    pub scratch: Vec<Reg>,
}

impl TargetRegInfo {
    pub fn riscv() -> Self {
        // 多次使用的值会立即落栈, 三个暂存寄存器即可覆盖当前语言;
        // 池子可以扩到 t3-t6 而不影响其余逻辑
        Self {
            scratch: vec![Reg::T0, Reg::T1, Reg::T2],
        }
    }
}
