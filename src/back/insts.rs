use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reg {
    X0,                 // 恒为 0
    Sp,                 // 栈指针 (x2)
    A0,                 // 返回值
    T0, T1, T2, T3,     // 临时寄存器
    T4, T5, T6,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let r = match self {
            Reg::X0 => "x0",
            Reg::Sp => "sp",
            Reg::A0 => "a0",
            Reg::T0 => "t0", Reg::T1 => "t1", Reg::T2 => "t2", Reg::T3 => "t3",
            Reg::T4 => "t4", Reg::T5 => "t5", Reg::T6 => "t6",
        };
        write!(f, "{}", r)
    }
}

pub enum Instruction {
    // --- 加载与移动 ---
    Li(Reg, i32),        // li rd, imm (加载立即数)
    Mv(Reg, Reg),        // mv rd, rs (寄存器间移动)

    // --- 访存类 ---
    Lw(Reg, i32, Reg),   // lw rd, imm12(rs1) (从内存加载字)
    Sw(Reg, i32, Reg),   // sw rs2, imm12(rs1) (将字存入内存)

    // --- 运算类 (寄存器-寄存器) ---
    Add(Reg, Reg, Reg),  Sub(Reg, Reg, Reg),
    Mul(Reg, Reg, Reg),  Div(Reg, Reg, Reg), Rem(Reg, Reg, Reg),
    And(Reg, Reg, Reg),  Or(Reg, Reg, Reg),  Xor(Reg, Reg, Reg),
    Slt(Reg, Reg, Reg),  Sgt(Reg, Reg, Reg),

    // --- 运算类 (寄存器-立即数) ---
    Addi(Reg, Reg, i32), // addi rd, rs1, imm12

    // --- 比较类 (伪指令) ---
    Seqz(Reg, Reg),      // seqz rd, rs (rs == 0 ?)
    Snez(Reg, Reg),      // snez rd, rs (rs != 0 ?)

    // --- 控制转移类 ---
    Bnez(Reg, String),   // bnez rs, label (非 0 跳转)
    J(String),           // j label (无条件跳转)
    Ret,                 // ret (函数返回)

    // --- 汇编指示符 ---
    Label(String),
    Global(String),
    Section(String),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            // --- 加载与移动 ---
            Instruction::Li(rd, imm) => write!(f, "  li {}, {}", rd, imm),
            Instruction::Mv(rd, rs) => write!(f, "  mv {}, {}", rd, rs),

            // --- 访存类 (注意 offset(reg) 格式) ---
            Instruction::Lw(rd, imm, rs1) => write!(f, "  lw {}, {}({})", rd, imm, rs1),
            Instruction::Sw(rs2, imm, rs1) => write!(f, "  sw {}, {}({})", rs2, imm, rs1),

            // --- 运算类 (寄存器-寄存器) ---
            Instruction::Add(rd, r1, r2) => write!(f, "  add {}, {}, {}", rd, r1, r2),
            Instruction::Sub(rd, r1, r2) => write!(f, "  sub {}, {}, {}", rd, r1, r2),
            Instruction::Mul(rd, r1, r2) => write!(f, "  mul {}, {}, {}", rd, r1, r2),
            Instruction::Div(rd, r1, r2) => write!(f, "  div {}, {}, {}", rd, r1, r2),
            Instruction::Rem(rd, r1, r2) => write!(f, "  rem {}, {}, {}", rd, r1, r2),
            Instruction::And(rd, r1, r2) => write!(f, "  and {}, {}, {}", rd, r1, r2),
            Instruction::Or(rd, r1, r2) => write!(f, "  or {}, {}, {}", rd, r1, r2),
            Instruction::Xor(rd, r1, r2) => write!(f, "  xor {}, {}, {}", rd, r1, r2),
            Instruction::Slt(rd, r1, r2) => write!(f, "  slt {}, {}, {}", rd, r1, r2),
            Instruction::Sgt(rd, r1, r2) => write!(f, "  sgt {}, {}, {}", rd, r1, r2),

            // --- 运算类 (寄存器-立即数) ---
            Instruction::Addi(rd, rs, imm) => write!(f, "  addi {}, {}, {}", rd, rs, imm),

            // --- 比较类 (伪指令) ---
            Instruction::Seqz(rd, rs) => write!(f, "  seqz {}, {}", rd, rs),
            Instruction::Snez(rd, rs) => write!(f, "  snez {}, {}", rd, rs),

            // --- 控制转移类 ---
            Instruction::Bnez(rs, label) => write!(f, "  bnez {}, {}", rs, label),
            Instruction::J(label) => write!(f, "  j {}", label),
            Instruction::Ret => write!(f, "  ret"),

            // --- 汇编指示符 (注意 Label 不缩进) ---
            Instruction::Label(name) => write!(f, "{}:", name),
            Instruction::Global(name) => write!(f, "  .globl {}", name),
            Instruction::Section(name) => write!(f, "  {}", name),
        }
    }
}
