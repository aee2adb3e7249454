//! 解析后的原始程序模型
//!
//! 与文本 IR 结构一致：函数、基本块、指令。每个值带类型标签和
//! `used_by` 边，后端据此区分单次使用（留在寄存器里安全）和
//! 多次使用（必须落栈）。值存放在函数内的 arena 中，用句柄引用。

/// 函数内值的句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawValue(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawType {
    Unit,
    I32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawBinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawValueKind {
    Integer(i32),
    Alloc,
    Load { src: RawValue },
    Store { value: RawValue, dest: RawValue },
    Binary { op: RawBinaryOp, lhs: RawValue, rhs: RawValue },
    Branch { cond: RawValue, true_bb: String, false_bb: String },
    Jump { target: String },
    Return { value: Option<RawValue> },
}

#[derive(Debug, Clone)]
pub struct RawValueData {
    pub ty: RawType,
    /// alloc 的变量名（不带 @ 前缀）
    pub name: Option<String>,
    pub kind: RawValueKind,
    pub used_by: Vec<RawValue>,
}

#[derive(Debug, Clone)]
pub struct RawBasicBlock {
    /// 标签名（不带 % 前缀）
    pub name: String,
    pub insts: Vec<RawValue>,
}

#[derive(Debug)]
pub struct RawFunction {
    pub name: String,
    pub ret_ty: RawType,
    pub bbs: Vec<RawBasicBlock>,
    values: Vec<RawValueData>,
}

impl RawFunction {
    pub fn new(name: String, ret_ty: RawType) -> Self {
        Self {
            name,
            ret_ty,
            bbs: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn value(&self, handle: RawValue) -> &RawValueData {
        &self.values[handle.0]
    }

    pub fn add_value(&mut self, ty: RawType, name: Option<String>, kind: RawValueKind) -> RawValue {
        let handle = RawValue(self.values.len());
        self.values.push(RawValueData {
            ty,
            name,
            kind,
            used_by: Vec::new(),
        });
        handle
    }

    pub fn add_use(&mut self, used: RawValue, user: RawValue) {
        self.values[used.0].used_by.push(user);
    }
}

#[derive(Debug)]
pub struct RawProgram {
    pub funcs: Vec<RawFunction>,
}
