use crate::front::ir::cleanup;
use crate::front::symtab::SymbolTable;
use crate::utils::SourceMap;
use crate::CompilerError;

/// IR 生成上下文
///
/// 持有一次编译内共享的可变状态：符号表、临时变量编号、
/// 基本块标签编号、循环标签栈，以及当前函数的指令缓冲。
pub struct IrContext {
    pub symtab: SymbolTable,
    /// 函数入口处的 alloc 前导区，组装时放在 %entry 标签之后
    pub allocs: Vec<String>,
    /// 函数体的线性指令流（基本块标签内联其中）
    pub insts: Vec<String>,
    /// 循环标签编号栈，break/continue 取栈顶
    pub loop_stack: Vec<u32>,
    pub source_map: Option<SourceMap>,
    next_temp: u32,
    next_label: u32,
}

impl IrContext {
    pub fn new(source_map: Option<SourceMap>) -> Self {
        Self {
            symtab: SymbolTable::new(),
            allocs: Vec::new(),
            insts: Vec::new(),
            loop_stack: Vec::new(),
            source_map,
            next_temp: 0,
            next_label: 0,
        }
    }

    /// 进入新函数时重置计数器和指令缓冲
    pub fn reset_for_function(&mut self) {
        self.allocs.clear();
        self.insts.clear();
        self.loop_stack.clear();
        self.next_temp = 0;
        self.next_label = 0;
    }

    /// 分配新的临时变量编号 (%k)
    pub fn new_temp(&mut self) -> u32 {
        let id = self.next_temp;
        self.next_temp += 1;
        id
    }

    /// 为一个 if/while 结构分配标签编号
    pub fn new_label_id(&mut self) -> u32 {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    pub fn push_inst(&mut self, inst: String) {
        self.insts.push(inst);
    }

    pub fn push_alloc(&mut self, alloc: String) {
        self.allocs.push(alloc);
    }

    /// 当前指令流是否已经以终结指令收尾
    pub fn last_is_terminator(&self) -> bool {
        self.insts
            .last()
            .map(|line| cleanup::is_terminator(line))
            .unwrap_or(false)
    }

    pub fn format_location(&self, offset: usize) -> Option<String> {
        self.source_map.as_ref().map(|sm| sm.format_location(offset))
    }

    pub fn error_at_span(
        &self,
        message: impl Into<String>,
        span: crate::front::ast::Span,
    ) -> CompilerError {
        let mut msg = message.into();
        if let Some(loc) = self.format_location(span.begin) {
            msg = format!("{} at {}", msg, loc);
        }
        CompilerError::IRGenerationError(msg)
    }
}
