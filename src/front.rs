use crate::front::ast::CompUnit;
use crate::front::ir::{GenerateIr, IrContext};
use crate::utils::SourceMap;
use crate::CompilerError;

pub mod ast;
pub mod consteval;
pub mod ir;
pub mod symtab;

/// 把 AST 翻译为文本形式的 IR
pub fn generate_ir(ast: &CompUnit, source_map: Option<SourceMap>) -> Result<String, CompilerError> {
    let mut ctx = IrContext::new(source_map);
    ast.generate_ir(&mut ctx)
}
