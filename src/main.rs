#![allow(dead_code)]

use std::fs::read_to_string;

use lalrpop_util::lexer::Token;
use lalrpop_util::{lalrpop_mod, ParseError};

mod back;
mod front;
mod utils;

use crate::back::generate_asm;
use crate::front::generate_ir;
use utils::args::Params;
use utils::logger::print_error_and_exit;
use utils::SourceMap;

pub use utils::CompilerError;

// 引用 lalrpop 生成的解析器, 模块名与 sysy.lalrpop 对应
lalrpop_mod!(pub sysy);

fn main() {
    if let Err(e) = run() {
        print_error_and_exit(&e, 1);
    }
}

fn format_expected(expected: Vec<String>) -> String {
    if expected.is_empty() {
        "no expected tokens".to_string()
    } else {
        expected.join(", ")
    }
}

fn format_parse_error(source_map: &SourceMap, err: ParseError<usize, Token<'_>, &str>) -> String {
    match err {
        ParseError::InvalidToken { location } => {
            format!("Invalid token at {}", source_map.format_location(location))
        }
        ParseError::UnrecognizedEOF { location, expected } => {
            let expected = format_expected(expected);
            format!(
                "Unexpected end of file at {}. Expected: {}",
                source_map.format_location(location),
                expected
            )
        }
        ParseError::UnrecognizedToken { token, expected } => {
            let (start, tok, _end) = token;
            let expected = format_expected(expected);
            format!(
                "Unrecognized token {:?} at {}. Expected: {}",
                tok,
                source_map.format_location(start),
                expected
            )
        }
        ParseError::ExtraToken { token } => {
            let (start, tok, _end) = token;
            format!(
                "Extra token {:?} at {}",
                tok,
                source_map.format_location(start)
            )
        }
        ParseError::User { error } => {
            format!("Parse error: {}", error)
        }
    }
}

fn run() -> Result<(), CompilerError> {
    // 解析命令行参数
    let params = Params::from_args()?;

    // 读取输入文件
    let input = read_to_string(&params.input)?;
    let source_map = SourceMap::new(&input);

    // 调用 lalrpop 生成的 parser 解析输入文件
    let ast = sysy::CompUnitParser::new()
        .parse(&input)
        .map_err(|e| CompilerError::ParseError(format_parse_error(&source_map, e)))?;

    let ir = generate_ir(&ast, Some(source_map))?;

    if params.koopa {
        std::fs::write(&params.output, ir)?;
        return Ok(());
    }

    // -riscv: 重新解析 IR 文本并生成汇编
    let asm = generate_asm(&ir)?;
    std::fs::write(&params.output, asm)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::back::generate_asm;
    use crate::front::generate_ir;
    use crate::utils::SourceMap;

    fn compile_ir(src: &str) -> String {
        let ast = crate::sysy::CompUnitParser::new().parse(src).expect("parse failed");
        generate_ir(&ast, Some(SourceMap::new(src))).expect("lowering failed")
    }

    fn compile_asm(src: &str) -> String {
        generate_asm(&compile_ir(src)).expect("codegen failed")
    }

    #[test]
    fn return_zero_end_to_end() {
        let ir = compile_ir("int main() { return 0; }");
        assert!(ir.contains("fun @main(): i32 {"));
        assert!(ir.contains("ret 0"));

        let asm = compile_asm("int main() { return 0; }");
        let li = asm.find("li a0, 0").unwrap();
        let ret = asm.rfind("  ret").unwrap();
        assert!(li < ret);
    }

    #[test]
    fn folded_initializer_end_to_end() {
        let asm = compile_asm("int main() { int x = 1 + 2 * 3; return x; }");
        // 运行期只剩下存取与返回
        assert!(asm.contains("li t0, 7"));
        assert!(asm.contains("sw t0, 0(sp)"));
        assert!(asm.contains("lw t1, 0(sp)"));
        assert!(asm.contains("mv a0, t1"));
        assert!(!asm.contains("mul"));
    }

    #[test]
    fn constant_branch_is_kept_end_to_end() {
        let asm = compile_asm(
            "int main() { const int c = 5; int a = 0; if (c > 3) a = c; else a = -c; return a; }",
        );
        assert!(asm.contains("bnez"));
        assert!(asm.contains("then_0:"));
        assert!(asm.contains("else_0:"));
        assert!(asm.contains("end_0:"));
    }

    #[test]
    fn while_loop_end_to_end() {
        let asm = compile_asm(
            "int main() { int i = 0; int s = 0; \
             while (i < 10) { if (i == 5) break; s = s + i; i = i + 1; } return s; }",
        );
        assert!(asm.contains("while_entry_0:"));
        assert!(asm.contains("while_body_0:"));
        assert!(asm.contains("while_continue_0:"));
        assert!(asm.contains("while_end_0:"));
        assert!(asm.contains("j while_entry_0"));
    }

    #[test]
    fn shadowing_end_to_end() {
        let ir = compile_ir("int main() { int a; a = 3; { int a; a = 4; } return a; }");
        assert_eq!(ir.matches("= alloc i32").count(), 2);
        let asm = generate_asm(&ir).expect("codegen failed");
        // 两个同名变量各占一个栈槽
        assert!(asm.contains("sw t0, 0(sp)"));
        assert!(asm.contains("sw t1, 4(sp)"));
    }

    #[test]
    fn logical_and_end_to_end() {
        let ir = compile_ir("int main() { return 1 && 0; }");
        assert!(ir.contains("ne 1, 0"));
        assert!(ir.contains("ne 0, 0"));
        assert!(ir.contains("and"));
        let asm = generate_asm(&ir).expect("codegen failed");
        assert!(asm.contains("and"));
    }

    #[test]
    fn riscv_output_is_reproducible() {
        let src = "int main() { int i = 0; while (i < 4) { i = i + 1; } return i; }";
        assert_eq!(compile_asm(src), compile_asm(src));
    }

    #[test]
    fn comments_and_radix_literals_are_accepted() {
        let ir = compile_ir(
            "// line comment\nint main() { /* block\ncomment */ int a = 0x10; int b = 010; return a + b; }",
        );
        assert!(ir.contains("store 16, @a_0"));
        assert!(ir.contains("store 8, @b_1"));
    }

    #[test]
    fn dangling_else_binds_to_nearest_if() {
        let ir = compile_ir(
            "int main() { int a = 1; if (a) if (a > 1) a = 2; else a = 3; return a; }",
        );
        // 内层 if 拥有 else 分支, 外层没有: 内层编号为 1
        assert!(ir.contains("store 3, @a_0"));
        assert!(ir.contains("%else_1:"));
    }

    #[test]
    fn runtime_division_by_zero_fails_in_codegen() {
        let ir = compile_ir("int main() { int a = 1; return a / 0; }");
        assert!(generate_asm(&ir).is_err());
    }
}
