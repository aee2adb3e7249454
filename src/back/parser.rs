//! 文本 IR 解析
//!
//! 把前端输出的 IR 文本逐行解析为原始程序。解析的同时从每个
//! 操作数位置回填 `used_by` 边，并检查基本块以终结指令收尾、
//! 操作数先定义后使用。输入不合法时直接使编译失败，不做恢复。

use std::collections::HashMap;

use crate::back::raw::*;
use crate::CompilerError;

fn malformed(msg: impl Into<String>) -> CompilerError {
    CompilerError::IrParseError(msg.into())
}

pub fn parse_program(input: &str) -> Result<RawProgram, CompilerError> {
    let mut funcs = Vec::new();
    let mut lines = input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());

    while let Some(line) = lines.next() {
        if !line.starts_with("fun @") {
            return Err(malformed(format!("Expected function declaration, got `{}`", line)));
        }
        let mut func = parse_function_header(line)?;
        let mut body = Vec::new();
        loop {
            match lines.next() {
                Some("}") => break,
                Some(inner) => body.push(inner),
                None => return Err(malformed(format!("Function `{}` is not closed", func.name))),
            }
        }
        parse_function_body(&mut func, &body)?;
        funcs.push(func);
    }

    if funcs.is_empty() {
        return Err(malformed("Program contains no functions"));
    }
    Ok(RawProgram { funcs })
}

// `fun @name(): type {`
fn parse_function_header(line: &str) -> Result<RawFunction, CompilerError> {
    let rest = line
        .strip_prefix("fun @")
        .ok_or_else(|| malformed(format!("Bad function header `{}`", line)))?;
    let (name, rest) = rest
        .split_once("():")
        .ok_or_else(|| malformed(format!("Bad function header `{}`", line)))?;
    let ty_text = rest
        .strip_suffix('{')
        .ok_or_else(|| malformed(format!("Function header `{}` must open a body", line)))?
        .trim();
    let ret_ty = parse_type(ty_text)?;
    if name.is_empty() {
        return Err(malformed("Function has an empty name"));
    }
    Ok(RawFunction::new(name.to_string(), ret_ty))
}

fn parse_type(text: &str) -> Result<RawType, CompilerError> {
    match text {
        "i32" => Ok(RawType::I32),
        "void" => Ok(RawType::Unit),
        other => Err(malformed(format!("Unknown type `{}`", other))),
    }
}

struct FunctionParser<'a> {
    func: &'a mut RawFunction,
    /// %k 临时变量 -> 值句柄
    temps: HashMap<u32, RawValue>,
    /// @name 栈槽 -> 值句柄
    slots: HashMap<String, RawValue>,
}

fn parse_function_body(func: &mut RawFunction, body: &[&str]) -> Result<(), CompilerError> {
    let mut parser = FunctionParser {
        func,
        temps: HashMap::new(),
        slots: HashMap::new(),
    };
    for line in body {
        if line.starts_with('%') && line.ends_with(':') {
            parser.begin_block(&line[1..line.len() - 1])?;
        } else {
            parser.parse_instruction(line)?;
        }
    }
    parser.finish()
}

impl<'a> FunctionParser<'a> {
    fn begin_block(&mut self, name: &str) -> Result<(), CompilerError> {
        self.check_last_block_terminated()?;
        if self.func.bbs.iter().any(|bb| bb.name == name) {
            return Err(malformed(format!("Duplicate basic block label `%{}`", name)));
        }
        self.func.bbs.push(RawBasicBlock {
            name: name.to_string(),
            insts: Vec::new(),
        });
        Ok(())
    }

    fn check_last_block_terminated(&self) -> Result<(), CompilerError> {
        if let Some(bb) = self.func.bbs.last() {
            let terminated = bb
                .insts
                .last()
                .map(|&inst| is_terminator(&self.func.value(inst).kind))
                .unwrap_or(false);
            if !terminated {
                return Err(malformed(format!(
                    "Basic block `%{}` does not end with a terminator",
                    bb.name
                )));
            }
        }
        Ok(())
    }

    fn parse_instruction(&mut self, line: &str) -> Result<(), CompilerError> {
        if self.func.bbs.is_empty() {
            return Err(malformed(format!("Instruction `{}` outside any basic block", line)));
        }
        // 终结指令之后、下一个标签之前不允许再有指令
        let last_terminated = self
            .func
            .bbs
            .last()
            .and_then(|bb| bb.insts.last())
            .map(|&inst| is_terminator(&self.func.value(inst).kind))
            .unwrap_or(false);
        if last_terminated {
            return Err(malformed(format!("Instruction `{}` after a terminator", line)));
        }

        let inst = if let Some(rest) = line.strip_prefix("store ") {
            self.parse_store(rest)?
        } else if let Some(rest) = line.strip_prefix("br ") {
            self.parse_branch(rest)?
        } else if let Some(rest) = line.strip_prefix("jump ") {
            self.parse_jump(rest)?
        } else if line == "ret" || line == "ret void" {
            self.func.add_value(RawType::Unit, None, RawValueKind::Return { value: None })
        } else if let Some(rest) = line.strip_prefix("ret ") {
            let value = self.parse_operand(rest)?;
            let inst = self
                .func
                .add_value(RawType::Unit, None, RawValueKind::Return { value: Some(value) });
            self.func.add_use(value, inst);
            inst
        } else if line.starts_with('@') {
            self.parse_alloc(line)?
        } else if line.starts_with('%') {
            self.parse_definition(line)?
        } else {
            return Err(malformed(format!("Unrecognized instruction `{}`", line)));
        };

        if let Some(bb) = self.func.bbs.last_mut() {
            bb.insts.push(inst);
        }
        Ok(())
    }

    // `@name = alloc i32`
    fn parse_alloc(&mut self, line: &str) -> Result<RawValue, CompilerError> {
        let (name, rest) = line[1..]
            .split_once(" = ")
            .ok_or_else(|| malformed(format!("Bad instruction `{}`", line)))?;
        let ty_text = rest
            .strip_prefix("alloc ")
            .ok_or_else(|| malformed(format!("Bad instruction `{}`", line)))?;
        parse_type(ty_text.trim())?;
        if self.slots.contains_key(name) {
            return Err(malformed(format!("`@{}` is alloc'd more than once", name)));
        }
        let inst = self
            .func
            .add_value(RawType::I32, Some(name.to_string()), RawValueKind::Alloc);
        self.slots.insert(name.to_string(), inst);
        Ok(inst)
    }

    // `store <value>, @name`
    fn parse_store(&mut self, rest: &str) -> Result<RawValue, CompilerError> {
        let (value_text, dest_text) = rest
            .split_once(", ")
            .ok_or_else(|| malformed(format!("Bad store `store {}`", rest)))?;
        let value = self.parse_operand(value_text)?;
        let dest = self.parse_slot(dest_text)?;
        let inst = self
            .func
            .add_value(RawType::Unit, None, RawValueKind::Store { value, dest });
        self.func.add_use(value, inst);
        self.func.add_use(dest, inst);
        Ok(inst)
    }

    // `%k = load @name` 或 `%k = <binop> <a>, <b>`
    fn parse_definition(&mut self, line: &str) -> Result<RawValue, CompilerError> {
        let (def_text, rest) = line
            .split_once(" = ")
            .ok_or_else(|| malformed(format!("Bad instruction `{}`", line)))?;
        let temp_id = parse_temp_id(def_text)?;
        if self.temps.contains_key(&temp_id) {
            return Err(malformed(format!("`%{}` is assigned more than once", temp_id)));
        }

        let inst = if let Some(src_text) = rest.strip_prefix("load ") {
            let src = self.parse_slot(src_text)?;
            let inst = self
                .func
                .add_value(RawType::I32, None, RawValueKind::Load { src });
            self.func.add_use(src, inst);
            inst
        } else {
            let (op_text, operands) = rest
                .split_once(' ')
                .ok_or_else(|| malformed(format!("Bad instruction `{}`", line)))?;
            let op = parse_binary_op(op_text)?;
            let (lhs_text, rhs_text) = operands
                .split_once(", ")
                .ok_or_else(|| malformed(format!("Bad instruction `{}`", line)))?;
            let lhs = self.parse_operand(lhs_text)?;
            let rhs = self.parse_operand(rhs_text)?;
            let inst = self
                .func
                .add_value(RawType::I32, None, RawValueKind::Binary { op, lhs, rhs });
            self.func.add_use(lhs, inst);
            self.func.add_use(rhs, inst);
            inst
        };
        self.temps.insert(temp_id, inst);
        Ok(inst)
    }

    // `br <value>, %true, %false`
    fn parse_branch(&mut self, rest: &str) -> Result<RawValue, CompilerError> {
        let parts: Vec<&str> = rest.split(", ").collect();
        if parts.len() != 3 {
            return Err(malformed(format!("Bad branch `br {}`", rest)));
        }
        let cond = self.parse_operand(parts[0])?;
        let true_bb = parse_label_ref(parts[1])?;
        let false_bb = parse_label_ref(parts[2])?;
        let inst = self.func.add_value(
            RawType::Unit,
            None,
            RawValueKind::Branch { cond, true_bb, false_bb },
        );
        self.func.add_use(cond, inst);
        Ok(inst)
    }

    // `jump %target`
    fn parse_jump(&mut self, rest: &str) -> Result<RawValue, CompilerError> {
        let target = parse_label_ref(rest)?;
        Ok(self
            .func
            .add_value(RawType::Unit, None, RawValueKind::Jump { target }))
    }

    /// 操作数: 十进制立即数或 %k 临时变量
    fn parse_operand(&mut self, text: &str) -> Result<RawValue, CompilerError> {
        let text = text.trim();
        if let Some(id_text) = text.strip_prefix('%') {
            let temp_id = parse_temp_id_digits(id_text)?;
            return self
                .temps
                .get(&temp_id)
                .copied()
                .ok_or_else(|| malformed(format!("Use of undefined value `%{}`", temp_id)));
        }
        let value: i32 = text
            .parse()
            .map_err(|_| malformed(format!("Bad operand `{}`", text)))?;
        Ok(self
            .func
            .add_value(RawType::I32, None, RawValueKind::Integer(value)))
    }

    fn parse_slot(&self, text: &str) -> Result<RawValue, CompilerError> {
        let name = text
            .trim()
            .strip_prefix('@')
            .ok_or_else(|| malformed(format!("Expected `@name`, got `{}`", text)))?;
        self.slots
            .get(name)
            .copied()
            .ok_or_else(|| malformed(format!("Use of `@{}` before its alloc", name)))
    }

    fn finish(self) -> Result<(), CompilerError> {
        self.check_last_block_terminated()?;
        if self.func.bbs.is_empty() {
            return Err(malformed(format!("Function `{}` has no basic blocks", self.func.name)));
        }
        // 跳转目标必须是本函数内的标签
        let labels: Vec<String> = self.func.bbs.iter().map(|bb| bb.name.clone()).collect();
        for bb in &self.func.bbs {
            for &inst in &bb.insts {
                match &self.func.value(inst).kind {
                    RawValueKind::Jump { target } => {
                        if !labels.iter().any(|label| label == target) {
                            return Err(malformed(format!("Jump to unknown label `%{}`", target)));
                        }
                    }
                    RawValueKind::Branch { true_bb, false_bb, .. } => {
                        for target in [true_bb, false_bb] {
                            if !labels.iter().any(|label| label == target) {
                                return Err(malformed(format!(
                                    "Branch to unknown label `%{}`",
                                    target
                                )));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

fn is_terminator(kind: &RawValueKind) -> bool {
    matches!(
        kind,
        RawValueKind::Return { .. } | RawValueKind::Jump { .. } | RawValueKind::Branch { .. }
    )
}

fn parse_temp_id(text: &str) -> Result<u32, CompilerError> {
    let digits = text
        .strip_prefix('%')
        .ok_or_else(|| malformed(format!("Expected `%N`, got `{}`", text)))?;
    parse_temp_id_digits(digits)
}

fn parse_temp_id_digits(digits: &str) -> Result<u32, CompilerError> {
    digits
        .parse()
        .map_err(|_| malformed(format!("Bad temporary `%{}`", digits)))
}

fn parse_label_ref(text: &str) -> Result<String, CompilerError> {
    text.trim()
        .strip_prefix('%')
        .map(str::to_string)
        .ok_or_else(|| malformed(format!("Expected `%label`, got `{}`", text)))
}

fn parse_binary_op(text: &str) -> Result<RawBinaryOp, CompilerError> {
    match text {
        "add" => Ok(RawBinaryOp::Add),
        "sub" => Ok(RawBinaryOp::Sub),
        "mul" => Ok(RawBinaryOp::Mul),
        "div" => Ok(RawBinaryOp::Div),
        "mod" => Ok(RawBinaryOp::Mod),
        "eq" => Ok(RawBinaryOp::Eq),
        "ne" => Ok(RawBinaryOp::NotEq),
        "lt" => Ok(RawBinaryOp::Lt),
        "le" => Ok(RawBinaryOp::Le),
        "gt" => Ok(RawBinaryOp::Gt),
        "ge" => Ok(RawBinaryOp::Ge),
        "and" => Ok(RawBinaryOp::And),
        "or" => Ok(RawBinaryOp::Or),
        other => Err(malformed(format!("Unknown operator `{}`", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
fun @main(): i32 {
%entry:
  @x_0 = alloc i32
  store 3, @x_0
  %0 = load @x_0
  %1 = mul %0, %0
  ret %1
}
";

    #[test]
    fn parses_a_function_with_blocks_and_values() {
        let program = parse_program(SAMPLE).unwrap();
        assert_eq!(program.funcs.len(), 1);
        let func = &program.funcs[0];
        assert_eq!(func.name, "main");
        assert_eq!(func.ret_ty, RawType::I32);
        assert_eq!(func.bbs.len(), 1);
        assert_eq!(func.bbs[0].name, "entry");
        assert_eq!(func.bbs[0].insts.len(), 5);
    }

    #[test]
    fn used_by_counts_every_operand_position() {
        let program = parse_program(SAMPLE).unwrap();
        let func = &program.funcs[0];
        let load = func.bbs[0].insts[2];
        // %0 同时是 mul 的两个操作数
        assert_eq!(func.value(load).used_by.len(), 2);
        let alloc = func.bbs[0].insts[0];
        // store 的目的地 + load 的来源
        assert_eq!(func.value(alloc).used_by.len(), 2);
        let mul = func.bbs[0].insts[3];
        assert_eq!(func.value(mul).used_by.len(), 1);
    }

    #[test]
    fn parses_branches_and_jumps() {
        let program = parse_program(
            "fun @main(): i32 {\n%entry:\n  br 1, %then_0, %else_0\n%then_0:\n  jump %end_0\n%else_0:\n  jump %end_0\n%end_0:\n  ret 0\n}\n",
        )
        .unwrap();
        let func = &program.funcs[0];
        assert_eq!(func.bbs.len(), 4);
        match &func.value(func.bbs[0].insts[0]).kind {
            RawValueKind::Branch { true_bb, false_bb, .. } => {
                assert_eq!(true_bb, "then_0");
                assert_eq!(false_bb, "else_0");
            }
            other => panic!("expected branch, got {:?}", other),
        }
    }

    #[test]
    fn rejects_block_without_terminator() {
        let err = parse_program("fun @main(): i32 {\n%entry:\n  @x_0 = alloc i32\n}\n").unwrap_err();
        assert!(err.to_string().contains("terminator"));
    }

    #[test]
    fn rejects_undefined_operands() {
        let err = parse_program("fun @main(): i32 {\n%entry:\n  ret %3\n}\n").unwrap_err();
        assert!(err.to_string().contains("undefined"));
        let err = parse_program("fun @main(): i32 {\n%entry:\n  store 1, @x_0\n  ret 0\n}\n")
            .unwrap_err();
        assert!(err.to_string().contains("before its alloc"));
    }

    #[test]
    fn rejects_instruction_after_terminator() {
        let err = parse_program("fun @main(): i32 {\n%entry:\n  ret 0\n  %0 = add 1, 2\n  ret %0\n}\n")
            .unwrap_err();
        assert!(err.to_string().contains("after a terminator"));
    }

    #[test]
    fn rejects_duplicate_temporaries() {
        let err = parse_program(
            "fun @main(): i32 {\n%entry:\n  %0 = add 1, 2\n  %0 = add 3, 4\n  ret %0\n}\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("assigned more than once"));
    }

    #[test]
    fn rejects_jump_to_unknown_label() {
        let err = parse_program("fun @main(): i32 {\n%entry:\n  jump %nowhere\n}\n").unwrap_err();
        assert!(err.to_string().contains("unknown label"));
    }

    #[test]
    fn accepts_ret_void_and_negative_immediates() {
        let program = parse_program(
            "fun @side(): void {\n%entry:\n  @x_0 = alloc i32\n  store -5, @x_0\n  ret void\n}\n",
        )
        .unwrap();
        let func = &program.funcs[0];
        assert_eq!(func.ret_ty, RawType::Unit);
        match &func.value(func.bbs[0].insts[2]).kind {
            RawValueKind::Return { value } => assert!(value.is_none()),
            other => panic!("expected return, got {:?}", other),
        }
    }
}
