//! 指令流清理
//!
//! if/while 的生成逻辑会保守地补上 jump，return 之后也可能跟着
//! 同一基本块内的残余代码。这里对线性指令流做两趟扫描：
//! 先删掉终结指令之后、下一个标签之前的不可达指令，
//! 再保证每个基本块只保留第一条 ret。

/// 终结指令: ret / jump / br
pub fn is_terminator(line: &str) -> bool {
    let line = line.trim_start();
    line == "ret" || line.starts_with("ret ") || line.starts_with("jump ") || line.starts_with("br ")
}

/// 基本块标签行, 如 `%then_0:`
pub fn is_label(line: &str) -> bool {
    line.trim_end().ends_with(':')
}

pub fn clean_instructions(insts: Vec<String>) -> Vec<String> {
    remove_duplicate_returns(remove_unreachable_instructions(insts))
}

fn remove_unreachable_instructions(insts: Vec<String>) -> Vec<String> {
    let mut result = Vec::with_capacity(insts.len());
    let mut reachable = true;
    for line in insts {
        if is_label(&line) {
            reachable = true;
            result.push(line);
            continue;
        }
        if !reachable {
            continue;
        }
        let terminates = is_terminator(&line);
        result.push(line);
        if terminates {
            reachable = false;
        }
    }
    result
}

fn remove_duplicate_returns(insts: Vec<String>) -> Vec<String> {
    let mut result = Vec::with_capacity(insts.len());
    let mut seen_ret = false;
    for line in insts {
        if is_label(&line) {
            seen_ret = false;
            result.push(line);
            continue;
        }
        if seen_ret {
            continue;
        }
        if line.trim_start().starts_with("ret") {
            seen_ret = true;
        }
        result.push(line);
    }
    result
}
