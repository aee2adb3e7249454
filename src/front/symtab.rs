use std::collections::HashMap;

use crate::front::ast::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Const,
    Var,
    Func,
}

/// 符号表表项
///
/// `scope_id` 在插入时由符号表分配，整个编译过程中全局唯一，
/// 同名遮蔽的变量由此获得互不冲突的 IR 名字。
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub ty: DataType,
    pub ident: String,
    pub value: Option<i32>,
    pub scope_id: u32,
}

impl Symbol {
    pub fn constant(ident: String, value: i32) -> Self {
        Self {
            kind: SymbolKind::Const,
            ty: DataType::Int,
            ident,
            value: Some(value),
            scope_id: 0,
        }
    }

    pub fn variable(ident: String) -> Self {
        Self {
            kind: SymbolKind::Var,
            ty: DataType::Int,
            ident,
            value: None,
            scope_id: 0,
        }
    }

    /// 带作用域编号的 IR 变量名，如 `x_3`
    pub fn ir_name(&self) -> String {
        format!("{}_{}", self.ident, self.scope_id)
    }
}

/// 支持嵌套作用域的符号表
pub struct SymbolTable {
    scopes: Vec<HashMap<String, Symbol>>,
    next_scope_id: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            // 初始化全局作用域
            scopes: vec![HashMap::new()],
            next_scope_id: 0,
        }
    }

    /// Push a new scope onto the stack
    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the current scope from the stack
    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// 在当前作用域插入符号；同一作用域内重名时返回 false 且不改动表。
    /// 成功时为符号分配新的全局 scope_id，编号即使作用域退出也不复用。
    pub fn add(&mut self, mut symbol: Symbol) -> bool {
        let current_scope = match self.scopes.last_mut() {
            Some(scope) => scope,
            None => return false,
        };
        if current_scope.contains_key(&symbol.ident) {
            return false;
        }
        symbol.scope_id = self.next_scope_id;
        self.next_scope_id += 1;
        current_scope.insert(symbol.ident.clone(), symbol);
        true
    }

    /// Look up a symbol from the innermost scope outwards
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        for scope in self.scopes.iter().rev() {
            if let Some(symbol) = scope.get(name) {
                return Some(symbol);
            }
        }
        None
    }

    pub fn exists_in_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .map(|scope| scope.contains_key(name))
            .unwrap_or(false)
    }

    pub fn current_scope_level(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_innermost_shadowing_symbol() {
        let mut table = SymbolTable::new();
        assert!(table.add(Symbol::variable("a".to_string())));
        table.enter_scope();
        assert!(table.add(Symbol::variable("a".to_string())));

        let inner = table.lookup("a").cloned().unwrap();
        table.exit_scope();
        let outer = table.lookup("a").cloned().unwrap();

        assert_ne!(inner.scope_id, outer.scope_id);
        assert_ne!(inner.ir_name(), outer.ir_name());
    }

    #[test]
    fn duplicate_in_same_scope_is_rejected() {
        let mut table = SymbolTable::new();
        assert!(table.add(Symbol::variable("x".to_string())));
        assert!(!table.add(Symbol::constant("x".to_string(), 1)));
        // 插入失败不应改动原有表项
        assert_eq!(table.lookup("x").unwrap().kind, SymbolKind::Var);
    }

    #[test]
    fn scope_ids_are_never_reused() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        assert!(table.add(Symbol::variable("a".to_string())));
        let first = table.lookup("a").unwrap().scope_id;
        table.exit_scope();

        table.enter_scope();
        assert!(table.add(Symbol::variable("a".to_string())));
        let second = table.lookup("a").unwrap().scope_id;
        assert_ne!(first, second);
    }

    #[test]
    fn constants_are_frozen_at_insertion() {
        let mut table = SymbolTable::new();
        assert!(table.add(Symbol::constant("c".to_string(), 42)));
        let sym = table.lookup("c").unwrap();
        assert_eq!(sym.kind, SymbolKind::Const);
        assert_eq!(sym.value, Some(42));
    }

    #[test]
    fn symbols_become_invisible_after_scope_exit() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        assert!(table.add(Symbol::variable("tmp".to_string())));
        assert!(table.lookup("tmp").is_some());
        table.exit_scope();
        assert!(table.lookup("tmp").is_none());
        assert_eq!(table.current_scope_level(), 1);
    }
}
