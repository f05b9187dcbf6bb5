//! Two-scope symbol table: class scope (static/field) and subroutine scope
//! (argument/local), each with its own independent running count.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Static,
    Field,
    Arg,
    Var,
}

#[derive(Debug, Clone)]
struct Entry {
    type_name: String,
    kind: Kind,
    index: u16,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    class_scope: HashMap<String, Entry>,
    subroutine_scope: HashMap<String, Entry>,
    static_count: u16,
    field_count: u16,
    arg_count: u16,
    var_count: u16,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the subroutine scope and its counters. Called at the start of
    /// each `compile_subroutine`.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.arg_count = 0;
        self.var_count = 0;
    }

    pub fn define(&mut self, name: &str, type_name: &str, kind: Kind) {
        let index = match kind {
            Kind::Static => {
                let i = self.static_count;
                self.static_count += 1;
                i
            }
            Kind::Field => {
                let i = self.field_count;
                self.field_count += 1;
                i
            }
            Kind::Arg => {
                let i = self.arg_count;
                self.arg_count += 1;
                i
            }
            Kind::Var => {
                let i = self.var_count;
                self.var_count += 1;
                i
            }
        };
        let entry = Entry {
            type_name: type_name.to_string(),
            kind,
            index,
        };
        match kind {
            Kind::Static | Kind::Field => {
                self.class_scope.insert(name.to_string(), entry);
            }
            Kind::Arg | Kind::Var => {
                self.subroutine_scope.insert(name.to_string(), entry);
            }
        }
    }

    #[must_use]
    pub fn var_count(&self, kind: Kind) -> u16 {
        match kind {
            Kind::Static => self.static_count,
            Kind::Field => self.field_count,
            Kind::Arg => self.arg_count,
            Kind::Var => self.var_count,
        }
    }

    fn lookup(&self, name: &str) -> Option<&Entry> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<Kind> {
        self.lookup(name).map(|e| e.kind)
    }

    #[must_use]
    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(|e| e.type_name.as_str())
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.lookup(name).map(|e| e.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_and_subroutine_scopes_count_independently() {
        let mut st = SymbolTable::new();
        st.define("count", "int", Kind::Field);
        st.define("x", "int", Kind::Static);
        st.start_subroutine();
        st.define("n", "int", Kind::Arg);
        st.define("i", "int", Kind::Var);

        assert_eq!(st.var_count(Kind::Field), 1);
        assert_eq!(st.var_count(Kind::Static), 1);
        assert_eq!(st.var_count(Kind::Arg), 1);
        assert_eq!(st.var_count(Kind::Var), 1);
    }

    #[test]
    fn subroutine_scope_shadows_class_scope() {
        let mut st = SymbolTable::new();
        st.define("x", "int", Kind::Field);
        st.start_subroutine();
        st.define("x", "boolean", Kind::Var);

        assert_eq!(st.kind_of("x"), Some(Kind::Var));
        assert_eq!(st.type_of("x"), Some("boolean"));
    }

    #[test]
    fn start_subroutine_clears_previous_locals() {
        let mut st = SymbolTable::new();
        st.start_subroutine();
        st.define("a", "int", Kind::Arg);
        st.start_subroutine();

        assert_eq!(st.kind_of("a"), None);
        assert_eq!(st.var_count(Kind::Arg), 0);
    }

    #[test]
    fn unknown_name_resolves_to_none() {
        let st = SymbolTable::new();
        assert_eq!(st.kind_of("nope"), None);
        assert_eq!(st.index_of("nope"), None);
    }
}
