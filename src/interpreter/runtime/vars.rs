//! The variable scopes of a program run.
//!
//! Reads walk the scopes innermost first. Writes always land in the
//! innermost scope, shadowing an enclosing binding of the same name
//! rather than updating it. A function call swaps the whole stack for
//! a fresh `[globals, params]` pair and restores it afterwards.

use std::collections::HashMap;
use std::mem;

use super::value::Value;

/// The stack of variable scopes. The scope at index 0 is the global one.
#[derive(Debug)]
pub struct Scopes {
    scopes: Vec<HashMap<String, Value>>
}

impl Scopes {
    /// Create a scope stack holding only the global scope.
    pub fn new() -> Self {
        Self { scopes: vec![HashMap::new()] }
    }

    /// Read a variable, innermost scope first.
    pub fn get(&self, ident: &str) -> Option<&Value> {
        self.scopes.iter().rev()
            .find_map(|scope| scope.get(ident))
    }

    /// Bind a name in the innermost scope. Declarations and
    /// assignments both go through here.
    pub fn declare(&mut self, ident: String, v: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(ident, v);
        }
    }

    /// Open a new innermost scope.
    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Close the innermost scope, dropping its bindings.
    /// The global scope cannot be popped.
    pub fn pop_discard(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// The number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// The global scope.
    pub fn globals(&self) -> &HashMap<String, Value> {
        &self.scopes[0]
    }

    /// Take the global scope out of the stack.
    pub fn into_globals(mut self) -> HashMap<String, Value> {
        if self.scopes.is_empty() {
            HashMap::new()
        } else {
            self.scopes.swap_remove(0)
        }
    }

    /// Swap the whole stack for a call stack of `[globals, params]`,
    /// returning the stack it replaced.
    pub fn swap_for_call(
        &mut self,
        globals: HashMap<String, Value>,
        params: HashMap<String, Value>
    ) -> Vec<HashMap<String, Value>> {
        mem::replace(&mut self.scopes, vec![globals, params])
    }

    /// Put back a stack saved by [`Scopes::swap_for_call`].
    pub fn restore(&mut self, saved: Vec<HashMap<String, Value>>) {
        self.scopes = saved;
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_wins() {
        let mut scopes = Scopes::new();
        scopes.declare(String::from("a"), Value::Int(1));
        scopes.push();
        scopes.declare(String::from("a"), Value::Int(2));

        assert_eq!(scopes.get("a"), Some(&Value::Int(2)));
        scopes.pop_discard();
        assert_eq!(scopes.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn writes_never_reach_enclosing_scopes() {
        let mut scopes = Scopes::new();
        scopes.declare(String::from("a"), Value::Int(1));
        scopes.push();

        // a read still sees the outer binding
        assert_eq!(scopes.get("a"), Some(&Value::Int(1)));

        // a write shadows it rather than updating it
        scopes.declare(String::from("a"), Value::Int(5));
        assert_eq!(scopes.get("a"), Some(&Value::Int(5)));
        scopes.pop_discard();
        assert_eq!(scopes.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn call_swap_isolates() {
        let mut scopes = Scopes::new();
        scopes.declare(String::from("g"), Value::Int(1));
        scopes.push();
        scopes.declare(String::from("local"), Value::Int(2));

        let globals = scopes.globals().clone();
        let params = HashMap::from([(String::from("p"), Value::Int(3))]);
        let saved = scopes.swap_for_call(globals, params);

        assert_eq!(scopes.depth(), 2);
        assert_eq!(scopes.get("g"), Some(&Value::Int(1)));
        assert_eq!(scopes.get("p"), Some(&Value::Int(3)));
        assert_eq!(scopes.get("local"), None);

        scopes.restore(saved);
        assert_eq!(scopes.get("local"), Some(&Value::Int(2)));
        assert_eq!(scopes.get("p"), None);
    }

    #[test]
    fn global_scope_stays() {
        let mut scopes = Scopes::new();
        scopes.pop_discard();
        assert_eq!(scopes.depth(), 1);
    }
}
