use crate::value::{Number, Value};

/// Operand stack for expression evaluation. The pop helpers apply the
/// coerce-or-default policy on both an empty stack and a tag mismatch.
#[derive(Debug, Default)]
pub struct Stack {
    items: Vec<Value>,
}

impl Stack {
    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.items.pop()
    }

    pub fn top(&self) -> Option<&Value> {
        self.items.last()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn pop_number_or(&mut self, alt: Number) -> Number {
        self.pop().map_or(alt, |v| v.number_or(alt))
    }

    pub fn pop_string_or(&mut self, alt: &str) -> String {
        self.pop().map_or_else(|| alt.to_string(), |v| v.string_or(alt))
    }

    pub fn pop_bool_or(&mut self, alt: bool) -> bool {
        self.pop().map_or(alt, |v| v.bool_or(alt))
    }
}

/// Saved loop state that lets `endfor` rebind the next element and jump the
/// program counter back to the body. One frame per active `for`, pushed at
/// loop entry and popped/re-pushed on every iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopFrame {
    /// Environment key of the container being iterated.
    pub container: String,
    /// Loop identifier bound each iteration.
    pub binding: String,
    /// Second identifier of the `key, value` form.
    pub companion: Option<String>,
    pub index: usize,
    /// Program index of the `for` block; execution resumes just after it.
    pub resume: usize,
    /// True when `container` is the hidden list materialized by `range`,
    /// which loop teardown must erase along with the bindings.
    pub synthesized: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_helpers_default_on_empty_and_mismatch() {
        let mut stack = Stack::default();
        assert_eq!(stack.pop_number_or(9), 9);
        stack.push(Value::Str("x".into()));
        assert_eq!(stack.pop_number_or(9), 9);
        stack.push(Value::Number(4));
        assert_eq!(stack.pop_number_or(9), 4);
        assert!(stack.is_empty());
    }
}
