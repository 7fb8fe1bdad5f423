use rustc_hash::FxHashMap;

use crate::value::{UserMap, UserValue, Value};

/// The render's variable table. Seeded once from caller data, then mutated
/// by loop setup/teardown to bind loop variables. Never shared between
/// renders.
#[derive(Debug, Default)]
pub struct Environment {
    table: FxHashMap<String, UserValue>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, data: UserMap) {
        self.table = data;
    }

    pub fn contains(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    pub fn define(&mut self, key: impl Into<String>, value: impl Into<UserValue>) {
        self.table.insert(key.into(), value.into());
    }

    pub fn erase(&mut self, key: &str) {
        self.table.remove(key);
    }

    /// Iterable length of `key`; zero for scalars and missing names.
    pub fn size_of(&self, key: &str) -> usize {
        self.table.get(key).map_or(0, UserValue::len)
    }

    pub fn is_list(&self, key: &str) -> bool {
        self.table.get(key).is_some_and(UserValue::is_list)
    }

    pub fn is_map(&self, key: &str) -> bool {
        self.table.get(key).is_some_and(UserValue::is_map)
    }

    /// Project a scalar entry to a stack value; collections yield `None`.
    pub fn scalar(&self, key: &str) -> Option<Value> {
        self.table.get(key).and_then(UserValue::scalar)
    }

    pub fn element(&self, key: &str, index: usize) -> Option<Value> {
        self.table.get(key).and_then(|v| v.element(index))
    }

    pub fn entry(&self, key: &str, map_key: &str) -> Option<Value> {
        self.table.get(key).and_then(|v| v.entry(map_key))
    }

    /// Bind `dest` to the `index`-th element of the list `container`.
    pub fn bind_element(&mut self, container: &str, dest: &str, index: usize) {
        let value = match self.element(container, index) {
            Some(Value::Number(n)) => UserValue::Number(n),
            Some(Value::Str(s)) => UserValue::Str(s),
            _ => return,
        };
        self.table.insert(dest.to_string(), value);
    }

    /// Bind `key_dest`/`value_dest` to the `index`-th entry of the map
    /// `container`, in key order.
    pub fn bind_entry(&mut self, container: &str, key_dest: &str, value_dest: &str, index: usize) {
        let entry = self.table.get(container).and_then(|v| v.entry_at(index));
        let Some((key, value)) = entry else {
            return;
        };
        self.table.insert(key_dest.to_string(), UserValue::Str(key));
        let value = match value {
            Value::Number(n) => UserValue::Number(n),
            Value::Str(s) => UserValue::Str(s),
            Value::Bool(_) => return,
        };
        self.table.insert(value_dest.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn scalars_project_and_collections_do_not() {
        let mut env = Environment::new();
        env.define("n", 3u64);
        env.define("s", "hey");
        env.define("v", vec!["a", "b"]);
        assert_eq!(env.scalar("n"), Some(Value::Number(3)));
        assert_eq!(env.scalar("s"), Some(Value::Str("hey".into())));
        assert_eq!(env.scalar("v"), None);
        assert_eq!(env.size_of("v"), 2);
        assert_eq!(env.size_of("n"), 0);
        assert_eq!(env.size_of("missing"), 0);
    }

    #[test]
    fn loop_binding_walks_lists_and_maps() {
        let mut env = Environment::new();
        env.define("v", vec![10u64, 20]);
        env.bind_element("v", "x", 1);
        assert_eq!(env.scalar("x"), Some(Value::Number(20)));

        let mut m = BTreeMap::new();
        m.insert("k1".to_string(), "v1".to_string());
        m.insert("k0".to_string(), "v0".to_string());
        env.define("m", m);
        env.bind_entry("m", "key", "val", 0);
        assert_eq!(env.scalar("key"), Some(Value::Str("k0".into())));
        assert_eq!(env.scalar("val"), Some(Value::Str("v0".into())));
    }
}
