//! Constant pool for string operands
//!
//! Each function body carries its own pool; `CONST_STR` operands index into it.

use rustc_hash::FxHashMap;

/// Interned string constants referenced by a function body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantPool {
    strings: Vec<String>,
    index: FxHashMap<String, u32>,
}

impl ConstantPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its index
    pub fn add_string(&mut self, value: &str) -> u32 {
        if let Some(&idx) = self.index.get(value) {
            return idx;
        }
        let idx = self.strings.len() as u32;
        self.strings.push(value.to_string());
        self.index.insert(value.to_string(), idx);
        idx
    }

    /// Look up a string by index
    pub fn get_string(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    /// Iterate over interned strings in index order
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning() {
        let mut pool = ConstantPool::new();
        let a = pool.add_string("Name");
        let b = pool.add_string("Age");
        let c = pool.add_string("Name");

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(a, c);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get_string(1), Some("Age"));
        assert_eq!(pool.get_string(2), None);
    }
}
