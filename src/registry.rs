use std::collections::HashMap;

use itertools::Itertools;

use crate::activation::ActivationFunction;
use crate::error::UnknownFunction;

/// Resolves the function names stored in genotypes.
///
/// Built once and shared by whoever needs name resolution. Both the short names and the legacy
/// long-form names resolve to the same function.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<&'static str, ActivationFunction>,
}

impl FunctionRegistry {
    /// A registry holding the complete catalog.
    pub fn new() -> Self {
        Self::with_functions(ActivationFunction::ALL.iter().copied())
    }

    /// A registry restricted to the given functions.
    pub fn with_functions(functions: impl IntoIterator<Item = ActivationFunction>) -> Self {
        let mut map = HashMap::new();
        for function in functions {
            map.insert(function.name(), function);
            map.insert(function.legacy_name(), function);
        }
        Self { functions: map }
    }

    /// Get the function registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<ActivationFunction, UnknownFunction> {
        self.functions
            .get(name)
            .copied()
            .ok_or_else(|| UnknownFunction(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// The registered functions, each once, ordered by name.
    pub fn functions(&self) -> Vec<ActivationFunction> {
        self.functions
            .values()
            .copied()
            .unique()
            .sorted_by_key(|f| f.name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.functions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
