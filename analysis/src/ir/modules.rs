//! IR Modules
//!
//! A module is the unit host tooling hands over: a named set of functions,
//! serializable as JSON.

use super::{IrFunction, IrFunctionId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// IR module - a named collection of functions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrModule {
    /// Module name
    pub name: String,

    /// Source file path the module was produced from
    #[serde(default)]
    pub source_file: String,

    /// Functions defined in this module
    pub functions: IndexMap<IrFunctionId, IrFunction>,

    /// Next available function ID
    #[serde(default)]
    pub next_function_id: u32,
}

impl IrModule {
    /// Create a new empty module
    pub fn new(name: String, source_file: String) -> Self {
        Self {
            name,
            source_file,
            functions: IndexMap::new(),
            next_function_id: 0,
        }
    }

    /// Allocate a new function ID
    pub fn alloc_function_id(&mut self) -> IrFunctionId {
        let id = IrFunctionId(self.next_function_id);
        self.next_function_id += 1;
        id
    }

    /// Add a function to the module
    pub fn add_function(&mut self, function: IrFunction) {
        self.functions.insert(function.id, function);
    }

    /// Look up a function by name
    pub fn function_by_name(&self, name: &str) -> Option<&IrFunction> {
        self.functions.values().find(|f| f.name == name)
    }

    /// Parse a module from JSON.
    ///
    /// Predecessor lists are rebuilt from terminators, so producers may omit them.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut module: IrModule = serde_json::from_str(text)?;
        for function in module.functions.values_mut() {
            function.cfg.recompute_predecessors();
        }
        let max_id = module.functions.keys().map(|id| id.0 + 1).max().unwrap_or(0);
        module.next_function_id = module.next_function_id.max(max_id);
        Ok(module)
    }

    /// Serialize the module to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
