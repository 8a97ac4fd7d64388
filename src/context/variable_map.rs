use std::collections::HashMap;
use std::sync::Arc;

use log::{trace, warn};

use crate::{config::RuntimeConfig, error::QuaternaryError, matrix::MatrixBlock};

use super::execution_context::{Data, ExecutionContext};

#[derive(Debug)]
struct Variable {
    data: Data,
    // Number of outstanding get_matrix_input calls not yet released
    pins: usize,
}

// In-memory variable store with pin counts. Bound values are charged in
// bytes against an optional limit
#[derive(Debug)]
pub struct LocalVariableMap {
    variables: HashMap<String, Variable>,
    limit_bytes: Option<u64>,
    used_bytes: u64,
}

impl LocalVariableMap {
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
            limit_bytes: None,
            used_bytes: 0,
        }
    }

    pub fn with_memory_limit(limit_bytes: u64) -> Self {
        Self {
            limit_bytes: Some(limit_bytes),
            ..Self::new()
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        match config.memory_limit_bytes {
            Some(limit) => Self::with_memory_limit(limit),
            None => Self::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Data> {
        self.variables.get(name).map(|v| &v.data)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn remove(&mut self, name: &str) -> Option<Data> {
        let variable = self.variables.remove(name)?;
        if variable.pins > 0 {
            warn!("Removing variable {} while it is still pinned {} time(s)", name, variable.pins);
        }
        self.used_bytes = self.used_bytes.saturating_sub(variable.data.size_in_bytes());
        Some(variable.data)
    }

    pub fn pin_count(&self, name: &str) -> usize {
        self.variables.get(name).map(|v| v.pins).unwrap_or(0)
    }

    pub fn memory_used(&self) -> u64 {
        self.used_bytes
    }

    // Usage after swapping a binding of old_size bytes for one of new_size,
    // or OutOfMemory when that exceeds the limit
    fn charge(&self, name: &str, old_size: u64, new_size: u64) -> Result<u64, QuaternaryError> {
        let others = self.used_bytes.saturating_sub(old_size);
        let usage = others.checked_add(new_size).ok_or_else(|| QuaternaryError::OutOfMemory(
            format!("Binding {} ({} bytes) overflows the byte count", name, new_size)
        ))?;
        match self.limit_bytes {
            Some(limit) if usage > limit => Err(QuaternaryError::OutOfMemory(
                format!("Binding {} needs {} bytes, {} of {} bytes already bound", name, new_size, others, limit)
            )),
            _ => Ok(usage),
        }
    }
}

impl Default for LocalVariableMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext for LocalVariableMap {
    fn get_matrix_input(&mut self, name: &str) -> Result<Arc<MatrixBlock>, QuaternaryError> {
        let variable = self.variables
            .get_mut(name)
            .ok_or_else(|| QuaternaryError::NameNotFound(name.to_string()))?;

        let block = match &variable.data {
            Data::Matrix(block) => Arc::clone(block),
            Data::Scalar(_) => return Err(QuaternaryError::NotAMatrix(name.to_string())),
        };

        variable.pins += 1;
        trace!("Acquired {} (pins={})", name, variable.pins);
        Ok(block)
    }

    fn release_matrix_input(&mut self, name: &str) {
        match self.variables.get_mut(name) {
            Some(variable) if variable.pins > 0 => {
                variable.pins -= 1;
                trace!("Released {} (pins={})", name, variable.pins);
            },
            Some(_) => warn!("Release of unpinned variable {} ignored", name),
            None => warn!("Release of unknown variable {} ignored", name),
        }
    }

    fn set_variable(&mut self, name: &str, data: Data) -> Result<(), QuaternaryError> {
        let new_size = data.size_in_bytes();
        let old_size = self.variables
            .get(name)
            .map(|v| v.data.size_in_bytes())
            .unwrap_or(0);

        // The old binding is only dropped once the new one fits
        self.used_bytes = self.charge(name, old_size, new_size)?;

        trace!("Bound {} ({} bytes)", name, new_size);
        match self.variables.get_mut(name) {
            Some(variable) => variable.data = data,
            None => {
                self.variables.insert(name.to_string(), Variable { data, pins: 0 });
            }
        }
        Ok(())
    }
}
