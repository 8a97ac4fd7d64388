// Delimiters used by the surrounding instruction set
pub const OPERAND_DELIMITER: char = '°';
pub const VALUETYPE_DELIMITER: char = '·';
pub const CP_EXEC_TYPE: &str = "CP";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstructionFormat {
    pub field_delimiter: char,
    pub value_type_delimiter: char,
    // Stripped when it appears as field 0, ahead of the opcode
    pub exec_type_prefix: Option<String>,
}

impl InstructionFormat {
    pub fn new(field_delimiter: char, value_type_delimiter: char, exec_type_prefix: Option<&str>) -> Self {
        Self {
            field_delimiter,
            value_type_delimiter,
            exec_type_prefix: exec_type_prefix.map(str::to_string),
        }
    }

    // CP°wsloss°X·MATRIX·DOUBLE°...
    pub fn native() -> Self {
        Self::new(OPERAND_DELIMITER, VALUETYPE_DELIMITER, Some(CP_EXEC_TYPE))
    }
}

// wsloss,X,U,V,W,out,POST,4
impl Default for InstructionFormat {
    fn default() -> Self {
        Self::new(',', VALUETYPE_DELIMITER, Some(CP_EXEC_TYPE))
    }
}

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub format: InstructionFormat,
    // Used by the CPU kernel when an instruction asks for <= 0 threads
    pub default_threads: usize,
    // Minimum number of cells before a kernel call goes parallel
    pub parallel_threshold: usize,
    // None means the variable map never refuses a binding
    pub memory_limit_bytes: Option<u64>,
}

impl RuntimeConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.default_threads = threads.max(1);
        self
    }

    pub fn with_memory_limit(mut self, limit_bytes: u64) -> Self {
        self.memory_limit_bytes = Some(limit_bytes);
        self
    }

    // Thread hints are forwarded untouched from the instruction, this is where
    // the CPU kernel turns them into an actual pool size. Never exceeds default_threads
    pub fn resolve_threads(&self, hint: i32) -> usize {
        let max = self.default_threads.max(1);
        if hint <= 0 {
            max
        } else {
            (hint as usize).min(max)
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            format: InstructionFormat::default(),
            default_threads: num_cpus::get(),
            // NOTE: The most optimal value depends on each machine. This will serve as a general value for now
            parallel_threshold: 10000,
            memory_limit_bytes: None,
        }
    }
}
