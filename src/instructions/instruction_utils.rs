use crate::{config::InstructionFormat, error::QuaternaryError};

// Split an instruction into its fields, dropping a leading execution type.
// Field 0 of the result is always the opcode
pub fn get_instruction_parts<'a>(instruction: &'a str, format: &InstructionFormat) -> Vec<&'a str> {
    let mut parts: Vec<&str> = instruction
        .trim()
        .split(format.field_delimiter)
        .collect();

    if let Some(prefix) = &format.exec_type_prefix {
        if parts.len() > 1 && parts[0].eq_ignore_ascii_case(prefix) {
            parts.remove(0);
        }
    }
    parts
}

// Exact match only, no lenient parsing of extra or missing fields
pub fn check_num_fields(parts: &[&str], expected: usize, instruction: &str) -> Result<(), QuaternaryError> {
    let actual = parts.len().saturating_sub(1);
    if actual != expected {
        return Err(QuaternaryError::malformed(
            instruction,
            format!("expected {} fields, got {}", expected, actual),
        ));
    }
    Ok(())
}

pub fn parse_num_threads(field: &str, instruction: &str) -> Result<i32, QuaternaryError> {
    field.trim().parse::<i32>().map_err(|_| QuaternaryError::malformed(
        instruction,
        format!("thread count '{}' is not an integer", field),
    ))
}
