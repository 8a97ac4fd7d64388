use std::fmt;

use crate::error::QuaternaryError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Matrix,
    Scalar,
    Unknown,
}

impl DataType {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "MATRIX" => Some(DataType::Matrix),
            "SCALAR" => Some(DataType::Scalar),
            "UNKNOWN" => Some(DataType::Unknown),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Double,
    Int,
    Boolean,
    String,
    Unknown,
}

impl ValueType {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "DOUBLE" => Some(ValueType::Double),
            "INT" => Some(ValueType::Int),
            "BOOLEAN" => Some(ValueType::Boolean),
            "STRING" => Some(ValueType::String),
            "UNKNOWN" => Some(ValueType::Unknown),
            _ => None,
        }
    }
}

// Named reference into the variable namespace. Whether the name exists is
// only checked when the buffer is acquired
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Operand {
    name: String,
    data_type: DataType,
    value_type: ValueType,
    // Token as it appeared in the instruction
    token: String,
}

impl Operand {
    // name | name·DATATYPE·VALUETYPE | name·DATATYPE·VALUETYPE·LITERAL
    pub fn parse(token: &str, delimiter: char) -> Result<Self, String> {
        let parts: Vec<&str> = token.split(delimiter).collect();

        let (data_type, value_type) = match parts.len() {
            1 => (DataType::Unknown, ValueType::Unknown),
            3 | 4 => {
                let data_type = DataType::from_token(parts[1])
                    .ok_or_else(|| format!("unknown data type '{}' in operand '{}'", parts[1], token))?;
                let value_type = ValueType::from_token(parts[2])
                    .ok_or_else(|| format!("unknown value type '{}' in operand '{}'", parts[2], token))?;
                // Literal flag is validated but operands are always looked up by name
                if let Some(flag) = parts.get(3) {
                    flag.parse::<bool>()
                        .map_err(|_| format!("invalid literal flag '{}' in operand '{}'", flag, token))?;
                }
                (data_type, value_type)
            },
            n => return Err(format!("operand '{}' has {} parts, expected 1, 3 or 4", token, n)),
        };

        let name = parts[0].trim();
        if name.is_empty() {
            return Err(format!("operand '{}' has an empty name", token));
        }

        Ok(Self {
            name: name.to_string(),
            data_type,
            value_type,
            token: token.to_string(),
        })
    }

    // Same as parse, reporting failures against the whole instruction
    pub fn parse_in(token: &str, delimiter: char, instruction: &str) -> Result<Self, QuaternaryError> {
        Self::parse(token, delimiter).map_err(|reason| QuaternaryError::malformed(instruction, reason))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}
