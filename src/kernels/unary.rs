use crate::error::KernelError;

// Element-wise functions wumm applies to U %*% t(V)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Exp,
    Log,
    Abs,
    Sqrt,
    Round,
    Floor,
    Ceil,
    Sign,
    Sigmoid,
    Sin,
    Cos,
    Tan,
    Pow2,  // ^2
    Mult2, // *2
}

impl UnaryOp {
    pub fn parse(code: &str) -> Result<Self, KernelError> {
        let op = match code.trim().to_ascii_lowercase().as_str() {
            "exp" => UnaryOp::Exp,
            "log" => UnaryOp::Log,
            "abs" => UnaryOp::Abs,
            "sqrt" => UnaryOp::Sqrt,
            "round" => UnaryOp::Round,
            "floor" => UnaryOp::Floor,
            "ceil" => UnaryOp::Ceil,
            "sign" => UnaryOp::Sign,
            "sigmoid" => UnaryOp::Sigmoid,
            "sin" => UnaryOp::Sin,
            "cos" => UnaryOp::Cos,
            "tan" => UnaryOp::Tan,
            "^2" => UnaryOp::Pow2,
            "*2" => UnaryOp::Mult2,
            _ => return Err(KernelError::UnsupportedUnaryOp(code.to_string())),
        };
        Ok(op)
    }

    pub fn apply(&self, value: f64) -> f64 {
        match self {
            UnaryOp::Exp => value.exp(),
            UnaryOp::Log => value.ln(),
            UnaryOp::Abs => value.abs(),
            UnaryOp::Sqrt => value.sqrt(),
            UnaryOp::Round => value.round(),
            UnaryOp::Floor => value.floor(),
            UnaryOp::Ceil => value.ceil(),
            // f64::signum maps 0.0 to 1.0
            UnaryOp::Sign => if value == 0.0 { 0.0 } else { value.signum() },
            UnaryOp::Sigmoid => sigmoid(value),
            UnaryOp::Sin => value.sin(),
            UnaryOp::Cos => value.cos(),
            UnaryOp::Tan => value.tan(),
            UnaryOp::Pow2 => value * value,
            UnaryOp::Mult2 => value + value,
        }
    }
}

pub fn sigmoid(value: f64) -> f64 {
    1.0 / (1.0 + (-value).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(UnaryOp::parse("EXP").unwrap(), UnaryOp::Exp);
        assert_eq!(UnaryOp::parse("Sigmoid").unwrap(), UnaryOp::Sigmoid);
        assert_eq!(UnaryOp::parse("^2").unwrap(), UnaryOp::Pow2);
    }

    #[test_log::test]
    fn test_unknown_code_is_rejected() {
        let err = UnaryOp::parse("gamma").unwrap_err();
        assert!(matches!(err, KernelError::UnsupportedUnaryOp(ref c) if c == "gamma"));
    }

    #[test_log::test]
    fn test_apply() {
        assert_eq!(UnaryOp::Pow2.apply(3.0), 9.0);
        assert_eq!(UnaryOp::Mult2.apply(3.0), 6.0);
        assert_eq!(UnaryOp::Sign.apply(0.0), 0.0);
        assert_eq!(UnaryOp::Sign.apply(-2.0), -1.0);
        assert!((UnaryOp::Sigmoid.apply(0.0) - 0.5).abs() < 1e-12);
    }
}
