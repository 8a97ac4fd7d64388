use std::fmt;

use crate::error::QuaternaryError;

// wsloss: X, U, V and an optional weight matrix W
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WeightsType {
    Post,   // sum(W * (X - U %*% t(V))^2)
    PostNz, // sum((X != 0) * (X - U %*% t(V))^2)
    Pre,    // sum((X - W * (U %*% t(V)))^2)
    None,   // sum((X - U %*% t(V))^2)
}

impl WeightsType {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            // BASIC is the older name of the post-weighted loss
            "POST" | "BASIC" => Some(WeightsType::Post),
            "POST_NZ" => Some(WeightsType::PostNz),
            "PRE" => Some(WeightsType::Pre),
            "NONE" => Some(WeightsType::None),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WeightsType::Post => "POST",
            WeightsType::PostNz => "POST_NZ",
            WeightsType::Pre => "PRE",
            WeightsType::None => "NONE",
        }
    }

    pub fn has_four_inputs(&self) -> bool {
        matches!(self, WeightsType::Post | WeightsType::Pre)
    }
}

// wdivmm: W, U, V and for the minus variants X
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WDivMMType {
    MultBasic,      // W * (U %*% t(V))
    MultLeft,       // t(t(U) %*% (W * (U %*% t(V))))
    MultRight,      // (W * (U %*% t(V))) %*% V
    DivLeft,        // t(t(U) %*% (W / (U %*% t(V))))
    DivRight,       // (W / (U %*% t(V))) %*% V
    MultMinusLeft,  // t(t(U) %*% (W * (U %*% t(V) - X)))
    MultMinusRight, // (W * (U %*% t(V) - X)) %*% V
}

impl WDivMMType {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "MULT_BASIC" => Some(WDivMMType::MultBasic),
            "MULT_LEFT" => Some(WDivMMType::MultLeft),
            "MULT_RIGHT" => Some(WDivMMType::MultRight),
            "DIV_LEFT" => Some(WDivMMType::DivLeft),
            "DIV_RIGHT" => Some(WDivMMType::DivRight),
            "MULT_MINUS_LEFT" => Some(WDivMMType::MultMinusLeft),
            "MULT_MINUS_RIGHT" => Some(WDivMMType::MultMinusRight),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WDivMMType::MultBasic => "MULT_BASIC",
            WDivMMType::MultLeft => "MULT_LEFT",
            WDivMMType::MultRight => "MULT_RIGHT",
            WDivMMType::DivLeft => "DIV_LEFT",
            WDivMMType::DivRight => "DIV_RIGHT",
            WDivMMType::MultMinusLeft => "MULT_MINUS_LEFT",
            WDivMMType::MultMinusRight => "MULT_MINUS_RIGHT",
        }
    }

    pub fn has_four_inputs(&self) -> bool {
        matches!(self, WDivMMType::MultMinusLeft | WDivMMType::MultMinusRight)
    }

    // Left variants produce t(...) %*% U (n x k), right variants ... %*% V (m x k)
    pub fn is_left(&self) -> bool {
        matches!(self, WDivMMType::MultLeft | WDivMMType::DivLeft | WDivMMType::MultMinusLeft)
    }

    pub fn is_basic(&self) -> bool {
        matches!(self, WDivMMType::MultBasic)
    }
}

// wsigmoid: W, U, V
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WSigmoidType {
    Basic,    // W * sigmoid(U %*% t(V))
    Log,      // W * log(sigmoid(U %*% t(V)))
    Minus,    // W * sigmoid(-(U %*% t(V)))
    LogMinus, // W * log(sigmoid(-(U %*% t(V))))
}

impl WSigmoidType {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "BASIC" => Some(WSigmoidType::Basic),
            "LOG" => Some(WSigmoidType::Log),
            "MINUS" => Some(WSigmoidType::Minus),
            "LOG_MINUS" => Some(WSigmoidType::LogMinus),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WSigmoidType::Basic => "BASIC",
            WSigmoidType::Log => "LOG",
            WSigmoidType::Minus => "MINUS",
            WSigmoidType::LogMinus => "LOG_MINUS",
        }
    }

    pub fn is_log(&self) -> bool {
        matches!(self, WSigmoidType::Log | WSigmoidType::LogMinus)
    }

    pub fn is_minus(&self) -> bool {
        matches!(self, WSigmoidType::Minus | WSigmoidType::LogMinus)
    }
}

// wcemm: X, U, V
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WCeMMType {
    Basic, // sum(X * log(U %*% t(V)))
}

impl WCeMMType {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "BASIC" => Some(WCeMMType::Basic),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WCeMMType::Basic => "BASIC",
        }
    }

    pub fn has_four_inputs(&self) -> bool {
        false
    }
}

// wumm: X, U, V plus a unary operation code
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WUMMType {
    Mult, // X * uop(U %*% t(V))
    Div,  // X / uop(U %*% t(V))
}

impl WUMMType {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "MULT" => Some(WUMMType::Mult),
            "DIV" => Some(WUMMType::Div),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WUMMType::Mult => "MULT",
            WUMMType::Div => "DIV",
        }
    }
}

// Opcodes handled by the quaternary instruction, with their field layouts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorFamily {
    WeightedSquaredLoss,
    WeightedDivMM,
    WeightedSigmoid,
    WeightedCrossEntropy,
    WeightedUnaryMM,
}

impl OperatorFamily {
    pub const ALL: [OperatorFamily; 5] = [
        OperatorFamily::WeightedSquaredLoss,
        OperatorFamily::WeightedDivMM,
        OperatorFamily::WeightedSigmoid,
        OperatorFamily::WeightedCrossEntropy,
        OperatorFamily::WeightedUnaryMM,
    ];

    pub fn from_opcode(opcode: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.opcode().eq_ignore_ascii_case(opcode))
    }

    pub fn opcode(&self) -> &'static str {
        match self {
            OperatorFamily::WeightedSquaredLoss => "wsloss",
            OperatorFamily::WeightedDivMM => "wdivmm",
            OperatorFamily::WeightedSigmoid => "wsigmoid",
            OperatorFamily::WeightedCrossEntropy => "wcemm",
            OperatorFamily::WeightedUnaryMM => "wumm",
        }
    }

    // Field count excluding the opcode
    pub fn num_fields(&self) -> usize {
        match self {
            OperatorFamily::WeightedSquaredLoss
            | OperatorFamily::WeightedDivMM
            | OperatorFamily::WeightedUnaryMM => 7,
            OperatorFamily::WeightedSigmoid
            | OperatorFamily::WeightedCrossEntropy => 6,
        }
    }

    // Whether the layout has a slot for a 4th input operand
    pub fn has_fourth_operand(&self) -> bool {
        matches!(self, OperatorFamily::WeightedSquaredLoss | OperatorFamily::WeightedDivMM)
    }

    pub fn produces_scalar(&self) -> bool {
        matches!(self, OperatorFamily::WeightedSquaredLoss | OperatorFamily::WeightedCrossEntropy)
    }
}

impl fmt::Display for OperatorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode())
    }
}

// Exactly one sub-type per operator, carried by its family's variant
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum QuaternaryOp {
    WeightedSquaredLoss(WeightsType),
    WeightedDivMM(WDivMMType),
    WeightedSigmoid(WSigmoidType),
    WeightedCrossEntropy(WCeMMType),
    WeightedUnaryMM { wumm_type: WUMMType, unary_op: String },
}

impl QuaternaryOp {
    pub fn family(&self) -> OperatorFamily {
        match self {
            QuaternaryOp::WeightedSquaredLoss(_) => OperatorFamily::WeightedSquaredLoss,
            QuaternaryOp::WeightedDivMM(_) => OperatorFamily::WeightedDivMM,
            QuaternaryOp::WeightedSigmoid(_) => OperatorFamily::WeightedSigmoid,
            QuaternaryOp::WeightedCrossEntropy(_) => OperatorFamily::WeightedCrossEntropy,
            QuaternaryOp::WeightedUnaryMM { .. } => OperatorFamily::WeightedUnaryMM,
        }
    }

    pub fn subtype_name(&self) -> &'static str {
        match self {
            QuaternaryOp::WeightedSquaredLoss(t) => t.name(),
            QuaternaryOp::WeightedDivMM(t) => t.name(),
            QuaternaryOp::WeightedSigmoid(t) => t.name(),
            QuaternaryOp::WeightedCrossEntropy(t) => t.name(),
            QuaternaryOp::WeightedUnaryMM { wumm_type, .. } => wumm_type.name(),
        }
    }

    fn has_four_inputs(&self) -> bool {
        match self {
            QuaternaryOp::WeightedSquaredLoss(t) => t.has_four_inputs(),
            QuaternaryOp::WeightedDivMM(t) => t.has_four_inputs(),
            QuaternaryOp::WeightedCrossEntropy(t) => t.has_four_inputs(),
            QuaternaryOp::WeightedSigmoid(_) | QuaternaryOp::WeightedUnaryMM { .. } => false,
        }
    }
}

// A resolved operator. The arity and result shape are fixed here once so the
// executor never re-derives them from the family
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QuaternaryOperator {
    op: QuaternaryOp,
    four_inputs: bool,
    scalar_output: bool,
}

impl QuaternaryOperator {
    pub fn new(op: QuaternaryOp) -> Self {
        let four_inputs = op.has_four_inputs();
        let scalar_output = op.family().produces_scalar();
        Self { op, four_inputs, scalar_output }
    }

    // unary_op is only consulted for wumm and is not validated here, the kernel decides
    pub fn resolve(family: OperatorFamily, subtype: &str, unary_op: Option<&str>) -> Result<Self, QuaternaryError> {
        let unrecognized = || QuaternaryError::UnrecognizedOperator {
            opcode: family.opcode().to_string(),
            token: subtype.to_string(),
        };

        let op = match family {
            OperatorFamily::WeightedSquaredLoss => QuaternaryOp::WeightedSquaredLoss(
                WeightsType::from_token(subtype).ok_or_else(unrecognized)?
            ),
            OperatorFamily::WeightedDivMM => QuaternaryOp::WeightedDivMM(
                WDivMMType::from_token(subtype).ok_or_else(unrecognized)?
            ),
            OperatorFamily::WeightedSigmoid => QuaternaryOp::WeightedSigmoid(
                WSigmoidType::from_token(subtype).ok_or_else(unrecognized)?
            ),
            OperatorFamily::WeightedCrossEntropy => QuaternaryOp::WeightedCrossEntropy(
                WCeMMType::from_token(subtype).ok_or_else(unrecognized)?
            ),
            OperatorFamily::WeightedUnaryMM => QuaternaryOp::WeightedUnaryMM {
                wumm_type: WUMMType::from_token(subtype).ok_or_else(unrecognized)?,
                unary_op: unary_op.unwrap_or_default().to_string(),
            },
        };

        Ok(Self::new(op))
    }

    pub fn op(&self) -> &QuaternaryOp {
        &self.op
    }

    pub fn family(&self) -> OperatorFamily {
        self.op.family()
    }

    pub fn requires_four_inputs(&self) -> bool {
        self.four_inputs
    }

    pub fn produces_scalar(&self) -> bool {
        self.scalar_output
    }

    pub fn unary_op(&self) -> Option<&str> {
        match &self.op {
            QuaternaryOp::WeightedUnaryMM { unary_op, .. } => Some(unary_op),
            _ => None,
        }
    }
}

impl fmt::Display for QuaternaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unary_op() {
            Some(uop) => write!(f, "{}({}, {})", self.family(), self.op.subtype_name(), uop),
            None => write!(f, "{}({})", self.family(), self.op.subtype_name()),
        }
    }
}
