//! FHIRPath operators with precedence information

use serde::{Deserialize, Serialize};

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Precedence 1 (lowest)
    Implies,

    // Precedence 2
    Or,
    Xor,

    // Precedence 3
    And,

    // Precedence 4
    /// Membership test (element in collection)
    In,
    /// Containment test (collection contains element)
    Contains,

    // Precedence 5
    Equal,
    NotEqual,
    Equivalent,
    NotEquivalent,

    // Precedence 6
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,

    // Precedence 7
    /// Union of collections (`|`)
    Union,

    // Precedence 8
    /// Type test; the right operand is a type name constant
    Is,
    /// Type cast; the right operand is a type name constant
    As,

    // Precedence 9
    Add,
    Subtract,
    /// String concatenation treating empty as `''`
    Concatenate,

    // Precedence 10
    Multiply,
    Divide,
    /// Truncated division
    Div,
    Mod,
}

impl BinaryOp {
    /// Get the precedence level (1-10, higher binds tighter)
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Implies => 1,
            Self::Or | Self::Xor => 2,
            Self::And => 3,
            Self::In | Self::Contains => 4,
            Self::Equal | Self::NotEqual | Self::Equivalent | Self::NotEquivalent => 5,
            Self::Less | Self::LessOrEqual | Self::Greater | Self::GreaterOrEqual => 6,
            Self::Union => 7,
            Self::Is | Self::As => 8,
            Self::Add | Self::Subtract | Self::Concatenate => 9,
            Self::Multiply | Self::Divide | Self::Div | Self::Mod => 10,
        }
    }

    pub const fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Xor | Self::Implies)
    }

    pub const fn is_type_operator(&self) -> bool {
        matches!(self, Self::Is | Self::As)
    }

    /// Get the operator symbol
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Implies => "implies",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::And => "and",
            Self::In => "in",
            Self::Contains => "contains",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Equivalent => "~",
            Self::NotEquivalent => "!~",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Union => "|",
            Self::Is => "is",
            Self::As => "as",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Concatenate => "&",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Div => "div",
            Self::Mod => "mod",
        }
    }
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Negate,
}

impl UnaryOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Negate => "-",
        }
    }
}
