//! FHIRPath System types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag of a primitive value; one per `Value` variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemType {
    Boolean,
    String,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    Decimal,
    Date,
    DateTime,
    Time,
    Quantity,
    Ratio,
    Code,
    Concept,
}

impl SystemType {
    pub const ALL: [SystemType; 12] = [
        Self::Boolean,
        Self::String,
        Self::Integer,
        Self::Long,
        Self::Decimal,
        Self::Date,
        Self::DateTime,
        Self::Time,
        Self::Quantity,
        Self::Ratio,
        Self::Code,
        Self::Concept,
    ];

    /// Get the full qualified name
    pub const fn qualified_name(&self) -> &'static str {
        match self {
            Self::Boolean => "System.Boolean",
            Self::String => "System.String",
            Self::Integer => "System.Integer",
            Self::Long => "System.Long",
            Self::Decimal => "System.Decimal",
            Self::Date => "System.Date",
            Self::DateTime => "System.DateTime",
            Self::Time => "System.Time",
            Self::Quantity => "System.Quantity",
            Self::Ratio => "System.Ratio",
            Self::Code => "System.Code",
            Self::Concept => "System.Concept",
        }
    }

    /// Get the simple name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Long => "Long",
            Self::Decimal => "Decimal",
            Self::Date => "Date",
            Self::DateTime => "DateTime",
            Self::Time => "Time",
            Self::Quantity => "Quantity",
            Self::Ratio => "Ratio",
            Self::Code => "Code",
            Self::Concept => "Concept",
        }
    }

    /// Resolve a type specifier as written in `is`, `as` and `ofType`.
    ///
    /// Accepts the bare name, the `System.` qualified name and the FHIR
    /// primitive spelling (`integer`, `dateTime`, `code`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("System.").unwrap_or(name);
        let ty = match name {
            "Boolean" | "boolean" => Self::Boolean,
            "String" | "string" | "uri" | "url" | "canonical" | "id" | "markdown" | "oid"
            | "uuid" | "base64Binary" => Self::String,
            "Integer" | "integer" | "positiveInt" | "unsignedInt" => Self::Integer,
            "Long" | "integer64" => Self::Long,
            "Decimal" | "decimal" => Self::Decimal,
            "Date" | "date" => Self::Date,
            "DateTime" | "dateTime" | "instant" => Self::DateTime,
            "Time" | "time" => Self::Time,
            "Quantity" => Self::Quantity,
            "Ratio" => Self::Ratio,
            "Code" | "code" | "Coding" => Self::Code,
            "Concept" | "CodeableConcept" => Self::Concept,
            _ => return None,
        };
        Some(ty)
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Long | Self::Decimal)
    }

    pub const fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::DateTime | Self::Time)
    }

    /// Check if this type supports `<`, `<=`, `>`, `>=`
    pub const fn is_ordered(&self) -> bool {
        matches!(
            self,
            Self::Integer
                | Self::Long
                | Self::Decimal
                | Self::String
                | Self::Date
                | Self::DateTime
                | Self::Time
                | Self::Quantity
        )
    }

    /// Implicit promotions: Integer -> Long -> Decimal -> Quantity,
    /// Date -> DateTime and Code -> Concept.
    pub const fn can_implicitly_convert_to(&self, target: SystemType) -> bool {
        matches!(
            (self, target),
            (Self::Integer, Self::Integer | Self::Long | Self::Decimal | Self::Quantity)
                | (Self::Long, Self::Long | Self::Decimal | Self::Quantity)
                | (Self::Decimal, Self::Decimal | Self::Quantity)
                | (Self::Date, Self::Date | Self::DateTime)
                | (Self::Code, Self::Code | Self::Concept)
        ) || self.same_as(target)
    }

    const fn same_as(&self, other: SystemType) -> bool {
        *self as u8 == other as u8
    }
}

impl fmt::Display for SystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
