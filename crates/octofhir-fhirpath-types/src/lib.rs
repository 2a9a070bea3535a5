//! FHIRPath type system
//!
//! This crate defines the closed family of FHIRPath/CQL primitive values:
//! - System types (Boolean, String, Integer, Long, Decimal, Date, DateTime, Time,
//!   Quantity, Ratio, Code, Concept)
//! - Literal grammars and canonical string forms
//! - The three comparison relations (equality, equivalence, ordering)
//! - The explicit conversion matrix and implicit promotions
//! - Calendar arithmetic on temporal values

pub mod code;
pub mod coercion;
pub mod error;
pub mod quantity;
pub mod system_types;
pub mod temporal;
pub mod value;

pub use code::{Code, Concept};
pub use error::{TypeError, TypeResult};
pub use quantity::{CalendarUnit, Quantity, Ratio, UnitSystem};
pub use system_types::SystemType;
pub use temporal::{Date, DateTime, DateTimePrecision, Time};
pub use value::Value;

pub use rust_decimal::Decimal;
