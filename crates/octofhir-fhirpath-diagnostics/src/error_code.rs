//! FHIRPath error codes following a structured numbering system
//!
//! Error code ranges:
//! - FP0100-FP0199: Bind errors (symbol resolution, scoping)
//! - FP0200-FP0299: Evaluation errors (runtime)
//! - FP0400-FP0499: Host errors (callbacks, internal failures)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    /// Check if this is a bind error (0100-0199)
    pub const fn is_bind_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    /// Check if this is an evaluation error (0200-0299)
    pub const fn is_evaluation_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Check if this is a host error (0400-0499)
    pub const fn is_host_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FP{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Bind errors (0100-0199)
    map.insert(
        101,
        ErrorInfo::new("Unknown function or operator")
            .with_help("Check the name and the number of arguments against the symbol table"),
    );
    map.insert(
        102,
        ErrorInfo::new("No matching overload")
            .with_help("None of the registered signatures accepts the runtime argument types"),
    );
    map.insert(103, ErrorInfo::new("Unknown variable"));
    map.insert(
        104,
        ErrorInfo::new("Variable redefined")
            .with_help("A variable can be defined only once per scope"),
    );

    // Evaluation errors (0200-0299)
    map.insert(200, ErrorInfo::new("Evaluation failed"));
    map.insert(201, ErrorInfo::new("Invalid conversion"));
    map.insert(
        202,
        ErrorInfo::new("Cardinality violation")
            .with_help("The operation expects at most one item in its input"),
    );
    map.insert(203, ErrorInfo::new("Invalid arithmetic"));
    map.insert(204, ErrorInfo::new("Incomparable operands"));
    map.insert(205, ErrorInfo::new("Invalid argument"));
    map.insert(206, ErrorInfo::new("Overflow error"));

    // Host errors (0400-0499)
    map.insert(400, ErrorInfo::new("Internal error"));
    map.insert(401, ErrorInfo::new("Callback failed"));

    map
});

// Bind errors
pub const FP0101: ErrorCode = ErrorCode::new(101);
pub const FP0102: ErrorCode = ErrorCode::new(102);
pub const FP0103: ErrorCode = ErrorCode::new(103);
pub const FP0104: ErrorCode = ErrorCode::new(104);

// Evaluation errors
pub const FP0200: ErrorCode = ErrorCode::new(200);
pub const FP0201: ErrorCode = ErrorCode::new(201);
pub const FP0202: ErrorCode = ErrorCode::new(202);
pub const FP0203: ErrorCode = ErrorCode::new(203);
pub const FP0204: ErrorCode = ErrorCode::new(204);
pub const FP0205: ErrorCode = ErrorCode::new(205);
pub const FP0206: ErrorCode = ErrorCode::new(206);

// Host errors
pub const FP0400: ErrorCode = ErrorCode::new(400);
pub const FP0401: ErrorCode = ErrorCode::new(401);
