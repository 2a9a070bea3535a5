//! Coded values

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// A code from a code system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Code {
    pub system: Option<String>,
    pub code: String,
    pub display: Option<String>,
    pub version: Option<String>,
}

impl Code {
    pub fn new(system: Option<&str>, code: impl Into<String>) -> Self {
        Self {
            system: system.map(str::to_string),
            code: code.into(),
            display: None,
            version: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Every element matches
    pub fn is_equal_to(&self, other: &Self) -> bool {
        self == other
    }

    /// Same code in the same system; version and display may differ
    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        self.code == other.code && self.system == other.system
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code '{}'", self.code)?;
        if let Some(system) = &self.system {
            write!(f, " from \"{system}\"")?;
        }
        if let Some(version) = &self.version {
            write!(f, " version '{version}'")?;
        }
        if let Some(display) = &self.display {
            write!(f, " display '{display}'")?;
        }
        Ok(())
    }
}

/// A non-empty ordered set of codes that mean the same thing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Concept {
    codes: SmallVec<[Code; 2]>,
    pub display: Option<String>,
}

impl Concept {
    /// `None` when `codes` is empty
    pub fn new(codes: impl IntoIterator<Item = Code>, display: Option<&str>) -> Option<Self> {
        let codes: SmallVec<[Code; 2]> = codes.into_iter().collect();
        (!codes.is_empty()).then(|| Self {
            codes,
            display: display.map(str::to_string),
        })
    }

    pub fn from_code(code: Code) -> Self {
        let display = code.display.clone();
        Self {
            codes: smallvec::smallvec![code],
            display,
        }
    }

    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    /// Same codes in the same order
    pub fn is_equal_to(&self, other: &Self) -> bool {
        self.codes.len() == other.codes.len()
            && self.codes.iter().zip(&other.codes).all(|(l, r)| l.is_equal_to(r))
    }

    /// Any code of one is equivalent to any code of the other
    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        self.codes
            .iter()
            .any(|l| other.codes.iter().any(|r| l.is_equivalent_to(r)))
    }
}

impl From<Code> for Concept {
    fn from(code: Code) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Concept {")?;
        for (i, code) in self.codes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{code}")?;
        }
        f.write_str("}")?;
        if let Some(display) = &self.display {
            write!(f, " display '{display}'")?;
        }
        Ok(())
    }
}
