//! Attribute validators
//!
//! Validators only look at known values. Null and unknown values pass, so a
//! validator can run on configuration that still contains unknowns.

use crate::error::{Result, TfplugError};
use crate::types::{AttributePath, Diagnostic, Dynamic};

pub trait Validator: Send + Sync {
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>);
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for StringLengthValidator {
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(s) = value.as_str() else {
            return;
        };
        let len = s.trim().chars().count();
        if let Some(min) = self.min {
            if len < min {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must have minimum length of {}", path, min),
                        format!("Got length {}", len),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
        if let Some(max) = self.max {
            if len > max {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must have maximum length of {}", path, max),
                        format!("Got length {}", len),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

pub struct StringPatternValidator {
    pattern: regex::Regex,
    description: String,
}

impl StringPatternValidator {
    pub fn new(pattern: &str, description: impl Into<String>) -> Result<Self> {
        let pattern = regex::Regex::new(pattern)
            .map_err(|e| TfplugError::InvalidConfiguration(format!("bad pattern: {}", e)))?;
        Ok(Self {
            pattern,
            description: description.into(),
        })
    }
}

impl Validator for StringPatternValidator {
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must match {}", path, self.description),
                        format!("Value '{}' does not match pattern", s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// Accepts one of a fixed set of strings
pub struct OneOfValidator {
    pub allowed: &'static [&'static str],
}

impl Validator for OneOfValidator {
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.allowed.contains(&s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must be one of {:?}", path, self.allowed),
                        format!("Got '{}'", s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// Every known element of a list or set is a whole number of at least 1
pub struct PositiveIntegerElementsValidator;

impl Validator for PositiveIntegerElementsValidator {
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(elements) = value.as_elements() else {
            return;
        };
        for element in elements {
            if let Some(n) = element.as_number() {
                if n.fract() != 0.0 || n < 1.0 {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must only contain positive integers", path),
                            format!("Got {}", n),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
        }
    }
}
