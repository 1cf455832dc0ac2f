//! Typed access to the step's string inputs.

use std::collections::HashMap;

use crate::error::ConfigError;

const TRUE_VALUES: [&str; 3] = ["true", "True", "TRUE"];
const FALSE_VALUES: [&str; 3] = ["false", "False", "FALSE"];

/// Flat key/value store the inputs come from.
pub trait InputSource {
    fn raw(&self, key: &str) -> Option<String>;
}

/// Inputs passed by the CI runner as `INPUT_<NAME>` environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvInputs;

impl EnvInputs {
    pub fn variable_name(key: &str) -> String {
        format!("INPUT_{}", key.replace(' ', "_").to_uppercase())
    }
}

impl InputSource for EnvInputs {
    fn raw(&self, key: &str) -> Option<String> {
        std::env::var(Self::variable_name(key)).ok()
    }
}

impl InputSource for HashMap<String, String> {
    fn raw(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
    Yes,
    /// Keep surrounding whitespace, e.g. for block text whose indentation
    /// matters.
    No,
}

/// Accessors with the CI conventions: an empty value counts as absent and
/// values are trimmed unless asked otherwise.
pub struct Inputs<'a> {
    source: &'a dyn InputSource,
}

impl<'a> Inputs<'a> {
    pub fn new(source: &'a dyn InputSource) -> Self {
        Self { source }
    }

    pub fn optional(&self, key: &str, trim: Trim) -> Option<String> {
        let value = self.source.raw(key)?;
        let value = match trim {
            Trim::Yes => value.trim().to_string(),
            Trim::No => value,
        };
        (!value.is_empty()).then_some(value)
    }

    pub fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key, Trim::Yes)
            .ok_or_else(|| ConfigError::missing_input(key))
    }

    pub fn string(&self, key: &str, default: &str) -> String {
        self.optional(key, Trim::Yes)
            .unwrap_or_else(|| default.to_string())
    }

    /// Leading base-10 integer of the input, or `None` when it is absent.
    /// Trailing text is ignored, so `"1.5"` reads as 1.
    pub fn optional_number(&self, key: &str) -> Result<Option<i64>, ConfigError> {
        match self.optional(key, Trim::Yes) {
            None => Ok(None),
            Some(value) => leading_integer(&value)
                .map(Some)
                .ok_or_else(|| ConfigError::invalid_number(key)),
        }
    }

    /// YAML 1.2 core schema booleans; anything else is rejected.
    pub fn boolean(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(key, Trim::Yes) {
            None => Ok(default),
            Some(value) if TRUE_VALUES.contains(&value.as_str()) => Ok(true),
            Some(value) if FALSE_VALUES.contains(&value.as_str()) => Ok(false),
            Some(_) => Err(ConfigError::invalid_boolean(key)),
        }
    }
}

fn leading_integer(value: &str) -> Option<i64> {
    let sign = usize::from(value.starts_with(['+', '-']));
    let digits = value[sign..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    value[..sign + digits].parse().ok()
}
