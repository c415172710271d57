//! Label model.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static LABEL_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid color regex"));

/// Named color tag that can be attached to items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Lowercase, trimmed; unique per store.
    pub name: String,
    /// `#RRGGBB`.
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelValidationError {
    EmptyName,
    InvalidColor(String),
}

impl Display for LabelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "label name cannot be empty"),
            Self::InvalidColor(value) => {
                write!(f, "label color `{value}` is not a #RRGGBB value")
            }
        }
    }
}

impl Error for LabelValidationError {}

impl Label {
    /// Builds a label with a normalized name and validated color.
    pub fn new(name: &str, color: &str) -> Result<Self, LabelValidationError> {
        let label = Self {
            name: normalize_label_name(name),
            color: color.trim().to_string(),
        };
        label.validate()?;
        Ok(label)
    }

    pub fn validate(&self) -> Result<(), LabelValidationError> {
        if self.name.is_empty() {
            return Err(LabelValidationError::EmptyName);
        }
        if !LABEL_COLOR_RE.is_match(&self.color) {
            return Err(LabelValidationError::InvalidColor(self.color.clone()));
        }
        Ok(())
    }
}

pub fn normalize_label_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{Label, LabelValidationError};

    #[test]
    fn name_is_normalized() {
        let label = Label::new("  Groceries ", "#00ff00").unwrap();
        assert_eq!(label.name, "groceries");
    }

    #[test]
    fn color_must_be_hex_triplet() {
        assert_eq!(
            Label::new("home", "green"),
            Err(LabelValidationError::InvalidColor("green".to_string()))
        );
        assert_eq!(
            Label::new(" ", "#000000"),
            Err(LabelValidationError::EmptyName)
        );
    }
}
