//! Typed parameter schema for effect, generator, and transition plugins.
//!
//! Plugins declare their parameters as a static list of
//! [`ParamDescriptor`]s. The control surface validates incoming values
//! against the descriptors at the boundary; the modulation engine
//! clamps its per-frame writes into the declared range. This split
//! keeps the render path free of validation errors: once a value is in
//! a clip's parameter map it is known to satisfy the schema.
//!
//! Values are dynamic ([`ParamValue`]) and serialize as plain JSON
//! (numbers, booleans, strings, small arrays) so session snapshots stay
//! hand-editable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameter map keyed by parameter name.
///
/// `BTreeMap` keeps iteration order stable, which makes frame
/// snapshots and session files deterministic.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// The declared type of a plugin parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Continuous value with optional bounds.
    Float,
    /// Integer value with optional bounds.
    Int,
    /// On/off toggle.
    Bool,
    /// One of a fixed set of options.
    Select,
    /// RGB color.
    Color,
    /// A `[low, high]` span, both ends bounded by min/max.
    Range,
    /// Free-form text.
    String,
}

/// A dynamic parameter value.
///
/// Untagged so the JSON form is the natural literal: `0.5`, `3`,
/// `true`, `"sine"`, `[255, 0, 0]`, `[0.2, 0.8]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean toggle.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// RGB color triplet.
    Color([u8; 3]),
    /// `[low, high]` span.
    Span([f64; 2]),
    /// Text, used by both `select` and `string` parameters.
    Text(String),
}

impl ParamValue {
    /// Numeric view as `f64`; integers widen, everything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Numeric view as `f32`.
    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|v| v as f32)
    }

    /// Integer view.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean view.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Text view.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Color view.
    pub fn as_color(&self) -> Option<[u8; 3]> {
        match self {
            ParamValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Span view.
    pub fn as_span(&self) -> Option<[f64; 2]> {
        match self {
            ParamValue::Span(s) => Some(*s),
            _ => None,
        }
    }
}

/// Const-constructible default for a [`ParamDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    /// Float default.
    Float(f64),
    /// Integer default.
    Int(i64),
    /// Boolean default.
    Bool(bool),
    /// Text default (select option or string).
    Text(&'static str),
    /// Color default.
    Color([u8; 3]),
    /// Span default.
    Span(f64, f64),
}

impl ParamDefault {
    fn to_value(self) -> ParamValue {
        match self {
            ParamDefault::Float(v) => ParamValue::Float(v),
            ParamDefault::Int(v) => ParamValue::Int(v),
            ParamDefault::Bool(v) => ParamValue::Bool(v),
            ParamDefault::Text(s) => ParamValue::Text(s.to_owned()),
            ParamDefault::Color(c) => ParamValue::Color(c),
            ParamDefault::Span(lo, hi) => ParamValue::Span([lo, hi]),
        }
    }
}

/// Errors produced by parameter validation.
#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    /// The value's type does not match the descriptor.
    #[error("parameter '{name}' expects {expected:?}")]
    TypeMismatch {
        /// Parameter name.
        name: String,
        /// Declared type.
        expected: ParamType,
    },

    /// Numeric value outside the declared bounds.
    #[error("parameter '{name}' value {value} outside [{min}, {max}]")]
    OutOfRange {
        /// Parameter name.
        name: String,
        /// Offending value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// Select value not among the declared options.
    #[error("parameter '{name}' has no option '{value}'")]
    UnknownOption {
        /// Parameter name.
        name: String,
        /// Offending value.
        value: String,
    },

    /// The plugin declares no such parameter.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
}

/// Describes a single plugin parameter for validation and UI generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Stable parameter name, the key in the clip's parameter map.
    pub name: &'static str,
    /// Declared type.
    pub param_type: ParamType,
    /// Default installed when the plugin is added to a chain.
    pub default: ParamDefault,
    /// Lower bound for numeric and span types.
    pub min: Option<f64>,
    /// Upper bound for numeric and span types.
    pub max: Option<f64>,
    /// Options for `select` parameters.
    pub options: &'static [&'static str],
}

impl ParamDescriptor {
    /// Bounded float parameter.
    pub const fn float(name: &'static str, default: f64, min: f64, max: f64) -> Self {
        Self {
            name,
            param_type: ParamType::Float,
            default: ParamDefault::Float(default),
            min: Some(min),
            max: Some(max),
            options: &[],
        }
    }

    /// Bounded integer parameter.
    pub const fn int(name: &'static str, default: i64, min: i64, max: i64) -> Self {
        Self {
            name,
            param_type: ParamType::Int,
            default: ParamDefault::Int(default),
            min: Some(min as f64),
            max: Some(max as f64),
            options: &[],
        }
    }

    /// Boolean parameter.
    pub const fn toggle(name: &'static str, default: bool) -> Self {
        Self {
            name,
            param_type: ParamType::Bool,
            default: ParamDefault::Bool(default),
            min: None,
            max: None,
            options: &[],
        }
    }

    /// Select parameter over a fixed option list.
    pub const fn select(
        name: &'static str,
        default: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            param_type: ParamType::Select,
            default: ParamDefault::Text(default),
            min: None,
            max: None,
            options,
        }
    }

    /// RGB color parameter.
    pub const fn color(name: &'static str, default: [u8; 3]) -> Self {
        Self {
            name,
            param_type: ParamType::Color,
            default: ParamDefault::Color(default),
            min: None,
            max: None,
            options: &[],
        }
    }

    /// Span parameter bounded by `[min, max]`.
    pub const fn span(name: &'static str, default: (f64, f64), min: f64, max: f64) -> Self {
        Self {
            name,
            param_type: ParamType::Range,
            default: ParamDefault::Span(default.0, default.1),
            min: Some(min),
            max: Some(max),
            options: &[],
        }
    }

    /// Free-form string parameter.
    pub const fn text(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            param_type: ParamType::String,
            default: ParamDefault::Text(default),
            min: None,
            max: None,
            options: &[],
        }
    }

    /// The default as a [`ParamValue`].
    pub fn default_value(&self) -> ParamValue {
        self.default.to_value()
    }

    /// Check a value against type, bounds, and options.
    pub fn validate(&self, value: &ParamValue) -> Result<(), ParamError> {
        let mismatch = || ParamError::TypeMismatch {
            name: self.name.to_owned(),
            expected: self.param_type,
        };
        match self.param_type {
            ParamType::Float => {
                let v = value.as_f64().ok_or_else(mismatch)?;
                self.check_bounds(v)
            }
            ParamType::Int => {
                let v = value.as_i64().ok_or_else(mismatch)?;
                self.check_bounds(v as f64)
            }
            ParamType::Bool => value.as_bool().map(|_| ()).ok_or_else(mismatch),
            ParamType::Select => {
                let text = value.as_text().ok_or_else(mismatch)?;
                if self.options.contains(&text) {
                    Ok(())
                } else {
                    Err(ParamError::UnknownOption {
                        name: self.name.to_owned(),
                        value: text.to_owned(),
                    })
                }
            }
            ParamType::Color => value.as_color().map(|_| ()).ok_or_else(mismatch),
            ParamType::Range => {
                let [lo, hi] = value.as_span().ok_or_else(mismatch)?;
                self.check_bounds(lo)?;
                self.check_bounds(hi)
            }
            ParamType::String => value.as_text().map(|_| ()).ok_or_else(mismatch),
        }
    }

    /// Clamp a numeric value into the declared bounds.
    ///
    /// Non-numeric descriptors return the value unchanged. Used by the
    /// modulation engine, whose writes must always land in range.
    pub fn clamp(&self, value: ParamValue) -> ParamValue {
        let (min, max) = (
            self.min.unwrap_or(f64::NEG_INFINITY),
            self.max.unwrap_or(f64::INFINITY),
        );
        match (self.param_type, value) {
            (ParamType::Float, ParamValue::Float(v)) => ParamValue::Float(v.clamp(min, max)),
            (ParamType::Float, ParamValue::Int(v)) => {
                ParamValue::Float((v as f64).clamp(min, max))
            }
            (ParamType::Int, ParamValue::Int(v)) => {
                ParamValue::Int(v.clamp(min as i64, max as i64))
            }
            (ParamType::Int, ParamValue::Float(v)) => {
                ParamValue::Int((v.round() as i64).clamp(min as i64, max as i64))
            }
            (ParamType::Range, ParamValue::Span([lo, hi])) => {
                ParamValue::Span([lo.clamp(min, max), hi.clamp(min, max)])
            }
            (_, v) => v,
        }
    }

    fn check_bounds(&self, v: f64) -> Result<(), ParamError> {
        let min = self.min.unwrap_or(f64::NEG_INFINITY);
        let max = self.max.unwrap_or(f64::INFINITY);
        if v < min || v > max {
            return Err(ParamError::OutOfRange {
                name: self.name.to_owned(),
                value: v,
                min,
                max,
            });
        }
        Ok(())
    }
}

/// Build the default parameter map for a descriptor list.
pub fn default_params(descriptors: &[ParamDescriptor]) -> ParamMap {
    descriptors
        .iter()
        .map(|d| (d.name.to_owned(), d.default_value()))
        .collect()
}
