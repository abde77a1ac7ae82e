//! # Tunable Registry
//!
//! Operator-facing configuration schema. Each tunable is one of:
//!
//! | Kind          | Parameters                 | JSON value |
//! |---------------|----------------------------|------------|
//! | Int slider    | `min, max, step`           | number     |
//! | Float slider  | `min, max, step, scale`    | number     |
//! | Toggle        | none                       | bool       |
//! | Text          | none                       | string     |
//!
//! The registry serializes to a flat `{ name: value }` JSON object. On
//! load, unknown names and invalid values are logged and skipped; they
//! never abort the load.

use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::error::{ConfigError, ConfigResult};
use crate::segmented::SegmentedStore;

/// Shape and bounds of a tunable.
#[derive(Clone, Debug, PartialEq)]
pub enum TunableKind {
    /// Integer slider.
    IntSlider {
        /// Minimum value.
        min: i64,
        /// Maximum value.
        max: i64,
        /// Slider step.
        step: i64,
    },
    /// Float slider presented as an integer slider multiplied by `scale`.
    FloatSlider {
        /// Minimum value.
        min: f64,
        /// Maximum value.
        max: f64,
        /// Slider step.
        step: f64,
        /// Presentation scale.
        scale: f64,
    },
    /// Boolean toggle.
    Toggle,
    /// Free text or number field.
    Text,
}

impl TunableKind {
    fn expected(&self) -> &'static str {
        match self {
            Self::IntSlider { .. } => "an integer",
            Self::FloatSlider { .. } => "a number",
            Self::Toggle => "a boolean",
            Self::Text => "text",
        }
    }
}

/// Current value of a tunable.
#[derive(Clone, Debug, PartialEq)]
pub enum TunableValue {
    /// Int slider value.
    Int(i64),
    /// Float slider value.
    Float(f64),
    /// Toggle value.
    Bool(bool),
    /// Text value.
    Text(String),
}

impl TunableValue {
    fn to_json(&self) -> Value {
        match self {
            Self::Int(v) => Value::Number(Number::from(*v)),
            Self::Float(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
            Self::Bool(v) => Value::Bool(*v),
            Self::Text(v) => Value::String(v.clone()),
        }
    }
}

/// A named tunable.
#[derive(Clone, Debug, PartialEq)]
pub struct Tunable {
    /// Display name, also the persisted key.
    pub name: String,
    /// Shape and bounds.
    pub kind: TunableKind,
    /// Current value.
    pub value: TunableValue,
    /// Registered default.
    pub default: TunableValue,
}

impl Tunable {
    /// Slider position for float sliders (`value * scale`, rounded).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn slider_position(&self) -> Option<i64> {
        match (&self.kind, &self.value) {
            (TunableKind::FloatSlider { scale, .. }, TunableValue::Float(v)) => {
                Some((v * scale).round() as i64)
            }
            (TunableKind::IntSlider { .. }, TunableValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn validate(&self, value: &TunableValue) -> ConfigResult<()> {
        let wrong_kind = || ConfigError::WrongKind {
            name: self.name.clone(),
            expected: self.kind.expected(),
        };
        match (&self.kind, value) {
            (TunableKind::IntSlider { min, max, .. }, TunableValue::Int(v)) => {
                if v < min || v > max {
                    return Err(ConfigError::OutOfRange {
                        name: self.name.clone(),
                        value: *v as f64,
                        min: *min as f64,
                        max: *max as f64,
                    });
                }
                Ok(())
            }
            (TunableKind::FloatSlider { min, max, .. }, TunableValue::Float(v)) => {
                if !v.is_finite() || v < min || v > max {
                    return Err(ConfigError::OutOfRange {
                        name: self.name.clone(),
                        value: *v,
                        min: *min,
                        max: *max,
                    });
                }
                Ok(())
            }
            (TunableKind::Toggle, TunableValue::Bool(_))
            | (TunableKind::Text, TunableValue::Text(_)) => Ok(()),
            _ => Err(wrong_kind()),
        }
    }

    fn value_from_json(&self, json: &Value) -> ConfigResult<TunableValue> {
        let wrong_kind = || ConfigError::WrongKind {
            name: self.name.clone(),
            expected: self.kind.expected(),
        };
        let value = match (&self.kind, json) {
            (TunableKind::IntSlider { .. }, Value::Number(n)) => {
                TunableValue::Int(n.as_i64().ok_or_else(wrong_kind)?)
            }
            (TunableKind::FloatSlider { .. }, Value::Number(n)) => {
                TunableValue::Float(n.as_f64().ok_or_else(wrong_kind)?)
            }
            (TunableKind::Toggle, Value::Bool(b)) => TunableValue::Bool(*b),
            (TunableKind::Text, Value::String(s)) => TunableValue::Text(s.clone()),
            (TunableKind::Text, Value::Number(n)) => TunableValue::Text(n.to_string()),
            _ => return Err(wrong_kind()),
        };
        self.validate(&value)?;
        Ok(value)
    }
}

/// Ordered collection of tunables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TunableRegistry {
    entries: Vec<Tunable>,
}

impl TunableRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an integer slider.
    #[must_use]
    pub fn int_slider(mut self, name: &str, min: i64, max: i64, step: i64, default: i64) -> Self {
        self.push(name, TunableKind::IntSlider { min, max, step }, TunableValue::Int(default));
        self
    }

    /// Registers a float slider.
    #[must_use]
    pub fn float_slider(
        mut self,
        name: &str,
        min: f64,
        max: f64,
        step: f64,
        scale: f64,
        default: f64,
    ) -> Self {
        self.push(
            name,
            TunableKind::FloatSlider { min, max, step, scale },
            TunableValue::Float(default),
        );
        self
    }

    /// Registers a toggle.
    #[must_use]
    pub fn toggle(mut self, name: &str, default: bool) -> Self {
        self.push(name, TunableKind::Toggle, TunableValue::Bool(default));
        self
    }

    /// Registers a text field.
    #[must_use]
    pub fn text(mut self, name: &str, default: &str) -> Self {
        self.push(name, TunableKind::Text, TunableValue::Text(default.to_owned()));
        self
    }

    fn push(&mut self, name: &str, kind: TunableKind, default: TunableValue) {
        debug_assert!(self.find(name).is_none(), "tunable {name} registered twice");
        self.entries.push(Tunable {
            name: name.to_owned(),
            kind,
            value: default.clone(),
            default,
        });
    }

    fn find(&self, name: &str) -> Option<&Tunable> {
        self.entries.iter().find(|t| t.name == name)
    }

    /// All tunables in registration order.
    #[must_use]
    pub fn entries(&self) -> &[Tunable] {
        &self.entries
    }

    /// Current value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TunableValue> {
        self.find(name).map(|t| &t.value)
    }

    /// Integer value of `name`, if it is an int slider.
    #[must_use]
    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            TunableValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float value of `name`, if it is a float slider.
    #[must_use]
    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            TunableValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Toggle value of `name`.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            TunableValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Text value of `name`.
    #[must_use]
    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            TunableValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Sets a value after validating kind and range.
    ///
    /// # Errors
    ///
    /// Unknown name, wrong kind, or out-of-range value.
    pub fn set(&mut self, name: &str, value: TunableValue) -> ConfigResult<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| ConfigError::UnknownTunable(name.to_owned()))?;
        entry.validate(&value)?;
        entry.value = value;
        Ok(())
    }

    /// Restores every tunable to its default.
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.value = entry.default.clone();
        }
    }

    /// Flat `{ name: value }` JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|t| (t.name.clone(), t.value.to_json()))
            .collect();
        Value::Object(map)
    }

    /// Applies a flat JSON object, skipping unknown or invalid entries.
    ///
    /// Returns the number of values applied.
    pub fn apply_json(&mut self, json: &Value) -> usize {
        let Value::Object(map) = json else {
            warn!("saved config is not a JSON object, ignoring");
            return 0;
        };
        let mut applied = 0;
        for (name, raw) in map {
            let Some(entry) = self.entries.iter_mut().find(|t| &t.name == name) else {
                warn!(tunable = %name, "unknown config key, skipping");
                continue;
            };
            match entry.value_from_json(raw) {
                Ok(value) => {
                    entry.value = value;
                    applied += 1;
                }
                Err(err) => warn!(tunable = %name, error = %err, "invalid config value, skipping"),
            }
        }
        applied
    }

    /// Persists the registry as segmented JSON under `key`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn save(&self, store: &SegmentedStore<'_>, key: &str) -> crate::PersistResult<()> {
        store.save_json(key, &self.to_json())
    }

    /// Loads saved values from `key`. Returns `false` when nothing usable
    /// was saved.
    pub fn load(&mut self, store: &SegmentedStore<'_>, key: &str) -> bool {
        match store.load_json::<Value>(key) {
            Some(json) => {
                self.apply_json(&json);
                true
            }
            None => false,
        }
    }
}
