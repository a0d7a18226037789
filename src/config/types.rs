//! Typed option tree read from and written to ForceBalance input files.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::schema::ValueKind;

/// Tokens that parse as `false` for a bool option (compared case-insensitively).
const FALSE_TOKENS: &[&str] = &["0", "false", "no", "off"];

/// A single typed option value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<OptionValue>),
}

impl OptionValue {
    /// Cast one token to the given scalar kind.
    pub fn parse_scalar(kind: ValueKind, token: &str) -> Result<Self, String> {
        match kind {
            ValueKind::Bool => Ok(OptionValue::Bool(
                !FALSE_TOKENS.contains(&token.to_lowercase().as_str()),
            )),
            ValueKind::Int => token
                .parse::<i64>()
                .map(OptionValue::Int)
                .map_err(|e| format!("'{token}' is not an integer: {e}")),
            ValueKind::Float => token
                .parse::<f64>()
                .map(OptionValue::Float)
                .map_err(|e| format!("'{token}' is not a number: {e}")),
            ValueKind::Str => Ok(OptionValue::Str(token.to_string())),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Float(f) => Some(*f),
            OptionValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Wrap a scalar into a one-element list; lists are returned unchanged.
    pub fn into_list(self) -> Self {
        match self {
            OptionValue::List(_) => self,
            scalar => OptionValue::List(vec![scalar]),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(true) => write!(f, "True"),
            OptionValue::Bool(false) => write!(f, "False"),
            OptionValue::Int(i) => write!(f, "{i}"),
            OptionValue::Float(x) => write!(f, "{x}"),
            OptionValue::Str(s) => write!(f, "{s}"),
            OptionValue::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Float(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

pub type OptionMap = BTreeMap<String, OptionValue>;

/// Options of the `$options` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GeneralOptions {
    values: OptionMap,
}

impl GeneralOptions {
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.values.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn jobtype(&self) -> Option<&str> {
        self.get("jobtype").and_then(OptionValue::as_str)
    }

    /// Force field file names, in the order given.
    pub fn forcefield(&self) -> Vec<&str> {
        match self.get("forcefield") {
            Some(OptionValue::List(items)) => items.iter().filter_map(OptionValue::as_str).collect(),
            Some(OptionValue::Str(s)) => vec![s.as_str()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn values_mut(&mut self) -> &mut OptionMap {
        &mut self.values
    }
}

/// Options of one `$target` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetOptions {
    pub name: String,
    #[serde(flatten)]
    pub values: OptionMap,
}

impl TargetOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: OptionMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Target type, uppercased during parsing.
    pub fn target_type(&self) -> Option<&str> {
        self.values.get("type").and_then(OptionValue::as_str)
    }

    pub fn weight(&self) -> f64 {
        self.values
            .get("weight")
            .and_then(OptionValue::as_f64)
            .unwrap_or(1.0)
    }
}

/// The whole option tree of an input file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InputOptions {
    pub general: GeneralOptions,
    pub priors: BTreeMap<String, f64>,
    /// Targets in the order they were configured.
    pub targets: Vec<TargetOptions>,
}

impl InputOptions {
    pub fn target(&self, name: &str) -> Option<&TargetOptions> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.name.as_str())
    }

    pub fn first_target(&self) -> Option<&TargetOptions> {
        self.targets.first()
    }

    /// Insert a target, replacing an existing one with the same name in place.
    pub fn upsert_target(&mut self, target: TargetOptions) {
        match self.targets.iter_mut().find(|t| t.name == target.name) {
            Some(existing) => *existing = target,
            None => self.targets.push(target),
        }
    }

    /// Overlay new values onto the tree: general options and priors per key, targets per name.
    pub fn merge(
        &mut self,
        general: GeneralOptions,
        priors: BTreeMap<String, f64>,
        targets: Vec<TargetOptions>,
    ) {
        self.general.values.extend(general.values);
        self.priors.extend(priors);
        for target in targets {
            self.upsert_target(target);
        }
    }
}
