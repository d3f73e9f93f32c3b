//! Variant Expansion
//!
//! Turns caller-supplied [`CompileParameters`] into one complete
//! [`VariantAssignment`] per modifier key. Scalar props seed the `default`
//! assignment; per-modifier maps override it for their own keys.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RegistryError, Result};

/// The unconditional baseline modifier key.
pub const DEFAULT_MODIFIER: &str = "default";

/// Value supplied for a single prop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Literal(String),
    PerModifier(IndexMap<String, String>),
}

impl ParameterValue {
    pub fn literal(value: impl Into<String>) -> Self {
        ParameterValue::Literal(value.into())
    }

    pub fn per_modifier<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ParameterValue::PerModifier(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// All literal values this parameter mentions, in order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            ParameterValue::Literal(v) => vec![v.as_str()],
            ParameterValue::PerModifier(map) => map.values().map(String::as_str).collect(),
        }
    }
}

/// Prop name → value or per-modifier value map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompileParameters(IndexMap<String, ParameterValue>);

impl CompileParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, prop: impl Into<String>, value: ParameterValue) -> Self {
        self.0.insert(prop.into(), value);
        self
    }

    pub fn insert(&mut self, prop: impl Into<String>, value: ParameterValue) {
        self.0.insert(prop.into(), value);
    }

    pub fn get(&self, prop: &str) -> Option<&ParameterValue> {
        self.0.get(prop)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builds parameters from untyped host input.
    ///
    /// Strings, booleans and numbers become literals (`true` → `"true"`);
    /// objects of such scalars become per-modifier maps. Any other shape is
    /// rejected with [`RegistryError::MalformedParameters`].
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(entries) = value else {
            return Err(RegistryError::MalformedParameters {
                prop: "*".to_string(),
            });
        };

        let mut params = CompileParameters::new();
        for (prop, raw) in entries {
            let parsed = match raw {
                Value::Object(modifiers) => {
                    let mut map = IndexMap::with_capacity(modifiers.len());
                    for (modifier, inner) in modifiers {
                        let literal = scalar_to_string(inner).ok_or_else(|| {
                            RegistryError::MalformedParameters { prop: prop.clone() }
                        })?;
                        map.insert(modifier.clone(), literal);
                    }
                    ParameterValue::PerModifier(map)
                }
                other => ParameterValue::Literal(scalar_to_string(other).ok_or_else(|| {
                    RegistryError::MalformedParameters { prop: prop.clone() }
                })?),
            };
            params.insert(prop.clone(), parsed);
        }
        Ok(params)
    }

    /// Stable JSON text used for cache keys and deferred calls.
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl<K: Into<String>> FromIterator<(K, ParameterValue)> for CompileParameters {
    fn from_iter<I: IntoIterator<Item = (K, ParameterValue)>>(iter: I) -> Self {
        CompileParameters(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Prop name → literal value for a single modifier key.
pub type VariantAssignment = IndexMap<String, String>;

/// Full assignments keyed by modifier; `default` is always first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedVariants {
    variants: IndexMap<String, VariantAssignment>,
}

impl ExpandedVariants {
    pub fn default_assignment(&self) -> &VariantAssignment {
        // Always inserted first by `expand_variants`.
        &self.variants[0]
    }

    pub fn get(&self, modifier: &str) -> Option<&VariantAssignment> {
        self.variants.get(modifier)
    }

    /// Modifier keys in output order.
    pub fn modifiers(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariantAssignment)> {
        self.variants.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Expands per-modifier parameters into full assignments.
///
/// ```
/// use tdc_compiler::{expand_variants, CompileParameters, ParameterValue};
///
/// let params = CompileParameters::new()
///     .with("size", ParameterValue::per_modifier([("default", "sm"), ("hover:md", "md")]))
///     .with("destructive", ParameterValue::literal("true"));
/// let variants = expand_variants(&params);
/// let keys: Vec<&str> = variants.modifiers().collect();
/// assert_eq!(keys, ["default", "hover:md"]);
/// assert_eq!(variants.get("hover:md").unwrap()["size"], "md");
/// assert_eq!(variants.get("hover:md").unwrap()["destructive"], "true");
/// ```
pub fn expand_variants(params: &CompileParameters) -> ExpandedVariants {
    let mut defaults = VariantAssignment::new();
    let mut overrides: IndexMap<String, VariantAssignment> = IndexMap::new();

    for (prop, value) in params.iter() {
        match value {
            ParameterValue::Literal(v) => {
                defaults.insert(prop.clone(), v.clone());
            }
            ParameterValue::PerModifier(map) => {
                for (modifier, v) in map {
                    if modifier == DEFAULT_MODIFIER {
                        defaults.insert(prop.clone(), v.clone());
                    } else {
                        overrides
                            .entry(modifier.clone())
                            .or_default()
                            .insert(prop.clone(), v.clone());
                    }
                }
            }
        }
    }

    let mut variants = IndexMap::with_capacity(overrides.len() + 1);
    variants.insert(DEFAULT_MODIFIER.to_string(), defaults.clone());
    for (modifier, partial) in overrides {
        let mut full = defaults.clone();
        full.extend(partial);
        variants.insert(modifier, full);
    }

    ExpandedVariants { variants }
}
