//! Style Compiler
//!
//! Evaluates a registration's template once per modifier key, merges the
//! resulting tokens into conditional class lists and recurses into
//! dependencies through the node's prop mappings.
//!
//! Compilation is a pure function of `(node, parameters)`.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::registration::{PropMapping, RegistrationNode};
use crate::variants::{
    expand_variants, CompileParameters, ExpandedVariants, ParameterValue, VariantAssignment,
    DEFAULT_MODIFIER,
};

// ═══════════════════════════════════════════════════════════════════════════════
// SELECTOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolves conditional template segments against one modifier's assignment.
#[derive(Debug, Clone, Copy)]
pub struct Selector<'a> {
    identifier: &'a str,
    modifier: &'a str,
    assignment: &'a VariantAssignment,
}

impl<'a> Selector<'a> {
    pub fn new(identifier: &'a str, modifier: &'a str, assignment: &'a VariantAssignment) -> Self {
        Self {
            identifier,
            modifier,
            assignment,
        }
    }

    pub fn modifier(&self) -> &str {
        self.modifier
    }

    /// Picks the case for the assigned value of `prop`.
    ///
    /// Falls back to `fallback` when the prop is unset or has no case. Without
    /// a fallback, an unset prop is [`RegistryError::MissingRequiredProp`] and
    /// an uncovered value is [`RegistryError::UnmappedValue`].
    pub fn select(
        &self,
        prop: &str,
        cases: &IndexMap<String, String>,
        fallback: Option<&str>,
    ) -> Result<String> {
        match self.assignment.get(prop) {
            Some(value) => match (cases.get(value), fallback) {
                (Some(hit), _) => Ok(hit.clone()),
                (None, Some(fb)) => Ok(fb.to_string()),
                (None, None) => Err(RegistryError::UnmappedValue {
                    identifier: self.identifier.to_string(),
                    prop: prop.to_string(),
                    value: value.clone(),
                }),
            },
            None => fallback
                .map(str::to_string)
                .ok_or_else(|| RegistryError::MissingRequiredProp {
                    identifier: self.identifier.to_string(),
                    prop: prop.to_string(),
                    modifier: self.modifier.to_string(),
                }),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE RESULT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResult {
    pub styles: IndexMap<String, Vec<String>>,
    pub children: IndexMap<String, CompileResult>,
}

impl CompileResult {
    /// Compact textual object form for splicing into generated code.
    pub fn to_object_literal(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Every token of this result and its children, in first-seen order.
    pub fn all_tokens(&self) -> Vec<&str> {
        let mut seen = IndexSet::new();
        self.collect_tokens(&mut seen);
        seen.into_iter().collect()
    }

    fn collect_tokens<'a>(&'a self, seen: &mut IndexSet<&'a str>) {
        for tokens in self.styles.values() {
            seen.extend(tokens.iter().map(String::as_str));
        }
        for child in self.children.values() {
            child.collect_tokens(seen);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiles `node` for `params`.
///
/// Parameters are checked against the node's props first: unknown keys are
/// [`RegistryError::UnknownProp`], out-of-domain values are
/// [`RegistryError::DomainViolation`].
pub fn compile(node: &RegistrationNode, params: &CompileParameters) -> Result<CompileResult> {
    check_parameters(node, params)?;
    let variants = expand_variants(params);
    debug!(
        identifier = %node.identifier,
        modifiers = variants.len(),
        "compiling registration"
    );

    let mut rendered: Vec<(&str, IndexMap<&str, String>)> = Vec::with_capacity(variants.len());
    for (modifier, assignment) in variants.iter() {
        let selector = Selector::new(&node.identifier, modifier, assignment);
        let mut per_property = IndexMap::with_capacity(node.styles.len());
        for (property, source) in node.styles.iter() {
            per_property.insert(property.as_str(), source.render(&selector)?);
        }
        rendered.push((modifier, per_property));
    }

    let mut styles = IndexMap::with_capacity(node.styles.len());
    for (property, _) in node.styles.iter() {
        styles.insert(property.clone(), merge_property(property, &rendered));
    }

    let mut children = IndexMap::with_capacity(node.dependencies.len());
    for (key, child) in &node.dependencies {
        let child_params = map_child_parameters(node, key, &variants)?;
        children.insert(key.clone(), compile(child, &child_params)?);
    }

    Ok(CompileResult { styles, children })
}

fn check_parameters(node: &RegistrationNode, params: &CompileParameters) -> Result<()> {
    for (prop, value) in params.iter() {
        let Some(domain) = node.domain(prop) else {
            return Err(RegistryError::UnknownProp {
                identifier: node.identifier.clone(),
                prop: prop.clone(),
            });
        };
        for literal in value.values() {
            if !domain.iter().any(|allowed| allowed == literal) {
                return Err(RegistryError::DomainViolation {
                    identifier: node.identifier.clone(),
                    prop: prop.clone(),
                    value: literal.to_string(),
                    allowed: domain.to_vec(),
                });
            }
        }
    }
    Ok(())
}

/// Default tokens first (deduplicated), then each other modifier's tokens
/// that the default list lacks, prefixed with the modifier key.
fn merge_property(property: &str, rendered: &[(&str, IndexMap<&str, String>)]) -> Vec<String> {
    let mut baseline: IndexSet<&str> = IndexSet::new();
    let mut out: IndexSet<String> = IndexSet::new();

    for (modifier, per_property) in rendered {
        let Some(text) = per_property.get(property) else {
            continue;
        };
        if *modifier == DEFAULT_MODIFIER {
            for token in text.split_whitespace() {
                if baseline.insert(token) {
                    out.insert(token.to_string());
                }
            }
        } else {
            for token in text.split_whitespace() {
                if !baseline.contains(token) {
                    out.insert(format!("{}:{}", modifier, token));
                }
            }
        }
    }

    out.into_iter().collect()
}

/// Builds the parameters of dependency `key` from the parent's expanded
/// assignments.
fn map_child_parameters(
    node: &RegistrationNode,
    key: &str,
    variants: &ExpandedVariants,
) -> Result<CompileParameters> {
    let mut params = CompileParameters::new();
    let Some(rules) = node.mappings.get(key) else {
        return Ok(params);
    };

    for (child_prop, rule) in rules {
        let mut per_modifier: IndexMap<String, String> = IndexMap::new();
        for (modifier, assignment) in variants.iter() {
            let value = match rule {
                PropMapping::Constant { value } => value.clone(),
                PropMapping::FromProp { prop, cases } => {
                    let Some(parent_value) = assignment.get(prop) else {
                        continue;
                    };
                    cases
                        .get(parent_value)
                        .cloned()
                        .ok_or_else(|| RegistryError::UnmappedValue {
                            identifier: node.identifier.clone(),
                            prop: prop.clone(),
                            value: parent_value.clone(),
                        })?
                }
            };
            per_modifier.insert(modifier.to_string(), value);
        }

        if let Some(value) = collapse(&per_modifier) {
            params.insert(child_prop.clone(), value);
        }
    }

    Ok(params)
}

/// A single literal when every modifier agrees and the default is present,
/// otherwise the per-modifier map. `None` when nothing was mapped.
fn collapse(per_modifier: &IndexMap<String, String>) -> Option<ParameterValue> {
    let (_, first) = per_modifier.first()?;
    let uniform = per_modifier.values().all(|v| v == first);
    if uniform && per_modifier.contains_key(DEFAULT_MODIFIER) {
        Some(ParameterValue::Literal(first.clone()))
    } else {
        Some(ParameterValue::PerModifier(per_modifier.clone()))
    }
}
