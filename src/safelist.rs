//! Safelist Enumeration
//!
//! When the props of a usage are not all literal, the classes it can produce
//! are not known until runtime. This module classifies the usage's props
//! expression, enumerates every prop assignment it could evaluate to and
//! compiles each one, so a purge step can retain all resulting classes.

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compile::{compile, CompileResult};
use crate::error::{RegistryError, Result};
use crate::registration::{PropDomains, RegistrationNode};
use crate::static_eval::{parse_props_expression, ObjectMember, PropsExpr, PropsObject};
use crate::variants::{CompileParameters, ParameterValue};

// ═══════════════════════════════════════════════════════════════════════════════
// CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Possible values of one prop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Candidates {
    Values(Vec<String>),
    PerModifier(IndexMap<String, Vec<String>>),
    /// Like `Values`, where `None` leaves the prop unset.
    Optional(Vec<Option<String>>),
}

impl Candidates {
    /// The full domain of a prop, plus the unset option when leaving `prop`
    /// unset reaches a fallback of `node`.
    pub fn widened(node: &RegistrationNode, prop: &str, domain: &[String]) -> Self {
        if node.renders_unset(prop) {
            let mut options: Vec<Option<String>> = domain.iter().cloned().map(Some).collect();
            options.push(None);
            Candidates::Optional(options)
        } else {
            Candidates::Values(domain.to_vec())
        }
    }

    fn is_singleton(&self) -> bool {
        match self {
            Candidates::Values(values) => values.len() == 1,
            Candidates::PerModifier(map) => map.values().all(|v| v.len() == 1),
            Candidates::Optional(options) => options.len() == 1,
        }
    }

    /// Every parameter value this prop can take; `None` leaves it unset.
    fn options(&self) -> Vec<Option<ParameterValue>> {
        match self {
            Candidates::Values(values) => values
                .iter()
                .map(|v| Some(ParameterValue::Literal(v.clone())))
                .collect(),
            Candidates::Optional(options) => options
                .iter()
                .map(|v| v.clone().map(ParameterValue::Literal))
                .collect(),
            Candidates::PerModifier(map) => {
                let mut combos: Vec<IndexMap<String, String>> = vec![IndexMap::new()];
                for (modifier, values) in map {
                    combos = combos
                        .into_iter()
                        .flat_map(|combo| {
                            values.iter().map(move |v| {
                                let mut next = combo.clone();
                                next.insert(modifier.clone(), v.clone());
                                next
                            })
                        })
                        .collect();
                }
                combos
                    .into_iter()
                    .map(|combo| Some(ParameterValue::PerModifier(combo)))
                    .collect()
            }
        }
    }

    fn option_count(&self) -> usize {
        match self {
            Candidates::Values(values) => values.len(),
            Candidates::Optional(options) => options.len(),
            Candidates::PerModifier(map) => map
                .values()
                .fold(1usize, |acc, v| acc.saturating_mul(v.len())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Optimality {
    /// Every prop resolved to exactly one value.
    Optimal,
    NotOptimal,
}

/// A prop the analyzer had to widen to its full domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverApproximation {
    pub prop: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub candidates: IndexMap<String, Candidates>,
    pub optimality: Optimality,
    pub warnings: Vec<OverApproximation>,
}

impl Classification {
    pub fn is_optimal(&self) -> bool {
        self.optimality == Optimality::Optimal
    }

    /// The single assignment of an optimal classification.
    pub fn to_parameters(&self) -> Option<CompileParameters> {
        if !self.is_optimal() {
            return None;
        }
        let mut params = CompileParameters::new();
        for (prop, candidates) in &self.candidates {
            let value = match candidates {
                Candidates::Values(values) => ParameterValue::Literal(values.first()?.clone()),
                Candidates::Optional(options) => match options.first()? {
                    Some(value) => ParameterValue::Literal(value.clone()),
                    None => continue,
                },
                Candidates::PerModifier(map) => {
                    let mut per_modifier = IndexMap::with_capacity(map.len());
                    for (modifier, values) in map {
                        per_modifier.insert(modifier.clone(), values.first()?.clone());
                    }
                    ParameterValue::PerModifier(per_modifier)
                }
            };
            params.insert(prop.clone(), value);
        }
        Some(params)
    }
}

/// Classifies the props expression `source` of a usage of `node`.
///
/// A widened prop also admits being left unset whenever that reaches a
/// fallback, since the deferred call omits props that evaluate to
/// `undefined`.
pub fn classify(source: &str, node: &RegistrationNode) -> Result<Classification> {
    let mut classification = classify_with_domains(source, &node.identifier, &node.props)?;
    for warning in &classification.warnings {
        if warning.modifier.is_some() {
            continue;
        }
        if let Some(Candidates::Values(domain)) = classification.candidates.get(&warning.prop) {
            let widened = Candidates::widened(node, &warning.prop, domain);
            classification
                .candidates
                .insert(warning.prop.clone(), widened);
        }
    }
    Ok(classification)
}

/// Classifies `source` against explicit prop domains.
///
/// Literal values inside the domain narrow a prop to one candidate; absent
/// props, identifiers and any other expression widen it to the full domain
/// and record an [`OverApproximation`]. Spread members and computed keys
/// widen every prop not written after them.
pub fn classify_with_domains(
    source: &str,
    identifier: &str,
    props: &PropDomains,
) -> Result<Classification> {
    let object = parse_props_expression(source)?;

    for key in object.keys() {
        if !props.contains_key(key) {
            return Err(RegistryError::UnknownProp {
                identifier: identifier.to_string(),
                prop: key.to_string(),
            });
        }
    }

    let last_dynamic = object
        .members
        .iter()
        .rposition(|m| !matches!(m, ObjectMember::Property { .. }));

    let mut candidates = IndexMap::with_capacity(props.len());
    let mut warnings = Vec::new();

    for (prop, domain) in props {
        let written = object.members.iter().rposition(
            |m| matches!(m, ObjectMember::Property { key, .. } if key == prop),
        );
        let overridden = match (written, last_dynamic) {
            (Some(w), Some(d)) => d > w,
            (None, Some(_)) => true,
            _ => false,
        };

        let widened = |reason: &str, warnings: &mut Vec<OverApproximation>| {
            warnings.push(OverApproximation {
                prop: prop.clone(),
                modifier: None,
                reason: reason.to_string(),
            });
            Candidates::Values(domain.clone())
        };

        let entry = if overridden {
            widened("may be set by a spread or computed key", &mut warnings)
        } else {
            match object.get(prop) {
                None => widened("not provided", &mut warnings),
                Some(PropsExpr::Literal(value)) => {
                    Candidates::Values(vec![check_domain(identifier, prop, domain, value)?])
                }
                Some(PropsExpr::Object(inner)) => Candidates::PerModifier(classify_modifiers(
                    source,
                    identifier,
                    prop,
                    domain,
                    inner,
                    &mut warnings,
                )?),
                Some(PropsExpr::Identifier(_)) | Some(PropsExpr::Opaque(_)) => {
                    widened("value is not a literal", &mut warnings)
                }
            }
        };
        candidates.insert(prop.clone(), entry);
    }

    let optimality = if warnings.is_empty() && candidates.values().all(Candidates::is_singleton) {
        Optimality::Optimal
    } else {
        Optimality::NotOptimal
    };

    Ok(Classification {
        candidates,
        optimality,
        warnings,
    })
}

fn classify_modifiers(
    source: &str,
    identifier: &str,
    prop: &str,
    domain: &[String],
    inner: &PropsObject,
    warnings: &mut Vec<OverApproximation>,
) -> Result<IndexMap<String, Vec<String>>> {
    if inner.has_dynamic_members() {
        return Err(RegistryError::malformed(
            source,
            format!("modifier keys of '{}' must be written out", prop),
        ));
    }

    let mut per_modifier = IndexMap::with_capacity(inner.members.len());
    for modifier in inner.keys() {
        let values = match inner.get(modifier) {
            Some(PropsExpr::Literal(value)) => vec![check_domain(identifier, prop, domain, value)?],
            _ => {
                warnings.push(OverApproximation {
                    prop: prop.to_string(),
                    modifier: Some(modifier.to_string()),
                    reason: "value is not a literal".to_string(),
                });
                domain.to_vec()
            }
        };
        per_modifier.insert(modifier.to_string(), values);
    }
    Ok(per_modifier)
}

fn check_domain(identifier: &str, prop: &str, domain: &[String], value: &str) -> Result<String> {
    if domain.iter().any(|v| v == value) {
        Ok(value.to_string())
    } else {
        Err(RegistryError::DomainViolation {
            identifier: identifier.to_string(),
            prop: prop.to_string(),
            value: value.to_string(),
            allowed: domain.to_vec(),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMERATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Number of permutations [`enumerate_permutations`] would produce.
pub fn permutation_count(candidates: &IndexMap<String, Candidates>) -> usize {
    if candidates.is_empty() {
        return 0;
    }
    candidates
        .values()
        .fold(1usize, |acc, c| acc.saturating_mul(c.option_count()))
}

/// Cartesian product of all candidates, first prop varying slowest.
pub fn enumerate_permutations(candidates: &IndexMap<String, Candidates>) -> Vec<CompileParameters> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut permutations = vec![CompileParameters::new()];
    for (prop, entry) in candidates {
        let options = entry.options();
        permutations = permutations
            .into_iter()
            .flat_map(|params| {
                options.iter().map(move |option| match option {
                    Some(value) => params.clone().with(prop.clone(), value.clone()),
                    None => params.clone(),
                })
            })
            .collect();
    }
    permutations
}

// ═══════════════════════════════════════════════════════════════════════════════
// SAFELIST
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiles every permutation of `candidates` and unions the classes.
///
/// Permutations are compiled on the rayon pool; the union keeps
/// enumeration order. Without candidates the node is compiled once with no
/// parameters.
pub fn safelist(
    node: &RegistrationNode,
    candidates: &IndexMap<String, Candidates>,
) -> Result<Vec<String>> {
    if candidates.is_empty() {
        let result = compile(node, &CompileParameters::new())?;
        return Ok(safelist_from_compiled(&result));
    }

    let permutations = enumerate_permutations(candidates);
    debug!(
        identifier = %node.identifier,
        permutations = permutations.len(),
        "enumerating safelist"
    );

    let results = permutations
        .par_iter()
        .map(|params| compile(node, params))
        .collect::<Result<Vec<_>>>()?;
    Ok(safelist_from_results(&results))
}

/// Every class of `result`, styles before children.
pub fn safelist_from_compiled(result: &CompileResult) -> Vec<String> {
    result.all_tokens().into_iter().map(str::to_string).collect()
}

pub fn safelist_from_results(results: &[CompileResult]) -> Vec<String> {
    let mut seen: IndexSet<&str> = IndexSet::new();
    for result in results {
        seen.extend(result.all_tokens());
    }
    seen.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::StyleSource;
    use pretty_assertions::assert_eq;

    fn button() -> RegistrationNode {
        RegistrationNode::new("button")
            .prop("size", ["sm", "md"])
            .prop("destructive", ["true", "false"])
            .style(
                "a",
                StyleSource::builder()
                    .lit("h-")
                    .select("size", [("sm", "4"), ("md", "8")])
                    .lit(" bg-")
                    .select("destructive", [("true", "red"), ("false", "green")])
                    .lit("-400")
                    .build(),
            )
    }

    #[test]
    fn test_all_literal_is_optimal() {
        let c = classify("{ size: 'sm', destructive: false }", &button()).unwrap();
        assert!(c.is_optimal());
        assert!(c.warnings.is_empty());
        let params = c.to_parameters().unwrap();
        assert_eq!(params.get("destructive"), Some(&ParameterValue::literal("false")));
    }

    #[test]
    fn test_absent_and_dynamic_props_widen() {
        let c = classify("{ size: current }", &button()).unwrap();
        assert_eq!(c.optimality, Optimality::NotOptimal);
        assert_eq!(c.candidates["size"], Candidates::Values(vec!["sm".into(), "md".into()]));
        assert_eq!(
            c.candidates["destructive"],
            Candidates::Values(vec!["true".into(), "false".into()])
        );
        let props: Vec<&str> = c.warnings.iter().map(|w| w.prop.as_str()).collect();
        assert_eq!(props, vec!["size", "destructive"]);
        assert!(c.to_parameters().is_none());
    }

    #[test]
    fn test_nested_object_checked_per_modifier() {
        let c = classify(
            "{ size: { default: 'sm', md: pick() }, destructive: true }",
            &button(),
        )
        .unwrap();
        let expected: IndexMap<String, Vec<String>> = [
            ("default".to_string(), vec!["sm".to_string()]),
            ("md".to_string(), vec!["sm".to_string(), "md".to_string()]),
        ]
        .into_iter()
        .collect();
        assert_eq!(c.candidates["size"], Candidates::PerModifier(expected));
        assert_eq!(c.warnings[0].modifier.as_deref(), Some("md"));
    }

    #[test]
    fn test_spread_widens_unless_overridden_after() {
        let c = classify("{ destructive: true, ...rest, size: 'md' }", &button()).unwrap();
        assert_eq!(c.candidates["size"], Candidates::Values(vec!["md".into()]));
        assert_eq!(c.candidates["destructive"].option_count(), 2);
        assert!(!c.is_optimal());
    }

    fn badge() -> RegistrationNode {
        RegistrationNode::new("badge")
            .prop("tone", ["loud", "quiet"])
            .style(
                "a",
                StyleSource::builder()
                    .select_or("tone", "font-normal", [("loud", "font-bold"), ("quiet", "font-light")])
                    .build(),
            )
    }

    #[test]
    fn test_widened_prop_with_fallback_may_be_unset() {
        let c = classify("{ tone: t }", &badge()).unwrap();
        assert_eq!(
            c.candidates["tone"],
            Candidates::Optional(vec![Some("loud".into()), Some("quiet".into()), None])
        );

        let perms = enumerate_permutations(&c.candidates);
        assert_eq!(perms.len(), 3);
        assert!(perms[2].is_empty());

        let classes = safelist(&badge(), &c.candidates).unwrap();
        assert_eq!(classes, vec!["font-bold", "font-light", "font-normal"]);
    }

    #[test]
    fn test_unset_not_enumerated_without_fallback() {
        let c = classify("{}", &button()).unwrap();
        assert!(matches!(c.candidates["size"], Candidates::Values(_)));
        assert_eq!(permutation_count(&c.candidates), 4);
    }

    #[test]
    fn test_fatal_classifications() {
        let err = classify("{ size: 'lg' }", &button()).unwrap_err();
        assert!(matches!(err, RegistryError::DomainViolation { .. }));

        let err = classify("{ color: 'red' }", &button()).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownProp { ref prop, .. } if prop == "color"));

        let err = classify("{ size: { ...rest } }", &button()).unwrap_err();
        assert!(matches!(err, RegistryError::MalformedExpression { .. }));

        let err = classify("size", &button()).unwrap_err();
        assert!(matches!(err, RegistryError::MalformedExpression { .. }));
    }

    #[test]
    fn test_enumeration_first_prop_slowest() {
        let mut candidates = IndexMap::new();
        candidates.insert(
            "color".to_string(),
            Candidates::Values(vec!["blue".into(), "green".into()]),
        );
        candidates.insert("size".to_string(), Candidates::Values(vec!["sm".into(), "md".into()]));

        let perms: Vec<(String, String)> = enumerate_permutations(&candidates)
            .iter()
            .map(|p| {
                let color = p.get("color").unwrap().values()[0].to_string();
                let size = p.get("size").unwrap().values()[0].to_string();
                (color, size)
            })
            .collect();
        let expected: Vec<(String, String)> = [("blue", "sm"), ("blue", "md"), ("green", "sm"), ("green", "md")]
            .iter()
            .map(|(c, s)| (c.to_string(), s.to_string()))
            .collect();
        assert_eq!(perms, expected);
        assert_eq!(permutation_count(&candidates), 4);
    }

    #[test]
    fn test_per_modifier_candidates_cross_per_key() {
        let mut map = IndexMap::new();
        map.insert("default".to_string(), vec!["sm".to_string()]);
        map.insert("md".to_string(), vec!["sm".to_string(), "md".to_string()]);
        let mut candidates = IndexMap::new();
        candidates.insert("size".to_string(), Candidates::PerModifier(map));

        let perms = enumerate_permutations(&candidates);
        assert_eq!(perms.len(), 2);
        assert_eq!(
            perms[1].get("size"),
            Some(&ParameterValue::per_modifier([("default", "sm"), ("md", "md")]))
        );
        assert_eq!(permutation_count(&candidates), 2);
    }

    #[test]
    fn test_empty_candidates_enumerate_nothing() {
        assert!(enumerate_permutations(&IndexMap::new()).is_empty());
        assert_eq!(permutation_count(&IndexMap::new()), 0);
    }

    #[test]
    fn test_safelist_unions_all_permutations() {
        let c = classify("{ size: 'sm' }", &button()).unwrap();
        let classes = safelist(&button(), &c.candidates).unwrap();
        assert_eq!(classes, vec!["h-4", "bg-red-400", "bg-green-400"]);
    }

    #[test]
    fn test_propless_node_compiles_once() {
        let node = RegistrationNode::new("divider").style("a", StyleSource::literal("h-px bg-gray-200"));
        let classes = safelist(&node, &IndexMap::new()).unwrap();
        assert_eq!(classes, vec!["h-px", "bg-gray-200"]);
    }
}
