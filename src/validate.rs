//! Validate Module
//!
//! Structural checks over a registration forest, run once after loading and
//! again after manipulations are merged:
//!
//! - identifiers are unique across every reachable node, dependencies included
//! - every template conditional selects a declared prop, its case keys lie in
//!   that prop's domain, and without a fallback its cases cover the domain
//! - every mapping targets a declared dependency and a declared child prop
//! - `FromProp` mappings read a declared parent prop, their case keys lie in the
//!   parent's domain and their case values in the child's

use std::collections::HashSet;

use crate::error::{RegistryError, Result};
use crate::registration::{PropMapping, RegistrationNode};

// ═══════════════════════════════════════════════════════════════════════════════
// FOREST WALK
// ═══════════════════════════════════════════════════════════════════════════════

/// Depth-first validation of `roots`. Fails on the first violation.
pub fn validate_forest(roots: &[RegistrationNode]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for root in roots {
        validate_node(root, &mut seen)?;
    }
    Ok(())
}

fn validate_node<'a>(node: &'a RegistrationNode, seen: &mut HashSet<&'a str>) -> Result<()> {
    if !seen.insert(node.identifier.as_str()) {
        return Err(RegistryError::DuplicateIdentifier {
            identifier: node.identifier.clone(),
        });
    }
    validate_styles(node)?;
    validate_mappings(node)?;
    for child in node.dependencies.values() {
        validate_node(child, seen)?;
    }
    Ok(())
}

/// Every node reachable from `roots`, parents before their dependencies.
pub fn flatten_registrations(roots: &[RegistrationNode]) -> Vec<&RegistrationNode> {
    fn walk<'a>(node: &'a RegistrationNode, out: &mut Vec<&'a RegistrationNode>) {
        out.push(node);
        for child in node.dependencies.values() {
            walk(child, out);
        }
    }

    let mut out = Vec::new();
    for root in roots {
        walk(root, &mut out);
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE CONSISTENCY
// ═══════════════════════════════════════════════════════════════════════════════

/// Checks every conditional segment of `node`'s template, manipulated
/// layers included.
pub fn validate_styles(node: &RegistrationNode) -> Result<()> {
    for (_, source) in node.styles.iter() {
        for conditional in source.conditionals() {
            let Some(domain) = node.domain(conditional.prop) else {
                return Err(RegistryError::UnknownProp {
                    identifier: node.identifier.clone(),
                    prop: conditional.prop.to_string(),
                });
            };

            if let Some(stray) = conditional.cases.keys().find(|k| !domain.contains(*k)) {
                return Err(RegistryError::DomainViolation {
                    identifier: node.identifier.clone(),
                    prop: conditional.prop.to_string(),
                    value: stray.clone(),
                    allowed: domain.to_vec(),
                });
            }

            if conditional.fallback.is_none() {
                if let Some(uncovered) = domain.iter().find(|v| !conditional.cases.contains_key(*v)) {
                    return Err(RegistryError::UnmappedValue {
                        identifier: node.identifier.clone(),
                        prop: conditional.prop.to_string(),
                        value: uncovered.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAPPING CONSISTENCY
// ═══════════════════════════════════════════════════════════════════════════════

/// Checks the prop mappings declared directly on `node`.
pub fn validate_mappings(node: &RegistrationNode) -> Result<()> {
    for (dependency, rules) in &node.mappings {
        let Some(child) = node.dependencies.get(dependency) else {
            return Err(RegistryError::UnknownDependency {
                identifier: node.identifier.clone(),
                dependency: dependency.clone(),
            });
        };

        for (child_prop, rule) in rules {
            let Some(child_domain) = child.domain(child_prop) else {
                return Err(RegistryError::UnknownProp {
                    identifier: child.identifier.clone(),
                    prop: child_prop.clone(),
                });
            };

            let in_child = |value: &str| -> Result<()> {
                if child_domain.iter().any(|v| v == value) {
                    Ok(())
                } else {
                    Err(RegistryError::DomainViolation {
                        identifier: child.identifier.clone(),
                        prop: child_prop.clone(),
                        value: value.to_string(),
                        allowed: child_domain.to_vec(),
                    })
                }
            };

            match rule {
                PropMapping::Constant { value } => in_child(value)?,
                PropMapping::FromProp { prop, cases } => {
                    let Some(parent_domain) = node.domain(prop) else {
                        return Err(RegistryError::UnknownProp {
                            identifier: node.identifier.clone(),
                            prop: prop.clone(),
                        });
                    };
                    for (parent_value, child_value) in cases {
                        if !parent_domain.iter().any(|v| v == parent_value) {
                            return Err(RegistryError::DomainViolation {
                                identifier: node.identifier.clone(),
                                prop: prop.clone(),
                                value: parent_value.clone(),
                                allowed: parent_domain.to_vec(),
                            });
                        }
                        in_child(child_value)?;
                    }
                }
            }
        }
    }
    Ok(())
}
