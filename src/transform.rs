//! Usage Transform
//!
//! Decides, per managed component usage, whether its props are static enough
//! to compile now or must be deferred to a runtime `compileAt` call. Either
//! way the usage's safelist is returned alongside.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::compile::{compile, CompileResult};
use crate::config::LibraryConfig;
use crate::error::{RegistryError, Result};
use crate::matcher::{find_matching_registration, resolve_path, PathStep};
use crate::registration::RegistrationNode;
use crate::safelist::{classify, permutation_count, safelist, safelist_from_compiled};
use crate::static_eval::{evaluate_expression, EvalScope};

// ═══════════════════════════════════════════════════════════════════════════════
// DEFERRED CALLS
// ═══════════════════════════════════════════════════════════════════════════════

/// A usage whose props are only known at runtime. The host splices the
/// rendered call into its output in place of a precompiled result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeferredCall {
    pub identifier: String,
    pub path: Vec<PathStep>,
    pub expression: String,
}

impl DeferredCall {
    /// `binding.compileAt([0,"dependencies",1], (<expression>))`
    pub fn render(&self, binding: &str) -> String {
        let path = serde_json::to_string(&self.path).unwrap_or_default();
        format!("{}.compileAt({}, ({}))", binding, path, self.expression)
    }

    /// Runs the call against `roots`, evaluating the expression with the
    /// sandboxed evaluator.
    pub fn evaluate(&self, roots: &[RegistrationNode], scope: &EvalScope) -> Result<CompileResult> {
        let node = resolve_path(roots, &self.path).ok_or_else(|| RegistryError::InvalidConfig {
            reason: format!("access path of '{}' no longer resolves", self.identifier),
        })?;
        let params = evaluate_expression(&self.expression, scope)?;
        compile(node, &params)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// USAGE TRANSFORM
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum UsageOutcome {
    /// Every prop was a literal; the result is final.
    Compiled {
        result: CompileResult,
        safelist: Vec<String>,
    },
    Deferred {
        call: DeferredCall,
        safelist: Vec<String>,
    },
}

impl UsageOutcome {
    pub fn safelist(&self) -> &[String] {
        match self {
            UsageOutcome::Compiled { safelist, .. } | UsageOutcome::Deferred { safelist, .. } => {
                safelist
            }
        }
    }
}

/// Transforms one usage `<tag_name {expression}>` found by the host's scanner.
///
/// Returns `None` when the tag is not a managed component name or names no
/// registration. An empty expression is treated as `{}`.
pub fn transform_usage(
    roots: &[RegistrationNode],
    config: &LibraryConfig,
    tag_name: &str,
    expression: &str,
) -> Result<Option<UsageOutcome>> {
    let grammar = config.name_grammar()?;
    let Some(compound) = grammar.strip_prefix(tag_name) else {
        return Ok(None);
    };
    let Some(found) = find_matching_registration(compound, roots, &config.tag_name_delimiter)
    else {
        debug!(tag = tag_name, "no registration matches tag");
        return Ok(None);
    };

    let expression = match expression.trim() {
        "" => "{}",
        trimmed => trimmed,
    };
    let node = found.node;
    let classification = classify(expression, node)?;

    if let Some(params) = classification.to_parameters() {
        let result = compile(node, &params)?;
        if config.debug {
            info!(identifier = %node.identifier, tag = tag_name, "compiled usage");
        }
        let safelist = safelist_from_compiled(&result);
        return Ok(Some(UsageOutcome::Compiled { result, safelist }));
    }

    for warning in &classification.warnings {
        warn!(
            identifier = %node.identifier,
            prop = %warning.prop,
            modifier = ?warning.modifier,
            reason = %warning.reason,
            "over-approximating prop to its full domain"
        );
    }

    let count = permutation_count(&classification.candidates);
    if count > config.permutation_warning_threshold {
        warn!(
            identifier = %node.identifier,
            permutations = count,
            threshold = config.permutation_warning_threshold,
            "large safelist enumeration"
        );
    }

    let safelist = safelist(node, &classification.candidates)?;
    Ok(Some(UsageOutcome::Deferred {
        call: DeferredCall {
            identifier: node.identifier.clone(),
            path: found.path,
            expression: expression.to_string(),
        },
        safelist,
    }))
}
