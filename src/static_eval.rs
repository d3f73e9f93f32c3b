//! Static Expression Analysis for prop assignments
//!
//! Parses the source text of a prop-assignment expression (the value written
//! between the braces of a managed component usage) into a small owned AST,
//! and evaluates that AST against a scope of bound values when the host asks
//! for a runtime fallback.
//!
//! Only object literals, string/number/boolean literals, static template
//! literals, identifiers and spreads are understood. Anything else is kept as
//! [`PropsExpr::Opaque`] so the caller can decide whether to widen or fail.

use indexmap::IndexMap;
use oxc_allocator::Allocator;
use oxc_ast::ast::{Expression, ObjectExpression, ObjectPropertyKind, PropertyKey};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use serde_json::{Map, Value};

use crate::error::{RegistryError, Result};
use crate::variants::CompileParameters;

// ═══════════════════════════════════════════════════════════════════════════════
// OWNED AST
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum PropsExpr {
    /// String, number, boolean or static template literal, as text.
    Literal(String),
    Identifier(String),
    Object(PropsObject),
    /// Source text of an expression outside the understood grammar.
    Opaque(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectMember {
    Property { key: String, value: PropsExpr },
    Spread(PropsExpr),
    /// Source text of a computed key.
    Computed(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropsObject {
    pub members: Vec<ObjectMember>,
}

impl PropsObject {
    /// The value written for `key`; the last write wins.
    pub fn get(&self, key: &str) -> Option<&PropsExpr> {
        self.members.iter().rev().find_map(|m| match m {
            ObjectMember::Property { key: k, value } if k == key => Some(value),
            _ => None,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.members.iter().filter_map(|m| match m {
            ObjectMember::Property { key, .. } => Some(key.as_str()),
            _ => None,
        })
    }

    /// Whether a spread or computed key may contribute unknown props.
    pub fn has_dynamic_members(&self) -> bool {
        self.members
            .iter()
            .any(|m| matches!(m, ObjectMember::Spread(_) | ObjectMember::Computed(_)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parses `source` as a single, optionally parenthesized object literal.
///
/// `as` and `satisfies` wrappers are looked through.
pub fn parse_props_expression(source: &str) -> Result<PropsObject> {
    let wrapped = format!("({})", source);
    let allocator = Allocator::default();
    let source_type = SourceType::default()
        .with_typescript(true)
        .with_module(true)
        .with_jsx(true);

    let expr = Parser::new(&allocator, &wrapped, source_type)
        .parse_expression()
        .map_err(|errors| {
            RegistryError::malformed(source, format!("invalid expression syntax: {:?}", errors))
        })?;

    match peel(&expr) {
        Expression::ObjectExpression(obj) => Ok(lower_object(obj, &wrapped)),
        _ => Err(RegistryError::malformed(source, "props must be wrapped in {}")),
    }
}

fn peel<'b, 'a>(expr: &'b Expression<'a>) -> &'b Expression<'a> {
    match expr {
        Expression::ParenthesizedExpression(paren) => peel(&paren.expression),
        Expression::TSAsExpression(as_expr) => peel(&as_expr.expression),
        Expression::TSSatisfiesExpression(sat) => peel(&sat.expression),
        _ => expr,
    }
}

fn slice(text: &str, span: Span) -> String {
    text.get(span.start as usize..span.end as usize)
        .unwrap_or_default()
        .to_string()
}

fn lower_object(obj: &ObjectExpression<'_>, text: &str) -> PropsObject {
    let mut members = Vec::with_capacity(obj.properties.len());
    for property in &obj.properties {
        match property {
            ObjectPropertyKind::ObjectProperty(p) => {
                let key = if p.computed {
                    None
                } else {
                    match &p.key {
                        PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
                        PropertyKey::StringLiteral(s) => Some(s.value.to_string()),
                        PropertyKey::NumericLiteral(n) => Some(format_number(n.value)),
                        _ => None,
                    }
                };
                match key {
                    Some(key) => members.push(ObjectMember::Property {
                        key,
                        value: lower_expr(&p.value, text),
                    }),
                    None => members.push(ObjectMember::Computed(slice(text, p.key.span()))),
                }
            }
            ObjectPropertyKind::SpreadProperty(s) => {
                members.push(ObjectMember::Spread(lower_expr(&s.argument, text)));
            }
        }
    }
    PropsObject { members }
}

fn lower_expr(expr: &Expression<'_>, text: &str) -> PropsExpr {
    match peel(expr) {
        Expression::StringLiteral(s) => PropsExpr::Literal(s.value.to_string()),
        Expression::BooleanLiteral(b) => PropsExpr::Literal(b.value.to_string()),
        Expression::NumericLiteral(n) => PropsExpr::Literal(format_number(n.value)),
        Expression::TemplateLiteral(tpl) if tpl.expressions.is_empty() => {
            let value = tpl
                .quasis
                .first()
                .map(|q| match &q.value.cooked {
                    Some(cooked) => cooked.to_string(),
                    None => q.value.raw.to_string(),
                })
                .unwrap_or_default();
            PropsExpr::Literal(value)
        }
        Expression::Identifier(id) => PropsExpr::Identifier(id.name.to_string()),
        Expression::ObjectExpression(obj) => PropsExpr::Object(lower_object(obj, text)),
        other => PropsExpr::Opaque(slice(text, other.span())),
    }
}

/// Integral values print without a fractional part, as they would in JS.
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SANDBOXED EVALUATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Values visible to the evaluator, by identifier. `null` stands for
/// `undefined`.
pub type EvalScope = IndexMap<String, Value>;

/// Evaluates a parsed props object to concrete parameters.
///
/// Identifiers must be bound in `scope`; a prop whose value evaluates to
/// `undefined` is omitted. Spreads of bound objects are merged in place.
/// Opaque expressions and computed keys are rejected.
pub fn evaluate_parameters(object: &PropsObject, scope: &EvalScope) -> Result<CompileParameters> {
    let value = Value::Object(evaluate_object(object, scope)?);
    CompileParameters::from_json(&value)
}

/// [`parse_props_expression`] followed by [`evaluate_parameters`].
pub fn evaluate_expression(source: &str, scope: &EvalScope) -> Result<CompileParameters> {
    evaluate_parameters(&parse_props_expression(source)?, scope)
}

fn evaluate_object(object: &PropsObject, scope: &EvalScope) -> Result<Map<String, Value>> {
    let mut out: IndexMap<String, Value> = IndexMap::new();
    for member in &object.members {
        match member {
            ObjectMember::Property { key, value } => match evaluate_value(value, scope)? {
                Some(v) => {
                    out.insert(key.clone(), v);
                }
                None => {
                    out.shift_remove(key);
                }
            },
            ObjectMember::Spread(expr) => match evaluate_value(expr, scope)? {
                Some(Value::Object(entries)) => {
                    for (k, v) in entries {
                        if v.is_null() {
                            out.shift_remove(&k);
                        } else {
                            out.insert(k, v);
                        }
                    }
                }
                None => {}
                Some(_) => {
                    return Err(RegistryError::UnsupportedExpression {
                        source_text: spread_text(expr),
                    })
                }
            },
            ObjectMember::Computed(text) => {
                return Err(RegistryError::UnsupportedExpression {
                    source_text: format!("[{}]", text),
                })
            }
        }
    }
    Ok(out.into_iter().collect())
}

fn evaluate_value(expr: &PropsExpr, scope: &EvalScope) -> Result<Option<Value>> {
    match expr {
        PropsExpr::Literal(text) => Ok(Some(Value::String(text.clone()))),
        PropsExpr::Identifier(name) => match scope.get(name) {
            Some(Value::Null) => Ok(None),
            Some(bound) => Ok(Some(bound.clone())),
            None if name == "undefined" => Ok(None),
            None => Err(RegistryError::UnboundIdentifier { name: name.clone() }),
        },
        PropsExpr::Object(inner) => Ok(Some(Value::Object(evaluate_object(inner, scope)?))),
        PropsExpr::Opaque(text) => Err(RegistryError::UnsupportedExpression {
            source_text: text.clone(),
        }),
    }
}

fn spread_text(expr: &PropsExpr) -> String {
    match expr {
        PropsExpr::Identifier(name) => format!("...{}", name),
        PropsExpr::Literal(text) | PropsExpr::Opaque(text) => format!("...{}", text),
        PropsExpr::Object(_) => "...{}".to_string(),
    }
}
