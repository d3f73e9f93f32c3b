//! Registration Model
//!
//! A [`RegistrationNode`] describes one managed component: the enumerable
//! domain of each prop, a declarative style template, owned child
//! registrations and the rules that translate the parent's props into the
//! children's props.
//!
//! Nodes are assembled once, through the consuming builder methods, and are
//! only read afterwards. Deriving a patched node (see `manipulation`) always
//! produces a fresh value; dependencies are owned, so no subtree is ever shared
//! between two parents.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::class_merge::merge_classes;
use crate::compile::Selector;
use crate::error::Result;

/// Prop name → ordered domain of allowed literal values.
pub type PropDomains = IndexMap<String, Vec<String>>;

// ═══════════════════════════════════════════════════════════════════════════════
// STYLE TEMPLATE
// ═══════════════════════════════════════════════════════════════════════════════

/// One piece of a style property's class string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StyleSegment {
    /// Emitted as-is.
    Literal { text: String },
    /// Resolved against the current assignment of `prop`.
    Conditional {
        prop: String,
        cases: IndexMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<String>,
    },
}

/// Where the class string of a single style property comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layer", rename_all = "kebab-case")]
pub enum StyleSource {
    /// Authored directly on the registration.
    Registered { segments: Vec<StyleSegment> },
    /// A manipulation layered on top of an existing source. The rendered
    /// overlay wins every class conflict against the rendered base.
    Manipulated {
        base: Box<StyleSource>,
        overlay: Box<StyleSource>,
    },
}

impl StyleSource {
    pub fn builder() -> StyleBuilder {
        StyleBuilder::default()
    }

    /// A source without any conditional part.
    pub fn literal(text: impl Into<String>) -> Self {
        StyleSource::Registered {
            segments: vec![StyleSegment::Literal { text: text.into() }],
        }
    }

    /// Renders the class string for the assignment bound to `selector`.
    pub fn render(&self, selector: &Selector<'_>) -> Result<String> {
        match self {
            StyleSource::Registered { segments } => {
                let mut out = String::new();
                for segment in segments {
                    match segment {
                        StyleSegment::Literal { text } => out.push_str(text),
                        StyleSegment::Conditional {
                            prop,
                            cases,
                            fallback,
                        } => out.push_str(&selector.select(prop, cases, fallback.as_deref())?),
                    }
                }
                Ok(out)
            }
            StyleSource::Manipulated { base, overlay } => {
                let base = base.render(selector)?;
                let overlay = overlay.render(selector)?;
                Ok(merge_classes(&base, &overlay))
            }
        }
    }

    /// Props this source selects on, in first-use order.
    pub fn referenced_props(&self) -> Vec<&str> {
        let mut props: Vec<&str> = Vec::new();
        for conditional in self.conditionals() {
            if !props.contains(&conditional.prop) {
                props.push(conditional.prop);
            }
        }
        props
    }

    /// Every conditional segment, base layers before overlays.
    pub(crate) fn conditionals(&self) -> Vec<ConditionalRef<'_>> {
        let mut out = Vec::new();
        self.collect_conditionals(&mut out);
        out
    }

    fn collect_conditionals<'a>(&'a self, out: &mut Vec<ConditionalRef<'a>>) {
        match self {
            StyleSource::Registered { segments } => {
                for segment in segments {
                    if let StyleSegment::Conditional {
                        prop,
                        cases,
                        fallback,
                    } = segment
                    {
                        out.push(ConditionalRef {
                            prop,
                            cases,
                            fallback: fallback.as_deref(),
                        });
                    }
                }
            }
            StyleSource::Manipulated { base, overlay } => {
                base.collect_conditionals(out);
                overlay.collect_conditionals(out);
            }
        }
    }
}

/// Borrowed view of a [`StyleSegment::Conditional`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConditionalRef<'a> {
    pub prop: &'a str,
    pub cases: &'a IndexMap<String, String>,
    pub fallback: Option<&'a str>,
}

/// Fluent construction of a [`StyleSource::Registered`].
///
/// ```
/// use tdc_compiler::StyleSource;
///
/// // h-${size: sm→4, md→8} bg-${destructive: false→green, otherwise red}-400
/// let source = StyleSource::builder()
///     .lit("h-")
///     .select("size", [("sm", "4"), ("md", "8")])
///     .lit(" bg-")
///     .select_or("destructive", "red", [("false", "green")])
///     .lit("-400")
///     .build();
/// assert_eq!(source.referenced_props(), vec!["size", "destructive"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StyleBuilder {
    segments: Vec<StyleSegment>,
}

impl StyleBuilder {
    pub fn lit(mut self, text: impl Into<String>) -> Self {
        self.segments.push(StyleSegment::Literal { text: text.into() });
        self
    }

    /// Selects one of `cases` by the value of `prop`. An unset prop is an
    /// error at compile time.
    pub fn select<I, K, V>(mut self, prop: impl Into<String>, cases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.segments.push(StyleSegment::Conditional {
            prop: prop.into(),
            cases: collect_cases(cases),
            fallback: None,
        });
        self
    }

    /// Like [`select`](Self::select), using `fallback` whenever the prop is
    /// unset or its value has no case.
    pub fn select_or<I, K, V>(
        mut self,
        prop: impl Into<String>,
        fallback: impl Into<String>,
        cases: I,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.segments.push(StyleSegment::Conditional {
            prop: prop.into(),
            cases: collect_cases(cases),
            fallback: Some(fallback.into()),
        });
        self
    }

    pub fn build(self) -> StyleSource {
        StyleSource::Registered {
            segments: self.segments,
        }
    }
}

fn collect_cases<I, K, V>(cases: I) -> IndexMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    cases
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Style property name → source, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleTemplate(IndexMap<String, StyleSource>);

impl StyleTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, property: impl Into<String>, source: StyleSource) -> Self {
        self.0.insert(property.into(), source);
        self
    }

    pub fn get(&self, property: &str) -> Option<&StyleSource> {
        self.0.get(property)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StyleSource)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, property: String, source: StyleSource) {
        self.0.insert(property, source);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROP MAPPINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// How a child prop is derived from its parent's assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PropMapping {
    /// The child prop always receives `value`.
    Constant { value: String },
    /// The child prop follows the parent's `prop`, translated through `cases`.
    FromProp {
        prop: String,
        cases: IndexMap<String, String>,
    },
}

impl PropMapping {
    pub fn constant(value: impl Into<String>) -> Self {
        PropMapping::Constant {
            value: value.into(),
        }
    }

    pub fn from_prop<I, K, V>(prop: impl Into<String>, cases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        PropMapping::FromProp {
            prop: prop.into(),
            cases: collect_cases(cases),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRATION NODE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationNode {
    pub(crate) identifier: String,
    #[serde(default)]
    pub(crate) props: PropDomains,
    #[serde(default)]
    pub(crate) styles: StyleTemplate,
    #[serde(default)]
    pub(crate) dependencies: IndexMap<String, RegistrationNode>,
    #[serde(default)]
    pub(crate) mappings: IndexMap<String, IndexMap<String, PropMapping>>,
}

impl RegistrationNode {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            props: PropDomains::new(),
            styles: StyleTemplate::new(),
            dependencies: IndexMap::new(),
            mappings: IndexMap::new(),
        }
    }

    /// Declares `name` with its ordered domain of allowed values.
    pub fn prop<I, V>(mut self, name: impl Into<String>, domain: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.props
            .insert(name.into(), domain.into_iter().map(Into::into).collect());
        self
    }

    pub fn style(mut self, property: impl Into<String>, source: StyleSource) -> Self {
        self.styles.insert(property.into(), source);
        self
    }

    pub fn dependency(mut self, key: impl Into<String>, child: RegistrationNode) -> Self {
        self.dependencies.insert(key.into(), child);
        self
    }

    /// Adds the rule deriving `child_prop` of dependency `dependency`.
    pub fn mapping(
        mut self,
        dependency: impl Into<String>,
        child_prop: impl Into<String>,
        rule: PropMapping,
    ) -> Self {
        self.mappings
            .entry(dependency.into())
            .or_default()
            .insert(child_prop.into(), rule);
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn props(&self) -> &PropDomains {
        &self.props
    }

    pub fn domain(&self, prop: &str) -> Option<&[String]> {
        self.props.get(prop).map(Vec::as_slice)
    }

    pub fn styles(&self) -> &StyleTemplate {
        &self.styles
    }

    pub fn dependencies(&self) -> &IndexMap<String, RegistrationNode> {
        &self.dependencies
    }

    pub fn mappings(&self) -> &IndexMap<String, IndexMap<String, PropMapping>> {
        &self.mappings
    }

    /// Whether compiling with `prop` left unset succeeds and reaches a
    /// fallback somewhere in this node or the dependencies fed from it.
    pub(crate) fn renders_unset(&self, prop: &str) -> bool {
        self.unset_effect(prop) == Some(true)
    }

    /// `None` when an unset `prop` fails to compile, otherwise whether any
    /// fallback fires.
    fn unset_effect(&self, prop: &str) -> Option<bool> {
        let mut fires = false;
        for (_, source) in self.styles.iter() {
            for conditional in source.conditionals() {
                if conditional.prop == prop {
                    conditional.fallback?;
                    fires = true;
                }
            }
        }

        for (dependency, rules) in &self.mappings {
            for (child_prop, rule) in rules {
                let PropMapping::FromProp { prop: source, .. } = rule else {
                    continue;
                };
                if source != prop {
                    continue;
                }
                fires |= self.dependencies.get(dependency)?.unset_effect(child_prop)?;
            }
        }
        Some(fires)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn icon() -> RegistrationNode {
        RegistrationNode::new("icon")
            .prop("size", ["xl", "2xl"])
            .style(
                "c",
                StyleSource::builder()
                    .lit("border-")
                    .select("size", [("xl", "8"), ("2xl", "4")])
                    .build(),
            )
    }

    #[test]
    fn test_builder_preserves_declaration_order() {
        let node = RegistrationNode::new("button")
            .prop("size", ["sm", "md"])
            .prop("destructive", ["true", "false"])
            .style("a", StyleSource::literal("h-4"))
            .style("b", StyleSource::literal("w-12"));

        let props: Vec<&String> = node.props().keys().collect();
        assert_eq!(props, vec!["size", "destructive"]);
        let styles: Vec<&String> = node.styles().iter().map(|(k, _)| k).collect();
        assert_eq!(styles, vec!["a", "b"]);
        assert_eq!(node.domain("size"), Some(&["sm".to_string(), "md".to_string()][..]));
        assert_eq!(node.domain("color"), None);
    }

    #[test]
    fn test_dependencies_are_owned_copies() {
        let shared = icon();
        let a = RegistrationNode::new("a").dependency("icon", shared.clone());
        let b = RegistrationNode::new("b").dependency("icon", shared);
        assert_eq!(a.dependencies()["icon"], b.dependencies()["icon"]);
    }

    #[test]
    fn test_mapping_groups_by_dependency() {
        let node = RegistrationNode::new("button")
            .prop("scale", ["sm", "md"])
            .dependency("icon", icon())
            .mapping("icon", "size", PropMapping::from_prop("scale", [("sm", "xl"), ("md", "2xl")]))
            .mapping("icon", "destructive", PropMapping::constant("false"));

        let rules = &node.mappings()["icon"];
        assert_eq!(rules.len(), 2);
        assert_eq!(rules["destructive"], PropMapping::constant("false"));
    }

    #[test]
    fn test_node_deserializes_from_json() {
        let json = r#"{
            "identifier": "icon",
            "props": { "size": ["xl", "2xl"] },
            "styles": {
                "c": {
                    "layer": "registered",
                    "segments": [
                        { "type": "literal", "text": "border-" },
                        { "type": "conditional", "prop": "size", "cases": { "xl": "8", "2xl": "4" } }
                    ]
                }
            }
        }"#;
        let node: RegistrationNode = serde_json::from_str(json).unwrap();
        assert_eq!(node, icon());
        assert!(node.dependencies().is_empty());
    }

    #[test]
    fn test_renders_unset_follows_fallbacks_into_dependencies() {
        let label = RegistrationNode::new("label")
            .prop("tone", ["loud", "quiet"])
            .style(
                "a",
                StyleSource::builder()
                    .select_or("tone", "font-normal", [("loud", "font-bold")])
                    .build(),
            );
        let node = RegistrationNode::new("badge")
            .prop("tone", ["loud", "quiet"])
            .prop("size", ["sm", "md"])
            .style(
                "a",
                StyleSource::builder()
                    .select("size", [("sm", "h-4"), ("md", "h-8")])
                    .build(),
            )
            .dependency("label", label)
            .mapping(
                "label",
                "tone",
                PropMapping::from_prop("tone", [("loud", "loud"), ("quiet", "quiet")]),
            );

        assert!(node.renders_unset("tone"));
        assert!(!node.renders_unset("size"));

        let strict = node.clone().style(
            "b",
            StyleSource::builder()
                .select("tone", [("loud", "ring"), ("quiet", "ring-0")])
                .build(),
        );
        assert!(!strict.renders_unset("tone"));
    }

    #[test]
    fn test_referenced_props_walks_manipulated_layers() {
        let source = StyleSource::Manipulated {
            base: Box::new(
                StyleSource::builder()
                    .select("size", [("sm", "w-12")])
                    .build(),
            ),
            overlay: Box::new(
                StyleSource::builder()
                    .select_or("tone", "w-24", [("loud", "w-32")])
                    .select("size", [("sm", "")])
                    .build(),
            ),
        };
        assert_eq!(source.referenced_props(), vec!["size", "tone"]);
    }
}
