//! Manipulation Merging
//!
//! A [`Manipulation`] patches an existing registration without touching it:
//! merging produces new nodes whose style sources layer the manipulation's
//! overrides on top of the registered ones.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::registration::{PropDomains, RegistrationNode, StyleSource, StyleTemplate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manipulation {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<StyleTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<PropDomains>,
}

impl Manipulation {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            styles: None,
            props: None,
        }
    }

    pub fn style(mut self, property: impl Into<String>, source: StyleSource) -> Self {
        self.styles
            .get_or_insert_with(StyleTemplate::new)
            .insert(property.into(), source);
        self
    }

    /// Replaces the declared domain of `name`.
    pub fn prop<I, V>(mut self, name: impl Into<String>, domain: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.props
            .get_or_insert_with(PropDomains::new)
            .insert(name.into(), domain.into_iter().map(Into::into).collect());
        self
    }

    /// Derives the patched copy of `node`.
    pub fn apply(&self, node: &RegistrationNode) -> RegistrationNode {
        let mut derived = node.clone();

        if let Some(styles) = &self.styles {
            for (property, overlay) in styles.iter() {
                let layered = match derived.styles.get(property) {
                    Some(base) => StyleSource::Manipulated {
                        base: Box::new(base.clone()),
                        overlay: Box::new(overlay.clone()),
                    },
                    None => overlay.clone(),
                };
                derived.styles.insert(property.clone(), layered);
            }
        }

        if let Some(props) = &self.props {
            for (prop, domain) in props {
                derived.props.insert(prop.clone(), domain.clone());
            }
        }

        derived
    }
}

/// Applies `manipulations` to the nodes at this level of the forest.
///
/// Matching is by identifier and shallow: dependencies are not searched.
/// Several manipulations targeting the same node apply in order, each one
/// layered over the previous result. A manipulation that matches nothing is
/// logged and ignored.
pub fn merge_manipulations(
    nodes: &[RegistrationNode],
    manipulations: &[Manipulation],
) -> Vec<RegistrationNode> {
    for manipulation in manipulations {
        if !nodes.iter().any(|n| n.identifier == manipulation.identifier) {
            warn!(
                identifier = %manipulation.identifier,
                "manipulation does not match any registration"
            );
        }
    }

    nodes
        .iter()
        .map(|node| {
            let mut current: Option<RegistrationNode> = None;
            for manipulation in manipulations
                .iter()
                .filter(|m| m.identifier == node.identifier)
            {
                debug!(identifier = %node.identifier, "applying manipulation");
                let base = current.as_ref().unwrap_or(node);
                current = Some(manipulation.apply(base));
            }
            current.unwrap_or_else(|| node.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::variants::CompileParameters;
    use pretty_assertions::assert_eq;

    fn card() -> RegistrationNode {
        RegistrationNode::new("card")
            .prop("tone", ["plain", "loud"])
            .style("a", StyleSource::literal("h-4"))
            .style("b", StyleSource::literal("w-12 p-2"))
    }

    #[test]
    fn test_override_supersedes_same_family() {
        let merged = merge_manipulations(
            &[card()],
            &[Manipulation::new("card").style("b", StyleSource::literal("w-24"))],
        );
        let result = compile(&merged[0], &CompileParameters::new()).unwrap();
        assert_eq!(result.styles["a"], vec!["h-4"]);
        assert_eq!(result.styles["b"], vec!["p-2", "w-24"]);
    }

    #[test]
    fn test_original_node_is_untouched() {
        let original = card();
        let merged = merge_manipulations(
            std::slice::from_ref(&original),
            &[Manipulation::new("card").style("b", StyleSource::literal("w-24"))],
        );
        assert_eq!(original, card());
        assert_ne!(merged[0], original);
    }

    #[test]
    fn test_new_style_property_is_added() {
        let merged = merge_manipulations(
            &[card()],
            &[Manipulation::new("card").style("z", StyleSource::literal("shadow"))],
        );
        assert_eq!(merged[0].styles().get("z"), Some(&StyleSource::literal("shadow")));
    }

    #[test]
    fn test_prop_domain_is_replaced() {
        let merged = merge_manipulations(
            &[card()],
            &[Manipulation::new("card").prop("tone", ["muted"])],
        );
        assert_eq!(merged[0].domain("tone"), Some(&["muted".to_string()][..]));
    }

    #[test]
    fn test_matching_is_shallow() {
        let parent = RegistrationNode::new("panel").dependency("card", card());
        let merged = merge_manipulations(
            &[parent.clone()],
            &[Manipulation::new("card").style("b", StyleSource::literal("w-24"))],
        );
        assert_eq!(merged, vec![parent]);
    }

    #[test]
    fn test_manipulations_apply_in_order() {
        let merged = merge_manipulations(
            &[card()],
            &[
                Manipulation::new("card").style("b", StyleSource::literal("w-24")),
                Manipulation::new("card").style("b", StyleSource::literal("w-32 p-4")),
            ],
        );
        let result = compile(&merged[0], &CompileParameters::new()).unwrap();
        assert_eq!(result.styles["b"], vec!["w-32", "p-4"]);
    }
}
