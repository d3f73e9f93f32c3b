//! Registration Matching
//!
//! Resolves compound, delimiter-joined names such as `button-icon` to the
//! registration they denote, together with the access path a generated call
//! uses to reach that registration from the root list.

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::{RegistryError, Result};
use crate::registration::RegistrationNode;

/// One step of an access path: an index into the current list, or a descent
/// into the dependencies of the node just selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathStep {
    Index(usize),
    Dependencies,
}

impl Serialize for PathStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            PathStep::Index(i) => serializer.serialize_u64(*i as u64),
            PathStep::Dependencies => serializer.serialize_str("dependencies"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationMatch<'a> {
    pub node: &'a RegistrationNode,
    pub path: Vec<PathStep>,
}

/// Finds the registration named by `name`.
///
/// At each level an exact identifier match wins; otherwise the first node
/// whose identifier followed by `delimiter` prefixes the name is descended
/// into with the remainder. Nothing is matched if no level consumes the
/// whole name.
pub fn find_matching_registration<'a>(
    name: &str,
    roots: &'a [RegistrationNode],
    delimiter: &str,
) -> Option<RegistrationMatch<'a>> {
    let level: Vec<&RegistrationNode> = roots.iter().collect();
    search(name, &level, delimiter, Vec::new())
}

fn search<'a>(
    name: &str,
    level: &[&'a RegistrationNode],
    delimiter: &str,
    path: Vec<PathStep>,
) -> Option<RegistrationMatch<'a>> {
    if let Some(index) = level.iter().position(|n| n.identifier == name) {
        let mut path = path;
        path.push(PathStep::Index(index));
        return Some(RegistrationMatch {
            node: level[index],
            path,
        });
    }

    for (index, node) in level.iter().enumerate() {
        let prefix = format!("{}{}", node.identifier, delimiter);
        let Some(rest) = name.strip_prefix(&prefix) else {
            continue;
        };
        let children: Vec<&RegistrationNode> = node.dependencies.values().collect();
        let mut child_path = path.clone();
        child_path.push(PathStep::Index(index));
        child_path.push(PathStep::Dependencies);
        if let Some(found) = search(rest, &children, delimiter, child_path) {
            return Some(found);
        }
    }

    None
}

/// Follows `path` from `roots`. `None` if a step leaves the forest or the
/// path does not end on a node.
pub fn resolve_path<'a>(
    roots: &'a [RegistrationNode],
    path: &[PathStep],
) -> Option<&'a RegistrationNode> {
    let mut level: Vec<&RegistrationNode> = roots.iter().collect();
    let mut current: Option<&RegistrationNode> = None;
    for step in path {
        match step {
            PathStep::Index(i) => current = Some(*level.get(*i)?),
            PathStep::Dependencies => {
                level = current?.dependencies.values().collect();
                current = None;
            }
        }
    }
    current
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// The naming grammar of managed components: `<prefix><d><word>(<d><word>)*`.
#[derive(Debug, Clone)]
pub struct ComponentNameGrammar {
    prefix: String,
    delimiter: String,
    pattern: Regex,
}

impl ComponentNameGrammar {
    pub fn new(prefix: &str, delimiter: &str) -> Result<Self> {
        let p = regex::escape(prefix);
        let d = regex::escape(delimiter);
        let pattern = Regex::new(&format!("^{p}{d}([a-zA-Z]+{d})*[a-zA-Z]+$")).map_err(|e| {
            RegistryError::InvalidConfig {
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            prefix: prefix.to_string(),
            delimiter: delimiter.to_string(),
            pattern,
        })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }

    /// PascalCase component name, e.g. `tdc-button-icon` → `TdcButtonIcon`.
    pub fn component_name(&self, name: &str) -> Option<String> {
        if !self.is_match(name) {
            return None;
        }
        Some(name.split(self.delimiter.as_str()).map(capitalize).collect())
    }

    /// The compound registration name after the library prefix.
    pub fn strip_prefix<'n>(&self, name: &'n str) -> Option<&'n str> {
        if !self.is_match(name) {
            return None;
        }
        name.strip_prefix(self.prefix.as_str())?
            .strip_prefix(self.delimiter.as_str())
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One-off form of [`ComponentNameGrammar::component_name`].
pub fn resolve_component_name(name: &str, prefix: &str, delimiter: &str) -> Option<String> {
    ComponentNameGrammar::new(prefix, delimiter)
        .ok()?
        .component_name(name)
}

pub fn is_managed_component_name(name: &str, prefix: &str, delimiter: &str) -> bool {
    ComponentNameGrammar::new(prefix, delimiter)
        .map(|g| g.is_match(name))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest() -> Vec<RegistrationNode> {
        vec![
            RegistrationNode::new("button")
                .dependency("icon", RegistrationNode::new("icon"))
                .dependency(
                    "label",
                    RegistrationNode::new("label").dependency("badge", RegistrationNode::new("badge")),
                ),
            RegistrationNode::new("card"),
        ]
    }

    #[test]
    fn test_root_match() {
        let roots = forest();
        let m = find_matching_registration("card", &roots, "-").unwrap();
        assert_eq!(m.node.identifier(), "card");
        assert_eq!(m.path, vec![PathStep::Index(1)]);
    }

    #[test]
    fn test_nested_match_path() {
        let roots = forest();
        let m = find_matching_registration("button-icon", &roots, "-").unwrap();
        assert_eq!(m.node.identifier(), "icon");
        assert_eq!(
            m.path,
            vec![PathStep::Index(0), PathStep::Dependencies, PathStep::Index(0)]
        );
        assert_eq!(serde_json::to_string(&m.path).unwrap(), r#"[0,"dependencies",0]"#);

        let m = find_matching_registration("button-label-badge", &roots, "-").unwrap();
        assert_eq!(m.node.identifier(), "badge");
        assert_eq!(resolve_path(&roots, &m.path), Some(m.node));
    }

    #[test]
    fn test_names_only_match_at_their_level() {
        let roots = forest();
        assert!(find_matching_registration("icon", &roots, "-").is_none());
        assert!(find_matching_registration("button-badge", &roots, "-").is_none());
        assert!(find_matching_registration("button-", &roots, "-").is_none());
    }

    #[test]
    fn test_resolve_path_rejects_bad_paths() {
        let roots = forest();
        assert!(resolve_path(&roots, &[PathStep::Index(5)]).is_none());
        assert!(resolve_path(&roots, &[PathStep::Index(0), PathStep::Dependencies]).is_none());
        assert!(resolve_path(&roots, &[PathStep::Dependencies]).is_none());
    }

    #[test]
    fn test_component_name_grammar() {
        assert_eq!(
            resolve_component_name("tdc-button-icon", "tdc", "-"),
            Some("TdcButtonIcon".to_string())
        );
        assert_eq!(resolve_component_name("tdc-button", "tdc", "-"), Some("TdcButton".to_string()));
        assert_eq!(resolve_component_name("tdc-", "tdc", "-"), None);
        assert_eq!(resolve_component_name("tdc-button2", "tdc", "-"), None);
        assert_eq!(resolve_component_name("button-icon", "tdc", "-"), None);
        assert!(is_managed_component_name("ui__card", "ui", "__"));
    }

    #[test]
    fn test_strip_prefix() {
        let grammar = ComponentNameGrammar::new("tdc", "-").unwrap();
        assert_eq!(grammar.strip_prefix("tdc-button-icon"), Some("button-icon"));
        assert_eq!(grammar.strip_prefix("div"), None);
    }
}
