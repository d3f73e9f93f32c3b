//! Registry
//!
//! Bundles a validated, manipulation-merged registration forest with the
//! library configuration it was loaded under.

use indexmap::IndexMap;
use tracing::info;

use crate::compile::{compile, CompileResult};
use crate::config::LibraryConfig;
use crate::error::{RegistryError, Result};
use crate::manipulation::{merge_manipulations, Manipulation};
use crate::matcher::{find_matching_registration, RegistrationMatch};
use crate::registration::RegistrationNode;
use crate::safelist::{classify, safelist, Candidates};
use crate::transform::{transform_usage, UsageOutcome};
use crate::validate::{flatten_registrations, validate_forest};
use crate::variants::CompileParameters;

#[derive(Debug, Clone)]
pub struct Registry {
    config: LibraryConfig,
    roots: Vec<RegistrationNode>,
}

impl Registry {
    /// Validates `roots`, merges `manipulations` into them and validates the
    /// merged forest again.
    pub fn new(
        config: LibraryConfig,
        roots: Vec<RegistrationNode>,
        manipulations: &[Manipulation],
    ) -> Result<Self> {
        config.validate()?;
        validate_forest(&roots)?;
        let roots = if manipulations.is_empty() {
            roots
        } else {
            let merged = merge_manipulations(&roots, manipulations);
            validate_forest(&merged)?;
            merged
        };
        info!(
            roots = roots.len(),
            registrations = flatten_registrations(&roots).len(),
            "registry loaded"
        );
        Ok(Self { config, roots })
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn roots(&self) -> &[RegistrationNode] {
        &self.roots
    }

    /// Looks up a compound name such as `button-icon`.
    pub fn find(&self, name: &str) -> Option<RegistrationMatch<'_>> {
        find_matching_registration(name, &self.roots, &self.config.tag_name_delimiter)
    }

    fn require(&self, name: &str) -> Result<&RegistrationNode> {
        self.find(name)
            .map(|m| m.node)
            .ok_or_else(|| RegistryError::InvalidConfig {
                reason: format!("no registration named '{}'", name),
            })
    }

    pub fn compile_by_name(&self, name: &str, params: &CompileParameters) -> Result<CompileResult> {
        compile(self.require(name)?, params)
    }

    pub fn transform_usage(&self, tag_name: &str, expression: &str) -> Result<Option<UsageOutcome>> {
        transform_usage(&self.roots, &self.config, tag_name, expression)
    }

    /// Safelist of the registration `name` for the props expression `source`.
    pub fn safelist_for(&self, name: &str, source: &str) -> Result<Vec<String>> {
        let node = self.require(name)?;
        let classification = classify(source, node)?;
        safelist(node, &classification.candidates)
    }

    /// Safelist covering every value of every prop of `name`, and the unset
    /// state of props that fall back when omitted.
    pub fn full_safelist(&self, name: &str) -> Result<Vec<String>> {
        let node = self.require(name)?;
        let candidates: IndexMap<String, Candidates> = node
            .props
            .iter()
            .map(|(prop, domain)| (prop.clone(), Candidates::widened(node, prop, domain)))
            .collect();
        safelist(node, &candidates)
    }
}
