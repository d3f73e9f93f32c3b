//! # tdc-compiler
//!
//! Resolves a forest of declarative style registrations into conditional
//! utility-class lists, and enumerates safelists for usages whose props are
//! not statically known.
//!
//! ## Pipeline
//!
//! 1. **Validate**: identifiers are unique across the forest, template
//!    conditionals select declared props and cover their domains, and every
//!    prop mapping is consistent with the domains it connects.
//! 2. **Merge manipulations**: overlay patches derive new nodes; the loaded
//!    registrations are never mutated.
//! 3. **Compile** (props known): variants are expanded per modifier key, the
//!    template is rendered once per key and tokens are merged so that
//!    non-default modifiers only contribute prefixed tokens absent from the
//!    default list.
//! 4. **Safelist** (props unknown): the usage's props expression is classified,
//!    every possible assignment is enumerated and compiled, and all classes are
//!    unioned.
//!
//! ## Token format
//!
//! Baseline tokens are emitted bare (`h-4`); every other token carries its
//! modifier key (`hover:md:h-8`).
//!
//! ## Errors
//!
//! All fatal conditions are [`RegistryError`]s, grouped by [`ErrorKind`]:
//! configuration errors, domain violations and missing required props.
//! Over-approximation during classification is advisory and only logged.

mod cache;
mod class_merge;
mod compile;
mod config;
mod error;
mod manipulation;
mod matcher;
mod registration;
mod registry;
mod safelist;
mod static_eval;
mod transform;
mod validate;
mod variants;

#[cfg(test)]
mod property_tests;

pub use cache::CompileCache;
pub use class_merge::merge_classes;
pub use compile::{compile, CompileResult, Selector};
pub use config::LibraryConfig;
pub use error::{ErrorKind, RegistryError, Result};
pub use manipulation::{merge_manipulations, Manipulation};
pub use matcher::{
    find_matching_registration, is_managed_component_name, resolve_component_name, resolve_path,
    ComponentNameGrammar, PathStep, RegistrationMatch,
};
pub use registration::{
    PropDomains, PropMapping, RegistrationNode, StyleBuilder, StyleSegment, StyleSource,
    StyleTemplate,
};
pub use registry::Registry;
pub use safelist::{
    classify, classify_with_domains, enumerate_permutations, permutation_count, safelist,
    safelist_from_compiled, safelist_from_results, Candidates, Classification, Optimality,
    OverApproximation,
};
pub use static_eval::{
    evaluate_expression, evaluate_parameters, parse_props_expression, EvalScope, ObjectMember,
    PropsExpr, PropsObject,
};
pub use transform::{transform_usage, DeferredCall, UsageOutcome};
pub use validate::{flatten_registrations, validate_forest, validate_mappings, validate_styles};
pub use variants::{
    expand_variants, CompileParameters, ExpandedVariants, ParameterValue, VariantAssignment,
    DEFAULT_MODIFIER,
};

pub mod codes {
    //! Stable error codes reported by [`RegistryError::code`](crate::RegistryError::code).
    pub use crate::error::{
        ERR_DOMAIN_VIOLATION, ERR_DUPLICATE_IDENTIFIER, ERR_INVALID_CONFIG,
        ERR_MALFORMED_EXPRESSION, ERR_MALFORMED_PARAMETERS, ERR_MISSING_REQUIRED_PROP,
        ERR_UNBOUND_IDENTIFIER, ERR_UNKNOWN_DEPENDENCY, ERR_UNKNOWN_PROP, ERR_UNMAPPED_VALUE,
        ERR_UNSUPPORTED_EXPRESSION,
    };
}
