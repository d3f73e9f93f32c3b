//! Property tests: determinism, the default-subset law and domain closure.

use proptest::prelude::*;
use std::collections::HashSet;

use crate::class_merge::merge_classes;
use crate::compile::compile;
use crate::registration::{RegistrationNode, StyleSource};
use crate::safelist::{classify, enumerate_permutations, permutation_count};
use crate::variants::{CompileParameters, ParameterValue, DEFAULT_MODIFIER};

const MODIFIERS: [&str; 3] = ["md", "hover", "lg"];

#[derive(Debug, Clone)]
enum Choice {
    Literal(usize),
    PerModifier(usize, Vec<(usize, usize)>),
}

/// Props `p0..pk` with domains `v0..vn`; style `s{i}` selects on `p{i}` and
/// shares the `base` and `shared` tokens across every case.
fn build_node(sizes: &[usize]) -> RegistrationNode {
    let mut node = RegistrationNode::new("generated");
    for (i, &n) in sizes.iter().enumerate() {
        let prop = format!("p{}", i);
        let domain: Vec<String> = (0..n).map(|j| format!("v{}", j)).collect();
        let cases: Vec<(String, String)> = (0..n)
            .map(|j| (format!("v{}", j), format!("t{}-{} shared", i, j)))
            .collect();
        node = node.prop(prop.clone(), domain).style(
            format!("s{}", i),
            StyleSource::builder().lit("base ").select(prop, cases).build(),
        );
    }
    node
}

fn arb_choice(n: usize) -> BoxedStrategy<Choice> {
    prop_oneof![
        (0..n).prop_map(Choice::Literal),
        (0..n, prop::collection::vec((0..MODIFIERS.len(), 0..n), 0..3))
            .prop_map(|(d, mods)| Choice::PerModifier(d, mods)),
    ]
    .boxed()
}

fn to_params(choices: &[Choice]) -> CompileParameters {
    let mut params = CompileParameters::new();
    for (i, choice) in choices.iter().enumerate() {
        let value = match choice {
            Choice::Literal(j) => ParameterValue::literal(format!("v{}", j)),
            Choice::PerModifier(d, mods) => {
                let mut entries = vec![(DEFAULT_MODIFIER.to_string(), format!("v{}", d))];
                for (m, j) in mods {
                    entries.push((MODIFIERS[*m].to_string(), format!("v{}", j)));
                }
                ParameterValue::per_modifier(entries)
            }
        };
        params.insert(format!("p{}", i), value);
    }
    params
}

fn arb_case() -> impl Strategy<Value = (RegistrationNode, CompileParameters)> {
    prop::collection::vec(1usize..4, 1..4).prop_flat_map(|sizes| {
        let node = build_node(&sizes);
        let choices: Vec<BoxedStrategy<Choice>> = sizes.iter().map(|&n| arb_choice(n)).collect();
        (Just(node), choices).prop_map(|(node, choices)| (node, to_params(&choices)))
    })
}

/// A props expression mixing literals, identifiers and omitted props.
fn arb_usage() -> impl Strategy<Value = (RegistrationNode, String)> {
    prop::collection::vec(1usize..4, 1..4).prop_flat_map(|sizes| {
        let node = build_node(&sizes);
        let members: Vec<BoxedStrategy<Option<String>>> = sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                prop_oneof![
                    Just(None),
                    Just(Some(format!("p{}: dynamic{}", i, i))),
                    (0..n).prop_map(move |j| Some(format!("p{}: 'v{}'", i, j))),
                ]
                .boxed()
            })
            .collect();
        (Just(node), members).prop_map(|(node, members)| {
            let body: Vec<String> = members.into_iter().flatten().collect();
            (node, format!("{{ {} }}", body.join(", ")))
        })
    })
}

proptest! {
    #[test]
    fn compile_is_deterministic((node, params) in arb_case()) {
        let first = compile(&node, &params).unwrap();
        let second = compile(&node, &params).unwrap();
        prop_assert_eq!(first.to_object_literal(), second.to_object_literal());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prefixed_tokens_never_repeat_defaults((node, params) in arb_case()) {
        let result = compile(&node, &params).unwrap();
        for tokens in result.styles.values() {
            let defaults: HashSet<&str> = tokens
                .iter()
                .filter(|t| !t.contains(':'))
                .map(String::as_str)
                .collect();
            let mut seen = HashSet::new();
            for token in tokens {
                prop_assert!(seen.insert(token.as_str()), "duplicate token {}", token);
                if let Some((_, bare)) = token.rsplit_once(':') {
                    prop_assert!(!defaults.contains(bare), "{} repeats a default token", token);
                }
            }
        }
    }

    #[test]
    fn enumerated_values_stay_in_domain((node, source) in arb_usage()) {
        let classification = classify(&source, &node).unwrap();
        let permutations = enumerate_permutations(&classification.candidates);
        prop_assert_eq!(permutations.len(), permutation_count(&classification.candidates));

        for params in &permutations {
            for (prop, value) in params.iter() {
                let domain = node.domain(prop).unwrap();
                for literal in value.values() {
                    prop_assert!(domain.iter().any(|v| v == literal));
                }
            }
            prop_assert!(compile(&node, params).is_ok());
        }
    }

    #[test]
    fn overlay_class_always_survives(
        base in prop::collection::vec(prop::sample::select(vec!["w-4", "h-4", "p-2", "px-1", "text-sm", "bg-red-400", "widget"]), 0..6),
        overlay in prop::sample::select(vec!["w-8", "h-8", "p-4", "text-lg", "bg-blue-400", "widget"]),
    ) {
        let merged = merge_classes(&base.join(" "), overlay);
        prop_assert_eq!(merged.split_whitespace().last(), Some(overlay));
    }
}
