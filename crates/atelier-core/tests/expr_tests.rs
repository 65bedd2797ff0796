// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]

use std::collections::BTreeMap;

use proptest::prelude::*;
use rustc_hash::FxHashMap;

use atelier_core::expr::{
    bind, builtin_functions, evaluate, parse, BindError, Function, FunctionSignature,
    SyntaxError, VariableReference,
};
use atelier_core::{ObjectId, Variant};

fn variables(names: &[(&str, u64)]) -> FxHashMap<String, VariableReference> {
    names
        .iter()
        .map(|&(name, id)| {
            (
                name.to_owned(),
                VariableReference::Object(ObjectId::from_raw(id)),
            )
        })
        .collect()
}

fn signatures() -> FxHashMap<String, FunctionSignature> {
    builtin_functions()
        .iter()
        .map(|function| (function.name.clone(), function.signature.clone()))
        .collect()
}

fn functions() -> FxHashMap<String, Function> {
    builtin_functions()
        .iter()
        .map(|function| (function.name.clone(), function.clone()))
        .collect()
}

#[test]
fn parse_bind_evaluate_end_to_end() {
    let cst = parse("a + b * c").expect("parseable");
    let bound = bind(
        &cst.to_unbound(),
        &variables(&[("a", 1), ("b", 2), ("c", 3)]),
        &signatures(),
    )
    .expect("bindable");

    let provided: BTreeMap<VariableReference, Variant> = [
        (VariableReference::Object(ObjectId::from_raw(1)), Variant::from(2)),
        (VariableReference::Object(ObjectId::from_raw(2)), Variant::from(3)),
        (VariableReference::Object(ObjectId::from_raw(3)), Variant::from(4)),
    ]
    .into_iter()
    .collect();

    let value = evaluate(&bound, &provided, &functions()).expect("evaluates");
    assert_eq!(value, Variant::from(14));
}

#[test]
fn function_call_round_trips_exactly() {
    let cst = parse("fun(x,y)").expect("parseable");
    assert_eq!(cst.full_text(), "fun(x,y)");
}

#[test]
fn binder_rejects_unknowns_but_round_trip_still_holds() {
    let source = "mystery( a , 2 )";
    let cst = parse(source).expect("parseable");
    assert_eq!(cst.full_text(), source);
    let error = bind(&cst.to_unbound(), &variables(&[("a", 1)]), &signatures())
        .expect_err("unknown function");
    assert_eq!(error, BindError::UnknownFunction("mystery".to_owned()));
}

#[test]
fn builtin_formulas_evaluate() {
    let cst = parse("min(a, 10) + sqrt(power(2, 2))").expect("parseable");
    let bound = bind(&cst.to_unbound(), &variables(&[("a", 7)]), &signatures())
        .expect("bindable");
    let provided: BTreeMap<VariableReference, Variant> = [(
        VariableReference::Object(ObjectId::from_raw(7)),
        Variant::from(4.0),
    )]
    .into_iter()
    .collect();
    let value = evaluate(&bound, &provided, &functions()).expect("evaluates");
    assert_eq!(value, Variant::from(6.0));
}

#[test]
fn syntax_errors_carry_positions() {
    let error = parse("1 + ").expect_err("incomplete");
    assert_eq!(error, SyntaxError::ExpressionExpected { position: 4 });
}

// ---------------------------------------------------------------------
// Property: the concrete syntax tree reproduces its input verbatim.
// ---------------------------------------------------------------------

fn arb_whitespace() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![Just(' '), Just('\t')], 0..3)
        .prop_map(|chars| chars.into_iter().collect())
}

fn arb_leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..100_000).prop_map(|n| n.to_string()),
        (0u32..1000, 0u32..1000).prop_map(|(a, b)| format!("{a}.{b}")),
        (1u32..100, 1u32..100).prop_map(|(a, b)| format!("{a}_{b}")),
        "[a-z][a-z0-9_]{0,6}",
    ]
}

fn arb_expression() -> impl Strategy<Value = String> {
    arb_leaf().prop_recursive(4, 32, 4, |inner| {
        let ws = arb_whitespace;
        prop_oneof![
            (inner.clone(), ws(), prop_oneof![
                Just("+"), Just("-"), Just("*"), Just("/"), Just("%")
            ], ws(), inner.clone())
                .prop_map(|(lhs, w1, op, w2, rhs)| format!("{lhs}{w1}{op}{w2}{rhs}")),
            (ws(), inner.clone(), ws())
                .prop_map(|(w1, e, w2)| format!("({w1}{e}{w2})")),
            (ws(), inner.clone()).prop_map(|(w, e)| format!("-{w}{e}")),
            (
                "[a-z][a-z0-9_]{0,6}",
                prop::collection::vec((inner, ws()), 1..4),
                ws()
            )
                .prop_map(|(name, args, w)| {
                    let list: Vec<String> = args
                        .into_iter()
                        .map(|(arg, pad)| format!("{pad}{arg}"))
                        .collect();
                    format!("{name}({}{w})", list.join(","))
                }),
        ]
    })
}

proptest! {
    #[test]
    fn full_text_round_trip(source in arb_expression()) {
        let cst = parse(&source).expect("generated expressions are parseable");
        prop_assert_eq!(cst.full_text(), source);
    }

    #[test]
    fn round_trip_with_padding(core in arb_expression(), lead in arb_whitespace(), trail in arb_whitespace()) {
        let source = format!("{lead}{core}{trail}");
        let cst = parse(&source).expect("generated expressions are parseable");
        prop_assert_eq!(cst.full_text(), source);
    }

    #[test]
    fn lowering_is_total_for_parseable_inputs(source in arb_expression()) {
        let cst = parse(&source).expect("generated expressions are parseable");
        let _ = cst.to_unbound();
    }
}
