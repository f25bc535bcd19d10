mod common;

use common::Cube;
use cube_calc::{CalcError, Compiler, EngineConfig, Expr, ResultStyle, SetList, TupleBuf};
use cube_model::MemberId;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn materialized_product_has_div_mod_indexing() {
    let cube = Cube::new();
    let genders = vec![cube.gender("F"), cube.gender("M")];
    let states = vec![
        cube.state("USA", "CA"),
        cube.state("USA", "OR"),
        cube.state("USA", "WA"),
    ];
    let expr = Expr::crossjoin(Expr::members(genders.clone()), Expr::members(states.clone()));
    let mut compiler = Compiler::new(&cube.config);
    let calc = compiler
        .compile(&expr, &[ResultStyle::List])
        .unwrap()
        .into_list();

    let mut ev = cube.evaluator();
    let list = calc.evaluate_list(&mut ev).unwrap();
    assert_eq!(list.len(), 6);
    assert_eq!(list.arity(), 2);
    for i in 0..6 {
        let tuple = list.tuple(i);
        assert_eq!(tuple[0], genders[i / 3]);
        assert_eq!(tuple[1], states[i % 3]);
    }
}

#[test]
fn streamed_and_materialized_forms_enumerate_identically() {
    let cube = Cube::new();
    let expr = Expr::crossjoin(
        Expr::members(vec![cube.gender("F"), cube.gender("M")]),
        Expr::members(vec![
            cube.state("USA", "CA"),
            cube.state("USA", "OR"),
            cube.country("Canada"),
        ]),
    );
    let mut compiler = Compiler::new(&cube.config);
    let list_calc = compiler
        .compile(&expr, &[ResultStyle::List])
        .unwrap()
        .into_list();
    let iter_calc = compiler
        .compile(&expr, &[ResultStyle::Iterable])
        .unwrap()
        .into_iterable();

    let mut ev = cube.evaluator();
    let materialized = list_calc.evaluate_list(&mut ev).unwrap().rows();
    let mut stream = iter_calc.evaluate_stream(&mut ev).unwrap();
    let mut streamed: Vec<TupleBuf> = Vec::new();
    while let Some(tuple) = stream.next(&mut ev).unwrap() {
        streamed.push(tuple);
    }
    assert_eq!(streamed, materialized);
}

#[test]
fn nested_products_flatten_associatively() {
    let cube = Cube::new();
    let a = Expr::members(vec![cube.gender("F"), cube.gender("M")]);
    let b = Expr::members(vec![cube.state("USA", "CA"), cube.state("USA", "OR")]);
    let c = Expr::members(vec![
        cube.measure("Unit Sales"),
        cube.measure("Store Sales"),
    ]);
    let left = Expr::crossjoin(Expr::crossjoin(a.clone(), b.clone()), c.clone());
    let right = Expr::crossjoin(a, Expr::crossjoin(b, c));

    let mut compiler = Compiler::new(&cube.config);
    let left = compiler
        .compile(&left, &[ResultStyle::List])
        .unwrap()
        .into_list();
    let right = compiler
        .compile(&right, &[ResultStyle::List])
        .unwrap()
        .into_list();

    let mut ev = cube.evaluator();
    let left = left.evaluate_list(&mut ev).unwrap();
    let right = right.evaluate_list(&mut ev).unwrap();
    assert_eq!(left.arity(), 3);
    assert_eq!(right.arity(), 3);
    assert_eq!(left.rows(), right.rows());
}

#[test]
fn oversized_product_fails_with_size_and_limit() {
    let cube = Cube::with_config(EngineConfig {
        crossjoin_result_limit: 5,
        ..EngineConfig::default()
    });
    let expr = Expr::crossjoin(
        Expr::members(vec![cube.gender("F"), cube.gender("M")]),
        Expr::members(vec![
            cube.state("USA", "CA"),
            cube.state("USA", "OR"),
            cube.state("USA", "WA"),
        ]),
    );
    let mut compiler = Compiler::new(&cube.config);
    let calc = compiler
        .compile(&expr, &[ResultStyle::List])
        .unwrap()
        .into_list();

    let mut ev = cube.evaluator();
    let err = calc.evaluate_list(&mut ev).unwrap_err();
    assert!(
        matches!(err, CalcError::ResourceLimit { actual: 6, limit: 5 }),
        "expected ResourceLimit {{ actual: 6, limit: 5 }}, got {err:?}"
    );
}

#[test]
fn mutable_request_packs_into_flat_backing() {
    let cube = Cube::new();
    let expr = Expr::crossjoin(
        Expr::members(vec![cube.gender("F"), cube.gender("M")]),
        Expr::members(vec![cube.state("USA", "CA"), cube.state("USA", "OR")]),
    );
    let mut compiler = Compiler::new(&cube.config);
    let compiled = compiler.compile(&expr, &[ResultStyle::MutableList]).unwrap();
    assert_eq!(compiled.style(), ResultStyle::MutableList);

    let mut ev = cube.evaluator();
    let list = compiled.into_list().evaluate_list(&mut ev).unwrap();
    assert!(matches!(list, SetList::Tuples(_)));

    let mut packed = list.into_mutable();
    packed.remove(0);
    assert_eq!(packed.len(), 3);
    assert_eq!(packed.get(0), &[cube.gender("F"), cube.state("USA", "OR")][..]);
}

proptest! {
    #[test]
    fn product_view_matches_flat_index_formula(m in 1usize..8, n in 1usize..8) {
        let a = SetList::Members((0..m).map(MemberId::from_index).collect());
        let b = SetList::Members((100..100 + n).map(MemberId::from_index).collect());
        let p = SetList::product(a, b);
        prop_assert_eq!(p.len(), m * n);
        for i in 0..m * n {
            let tuple = p.tuple(i);
            prop_assert_eq!(tuple[0].index(), i / n);
            prop_assert_eq!(tuple[1].index(), 100 + i % n);
        }
    }
}
