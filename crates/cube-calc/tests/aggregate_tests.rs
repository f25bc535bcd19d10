mod common;

use common::Cube;
use cube_calc::{
    AggKind, CellError, CellValue, Compiler, Datum, Evaluator, Expr, FunDef, ResultStyle,
};
use pretty_assertions::assert_eq;

fn aggregate(cube: &Cube, kind: AggKind, args: Vec<Expr>) -> CellValue {
    let expr = Expr::call(FunDef::Aggregate { kind }, args);
    let mut compiler = Compiler::new(&cube.config);
    let calc = compiler
        .compile(&expr, &[ResultStyle::Scalar])
        .unwrap()
        .into_scalar();
    let mut ev = cube.evaluator();
    calc.evaluate(&mut ev).unwrap()
}

#[test]
fn sum_defaults_to_the_cell_at_each_coordinate() {
    let cube = Cube::new();
    // Unit sales (the default measure): CA 50 + OR 50 + WA 80.
    let states = Expr::members(vec![
        cube.state("USA", "CA"),
        cube.state("USA", "OR"),
        cube.state("USA", "WA"),
    ]);
    assert_eq!(
        aggregate(&cube, AggKind::Sum, vec![states]),
        CellValue::Ready(Datum::Number(180.0))
    );
}

#[test]
fn sum_with_an_explicit_value_expression() {
    let cube = Cube::new();
    // Store sales: CA 500 + OR 550 + WA 800.
    let states = Expr::members(vec![
        cube.state("USA", "CA"),
        cube.state("USA", "OR"),
        cube.state("USA", "WA"),
    ]);
    let value = Expr::Member(cube.measure("Store Sales"));
    assert_eq!(
        aggregate(&cube, AggKind::Sum, vec![states, value]),
        CellValue::Ready(Datum::Number(1850.0))
    );
}

#[test]
fn count_skips_null_cells() {
    let cube = Cube::new();
    let set = Expr::members(vec![cube.state("USA", "CA"), cube.state("Canada", "NV")]);
    assert_eq!(
        aggregate(&cube, AggKind::Count, vec![set]),
        CellValue::Ready(Datum::Number(1.0))
    );
}

#[test]
fn min_and_max_over_the_same_set() {
    let cube = Cube::new();
    let states = || {
        Expr::members(vec![
            cube.state("USA", "CA"),
            cube.state("USA", "OR"),
            cube.state("USA", "WA"),
            cube.state("Canada", "BC"),
        ])
    };
    assert_eq!(
        aggregate(&cube, AggKind::Min, vec![states()]),
        CellValue::Ready(Datum::Number(50.0))
    );
    assert_eq!(
        aggregate(&cube, AggKind::Max, vec![states()]),
        CellValue::Ready(Datum::Number(80.0))
    );
}

#[test]
fn sum_over_an_empty_set_is_null_and_count_is_zero() {
    let cube = Cube::new();
    let empty = Expr::members(vec![]);
    assert_eq!(
        aggregate(&cube, AggKind::Sum, vec![empty.clone()]),
        CellValue::Ready(Datum::Null)
    );
    assert_eq!(
        aggregate(&cube, AggKind::Count, vec![empty]),
        CellValue::Ready(Datum::Number(0.0))
    );
}

#[test]
fn a_pending_element_makes_the_whole_rollup_pending() {
    let cube = Cube::new();
    cube.cells.mark_pending(cube.state("USA", "WA"));
    let set = Expr::members(vec![cube.state("USA", "CA"), cube.state("USA", "WA")]);
    assert_eq!(aggregate(&cube, AggKind::Sum, vec![set]), CellValue::Pending);
}

#[test]
fn missing_registry_surfaces_as_the_cell_error_not_a_failure() {
    let cube = Cube::new();
    let expr = Expr::call(
        FunDef::Aggregate { kind: AggKind::Sum },
        vec![Expr::members(vec![cube.state("USA", "CA")])],
    );
    let mut compiler = Compiler::new(&cube.config);
    let calc = compiler
        .compile(&expr, &[ResultStyle::Scalar])
        .unwrap()
        .into_scalar();

    // No aggregators installed on this evaluator.
    let mut ev = Evaluator::new(&cube.schema, &cube.cells, &cube.config);
    assert_eq!(
        calc.evaluate(&mut ev).unwrap(),
        CellValue::Error(CellError::NoAggregator)
    );
}
