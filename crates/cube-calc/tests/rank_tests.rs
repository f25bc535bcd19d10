mod common;

use common::Cube;
use cube_calc::{CellValue, Compiler, Datum, Expr, FunDef, ResultStyle};
use pretty_assertions::assert_eq;

fn rank_value(cube: &Cube, expr: &Expr) -> CellValue {
    let mut compiler = Compiler::new(&cube.config);
    let calc = compiler
        .compile(expr, &[ResultStyle::Scalar])
        .unwrap()
        .into_scalar();
    let mut ev = cube.evaluator();
    calc.evaluate(&mut ev).unwrap()
}

#[test]
fn rank_without_key_is_position_in_set_order() {
    let cube = Cube::new();
    let set = Expr::members(vec![
        cube.state("USA", "CA"),
        cube.state("USA", "OR"),
        cube.state("USA", "WA"),
    ]);
    let expr = Expr::call(
        FunDef::Rank,
        vec![Expr::Member(cube.state("USA", "OR")), set],
    );
    assert_eq!(rank_value(&cube, &expr), CellValue::Ready(Datum::Number(2.0)));
}

#[test]
fn rank_of_member_outside_the_set_is_null() {
    let cube = Cube::new();
    let set = Expr::members(vec![cube.state("USA", "CA"), cube.state("USA", "OR")]);
    let expr = Expr::call(
        FunDef::Rank,
        vec![Expr::Member(cube.state("Canada", "BC")), set],
    );
    assert_eq!(rank_value(&cube, &expr), CellValue::Ready(Datum::Null));
}

#[test]
fn keyed_rank_counts_strictly_greater_keys_and_shares_ties() {
    let cube = Cube::new();
    // Unit sales: WA 80, BC 60, CA 50, OR 50 — CA and OR tie.
    let set = Expr::members(vec![
        cube.state("USA", "CA"),
        cube.state("USA", "OR"),
        cube.state("USA", "WA"),
        cube.state("Canada", "BC"),
    ]);
    let key = Expr::Member(cube.measure("Unit Sales"));
    let rank_of = |member| {
        Expr::call(FunDef::Rank, vec![Expr::Member(member), set.clone(), key.clone()])
    };
    assert_eq!(
        rank_value(&cube, &rank_of(cube.state("USA", "WA"))),
        CellValue::Ready(Datum::Number(1.0))
    );
    assert_eq!(
        rank_value(&cube, &rank_of(cube.state("Canada", "BC"))),
        CellValue::Ready(Datum::Number(2.0))
    );
    assert_eq!(
        rank_value(&cube, &rank_of(cube.state("USA", "CA"))),
        CellValue::Ready(Datum::Number(3.0))
    );
    assert_eq!(
        rank_value(&cube, &rank_of(cube.state("USA", "OR"))),
        CellValue::Ready(Datum::Number(3.0))
    );
}

#[test]
fn pending_target_key_returns_transient_zero() {
    let cube = Cube::new();
    let ca = cube.state("USA", "CA");
    cube.cells.mark_pending(ca);
    let set = Expr::members(vec![ca, cube.state("USA", "OR")]);
    let expr = Expr::call(
        FunDef::Rank,
        vec![
            Expr::Member(ca),
            set,
            Expr::Member(cube.measure("Unit Sales")),
        ],
    );
    assert_eq!(rank_value(&cube, &expr), CellValue::Ready(Datum::Number(0.0)));
}

#[test]
fn sorted_keys_are_memoized_per_set_and_context() {
    let cube = Cube::new();
    let set = Expr::members(vec![
        cube.state("USA", "CA"),
        cube.state("USA", "OR"),
        cube.state("USA", "WA"),
        cube.state("Canada", "BC"),
    ]);
    let key = Expr::Member(cube.measure("Unit Sales"));
    let expr_wa = Expr::call(
        FunDef::Rank,
        vec![
            Expr::Member(cube.state("USA", "WA")),
            set.clone(),
            key.clone(),
        ],
    );

    let mut compiler = Compiler::new(&cube.config);
    let calc = compiler
        .compile(&expr_wa, &[ResultStyle::Scalar])
        .unwrap()
        .into_scalar();

    let mut ev = cube.evaluator();
    let first = calc.evaluate(&mut ev).unwrap();
    let after_first = cube.cells.reads();

    // Second evaluation in the same context: only the target's own key is
    // re-read, the sorted projection comes from the cache.
    let second = calc.evaluate(&mut ev).unwrap();
    assert_eq!(first, second);
    assert_eq!(cube.cells.reads(), after_first + 1);
}
