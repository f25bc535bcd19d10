mod common;

use common::Cube;
use cube_calc::{Compiler, Datum, Expr, FunDef, ResultStyle};
use cube_model::MemberId;
use pretty_assertions::assert_eq;

fn evaluate_members(cube: &Cube, expr: &Expr) -> Vec<MemberId> {
    let mut compiler = Compiler::new(&cube.config);
    let calc = compiler
        .compile(expr, &[ResultStyle::List])
        .unwrap()
        .into_list();
    let mut ev = cube.evaluator();
    let list = calc.evaluate_list(&mut ev).unwrap();
    list.rows().iter().map(|t| t[0]).collect()
}

fn states(cube: &Cube) -> Expr {
    Expr::members(vec![
        cube.state("USA", "CA"),
        cube.state("USA", "OR"),
        cube.state("USA", "WA"),
        cube.state("Canada", "BC"),
    ])
}

fn n(value: f64) -> Expr {
    Expr::Literal(Datum::Number(value))
}

#[test]
fn head_takes_a_prefix_and_clamps_to_the_set() {
    let cube = Cube::new();
    let expr = Expr::call(FunDef::Head, vec![states(&cube), n(2.0)]);
    assert_eq!(
        evaluate_members(&cube, &expr),
        vec![cube.state("USA", "CA"), cube.state("USA", "OR")]
    );

    let oversized = Expr::call(FunDef::Head, vec![states(&cube), n(10.0)]);
    assert_eq!(evaluate_members(&cube, &oversized).len(), 4);

    let negative = Expr::call(FunDef::Head, vec![states(&cube), n(-3.0)]);
    assert!(evaluate_members(&cube, &negative).is_empty());
}

#[test]
fn tail_takes_a_suffix() {
    let cube = Cube::new();
    let expr = Expr::call(FunDef::Tail, vec![states(&cube), n(2.0)]);
    assert_eq!(
        evaluate_members(&cube, &expr),
        vec![cube.state("USA", "WA"), cube.state("Canada", "BC")]
    );
}

#[test]
fn subset_windows_from_start_with_optional_count() {
    let cube = Cube::new();
    let with_count = Expr::call(FunDef::Subset, vec![states(&cube), n(1.0), n(2.0)]);
    assert_eq!(
        evaluate_members(&cube, &with_count),
        vec![cube.state("USA", "OR"), cube.state("USA", "WA")]
    );

    let to_end = Expr::call(FunDef::Subset, vec![states(&cube), n(1.0)]);
    assert_eq!(evaluate_members(&cube, &to_end).len(), 3);
}

#[test]
fn non_numeric_count_yields_an_empty_set() {
    let cube = Cube::new();
    let expr = Expr::call(
        FunDef::Head,
        vec![states(&cube), Expr::Literal(Datum::Null)],
    );
    assert!(evaluate_members(&cube, &expr).is_empty());
}

#[test]
fn windows_over_a_lazy_product_stay_consistent_with_the_flat_view() {
    let cube = Cube::new();
    let product = Expr::crossjoin(
        Expr::members(vec![cube.gender("F"), cube.gender("M")]),
        Expr::members(vec![cube.state("USA", "CA"), cube.state("USA", "OR")]),
    );
    let window = Expr::call(FunDef::Subset, vec![product.clone(), n(1.0), n(2.0)]);

    let mut compiler = Compiler::new(&cube.config);
    let full = compiler
        .compile(&product, &[ResultStyle::List])
        .unwrap()
        .into_list();
    let windowed = compiler
        .compile(&window, &[ResultStyle::List])
        .unwrap()
        .into_list();

    let mut ev = cube.evaluator();
    let full = full.evaluate_list(&mut ev).unwrap();
    let windowed = windowed.evaluate_list(&mut ev).unwrap();
    assert_eq!(windowed.rows(), full.rows()[1..3].to_vec());
}
