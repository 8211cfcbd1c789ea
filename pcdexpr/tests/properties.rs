use num_integer::Integer;
use pcdexpr::{
    EvalMode, Evaluated, ExprError, SymbolTable, WarningKind, evaluate,
    guid::{guid_string_to_structure_string, guid_structure_to_string},
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn table(entries: &[(&str, &str)]) -> SymbolTable {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn literal(expr: &str, symbols: &SymbolTable) -> String {
    evaluate(expr, symbols, EvalMode::Literal)
        .expect("expression evaluates")
        .value
        .try_as_literal()
        .expect("literal mode yields text")
}

fn condition(expr: &str, symbols: &SymbolTable) -> bool {
    evaluate(expr, symbols, EvalMode::Condition)
        .expect("expression evaluates")
        .value
        .try_as_bool()
        .expect("condition mode yields a boolean")
}

#[test]
fn evaluation_is_idempotent() {
    let symbols = table(&[
        ("gSpace.PcdBase", "0x1000"),
        ("gSpace.PcdSize", "gSpace.PcdBase * 2"),
        ("ARCH", "X64"),
    ]);
    let exprs = [
        "gSpace.PcdSize + 1",
        "$(ARCH) in \"IA32 X64\"",
        "TRUE + 1",
        "\"abc\" == 5",
    ];
    for expr in exprs {
        for mode in [EvalMode::Condition, EvalMode::Literal] {
            let first = evaluate(expr, &symbols, mode).expect("first evaluation");
            let second = evaluate(expr, &symbols, mode).expect("second evaluation");
            assert_eq!(first, second, "`{expr}` in {mode:?} changed between calls");
        }
    }
}

#[test]
fn division_floors_toward_negative_infinity() {
    let empty = SymbolTable::new();
    assert_eq!(literal("-7 / 2", &empty), "-4");
    assert_eq!(literal("7 / -2", &empty), "-4");
    assert_eq!(literal("-7 / -2", &empty), "3");

    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    for _ in 0..500 {
        let a: i64 = rng.random_range(-100_000..100_000);
        let b: i64 = rng.random_range(-1_000..1_000);
        if b == 0 {
            continue;
        }
        let expected = a.div_floor(&b);
        assert_eq!(
            literal(&format!("{a} / {b}"), &empty),
            expected.to_string(),
            "{a} / {b}"
        );
    }
}

#[test]
fn undefined_macro_is_zero() {
    assert!(condition("$(UNDEFINED_MACRO) == 0", &SymbolTable::new()));
}

#[test]
fn ternary_evaluates_only_the_taken_branch() {
    let empty = SymbolTable::new();
    assert_eq!(literal("TRUE ? 1 : $(NOPE).Field", &empty), "1");

    let err = evaluate("FALSE ? 1 : $(NOPE).Field", &empty, EvalMode::Literal).unwrap_err();
    assert_eq!(
        err,
        ExprError::PcdNotResolved {
            name: "0.Field".into()
        }
    );
}

#[test]
fn string_number_equality_is_vacuous() {
    let empty = SymbolTable::new();

    let eq = evaluate("\"abc\" == 5", &empty, EvalMode::Condition).expect("no error");
    assert_eq!(eq.value, Evaluated::Bool(false));
    assert_eq!(eq.warnings.len(), 1);
    assert_eq!(eq.warnings[0].kind, WarningKind::StringEqualsOther);

    let ne = evaluate("\"abc\" != 5", &empty, EvalMode::Condition).expect("no error");
    assert_eq!(ne.value, Evaluated::Bool(true));
    assert_eq!(ne.warnings[0].kind, WarningKind::StringNotEqualsOther);
}

#[test]
fn guid_literal_round_trips() {
    let guid = "8BE4DF61-93CA-11D2-AA0D-00E098032B8C";
    let structure = guid_string_to_structure_string(guid).expect("registry guid");

    let rendered = literal(&structure, &SymbolTable::new());
    assert_eq!(
        guid_structure_to_string(&rendered).as_deref(),
        Some(guid.to_lowercase().as_str())
    );

    // the registry form used inside an expression evaluates to the structure
    let picked = literal(&format!("TRUE ? {guid} : 0"), &SymbolTable::new());
    assert_eq!(
        guid_structure_to_string(&picked).as_deref(),
        Some(guid.to_lowercase().as_str())
    );
}

#[test]
fn pcd_values_are_evaluated_recursively() {
    let symbols = table(&[
        ("gSpace.PcdA", "gSpace.PcdB + 1"),
        ("gSpace.PcdB", "$(BASE) << 4"),
        ("BASE", "2"),
        ("gSpace.PcdName", "\"name\""),
    ]);
    assert_eq!(literal("gSpace.PcdA", &symbols), "33");
    assert_eq!(literal("gSpace.PcdName", &symbols), "\"name\"");
    assert!(condition("gSpace.PcdName == \"name\"", &symbols));
}

#[test]
fn self_referential_pcd_is_bounded() {
    let symbols = table(&[("gSpace.PcdLoop", "gSpace.PcdLoop + 1")]);
    let err = evaluate("gSpace.PcdLoop", &symbols, EvalMode::Literal).unwrap_err();
    assert!(err.is_recursion_too_deep(), "unexpected error {err:?}");
}

#[test]
fn in_operand_macro_is_quoted() {
    let symbols = table(&[("ARCH", "X64"), ("TARGET", "DEBUG")]);
    assert!(condition("$(ARCH) in \"IA32 X64\"", &symbols));
    assert!(condition("$(TARGET) == \"DEBUG\"", &symbols));
    assert!(!condition("$(TARGET) == \"RELEASE\"", &symbols));
}

#[test]
fn wide_and_narrow_never_compare() {
    let err = evaluate("L\"a\" != \"a\"", &SymbolTable::new(), EvalMode::Condition).unwrap_err();
    assert!(err.is_string_compare_mismatch());
}
