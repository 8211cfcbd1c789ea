use log::debug;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};
use strum::{EnumIs, EnumTryAs};

use crate::{
    SymbolTable,
    error::{ExprError, ExprResult, Warning, WarningKind},
    macros::replace_macros,
    parser::{BinaryOp, Expr, UnaryOp, parse},
    token::{CastWidth, Token, tokenize},
    value::{StrKind, StrLit, Value, parse_number},
};

/// Maximum nesting of PCD references resolved while evaluating one expression.
pub const MAX_RECURSION_DEPTH: usize = 64;

/// Largest accepted shift count.
const MAX_SHIFT: u32 = 4096;

/// Output requested from [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalMode {
    /// Reduce to a boolean.
    Condition,
    /// Render the canonical literal text.
    Literal,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
pub enum Evaluated {
    Bool(bool),
    Literal(String),
}

/// Successful evaluation, with any non-fatal diagnostics raised on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub value: Evaluated,
    pub warnings: Vec<Warning>,
}

/// Evaluates `expr` against `symbols`.
///
/// In [`EvalMode::Literal`] an expression that is already a plain number, a
/// single quoted string or a single array literal is returned as written.
pub fn evaluate(expr: &str, symbols: &SymbolTable, mode: EvalMode) -> ExprResult<Evaluation> {
    let mut evaluator = Evaluator::new(symbols);
    let value = evaluator.evaluate(expr, mode)?;
    Ok(Evaluation {
        value,
        warnings: evaluator.warnings,
    })
}

pub(crate) struct Evaluator<'s> {
    symbols: &'s SymbolTable,
    pub(crate) warnings: Vec<Warning>,
}

impl<'s> Evaluator<'s> {
    pub(crate) fn new(symbols: &'s SymbolTable) -> Self {
        Self {
            symbols,
            warnings: Vec::new(),
        }
    }

    fn expand(&self, expr: &str) -> ExprResult<String> {
        let expanded = replace_macros(expr, self.symbols)?;
        let trimmed = expanded.trim();
        if trimmed.is_empty() {
            return Err(ExprError::EmptyExpression);
        }
        Ok(trimmed.to_string())
    }

    pub(crate) fn evaluate(&mut self, expr: &str, mode: EvalMode) -> ExprResult<Evaluated> {
        let text = self.expand(expr)?;
        debug!("evaluating `{text}` as {mode:?}");

        if mode == EvalMode::Literal && is_verbatim_literal(&text) {
            return Ok(Evaluated::Literal(text));
        }

        let value = self.value_of(&text, 0)?;
        Ok(match mode {
            EvalMode::Condition => Evaluated::Bool(condition_of(&value)),
            EvalMode::Literal => Evaluated::Literal(value.to_string()),
        })
    }

    /// Parses and evaluates an expanded expression into a value.
    pub(crate) fn value_of(&mut self, text: &str, depth: usize) -> ExprResult<Value> {
        let ast = parse(text)?;
        self.eval(&ast, depth)
    }

    /// Evaluates an unexpanded expression into a value.
    pub(crate) fn value(&mut self, expr: &str) -> ExprResult<Value> {
        let text = self.expand(expr)?;
        self.value_of(&text, 0)
    }

    fn eval(&mut self, expr: &Expr, depth: usize) -> ExprResult<Value> {
        match expr {
            Expr::Ident(name) => self.resolve(name, depth),
            Expr::Str(lit) => Ok(Value::Str(lit.clone())),
            Expr::Array(text) => Ok(Value::Array(text.clone())),
            Expr::Ternary(cond, then, otherwise) => {
                if self.eval(cond, depth)?.is_truthy() {
                    self.eval(then, depth)
                } else {
                    self.eval(otherwise, depth)
                }
            }
            Expr::Cast(width, inner) => {
                let value = self.eval(inner, depth)?;
                cast(*width, value)
            }
            Expr::Unary(op, inner) => {
                let value = self.eval(inner, depth)?;
                unary(*op, value)
            }
            Expr::Binary(first, rest) => {
                let mut acc = self.eval(first, depth)?;
                for (op, rhs) in rest {
                    let rhs = self.eval(rhs, depth)?;
                    acc = self.binary(*op, acc, rhs)?;
                }
                Ok(acc)
            }
        }
    }

    fn resolve(&mut self, name: &str, depth: usize) -> ExprResult<Value> {
        if is_pcd_reference(name) {
            let stored = self
                .symbols
                .get(name)
                .ok_or_else(|| ExprError::PcdNotResolved {
                    name: name.to_string(),
                })?;
            if depth >= MAX_RECURSION_DEPTH {
                return Err(ExprError::RecursionTooDeep {
                    name: name.to_string(),
                    depth: MAX_RECURSION_DEPTH,
                });
            }
            debug!("resolving {name} = `{stored}` at depth {}", depth + 1);
            let text = self.expand(stored)?;
            return self.value_of(&text, depth + 1);
        }

        Ok(match name {
            "TRUE" | "true" | "True" => Value::Bool(true),
            "FALSE" | "false" | "False" => Value::Bool(false),
            _ => match parse_number(name) {
                Some(n) => Value::Int(n),
                None => Value::Str(StrLit::narrow(name)),
            },
        })
    }

    fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> ExprResult<Value> {
        if !op.is_comparison() && (lhs.is_stringy() || rhs.is_stringy()) {
            return Err(ExprError::StringOperatorMisuse {
                op: op.as_ref().to_string(),
            });
        }

        let (lhs, rhs) = if op.is_membership() {
            (stringify(lhs), stringify(rhs))
        } else {
            (lhs, rhs)
        };

        if matches!(op, BinaryOp::Add | BinaryOp::Sub) && (lhs.is_bool() || rhs.is_bool()) {
            self.warnings
                .push(Warning::new(WarningKind::BoolInArithmetic, op.as_ref()));
        } else if lhs.is_stringy() != rhs.is_stringy() {
            return match op {
                BinaryOp::Eq => {
                    self.warnings
                        .push(Warning::new(WarningKind::StringEqualsOther, op.as_ref()));
                    Ok(Value::Bool(false))
                }
                BinaryOp::Ne => {
                    self.warnings
                        .push(Warning::new(WarningKind::StringNotEqualsOther, op.as_ref()));
                    Ok(Value::Bool(true))
                }
                _ => Err(ExprError::RelationalStringMismatch {
                    op: op.as_ref().to_string(),
                }),
            };
        } else if lhs.is_bool() != rhs.is_bool() && !lhs.is_stringy() {
            let mixed_ok = matches!(
                op,
                BinaryOp::Eq
                    | BinaryOp::Ne
                    | BinaryOp::Lt
                    | BinaryOp::Le
                    | BinaryOp::Gt
                    | BinaryOp::Ge
                    | BinaryOp::BitAnd
                    | BinaryOp::BitOr
                    | BinaryOp::BitXor
                    | BinaryOp::And
                    | BinaryOp::Or
            );
            if !mixed_ok {
                return Err(ExprError::TypeMismatch {
                    lhs: lhs.to_string(),
                    op: op.as_ref().to_string(),
                    rhs: rhs.to_string(),
                });
            }
        }

        if let (Some(l), Some(r)) = (lhs.string_key(), rhs.string_key()) {
            if lhs.is_unicode() != rhs.is_unicode() {
                return Err(ExprError::StringCompareMismatch {
                    lhs: l,
                    op: op.as_ref().to_string(),
                    rhs: r,
                });
            }
            return Ok(Value::Bool(match op {
                BinaryOp::Eq => l == r,
                BinaryOp::Ne => l != r,
                BinaryOp::Lt => l < r,
                BinaryOp::Le => l <= r,
                BinaryOp::Gt => l > r,
                BinaryOp::Ge => l >= r,
                BinaryOp::In => r.split_whitespace().any(|item| item == l),
                _ => !r.split_whitespace().any(|item| item == l),
            }));
        }

        arithmetic(op, lhs, rhs)
    }
}

/// Number, boolean or array/string operand after the typing checks passed.
fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> ExprResult<Value> {
    if let (Value::Bool(a), Value::Bool(b)) = (&lhs, &rhs) {
        match op {
            BinaryOp::BitAnd => return Ok(Value::Bool(a & b)),
            BinaryOp::BitOr => return Ok(Value::Bool(a | b)),
            BinaryOp::BitXor => return Ok(Value::Bool(a ^ b)),
            _ => {}
        }
    }

    let (Some(a), Some(b)) = (lhs.as_int(), rhs.as_int()) else {
        return Err(ExprError::TypeMismatch {
            lhs: lhs.to_string(),
            op: op.as_ref().to_string(),
            rhs: rhs.to_string(),
        });
    };

    Ok(match op {
        BinaryOp::Or => Value::Bool(lhs.is_truthy() || rhs.is_truthy()),
        BinaryOp::And => Value::Bool(lhs.is_truthy() && rhs.is_truthy()),
        BinaryOp::Eq => Value::Bool(a == b),
        BinaryOp::Ne => Value::Bool(a != b),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::Le => Value::Bool(a <= b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::Ge => Value::Bool(a >= b),
        BinaryOp::BitAnd => Value::Int(a & b),
        BinaryOp::BitOr => Value::Int(a | b),
        BinaryOp::BitXor => Value::Int(a ^ b),
        BinaryOp::Add => Value::Int(a + b),
        BinaryOp::Sub => Value::Int(a - b),
        BinaryOp::Mul => Value::Int(a * b),
        BinaryOp::Div | BinaryOp::Mod => {
            if b.is_zero() {
                return Err(ExprError::DivisionByZero {
                    lhs: a.to_string(),
                    op: op.as_ref().to_string(),
                });
            }
            if op == BinaryOp::Div {
                Value::Int(a.div_floor(&b))
            } else {
                Value::Int(a.mod_floor(&b))
            }
        }
        BinaryOp::Shl | BinaryOp::Shr => {
            let count = b
                .to_u32()
                .filter(|count| *count <= MAX_SHIFT)
                .ok_or_else(|| ExprError::InvalidShift {
                    count: b.to_string(),
                    max: MAX_SHIFT,
                })?;
            if op == BinaryOp::Shl {
                Value::Int(a << count)
            } else {
                Value::Int(a >> count)
            }
        }
        BinaryOp::In | BinaryOp::NotIn => {
            return Err(ExprError::TypeMismatch {
                lhs: lhs.to_string(),
                op: op.as_ref().to_string(),
                rhs: rhs.to_string(),
            });
        }
    })
}

fn unary(op: UnaryOp, value: Value) -> ExprResult<Value> {
    if value.is_stringy() {
        return Err(ExprError::StringOperatorMisuse {
            op: op.as_ref().to_string(),
        });
    }
    Ok(match op {
        UnaryOp::Not => Value::Bool(!value.is_truthy()),
        UnaryOp::BitNot => Value::Int(-value.as_int().unwrap_or_default() - 1),
        UnaryOp::Neg => Value::Int(-value.as_int().unwrap_or_default()),
    })
}

fn cast(width: CastWidth, value: Value) -> ExprResult<Value> {
    let Some(n) = value.as_int() else {
        return Err(ExprError::DatumTypeMismatch {
            value: value.to_string(),
            ty: width.name().to_string(),
        });
    };
    let max = (BigInt::from(1u8) << width.bits()) - 1;
    if n.is_negative() || n > max {
        return Err(ExprError::ValueOutOfRange {
            value: n.to_string(),
            ty: width.name().to_string(),
        });
    }
    Ok(Value::Int(n))
}

/// Numbers and booleans on either side of `IN` are compared as packed strings.
fn stringify(value: Value) -> Value {
    if value.is_stringy() {
        value
    } else {
        value.int_to_str()
    }
}

/// `Namespace.Name` (optionally with further `.Field` parts) names a PCD.
fn is_pcd_reference(name: &str) -> bool {
    let mut parts = name.split('.');
    let head_ok = parts
        .next()
        .is_some_and(|head| !head.is_empty() && head.chars().all(is_word_char));
    let mut tail_count = 0;
    let tail_ok = parts.all(|part| {
        tail_count += 1;
        part.chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && part.chars().all(is_word_char)
    });
    head_ok && tail_ok && tail_count > 0
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Boolean reading of a final value. `L""` is false even though it is a
/// non-empty literal.
fn condition_of(value: &Value) -> bool {
    match value {
        Value::Str(StrLit {
            kind: StrKind::Wide,
            text,
        }) => !text.is_empty(),
        other => other.is_truthy(),
    }
}

fn is_plain_number(text: &str) -> bool {
    let body = text.strip_prefix(['-', '+']).unwrap_or(text);
    match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(hex) => !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()),
    }
}

fn is_complete_quoted(text: &str) -> bool {
    let body = text.strip_prefix('L').unwrap_or(text);
    let Some(quote) = body.chars().next().filter(|c| matches!(c, '"' | '\'')) else {
        return false;
    };
    let mut count = 0;
    let mut escaped = false;
    for ch in body.chars() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            count += 1;
        }
    }
    count == 2 && body.ends_with(quote)
}

/// Text that already is its own literal value.
fn is_verbatim_literal(text: &str) -> bool {
    if is_plain_number(text) || is_complete_quoted(text) {
        return true;
    }
    matches!(tokenize(text).as_deref(), Ok([(Token::Array(_), _)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(expr: &str) -> String {
        match evaluate(expr, &SymbolTable::new(), EvalMode::Literal)
            .expect("expression evaluates")
            .value
        {
            Evaluated::Literal(text) => text,
            other => panic!("expected a literal, got {other:?}"),
        }
    }

    fn condition(expr: &str) -> bool {
        match evaluate(expr, &SymbolTable::new(), EvalMode::Condition)
            .expect("expression evaluates")
            .value
        {
            Evaluated::Bool(b) => b,
            other => panic!("expected a boolean, got {other:?}"),
        }
    }

    #[test]
    fn pcd_reference_shape() {
        assert!(is_pcd_reference("gSpace.PcdFoo"));
        assert!(is_pcd_reference("gSpace.PcdFoo.Field"));
        assert!(is_pcd_reference("0.Field"));
        assert!(!is_pcd_reference("1.5"));
        assert!(!is_pcd_reference("Plain"));
        assert!(!is_pcd_reference("a..b"));
    }

    #[test]
    fn arithmetic_and_rendering() {
        assert_eq!(literal("0x10 + 1"), "17");
        assert_eq!(literal("(1 << 4) | 3"), "19");
        assert_eq!(literal("7 % -2"), "-1");
        assert_eq!(literal("~0"), "-1");
        assert_eq!(literal("1 == 1"), "True");
        assert_eq!(literal("-7 / 2 * 3"), "-12");
    }

    #[test]
    fn verbatim_literals() {
        assert_eq!(literal("0x00FF"), "0x00FF");
        assert_eq!(literal("L\"wide\""), "L\"wide\"");
        assert_eq!(literal("{ 0x01, 0x02 }"), "{ 0x01, 0x02 }");
        assert_eq!(literal("{0x01} == {0x01}"), "True");
    }

    #[test]
    fn condition_of_strings() {
        assert!(!condition("\"\""));
        assert!(!condition("L\"\""));
        assert!(condition("\"x\""));
        assert!(condition("'x'"));
    }

    #[test]
    fn mixed_bool_and_number() {
        assert!(condition("TRUE == 1"));
        assert!(condition("TRUE & 1"));
        let err = evaluate("TRUE * 2", &SymbolTable::new(), EvalMode::Literal).unwrap_err();
        assert!(err.is_type_mismatch());
    }

    #[test]
    fn bool_arithmetic_warns_but_succeeds() {
        let result = evaluate("TRUE + 1", &SymbolTable::new(), EvalMode::Literal).unwrap();
        assert_eq!(result.value, Evaluated::Literal("2".into()));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].kind.is_bool_in_arithmetic());
    }

    #[test]
    fn string_typing_rules() {
        let symbols = SymbolTable::new();
        let err = evaluate("\"a\" + 1", &symbols, EvalMode::Literal).unwrap_err();
        assert!(err.is_string_operator_misuse());
        let err = evaluate("\"a\" < 1", &symbols, EvalMode::Literal).unwrap_err();
        assert!(err.is_relational_string_mismatch());
        let err = evaluate("L\"a\" == \"a\"", &symbols, EvalMode::Literal).unwrap_err();
        assert!(err.is_string_compare_mismatch());
        assert!(condition("\"abc\" < \"abd\""));
    }

    #[test]
    fn membership_splits_on_whitespace() {
        assert!(condition("\"X64\" in \"IA32 X64\""));
        assert!(condition("\"ARM\" not in \"IA32 X64\""));
        assert!(condition("IA32 in \"IA32 X64\""));
    }

    #[test]
    fn division_errors() {
        let symbols = SymbolTable::new();
        assert!(
            evaluate("1 / 0", &symbols, EvalMode::Literal)
                .unwrap_err()
                .is_division_by_zero()
        );
        assert!(
            evaluate("1 << -1", &symbols, EvalMode::Literal)
                .unwrap_err()
                .is_invalid_shift()
        );
    }

    #[test]
    fn casts_are_range_checked() {
        assert_eq!(literal("UINT8(0xFF)"), "255");
        let err = evaluate("UINT8(0x100)", &SymbolTable::new(), EvalMode::Literal).unwrap_err();
        assert!(err.is_value_out_of_range());
    }

    #[test]
    fn deeply_nested_parentheses_are_rejected() {
        let deep = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let err = evaluate(&deep, &SymbolTable::new(), EvalMode::Literal).unwrap_err();
        assert!(err.is_nesting_too_deep());

        assert_eq!(literal(&format!("{}7{}", "(".repeat(16), ")".repeat(16))), "7");
    }

    #[test]
    fn long_operator_chains_evaluate_without_recursion() {
        let sum = vec!["1"; 10_000].join(" + ");
        assert_eq!(literal(&sum), "10000");
    }

    #[test]
    fn empty_expression() {
        let err = evaluate("   ", &SymbolTable::new(), EvalMode::Condition).unwrap_err();
        assert_eq!(err, ExprError::EmptyExpression);
    }
}
