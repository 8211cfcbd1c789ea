use num_bigint::BigInt;
use num_traits::Signed;
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::{
    SymbolTable,
    error::{ExprError, ExprResult},
    eval::{Evaluated, Evaluation, Evaluator},
    value::{StrKind, StrLit, Value},
};

/// Storage type of a PCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PcdDatumType {
    #[strum(serialize = "BOOLEAN")]
    Boolean,
    #[strum(serialize = "UINT8")]
    Uint8,
    #[strum(serialize = "UINT16")]
    Uint16,
    #[strum(serialize = "UINT32")]
    Uint32,
    #[strum(serialize = "UINT64")]
    Uint64,
    #[strum(serialize = "VOID*")]
    Void,
}

impl PcdDatumType {
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Largest value a numeric datum type can hold.
    pub fn max_value(self) -> Option<BigInt> {
        let bits = match self {
            PcdDatumType::Boolean => return Some(BigInt::from(1u8)),
            PcdDatumType::Uint8 => 8u32,
            PcdDatumType::Uint16 => 16,
            PcdDatumType::Uint32 => 32,
            PcdDatumType::Uint64 => 64,
            PcdDatumType::Void => return None,
        };
        Some((BigInt::from(1u8) << bits) - 1)
    }
}

/// Evaluates `expr` and converts the result to the storage form of `datum`.
///
/// - `BOOLEAN` yields `TRUE` or `FALSE`.
/// - `UINT8`..`UINT64` yield an upper-case hex literal. Byte arrays and
///   character literals are packed little-endian first.
/// - `VOID*` yields a `{0xNN,...}` byte list. `"..."` gets a NUL terminator,
///   `L"..."` is encoded UTF-16LE with a two-byte terminator, `'...'` and
///   `L'...'` are not terminated.
pub fn evaluate_typed(
    expr: &str,
    datum: PcdDatumType,
    symbols: &SymbolTable,
) -> ExprResult<Evaluation> {
    let mut evaluator = Evaluator::new(symbols);
    let value = evaluator.value(expr)?;

    let text = match datum {
        PcdDatumType::Void => void_bytes(&value)?,
        numeric => {
            let n = numeric_value(&value, numeric)?;
            let max = numeric.max_value().unwrap_or_default();
            if n.is_negative() || n > max {
                return Err(ExprError::ValueOutOfRange {
                    value: n.to_string(),
                    ty: numeric.name().to_string(),
                });
            }
            if numeric == PcdDatumType::Boolean {
                let word = if n == BigInt::from(1u8) { "TRUE" } else { "FALSE" };
                word.to_string()
            } else {
                format!("0x{n:X}")
            }
        }
    };

    Ok(Evaluation {
        value: Evaluated::Literal(text),
        warnings: evaluator.warnings,
    })
}

fn mismatch(value: &Value, datum: PcdDatumType) -> ExprError {
    ExprError::DatumTypeMismatch {
        value: value.to_string(),
        ty: datum.name().to_string(),
    }
}

fn numeric_value(value: &Value, datum: PcdDatumType) -> ExprResult<BigInt> {
    let bytes = match value {
        Value::Int(_) | Value::Bool(_) => {
            return value.as_int().ok_or_else(|| mismatch(value, datum));
        }
        Value::Array(text) => array_bytes(text).ok_or_else(|| mismatch(value, datum))?,
        Value::Str(lit) if matches!(lit.kind, StrKind::NarrowChar | StrKind::WideChar) => {
            string_bytes(lit)
        }
        Value::Str(_) => return Err(mismatch(value, datum)),
    };
    Ok(BigInt::from_bytes_le(num_bigint::Sign::Plus, &bytes))
}

fn void_bytes(value: &Value) -> ExprResult<String> {
    match value {
        Value::Array(text) => Ok(text.clone()),
        Value::Str(lit) => {
            let bytes = string_bytes(lit);
            let list: Vec<String> = bytes.iter().map(|b| format!("0x{b:02X}")).collect();
            Ok(format!("{{{}}}", list.join(",")))
        }
        other => Err(mismatch(other, PcdDatumType::Void)),
    }
}

/// Bytes of a flat `{0x..,0x..}` list, `None` for nested structures.
fn array_bytes(canonical: &str) -> Option<Vec<u8>> {
    let inner = canonical.strip_prefix('{')?.strip_suffix('}')?;
    if inner.contains('{') {
        return None;
    }
    inner
        .split(',')
        .map(|element| {
            let digits = element.strip_prefix("0x")?;
            u8::from_str_radix(digits, 16).ok()
        })
        .collect()
}

fn string_bytes(lit: &StrLit) -> Vec<u8> {
    let chars = lit.chars();
    let mut bytes = Vec::new();
    match lit.kind {
        StrKind::Narrow | StrKind::NarrowChar => {
            bytes.extend(String::from_iter(&chars).into_bytes());
        }
        StrKind::Wide | StrKind::WideChar => {
            let text = String::from_iter(&chars);
            for unit in text.encode_utf16() {
                bytes.extend_from_slice(&unit.to_le_bytes());
            }
        }
    }
    match lit.kind {
        StrKind::Narrow => bytes.push(0),
        StrKind::Wide => bytes.extend_from_slice(&[0, 0]),
        StrKind::NarrowChar | StrKind::WideChar => {}
    }
    bytes
}
