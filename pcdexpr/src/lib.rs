//! Pcdexpr: build-time evaluator for macro and PCD value expressions.
//!
//! An expression is a C-like formula over integers, booleans, narrow and wide
//! strings, byte arrays and GUIDs. It is first macro-expanded against a
//! caller-supplied symbol table, then parsed into a small AST and finally
//! evaluated. Evaluation is a pure function of `(expression, symbols, mode)`.
//!
//! Two output modes exist:
//!  - [`EvalMode::Condition`] reduces the value to a boolean (`!if` style guards).
//!  - [`EvalMode::Literal`] renders the value back to its canonical text so it
//!    can be stored in a PCD database (`"abc"`, `L"abc"`, `{0x01,0x02}`, `42`).
//!
//! Fatal problems surface as [`ExprError`]; suspect-but-usable constructs ride
//! along the result as [`Warning`]s.
//!
//! ```
//! use pcdexpr::{EvalMode, Evaluated, SymbolTable, evaluate};
//!
//! let mut symbols = SymbolTable::new();
//! symbols.insert("gTokenSpace.PcdWidth".into(), "0x10".into());
//!
//! let result = evaluate("gTokenSpace.PcdWidth * 2 + 1", &symbols, EvalMode::Literal).unwrap();
//! assert_eq!(result.value, Evaluated::Literal("33".into()));
//! assert!(result.warnings.is_empty());
//! ```

use std::collections::BTreeMap;

/// Error and warning types produced during evaluation.
pub mod error;
/// Tree-walking evaluator over the parsed expression.
pub mod eval;
/// GUID registry/structure text conversions.
pub mod guid;
/// `$(NAME)` macro expansion.
pub mod macros;
/// Chumsky grammar producing [`parser::Expr`].
pub mod parser;
/// Chumsky lexer over macro-expanded text.
pub mod token;
/// Datum-type aware evaluation (`UINT8`..`UINT64`, `BOOLEAN`, `VOID*`).
pub mod typed;
/// Runtime values manipulated by the evaluator.
pub mod value;

pub use error::{ExprError, ExprResult, Warning, WarningKind};
pub use eval::{EvalMode, Evaluated, Evaluation, MAX_RECURSION_DEPTH, evaluate};
pub use typed::{PcdDatumType, evaluate_typed};
pub use value::{StrKind, StrLit, Value};

/// Names of macros whose value is always substituted as a quoted string, so
/// that they may be used on the left-hand side of an `IN` test.
pub const IN_OPERAND_MACROS: [&str; 4] = ["TARGET", "TOOL_CHAIN_TAG", "ARCH", "FAMILY"];

/// Mapping from macro or PCD name to its textual value.
///
/// A `BTreeMap` keeps iteration deterministic, which matters when tables are
/// dumped for diagnostics.
pub type SymbolTable = BTreeMap<String, String>;
