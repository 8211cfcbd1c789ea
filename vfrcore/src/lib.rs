//! Compilation driver of VFR forms: the per-compilation context the front
//! end feeds records into, the question registry, compile options, symbol
//! tables for the dumps and the writer of the output files.

pub mod compiler;
pub mod context;
pub mod question;
pub mod symbols;
pub mod utils;

pub use compiler::{EmitInputs, emit_outputs};
pub use context::{CompilationContext, CompiledPackage};
pub use question::QuestionDb;
pub use symbols::HeaderSymbols;
pub use utils::{
    conf::{Artifact, CompileOptions},
    error::{VfrError, VfrResult},
};
