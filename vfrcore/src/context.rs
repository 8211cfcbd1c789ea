//! State of one compilation, threaded through every build step.
//!
//! The front end drives a [`CompilationContext`] with "insert record" and
//! "close scope" actions in document order. Scopes are tracked on a stack,
//! question names are mapped to ids as they are declared, and references
//! to questions that are not declared yet are recorded and back-patched the
//! moment the question shows up.

use ifrinstr::{
    Diagnostic, FormPackage, IfrOp, IfrRecord, NodeId, OpCode, QuestionField,
    SerializedPackage, tree::join_condition,
};
use log::{debug, info};
use pcdexpr::{EvalMode, Evaluated, PcdDatumType, SymbolTable, evaluate, evaluate_typed};

use crate::{
    question::QuestionDb,
    utils::error::{VfrError, VfrResult},
};

const UNDEFINED_QUESTION: &str = "question is referenced but never defined:";

#[derive(Debug, Clone, Copy)]
struct OpenScope {
    node: NodeId,
    opcode: OpCode,
    line: u32,
}

#[derive(Debug, Default)]
pub struct CompilationContext {
    package: FormPackage,
    questions: QuestionDb,
    symbols: SymbolTable,
    scopes: Vec<OpenScope>,
    diagnostics: Vec<Diagnostic>,
}

impl CompilationContext {
    pub fn new(symbols: SymbolTable) -> Self {
        CompilationContext {
            symbols,
            ..Default::default()
        }
    }

    pub fn package(&self) -> &FormPackage {
        &self.package
    }

    pub fn questions(&self) -> &QuestionDb {
        &self.questions
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Non-fatal messages collected so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Innermost open scope.
    pub fn current_scope(&self) -> Option<NodeId> {
        self.scopes.last().map(|scope| scope.node)
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn push_node(&mut self, record: IfrOp, line: u32, condition: Option<String>) -> VfrResult<NodeId> {
        let opcode = record.opcode();
        let node = self
            .package
            .insert(self.current_scope(), record, line, condition)?;
        if opcode.info().scope {
            self.scopes.push(OpenScope { node, opcode, line });
        }
        Ok(node)
    }

    /// Appends a record to the innermost open scope.
    ///
    /// Opcodes that always open a scope (forms, questions, conditionals)
    /// become the new innermost scope. An `End` record closes the innermost
    /// scope instead, see [`CompilationContext::close_scope`].
    pub fn insert(&mut self, record: impl Into<IfrOp>, line: u32) -> VfrResult<NodeId> {
        let record = record.into();
        if record.opcode() == OpCode::End {
            return self.close_scope(line);
        }
        self.push_node(record, line, None)
    }

    /// Appends `record` and makes it the innermost scope, even when its
    /// opcode does not open one by itself (e.g. a default nested under a
    /// `DEFAULT` with a `VALUE` expression).
    pub fn open_scope(&mut self, record: impl Into<IfrOp>, line: u32) -> VfrResult<NodeId> {
        let record = record.into();
        let opcode = record.opcode();
        let node = self.push_node(record, line, None)?;
        if !opcode.info().scope {
            self.scopes.push(OpenScope { node, opcode, line });
        }
        Ok(node)
    }

    /// Opens a conditional scope guarded by `guard`. Records nested inside
    /// carry the guard joined to the conditions of the enclosing scopes.
    pub fn insert_conditional(
        &mut self,
        record: impl Into<IfrOp>,
        guard: &str,
        line: u32,
    ) -> VfrResult<NodeId> {
        let record = record.into();
        let opcode = record.opcode();
        if !opcode.is_condition() {
            return Err(VfrError::NotAConditional { opcode, line });
        }
        let inherited = match self.current_scope() {
            Some(scope) => self.package.tree().node(scope)?.condition(),
            None => None,
        };
        let condition = join_condition(inherited, guard);
        self.push_node(record, line, Some(condition))
    }

    /// Terminates the innermost scope with an `End` record.
    pub fn close_scope(&mut self, line: u32) -> VfrResult<NodeId> {
        let Some(scope) = self.scopes.pop() else {
            return Err(VfrError::NoOpenScope { line });
        };
        let end = self.package.insert(Some(scope.node), IfrOp::end(), line, None)?;
        debug!(
            "closed {} opened at line {} with end at line {line}",
            scope.opcode.ifr_name(),
            scope.line
        );
        Ok(end)
    }

    /// Declares a question record under `name` (or anonymously).
    ///
    /// A question id of 0 in the record header is replaced by the first free
    /// id. Every pending reference to `name` is patched with the final id.
    /// The name and id are only recorded once the node is in the tree.
    pub fn declare_question(
        &mut self,
        name: Option<&str>,
        record: impl Into<IfrOp>,
        line: u32,
    ) -> VfrResult<(NodeId, u16)> {
        let mut record = record.into();
        let opcode = record.opcode();
        let Some(question) = record.question_mut() else {
            return Err(VfrError::NotAQuestion { opcode, line });
        };
        let id = self.questions.next_id(name, question.question_id)?;
        question.question_id = id;

        let node = self.push_node(record, line, None)?;
        self.questions.declare(name, id)?;
        if let Some(name) = name {
            self.package.resolve_pending(name, id)?;
        }
        Ok((node, id))
    }

    /// Inserts a record whose `field` refers to the question `name`.
    ///
    /// Known questions are written directly; unknown ones are patched when
    /// declared, or reported by [`CompilationContext::finish`].
    pub fn reference_question(
        &mut self,
        name: &str,
        record: impl Into<IfrOp>,
        field: QuestionField,
        line: u32,
    ) -> VfrResult<NodeId> {
        let mut record = record.into();
        match self.questions.lookup(name) {
            Some(id) => {
                record.patch_reference(field, id)?;
                self.insert(record, line)
            }
            None => {
                // fails early when the record has no such field
                record.patch_reference(field, 0)?;
                let node = self.insert(record, line)?;
                self.package
                    .register_pending(name, node, field, line, UNDEFINED_QUESTION);
                Ok(node)
            }
        }
    }

    fn collect_warnings(&mut self, warnings: Vec<pcdexpr::Warning>, line: u32) {
        for warning in warnings {
            let diagnostic = Diagnostic::warning(Some(line), warning.to_string());
            diagnostic.emit();
            self.diagnostics.push(diagnostic);
        }
    }

    /// Evaluates a value expression against the symbol table of this
    /// compilation. Warnings are kept as diagnostics of `line`.
    pub fn resolve_value(&mut self, expr: &str, mode: EvalMode, line: u32) -> VfrResult<Evaluated> {
        let evaluation = evaluate(expr, &self.symbols, mode)?;
        self.collect_warnings(evaluation.warnings, line);
        Ok(evaluation.value)
    }

    /// Like [`CompilationContext::resolve_value`], converted to the storage
    /// form of `datum`.
    pub fn resolve_typed(&mut self, expr: &str, datum: PcdDatumType, line: u32) -> VfrResult<String> {
        let evaluation = evaluate_typed(expr, datum, &self.symbols)?;
        self.collect_warnings(evaluation.warnings, line);
        match evaluation.value {
            Evaluated::Literal(text) => Ok(text),
            Evaluated::Bool(value) => Ok(if value { "TRUE" } else { "FALSE" }.to_string()),
        }
    }

    /// Ends the compilation: checks that every scope is closed and every
    /// reference resolved, computes the offsets and encodes the records.
    ///
    /// The context is left empty and ready for another compilation, also
    /// when this fails.
    pub fn finish(&mut self) -> VfrResult<CompiledPackage> {
        let mut package = std::mem::take(&mut self.package);
        let scopes = std::mem::take(&mut self.scopes);
        let mut diagnostics = std::mem::take(&mut self.diagnostics);
        self.questions.clear();

        if let Some(scope) = scopes.first() {
            return Err(VfrError::UnclosedScope {
                opcode: scope.opcode,
                line: scope.line,
            });
        }

        let unresolved = package.pending().report_unresolved();
        if !unresolved.is_empty() {
            for diagnostic in &unresolved {
                diagnostic.emit();
            }
            return Err(VfrError::UnresolvedReferences(unresolved));
        }

        package.build_pkg()?;
        package.serialize()?;
        info!(
            "compilation finished: {} bytes, {} diagnostics",
            package.pkg_length(),
            diagnostics.len()
        );
        diagnostics.shrink_to_fit();
        Ok(CompiledPackage {
            package,
            diagnostics,
        })
    }

    /// Drops everything built so far.
    pub fn clear(&mut self) {
        self.package.clear();
        self.questions.clear();
        self.scopes.clear();
        self.diagnostics.clear();
    }
}

/// A finished form package with the diagnostics raised while building it.
#[derive(Debug)]
pub struct CompiledPackage {
    package: FormPackage,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledPackage {
    pub fn package(&self) -> &FormPackage {
        &self.package
    }

    pub fn pkg_length(&self) -> u32 {
        self.package.pkg_length()
    }

    pub fn serialized(&mut self) -> VfrResult<SerializedPackage<'_>> {
        Ok(self.package.serialize()?)
    }
}

#[cfg(test)]
mod tests {
    use ifrinstr::records::{
        QuestionHeader, StatementHeader,
        expression::{EqIdId, EqIdVal},
        question::CheckBox,
        statement::{Form, Text},
    };
    use pcdexpr::EvalMode;

    use super::*;

    fn checkbox(question_id: u16) -> CheckBox {
        CheckBox::new(QuestionHeader::new(StatementHeader::new(1, 2), question_id))
    }

    fn eq(value: u16) -> EqIdVal {
        EqIdVal {
            question_id: 0,
            value,
        }
    }

    #[test]
    fn end_closes_the_innermost_scope() {
        let mut ctx = CompilationContext::default();
        let form = ctx.insert(Form::new(1, 2), 1).unwrap();
        assert_eq!(ctx.current_scope(), Some(form));
        ctx.insert(Text::new(StatementHeader::new(3, 4), 5), 2).unwrap();
        assert_eq!(ctx.depth(), 1, "text does not open a scope");
        ctx.insert(IfrOp::end(), 3).unwrap();
        assert_eq!(ctx.depth(), 0);
        assert!(ctx.close_scope(4).unwrap_err().is_no_open_scope());
    }

    #[test]
    fn forward_references_are_patched_on_declaration() {
        let mut ctx = CompilationContext::default();
        ctx.insert(Form::new(1, 2), 1).unwrap();
        let guard = ctx
            .insert_conditional(
                ifrinstr::records::Bare::new(OpCode::SuppressIf).unwrap(),
                "Later == 1",
                2,
            )
            .unwrap();
        let early = ctx
            .reference_question("Later", eq(1), QuestionField::QuestionId, 2)
            .unwrap();
        ctx.insert(Text::new(StatementHeader::new(3, 4), 5), 3).unwrap();
        ctx.close_scope(4).unwrap();
        assert_eq!(ctx.package().pending().unresolved_count(), 1);

        let (_, id) = ctx.declare_question(Some("Later"), checkbox(0), 5).unwrap();
        ctx.close_scope(6).unwrap();
        assert_eq!(id, 1);
        assert_eq!(ctx.package().pending().unresolved_count(), 0);

        let late = ctx
            .reference_question("Later", eq(2), QuestionField::QuestionId, 7)
            .unwrap();
        ctx.close_scope(8).unwrap();

        let tree = ctx.package().tree();
        assert_eq!(tree.node(guard).unwrap().condition(), Some("Later == 1"));
        for node in [early, late] {
            match tree.node(node).unwrap().record() {
                IfrOp::EqIdVal(eq) => assert_eq!(eq.question_id, 1),
                other => panic!("unexpected record {other:?}"),
            }
        }
        ctx.finish().expect("complete form");
    }

    #[test]
    fn unresolved_references_fail_with_every_line() {
        let mut ctx = CompilationContext::default();
        ctx.insert(Form::new(1, 2), 1).unwrap();
        ctx.reference_question(
            "Ghost",
            EqIdId {
                question_id1: 0,
                question_id2: 0,
            },
            QuestionField::QuestionId1,
            2,
        )
        .unwrap();
        ctx.reference_question("Ghost", eq(0), QuestionField::QuestionId, 3)
            .unwrap();
        ctx.close_scope(4).unwrap();

        match ctx.finish() {
            Err(VfrError::UnresolvedReferences(diagnostics)) => {
                let lines: Vec<Option<u32>> = diagnostics.iter().map(|d| d.line).collect();
                assert_eq!(lines, [Some(2), Some(3)]);
                assert!(diagnostics[0].message.contains("Ghost"));
            }
            other => panic!("expected unresolved references, got {other:?}"),
        }
        assert_eq!(ctx.depth(), 0);
        assert!(ctx.package().tree().is_empty(), "context reset after failure");
    }

    #[test]
    fn unclosed_scope_names_its_opener() {
        let mut ctx = CompilationContext::default();
        ctx.insert(Form::new(1, 2), 7).unwrap();
        ctx.declare_question(Some("Q"), checkbox(0), 8).unwrap();
        ctx.close_scope(9).unwrap();

        match ctx.finish() {
            Err(VfrError::UnclosedScope { opcode, line }) => {
                assert_eq!(opcode, OpCode::Form);
                assert_eq!(line, 7);
            }
            other => panic!("expected an unclosed scope, got {other:?}"),
        }
    }

    #[test]
    fn nested_conditions_join() {
        let mut ctx = CompilationContext::default();
        let suppress = ifrinstr::records::Bare::new(OpCode::SuppressIf).unwrap();
        let gray = ifrinstr::records::Bare::new(OpCode::GrayOutIf).unwrap();
        ctx.insert_conditional(suppress, "A", 1).unwrap();
        let inner = ctx.insert_conditional(gray, "B", 2).unwrap();
        let text = ctx.insert(Text::new(StatementHeader::new(1, 2), 3), 3).unwrap();

        let tree = ctx.package().tree();
        assert_eq!(tree.node(inner).unwrap().condition(), Some("A | B"));
        assert_eq!(tree.node(text).unwrap().condition(), Some("A | B"));

        let not_conditional = ctx.insert_conditional(Form::new(1, 2), "C", 4);
        assert!(not_conditional.unwrap_err().is_not_a_conditional());
    }

    #[test]
    fn expression_warnings_become_diagnostics() {
        let mut symbols = SymbolTable::new();
        symbols.insert("gSpace.PcdFlag".into(), "TRUE".into());
        let mut ctx = CompilationContext::new(symbols);

        let value = ctx
            .resolve_value("gSpace.PcdFlag + 1", EvalMode::Literal, 12)
            .unwrap();
        assert_eq!(value, Evaluated::Literal("2".into()));
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(ctx.diagnostics()[0].line, Some(12));
        assert!(ctx.diagnostics()[0].severity.is_warning());

        let typed = ctx
            .resolve_typed("0x12 + 1", PcdDatumType::Uint8, 13)
            .unwrap();
        assert_eq!(typed, "0x13");
        assert!(ctx.resolve_value("1 +", EvalMode::Literal, 14).unwrap_err().is_expr());
    }

    #[test]
    fn open_scope_nests_records_that_already_scope() {
        let mut ctx = CompilationContext::default();
        let form = ctx.open_scope(Form::new(1, 2), 1).unwrap();
        assert_eq!(ctx.depth(), 1);
        assert_eq!(ctx.current_scope(), Some(form));

        let text = ctx.insert(Text::new(StatementHeader::new(3, 4), 5), 2).unwrap();
        assert_eq!(ctx.package().tree().node(text).unwrap().parent(), Some(form));

        let suppress = ifrinstr::records::Bare::new(OpCode::SuppressIf).unwrap();
        ctx.open_scope(suppress, 3).unwrap();
        assert_eq!(ctx.depth(), 2);
        ctx.close_scope(4).unwrap();
        ctx.close_scope(5).unwrap();
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn open_scope_opens_records_without_a_scope() {
        let mut ctx = CompilationContext::default();
        ctx.insert(Form::new(1, 2), 1).unwrap();
        let text = ctx
            .open_scope(Text::new(StatementHeader::new(3, 4), 5), 2)
            .unwrap();
        assert_eq!(ctx.depth(), 2);
        assert_eq!(ctx.current_scope(), Some(text));
    }

    #[test]
    fn rejected_declarations_leave_no_trace() {
        let mut ctx = CompilationContext::default();
        ctx.insert(Form::new(1, 2), 1).unwrap();
        ctx.declare_question(Some("A"), checkbox(3), 2).unwrap();
        ctx.close_scope(3).unwrap();
        let nodes = ctx.package().tree().len();

        let err = ctx.declare_question(Some("B"), checkbox(3), 4).unwrap_err();
        assert!(err.is_duplicate_question_id());
        assert_eq!(ctx.package().tree().len(), nodes);
        assert_eq!(ctx.questions().lookup("B"), None);
        assert_eq!(ctx.questions().len(), 1);
        assert_eq!(ctx.depth(), 1);

        let (_, id) = ctx.declare_question(Some("B"), checkbox(0), 5).unwrap();
        assert_eq!(id, 1);
        assert_eq!(ctx.questions().lookup("B"), Some(1));
    }

    #[test]
    fn questions_need_a_question_header() {
        let mut ctx = CompilationContext::default();
        let err = ctx.declare_question(Some("Q"), Form::new(1, 2), 1).unwrap_err();
        assert!(err.is_not_a_question());
        assert!(ctx.questions().is_empty());
    }
}
