use log::debug;

use crate::{
    diagnostic::Diagnostic,
    records::{IfrRecord, QuestionField},
    tree::{FormTree, NodeId},
    utils::IfrResult,
};

/// Forward reference waiting for the id of a named question.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingAssignment {
    pub name: String,
    pub node: NodeId,
    pub field: QuestionField,
    pub line: u32,
    pub message: String,
    resolved: bool,
}

impl PendingAssignment {
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }
}

/// Forward references recorded while the tree is built.
#[derive(Debug, Clone, Default)]
pub struct PendingAssignList {
    entries: Vec<PendingAssignment>,
}

impl PendingAssignList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        node: NodeId,
        field: QuestionField,
        line: u32,
        message: impl Into<String>,
    ) {
        self.entries.push(PendingAssignment {
            name: name.into(),
            node,
            field,
            line,
            message: message.into(),
            resolved: false,
        });
    }

    /// Writes `value` into every pending entry registered for `name` and
    /// returns how many were patched.
    pub fn resolve(&mut self, name: &str, value: u16, tree: &mut FormTree) -> IfrResult<usize> {
        let mut patched = 0;
        for entry in self
            .entries
            .iter_mut()
            .filter(|entry| !entry.resolved && entry.name == name)
        {
            tree.record_mut(entry.node)?
                .patch_reference(entry.field, value)?;
            entry.resolved = true;
            patched += 1;
        }
        if patched > 0 {
            debug!("resolved {patched} references to `{name}` as {value}");
        }
        Ok(patched)
    }

    pub fn has_unresolved(&self) -> bool {
        self.entries.iter().any(|entry| !entry.resolved)
    }

    pub fn unresolved_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.resolved).count()
    }

    /// One diagnostic per unresolved registration, attributed to the line
    /// of the reference.
    pub fn report_unresolved(&self) -> Vec<Diagnostic> {
        self.entries
            .iter()
            .filter(|entry| !entry.resolved)
            .map(|entry| {
                Diagnostic::error(
                    Some(entry.line),
                    format!("{} `{}`", entry.message, entry.name),
                )
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingAssignment> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{IfrOp, expression::EqIdVal};

    fn eq_node(tree: &mut FormTree, line: u32) -> NodeId {
        tree.insert(
            None,
            EqIdVal {
                question_id: 0,
                value: 1,
            },
            line,
            None,
        )
        .expect("insert")
    }

    fn question_id(tree: &FormTree, node: NodeId) -> u16 {
        match tree.node(node).expect("node").record() {
            IfrOp::EqIdVal(eq) => eq.question_id,
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn resolves_every_matching_entry() {
        let mut tree = FormTree::new();
        let first = eq_node(&mut tree, 10);
        let second = eq_node(&mut tree, 20);

        let mut pending = PendingAssignList::new();
        pending.register("Q", first, QuestionField::QuestionId, 10, "undefined question");
        pending.register("Q", second, QuestionField::QuestionId, 20, "undefined question");
        assert!(pending.has_unresolved());

        let patched = pending.resolve("Q", 7, &mut tree).expect("patch");
        assert_eq!(patched, 2);
        assert!(!pending.has_unresolved());
        assert_eq!(question_id(&tree, first), 7);
        assert_eq!(question_id(&tree, second), 7);
    }

    #[test]
    fn unresolved_names_report_each_reference() {
        let mut tree = FormTree::new();
        let first = eq_node(&mut tree, 11);
        let second = eq_node(&mut tree, 12);

        let mut pending = PendingAssignList::new();
        pending.register("Missing", first, QuestionField::QuestionId, 11, "undefined question");
        pending.register("Missing", second, QuestionField::QuestionId, 12, "undefined question");
        assert_eq!(pending.resolve("Other", 1, &mut tree).expect("no match"), 0);

        let diagnostics = pending.report_unresolved();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].line, Some(11));
        assert_eq!(diagnostics[1].line, Some(12));
        assert!(diagnostics[0].message.contains("Missing"));
    }
}
