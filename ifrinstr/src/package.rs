use log::{debug, info};

use crate::{
    opcode::OpCode,
    pending::PendingAssignList,
    records::{IfrOp, QuestionField},
    tree::{FormTree, NodeId, TreeNode},
    utils::{Error, IfrResult},
};

/// HII package type of form packages.
pub const FORM_PACKAGE_TYPE: u8 = 0x02;

/// `EFI_HII_PACKAGE_HEADER`: 24-bit length and 8-bit type in one `u32`.
pub const PACKAGE_HEADER_SIZE: usize = 4;

/// Whole-document aggregate of one compilation: the record tree, the
/// forward references still waiting for a question id and the package
/// length computed by [`FormPackage::build_pkg`].
#[derive(Debug, Clone, Default)]
pub struct FormPackage {
    tree: FormTree,
    pending: PendingAssignList,
    pkg_length: u32,
    offset: u32,
    offsets_computed: bool,
}

impl FormPackage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &FormTree {
        &self.tree
    }

    /// Mutable tree access. Lengths may change, so offsets must be rebuilt.
    pub fn tree_mut(&mut self) -> &mut FormTree {
        self.offsets_computed = false;
        &mut self.tree
    }

    pub fn pending(&self) -> &PendingAssignList {
        &self.pending
    }

    pub fn insert(
        &mut self,
        parent: Option<NodeId>,
        record: impl Into<IfrOp>,
        line: u32,
        condition: Option<String>,
    ) -> IfrResult<NodeId> {
        self.offsets_computed = false;
        self.tree.insert(parent, record, line, condition)
    }

    pub fn register_pending(
        &mut self,
        name: impl Into<String>,
        node: NodeId,
        field: QuestionField,
        line: u32,
        message: impl Into<String>,
    ) {
        self.pending.register(name, node, field, line, message);
    }

    /// Back-patches every reference to `name`. Only ids change, so the
    /// computed offsets stay valid.
    pub fn resolve_pending(&mut self, name: &str, value: u16) -> IfrResult<usize> {
        self.pending.resolve(name, value, &mut self.tree)
    }

    /// Payload length, without the package header.
    pub fn pkg_length(&self) -> u32 {
        self.pkg_length
    }

    /// Assigns every node its byte offset in one pre-order pass and
    /// accumulates the payload length, then checks the scope structure.
    ///
    /// A node's offset counts the bytes of every record before it in
    /// document order; containers only account for their own header.
    pub fn build_pkg(&mut self) -> IfrResult<u32> {
        self.pkg_length = 0;
        self.offset = 0;

        let order: Vec<(NodeId, OpCode, usize)> = self
            .tree
            .preorder()
            .map(|(id, node)| (id, node.opcode(), node.length()))
            .collect();
        for (id, opcode, length) in order {
            if opcode == OpCode::ShownDefaultStore {
                self.tree.set_offset(id, None)?;
                continue;
            }
            self.pkg_length += length as u32;
            self.tree.set_offset(id, Some(self.offset))?;
            self.offset += length as u32;
        }

        self.tree.verify_structure()?;
        self.offsets_computed = true;
        info!(
            "form package built: {} records, {} bytes",
            self.tree.len(),
            self.pkg_length
        );
        Ok(self.pkg_length)
    }

    /// The package header as stored on disk.
    pub fn package_header(&self) -> [u8; PACKAGE_HEADER_SIZE] {
        let length = (self.pkg_length + PACKAGE_HEADER_SIZE as u32) & 0x00FF_FFFF;
        (length | (FORM_PACKAGE_TYPE as u32) << 24).to_le_bytes()
    }

    /// Encodes the records whose bytes depend on resolved references and
    /// returns a read-only view for the emitters.
    ///
    /// Fails when offsets are stale or a reference is still pending.
    pub fn serialize(&mut self) -> IfrResult<SerializedPackage<'_>> {
        if !self.offsets_computed {
            return Err(Error::OffsetsNotComputed);
        }
        if self.pending.has_unresolved() {
            return Err(Error::UnresolvedBeforeSerialize {
                count: self.pending.unresolved_count(),
            });
        }
        self.tree.materialize_buffers();
        debug!("serializing {} bytes of form package", self.pkg_length);
        Ok(SerializedPackage { package: self })
    }

    /// Resets the package so another, unrelated form can be compiled.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.pending.clear();
        self.pkg_length = 0;
        self.offset = 0;
        self.offsets_computed = false;
    }
}

/// One record as written to the package.
#[derive(Debug, Clone, Copy)]
pub struct EmittedRecord<'a> {
    pub id: NodeId,
    pub node: &'a TreeNode,
    pub offset: u32,
    pub bytes: &'a [u8],
}

/// A form package whose offsets are computed, references resolved and
/// record bytes encoded.
#[derive(Debug, Clone, Copy)]
pub struct SerializedPackage<'a> {
    package: &'a FormPackage,
}

impl<'a> SerializedPackage<'a> {
    pub fn tree(&self) -> &'a FormTree {
        &self.package.tree
    }

    pub fn pkg_length(&self) -> u32 {
        self.package.pkg_length
    }

    pub fn header(&self) -> [u8; PACKAGE_HEADER_SIZE] {
        self.package.package_header()
    }

    /// Records in document order. The shown-default-store sentinel is skipped.
    pub fn records(self) -> impl Iterator<Item = EmittedRecord<'a>> {
        self.package.tree.preorder().filter_map(|(id, node)| {
            Some(EmittedRecord {
                id,
                node,
                offset: node.offset()?,
                bytes: node.buffer()?,
            })
        })
    }

    /// Header followed by the payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PACKAGE_HEADER_SIZE + self.pkg_length() as usize);
        bytes.extend_from_slice(&self.header());
        for record in self.records() {
            bytes.extend_from_slice(record.bytes);
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{
        Bare, StatementHeader,
        expression::{Constant, EqIdVal, WordOperand},
        statement::{Form, Text},
    };

    #[test]
    fn offsets_of_fixed_length_siblings() {
        let mut package = FormPackage::new();
        let image = package
            .insert(None, WordOperand::new(OpCode::Image, 1).unwrap(), 1, None)
            .unwrap();
        let text = package
            .insert(None, Text::new(StatementHeader::new(1, 2), 3), 2, None)
            .unwrap();
        let constant = package.insert(None, Constant::U16(5), 3, None).unwrap();

        assert_eq!(package.build_pkg().unwrap(), 16);
        let tree = package.tree();
        assert_eq!(tree.node(image).unwrap().offset(), Some(0));
        assert_eq!(tree.node(text).unwrap().offset(), Some(4));
        assert_eq!(tree.node(constant).unwrap().offset(), Some(12));

        let serialized = package.serialize().unwrap();
        let bytes = serialized.to_bytes();
        assert_eq!(bytes.len(), 16 + PACKAGE_HEADER_SIZE);
        assert_eq!(&bytes[..4], [20, 0, 0, FORM_PACKAGE_TYPE]);
    }

    #[test]
    fn sentinel_contributes_nothing() {
        let mut package = FormPackage::new();
        let form = package.insert(None, Form::new(1, 2), 1, None).unwrap();
        let sentinel = package
            .insert(
                Some(form),
                Bare::new(OpCode::ShownDefaultStore).unwrap(),
                2,
                None,
            )
            .unwrap();
        let end = package.insert(Some(form), IfrOp::end(), 3, None).unwrap();

        assert_eq!(package.build_pkg().unwrap(), 8);
        assert_eq!(package.tree().node(sentinel).unwrap().offset(), None);
        assert_eq!(package.tree().node(end).unwrap().offset(), Some(6));

        let serialized = package.serialize().unwrap();
        assert_eq!(serialized.records().count(), 2);
    }

    #[test]
    fn serialization_waits_for_references() {
        let mut package = FormPackage::new();
        let eq = package
            .insert(
                None,
                EqIdVal {
                    question_id: 0,
                    value: 3,
                },
                4,
                None,
            )
            .unwrap();
        package.register_pending("Q", eq, QuestionField::QuestionId, 4, "undefined question");

        assert!(package.serialize().unwrap_err().is_offsets_not_computed());
        package.build_pkg().unwrap();
        assert_eq!(
            package.serialize().unwrap_err(),
            Error::UnresolvedBeforeSerialize { count: 1 }
        );

        package.resolve_pending("Q", 0x0102).unwrap();
        let serialized = package.serialize().unwrap();
        assert_eq!(
            serialized.to_bytes()[PACKAGE_HEADER_SIZE..],
            [0x12, 0x06, 0x02, 0x01, 0x03, 0x00]
        );
    }

    #[test]
    fn clear_resets_everything() {
        let mut package = FormPackage::new();
        let eq = package
            .insert(None, EqIdVal { question_id: 0, value: 0 }, 1, None)
            .unwrap();
        package.register_pending("Q", eq, QuestionField::QuestionId, 1, "undefined question");
        package.build_pkg().unwrap();

        package.clear();
        assert!(package.tree().is_empty());
        assert!(!package.pending().has_unresolved());
        assert_eq!(package.pkg_length(), 0);
        assert!(package.serialize().unwrap_err().is_offsets_not_computed());
    }
}
