//! Arena-backed form tree.
//!
//! Nodes live in one vector and refer to each other through [`NodeId`]s, so
//! forward references can be patched later by index instead of holding
//! pointers into the tree. Children are kept in insertion order, which is
//! document order and serialization order.

use std::fmt;

use log::debug;
use smallvec::SmallVec;

use crate::{
    opcode::{MAX_RECORD_LENGTH, OpCode},
    records::{IfrOp, IfrRecord},
    utils::{Error, IfrResult},
};

/// Raw bytes of one record. Most records fit inline.
pub type RecordBuffer = SmallVec<u8, 32>;

/// Separator used when nested conditional scopes combine their guards.
pub const CONDITION_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    record: IfrOp,
    scope: bool,
    line: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    condition: Option<String>,
    offset: Option<u32>,
    buffer: Option<RecordBuffer>,
}

impl TreeNode {
    pub fn record(&self) -> &IfrOp {
        &self.record
    }

    pub fn opcode(&self) -> OpCode {
        self.record.opcode()
    }

    /// Whether the header scope bit is set, either because the opcode is
    /// inherently scoped or because the node has children.
    pub fn scope(&self) -> bool {
        self.scope
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Accumulated guard of the enclosing conditional scopes.
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Byte offset inside the package payload, set by the offset pass.
    pub fn offset(&self) -> Option<u32> {
        self.offset
    }

    pub fn buffer(&self) -> Option<&[u8]> {
        self.buffer.as_deref()
    }

    /// Bytes this node contributes to the package.
    pub fn length(&self) -> usize {
        if self.opcode() == OpCode::ShownDefaultStore {
            0
        } else {
            self.record.length()
        }
    }

    fn encode_buffer(&self) -> RecordBuffer {
        let mut buffer = RecordBuffer::new();
        self.record
            .encode(self.scope, &mut |b| buffer.extend_from_slice(b));
        buffer
    }
}

/// Callbacks of a depth-first walk over the tree.
pub trait TreeVisitor {
    type Error;

    fn enter(&mut self, id: NodeId, node: &TreeNode, depth: usize) -> Result<(), Self::Error>;

    fn leave(&mut self, _id: NodeId, _node: &TreeNode, _depth: usize) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Combines an inherited condition with the guard of a new conditional scope.
pub fn join_condition(inherited: Option<&str>, guard: &str) -> String {
    match inherited {
        Some(inherited) if !inherited.is_empty() => {
            format!("{inherited}{CONDITION_SEPARATOR}{guard}")
        }
        _ => guard.to_string(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormTree {
    nodes: Vec<TreeNode>,
    top: Vec<NodeId>,
}

impl FormTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes without a parent, in document order.
    pub fn top_level(&self) -> &[NodeId] {
        &self.top
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.top.clear();
    }

    /// Appends `record` as the last child of `parent`, or as a top-level node.
    ///
    /// Without an explicit `condition` the node inherits the one of its
    /// parent. Adding a child sets the parent's scope bit.
    pub fn insert(
        &mut self,
        parent: Option<NodeId>,
        record: impl Into<IfrOp>,
        line: u32,
        condition: Option<String>,
    ) -> IfrResult<NodeId> {
        let record = record.into();
        let length = record.length();
        if length > MAX_RECORD_LENGTH {
            return Err(Error::RecordTooLarge {
                opcode: record.opcode(),
                length,
            });
        }

        let id = NodeId(self.nodes.len() as u32);
        let inherited = match parent {
            Some(parent) => {
                let parent = self.node_mut(parent)?;
                parent.scope = true;
                parent.buffer = None;
                parent.children.push(id);
                parent.condition.clone()
            }
            None => {
                self.top.push(id);
                None
            }
        };

        let opcode = record.opcode();
        let mut node = TreeNode {
            scope: opcode.info().scope,
            record,
            line,
            parent,
            children: Vec::new(),
            condition: condition.or(inherited),
            offset: None,
            buffer: None,
        };
        if !opcode.is_expression() {
            node.buffer = Some(node.encode_buffer());
        }
        debug!("node {id}: {} at line {line}", opcode.ifr_name());
        self.nodes.push(node);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> IfrResult<&TreeNode> {
        self.nodes
            .get(id.index())
            .ok_or(Error::InvalidNode { node: id.0 })
    }

    fn node_mut(&mut self, id: NodeId) -> IfrResult<&mut TreeNode> {
        self.nodes
            .get_mut(id.index())
            .ok_or(Error::InvalidNode { node: id.0 })
    }

    /// Mutable access to a record. The cached bytes of the node are dropped.
    pub fn record_mut(&mut self, id: NodeId) -> IfrResult<&mut IfrOp> {
        let node = self.node_mut(id)?;
        node.buffer = None;
        Ok(&mut node.record)
    }

    pub(crate) fn set_offset(&mut self, id: NodeId, offset: Option<u32>) -> IfrResult<()> {
        self.node_mut(id)?.offset = offset;
        Ok(())
    }

    /// Pre-order iteration in document order.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: self.top.iter().rev().copied().collect(),
        }
    }

    /// Depth-first walk calling `enter` before and `leave` after the
    /// children of every node.
    pub fn walk<V: TreeVisitor>(&self, visitor: &mut V) -> Result<(), V::Error> {
        enum Step {
            Enter(NodeId, usize),
            Leave(NodeId, usize),
        }

        let mut stack: Vec<Step> = self.top.iter().rev().map(|id| Step::Enter(*id, 0)).collect();
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(id, depth) => {
                    let node = &self.nodes[id.index()];
                    visitor.enter(id, node, depth)?;
                    stack.push(Step::Leave(id, depth));
                    stack.extend(
                        node.children
                            .iter()
                            .rev()
                            .map(|child| Step::Enter(*child, depth + 1)),
                    );
                }
                Step::Leave(id, depth) => {
                    visitor.leave(id, &self.nodes[id.index()], depth)?;
                }
            }
        }
        Ok(())
    }

    /// Checks record sizes and that every scope is closed by exactly one
    /// trailing `End`.
    pub fn verify_structure(&self) -> IfrResult<()> {
        for (index, node) in self.nodes.iter().enumerate() {
            let id = NodeId(index as u32);
            let length = node.length();
            if length > MAX_RECORD_LENGTH {
                return Err(Error::RecordTooLarge {
                    opcode: node.opcode(),
                    length,
                });
            }

            if node.opcode() == OpCode::End {
                if !node.children.is_empty() {
                    return Err(Error::EndWithChildren { line: node.line });
                }
                let closes_parent = node.parent.is_some_and(|parent| {
                    let parent = &self.nodes[parent.index()];
                    parent.scope && parent.children.last() == Some(&id)
                });
                if !closes_parent {
                    return Err(Error::StrayEnd { line: node.line });
                }
                continue;
            }

            if node.scope {
                let closed = node
                    .children
                    .last()
                    .is_some_and(|last| self.nodes[last.index()].opcode() == OpCode::End);
                if !closed {
                    return Err(Error::MissingEnd {
                        opcode: node.opcode(),
                        line: node.line,
                    });
                }
            }
        }
        Ok(())
    }

    /// Computes the bytes of every node that has none cached yet. Expression
    /// records always land here, after forward references were patched.
    pub fn materialize_buffers(&mut self) {
        for node in &mut self.nodes {
            if node.buffer.is_none() {
                node.buffer = Some(node.encode_buffer());
            }
        }
    }
}

/// Iterator returned by [`FormTree::preorder`].
pub struct Preorder<'a> {
    tree: &'a FormTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = &self.tree.nodes[id.index()];
        self.stack.extend(node.children.iter().rev().copied());
        Some((id, node))
    }
}
