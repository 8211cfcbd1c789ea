use std::{
    convert::Infallible,
    io::{self, Write},
};

use serde_json::{Map, Value, json};

use crate::{
    emit::{SymbolResolver, render_field},
    package::SerializedPackage,
    records::{FieldValue, IfrRecord},
    tree::{NodeId, TreeNode, TreeVisitor},
};

fn field_json(value: &FieldValue, symbols: &dyn SymbolResolver) -> Value {
    match value {
        FieldValue::Int(v) => json!(v),
        FieldValue::List(values) => json!(values),
        other => Value::String(render_field(other, symbols)),
    }
}

/// Builds nested objects bottom-up: a node's object is complete once all
/// of its children were left.
struct JsonBuilder<'a> {
    symbols: &'a dyn SymbolResolver,
    open: Vec<Map<String, Value>>,
    records: Vec<Value>,
}

impl TreeVisitor for JsonBuilder<'_> {
    type Error = Infallible;

    fn enter(&mut self, _id: NodeId, node: &TreeNode, _depth: usize) -> Result<(), Infallible> {
        let mut object = Map::new();
        object.insert("opcode".into(), json!(node.opcode().ifr_name()));
        object.insert("line".into(), json!(node.line()));
        object.insert("offset".into(), json!(node.offset()));
        object.insert("length".into(), json!(node.length()));
        object.insert("scope".into(), json!(node.scope()));
        if let Some(condition) = node.condition() {
            object.insert("condition".into(), json!(condition));
        }
        let fields: Map<String, Value> = node
            .record()
            .fields()
            .iter()
            .map(|(name, value)| (name.to_string(), field_json(value, self.symbols)))
            .collect();
        object.insert("fields".into(), Value::Object(fields));
        if !node.children().is_empty() {
            object.insert("children".into(), json!([]));
        }
        self.open.push(object);
        Ok(())
    }

    fn leave(&mut self, _id: NodeId, _node: &TreeNode, _depth: usize) -> Result<(), Infallible> {
        let Some(done) = self.open.pop() else {
            return Ok(());
        };
        let children = self
            .open
            .last_mut()
            .and_then(|parent| parent.get_mut("children"))
            .and_then(Value::as_array_mut);
        match children {
            Some(children) => children.push(Value::Object(done)),
            None => self.records.push(Value::Object(done)),
        }
        Ok(())
    }
}

/// The whole package as one JSON document.
pub fn to_json(package: SerializedPackage<'_>, symbols: &dyn SymbolResolver) -> Value {
    let mut builder = JsonBuilder {
        symbols,
        open: Vec::new(),
        records: Vec::new(),
    };
    let Ok(()) = package.tree().walk(&mut builder);
    json!({
        "package_length": package.pkg_length(),
        "records": builder.records,
    })
}

pub fn write_json<W: Write>(
    package: SerializedPackage<'_>,
    symbols: &dyn SymbolResolver,
    out: &mut W,
) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, &to_json(package, symbols))?;
    writeln!(out)
}
