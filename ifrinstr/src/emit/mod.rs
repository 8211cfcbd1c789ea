//! Output formats of a serialized form package.
//!
//! Every emitter walks the same [`SerializedPackage`](crate::package::SerializedPackage):
//! the binary `.hpk`, the C array, the record list and the YAML/JSON dumps
//! only differ in how they print each record.

use crate::{guid::EfiGuid, records::FieldValue};

pub mod binary;
pub mod cfile;
pub mod json;
pub mod record_list;
pub mod yaml;

pub use binary::write_binary;
pub use cfile::write_c_source;
pub use json::{to_json, write_json};
pub use record_list::write_record_list;
pub use yaml::write_yaml;

/// Maps numeric ids found in records back to the symbolic names of the
/// headers and sources the form was compiled from.
pub trait SymbolResolver {
    fn string_name(&self, _id: u16) -> Option<&str> {
        None
    }

    fn guid_name(&self, _guid: &EfiGuid) -> Option<&str> {
        None
    }

    fn question_name(&self, _id: u16) -> Option<&str> {
        None
    }
}

/// Resolver that knows no names; every field prints numerically.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSymbols;

impl SymbolResolver for NoSymbols {}

/// Text of a field, using symbolic names where the resolver has them.
pub fn render_field(value: &FieldValue, symbols: &dyn SymbolResolver) -> String {
    match value {
        FieldValue::Int(v) => v.to_string(),
        FieldValue::Hex(v) => format!("0x{v:X}"),
        FieldValue::Flags(v) => format!("0x{v:02X}"),
        FieldValue::StringId(id) => symbols
            .string_name(*id)
            .map_or_else(|| format!("0x{id:04X}"), str::to_string),
        FieldValue::QuestionId(id) => symbols
            .question_name(*id)
            .map_or_else(|| id.to_string(), str::to_string),
        FieldValue::Guid(guid) => symbols
            .guid_name(guid)
            .map_or_else(|| guid.to_string(), str::to_string),
        FieldValue::Text(text) => text.clone(),
        FieldValue::Value(value) => value.to_string(),
        FieldValue::List(values) => {
            let items: Vec<String> = values.iter().map(u64::to_string).collect();
            format!("[{}]", items.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Names;

    impl SymbolResolver for Names {
        fn string_name(&self, id: u16) -> Option<&str> {
            (id == 2).then_some("STR_TITLE")
        }
    }

    #[test]
    fn fields_prefer_symbolic_names() {
        assert_eq!(render_field(&FieldValue::StringId(2), &Names), "STR_TITLE");
        assert_eq!(render_field(&FieldValue::StringId(3), &Names), "0x0003");
        assert_eq!(render_field(&FieldValue::QuestionId(3), &NoSymbols), "3");
        assert_eq!(render_field(&FieldValue::List(vec![1, 2]), &NoSymbols), "[1, 2]");
    }
}
