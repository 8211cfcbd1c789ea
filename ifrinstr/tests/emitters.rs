use ifrinstr::{
    EfiGuid, FormPackage, IfrOp, OpCode, QuestionField,
    emit::{
        NoSymbols, SymbolResolver, to_json, write_binary, write_c_source, write_record_list,
        write_yaml,
    },
    records::{
        Bare, StatementHeader,
        expression::EqIdVal,
        statement::{Form, FormSet, Subtitle, Text},
    },
    tree::join_condition,
};

const SOURCE: &str = "formset\n  form\n    subtitle\n    suppressif A\n      text\n    endif\n  endform\nendformset";

/// A formset with one form holding a subtitle and a suppressed text.
///
/// Layout (offset, length): FormSet 0/23, Form 23/6, Subtitle 29/7, End 36,
/// SuppressIf 38/2, EqIdVal 40/6, Text 46/8, End 54, End 56, End 58.
fn sample_package() -> FormPackage {
    let mut package = FormPackage::new();
    let guid = EfiGuid::parse("A04A27F4-DF00-4D42-B552-39511302113D").expect("valid guid");

    let formset = package
        .insert(None, FormSet::new(guid, 2, 3), 1, None)
        .expect("formset");
    let form = package
        .insert(Some(formset), Form::new(1, 4), 2, None)
        .expect("form");
    let subtitle = package
        .insert(Some(form), Subtitle::new(StatementHeader::new(5, 0)), 3, None)
        .expect("subtitle");
    package
        .insert(Some(subtitle), IfrOp::end(), 3, None)
        .expect("end subtitle");

    let suppress = package
        .insert(
            Some(form),
            Bare::new(OpCode::SuppressIf).expect("no payload"),
            4,
            Some(join_condition(None, "A")),
        )
        .expect("suppressif");
    let eq = package
        .insert(
            Some(suppress),
            EqIdVal {
                question_id: 0,
                value: 1,
            },
            4,
            None,
        )
        .expect("eq");
    package.register_pending("A", eq, QuestionField::QuestionId, 4, "undefined question");
    package
        .insert(Some(suppress), Text::new(StatementHeader::new(6, 7), 8), 5, None)
        .expect("text");
    package
        .insert(Some(suppress), IfrOp::end(), 6, None)
        .expect("end suppressif");
    package
        .insert(Some(form), IfrOp::end(), 7, None)
        .expect("end form");
    package
        .insert(Some(formset), IfrOp::end(), 8, None)
        .expect("end formset");

    package.resolve_pending("A", 0x10).expect("resolve");
    package.build_pkg().expect("offsets");
    package
}

#[test]
fn binary_starts_with_package_header() {
    let mut package = sample_package();
    assert_eq!(package.pkg_length(), 60);
    let serialized = package.serialize().expect("serialize");

    let mut bytes = Vec::new();
    write_binary(serialized, &mut bytes).expect("write to memory");
    assert_eq!(bytes.len(), 64);
    assert_eq!(bytes[..4], [0x40, 0x00, 0x00, 0x02]);
    assert_eq!(bytes[4..6], [0x0E, 0x97], "formset opcode with scope bit");
    assert_eq!(bytes[6..10], [0xF4, 0x27, 0x4A, 0xA0], "guid data1 little-endian");
    // EQ_ID_VAL at payload offset 40, patched with the resolved id
    assert_eq!(bytes[44..50], [0x12, 0x06, 0x10, 0x00, 0x01, 0x00]);
    assert_eq!(bytes[62..], [0x29, 0x02]);
    assert_eq!(bytes, serialized.to_bytes());
}

#[test]
fn c_source_counts_its_own_length() {
    let mut package = sample_package();
    let serialized = package.serialize().expect("serialize");

    let mut out = Vec::new();
    write_c_source(serialized, "Sample", &mut out).expect("write to memory");
    let text = String::from_utf8(out).expect("ascii output");

    assert!(text.contains("unsigned char SampleBin[] = {"));
    assert!(text.contains("  // ARRAY LENGTH\n  0x44, 0x00, 0x00, 0x00,\n"));
    assert!(text.contains("  // PACKAGE HEADER\n  0x40, 0x00, 0x00, 0x02,\n"));
    assert!(text.contains("  // PACKAGE DATA\n  0x0E, 0x97, 0xF4, 0x27,"));
    assert!(text.ends_with("0x29, 0x02\n};\n"));

    let data_lines = text
        .lines()
        .skip_while(|line| !line.contains("PACKAGE DATA"))
        .skip(1)
        .take_while(|line| !line.starts_with('}'))
        .count();
    assert_eq!(data_lines, 60_usize.div_ceil(16));
}

#[test]
fn record_list_follows_source_lines() {
    let mut package = sample_package();
    let serialized = package.serialize().expect("serialize");

    let mut out = Vec::new();
    write_record_list(serialized, Some(SOURCE), &mut out).expect("write to memory");
    let text = String::from_utf8(out).expect("ascii output");
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "formset");
    assert!(lines[1].starts_with(">00000000: 0E 97 F4 27 4A A0 "));
    assert_eq!(lines[2], "  form");
    assert_eq!(lines[3], ">00000017: 01 86 01 00 04 00 ");

    let suppress = lines
        .iter()
        .position(|line| *line == "    suppressif A")
        .expect("source line echoed");
    assert_eq!(lines[suppress + 1], ">00000026: 0A 82 ");
    assert_eq!(lines[suppress + 2], ">00000028: 12 06 10 00 01 00 ");
    assert_eq!(
        text.lines().last(),
        Some("Total Size of all record is 0x0000003C")
    );
}

#[test]
fn record_list_without_source_lists_everything() {
    let mut package = sample_package();
    let serialized = package.serialize().expect("serialize");

    let mut out = Vec::new();
    write_record_list(serialized, None, &mut out).expect("write to memory");
    let text = String::from_utf8(out).expect("ascii output");
    let offsets: Vec<&str> = text
        .lines()
        .filter(|line| line.starts_with('>'))
        .map(|line| &line[1..9])
        .collect();
    assert_eq!(
        offsets,
        [
            "00000000", "00000017", "0000001D", "00000024", "00000026", "00000028", "0000002E",
            "00000036", "00000038", "0000003A"
        ]
    );
}

struct Names;

impl SymbolResolver for Names {
    fn string_name(&self, id: u16) -> Option<&str> {
        match id {
            2 => Some("STR_FORMSET_TITLE"),
            4 => Some("STR_FORM_TITLE"),
            _ => None,
        }
    }

    fn question_name(&self, id: u16) -> Option<&str> {
        (id == 0x10).then_some("A")
    }
}

#[test]
fn yaml_nests_children_and_resolves_names() {
    let mut package = sample_package();
    let serialized = package.serialize().expect("serialize");

    let mut out = Vec::new();
    write_yaml(serialized, &Names, &mut out).expect("write to memory");
    let text = String::from_utf8(out).expect("utf-8 output");

    assert!(text.starts_with("package_length: 0x3C\nrecords:\n"));
    assert!(text.contains("\n  - EFI_IFR_FORM_SET_OP:\n      line: 1\n      offset: 0x0\n"));
    assert!(text.contains("      FormSetTitle: STR_FORMSET_TITLE\n"));
    assert!(text.contains("\n        - EFI_IFR_FORM_OP:\n"));
    assert!(text.contains("            FormTitle: STR_FORM_TITLE\n"));
    assert!(text.contains("condition: A\n"));
    assert!(text.contains("QuestionId: A\n"));
}

#[test]
fn yaml_keeps_text_that_looks_reserved_a_string() {
    let mut package = FormPackage::new();
    let guid = EfiGuid::parse("A04A27F4-DF00-4D42-B552-39511302113D").expect("valid guid");
    let formset = package
        .insert(None, FormSet::new(guid, 2, 3), 1, None)
        .expect("formset");
    let form = package
        .insert(Some(formset), Form::new(1, 4), 2, None)
        .expect("form");
    let suppress = package
        .insert(
            Some(form),
            Bare::new(OpCode::SuppressIf).expect("no payload"),
            3,
            Some("true".into()),
        )
        .expect("suppressif");
    package
        .insert(
            Some(suppress),
            EqIdVal {
                question_id: 7,
                value: 1,
            },
            3,
            None,
        )
        .expect("eq");
    for (parent, line) in [(suppress, 4), (form, 5), (formset, 6)] {
        package
            .insert(Some(parent), IfrOp::end(), line, None)
            .expect("end");
    }
    let serialized = package.serialize().expect("serialize");

    let mut out = Vec::new();
    write_yaml(serialized, &NoSymbols, &mut out).expect("write to memory");
    let text = String::from_utf8(out).expect("utf-8 output");

    assert!(text.contains("condition: \"true\"\n"));
    assert!(!text.contains("condition: true\n"));
    assert!(text.contains("QuestionId: \"7\"\n"));
    assert!(text.contains("Value: 1\n"));
}

#[test]
fn json_mirrors_the_tree() {
    let mut package = sample_package();
    let serialized = package.serialize().expect("serialize");
    let value = to_json(serialized, &NoSymbols);

    assert_eq!(value["package_length"], 60);
    let records = value["records"].as_array().expect("records array");
    assert_eq!(records.len(), 1);

    let formset = &records[0];
    assert_eq!(formset["opcode"], "EFI_IFR_FORM_SET_OP");
    assert_eq!(formset["fields"]["Guid"], "A04A27F4-DF00-4D42-B552-39511302113D");

    let form = &formset["children"][0];
    assert_eq!(form["offset"], 23);
    let suppress = &form["children"][1];
    assert_eq!(suppress["condition"], "A");
    assert_eq!(suppress["children"][0]["fields"]["QuestionId"], "16");
    assert_eq!(suppress["children"][1]["condition"], "A");
    assert_eq!(formset["children"].as_array().map(Vec::len), Some(2));
}
