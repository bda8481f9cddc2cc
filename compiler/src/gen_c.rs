//! Building blocks shared by the generated C headers and sources.

use crate::{
    types::{Arity, Field, Struct},
    utils::{comment_text, include_guard, GENERATED_NOTICE},
};

/// File banner plus the opening half of the include guard.
pub fn header_open(path: &str, brief: &str, includes: &[&str]) -> Vec<String> {
    let guard = include_guard(path);
    let mut lines = file_banner(brief);
    lines.push(format!("#ifndef {}", guard));
    lines.push(format!("#define {}", guard));
    lines.push(String::new());
    for include in includes {
        lines.push(format!("#include <{}>", include));
    }
    lines.push(String::new());
    lines.push("#ifdef __cplusplus".to_string());
    lines.push("extern \"C\" {".to_string());
    lines.push("#endif".to_string());
    lines.push(String::new());
    lines
}

pub fn header_close(path: &str) -> Vec<String> {
    vec![
        "#ifdef __cplusplus".to_string(),
        "}".to_string(),
        "#endif".to_string(),
        String::new(),
        format!("#endif /* {} */", include_guard(path)),
    ]
}

pub fn file_banner(brief: &str) -> Vec<String> {
    vec![
        "/**".to_string(),
        " * @file".to_string(),
        format!(" * @brief {}", comment_text(brief)),
        " *".to_string(),
        format!(" * {}", GENERATED_NOTICE),
        " */".to_string(),
        String::new(),
    ]
}

pub fn doc_comment(description: Option<&str>, indent: &str) -> Vec<String> {
    match description {
        Some(text) if !text.is_empty() => vec![format!("{}/** {} */", indent, comment_text(text))],
        _ => Vec::new(),
    }
}

pub fn section(title: &str) -> String {
    format!("/* {} */", title)
}

/// Member declarations of a struct body, one per line, tab indented.
///
/// With `zero_length_tail` a trailing `[]` becomes `[0]`, which keeps a
/// struct whose only member is the variable length array valid C.
pub fn members(fields: &[Field], zero_length_tail: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for field in fields {
        lines.extend(doc_comment(field.description.as_deref(), "\t"));
        if zero_length_tail && field.arity == Arity::Flexible {
            lines.push(format!("\t{} {}[0];", field.ty.c_type(), field.name));
        } else {
            lines.push(format!("\t{}", field.c_decl()));
        }
    }
    lines
}

/// A packed struct with an optional leading member (RPC headers).
pub fn packed_struct(
    name:             &str,
    description:      Option<&str>,
    leading:          Option<&str>,
    fields:           &[Field],
    zero_length_tail: bool,
) -> Vec<String> {
    let mut lines = doc_comment(description, "");
    lines.push(format!("struct {} {{", name));
    if let Some(member) = leading {
        lines.push(format!("\t{}", member));
    }
    lines.extend(members(fields, zero_length_tail));
    lines.push("} __packed;".to_string());
    lines.push(String::new());
    lines
}

/// Every struct of a family, already in dependency order.
pub fn struct_definitions(structs: &[Struct]) -> Vec<String> {
    let mut lines = Vec::new();
    if structs.is_empty() {
        return lines;
    }
    lines.push(section("Shared structs"));
    lines.push(String::new());
    for s in structs {
        lines.extend(packed_struct(&s.name, s.description.as_deref(), None, &s.fields, false));
    }
    lines
}

/// Join lines of a multi-line macro body with line continuations.
pub fn macro_body(head: &str, body: &[String]) -> Vec<String> {
    let mut lines = vec![format!("{} \\", head)];
    for (i, line) in body.iter().enumerate() {
        if i + 1 == body.len() {
            lines.push(line.clone());
        } else {
            lines.push(format!("{} \\", line));
        }
    }
    lines
}
