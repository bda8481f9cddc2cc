//! Building blocks for the generated Python `ctypes` bindings.

use std::collections::HashSet;

use crate::{
    types::{Field, Struct},
    utils::{quote, GENERATED_NOTICE},
};

pub const STRUCT_BASE: &str = "VLACompatLittleEndianStruct";
/// Name under which an extension module imports its base module.
pub const BASE_ALIAS: &str = "base";

/// Which half of a base/extension split is being rendered.
pub struct HostModule<'a> {
    /// Module name without the `.py` suffix.
    pub name:          &'a str,
    /// Set for the extension-only variant, holding the base module name.
    pub extension_of:  Option<&'a str>,
    /// Structs defined by this module itself.
    pub local_structs: HashSet<&'a str>,
}

impl<'a> HostModule<'a> {
    /// Module holding every struct and entry of a document without extensions,
    /// or only the base entries of one with extensions.
    pub fn base(name: &'a str, structs: &'a [Struct]) -> Self {
        HostModule {
            name,
            extension_of:  None,
            local_structs: structs
                .iter()
                .filter(|s| !s.extension)
                .map(|s| s.name.as_str())
                .collect(),
        }
    }

    pub fn extension(name: &'a str, base: &'a str, structs: &'a [Struct]) -> Self {
        HostModule {
            name,
            extension_of:  Some(base),
            local_structs: structs
                .iter()
                .filter(|s| s.extension)
                .map(|s| s.name.as_str())
                .collect(),
        }
    }

    pub fn is_extension(&self) -> bool {
        self.extension_of.is_some()
    }

    /// Whether an item tagged `extension` belongs in this module.
    pub fn includes(&self, extension: bool) -> bool {
        extension == self.is_extension()
    }

    /// Field type, qualified when it names a struct owned by the base module.
    pub fn py_type(&self, field: &Field) -> String {
        let prefix = field
            .struct_ref()
            .filter(|name| self.is_extension() && !self.local_structs.contains(name))
            .map(|_| BASE_ALIAS);
        field.py_type(prefix)
    }

    /// Shebang, docstring, notice and imports.
    pub fn preamble(&self, title: &str, imports: &[&str]) -> Vec<String> {
        let mut lines = vec![
            "#!/usr/bin/env python3".to_string(),
            String::new(),
            format!("\"\"\"{}\"\"\"", title),
            String::new(),
            format!("# {}", GENERATED_NOTICE),
            String::new(),
        ];
        for import in imports {
            lines.push(format!("import {}", import));
        }
        lines.push(String::new());
        lines.push(format!("from infuse_iot.util.ctypes import {}", STRUCT_BASE));
        if let Some(base) = self.extension_of {
            lines.push(String::new());
            lines.push(format!("from . import {} as {}", base, BASE_ALIAS));
        }
        lines.push(String::new());
        lines
    }
}

/// Extra class body content around the `_fields_` table.
#[derive(Default)]
pub struct ClassBody {
    /// Class attributes before `_fields_`.
    pub attrs: Vec<String>,
    /// Lines after `_pack_`, e.g. display tables and properties.
    pub tail:  Vec<String>,
}

fn indent(level: usize) -> String {
    " ".repeat(4 * level)
}

/// A `ctypes` struct class. A trailing flexible field is exposed as
/// `vla_field` instead of being part of `_fields_`.
pub fn struct_class(
    module:      &HostModule<'_>,
    level:       usize,
    name:        &str,
    description: Option<&str>,
    fields:      &[Field],
    body:        ClassBody,
) -> Vec<String> {
    let outer = indent(level);
    let inner = indent(level + 1);
    let mut lines = vec![format!("{}class {}({}):", outer, name, STRUCT_BASE)];

    if let Some(text) = description.filter(|d| !d.is_empty()) {
        lines.push(format!("{}{}", inner, quote(text)));
        lines.push(String::new());
    }
    for attr in body.attrs {
        lines.push(format!("{}{}", inner, attr));
    }

    let (fixed, tail) = match fields.split_last() {
        Some((last, rest)) if last.flexible => (rest, Some(last)),
        _ => (fields, None),
    };

    if fixed.is_empty() {
        lines.push(format!("{}_fields_ = []", inner));
    } else {
        lines.push(format!("{}_fields_ = [", inner));
        for field in fixed {
            let (name, ty) = (quote(&field.py_name), module.py_type(field));
            lines.push(format!("{}    ({}, {}),", inner, name, ty));
        }
        lines.push(format!("{}]", inner));
    }
    if let Some(field) = tail {
        let (name, ty) = (quote(&field.py_name), module.py_type(field));
        lines.push(format!("{}vla_field = ({}, {})", inner, name, ty));
    }
    lines.push(format!("{}_pack_ = 1", inner));

    for line in body.tail {
        if line.is_empty() {
            lines.push(line);
        } else {
            lines.push(format!("{}{}", inner, line));
        }
    }
    lines.push(String::new());
    lines
}

/// `{"key": value, ...}` table spread over several lines.
pub fn dict(name: &str, entries: &[(String, String)]) -> Vec<String> {
    if entries.is_empty() {
        return vec![format!("{} = {{}}", name)];
    }
    let mut lines = vec![format!("{} = {{", name)];
    for (key, value) in entries {
        lines.push(format!("    {}: {},", key, value));
    }
    lines.push("}".to_string());
    lines
}

/// Every struct belonging to `module`, as module level classes.
pub fn struct_classes(
    module:  &HostModule<'_>,
    structs: &[Struct],
    body:    impl Fn(&Struct) -> ClassBody,
) -> Vec<String> {
    let mut lines = Vec::new();
    for s in structs.iter().filter(|s| module.includes(s.extension)) {
        let description = s.description.as_deref();
        lines.extend(struct_class(module, 0, &s.name, description, &s.fields, body(s)));
        lines.push(String::new());
    }
    lines
}

/// `id_type_mapping = {id: class, ...}` closing every module.
pub fn id_type_mapping(entries: &[(u32, String)]) -> Vec<String> {
    let pairs: Vec<(String, String)> = entries
        .iter()
        .map(|(id, class)| (id.to_string(), class.clone()))
        .collect();
    let mut lines = dict("id_type_mapping", &pairs);
    lines.push(String::new());
    lines
}
