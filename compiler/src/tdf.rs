//! Telemetry Data Format records.

use cloudgen_schema::TdfDocument;

use crate::{
    error::CloudgenError,
    gen_c::{doc_comment, header_close, header_open, packed_struct, section, struct_definitions},
    gen_python::{id_type_mapping, struct_class, struct_classes, ClassBody, HostModule},
    normalizer::{compile_structs, normalize_fields, Owner, TypeTables},
    output::{Artifact, Style, Target},
    traits::{FamilyDescriptor, Generator},
    types::{Arity, Family, Field, TdfDefinition, TdfModel},
    utils::quote,
    verifier::{verify_entry, verify_unique_names},
};

pub const HEADER_PATH: &str = "include/infuse/tdf/definitions.h";
pub const HOST_MODULE: &str = "tdf_definitions";
pub const HOST_EXT_MODULE: &str = "tdf_definitions_ext";

pub struct TdfGenerator;

impl Generator for TdfGenerator {
    type Document = TdfDocument;
    type Model = TdfModel;

    const DESCRIPTOR: FamilyDescriptor = FamilyDescriptor {
        family:       Family::Tdf,
        id_threshold: 1024,
        schema_file:  "tdf.json",
    };

    fn compile(document: &TdfDocument) -> Result<TdfModel, CloudgenError> {
        compile(document)
    }

    fn render(model: &TdfModel, extended: bool) -> Vec<Artifact> {
        let header = render_header(model);
        let mut artifacts = vec![Artifact::new(Target::Firmware, HEADER_PATH, Style::C, header)];

        let structs = &model.structs;
        let base = HostModule::base(HOST_MODULE, structs);
        artifacts.push(Artifact::new(
            Target::Host,
            format!("{}.py", HOST_MODULE),
            Style::Plain,
            render_python(&base, model),
        ));
        if extended {
            let ext = HostModule::extension(HOST_EXT_MODULE, HOST_MODULE, structs);
            artifacts.push(Artifact::new(
                Target::Host,
                format!("{}.py", HOST_EXT_MODULE),
                Style::Python,
                render_python(&ext, model),
            ));
        }
        artifacts
    }
}

pub fn compile(document: &TdfDocument) -> Result<TdfModel, CloudgenError> {
    let family = Family::Tdf;
    let structs = compile_structs(family, &document.structs, None)?;
    verify_unique_names(family, document.definitions.iter().map(|(id, d)| (id, d.name.as_str())))?;

    let tables = TypeTables { family, structs: &structs, enums: None };
    let mut definitions = Vec::with_capacity(document.definitions.len());

    for (id, entry) in document.definitions.iter() {
        verify_entry(family, id, &entry.name, entry.fields.len(), false)?;
        let owner = Owner { name: &entry.name, extension: entry.extension };
        let (fields, flexible) = normalize_fields(&tables, owner, &entry.fields)?;
        let only_flexible = fields.len() == 1 && fields[0].arity == Arity::Flexible;
        log::debug!("TDF: definition {} ({}) flexible={}", id, entry.name, flexible);

        definitions.push(TdfDefinition {
            id,
            name: entry.name.clone(),
            description: entry.description.clone(),
            fields,
            only_flexible,
            extension: entry.extension,
        });
    }

    Ok(TdfModel {
        structs: structs.into_values().collect(),
        definitions,
    })
}

fn c_struct_name(definition: &TdfDefinition) -> String {
    format!("tdf_{}", definition.name.to_lowercase())
}

fn c_id_name(definition: &TdfDefinition) -> String {
    format!("TDF_{}", definition.name.to_uppercase())
}

pub fn render_header(model: &TdfModel) -> String {
    let includes = ["stdint.h", "zephyr/toolchain.h"];
    let mut lines = header_open(HEADER_PATH, "TDF definitions", &includes);
    lines.extend(struct_definitions(&model.structs));

    if !model.definitions.is_empty() {
        lines.push(section("TDF definitions"));
        lines.push(String::new());
    }
    for definition in &model.definitions {
        let name = c_struct_name(definition);
        let id = c_id_name(definition);
        lines.extend(packed_struct(
            &name,
            definition.description.as_deref(),
            None,
            &definition.fields,
            definition.only_flexible,
        ));
        lines.extend(doc_comment(Some(&format!("ID of struct {}", name)), ""));
        lines.push(format!("#define {} {}", id, definition.id));
        lines.push(format!("#define _{}_TYPE struct {}", id, name));
        lines.push(format!("#define {}_SIZE sizeof(struct {})", id, name));
        lines.push(String::new());
    }

    lines.extend(header_close(HEADER_PATH));
    lines.push(String::new());
    lines.join("\n")
}

/// `_postfix_`, `_display_fmt_` and the conversion properties of a class.
fn decode_helpers(fields: &[Field]) -> Vec<String> {
    let mut lines = Vec::new();

    let postfix: Vec<String> = fields
        .iter()
        .map(|f| format!("{}: {}", quote(&f.name), quote(&f.display.postfix)))
        .collect();
    let fmt: Vec<String> = fields
        .iter()
        .map(|f| format!("{}: {}", quote(&f.name), quote(&f.display.fmt)))
        .collect();
    lines.push(format!("_postfix_ = {{{}}}", postfix.join(", ")));
    lines.push(format!("_display_fmt_ = {{{}}}", fmt.join(", ")));

    for field in fields {
        if let Some(conversion) = &field.conversion {
            lines.push(String::new());
            lines.push("@property".to_string());
            lines.push(format!("def {}(self):", field.name));
            lines.push(format!("    return {}", conversion));
        }
    }
    lines
}

pub fn render_python(module: &HostModule<'_>, model: &TdfModel) -> String {
    let mut lines = module.preamble("TDF definitions", &["ctypes"]);
    lines.push(String::new());

    lines.extend(struct_classes(module, &model.structs, |s| ClassBody {
        attrs: Vec::new(),
        tail:  decode_helpers(&s.fields),
    }));

    let definitions: Vec<&TdfDefinition> =
        model.definitions.iter().filter(|d| module.includes(d.extension)).collect();

    lines.push("class readings:".to_string());
    if definitions.is_empty() {
        lines.push("    pass".to_string());
        lines.push(String::new());
    }
    for definition in &definitions {
        let class = definition.name.to_lowercase();
        lines.extend(struct_class(
            module,
            1,
            &class,
            definition.description.as_deref(),
            &definition.fields,
            ClassBody {
                attrs: vec![format!("NAME = {}", quote(&definition.name.to_uppercase()))],
                tail:  decode_helpers(&definition.fields),
            },
        ));
    }
    lines.push(String::new());

    let mapping: Vec<(u32, String)> = definitions
        .iter()
        .map(|d| (d.id, format!("readings.{}", d.name.to_lowercase())))
        .collect();
    lines.extend(id_type_mapping(&mapping));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: serde_json::Value) -> TdfDocument {
        serde_json::from_value(value).unwrap()
    }

    fn vec3_document() -> TdfDocument {
        document(json!({
            "structs": {
                "Vec3": {"fields": [
                    {"name": "x", "type": "int16_t"},
                    {"name": "y", "type": "int16_t"},
                    {"name": "z", "type": "int16_t"}
                ]}
            },
            "definitions": {
                "10": {
                    "name": "position",
                    "description": "Position",
                    "fields": [{"name": "pos", "type": "struct Vec3"}]
                }
            }
        }))
    }

    #[test]
    fn test_struct_definition_compiles() {
        let model = compile(&vec3_document()).unwrap();
        let definition = &model.definitions[0];
        assert_eq!(definition.id, 10);
        assert_eq!(definition.fields[0].array, "");
        assert!(!definition.fields[0].flexible);
        assert!(!definition.only_flexible);
    }

    #[test]
    fn test_header_orders_struct_before_definition() {
        let model = compile(&vec3_document()).unwrap();
        let header = render_header(&model);

        let vec3 = header.find("struct Vec3 {").unwrap();
        let position = header.find("struct tdf_position {").unwrap();
        assert!(vec3 < position);
        assert!(header.contains("\tstruct Vec3 pos;\n"));
        assert!(header.contains("#define TDF_POSITION 10\n"));
        assert!(header.contains("#define _TDF_POSITION_TYPE struct tdf_position\n"));
        assert!(header.contains("#define TDF_POSITION_SIZE sizeof(struct tdf_position)\n"));
        assert!(header.ends_with("#endif /* INFUSE_SDK_INCLUDE_INFUSE_TDF_DEFINITIONS_H_ */\n"));
    }

    #[test]
    fn test_only_flexible_uses_zero_length_array() {
        let doc = document(json!({
            "definitions": {
                "3": {"name": "raw", "fields": [{"name": "data", "type": "uint8_t", "num": 0}]},
                "4": {"name": "blob", "fields": [
                    {"name": "len", "type": "uint8_t"},
                    {"name": "data", "type": "uint8_t", "num": 0}
                ]}
            }
        }));
        let model = compile(&doc).unwrap();
        assert!(model.definitions[0].only_flexible);
        assert!(!model.definitions[1].only_flexible);

        let header = render_header(&model);
        assert!(header.contains("struct tdf_raw {\n\tuint8_t data[0];\n} __packed;"));
        assert!(header.contains("\tuint8_t data[];\n} __packed;"));
    }

    #[test]
    fn test_empty_definition_rejected() {
        let doc = document(json!({"definitions": {"2": {"name": "nothing", "fields": []}}}));
        let err = compile(&doc).unwrap_err();
        assert!(matches!(
            err.as_violation(),
            Some(crate::error::Violation::EmptyDefinition { id: 2, .. })
        ));
    }

    #[test]
    fn test_python_conversions_and_display() {
        let doc = document(json!({
            "definitions": {
                "5": {"name": "battery", "fields": [
                    {
                        "name": "voltage",
                        "type": "uint16_t",
                        "conversion": {"m": 0.001},
                        "display": {"fmt": "float", "digits": 3, "postfix": "V"}
                    },
                    {"name": "flags", "type": "uint8_t", "display": {"fmt": "hex", "digits": 2}}
                ]}
            }
        }));
        let model = compile(&doc).unwrap();
        let module = HostModule::base(HOST_MODULE, &model.structs);
        let text = render_python(&module, &model);

        assert!(text.contains("    class battery(VLACompatLittleEndianStruct):\n"));
        assert!(text.contains("        NAME = \"BATTERY\"\n"));
        assert!(text.contains("            (\"_voltage\", ctypes.c_uint16),\n"));
        assert!(text.contains("            (\"flags\", ctypes.c_uint8),\n"));
        assert!(text.contains("        _postfix_ = {\"voltage\": \"V\", \"flags\": \"\"}\n"));
        assert!(text.contains("        _display_fmt_ = {\"voltage\": \"{:.3f}\", \"flags\": \"0x{:02x}\"}\n"));
        assert!(text.contains("        @property\n        def voltage(self):\n            return self._voltage * 0.001\n"));
        assert!(text.contains("    5: readings.battery,\n"));
    }

    #[test]
    fn test_extension_split() {
        let base = vec3_document();
        let ext = document(json!({
            "structs": {"ext_pair": {"fields": [
                {"name": "a", "type": "struct Vec3"},
                {"name": "b", "type": "struct Vec3"}
            ]}},
            "definitions": {
                "1100": {"name": "pair", "fields": [{"name": "p", "type": "struct ext_pair"}]}
            }
        }));
        let artifacts = crate::compiler::generate::<TdfGenerator>(base, Some(ext)).unwrap();
        assert_eq!(artifacts.len(), 3);

        let base_py = &artifacts[1];
        assert_eq!(base_py.path.to_str(), Some("tdf_definitions.py"));
        assert!(base_py.contents.contains("readings.position"));
        assert!(!base_py.contents.contains("pair"));

        let ext_py = &artifacts[2];
        assert_eq!(ext_py.path.to_str(), Some("tdf_definitions_ext.py"));
        assert_eq!(ext_py.style, Style::Python);
        assert!(ext_py.contents.contains("from . import tdf_definitions as base\n"));
        assert!(ext_py.contents.contains("(\"a\", base.Vec3),"));
        assert!(ext_py.contents.contains("(\"p\", ext_pair),"));
        assert!(ext_py.contents.contains("    1100: readings.pair,\n"));
        assert!(!ext_py.contents.contains("class Vec3"));

        assert!(artifacts[0].contents.contains("#define TDF_PAIR 1100"));
    }
}
