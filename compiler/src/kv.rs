//! Key-value store slots.

use cloudgen_schema::KvDocument;

use crate::{
    error::CloudgenError,
    gen_c::{
        doc_comment, header_close, header_open, macro_body, members, packed_struct, section,
        struct_definitions,
    },
    gen_kconfig::{fragment, KconfigOption, Kind},
    gen_python::{id_type_mapping, struct_class, struct_classes, ClassBody, HostModule},
    normalizer::{compile_structs, normalize_fields, Owner, TypeTables},
    output::{Artifact, Style, Target},
    traits::{FamilyDescriptor, Generator},
    types::{
        Arity, Family, Field, KvDefinition, KvFlags, KvModel, Struct, KV_FLAGS_READ_ONLY,
        KV_FLAGS_REFLECT, KV_FLAGS_WRITE_ONLY,
    },
    utils::quote,
    verifier::{verify_entry, verify_kv_ranges, verify_unique_names},
};

pub const HEADER_PATH: &str = "include/infuse/fs/kv_types.h";
pub const KCONFIG_PATH: &str = "Kconfig.kv_keys";
pub const HOST_MODULE: &str = "kv_definitions";
pub const HOST_EXT_MODULE: &str = "kv_definitions_ext";

pub struct KvGenerator;

impl Generator for KvGenerator {
    type Document = KvDocument;
    type Model = KvModel;

    const DESCRIPTOR: FamilyDescriptor = FamilyDescriptor {
        family:       Family::Kv,
        id_threshold: 32768,
        schema_file:  "kv_store.json",
    };

    fn compile(document: &KvDocument) -> Result<KvModel, CloudgenError> {
        compile(document)
    }

    fn render(model: &KvModel, extended: bool) -> Vec<Artifact> {
        let structs = &model.structs;
        let mut artifacts = vec![
            Artifact::new(Target::Firmware, HEADER_PATH, Style::C, render_header(model)),
            Artifact::new(Target::Firmware, KCONFIG_PATH, Style::Plain, render_kconfig(model)),
            Artifact::new(
                Target::Host,
                format!("{}.py", HOST_MODULE),
                Style::Plain,
                render_python(&HostModule::base(HOST_MODULE, structs), model),
            ),
        ];
        if extended {
            artifacts.push(Artifact::new(
                Target::Host,
                format!("{}.py", HOST_EXT_MODULE),
                Style::Plain,
                render_python(&HostModule::extension(HOST_EXT_MODULE, HOST_MODULE, structs), model),
            ));
        }
        artifacts
    }
}

pub fn compile(document: &KvDocument) -> Result<KvModel, CloudgenError> {
    let family = Family::Kv;
    let structs = compile_structs(family, &document.structs, None)?;
    verify_unique_names(family, document.definitions.iter().map(|(id, d)| (id, d.name.as_str())))?;

    let tables = TypeTables { family, structs: &structs, enums: None };
    let mut definitions = Vec::with_capacity(document.definitions.len());

    for (id, entry) in document.definitions.iter() {
        verify_entry(family, id, &entry.name, entry.fields.len(), false)?;
        let owner = Owner { name: &entry.name, extension: entry.extension };
        let (fields, flexible) = normalize_fields(&tables, owner, &entry.fields)?;
        let flags = KvFlags {
            reflect:    entry.reflect,
            write_only: entry.write_only,
            read_only:  entry.read_only,
        };
        log::debug!("KV: key {} ({}) flags={}", id, entry.name, flags.c_expr());

        definitions.push(KvDefinition {
            id,
            name: entry.name.clone(),
            description: entry.description.clone(),
            fields,
            flexible,
            flags,
            range: entry.range,
            default_enabled: entry.default,
            extension: entry.extension,
        });
    }

    let ranges: Vec<(u32, u32)> = definitions
        .iter()
        .map(|d| (d.id, d.range.unwrap_or(1)))
        .collect();
    verify_kv_ranges(&ranges)?;

    Ok(KvModel {
        structs: structs.into_values().collect(),
        definitions,
    })
}

fn c_struct_name(definition: &KvDefinition) -> String {
    format!("kv_{}", definition.name.to_lowercase())
}

fn c_key_name(definition: &KvDefinition) -> String {
    format!("KV_KEY_{}", definition.name.to_uppercase())
}

fn kconfig_symbol(definition: &KvDefinition) -> String {
    format!("KV_STORE_KEY_{}", definition.name.to_uppercase())
}

fn struct_var_macro(name: &str) -> String {
    format!("KV_STRUCT_{}_VAR", name.to_uppercase())
}

/// Member list with the variable length tail sized by the macro argument.
fn var_members(fields: &[Field]) -> Vec<String> {
    let Some((last, rest)) = fields.split_last() else {
        return Vec::new();
    };
    let mut lines = members(rest, false);
    match (&last.flexible_type, last.arity) {
        (Some(nested), _) => {
            lines.push(format!("\t{}(num) {};", struct_var_macro(nested), last.name))
        }
        (None, Arity::Flexible) => {
            lines.push(format!("\t{} {}[num];", last.ty.c_type(), last.name))
        }
        _ => lines.push(format!("\t{}", last.c_decl())),
    }
    lines
}

/// `#define <head>(num) struct { ... } __packed` for a flexible layout.
fn var_macro(head: &str, fields: &[Field]) -> Vec<String> {
    let mut body = vec!["\tstruct {".to_string()];
    body.extend(var_members(fields).into_iter().map(|m| format!("\t{}", m)));
    body.push("\t} __packed".to_string());
    macro_body(&format!("#define {}(num)", head), &body)
}

fn flexible_struct_macros(structs: &[Struct]) -> Vec<String> {
    let mut lines = Vec::new();
    for s in structs.iter().filter(|s| s.flexible) {
        let doc = format!("struct {} with a tail of num elements", s.name);
        lines.extend(doc_comment(Some(&doc), ""));
        lines.extend(var_macro(&struct_var_macro(&s.name), &s.fields));
        lines.push(String::new());
    }
    lines
}

fn slots_array(definitions: &[KvDefinition]) -> Vec<String> {
    let mut body = vec!["\tconst struct key_value_slot_definition name[] = {".to_string()];
    for definition in definitions {
        body.push(format!(
            "\t\tIF_ENABLED(CONFIG_{}, ({{.key = {}, .range = {}, .flags = {}}},))",
            kconfig_symbol(definition),
            definition.id,
            definition.range_val(),
            definition.flags.c_expr(),
        ));
    }
    body.push("\t}".to_string());
    macro_body("#define _KV_SLOTS_ARRAY_DEFINE(name)", &body)
}

pub fn render_header(model: &KvModel) -> String {
    let mut lines = header_open(
        HEADER_PATH,
        "KV store key types",
        &["stdint.h", "zephyr/sys/util.h", "zephyr/toolchain.h"],
    );

    lines.push(section("Slot flags"));
    lines.push(String::new());
    lines.extend(doc_comment(Some("Value is reflected to the cloud"), ""));
    lines.push(format!("#define {} BIT(0)", KV_FLAGS_REFLECT));
    lines.extend(doc_comment(Some("Value cannot be read remotely"), ""));
    lines.push(format!("#define {} BIT(1)", KV_FLAGS_WRITE_ONLY));
    lines.extend(doc_comment(Some("Value cannot be written remotely"), ""));
    lines.push(format!("#define {} BIT(2)", KV_FLAGS_READ_ONLY));
    lines.push(String::new());

    lines.extend(doc_comment(Some("Storage slot of one key or key range"), ""));
    lines.push("struct key_value_slot_definition {".to_string());
    lines.push("\tuint16_t key;".to_string());
    lines.push("\tuint8_t range;".to_string());
    lines.push("\tuint8_t flags;".to_string());
    lines.push("};".to_string());
    lines.push(String::new());

    lines.push("#define KV_KEY_TYPE(key)          _##key##_TYPE".to_string());
    lines.push("#define KV_KEY_TYPE_VAR(key, num) _##key##_VAR(num)".to_string());
    lines.push(String::new());

    lines.extend(struct_definitions(&model.structs));
    lines.extend(flexible_struct_macros(&model.structs));

    if !model.definitions.is_empty() {
        lines.push(section("Key definitions"));
        lines.push(String::new());
    }
    for definition in &model.definitions {
        let name = c_struct_name(definition);
        let key = c_key_name(definition);
        let only_flexible =
            definition.fields.len() == 1 && definition.fields[0].arity == Arity::Flexible;
        lines.extend(packed_struct(
            &name,
            definition.description.as_deref(),
            None,
            &definition.fields,
            only_flexible,
        ));
        lines.push(format!("#define {} {}", key, definition.id));
        lines.push(format!("#define _{}_TYPE struct {}", key, name));
        lines.push(format!("#define _{}_SIZE sizeof(struct {})", key, name));
        if definition.flexible {
            lines.extend(var_macro(&format!("_{}_VAR", key), &definition.fields));
        }
        lines.push(String::new());
    }

    lines.extend(slots_array(&model.definitions));
    lines.push(String::new());
    lines.extend(header_close(HEADER_PATH));
    lines.push(String::new());
    lines.join("\n")
}

pub fn render_kconfig(model: &KvModel) -> String {
    let mut options = Vec::new();
    for definition in &model.definitions {
        let symbol = kconfig_symbol(definition);
        let prompt = format!("Enable KV key {}", definition.name.to_uppercase());
        let mut option = KconfigOption::new(symbol.clone(), Kind::Bool, prompt);
        if definition.default_enabled {
            option.default = Some("y".to_string());
        }
        option.help = definition.description.clone();
        options.push(option);

        if let Some(range) = definition.range {
            let mut option = KconfigOption::new(
                format!("{}_RANGE", symbol),
                Kind::Int,
                format!("Number of {} keys", definition.name.to_uppercase()),
            );
            option.depends_on = Some(symbol);
            option.range = Some((1, range as i64));
            option.default = Some(range.to_string());
            options.push(option);
        }
    }
    fragment(&options)
}

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

pub fn render_python(module: &HostModule<'_>, model: &KvModel) -> String {
    let mut lines = module.preamble("KV store definitions", &["ctypes"]);
    lines.push(String::new());
    lines.extend(struct_classes(module, &model.structs, |_| ClassBody::default()));

    let definitions: Vec<&KvDefinition> =
        model.definitions.iter().filter(|d| module.includes(d.extension)).collect();

    lines.push("class slots:".to_string());
    if definitions.is_empty() {
        lines.push("    pass".to_string());
        lines.push(String::new());
    }
    for definition in &definitions {
        let attrs = vec![
            format!("NAME = {}", quote(&definition.name.to_uppercase())),
            format!("BASE_ID = {}", definition.id),
            format!("RANGE = {}", definition.range.unwrap_or(1)),
            format!("REFLECT = {}", py_bool(definition.flags.reflect)),
            format!("WRITE_ONLY = {}", py_bool(definition.flags.write_only)),
            format!("READ_ONLY = {}", py_bool(definition.flags.read_only)),
        ];
        lines.extend(struct_class(
            module,
            1,
            &definition.name.to_lowercase(),
            definition.description.as_deref(),
            &definition.fields,
            ClassBody { attrs, tail: Vec::new() },
        ));
    }
    lines.push(String::new());

    let mapping: Vec<(u32, String)> = definitions
        .iter()
        .map(|d| (d.id, format!("slots.{}", d.name.to_lowercase())))
        .collect();
    lines.extend(id_type_mapping(&mapping));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: serde_json::Value) -> KvDocument {
        serde_json::from_value(value).unwrap()
    }

    fn network_document() -> KvDocument {
        document(json!({
            "structs": {
                "kv_string": {"fields": [
                    {"name": "value_num", "type": "uint8_t"},
                    {"name": "value", "type": "char", "num": 0}
                ]}
            },
            "definitions": {
                "0": {"name": "REBOOTS", "description": "Reboot counter", "default": true, "read_only": true,
                      "fields": [{"name": "count", "type": "uint32_t"}]},
                "20": {"name": "WIFI_SSID", "write_only": true,
                       "fields": [{"name": "ssid", "type": "struct kv_string"}]},
                "30": {"name": "GEOFENCE", "range": 4, "reflect": true, "fields": [
                    {"name": "points_num", "type": "uint8_t"},
                    {"name": "points", "type": "int32_t", "num": 0}
                ]}
            }
        }))
    }

    #[test]
    fn test_flags_and_flexibility() {
        let model = compile(&network_document()).unwrap();
        let [reboots, ssid, geofence] = &model.definitions[..] else {
            panic!("expected three keys");
        };

        assert_eq!(reboots.flags.c_expr(), "KV_FLAGS_READ_ONLY");
        assert!(!reboots.flexible);
        assert_eq!(reboots.range_val(), "1");

        assert!(ssid.flexible);
        assert_eq!(ssid.fields[0].flexible_type.as_deref(), Some("kv_string"));

        assert!(geofence.flexible);
        assert_eq!(geofence.range_val(), "CONFIG_KV_STORE_KEY_GEOFENCE_RANGE");
    }

    #[test]
    fn test_header() {
        let model = compile(&network_document()).unwrap();
        let header = render_header(&model);

        assert!(header.contains("#define KV_KEY_REBOOTS 0\n"));
        assert!(header.contains("#define _KV_KEY_REBOOTS_TYPE struct kv_reboots\n"));
        assert!(header.contains("#define _KV_KEY_REBOOTS_SIZE sizeof(struct kv_reboots)\n"));
        assert!(!header.contains("_KV_KEY_REBOOTS_VAR"));

        assert!(header.contains(
            "#define KV_STRUCT_KV_STRING_VAR(num) \\\n\tstruct { \\\n\t\tuint8_t value_num; \\\n\t\tchar value[num]; \\\n\t} __packed\n"
        ));
        assert!(header.contains("\t\tKV_STRUCT_KV_STRING_VAR(num) ssid; \\\n"));
        assert!(header.contains("#define _KV_KEY_GEOFENCE_VAR(num) \\\n"));
        assert!(header.contains("\t\tint32_t points[num]; \\\n"));

        assert!(header.contains(
            "\t\tIF_ENABLED(CONFIG_KV_STORE_KEY_REBOOTS, ({.key = 0, .range = 1, .flags = KV_FLAGS_READ_ONLY},)) \\\n"
        ));
        assert!(header.contains(
            "({.key = 30, .range = CONFIG_KV_STORE_KEY_GEOFENCE_RANGE, .flags = KV_FLAGS_REFLECT},))"
        ));
    }

    #[test]
    fn test_no_flags_is_literal_zero() {
        let doc = document(json!({
            "definitions": {"7": {"name": "PLAIN", "fields": [{"name": "v", "type": "uint8_t"}]}}
        }));
        let header = render_header(&compile(&doc).unwrap());
        assert!(header.contains("({.key = 7, .range = 1, .flags = 0},)) \\\n"));
    }

    #[test]
    fn test_kconfig() {
        let model = compile(&network_document()).unwrap();
        let text = render_kconfig(&model);

        assert!(text.contains(
            "config KV_STORE_KEY_REBOOTS\n\tbool \"Enable KV key REBOOTS\"\n\tdefault y\n\thelp\n\t  Reboot counter\n"
        ));
        assert!(text.contains("config KV_STORE_KEY_WIFI_SSID\n\tbool \"Enable KV key WIFI_SSID\"\n\n"));
        assert!(text.contains(
            "config KV_STORE_KEY_GEOFENCE_RANGE\n\tint \"Number of GEOFENCE keys\"\n\tdepends on KV_STORE_KEY_GEOFENCE\n\trange 1 4\n\tdefault 4\n"
        ));
    }

    #[test]
    fn test_overlapping_range_rejected() {
        let doc = document(json!({
            "definitions": {
                "30": {"name": "A", "range": 4, "fields": [{"name": "v", "type": "uint8_t"}]},
                "32": {"name": "B", "fields": [{"name": "v", "type": "uint8_t"}]}
            }
        }));
        let err = compile(&doc).unwrap_err();
        assert!(matches!(
            err.as_violation(),
            Some(crate::error::Violation::OverlappingRange { id: 30, other: 32, .. })
        ));
    }

    #[test]
    fn test_python_slots() {
        let model = compile(&network_document()).unwrap();
        let text = render_python(&HostModule::base(HOST_MODULE, &model.structs), &model);

        assert!(text.contains("class kv_string(VLACompatLittleEndianStruct):\n"));
        assert!(text.contains("    vla_field = (\"value\", 0 * ctypes.c_char)\n"));
        assert!(text.contains("    class reboots(VLACompatLittleEndianStruct):\n"));
        assert!(text.contains("        BASE_ID = 30\n        RANGE = 4\n        REFLECT = True\n"));
        assert!(text.contains("        vla_field = (\"ssid\", kv_string)\n"));
        assert!(text.contains("    20: slots.wifi_ssid,\n"));
    }
}
