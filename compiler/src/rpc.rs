//! Remote procedure call commands.

use cloudgen_schema::{AuthLevel, RawEnum, RpcDocument};
use indexmap::IndexMap;

use crate::{
    error::CloudgenError,
    gen_c::{
        doc_comment, file_banner, header_close, header_open, packed_struct, section,
        struct_definitions,
    },
    gen_kconfig::{fragment, KconfigOption, Kind},
    gen_python::{id_type_mapping, struct_class, struct_classes, ClassBody, HostModule},
    normalizer::{compile_structs, normalize_fields, Owner, TypeTables},
    output::{Artifact, Style, Target},
    parser::expect_identifier,
    traits::{FamilyDescriptor, Generator},
    types::{Family, RpcCommand, RpcEnum, RpcEnumValue, RpcModel, Scalar},
    utils::{comment_text, quote},
    verifier::{verify_entry, verify_unique_names},
};

pub const TYPES_PATH: &str = "include/infuse/rpc/types.h";
pub const COMMANDS_PATH: &str = "include/infuse/rpc/commands_impl.h";
pub const RUNNER_PATH: &str = "rpc_command_runner.c";
pub const KCONFIG_PATH: &str = "Kconfig.rpc_commands";
pub const HOST_MODULE: &str = "rpc_definitions";
pub const HOST_EXT_MODULE: &str = "rpc_definitions_ext";

pub const REQUEST_HEADER: &str = "infuse_rpc_req_header";
pub const RESPONSE_HEADER: &str = "infuse_rpc_rsp_header";

pub const AUTH_NETWORK: u8 = 1;
pub const AUTH_DEVICE: u8 = 2;

pub struct RpcGenerator;

impl Generator for RpcGenerator {
    type Document = RpcDocument;
    type Model = RpcModel;

    const DESCRIPTOR: FamilyDescriptor = FamilyDescriptor {
        family:       Family::Rpc,
        id_threshold: 32768,
        schema_file:  "rpc.json",
    };

    fn compile(document: &RpcDocument) -> Result<RpcModel, CloudgenError> {
        compile(document)
    }

    fn render(model: &RpcModel, extended: bool) -> Vec<Artifact> {
        let structs = &model.structs;
        let mut artifacts = vec![
            Artifact::new(Target::Firmware, TYPES_PATH, Style::C, render_types(model)),
            Artifact::new(Target::Firmware, COMMANDS_PATH, Style::C, render_commands(model)),
            Artifact::new(Target::Firmware, RUNNER_PATH, Style::C, render_runner(model)),
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

/// Resolve the storage type of an enum, which must be an integer keyword.
fn compile_enum(name: &str, raw: &RawEnum) -> Result<RpcEnum, CloudgenError> {
    let family = Family::Rpc;
    expect_identifier(family, name)?;

    let storage = Scalar::from_keyword(&raw.type_)
        .filter(Scalar::is_integer)
        .ok_or_else(|| CloudgenError::UnknownType {
            family,
            owner:     name.to_string(),
            field:     "type".to_string(),
            type_name: raw.type_.clone(),
        })?;

    let mut values = Vec::with_capacity(raw.values.len());
    for value in &raw.values {
        expect_identifier(family, &value.name)?;
        values.push(RpcEnumValue {
            name:        value.name.clone(),
            value:       value.value,
            description: value.description.clone(),
        });
    }

    Ok(RpcEnum {
        name: name.to_string(),
        description: raw.description.clone(),
        storage,
        values,
        extension: raw.extension,
    })
}

pub fn compile(document: &RpcDocument) -> Result<RpcModel, CloudgenError> {
    let family = Family::Rpc;

    let mut enums = IndexMap::new();
    for (name, raw) in &document.enums {
        enums.insert(name.clone(), compile_enum(name, raw)?);
    }

    let structs = compile_structs(family, &document.structs, Some(&enums))?;
    verify_unique_names(family, document.commands.iter().map(|(id, c)| (id, c.name.as_str())))?;

    let tables = TypeTables { family, structs: &structs, enums: Some(&enums) };
    let mut commands = Vec::with_capacity(document.commands.len());

    for (id, entry) in document.commands.iter() {
        let field_count = entry.request_params.len() + entry.response_params.len();
        verify_entry(family, id, &entry.name, field_count, true)?;

        let request_owner = format!("rpc_{}_request", entry.name);
        let response_owner = format!("rpc_{}_response", entry.name);
        let (request, _) = normalize_fields(
            &tables,
            Owner { name: &request_owner, extension: entry.extension },
            &entry.request_params,
        )?;
        let (response, _) = normalize_fields(
            &tables,
            Owner { name: &response_owner, extension: entry.extension },
            &entry.response_params,
        )?;
        log::debug!(
            "RPC: command {} ({}) {} request / {} response fields",
            id,
            entry.name,
            request.len(),
            response.len()
        );

        commands.push(RpcCommand {
            id,
            name: entry.name.clone(),
            description: entry.description.clone(),
            required_auth: match entry.default_auth {
                AuthLevel::Network => AUTH_NETWORK,
                AuthLevel::Device  => AUTH_DEVICE,
            },
            default_enabled: entry.default,
            request,
            response,
            extension: entry.extension,
        });
    }

    Ok(RpcModel {
        enums: enums.into_values().collect(),
        structs: structs.into_values().collect(),
        commands,
    })
}

fn lower(command: &RpcCommand) -> String {
    command.name.to_lowercase()
}

fn upper(command: &RpcCommand) -> String {
    command.name.to_uppercase()
}

fn kconfig_symbol(command: &RpcCommand) -> String {
    format!("INFUSE_RPC_COMMAND_{}", upper(command))
}

/// Request and response headers, unless the document declares its own.
fn builtin_headers(model: &RpcModel) -> Vec<String> {
    let declared = |name: &str| model.structs.iter().any(|s| s.name == name);
    let mut lines = Vec::new();

    if !declared(REQUEST_HEADER) {
        lines.extend(doc_comment(Some("Header at the start of every RPC request"), ""));
        lines.push(format!("struct {} {{", REQUEST_HEADER));
        lines.push("\t/** Identifier echoed in the response */".to_string());
        lines.push("\tuint32_t request_id;".to_string());
        lines.push("\t/** Command to run */".to_string());
        lines.push("\tuint16_t command_id;".to_string());
        lines.push("} __packed;".to_string());
        lines.push(String::new());
    }
    if !declared(RESPONSE_HEADER) {
        lines.extend(doc_comment(Some("Header at the start of every RPC response"), ""));
        lines.push(format!("struct {} {{", RESPONSE_HEADER));
        lines.push("\t/** Identifier of the request */".to_string());
        lines.push("\tuint32_t request_id;".to_string());
        lines.push("\t/** Command that was run */".to_string());
        lines.push("\tuint16_t command_id;".to_string());
        lines.push("\t/** Command result */".to_string());
        lines.push("\tint16_t return_code;".to_string());
        lines.push("} __packed;".to_string());
        lines.push(String::new());
    }
    lines
}

fn c_enum(e: &RpcEnum) -> Vec<String> {
    let mut lines = doc_comment(e.description.as_deref(), "");
    lines.push(format!("enum {} {{", e.name));
    for value in &e.values {
        lines.extend(doc_comment(value.description.as_deref(), "\t"));
        lines.push(format!("\t{} = {},", value.name, value.value));
    }
    lines.push("};".to_string());
    lines.push(String::new());
    lines
}

pub fn render_types(model: &RpcModel) -> String {
    let mut lines = header_open(TYPES_PATH, "RPC types", &["stdint.h", "zephyr/toolchain.h"]);
    lines.extend(builtin_headers(model));

    if !model.enums.is_empty() {
        lines.push(section("Enums"));
        lines.push(String::new());
    }
    for e in &model.enums {
        lines.extend(c_enum(e));
    }

    lines.extend(struct_definitions(&model.structs));

    if !model.commands.is_empty() {
        lines.push(section("Commands"));
        lines.push(String::new());
    }
    for command in &model.commands {
        let name = lower(command);
        lines.extend(doc_comment(command.description.as_deref(), ""));
        lines.push(format!("#define RPC_ID_{} {}", upper(command), command.id));
        lines.push(String::new());
        lines.extend(packed_struct(
            &format!("rpc_{}_request", name),
            Some(&format!("{} request parameters", name)),
            Some(&format!("struct {} header;", REQUEST_HEADER)),
            &command.request,
            false,
        ));
        lines.extend(packed_struct(
            &format!("rpc_{}_response", name),
            Some(&format!("{} response parameters", name)),
            Some(&format!("struct {} header;", RESPONSE_HEADER)),
            &command.response,
            false,
        ));
    }

    lines.extend(header_close(TYPES_PATH));
    lines.push(String::new());
    lines.join("\n")
}

pub fn render_commands(model: &RpcModel) -> String {
    let mut lines =
        header_open(COMMANDS_PATH, "RPC command implementations", &["zephyr/net/buf.h"]);
    for command in &model.commands {
        lines.push("/**".to_string());
        lines.push(format!(" * @brief Run the {} command", lower(command)));
        if let Some(description) = command.description.as_deref().filter(|d| !d.is_empty()) {
            lines.push(" *".to_string());
            lines.push(format!(" * {}", comment_text(description)));
        }
        lines.push(" *".to_string());
        lines.push(" * @param request Buffer holding the request".to_string());
        lines.push(" *".to_string());
        lines.push(" * @return Buffer holding the response".to_string());
        lines.push(" */".to_string());
        lines.push(format!(
            "struct net_buf *rpc_command_{}(struct net_buf *request);",
            lower(command)
        ));
        lines.push(String::new());
    }
    lines.extend(header_close(COMMANDS_PATH));
    lines.push(String::new());
    lines.join("\n")
}

/// One `case` per command, only compiled in when the command is enabled.
fn switch_cases(model: &RpcModel, body: impl Fn(&RpcCommand) -> Vec<String>) -> Vec<String> {
    let mut lines = Vec::new();
    for command in &model.commands {
        let symbol = kconfig_symbol(command);
        lines.push(format!("#ifdef CONFIG_{}", symbol));
        lines.push(format!("\tcase RPC_ID_{}:", upper(command)));
        lines.extend(body(command).into_iter().map(|l| format!("\t\t{}", l)));
        lines.push(format!("#endif /* CONFIG_{} */", symbol));
    }
    lines
}

pub fn render_runner(model: &RpcModel) -> String {
    let mut lines = file_banner("RPC command dispatch tables");
    lines.push("#include <errno.h>".to_string());
    lines.push("#include <stdint.h>".to_string());
    lines.push(String::new());
    lines.push("#include <zephyr/net/buf.h>".to_string());
    lines.push(String::new());
    lines.push("#include <infuse/rpc/commands_impl.h>".to_string());
    lines.push("#include <infuse/rpc/types.h>".to_string());
    lines.push(String::new());
    lines.push("#include \"server.h\"".to_string());
    lines.push(String::new());

    lines.push("int rpc_command_runner_required_auth(uint16_t command_id)".to_string());
    lines.push("{".to_string());
    lines.push("\tswitch (command_id) {".to_string());
    lines.extend(switch_cases(model, |command| {
        vec![format!("return CONFIG_{}_REQUIRED_AUTH;", kconfig_symbol(command))]
    }));
    lines.push("\tdefault:".to_string());
    lines.push("\t\treturn -ENOTSUP;".to_string());
    lines.push("\t}".to_string());
    lines.push("}".to_string());
    lines.push(String::new());

    lines.push(
        "struct net_buf *rpc_command_runner_dispatch(uint16_t command_id, struct net_buf *request)"
            .to_string(),
    );
    lines.push("{".to_string());
    lines.push("\tswitch (command_id) {".to_string());
    lines.extend(switch_cases(model, |command| {
        let name = lower(command);
        vec![
            format!("if (request->len < sizeof(struct rpc_{}_request)) {{", name),
            "\treturn rpc_response_simple_req(request, -EINVAL, NULL, 0);".to_string(),
            "}".to_string(),
            format!("return rpc_command_{}(request);", name),
        ]
    }));
    lines.push("\tdefault:".to_string());
    lines.push("\t\treturn rpc_response_simple_req(request, -ENOTSUP, NULL, 0);".to_string());
    lines.push("\t}".to_string());
    lines.push("}".to_string());
    lines.push(String::new());
    lines.join("\n")
}

pub fn render_kconfig(model: &RpcModel) -> String {
    let mut options = Vec::new();
    for command in &model.commands {
        let symbol = kconfig_symbol(command);
        let prompt = format!("Enable RPC command {}", lower(command));
        let mut option = KconfigOption::new(symbol.clone(), Kind::Bool, prompt);
        if command.default_enabled {
            option.default = Some("y".to_string());
        }
        option.help = command.description.clone();
        options.push(option);

        let mut auth = KconfigOption::new(
            format!("{}_REQUIRED_AUTH", symbol),
            Kind::Int,
            format!("Authentication required to run {}", lower(command)),
        );
        auth.depends_on = Some(symbol);
        auth.range = Some((0, AUTH_DEVICE as i64));
        auth.default = Some(command.required_auth.to_string());
        auth.help = Some(
            "0: No authentication\n1: Network authentication\n2: Device authentication".to_string(),
        );
        options.push(auth);
    }
    fragment(&options)
}

fn py_enum(e: &RpcEnum) -> Vec<String> {
    let mut lines = vec![format!("class {}(enum.IntEnum):", e.name)];
    if let Some(description) = e.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("    {}", quote(description)));
        lines.push(String::new());
    }
    if e.values.is_empty() {
        lines.push("    pass".to_string());
    }
    for value in &e.values {
        lines.push(format!("    {} = {}", value.name, value.value));
    }
    lines.push(String::new());
    lines.push(String::new());
    lines
}

fn py_command(module: &HostModule<'_>, command: &RpcCommand) -> Vec<String> {
    let mut lines = vec![format!("class {}:", lower(command))];
    if let Some(description) = command.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("    {}", quote(description)));
        lines.push(String::new());
    }
    lines.push(format!("    NAME = {}", quote(&lower(command))));
    lines.push(format!("    COMMAND_ID = {}", command.id));
    lines.push(format!("    AUTH_LEVEL = {}", command.required_auth));
    lines.push(String::new());
    for (name, fields) in [("request", &command.request), ("response", &command.response)] {
        lines.extend(struct_class(module, 1, name, None, fields, ClassBody::default()));
    }
    lines.push(String::new());
    lines
}

pub fn render_python(module: &HostModule<'_>, model: &RpcModel) -> String {
    let mut lines = module.preamble("RPC definitions", &["ctypes", "enum"]);
    lines.push(String::new());

    for e in model.enums.iter().filter(|e| module.includes(e.extension)) {
        lines.extend(py_enum(e));
    }
    lines.extend(struct_classes(module, &model.structs, |_| ClassBody::default()));

    let commands: Vec<&RpcCommand> = model
        .commands
        .iter()
        .filter(|c| module.includes(c.extension))
        .collect();
    for command in &commands {
        lines.extend(py_command(module, command));
    }

    let mapping: Vec<(u32, String)> = commands.iter().map(|c| (c.id, lower(c))).collect();
    lines.extend(id_type_mapping(&mapping));
    lines.join("\n")
}
