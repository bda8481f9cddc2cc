use indexmap::IndexMap;
use serde::Deserialize;

use crate::{field::RawField, table::IdTable};

/// Anything that can be tagged as sourced from an extension document.
pub trait Extensible {
    fn mark_extension(&mut self);
    fn is_extension(&self) -> bool;
}

/// Shape shared by the three family documents: named structs plus entries
/// keyed by numeric ID.
pub trait Document: Sized {
    type Entry: Extensible;

    fn structs(&self) -> &IndexMap<String, RawStruct>;
    fn structs_mut(&mut self) -> &mut IndexMap<String, RawStruct>;
    fn entries(&self) -> &IdTable<Self::Entry>;
    fn entries_mut(&mut self) -> &mut IdTable<Self::Entry>;

    /// Named items other than structs that must not collide between documents.
    fn extra_names(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Tag every item of `extra_names` as extension sourced.
    fn mark_extra_extension(&mut self) {}

    /// Move every struct, entry and extra item of `other` into `self`.
    fn absorb(&mut self, other: Self);
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawStruct {
    #[serde(default)]
    pub description: Option<String>,
    pub fields:      Vec<RawField>,
    #[serde(skip)]
    pub extension:   bool,
}

impl Extensible for RawStruct {
    fn mark_extension(&mut self) {
        self.extension = true;
    }

    fn is_extension(&self) -> bool {
        self.extension
    }
}

macro_rules! impl_extensible {
    ($($ty:ty),*) => {
        $(
            impl Extensible for $ty {
                fn mark_extension(&mut self) {
                    self.extension = true;
                }

                fn is_extension(&self) -> bool {
                    self.extension
                }
            }
        )*
    };
}

// ------------------------------------------------------------------------
// TDF

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TdfEntry {
    pub name:        String,
    #[serde(default)]
    pub description: Option<String>,
    pub fields:      Vec<RawField>,
    #[serde(skip)]
    pub extension:   bool,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TdfDocument {
    #[serde(default)]
    pub structs:     IndexMap<String, RawStruct>,
    #[serde(default)]
    pub definitions: IdTable<TdfEntry>,
}

// ------------------------------------------------------------------------
// KV store

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KvEntry {
    pub name:        String,
    #[serde(default)]
    pub description: Option<String>,
    pub fields:      Vec<RawField>,
    #[serde(default)]
    pub reflect:     bool,
    #[serde(default)]
    pub write_only:  bool,
    #[serde(default)]
    pub read_only:   bool,
    /// Number of consecutive keys reserved, configurable through Kconfig.
    #[serde(default)]
    pub range:       Option<u32>,
    #[serde(default)]
    pub default:     bool,
    #[serde(skip)]
    pub extension:   bool,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct KvDocument {
    #[serde(default)]
    pub structs:     IndexMap<String, RawStruct>,
    #[serde(default)]
    pub definitions: IdTable<KvEntry>,
}

// ------------------------------------------------------------------------
// RPC

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawEnumValue {
    pub name:        String,
    pub value:       i64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawEnum {
    #[serde(default)]
    pub description: Option<String>,
    /// Underlying storage type, one of the scalar keywords.
    #[serde(rename = "type")]
    pub type_:       String,
    pub values:      Vec<RawEnumValue>,
    #[serde(skip)]
    pub extension:   bool,
}

/// Authentication level a command requires unless overridden in Kconfig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthLevel {
    #[default]
    Network,
    Device,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcEntry {
    pub name:            String,
    #[serde(default)]
    pub description:     Option<String>,
    #[serde(default)]
    pub default_auth:    AuthLevel,
    #[serde(default)]
    pub default:         bool,
    #[serde(default)]
    pub request_params:  Vec<RawField>,
    #[serde(default)]
    pub response_params: Vec<RawField>,
    #[serde(skip)]
    pub extension:       bool,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RpcDocument {
    #[serde(default)]
    pub structs:  IndexMap<String, RawStruct>,
    #[serde(default)]
    pub enums:    IndexMap<String, RawEnum>,
    #[serde(default)]
    pub commands: IdTable<RpcEntry>,
}

impl_extensible!(TdfEntry, KvEntry, RawEnum, RpcEntry);

macro_rules! impl_document {
    ($entry:ty, $entries:ident) => {
        fn structs(&self) -> &IndexMap<String, RawStruct> {
            &self.structs
        }

        fn structs_mut(&mut self) -> &mut IndexMap<String, RawStruct> {
            &mut self.structs
        }

        fn entries(&self) -> &IdTable<$entry> {
            &self.$entries
        }

        fn entries_mut(&mut self) -> &mut IdTable<$entry> {
            &mut self.$entries
        }
    };
}

impl Document for TdfDocument {
    type Entry = TdfEntry;

    impl_document!(TdfEntry, definitions);

    fn absorb(&mut self, other: Self) {
        self.structs.extend(other.structs);
        for (id, entry) in other.definitions {
            self.definitions.insert(id, entry);
        }
    }
}

impl Document for KvDocument {
    type Entry = KvEntry;

    impl_document!(KvEntry, definitions);

    fn absorb(&mut self, other: Self) {
        self.structs.extend(other.structs);
        for (id, entry) in other.definitions {
            self.definitions.insert(id, entry);
        }
    }
}

impl Document for RpcDocument {
    type Entry = RpcEntry;

    impl_document!(RpcEntry, commands);

    fn extra_names(&self) -> Vec<&str> {
        self.enums.keys().map(String::as_str).collect()
    }

    fn mark_extra_extension(&mut self) {
        for e in self.enums.values_mut() {
            e.mark_extension();
        }
    }

    fn absorb(&mut self, other: Self) {
        self.structs.extend(other.structs);
        self.enums.extend(other.enums);
        for (id, entry) in other.commands {
            self.commands.insert(id, entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_order_preserved() {
        let doc: TdfDocument = serde_json::from_str(
            r#"{"structs": {
                "zeta":  {"fields": [{"name": "a", "type": "uint8_t"}]},
                "alpha": {"fields": [{"name": "b", "type": "uint8_t"}]}
            }}"#,
        )
        .unwrap();
        let names: Vec<&String> = doc.structs.keys().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert!(doc.definitions.is_empty());
    }

    #[test]
    fn test_kv_defaults() {
        let doc: KvDocument = serde_json::from_str(
            r#"{"definitions": [
                {"id": 0, "name": "REBOOTS", "fields": [{"name": "count", "type": "uint32_t"}]}
            ]}"#,
        )
        .unwrap();
        let entry = doc.definitions.get(0).unwrap();
        assert!(!entry.reflect && !entry.write_only && !entry.read_only);
        assert_eq!(entry.range, None);
        assert!(!entry.extension);
    }

    #[test]
    fn test_rpc_missing_params() {
        let doc: RpcDocument = serde_json::from_str(
            r#"{"commands": {"1": {"name": "reboot", "default_auth": "device"}}}"#,
        )
        .unwrap();
        let cmd = doc.commands.get(1).unwrap();
        assert!(cmd.request_params.is_empty());
        assert!(cmd.response_params.is_empty());
        assert_eq!(cmd.default_auth, AuthLevel::Device);
    }

    #[test]
    fn test_bad_entry_reports_id() {
        let err = serde_json::from_str::<RpcDocument>(
            r#"{"commands": {"7": {"name": "reboot", "default_auth": "admin"}}}"#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("ID 7"), "{}", message);
        assert!(message.contains("admin"), "{}", message);

        let err = serde_json::from_str::<TdfDocument>(r#"{"definitions": {"12": {"name": "x"}}}"#)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("ID 12"), "{}", message);
        assert!(message.contains("fields"), "{}", message);
    }

    #[test]
    fn test_absorb_rpc() {
        let mut base: RpcDocument = serde_json::from_str(
            r#"{"enums": {"rpc_enum_a": {"type": "uint8_t", "values": []}}}"#,
        )
        .unwrap();
        let ext: RpcDocument = serde_json::from_str(
            r#"{"enums": {"rpc_enum_b": {"type": "uint8_t", "values": []}},
                "commands": {"40000": {"name": "custom"}}}"#,
        )
        .unwrap();
        base.absorb(ext);
        assert_eq!(base.extra_names(), vec!["rpc_enum_a", "rpc_enum_b"]);
        assert!(base.commands.contains(40000));
    }
}
