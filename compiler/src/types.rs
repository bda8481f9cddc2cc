use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Tdf,
    Kv,
    Rpc,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Family::Tdf => "TDF",
            Family::Kv  => "KV",
            Family::Rpc => "RPC",
        })
    }
}

/// Fixed width scalar keywords accepted as field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Char,
    Float,
}

pub const SCALAR_KEYWORDS: [(&str, Scalar); 10] = [
    ("uint8_t",  Scalar::U8),
    ("uint16_t", Scalar::U16),
    ("uint32_t", Scalar::U32),
    ("uint64_t", Scalar::U64),
    ("int8_t",   Scalar::I8),
    ("int16_t",  Scalar::I16),
    ("int32_t",  Scalar::I32),
    ("int64_t",  Scalar::I64),
    ("char",     Scalar::Char),
    ("float",    Scalar::Float),
];

impl Scalar {
    pub fn from_keyword(keyword: &str) -> Option<Scalar> {
        SCALAR_KEYWORDS
            .iter()
            .find(|(k, _)| *k == keyword)
            .map(|(_, s)| *s)
    }

    pub fn c_name(&self) -> &'static str {
        SCALAR_KEYWORDS
            .iter()
            .find(|(_, s)| s == self)
            .map(|(k, _)| *k)
            .unwrap_or("uint8_t")
    }

    /// The `ctypes` equivalent used by the host bindings.
    pub fn ctype(&self) -> &'static str {
        match self {
            Scalar::U8    => "ctypes.c_uint8",
            Scalar::U16   => "ctypes.c_uint16",
            Scalar::U32   => "ctypes.c_uint32",
            Scalar::U64   => "ctypes.c_uint64",
            Scalar::I8    => "ctypes.c_int8",
            Scalar::I16   => "ctypes.c_int16",
            Scalar::I32   => "ctypes.c_int32",
            Scalar::I64   => "ctypes.c_int64",
            Scalar::Char  => "ctypes.c_char",
            Scalar::Float => "ctypes.c_float",
        }
    }

    pub fn is_integer(&self) -> bool {
        !matches!(self, Scalar::Char | Scalar::Float)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Scalar(Scalar),
    /// Reference to another struct of the same family, by C name.
    Struct(String),
}

impl FieldType {
    pub fn c_type(&self) -> String {
        match self {
            FieldType::Scalar(s) => s.c_name().to_string(),
            FieldType::Struct(n) => format!("struct {}", n),
        }
    }
}

/// Repeat count of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Single,
    /// Trailing variable length array (`num == 0`).
    Flexible,
    Fixed(u32),
}

impl Arity {
    pub fn from_num(num: Option<u32>) -> Arity {
        match num {
            None    => Arity::Single,
            Some(0) => Arity::Flexible,
            Some(n) => Arity::Fixed(n),
        }
    }

    pub fn suffix(&self) -> String {
        match self {
            Arity::Single   => String::new(),
            Arity::Flexible => "[]".to_string(),
            Arity::Fixed(n) => format!("[{}]", n),
        }
    }
}

/// Python format string and postfix used when displaying a decoded field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFormat {
    pub fmt:     String,
    pub postfix: String,
}

impl Default for DisplayFormat {
    fn default() -> Self {
        DisplayFormat {
            fmt:     "{}".to_string(),
            postfix: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name:          String,
    pub description:   Option<String>,
    pub ty:            FieldType,
    pub arity:         Arity,
    /// `""`, `"[]"` or `"[N]"`.
    pub array:         String,
    pub flexible:      bool,
    /// Set when the field is flexible because its struct type is.
    pub flexible_type: Option<String>,
    /// Attribute name of the raw value in the host bindings.
    pub py_name:       String,
    /// Derived value expression, present when a conversion was requested.
    pub conversion:    Option<String>,
    pub display:       DisplayFormat,
}

impl Field {
    pub fn struct_ref(&self) -> Option<&str> {
        match &self.ty {
            FieldType::Struct(name) => Some(name),
            FieldType::Scalar(_)    => None,
        }
    }

    /// Host binding type, qualifying struct references with `prefix`.
    pub fn py_type(&self, prefix: Option<&str>) -> String {
        let base = match (&self.ty, prefix) {
            (FieldType::Scalar(s), _)         => s.ctype().to_string(),
            (FieldType::Struct(n), Some(pre)) => format!("{}.{}", pre, n),
            (FieldType::Struct(n), None)      => n.clone(),
        };
        match self.arity {
            Arity::Single   => base,
            Arity::Flexible => format!("0 * {}", base),
            Arity::Fixed(n) => format!("{} * {}", n, base),
        }
    }

    /// C member declaration without indentation, e.g. `uint8_t data[4];`.
    pub fn c_decl(&self) -> String {
        format!("{} {}{};", self.ty.c_type(), self.name, self.array)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Struct {
    pub name:        String,
    pub description: Option<String>,
    pub fields:      Vec<Field>,
    pub flexible:    bool,
    pub extension:   bool,
}

// ------------------------------------------------------------------------
// TDF

#[derive(Debug, Clone, PartialEq)]
pub struct TdfDefinition {
    pub id:            u32,
    pub name:          String,
    pub description:   Option<String>,
    pub fields:        Vec<Field>,
    /// Exactly one field, and it is the trailing variable length array.
    pub only_flexible: bool,
    pub extension:     bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TdfModel {
    pub structs:     Vec<Struct>,
    pub definitions: Vec<TdfDefinition>,
}

// ------------------------------------------------------------------------
// KV store

pub const KV_FLAGS_REFLECT:    &str = "KV_FLAGS_REFLECT";
pub const KV_FLAGS_WRITE_ONLY: &str = "KV_FLAGS_WRITE_ONLY";
pub const KV_FLAGS_READ_ONLY:  &str = "KV_FLAGS_READ_ONLY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KvFlags {
    pub reflect:    bool,
    pub write_only: bool,
    pub read_only:  bool,
}

impl KvFlags {
    pub fn symbols(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.reflect {
            flags.push(KV_FLAGS_REFLECT);
        }
        if self.write_only {
            flags.push(KV_FLAGS_WRITE_ONLY);
        }
        if self.read_only {
            flags.push(KV_FLAGS_READ_ONLY);
        }
        flags
    }

    /// C initializer: the OR of the set flags, or the literal `0`.
    pub fn c_expr(&self) -> String {
        let flags = self.symbols();
        if flags.is_empty() {
            "0".to_string()
        } else {
            flags.join(" | ")
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KvDefinition {
    pub id:              u32,
    pub name:            String,
    pub description:     Option<String>,
    pub fields:          Vec<Field>,
    pub flexible:        bool,
    pub flags:           KvFlags,
    /// Default number of keys when the range is configurable.
    pub range:           Option<u32>,
    pub default_enabled: bool,
    pub extension:       bool,
}

impl KvDefinition {
    /// Range initializer: `1`, or the Kconfig symbol carrying the override.
    pub fn range_val(&self) -> String {
        match self.range {
            Some(_) => format!("CONFIG_KV_STORE_KEY_{}_RANGE", self.name.to_uppercase()),
            None    => "1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct KvModel {
    pub structs:     Vec<Struct>,
    pub definitions: Vec<KvDefinition>,
}

// ------------------------------------------------------------------------
// RPC

#[derive(Debug, Clone, PartialEq)]
pub struct RpcEnumValue {
    pub name:        String,
    pub value:       i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcEnum {
    pub name:        String,
    pub description: Option<String>,
    pub storage:     Scalar,
    pub values:      Vec<RpcEnumValue>,
    pub extension:   bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcCommand {
    pub id:              u32,
    pub name:            String,
    pub description:     Option<String>,
    /// Default of `CONFIG_INFUSE_RPC_COMMAND_<NAME>_REQUIRED_AUTH`.
    pub required_auth:   u8,
    pub default_enabled: bool,
    pub request:         Vec<Field>,
    pub response:        Vec<Field>,
    pub extension:       bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RpcModel {
    pub enums:    Vec<RpcEnum>,
    pub structs:  Vec<Struct>,
    pub commands: Vec<RpcCommand>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_suffix() {
        assert_eq!(Arity::from_num(None).suffix(), "");
        assert_eq!(Arity::from_num(Some(0)).suffix(), "[]");
        assert_eq!(Arity::from_num(Some(16)).suffix(), "[16]");
    }

    #[test]
    fn test_scalar_table_round_trips() {
        for (keyword, scalar) in SCALAR_KEYWORDS {
            assert_eq!(Scalar::from_keyword(keyword), Some(scalar));
            assert_eq!(scalar.c_name(), keyword);
        }
        assert_eq!(Scalar::from_keyword("double"), None);
        assert!(!Scalar::Float.is_integer());
    }

    #[test]
    fn test_kv_flags() {
        assert_eq!(KvFlags::default().c_expr(), "0");
        let all = KvFlags { reflect: true, write_only: true, read_only: true };
        assert_eq!(all.c_expr(), "KV_FLAGS_REFLECT | KV_FLAGS_WRITE_ONLY | KV_FLAGS_READ_ONLY");
        let ro = KvFlags { read_only: true, ..Default::default() };
        assert_eq!(ro.c_expr(), "KV_FLAGS_READ_ONLY");
    }
}
