use serde::Deserialize;
use serde_json::Number;

/// A single member of a struct, definition or command parameter list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawField {
    pub name:        String,
    /// Scalar keyword (`uint16_t`), `struct <Name>` or `enum <Name>`.
    #[serde(rename = "type")]
    pub type_:       String,
    /// Absent for scalars, `0` for a trailing variable length array.
    #[serde(default)]
    pub num:         Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub conversion:  Option<Conversion>,
    #[serde(default)]
    pub display:     Option<DisplayHint>,
}

/// Byte order used when the raw bytes of a field are reinterpreted as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ByteOrder::Little => "little",
            ByteOrder::Big    => "big",
        }
    }
}

/// Unit conversion applied by the host decoder: `int(raw) * m + c`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Conversion {
    #[serde(default, rename = "int")]
    pub int: Option<ByteOrder>,
    #[serde(default)]
    pub m:   Option<Number>,
    #[serde(default)]
    pub c:   Option<Number>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayFmt {
    Hex,
    Float,
}

/// How the host decoder should print a field.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DisplayHint {
    #[serde(default)]
    pub fmt:     Option<DisplayFmt>,
    #[serde(default)]
    pub digits:  Option<u32>,
    #[serde(default)]
    pub postfix: Option<String>,
}
