use crate::{
    error::{CloudgenError, Violation},
    types::Family,
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref TYPE_REF:   Regex =
        Regex::new(r"^(struct|enum)\s+([A-Za-z_][A-Za-z0-9_]*)$").unwrap();
}

/// A field type string as written in a definition document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef<'a> {
    Keyword(&'a str),
    Struct(&'a str),
    Enum(&'a str),
}

/// Split `"struct foo"` / `"enum bar"` / `"uint8_t"` into a [`TypeRef`].
///
/// Anything that is neither a reference nor a single identifier is returned
/// as a keyword and rejected later by the scalar lookup.
pub fn parse_type(text: &str) -> TypeRef<'_> {
    let text = text.trim();
    match TYPE_REF.captures(text) {
        Some(caps) => {
            let name = caps.get(2).map_or("", |m| m.as_str());
            match caps.get(1).map(|m| m.as_str()) {
                Some("struct") => TypeRef::Struct(name),
                _              => TypeRef::Enum(name),
            }
        }
        None => TypeRef::Keyword(text),
    }
}

pub fn is_identifier(text: &str) -> bool {
    IDENTIFIER.is_match(text)
}

/// Returns `Err(SchemaViolation)` if `text` cannot be used as a C identifier.
pub fn expect_identifier(family: Family, text: &str) -> Result<(), CloudgenError> {
    if is_identifier(text) {
        Ok(())
    } else {
        Err(CloudgenError::violation(family, Violation::InvalidIdentifier(text.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_keyword() {
        assert_eq!(parse_type("uint16_t"), TypeRef::Keyword("uint16_t"));
        assert_eq!(parse_type(" char "), TypeRef::Keyword("char"));
    }

    #[test]
    fn test_parse_type_references() {
        assert_eq!(parse_type("struct tdf_struct_vec3"), TypeRef::Struct("tdf_struct_vec3"));
        assert_eq!(parse_type("enum  rpc_enum_result"), TypeRef::Enum("rpc_enum_result"));
    }

    #[test]
    fn test_parse_type_malformed() {
        assert_eq!(parse_type("struct"), TypeRef::Keyword("struct"));
        assert_eq!(parse_type("struct 9abc"), TypeRef::Keyword("struct 9abc"));
    }

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("_reboots2"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("has space"));
        assert!(expect_identifier(Family::Kv, "bad-name").is_err());
    }
}
