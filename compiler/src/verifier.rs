use std::collections::HashMap;

use cloudgen_schema::RawStruct;
use indexmap::IndexMap;

use crate::{
    error::{CloudgenError, Violation},
    parser::{expect_identifier, parse_type, TypeRef},
    types::Family,
};

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    InProgress,
    Done,
}

/// Struct names in emission order: every struct follows the structs it
/// embeds, otherwise document order is kept.
///
/// Returns `Err(SchemaViolation)` for invalid names and recursive nesting.
/// References to unknown structs are left for the normalizer to report.
pub fn struct_order(
    family:  Family,
    structs: &IndexMap<String, RawStruct>,
) -> Result<Vec<&str>, CloudgenError> {
    for name in structs.keys() {
        expect_identifier(family, name)?;
    }

    fn visit<'a>(
        family:  Family,
        name:    &'a str,
        structs: &'a IndexMap<String, RawStruct>,
        state:   &mut HashMap<&'a str, Visit>,
        order:   &mut Vec<&'a str>,
    ) -> Result<(), CloudgenError> {
        let Some((key, definition)) = structs.get_key_value(name) else {
            return Ok(());
        };
        match state.get(name) {
            Some(Visit::InProgress) => {
                return Err(CloudgenError::violation(
                    family,
                    Violation::RecursiveStruct(name.to_string()),
                ))
            }
            Some(Visit::Done) => return Ok(()),
            None => {}
        }

        state.insert(key, Visit::InProgress);
        for field in &definition.fields {
            if let TypeRef::Struct(target) = parse_type(&field.type_) {
                visit(family, target, structs, state, order)?;
            }
        }
        state.insert(key, Visit::Done);
        order.push(key);
        Ok(())
    }

    let mut state = HashMap::new();
    let mut order = Vec::with_capacity(structs.len());
    for name in structs.keys() {
        visit(family, name, structs, &mut state, &mut order)?;
    }
    Ok(order)
}

/// IDs travel as `uint16_t` on the wire.
pub const MAX_ID: u32 = u16::MAX as u32;

/// Slot ranges are stored in a `uint8_t`.
pub const MAX_KV_RANGE: u32 = u8::MAX as u32;

/// Checks shared by every definition / command entry.
pub fn verify_entry(
    family:      Family,
    id:          u32,
    name:        &str,
    field_count: usize,
    allow_empty: bool,
) -> Result<(), CloudgenError> {
    expect_identifier(family, name)?;
    if id > MAX_ID {
        return Err(CloudgenError::violation(family, Violation::IdTooLarge(id)));
    }
    if field_count == 0 && !allow_empty {
        return Err(CloudgenError::violation(
            family,
            Violation::EmptyDefinition { id, name: name.to_string() },
        ));
    }
    Ok(())
}

/// Entry names become C symbols, so they must be unique ignoring case.
pub fn verify_unique_names<'a>(
    family: Family,
    names:  impl Iterator<Item = (u32, &'a str)>,
) -> Result<(), CloudgenError> {
    let mut seen: HashMap<String, u32> = HashMap::new();
    for (id, name) in names {
        if let Some(first) = seen.insert(name.to_uppercase(), id) {
            return Err(CloudgenError::violation(
                family,
                Violation::DuplicateName { name: name.to_string(), first, second: id },
            ));
        }
    }
    Ok(())
}

/// A KV key with a range occupies the IDs `id..id + range`. Those IDs must
/// not be claimed by any other key.
pub fn verify_kv_ranges(keys: &[(u32, u32)]) -> Result<(), CloudgenError> {
    for &(id, range) in keys {
        if range == 0 || range > MAX_KV_RANGE {
            return Err(CloudgenError::violation(Family::Kv, Violation::InvalidRange { id, range }));
        }
        let end = id + range;
        if let Some(&(other, _)) = keys.iter().find(|(other, _)| *other > id && *other < end) {
            return Err(CloudgenError::violation(
                Family::Kv,
                Violation::OverlappingRange { id, range, other },
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn structs(value: serde_json::Value) -> IndexMap<String, RawStruct> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_order_keeps_document_order() {
        let doc = structs(json!({
            "b": {"fields": [{"name": "x", "type": "uint8_t"}]},
            "a": {"fields": [{"name": "x", "type": "uint8_t"}]}
        }));
        assert_eq!(struct_order(Family::Tdf, &doc).unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn test_order_dependencies_first() {
        let doc = structs(json!({
            "pose":  {"fields": [
                {"name": "pos", "type": "struct vec3"},
                {"name": "rot", "type": "struct quat"}
            ]},
            "quat":  {"fields": [{"name": "w", "type": "float"}]},
            "vec3":  {"fields": [{"name": "x", "type": "float"}]}
        }));
        assert_eq!(struct_order(Family::Tdf, &doc).unwrap(), vec!["vec3", "quat", "pose"]);
    }

    #[test]
    fn test_recursive_nesting_rejected() {
        let doc = structs(json!({
            "a": {"fields": [{"name": "b", "type": "struct b"}]},
            "b": {"fields": [{"name": "a", "type": "struct a", "num": 2}]}
        }));
        let err = struct_order(Family::Rpc, &doc).unwrap_err();
        assert!(matches!(err.as_violation(), Some(Violation::RecursiveStruct(_))));
    }

    #[test]
    fn test_invalid_struct_name() {
        let doc = structs(json!({"not valid": {"fields": []}}));
        let err = struct_order(Family::Kv, &doc).unwrap_err();
        assert_eq!(
            err.as_violation(),
            Some(&Violation::InvalidIdentifier("not valid".to_string()))
        );
    }

    #[test]
    fn test_verify_entry() {
        assert!(verify_entry(Family::Tdf, 1, "announce", 3, false).is_ok());
        assert!(verify_entry(Family::Rpc, 1, "reboot", 0, true).is_ok());

        let err = verify_entry(Family::Tdf, 7, "empty", 0, false).unwrap_err();
        assert_eq!(
            err.as_violation(),
            Some(&Violation::EmptyDefinition { id: 7, name: "empty".to_string() })
        );

        let err = verify_entry(Family::Kv, 70000, "big", 1, false).unwrap_err();
        assert_eq!(err.as_violation(), Some(&Violation::IdTooLarge(70000)));
    }

    #[test]
    fn test_kv_ranges() {
        assert!(verify_kv_ranges(&[(10, 1), (20, 4), (24, 1)]).is_ok());

        let err = verify_kv_ranges(&[(20, 4), (22, 1)]).unwrap_err();
        assert_eq!(
            err.as_violation(),
            Some(&Violation::OverlappingRange { id: 20, range: 4, other: 22 })
        );

        let err = verify_kv_ranges(&[(5, 0)]).unwrap_err();
        assert_eq!(err.as_violation(), Some(&Violation::InvalidRange { id: 5, range: 0 }));
        assert!(verify_kv_ranges(&[(5, 256)]).is_err());
    }

    #[test]
    fn test_unique_names() {
        assert!(verify_unique_names(Family::Kv, [(1, "A"), (2, "B")].into_iter()).is_ok());
        let names = [(1, "reboots"), (2, "REBOOTS")];
        let err = verify_unique_names(Family::Kv, names.into_iter()).unwrap_err();
        assert!(matches!(
            err.as_violation(),
            Some(Violation::DuplicateName { first: 1, second: 2, .. })
        ));
    }
}
