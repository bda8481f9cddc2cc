//! Derives the annotated [`Field`] model from raw document fields.
//!
//! Struct fields are annotated before any definition field, so that a
//! `struct X` reference can be resolved against the already annotated `X`
//! (and inherit its flexibility).

use cloudgen_schema::{Conversion, DisplayFmt, DisplayHint, RawField, RawStruct};
use indexmap::IndexMap;

use crate::{
    error::{CloudgenError, Violation},
    parser::{expect_identifier, parse_type, TypeRef},
    types::{Arity, DisplayFormat, Family, Field, FieldType, RpcEnum, Scalar, Struct},
    verifier::struct_order,
};

/// Types visible to the fields being normalized.
pub struct TypeTables<'a> {
    pub family:  Family,
    pub structs: &'a IndexMap<String, Struct>,
    /// Only the RPC family declares enums.
    pub enums:   Option<&'a IndexMap<String, RpcEnum>>,
}

/// The struct, definition or parameter list a field belongs to.
#[derive(Debug, Clone, Copy)]
pub struct Owner<'a> {
    pub name:      &'a str,
    pub extension: bool,
}

impl<'a> TypeTables<'a> {
    fn unknown(&self, owner: Owner<'_>, raw: &RawField) -> CloudgenError {
        CloudgenError::UnknownType {
            family:    self.family,
            owner:     owner.name.to_string(),
            field:     raw.name.clone(),
            type_name: raw.type_.clone(),
        }
    }

    /// Resolve the declared type, erasing enums to their storage type.
    fn resolve(&self, owner: Owner<'_>, raw: &RawField) -> Result<FieldType, CloudgenError> {
        match parse_type(&raw.type_) {
            TypeRef::Keyword(keyword) => Scalar::from_keyword(keyword)
                .map(FieldType::Scalar)
                .ok_or_else(|| self.unknown(owner, raw)),
            TypeRef::Struct(name) => {
                let target = self.structs.get(name).ok_or_else(|| self.unknown(owner, raw))?;
                if target.extension && !owner.extension {
                    return Err(CloudgenError::violation(
                        self.family,
                        Violation::BaseReferencesExtension {
                            owner:  owner.name.to_string(),
                            target: name.to_string(),
                        },
                    ));
                }
                Ok(FieldType::Struct(name.to_string()))
            }
            TypeRef::Enum(name) => self
                .enums
                .and_then(|enums| enums.get(name))
                .map(|e| FieldType::Scalar(e.storage))
                .ok_or_else(|| self.unknown(owner, raw)),
        }
    }

    fn struct_is_flexible(&self, ty: &FieldType) -> bool {
        match ty {
            FieldType::Struct(name) => self.structs.get(name).is_some_and(|s| s.flexible),
            FieldType::Scalar(_)    => false,
        }
    }
}

/// Annotate a single raw field.
pub fn normalize_field(
    tables: &TypeTables<'_>,
    owner:  Owner<'_>,
    raw:    &RawField,
) -> Result<Field, CloudgenError> {
    expect_identifier(tables.family, &raw.name)?;

    let ty = tables.resolve(owner, raw)?;
    let arity = Arity::from_num(raw.num);
    let nested_flexible = tables.struct_is_flexible(&ty);
    let flexible_type = if nested_flexible { ty_name(&ty) } else { None };

    let (py_name, conversion) = match (&raw.conversion, tables.family) {
        (Some(conv), Family::Tdf) => {
            (format!("_{}", raw.name), Some(conversion_formula(&raw.name, conv)))
        }
        _                         => (raw.name.clone(), None),
    };

    Ok(Field {
        name: raw.name.clone(),
        description: raw.description.clone(),
        array: arity.suffix(),
        flexible: arity == Arity::Flexible || nested_flexible,
        ty,
        arity,
        flexible_type,
        py_name,
        conversion,
        display: display_format(raw.display.as_ref()),
    })
}

fn ty_name(ty: &FieldType) -> Option<String> {
    match ty {
        FieldType::Struct(name) => Some(name.clone()),
        FieldType::Scalar(_)    => None,
    }
}

/// Annotate every field of one owner, returning the fields and whether the
/// owner is flexible.
pub fn normalize_fields(
    tables: &TypeTables<'_>,
    owner:  Owner<'_>,
    raw:    &[RawField],
) -> Result<(Vec<Field>, bool), CloudgenError> {
    let fields = raw
        .iter()
        .map(|f| normalize_field(tables, owner, f))
        .collect::<Result<Vec<_>, _>>()?;
    let flexible = fold_flexible(tables.family, owner.name, &fields)?;
    Ok((fields, flexible))
}

/// An owner is flexible iff its last field is. A flexible field anywhere
/// else, or a repeated field name, is rejected.
pub fn fold_flexible(family: Family, owner: &str, fields: &[Field]) -> Result<bool, CloudgenError> {
    for (i, field) in fields.iter().enumerate() {
        if fields[..i].iter().any(|f| f.name == field.name) {
            return Err(CloudgenError::violation(
                family,
                Violation::DuplicateField { owner: owner.to_string(), field: field.name.clone() },
            ));
        }
        if field.flexible && i + 1 != fields.len() {
            return Err(CloudgenError::violation(
                family,
                Violation::FlexibleNotLast { owner: owner.to_string(), field: field.name.clone() },
            ));
        }
    }
    Ok(fields.last().is_some_and(|f| f.flexible))
}

/// Annotate all structs of a document in dependency order.
pub fn compile_structs(
    family:  Family,
    structs: &IndexMap<String, RawStruct>,
    enums:   Option<&IndexMap<String, RpcEnum>>,
) -> Result<IndexMap<String, Struct>, CloudgenError> {
    let mut compiled: IndexMap<String, Struct> = IndexMap::new();

    for name in struct_order(family, structs)? {
        let raw = &structs[name];
        let tables = TypeTables { family, structs: &compiled, enums };
        let owner = Owner { name, extension: raw.extension };
        let (fields, flexible) = normalize_fields(&tables, owner, &raw.fields)?;
        log::debug!("{}: struct {} ({} fields, flexible={})", family, name, fields.len(), flexible);

        compiled.insert(
            name.to_string(),
            Struct {
                name: name.to_string(),
                description: raw.description.clone(),
                fields,
                flexible,
                extension: raw.extension,
            },
        );
    }
    Ok(compiled)
}

/// Python expression deriving the public value from the raw `self._<name>`.
pub fn conversion_formula(name: &str, conv: &Conversion) -> String {
    let mut expr = format!("self._{}", name);

    if let Some(order) = conv.int {
        expr = format!("int.from_bytes({}, byteorder='{}')", expr, order.as_str());
    }
    if let Some(m) = conv.m.as_ref().filter(|m| m.as_f64() != Some(1.0)) {
        expr.push_str(&format!(" * {}", m));
    }
    if let Some(c) = conv.c.as_ref().filter(|c| c.as_f64() != Some(0.0)) {
        expr.push_str(&format!(" + {}", c));
    }
    expr
}

/// Python format string and postfix for a display hint.
pub fn display_format(hint: Option<&DisplayHint>) -> DisplayFormat {
    let Some(hint) = hint else {
        return DisplayFormat::default();
    };

    let fmt = match (hint.fmt, hint.digits) {
        (Some(DisplayFmt::Hex), Some(d)) if d > 0   => format!("0x{{:0{}x}}", d),
        (Some(DisplayFmt::Hex), _)                  => "0x{:x}".to_string(),
        (Some(DisplayFmt::Float), Some(d)) if d > 0 => format!("{{:.{}f}}", d),
        _                                           => "{}".to_string(),
    };

    DisplayFormat {
        fmt,
        postfix: hint.postfix.clone().unwrap_or_default(),
    }
}
