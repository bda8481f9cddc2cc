use cloudgen_schema::{Document, Extensible};

use crate::{
    error::{CloudgenError, Violation},
    types::Family,
};

/// Combine a base document with an optional extension document.
///
/// Neither document may declare an ID twice. Base IDs must not exceed
/// `threshold`, extension IDs must be strictly greater. Extension structs
/// (and enums) must not reuse a base name. Every extension item is tagged
/// `extension` before being moved into the base.
/// Any violation aborts the merge and nothing is returned.
pub fn merge<D: Document>(
    family:    Family,
    base:      D,
    extension: Option<D>,
    threshold: u32,
) -> Result<D, CloudgenError> {
    let mut base = base;

    let declared_twice = std::iter::once(&base).chain(extension.as_ref());
    if let Some(&id) = declared_twice.flat_map(|doc| doc.entries().duplicates()).next() {
        return Err(CloudgenError::violation(family, Violation::DuplicateId(id)));
    }

    for id in base.entries().ids() {
        if id > threshold {
            return Err(CloudgenError::violation(
                family,
                Violation::BaseIdInExtensionRange { id, threshold },
            ));
        }
    }

    let Some(mut extension) = extension else {
        return Ok(base);
    };

    for (id, entry) in extension.entries_mut().iter_mut() {
        if id <= threshold {
            return Err(CloudgenError::violation(
                family,
                Violation::ExtensionIdInBaseRange { id, threshold },
            ));
        }
        entry.mark_extension();
    }

    for (name, s) in extension.structs_mut().iter_mut() {
        if base.structs().contains_key(name) {
            return Err(CloudgenError::violation(family, Violation::DuplicateStruct(name.clone())));
        }
        s.mark_extension();
    }

    let base_extra = base.extra_names();
    if let Some(name) = extension.extra_names().into_iter().find(|n| base_extra.contains(n)) {
        return Err(CloudgenError::violation(family, Violation::DuplicateEnum(name.to_string())));
    }
    extension.mark_extra_extension();

    log::debug!(
        "{}: merging {} extension entries and {} extension structs",
        family,
        extension.entries().len(),
        extension.structs().len()
    );
    base.absorb(extension);
    Ok(base)
}
