use cloudgen_schema::Document;
use serde::de::DeserializeOwned;

use crate::{error::CloudgenError, output::Artifact, types::Family};

/// Constants that differ between the schema families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyDescriptor {
    pub family:       Family,
    /// Highest ID available to base documents. Extension IDs start above it.
    pub id_threshold: u32,
    /// File name of the document, in both the base and extension directories.
    pub schema_file:  &'static str,
}

/// One schema family: how its merged document is compiled into an annotated
/// model, and how that model is rendered.
///
/// Both steps are pure. `compile` reports every schema problem, so `render`
/// cannot fail.
pub trait Generator {
    type Document: Document + DeserializeOwned;
    type Model;

    const DESCRIPTOR: FamilyDescriptor;

    fn compile(document: &Self::Document) -> Result<Self::Model, CloudgenError>;

    /// `extended` is set when an extension document took part in the merge,
    /// which splits the host bindings into a base and an extension module.
    fn render(model: &Self::Model, extended: bool) -> Vec<Artifact>;
}
