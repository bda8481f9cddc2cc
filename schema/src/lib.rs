//! Input model for the three definition families consumed by `cloudgen`.
//!
//! Each family is described by one JSON document (plus an optional extension
//! document of the same shape):
//!
//! ```
//! use cloudgen_schema::TdfDocument;
//!
//! let doc: TdfDocument = serde_json::from_str(r#"{
//!     "structs": {
//!         "tdf_struct_vec3": {"fields": [
//!             {"name": "x", "type": "int16_t"},
//!             {"name": "y", "type": "int16_t"},
//!             {"name": "z", "type": "int16_t"}
//!         ]}
//!     },
//!     "definitions": {
//!         "10": {
//!             "name": "position",
//!             "fields": [{"name": "pos", "type": "struct tdf_struct_vec3"}]
//!         }
//!     }
//! }"#).unwrap();
//!
//! assert_eq!(doc.definitions.get(10).unwrap().name, "position");
//! ```
//!
//! The model is a faithful image of the JSON. Derived attributes (array
//! suffixes, flexibility, host types) are computed by the compiler into a
//! separate annotated model; nothing here is mutated after loading except the
//! `extension` tag applied while merging.

pub mod document;
pub mod field;
pub mod table;

pub use document::*;
pub use field::*;
pub use table::*;
