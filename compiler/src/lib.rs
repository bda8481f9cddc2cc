//! cloudgen-compiler
//!
//! This crate implements:
//!  1) Merging of base and extension definition documents (ID ranges, name collisions),
//!  2) A verifier (identifiers, struct dependency order, recursive nesting, empty definitions),
//!  3) Field normalization into an annotated model (array suffixes, flexible
//!     propagation, enum erasure, conversion and display formulas),
//!  4) Rendering of C headers, the RPC runner, Kconfig fragments and Python bindings,
//!  5) The generation pipeline, artifact writer and formatter invocation,
//!  6) Error types (`CloudgenError`).

pub mod error;
pub mod types;
pub mod utils;
pub mod parser;
pub mod verifier;
pub mod normalizer;
pub mod merge;
pub mod gen_c;
pub mod gen_kconfig;
pub mod gen_python;
pub mod tdf;
pub mod kv;
pub mod rpc;
pub mod output;
pub mod formatter;
pub mod compiler;
pub mod traits;

pub use compiler::{generate, load_document, load_family, run, GeneratorConfig};
pub use error::{CloudgenError, Violation};
pub use formatter::{ClangFormat, Formatters, NoFormat, RuffFormat};
pub use kv::KvGenerator;
pub use merge::merge;
pub use output::{write_artifacts, Artifact, OutputLayout, Style, Target};
pub use rpc::RpcGenerator;
pub use tdf::TdfGenerator;
pub use traits::{FamilyDescriptor, Generator};
pub use types::Family;
