//! Core resolver and plan emitter for wiregen.

pub mod catalog;
pub mod emit;
pub mod error;
pub mod generator;
pub mod graph;
pub mod injector;
pub mod key;
pub mod options;
pub mod plan;
pub mod propagation;
pub mod provider;
pub mod resolver;

pub use catalog::{Catalog, CatalogBuilder};
pub use error::{Diagnostic, DiagnosticKind, Diagnostics, Result};
pub use generator::{GenerationReport, Generator, InjectorOutcome, prelude};
pub use injector::InjectorSpec;
pub use key::TypeKey;
pub use options::{GenerateOptions, UnusedScope};
pub use plan::ConstructionPlan;
pub use provider::{Provider, ProviderSet};
