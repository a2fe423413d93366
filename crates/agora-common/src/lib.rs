//! Shared types for the agora CLI.
//!
//! This crate carries everything that describes *what* a package is, without
//! any opinion on *how* it gets installed: package identity (`kind:name`
//! ids), the registry index schema, the three manifest schemas (stack,
//! prompt, runtime), the per-install manifest record, and prompt template
//! rendering. No I/O lives here — every function takes data in and returns
//! data out.

pub mod installed;
pub mod manifest;
pub mod package;
pub mod registry;
pub mod template;

pub use installed::{InstallSource, InstalledManifest};
pub use manifest::{
    ManifestError, PromptManifest, PromptVariable, RuntimeManifest, SecretRequirement,
    StackManifest, VariableType,
};
pub use package::{PackageError, PackageId, PackageKind};
pub use registry::{DownloadSpec, PackageDescriptor, RegistryIndex, Requires, SearchHit};
