//! Application layer — port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain` and `agora_common` for its
//! contracts; services additionally drive `crate::infra` implementations
//! handed in by the command layer.

pub mod ports;
pub mod services;

#[allow(unused_imports)]
pub use ports::{
    CommandRunner, FoundPackage, InstallEvent, InstallPhase, PackageSource, ProgressReporter,
    SecretStore, StackProber,
};
