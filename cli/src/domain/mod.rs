//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.
//! Package identity itself (kinds, ids, name grammar) lives in
//! `agora_common` so manifests can validate against it too.

pub mod config;
pub mod error;
pub mod launch;
pub mod mcp;
pub mod resolver;

#[allow(unused_imports)]
pub use config::{
    default_secret_provider, AgoraConfig, BinaryEntry, CachedTool, RuntimeEntry, SecretMeta,
    StackConfig, CONFIG_SCHEMA_VERSION,
};
#[allow(unused_imports)]
pub use error::{
    error_code, ConfigStoreError, DbError, InstallError, RegistryError, StackError,
};
#[allow(unused_imports)]
pub use launch::{bundled_runtime_bin, create_launch_config, LaunchConfig};
#[allow(unused_imports)]
pub use mcp::{build_mcp_config, parse_env_file, McpServerConfig};
#[allow(unused_imports)]
pub use resolver::{install_order, satisfies_version, ResolvedNode};
