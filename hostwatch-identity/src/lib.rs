//! Host identity resolution.
//!
//! A host can be known by several identifiers at once: a cloud instance id,
//! a user-configured display name, its short and fully-qualified hostnames.
//! This crate picks the canonical [`EntityKey`](hostwatch_types::EntityKey)
//! among them and publishes it to every subsystem that tags outbound data.
//!
//! # Resolution order
//!
//! 1. `instance-id`
//! 2. `azure_vm_id`
//! 3. `gcp_vm_id`
//! 4. `alibaba_vm_id`
//! 5. `display_name`
//! 6. `hostname_short`
//! 7. `hostname`
//!
//! The first non-empty value wins. Empty values are treated as absent.

mod error;
mod host_alias;
mod local;
mod resolver;
mod source_map;

pub use error::{IdentityError, IdentityResult};
pub use host_alias::HostAlias;
pub use local::{local_identity_sources, short_hostname};
pub use resolver::IdentityResolver;
pub use source_map::{resolve_entity_key, IdentitySourceMap};
