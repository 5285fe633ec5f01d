//! vpcctl State Management
//!
//! This crate persists one JSON record per provisioned resource group in a
//! local directory, so that later commands can find a group by the name the
//! user gave it.
//!
//! # Overview
//!
//! - **config_file_name**: maps a resource kind and name to a file name
//! - **LocalStore**: reads, writes, lists and removes record files
//! - **StoreError**: missing, malformed or conflicting record files
//!
//! # Example
//!
//! ```ignore
//! use vpcctl_core::resource::ResourceKind;
//! use vpcctl_state::LocalStore;
//!
//! let store = LocalStore::open("./params")?;
//! store.ensure_available(ResourceKind::Vpc, "demo")?;
//!
//! // ... provision the VPC group into `record` ...
//!
//! store.save(&record.into())?;
//! let vpc = store.load_vpc("demo")?;
//! store.remove(ResourceKind::Vpc, "demo")?;
//! ```

pub mod error;
pub mod naming;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use naming::config_file_name;
pub use store::LocalStore;
