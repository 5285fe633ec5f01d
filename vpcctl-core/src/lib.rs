//! vpcctl Core
//!
//! Record types, the network provider seam and the provisioning order for
//! VPC and subnet resource groups

pub mod provider;
pub mod provisioner;
pub mod record;
pub mod resource;
pub mod validation;
