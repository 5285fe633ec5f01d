//! Resource - Identifiers for remote resources and persisted resource groups

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for a remote resource, used to attribute provider errors
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource type (e.g., "vpc", "security_group")
    pub resource_type: String,
    /// Name given by the user (the `Name` tag)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// Kind of a persisted resource group
///
/// Each kind owns one record file per user-supplied name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Vpc,
    Subnet,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Vpc, ResourceKind::Subnet];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Vpc => "vpc",
            ResourceKind::Subnet => "subnet",
        }
    }

    /// Resolve the kind of a record file from its name prefix
    /// - "vpc_demo_config.json" -> Vpc
    /// - "subnet_web_config.json" -> Subnet
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| file_name.starts_with(kind.as_str()))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_display() {
        let id = ResourceId::new("security_group", "web-sg");
        assert_eq!(id.to_string(), "security_group.web-sg");
    }

    #[test]
    fn kind_from_file_name_uses_prefix() {
        assert_eq!(
            ResourceKind::from_file_name("vpc_demo_config.json"),
            Some(ResourceKind::Vpc)
        );
        assert_eq!(
            ResourceKind::from_file_name("subnet_public_a_config.json"),
            Some(ResourceKind::Subnet)
        );
        assert_eq!(ResourceKind::from_file_name("route_table.json"), None);
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&ResourceKind::Subnet).unwrap();
        assert_eq!(json, "\"subnet\"");
    }
}
