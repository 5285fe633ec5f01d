//! Records persisted for each provisioned resource group
//!
//! A record holds the inputs a command was run with plus the identifiers the
//! provider returned. Identifiers stay `None` until the matching create call
//! succeeds; a record is only written once every identifier is present.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resource::ResourceKind;
use crate::validation::{self, ValidationError};

/// Ports opened on a new security group when none are given
pub const DEFAULT_OPEN_PORTS: &[u16] = &[22, 80, 443];

/// Errors raised when a record does not describe a fully provisioned group
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// A post-creation identifier is absent
    #[error("{kind} record is missing identifier '{field}'")]
    MissingIdentifier {
        kind: ResourceKind,
        field: &'static str,
    },

    /// A stored input value no longer passes validation
    #[error("{kind} record has an invalid field: {source}")]
    InvalidField {
        kind: ResourceKind,
        #[source]
        source: ValidationError,
    },
}

fn require<'a>(
    kind: ResourceKind,
    field: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str, RecordError> {
    value
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(RecordError::MissingIdentifier { kind, field })
}

/// VPC resource group: the VPC, its security group and its internet gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcRecord {
    pub region: String,
    pub vpc_cidr: String,
    pub vpc_name: String,
    pub sg_name: String,
    pub igw_name: String,
    #[serde(default = "default_open_ports")]
    pub open_ports: Vec<u16>,
    pub vpc_id: Option<String>,
    pub sg_id: Option<String>,
    pub igw_id: Option<String>,
}

fn default_open_ports() -> Vec<u16> {
    DEFAULT_OPEN_PORTS.to_vec()
}

impl VpcRecord {
    /// Create a record that has not been provisioned yet
    pub fn new(
        region: impl Into<String>,
        vpc_cidr: impl Into<String>,
        vpc_name: impl Into<String>,
        sg_name: impl Into<String>,
        igw_name: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            vpc_cidr: vpc_cidr.into(),
            vpc_name: vpc_name.into(),
            sg_name: sg_name.into(),
            igw_name: igw_name.into(),
            open_ports: default_open_ports(),
            vpc_id: None,
            sg_id: None,
            igw_id: None,
        }
    }

    pub fn with_open_ports(mut self, open_ports: Vec<u16>) -> Self {
        self.open_ports = open_ports;
        self
    }

    pub fn require_vpc_id(&self) -> Result<&str, RecordError> {
        require(ResourceKind::Vpc, "vpc_id", &self.vpc_id)
    }

    pub fn require_sg_id(&self) -> Result<&str, RecordError> {
        require(ResourceKind::Vpc, "sg_id", &self.sg_id)
    }

    pub fn require_igw_id(&self) -> Result<&str, RecordError> {
        require(ResourceKind::Vpc, "igw_id", &self.igw_id)
    }

    /// Identifiers assigned so far, in creation order
    pub fn created_identifiers(&self) -> Vec<(&'static str, &str)> {
        [
            ("vpc_id", &self.vpc_id),
            ("sg_id", &self.sg_id),
            ("igw_id", &self.igw_id),
        ]
        .into_iter()
        .filter_map(|(field, id)| id.as_deref().map(|id| (field, id)))
        .collect()
    }

    /// Check that the record describes a fully provisioned VPC group
    pub fn validate(&self) -> Result<(), RecordError> {
        let invalid = |source| RecordError::InvalidField {
            kind: ResourceKind::Vpc,
            source,
        };
        validation::validate_resource_name("vpc_name", &self.vpc_name).map_err(invalid)?;
        validation::validate_cidr("vpc_cidr", &self.vpc_cidr).map_err(invalid)?;
        self.require_vpc_id()?;
        self.require_sg_id()?;
        self.require_igw_id()?;
        Ok(())
    }
}

/// Subnet resource group: the subnet, its route table and their association
///
/// The parent VPC's fields are copied in at creation time and flattened into
/// the same document, so removal never consults the VPC record again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetRecord {
    #[serde(flatten)]
    pub vpc: VpcRecord,
    pub subnet_name: String,
    pub cidr_substitute: u8,
    pub az_postfix: String,
    pub rt_name: String,
    pub is_public: bool,
    pub subnet_id: Option<String>,
    pub rt_id: Option<String>,
    pub association_id: Option<String>,
}

impl SubnetRecord {
    /// Create a subnet record inside `vpc`, which must already be provisioned
    pub fn new(
        vpc: &VpcRecord,
        subnet_name: impl Into<String>,
        cidr_substitute: u8,
        az_postfix: impl Into<String>,
        rt_name: impl Into<String>,
        is_public: bool,
    ) -> Self {
        Self {
            vpc: vpc.clone(),
            subnet_name: subnet_name.into(),
            cidr_substitute,
            az_postfix: az_postfix.into(),
            rt_name: rt_name.into(),
            is_public,
            subnet_id: None,
            rt_id: None,
            association_id: None,
        }
    }

    pub fn region(&self) -> &str {
        &self.vpc.region
    }

    /// Availability zone: region followed by the suffix (e.g., "us-east-1a")
    pub fn availability_zone(&self) -> String {
        format!("{}{}", self.vpc.region, self.az_postfix)
    }

    /// Subnet CIDR block derived from the VPC block and the third-octet substitute
    pub fn subnet_cidr(&self) -> Result<String, ValidationError> {
        validation::derive_subnet_cidr(&self.vpc.vpc_cidr, self.cidr_substitute)
    }

    pub fn require_subnet_id(&self) -> Result<&str, RecordError> {
        require(ResourceKind::Subnet, "subnet_id", &self.subnet_id)
    }

    pub fn require_rt_id(&self) -> Result<&str, RecordError> {
        require(ResourceKind::Subnet, "rt_id", &self.rt_id)
    }

    pub fn require_association_id(&self) -> Result<&str, RecordError> {
        require(ResourceKind::Subnet, "association_id", &self.association_id)
    }

    /// Identifiers this subnet group created so far, in creation order
    pub fn created_identifiers(&self) -> Vec<(&'static str, &str)> {
        [
            ("subnet_id", &self.subnet_id),
            ("rt_id", &self.rt_id),
            ("association_id", &self.association_id),
        ]
        .into_iter()
        .filter_map(|(field, id)| id.as_deref().map(|id| (field, id)))
        .collect()
    }

    /// Check that the record describes a fully provisioned subnet group
    pub fn validate(&self) -> Result<(), RecordError> {
        let invalid = |source| RecordError::InvalidField {
            kind: ResourceKind::Subnet,
            source,
        };
        validation::validate_resource_name("subnet_name", &self.subnet_name).map_err(invalid)?;
        self.subnet_cidr().map_err(invalid)?;
        self.vpc.require_vpc_id()?;
        self.require_subnet_id()?;
        self.require_rt_id()?;
        self.require_association_id()?;
        Ok(())
    }
}

/// A persisted record, tagged by resource kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resource_type", rename_all = "lowercase")]
pub enum Record {
    Vpc(VpcRecord),
    Subnet(SubnetRecord),
}

impl Record {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Record::Vpc(_) => ResourceKind::Vpc,
            Record::Subnet(_) => ResourceKind::Subnet,
        }
    }

    /// User-supplied name the record is filed under
    pub fn name(&self) -> &str {
        match self {
            Record::Vpc(vpc) => &vpc.vpc_name,
            Record::Subnet(subnet) => &subnet.subnet_name,
        }
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        match self {
            Record::Vpc(vpc) => vpc.validate(),
            Record::Subnet(subnet) => subnet.validate(),
        }
    }
}

impl From<VpcRecord> for Record {
    fn from(record: VpcRecord) -> Self {
        Record::Vpc(record)
    }
}

impl From<SubnetRecord> for Record {
    fn from(record: SubnetRecord) -> Self {
        Record::Subnet(record)
    }
}
