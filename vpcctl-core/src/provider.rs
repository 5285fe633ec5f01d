//! Provider - Trait abstracting the remote networking API
//!
//! A NetworkProvider issues one remote call per method and returns the
//! identifier the API assigned. Ordering between calls is the provisioner's
//! concern, not the provider's.

use async_trait::async_trait;

use crate::resource::ResourceId;

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    /// Identifier of a resource that exists even though the call failed
    pub created_id: Option<String>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            created_id: None,
            cause: None,
        }
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_created_id(mut self, created_id: impl Into<String>) -> Self {
        self.created_id = Some(created_id.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Parameters for a new subnet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetSpec<'a> {
    pub name: &'a str,
    pub vpc_id: &'a str,
    pub cidr_block: &'a str,
    pub availability_zone: &'a str,
    /// Assign public IPv4 addresses to instances launched in the subnet
    pub map_public_ip_on_launch: bool,
}

/// Remote networking operations
///
/// Create methods return the identifier assigned by the API (e.g., vpc-xxx).
/// When a create method fails after the resource already exists, the error
/// carries that identifier in `created_id`. Delete methods take the
/// identifier back.
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    /// Name of this Provider (e.g., "aws")
    fn name(&self) -> &'static str;

    /// Create a VPC with the given CIDR block and tag it with `name`
    async fn create_vpc(&self, name: &str, cidr_block: &str) -> ProviderResult<String>;

    /// Create a security group in the VPC and allow inbound TCP on `open_ports`
    async fn create_security_group(
        &self,
        name: &str,
        vpc_id: &str,
        open_ports: &[u16],
    ) -> ProviderResult<String>;

    async fn create_internet_gateway(&self, name: &str) -> ProviderResult<String>;

    async fn attach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> ProviderResult<()>;

    async fn detach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> ProviderResult<()>;

    async fn delete_internet_gateway(&self, igw_id: &str) -> ProviderResult<()>;

    async fn delete_security_group(&self, sg_id: &str) -> ProviderResult<()>;

    async fn delete_vpc(&self, vpc_id: &str) -> ProviderResult<()>;

    async fn create_subnet(&self, spec: &SubnetSpec<'_>) -> ProviderResult<String>;

    /// Create a route table in the VPC
    ///
    /// When `default_gateway` is set, a `0.0.0.0/0` route to it is added.
    async fn create_route_table(
        &self,
        name: &str,
        vpc_id: &str,
        default_gateway: Option<&str>,
    ) -> ProviderResult<String>;

    /// Associate a route table with a subnet, returning the association ID
    async fn associate_route_table(
        &self,
        rt_id: &str,
        subnet_id: &str,
    ) -> ProviderResult<String>;

    async fn disassociate_route_table(&self, association_id: &str) -> ProviderResult<()>;

    async fn delete_route_table(&self, rt_id: &str) -> ProviderResult<()>;

    async fn delete_subnet(&self, subnet_id: &str) -> ProviderResult<()>;
}

/// Opens an authenticated provider session
#[async_trait]
pub trait ProviderConnector: Send + Sync {
    /// Open a session using the named credentials profile in `region`
    async fn connect(
        &self,
        profile: &str,
        region: &str,
    ) -> ProviderResult<Box<dyn NetworkProvider>>;
}
