//! vpcctl AWS Provider
//!
//! NetworkProvider implementation over the EC2 API

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::Client as Ec2Client;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::{
    AttributeBooleanValue, IpPermission, IpRange, ResourceType, Tag, TagSpecification,
};
use log::debug;
use vpcctl_core::provider::{
    NetworkProvider, ProviderConnector, ProviderError, ProviderResult, SubnetSpec,
};
use vpcctl_core::resource::ResourceId;

/// Destination of the default route added to public route tables
pub const DEFAULT_ROUTE_CIDR: &str = "0.0.0.0/0";

/// Source range allowed on every opened security group port
pub const INGRESS_SOURCE_CIDR: &str = "0.0.0.0/0";

/// Build a provider error from an SDK failure, keeping the SDK error as cause
fn api_error<E>(action: &str, id: ResourceId, err: E) -> ProviderError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ProviderError::new(format!("Failed to {}: {}", action, DisplayErrorContext(&err)))
        .for_resource(id)
        .with_cause(err)
}

/// Name tag applied by the create call itself
pub fn name_tag(resource_type: ResourceType, name: &str) -> TagSpecification {
    TagSpecification::builder()
        .resource_type(resource_type)
        .tags(Tag::builder().key("Name").value(name).build())
        .build()
}

/// One inbound TCP rule per port, open to any source
pub fn ingress_permissions(open_ports: &[u16]) -> Vec<IpPermission> {
    open_ports
        .iter()
        .map(|port| {
            IpPermission::builder()
                .ip_protocol("tcp")
                .from_port(i32::from(*port))
                .to_port(i32::from(*port))
                .ip_ranges(IpRange::builder().cidr_ip(INGRESS_SOURCE_CIDR).build())
                .build()
        })
        .collect()
}

/// AWS Provider
pub struct AwsProvider {
    ec2_client: Ec2Client,
    region: String,
}

impl AwsProvider {
    /// Create a new AWS Provider using a named credentials profile
    pub async fn new(profile: &str, region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(profile)
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            ec2_client: Ec2Client::new(&config),
            region: region.to_string(),
        }
    }

    /// Create with a specific client (for testing)
    pub fn with_client(ec2_client: Ec2Client, region: String) -> Self {
        Self { ec2_client, region }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl NetworkProvider for AwsProvider {
    fn name(&self) -> &'static str {
        "aws"
    }

    // ========== VPC Group ==========

    async fn create_vpc(&self, name: &str, cidr_block: &str) -> ProviderResult<String> {
        let id = ResourceId::new("vpc", name);

        let result = self
            .ec2_client
            .create_vpc()
            .cidr_block(cidr_block)
            .tag_specifications(name_tag(ResourceType::Vpc, name))
            .send()
            .await
            .map_err(|e| api_error("create VPC", id.clone(), e))?;

        let vpc_id = result
            .vpc()
            .and_then(|v| v.vpc_id())
            .ok_or_else(|| {
                ProviderError::new("VPC created but no ID returned").for_resource(id.clone())
            })?
            .to_string();

        debug!("Created VPC {} ({}) in {}", vpc_id, cidr_block, self.region);
        Ok(vpc_id)
    }

    async fn create_security_group(
        &self,
        name: &str,
        vpc_id: &str,
        open_ports: &[u16],
    ) -> ProviderResult<String> {
        let id = ResourceId::new("security_group", name);

        let result = self
            .ec2_client
            .create_security_group()
            .group_name(name)
            .description(name)
            .vpc_id(vpc_id)
            .tag_specifications(name_tag(ResourceType::SecurityGroup, name))
            .send()
            .await
            .map_err(|e| api_error("create security group", id.clone(), e))?;

        let sg_id = result
            .group_id()
            .ok_or_else(|| {
                ProviderError::new("Security Group created but no ID returned")
                    .for_resource(id.clone())
            })?
            .to_string();

        if !open_ports.is_empty() {
            self.ec2_client
                .authorize_security_group_ingress()
                .group_id(&sg_id)
                .set_ip_permissions(Some(ingress_permissions(open_ports)))
                .send()
                .await
                .map_err(|e| {
                    api_error("open security group ports", id.clone(), e)
                        .with_created_id(&sg_id)
                })?;
        }

        Ok(sg_id)
    }

    async fn create_internet_gateway(&self, name: &str) -> ProviderResult<String> {
        let id = ResourceId::new("internet_gateway", name);

        let result = self
            .ec2_client
            .create_internet_gateway()
            .tag_specifications(name_tag(ResourceType::InternetGateway, name))
            .send()
            .await
            .map_err(|e| api_error("create internet gateway", id.clone(), e))?;

        let igw_id = result
            .internet_gateway()
            .and_then(|igw| igw.internet_gateway_id())
            .ok_or_else(|| {
                ProviderError::new("Internet Gateway created but no ID returned")
                    .for_resource(id.clone())
            })?
            .to_string();

        Ok(igw_id)
    }

    async fn attach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> ProviderResult<()> {
        self.ec2_client
            .attach_internet_gateway()
            .internet_gateway_id(igw_id)
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(|e| {
                api_error(
                    "attach internet gateway",
                    ResourceId::new("internet_gateway", igw_id),
                    e,
                )
            })?;
        Ok(())
    }

    async fn detach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> ProviderResult<()> {
        self.ec2_client
            .detach_internet_gateway()
            .internet_gateway_id(igw_id)
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(|e| {
                api_error(
                    "detach internet gateway",
                    ResourceId::new("internet_gateway", igw_id),
                    e,
                )
            })?;
        Ok(())
    }

    async fn delete_internet_gateway(&self, igw_id: &str) -> ProviderResult<()> {
        self.ec2_client
            .delete_internet_gateway()
            .internet_gateway_id(igw_id)
            .send()
            .await
            .map_err(|e| {
                api_error(
                    "delete internet gateway",
                    ResourceId::new("internet_gateway", igw_id),
                    e,
                )
            })?;
        Ok(())
    }

    async fn delete_security_group(&self, sg_id: &str) -> ProviderResult<()> {
        self.ec2_client
            .delete_security_group()
            .group_id(sg_id)
            .send()
            .await
            .map_err(|e| {
                api_error(
                    "delete security group",
                    ResourceId::new("security_group", sg_id),
                    e,
                )
            })?;
        Ok(())
    }

    async fn delete_vpc(&self, vpc_id: &str) -> ProviderResult<()> {
        self.ec2_client
            .delete_vpc()
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(|e| api_error("delete VPC", ResourceId::new("vpc", vpc_id), e))?;
        Ok(())
    }

    // ========== Subnet Group ==========

    async fn create_subnet(&self, spec: &SubnetSpec<'_>) -> ProviderResult<String> {
        let id = ResourceId::new("subnet", spec.name);

        let result = self
            .ec2_client
            .create_subnet()
            .vpc_id(spec.vpc_id)
            .cidr_block(spec.cidr_block)
            .availability_zone(spec.availability_zone)
            .tag_specifications(name_tag(ResourceType::Subnet, spec.name))
            .send()
            .await
            .map_err(|e| api_error("create subnet", id.clone(), e))?;

        let subnet_id = result
            .subnet()
            .and_then(|s| s.subnet_id())
            .ok_or_else(|| {
                ProviderError::new("Subnet created but no ID returned").for_resource(id.clone())
            })?
            .to_string();

        if spec.map_public_ip_on_launch {
            self.ec2_client
                .modify_subnet_attribute()
                .subnet_id(&subnet_id)
                .map_public_ip_on_launch(AttributeBooleanValue::builder().value(true).build())
                .send()
                .await
                .map_err(|e| {
                    api_error("enable public IP on launch", id.clone(), e)
                        .with_created_id(&subnet_id)
                })?;
        }

        Ok(subnet_id)
    }

    async fn create_route_table(
        &self,
        name: &str,
        vpc_id: &str,
        default_gateway: Option<&str>,
    ) -> ProviderResult<String> {
        let id = ResourceId::new("route_table", name);

        let result = self
            .ec2_client
            .create_route_table()
            .vpc_id(vpc_id)
            .tag_specifications(name_tag(ResourceType::RouteTable, name))
            .send()
            .await
            .map_err(|e| api_error("create route table", id.clone(), e))?;

        let rt_id = result
            .route_table()
            .and_then(|rt| rt.route_table_id())
            .ok_or_else(|| {
                ProviderError::new("Route Table created but no ID returned")
                    .for_resource(id.clone())
            })?
            .to_string();

        if let Some(gateway_id) = default_gateway {
            self.ec2_client
                .create_route()
                .route_table_id(&rt_id)
                .destination_cidr_block(DEFAULT_ROUTE_CIDR)
                .gateway_id(gateway_id)
                .send()
                .await
                .map_err(|e| {
                    api_error("create default route", id.clone(), e).with_created_id(&rt_id)
                })?;
        }

        Ok(rt_id)
    }

    async fn associate_route_table(
        &self,
        rt_id: &str,
        subnet_id: &str,
    ) -> ProviderResult<String> {
        let id = ResourceId::new("route_table", rt_id);

        let result = self
            .ec2_client
            .associate_route_table()
            .route_table_id(rt_id)
            .subnet_id(subnet_id)
            .send()
            .await
            .map_err(|e| api_error("associate route table", id.clone(), e))?;

        result
            .association_id()
            .map(String::from)
            .ok_or_else(|| {
                ProviderError::new("Route Table associated but no association ID returned")
                    .for_resource(id)
            })
    }

    async fn disassociate_route_table(&self, association_id: &str) -> ProviderResult<()> {
        self.ec2_client
            .disassociate_route_table()
            .association_id(association_id)
            .send()
            .await
            .map_err(|e| {
                api_error(
                    "disassociate route table",
                    ResourceId::new("route_table_association", association_id),
                    e,
                )
            })?;
        Ok(())
    }

    async fn delete_route_table(&self, rt_id: &str) -> ProviderResult<()> {
        self.ec2_client
            .delete_route_table()
            .route_table_id(rt_id)
            .send()
            .await
            .map_err(|e| {
                api_error("delete route table", ResourceId::new("route_table", rt_id), e)
            })?;
        Ok(())
    }

    async fn delete_subnet(&self, subnet_id: &str) -> ProviderResult<()> {
        self.ec2_client
            .delete_subnet()
            .subnet_id(subnet_id)
            .send()
            .await
            .map_err(|e| api_error("delete subnet", ResourceId::new("subnet", subnet_id), e))?;
        Ok(())
    }
}

/// Opens AwsProvider sessions from the shared AWS config files
#[derive(Debug, Default, Clone, Copy)]
pub struct AwsConnector;

#[async_trait]
impl ProviderConnector for AwsConnector {
    async fn connect(
        &self,
        profile: &str,
        region: &str,
    ) -> ProviderResult<Box<dyn NetworkProvider>> {
        debug!("Opening EC2 session with profile '{}' in {}", profile, region);
        Ok(Box::new(AwsProvider::new(profile, region).await))
    }
}
