//! Provisioner - Ordered create and delete sequences for resource groups
//!
//! Each step needs the identifier returned by the step before it, so calls are
//! issued one at a time and the identifier is stored on the record before the
//! next call starts. Removal runs the exact reverse of creation.
//!
//! A failed step is returned as-is. Resources created by earlier steps are not
//! rolled back; their identifiers are logged so they can be cleaned up by hand.

use log::{info, warn};
use thiserror::Error;

use crate::provider::{NetworkProvider, ProviderError, SubnetSpec};
use crate::record::{RecordError, SubnetRecord, VpcRecord};
use crate::validation::ValidationError;

/// Errors raised while provisioning or removing a resource group
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The record lacks an identifier a removal step needs
    #[error(transparent)]
    Record(#[from] RecordError),

    /// The record's inputs cannot be turned into API parameters
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A remote call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub type ProvisionResult<T = ()> = Result<T, ProvisionError>;

/// Summary of the identifiers a failed create left behind, if any
fn partial_summary(group: &str, name: &str, created: &[(&'static str, &str)]) -> Option<String> {
    if created.is_empty() {
        return None;
    }
    let ids = created
        .iter()
        .map(|(field, id)| format!("{}={}", field, id))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(
        "{} '{}' was left partially created and is not recorded: {}",
        group, name, ids
    ))
}

fn report_partial(group: &str, name: &str, created: &[(&'static str, &str)]) {
    if let Some(summary) = partial_summary(group, name, created) {
        warn!("{}", summary);
    }
}

/// Store the identifier of a resource that exists despite the failed call
fn keep_created(slot: &mut Option<String>, err: ProviderError) -> ProviderError {
    if let Some(id) = &err.created_id {
        *slot = Some(id.clone());
    }
    err
}

/// Create the VPC, its security group and its internet gateway
///
/// On success every identifier on `record` is set.
pub async fn create_vpc_group(
    provider: &dyn NetworkProvider,
    record: &mut VpcRecord,
) -> ProvisionResult {
    let result = run_create_vpc_group(provider, record).await;
    if result.is_err() {
        report_partial("VPC", &record.vpc_name, &record.created_identifiers());
    }
    result
}

async fn run_create_vpc_group(
    provider: &dyn NetworkProvider,
    record: &mut VpcRecord,
) -> ProvisionResult {
    info!("Create VPC '{}'", record.vpc_name);
    let vpc_id = provider
        .create_vpc(&record.vpc_name, &record.vpc_cidr)
        .await
        .map_err(|e| keep_created(&mut record.vpc_id, e))?;
    record.vpc_id = Some(vpc_id.clone());

    info!(
        "Create security group '{}' and open ports {:?}",
        record.sg_name, record.open_ports
    );
    let sg_id = provider
        .create_security_group(&record.sg_name, &vpc_id, &record.open_ports)
        .await
        .map_err(|e| keep_created(&mut record.sg_id, e))?;
    record.sg_id = Some(sg_id);

    info!(
        "Create internet gateway '{}' and attach it to VPC",
        record.igw_name
    );
    let igw_id = provider
        .create_internet_gateway(&record.igw_name)
        .await
        .map_err(|e| keep_created(&mut record.igw_id, e))?;
    record.igw_id = Some(igw_id.clone());
    provider.attach_internet_gateway(&igw_id, &vpc_id).await?;

    Ok(())
}

/// Delete the VPC group in reverse creation order
pub async fn remove_vpc_group(provider: &dyn NetworkProvider, record: &VpcRecord) -> ProvisionResult {
    let vpc_id = record.require_vpc_id()?;
    let sg_id = record.require_sg_id()?;
    let igw_id = record.require_igw_id()?;

    info!(
        "Detach internet gateway '{}' from VPC and delete it",
        record.igw_name
    );
    provider.detach_internet_gateway(igw_id, vpc_id).await?;
    provider.delete_internet_gateway(igw_id).await?;

    info!("Delete security group '{}'", record.sg_name);
    provider.delete_security_group(sg_id).await?;

    info!("Delete VPC '{}'", record.vpc_name);
    provider.delete_vpc(vpc_id).await?;

    Ok(())
}

/// Create the subnet, its route table and the association between them
pub async fn create_subnet_group(
    provider: &dyn NetworkProvider,
    record: &mut SubnetRecord,
) -> ProvisionResult {
    let result = run_create_subnet_group(provider, record).await;
    if result.is_err() {
        report_partial("Subnet", &record.subnet_name, &record.created_identifiers());
    }
    result
}

async fn run_create_subnet_group(
    provider: &dyn NetworkProvider,
    record: &mut SubnetRecord,
) -> ProvisionResult {
    let vpc_id = record.vpc.require_vpc_id()?.to_string();
    let default_gateway = if record.is_public {
        Some(record.vpc.require_igw_id()?.to_string())
    } else {
        None
    };
    let cidr_block = record.subnet_cidr()?;
    let availability_zone = record.availability_zone();

    info!(
        "Create subnet '{}' ({} in {})",
        record.subnet_name, cidr_block, availability_zone
    );
    let subnet_id = provider
        .create_subnet(&SubnetSpec {
            name: &record.subnet_name,
            vpc_id: &vpc_id,
            cidr_block: &cidr_block,
            availability_zone: &availability_zone,
            map_public_ip_on_launch: record.is_public,
        })
        .await
        .map_err(|e| keep_created(&mut record.subnet_id, e))?;
    record.subnet_id = Some(subnet_id.clone());

    info!("Create subnet route table '{}'", record.rt_name);
    let rt_id = provider
        .create_route_table(&record.rt_name, &vpc_id, default_gateway.as_deref())
        .await
        .map_err(|e| keep_created(&mut record.rt_id, e))?;
    record.rt_id = Some(rt_id.clone());

    info!(
        "Create association between '{}' and '{}'",
        record.subnet_name, record.rt_name
    );
    let association_id = provider.associate_route_table(&rt_id, &subnet_id).await?;
    record.association_id = Some(association_id);

    Ok(())
}

/// Delete the subnet group in reverse creation order
pub async fn remove_subnet_group(
    provider: &dyn NetworkProvider,
    record: &SubnetRecord,
) -> ProvisionResult {
    let subnet_id = record.require_subnet_id()?;
    let rt_id = record.require_rt_id()?;
    let association_id = record.require_association_id()?;

    info!(
        "Delete association between '{}' and '{}'",
        record.subnet_name, record.rt_name
    );
    provider.disassociate_route_table(association_id).await?;

    info!("Delete detached route table '{}'", record.rt_name);
    provider.delete_route_table(rt_id).await?;

    info!("Delete subnet '{}'", record.subnet_name);
    provider.delete_subnet(subnet_id).await?;

    Ok(())
}
