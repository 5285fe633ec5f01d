//! Command handlers
//!
//! Every handler validates its input and resolves stored records before a
//! provider session is opened, so a bad argument or a missing record never
//! reaches the EC2 API.

use std::path::PathBuf;

use clap::{ArgGroup, Args};
use log::{info, warn};
use thiserror::Error;

use vpcctl_core::provider::{NetworkProvider, ProviderConnector, ProviderError};
use vpcctl_core::provisioner::{self, ProvisionError};
use vpcctl_core::record::{DEFAULT_OPEN_PORTS, Record, SubnetRecord, VpcRecord};
use vpcctl_core::resource::ResourceKind;
use vpcctl_core::validation::{self, CIDR_SUBSTITUTE_MAX, CIDR_SUBSTITUTE_MIN, ValidationError};
use vpcctl_state::{LocalStore, StoreError, StoreResult};

use crate::config::AppConfig;

/// Errors that abort a command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Invalid argument {0}")]
    Validation(#[from] ValidationError),

    #[error("VPC '{vpc_name}' still has subnets: {subnets}. Remove them first")]
    VpcInUse { vpc_name: String, subnets: String },
}

pub type CommandResult<T = ()> = Result<T, CommandError>;

#[derive(Debug, Clone, Args)]
pub struct ConfigureVpcArgs {
    /// Name of AWS administrator profile
    #[arg(long)]
    pub profile_name: String,

    /// AWS region to create the VPC in
    #[arg(long)]
    pub region: String,

    /// Range of IP host addresses to define within the VPC
    #[arg(long)]
    pub vpc_cidr: String,

    /// Name of the VPC
    #[arg(long)]
    pub vpc_name: String,

    /// Name of the security group to create in the VPC
    #[arg(long)]
    pub sg_name: String,

    /// Name of the internet gateway to attach to the VPC
    #[arg(long)]
    pub igw_name: String,

    /// TCP port to open on the security group (repeatable; defaults to 22, 80, 443)
    #[arg(long = "open-port")]
    pub open_ports: Vec<u16>,
}

#[derive(Debug, Clone, Args)]
pub struct RemoveVpcArgs {
    /// Name of AWS administrator profile
    #[arg(long)]
    pub profile_name: String,

    /// Name of the VPC to remove
    #[arg(long)]
    pub vpc_name: String,
}

#[derive(Debug, Clone, Args)]
#[command(group(
    ArgGroup::new("visibility")
        .required(true)
        .args(["is_public", "no_is_public"])
))]
pub struct ConfigureSubnetArgs {
    /// Name of AWS administrator profile
    #[arg(long)]
    pub profile_name: String,

    /// Name of the VPC to create the subnet in
    #[arg(long)]
    pub vpc_name: String,

    /// Name of the subnet to create within the VPC
    #[arg(long)]
    pub subnet_name: String,

    /// Value to use as the third octet (integer between 5 and 254)
    #[arg(
        long,
        value_parser = clap::value_parser!(u8)
            .range(i64::from(CIDR_SUBSTITUTE_MIN)..=i64::from(CIDR_SUBSTITUTE_MAX))
    )]
    pub cidr_substitute: u8,

    /// Suffix to append to the region name to form the availability zone
    #[arg(long)]
    pub availability_zone_postfix: String,

    /// Name of the route table to associate with the subnet
    #[arg(long)]
    pub route_table_name: String,

    /// Route the subnet to the internet gateway
    #[arg(long)]
    pub is_public: bool,

    /// Keep the subnet private
    #[arg(long)]
    pub no_is_public: bool,
}

impl ConfigureSubnetArgs {
    pub fn public(&self) -> bool {
        self.is_public && !self.no_is_public
    }
}

#[derive(Debug, Clone, Args)]
pub struct RemoveSubnetArgs {
    /// Name of AWS administrator profile
    #[arg(long)]
    pub profile_name: String,

    /// Name of the subnet to remove
    #[arg(long)]
    pub subnet_name: String,
}

async fn open_session(
    connector: &dyn ProviderConnector,
    profile: &str,
    region: &str,
) -> CommandResult<Box<dyn NetworkProvider>> {
    let provider = connector.connect(profile, region).await?;
    info!(
        "Opened {} session for profile '{}' in {}",
        provider.name(),
        profile,
        region
    );
    Ok(provider)
}

/// Subnet records in the store that belong to the given VPC
fn subnets_of(store: &LocalStore, vpc: &VpcRecord) -> StoreResult<Vec<String>> {
    Ok(store
        .list()?
        .into_iter()
        .filter_map(|(_, record)| match record {
            Ok(Record::Subnet(subnet)) if subnet.vpc.vpc_id == vpc.vpc_id => {
                Some(subnet.subnet_name)
            }
            _ => None,
        })
        .collect())
}

/// Create a VPC, its security group and internet gateway, then save the record
pub async fn configure_vpc(
    config: &AppConfig,
    connector: &dyn ProviderConnector,
    args: &ConfigureVpcArgs,
) -> CommandResult<VpcRecord> {
    let region = validation::validate_region(&args.region)?;
    validation::validate_cidr("vpc_cidr", &args.vpc_cidr)?;
    validation::validate_resource_name("vpc_name", &args.vpc_name)?;
    validation::validate_resource_name("sg_name", &args.sg_name)?;
    validation::validate_resource_name("igw_name", &args.igw_name)?;
    let open_ports = if args.open_ports.is_empty() {
        DEFAULT_OPEN_PORTS.to_vec()
    } else {
        for port in &args.open_ports {
            validation::validate_port(*port)?;
        }
        args.open_ports.clone()
    };

    let store = config.store()?;
    store.ensure_available(ResourceKind::Vpc, &args.vpc_name)?;

    let provider = open_session(connector, &args.profile_name, &region).await?;
    let mut record = VpcRecord::new(
        region,
        &args.vpc_cidr,
        &args.vpc_name,
        &args.sg_name,
        &args.igw_name,
    )
    .with_open_ports(open_ports);

    provisioner::create_vpc_group(provider.as_ref(), &mut record).await?;

    let path = store.save(&Record::from(record.clone()))?;
    info!("Save VPC configuration file as {}", path.display());
    Ok(record)
}

/// Delete a VPC group's remote resources, then its record
///
/// Refused while stored subnet records still point at the VPC. The record
/// file is kept if any remote delete fails.
pub async fn remove_vpc(
    config: &AppConfig,
    connector: &dyn ProviderConnector,
    args: &RemoveVpcArgs,
) -> CommandResult<VpcRecord> {
    let store = config.store()?;
    let record = store.load_vpc(&args.vpc_name)?;
    if record.vpc_name != args.vpc_name {
        warn!(
            "'{}' resolved to the record stored for '{}'",
            args.vpc_name, record.vpc_name
        );
    }
    let subnets = subnets_of(&store, &record)?;
    if !subnets.is_empty() {
        return Err(CommandError::VpcInUse {
            vpc_name: record.vpc_name,
            subnets: subnets.join(", "),
        });
    }

    let provider = open_session(connector, &args.profile_name, &record.region).await?;
    provisioner::remove_vpc_group(provider.as_ref(), &record).await?;

    info!("Delete VPC configuration file");
    store.remove(ResourceKind::Vpc, &args.vpc_name)?;
    Ok(record)
}

/// Create a subnet, its route table and their association inside a stored VPC
pub async fn configure_subnet(
    config: &AppConfig,
    connector: &dyn ProviderConnector,
    args: &ConfigureSubnetArgs,
) -> CommandResult<SubnetRecord> {
    validation::validate_resource_name("subnet_name", &args.subnet_name)?;
    validation::validate_resource_name("route_table_name", &args.route_table_name)?;
    validation::validate_az_postfix(&args.availability_zone_postfix)?;
    validation::validate_cidr_substitute(args.cidr_substitute)?;

    let store = config.store()?;
    let vpc = store.load_vpc(&args.vpc_name)?;
    store.ensure_available(ResourceKind::Subnet, &args.subnet_name)?;

    let mut record = SubnetRecord::new(
        &vpc,
        &args.subnet_name,
        args.cidr_substitute,
        &args.availability_zone_postfix,
        &args.route_table_name,
        args.public(),
    );
    record.subnet_cidr()?;

    let provider = open_session(connector, &args.profile_name, record.region()).await?;
    provisioner::create_subnet_group(provider.as_ref(), &mut record).await?;

    let path = store.save(&Record::from(record.clone()))?;
    info!("Save subnet configuration file as {}", path.display());
    Ok(record)
}

/// Delete a subnet group's remote resources, then its record
pub async fn remove_subnet(
    config: &AppConfig,
    connector: &dyn ProviderConnector,
    args: &RemoveSubnetArgs,
) -> CommandResult<SubnetRecord> {
    let store = config.store()?;
    let record = store.load_subnet(&args.subnet_name)?;

    let provider = open_session(connector, &args.profile_name, record.region()).await?;
    provisioner::remove_subnet_group(provider.as_ref(), &record).await?;

    info!("Delete subnet configuration file");
    store.remove(ResourceKind::Subnet, &args.subnet_name)?;
    Ok(record)
}

/// Every record file in the params directory, with its load result
pub fn list_records(config: &AppConfig) -> CommandResult<Vec<(PathBuf, StoreResult<Record>)>> {
    Ok(config.store()?.list()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::{TempDir, tempdir};
    use vpcctl_core::provider::{NetworkProvider, ProviderResult, SubnetSpec};

    type CallLog = Arc<Mutex<Vec<String>>>;

    /// Provider whose calls are appended to a log shared with its connector
    struct RecordingProvider {
        log: CallLog,
        fail_on: Option<&'static str>,
    }

    impl RecordingProvider {
        fn call(&self, op: &str) -> ProviderResult<()> {
            self.log.lock().unwrap().push(op.to_string());
            if self.fail_on == Some(op) {
                return Err(ProviderError::new(format!("{} failed", op)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl NetworkProvider for RecordingProvider {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn create_vpc(&self, _name: &str, _cidr_block: &str) -> ProviderResult<String> {
            self.call("create_vpc")?;
            Ok("vpc-1".to_string())
        }

        async fn create_security_group(
            &self,
            _name: &str,
            _vpc_id: &str,
            _open_ports: &[u16],
        ) -> ProviderResult<String> {
            self.call("create_security_group")?;
            Ok("sg-1".to_string())
        }

        async fn create_internet_gateway(&self, _name: &str) -> ProviderResult<String> {
            self.call("create_internet_gateway")?;
            Ok("igw-1".to_string())
        }

        async fn attach_internet_gateway(&self, _igw: &str, _vpc: &str) -> ProviderResult<()> {
            self.call("attach_internet_gateway")
        }

        async fn detach_internet_gateway(&self, _igw: &str, _vpc: &str) -> ProviderResult<()> {
            self.call("detach_internet_gateway")
        }

        async fn delete_internet_gateway(&self, _igw_id: &str) -> ProviderResult<()> {
            self.call("delete_internet_gateway")
        }

        async fn delete_security_group(&self, _sg_id: &str) -> ProviderResult<()> {
            self.call("delete_security_group")
        }

        async fn delete_vpc(&self, _vpc_id: &str) -> ProviderResult<()> {
            self.call("delete_vpc")
        }

        async fn create_subnet(&self, _spec: &SubnetSpec<'_>) -> ProviderResult<String> {
            self.call("create_subnet")?;
            Ok("subnet-1".to_string())
        }

        async fn create_route_table(
            &self,
            _name: &str,
            _vpc_id: &str,
            _default_gateway: Option<&str>,
        ) -> ProviderResult<String> {
            self.call("create_route_table")?;
            Ok("rtb-1".to_string())
        }

        async fn associate_route_table(&self, _rt: &str, _subnet: &str) -> ProviderResult<String> {
            self.call("associate_route_table")?;
            Ok("rtbassoc-1".to_string())
        }

        async fn disassociate_route_table(&self, _association_id: &str) -> ProviderResult<()> {
            self.call("disassociate_route_table")
        }

        async fn delete_route_table(&self, _rt_id: &str) -> ProviderResult<()> {
            self.call("delete_route_table")
        }

        async fn delete_subnet(&self, _subnet_id: &str) -> ProviderResult<()> {
            self.call("delete_subnet")
        }
    }

    #[derive(Default)]
    struct RecordingConnector {
        log: CallLog,
        sessions: Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingConnector {
        fn failing_on(op: &'static str) -> Self {
            Self {
                fail_on: Some(op),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn sessions(&self) -> Vec<String> {
            self.sessions.lock().unwrap().clone()
        }

        fn clear(&self) {
            self.log.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl ProviderConnector for RecordingConnector {
        async fn connect(
            &self,
            profile: &str,
            region: &str,
        ) -> ProviderResult<Box<dyn NetworkProvider>> {
            self.sessions
                .lock()
                .unwrap()
                .push(format!("{}@{}", profile, region));
            Ok(Box::new(RecordingProvider {
                log: Arc::clone(&self.log),
                fail_on: self.fail_on,
            }))
        }
    }

    fn test_config() -> (TempDir, AppConfig) {
        let dir = tempdir().unwrap();
        let config = AppConfig::new(dir.path().join("params"));
        (dir, config)
    }

    fn configure_vpc_args(vpc_name: &str) -> ConfigureVpcArgs {
        ConfigureVpcArgs {
            profile_name: "admin".to_string(),
            region: "us-east-1".to_string(),
            vpc_cidr: "10.0.0.0/16".to_string(),
            vpc_name: vpc_name.to_string(),
            sg_name: format!("{}-sg", vpc_name),
            igw_name: format!("{}-igw", vpc_name),
            open_ports: vec![],
        }
    }

    fn remove_vpc_args(vpc_name: &str) -> RemoveVpcArgs {
        RemoveVpcArgs {
            profile_name: "admin".to_string(),
            vpc_name: vpc_name.to_string(),
        }
    }

    fn configure_subnet_args(vpc_name: &str, subnet_name: &str) -> ConfigureSubnetArgs {
        ConfigureSubnetArgs {
            profile_name: "admin".to_string(),
            vpc_name: vpc_name.to_string(),
            subnet_name: subnet_name.to_string(),
            cidr_substitute: 10,
            availability_zone_postfix: "a".to_string(),
            route_table_name: format!("{}-rt", subnet_name),
            is_public: true,
            no_is_public: false,
        }
    }

    fn remove_subnet_args(subnet_name: &str) -> RemoveSubnetArgs {
        RemoveSubnetArgs {
            profile_name: "admin".to_string(),
            subnet_name: subnet_name.to_string(),
        }
    }

    fn file_count(config: &AppConfig) -> usize {
        std::fs::read_dir(&config.params_dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_configure_then_remove_vpc_restores_directory() {
        let (_dir, config) = test_config();
        let connector = RecordingConnector::default();

        let record = configure_vpc(&config, &connector, &configure_vpc_args("demo"))
            .await
            .unwrap();
        assert_eq!(record.vpc_id.as_deref(), Some("vpc-1"));
        assert!(config.params_dir.join("vpc_demo_config.json").exists());

        remove_vpc(&config, &connector, &remove_vpc_args("demo"))
            .await
            .unwrap();

        assert_eq!(file_count(&config), 0);
        assert_eq!(
            connector.calls(),
            vec![
                "create_vpc",
                "create_security_group",
                "create_internet_gateway",
                "attach_internet_gateway",
                "detach_internet_gateway",
                "delete_internet_gateway",
                "delete_security_group",
                "delete_vpc",
            ]
        );
        assert_eq!(connector.sessions(), vec!["admin@us-east-1", "admin@us-east-1"]);
    }

    #[tokio::test]
    async fn test_remove_vpc_without_record_makes_no_calls() {
        let (_dir, config) = test_config();
        let connector = RecordingConnector::default();

        let err = remove_vpc(&config, &connector, &remove_vpc_args("absent"))
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Store(StoreError::NotFound { .. })));
        assert!(connector.sessions().is_empty());
        assert!(connector.calls().is_empty());
    }

    #[tokio::test]
    async fn test_configure_subnet_without_vpc_record_makes_no_calls() {
        let (_dir, config) = test_config();
        let connector = RecordingConnector::default();

        let err = configure_subnet(&config, &connector, &configure_subnet_args("absent", "web"))
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Store(StoreError::NotFound { .. })));
        assert!(connector.sessions().is_empty());
        assert!(connector.calls().is_empty());
    }

    #[tokio::test]
    async fn test_configure_then_remove_subnet() {
        let (_dir, config) = test_config();
        let connector = RecordingConnector::default();
        configure_vpc(&config, &connector, &configure_vpc_args("demo"))
            .await
            .unwrap();
        connector.clear();

        let record = configure_subnet(&config, &connector, &configure_subnet_args("demo", "web"))
            .await
            .unwrap();
        assert_eq!(record.vpc.vpc_id.as_deref(), Some("vpc-1"));
        assert_eq!(record.association_id.as_deref(), Some("rtbassoc-1"));
        assert!(config.params_dir.join("subnet_web_config.json").exists());

        remove_subnet(&config, &connector, &remove_subnet_args("web"))
            .await
            .unwrap();

        assert!(!config.params_dir.join("subnet_web_config.json").exists());
        assert!(config.params_dir.join("vpc_demo_config.json").exists());
        assert_eq!(
            connector.calls(),
            vec![
                "create_subnet",
                "create_route_table",
                "associate_route_table",
                "disassociate_route_table",
                "delete_route_table",
                "delete_subnet",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_remote_delete_keeps_record() {
        let (_dir, config) = test_config();
        configure_vpc(&config, &RecordingConnector::default(), &configure_vpc_args("demo"))
            .await
            .unwrap();

        let connector = RecordingConnector::failing_on("delete_security_group");
        let err = remove_vpc(&config, &connector, &remove_vpc_args("demo"))
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Provision(ProvisionError::Provider(_))));
        assert!(config.params_dir.join("vpc_demo_config.json").exists());
        assert!(!connector.calls().contains(&"delete_vpc".to_string()));
    }

    #[tokio::test]
    async fn test_failed_remote_create_writes_no_record() {
        let (_dir, config) = test_config();
        let connector = RecordingConnector::failing_on("create_internet_gateway");

        let result = configure_vpc(&config, &connector, &configure_vpc_args("demo")).await;

        assert!(result.is_err());
        assert_eq!(file_count(&config), 0);
        assert_eq!(
            connector.calls(),
            vec!["create_vpc", "create_security_group", "create_internet_gateway"]
        );
    }

    #[tokio::test]
    async fn test_malformed_record_is_reported_before_any_call() {
        let (_dir, config) = test_config();
        let store = config.store().unwrap();
        std::fs::write(store.path_for(ResourceKind::Vpc, "demo"), "{\"region\": ").unwrap();
        let connector = RecordingConnector::default();

        let err = remove_vpc(&config, &connector, &remove_vpc_args("demo"))
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Store(StoreError::Malformed { .. })));
        assert!(connector.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_configure_vpc_refuses_colliding_name() {
        let (_dir, config) = test_config();
        let connector = RecordingConnector::default();
        configure_vpc(&config, &connector, &configure_vpc_args("my_vpc"))
            .await
            .unwrap();
        connector.clear();

        let err = configure_vpc(&config, &connector, &configure_vpc_args("my-vpc"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CommandError::Store(StoreError::AlreadyExists { .. })
        ));
        assert!(connector.calls().is_empty());
    }

    #[tokio::test]
    async fn test_configure_vpc_rejects_invalid_input() {
        let (_dir, config) = test_config();
        let connector = RecordingConnector::default();

        let mut args = configure_vpc_args("demo");
        args.vpc_cidr = "10.0.0.0".to_string();
        let err = configure_vpc(&config, &connector, &args).await.unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));

        let mut args = configure_vpc_args("demo");
        args.region = "us-east-1a".to_string();
        assert!(configure_vpc(&config, &connector, &args).await.is_err());

        let mut args = configure_vpc_args("demo");
        args.open_ports = vec![0];
        assert!(configure_vpc(&config, &connector, &args).await.is_err());

        assert!(connector.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_configure_vpc_normalizes_region_and_keeps_ports() {
        let (_dir, config) = test_config();
        let connector = RecordingConnector::default();
        let mut args = configure_vpc_args("demo");
        args.region = "ap_northeast_1".to_string();
        args.open_ports = vec![8080];

        let record = configure_vpc(&config, &connector, &args).await.unwrap();

        assert_eq!(record.region, "ap-northeast-1");
        assert_eq!(record.open_ports, vec![8080]);
        assert_eq!(connector.sessions(), vec!["admin@ap-northeast-1"]);
        let stored = config.store().unwrap().load_vpc("demo").unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_list_records_reports_all_files() {
        let (_dir, config) = test_config();
        let connector = RecordingConnector::default();
        configure_vpc(&config, &connector, &configure_vpc_args("demo"))
            .await
            .unwrap();
        configure_subnet(&config, &connector, &configure_subnet_args("demo", "web"))
            .await
            .unwrap();

        let listed = list_records(&config).unwrap();

        let kinds: Vec<ResourceKind> = listed
            .iter()
            .map(|(_, record)| record.as_ref().unwrap().kind())
            .collect();
        assert_eq!(kinds, vec![ResourceKind::Subnet, ResourceKind::Vpc]);
    }

    #[tokio::test]
    async fn test_remove_vpc_refuses_while_subnets_remain() {
        let (_dir, config) = test_config();
        let connector = RecordingConnector::default();
        configure_vpc(&config, &connector, &configure_vpc_args("demo"))
            .await
            .unwrap();
        configure_subnet(&config, &connector, &configure_subnet_args("demo", "web"))
            .await
            .unwrap();
        let connector = RecordingConnector::default();

        let err = remove_vpc(&config, &connector, &remove_vpc_args("demo"))
            .await
            .unwrap_err();

        match err {
            CommandError::VpcInUse { vpc_name, subnets } => {
                assert_eq!(vpc_name, "demo");
                assert_eq!(subnets, "web");
            }
            other => panic!("Expected VpcInUse, got {:?}", other),
        }
        assert!(connector.sessions().is_empty());
        assert!(config.params_dir.join("vpc_demo_config.json").exists());

        remove_subnet(&config, &connector, &remove_subnet_args("web"))
            .await
            .unwrap();
        remove_vpc(&config, &connector, &remove_vpc_args("demo"))
            .await
            .unwrap();
        assert_eq!(file_count(&config), 0);
    }

    #[tokio::test]
    async fn test_configure_private_subnet_with_negated_flag() {
        let (_dir, config) = test_config();
        let connector = RecordingConnector::default();
        configure_vpc(&config, &connector, &configure_vpc_args("demo"))
            .await
            .unwrap();

        let mut args = configure_subnet_args("demo", "db");
        args.is_public = false;
        args.no_is_public = true;
        let record = configure_subnet(&config, &connector, &args).await.unwrap();

        assert!(!record.is_public);
    }
}
