mod commands;
mod config;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{Value, json};

use vpcctl_core::record::Record;
use vpcctl_provider_aws::AwsConnector;
use vpcctl_state::{StoreError, StoreResult};

use crate::commands::{
    CommandResult, ConfigureSubnetArgs, ConfigureVpcArgs, RemoveSubnetArgs, RemoveVpcArgs,
};
use crate::config::{AppConfig, PARAMS_DIR_ENV};

#[derive(Parser)]
#[command(name = "vpcctl")]
#[command(about = "Provision and remove AWS VPC and subnet groups", long_about = None)]
struct Cli {
    /// Directory holding the record file of each resource group
    #[arg(long, global = true, env = PARAMS_DIR_ENV, default_value = "params")]
    params_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a VPC in the configured region
    ConfigureVpc(ConfigureVpcArgs),
    /// Remove a previously configured VPC
    RemoveVpc(RemoveVpcArgs),
    /// Create a subnet within a previously configured VPC
    ConfigureSubnet(ConfigureSubnetArgs),
    /// Remove a subnet from its VPC
    RemoveSubnet(RemoveSubnetArgs),
    /// List stored VPC and subnet records
    List {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logger() {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );
}

#[tokio::main]
async fn main() {
    init_logger();
    let cli = Cli::parse();
    let config = AppConfig::new(cli.params_dir);
    let connector = AwsConnector;

    let result = match cli.command {
        Commands::ConfigureVpc(args) => run_configure_vpc(&config, &connector, &args).await,
        Commands::RemoveVpc(args) => run_remove_vpc(&config, &connector, &args).await,
        Commands::ConfigureSubnet(args) => {
            run_configure_subnet(&config, &connector, &args).await
        }
        Commands::RemoveSubnet(args) => run_remove_subnet(&config, &connector, &args).await,
        Commands::List { json } => run_list(&config, json),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_configure_vpc(
    config: &AppConfig,
    connector: &AwsConnector,
    args: &ConfigureVpcArgs,
) -> CommandResult {
    let record = commands::configure_vpc(config, connector, args).await?;
    println!(
        "{} VPC '{}' created ({})",
        "✓".green(),
        record.vpc_name.bold(),
        format_ids(&record.created_identifiers())
    );
    Ok(())
}

async fn run_remove_vpc(
    config: &AppConfig,
    connector: &AwsConnector,
    args: &RemoveVpcArgs,
) -> CommandResult {
    let record = commands::remove_vpc(config, connector, args).await?;
    println!("{} VPC '{}' removed", "✓".green(), record.vpc_name.bold());
    Ok(())
}

async fn run_configure_subnet(
    config: &AppConfig,
    connector: &AwsConnector,
    args: &ConfigureSubnetArgs,
) -> CommandResult {
    let record = commands::configure_subnet(config, connector, args).await?;
    println!(
        "{} Subnet '{}' created in VPC '{}' ({})",
        "✓".green(),
        record.subnet_name.bold(),
        record.vpc.vpc_name,
        format_ids(&record.created_identifiers())
    );
    Ok(())
}

async fn run_remove_subnet(
    config: &AppConfig,
    connector: &AwsConnector,
    args: &RemoveSubnetArgs,
) -> CommandResult {
    let record = commands::remove_subnet(config, connector, args).await?;
    println!(
        "{} Subnet '{}' removed",
        "✓".green(),
        record.subnet_name.bold()
    );
    Ok(())
}

fn run_list(config: &AppConfig, json: bool) -> CommandResult {
    let listed = commands::list_records(config)?;

    if json {
        let out = json_listing(&listed)
            .and_then(|value| serde_json::to_string_pretty(&value))
            .map_err(|e| {
                StoreError::Serialization(format!("Failed to serialize records: {}", e))
            })?;
        println!("{}", out);
        return Ok(());
    }

    if listed.is_empty() {
        println!(
            "{}",
            format!("No records in {}.", config.params_dir.display()).yellow()
        );
        return Ok(());
    }

    for (path, record) in &listed {
        print_record(path, record);
    }
    Ok(())
}

/// Loaded records as-is, unreadable files as `{"path", "error"}` entries
fn json_listing(listed: &[(PathBuf, StoreResult<Record>)]) -> serde_json::Result<Value> {
    listed
        .iter()
        .map(|(path, record)| match record {
            Ok(record) => serde_json::to_value(record),
            Err(e) => Ok(json!({
                "path": path.display().to_string(),
                "error": e.to_string(),
            })),
        })
        .collect::<serde_json::Result<Vec<_>>>()
        .map(Value::Array)
}

fn print_record(path: &Path, record: &StoreResult<Record>) {
    match record {
        Ok(Record::Vpc(vpc)) => {
            println!(
                "  {} {} {} {} [{}]",
                "•".cyan(),
                "vpc".cyan().bold(),
                vpc.vpc_name.bold(),
                vpc.vpc_cidr,
                vpc.region
            );
            println!("      {}", format_ids(&vpc.created_identifiers()).dimmed());
        }
        Ok(Record::Subnet(subnet)) => {
            let cidr = subnet.subnet_cidr().unwrap_or_default();
            let visibility = if subnet.is_public { "public" } else { "private" };
            println!(
                "  {} {} {} {} [{}, {}] in {}",
                "•".cyan(),
                "subnet".cyan().bold(),
                subnet.subnet_name.bold(),
                cidr,
                subnet.availability_zone(),
                visibility,
                subnet.vpc.vpc_name
            );
            println!("      {}", format_ids(&subnet.created_identifiers()).dimmed());
        }
        Err(e) => {
            println!("  {} {} - {}", "✗".red(), path.display(), e);
        }
    }
}

fn format_ids(ids: &[(&str, &str)]) -> String {
    ids.iter()
        .map(|(field, id)| format!("{}={}", field, id))
        .collect::<Vec<_>>()
        .join(", ")
}
