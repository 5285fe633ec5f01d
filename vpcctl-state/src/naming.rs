//! Record file naming

use vpcctl_core::resource::ResourceKind;

/// Suffix shared by every record file
pub const CONFIG_FILE_SUFFIX: &str = "_config.json";

/// File name for the record of `name`
/// - (Vpc, "demo") -> "vpc_demo_config.json"
/// - (Subnet, "public-a") -> "subnet_public_a_config.json"
///
/// Hyphens become underscores, so "my-vpc" and "my_vpc" share one file.
/// `LocalStore::ensure_available` reports that case instead of overwriting.
pub fn config_file_name(kind: ResourceKind, name: &str) -> String {
    format!(
        "{}_{}{}",
        kind.as_str(),
        name.replace('-', "_"),
        CONFIG_FILE_SUFFIX
    )
}

/// Whether a directory entry looks like a record file
pub fn is_config_file_name(file_name: &str) -> bool {
    file_name.ends_with(CONFIG_FILE_SUFFIX) && ResourceKind::from_file_name(file_name).is_some()
}
