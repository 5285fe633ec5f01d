//! Validation of user-supplied command inputs
//!
//! Every check here runs before a provider session is opened, so a rejected
//! input never reaches the EC2 API.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

/// Lowest value accepted as the subnet's third octet
pub const CIDR_SUBSTITUTE_MIN: u8 = 5;
/// Highest value accepted as the subnet's third octet
pub const CIDR_SUBSTITUTE_MAX: u8 = 254;
/// Prefix length of every derived subnet block
pub const SUBNET_PREFIX_LEN: u8 = 24;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("valid name pattern"));

static REGION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]?)?-[a-z]+-[0-9]$").expect("valid region pattern")
});

static AZ_POSTFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]$").expect("valid zone pattern"));

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation
pub type ValidationResult<T = ()> = Result<T, ValidationError>;

/// Parse a CIDR block (e.g., "10.0.0.0/16") into its address and prefix length
pub fn parse_cidr(path: &str, cidr: &str) -> ValidationResult<(Ipv4Addr, u8)> {
    let Some((ip, prefix)) = cidr.split_once('/') else {
        return Err(ValidationError::new(
            path,
            format!("Invalid CIDR format '{}': expected IP/prefix", cidr),
        ));
    };

    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 {
        return Err(ValidationError::new(
            path,
            format!("Invalid IP address '{}': expected 4 octets", ip),
        ));
    }

    let mut parsed = [0u8; 4];
    for (slot, octet) in parsed.iter_mut().zip(&octets) {
        *slot = octet.parse::<u8>().map_err(|_| {
            ValidationError::new(
                path,
                format!("Invalid octet '{}' in IP address: must be 0-255", octet),
            )
        })?;
    }

    match prefix.parse::<u8>() {
        Ok(p) if p <= 32 => Ok((Ipv4Addr::from(parsed), p)),
        Ok(p) => Err(ValidationError::new(
            path,
            format!("Invalid prefix length '{}': must be 0-32", p),
        )),
        Err(_) => Err(ValidationError::new(
            path,
            format!("Invalid prefix length '{}': must be a number", prefix),
        )),
    }
}

/// Validate CIDR block format (e.g., "10.0.0.0/16")
pub fn validate_cidr(path: &str, cidr: &str) -> ValidationResult {
    parse_cidr(path, cidr).map(|_| ())
}

/// Derive a subnet block from the VPC block by replacing its third octet
/// - ("10.0.0.0/16", 7) -> "10.0.7.0/24"
pub fn derive_subnet_cidr(vpc_cidr: &str, cidr_substitute: u8) -> ValidationResult<String> {
    validate_cidr_substitute(cidr_substitute)?;
    let (address, _) = parse_cidr("vpc_cidr", vpc_cidr)?;
    let [a, b, _, _] = address.octets();
    let subnet = Ipv4Addr::new(a, b, cidr_substitute, 0);
    Ok(format!("{}/{}", subnet, SUBNET_PREFIX_LEN))
}

/// Ensure the subnet's third octet stays inside the allowed range
pub fn validate_cidr_substitute(value: u8) -> ValidationResult {
    if (CIDR_SUBSTITUTE_MIN..=CIDR_SUBSTITUTE_MAX).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "cidr_substitute",
            format!(
                "must be between {} and {}, got {}",
                CIDR_SUBSTITUTE_MIN, CIDR_SUBSTITUTE_MAX, value
            ),
        ))
    }
}

/// Validate a user-chosen resource name
///
/// Names become part of a file name, so only ASCII letters, digits, `-`
/// and `_` are accepted.
pub fn validate_resource_name(path: &str, name: &str) -> ValidationResult {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new(
            path,
            format!(
                "Invalid name '{}': use letters, digits, '-' or '_', starting with a letter or digit",
                name
            ),
        ))
    }
}

/// Normalize region string to AWS format (hyphens)
/// - "ap_northeast_1" -> "ap-northeast-1"
/// - "ap-northeast-1" -> "ap-northeast-1"
pub fn normalize_region(s: &str) -> String {
    s.trim().replace('_', "-")
}

/// Normalize and validate a region, returning it in AWS format
pub fn validate_region(region: &str) -> ValidationResult<String> {
    let normalized = normalize_region(region);
    if REGION_PATTERN.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(ValidationError::new(
            "region",
            format!(
                "Invalid region '{}', expected AWS format like us-east-1",
                region
            ),
        ))
    }
}

/// Validate the single-letter suffix appended to the region to form an availability zone
pub fn validate_az_postfix(postfix: &str) -> ValidationResult {
    if AZ_POSTFIX_PATTERN.is_match(postfix) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "availability_zone_postfix",
            format!(
                "Invalid availability zone suffix '{}': expected one lowercase letter",
                postfix
            ),
        ))
    }
}

/// Reject port 0; every other u16 is a usable TCP port
pub fn validate_port(port: u16) -> ValidationResult {
    if port == 0 {
        Err(ValidationError::new("open_port", "port must be 1-65535"))
    } else {
        Ok(())
    }
}
