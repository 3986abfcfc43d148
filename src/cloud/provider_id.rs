//! Provider ID formatting
//!
//! A provider ID is `<cloud>:///<raw-id>`. Node creation and lookup produce
//! it; deletion parses it back, so both sides go through this module.

use super::{CloudError, CloudType};

const SEPARATOR: &str = ":///";

/// The literal prefix carried by every provider ID of `cloud`
pub fn prefix(cloud: CloudType) -> String {
    format!("{}{}", cloud.as_str(), SEPARATOR)
}

/// Build a provider ID from a raw instance identifier
pub fn make(cloud: CloudType, raw_id: &str) -> String {
    format!("{}{}", prefix(cloud), raw_id)
}

/// Recover the raw instance identifier from a provider ID
pub fn parse(cloud: CloudType, provider_id: &str) -> Result<&str, CloudError> {
    let expected_prefix = prefix(cloud);
    match provider_id.strip_prefix(expected_prefix.as_str()) {
        Some(raw_id) if !raw_id.is_empty() => Ok(raw_id),
        _ => Err(CloudError::InvalidProviderId {
            provider_id: provider_id.to_string(),
            expected_prefix,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openstack_prefix() {
        assert_eq!(prefix(CloudType::OpenStack), "openstack:///");
        assert_eq!(prefix(CloudType::OpenStack).len(), 13);
    }

    #[test]
    fn test_make() {
        assert_eq!(make(CloudType::OpenStack, "abc123"), "openstack:///abc123");
    }

    #[test]
    fn test_parse_recovers_raw_id() {
        for id in ["abc123", "5f0c1c3e-8a5e-4a57-9d55-0b7d1d0e2f11", "a:///b"] {
            let provider_id = make(CloudType::OpenStack, id);
            assert_eq!(parse(CloudType::OpenStack, &provider_id).unwrap(), id);
        }
    }

    #[test]
    fn test_parse_rejects_foreign_prefix() {
        let err = parse(CloudType::OpenStack, "aws:///us-east-1a/i-0abc").unwrap_err();
        assert!(matches!(err, CloudError::InvalidProviderId { .. }));
    }

    #[test]
    fn test_parse_rejects_empty_id() {
        assert!(parse(CloudType::OpenStack, "openstack:///").is_err());
        assert!(parse(CloudType::OpenStack, "").is_err());
    }
}
