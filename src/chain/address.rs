//! SS58 address helpers

use sp_core::crypto::{AccountId32, Ss58Codec};

/// Shorten an address for display: `5GrwvaEF...utQY`
pub fn format_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.is_empty() {
        return "Unknown Address".to_string();
    }
    if chars.len() <= 12 {
        return address.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// True when `address` is valid SS58 for the given network prefix
pub fn validate_address(address: &str, ss58_prefix: u16) -> bool {
    match AccountId32::from_ss58check_with_version(address.trim()) {
        Ok((_, format)) => format.prefix() == ss58_prefix,
        Err(e) => {
            crate::log_debug!("Rejected address {}: {:?}", format_address(address), e);
            false
        }
    }
}
