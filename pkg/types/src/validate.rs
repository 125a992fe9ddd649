use anyhow::{Result, bail};

/// Validate a node name used as a lease holder identity.
/// Rules: DNS subdomain, lowercase `[a-z0-9-.]`, max 253 chars,
/// each dot-separated label starts and ends with an alphanumeric.
pub fn validate_node_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("node name must not be empty");
    }
    if name.len() > 253 {
        bail!("node name '{}' exceeds 253 characters (got {})", name, name.len());
    }
    for label in name.split('.') {
        if label.is_empty() {
            bail!("node name '{}' contains an empty label", name);
        }
        if label.starts_with('-') || label.ends_with('-') {
            bail!("node name '{}' has a label starting or ending with a hyphen", name);
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            bail!(
                "node name '{}' must contain only lowercase letters, digits, hyphens and dots",
                name
            );
        }
    }
    Ok(())
}
