//! EC2 reference types

use std::fmt;

/// Validated EC2 instance type, e.g. `t3.micro`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceType(String);

impl InstanceType {
    /// Parse a `family.size` instance type.
    pub fn parse(value: &str) -> Result<Self, String> {
        let Some((family, size)) = value.split_once('.') else {
            return Err("expected '<family>.<size>'".to_string());
        };
        if family.is_empty() || size.is_empty() {
            return Err("family and size cannot be empty".to_string());
        }
        if !family.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err("family must start with a lowercase letter".to_string());
        }
        if !family
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(format!("invalid instance family '{family}'"));
        }
        if !size
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(format!("invalid instance size '{size}'"));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Instance family (`t3` for `t3.micro`)
    pub fn family(&self) -> &str {
        self.0.split_once('.').map(|(f, _)| f).unwrap_or(&self.0)
    }

    /// Instance size (`micro` for `t3.micro`)
    pub fn size(&self) -> &str {
        self.0.split_once('.').map(|(_, s)| s).unwrap_or_default()
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Concrete AMI identifier, e.g. `ami-0abcdef1234567890`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(String);

impl ImageId {
    /// Parse an `ami-` id with an 8 or 17 character lowercase hex suffix.
    pub fn parse(value: &str) -> Result<Self, String> {
        let Some(hex) = value.strip_prefix("ami-") else {
            return Err("must start with 'ami-'".to_string());
        };
        if hex.len() != 8 && hex.len() != 17 {
            return Err(format!(
                "expected 8 or 17 hex characters after 'ami-', got {}",
                hex.len()
            ));
        }
        if !hex
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err("suffix must be lowercase hex".to_string());
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_type_parse() {
        let t = InstanceType::parse("t3.micro").unwrap();
        assert_eq!(t.family(), "t3");
        assert_eq!(t.size(), "micro");
        assert!(InstanceType::parse("c7gn.16xlarge").is_ok());
        assert!(InstanceType::parse("u-6tb1.metal").is_ok());
    }

    #[test]
    fn test_instance_type_rejects_malformed() {
        for bad in ["micro", "t3.", ".micro", "T3.micro", "t3.micro.extra", "3t.micro"] {
            assert!(InstanceType::parse(bad).is_err(), "accepted '{bad}'");
        }
    }

    #[test]
    fn test_image_id_parse() {
        assert!(ImageId::parse("ami-0abcdef1").is_ok());
        assert!(ImageId::parse("ami-0abcdef1234567890").is_ok());
    }

    #[test]
    fn test_image_id_rejects_malformed() {
        for bad in ["", "ami-", "ami-xyz12345", "ami-0ABCDEF1", "img-0abcdef1", "ami-0abc"] {
            assert!(ImageId::parse(bad).is_err(), "accepted '{bad}'");
        }
    }
}
