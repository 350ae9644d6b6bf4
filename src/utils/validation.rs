use crate::utils::error::{Result, ShowcaseError};
use base64::{engine::general_purpose::STANDARD, Engine};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: &str, reason: impl Into<String>) -> ShowcaseError {
    ShowcaseError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(
            field_name,
            url_str,
            format!("Invalid URL format: {}", e),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            &value.to_string(),
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

/// Account keys are shared secrets handed out base64 encoded.
pub fn validate_base64_key(field_name: &str, key: &str) -> Result<()> {
    validate_non_empty_string(field_name, key)?;
    STANDARD
        .decode(key)
        .map(|_| ())
        .map_err(|e| invalid(field_name, "<redacted>", format!("Key is not valid base64: {}", e)))
}

/// Blob container names: 3-63 chars, lowercase letters, digits and single hyphens.
pub fn validate_container_name(field_name: &str, name: &str) -> Result<()> {
    if name.len() < 3 || name.len() > 63 {
        return Err(invalid(
            field_name,
            name,
            "Container name must be between 3 and 63 characters",
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            field_name,
            name,
            "Container name can only contain lowercase letters, numbers, and hyphens",
        ));
    }

    if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
        return Err(invalid(
            field_name,
            name,
            "Container name cannot start or end with a hyphen or contain consecutive hyphens",
        ));
    }

    Ok(())
}
