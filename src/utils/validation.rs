use crate::utils::error::{EtlError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_file_extensions(
    field_name: &str,
    files: &[&str],
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    for file in files {
        match std::path::Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some(extension) if allowed_set.contains(extension) => {}
            Some(extension) => {
                return Err(EtlError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.to_string(),
                    reason: format!(
                        "Unsupported file extension: {}. Allowed extensions: {}",
                        extension,
                        allowed_extensions.join(", ")
                    ),
                });
            }
            None => {
                return Err(EtlError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.to_string(),
                    reason: "File has no extension or invalid filename".to_string(),
                });
            }
        }
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    // NaN fails both comparisons, so check containment instead of exclusion.
    if !(value >= min && value <= max) {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("browser.webdriver_url", "http://localhost:9515").is_ok());
        assert!(validate_url("browser.base_url", "https://app.example.com").is_ok());
        assert!(validate_url("browser.base_url", "").is_err());
        assert!(validate_url("browser.base_url", "invalid-url").is_err());
        assert!(validate_url("browser.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("acquisition.row_cap", 5000, 1).is_ok());
        assert!(validate_positive_number("acquisition.row_cap", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extensions() {
        let files = ["countries.csv", "phrases.txt"];
        assert!(validate_file_extensions("input", &files, &["csv", "txt"]).is_ok());

        assert!(validate_file_extensions("input", &["phrases.xlsx"], &["csv", "txt"]).is_err());
        assert!(validate_file_extensions("input", &["phrases"], &["csv", "txt"]).is_err());
    }

    #[test]
    fn test_validate_range_rejects_nan() {
        assert!(validate_range("scoring.volume_weight", 1.5, 0.0, 1000.0).is_ok());
        assert!(validate_range("scoring.volume_weight", -1.0, 0.0, 1000.0).is_err());
        assert!(validate_range("scoring.volume_weight", f64::NAN, 0.0, 1000.0).is_err());
    }
}
