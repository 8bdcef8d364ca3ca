//! Centralized validation and helper functions.

/// Width of the database name field in every index header
pub const MAX_DB_NAME_LENGTH: usize = 20;

/// Width of the release tag field in every index header
pub const MAX_RELEASE_LENGTH: usize = 10;

/// Maximum identifier or accession length accepted from a source
pub const MAX_KEY_LENGTH: usize = 255;

/// File numbers are stored as a signed 16-bit value
pub const MAX_SOURCE_FILES: usize = i16::MAX as usize;

/// Validation error types
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Database name is empty")]
    EmptyDbName,
    #[error("Database name too long: exceeds {MAX_DB_NAME_LENGTH} characters")]
    DbNameTooLong,
    #[error("Invalid database name '{0}': only letters, digits, '-' and '_' are allowed")]
    InvalidDbName(String),
    #[error("Release tag too long: exceeds {MAX_RELEASE_LENGTH} characters")]
    ReleaseTooLong,
    #[error("Empty key")]
    EmptyKey,
    #[error("Key too long ({0} characters): exceeds {MAX_KEY_LENGTH}")]
    KeyTooLong(usize),
    #[error("Key contains whitespace or control characters: {0:?}")]
    InvalidKey(String),
    #[error("Too many source files: {0} exceeds maximum of {MAX_SOURCE_FILES}")]
    TooManyFiles(usize),
}

/// Validate a database name.
///
/// The name is written into every index header and is also the stem of
/// intermediate files, so it must be short and free of path separators.
///
/// # Examples
///
/// ```
/// use seq_dbi::utils::validation::validate_db_name;
///
/// assert!(validate_db_name("embl").is_ok());
/// assert!(validate_db_name("../embl").is_err());
/// ```
///
/// # Errors
///
/// Returns `ValidationError::EmptyDbName`, `ValidationError::DbNameTooLong`
/// or `ValidationError::InvalidDbName`.
pub fn validate_db_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyDbName);
    }

    if name.len() > MAX_DB_NAME_LENGTH {
        return Err(ValidationError::DbNameTooLong);
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidDbName(name.to_string()));
    }

    Ok(())
}

/// Validate a release tag
///
/// # Errors
///
/// Returns `ValidationError::ReleaseTooLong` if it does not fit the header field.
pub fn validate_release(release: &str) -> Result<(), ValidationError> {
    if release.len() > MAX_RELEASE_LENGTH {
        return Err(ValidationError::ReleaseTooLong);
    }
    Ok(())
}

/// Validate an identifier or accession before it is collected.
///
/// Keys are written into fixed-width records and into space-separated
/// intermediate files, so they must be non-empty, bounded and whitespace free.
///
/// # Errors
///
/// Returns `ValidationError::EmptyKey`, `ValidationError::KeyTooLong` or
/// `ValidationError::InvalidKey`.
pub fn validate_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::EmptyKey);
    }

    if key.len() > MAX_KEY_LENGTH {
        return Err(ValidationError::KeyTooLong(key.len()));
    }

    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::InvalidKey(key.to_string()));
    }

    Ok(())
}

/// Check that `count` source files still fit the 16-bit file number.
///
/// # Errors
///
/// Returns `ValidationError::TooManyFiles` if the limit is exceeded.
pub fn check_file_limit(count: usize) -> Result<(), ValidationError> {
    if count > MAX_SOURCE_FILES {
        Err(ValidationError::TooManyFiles(count))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_db_name() {
        assert!(validate_db_name("embl").is_ok());
        assert!(validate_db_name("uniprot_sprot").is_ok());
        assert!(validate_db_name("nr-2024").is_ok());

        assert_eq!(validate_db_name(""), Err(ValidationError::EmptyDbName));
        assert_eq!(validate_db_name("   "), Err(ValidationError::EmptyDbName));
        assert_eq!(
            validate_db_name(&"a".repeat(21)),
            Err(ValidationError::DbNameTooLong)
        );
        assert!(validate_db_name("a/b").is_err());
        assert!(validate_db_name("..").is_err());
        assert!(validate_db_name("my db").is_err());
    }

    #[test]
    fn test_validate_release() {
        assert!(validate_release("").is_ok());
        assert!(validate_release("141.0").is_ok());
        assert_eq!(
            validate_release("12345678901"),
            Err(ValidationError::ReleaseTooLong)
        );
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("HBA_HUMAN").is_ok());
        assert!(validate_key("NC_000001").is_ok());

        assert_eq!(validate_key(""), Err(ValidationError::EmptyKey));
        assert!(matches!(
            validate_key(&"X".repeat(MAX_KEY_LENGTH + 1)),
            Err(ValidationError::KeyTooLong(256))
        ));
        assert!(validate_key("two words").is_err());
        assert!(validate_key("tab\there").is_err());
    }

    #[test]
    fn test_check_file_limit() {
        assert!(check_file_limit(1).is_ok());
        assert!(check_file_limit(MAX_SOURCE_FILES).is_ok());
        assert!(check_file_limit(MAX_SOURCE_FILES + 1).is_err());
    }
}
