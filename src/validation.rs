use crate::error::SpoolError;

/// Check that a service name is usable as a spool key.
///
/// The name becomes a file name inside the spool directory, so anything that
/// would escape the directory or collide with internal dot-files is rejected
/// before any filesystem access happens.
pub fn validate_service_name(name: &str) -> Result<(), SpoolError> {
    let reject = |detail: &str| {
        Err(SpoolError::InvalidService {
            name: name.to_string(),
            detail: detail.to_string(),
        })
    };

    if name.is_empty() {
        return reject("name is empty");
    }
    if name == "." || name == ".." {
        return reject("name is a directory reference");
    }
    if name.starts_with('.') {
        return reject("leading dots are reserved for internal files");
    }
    if name.contains('/') || name.contains('\\') {
        return reject("path separators are not allowed");
    }
    if name.contains('\0') {
        return reject("NUL bytes are not allowed");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_ordinary_names() {
        assert!(validate_service_name("web").is_ok());
        assert!(validate_service_name("svc-a").is_ok());
        assert!(validate_service_name("api_v2.main").is_ok());
    }

    #[test]
    fn test_rejects_empty_name() {
        assert!(validate_service_name("").is_err());
    }

    #[test]
    fn test_rejects_directory_references() {
        assert!(validate_service_name(".").is_err());
        assert!(validate_service_name("..").is_err());
    }

    #[test]
    fn test_rejects_hidden_names() {
        assert!(validate_service_name(".hidden").is_err());
    }

    #[test]
    fn test_rejects_path_separators() {
        assert!(validate_service_name("a/b").is_err());
        assert!(validate_service_name("..\\etc").is_err());
        assert!(validate_service_name("../escape").is_err());
    }

    #[test]
    fn test_rejects_nul_bytes() {
        assert!(validate_service_name("svc\0name").is_err());
    }
}
