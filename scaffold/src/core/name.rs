//! Project name validation.

/// Check that `name` can be used as a single directory name under the cwd.
///
/// Any other character is allowed, including spaces and non-ASCII letters.
/// Returns a human-readable reason on rejection.
pub fn validate_project_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("project name must not be empty".to_string());
    }
    if name == "." || name == ".." {
        return Err(format!("project name '{name}' does not name a new directory"));
    }
    if name.contains(['/', '\\']) {
        return Err(format!(
            "project name '{name}' must be a single directory name"
        ));
    }
    if name.contains('\0') {
        return Err("project name must not contain a NUL byte".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_names() {
        for name in ["my-app", "app_2", "Kawkab.Api", "x", ".hidden", "-flag"] {
            assert!(validate_project_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn accepts_spaces_and_non_ascii_names() {
        for name in ["my app", "مشروع", "café-api", "@scope"] {
            assert!(validate_project_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_paths_and_dot_names() {
        for name in ["", ".", "..", "a/b", "..\\up", "/abs", "nul\0byte"] {
            assert!(validate_project_name(name).is_err(), "{name:?}");
        }
    }

    #[test]
    fn separator_error_mentions_directory_name() {
        let err = validate_project_name("nested/app").unwrap_err();
        assert!(err.contains("single directory name"));
    }
}
