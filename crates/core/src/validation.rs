//! Identifier validation shared by the template store and the artifact
//! store.
//!
//! Template ids and artifact categories both end up in URLs, and
//! categories also become directory names, so they share one
//! conservative character set.

use crate::error::CoreError;

/// Maximum length of a template id or artifact category.
const MAX_NAME_LEN: usize = 128;

/// Validate a template identifier.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_NAME_LEN` characters.
/// - Must contain only alphanumeric, hyphen, underscore, or dot characters.
pub fn validate_template_id(id: &str) -> Result<(), CoreError> {
    validate_name("Template id", id)
}

/// Validate an artifact category label.
///
/// Same rules as [`validate_template_id`], except that a category may not
/// start with a dot (it is used as a directory name).
pub fn validate_category(category: &str) -> Result<(), CoreError> {
    validate_name("Category", category)?;
    if category.starts_with('.') {
        return Err(CoreError::Validation(
            "Category must not start with a dot".to_string(),
        ));
    }
    Ok(())
}

fn validate_name(what: &str, name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation(format!("{what} must not be empty")));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "{what} must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CoreError::Validation(format!(
            "{what} may only contain alphanumeric, hyphen, underscore, or dot characters"
        )));
    }
    Ok(())
}
