use tamv_core::{DomainError, DomainResult};

/// Trim and bound a required text field.
pub(crate) fn required_text(field: &'static str, value: &str, max_chars: usize) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::Required { field });
    }
    bounded_text(field, value, max_chars)
}

pub(crate) fn bounded_text(field: &'static str, value: &str, max_chars: usize) -> DomainResult<String> {
    let value = value.trim();
    if value.chars().count() > max_chars {
        return Err(DomainError::TooLong { field, max: max_chars });
    }
    Ok(value.to_string())
}

/// Lowercased, trimmed e-mail with a minimal shape check (`local@domain.tld`).
pub fn email(value: &str) -> DomainResult<String> {
    let value = value.trim().to_lowercase();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(DomainError::validation("email is not a valid address"));
    }
    bounded_text("email", &value, 254)
}
