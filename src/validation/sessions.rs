use crate::error::{AppError, Result};

/// Validates a holder email address.
///
/// # Arguments
///
/// * `email` - The email to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the email is plausible.
pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    if email.len() > 255 {
        return Err(AppError::Validation(
            "Email must be at most 255 characters".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(AppError::Validation("Email must contain '@'".to_string()));
    };

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(AppError::Validation("Email is not valid".to_string()));
    }

    Ok(())
}

/// Validates a session nickname.
pub fn validate_nickname(nickname: &str) -> Result<()> {
    if nickname.trim().is_empty() {
        return Err(AppError::Validation("Nickname is required".to_string()));
    }

    if nickname.len() > 100 {
        return Err(AppError::Validation(
            "Nickname must be at most 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates a MAC address: six groups of two hex digits, ':' or '-'
/// separated.
pub fn validate_mac_address(mac: &str) -> Result<()> {
    if mac.is_empty() {
        return Err(AppError::Validation("MAC address is required".to_string()));
    }

    let separator = if mac.contains(':') { ':' } else { '-' };
    let groups: Vec<&str> = mac.split(separator).collect();

    let well_formed = groups.len() == 6
        && groups
            .iter()
            .all(|g| g.len() == 2 && g.chars().all(|c| c.is_ascii_hexdigit()));

    if !well_formed {
        return Err(AppError::Validation(
            "MAC address must be six ':' or '-' separated hex pairs".to_string(),
        ));
    }

    Ok(())
}
