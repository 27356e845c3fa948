/// Maximum accepted username length, in characters.
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Validate a requested display name before admission.
///
/// The game's only identity is the display name, so the rules stay loose:
/// non-empty, bounded length, no control characters. Uniqueness within the
/// room is enforced separately against the shared roster.
pub fn validate_username(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("No user name provided, please try again".to_string());
    }
    if name.chars().count() > MAX_USERNAME_LENGTH {
        return Err(format!(
            "User name too long (max {MAX_USERNAME_LENGTH} characters)"
        ));
    }
    if name.chars().any(char::is_control) {
        return Err("User name contains invalid characters".to_string());
    }
    Ok(())
}
