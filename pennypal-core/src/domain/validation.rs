//! Form validation for account and profile input
//!
//! Each check returns the message shown to the user on failure.

use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;

use super::result::{Error, Result};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const PASSWORD_SPECIALS: &str = "@$!%*?&";

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static USERNAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,30}$").unwrap());

pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::validation("Email is required"));
    }
    if !EMAIL.is_match(email) {
        return Err(Error::validation("Please enter a valid email address"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<()> {
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::validation("Username is required"));
    }
    if !USERNAME.is_match(username) {
        return Err(Error::validation(
            "Username must be 3-30 characters and contain only letters, numbers and underscores",
        ));
    }
    Ok(())
}

/// At least 8 characters with a lowercase letter, an uppercase letter,
/// a digit and one of `@$!%*?&`, starting with one of those characters.
pub fn validate_password_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(
            "Password must be at least 8 characters long",
        ));
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c);
    let strong = password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
        && password.chars().next().is_some_and(allowed);

    if !strong {
        return Err(Error::validation(
            "Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character",
        ));
    }
    Ok(())
}

/// Sign-up takes a free-text name; the username pattern and password
/// strength rules only apply to profile edits and password changes.
pub fn validate_signup(name: &str, email: &str, password: &str, confirm: &str) -> Result<()> {
    validate_name(name)?;
    validate_email(email)?;
    if password.is_empty() {
        return Err(Error::validation("Password is required"));
    }
    if password != confirm {
        return Err(Error::validation("Passwords do not match"));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("Name is required"));
    }
    Ok(())
}

pub fn validate_password_change(current: &str, new: &str, confirm: &str) -> Result<()> {
    if current.is_empty() {
        return Err(Error::validation("Current password is required"));
    }
    if new != confirm {
        return Err(Error::validation("New passwords do not match"));
    }
    validate_password_strength(new)
}

/// Image formats accepted for profile pictures and receipts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
            ImageKind::Webp => "image/webp",
        }
    }

    /// Detect the format from magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageKind::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }
}

/// Check an uploaded image and return its format
pub fn validate_image_upload(bytes: &[u8]) -> Result<ImageKind> {
    let kind = ImageKind::sniff(bytes).ok_or_else(|| {
        Error::validation("Please upload a valid image file (JPEG, PNG, GIF, or WebP)")
    })?;
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(Error::validation("Image must be less than 5MB"));
    }
    Ok(kind)
}

/// Validate an image and encode it as a `data:` URL for upload
pub fn image_data_url(bytes: &[u8]) -> Result<String> {
    let kind = validate_image_upload(bytes)?;
    Ok(format!("data:{};base64,{}", kind.mime_type(), STANDARD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<()>) -> String {
        result.unwrap_err().user_message()
    }

    #[test]
    fn test_email() {
        assert!(validate_email("ana@example.com").is_ok());
        assert_eq!(message(validate_email("")), "Email is required");
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("ana @example.com").is_err());
    }

    #[test]
    fn test_username() {
        assert!(validate_username("budi_99").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(31)).is_err());
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("Secur3P@ss").is_ok());
        assert_eq!(
            message(validate_password_strength("Sh0rt!")),
            "Password must be at least 8 characters long"
        );
        assert!(validate_password_strength("alllowercase1!").is_err());
        assert!(validate_password_strength("NoDigits!!").is_err());
        assert!(validate_password_strength("NoSpecial123").is_err());
        assert!(validate_password_strength(" Leading1!").is_err());
    }

    #[test]
    fn test_signup_confirm_mismatch() {
        assert_eq!(
            message(validate_signup("ana", "ana@example.com", "Secur3P@ss", "Secur3P@sz")),
            "Passwords do not match"
        );
        assert!(validate_signup("ana", "ana@example.com", "Secur3P@ss", "Secur3P@ss").is_ok());
    }

    #[test]
    fn test_signup_accepts_full_name_and_plain_password() {
        assert!(validate_signup("John Doe", "john@example.com", "password123", "password123").is_ok());
        assert_eq!(
            message(validate_signup("  ", "john@example.com", "password123", "password123")),
            "Name is required"
        );
        assert_eq!(
            message(validate_signup("John Doe", "john@example.com", "", "")),
            "Password is required"
        );
    }

    #[test]
    fn test_password_change() {
        assert_eq!(
            message(validate_password_change("old", "Secur3P@ss", "other")),
            "New passwords do not match"
        );
        assert!(validate_password_change("", "Secur3P@ss", "Secur3P@ss").is_err());
        assert!(validate_password_change("old", "Secur3P@ss", "Secur3P@ss").is_ok());
    }

    #[test]
    fn test_image_sniffing() {
        assert_eq!(
            validate_image_upload(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]).unwrap(),
            ImageKind::Jpeg
        );
        assert_eq!(
            validate_image_upload(b"RIFF\x10\x00\x00\x00WEBPVP8 ").unwrap().mime_type(),
            "image/webp"
        );
        assert!(validate_image_upload(b"%PDF-1.7").is_err());

        let mut big = b"GIF89a".to_vec();
        big.resize(MAX_IMAGE_BYTES + 1, 0);
        assert_eq!(
            validate_image_upload(&big).unwrap_err().user_message(),
            "Image must be less than 5MB"
        );
    }

    #[test]
    fn test_image_data_url() {
        let url = image_data_url(b"\x89PNG\r\n\x1a\n").unwrap();
        assert_eq!(url, "data:image/png;base64,iVBORw0KGgo=");
        assert!(image_data_url(b"plain text").is_err());
    }
}
