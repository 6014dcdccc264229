//! Syntactic email validation and normalization.
//!
//! This is a pragmatic subset of RFC 5321/5322: dot-atom local parts and
//! hostname-style domains with an alphabetic TLD. Quoted local parts and IP
//! literals are rejected. No DNS or mailbox checks are made.

/// Longest address accepted (RFC 5321 path limit minus the angle brackets).
pub const MAX_EMAIL_LEN: usize = 254;
/// Longest local part accepted.
pub const MAX_LOCAL_LEN: usize = 64;
/// Longest single domain label accepted.
pub const MAX_LABEL_LEN: usize = 63;

/// Why an address was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct EmailError {
    pub reason: &'static str,
}

const fn reject(reason: &'static str) -> EmailError {
    EmailError { reason }
}

const LOCAL_SPECIALS: &str = "!#$%&'*+/=?^_`{|}~-.";

/// Validate `raw` and return the normalized (trimmed, lowercased) address.
///
/// # Errors
///
/// Returns [`EmailError`] describing the first rule the address breaks.
pub fn normalize_email(raw: &str) -> Result<String, EmailError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(reject("must not be empty"));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(reject("is too long"));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(reject("must contain '@'"));
    };
    if domain.contains('@') {
        return Err(reject("must contain exactly one '@'"));
    }

    validate_local(local)?;
    validate_domain(domain)?;

    Ok(email.to_ascii_lowercase())
}

fn validate_local(local: &str) -> Result<(), EmailError> {
    if local.is_empty() {
        return Err(reject("local part must not be empty"));
    }
    if local.len() > MAX_LOCAL_LEN {
        return Err(reject("local part is too long"));
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err(reject("local part has a misplaced '.'"));
    }
    if !local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || LOCAL_SPECIALS.contains(c))
    {
        return Err(reject("local part contains an invalid character"));
    }
    Ok(())
}

fn validate_domain(domain: &str) -> Result<(), EmailError> {
    if domain.is_empty() {
        return Err(reject("domain must not be empty"));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(reject("domain must contain a '.'"));
    }

    for label in &labels {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(reject("domain has an empty or oversized label"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(reject("domain label must not start or end with '-'"));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(reject("domain contains an invalid character"));
        }
    }

    let tld = labels.last().copied().unwrap_or_default();
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(reject("top-level domain must be at least two letters"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid_email(raw: &str) -> bool {
        normalize_email(raw).is_ok()
    }

    #[test]
    fn accepts_common_addresses() {
        for email in [
            "valid@example.com",
            "first.last@sub.example.co.uk",
            "user+tag@example.io",
            "o'brien@example.ie",
            "x@a-b.dev",
        ] {
            assert!(is_valid_email(email), "{email} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        for email in [
            "",
            "   ",
            "not-an-email",
            "@example.com",
            "user@",
            "user@@example.com",
            "a@b@example.com",
            ".user@example.com",
            "user.@example.com",
            "us..er@example.com",
            "user name@example.com",
            "user@localhost",
            "user@example",
            "user@-example.com",
            "user@example-.com",
            "user@exa_mple.com",
            "user@example.c",
            "user@example.123",
            "user@example..com",
        ] {
            assert!(!is_valid_email(email), "{email:?} should be invalid");
        }
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(
            normalize_email("  Ada.Lovelace@Example.COM \n").expect("valid"),
            "ada.lovelace@example.com"
        );
    }

    #[test]
    fn enforces_length_limits() {
        let local = "a".repeat(MAX_LOCAL_LEN + 1);
        assert_eq!(
            normalize_email(&format!("{local}@example.com")).expect_err("too long"),
            EmailError {
                reason: "local part is too long"
            }
        );

        let label = "b".repeat(60);
        let long = format!("user@{label}.{label}.{label}.{label}.{label}.com");
        assert!(long.len() > MAX_EMAIL_LEN);
        assert!(!is_valid_email(&long));
    }

    #[test]
    fn error_displays_its_reason() {
        let err = normalize_email("user@example").expect_err("no tld");
        assert_eq!(err.to_string(), err.reason);
        assert!(!err.to_string().is_empty());
    }
}
