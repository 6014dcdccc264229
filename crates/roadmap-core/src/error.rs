use std::fmt;

/// Machine-readable error codes surfaced by the CLI and in notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    CatalogParseError,
    ItemNotFound,
    InvalidItem,
    InvalidEnumValue,
    InvalidEmail,
    BackendUnavailable,
    SubscriptionTimeout,
    StorageUnavailable,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::CatalogParseError => "E1003",
            Self::ItemNotFound => "E2001",
            Self::InvalidItem => "E2002",
            Self::InvalidEnumValue => "E2003",
            Self::InvalidEmail => "E4001",
            Self::BackendUnavailable => "E4002",
            Self::SubscriptionTimeout => "E4003",
            Self::StorageUnavailable => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Roadmap not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::CatalogParseError => "Catalog file parse error",
            Self::ItemNotFound => "Item not found",
            Self::InvalidItem => "Invalid roadmap item",
            Self::InvalidEnumValue => "Invalid priority value",
            Self::InvalidEmail => "Invalid email address",
            Self::BackendUnavailable => "Subscriber backend unavailable",
            Self::SubscriptionTimeout => "Subscription request timed out",
            Self::StorageUnavailable => "Local storage unavailable",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to users and operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `rmap init` to create a .roadmap/ directory."),
            Self::ConfigParseError => Some("Fix syntax in .roadmap/config.toml and retry."),
            Self::CatalogParseError => Some("Fix syntax in .roadmap/catalog.toml and retry."),
            Self::ItemNotFound => Some("Run `rmap list` to see valid item IDs."),
            Self::InvalidItem => {
                Some("Set completed_at on completed items only, and keep item IDs unique.")
            }
            Self::InvalidEnumValue => Some("Use in-progress, up-next or future."),
            Self::InvalidEmail => Some("Check the address for typos and try again."),
            Self::BackendUnavailable => Some("Use the fallback contact link, or retry later."),
            Self::SubscriptionTimeout => Some("Retry in a moment."),
            Self::StorageUnavailable => {
                Some("Votes are kept in memory for this session only; check disk permissions.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl serde::Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    const ALL: [ErrorCode; 11] = [
        ErrorCode::NotInitialized,
        ErrorCode::ConfigParseError,
        ErrorCode::CatalogParseError,
        ErrorCode::ItemNotFound,
        ErrorCode::InvalidItem,
        ErrorCode::InvalidEnumValue,
        ErrorCode::InvalidEmail,
        ErrorCode::BackendUnavailable,
        ErrorCode::SubscriptionTimeout,
        ErrorCode::StorageUnavailable,
        ErrorCode::InternalUnexpected,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let text = code.code();
            assert_eq!(text.len(), 5);
            assert!(text.starts_with('E'));
            assert!(text.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn subscription_errors_carry_hints() {
        assert!(ErrorCode::InvalidEmail.hint().is_some());
        assert!(ErrorCode::BackendUnavailable.hint().is_some());
        assert_eq!(ErrorCode::SubscriptionTimeout.to_string(), "E4003");
    }

    #[test]
    fn serializes_as_code_string() {
        let json = serde_json::to_string(&ErrorCode::InvalidEmail).expect("serialize");
        assert_eq!(json, "\"E4001\"");
    }
}
