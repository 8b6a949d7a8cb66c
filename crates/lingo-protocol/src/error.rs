use thiserror::Error;

/// Errors from the protocol model itself.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Two handlers produced different response variants for one
    /// endpoint.
    #[error("cannot merge response variants {left} and {right}")]
    VariantMismatch {
        left: &'static str,
        right: &'static str,
    },

    /// Multiple handlers matched an endpoint whose response type does
    /// not support merging.
    #[error("response variant {0} does not support merging")]
    NotMergeable(&'static str),

    /// The request payload did not deserialize into the endpoint's
    /// request type.
    #[error("invalid request payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_mismatch_displays_both_sides() {
        let err = ProtocolError::VariantMismatch {
            left: "QuickFixes",
            right: "Completions",
        };
        assert_eq!(
            err.to_string(),
            "cannot merge response variants QuickFixes and Completions"
        );
    }

    #[test]
    fn not_mergeable_displays_variant() {
        let err = ProtocolError::NotMergeable("CodeFormat");
        assert_eq!(
            err.to_string(),
            "response variant CodeFormat does not support merging"
        );
    }

    #[test]
    fn invalid_payload_converts_from_serde() {
        let serde_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err = ProtocolError::from(serde_err);
        assert!(err.to_string().starts_with("invalid request payload"));
    }
}
