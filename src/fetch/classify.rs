//! Outcome classification for retry decisions.
//!
//! Every transport response lands in exactly one bucket:
//!
//! | Observation | Classification |
//! |-------------|----------------|
//! | HTTP 200, non-empty body, no blocking signature | Success |
//! | HTTP 403 or 429 | Blocked |
//! | Blocking signature in body (any status, 200 included) | Blocked |
//! | Any other non-200 status | Transient |
//! | Empty body | Transient |
//!
//! Blocked is never downgraded to Success: a 200 whose body carries an
//! anti-bot interstitial is a rejection wearing a success status.

use crate::transport::TransportOutcome;

/// Classified result of one transport outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Real data came back; stop retrying.
    Success,

    /// The target actively rejected or challenged the request. Consumes the
    /// retry budget, but callers surface it distinctly: retrying without a
    /// change of identity is unlikely to help.
    Blocked {
        /// Observed HTTP status.
        status: u16,
        /// The signature substring that matched, when the block was detected
        /// in the body rather than the status.
        signature: Option<String>,
    },

    /// Anything else that might succeed on another attempt.
    Transient {
        /// Observed HTTP status.
        status: u16,
    },
}

/// Classifies a transport outcome against the configured blocking
/// signatures (already lowercase; the body is lowercased once here).
#[must_use]
pub fn classify(outcome: &TransportOutcome, signatures: &[String]) -> Classification {
    if outcome.status == 403 || outcome.status == 429 {
        return Classification::Blocked {
            status: outcome.status,
            signature: None,
        };
    }

    let body = outcome.body.to_lowercase();
    if let Some(signature) = signatures.iter().find(|sig| body.contains(sig.as_str())) {
        return Classification::Blocked {
            status: outcome.status,
            signature: Some(signature.clone()),
        };
    }

    if outcome.status == 200 && !outcome.body.is_empty() {
        return Classification::Success;
    }

    Classification::Transient {
        status: outcome.status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: u16, body: &str) -> TransportOutcome {
        TransportOutcome {
            status,
            body: body.to_string(),
            transport: "stub",
        }
    }

    fn signatures() -> Vec<String> {
        vec!["cloudflare".to_string(), "captcha".to_string()]
    }

    #[test]
    fn test_200_with_data_is_success() {
        let c = classify(&outcome(200, "<div class='nome'>Maria</div>"), &signatures());
        assert_eq!(c, Classification::Success);
    }

    #[test]
    fn test_403_is_blocked() {
        let c = classify(&outcome(403, "forbidden"), &signatures());
        assert_eq!(
            c,
            Classification::Blocked {
                status: 403,
                signature: None
            }
        );
    }

    #[test]
    fn test_429_is_blocked() {
        let c = classify(&outcome(429, "slow down"), &signatures());
        assert!(matches!(c, Classification::Blocked { status: 429, .. }));
    }

    #[test]
    fn test_200_with_signature_is_blocked_not_success() {
        let c = classify(
            &outcome(200, "<html>Checking your browser - Cloudflare</html>"),
            &signatures(),
        );
        assert_eq!(
            c,
            Classification::Blocked {
                status: 200,
                signature: Some("cloudflare".to_string())
            }
        );
    }

    #[test]
    fn test_signature_match_is_case_insensitive() {
        let c = classify(&outcome(200, "SOLVE THE CAPTCHA"), &signatures());
        assert!(matches!(c, Classification::Blocked { signature: Some(s), .. } if s == "captcha"));
    }

    #[test]
    fn test_500_is_transient() {
        let c = classify(&outcome(500, "oops"), &signatures());
        assert_eq!(c, Classification::Transient { status: 500 });
    }

    #[test]
    fn test_404_is_transient() {
        // Non-200, not a blocking status: the endpoint chain may still have
        // a working candidate, so this stays retryable.
        let c = classify(&outcome(404, "not here"), &signatures());
        assert_eq!(c, Classification::Transient { status: 404 });
    }

    #[test]
    fn test_empty_body_is_transient() {
        let c = classify(&outcome(200, ""), &signatures());
        assert_eq!(c, Classification::Transient { status: 200 });
    }
}
