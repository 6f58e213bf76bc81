//! Rate-limit detection
//!
//! Decides from the status code and (optionally) the response body whether
//! the provider is throttling the current key. The check is total: bodies
//! that do not parse are treated as "not rate limited" so that malformed
//! responses go through normal error handling instead of the retry loop.

use crate::schemas::Envelope;
use serde::{Deserialize, Serialize};

const TOO_MANY_REQUESTS: u16 = 429;
const BAD_REQUEST: u16 = 400;

// ============================================================================
// Rules
// ============================================================================

/// Codes and phrases that identify throttling responses
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitRules {
    /// Provider code that means throttling when paired with a 400 and a
    /// `sentinel_phrases` match
    pub sentinel_code: String,
    /// Phrases checked only together with `sentinel_code`
    pub sentinel_phrases: Vec<String>,
    /// Error codes that always mean throttling
    pub codes: Vec<String>,
    /// Message fragments that always mean throttling
    pub phrases: Vec<String>,
}

impl Default for RateLimitRules {
    fn default() -> Self {
        Self {
            sentinel_code: "0201".to_string(),
            sentinel_phrases: vec![
                "limit".to_string(),
                "too many".to_string(),
                "exceeded".to_string(),
                "slow down".to_string(),
            ],
            codes: vec![
                "429".to_string(),
                "0429".to_string(),
                "RATE_LIMIT_EXCEEDED".to_string(),
                "TOO_MANY_REQUESTS".to_string(),
            ],
            phrases: vec![
                "rate limit".to_string(),
                "rate-limit".to_string(),
                "too many requests".to_string(),
                "throttl".to_string(),
            ],
        }
    }
}

impl RateLimitRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sentinel(mut self, code: impl Into<String>, phrases: Vec<String>) -> Self {
        self.sentinel_code = code.into();
        self.sentinel_phrases = phrases;
        self
    }

    pub fn with_codes(mut self, codes: Vec<String>) -> Self {
        self.codes = codes;
        self
    }

    pub fn with_phrases(mut self, phrases: Vec<String>) -> Self {
        self.phrases = phrases;
        self
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Details of a throttled response, kept as the executor's last error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSignal {
    pub status: u16,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct RateLimitClassifier {
    rules: RateLimitRules,
}

impl RateLimitClassifier {
    pub fn new(rules: RateLimitRules) -> Self {
        Self { rules }
    }

    pub fn is_rate_limited(&self, status: u16, body: Option<&[u8]>) -> bool {
        self.detect(status, body).is_some()
    }

    /// Return the throttling details if the response is rate limited
    pub fn detect(&self, status: u16, body: Option<&[u8]>) -> Option<RateLimitSignal> {
        let failure = body.and_then(|raw| match Envelope::parse(raw) {
            Ok(Envelope::Failure { code, message }) => Some((code, message)),
            _ => None,
        });

        if status == TOO_MANY_REQUESTS {
            let (code, message) = failure
                .unwrap_or_else(|| (status.to_string(), "Too Many Requests".to_string()));
            return Some(RateLimitSignal {
                status,
                code,
                message,
            });
        }

        let (code, message) = failure?;
        if self.matches(status, &code, &message) {
            Some(RateLimitSignal {
                status,
                code,
                message,
            })
        } else {
            None
        }
    }

    fn matches(&self, status: u16, code: &str, message: &str) -> bool {
        let message = message.to_lowercase();
        let contains_any =
            |phrases: &[String]| phrases.iter().any(|p| message.contains(&p.to_lowercase()));

        if status == BAD_REQUEST
            && code == self.rules.sentinel_code
            && contains_any(self.rules.sentinel_phrases.as_slice())
        {
            return true;
        }

        if self
            .rules
            .codes
            .iter()
            .any(|c| c.eq_ignore_ascii_case(code))
        {
            return true;
        }

        contains_any(self.rules.phrases.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(code: &str, message: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "success": false,
            "error": { "code": code, "message": message },
        }))
        .unwrap()
    }

    fn limited(classifier: &RateLimitClassifier, status: u16, body: &[u8]) -> bool {
        classifier.is_rate_limited(status, Some(body))
    }

    #[test]
    fn test_429_always_rate_limited() {
        let classifier = RateLimitClassifier::default();
        assert!(classifier.is_rate_limited(429, None));
        assert!(limited(&classifier, 429, b"not json"));
        assert!(limited(&classifier, 429, br#"{"success": true, "payload": 1}"#));
        assert!(limited(&classifier, 429, &failure("105", "insufficient funds")));
    }

    #[test]
    fn test_429_signal_carries_envelope_details() {
        let classifier = RateLimitClassifier::default();
        let signal = classifier
            .detect(429, Some(failure("0429", "slow down").as_slice()))
            .unwrap();
        assert_eq!(signal.code, "0429");
        assert_eq!(signal.message, "slow down");

        let signal = classifier.detect(429, None).unwrap();
        assert_eq!(signal.code, "429");
    }

    #[test]
    fn test_success_is_never_rate_limited() {
        let classifier = RateLimitClassifier::default();
        assert!(!limited(&classifier, 200, br#"{"success": true, "payload": {}}"#));
        assert!(!limited(
            &classifier,
            200,
            br#"{"success": true, "payload": {"note": "rate limit ok"}}"#
        ));
    }

    #[test]
    fn test_sentinel_code_with_phrase_on_400() {
        let classifier = RateLimitClassifier::default();
        let body = failure("0201", "Request LIMIT reached, please wait");

        assert!(limited(&classifier, 400, &body));
        // Sentinel rule only applies to 400
        assert!(!limited(&classifier, 401, &body));
        // Sentinel code without a throttling phrase is a normal error
        assert!(!limited(&classifier, 400, &failure("0201", "Invalid Nonce")));
    }

    #[test]
    fn test_curated_codes() {
        let classifier = RateLimitClassifier::default();
        assert!(limited(&classifier, 400, &failure("RATE_LIMIT_EXCEEDED", "nope")));
        assert!(limited(&classifier, 503, &failure("too_many_requests", "busy")));
        assert!(limited(
            &classifier,
            200,
            br#"{"success": false, "error": {"code": 429, "message": "x"}}"#
        ));
    }

    #[test]
    fn test_curated_phrases_case_insensitive() {
        let classifier = RateLimitClassifier::default();
        assert!(limited(&classifier, 403, &failure("999", "You are being THROTTLED")));
        assert!(limited(&classifier, 400, &failure("1", "Too Many Requests")));
    }

    #[test]
    fn test_ordinary_failures_not_rate_limited() {
        let classifier = RateLimitClassifier::default();
        assert!(!limited(&classifier, 400, &failure("105", "insufficient funds")));
        assert!(!limited(&classifier, 500, b"<html>Internal Server Error</html>"));
        assert!(!limited(&classifier, 400, b""));
        assert!(!classifier.is_rate_limited(400, None));
    }

    #[test]
    fn test_custom_rules() {
        let rules = RateLimitRules::new()
            .with_codes(vec!["X42".into()])
            .with_phrases(vec!["cool off".into()]);
        let classifier = RateLimitClassifier::new(rules);

        assert!(limited(&classifier, 400, &failure("x42", "?")));
        assert!(limited(&classifier, 400, &failure("1", "please COOL OFF")));
        assert!(!limited(&classifier, 400, &failure("429", "rate limit")));
    }
}
