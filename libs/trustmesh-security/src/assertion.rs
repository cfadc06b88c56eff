use std::collections::BTreeMap;

/// Errors raised while constructing an [`IdentityAssertion`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssertionError {
    #[error("assertion subject must not be empty")]
    EmptySubject,
}

/// `IdentityAssertion` is the gateway's statement of who a request is and what it may do.
///
/// Built once per request by the gateway from an already-validated access token and
/// carried to resource services in the forwarded identity header. The value is
/// immutable: there are no setters, and every field is copied from the validated
/// claims at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAssertion {
    /// Validated subject of the external token, verbatim. Never empty.
    subject: String,
    /// Granted authorities in token order. Duplicates are kept as issued.
    authorities: Vec<String>,
    /// Token request parameters selected for forwarding (client id, scope, ...).
    passthrough: BTreeMap<String, String>,
}

impl IdentityAssertion {
    /// Create an assertion for `subject` holding exactly `authorities`.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::EmptySubject`] when `subject` is empty.
    pub fn new(
        subject: impl Into<String>,
        authorities: Vec<String>,
        passthrough: BTreeMap<String, String>,
    ) -> Result<Self, AssertionError> {
        let subject = subject.into();
        if subject.is_empty() {
            return Err(AssertionError::EmptySubject);
        }
        Ok(Self {
            subject,
            authorities,
            passthrough,
        })
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn authorities(&self) -> &[String] {
        &self.authorities
    }

    #[must_use]
    pub fn passthrough(&self) -> &BTreeMap<String, String> {
        &self.passthrough
    }

    /// Look up a single passthrough parameter.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.passthrough.get(key).map(String::as_str)
    }

    /// True when every authority of this assertion was present in `granted`.
    ///
    /// Propagation may drop authorities but must never add one.
    #[must_use]
    pub fn authorities_within(&self, granted: &[String]) -> bool {
        self.authorities.iter().all(|a| granted.contains(a))
    }

    /// Consume the assertion, returning its parts.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<String>, BTreeMap<String, String>) {
        (self.subject, self.authorities, self.passthrough)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn authorities(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn new_rejects_empty_subject() {
        let err = IdentityAssertion::new("", authorities(&["p1"]), BTreeMap::new()).unwrap_err();
        assert_eq!(err, AssertionError::EmptySubject);
    }

    #[test]
    fn new_keeps_authority_order_and_duplicates() {
        let assertion =
            IdentityAssertion::new("alice", authorities(&["p2", "p1", "p2"]), BTreeMap::new())
                .unwrap();

        assert_eq!(assertion.subject(), "alice");
        assert_eq!(assertion.authorities(), &["p2", "p1", "p2"]);
        assert!(assertion.passthrough().is_empty());
    }

    #[test]
    fn param_reads_passthrough() {
        let mut params = BTreeMap::new();
        params.insert("client_id".to_owned(), "c1".to_owned());
        let assertion = IdentityAssertion::new("alice", vec![], params).unwrap();

        assert_eq!(assertion.param("client_id"), Some("c1"));
        assert_eq!(assertion.param("scope"), None);
    }

    #[test]
    fn authorities_within_detects_escalation() {
        let granted = authorities(&["p1", "p2"]);

        let equal = IdentityAssertion::new("alice", granted.clone(), BTreeMap::new()).unwrap();
        let narrower = IdentityAssertion::new("alice", authorities(&["p2"]), BTreeMap::new())
            .unwrap();
        let wider =
            IdentityAssertion::new("alice", authorities(&["p1", "p3"]), BTreeMap::new()).unwrap();

        assert!(equal.authorities_within(&granted));
        assert!(narrower.authorities_within(&granted));
        assert!(!wider.authorities_within(&granted));
    }

    #[test]
    fn into_parts_returns_fields() {
        let assertion =
            IdentityAssertion::new("svc", authorities(&["read"]), BTreeMap::new()).unwrap();
        let (subject, auths, params) = assertion.into_parts();

        assert_eq!(subject, "svc");
        assert_eq!(auths, vec!["read".to_owned()]);
        assert!(params.is_empty());
    }
}
