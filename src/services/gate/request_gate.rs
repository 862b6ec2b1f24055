//! RequestGate: authentication, then authorization, then the marker.
//!
//! Evaluation reads headers only and holds no state between requests. Nothing
//! observable happens until the decision is returned, so dropping the future
//! mid-lookup (client went away, outer timeout) leaves no trace.

use std::{fmt, sync::Arc};

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, header};

use crate::repos::IdentityLookup;

use super::authorizer::Authorizer;
use super::credentials::{Authenticator, CredentialVerifier};
use super::marker::generate_marker;
use super::types::{CallerIdentityKey, GateDecision, GateError, IdentityHeaderPolicy};

pub const CLIENT_ID_HEADER: HeaderName = HeaderName::from_static("client-id");
pub const PRODUCT_ID_HEADER: HeaderName = HeaderName::from_static("product-id");
pub const MARKER_HEADER: HeaderName = HeaderName::from_static("secret");

#[derive(Clone)]
pub struct RequestGate {
    authenticator: Authenticator,
    authorizer: Authorizer,
    identity_headers: IdentityHeaderPolicy,
}

impl fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestGate")
            .field("authorizer", &self.authorizer)
            .field("identity_headers", &self.identity_headers)
            .finish_non_exhaustive()
    }
}

impl RequestGate {
    pub fn new(
        authenticator: Authenticator,
        authorizer: Authorizer,
        identity_headers: IdentityHeaderPolicy,
    ) -> Self {
        Self {
            authenticator,
            authorizer,
            identity_headers,
        }
    }

    /// Convenience constructor from the two injected capabilities.
    pub fn with_capabilities(
        verifier: Arc<dyn CredentialVerifier>,
        lookup: Arc<dyn IdentityLookup>,
        lookup_timeout: std::time::Duration,
        identity_headers: IdentityHeaderPolicy,
    ) -> Self {
        Self::new(
            Authenticator::new(verifier),
            Authorizer::new(lookup, lookup_timeout),
            identity_headers,
        )
    }

    pub async fn evaluate(&self, headers: &HeaderMap) -> GateDecision {
        match self.run(headers).await {
            Ok(marker) => GateDecision::Allow { marker },
            Err(err) => GateDecision::Reject(err),
        }
    }

    /// Evaluate `req` and, when allowed, hand back a request carrying the marker.
    ///
    /// The request is consumed either way; a rejected request is never forwarded.
    pub async fn admit<B>(&self, req: Request<B>) -> Result<Request<B>, GateError> {
        let decision = self.evaluate(req.headers()).await;
        match decision {
            GateDecision::Allow { marker } => with_marker(req, &marker),
            GateDecision::Reject(err) => Err(err),
        }
    }

    async fn run(&self, headers: &HeaderMap) -> Result<String, GateError> {
        let authorization = match headers.get(header::AUTHORIZATION) {
            None => return Err(GateError::MissingCredentialHeader),
            Some(v) => v.to_str().map_err(|_| GateError::MalformedCredential)?,
        };

        self.authenticator.authenticate(Some(authorization))?;

        let key = self.identity_key(headers)?;
        tracing::debug!(client_id = %key.client_id, product_id = %key.product_id, "authenticated");

        self.authorizer.authorize(&key).await?;

        generate_marker()
    }

    fn identity_key(&self, headers: &HeaderMap) -> Result<CallerIdentityKey, GateError> {
        let client_id = header_str(headers, &CLIENT_ID_HEADER);
        let product_id = header_str(headers, &PRODUCT_ID_HEADER);

        let missing = match self.identity_headers {
            IdentityHeaderPolicy::RequireBoth => client_id.is_none() || product_id.is_none(),
            IdentityHeaderPolicy::RequireAny => client_id.is_none() && product_id.is_none(),
        };
        if missing {
            return Err(GateError::MissingIdentityHeaders);
        }

        Ok(CallerIdentityKey {
            client_id: client_id.unwrap_or_default().to_owned(),
            product_id: product_id.unwrap_or_default().to_owned(),
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Rebuild `req` with the marker set, replacing any `secret` the caller sent.
pub fn with_marker<B>(req: Request<B>, marker: &str) -> Result<Request<B>, GateError> {
    let value = HeaderValue::from_str(marker).map_err(|_| GateError::MarkerUnavailable)?;
    let (mut parts, body) = req.into_parts();
    parts.headers.insert(MARKER_HEADER, value);
    Ok(Request::from_parts(parts, body))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use axum::http::StatusCode;
    use tokio::task::JoinSet;

    use super::*;
    use crate::repos::identity_repo::testing::*;
    use crate::services::gate::credentials::StaticCredentialVerifier;

    const ADMIN: &str = "Basic YWRtaW46YWRtaW4=";
    const USER_PASS: &str = "Basic dXNlcjpwYXNz";
    // base64("adminadmin")
    const NO_COLON: &str = "Basic YWRtaW5hZG1pbg==";

    fn gate_with(lookup: Arc<dyn IdentityLookup>, policy: IdentityHeaderPolicy) -> RequestGate {
        RequestGate::with_capabilities(
            Arc::new(StaticCredentialVerifier::default()),
            lookup,
            Duration::from_millis(200),
            policy,
        )
    }

    fn gate() -> RequestGate {
        gate_with(
            Arc::new(MemoryIdentityLookup::with(&[("c1", "p1")])),
            IdentityHeaderPolicy::RequireBoth,
        )
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        h
    }

    #[tokio::test]
    async fn missing_authorization_is_401() {
        let d = gate()
            .evaluate(&headers(&[("client-id", "c1"), ("product-id", "p1")]))
            .await;
        assert_eq!(d, GateDecision::Reject(GateError::MissingCredentialHeader));
        assert_eq!(d.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn known_caller_with_admin_credentials_is_allowed() {
        let d = gate()
            .evaluate(&headers(&[
                ("authorization", ADMIN),
                ("client-id", "c1"),
                ("product-id", "p1"),
            ]))
            .await;
        match d {
            GateDecision::Allow { marker } => assert_eq!(marker.len(), 10),
            other => panic!("expected allow, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_pair_is_401() {
        let d = gate()
            .evaluate(&headers(&[
                ("authorization", ADMIN),
                ("client-id", "c1"),
                ("product-id", "p2"),
            ]))
            .await;
        assert_eq!(d, GateDecision::Reject(GateError::UnknownCaller));
    }

    #[tokio::test]
    async fn wrong_credentials_never_reach_the_store() {
        let lookup = Arc::new(MemoryIdentityLookup::with(&[("c1", "p1")]));
        let g = gate_with(lookup.clone(), IdentityHeaderPolicy::RequireBoth);

        for auth in [USER_PASS, NO_COLON, "Bearer YWRtaW46YWRtaW4=", "Basic %%%"] {
            let d = g
                .evaluate(&headers(&[
                    ("authorization", auth),
                    ("client-id", "c1"),
                    ("product-id", "p1"),
                ]))
                .await;
            assert!(!d.is_allow(), "{auth} should be rejected");
            assert_eq!(d.status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn strict_policy_rejects_when_either_identity_header_is_missing() {
        let g = gate();
        for h in [
            headers(&[("authorization", ADMIN), ("client-id", "c1")]),
            headers(&[("authorization", ADMIN), ("product-id", "p1")]),
            headers(&[("authorization", ADMIN)]),
        ] {
            assert_eq!(
                g.evaluate(&h).await,
                GateDecision::Reject(GateError::MissingIdentityHeaders)
            );
        }
    }

    #[tokio::test]
    async fn lenient_policy_only_rejects_when_both_are_missing() {
        let lookup = Arc::new(MemoryIdentityLookup::with(&[("c1", "p1")]));
        let g = gate_with(lookup.clone(), IdentityHeaderPolicy::RequireAny);

        assert_eq!(
            g.evaluate(&headers(&[("authorization", ADMIN)])).await,
            GateDecision::Reject(GateError::MissingIdentityHeaders)
        );

        // One header present: looked up with an empty partner, which never matches.
        assert_eq!(
            g.evaluate(&headers(&[("authorization", ADMIN), ("client-id", "c1")]))
                .await,
            GateDecision::Reject(GateError::UnknownCaller)
        );
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn store_outage_is_503_not_401() {
        let g = gate_with(
            Arc::new(FailingIdentityLookup),
            IdentityHeaderPolicy::RequireBoth,
        );
        let d = g
            .evaluate(&headers(&[
                ("authorization", ADMIN),
                ("client-id", "c1"),
                ("product-id", "p1"),
            ]))
            .await;
        assert_eq!(d.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn same_request_twice_gets_same_classification() {
        let g = gate();
        let h = headers(&[
            ("authorization", ADMIN),
            ("client-id", "c1"),
            ("product-id", "p1"),
        ]);

        let (a, b) = (g.evaluate(&h).await, g.evaluate(&h).await);
        match (a, b) {
            (GateDecision::Allow { marker: m1 }, GateDecision::Allow { marker: m2 }) => {
                assert_ne!(m1, m2)
            }
            other => panic!("expected two allows, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn admit_overwrites_caller_supplied_secret() {
        let req = Request::builder()
            .uri("/orders")
            .header("authorization", ADMIN)
            .header("client-id", "c1")
            .header("product-id", "p1")
            .header("secret", "forged")
            .body(())
            .unwrap();

        let admitted = gate().admit(req).await.unwrap();
        let values: Vec<_> = admitted.headers().get_all("secret").iter().collect();
        assert_eq!(values.len(), 1);
        assert_ne!(values[0], "forged");
        assert_eq!(values[0].len(), 10);
        assert_eq!(admitted.uri(), "/orders");
    }

    fn admin_request() -> Request<()> {
        Request::builder()
            .uri("/orders")
            .header("authorization", ADMIN)
            .header("client-id", "c1")
            .header("product-id", "p1")
            .body(())
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_evaluation_emits_nothing_and_gate_stays_usable() {
        let g = RequestGate::with_capabilities(
            Arc::new(StaticCredentialVerifier::default()),
            Arc::new(SlowIdentityLookup(Duration::from_secs(5))),
            Duration::from_secs(30),
            IdentityHeaderPolicy::RequireBoth,
        );

        // Caller gives up while the lookup is still in flight.
        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), g.admit(admin_request())).await;
        assert!(abandoned.is_err());

        let admitted = g.admit(admin_request()).await.unwrap();
        assert_eq!(admitted.headers().get(MARKER_HEADER).unwrap().len(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_evaluations_are_independent() {
        let g = Arc::new(gate_with(
            Arc::new(MemoryIdentityLookup::with(&[("c1", "p1"), ("c2", "p2")])),
            IdentityHeaderPolicy::RequireBoth,
        ));

        let mut set = JoinSet::new();
        for i in 0..64 {
            let g = g.clone();
            set.spawn(async move {
                let (auth, client, product, expect_allow) = match i % 4 {
                    0 => (ADMIN, "c1", "p1", true),
                    1 => (ADMIN, "c2", "p2", true),
                    2 => (ADMIN, "c1", "p2", false),
                    _ => (USER_PASS, "c1", "p1", false),
                };
                let d = g
                    .evaluate(&headers(&[
                        ("authorization", auth),
                        ("client-id", client),
                        ("product-id", product),
                    ]))
                    .await;
                (expect_allow, d)
            });
        }

        let mut markers = HashSet::new();
        let mut allowed = 0;
        while let Some(joined) = set.join_next().await {
            let (expect_allow, d) = joined.unwrap();
            match d {
                GateDecision::Allow { marker } => {
                    assert!(expect_allow);
                    assert!(markers.insert(marker));
                    allowed += 1;
                }
                GateDecision::Reject(err) => {
                    assert!(!expect_allow, "unexpected reject: {err}");
                    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
                }
            }
        }
        assert_eq!(allowed, 32);
        assert_eq!(markers.len(), 32);
    }

    #[tokio::test]
    async fn admit_rejection_carries_the_reason() {
        let req = Request::builder().body(()).unwrap();
        assert_eq!(
            gate().admit(req).await.unwrap_err(),
            GateError::MissingCredentialHeader
        );
    }

    #[tokio::test]
    async fn non_ascii_authorization_is_malformed() {
        let mut h = HeaderMap::new();
        h.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Basic \xff\xfe").unwrap(),
        );
        let d = gate().evaluate(&h).await;
        assert_eq!(d, GateDecision::Reject(GateError::MalformedCredential));
    }
}
