//! Verifies a Bearer JWT (RS256) from the `Authorization` header and copies
//! one of its claims onto `collector_auth`. Tokens are optional: a missing
//! header, a non-Bearer scheme, or a verification failure all just skip the
//! stage rather than rejecting the event — matching the tracker protocol's
//! "auth is advisory" stance.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use atomic::TemporaryAtomicEvent;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use url::Url;

use crate::{EnrichError, Enrichment};

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: Option<String>,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

pub struct AuthenticationEnrichment {
    sub_field: String,
    aud: Option<String>,
    iss_jwk_urls: HashMap<String, Url>,
    public_key: Option<String>,
    client: reqwest::Client,
    jwks_cache: Mutex<HashMap<String, Vec<Jwk>>>,
}

impl AuthenticationEnrichment {
    pub fn new(
        sub_field: String,
        aud: Option<String>,
        iss_jwk_urls: HashMap<String, Url>,
        public_key: Option<String>,
    ) -> Self {
        AuthenticationEnrichment {
            sub_field,
            aud,
            iss_jwk_urls,
            public_key,
            client: reqwest::Client::new(),
            jwks_cache: Mutex::new(HashMap::new()),
        }
    }

    fn jwks_url_for_issuer(&self, iss: &str) -> Url {
        for (pattern, url) in &self.iss_jwk_urls {
            if pattern.contains(iss) {
                return url.clone();
            }
        }
        format!("{iss}/.well-known/jwks.json")
            .parse()
            .unwrap_or_else(|_| self.iss_jwk_urls.values().next().cloned().unwrap())
    }

    async fn jwks_for_issuer(&self, iss: &str) -> Result<Vec<Jwk>, EnrichError> {
        if let Some(jwks) = self.jwks_cache.lock().expect("lock not poisoned").get(iss) {
            return Ok(jwks.clone());
        }
        let url = self.jwks_url_for_issuer(iss);
        let set: JwkSet = self.client.get(url).send().await?.json().await?;
        self.jwks_cache
            .lock()
            .expect("lock not poisoned")
            .insert(iss.to_string(), set.keys.clone());
        Ok(set.keys)
    }

    async fn decoding_key(&self, token: &str) -> Result<DecodingKey, EnrichError> {
        if let Some(pem) = &self.public_key {
            return DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(EnrichError::from);
        }

        let header = jsonwebtoken::decode_header(token)?;
        let iss = unverified_issuer(token)?;
        let jwks = self.jwks_for_issuer(&iss).await?;
        let jwk = jwks
            .iter()
            .find(|k| k.kid.is_some() && k.kid == header.kid)
            .or_else(|| jwks.first())
            .ok_or_else(|| EnrichError::Invalid(format!("no signing key found for issuer {iss}")))?;
        DecodingKey::from_rsa_components(&jwk.n, &jwk.e).map_err(EnrichError::from)
    }

    async fn decode_token(&self, token: &str) -> Result<serde_json::Value, EnrichError> {
        let decoding_key = self.decoding_key(token).await?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 60 * 60;
        if let Some(aud) = &self.aud {
            validation.set_audience(&[aud]);
        } else {
            validation.validate_aud = false;
        }
        let data = jsonwebtoken::decode::<serde_json::Value>(token, &decoding_key, &validation)?;
        if data.claims.get(self.sub_field.as_str()).is_none() {
            return Err(EnrichError::Invalid(format!("missing {} claim in jwt token", self.sub_field)));
        }
        Ok(data.claims)
    }
}

fn unverified_issuer(token: &str) -> Result<String, EnrichError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| EnrichError::Invalid("malformed jwt".to_string()))?;
    let bytes = base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, payload)
        .map_err(|e| EnrichError::InvalidBase64 { field: "jwt payload", source: e })?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| EnrichError::InvalidJson { field: "jwt payload", source: e })?;
    claims
        .get("iss")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| EnrichError::Invalid("jwt token has no iss claim".to_string()))
}

#[async_trait]
impl Enrichment for AuthenticationEnrichment {
    async fn enrich(&self, event: &mut TemporaryAtomicEvent) -> Result<(), EnrichError> {
        let headers = event.raw_event().headers_map();
        let Some(auth_header) = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("authorization"))
            .map(|(_, v)| v)
        else {
            return Ok(());
        };
        let Some(token) = auth_header.strip_prefix("Bearer ").or_else(|| auth_header.strip_prefix("bearer ")) else {
            return Ok(());
        };

        match self.decode_token(token).await {
            Ok(claims) => {
                if let Some(auth) = claims.get(self.sub_field.as_str()).and_then(|v| v.as_str()) {
                    event.set_value("collector_auth", auth)?;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "jwt verification failed, skipping authentication enrichment");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use wire_codec::CollectorPayload;

    #[tokio::test]
    async fn test_missing_authorization_header_is_a_noop() {
        let raw = Arc::new(CollectorPayload::default());
        let mut event = TemporaryAtomicEvent::new(raw);
        let enrichment = AuthenticationEnrichment::new("sub".to_string(), None, HashMap::new(), None);
        enrichment.enrich(&mut event).await.unwrap();
        assert!(event.get_value("collector_auth").is_none());
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_is_a_noop() {
        let raw = Arc::new(CollectorPayload {
            headers: Some(vec!["Authorization: Basic dXNlcjpwYXNz".to_string()]),
            ..Default::default()
        });
        let mut event = TemporaryAtomicEvent::new(raw);
        let enrichment = AuthenticationEnrichment::new("sub".to_string(), None, HashMap::new(), None);
        enrichment.enrich(&mut event).await.unwrap();
        assert!(event.get_value("collector_auth").is_none());
    }
}
