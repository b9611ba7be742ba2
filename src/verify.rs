use secstr::SecStr;

use crate::{
    error::{BoxError, Error},
    event::Event,
    request::Request,
    signature::Signature,
};

/// Looks up the secret a delivery is expected to be signed with.
///
/// Returning an empty secret disables verification for that event.
pub trait SecretResolver {
    fn resolve(&self, event: &Event) -> Result<SecStr, BoxError>;
}

impl<F, E> SecretResolver for F
where
    F: Fn(&Event) -> Result<SecStr, E>,
    E: Into<BoxError>,
{
    fn resolve(&self, event: &Event) -> Result<SecStr, BoxError> {
        self(event).map_err(Into::into)
    }
}

/// Where a provider carries the credential presented with a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    /// HMAC-SHA256 of the raw body, hex encoded after `prefix`.
    HmacSha256 {
        header: &'static str,
        prefix: &'static str,
    },
    /// The secret itself, sent as a query or form parameter.
    SharedSecret { param: &'static str },
}

pub(crate) fn verify<B, R>(
    credential: Credential,
    req: &Request<B>,
    body: &[u8],
    event: &Event,
    resolver: &R,
) -> Result<(), Error>
where
    R: SecretResolver + ?Sized,
{
    let key = resolver.resolve(event).map_err(|source| Error::Resolver {
        source,
        event: None,
    })?;
    if key.unsecure().is_empty() {
        tracing::debug!("No secret configured, skipping signature verification");
        return Ok(());
    }

    let valid = match credential {
        Credential::HmacSha256 { header, prefix } => match req.header(header) {
            Some(value) => match Signature::from_header(value, prefix)
                .and_then(|signature| signature.verify(body, key.unsecure()))
            {
                Ok(valid) => valid,
                Err(err) => {
                    tracing::warn!("Failed checking `{}` header: {}", header, err);
                    false
                }
            },
            None => {
                tracing::warn!("`{}` header isn't found", header);
                false
            }
        },
        Credential::SharedSecret { param } => match req.param(param) {
            Some(value) => SecStr::new(value.as_bytes().to_vec()) == key,
            None => {
                tracing::warn!("`{}` parameter isn't found", param);
                false
            }
        },
    };

    if valid {
        Ok(())
    } else {
        tracing::warn!(
            repo.namespace = event.repository().namespace.as_str(),
            repo.name = event.repository().name.as_str(),
            "Webhook signature doesn't match"
        );
        Err(Error::SignatureInvalid { event: None })
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::event::{Repository, Unrecognized, User};

    const HMAC: Credential = Credential::HmacSha256 {
        header: "X-Hub-Signature-256",
        prefix: "sha256=",
    };
    const SHARED: Credential = Credential::SharedSecret { param: "secret" };

    fn event() -> Event {
        Event::Unrecognized(Unrecognized {
            event: "ping".into(),
            repo: Repository::default(),
            sender: User::default(),
        })
    }

    fn secret(value: &'static str) -> impl Fn(&Event) -> Result<SecStr, Infallible> {
        move |_: &Event| Ok(SecStr::new(value.as_bytes().to_vec()))
    }

    #[test]
    fn hmac_header_matches() {
        let body = br#"{"zen":"Keep it logically awesome."}"#;
        let header = Signature::compute(body, b"topsecret").unwrap().to_header("sha256=");
        let req = Request::new(&b""[..]).with_header("x-hub-signature-256", header);
        assert!(verify(HMAC, &req, body, &event(), &secret("topsecret")).is_ok());
    }

    #[test]
    fn hmac_header_mismatch() {
        let body = b"{}";
        let header = Signature::compute(body, b"other").unwrap().to_header("sha256=");
        let req = Request::new(&b""[..]).with_header("X-Hub-Signature-256", header);
        assert!(matches!(
            verify(HMAC, &req, body, &event(), &secret("topsecret")),
            Err(Error::SignatureInvalid { .. })
        ));
    }

    #[test]
    fn missing_hmac_header_is_invalid() {
        let req = Request::new(&b""[..]);
        assert!(matches!(
            verify(HMAC, &req, b"{}", &event(), &secret("topsecret")),
            Err(Error::SignatureInvalid { .. })
        ));
    }

    #[test]
    fn shared_secret_matches() {
        let req = Request::new(&b""[..]).with_param("secret", "topsecret");
        assert!(verify(SHARED, &req, b"{}", &event(), &secret("topsecret")).is_ok());
    }

    #[test]
    fn shared_secret_mismatch() {
        let req = Request::new(&b""[..]).with_param("secret", "guess");
        assert!(matches!(
            verify(SHARED, &req, b"{}", &event(), &secret("topsecret")),
            Err(Error::SignatureInvalid { .. })
        ));
    }

    #[test]
    fn empty_secret_skips_verification() {
        let req = Request::new(&b""[..])
            .with_param("secret", "guess")
            .with_header("X-Hub-Signature-256", "garbage");
        assert!(verify(SHARED, &req, b"{}", &event(), &secret("")).is_ok());
        assert!(verify(HMAC, &req, b"{}", &event(), &secret("")).is_ok());
    }

    #[test]
    fn resolver_error_is_passed_through() {
        #[derive(Debug, thiserror::Error)]
        #[error("no such repository")]
        struct Missing;

        let resolver = |_: &Event| Err::<SecStr, _>(Missing);
        let req = Request::new(&b""[..]);
        let err = verify(SHARED, &req, b"{}", &event(), &resolver).unwrap_err();
        assert_eq!(err.to_string(), "no such repository");
        match err {
            Error::Resolver { source, .. } => assert!(source.is::<Missing>()),
            other => panic!("expected resolver error, got {:?}", other),
        }
    }
}
