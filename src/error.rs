use crate::event::Event;

/// Error type returned by a [`SecretResolver`](crate::SecretResolver).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed reading request body: {0}")]
    Read(#[from] std::io::Error),
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error("invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("push payload contains no ref changes")]
    EmptyChangeset,
    #[error("unknown webhook event `{0}`")]
    UnknownEvent(String),
    #[error("signature doesn't match")]
    SignatureInvalid { event: Option<Box<Event>> },
    /// Failure reported by the caller's resolver, passed through untouched.
    #[error("{source}")]
    Resolver {
        #[source]
        source: BoxError,
        event: Option<Box<Event>>,
    },
}

impl Error {
    /// The parsed event, when the provider hands it back alongside an
    /// authentication failure.
    pub fn event(&self) -> Option<&Event> {
        match self {
            Error::SignatureInvalid { event } | Error::Resolver { event, .. } => event.as_deref(),
            _ => None,
        }
    }

    pub fn into_event(self) -> Option<Event> {
        match self {
            Error::SignatureInvalid { event } | Error::Resolver { event, .. } => {
                event.map(|event| *event)
            }
            _ => None,
        }
    }

    /// Attaches `event` to authentication failures; other errors are
    /// returned unchanged.
    pub(crate) fn with_event(self, event: Event) -> Self {
        match self {
            Error::SignatureInvalid { .. } => Error::SignatureInvalid {
                event: Some(Box::new(event)),
            },
            Error::Resolver { source, .. } => Error::Resolver {
                source,
                event: Some(Box::new(event)),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("vault is sealed")]
    struct Sealed;

    #[test]
    fn resolver_error_is_the_source() {
        let err = Error::Resolver {
            source: Box::new(Sealed),
            event: None,
        };
        assert_eq!(err.to_string(), "vault is sealed");
        let source = err.source().expect("resolver error as source");
        assert!(source.is::<Sealed>());
        assert!(source.source().is_none());
    }
}
