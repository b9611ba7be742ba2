use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::{error::Error, event::Event, verify::Credential};

pub mod azure;
pub mod bitbucket;
pub mod github;

/// Source-hosting providers this crate can ingest webhooks from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    GitHub,
    Bitbucket,
    Azure,
}

/// Where a provider puts the event discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator {
    Header(&'static str),
    /// Top-level string field of the JSON body.
    BodyField(&'static str),
}

/// Policy for discriminators a provider module doesn't recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownEvents {
    /// Treat the delivery as valid with nothing to do.
    Ignore,
    /// Fail with [`Error::UnknownEvent`].
    Reject,
}

/// Result of routing a delivery inside a provider module.
#[derive(Debug)]
pub(crate) enum Dispatched {
    Event(Event),
    /// Known discriminator, but the payload maps to no event.
    Nothing,
    Unknown,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::GitHub, Provider::Bitbucket, Provider::Azure];

    pub fn name(self) -> &'static str {
        match self {
            Provider::GitHub => "github",
            Provider::Bitbucket => "bitbucket",
            Provider::Azure => "azure",
        }
    }

    pub fn discriminator(self) -> Discriminator {
        match self {
            Provider::GitHub => Discriminator::Header("X-GitHub-Event"),
            Provider::Bitbucket => Discriminator::Header("X-Event-Key"),
            Provider::Azure => Discriminator::BodyField("eventType"),
        }
    }

    pub fn credential(self) -> Credential {
        match self {
            Provider::GitHub => Credential::HmacSha256 {
                header: "X-Hub-Signature-256",
                prefix: "sha256=",
            },
            Provider::Bitbucket | Provider::Azure => Credential::SharedSecret { param: "secret" },
        }
    }

    pub fn unknown_events(self) -> UnknownEvents {
        match self {
            Provider::GitHub | Provider::Azure => UnknownEvents::Ignore,
            Provider::Bitbucket => UnknownEvents::Reject,
        }
    }

    /// Whether the parsed event is handed back together with a signature or
    /// resolver failure.
    pub fn returns_event_on_rejection(self) -> bool {
        match self {
            Provider::GitHub | Provider::Bitbucket => true,
            Provider::Azure => false,
        }
    }

    /// Decodes `body` according to `discriminator` and maps it into an event.
    ///
    /// `Ok(None)` means the delivery is valid but carries nothing to act on.
    pub fn dispatch(self, discriminator: &str, body: &[u8]) -> Result<Option<Event>, Error> {
        let dispatched = match self {
            Provider::GitHub => github::dispatch(discriminator, body)?,
            Provider::Bitbucket => bitbucket::dispatch(discriminator, body)?,
            Provider::Azure => azure::dispatch(discriminator, body)?,
        };

        match dispatched {
            Dispatched::Event(event) => {
                tracing::debug!(
                    provider = self.name(),
                    event = discriminator,
                    kind = event.kind(),
                    "Mapped webhook event"
                );
                Ok(Some(event))
            }
            Dispatched::Nothing => {
                tracing::debug!(
                    provider = self.name(),
                    event = discriminator,
                    "Webhook event carries nothing to act on"
                );
                Ok(None)
            }
            Dispatched::Unknown => match self.unknown_events() {
                UnknownEvents::Ignore => {
                    tracing::debug!(
                        provider = self.name(),
                        event = discriminator,
                        "Ignoring unknown webhook event"
                    );
                    Ok(None)
                }
                UnknownEvents::Reject => Err(Error::UnknownEvent(discriminator.to_string())),
            },
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider `{0}`")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .iter()
            .copied()
            .find(|provider| provider.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

/// Reads a top-level string field out of a JSON body.
///
/// A missing or non-string field yields an empty discriminator.
pub(crate) fn body_field(body: &[u8], field: &str) -> Result<String, Error> {
    let value: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)?;
    Ok(value
        .get(field)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string())
}

/// Deserializes `null` the same as a missing field.
pub(crate) fn nullable<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Option::unwrap_or_default)
}
