use std::io::Read;

use crate::{
    error::Error,
    event::Event,
    provider::{body_field, Discriminator, Provider},
    request::{Request, MAX_BODY_SIZE},
    verify::{self, SecretResolver},
};

/// Parses and authenticates a webhook delivery.
///
/// Returns `Ok(None)` for deliveries that are valid but carry nothing to act
/// on. When the signature check or the resolver fails, providers that allow
/// it attach the parsed event to the error (see [`Error::event`]).
#[tracing::instrument(
    name = "parse webhook",
    skip_all,
    fields(provider = %provider, method = req.method())
)]
pub fn parse<B, R>(provider: Provider, mut req: Request<B>, resolver: &R) -> Result<Option<Event>, Error>
where
    B: Read,
    R: SecretResolver + ?Sized,
{
    let body = req.read_body(MAX_BODY_SIZE)?;

    let discriminator = match provider.discriminator() {
        Discriminator::Header(name) => req.header(name).unwrap_or_default().to_string(),
        Discriminator::BodyField(field) => body_field(&body, field)?,
    };

    let event = match provider.dispatch(&discriminator, &body)? {
        Some(event) => event,
        None => return Ok(None),
    };

    match verify::verify(provider.credential(), &req, &body, &event, resolver) {
        Ok(()) => Ok(Some(event)),
        Err(err) if provider.returns_event_on_rejection() => Err(err.with_event(event)),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use secstr::SecStr;

    use super::*;

    fn no_secret(_: &Event) -> Result<SecStr, Infallible> {
        Ok(SecStr::new(Vec::new()))
    }

    #[test]
    fn oversized_body_is_rejected_before_decoding() {
        let body = vec![b' '; MAX_BODY_SIZE + 1];
        let req = Request::new(&body[..]).with_header("X-GitHub-Event", "push");
        assert!(matches!(
            parse(Provider::GitHub, req, &no_secret),
            Err(Error::PayloadTooLarge { limit: MAX_BODY_SIZE })
        ));
    }

    #[test]
    fn missing_header_discriminator_is_unknown() {
        let req = Request::new(&b"{}"[..]);
        assert!(matches!(parse(Provider::GitHub, req, &no_secret), Ok(None)));

        let req = Request::new(&b"{}"[..]);
        assert!(matches!(
            parse(Provider::Bitbucket, req, &no_secret),
            Err(Error::UnknownEvent(event)) if event.is_empty()
        ));
    }

    #[test]
    fn body_discriminator_requires_json_object() {
        let req = Request::new(&b"<xml/>"[..]);
        assert!(matches!(
            parse(Provider::Azure, req, &no_secret),
            Err(Error::Decode(_))
        ));
    }
}
