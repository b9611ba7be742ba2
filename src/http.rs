use std::{collections::HashMap, convert::Infallible};

use actix_web::{
    dev::Payload, error::ResponseError, http::StatusCode, web, web::Bytes, FromRequest,
    HttpRequest,
};
use futures::future::{FutureExt, LocalBoxFuture};
use scmhook::{provider::UnknownProvider, Event, Provider, Request};
use secstr::SecStr;

#[derive(Debug, Clone)]
pub struct Webhook(pub Option<Event>);

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error(transparent)]
    UnknownProvider(#[from] UnknownProvider),
    #[error(transparent)]
    Parse(#[from] scmhook::Error),
    #[error("failed reading request data: {0}")]
    ActixError(#[from] actix_web::Error),
}

impl ResponseError for WebhookError {
    fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            WebhookError::Parse(err) => match err {
                scmhook::Error::Read(_)
                | scmhook::Error::Decode(_)
                | scmhook::Error::EmptyChangeset
                | scmhook::Error::UnknownEvent(_) => StatusCode::BAD_REQUEST,
                scmhook::Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                scmhook::Error::SignatureInvalid { .. } => StatusCode::FORBIDDEN,
                scmhook::Error::Resolver { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            WebhookError::ActixError(err) => err.as_response_error().status_code(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    pub secret: Option<SecStr>,
}

impl WebhookConfig {
    pub fn new(secret: Option<SecStr>) -> Self {
        Self { secret }
    }
}

impl FromRequest for Webhook {
    type Error = WebhookError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(Bytes::from_request(&req, payload).map(
            move |bytes| -> Result<Self, Self::Error> {
                let provider: Provider = req.match_info().query("provider").parse()?;
                let secret = req
                    .app_data::<WebhookConfig>()
                    .and_then(|config| config.secret.clone())
                    .unwrap_or_else(|| SecStr::new(Vec::new()));

                let bytes = bytes?;
                let mut request = Request::new(bytes.as_ref()).with_method(req.method().as_str());
                for (name, value) in req.headers() {
                    if let Ok(value) = value.to_str() {
                        request = request.with_header(name.as_str(), value);
                    }
                }
                // Undecodable query strings only lose their parameters.
                if let Ok(query) = web::Query::<HashMap<String, String>>::from_query(req.query_string()) {
                    for (name, value) in query.into_inner() {
                        request = request.with_param(name, value);
                    }
                }

                let resolver = move |_: &Event| Ok::<_, Infallible>(secret.clone());
                match scmhook::parse(provider, request, &resolver) {
                    Ok(event) => Ok(Self(event)),
                    Err(err) => {
                        if let Some(event) = err.event() {
                            tracing::warn!(
                                provider = provider.name(),
                                kind = event.kind(),
                                repo.namespace = event.repository().namespace.as_str(),
                                repo.name = event.repository().name.as_str(),
                                "Rejected webhook: {}",
                                err
                            );
                        } else {
                            tracing::warn!(provider = provider.name(), "Rejected webhook: {}", err);
                        }
                        Err(err.into())
                    }
                }
            },
        ))
    }
}
