//! Normalizes source-hosting webhook deliveries into canonical events.
//!
//! ```
//! use std::convert::Infallible;
//!
//! use scmhook::{parse, Event, Provider, Request};
//! use secstr::SecStr;
//!
//! let body = br#"{"zen":"Design for failure.","hook_id":1,"sender":{"login":"octocat"}}"#;
//! let req = Request::new(&body[..]).with_header("X-GitHub-Event", "ping");
//! let resolver = |_: &Event| Ok::<_, Infallible>(SecStr::new(Vec::new()));
//!
//! let event = parse(Provider::GitHub, req, &resolver).unwrap().unwrap();
//! assert_eq!(event.kind(), "unrecognized");
//! assert_eq!(event.sender().login, "octocat");
//! ```

pub mod classify;
pub mod error;
pub mod event;
pub mod parse;
pub mod provider;
pub mod request;
pub mod signature;
pub mod verify;

pub use crate::{
    error::{BoxError, Error},
    event::Event,
    parse::parse,
    provider::Provider,
    request::{Request, MAX_BODY_SIZE},
    verify::{Credential, SecretResolver},
};
