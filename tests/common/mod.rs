#![allow(dead_code)]

use std::{convert::Infallible, fs, path::PathBuf};

use scmhook::Event;
use secstr::SecStr;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Raw body of a recorded delivery.
pub fn fixture(name: &str) -> Vec<u8> {
    fs::read(fixture_path(name)).unwrap_or_else(|err| panic!("reading {name}: {err}"))
}

/// The event a recorded delivery is expected to normalize into.
pub fn golden(name: &str) -> Event {
    let path = fixture_path(&format!("{name}.golden"));
    let raw = fs::read_to_string(&path).unwrap_or_else(|err| panic!("reading {path:?}: {err}"));
    serde_json::from_str(&raw).unwrap_or_else(|err| panic!("decoding {path:?}: {err}"))
}

pub fn no_secret(_: &Event) -> Result<SecStr, Infallible> {
    Ok(SecStr::new(Vec::new()))
}

pub fn secret(value: &'static str) -> impl Fn(&Event) -> Result<SecStr, Infallible> {
    move |_: &Event| Ok(SecStr::new(value.as_bytes().to_vec()))
}
