use hmac::{Hmac, Mac as _};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("signature must start with `{0}`")]
    InvalidPrefix(&'static str),
    #[error("signature must be 64 hex digits")]
    NotHex,
    #[error("signature has invalid length")]
    InvalidLength,
    #[error("HMAC key has invalid length")]
    InvalidKeyLength,
}

impl From<hmac::digest::InvalidLength> for Error {
    fn from(_: hmac::digest::InvalidLength) -> Self {
        Self::InvalidKeyLength
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(pub [u8; 32]);

impl Signature {
    /// Parses a header value of the form `<prefix><64 hex digits>`.
    pub fn from_header(value: &str, prefix: &'static str) -> Result<Self, Error> {
        let hex_sig = value
            .trim()
            .strip_prefix(prefix)
            .ok_or(Error::InvalidPrefix(prefix))?;
        if hex_sig.len() != 64 {
            return Err(Error::InvalidLength);
        }
        hex::FromHex::from_hex(hex_sig)
            .map(Self)
            .map_err(|_| Error::NotHex)
    }

    pub fn compute(payload: &[u8], key: &[u8]) -> Result<Self, Error> {
        let mut sig = [0; 32];
        sig.copy_from_slice(&mac(key)?.chain_update(payload).finalize().into_bytes());
        Ok(Self(sig))
    }

    /// Constant-time check of this signature against `payload`.
    pub fn verify(&self, payload: &[u8], key: &[u8]) -> Result<bool, Error> {
        Ok(mac(key)?.chain_update(payload).verify_slice(&self.0).is_ok())
    }

    pub fn to_header(&self, prefix: &str) -> String {
        format!("{}{}", prefix, hex::encode(self.0))
    }
}

fn mac(key: &[u8]) -> Result<HmacSha256, Error> {
    Ok(HmacSha256::new_from_slice(key)?)
}
