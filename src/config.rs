use secstr::SecStr;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default, deserialize_with = "deserialize_opt_secstr")]
    pub webhook_secret: Option<SecStr>,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn deserialize_opt_secstr<'de, D>(de: D) -> Result<Option<SecStr>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(|o| o.map(|s| SecStr::new(s.into_bytes())))
}
