use crate::parser::backend_parser;
use serde::de::Error;
use serde::{Deserialize, Deserializer};
use std::net::SocketAddr;
use url::Url;

/// This struct represents the formrelay.toml configuration. All properties in
/// here are optional so that the user only specifies the ones that they want
/// in that file.
#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RelayConfig {
    /// Base URL of the backend service that submissions are forwarded to.
    #[serde(default, deserialize_with = "parse_maybe_shorthand")]
    pub backend_url: Option<Url>,

    /// The address the web server listens on.
    pub listen_address: Option<SocketAddr>,
}

fn parse_maybe_shorthand<'de, D: Deserializer<'de>>(input: D) -> Result<Option<Url>, D::Error> {
    let input_str: Option<String> = Deserialize::deserialize(input)?;
    input_str
        .map(|input| backend_parser(&input).map_err(Error::custom))
        .transpose()
}
