use anyhow::{bail, Context, Result};
use url::Url;

/// Parses the input string into a Url. This uses a custom parser to allow for
/// some more flexible input.
///
/// Parsing adheres to the following rules:
/// - The protocol should only allow for http and https, where http is the
///   default.
/// - An input starting with a colon, such as `:5000`, refers to localhost on
///   that port.
/// - The port should follow the default for the protocol, 80 for http and 443
///   for https.
/// - Any path on the URL is kept. The relay appends its fixed suffix to it
///   when forwarding a submission.
pub fn backend_parser(input: &str) -> Result<Url> {
    let mut input = input.to_owned();

    if input.starts_with(':') {
        // Prepend http://localhost if the input starts with a colon.
        input = format!("http://localhost{}", input);
    }

    // Prepend http:// if the input does not contain ://. This is a rather naive
    // check, but it should suffice for our purposes.
    if !input.contains("://") {
        input = format!("http://{}", input);
    }

    let url =
        Url::parse(&input).with_context(|| format!("Unable to parse backend URL {}", input))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        bail!("unsupported protocol {}", url.scheme());
    }

    Ok(url)
}
