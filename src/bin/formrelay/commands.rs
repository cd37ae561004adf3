use crate::server::start_web_server;
use anyhow::{bail, Context, Result};
use clap::Parser;
use formrelay::config::RelayConfig;
use formrelay::parser::backend_parser;
use once_cell::sync::Lazy;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::select;
use tracing::info;
use url::Url;

/// Relative path of the optional configuration file.
const CONFIG_FILE: &str = "formrelay.toml";

// Create a reqwest client that will be used to make HTTP requests. This allows
// for keep-alives if we are making multiple requests to the same host.
pub(crate) static CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("formrelay/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .expect("Unable to create reqwest client")
});

#[derive(Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Application {
    /// The base URL of the backend service that submissions are forwarded to.
    ///
    /// The URL can be provided in the following formats:
    /// - `:5000`. Defaults to `http` and `localhost`.
    /// - `backend.internal:5000`. Defaults to `http`.
    /// - `https://backend.example.com`. No defaults.
    #[clap(long, env, value_parser = backend_parser, verbatim_doc_comment)]
    backend_url: Option<Url>,

    /// The listen address for the web server.
    #[clap(short, long, env)]
    listen_address: Option<SocketAddr>,
}

#[derive(Debug, Clone)]
struct Arguments {
    backend_url: Url,
    listen_address: SocketAddr,
}

impl Arguments {
    fn new(args: Application, config: RelayConfig) -> Self {
        Arguments {
            backend_url: args
                .backend_url
                .or(config.backend_url)
                .unwrap_or_else(|| Url::parse("http://127.0.0.1:5000").unwrap()), // .unwrap is safe because we control the input
            listen_address: args
                .listen_address
                .or(config.listen_address)
                .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, 3000))),
        }
    }
}

/// Load the configuration file from the current directory. A missing file is
/// not an error, it simply results in the default configuration.
async fn load_config() -> Result<RelayConfig> {
    match tokio::fs::read_to_string(CONFIG_FILE).await {
        Ok(contents) => {
            toml::from_str(&contents).with_context(|| format!("Unable to parse {}", CONFIG_FILE))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RelayConfig::default()),
        Err(err) => Err(err).with_context(|| format!("Unable to read {}", CONFIG_FILE)),
    }
}

pub async fn handle_command(app: Application) -> Result<()> {
    let config = load_config().await?;
    let args = Arguments::new(app, config);

    info!("Backend URL: {}", args.backend_url);

    // Start the web server hosting the form, its assets and the submission
    // relay.
    let listen_address = args.listen_address;
    let web_server_task = async move { start_web_server(&listen_address, args.backend_url).await };

    select! {
        biased;

        _ = tokio::signal::ctrl_c() => {
            info!("SIGINT signal received, exiting...");
            Ok(())
        }

        Err(err) = web_server_task => {
            bail!("Web server exited with an error: {err:?}");
        }

        else => {
            Ok(())
        }
    }
}
