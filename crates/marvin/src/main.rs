//! The `marvin` command line.
//!
//! ```bash
//! marvin -n marvin -H irc.hackint.eu '#marvin' '#test'
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use marvin_modules::{NickServ, Rejoin, Remind, Time};
use marvin_runtime::{MarvinRuntime, RuntimeBuilder};

/// A modular IRC bot.
#[derive(Debug, Parser)]
#[command(name = "marvin", version, about)]
struct Cli {
    /// Configuration file (defaults to ./marvin.toml or the user config directory).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Nickname to register with.
    #[arg(short, long)]
    nick: Option<String>,

    /// Real name sent with USER.
    #[arg(short, long)]
    realname: Option<String>,

    /// IRC server host.
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// IRC server port.
    #[arg(short, long)]
    port: Option<u16>,

    /// PEM file with the certificates to trust instead of the system roots.
    #[arg(long, value_name = "FILE", conflicts_with = "no_tls")]
    cert: Option<PathBuf>,

    /// Connect without TLS.
    #[arg(long)]
    no_tls: bool,

    /// Log every line received from the server.
    #[arg(short, long)]
    verbose: bool,

    /// Channels to join, replacing the configured list.
    #[arg(value_name = "CHANNEL")]
    channels: Vec<String>,
}

impl Cli {
    fn apply(self, mut builder: RuntimeBuilder) -> RuntimeBuilder {
        builder = match self.config {
            Some(path) => builder.config_file(path),
            None => builder.with_current_dir().with_user_config_dir(),
        };

        if let Some(nick) = self.nick {
            builder = builder.set("identity.nickname", nick);
        }
        if let Some(realname) = self.realname {
            builder = builder.set("identity.realname", realname);
        }
        if let Some(host) = self.host {
            builder = builder.set("server.host", host);
        }
        if let Some(port) = self.port {
            builder = builder.set("server.port", port);
        }
        if let Some(cert) = self.cert {
            builder = builder.set("server.cert", cert);
        }
        if self.no_tls {
            builder = builder.set("server.tls", false);
        }
        if self.verbose {
            builder = builder.set("logging.verbose", true);
        }
        if !self.channels.is_empty() {
            builder = builder.set("channels", self.channels);
        }
        builder
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut runtime = cli.apply(MarvinRuntime::builder()).build()?;

    runtime.register_module::<Rejoin>()?;
    runtime.register_module::<NickServ>()?;
    runtime.register_module::<Time>()?;
    runtime.register_module::<Remind>()?;

    runtime.run().await?;

    Ok(())
}
