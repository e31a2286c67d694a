//! CLI for a locally running torrent daemon.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::missing_docs_in_private_items
)]

mod render;
mod torrent;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;
use trx::Client;
use trx::proto::{DEFAULT_SOCKET, int, text};

#[derive(Parser)]
#[command(name = "trx", version, about = "Control a torrent daemon over its local socket")]
struct Cli {
    /// Path to the daemon's socket.
    #[arg(short = 's', long, env = "TRX_SOCKET", default_value = DEFAULT_SOCKET, global = true)]
    socket: String,

    /// Seconds to wait for each reply, at least 1 (default: wait forever).
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Output format.
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the daemon answers.
    Ping,

    /// Show the status of one or all torrents.
    #[command(visible_alias = "ls")]
    Status(torrent::QueryArgs),

    /// Show metadata of one or all torrents.
    Info(torrent::QueryArgs),

    /// Start one or all torrents.
    Start(torrent::ToggleArgs),

    /// Stop one or all torrents.
    Stop(torrent::ToggleArgs),

    /// Add a torrent file.
    Add(torrent::AddArgs),

    /// Remove one or more torrents.
    Rm(torrent::RmArgs),

    /// Show or set the peer listening port.
    Port {
        /// New port.
        value: Option<i64>,
    },

    /// Show or set the global download limit.
    Downlimit {
        /// New limit.
        value: Option<i64>,
    },

    /// Show or set the global upload limit.
    Uplimit {
        /// New limit.
        value: Option<i64>,
    },

    /// Show or set the download directory.
    Dir {
        /// New directory.
        value: Option<String>,
    },

    /// Show or set whether added torrents start automatically.
    Autostart {
        /// New setting.
        value: Option<bool>,
    },

    /// Show or set whether the port is mapped automatically.
    Automap {
        /// New setting.
        value: Option<bool>,
    },

    /// Send a raw command and print the reply.
    ///
    /// Parameters that parse as integers are sent as integers, the rest
    /// as strings.
    Call {
        /// Command name (e.g. get-port).
        name: String,
        /// Command parameters.
        params: Vec<String>,
    },

    /// Generate shell completion scripts.
    #[command(hide = true)]
    Completion {
        /// Target shell.
        shell: Shell,
    },
}

/// Output format for query commands.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable lines.
    #[default]
    Table,
    /// Machine-readable JSON.
    Json,
}

fn main() {
    let cli = Cli::parse();

    // stderr, so stdout stays clean for --format json
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli.dispatch() {
        eprintln!("trx: {e:#}");
        std::process::exit(1);
    }
}

impl Cli {
    fn client(&self) -> Client {
        let mut builder = Client::builder().socket(&self.socket);
        if let Some(secs) = self.timeout {
            builder = builder.read_timeout(std::time::Duration::from_secs(secs));
        }
        builder.build()
    }

    fn dispatch(self) -> Result<()> {
        let mut client = self.client();
        let format = self.format;
        match self.command {
            Command::Ping => {
                torrent::check(client.ping()?, "noop")?;
                println!("ok");
            }
            Command::Status(args) => torrent::status(&mut client, &args, format)?,
            Command::Info(args) => torrent::info(&mut client, &args, format)?,
            Command::Start(args) => torrent::start(&mut client, &args)?,
            Command::Stop(args) => torrent::stop(&mut client, &args)?,
            Command::Add(args) => torrent::add(&mut client, args)?,
            Command::Rm(args) => torrent::rm(&mut client, &args)?,
            Command::Port { value } => match value {
                Some(port) => torrent::check(client.set_port(port)?, "port")?,
                None => println!("{}", client.port()?),
            },
            Command::Downlimit { value } => match value {
                Some(limit) => torrent::check(client.set_downlimit(limit)?, "downlimit")?,
                None => println!("{}", client.downlimit()?),
            },
            Command::Uplimit { value } => match value {
                Some(limit) => torrent::check(client.set_uplimit(limit)?, "uplimit")?,
                None => println!("{}", client.uplimit()?),
            },
            Command::Dir { value } => match value {
                Some(dir) => torrent::check(client.set_directory(&dir)?, "directory")?,
                None => println!("{}", client.directory()?),
            },
            Command::Autostart { value } => match value {
                Some(on) => torrent::check(client.set_autostart(on)?, "autostart")?,
                None => println!("{}", client.autostart()?),
            },
            Command::Automap { value } => match value {
                Some(on) => torrent::check(client.set_automap(on)?, "automap")?,
                None => println!("{}", client.automap()?),
            },
            Command::Call { name, params } => {
                let params = params
                    .iter()
                    .map(|p| p.parse().map_or_else(|_| text(p), int))
                    .collect();
                let reply = client.call(&name, params)?;
                if matches!(format, OutputFormat::Json) {
                    println!("{}", render::to_json(&reply));
                } else {
                    println!("{}", trx::proto::to_line(&reply));
                }
            }
            Command::Completion { shell } => {
                clap_complete::generate(shell, &mut Self::command(), "trx", &mut std::io::stdout());
            }
        }
        Ok(())
    }
}
