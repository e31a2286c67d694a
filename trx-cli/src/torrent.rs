//! Torrent commands: status, info, start, stop, add, remove.

use anyhow::{Context, Result};
use trx::{AddTorrent, Client, Value};

use crate::OutputFormat;
use crate::render;

/// Arguments for `trx status` and `trx info`.
#[derive(clap::Args)]
pub struct QueryArgs {
    /// Torrent id (default: all torrents).
    pub id: Option<i64>,
}

/// Arguments for `trx start` and `trx stop`.
#[derive(clap::Args)]
pub struct ToggleArgs {
    /// Torrent id.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub id: Option<i64>,

    /// Apply to every torrent.
    #[arg(short = 'a', long)]
    pub all: bool,
}

/// Arguments for `trx add`.
#[derive(clap::Args)]
pub struct AddArgs {
    /// Path to the .torrent file.
    pub file: String,

    /// Download directory.
    #[arg(short = 'd', long)]
    pub directory: Option<String>,

    /// Start the torrent right away (default: daemon setting).
    #[arg(long, conflicts_with = "paused")]
    pub start: bool,

    /// Add the torrent without starting it.
    #[arg(long)]
    pub paused: bool,
}

/// Arguments for `trx rm`.
#[derive(clap::Args)]
pub struct RmArgs {
    /// Torrent ids.
    #[arg(required_unless_present = "all", conflicts_with = "all", num_args = 1..)]
    pub ids: Vec<i64>,

    /// Remove every torrent.
    #[arg(short = 'a', long)]
    pub all: bool,
}

pub fn status(client: &mut Client, args: &QueryArgs, format: OutputFormat) -> Result<()> {
    let rows = match args.id {
        Some(id) => vec![client.status(id)?],
        None => client.status_all()?,
    };
    print_rows(&rows, format, "No torrents.");
    Ok(())
}

pub fn info(client: &mut Client, args: &QueryArgs, format: OutputFormat) -> Result<()> {
    let rows = match args.id {
        Some(id) => vec![client.info(id)?],
        None => client.info_all()?,
    };
    print_rows(&rows, format, "No torrents.");
    Ok(())
}

pub fn start(client: &mut Client, args: &ToggleArgs) -> Result<()> {
    let ok = match args.id {
        Some(id) if !args.all => client.start(id)?,
        _ => client.start_all()?,
    };
    check(ok, "start")
}

pub fn stop(client: &mut Client, args: &ToggleArgs) -> Result<()> {
    let ok = match args.id {
        Some(id) if !args.all => client.stop(id)?,
        _ => client.stop_all()?,
    };
    check(ok, "stop")
}

pub fn add(client: &mut Client, args: AddArgs) -> Result<()> {
    let mut torrent = AddTorrent::new(&args.file);
    if let Some(dir) = args.directory {
        torrent = torrent.directory(dir);
    }
    if args.start || args.paused {
        torrent = torrent.autostart(args.start);
    }
    match client
        .add_torrent(&torrent)
        .with_context(|| format!("failed to add {}", args.file))?
    {
        Some(id) => println!("added torrent (id={id})"),
        None => anyhow::bail!("failed to add torrent (daemon gave no reason)"),
    }
    Ok(())
}

pub fn rm(client: &mut Client, args: &RmArgs) -> Result<()> {
    if args.all {
        return check(client.remove_all()?, "remove-all");
    }
    for &id in &args.ids {
        check(client.remove_torrent(id)?, "remove")?;
        println!("{id}");
    }
    Ok(())
}

/// Turns a `false` success flag into an error.
pub fn check(ok: bool, command: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        anyhow::bail!("daemon reported failure for `{command}`")
    }
}

fn print_rows(rows: &[Value], format: OutputFormat, empty: &str) {
    if matches!(format, OutputFormat::Json) {
        let json: Vec<_> = rows.iter().map(render::to_json).collect();
        println!("{}", serde_json::Value::Array(json));
        return;
    }
    if rows.is_empty() {
        println!("{empty}");
    }
    for row in rows {
        println!("{}", trx::proto::to_line(row));
    }
}
