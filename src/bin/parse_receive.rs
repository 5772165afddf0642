//! Turn `signal-cli receive` output into JSON lines.
//!
//! Usage: parse_receive [--self <number>] [--chunk <bytes>] [--receive | FILE]
//! Reads stdin when FILE is missing. `--receive` runs one `signal-cli receive`
//! for the configured account and parses its output instead. Each message is
//! printed as one JSON object, followed by a per-contact summary on stderr.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::time::Instant;

use sparktui::chat::{ConversationStore, OutputFeed};
use sparktui::config::Config;
use sparktui::logging;
use sparktui::signal::SignalCli;

struct Args {
    self_id: Option<String>,
    chunk_size: usize,
    receive: bool,
    path: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        self_id: None,
        chunk_size: 4096,
        receive: false,
        path: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--self" => args.self_id = Some(iter.next().context("--self needs a value")?),
            "--chunk" => {
                let value = iter.next().context("--chunk needs a value")?;
                args.chunk_size = value
                    .parse()
                    .with_context(|| format!("invalid chunk size {:?}", value))?;
                if args.chunk_size == 0 {
                    bail!("chunk size must be positive");
                }
            }
            "--receive" => args.receive = true,
            other if other.starts_with("--") => bail!("unknown flag {}", other),
            other => args.path = Some(other.to_string()),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let config = Config::load();
    if let Err(e) = logging::init_stderr(&config.logging) {
        eprintln!("Logging disabled: {:#}", e);
    }

    let self_id = args
        .self_id
        .unwrap_or_else(|| config.self_id().to_string());
    if self_id.is_empty() {
        log::warn!("No self number given, own messages cannot be told apart");
    }

    let mut input: Box<dyn Read> = if args.receive {
        let cli = SignalCli::new(config.daemon.clone(), config.self_id());
        let output = cli.receive_once()?;
        if !output.success() {
            bail!("signal-cli receive exited with {:?}: {}", output.code, output.stderr.trim());
        }
        Box::new(Cursor::new(output.stdout.into_bytes()))
    } else {
        match &args.path {
            Some(path) => Box::new(File::open(path).with_context(|| format!("opening {}", path))?),
            None => Box::new(io::stdin().lock()),
        }
    };

    let start = Instant::now();
    let mut feed = OutputFeed::new(self_id);
    let mut store = ConversationStore::new();
    let mut out = BufWriter::new(io::stdout().lock());
    let mut buf = vec![0u8; args.chunk_size];
    let mut bytes = 0usize;

    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("reading input"),
        };
        bytes += n;
        for message in feed.feed(&buf[..n], &mut store) {
            serde_json::to_writer(&mut out, &message)?;
            writeln!(out)?;
        }
    }
    // Saved files may lack the final newline
    if let Some(message) = feed.finish(&mut store) {
        serde_json::to_writer(&mut out, &message)?;
        writeln!(out)?;
    }
    out.flush()?;

    log::info!(
        "Parsed {} messages from {} bytes in {:?}",
        store.len(),
        bytes,
        start.elapsed()
    );

    for contact in store.contacts() {
        let messages = store.messages_for(Some(contact));
        let sent = messages.iter().filter(|m| m.from_self).count();
        eprintln!(
            "{:20} {:5} messages ({} sent, {} received)",
            contact,
            messages.len(),
            sent,
            messages.len() - sent
        );
    }

    Ok(())
}
