use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use capbot_contracts::chat::{parse_intent, CHAT_HELP_COMMANDS};
use capbot_contracts::config::ModuleConfig;
use capbot_contracts::events::EventWriter;
use capbot_engine::{CaptionEngine, Reply};
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "capbot", version, about = "Caption bot host shim")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat loop reading commands from stdin.
    Chat(ChatArgs),
    /// Run a single chat line and exit.
    Exec(ExecArgs),
}

#[derive(Debug, Parser)]
struct ChatArgs {
    /// Directory rendered memes are written into.
    #[arg(long)]
    out: PathBuf,
    /// JSON module configuration; defaults apply when absent.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override for the image list file.
    #[arg(long)]
    store: Option<PathBuf>,
    /// Event log destination; defaults to <out>/events.jsonl.
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct ExecArgs {
    /// A single chat line, e.g. "/add https://..." or "/meme 1 hello".
    input: String,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    store: Option<PathBuf>,
    #[arg(long)]
    events: Option<PathBuf>,
    /// Text of the replied-to message, standing in for the host's
    /// reply resolution.
    #[arg(long)]
    reply_text: Option<String>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("capbot error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat(args) => run_chat(args),
        Command::Exec(args) => run_exec(args),
    }
}

fn build_engine(
    config: Option<&Path>,
    store: Option<&Path>,
    events: Option<&Path>,
    out: &Path,
) -> Result<CaptionEngine> {
    let mut config = match config {
        Some(path) => ModuleConfig::load(path),
        None => ModuleConfig::default(),
    };
    if let Some(store) = store {
        config.store_path = store.to_path_buf();
    }
    let events_path = events
        .map(Path::to_path_buf)
        .unwrap_or_else(|| out.join("events.jsonl"));
    let writer = EventWriter::new(events_path, format!("chat-{}", Uuid::new_v4()));
    CaptionEngine::new(config, writer)
}

fn run_chat(args: ChatArgs) -> Result<i32> {
    let engine = build_engine(
        args.config.as_deref(),
        args.store.as_deref(),
        args.events.as_deref(),
        &args.out,
    )?;

    println!("Capbot chat started. Type /help for commands.");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        let intent = parse_intent(input);
        if intent.action == "noop" {
            continue;
        }

        deliver(engine.handle(&intent, None), &args.out)?;
    }
    Ok(0)
}

fn run_exec(args: ExecArgs) -> Result<i32> {
    let engine = build_engine(
        args.config.as_deref(),
        args.store.as_deref(),
        args.events.as_deref(),
        &args.out,
    )?;

    let intent = parse_intent(&args.input);
    if intent.action == "noop" {
        println!("Commands: {}", CHAT_HELP_COMMANDS.join(" "));
        return Ok(0);
    }

    deliver(engine.handle(&intent, args.reply_text.as_deref()), &args.out)?;
    Ok(0)
}

fn deliver(reply: Reply, out_dir: &Path) -> Result<()> {
    match reply {
        Reply::Text(text) => println!("{text}"),
        Reply::Image { bytes, file_name } => {
            let path = write_artifact(out_dir, &file_name, &bytes)?;
            println!("Rendered {}", path.display());
        }
    }
    Ok(())
}

fn write_artifact(out_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed creating {}", out_dir.display()))?;
    let path = out_dir.join(file_name);
    fs::write(&path, bytes).with_context(|| format!("failed writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::write_artifact;

    #[test]
    fn write_artifact_creates_the_out_dir() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let out = temp.path().join("nested").join("memes");
        let path = write_artifact(&out, "meme-abc.jpg", b"jpeg bytes")?;
        assert_eq!(path, out.join("meme-abc.jpg"));
        assert_eq!(fs::read(path)?, b"jpeg bytes");
        Ok(())
    }
}
