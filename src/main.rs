use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::{env, process};

use homecast::config::{Settings, resolve_audio_root, resolve_token_file};
use homecast::{Catalog, TokenStore, logging};
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Settings::load()?;
    if let Some(dir) = env::args().nth(1) {
        settings.library.root = PathBuf::from(dir);
    }
    if let Err(msg) = settings.validate() {
        eprintln!("invalid configuration: {msg}");
        process::exit(2);
    }

    logging::init(&settings.logging);

    let root = resolve_audio_root(&settings.library.root)?;
    let catalog = Catalog::open(
        &root,
        &settings.library.extensions,
        settings.library.debounce(),
    )?;
    info!(root = %root.display(), records = catalog.len(), "library ready");

    let tokens = match &settings.tokens.file {
        Some(file) => {
            let file = resolve_token_file(file)?;
            let store = TokenStore::open(&file, settings.tokens.debounce())?;
            info!(file = %file.display(), tokens = store.len(), "token store ready");
            Some(store)
        }
        None => None,
    };

    let run_result = run_commands(&catalog, tokens.as_ref());

    let mut close_failed = false;
    if let Err(e) = catalog.close() {
        error!(error = %e, "closing library watcher failed");
        close_failed = true;
    }
    if let Some(store) = &tokens {
        if let Err(e) = store.close() {
            error!(error = %e, "closing token watcher failed");
            close_failed = true;
        }
    }

    run_result?;
    if close_failed {
        process::exit(1);
    }
    Ok(())
}

/// Read commands from stdin until `quit` or EOF.
fn run_commands(catalog: &Catalog, tokens: Option<&TokenStore>) -> io::Result<()> {
    let stdin = io::stdin();
    let mut out = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.trim().splitn(2, char::is_whitespace);
        match (parts.next().unwrap_or(""), parts.next()) {
            ("", _) => {}
            ("list", _) => {
                for record in catalog.list() {
                    writeln!(out, "{}  {}", record.relative_path, record.title)?;
                }
            }
            ("count", _) => writeln!(out, "{}", catalog.len())?,
            ("check", Some(token)) => {
                let valid = tokens.is_some_and(|t| t.is_valid(token));
                writeln!(out, "{}", if valid { "valid" } else { "invalid" })?;
            }
            ("check", None) => writeln!(out, "usage: check <token>")?,
            ("quit", _) | ("q", _) => break,
            (other, _) => writeln!(out, "unknown command: {other} (list, count, check, quit)")?,
        }
        out.flush()?;
    }
    Ok(())
}
