//!
//! coffer pack binary
//! ------------------
//! Builds or extends a bank file from the plain filesystem: every file under
//! a directory whose extension the MIME table knows becomes a record (text as
//! `code`, binary as `link`), or a single text file is added by name.

use std::path::Path;

use anyhow::{bail, Context, Result};

use coffer::bank::Bank;
use coffer::mime::MimeTable;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} --out <bank> --dir <folder> [--root <root>] [--mime-bank <name>]\n  {program} --out <bank> --add <file> [--root <root>]\n\nFlags:\n  --root <path>        Root folder holding the Banks/ directory (default: .)\n  --mime-bank <name>   Bank holding the Config/Mime.txt record (default: Program)\n  --out <name>         Bank to create or extend\n  --dir <folder>       Pack a whole directory tree, classified by MIME type\n  --add <file>         Add one text file as a code record"
    );
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let program = std::env::args().next().unwrap_or_else(|| "coffer_pack".to_string());
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage(&program);
        return Ok(());
    }

    let root = arg_value(&args, "--root").unwrap_or_else(|| ".".to_string());
    let root = Path::new(&root);
    let Some(out) = arg_value(&args, "--out") else {
        print_usage(&program);
        bail!("Missing --out <bank>.");
    };

    let mut bank = if Bank::file_path(root, &out).exists() {
        Bank::load(root, &out).with_context(|| format!("While loading bank {out}"))?
    } else {
        Bank::empty(root, &out)
    };

    if let Some(dir) = arg_value(&args, "--dir") {
        let mime_bank = arg_value(&args, "--mime-bank").unwrap_or_else(|| "Program".to_string());
        let program_bank = Bank::load(root, &mime_bank)
            .with_context(|| format!("While loading bank {mime_bank} for the MIME table"))?;
        let mime = MimeTable::load(&program_bank, "Mime")
            .context("While reading the Mime config record")?;
        let added = bank
            .create_from_directory(Path::new(&dir), &mime)
            .with_context(|| format!("While packing {dir}"))?;
        bank.save().context("While saving the bank")?;
        println!("Added {added} files to bank {out}.");
    } else if let Some(file) = arg_value(&args, "--add") {
        bank.add_file(&file).with_context(|| format!("While adding {file}"))?;
        bank.save().context("While saving the bank")?;
        println!("Added file {file} to bank {out}.");
    } else {
        print_usage(&program);
        bail!("Nothing to do: pass --dir or --add.");
    }
    Ok(())
}
