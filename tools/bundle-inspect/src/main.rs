use anyhow::{bail, Context, Result};
use asset_registry::bundle_format::{write_bundle, EntrySource};
use asset_registry::Bundle;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Bundle tooling:
// - verify: opens a bundle, lists its index and reads every entry (checksums included)
// - pack: writes files into a new bundle, entry name = file stem
//   cargo run -p bundle-inspect -- pack ui.bundle assets/UI --type-name text

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a bundle file
    Verify { path: PathBuf },
    /// Pack files and directories into a bundle
    Pack {
        out: PathBuf,
        inputs: Vec<PathBuf>,
        /// Type tag for every entry; by default `.txt` is "text" and the rest "bytes"
        #[arg(long)]
        type_name: Option<String>,
    },
}

fn main() -> Result<()> {
    match Args::parse().command {
        Command::Verify { path } => verify(&path),
        Command::Pack {
            out,
            inputs,
            type_name,
        } => pack(&out, &inputs, type_name.as_deref()),
    }
}

fn verify(path: &Path) -> Result<()> {
    let bundle =
        Bundle::open(path).with_context(|| format!("opening {}", path.display()))?;
    println!("Bundle: {} bytes, {} entries", bundle.len(), bundle.entry_count());

    for name in bundle.names() {
        let Some(entry) = bundle.entry(&name) else {
            continue;
        };
        println!(
            "- {}: type={} offset={} size={} checksum={}",
            entry.name,
            entry.type_name,
            entry.offset,
            entry.size,
            if entry.checksum.is_some() { "yes" } else { "no" }
        );
        bundle
            .read_entry(&name)
            .with_context(|| format!("reading entry '{}'", name))?;
    }

    println!("bundle ok");
    Ok(())
}

fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for p in inputs {
        if p.is_dir() {
            for entry in WalkDir::new(p).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        } else if p.is_file() {
            files.push(p.clone());
        }
    }
    files.retain(|f| f.extension().and_then(|e| e.to_str()) != Some("meta"));
    files.sort();
    files
}

fn default_type_name(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("txt") => "text",
        _ => "bytes",
    }
}

fn pack(out: &Path, inputs: &[PathBuf], type_name: Option<&str>) -> Result<()> {
    let files = collect_inputs(inputs);
    if files.is_empty() {
        bail!("no input files");
    }

    let mut loaded = Vec::with_capacity(files.len());
    for file in &files {
        let name = file
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("non-utf8 file name {}", file.display()))?
            .to_string();
        let data = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
        let tag = type_name.unwrap_or_else(|| default_type_name(file));
        loaded.push((name, tag, data));
    }

    let sources: Vec<EntrySource<'_>> = loaded
        .iter()
        .map(|(name, tag, data)| EntrySource::new(name, tag, data))
        .collect();
    let bytes = write_bundle(&sources).context("building bundle")?;
    std::fs::write(out, &bytes).with_context(|| format!("writing {}", out.display()))?;

    println!("Wrote {} ({} entries, {} bytes)", out.display(), sources.len(), bytes.len());
    Ok(())
}
