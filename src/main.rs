//! Main entry point for the zipscan CLI application.
//!
//! Lists or extracts ZIP archives from the local filesystem or from HTTP URLs.

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use std::path::Path;
use std::sync::Arc;

use zipscan::zip::extractor::enclosed_path;
use zipscan::{Cli, HttpRangeReader, LocalFileReader, ReadAt, ZipArchive, ZipExtractor};

/// Application entry point.
///
/// Parses command-line arguments, sets up logging and opens either an HTTP
/// Range reader or a local file reader before handing off to [`process_zip`].
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    if cli.is_http_url() {
        let reader = HttpRangeReader::with_options(cli.file.clone(), cli.http_options())
            .await
            .with_context(|| format!("cannot open {}", cli.file))?;
        let reader = Arc::new(reader);

        process_zip(reader.clone(), &cli).await?;

        // Display network transfer statistics for HTTP sources
        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {} of {}",
                format_size(reader.transferred_bytes()),
                format_size(reader.size())
            );
        }
    } else {
        let reader = LocalFileReader::new(Path::new(&cli.file))
            .with_context(|| format!("cannot open {}", cli.file))?;
        process_zip(Arc::new(reader), &cli).await?;
    }

    Ok(())
}

/// Parse the central directory and list or extract entries.
///
/// - List mode (`-l`, `-v` or `--offsets`): print the directory
/// - Pipe mode (`-p`): write selected file payloads to stdout
/// - Extract mode: write selected entries below `-d`, skipping existing files
///   unless `-o` is given
///
/// # Arguments
///
/// * `reader` - Random-access source holding the archive
/// * `cli` - Parsed command-line arguments
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if the archive cannot be parsed,
/// no entry matches the requested names, or an extraction fails.
async fn process_zip<R: ReadAt + 'static>(reader: Arc<R>, cli: &Cli) -> Result<()> {
    let archive = ZipArchive::parse(reader)
        .await
        .with_context(|| format!("cannot read ZIP directory of {}", cli.file))?;

    if cli.is_listing() {
        return list_files(&archive, cli).await;
    }

    let extractor = ZipExtractor::new(archive);
    let selected: Vec<_> = extractor
        .entries()
        .iter()
        .filter(|e| cli.selects(&e.name_lossy()))
        .collect();

    if selected.is_empty() && !cli.names.is_empty() {
        anyhow::bail!("no entry matches {}", cli.names.join(", "));
    }

    for entry in selected {
        let name = entry.name_lossy();
        if cli.pipe {
            if entry.is_dir() {
                continue;
            }
            extractor
                .extract_to_stdout(entry)
                .await
                .with_context(|| format!("cannot extract {name}"))?;
            continue;
        }

        let target = Path::new(&cli.extract_dir).join(enclosed_path(entry)?);
        if !entry.is_dir() && target.exists() && !cli.overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {name} (use -o to overwrite)");
            }
            continue;
        }

        if !cli.is_quiet() {
            println!("  extracting: {name}");
        }
        extractor
            .extract_to_file(entry, Path::new(&cli.extract_dir))
            .await
            .with_context(|| format!("cannot extract {name}"))?;
    }

    Ok(())
}

/// Print the archive listing.
///
/// Supports two output formats:
/// - Simple format (`-l`): entry names, one per line
/// - Table format (`-v`): sizes, ratio, method, CRC-32 and timestamp per entry,
///   plus the local header and payload offsets with `--offsets`
///
/// # Arguments
///
/// * `archive` - The parsed archive
/// * `cli` - Parsed command-line arguments
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if a local header cannot be read
/// while resolving payload offsets.
async fn list_files<R: ReadAt + 'static>(archive: &ZipArchive<R>, cli: &Cli) -> Result<()> {
    if !(cli.verbose || cli.offsets) {
        for entry in archive.entries() {
            println!("{}", entry.name_lossy());
        }
        return Ok(());
    }

    print!(
        "{:>12}  {:>12}  {:>5}  {:>6}  {:>8}  {:>10}  {:>5}  ",
        "Length", "Size", "Cmpr", "Method", "CRC-32", "Date", "Time"
    );
    if cli.offsets {
        print!("{:>12}  {:>12}  ", "Header", "Payload");
    }
    println!("Name");
    let width = if cli.offsets { 108 } else { 80 };
    println!("{}", "-".repeat(width));

    let mut totals = Totals::default();

    for entry in archive.entries() {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();

        print!(
            "{:>12}  {:>12}  {}  {:>6}  {:08x}  {:04}-{:02}-{:02}  {:02}:{:02}  ",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            entry.compression_method.to_string(),
            entry.crc32,
            year,
            month,
            day,
            hour,
            minute,
        );
        if cli.offsets {
            let payload = archive
                .resolve_payload_offset(entry)
                .await
                .with_context(|| format!("cannot read local header of {}", entry.name_lossy()))?;
            print!("{:>12}  {:>12}  ", entry.local_header_offset, payload);
        }
        println!("{}", entry.name_lossy());

        if !entry.is_dir() {
            totals.add(entry.compressed_size, entry.uncompressed_size);
        }
    }

    println!("{}", "-".repeat(width));
    println!(
        "{:>12}  {:>12}  {}  {} files{}",
        totals.uncompressed,
        totals.compressed,
        ratio(totals.compressed, totals.uncompressed),
        totals.files,
        if archive.metadata().is_zip64 {
            " (ZIP64)"
        } else {
            ""
        }
    );

    Ok(())
}

/// Running sums for the table footer.
///
/// ZIP64 sizes can each approach `u64::MAX`, so the sums are kept in `u128`.
#[derive(Debug, Default)]
struct Totals {
    uncompressed: u128,
    compressed: u128,
    files: usize,
}

impl Totals {
    fn add(&mut self, compressed: u64, uncompressed: u64) {
        self.compressed += u128::from(compressed);
        self.uncompressed += u128::from(uncompressed);
        self.files += 1;
    }
}

/// Compression ratio as percentage saved, right-aligned to the `Cmpr` column.
fn ratio(compressed: impl Into<u128>, uncompressed: impl Into<u128>) -> String {
    let (compressed, uncompressed) = (compressed.into(), uncompressed.into());
    let saved = if uncompressed == 0 || compressed >= uncompressed {
        0
    } else {
        100 - compressed * 100 / uncompressed
    };
    format!("{saved:>4}%")
}

/// Format a byte size into a human-readable string.
///
/// # Arguments
///
/// * `size` - The size in bytes to format
///
/// # Returns
///
/// The size with the largest fitting unit (bytes, KB, MB, GB).
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
