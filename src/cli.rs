use clap::Parser;
use std::time::Duration;

use crate::io::HttpOptions;

#[derive(Parser, Debug)]
#[command(name = "zipscan")]
#[command(version)]
#[command(about = "List and extract ZIP archives from local files or HTTP URLs", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipscan -l https://example.com/ota.zip            list files of a remote archive\n  \
  zipscan -v --offsets archive.zip                  show sizes, CRCs and payload offsets\n  \
  zipscan -p https://example.com/ota.zip payload.bin   stream one entry to stdout")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Entries to extract (exact names or directory prefixes; default: all)
    #[arg(value_name = "NAMES")]
    pub names: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Also resolve and show local header and payload offsets when listing
    #[arg(long)]
    pub offsets: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR", default_value = ".")]
    pub extract_dir: String,

    /// Overwrite existing files
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Quiet mode
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Do not verify TLS certificates
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// HTTP retries on timeouts and connection errors
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub retries: u32,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet || self.pipe
    }

    pub fn is_listing(&self) -> bool {
        self.list || self.verbose || self.offsets
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions::default()
            .timeout(Duration::from_secs(self.timeout))
            .max_retry(self.retries)
            .accept_invalid_certs(self.insecure)
    }

    /// Whether `name` was selected by the positional NAMES.
    pub fn selects(&self, name: &str) -> bool {
        self.names.is_empty()
            || self.names.iter().any(|wanted| {
                name == wanted
                    || name
                        .strip_prefix(wanted.trim_end_matches('/'))
                        .is_some_and(|rest| rest.starts_with('/'))
            })
    }
}
