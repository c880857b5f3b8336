//! Fetchbuf CLI - Command line interface for one-shot HTTP fetches
//!
//! Usage:
//!   fetchbuf https://example.com                     # GET, body to stdout
//!   fetchbuf -d 'key=value' https://example.com/form # POST the data as-is
//!   fetchbuf -X DELETE -i https://example.com/item/1 # Print status + headers to stderr
//!   fetchbuf --strict -o out.bin https://example.com # Fail loudly, write to file

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use fetchbuf::{Body, FetchConfig, Fetcher, Request, Response};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Fetchbuf - fetch a URL into a single buffer
#[derive(Parser, Debug)]
#[command(name = "fetchbuf")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL to fetch
    url: String,

    /// Request method (defaults to GET, or POST when data is given)
    #[arg(short = 'X', long)]
    request: Option<String>,

    /// Request body, sent as-is
    #[arg(short = 'd', long)]
    data: Option<String>,

    /// Write the body to FILE instead of stdout
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Print the status line and headers to stderr
    #[arg(short = 'i', long)]
    include: bool,

    /// Print response metadata as JSON to stderr
    #[arg(long)]
    meta: bool,

    /// Maximum response body size in bytes
    #[arg(long)]
    max_bytes: Option<usize>,

    /// Overall request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Do not follow redirects
    #[arg(long)]
    no_redirect: bool,

    /// Exit non-zero when the fetch fails instead of printing an empty body
    #[arg(long)]
    strict: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn method(&self) -> String {
        match (&self.request, &self.data) {
            (Some(method), _) => method.to_uppercase(),
            (None, Some(_)) => "POST".to_string(),
            (None, None) => "GET".to_string(),
        }
    }

    fn to_request(&self) -> Request {
        let request = Request::new(self.method(), self.url.as_str());
        match &self.data {
            Some(data) => request.body(data.as_bytes()),
            None => request,
        }
    }

    fn to_config(&self) -> FetchConfig {
        let mut config = FetchConfig::new().follow_redirects(!self.no_redirect);
        if let Some(limit) = self.max_bytes {
            config = config.max_response_bytes(limit);
        }
        if let Some(secs) = self.timeout {
            config = config.timeout(Duration::from_secs(secs));
        }
        config
    }

    fn wants_response(&self) -> bool {
        self.strict || self.include || self.meta
    }
}

/// Response metadata printed by `--meta`
#[derive(Serialize, Debug)]
struct Meta<'a> {
    url: &'a str,
    status: u16,
    headers: &'a [(String, String)],
    bytes: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let fetcher = Fetcher::with_config(args.to_config());
    let request = args.to_request();

    let body = if args.wants_response() {
        match fetcher.try_fetch(&request) {
            Ok(response) => {
                report(&args, &response)?;
                response.body
            }
            Err(e) if args.strict => return Err(e).context("fetch failed"),
            Err(e) => {
                tracing::warn!(error = %e, "fetch failed");
                Body::empty()
            }
        }
    } else {
        fetcher.fetch(&request)
    };

    write_body(args.output.as_deref(), &body)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "fetchbuf=debug",
        _ => "fetchbuf=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(args: &Args, response: &Response) -> Result<()> {
    let mut stderr = std::io::stderr().lock();
    if args.include {
        writeln!(stderr, "HTTP {}", response.status)?;
        for (name, value) in &response.headers {
            writeln!(stderr, "{}: {}", name, value)?;
        }
        writeln!(stderr)?;
    }
    if args.meta {
        let meta = Meta {
            url: &response.url,
            status: response.status,
            headers: &response.headers,
            bytes: response.body.len(),
        };
        writeln!(stderr, "{}", serde_json::to_string(&meta)?)?;
    }
    Ok(())
}

fn write_body(output: Option<&Path>, body: &Body) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, body.as_bytes())
            .with_context(|| format!("Failed to write output: {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(body.as_bytes())
                .context("Failed to write body to stdout")?;
            stdout.flush().context("Failed to flush stdout")
        }
    }
}
