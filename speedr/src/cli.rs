use clap::{CommandFactory as _, Parser};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    let d = match unit_str.trim() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Duration::from_secs(value),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => Duration::from_millis(value),
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Duration::from_secs(secs)
        }
        _ => {
            return Err(format!(
                "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
            ));
        }
    };

    if d.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(d)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Incremental console lines.
    HumanReadable,
    /// One pretty-printed JSON document at the end.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "speedr",
    version,
    about = "Measure latency, jitter and throughput against a Cloudflare-style speed test service",
    long_about = "speedr measures round-trip latency and jitter, then download and upload throughput across a range of payload sizes.\n\nEvery measurement opens its own connection, so each trial reports independent DNS, TCP, TLS and transfer timings.\n\nUnknown `--name` flags are ignored.",
    after_help = "Examples:\n  speedr\n  speedr --json\n  speedr --plan quick.yaml --timeout 30s\n  SPEEDR_BASE_URL=http://127.0.0.1:8080 speedr --json"
)]
pub struct Cli {
    /// Print one JSON document at the end instead of incremental output
    #[arg(long)]
    pub json: bool,

    /// Speed service base url
    #[arg(long, env = "SPEEDR_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Per-request deadline (e.g. 30s, 500ms, 2m); no deadline by default
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// YAML file overriding the latency and tier tables
    #[arg(long, value_name = "FILE")]
    pub plan: Option<PathBuf>,

    /// Server-Timing metric carrying the server processing time
    #[arg(long, value_name = "NAME")]
    pub server_timing_metric: Option<String>,

    /// Log each trial and its phase breakdown to stderr
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::HumanReadable
        }
    }
}

/// Split out `--name` / `--name=value` arguments this CLI does not know.
///
/// Returns the arguments to hand to clap and the ignored ones.
pub fn sanitize_args<I>(args: I) -> (Vec<OsString>, Vec<String>)
where
    I: IntoIterator<Item = OsString>,
{
    let cmd = Cli::command();
    let known: HashSet<&str> = cmd
        .get_arguments()
        .filter_map(|a| a.get_long())
        .chain(["help", "version"])
        .collect();

    let mut kept = Vec::new();
    let mut ignored = Vec::new();
    let mut args = args.into_iter();

    // argv[0]
    kept.extend(args.next());

    for arg in args {
        if let Some(s) = arg.to_str()
            && let Some(flag) = s.strip_prefix("--")
            && !flag.is_empty()
        {
            let name = flag.split_once('=').map_or(flag, |(n, _)| n);
            if !known.contains(name) {
                ignored.push(s.to_string());
                continue;
            }
        }
        kept.push(arg);
    }

    (kept, ignored)
}
