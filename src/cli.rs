//! CLI argument definitions using clap derive macros.

use clap::Parser;

use cpf_lookup::config::DEFAULT_MAX_ATTEMPTS_PER_ENDPOINT;

/// Look up a CPF against third-party endpoints and print the result as JSON.
///
/// The identifier may be formatted (`111.444.777-35`) or bare digits. On
/// failure the process exits non-zero and the JSON carries a message plus
/// diagnostics (attempts made, last HTTP status, transport used).
#[derive(Parser, Debug)]
#[command(name = "cpf-lookup")]
#[command(author, version, about)]
pub struct Args {
    /// The CPF to look up (digits, separators allowed)
    pub cpf: String,

    /// Override the endpoint chain with one or more query URLs (tried in order)
    #[arg(short = 'e', long = "endpoint")]
    pub endpoints: Vec<String>,

    /// Maximum attempts per endpoint (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ATTEMPTS_PER_ENDPOINT as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_attempts: u8,

    /// Per-request timeout in seconds (1-120)
    #[arg(short = 't', long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..=120))]
    pub timeout_secs: u64,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
