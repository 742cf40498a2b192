//! `buildfinder` CLI binary.
//!
//! All logic lives in `buildfinder-cli`; main.rs only parses arguments and
//! maps the result to a process exit code.

use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = buildfinder_cli::Cli::parse();
    match buildfinder_cli::run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}
