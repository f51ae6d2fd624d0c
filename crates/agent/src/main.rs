#![forbid(unsafe_code)]

mod cli;
mod shutdown;
mod startup;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::parse();

    match cli.command {
        Some(cli::Command::Version) => {
            println!("andond {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }

        // No subcommand = run the daemon
        None => startup::run(&cli).await,
    }
}
