use clap::Parser;

/// Botdeck — realtime companion service for the trading-bot dashboard.
#[derive(Parser, Debug)]
#[command(name = "botdeck", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Realtime endpoint URL override.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Project room to join at startup.
    #[arg(short = 'p', long)]
    pub project: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
