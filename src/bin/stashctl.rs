use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use stashd::config::address::ListenAddr;
use stashd::serve::{connect, AsyncStream};

#[derive(Parser)]
#[command(name = "stashctl")]
#[command(about = "Control utility for the stashd storage server", long_about = None)]
struct Cli {
    /// Server address: a port, host:port, or a socket path
    #[arg(short, long, default_value = "127.0.0.1:8100")]
    address: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show server status
    Stat,
    /// List served storage names
    Stores,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let addr = ListenAddr::parse(&cli.address)?;

    let stream = connect(&addr).await?;
    let mut stream = BufReader::new(stream);

    match cli.command {
        Commands::Stat => {
            let line = ask(&mut stream, "stat").await?;
            let json: serde_json::Value = serde_json::from_str(&line)?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Stores => {
            let line = ask(&mut stream, "stores").await?;
            for name in line.split_whitespace() {
                println!("{name}");
            }
        }
    }

    stream.get_mut().write_all(b"quit\n").await?;
    Ok(())
}

async fn ask(
    stream: &mut BufReader<Box<dyn AsyncStream>>,
    command: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    stream
        .get_mut()
        .write_all(format!("{command}\n").as_bytes())
        .await?;
    let mut line = String::new();
    stream.read_line(&mut line).await?;
    Ok(line.trim().to_string())
}
