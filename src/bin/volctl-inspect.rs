use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "volctl-inspect")]
#[command(about = "Client for the volctl introspection endpoint", long_about = None)]
struct Cli {
    /// Introspection address (the value of VOLCTL_PROFILE_ADDR)
    #[arg(short, long, env = "VOLCTL_PROFILE_ADDR", default_value = "127.0.0.1:6060")]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the endpoint is up
    Health,
    /// Show runtime state
    Vars,
    /// Dump Prometheus metrics
    Metrics,
    /// Capture a CPU flamegraph
    Profile {
        #[arg(long, default_value_t = 30)]
        seconds: u64,

        #[arg(long)]
        frequency: Option<i32>,

        #[arg(short, long, default_value = "cpu.svg")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = if cli.addr.starts_with("http") {
        cli.addr.clone()
    } else {
        format!("http://{}", cli.addr)
    };

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{base}/debug/health")).send().await?;
            print_text(res).await?;
        }
        Commands::Vars => {
            let res = client.get(format!("{base}/debug/vars")).send().await?;
            print_json(res).await?;
        }
        Commands::Metrics => {
            let res = client.get(format!("{base}/debug/metrics")).send().await?;
            print_text(res).await?;
        }
        Commands::Profile {
            seconds,
            frequency,
            output,
        } => {
            let mut query = vec![("seconds", seconds.to_string())];
            if let Some(hz) = frequency {
                query.push(("frequency", hz.to_string()));
            }

            eprintln!("profiling for {seconds}s...");
            let res = client
                .get(format!("{base}/debug/pprof/profile"))
                .query(&query)
                .send()
                .await?;
            if !check_status(&res) {
                report_failure(res).await;
                return Ok(());
            }

            let body = res.bytes().await?;
            tokio::fs::write(&output, &body).await?;
            println!("wrote {} bytes to {}", body.len(), output.display());
        }
    }

    Ok(())
}

fn check_status(res: &reqwest::Response) -> bool {
    res.status().is_success()
}

async fn report_failure(res: reqwest::Response) {
    eprintln!("Error: introspection endpoint returned status {}", res.status());
    if let Ok(text) = res.text().await {
        eprintln!("Response: {}", text);
    }
}

async fn print_text(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if !check_status(&res) {
        report_failure(res).await;
        return Ok(());
    }
    print!("{}", res.text().await?);
    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if !check_status(&res) {
        report_failure(res).await;
        return Ok(());
    }
    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
