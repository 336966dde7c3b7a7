use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "audito-cli")]
#[command(about = "Management CLI for the audito service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "AUDITO_ADMIN_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service health
    Health,
    /// Inspect cached analyses
    Cache,
    /// Invalidate cached entries (all of them when no pattern is given)
    Invalidate {
        #[arg(short, long)]
        pattern: Option<String>,
    },
    /// Show how many rate-limit windows are tracked
    RateLimits,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match cli.command {
        Commands::Health => client.get(format!("{}/api/health", cli.url)),
        Commands::Cache => client
            .get(format!("{}/admin/cache", cli.url))
            .headers(headers),
        Commands::Invalidate { pattern } => {
            let mut request = client
                .delete(format!("{}/admin/cache", cli.url))
                .headers(headers);
            if let Some(pattern) = pattern {
                request = request.query(&[("pattern", pattern)]);
            }
            request
        }
        Commands::RateLimits => client
            .get(format!("{}/admin/rate-limits", cli.url))
            .headers(headers),
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
