use clap::{Parser, Subcommand};
use reqwest::Client;

#[derive(Parser)]
#[command(name = "keyserver-cli")]
#[command(about = "CLI for db-keyserver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new database and print its first key
    Create,
    /// Issue another key for an existing database
    GetKey {
        #[arg(short, long)]
        db: String,
    },
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Create => client.get(format!("{}/", base)).send().await?,
        // Form body, the way the ImageShare app sends it
        Commands::GetKey { db } => {
            client
                .put(format!("{}/get_key", base))
                .form(&[("db", db.as_str())])
                .send()
                .await?
        }
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
    };

    let status = res.status();
    let body = res.text().await?;
    if status.is_success() {
        println!("{}", body);
    } else {
        eprintln!("Request failed ({}): {}", status, body);
        std::process::exit(1);
    }
    Ok(())
}
