use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use bookmood::commands::{catalog, recommend};
use bookmood::llm;

#[derive(Parser, Debug)]
#[command(
    name = "bookmood",
    version,
    about = "Mood-based book recommendations for the terminal.",
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pick a genre, mood, and level, then fetch book recommendations
    Recommend {
        /// Print recommendations without the interactive dashboard
        #[arg(long, default_value_t = false)]
        plain: bool,
    },
    /// Show the genre, mood, and level catalog
    Catalog,
    /// Manage the Gemini API key
    Key {
        /// Store a new API key in the local auth file
        #[arg(long, value_name = "KEY", conflicts_with = "clear")]
        set: Option<String>,
        /// Remove the stored API key from the local auth file
        #[arg(long, conflicts_with = "test")]
        clear: bool,
        /// Verify the configured API key by calling the Gemini API
        #[arg(long, conflicts_with = "clear")]
        test: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Recommend { plain } => recommend::run(plain).await?,
        Command::Catalog => catalog::run()?,
        Command::Key { set, clear, test } => handle_key_command(set, clear, test).await?,
    }

    Ok(())
}

async fn handle_key_command(set: Option<String>, clear: bool, test: bool) -> Result<()> {
    let mut action_taken = false;

    if let Some(key) = set {
        llm::store_api_key(&key)?;
        println!("Stored Gemini API key in the local auth file.");
        action_taken = true;
    }

    if clear {
        let removed = llm::clear_api_key()?;
        if removed {
            println!("Removed the stored Gemini API key.");
        } else {
            println!("No Gemini API key found in the auth file.");
        }
        action_taken = true;
    }

    if test {
        let source = llm::test_configured_api_key().await?;
        println!("Gemini API key from the {} is valid.", source.description());
        action_taken = true;
    }

    if !action_taken {
        bail!("No action provided. Use --set, --clear, or --test.");
    }
    Ok(())
}
