mod commands;
#[cfg(feature = "mcp")]
mod mcp;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use faq_match::core::querylog::QueryLog;
use faq_match::search::FaqEngine;

#[derive(Parser)]
#[command(name = "faq")]
#[command(about = "FAQ question matching with hot-swappable knowledge bases", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Data root (default: current directory)")]
    root: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Debug logging on stderr")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create data folders and a default faq.yaml
    Init {
        #[arg(long, help = "Overwrite an existing faq.yaml with defaults")]
        force: bool,
    },
    /// Answer a question
    Ask {
        query: String,
        #[arg(long, help = "JSON output")]
        json: bool,
        #[arg(long, help = "Show per-signal scores for the top candidates")]
        explain: bool,
    },
    /// Import question/answer rows from a JSON or YAML file
    Import {
        file: PathBuf,
        #[arg(long, default_value = "replace", help = "replace or append")]
        mode: String,
        #[arg(long, help = "Report changes without writing")]
        dry_run: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Knowledge base summary
    Status {
        #[arg(short, long, help = "Brief output")]
        brief: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Queries that found no match
    Unmatched {
        #[arg(long, short, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Example questions from the knowledge base
    Samples {
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    // ===== MCP Server =====
    /// Start MCP server over stdio
    #[cfg(feature = "mcp")]
    Mcp {
        #[arg(long, help = "Show client configuration instructions")]
        install: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let paths = commands::kb_paths(cli.root)?;

    match cli.command {
        Commands::Init { force } => commands::init::run(&paths, force),
        Commands::Ask {
            query,
            json,
            explain,
        } => {
            let engine = FaqEngine::open(paths)?;
            commands::ask::run(&engine, &query, json, explain)
        }
        Commands::Import {
            file,
            mode,
            dry_run,
            json,
        } => {
            let engine = FaqEngine::open(paths)?;
            commands::import::run(&engine, &file, &mode, dry_run, json)
        }
        Commands::Status { brief, json } => {
            let engine = FaqEngine::open(paths)?;
            commands::status::run(&engine, brief, json)
        }
        Commands::Unmatched { limit, json } => {
            commands::unmatched::run(&QueryLog::new(&paths), limit, json)
        }
        Commands::Samples { json } => {
            let engine = FaqEngine::open(paths)?;
            commands::samples::run(&engine, json)
        }

        #[cfg(feature = "mcp")]
        Commands::Mcp { install } => {
            if install {
                print_mcp_install_instructions(&paths.root);
                Ok(())
            } else {
                let runtime = tokio::runtime::Runtime::new()?;
                runtime.block_on(mcp::run_mcp_server(paths))
            }
        }
    }
}

#[cfg(feature = "mcp")]
fn print_mcp_install_instructions(root: &std::path::Path) {
    use colored::Colorize;

    let binary_path = std::env::current_exe()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "faq".to_string());

    println!("{}", "MCP Server Installation Guide".bold().cyan());
    println!();
    println!("Add the following to your MCP client configuration:");
    println!();
    println!(
        r#"{{
  "mcpServers": {{
    "faq": {{
      "command": "{}",
      "args": ["--root", "{}", "mcp"]
    }}
  }}
}}"#,
        binary_path,
        root.display()
    );
    println!();
    println!("{}", "Available tools:".bold());
    println!("  • {} - Answer a user question", "kb_ask".green());
    println!("  • {} - Import question/answer rows", "kb_import".green());
    println!("  • {} - List example questions", "kb_samples".green());
    println!("  • {} - Knowledge base status", "kb_status".green());
}
