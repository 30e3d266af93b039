use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use shelf_app::modules::books::open_library;
use shelf_catalog::{BookQuery, SearchScope};
use shelf_kernel::settings::Settings;

#[derive(Parser)]
#[command(name = "shelf", version, about = "Personal library catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server until Ctrl-C
    Serve,
    /// List books, optionally filtered
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        /// Only books currently lent out
        #[arg(long)]
        borrowed: bool,
        #[arg(long, value_enum, default_value_t = Scope::TitleOrAuthor)]
        scope: Scope,
    },
    /// Print collection counts
    Stats,
    /// Newest additions first
    Recent {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum Scope {
    TitleOrAuthor,
    Title,
    Author,
    Genre,
    Any,
}

impl From<Scope> for SearchScope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::TitleOrAuthor => SearchScope::TitleOrAuthor,
            Scope::Title => SearchScope::Title,
            Scope::Author => SearchScope::Author,
            Scope::Genre => SearchScope::Genre,
            Scope::Any => SearchScope::Any,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().with_context(|| "failed to load SHELF settings")?;
    shelf_telemetry::init(&settings.telemetry);

    tracing::debug!(env = ?settings.environment, "shelf CLI starting");

    let output = match cli.command {
        Command::Serve => return shelf_app::serve(settings).await,
        Command::Config => serde_json::to_value(&settings)?,
        Command::List {
            search,
            genre,
            borrowed,
            scope,
        } => {
            let query = BookQuery {
                search,
                genre,
                borrowed_only: borrowed,
                scope: scope.into(),
            };
            let library = open_library(&settings.catalog).await?;
            serde_json::to_value(library.list_books(&query).await)?
        }
        Command::Stats => {
            let library = open_library(&settings.catalog).await?;
            serde_json::to_value(library.get_stats().await)?
        }
        Command::Recent { limit } => {
            let library = open_library(&settings.catalog).await?;
            let limit = limit.unwrap_or(settings.catalog.recent_limit);
            serde_json::to_value(library.recently_added(limit).await)?
        }
    };

    print_json(&output)
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
