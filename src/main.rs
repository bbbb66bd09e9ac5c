use clap::{ArgAction, Parser, Subcommand};

mod cli;

use cli::commands::{self, Backend, FieldArgs};

#[derive(Parser)]
#[command(
    name = "lakeconn",
    version,
    about = "Manage data source connections on a DevLake backend"
)]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, env = "DEVLAKE_ENDPOINT")]
    server: Option<String>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported providers
    Providers,

    /// List a provider's connections
    List {
        /// Provider name (e.g. github)
        provider: String,
        /// Also list every other provider's connections
        #[arg(long)]
        all_sources: bool,
        /// Test each connection and show its liveness
        #[arg(long)]
        test: bool,
    },

    /// Show one connection as JSON
    Get {
        provider: String,
        id: String,
    },

    /// Create a connection
    Add {
        provider: String,
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Change fields of an existing connection
    Update {
        provider: String,
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Delete a connection
    Remove {
        provider: String,
        id: String,
    },

    /// Test a saved connection, or the fields given on the command line
    Test {
        provider: String,
        /// Saved connection to start from
        id: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// List repositories collected into the domain layer
    Repos,

    /// Show the backend version
    Version,

    /// List blueprints
    Blueprints {
        /// hourly, daily, weekly, monthly or custom
        #[arg(long)]
        filter: Option<String>,
        /// Only show active blueprints
        #[arg(long)]
        enabled: bool,
    },

    /// Activate or deactivate a blueprint
    Blueprint {
        #[command(subcommand)]
        action: BlueprintAction,
    },

    /// Inspect or change the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum BlueprintAction {
    Enable { id: u64 },
    Disable { id: u64 },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file and the endpoint in effect
    Show,
    /// Save the default backend URL
    SetEndpoint { url: String },
    /// Cap a provider's connection count (omit the limit to restore the default)
    SetLimit {
        provider: String,
        limit: Option<usize>,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let server = cli.server.as_deref();
    let backend = || Backend::open(server);

    match &cli.command {
        Commands::Providers => commands::cmd_providers(),
        Commands::List {
            provider,
            all_sources,
            test,
        } => commands::cmd_list(&backend()?, provider, *all_sources, *test).await,
        Commands::Get { provider, id } => commands::cmd_get(&backend()?, provider, id).await,
        Commands::Add { provider, fields } => {
            commands::cmd_add(&backend()?, provider, fields).await
        }
        Commands::Update {
            provider,
            id,
            fields,
        } => commands::cmd_update(&backend()?, provider, id, fields).await,
        Commands::Remove { provider, id } => commands::cmd_remove(&backend()?, provider, id).await,
        Commands::Test {
            provider,
            id,
            fields,
        } => commands::cmd_test(&backend()?, provider, id.as_deref(), fields).await,
        Commands::Repos => commands::cmd_repos(&backend()?).await,
        Commands::Version => commands::cmd_version(&backend()?).await,
        Commands::Blueprints { filter, enabled } => {
            commands::cmd_blueprints(&backend()?, filter.as_deref(), *enabled).await
        }
        Commands::Blueprint { action } => match action {
            BlueprintAction::Enable { id } => {
                commands::cmd_blueprint_enable(&backend()?, *id, true).await
            }
            BlueprintAction::Disable { id } => {
                commands::cmd_blueprint_enable(&backend()?, *id, false).await
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::cmd_config_show(server),
            ConfigAction::SetEndpoint { url } => commands::cmd_config_set_endpoint(url),
            ConfigAction::SetLimit { provider, limit } => {
                commands::cmd_config_set_limit(provider, *limit)
            }
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli::logging::init(cli.verbose) {
        eprintln!("warning: {:#}", e);
    }

    if let Err(e) = run(cli).await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
