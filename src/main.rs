use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use mediator_lite::application::greeting::{self, FarewellCommand, GreetCommand, GreetQuery};
use mediator_lite::{
    CancellationGuard, Config, Dispatcher, HandlerRegistry, LoggingBehavior, Mediator,
    RegistryError, ValidationBehavior,
};

#[derive(Parser)]
#[command(name = "mediator-lite")]
#[command(about = "Dispatch greeting commands and queries through the mediator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "mediator.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a greeting command
    Command {
        /// Message to greet
        #[arg(short, long, conflicts_with = "json")]
        message: Option<String>,

        /// JSON body, e.g. '{"message":"Ada"}'
        #[arg(long)]
        json: Option<String>,
    },
    /// Send a greeting query
    Query {
        #[arg(short, long, default_value = "")]
        message: String,
    },
    /// Send a farewell (no result)
    Farewell {
        #[arg(short, long, default_value = "")]
        message: String,
    },
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, load_error) = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(config) => (config, None),
            Err(e) => (Config::load_env(), Some(e)),
        }
    } else {
        (Config::load_env(), None)
    };

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_target(config.logging.with_target)
        .with_env_filter(filter)
        .init();

    if let Some(e) = load_error {
        tracing::warn!("Failed to load config: {}, using defaults", e);
    }

    match cli.command {
        Commands::Version => {
            println!("mediator-lite v{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Commands::InitConfig => init_config(),
        command => match run(&config, command).await {
            Ok(output) => {
                if let Some(output) = output {
                    println!("{}", output);
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!("{}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(config: &Config, command: Commands) -> Result<Option<String>, Box<dyn std::error::Error>> {
    tracing::debug!("Starting {}", config.mediator.name);
    let mediator = build_mediator(config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling dispatch");
            on_interrupt.cancel();
        }
    });

    let output = match command {
        Commands::Command { message, json } => {
            let command = match json {
                Some(body) => serde_json::from_str::<GreetCommand>(&body)?,
                None => GreetCommand::new(message.unwrap_or_default()),
            };
            Some(mediator.send_command(command, &cancel).await?)
        }
        Commands::Query { message } => {
            Some(mediator.send_query(GreetQuery::new(message), &cancel).await?)
        }
        Commands::Farewell { message } => {
            mediator
                .send_void_command(FarewellCommand::new(message), &cancel)
                .await?;
            None
        }
        Commands::Version | Commands::InitConfig => None,
    };

    Ok(output)
}

/// Register the greeting handlers plus the behaviors enabled in config.
/// Registration order is pipeline order, so logging sits outermost.
fn build_mediator(config: &Config) -> Result<Dispatcher, RegistryError> {
    let mut registry = HandlerRegistry::new().with_policy(config.registry.on_conflict);
    registry.scan(&[greeting::catalog()])?;

    let pipeline = &config.pipeline;
    if pipeline.logging {
        registry
            .command_behavior::<GreetCommand, _, _>(|| LoggingBehavior)
            .query_behavior::<GreetQuery, _, _>(|| LoggingBehavior)
            .void_command_behavior::<FarewellCommand, _, _>(|| LoggingBehavior);
    }
    if pipeline.cancellation_guard {
        registry
            .command_behavior::<GreetCommand, _, _>(|| CancellationGuard)
            .query_behavior::<GreetQuery, _, _>(|| CancellationGuard)
            .void_command_behavior::<FarewellCommand, _, _>(|| CancellationGuard);
    }
    if pipeline.validation {
        registry
            .command_behavior::<GreetCommand, _, _>(|| ValidationBehavior)
            .query_behavior::<GreetQuery, _, _>(|| ValidationBehavior)
            .void_command_behavior::<FarewellCommand, _, _>(|| ValidationBehavior);
    }

    Ok(registry.build())
}

fn init_config() -> ExitCode {
    match Config::default().to_yaml() {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to mediator.yaml and adjust as needed.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Failed to render config: {}", e);
            ExitCode::FAILURE
        }
    }
}
