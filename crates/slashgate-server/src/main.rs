//! # slashgate server
//!
//! Serves the interactions webhook of one application. Commands are declared
//! below; on startup they are reconciled with (or pushed to) the platform,
//! then every interaction is verified and dispatched in-process.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use slashgate_api::{AppState, Application, RestClient, Verifier, build_router};
use slashgate_commands::{
    Arguments, Choice, Command, CommandRegistrar, Group, InteractionContext, InvocationError,
    Node, OptionSpec, ParamKind, Parameter, Plugin, ResolvedOption,
};
use slashgate_common::config;
use slashgate_common::models::NumericBound;

#[derive(Debug, Parser)]
#[command(name = "slashgate", version, about = "Interactions webhook server")]
struct Cli {
    /// Overwrite the registered commands with the local set before serving.
    #[arg(long, env = "SLASHGATE_SYNC")]
    sync: bool,

    /// Print the registration payloads as JSON and exit.
    #[arg(long)]
    print_commands: bool,
}

const FRUITS: &[&str] = &["apple", "banana", "cherry", "mango", "melon", "peach", "pear"];

async fn ping(ctx: InteractionContext, _args: Arguments) -> anyhow::Result<()> {
    ctx.respond_ephemeral("pong").await?;
    Ok(())
}

async fn buy_fruit(ctx: InteractionContext, args: Arguments) -> anyhow::Result<()> {
    let fruit = args.require("fruit")?.as_str().unwrap_or_default().to_string();
    let amount = args.int("amount").unwrap_or(1);
    if !FRUITS.contains(&fruit.as_str()) {
        anyhow::bail!("we do not sell {fruit}");
    }
    let who = ctx.author().map(|u| u.mention()).unwrap_or_else(|| "someone".into());
    ctx.respond(format!("{who} bought {amount} × {fruit}")).await?;
    Ok(())
}

async fn suggest_fruit(_ctx: InteractionContext, focused: ResolvedOption) -> Option<Vec<Choice>> {
    let typed = focused
        .value
        .as_ref()
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_lowercase();
    let choices = FRUITS
        .iter()
        .filter(|f| f.starts_with(&typed))
        .filter_map(|f| Choice::new(*f).ok())
        .collect();
    Some(choices)
}

async fn market_error(ctx: InteractionContext, err: Arc<InvocationError>) -> anyhow::Result<()> {
    tracing::warn!(command = %err.command, error = %err.source, "market command failed");
    ctx.respond_ephemeral(format!("Could not complete that: {}", err.source)).await?;
    Ok(())
}

async fn report_error(_ctx: InteractionContext, err: Arc<InvocationError>) -> anyhow::Result<()> {
    tracing::error!(command = %err.command, error = %err.source, "unhandled command error");
    Ok(())
}

async fn market_loaded() -> anyhow::Result<()> {
    tracing::info!(fruits = FRUITS.len(), "market stocked");
    Ok(())
}

fn market() -> anyhow::Result<Plugin> {
    let fruit = Command::new(
        "fruit",
        "Buy some fruit",
        vec![
            Parameter::new("fruit", ParamKind::Str).with_option(
                OptionSpec::new()
                    .description("Which fruit")
                    .autocomplete(),
            ),
            Parameter::new("amount", ParamKind::Int)
                .with_default()
                .with_option(
                    OptionSpec::new()
                        .description("How many")
                        .min_value(NumericBound::Integer(1))
                        .max_value(NumericBound::Integer(99)),
                ),
        ],
        buy_fruit,
    )?
    .autocomplete("fruit", suggest_fruit)?;

    let buy = Group::new("buy", "Buy things from the market")?
        .guild_only(true)
        .with(fruit)?;

    Ok(Plugin::new("market")
        .command(buy)
        .on_error(market_error)
        .on_load(market_loaded))
}

fn commands() -> anyhow::Result<Vec<Node>> {
    Ok(vec![Command::new("ping", "Check that the bot is alive", vec![], ping)?.into()])
}

/// Registration client, when the application is configured for it.
fn registrar() -> anyhow::Result<Option<Arc<dyn CommandRegistrar>>> {
    let app = &config::get().application;
    if app.token.is_empty() || app.id.is_empty() {
        tracing::warn!("no application id/token configured, skipping command registration");
        return Ok(None);
    }
    Ok(Some(Arc::new(RestClient::from_config(app)?)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::init()?;

    // Initialize tracing (structured logging)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slashgate=debug,tower_http=debug".into()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    if cli.print_commands {
        let mut payloads: Vec<_> = commands()?.iter().map(Node::root_payload).collect();
        payloads.extend(market()?.nodes().iter().map(Node::root_payload));
        println!("{}", serde_json::to_string_pretty(&payloads)?);
        return Ok(());
    }

    tracing::info!("Starting slashgate v{}", env!("CARGO_PKG_VERSION"));

    let verifier = Verifier::from_hex(&config.application.public_key)?;
    let mut builder = Application::builder(verifier)
        .plugin(market()?)
        .on_error(report_error);
    for node in commands()? {
        builder = builder.command(node)?;
    }
    if let Some(registrar) = registrar()? {
        builder = builder.registrar(registrar, cli.sync || config.commands.sync_on_startup);
    }
    let application = builder.build().await?;

    let router = build_router(AppState::new(application), &config.server);
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    tracing::info!(
        "Interactions endpoint listening on http://{addr}{}",
        config.server.interactions_path
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
