//! react-agent CLI entry point
//!
//! Subcommands:
//! - `react-agent demo` - run the sample queries (default)
//! - `react-agent ask <query>` - answer one question
//! - `react-agent chat` - interactive session
//! - `react-agent tools` - list the registered tools

use anyhow::Context;
use owo_colors::OwoColorize;
use react_agent::{
    agents::react::ReactAgent,
    cli::{output::Output, Cli, Commands},
    memory::{ConversationState, SessionExport},
    tools::ToolRegistry,
    types::AppError,
    utils::config::{Config, ProviderKind},
};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const DEMO_QUERIES: [&str; 3] = [
    "What is LangGraph?",
    "Calculate 25 * 4 + 10",
    "Search for information about the ReAct agent pattern",
];

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            1
        }
    };
    // An abandoned stdin read would otherwise hold up runtime shutdown.
    std::process::exit(code);
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };
    let registry = Arc::new(ToolRegistry::with_default_tools());

    let command = cli.command_or_default();
    if command == Commands::Tools {
        output.tools(&registry.get_tool_definitions());
        return Ok(());
    }

    let config = cli.load_config()?;
    let agent = build_agent(&config, registry)?;
    tracing::debug!(model = agent.model_name(), "agent ready");

    match command {
        Commands::Ask { query, stream } => {
            run_ask(&agent, &output, &query, stream, cli.export.as_deref()).await
        }
        Commands::Chat => run_chat(&agent, &output, &config, cli.export.as_deref()).await,
        Commands::Demo => run_demo(&agent, &output, &config, cli.export.as_deref()).await,
        Commands::Tools => Ok(()),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("react_agent=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve the backend and loop settings; fails before any model call.
fn build_agent(config: &Config, registry: Arc<ToolRegistry>) -> Result<ReactAgent, AppError> {
    let provider = config.provider()?;
    let client = provider.create_client()?;
    ReactAgent::new(Arc::from(client), registry, config.agent_config()?)
}

/// Cancel `token` on Ctrl-C until the returned guard is dropped.
fn cancel_on_ctrl_c(token: CancellationToken) -> tokio_util::sync::DropGuard {
    let watcher = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = watcher.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    watcher.cancel();
                }
            }
        }
    });
    token.drop_guard()
}

/// Drive one question to completion, printing steps as they happen when `stream` is set.
async fn answer(
    agent: &ReactAgent,
    output: &Output,
    state: &mut ConversationState,
    stream: bool,
) -> Result<String, AppError> {
    let cancel = CancellationToken::new();
    let _guard = cancel_on_ctrl_c(cancel.clone());

    if !stream {
        let response = agent.run_with_cancel(state, cancel).await?;
        return Ok(response.content);
    }

    let mut run = agent.start_with_cancel(state, cancel);
    while let Some(step) = run.next_step().await {
        output.step(&step?);
    }
    Ok(run.state().final_answer().unwrap_or_default().to_string())
}

async fn run_ask(
    agent: &ReactAgent,
    output: &Output,
    query: &str,
    stream: bool,
    export: Option<&Path>,
) -> anyhow::Result<()> {
    let mut state = ConversationState::from_query(query);
    if stream {
        output.question(query);
    }

    let result = answer(agent, output, &mut state, stream).await;
    if let Some(path) = export {
        write_export(agent, &state, path)?;
    }

    let content = result?;
    if stream {
        output.newline();
    } else {
        println!("{}", content);
    }
    Ok(())
}

async fn run_demo(
    agent: &ReactAgent,
    output: &Output,
    config: &Config,
    export: Option<&Path>,
) -> anyhow::Result<()> {
    output.banner(provider_label(config), agent.model_name());

    let mut transcript = ConversationState::new();
    for query in DEMO_QUERIES {
        let mut state = ConversationState::from_query(query);
        output.question(query);
        let outcome = answer(agent, output, &mut state, false).await;
        if state.has_pending_tool_calls() {
            state.close_pending("interrupted")?;
        }
        transcript.extend(state.into_messages())?;

        match outcome {
            Ok(content) => output.answer(&content),
            Err(e @ AppError::Configuration(_)) => return Err(e.into()),
            Err(AppError::Cancelled(_)) => {
                output.warning("Cancelled; skipping the remaining queries.");
                break;
            }
            Err(e) => output.error(&e.to_string()),
        }
    }

    if let Some(path) = export {
        write_export(agent, &transcript, path)?;
    }
    Ok(())
}

async fn run_chat(
    agent: &ReactAgent,
    output: &Output,
    config: &Config,
    export: Option<&Path>,
) -> anyhow::Result<()> {
    output.banner(provider_label(config), agent.model_name());
    output.hint(
        "Type 'clear' to start over, 'exit' or 'quit' to leave. Ctrl-C abandons a question, or leaves at the prompt.",
    );
    output.newline();

    let mut state = ConversationState::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        output.prompt();
        // Ctrl-C handling replaces the default SIGINT action, so the prompt listens too.
        let next = tokio::select! {
            line = lines.next_line() => line.context("failed to read input")?,
            _ = tokio::signal::ctrl_c() => {
                output.newline();
                None
            }
        };
        let Some(line) = next else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "exit" | "quit" => break,
            "clear" => {
                state = ConversationState::new();
                output.info("Conversation cleared.");
                continue;
            }
            _ => {}
        }

        state.push_human(line)?;
        match answer(agent, output, &mut state, true).await {
            Ok(_) => output.newline(),
            Err(AppError::Cancelled(_)) => {
                let closed = state.close_pending("cancelled by user")?;
                tracing::debug!(closed, "turn cancelled");
                output.warning("Cancelled.");
            }
            Err(e @ AppError::LoopLimitExceeded { .. }) => {
                state.close_pending("iteration limit reached")?;
                output.error(&e.to_string());
            }
            Err(e) => output.error(&e.to_string()),
        }
    }

    if let Some(path) = export {
        write_export(agent, &state, path)?;
    }
    Ok(())
}

fn write_export(agent: &ReactAgent, state: &ConversationState, path: &Path) -> anyhow::Result<()> {
    SessionExport::new(agent.model_name(), state)
        .write_to(path)
        .with_context(|| format!("failed to export session to {}", path.display()))?;
    tracing::info!(path = %path.display(), messages = state.len(), "session exported");
    Ok(())
}

fn provider_label(config: &Config) -> &'static str {
    match config.llm.provider {
        ProviderKind::Gemini => "Gemini",
        ProviderKind::Ollama => "Ollama",
    }
}
