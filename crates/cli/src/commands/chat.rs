use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use finda_agent::{Coordinator, CoordinatorSettings, RuleBasedExtractor, TurnEngine};
use finda_core::config::{AppConfig, ExtractorMode, LoadOptions, LogFormat, LoggingConfig};
use finda_db::{connect, load_lexicon, migrations, InMemoryConversationStore, SqlCatalogQuery};

use crate::commands::{current_thread_runtime, CommandResult};

pub fn run(conversation: Option<String>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    init_logging(&config.logging);

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(message) => return CommandResult::failure("chat", "runtime_init", message, 3),
    };

    match runtime.block_on(chat_loop(config, conversation)) {
        Ok(()) => CommandResult::success("chat", "conversation finished"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("chat", error_class, message, exit_code)
        }
    }
}

async fn chat_loop(
    config: AppConfig,
    conversation: Option<String>,
) -> Result<(), (&'static str, String, u8)> {
    let pool = connect(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), 5u8))?;

    let lexicon =
        load_lexicon(&pool).await.map_err(|error| ("catalog_read", error.to_string(), 5u8))?;

    if config.extractor.mode == ExtractorMode::Llm {
        tracing::warn!(
            event = "extractor_downgraded",
            "model-backed extraction is not wired into the CLI build, using rule-based extraction"
        );
    }

    let engine = TurnEngine::new(
        SqlCatalogQuery::new(pool),
        RuleBasedExtractor::new(lexicon),
        config.policy.policy(),
    );
    let settings = CoordinatorSettings {
        turn_timeout: Duration::from_secs(config.policy.turn_timeout_secs),
        completed_ttl: Duration::from_secs(config.policy.completed_ttl_secs),
    };
    let store = Arc::new(InMemoryConversationStore::default());
    let coordinator = Coordinator::new(engine, store, settings);

    let conversation_id =
        conversation.unwrap_or_else(|| format!("cli-{}", std::process::id()));

    println!("Tell me what you're shopping for. An empty line or Ctrl-D quits.");
    print!("> ");
    let _ = io::stdout().flush();
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|error| ("stdin_read", error.to_string(), 6u8))?;
        let text = line.trim();
        if text.is_empty() {
            break;
        }

        match coordinator.handle_message(&conversation_id, text).await {
            Ok(reply) => println!("{}", reply.message),
            Err(error) => {
                tracing::error!(event = "chat_turn_failed", error = %error);
                println!("{}", error.user_message());
                continue;
            }
        }

        if coordinator.is_completed(&conversation_id).await {
            break;
        }

        print!("> ");
        let _ = io::stdout().flush();
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr);
    let result = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    // A second init in the same process is harmless.
    let _ = result;
}
