pub mod models;
pub mod server;
pub mod config;
pub mod llm;
pub mod cli;
pub mod history;
pub mod widget;

use cli::{ Args, ChatArgs, Command, ServeArgs };
use config::persona::Persona;
use history::HistoryWindow;
use llm::{ LlmConfig, SamplingParams };
use llm::chat::new_client as new_chat_client;
use log::{ info, warn };
use server::Server;
use server::api::AppState;
use std::error::Error;
use widget::http::HttpTransport;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Some(Command::Chat(chat_args)) => run_chat(chat_args).await,
        None => serve(args.serve).await,
    }
}

/// Builds everything a request handler needs. Fails only on configuration the
/// operator has to fix (bad persona file, unparseable base URL).
pub fn build_state(args: &ServeArgs) -> Result<AppState, Box<dyn Error + Send + Sync>> {
    let persona = Persona::load(args.persona_path.as_deref())?;
    let chat_config = LlmConfig {
        llm_type: args.chat_llm_type,
        api_key: args.api_key.clone(),
        completion_model: args.chat_model.clone(),
        base_url: args.chat_base_url.clone(),
        sampling: SamplingParams {
            max_tokens: args.max_tokens,
            temperature: args.temperature,
        },
    };
    let chat_client = new_chat_client(&chat_config)?;
    info!(
        "Chat client configured: Type={}, Model={}, BaseURL={}",
        chat_config.llm_type,
        chat_client.get_model(),
        chat_client.get_base_url().as_deref().unwrap_or("adapter default")
    );
    if !chat_client.is_configured() {
        warn!("GROQ_API_KEY is not set; visitors will get a configuration hint instead of answers.");
    }

    Ok(
        AppState::new(chat_client, persona, HistoryWindow::new(args.history_window))
            .with_rate_limit(args.rate_limit_per_minute)
    )
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Max Tokens: {}", args.max_tokens);
    info!("Temperature: {}", args.temperature);
    info!("History Window: {}", args.history_window);
    info!("Persona Path: {}", args.persona_path.as_deref().unwrap_or("built-in"));
    info!("Rate Limit Per Minute: {}", args.rate_limit_per_minute);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let state = build_state(&args)?;
    Server::new(&args, state).run().await
}

async fn run_chat(args: ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let transport = HttpTransport::new(&args.endpoint)?;
    info!("Chatting with {}", transport.endpoint());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    widget::terminal::run(stdin, tokio::io::stdout(), &transport).await?;
    Ok(())
}
