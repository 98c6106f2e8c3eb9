use clap::{ Args as ClapArgs, Parser, Subcommand };

use crate::history::DEFAULT_HISTORY_WINDOW;
use crate::llm::LlmType;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Talk to a running proxy from the terminal.
    Chat(ChatArgs),
}

/// Options for the proxy server (the default when no subcommand is given).
#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
    pub server_addr: String,

    // --- Chat LLM Provider Args ---
    /// Type of upstream provider (groq, openai)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "groq")]
    pub chat_llm_type: LlmType,

    /// API key for the upstream provider. When unset the proxy still starts and answers with a configuration hint.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API (e.g., https://api.groq.com/openai/v1)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, provider type decides
    pub chat_base_url: Option<String>,

    /// Model name for chat completion (e.g., llama-3.1-8b-instant)
    #[arg(long, env = "CHAT_MODEL")]
    pub chat_model: Option<String>,

    /// Upper bound on generated tokens per reply.
    #[arg(long, env = "CHAT_MAX_TOKENS", default_value = "350")]
    pub max_tokens: u32,

    /// Sampling temperature (0.0 to 2.0).
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "0.65", value_parser = parse_temperature)]
    pub temperature: f32,

    // --- Conversation Args ---
    /// Number of trailing messages forwarded upstream.
    #[arg(long, env = "HISTORY_WINDOW", default_value_t = DEFAULT_HISTORY_WINDOW, value_parser = parse_history_window)]
    pub history_window: usize,

    /// Path to a text file replacing the built-in persona system prompt.
    #[arg(long, env = "PERSONA_PATH")]
    pub persona_path: Option<String>,

    /// Maximum upstream calls per minute across all visitors. 0 disables the limit.
    #[arg(long, env = "RATE_LIMIT_PER_MINUTE", default_value = "0")]
    pub rate_limit_per_minute: u32,

    // --- TLS Args ---
    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    /// Path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ChatArgs {
    /// Full URL of the proxy's chat route.
    #[arg(long, env = "CHAT_ENDPOINT", default_value = "http://127.0.0.1:3000/api/chat")]
    pub endpoint: String,
}

fn parse_temperature(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|e| format!("invalid temperature '{}': {}", s, e))?;
    if !(0.0..=2.0).contains(&value) {
        return Err(format!("temperature must be between 0.0 and 2.0, got {}", value));
    }
    Ok(value)
}

fn parse_history_window(s: &str) -> Result<usize, String> {
    let value: usize = s.parse().map_err(|e| format!("invalid history window '{}': {}", s, e))?;
    if value == 0 {
        return Err("history window must be at least 1".to_string());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_serve_the_site() {
        let args = Args::try_parse_from(["persona-chat"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.serve.chat_llm_type, LlmType::Groq);
        assert_eq!(args.serve.history_window, 10);
        assert_eq!(args.serve.max_tokens, 350);
        assert_eq!(args.serve.rate_limit_per_minute, 0);
    }

    #[test]
    fn chat_subcommand_takes_endpoint() {
        let args = Args::try_parse_from(["persona-chat", "chat", "--endpoint", "http://example.com/api/chat"]).unwrap();
        match args.command {
            Some(Command::Chat(chat)) => assert_eq!(chat.endpoint, "http://example.com/api/chat"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(Args::try_parse_from(["persona-chat", "--temperature", "3.5"]).is_err());
        assert!(Args::try_parse_from(["persona-chat", "--history-window", "0"]).is_err());
        assert!(Args::try_parse_from(["persona-chat", "--chat-llm-type", "ollama"]).is_err());
    }
}
