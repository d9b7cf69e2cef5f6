use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub availability_csv: PathBuf,
    pub availability_export: Option<PathBuf>,
    pub llm_provider: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub groq_api_key: String,
    pub groq_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub embedding_model: String,
    pub oracle_timeout: Duration,
    pub oracle_retries: u32,
    pub max_graph_steps: usize,
    pub max_tool_calls: usize,
    pub assistant_year: i32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: parsed("PORT", 8003),
            database_url: text("DATABASE_URL", "availability.db"),
            availability_csv: PathBuf::from(text(
                "AVAILABILITY_CSV",
                "data/doctor_availability.csv",
            )),
            availability_export: env::var("AVAILABILITY_EXPORT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            llm_provider: text("LLM_PROVIDER", "openai").to_lowercase(),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: text("OPENAI_MODEL", "gpt-4o"),
            openai_base_url: text("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            groq_model: text("GROQ_MODEL", "llama-3.3-70b-versatile"),
            ollama_url: text("OLLAMA_URL", "http://localhost:11434"),
            ollama_model: text("OLLAMA_MODEL", "llama3.2"),
            embedding_model: text("EMBEDDING_MODEL", "all-minilm"),
            oracle_timeout: Duration::from_secs(parsed("ORACLE_TIMEOUT_SECS", 60)),
            oracle_retries: parsed("ORACLE_RETRIES", 1),
            max_graph_steps: parsed("MAX_GRAPH_STEPS", 20),
            max_tool_calls: parsed("MAX_TOOL_CALLS", 5),
            assistant_year: parsed("ASSISTANT_YEAR", 2024),
        }
    }
}

impl Default for AppConfig {
    /// Same values `from_env` falls back to, without reading the environment.
    fn default() -> Self {
        Self {
            port: 8003,
            database_url: "availability.db".to_string(),
            availability_csv: PathBuf::from("data/doctor_availability.csv"),
            availability_export: None,
            llm_provider: "openai".to_string(),
            openai_api_key: String::new(),
            openai_model: "gpt-4o".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            groq_api_key: String::new(),
            groq_model: "llama-3.3-70b-versatile".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2".to_string(),
            embedding_model: "all-minilm".to_string(),
            oracle_timeout: Duration::from_secs(60),
            oracle_retries: 1,
            max_graph_steps: 20,
            max_tool_calls: 5,
            assistant_year: 2024,
        }
    }
}

fn text(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
