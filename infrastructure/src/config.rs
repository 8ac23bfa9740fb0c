use anyhow::Context;
use domain::policy::CachePolicy;
use dotenvy::dotenv;
use shared::types::Result;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DB_FILE_NAME: &str = "questioncache.sqlite3";

#[derive(Debug, Clone)]
pub struct Config {
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub embedding_model: String,
    pub db_path: PathBuf,
    pub policy: CachePolicy,
    pub stream: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenv().ok();
        let defaults = CachePolicy::default();
        let policy = CachePolicy::new(
            parse_var("QUESTIONCACHE_CUTOFF", defaults.relevance_cutoff)?,
            parse_var("QUESTIONCACHE_RESULTS", defaults.response_count)?,
        )?;
        Ok(Self {
            ollama_base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL")
                .unwrap_or_else(|_| "qwen2.5:1.5b-instruct".to_string()),
            embedding_model: env::var("OLLAMA_EMBED_MODEL")
                .unwrap_or_else(|_| "nomic-embed-text".to_string()),
            db_path: env::var("QUESTIONCACHE_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| Self::default_db_path()),
            policy,
            stream: parse_var("QUESTIONCACHE_STREAM", true)?,
        })
    }

    fn default_db_path() -> PathBuf {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let mut path = PathBuf::from(home);
        path.push(".local");
        path.push("share");
        path.push("questioncache");
        path.push(DB_FILE_NAME);
        path
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {name}: {raw:?}")),
        _ => Ok(default),
    }
}
