use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{collections::HashMap, env, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Bearer token -> owner id.
    pub tokens: HashMap<String, String>,
    pub busy_timeout: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Bucket metadata service")]
pub struct Args {
    /// Host to bind to (overrides DOSS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides DOSS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides DOSS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Comma-separated `token=owner` pairs (overrides DOSS_TOKENS)
    #[arg(long)]
    pub tokens: Option<String>,

    /// SQLite busy timeout in milliseconds (overrides DOSS_BUSY_TIMEOUT_MS)
    #[arg(long)]
    pub busy_timeout_ms: Option<u64>,

    /// Create the schema and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::merge(args, |name| env::var(name))?, migrate))
    }

    /// CLI values win over the environment, which wins over defaults.
    fn merge<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let env_or = |name: &str| -> Result<Option<String>> {
            match lookup(name) {
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {name}")),
            }
        };

        let port = match args.port {
            Some(port) => port,
            None => match env_or("DOSS_PORT")? {
                Some(value) => value
                    .parse::<u16>()
                    .with_context(|| format!("parsing DOSS_PORT value `{}`", value))?,
                None => 3000,
            },
        };
        let busy_timeout_ms = match args.busy_timeout_ms {
            Some(ms) => ms,
            None => match env_or("DOSS_BUSY_TIMEOUT_MS")? {
                Some(value) => value
                    .parse::<u64>()
                    .with_context(|| format!("parsing DOSS_BUSY_TIMEOUT_MS value `{}`", value))?,
                None => 5_000,
            },
        };
        let tokens = match args.tokens {
            Some(raw) => Some(raw),
            None => env_or("DOSS_TOKENS")?,
        };

        Ok(Self {
            host: match args.host {
                Some(host) => host,
                None => env_or("DOSS_HOST")?.unwrap_or_else(|| "0.0.0.0".into()),
            },
            port,
            database_url: match args.database_url {
                Some(url) => url,
                None => env_or("DOSS_DATABASE_URL")?
                    .unwrap_or_else(|| "sqlite://./data/meta/doss.db".into()),
            },
            tokens: parse_tokens(tokens.as_deref().unwrap_or_default())?,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse `tok-a=alice,tok-b=bob` into a token table. Blank input is an empty table.
pub fn parse_tokens(raw: &str) -> Result<HashMap<String, String>> {
    let mut tokens = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((token, owner)) = pair.split_once('=') else {
            bail!("token entry `{pair}` is not of the form token=owner");
        };
        let (token, owner) = (token.trim(), owner.trim());
        if token.is_empty() || owner.is_empty() {
            bail!("token entry `{pair}` has an empty token or owner");
        }
        if tokens.insert(token.to_string(), owner.to_string()).is_some() {
            bail!("token `{token}` is listed twice");
        }
    }
    Ok(tokens)
}
