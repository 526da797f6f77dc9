use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 5000;
pub const MODEL_FILE: &str = "model.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_port(std::env::var("PORT").ok()),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| resolve_model_path()),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Unset or unparsable `PORT` falls back to [`DEFAULT_PORT`].
pub fn parse_port(raw: Option<String>) -> u16 {
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(value = %raw, default = DEFAULT_PORT, "PORT is not a valid port; using default");
            DEFAULT_PORT
        }),
        None => DEFAULT_PORT,
    }
}

/// The artifact ships next to the binary; when running from a checkout it
/// sits in the working directory instead.
fn resolve_model_path() -> PathBuf {
    let mut candidates = vec![PathBuf::from(MODEL_FILE)];
    if let Ok(mut exe) = std::env::current_exe() {
        exe.pop();
        exe.push(MODEL_FILE);
        candidates.push(exe);
    }

    for c in &candidates {
        if c.exists() {
            return c.clone();
        }
    }

    // Fallback to the relative path; loading will report it missing
    PathBuf::from(MODEL_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_joins_host_and_port() {
        let cfg = Config {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            model_path: PathBuf::from(MODEL_FILE),
        };
        assert_eq!(cfg.bind_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn port_falls_back_to_default() {
        assert_eq!(parse_port(None), DEFAULT_PORT);
        assert_eq!(parse_port(Some("8080".into())), 8080);
        assert_eq!(parse_port(Some(" 9000 ".into())), 9000);
        assert_eq!(parse_port(Some("http".into())), DEFAULT_PORT);
        assert_eq!(parse_port(Some("70000".into())), DEFAULT_PORT);
        assert_eq!(parse_port(Some(String::new())), DEFAULT_PORT);
    }

    #[test]
    fn resolved_path_ends_with_model_file() {
        assert!(resolve_model_path().ends_with(MODEL_FILE));
    }
}
