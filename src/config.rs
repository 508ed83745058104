use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Sqlite database file, created on first start
    pub db_path: String,
    pub bind_addr: String,
    pub cors: bool,
}

impl Settings {
    /// Reads `.env` (if present) and then the process environment.
    pub fn load() -> anyhow::Result<Settings> {
        dotenv::dotenv().ok();
        Self::from_source(config::Environment::default().try_parsing(true))
    }

    fn from_source<S>(source: S) -> anyhow::Result<Settings>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = config::Config::builder()
            .set_default("bind_addr", "0.0.0.0:8080")?
            .set_default("cors", true)?
            .add_source(source)
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::default()
            .try_parsing(true)
            .source(Some(vars))
    }

    #[test]
    fn defaults_apply() {
        let settings = Settings::from_source(env(&[("DB_PATH", "trivia.db")])).unwrap();
        assert_eq!(settings.db_path, "trivia.db");
        assert_eq!(settings.bind_addr, "0.0.0.0:8080");
        assert!(settings.cors);
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = Settings::from_source(env(&[
            ("DB_PATH", "/tmp/x.db"),
            ("BIND_ADDR", "127.0.0.1:5000"),
            ("CORS", "false"),
        ]))
        .unwrap();
        assert_eq!(settings.bind_addr, "127.0.0.1:5000");
        assert!(!settings.cors);
    }

    #[test]
    fn db_path_is_required() {
        assert!(Settings::from_source(env(&[])).is_err());
    }
}
