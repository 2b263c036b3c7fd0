use serde::Deserialize;

#[derive(Clone, Deserialize, Default)]
pub struct Config {
    pub db_path: Option<String>,
    pub topology_path: Option<String>,
}

impl Config {
    pub fn load() -> eyre::Result<Self> {
        Ok(envy::prefixed("REPLAYQ_").from_env::<Self>()?)
    }

    pub fn db_path(&self) -> &str {
        self.db_path
            .as_ref()
            .map(|s| s.as_str())
            .unwrap_or("replayq.db")
    }

    pub fn topology_path(&self) -> Option<&str> {
        self.topology_path.as_deref()
    }
}
