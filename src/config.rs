use eyre::{Context, Result};
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Default)]
pub struct Config {
    conf: toml::Table,
}

impl Config {
    pub fn load(file_name: &str) -> Result<Config> {
        let content = std::fs::read_to_string(file_name)
            .with_context(|| format!("cannot load configuration file {file_name}"))?;
        content
            .parse::<Config>()
            .with_context(|| format!("cannot parse configuration file {file_name}"))
    }

    /// Accounts to create on `init`, from the `[[seed.users]]` entries.
    pub fn seed_users(&self) -> Result<Vec<SeedUser>> {
        match self.conf.get("seed").and_then(|seed| seed.get("users")) {
            Some(users) => users
                .clone()
                .try_into()
                .context("invalid seed.users entry in configuration file"),
            None => Ok(Vec::new()),
        }
    }
}

impl FromStr for Config {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Config { conf: s.parse()? })
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
    pub role: String,
    #[serde(default)]
    pub percentage: i64,
}

pub fn get_config(config: &Config, section: &str, key: &str) -> Option<String> {
    config
        .conf
        .get(section)
        .and_then(|s| s.get(key))
        .map(|value| match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}
