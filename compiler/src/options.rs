use serde::{Deserialize, Serialize};

use crate::{
    errors::Error,
    sql::{Dialect, MySql, Postgres, Sqlite},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Sqlite,
    #[serde(alias = "mariadb")]
    Mysql,
    #[serde(alias = "pgsql")]
    Postgres,
}

impl DialectKind {
    pub fn build(&self) -> Box<dyn Dialect> {
        match self {
            DialectKind::Sqlite => Box::new(Sqlite()),
            DialectKind::Mysql => Box::new(MySql()),
            DialectKind::Postgres => Box::new(Postgres()),
        }
    }
}

impl std::str::FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(DialectKind::Sqlite),
            "mysql" | "mariadb" => Ok(DialectKind::Mysql),
            "postgres" | "pgsql" => Ok(DialectKind::Postgres),
            other => Err(format!("Unknown dialect `{other}`.")),
        }
    }
}

/// Table-wide defaults. Every field can be overridden from a TOML or JSON config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_per_page: u32,
    pub default_date_format: String,
    pub default_time_format: String,
    pub default_datetime_format: String,
    /// Lower bound substituted for an open-ended date filter.
    pub default_date_start: String,
    /// Upper bound substituted for an open-ended date filter.
    pub default_date_end: String,
    pub default_time_start: String,
    pub default_time_end: String,
    pub number_min: f64,
    pub number_max: f64,
    /// Wraps every highlighted search match. `{}` marks the match.
    pub highlight_template: String,
    pub suppress_search_highlights: bool,
    pub session_key_prefix: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_per_page: 10,
            default_date_format: "%d/%m/%Y".to_string(),
            default_time_format: "%I:%M %p".to_string(),
            default_datetime_format: "%d/%m/%Y %I:%M %p".to_string(),
            default_date_start: "0000-01-01".to_string(),
            default_date_end: "9999-12-31".to_string(),
            default_time_start: "00:00:00".to_string(),
            default_time_end: "23:59:59".to_string(),
            number_min: 0.0,
            number_max: 9_999_999_999.0,
            highlight_template: r#"<span class="search-highlight">{}</span>"#.to_string(),
            suppress_search_highlights: false,
            session_key_prefix: None,
        }
    }
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        toml::from_str(source).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_json(source: &str) -> Result<Self, Error> {
        serde_json::from_str(source).map_err(|e| Error::Config(e.to_string()))
    }
}

pub struct Options {
    pub dialect: Box<dyn Dialect>,
    pub config: Config,
}

impl Options {
    pub fn new(dialect: DialectKind) -> Self {
        Self {
            dialect: dialect.build(),
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new(DialectKind::default())
    }
}
