pub mod config {
    use serde::Deserialize;
    use std::time::Duration;

    use crate::store::ConnectionSettings;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        pub database_url: String,
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(default = "default_run_mode")]
        pub run_mode: String,
        #[serde(default = "default_static_dir")]
        pub static_dir: String,
        #[serde(default = "default_connect_max_attempts")]
        pub db_connect_max_attempts: u32,
        #[serde(default = "default_connect_retry_delay_secs")]
        pub db_connect_retry_delay_secs: u64,
        #[serde(default = "default_monitor_interval_secs")]
        pub db_monitor_interval_secs: u64,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_environment(config::Environment::default())
        }

        /// Loads configuration from the given environment source.
        pub fn from_environment(environment: config::Environment) -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(environment.try_parsing(true))
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Reconnect policy for the store connection.
        pub fn connection_settings(&self) -> ConnectionSettings {
            ConnectionSettings {
                max_attempts: self.db_connect_max_attempts,
                retry_delay: Duration::from_secs(self.db_connect_retry_delay_secs),
            }
        }

        pub fn monitor_interval(&self) -> Duration {
            Duration::from_secs(self.db_monitor_interval_secs)
        }
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_run_mode() -> String {
        "development".to_string()
    }

    fn default_static_dir() -> String {
        "static".to_string()
    }

    fn default_connect_max_attempts() -> u32 {
        5
    }

    fn default_connect_retry_delay_secs() -> u64 {
        5
    }

    fn default_monitor_interval_secs() -> u64 {
        10
    }

}
pub mod entities;
pub mod store;
pub mod task;
pub mod web;
