use crate::configuration::Configuration;

pub struct Context {
    pub config: Configuration,
}

impl Context {
    pub fn from_cli(cli: &crate::cli::Cli) -> Self {
        let cfg = Configuration {
            data_dir: cli.data_dir.clone(),
            log_file: cli.log_file.clone(),
            reset: cli.reset,
            api_listen: cli.api_listen,
        };
        Self { config: cfg }
    }

    pub fn db_path(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.config.data_dir).join("quotes.sqlite")
    }
}
