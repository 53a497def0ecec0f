// Shared state for command handlers

use std::sync::Arc;

use anyhow::{Context as _, Result};
use cme_core::client::ApiClient;
use cme_core::config::{DashboardConfig, Jurisdictions};

use crate::output::OutputFormat;
use crate::Cli;

pub struct Context {
    pub client: Arc<ApiClient>,
    pub config: DashboardConfig,
    pub output: OutputFormat,
    pub quiet: bool,
    pub color: bool,
}

impl Context {
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut config = DashboardConfig::from_env().context("invalid CME_* configuration")?;
        // --api-url already folds in CME_API_URL
        config.api_url = Some(cli.api_url.clone());

        let client =
            ApiClient::new(&config.client_config()).context("failed to build HTTP client")?;
        let output = OutputFormat::from_str(&cli.output);

        Ok(Self {
            client: Arc::new(client),
            config,
            output,
            quiet: cli.quiet,
            color: !cli.no_color && output.is_text(),
        })
    }

    pub fn jurisdictions(&self) -> Jurisdictions {
        self.config.jurisdictions()
    }
}
