use clap::Args;

use sealchat::state::{AppConfig, AppState};

/// Create the local state directory; `--remote` becomes the stored default
#[derive(Args, Debug, Clone)]
pub struct Init;

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] sealchat::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            remote: ctx.client.base_url().clone(),
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        Ok(format!(
            "Initialized sealchat directory at: {}\n\
             - Keys: {}\n\
             - Config: {}\n\
             - Remote: {}",
            state.sealchat_dir.display(),
            state.keys_path.display(),
            state.config_path.display(),
            state.config.remote,
        ))
    }
}
