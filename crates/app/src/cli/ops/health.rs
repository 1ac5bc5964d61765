use clap::Args;

use sealchat::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Health;

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Health check failed: {0}")]
    Failed(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = HealthError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = Vec::new();

        // 1. Check config directory
        lines.push("Config:".to_string());
        match AppState::load(ctx.config_path.clone()) {
            Ok(state) => {
                lines.push(format!("  directory:    {}", state.sealchat_dir.display()));
                lines.push("  config.toml:  OK".to_string());
                lines.push("  keys/:        OK".to_string());
                lines.push(format!("  remote:       {}", state.config.remote));
            }
            Err(e) => {
                lines.push(format!("  error: {}", e));
            }
        }

        // 2. Check relay liveness and readiness
        let base = ctx.client.base_url();
        let client = ctx.client.http_client();

        lines.push(String::new());
        lines.push(format!("Relay ({}):", base));

        for (name, path) in [("livez", "/_status/livez"), ("readyz", "/_status/readyz")] {
            let url = format!("{}{}", base.as_str().trim_end_matches('/'), path);
            let status = match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => "OK".to_string(),
                Ok(resp) => format!("UNHEALTHY ({})", resp.status()),
                Err(_) => "NOT REACHABLE".to_string(),
            };
            lines.push(format!("  {:<7} {}", format!("{}:", name), status));
        }

        Ok(lines.join("\n"))
    }
}
