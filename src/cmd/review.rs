//! Pending session listing — `jules review`.

use anyhow::{Result, bail};

use jules_tools::api::JulesClient;
use jules_tools::config::JulesConfig;
use jules_tools::review::list_pending_sessions;
use jules_tools::source::resolve_repository_source;

pub async fn cmd_review(config: &JulesConfig) -> Result<()> {
    let api_key = match config.api_key() {
        Ok(key) => key,
        Err(e) => {
            tracing::debug!(error = %e, "credential lookup failed");
            bail!(
                "JULES_API_KEY not found in {}",
                config.env_file.display()
            );
        }
    };

    let source = match resolve_repository_source(&config.project_dir, config.timeout).await {
        Ok(source) => source,
        Err(e) => {
            tracing::debug!(error = %e, "repository source lookup failed");
            bail!("Could not determine Git repository source context.");
        }
    };
    tracing::debug!(%source, "resolved repository source");

    let client = JulesClient::new(&config.api_base, api_key, config.timeout)?;
    for line in list_pending_sessions(&client, &source).await? {
        println!("{}", line);
    }

    Ok(())
}
