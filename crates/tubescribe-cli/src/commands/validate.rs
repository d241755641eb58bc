use anyhow::{Result, bail};
use tubescribe_core::gateway::AiGateway;
use tubescribe_core::key_store::{KeyStore, redact};
use tubescribe_interaction::GeminiGateway;

use super::Context;

pub async fn run(context: &Context, api_key: Option<String>) -> Result<()> {
    let api_key = match api_key {
        Some(key) => key,
        None => match context.key_store.api_key().await? {
            Some(key) => key,
            None => bail!("No API key stored. Run `tubescribe set-key <KEY>` or pass --api-key."),
        },
    };

    println!("🔑 Checking {}...", redact(&api_key));
    let gateway = GeminiGateway::new(context.config.gateway.clone());
    match gateway.validate_credential(&api_key).await {
        Ok(message) => {
            println!("✅ {}", message);
            Ok(())
        }
        Err(err) => bail!("{}", err),
    }
}
