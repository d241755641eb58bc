use anyhow::Result;
use tubescribe_core::key_store::{KeyStore, keys, redact};

use super::Context;

pub async fn run(context: &Context, key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        context.key_store.remove(keys::API_KEY).await?;
        println!("🗑️  API key removed");
        return Ok(());
    }

    context.key_store.set(keys::API_KEY, key).await?;
    println!("✅ API key saved ({})", redact(key));
    println!("📁 {}", context.key_store.path().display());
    Ok(())
}
