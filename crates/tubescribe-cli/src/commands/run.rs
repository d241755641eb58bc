use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use tubescribe_application::panel::export_file_name;
use tubescribe_application::popup::PopupState;
use tubescribe_core::action::AiAction;
use tubescribe_core::transcript::TranscriptSegment;
use tubescribe_core::watch_url::watch_video_id;
use tubescribe_execution::ExtensionRuntime;
use tubescribe_infrastructure::MemoryClipboard;
use tubescribe_interaction::GeminiGateway;

use super::Context;

pub struct RunArgs {
    pub url: String,
    pub transcript: PathBuf,
    pub action: AiAction,
    pub question: Option<String>,
    pub model: Option<String>,
    pub export_chat: Option<PathBuf>,
}

pub async fn run(context: &Context, args: RunArgs) -> Result<()> {
    let Some(video_id) = watch_video_id(&args.url) else {
        bail!("{} is not a watch page URL", args.url);
    };
    if args.action.takes_user_input() && args.question.is_none() {
        bail!("--question is required for the chat action");
    }
    let segments = load_segments(&args.transcript)?;

    let runtime = ExtensionRuntime::new(
        context.config.clone(),
        Arc::new(GeminiGateway::new(context.config.gateway.clone())),
        context.key_store.clone(),
        Arc::new(MemoryClipboard::new()),
    );
    runtime.restore_credential().await?;
    runtime.add_transcript(video_id.clone(), segments);

    let (tab_id, navigation) = runtime.open_tab(&args.url);
    let outcome = navigation.outcome().await?;
    tracing::info!("[Runtime] Tab {} ready: {:?}", tab_id, outcome);

    match runtime.popup().open().await? {
        PopupState::PanelShown { .. } => {}
        PopupState::NeedsKey => bail!("No API key stored. Run `tubescribe set-key <KEY>` first."),
        PopupState::NotVideoPage => bail!("{} is not on the video site", args.url),
    }
    let Some(panel) = runtime.panel(tab_id) else {
        bail!("The panel did not open in tab {}", tab_id);
    };

    let count = panel.load_transcript().await?;
    println!("📜 Transcript: {} segments", count);

    let output = match args.question.as_deref() {
        Some(question) if args.action.takes_user_input() => panel.ask(question, args.model).await,
        _ => panel.run_action(args.action, args.model).await,
    };
    match output {
        Ok(text) => println!("\n{}\n", text),
        Err(err) => eprintln!("❌ {}", err),
    }

    if let Some(path) = args.export_chat {
        let path = if path.is_dir() {
            path.join(export_file_name(&video_id))
        } else {
            path
        };
        fs::write(&path, panel.export_chat(&video_id))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("💾 Chat saved to {}", path.display());
    }

    runtime.shutdown().await;
    Ok(())
}

fn load_segments(path: &Path) -> Result<Vec<TranscriptSegment>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {} as JSON", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_segments_reads_fixture() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("segments.json");
        fs::write(
            &path,
            r#"[{"time": "0:00", "text": "hello"}, {"time": "0:02", "text": "world"}]"#,
        )
        .unwrap();

        let segments = load_segments(&path).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1], TranscriptSegment::new("0:02", "world"));
    }

    #[test]
    fn test_load_segments_reports_bad_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("segments.json");
        fs::write(&path, "not json").unwrap();

        let err = load_segments(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
