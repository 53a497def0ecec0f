// Recording upload command

use std::path::Path;

use anyhow::{bail, Result};
use cme_core::badge::status_badge;
use cme_core::upload::{RecordingFile, UploadError, UploadWorkflow};
use cme_core::views::{DetailState, SessionDetailView};
use serde::Serialize;

use crate::context::Context;
use crate::output::print_field;

#[derive(Serialize)]
struct UploadOutput<'a> {
    session_id: &'a str,
    filename: &'a str,
    content_type: &'a str,
    bytes: u64,
    /// `None` when the session could not be re-fetched after processing started.
    status: Option<String>,
}

pub async fn run(
    ctx: &Context,
    session_id: &str,
    file: &Path,
    content_type: Option<&str>,
) -> Result<()> {
    let view = SessionDetailView::load(ctx.client.as_ref(), session_id).await;
    let session = match view.state {
        DetailState::Loaded(session) => session,
        DetailState::NotFound => bail!("Session not found: {}", session_id),
    };

    let recording = RecordingFile::from_path(file, content_type).await?;
    let filename = recording.filename.clone();
    let media_type = recording.content_type.clone();
    let size = recording.size();

    if ctx.output.is_text() && !ctx.quiet {
        println!("Uploading {} ({}, {} bytes)...", filename, media_type, size);
    }

    let workflow = UploadWorkflow::new(ctx.client.clone(), ctx.client.clone());
    let refreshed = match workflow.run(&session, recording).await {
        Ok(DetailState::Loaded(session)) => Some(session),
        Ok(DetailState::NotFound) => None,
        Err(UploadError::NotAllowed(status)) => {
            bail!(
                "Recording can only be uploaded to a newly created session (session is {})",
                status_badge(&status).label
            )
        }
        Err(e) => bail!("Upload failed: {}", e),
    };

    if !ctx.output.is_text() {
        return ctx.output.print_value(&UploadOutput {
            session_id,
            filename: &filename,
            content_type: &media_type,
            bytes: size,
            status: refreshed.as_ref().map(|s| s.status.to_string()),
        });
    }

    if ctx.quiet {
        match &refreshed {
            Some(session) => println!("{}", session.status),
            None => println!("unknown"),
        }
        return Ok(());
    }

    println!("Upload complete. Processing started.");
    print_field("Session", session_id);
    match &refreshed {
        Some(session) => {
            print_field("Status", &status_badge(&session.status).render(ctx.color))
        }
        None => print_field("Status", "could not be refreshed"),
    }
    println!("\nFollow progress with: cme sessions watch {}", session_id);

    Ok(())
}
