// Report download command

use std::process::Command;

use anyhow::{bail, Context as _, Result};
use cme_core::report::{fetch_report, ReportError};
use cme_core::views::{DetailState, SessionDetailView};
use tracing::debug;

use crate::context::Context;

pub async fn run(ctx: &Context, session_id: &str, open: bool) -> Result<()> {
    let view = SessionDetailView::load(ctx.client.as_ref(), session_id).await;
    let session = match &view.state {
        DetailState::Loaded(session) => session,
        DetailState::NotFound => bail!("Session not found: {}", session_id),
    };

    let link = match fetch_report(ctx.client.as_ref(), session).await {
        Ok(link) => link,
        Err(ReportError::Api(e)) => bail!(
            "Failed to generate report: {}",
            e.user_message().map(str::to_string).unwrap_or_else(|| e.to_string())
        ),
        Err(e) => bail!("{}", e),
    };

    if ctx.output.is_text() {
        println!("{}", link.download_url);
    } else {
        ctx.output.print_value(&link)?;
    }

    if open {
        open_in_browser(&link.download_url)?;
    }

    Ok(())
}

const NO_ARGS: &[&str] = &[];
const WINDOWS_START: &[&str] = &["/C", "start", ""];

/// Platform command that opens a URL in the default browser.
fn opener() -> (&'static str, &'static [&'static str]) {
    if cfg!(target_os = "macos") {
        ("open", NO_ARGS)
    } else if cfg!(target_os = "windows") {
        ("cmd", WINDOWS_START)
    } else {
        ("xdg-open", NO_ARGS)
    }
}

fn open_in_browser(url: &str) -> Result<()> {
    let (program, args) = opener();
    debug!(program, url, "Opening report link");
    let status = Command::new(program)
        .args(args)
        .arg(url)
        .status()
        .with_context(|| format!("failed to run {}", program))?;
    if !status.success() {
        bail!("{} exited with {}", program, status);
    }
    Ok(())
}
