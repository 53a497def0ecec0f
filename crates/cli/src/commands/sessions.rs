// Session management commands

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Subcommand;
use cme_core::badge::{status_badge, StatusBadge};
use cme_core::create::{CreateError, CreateOutcome, CreateSessionForm, SessionCreator};
use cme_core::query::{SessionFilter, SessionStats};
use cme_core::session::Session;
use cme_core::views::{
    DetailState, DetailTab, SessionDetailView, SessionListView, SessionRow, TabView,
};
use cme_core::watch::{watch_session, WatchError, WatchOptions};
use serde::Serialize;

use crate::context::Context;
use crate::output::{format_table_row, print_field, print_table_header};

#[derive(Subcommand)]
pub enum SessionsCommand {
    /// List sessions with aggregate counts
    List {
        /// Only sessions in this jurisdiction (e.g. FL)
        #[arg(long, short)]
        state: Option<String>,

        /// Case-insensitive match on patient, doctor or session ID
        #[arg(long)]
        search: Option<String>,
    },

    /// Create a new session
    Create {
        #[arg(long)]
        patient_id: String,

        #[arg(long)]
        patient_name: String,

        /// Examining doctor
        #[arg(long)]
        doctor_name: String,

        /// Jurisdiction code (defaults to the first configured one)
        #[arg(long)]
        state: Option<String>,

        /// Exam date as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        exam_date: Option<String>,

        #[arg(long)]
        case_id: Option<String>,

        #[arg(long)]
        attorney_name: Option<String>,
    },

    /// Show one session
    Get {
        /// Session ID
        session: String,

        /// Tab to display
        #[arg(long, short, default_value = "overview")]
        tab: DetailTab,
    },

    /// Poll a session until processing finishes
    Watch {
        /// Session ID
        session: String,

        /// Poll interval in seconds (default: CME_WATCH_INTERVAL_SECS or 5)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,

        /// Give up after this many seconds
        #[arg(long, default_value = "1800", value_parser = clap::value_parser!(u64).range(1..))]
        timeout: u64,
    },
}

#[derive(Serialize)]
struct ListOutput {
    stats: SessionStats,
    sessions: Vec<SessionRow>,
}

#[derive(Serialize)]
struct DetailOutput<'a> {
    session: &'a Session,
    badge: StatusBadge,
    actions: cme_core::views::SessionActions,
    tab: TabView,
}

pub async fn run(command: SessionsCommand, ctx: &Context) -> Result<()> {
    match command {
        SessionsCommand::List { state, search } => list(ctx, list_filter(state, search)).await,
        SessionsCommand::Create {
            patient_id,
            patient_name,
            doctor_name,
            state,
            exam_date,
            case_id,
            attorney_name,
        } => {
            let jurisdictions = ctx.jurisdictions();
            let mut form = CreateSessionForm::new(&jurisdictions);
            form.patient_id = patient_id;
            form.patient_name = patient_name;
            form.doctor_name = doctor_name;
            if let Some(state) = state {
                form.state = normalize_state(&state);
            }
            if let Some(exam_date) = exam_date {
                form.exam_date = exam_date;
            }
            form.case_id = case_id.unwrap_or_default();
            form.attorney_name = attorney_name.unwrap_or_default();
            create(ctx, form).await
        }
        SessionsCommand::Get { session, tab } => get(ctx, &session, tab).await,
        SessionsCommand::Watch {
            session,
            interval,
            timeout,
        } => {
            let options = WatchOptions {
                interval: interval
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| ctx.config.watch_interval()),
                timeout: Duration::from_secs(timeout),
            };
            watch(ctx, &session, options).await
        }
    }
}

/// Jurisdiction codes are stored upper-case.
fn normalize_state(state: &str) -> String {
    state.trim().to_ascii_uppercase()
}

fn list_filter(state: Option<String>, search: Option<String>) -> SessionFilter {
    SessionFilter::new(
        state.as_deref().map(normalize_state).unwrap_or_default(),
        search.unwrap_or_default(),
    )
}

/// Status badge padded to `width`, coloured without breaking alignment.
pub fn badge_cell(badge: &StatusBadge, width: usize, color: bool) -> String {
    let plain = format!("{:<width$}", badge.render(false), width = width);
    if color {
        format!("{}{}\x1b[0m", badge.tone.ansi_code(), plain)
    } else {
        plain
    }
}

async fn list(ctx: &Context, filter: SessionFilter) -> Result<()> {
    let view = SessionListView::load(ctx.client.as_ref())
        .await
        .with_filter(filter);
    let stats = view.stats();
    let rows = view.rows();

    if !ctx.output.is_text() {
        return ctx.output.print_value(&ListOutput {
            stats,
            sessions: rows,
        });
    }

    if !ctx.quiet {
        println!(
            "Total: {}  Completed: {}  Processing: {}  Pending: {}\n",
            stats.total, stats.completed, stats.processing, stats.pending
        );
    }

    if rows.is_empty() {
        println!("No sessions");
        if !ctx.quiet {
            println!("Get started by creating a new CME session: cme sessions create --help");
        }
        return Ok(());
    }

    print_table_header(&[
        ("ID", 24),
        ("PATIENT", 22),
        ("STATE", 5),
        ("DOCTOR", 20),
        ("EXAM DATE", 10),
        ("MODE", 12),
        ("STATUS", 22),
    ]);

    for row in &rows {
        let cells = format_table_row(&[
            (row.session_id.as_str(), 24),
            (row.patient_name.as_str(), 22),
            (row.state.as_str(), 5),
            (row.doctor_name.as_str(), 20),
            (row.exam_date.as_str(), 10),
            (row.mode.as_str(), 12),
        ]);
        println!("{}  {}", cells, badge_cell(&row.badge, 22, ctx.color));
        if let Some(attorney) = &row.attorney_name {
            println!("{:<24}  Attorney: {}", "", attorney);
        }
    }

    Ok(())
}

async fn create(ctx: &Context, form: CreateSessionForm) -> Result<()> {
    let creator = SessionCreator::new(ctx.client.clone(), ctx.jurisdictions());

    let outcome = match creator.submit(&form).await {
        Ok(outcome) => outcome,
        Err(CreateError::Validation(e)) => bail!("invalid session: {}", e),
        Err(e) => bail!("{}", e),
    };

    let (session_id, route) = match outcome {
        CreateOutcome::Created { session_id, route } => (session_id, route),
        CreateOutcome::AlreadySubmitting => bail!("a create request is already in progress"),
    };

    if ctx.output.is_text() {
        if ctx.quiet {
            println!("{}", session_id);
        } else {
            println!("Created session: {}", session_id);
            print_field("Route", &route.path());
            println!();
        }
    } else {
        #[derive(Serialize)]
        struct Created<'a> {
            session_id: &'a str,
            route: String,
        }
        ctx.output.print_value(&Created {
            session_id: &session_id,
            route: route.path(),
        })?;
    }

    if !ctx.quiet && ctx.output.is_text() {
        // Navigate to the new session's detail view
        get(ctx, &session_id, DetailTab::Overview).await?;
    }

    Ok(())
}

pub async fn get(ctx: &Context, session_id: &str, tab: DetailTab) -> Result<()> {
    let mut view = SessionDetailView::load(ctx.client.as_ref(), session_id).await;
    view.select_tab(tab);

    let session = match &view.state {
        DetailState::Loaded(session) => session,
        DetailState::NotFound => bail!("Session not found: {}", session_id),
    };
    let badge = status_badge(&session.status);
    let actions = view.actions();
    let tab_view = TabView::build(view.active_tab, session);

    if !ctx.output.is_text() {
        return ctx.output.print_value(&DetailOutput {
            session,
            badge,
            actions,
            tab: tab_view,
        });
    }

    println!(
        "{}",
        session.patient_name.as_deref().unwrap_or("CME Session")
    );
    println!(
        "{}  [{}]  [{}]",
        badge.render(ctx.color),
        session.state.as_deref().unwrap_or("-"),
        session.mode.as_deref().unwrap_or("-")
    );
    print_field("ID", &session.session_id);

    let mut available = Vec::new();
    if actions.upload {
        available.push(format!("cme upload {} <FILE>", session.session_id));
    }
    if actions.report {
        available.push(format!("cme report {}", session.session_id));
    }
    if !available.is_empty() {
        print_field("Actions", &available.join(", "));
    }

    let tabs: Vec<String> = DetailTab::ALL
        .iter()
        .map(|t| {
            if *t == view.active_tab {
                format!("[{}]", t.title())
            } else {
                t.title().to_string()
            }
        })
        .collect();
    println!("\n{}\n", tabs.join("  "));

    print_tab(&tab_view);
    Ok(())
}

fn print_tab(tab: &TabView) {
    match tab {
        TabView::Overview(overview) => {
            println!("Session Information");
            print_field("Patient ID", &overview.patient_id);
            print_field("Examiner", &overview.examiner);
            print_field("Exam Date", &overview.exam_date);
            print_field("Attorney", &overview.attorney);
            println!("\nRecording Details");
            print_field("Recording Mode", &overview.mode);
            print_field("State", &overview.state);
            print_field("Legal Basis", &overview.legal_basis);
            print_field(
                "Video Permitted",
                if overview.video_permitted { "Yes" } else { "No" },
            );
        }
        TabView::Timeline(timeline) => {
            println!("Processing Status");
            println!("{}", timeline.processing_stage);
            println!("\n{}", timeline.note);
        }
        TabView::Demeanor(demeanor) => {
            println!("Demeanor Analysis");
            println!("{}", demeanor.description);
            println!("\n{}", demeanor.note);
        }
        TabView::Recordings(recordings) => match &recordings.video_uri {
            Some(uri) => {
                println!("Recording");
                print_field("Video URI", uri);
            }
            None => {
                println!("No Recording Uploaded");
                println!("Upload a recording to begin analysis.");
            }
        },
    }
}

async fn watch(ctx: &Context, session_id: &str, options: WatchOptions) -> Result<()> {
    let color = ctx.color;
    let output = ctx.output;

    let result = watch_session(ctx.client.as_ref(), session_id, options, |session| {
        if output.is_text() {
            let stage = session.processing_stage.as_deref().unwrap_or("");
            println!("{}  {}", status_badge(&session.status).render(color), stage);
        } else {
            // One document per observed change
            output.emit(session);
        }
    })
    .await;

    match result {
        Ok(session) => {
            if output.is_text() && !ctx.quiet && session.status.allows_report() {
                println!("\nReport available: cme report {}", session.session_id);
            }
            Ok(())
        }
        Err(WatchError::Api(cme_core::ApiError::NotFound)) => {
            bail!("Session not found: {}", session_id)
        }
        Err(e) => Err(e.into()),
    }
}
