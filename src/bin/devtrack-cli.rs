use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use env_logger::Env;

use devtrack::client::api::DEFAULT_API_URL;
use devtrack::client::session::{MergedTime, TimerOutcome};
use devtrack::client::state::View;
use devtrack::client::{view, LocalStore, Session, TaskListing};
use devtrack::models::{parse_status_filter, Priority, TaskStatus, UpdateTaskRequest};

#[derive(Parser)]
#[command(name = "devtrack-cli")]
#[command(version, about = "Track development tasks and coding sessions")]
struct Cli {
    /// Base URL of the DevTrack server
    #[arg(long, global = true, env = "DEVTRACK_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Local state file (session, cached tasks, timer)
    #[arg(long, global = true, env = "DEVTRACK_STATE")]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: Option<String>,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the session and cached tasks
    Logout,
    Whoami,
    /// Edit the cached profile shown by the client
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// List tasks, optionally narrowed to one status
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    Add {
        title: String,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Change several fields of a task at once
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        notes: Option<String>,
        /// Replaces all tags
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
    },
    Status {
        id: String,
        status: TaskStatus,
    },
    Notes {
        id: String,
        text: String,
    },
    Delete {
        id: String,
    },
    Timer {
        #[command(subcommand)]
        command: TimerCommands,
    },
    /// Summary counts and productivity trend
    Stats,
    /// Switch the default view, or render the current one
    View {
        view: Option<View>,
    },
    /// Board filter: all, pending, in-progress or completed
    Filter {
        status: String,
    },
}

#[derive(Subcommand)]
enum TimerCommands {
    /// Start timing a task; starting the running task stops it
    Start { id: String },
    Stop,
    Status,
}

fn open_session(cli: &Cli) -> Result<Session> {
    let path = cli.state_file.clone().unwrap_or_else(LocalStore::default_path);
    let store = LocalStore::open(&path)
        .with_context(|| format!("Failed to open state file {}", path.display()))?;
    Ok(Session::new(&cli.api_url, store))
}

fn note_stale(listing: &TaskListing) {
    if let TaskListing::Stale { fetched_at, .. } = listing {
        eprintln!("offline: showing tasks cached at {}", fetched_at.format("%Y-%m-%d %H:%M"));
    }
}

fn print_merged(merged: &MergedTime) {
    println!(
        "+{} on \"{}\" (total {})",
        view::format_time(merged.elapsed.seconds),
        merged.task.title,
        view::format_time(merged.task.time_spent)
    );
}

async fn render_current_view(session: &mut Session) -> Result<()> {
    match session.store().ui().view {
        View::Board => {
            let listing = session.fetch_tasks().await?;
            note_stale(&listing);
            print!("{}", view::render_board(listing.tasks(), session.store().ui(), Utc::now()));
        }
        View::Analytics => print!("{}", view::render_analytics(&session.summary().await?)),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut session = open_session(&cli)?;

    let Some(command) = cli.command else {
        if !session.is_logged_in() {
            print!("{}", view::landing());
            return Ok(());
        }
        return render_current_view(&mut session).await;
    };

    match command {
        Commands::Signup {
            name,
            email,
            password,
            confirm_password,
        } => {
            let user = session
                .signup(&name, &email, &password, confirm_password.as_deref())
                .await?;
            println!("Welcome, {} <{}>", user.name, user.email);
        }
        Commands::Login { email, password } => {
            let user = session.login(&email, &password).await?;
            println!("Logged in as {} <{}>", user.name, user.email);
        }
        Commands::Logout => {
            if session.logout()?.is_some() {
                eprintln!("discarding the running timer");
            }
            println!("Logged out");
        }
        Commands::Whoami => {
            let user = session.whoami().await?;
            println!("{} <{}> ({})", user.name, user.email, user.id);
        }
        Commands::Profile { name, email } => {
            if name.is_none() && email.is_none() {
                bail!("nothing to change; pass --name or --email");
            }
            let user = session.update_profile(name, email)?;
            println!("Profile: {} <{}>", user.name, user.email);
        }
        Commands::List { status } => {
            let listing = session.fetch_tasks().await?;
            note_stale(&listing);
            let mut ui = session.store().ui().clone();
            if status.is_some() {
                ui.filter = status;
            }
            print!("{}", view::render_board(listing.tasks(), &ui, Utc::now()));
        }
        Commands::Add {
            title,
            status,
            priority,
            notes,
            tags,
        } => {
            session.require_login()?;
            let ui = session.store_mut().ui_mut();
            ui.begin_create()?;
            if let Some(draft) = ui.draft_mut() {
                draft.title = title;
                draft.status = status.unwrap_or_default();
                draft.priority = priority.unwrap_or_default();
                draft.notes = notes.unwrap_or_default();
                draft.tags = tags;
            }
            let submitted = ui.submit_draft()?;
            let task = session.submit(submitted).await?;
            print!("{}", view::render_task(&task));
        }
        Commands::Edit {
            id,
            title,
            status,
            priority,
            notes,
            tags,
        } => {
            let task = session.find_task(&id).await?;
            let ui = session.store_mut().ui_mut();
            ui.begin_edit(&task)?;
            if let Some(draft) = ui.draft_mut() {
                if let Some(title) = title {
                    draft.title = title;
                }
                if let Some(status) = status {
                    draft.status = status;
                }
                if let Some(priority) = priority {
                    draft.priority = priority;
                }
                if let Some(notes) = notes {
                    draft.notes = notes;
                }
                if let Some(tags) = tags {
                    draft.tags = tags;
                }
            }
            let submitted = match ui.submit_draft() {
                Ok(submitted) => submitted,
                Err(e) => {
                    ui.cancel_draft();
                    return Err(e.into());
                }
            };
            let task = session.submit(submitted).await?;
            print!("{}", view::render_task(&task));
        }
        Commands::Status { id, status } => {
            let changes = UpdateTaskRequest {
                status: Some(status.as_str().to_string()),
                ..Default::default()
            };
            let task = session.update(&id, changes).await?;
            println!("\"{}\" is now {}", task.title, task.status);
        }
        Commands::Notes { id, text } => {
            let changes = UpdateTaskRequest {
                notes: Some(text),
                ..Default::default()
            };
            let task = session.update(&id, changes).await?;
            print!("{}", view::render_task(&task));
        }
        Commands::Delete { id } => {
            let (task, cancelled) = session.delete(&id).await?;
            if cancelled {
                println!("Timer for \"{}\" cancelled", task.title);
            }
            println!("Deleted \"{}\"", task.title);
        }
        Commands::Timer { command } => {
            session.require_login()?;
            let now = Utc::now();
            match command {
                TimerCommands::Start { id } => match session.toggle_timer(&id, now).await? {
                    TimerOutcome::Started { task, flushed } => {
                        if let Some(merged) = flushed {
                            print_merged(&merged);
                        }
                        println!("Timing \"{}\"", task.title);
                    }
                    TimerOutcome::Stopped(merged) => print_merged(&merged),
                },
                TimerCommands::Stop => match session.stop_timer(now).await? {
                    Some(merged) => print_merged(&merged),
                    None => println!("No timer running"),
                },
                TimerCommands::Status => match session.store().ui().active_timer() {
                    Some(timer) => println!(
                        "Timing {} for {}",
                        timer.task_id,
                        view::format_time(timer.elapsed(now).seconds)
                    ),
                    None => println!("No timer running"),
                },
            }
        }
        Commands::Stats => {
            let summary = session.summary().await?;
            print!("{}", view::render_analytics(&summary));
        }
        Commands::View { view: selected } => {
            if let Some(selected) = selected {
                session.store_mut().ui_mut().view = selected;
                session.store().save()?;
            }
            if !session.is_logged_in() {
                print!("{}", view::landing());
                return Ok(());
            }
            render_current_view(&mut session).await?;
        }
        Commands::Filter { status } => {
            let filter = parse_status_filter(Some(status.as_str()))?;
            session.store_mut().ui_mut().filter = filter;
            session.store().save()?;
            println!("Filter: {}", filter.map_or("all", |s| s.as_str()));
        }
    }

    Ok(())
}
