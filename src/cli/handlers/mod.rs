mod init;
pub use init::cmd_init;

use chrono::{Local, Utc};
use serde_json::Value;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::json_store::JsonStore;
use crate::io::store::{Collection, Filter, RecordStore};
use crate::model::client::Client;
use crate::model::config::WorkspaceConfig;
use crate::model::document::Fields;
use crate::model::project::{Project, ProjectState};
use crate::model::task::{Task, TaskStatus};
use crate::ops::portfolio::{FunnelWindow, funnel_states, monthly_funnel, state_histogram};
use crate::ops::schedule::synthesize;
use crate::ops::tracker::{SaveOutcome, SaveTracker};
use crate::ops::{OpsError, client_ops, project_ops, task_ops};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// An opened workspace: its configuration and record store
struct Workspace {
    config: WorkspaceConfig,
    store: JsonStore,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let Some(command) = cli.command else {
        return Err("no command given (try `sp --help`)".into());
    };
    let command = match command {
        Commands::Init(args) => return cmd_init(args, cli.workspace_dir.as_deref()),
        other => other,
    };

    let ws = open_workspace(cli.workspace_dir.as_deref())?;
    match command {
        Commands::Init(_) => Ok(()),
        Commands::Client(cmd) => match cmd.action {
            ClientAction::Add(args) => cmd_client_add(&ws, args, json).await,
            ClientAction::List(args) => cmd_client_list(&ws, args, json).await,
            ClientAction::Rm(args) => cmd_client_rm(&ws, args).await,
        },
        Commands::Project(cmd) => match cmd.action {
            ProjectAction::Add(args) => cmd_project_add(&ws, args, json).await,
            ProjectAction::List(args) => cmd_project_list(&ws, args, json).await,
            ProjectAction::Edit(args) => cmd_project_edit(&ws, args, json).await,
            ProjectAction::State(args) => cmd_project_state(&ws, args, json).await,
            ProjectAction::Rm(args) => cmd_project_rm(&ws, args).await,
        },
        Commands::Task(cmd) => match cmd.action {
            TaskAction::Add(args) => cmd_task_add(&ws, args, json).await,
            TaskAction::List(args) => cmd_task_list(&ws, args, json).await,
            TaskAction::Edit(args) => cmd_task_edit(&ws, args, json).await,
            TaskAction::Rm(args) => cmd_task_rm(&ws, args).await,
            TaskAction::Copy(args) => cmd_task_copy(&ws, args, json).await,
        },
        Commands::Gantt(args) => cmd_gantt(&ws, args, json).await,
        Commands::Stats => cmd_stats(&ws, json).await,
        Commands::Funnel(args) => cmd_funnel(&ws, args, json).await,
        Commands::Watch(args) => cmd_watch(&ws, args, json).await,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_workspace(workspace_dir: Option<&str>) -> Result<Workspace, Box<dyn std::error::Error>> {
    let start = match workspace_dir {
        Some(dir) => std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
        None => std::env::current_dir()?,
    };
    let store_dir = config_io::discover_workspace(&start)?;
    let config = config_io::read_config(&store_dir)?;
    tracing::debug!(dir = %store_dir.display(), "workspace opened");
    Ok(Workspace {
        config,
        store: JsonStore::open(store_dir),
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_created(id: &str, what: &str, json: bool) -> CmdResult {
    if json {
        print_json(&CreatedJson { id })
    } else {
        println!("{} {}", what, id);
        Ok(())
    }
}

fn parse_task_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse_status(s).ok_or_else(|| {
        format!(
            "unknown task status '{}' (expected: pending, \"in progress\", completed)",
            s
        )
    })
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

async fn cmd_client_add(ws: &Workspace, args: ClientAddArgs, json: bool) -> CmdResult {
    let client = Client {
        name: args.name,
        mobile: args.mobile.unwrap_or_default(),
        email: args.email.unwrap_or_default(),
        address: args.address.unwrap_or_default(),
        notes: args.notes.unwrap_or_default(),
        ..Default::default()
    };
    let id = client_ops::create_client(&ws.store, &client).await?;
    print_created(&id, "client", json)
}

async fn cmd_client_list(ws: &Workspace, args: ClientListArgs, json: bool) -> CmdResult {
    let clients = client_ops::list_clients(&ws.store).await?;
    let shown = client_ops::search(&clients, args.search.as_deref().unwrap_or(""));
    if json {
        let out: Vec<_> = shown.iter().map(|c| client_json(c)).collect();
        return print_json(&out);
    }
    for client in shown {
        println!("{}", format_client_line(client));
    }
    Ok(())
}

async fn cmd_client_rm(ws: &Workspace, args: IdArg) -> CmdResult {
    client_ops::delete_client(&ws.store, &args.id).await?;
    println!("removed client {}", args.id);
    Ok(())
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

async fn cmd_project_add(ws: &Workspace, args: ProjectAddArgs, json: bool) -> CmdResult {
    let state = match args.state.as_deref() {
        Some(s) => Some(
            ProjectState::parse_known(s).ok_or_else(|| OpsError::UnknownState(s.to_string()))?,
        ),
        None => None,
    };
    let project = Project {
        client_id: args.client.unwrap_or_default(),
        address: args.address,
        location: args.location.unwrap_or_default(),
        currency: args.currency.unwrap_or_default(),
        budget: args.budget.unwrap_or_default(),
        property_type: args.property_type.unwrap_or_default(),
        property_size: args.property_size.unwrap_or_default(),
        project_type: args.project_type.unwrap_or_default(),
        notes: args.notes.unwrap_or_default(),
        state,
        target_date: args.target,
        ..Default::default()
    };
    let id = project_ops::create_project(&ws.store, project, &ws.config.defaults.currency).await?;
    print_created(&id, "project", json)
}

async fn cmd_project_list(ws: &Workspace, args: ProjectListArgs, json: bool) -> CmdResult {
    let projects = project_ops::list_projects(&ws.store).await?;
    let shown: Vec<&Project> = if args.open {
        project_ops::open_projects(&projects)
    } else {
        projects.iter().collect()
    };
    if json {
        let out: Vec<_> = shown.iter().map(|p| project_json(p)).collect();
        return print_json(&out);
    }
    for project in shown {
        println!("{}", format_project_line(project));
    }
    Ok(())
}

async fn cmd_project_edit(ws: &Workspace, args: ProjectEditArgs, json: bool) -> CmdResult {
    let mut fields = Fields::new();
    let text_fields = [
        ("address", args.address),
        ("clientId", args.client),
        ("location", args.location),
        ("currency", args.currency),
        ("budget", args.budget),
        ("propertyType", args.property_type),
        ("propertySize", args.property_size),
        ("projectType", args.project_type),
        ("notes", args.notes),
    ];
    for (key, value) in text_fields {
        if let Some(value) = value {
            fields.insert(key.into(), Value::String(value));
        }
    }
    if let Some(target) = args.target {
        let value = if target.trim().is_empty() {
            Value::Null
        } else {
            Value::String(target)
        };
        fields.insert("targetDate".into(), value);
    }
    if fields.is_empty() {
        return Err("nothing to change (see `sp project edit --help`)".into());
    }

    let project = project_ops::update_project(&ws.store, &args.id, fields).await?;
    if json {
        return print_json(&project_json(&project));
    }
    println!("{}", format_project_line(&project));
    Ok(())
}

async fn cmd_project_state(ws: &Workspace, args: ProjectStateArgs, json: bool) -> CmdResult {
    let project = project_ops::transition_state(&ws.store, &args.id, &args.state, Utc::now()).await?;
    if json {
        return print_json(&project_json(&project));
    }
    println!("{}", format_project_line(&project));
    Ok(())
}

async fn cmd_project_rm(ws: &Workspace, args: IdArg) -> CmdResult {
    let removed = project_ops::delete_project(&ws.store, &args.id).await?;
    println!("removed project {} ({} tasks)", args.id, removed);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

async fn cmd_task_add(ws: &Workspace, args: TaskAddArgs, json: bool) -> CmdResult {
    let status = match args.status.as_deref() {
        Some(s) => parse_task_status(s)?,
        None => TaskStatus::Pending,
    };
    let task = Task {
        project_id: Some(args.project),
        name: args.name,
        description: args.description.unwrap_or_default(),
        due_date: args.due.filter(|d| !d.trim().is_empty()),
        status,
        ..Default::default()
    };
    let id = task_ops::create_task(&ws.store, &task).await?;
    print_created(&id, "task", json)
}

async fn cmd_task_list(ws: &Workspace, args: TaskListArgs, json: bool) -> CmdResult {
    let tasks = task_ops::list_tasks(&ws.store, &args.project).await?;
    if json {
        let out: Vec<_> = tasks.iter().map(task_json).collect();
        return print_json(&out);
    }
    for task in &tasks {
        println!("{}", format_task_line(task));
    }
    Ok(())
}

/// Edits go through the save tracker: the project's tasks are captured,
/// the one task is changed in the working copy, and Save writes back
/// whatever differs.
async fn cmd_task_edit(ws: &Workspace, args: TaskEditArgs, json: bool) -> CmdResult {
    let status = args.status.as_deref().map(parse_task_status).transpose()?;
    if args.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(OpsError::EmptyName.into());
    }

    let task = task_ops::get_task(&ws.store, &args.id).await?;
    let project_id = task.project_id.clone().unwrap_or_default();
    let tasks = task_ops::list_tasks(&ws.store, &project_id).await?;

    let mut tracker = SaveTracker::new();
    tracker.select_scope(project_id, tasks);
    tracker.edit_task(&args.id, |t| {
        if let Some(name) = args.name {
            t.name = name;
        }
        if let Some(description) = args.description {
            t.description = description;
        }
        if let Some(due) = args.due {
            t.due_date = Some(due).filter(|d| !d.trim().is_empty());
        }
        if let Some(status) = status {
            t.status = status;
        }
    });

    let outcome = tracker.save(&ws.store).await?;
    let Some(edited) = tracker.working().iter().find(|t| t.id == args.id) else {
        return Err(format!("task {} disappeared while editing", args.id).into());
    };
    if json {
        return print_json(&task_json(edited));
    }
    match outcome {
        SaveOutcome::Skipped => println!("no changes"),
        SaveOutcome::Saved(_) => println!("{}", format_task_line(edited)),
    }
    Ok(())
}

async fn cmd_task_rm(ws: &Workspace, args: IdArg) -> CmdResult {
    task_ops::delete_task(&ws.store, &args.id).await?;
    println!("removed task {}", args.id);
    Ok(())
}

async fn cmd_task_copy(ws: &Workspace, args: TaskCopyArgs, json: bool) -> CmdResult {
    let copied = task_ops::list_tasks(&ws.store, &args.from).await?;
    let ids = task_ops::paste_tasks(&ws.store, &copied, &args.to).await?;
    if json {
        return print_json(&ids);
    }
    println!("copied {} tasks into {}", ids.len(), args.to);
    Ok(())
}

// ---------------------------------------------------------------------------
// Timeline and portfolio
// ---------------------------------------------------------------------------

async fn cmd_gantt(ws: &Workspace, args: GanttArgs, json: bool) -> CmdResult {
    project_ops::get_project(&ws.store, &args.project).await?;
    let docs = ws.store.list(Collection::Tasks).await?;
    let filter = Filter::field_eq(task_ops::PROJECT_FIELD, &args.project);
    let schedule = synthesize(&filter.apply(&docs), Utc::now());

    if json {
        return print_json(&GanttJson {
            project: &args.project,
            schedule: &schedule,
        });
    }
    if schedule.bars.is_empty() {
        println!("no tasks scheduled");
    }
    for line in format_gantt(&schedule.bars) {
        println!("{}", line);
    }
    if schedule.skipped_malformed > 0 {
        eprintln!("warning: {} malformed task records skipped", schedule.skipped_malformed);
    }
    Ok(())
}

async fn cmd_stats(ws: &Workspace, json: bool) -> CmdResult {
    let projects = project_ops::list_projects(&ws.store).await?;
    let hist = state_histogram(&projects);
    if json {
        return print_json(&StatsJson {
            total: hist.total(),
            states: &hist,
        });
    }
    for line in format_histogram(&hist) {
        println!("{}", line);
    }
    Ok(())
}

async fn cmd_funnel(ws: &Workspace, args: FunnelArgs, json: bool) -> CmdResult {
    let window = FunnelWindow::new(
        args.back.unwrap_or(ws.config.funnel.months_back),
        args.forward.unwrap_or(ws.config.funnel.months_forward),
    );
    let projects = project_ops::list_projects(&ws.store).await?;
    let buckets = monthly_funnel(&projects, window, Local::now().date_naive());

    if json {
        return print_json(&FunnelJson {
            months_back: window.months_back,
            months_forward: window.months_forward,
            states: funnel_states(&buckets),
            buckets: &buckets,
        });
    }
    for line in format_funnel(&buckets) {
        println!("{}", line);
    }
    Ok(())
}

/// Re-render the project's timeline on every snapshot until interrupted.
async fn cmd_watch(ws: &Workspace, args: WatchArgs, json: bool) -> CmdResult {
    project_ops::get_project(&ws.store, &args.project).await?;
    let mut sub = task_ops::watch_tasks(&ws.store, &args.project).await?;

    loop {
        let snapshot = tokio::select! {
            snapshot = sub.next() => snapshot,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(docs) = snapshot else {
            break;
        };
        let schedule = synthesize(&docs, Utc::now());
        if json {
            let line = serde_json::to_string(&GanttJson {
                project: &args.project,
                schedule: &schedule,
            })?;
            println!("{}", line);
        } else {
            println!("-- {} ({} tasks) --", Local::now().format("%H:%M:%S"), schedule.bars.len());
            for line in format_gantt(&schedule.bars) {
                println!("{}", line);
            }
        }
    }
    tracing::debug!(project = %args.project, "watch stopped");
    Ok(())
}
