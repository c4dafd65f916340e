use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sp", about = concat!("siteplan v", env!("CARGO_PKG_VERSION"), " - clients, projects and task timelines"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different workspace directory
    #[arg(short = 'C', long = "workspace-dir", global = true)]
    pub workspace_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new siteplan workspace in the current directory
    Init(InitArgs),
    /// Manage clients
    Client(ClientCmd),
    /// Manage projects
    Project(ProjectCmd),
    /// Manage a project's tasks
    Task(TaskCmd),
    /// Show a project's task timeline
    Gantt(GanttArgs),
    /// Count projects by state
    Stats,
    /// Show projects per target month and state
    Funnel(FunnelArgs),
    /// Follow a project's timeline as it changes
    Watch(WatchArgs),
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Workspace name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Default project currency
    #[arg(long)]
    pub currency: Option<String>,
    /// Reinitialize even if siteplan/ already exists
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ClientCmd {
    #[command(subcommand)]
    pub action: ClientAction,
}

#[derive(Subcommand)]
pub enum ClientAction {
    /// Add a client
    Add(ClientAddArgs),
    /// List clients alphabetically
    List(ClientListArgs),
    /// Remove a client
    Rm(IdArg),
}

#[derive(Args)]
pub struct ClientAddArgs {
    /// Client name
    pub name: String,
    #[arg(long)]
    pub mobile: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args)]
pub struct ClientListArgs {
    /// Only clients whose name contains this text
    #[arg(long)]
    pub search: Option<String>,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ProjectCmd {
    #[command(subcommand)]
    pub action: ProjectAction,
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Add a project
    Add(ProjectAddArgs),
    /// List projects
    List(ProjectListArgs),
    /// Change a project's details
    Edit(ProjectEditArgs),
    /// Move a project to a new state (Lead, Proposal, Active, Completed, Archived)
    State(ProjectStateArgs),
    /// Remove a project and its tasks
    Rm(IdArg),
}

#[derive(Args)]
pub struct ProjectAddArgs {
    /// Site address
    pub address: String,
    /// Owning client id
    #[arg(long)]
    pub client: Option<String>,
    /// Map link
    #[arg(long)]
    pub location: Option<String>,
    /// Currency (default from config)
    #[arg(long)]
    pub currency: Option<String>,
    #[arg(long)]
    pub budget: Option<String>,
    #[arg(long = "property-type")]
    pub property_type: Option<String>,
    #[arg(long = "property-size")]
    pub property_size: Option<String>,
    #[arg(long = "project-type")]
    pub project_type: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Initial state (default: Lead)
    #[arg(long)]
    pub state: Option<String>,
    /// Target date (YYYY-MM-DD)
    #[arg(long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ProjectListArgs {
    /// Only projects that are neither completed nor archived
    #[arg(long)]
    pub open: bool,
}

#[derive(Args)]
pub struct ProjectEditArgs {
    /// Project id
    pub id: String,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub currency: Option<String>,
    #[arg(long)]
    pub budget: Option<String>,
    #[arg(long = "property-type")]
    pub property_type: Option<String>,
    #[arg(long = "property-size")]
    pub property_size: Option<String>,
    #[arg(long = "project-type")]
    pub project_type: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Target date (YYYY-MM-DD, empty to clear)
    #[arg(long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ProjectStateArgs {
    /// Project id
    pub id: String,
    /// New state
    pub state: String,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TaskCmd {
    #[command(subcommand)]
    pub action: TaskAction,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to a project
    Add(TaskAddArgs),
    /// List a project's tasks
    List(TaskListArgs),
    /// Change a task
    Edit(TaskEditArgs),
    /// Remove a task
    Rm(IdArg),
    /// Copy every task of one project into another
    Copy(TaskCopyArgs),
}

#[derive(Args)]
pub struct TaskAddArgs {
    /// Project id
    pub project: String,
    /// Task name
    pub name: String,
    #[arg(long)]
    pub description: Option<String>,
    /// Due date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub due: Option<String>,
    /// Pending, "In Progress" or Completed
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Args)]
pub struct TaskListArgs {
    /// Project id
    pub project: String,
}

#[derive(Args)]
pub struct TaskEditArgs {
    /// Task id
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// New due date; an empty value clears it
    #[arg(long)]
    pub due: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Args)]
pub struct TaskCopyArgs {
    /// Project to copy from
    pub from: String,
    /// Project to paste into
    pub to: String,
}

// ---------------------------------------------------------------------------
// Timeline and portfolio
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct GanttArgs {
    /// Project id
    pub project: String,
}

#[derive(Args)]
pub struct FunnelArgs {
    /// Months before the current month (default from config)
    #[arg(long)]
    pub back: Option<u32>,
    /// Months from the current month on (default from config)
    #[arg(long)]
    pub forward: Option<u32>,
}

#[derive(Args)]
pub struct WatchArgs {
    /// Project id
    pub project: String,
}

#[derive(Args)]
pub struct IdArg {
    pub id: String,
}
