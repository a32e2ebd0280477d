//! anytask-scraper main entry point
//!
//! Command-line interface that logs into anytask.org and exports courses,
//! review queues and gradebooks.

use anyhow::{bail, Context};
use anytask_scraper::cache::QueueFilter;
use anytask_scraper::client::DEFAULT_BASE_URL;
use anytask_scraper::config::{load_credentials_file, Settings, StatusMode, DEFAULT_SETTINGS_FILE, SETTINGS_KEYS};
use anytask_scraper::output::{
    course_table, download_submission_files, gradebook_tables, queue_table, save_course,
    save_gradebook, save_queue, save_submissions_csv, submission_summary, CsvExporter, Exporter,
    JsonExporter, MarkdownExporter,
};
use anytask_scraper::{AnytaskClient, AppContext, ClientConfig, ReviewQueue};
use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// anytask-scraper: export course data from anytask.org
///
/// Logs in with a username and password (or a saved session), then saves
/// courses, review queues and gradebooks as JSON, Markdown or CSV.
#[derive(Parser, Debug)]
#[command(name = "anytask-scraper")]
#[command(version)]
#[command(about = "Scrape course data from anytask.org", long_about = None)]
struct Cli {
    /// Anytask username
    #[arg(short, long)]
    username: Option<String>,

    /// Anytask password
    #[arg(short, long)]
    password: Option<String>,

    /// Credentials file (JSON or key=value text)
    #[arg(long, value_name = "PATH")]
    credentials_file: Option<String>,

    /// Persistent session file (cookies)
    #[arg(long, value_name = "PATH")]
    session_file: Option<String>,

    /// Print all status lines or only errors
    #[arg(long, value_parser = PossibleValuesParser::new(["all", "errors"]))]
    status_mode: Option<String>,

    /// Default output directory for exports
    #[arg(long, value_name = "DIR")]
    default_output: Option<String>,

    /// Save the session file at the end
    #[arg(long, overrides_with = "no_save_session")]
    save_session: bool,

    #[arg(long, overrides_with = "save_session", hide = true)]
    no_save_session: bool,

    /// Ignore the saved session and log in again
    #[arg(long, overrides_with = "no_refresh_session")]
    refresh_session: bool,

    #[arg(long, overrides_with = "refresh_session", hide = true)]
    no_refresh_session: bool,

    /// Settings file with saved defaults
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SETTINGS_FILE)]
    settings_file: PathBuf,

    /// Site root
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape course tasks
    Course(CourseArgs),
    /// Scrape the review queue of a course
    Queue(QueueArgs),
    /// Scrape the gradebook of a course
    Gradebook(GradebookArgs),
    /// Manage saved defaults
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Markdown,
    Csv,
    /// Print to the terminal only, no file is saved
    Table,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Output directory (default: --default-output or '.')
    #[arg(short, long, value_name = "DIR")]
    output: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// CSV columns to keep, comma separated
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Also print a table after saving
    #[arg(long)]
    show: bool,
}

#[derive(Args, Debug)]
struct CourseArgs {
    /// Course id(s)
    #[arg(short = 'c', long = "course", required = true, num_args = 1..)]
    courses: Vec<u64>,

    #[command(flatten)]
    export: ExportArgs,

    /// Fetch task descriptions in the teacher view (one request per task)
    #[arg(long)]
    fetch_descriptions: bool,
}

#[derive(Args, Debug)]
struct QueueArgs {
    /// Course id
    #[arg(short = 'c', long = "course")]
    course: u64,

    #[command(flatten)]
    export: ExportArgs,

    /// Fetch submission details for each queue entry
    #[arg(long)]
    deep: bool,

    /// Download submission files (implies --deep)
    #[arg(long)]
    download_files: bool,

    /// Filter by task title (substring match)
    #[arg(long)]
    filter_task: Option<String>,

    /// Filter by reviewer name (substring match)
    #[arg(long)]
    filter_reviewer: Option<String>,

    /// Filter by status name (substring match)
    #[arg(long)]
    filter_status: Option<String>,

    /// Filter by student name (substring match)
    #[arg(long)]
    filter_student: Option<String>,
}

#[derive(Args, Debug)]
struct GradebookArgs {
    /// Course id
    #[arg(short = 'c', long = "course")]
    course: u64,

    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Write recommended default settings
    Init,
    /// Show saved settings
    Show,
    /// Set one or more settings
    Set(SetArgs),
    /// Clear the given keys, or all keys when none are given
    Clear {
        #[arg(value_parser = PossibleValuesParser::new(SETTINGS_KEYS))]
        keys: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct SetArgs {
    #[arg(long)]
    credentials_file: Option<String>,

    #[arg(long)]
    session_file: Option<String>,

    #[arg(long, value_parser = PossibleValuesParser::new(["all", "errors"]))]
    status_mode: Option<String>,

    #[arg(long)]
    default_output: Option<String>,

    #[arg(long, overrides_with = "no_save_session")]
    save_session: bool,

    #[arg(long, overrides_with = "save_session")]
    no_save_session: bool,

    #[arg(long, overrides_with = "no_refresh_session")]
    refresh_session: bool,

    #[arg(long, overrides_with = "refresh_session")]
    no_refresh_session: bool,
}

/// Maps a `--flag`/`--no-flag` pair to an optional value
fn flag_pair(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn parse_status_mode(value: Option<&String>) -> anyhow::Result<Option<StatusMode>> {
    value
        .map(|s| s.parse::<StatusMode>())
        .transpose()
        .map_err(Into::into)
}

/// Settings in effect for one run: command line first, then the settings file
struct Runtime {
    settings: Settings,
    status_mode: StatusMode,
    save_session: bool,
    refresh_session: bool,
}

impl Runtime {
    fn resolve(cli: &Cli, saved: &Settings) -> anyhow::Result<Self> {
        let given = Settings {
            credentials_file: cli.credentials_file.clone(),
            session_file: cli.session_file.clone(),
            status_mode: parse_status_mode(cli.status_mode.as_ref())?,
            default_output: cli.default_output.clone(),
            save_session: flag_pair(cli.save_session, cli.no_save_session),
            refresh_session: flag_pair(cli.refresh_session, cli.no_refresh_session),
        };
        let settings = given.or(saved);

        Ok(Self {
            status_mode: settings.status_mode.unwrap_or(StatusMode::All),
            save_session: settings.save_session.unwrap_or(true),
            refresh_session: settings.refresh_session.unwrap_or(false),
            settings,
        })
    }

    fn ok(&self, message: &str) {
        if self.status_mode == StatusMode::All {
            println!("[OK] {}", message);
        }
    }

    fn session_file(&self) -> Option<&str> {
        self.settings.session_file.as_deref().filter(|s| !s.is_empty())
    }

    fn output_dir(&self, export: &ExportArgs) -> PathBuf {
        export
            .output
            .as_deref()
            .or(self.settings.default_output.as_deref())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if let Command::Settings { action } = &cli.command {
        return run_settings(&cli.settings_file, action);
    }

    let saved = Settings::load(&cli.settings_file).with_context(|| {
        format!("Failed to load settings from {}", cli.settings_file.display())
    })?;
    let runtime = Runtime::resolve(&cli, &saved)?;
    let (username, password) = resolve_credentials(&cli, &runtime)?;

    let client = AnytaskClient::new(ClientConfig::with_base_url(cli.base_url.clone()))?
        .with_credentials(username, password);

    let mut session_loaded = false;
    if let Some(path) = runtime.session_file() {
        if !runtime.refresh_session {
            match client.load_session(path) {
                Ok(true) => {
                    session_loaded = true;
                    runtime.ok(&format!("Loaded session from {}", path));
                }
                Ok(false) => {}
                Err(e) => tracing::warn!("Ignoring session file {}: {}", path, e),
            }
        }
    }
    if !session_loaded {
        client.login().await.context("Login failed")?;
    }

    let ctx = AppContext::new(client);
    match &cli.command {
        Command::Course(args) => run_course(&ctx, &runtime, args).await?,
        Command::Queue(args) => run_queue(&ctx, &runtime, args).await?,
        Command::Gradebook(args) => run_gradebook(&ctx, &runtime, args).await?,
        Command::Settings { .. } => {}
    }

    if let Some(path) = runtime.session_file() {
        if runtime.save_session {
            ctx.source().save_session(path)?;
            runtime.ok(&format!("Session saved to {}", path));
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("anytask_scraper=warn,error"),
            1 => EnvFilter::new("anytask_scraper=info,warn"),
            2 => EnvFilter::new("anytask_scraper=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Picks username and password from flags, then the credentials file
///
/// A saved session may stand in for credentials when a session file is set.
fn resolve_credentials(cli: &Cli, runtime: &Runtime) -> anyhow::Result<(String, String)> {
    let (file_username, file_password) = match runtime.settings.credentials_file.as_deref() {
        Some(path) if !path.is_empty() => load_credentials_file(Path::new(path))
            .with_context(|| format!("Could not read credentials file {}", path))?,
        _ => (String::new(), String::new()),
    };

    let username = cli.username.clone().filter(|s| !s.is_empty()).unwrap_or(file_username);
    let password = cli.password.clone().filter(|s| !s.is_empty()).unwrap_or(file_password);

    if !username.is_empty() && password.is_empty() {
        bail!("Password is missing");
    }
    if !password.is_empty() && username.is_empty() {
        bail!("Username is missing");
    }
    if runtime.session_file().is_none() && username.is_empty() {
        bail!(
            "Credentials required: use --username/--password or --credentials-file. \
             If you only want saved session auth, pass --session-file"
        );
    }

    Ok((username, password))
}

fn exporter_for(export: &ExportArgs) -> Option<Box<dyn Exporter>> {
    match export.format {
        Format::Json => Some(Box::new(JsonExporter)),
        Format::Markdown => Some(Box::new(MarkdownExporter)),
        Format::Csv => Some(Box::new(csv_exporter(export))),
        Format::Table => None,
    }
}

fn csv_exporter(export: &ExportArgs) -> CsvExporter {
    if export.columns.is_empty() {
        CsvExporter::new()
    } else {
        CsvExporter::with_columns(export.columns.clone())
    }
}

async fn run_course(
    ctx: &AppContext<AnytaskClient>,
    runtime: &Runtime,
    args: &CourseArgs,
) -> anyhow::Result<()> {
    let output_dir = runtime.output_dir(&args.export);

    for &course_id in &args.courses {
        let mut course = ctx
            .load_course(course_id)
            .await
            .with_context(|| format!("Failed to fetch course {}", course_id))?;

        if args.fetch_descriptions {
            ctx.source().fill_task_descriptions(&mut course).await;
        }

        match exporter_for(&args.export) {
            Some(exporter) => {
                let path = save_course(exporter.as_ref(), &course, &output_dir)?;
                runtime.ok(&format!(
                    "Course {} ({}): {} tasks -> {}",
                    course_id,
                    course.title,
                    course.tasks.len(),
                    path.display()
                ));
                if args.export.show {
                    print!("{}", course_table(&course));
                }
            }
            None => print!("{}", course_table(&course)),
        }
    }
    Ok(())
}

async fn run_queue(
    ctx: &AppContext<AnytaskClient>,
    runtime: &Runtime,
    args: &QueueArgs,
) -> anyhow::Result<()> {
    let course_id = args.course;
    let output_dir = runtime.output_dir(&args.export);
    let deep = args.deep || args.download_files;

    let filter = QueueFilter {
        task: args.filter_task.clone(),
        reviewer: args.filter_reviewer.clone(),
        status: args.filter_status.clone(),
        student: args.filter_student.clone(),
    };

    let full = ctx
        .get_or_fetch_queue(course_id)
        .await
        .with_context(|| format!("Failed to fetch queue of course {}", course_id))?;
    let mut queue = filter.apply(&full);

    if queue.entries.len() == full.entries.len() {
        runtime.ok(&format!("Queue: {} entries", queue.entries.len()));
    } else {
        runtime.ok(&format!(
            "Queue: {} entries (filtered from {})",
            queue.entries.len(),
            full.entries.len()
        ));
    }

    if deep {
        queue = fetch_submissions(ctx, &filter, queue).await?;
        runtime.ok(&format!("Fetched {} submissions", queue.submissions.len()));
    }

    if args.download_files {
        let mut total = 0;
        for submission in queue.submissions_in_order() {
            total += download_submission_files(ctx.source(), submission, &output_dir)
                .await?
                .len();
        }
        runtime.ok(&format!("Downloaded {} files -> {}", total, output_dir.display()));
    }

    match exporter_for(&args.export) {
        Some(exporter) => {
            let path = save_queue(exporter.as_ref(), &queue, &output_dir)?;
            runtime.ok(&format!("Saved -> {}", path.display()));
            if args.export.format == Format::Csv && !queue.submissions.is_empty() {
                let path = save_submissions_csv(&csv_exporter(&args.export), &queue, &output_dir)?;
                runtime.ok(&format!("Saved submissions -> {}", path.display()));
            }
            if args.export.show {
                print_queue(&queue);
            }
        }
        None => print_queue(&queue),
    }
    Ok(())
}

/// Fills in submission details for the entries of `queue`
///
/// Without a filter the whole queue is fetched through the cache in one
/// pass; otherwise only the matching entries are opened.
async fn fetch_submissions(
    ctx: &AppContext<AnytaskClient>,
    filter: &QueueFilter,
    mut queue: ReviewQueue,
) -> anyhow::Result<ReviewQueue> {
    let course_id = queue.course_id;

    if filter.is_empty() {
        let report = ctx.deep_fetch_queue(course_id).await?;
        for (url, error) in &report.failures {
            eprintln!("Warning: could not fetch {}: {}", url, error);
        }
        return Ok(ctx.get_or_fetch_queue(course_id).await?);
    }

    let accessible: Vec<String> = queue.accessible_entries().map(|e| e.issue_url.clone()).collect();
    for url in accessible {
        match ctx.get_or_fetch_submission(course_id, &url).await {
            Ok(submission) => {
                queue.submissions.insert(url, submission);
            }
            Err(e) if e.is_auth() => return Err(e.into()),
            Err(e) => eprintln!("Warning: could not fetch {}: {}", url, e),
        }
    }
    Ok(queue)
}

fn print_queue(queue: &ReviewQueue) {
    print!("{}", queue_table(queue));
    for submission in queue.submissions_in_order() {
        println!();
        print!("{}", submission_summary(submission));
    }
}

async fn run_gradebook(
    ctx: &AppContext<AnytaskClient>,
    runtime: &Runtime,
    args: &GradebookArgs,
) -> anyhow::Result<()> {
    let output_dir = runtime.output_dir(&args.export);
    let gradebook = ctx
        .get_or_fetch_gradebook(args.course)
        .await
        .with_context(|| format!("Failed to fetch gradebook of course {}", args.course))?;

    let print_tables = || {
        for table in gradebook_tables(&gradebook) {
            println!("{}", table);
        }
    };

    match exporter_for(&args.export) {
        Some(exporter) => {
            let path = save_gradebook(exporter.as_ref(), &gradebook, &output_dir)?;
            runtime.ok(&format!(
                "Gradebook {}: {} groups, {} students -> {}",
                args.course,
                gradebook.groups.len(),
                gradebook.student_count(),
                path.display()
            ));
            if args.export.show {
                print_tables();
            }
        }
        None => print_tables(),
    }
    Ok(())
}

fn run_settings(path: &Path, action: &SettingsAction) -> anyhow::Result<()> {
    let mut settings = Settings::load(path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;

    match action {
        SettingsAction::Init => {
            Settings::init_defaults().save(path)?;
            println!("[OK] Initialized settings -> {}", path.display());
        }
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::Set(args) => {
            let updates = Settings {
                credentials_file: args.credentials_file.clone(),
                session_file: args.session_file.clone(),
                status_mode: parse_status_mode(args.status_mode.as_ref())?,
                default_output: args.default_output.clone(),
                save_session: flag_pair(args.save_session, args.no_save_session),
                refresh_session: flag_pair(args.refresh_session, args.no_refresh_session),
            };
            if !settings.update(updates) {
                bail!("Nothing to update");
            }
            settings.save(path)?;
            println!("[OK] Saved settings -> {}", path.display());
        }
        SettingsAction::Clear { keys } => {
            settings.clear(keys)?;
            settings.save(path)?;
            println!("[OK] Updated settings -> {}", path.display());
        }
    }
    Ok(())
}
