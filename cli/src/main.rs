//! `supportdesk`: terminal front end for the student-support dashboard.
//!
//! Every subcommand is a navigation to a dashboard view. It goes through the
//! route guard first and only talks to the backend once the guard allows it.


use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::builder::PossibleValuesParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use supportdesk::config::{ConfigError, normalize_base_url};
use supportdesk::forms::{self, FormError, InterventionForm};
use supportdesk::guard::{GuardOutcome, redirect_on_invalidation};
use supportdesk::net::auth::{self, LoginError};
use supportdesk::net::download::Download;
use supportdesk::net::interventions::{self, InterventionFilter, PRIORITIES, STATUSES};
use supportdesk::net::reports::{self, Export, Report};
use supportdesk::net::resources::{self, StudentQuery};
use supportdesk::net::types::{GradeInput, InterventionUpdate, NewUser, PredictionRequest};
use supportdesk::net::assistant::{self, Conversation};
use supportdesk::net::{alerts, types::Role};
use supportdesk::session::{SessionEvent, file_store};
use supportdesk::{ApiClient, ApiError, ClientConfig, Navigator, Route, RouteGuard, SessionEvents, SessionStore, User};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not signed in; run `supportdesk login`")]
    NotSignedIn,
    #[error("{0} requires an administrator account")]
    AdminOnly(&'static str),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("{}", .0.user_message())]
    Login(#[from] LoginError),
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "supportdesk", about = "Student-support dashboard client")]
struct Cli {
    /// Backend API root (overrides SUPPORTDESK_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in seconds (overrides SUPPORTDESK_TIMEOUT_SECS).
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Session directory (overrides SUPPORTDESK_STATE_DIR).
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and keep the session for later commands.
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(long, env = "SUPPORTDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Show the signed-in profile.
    Whoami {
        /// Ask the backend instead of reading the stored profile.
        #[arg(long)]
        remote: bool,
    },
    /// Backend liveness; needs no session.
    Health,
    Stats,
    Students(StudentsArgs),
    Student {
        code: String,
    },
    AtRisk,
    Tracks,
    Modules,
    Module {
        name: String,
    },
    /// Risk prediction from a set of module grades.
    Predict {
        #[arg(long)]
        track: String,
        #[arg(long)]
        student: Option<String>,
        /// `CODE=NOTE`, repeatable.
        #[arg(long = "grade", value_parser = parse_grade, required = true)]
        grades: Vec<GradeInput>,
    },
    /// Success outlook for the modules a student has not taken yet.
    FutureModules {
        code: String,
    },
    Interventions(InterventionsCommand),
    Alert(AlertCommand),
    Report(ReportCommand),
    /// Download an Excel export, or list them.
    Export {
        #[arg(value_parser = parse_export, required_unless_present = "list")]
        which: Option<Export>,
        #[arg(long)]
        list: bool,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Ask the support assistant. Without a question, opens a conversation
    /// on stdin.
    Assistant {
        question: Vec<String>,
        /// Show the assistant's model and availability instead.
        #[arg(long, conflicts_with = "question")]
        status: bool,
    },
    /// Staff accounts (admin).
    Users,
    /// Create a staff account (admin).
    Register(RegisterArgs),
}

#[derive(Args, Debug)]
struct StudentsArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = resources::DEFAULT_PER_PAGE)]
    per_page: u32,
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long, default_value = "")]
    track: String,
    #[arg(long, default_value = "")]
    profile: String,
}

#[derive(Args, Debug)]
struct InterventionsCommand {
    #[command(subcommand)]
    command: InterventionsSubcommand,
}

#[derive(Subcommand, Debug)]
enum InterventionsSubcommand {
    List {
        #[arg(long)]
        student: Option<String>,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Show {
        id: i64,
    },
    /// History for one student.
    Student {
        id: String,
    },
    Create {
        #[arg(long)]
        student: String,
        #[arg(long, default_value = "")]
        student_name: String,
        #[arg(long, default_value = "")]
        kind: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        priority: String,
    },
    Update {
        id: i64,
        #[arg(long, value_parser = PossibleValuesParser::new(STATUSES))]
        status: Option<String>,
        #[arg(long)]
        outcome: Option<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long, value_parser = PossibleValuesParser::new(PRIORITIES))]
        priority: Option<String>,
    },
    /// Admin only.
    Delete {
        id: i64,
    },
    Stats,
}

#[derive(Args, Debug)]
struct AlertCommand {
    #[command(subcommand)]
    command: AlertSubcommand,
}

#[derive(Subcommand, Debug)]
enum AlertSubcommand {
    Student {
        code: String,
        email: String,
    },
    Module {
        module: String,
        /// Comma-separated recipients.
        #[arg(long)]
        emails: String,
    },
    Weekly {
        email: String,
    },
}

#[derive(Args, Debug)]
struct ReportCommand {
    #[command(subcommand)]
    command: ReportSubcommand,
    #[arg(long, global = true, default_value = ".")]
    out: PathBuf,
}

#[derive(Subcommand, Debug)]
enum ReportSubcommand {
    Global,
    Track { track: String },
    Student { code: String },
}

#[derive(Args, Debug)]
struct RegisterArgs {
    username: String,
    #[arg(long, env = "SUPPORTDESK_NEW_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, value_parser = parse_role, default_value = "tuteur")]
    role: Role,
    #[arg(long, default_value = "")]
    last_name: String,
    #[arg(long, default_value = "")]
    first_name: String,
    #[arg(long, default_value = "")]
    email: String,
}

// =============================================================================
// NAVIGATION
// =============================================================================

/// Terminal stand-in for a browser router: a redirect to login is a message.
#[derive(Default)]
struct TerminalNavigator {
    redirected: AtomicBool,
}

impl TerminalNavigator {
    fn redirected(&self) -> bool {
        self.redirected.load(Ordering::Acquire)
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, to: &Route) {
        if *to == Route::Login && !self.redirected.swap(true, Ordering::AcqRel) {
            eprintln!("Session absente ou expirée : reconnectez-vous avec `supportdesk login`.");
        }
    }
}

struct App {
    config: ClientConfig,
    session: Arc<dyn SessionStore>,
    events: SessionEvents,
    navigator: Arc<TerminalNavigator>,
    guard: RouteGuard,
}

impl App {
    fn new(config: ClientConfig) -> Result<Self, CliError> {
        let session: Arc<dyn SessionStore> = file_store(config.resolve_state_dir()?);
        let navigator = Arc::new(TerminalNavigator::default());
        let guard = RouteGuard::new(Arc::clone(&session), navigator.clone());
        Ok(Self { config, session, events: SessionEvents::new(), navigator, guard })
    }

    fn client(&self) -> Result<ApiClient, CliError> {
        Ok(ApiClient::new(self.config.clone(), Arc::clone(&self.session), self.events.clone())?)
    }

    /// Navigate to `route`; the profile comes back only when allowed.
    fn enter(&self, route: &Route) -> Result<Option<User>, CliError> {
        match self.guard.check(route) {
            GuardOutcome::Allowed { user, .. } => Ok(user),
            GuardOutcome::Redirected => Err(CliError::NotSignedIn),
        }
    }

    fn enter_as_admin(&self, route: &Route, what: &'static str) -> Result<(), CliError> {
        let user = self.enter(route)?;
        require_admin(user.as_ref(), what)
    }
}

fn require_admin(user: Option<&User>, what: &'static str) -> Result<(), CliError> {
    match user {
        Some(user) if user.role == Role::Admin => Ok(()),
        _ => Err(CliError::AdminOnly(what)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let app = match build_config(&cli).and_then(App::new) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut invalidations = app.events.subscribe();
    let result = run(&app, cli.command).await;
    drain_invalidations(&mut invalidations, app.navigator.as_ref());

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::NotSignedIn) if app.navigator.redirected() => ExitCode::FAILURE,
        Err(CliError::Api(ApiError::Unauthorized)) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_max_level(level).init();
}

fn build_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config = config.with_base_url(normalize_base_url(url)?);
    }
    if let Some(secs) = cli.timeout_secs.filter(|s| *s > 0) {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(dir) = &cli.state_dir {
        config = config.with_state_dir(dir.clone());
    }
    Ok(config)
}

fn drain_invalidations(rx: &mut broadcast::Receiver<SessionEvent>, navigator: &dyn Navigator) {
    while let Ok(event) = rx.try_recv() {
        redirect_on_invalidation(&event, navigator);
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn run(app: &App, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { username, password } => run_login(app, &username, &password).await,
        Command::Logout => {
            auth::logout(&app.client()?).await;
            println!("Déconnecté.");
            Ok(())
        }
        Command::Whoami { remote } => {
            let user = app.enter(&Route::Dashboard)?;
            if remote {
                print_json(&auth::current_user(&app.client()?).await?)
            } else {
                print_json(&user)
            }
        }
        Command::Health => print_json(&resources::health(&app.client()?).await?),
        Command::Stats => {
            app.enter(&Route::Dashboard)?;
            print_json(&resources::stats(&app.client()?).await?)
        }
        Command::Students(args) => {
            app.enter(&Route::Students)?;
            let query = StudentQuery { per_page: args.per_page.max(1), ..StudentQuery::default() }
                .page(args.page)
                .search(args.search)
                .track(args.track)
                .profile(args.profile);
            print_json(&resources::students(&app.client()?, &query).await?)
        }
        Command::Student { code } => {
            app.enter(&Route::Student(code.clone()))?;
            let client = app.client()?;
            let detail = resources::student(&client, &code).await?;
            let history = interventions::for_student(&client, &code).await?;
            print_json(&serde_json::json!({ "etudiant": detail, "interventions": history.interventions }))
        }
        Command::AtRisk => {
            app.enter(&Route::AtRisk)?;
            print_json(&resources::students_at_risk(&app.client()?).await?)
        }
        Command::Tracks => {
            app.enter(&Route::Students)?;
            print_json(&resources::tracks(&app.client()?).await?)
        }
        Command::Modules => {
            app.enter(&Route::Modules)?;
            print_json(&resources::modules(&app.client()?).await?)
        }
        Command::Module { name } => {
            app.enter(&Route::Modules)?;
            print_json(&resources::module(&app.client()?, &name).await?)
        }
        Command::Predict { track, student, grades } => {
            app.enter(&Route::Predictions)?;
            let request = PredictionRequest { student_code: student, track, modules: grades };
            print_json(&resources::predict(&app.client()?, &request).await?)
        }
        Command::FutureModules { code } => {
            app.enter(&Route::FutureModules)?;
            let code = forms::validate_student_code(&code)?;
            print_json(&resources::future_modules(&app.client()?, &code).await?)
        }
        Command::Interventions(cmd) => run_interventions(app, cmd.command).await,
        Command::Alert(cmd) => run_alert(app, cmd.command).await,
        Command::Report(cmd) => run_report(app, cmd.command, &cmd.out).await,
        Command::Export { which, list, out } => run_export(app, which, list, &out).await,
        Command::Assistant { question, status } => run_assistant(app, &question, status).await,
        Command::Users => {
            app.enter_as_admin(&Route::Dashboard, "listing users")?;
            print_json(&auth::users(&app.client()?).await?)
        }
        Command::Register(args) => {
            app.enter_as_admin(&Route::Dashboard, "creating users")?;
            let credentials = forms::validate_login(&args.username, &args.password)?;
            let user = NewUser {
                username: credentials.username,
                password: credentials.password,
                role: args.role,
                last_name: args.last_name,
                first_name: args.first_name,
                email: args.email,
            };
            print_json(&auth::register(&app.client()?, &user).await?)
        }
    }
}

async fn run_login(app: &App, username: &str, password: &str) -> Result<(), CliError> {
    if let GuardOutcome::Allowed { already_signed_in: true, .. } = app.guard.check(&Route::Login) {
        tracing::info!("replacing existing session");
    }
    let credentials = forms::validate_login(username, password)?;
    let client = app.client()?;
    let user = auth::login(&client, &credentials).await?;
    println!("Connecté : {} ({})", user.display_name(), user.role.label());

    // Proceed to the dashboard with a client bound to the new token.
    if app.enter(&Route::Dashboard)?.is_some() {
        let stats = resources::stats(&client.renewed()?).await?;
        println!("{} étudiants, {} modules, taux d'échec {:.1} %", stats.students, stats.modules, stats.failure_rate);
    }
    Ok(())
}

async fn run_interventions(app: &App, command: InterventionsSubcommand) -> Result<(), CliError> {
    let user = app.enter(&Route::Interventions)?;
    let client = app.client()?;
    match command {
        InterventionsSubcommand::List { student, kind, status, limit } => {
            let filter = InterventionFilter { student_id: student, kind, status, limit };
            print_json(&interventions::list(&client, filter).await?)
        }
        InterventionsSubcommand::Show { id } => print_json(&interventions::get(&client, id).await?),
        InterventionsSubcommand::Student { id } => print_json(&interventions::for_student(&client, &id).await?),
        InterventionsSubcommand::Create { student, student_name, kind, title, description, priority } => {
            let form = InterventionForm { student_id: student, student_name, kind, title, description, priority };
            let payload = form.validate()?;
            print_json(&interventions::create(&client, &payload).await?)
        }
        InterventionsSubcommand::Update { id, status, outcome, note, priority } => {
            let changes = InterventionUpdate { status, outcome, new_note: note, priority };
            print_json(&interventions::update(&client, id, &changes).await?)
        }
        InterventionsSubcommand::Delete { id } => {
            require_admin(user.as_ref(), "deleting interventions")?;
            print_json(&interventions::delete(&client, id).await?)
        }
        InterventionsSubcommand::Stats => print_json(&interventions::stats(&client).await?),
    }
}

async fn run_alert(app: &App, command: AlertSubcommand) -> Result<(), CliError> {
    app.enter(&Route::Alerts)?;
    let client = app.client()?;
    let receipt = match command {
        AlertSubcommand::Student { code, email } => {
            let (code, email) = forms::validate_student_alert(&code, &email)?;
            alerts::student(&client, &code, &email).await?
        }
        AlertSubcommand::Module { module, emails } => {
            let (module, emails) = forms::validate_module_alert(&module, &emails)?;
            alerts::module(&client, &module, &emails).await?
        }
        AlertSubcommand::Weekly { email } => {
            let email = forms::validate_report_recipient(&email)?;
            alerts::weekly_report(&client, &email).await?
        }
    };
    println!("{}", receipt.message);
    if let Some(note) = receipt.note.filter(|n| !n.is_empty()) {
        println!("{note}");
    }
    Ok(())
}

async fn run_report(app: &App, command: ReportSubcommand, out: &std::path::Path) -> Result<(), CliError> {
    app.enter(&Route::Reports)?;
    let report = match command {
        ReportSubcommand::Global => Report::Global,
        ReportSubcommand::Track { track } => Report::Track(track),
        ReportSubcommand::Student { code } => Report::Student(code),
    };
    let file = reports::report(&app.client()?, &report).await?;
    save(&file, out)
}

async fn run_export(app: &App, which: Option<Export>, list: bool, out: &std::path::Path) -> Result<(), CliError> {
    let user = app.enter(&Route::Exports)?;
    let Some(export) = which.filter(|_| !list) else {
        for export in Export::ALL {
            let marker = if export.admin_only() { " (admin)" } else { "" };
            println!("{:<18} {}{marker}", export.id(), export.title());
        }
        return Ok(());
    };
    if export.admin_only() {
        require_admin(user.as_ref(), "the full report export")?;
    }
    let file = reports::export(&app.client()?, export).await?;
    save(&file, out)
}

async fn run_assistant(app: &App, question: &[String], status: bool) -> Result<(), CliError> {
    app.enter(&Route::Assistant)?;
    let client = app.client()?;
    if status {
        return print_json(&assistant::status(&client).await?);
    }
    if !question.is_empty() {
        let message = forms::validate_chat_message(&question.join(" "))?;
        let reply = assistant::send(&client, &message, &[]).await?;
        println!("{}", reply.text);
        return Ok(());
    }

    let (mut conversation, greeting) = Conversation::start(&client).await?;
    println!("{}\n", greeting.message);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Ok(message) = forms::validate_chat_message(&line) else {
            continue;
        };
        match conversation.ask(&client, &message).await {
            Ok(reply) => println!("{}\n", reply.text),
            Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
            Err(err) => eprintln!("{}", err.user_message()),
        }
    }
    tracing::info!(tokens = conversation.tokens_used(), cost = conversation.cost(), "assistant conversation closed");
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

fn save(file: &Download, dir: &std::path::Path) -> Result<(), CliError> {
    let path = file.save_into(dir)?;
    println!("{} ({} octets)", path.display(), file.bytes.len());
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

fn parse_grade(raw: &str) -> Result<GradeInput, String> {
    let (code, note) = raw.split_once('=').ok_or_else(|| format!("expected CODE=NOTE, got `{raw}`"))?;
    let code = code.trim();
    if code.is_empty() {
        return Err(format!("missing module code in `{raw}`"));
    }
    let note: f64 = note.trim().replace(',', ".").parse().map_err(|_| format!("invalid grade in `{raw}`"))?;
    if !(0.0..=20.0).contains(&note) {
        return Err(format!("grade must be between 0 and 20, got {note}"));
    }
    Ok(GradeInput { code: code.to_owned(), note })
}

fn parse_export(raw: &str) -> Result<Export, String> {
    Export::from_id(raw.trim()).ok_or_else(|| {
        let known: Vec<&str> = Export::ALL.iter().map(|e| e.id()).collect();
        format!("unknown export `{raw}`; expected one of: {}", known.join(", "))
    })
}

fn parse_role(raw: &str) -> Result<Role, String> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_owned()))
        .map_err(|_| format!("unknown role `{raw}`; expected admin, enseignant or tuteur"))
}
