use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use uml_agent::credential::{CredentialGate, StoredCredential};
use uml_agent::generation::{GenerationError, HttpDiagramService};
use uml_agent::identity::Identity;
use uml_agent::render::{ImageFormat, MermaidInkRenderer, RenderFailure, RenderManager, SlotState};
use uml_agent::session::{Phase, SessionController, SessionError};
use uml_agent::store::{FileStore, LocalStore, MemoryStore, StoreError};
use uml_agent::telemetry::{HttpSink, TelemetryEmitter, TelemetryError, TelemetrySink, TracingSink, ZoomInput};
use uml_agent::trajectory::{self, TrajectoryError};
use uml_agent::ClientConfig;

const TELEMETRY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state store: {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Generation(#[from] GenerationError),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("renderer: {0}")]
    Render(#[from] RenderFailure),
    #[error("trajectory export: {0}")]
    Trajectory(#[from] TrajectoryError),
    #[error("expected a variation number starting at 1, got '{0}'")]
    BadIndex(String),
}

#[derive(Parser, Debug)]
#[command(name = "uml-agent", about = "Prompt-driven Mermaid diagrams with interaction telemetry")]
struct Cli {
    /// Overrides `UML_AGENT_API_URL`.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Keep identity and API key in memory only.
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session: plain lines are prompts, `:help` lists commands.
    Repl,
    /// Generate once and print the result.
    Generate {
        prompt: String,
        #[arg(long, short = 'n')]
        variations: Option<u32>,
    },
    Key(KeyCommand),
    /// Convert recorded actions into scored trajectories.
    Trajectories {
        #[arg(long, default_value = "rl_actions.json")]
        input: PathBuf,
        #[arg(long, default_value = "art_trajectories.json")]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct KeyCommand {
    #[command(subcommand)]
    command: KeySubcommand,
}

#[derive(Subcommand, Debug)]
enum KeySubcommand {
    Set { value: String },
    Clear,
    Status,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_owned();
    }

    let store: Arc<dyn LocalStore> = if cli.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::open(&config.state_dir))
    };

    if let Err(e) = run(&config, store, cli.command).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(config: &ClientConfig, store: Arc<dyn LocalStore>, command: Command) -> Result<(), CliError> {
    match command {
        Command::Repl => run_repl(config, store).await,
        Command::Generate { prompt, variations } => run_generate(config, store, &prompt, variations).await,
        Command::Key(key) => run_key(store, key),
        Command::Trajectories { input, output } => run_trajectories(&input, &output),
    }
}

// =============================================================================
// WIRING
// =============================================================================

fn build_controller(
    config: &ClientConfig,
    store: Arc<dyn LocalStore>,
    num_variations: u32,
) -> Result<SessionController, CliError> {
    let sink: Arc<dyn TelemetrySink> = if config.telemetry_enabled {
        Arc::new(HttpSink::new(&config.telemetry_url, TELEMETRY_TIMEOUT)?)
    } else {
        Arc::new(TracingSink)
    };
    wire_controller(config, store, sink, num_variations)
}

fn wire_controller(
    config: &ClientConfig,
    store: Arc<dyn LocalStore>,
    sink: Arc<dyn TelemetrySink>,
    num_variations: u32,
) -> Result<SessionController, CliError> {
    let identity = Identity::load_or_create(store.as_ref());
    let gate: Arc<dyn CredentialGate> = Arc::new(StoredCredential::new(store));
    let telemetry = TelemetryEmitter::spawn(identity, sink, config.telemetry);

    let service = HttpDiagramService::new(&config.api_url, config.request_timeout, config.connect_timeout)?;
    let renderer = MermaidInkRenderer::new(&config.ink_url, ImageFormat::Svg, config.render.render_timeout)?;
    let renders = RenderManager::new(Arc::new(renderer), config.render);

    Ok(SessionController::new(gate, Arc::new(service), telemetry, renders, num_variations))
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn run_generate(
    config: &ClientConfig,
    store: Arc<dyn LocalStore>,
    prompt: &str,
    variations: Option<u32>,
) -> Result<(), CliError> {
    let mut controller = build_controller(config, store, variations.unwrap_or(config.num_variations))?;
    let outcome = controller.submit(prompt).await;
    controller.telemetry().flush().await;
    outcome?;
    print_session(&controller);
    Ok(())
}

fn run_key(store: Arc<dyn LocalStore>, key: KeyCommand) -> Result<(), CliError> {
    let credential = StoredCredential::new(store);
    match key.command {
        KeySubcommand::Set { value } => {
            if credential.set(&value)?.is_present() {
                println!("API key saved");
            } else {
                println!("API key is blank; nothing saved");
            }
        }
        KeySubcommand::Clear => {
            credential.clear()?;
            println!("API key cleared");
        }
        KeySubcommand::Status => {
            let state = if credential.check().is_present() { "present" } else { "absent" };
            println!("API key {state}");
        }
    }
    Ok(())
}

fn run_trajectories(input: &Path, output: &Path) -> Result<(), CliError> {
    let records = trajectory::load_records(input)?;
    let trajectories = trajectory::build_trajectories(&records);
    trajectory::write_trajectories(output, &trajectories)?;
    println!(
        "converted {} actions into {} trajectories -> {}",
        records.len(),
        trajectories.len(),
        output.display()
    );
    Ok(())
}

// =============================================================================
// REPL
// =============================================================================

const HELP: &str = "\
prompt text        generate, or edit the current diagram
:draft <text>      revise the prompt without submitting
:new               start a new diagram
:import <file>     load Mermaid source from a file
:hover <n>         look at variation n
:select <n>        select variation n
:confirm           commit the selected variation
:copy              print the source for copying
:copy-image [file] render and save the preview (default diagram.svg)
:zoom | :wheel     zoom with a button | with the wheel
:pan               pan the preview
:rate <1-5> [text] rate the current diagram
:render <dir>      render the preview or all variations into <dir>
:show              show the session
:quit              leave";

async fn run_repl(config: &ClientConfig, store: Arc<dyn LocalStore>) -> Result<(), CliError> {
    let mut controller = build_controller(config, store, config.num_variations)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("uml-agent ready. Type a prompt, or :help.");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == ":quit" || line == ":q" {
            break;
        }
        if let Err(e) = handle_line(&mut controller, line).await {
            println!("! {e}");
        }
    }

    controller.tab_away();
    controller.telemetry().flush().await;
    Ok(())
}

async fn handle_line(controller: &mut SessionController, line: &str) -> Result<(), CliError> {
    let Some(command) = line.strip_prefix(':') else {
        let phase = controller.submit(line).await?;
        print_session(controller);
        if phase == Phase::VariationPending {
            println!("(:hover / :select <n>, then :confirm)");
        }
        return Ok(());
    };

    let (name, arg) = command.split_once(' ').map_or((command, ""), |(n, a)| (n, a.trim()));
    match name {
        "help" => println!("{HELP}"),
        "draft" => controller.prompt_changed(arg),
        "new" => {
            controller.new_diagram()?;
            println!("new diagram {}", controller.session().diagram_id());
        }
        "import" => {
            let source = tokio::fs::read_to_string(arg).await?;
            controller.import(&source)?;
            print_session(controller);
        }
        "hover" => controller.hover_variation(parse_index(arg)?)?,
        "select" => {
            controller.select_variation(parse_index(arg)?)?;
            print_session(controller);
        }
        "confirm" => {
            controller.confirm_selection()?;
            print_session(controller);
        }
        "copy" => match controller.copy_source() {
            Some(source) => println!("{source}"),
            None => println!("nothing to copy"),
        },
        "copy-image" => {
            let path = if arg.is_empty() { "diagram.svg" } else { arg };
            match controller.copy_image().await {
                Some(SlotState::Rendered(image)) => {
                    tokio::fs::write(path, &image.bytes).await?;
                    println!("image saved to {path}");
                }
                Some(SlotState::Failed { label, reason }) => println!("{label}: {reason}"),
                None => println!("nothing to render"),
            }
        }
        "zoom" => controller.zoom(ZoomInput::Button),
        "wheel" => controller.zoom(ZoomInput::Wheel),
        "pan" => controller.pan(),
        "rate" => {
            let (rating, text) = arg.split_once(' ').unwrap_or((arg, ""));
            controller.rate(rating.parse().ok(), text)?;
            println!("thanks");
        }
        "render" => render_to_dir(controller, Path::new(if arg.is_empty() { "." } else { arg })).await?,
        "show" => print_session(controller),
        other => println!("unknown command :{other} (try :help)"),
    }
    Ok(())
}

fn parse_index(arg: &str) -> Result<usize, CliError> {
    // Variations are numbered from 1 for people.
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(CliError::BadIndex(arg.to_owned())),
    }
}

async fn render_to_dir(controller: &SessionController, dir: &Path) -> Result<(), CliError> {
    tokio::fs::create_dir_all(dir).await?;
    let slots = if controller.session().variations().is_empty() {
        controller.render_preview().await.into_iter().map(|s| ("preview".to_owned(), s)).collect::<Vec<_>>()
    } else {
        controller
            .render_variations()
            .await
            .into_iter()
            .enumerate()
            .map(|(i, s)| (format!("variation-{}", i + 1), s))
            .collect()
    };
    if slots.is_empty() {
        println!("nothing to render");
    }
    for (name, slot) in slots {
        match slot {
            SlotState::Rendered(image) => {
                let path = dir.join(format!("{name}.{}", ImageFormat::Svg.extension()));
                tokio::fs::write(&path, &image.bytes).await?;
                println!("{name}: {}", path.display());
            }
            SlotState::Failed { label, reason } => println!("{name}: {label} failed ({reason})"),
        }
    }
    Ok(())
}

fn print_session(controller: &SessionController) {
    let session = controller.session();
    println!("[{}] diagram {} rev {}", session.phase(), session.diagram_id(), session.revision());
    if let Some(error) = session.error_message() {
        println!("! {error}");
    }
    let variations = session.variations();
    if variations.is_empty() {
        if session.has_diagram() {
            println!("{}", session.source());
        }
        return;
    }
    for (i, variation) in variations.iter().enumerate() {
        let marker = if session.selected_index() == Some(i) { "*" } else { " " };
        println!("{marker} variation {}:\n{variation}\n", i + 1);
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
