use std::io::{self, BufRead, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bluepic_contracts::commands::{parse_command, StudioCommand, STUDIO_HELP_COMMANDS};
use bluepic_contracts::events::SessionEventLog;
use bluepic_contracts::options::{DEFAULT_GUIDANCE, DEFAULT_STEPS};
use bluepic_contracts::presets::PROMPT_IDEAS;
use bluepic_contracts::{
    AspectRatio, EphemeralGallery, GenerationResult, OptionsRequest, SizePreset, StylePreset,
};
use bluepic_engine::{
    BackendKind, GenerateOutcome, ProgressUpdate, Studio, StudioConfig, StudioListener,
};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bluepic", version, about = "Text-to-image studio")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate one image and write it to disk.
    Generate(GenerateArgs),
    /// Interactive prompt loop with presets, gallery and slash commands.
    Studio(StudioArgs),
}

#[derive(Debug, Args)]
struct BackendArgs {
    /// pollinations, json or mock (defaults to BLUEPIC_BACKEND, then pollinations).
    #[arg(long)]
    backend: Option<BackendKind>,
    /// JSON backend endpoint; selects the json backend unless --backend is given.
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    pollinations_api: Option<String>,
    /// Append session events to this JSONL file.
    #[arg(long)]
    events: Option<PathBuf>,
    /// Skip the cosmetic progress delays.
    #[arg(long)]
    no_pacing: bool,
}

#[derive(Debug, Clone, Args)]
struct ImageArgs {
    #[arg(long)]
    style: Option<StylePreset>,
    #[arg(long, default_value_t = SizePreset::Medium)]
    size: SizePreset,
    #[arg(long)]
    aspect: Option<AspectRatio>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = DEFAULT_GUIDANCE)]
    guidance: f64,
    #[arg(long, default_value_t = DEFAULT_STEPS)]
    steps: u32,
    #[arg(long, default_value = "")]
    negative: String,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    prompt: String,
    /// Output file; defaults to a timestamped bluepic_*.png in the working directory.
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    image: ImageArgs,
    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Debug, Parser)]
struct StudioArgs {
    #[command(flatten)]
    image: ImageArgs,
    #[command(flatten)]
    backend: BackendArgs,
}

impl BackendArgs {
    fn config(&self) -> Result<StudioConfig> {
        let mut config = StudioConfig::from_env()?;
        if let Some(endpoint) = &self.endpoint {
            config = config
                .with_api_endpoint(endpoint.clone())
                .with_backend(BackendKind::Json);
        }
        if let Some(base) = &self.pollinations_api {
            config = config.with_pollinations_api(base.clone());
        }
        if let Some(backend) = self.backend {
            config = config.with_backend(backend);
        }
        if self.no_pacing {
            config = config.without_pacing();
        }
        debug!(backend = %config.backend, gallery_max = config.gallery_max, "config loaded");
        Ok(config)
    }

    fn studio(&self, config: &StudioConfig, listener: Arc<dyn StudioListener>) -> Result<Studio> {
        let studio = Studio::new(config, listener)?;
        Ok(match &self.events {
            Some(path) => studio.with_events(SessionEventLog::with_random_id(path)),
            None => studio,
        })
    }
}

impl ImageArgs {
    fn request(&self) -> OptionsRequest {
        OptionsRequest {
            size: self.size,
            aspect: self.aspect,
            seed: self.seed,
            guidance: self.guidance,
            steps: self.steps,
            negative_prompt: self.negative.clone(),
        }
    }
}

/// Prints progress and errors to stderr; results go to stdout.
struct ConsoleListener;

impl StudioListener for ConsoleListener {
    fn on_progress(&self, update: &ProgressUpdate) {
        eprintln!("[{:>3.0}%] {}", update.percent, update.stage);
    }

    fn on_result(&self, result: &GenerationResult) {
        println!("{}", result.metadata.summary_line());
    }

    fn on_error(&self, message: &str) {
        eprintln!("Error: {message}");
    }
}

fn main() {
    init_logging();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("bluepic error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("BLUEPIC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Studio(args) => {
            run_studio(args)?;
            Ok(0)
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let config = args.backend.config()?;
    let studio = args.backend.studio(&config, Arc::new(ConsoleListener))?;
    eprintln!("{}", config.status_line());

    match studio.generate(&args.prompt, args.image.style, &args.image.request()) {
        GenerateOutcome::Completed(_) => {
            let path = studio.save_current(args.out.as_deref())?;
            println!("Saved {}", path.display());
            Ok(0)
        }
        // the listener already printed the message
        GenerateOutcome::Failed(_) => Ok(1),
        GenerateOutcome::Busy | GenerateOutcome::NothingToRegenerate => Ok(1),
    }
}

/// Settings the studio prompt carries between lines.
#[derive(Debug, Clone)]
struct StudioSession {
    style: Option<StylePreset>,
    request: OptionsRequest,
    next_idea: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

impl StudioSession {
    fn new(image: &ImageArgs) -> Self {
        Self {
            style: image.style,
            request: image.request(),
            next_idea: 0,
        }
    }

    fn settings_line(&self) -> String {
        let request = &self.request;
        format!(
            "style={} size={} aspect={} seed={} guidance={} steps={} negative={:?}",
            self.style.map(|style| style.name()).unwrap_or("none"),
            request.size,
            request.aspect.map(|aspect| aspect.name()).unwrap_or("auto"),
            request
                .seed
                .map(|seed| seed.to_string())
                .unwrap_or_else(|| "random".to_string()),
            request.guidance,
            request.steps,
            request.negative_prompt
        )
    }

    fn handle(&mut self, studio: &Studio, config: &StudioConfig, command: StudioCommand) -> Flow {
        match command {
            StudioCommand::Noop => {}
            StudioCommand::Generate { prompt } => {
                studio.generate(&prompt, self.style, &self.request);
            }
            StudioCommand::SetStyle(style) => {
                self.style = style;
                println!("Style: {}", style.map(|style| style.name()).unwrap_or("none"));
            }
            StudioCommand::SetSize(size) => {
                self.request.size = size;
                println!("Size: {size}");
            }
            StudioCommand::SetAspect(aspect) => {
                self.request.aspect = aspect;
                println!(
                    "Aspect ratio: {}",
                    aspect.map(|aspect| aspect.name()).unwrap_or("auto")
                );
            }
            StudioCommand::SetSeed(seed) => {
                self.request.seed = seed;
                match seed {
                    Some(seed) => println!("Seed: {seed}"),
                    None => println!("Seed: random"),
                }
            }
            StudioCommand::SetGuidance(guidance) => {
                self.request.guidance = guidance;
                println!("Guidance: {guidance}");
            }
            StudioCommand::SetSteps(steps) => {
                self.request.steps = steps;
                println!("Steps: {steps}");
            }
            StudioCommand::SetNegative(text) => {
                self.request.negative_prompt = text;
                if self.request.negative_prompt.is_empty() {
                    println!("Negative prompt cleared");
                } else {
                    println!("Negative prompt: {}", self.request.negative_prompt);
                }
            }
            StudioCommand::Regenerate => match studio.regenerate() {
                GenerateOutcome::NothingToRegenerate => println!("Nothing to regenerate yet"),
                GenerateOutcome::Completed(result) => {
                    // a pinned seed follows the variation so /retry reproduces it
                    if self.request.seed.is_some() {
                        self.request.seed = result.metadata.seed;
                    }
                }
                _ => {}
            },
            StudioCommand::Retry => {
                if studio.retry() == GenerateOutcome::NothingToRegenerate {
                    println!("Nothing to retry yet");
                }
            }
            StudioCommand::Gallery => print_gallery(&studio.gallery()),
            StudioCommand::Show(index) => {
                if studio.select_gallery(index).is_none() {
                    println!("Gallery has no entry {}", index + 1);
                }
            }
            StudioCommand::Save(path) => {
                match studio.save_current(path.as_deref().map(Path::new)) {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(err) => println!("Save failed: {err:#}"),
                }
            }
            StudioCommand::NewPrompt => {
                self.style = None;
                println!("Style cleared. Enter a new prompt.");
            }
            StudioCommand::Idea(index) => {
                let index = index.unwrap_or(self.next_idea % PROMPT_IDEAS.len());
                match PROMPT_IDEAS.get(index) {
                    Some(idea) => {
                        self.next_idea = index + 1;
                        println!("Idea: {idea}");
                    }
                    None => println!("Ideas are numbered 1 to {}", PROMPT_IDEAS.len()),
                }
            }
            StudioCommand::Status => {
                println!("{}", config.status_line());
                println!("{}", self.settings_line());
            }
            StudioCommand::Help => println!("Commands: {}", STUDIO_HELP_COMMANDS.join(" ")),
            StudioCommand::Quit => return Flow::Quit,
            StudioCommand::Invalid { reason, .. } => println!("{reason}"),
            StudioCommand::Unknown { command, .. } => {
                println!("Unknown command /{command}. Type /help for commands.")
            }
        }
        Flow::Continue
    }
}

fn print_gallery(gallery: &EphemeralGallery) {
    if gallery.is_empty() {
        println!("Gallery is empty");
        return;
    }
    for (idx, entry) in gallery.iter().enumerate() {
        println!(
            "{:>2}. {}  ({})",
            idx + 1,
            entry.prompt,
            entry.metadata.summary_line()
        );
    }
}

fn run_studio(args: StudioArgs) -> Result<()> {
    let config = args.backend.config()?;
    let studio = args.backend.studio(&config, Arc::new(ConsoleListener))?;
    let mut session = StudioSession::new(&args.image);

    println!("{}", config.status_line());
    println!("Bluepic studio started. Type a prompt, or /help for commands.");

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush().context("stdout flush failed")?;

        line.clear();
        let read = match input.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let command = parse_command(line.trim_end_matches(['\n', '\r']));
        if session.handle(&studio, &config, command) == Flow::Quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bluepic_engine::NoopListener;

    use super::*;

    fn image_args() -> ImageArgs {
        ImageArgs {
            style: None,
            size: SizePreset::Small,
            aspect: None,
            seed: Some(10),
            guidance: DEFAULT_GUIDANCE,
            steps: DEFAULT_STEPS,
            negative: String::new(),
        }
    }

    fn mock_studio() -> Result<(Studio, StudioConfig)> {
        let config = StudioConfig::default()
            .with_backend(BackendKind::Mock)
            .without_pacing();
        let studio = Studio::new(&config, Arc::new(NoopListener))?;
        Ok((studio, config))
    }

    #[test]
    fn cli_parses_generate_flags() -> Result<()> {
        let cli = Cli::try_parse_from([
            "bluepic",
            "generate",
            "--prompt",
            "a cat",
            "--style",
            "anime",
            "--aspect",
            "16:9",
            "--seed",
            "42",
            "--backend",
            "mock",
        ])?;
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.image.style, Some(StylePreset::Anime));
        assert_eq!(args.image.size, SizePreset::Medium);
        assert_eq!(args.image.request().resolve().width, 1024);
        assert_eq!(args.image.request().resolve().height, 576);
        assert_eq!(args.backend.backend, Some(BackendKind::Mock));
        Ok(())
    }

    #[test]
    fn endpoint_flag_selects_json_backend() -> Result<()> {
        let cli = Cli::try_parse_from([
            "bluepic",
            "studio",
            "--endpoint",
            "http://localhost:9000/gen",
        ])?;
        let Command::Studio(args) = cli.command else {
            panic!("expected studio");
        };
        let config = args.backend.config()?;
        assert_eq!(config.backend, BackendKind::Json);
        assert_eq!(config.api_endpoint, "http://localhost:9000/gen");
        Ok(())
    }

    #[test]
    fn unknown_preset_flag_is_rejected() {
        let result = Cli::try_parse_from(["bluepic", "generate", "--prompt", "x", "--size", "huge"]);
        assert!(result.is_err());
    }

    #[test]
    fn session_commands_update_settings() -> Result<()> {
        let (studio, config) = mock_studio()?;
        let mut session = StudioSession::new(&image_args());

        for line in ["/style watercolor", "/aspect 3:2", "/steps 12", "/negative blurry"] {
            assert_eq!(session.handle(&studio, &config, parse_command(line)), Flow::Continue);
        }
        assert_eq!(session.style, Some(StylePreset::Watercolor));
        assert_eq!(session.request.aspect, Some(AspectRatio::Classic));
        assert_eq!(session.request.steps, 12);
        assert_eq!(session.request.negative_prompt, "blurry");

        session.handle(&studio, &config, parse_command("/new"));
        assert_eq!(session.style, None);
        assert_eq!(session.handle(&studio, &config, parse_command("/quit")), Flow::Quit);
        Ok(())
    }

    #[test]
    fn session_generates_saves_and_regenerates() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let (studio, config) = mock_studio()?;
        let mut session = StudioSession::new(&image_args());

        session.handle(&studio, &config, parse_command("a lighthouse at dusk"));
        let current = studio.current().context("no image generated")?;
        assert_eq!(current.metadata.seed, Some(10));
        assert_eq!((current.metadata.width, current.metadata.height), (512, 512));

        let out = temp.path().join("out.png");
        let save = format!("/save \"{}\"", out.display());
        session.handle(&studio, &config, parse_command(&save));
        assert!(out.exists());

        session.handle(&studio, &config, parse_command("/regen"));
        assert_eq!(studio.gallery().len(), 2);
        assert_eq!(session.request.seed, studio.current().and_then(|r| r.metadata.seed));

        session.handle(&studio, &config, parse_command("/show 2"));
        assert_eq!(studio.current().and_then(|r| r.metadata.seed), Some(10));
        Ok(())
    }

    #[test]
    fn ideas_cycle_in_order() -> Result<()> {
        let (studio, config) = mock_studio()?;
        let mut session = StudioSession::new(&image_args());
        session.handle(&studio, &config, parse_command("/idea"));
        assert_eq!(session.next_idea, 1);
        session.handle(&studio, &config, parse_command("/idea 4"));
        assert_eq!(session.next_idea, 4);
        session.handle(&studio, &config, parse_command("/idea 99"));
        assert_eq!(session.next_idea, 4);
        Ok(())
    }
}
