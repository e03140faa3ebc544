//! markview-pdf - Markdown previewer with paginated PDF export
//!
//! CLI entry point

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use markview_pdf::{
    exit_codes,
    // CLI
    Cli, Commands, CopyArgs, ExportArgs, InputArgs, RenderArgs, ThemeAction, ThemeArgs,
    // Config
    CliOverrides, Config,
    // Clipboard
    copy_code, ClipboardBackend, ClipboardError, CommandClipboard, CopyStatus, Unavailable,
    // Render & interaction
    DirectionMode, PreviewSession, RenderOptions,
    // Export
    ExportButton, ExportError, ExportOutcome, PdfExporter,
    // Progress
    ExportStage, OutputMode, ProgressCallback,
    // Theme
    KeyValueStore, Theme, ThemeStore,
};
use markview_pdf::clipboard::KNOWN_COMMANDS;
use markview_pdf::export::{classify_children, export_surface, BlockKind};
use markview_pdf::theme::THEME_KEY;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let mode = if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::from_verbosity(cli.verbose)
    };

    let result = match cli.command {
        Commands::Render(args) => run_render(&args),
        Commands::Export(args) => run_export(&args, mode),
        Commands::Detect(args) => run_detect(&args),
        Commands::Theme(args) => run_theme(&args),
        Commands::Copy(args) => run_copy(&args),
        Commands::Info => run_info(),
    };

    std::process::exit(match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    });
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("markview_pdf={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    if let Some(e) = error.downcast_ref::<ExportError>() {
        return match e {
            ExportError::NoContent => exit_codes::NO_CONTENT,
            _ => exit_codes::EXPORT_ERROR,
        };
    }
    if error.downcast_ref::<ClipboardError>().is_some() {
        return exit_codes::CLIPBOARD_ERROR;
    }
    exit_codes::GENERAL_ERROR
}

// ============ Progress Callback Implementation ============

/// Stage lines plus a per-block progress bar
struct CliProgress {
    mode: OutputMode,
    bar: ProgressBar,
}

impl CliProgress {
    fn new(mode: OutputMode) -> Self {
        let bar = if mode.should_show(OutputMode::Normal) {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) =
            ProgressStyle::default_bar().template("  [{bar:40.cyan/blue}] {pos}/{len} blocks")
        {
            bar.set_style(style.progress_chars("█▓░"));
        }
        Self { mode, bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for CliProgress {
    fn on_step_start(&self, stage: ExportStage) {
        if self.mode.should_show(OutputMode::Verbose) {
            self.bar.println(format!("{}", stage));
        }
    }

    fn on_step_progress(&self, current: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(current as u64);
    }

    fn on_step_complete(&self, stage: ExportStage, message: &str) {
        if self.mode.should_show(OutputMode::Verbose) {
            self.bar.println(format!("  {}: {}", stage.name(), message));
        }
    }

    fn on_debug(&self, message: &str) {
        if self.mode.should_show(OutputMode::VeryVerbose) {
            self.bar.println(format!("  [DEBUG] {}", message));
        }
    }
}

// ============ Shared Helpers ============

fn read_input(args: &InputArgs) -> anyhow::Result<String> {
    match args.path() {
        Some(path) => {
            if !path.exists() {
                eprintln!("Error: Input file does not exist: {}", path.display());
                std::process::exit(exit_codes::INPUT_NOT_FOUND);
            }
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).context("reading stdin")?;
            Ok(text)
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    Ok(match path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    })
}

/// Theme from `--theme`, else the saved preference, else the config file
fn resolve_theme(arg: Option<&str>) -> anyhow::Result<Option<Theme>> {
    if let Some(id) = arg {
        return Ok(Some(Theme::parse_strict(id)?));
    }
    let saved = KeyValueStore::open_default()
        .ok()
        .and_then(|store| store.get(THEME_KEY).and_then(Theme::from_id));
    Ok(saved)
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")
}

fn diagram_index(diagram_id: &str) -> Option<usize> {
    diagram_id.rsplit_once('-')?.1.parse().ok()
}

// ============ Render Command ============

fn run_render(args: &RenderArgs) -> anyhow::Result<()> {
    let markdown = read_input(&args.input)?;
    let config = load_config(args.config.as_deref())?;
    let overrides = CliOverrides {
        direction: args.direction,
        theme: resolve_theme(args.theme.as_deref())?,
        ..CliOverrides::new()
    };
    let mut options = config.merge_with_cli(&overrides).render;
    if args.no_copy_buttons {
        options.copy_buttons = false;
    }

    let output = runtime()?.block_on(async {
        let mut session = PreviewSession::with_defaults(options);
        session.render(&markdown).await
    });
    tracing::info!(indicator = %output.indicator, diagrams = output.diagram_count, "rendered");

    let html = output.to_html();
    match &args.output {
        Some(path) => {
            std::fs::write(path, html).with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", html),
    }
    Ok(())
}

// ============ Export Command ============

fn run_export(args: &ExportArgs, mode: OutputMode) -> anyhow::Result<()> {
    let markdown = read_input(&args.input)?;
    let config = load_config(args.config.as_deref())?;
    let mut overrides = args.overrides();
    overrides.theme = resolve_theme(args.theme.as_deref())?;
    let merged = config.merge_with_cli(&overrides);

    let outcome = runtime()?.block_on(async {
        let mut session = PreviewSession::with_defaults(merged.render);
        session.render(&markdown).await;
        drive_gestures(&mut session, args).await;
        let output = session.output().context("no rendered output")?;

        let exporter = PdfExporter::new(merged.export);
        let progress = CliProgress::new(mode);
        let result = exporter
            .export(&output, &ExportButton::default(), &progress)
            .await;
        progress.finish();
        anyhow::Ok(result?)
    })?;

    match outcome {
        ExportOutcome::Exported(report) => {
            if mode.should_show(OutputMode::Normal) {
                println!(
                    "Exported {} ({} pages, {} blocks, {} fallbacks, {} bytes)",
                    report.path.display(),
                    report.pages,
                    report.blocks,
                    report.fallbacks,
                    report.bytes
                );
            }
        }
        ExportOutcome::Ignored => println!("Export already in progress"),
    }
    Ok(())
}

/// Apply `--gesture` bindings, then play each `--hold` for its duration
async fn drive_gestures(session: &mut PreviewSession, args: &ExportArgs) {
    let known = session
        .output()
        .map(|output| output.diagram_ids())
        .unwrap_or_default();

    for binding in &args.gestures {
        if !known.contains(&binding.diagram_id) {
            tracing::warn!(diagram = %binding.diagram_id, "no such diagram");
            continue;
        }
        let state = session.gesture(&binding.diagram_id, binding.gesture);
        tracing::debug!(diagram = %binding.diagram_id, gesture = %binding.gesture, ?state, "applied gesture");
    }

    for (position, hold) in args.holds.iter().enumerate() {
        let id = &hold.binding.diagram_id;
        if !known.contains(id) {
            tracing::warn!(diagram = %id, "no such diagram");
            continue;
        }
        let index = diagram_index(id).unwrap_or(position);
        session.press(id, index, hold.binding.gesture);
        tokio::time::sleep(hold.duration).await;
        session.release(index, hold.binding.gesture);
        tracing::debug!(diagram = %id, state = ?session.transform(id), "released hold");
    }
}

// ============ Detect Command ============

fn run_detect(args: &InputArgs) -> anyhow::Result<()> {
    let text = read_input(args)?;
    let report = DirectionMode::Auto.resolve(&text);
    println!("Direction: {}", report.direction);
    println!("Language:  {}", markview_pdf::detect_language(&text));
    println!("{}", report.indicator);
    Ok(())
}

// ============ Theme Command ============

fn run_theme(args: &ThemeArgs) -> anyhow::Result<()> {
    let store = KeyValueStore::open_default()?;
    let mut themes = ThemeStore::new(store);

    match &args.action {
        ThemeAction::Get { dark } => {
            let theme = themes.current(*dark);
            println!("{} ({})", theme.id(), theme.label());
        }
        ThemeAction::Set { name } => {
            if Theme::from_id(name).is_none() {
                match Theme::suggest(name) {
                    Some(hint) => eprintln!("Warning: unknown theme '{}' (did you mean '{}'?)", name, hint),
                    None => eprintln!("Warning: unknown theme '{}'", name),
                }
            }
            let theme = themes.set(name)?;
            println!("Theme set to {}", theme.label());
        }
        ThemeAction::List => {
            let current = themes.current(false);
            for theme in Theme::ALL {
                let marker = if theme == current { "*" } else { " " };
                println!("{} {:<10} {}", marker, theme.id(), theme.label());
            }
        }
    }
    Ok(())
}

// ============ Copy Command ============

fn run_copy(args: &CopyArgs) -> anyhow::Result<()> {
    let markdown = read_input(&args.input)?;
    let output = runtime()?.block_on(async {
        let mut session = PreviewSession::with_defaults(RenderOptions::default());
        session.render(&markdown).await
    });

    let surface = export_surface(&output.root);
    let code = classify_children(&surface)
        .into_iter()
        .filter_map(|block| match block.kind {
            BlockKind::Code { text, .. } => Some(text),
            _ => None,
        })
        .nth(args.block)
        .with_context(|| format!("no code block at index {}", args.block))?;

    let backends = CommandClipboard::detect_all();
    let primary: &dyn ClipboardBackend = match backends.first() {
        Some(backend) => backend,
        None => &Unavailable,
    };
    let fallback: &dyn ClipboardBackend = match backends.get(1) {
        Some(backend) => backend,
        None => &Unavailable,
    };

    match copy_code(&code, primary, fallback) {
        CopyStatus::Copied => {
            println!("Copied {} lines", code.lines().count());
            Ok(())
        }
        CopyStatus::Failed => Err(ClipboardError::NoBackend.into()),
    }
}

// ============ Info Command ============

fn run_info() -> anyhow::Result<()> {
    println!("markview-pdf v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("System Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);

    println!();
    println!("Clipboard Tools:");
    for (cmd, _) in KNOWN_COMMANDS {
        check_tool(cmd, cmd);
    }

    println!();
    println!("Fonts:");
    let mut fonts = usvg::fontdb::Database::new();
    fonts.load_system_fonts();
    println!("  System fonts: {}", fonts.len());

    println!();
    println!("Theme:");
    match KeyValueStore::default_path() {
        Some(path) => println!("  Preferences: {}", path.display()),
        None => println!("  Preferences: unavailable"),
    }

    println!();
    println!("Config File Locations:");
    for path in Config::search_paths() {
        let found = if path.is_file() { " (found)" } else { "" };
        println!("  {}{}", path.display(), found);
    }

    Ok(())
}

fn check_tool(cmd: &str, name: &str) {
    match which::which(cmd) {
        Ok(path) => println!("  {}: {} (found)", name, path.display()),
        Err(_) => println!("  {}: Not found", name),
    }
}
