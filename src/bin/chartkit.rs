use std::{
    fs::File,
    io::{BufReader, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "chartkit", version)]
struct Cli {
    /// Log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a template against a data file.
    Render(RenderArgs),
    /// Print the structural changes between two data files.
    Diff(DiffArgs),
    /// Check a data file against a template's declared variables.
    Validate(ValidateArgs),
    /// List the built-in themes, or print one theme's variables.
    Themes(ThemesArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Template config JSON (`body`, `partials`, `variables`, `category`).
    #[arg(long)]
    template: PathBuf,

    /// Data JSON.
    #[arg(long)]
    data: PathBuf,

    /// Registered theme id (defaults to the active theme).
    #[arg(long, conflicts_with = "theme_file")]
    theme: Option<String>,

    /// Theme JSON to use instead of a registered one.
    #[arg(long)]
    theme_file: Option<PathBuf>,

    /// Pipeline options JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Follow-up data files rendered in order after `--data`, patching the previous output.
    #[arg(long)]
    update: Vec<PathBuf>,

    /// Render the final data this many extra times (served from the cache).
    #[arg(long, default_value_t = 0)]
    repeat: usize,

    /// Override the document width.
    #[arg(long)]
    width: Option<u32>,

    /// Override the document height.
    #[arg(long)]
    height: Option<u32>,

    /// Always render in full.
    #[arg(long, default_value_t = false)]
    no_incremental: bool,

    /// Output path for the final markup (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print per-render metadata and final stats as JSON lines on stderr.
    #[arg(long, default_value_t = false)]
    metadata: bool,
}

#[derive(Parser, Debug)]
struct DiffArgs {
    /// Previous data JSON.
    #[arg(long)]
    old: PathBuf,

    /// New data JSON.
    #[arg(long)]
    new: PathBuf,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Template config JSON.
    #[arg(long)]
    template: PathBuf,

    /// Data JSON.
    #[arg(long)]
    data: PathBuf,
}

#[derive(Parser, Debug)]
struct ThemesArgs {
    /// Print the flattened variables of this theme.
    #[arg(long)]
    show: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Diff(args) => cmd_diff(args),
        Command::Validate(args) => cmd_validate(args),
        Command::Themes(args) => cmd_themes(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let f = File::open(path).with_context(|| format!("open data '{}'", path.display()))?;
    let v = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse data JSON '{}'", path.display()))?;
    Ok(v)
}

fn template_id(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("template")
        .to_owned()
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let opts = match &args.config {
        Some(path) => chartkit::PipelineOpts::from_path(path)?,
        None => chartkit::PipelineOpts::default(),
    };
    let pipeline = chartkit::ChartPipeline::new(opts);

    let id = template_id(&args.template);
    pipeline.register_template(&id, chartkit::TemplateConfig::from_path(&args.template)?)?;

    let mut gen_opts = chartkit::GenerateOpts::new(&id);
    gen_opts.width = args.width;
    gen_opts.height = args.height;
    gen_opts.enable_incremental = !args.no_incremental;
    if let Some(theme) = &args.theme {
        gen_opts = gen_opts.with_theme(theme);
    }
    if let Some(path) = &args.theme_file {
        gen_opts = gen_opts.with_custom_theme(chartkit::Theme::from_path(path)?);
    }

    let paths = std::iter::once(&args.data).chain(&args.update);
    let last_path = args.update.last().unwrap_or(&args.data);
    let repeats = std::iter::repeat_n(last_path, args.repeat);

    let mut last = None;
    for path in paths.chain(repeats) {
        let data = read_json(path)?;
        let out = pipeline
            .generate_chart(&data, &gen_opts)
            .with_context(|| format!("render '{}'", path.display()))?;
        if args.metadata {
            eprintln!("{}", serde_json::to_string(&out.metadata)?);
        }
        last = Some(out);
    }
    if args.metadata {
        eprintln!("{}", serde_json::to_string(&pipeline.get_stats())?);
    }

    let Some(out) = last else {
        anyhow::bail!("nothing rendered");
    };
    match &args.out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(path, out.output.as_bytes())
                .with_context(|| format!("write output '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(out.output.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn cmd_diff(args: DiffArgs) -> anyhow::Result<()> {
    let old = read_json(&args.old)?;
    let new = read_json(&args.new)?;
    let changes = chartkit::diff(&old, &new);
    println!("{}", serde_json::to_string_pretty(&changes)?);
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let mut registry = chartkit::TemplateRegistry::new();
    let id = template_id(&args.template);
    registry.register(&id, chartkit::TemplateConfig::from_path(&args.template)?)?;
    let result = registry.validate(&id, &read_json(&args.data)?)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.valid {
        anyhow::bail!("{} declared variable(s) missing", result.missing.len());
    }
    Ok(())
}

fn cmd_themes(args: ThemesArgs) -> anyhow::Result<()> {
    let registry = chartkit::ThemeRegistry::with_builtin();
    match &args.show {
        Some(id) => {
            let vars = registry.variables(id)?;
            println!("{}", serde_json::to_string_pretty(&vars)?);
        }
        None => {
            for id in registry.ids() {
                let marker = if registry.active_id() == Some(id.as_str()) {
                    " (active)"
                } else {
                    ""
                };
                println!("{id}{marker}");
            }
        }
    }
    Ok(())
}
