use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use drift_engine::{
    analyze_dir, inject_snippet_mapping, region_tag_report, source_files, validate_overrides,
    wrap_test_file, Analysis, DriftConfig, TestedFilter, WrapOutcome,
};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

mod report;

#[derive(Parser)]
#[command(name = "snippet-drift")]
#[command(about = "Region-tag extraction and test association for JavaScript samples", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML file overriding the default extraction settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract snippet methods with their tests and write them as JSON
    Analyze(AnalyzeArgs),

    /// List detected and undetected region tags
    #[command(name = "list-region-tags")]
    ListRegionTags(ListRegionTagsArgs),

    /// List snippet source files by how many of their methods are tested
    #[command(name = "list-source-files")]
    ListSourceFiles(ListSourceFilesArgs),

    /// Check override files against the region tags present in the tree
    #[command(name = "validate-overrides")]
    ValidateOverrides(RootArgs),

    /// Annotate an xUnit report read from stdin with region tags
    #[command(name = "inject-snippet-mapping")]
    InjectSnippetMapping(RootArgs),

    /// Wrap one test in a group labelled with region tags
    #[command(name = "wrap-test")]
    WrapTest(WrapTestArgs),
}

#[derive(Args)]
struct RootArgs {
    /// Sample directory (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Sample directory (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Output file (defaults to <path>/repo.json)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ListRegionTagsArgs {
    /// Sample directory (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Skip tags attached to snippet methods
    #[arg(long)]
    hide_detected: bool,

    /// Skip tags no snippet method carries
    #[arg(long)]
    hide_undetected: bool,

    /// Show how many test cases cover each detected tag
    #[arg(short = 'c', long)]
    show_test_counts: bool,

    /// Show the source files of each detected tag
    #[arg(short = 'f', long)]
    show_filenames: bool,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ListSourceFilesArgs {
    /// Sample directory (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Files where all, some or none of the methods are tested
    #[arg(short, long, value_enum, default_value = "*")]
    tested: TestedFlag,
}

#[derive(Args)]
struct WrapTestArgs {
    /// Test file to edit in place
    path: PathBuf,

    /// Text identifying the test's first line
    #[arg(long)]
    filter: String,

    /// Region tag to label the test with (repeatable)
    #[arg(short, long = "tag", required = true)]
    tags: Vec<String>,
}

#[derive(Copy, Clone, ValueEnum)]
enum TestedFlag {
    All,
    Some,
    None,
    #[value(name = "*")]
    Any,
}

impl TestedFlag {
    const fn as_domain(self) -> TestedFilter {
        match self {
            TestedFlag::All => TestedFilter::All,
            TestedFlag::Some => TestedFilter::Some,
            TestedFlag::None => TestedFilter::None,
            TestedFlag::Any => TestedFilter::Any,
        }
    }
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze(args) => run_analyze(args, &config)?,
        Commands::ListRegionTags(args) => run_list_region_tags(args, &config)?,
        Commands::ListSourceFiles(args) => run_list_source_files(args, &config)?,
        Commands::ValidateOverrides(args) => run_validate_overrides(args, &config)?,
        Commands::InjectSnippetMapping(args) => run_inject_snippet_mapping(args, &config)?,
        Commands::WrapTest(args) => run_wrap_test(args)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<DriftConfig> {
    match path {
        Some(path) => DriftConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(DriftConfig::default()),
    }
}

fn analyze(path: &Path, config: &DriftConfig) -> Result<Analysis> {
    analyze_dir(path, config).with_context(|| format!("Failed to analyze {}", path.display()))
}

fn run_analyze(args: AnalyzeArgs, config: &DriftConfig) -> Result<()> {
    let analysis = analyze(&args.path, config)?;
    let output = args.output.unwrap_or_else(|| args.path.join("repo.json"));
    analysis
        .write_methods(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Wrote {} method(s) ({} tested) to {}",
        analysis.methods.len(),
        analysis.methods.iter().filter(|m| m.is_tested()).count(),
        output.display()
    );
    Ok(())
}

fn run_list_region_tags(args: ListRegionTagsArgs, config: &DriftConfig) -> Result<()> {
    let analysis = analyze(&args.path, config)?;
    let report = region_tag_report(&analysis, config);
    log::debug!(
        "{} of {} detected tag(s) tested, {} undetected",
        report.detected.iter().filter(|s| s.is_tested()).count(),
        report.detected.len(),
        report.undetected.len()
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let options = report::TagListOptions {
        detected: !args.hide_detected,
        undetected: !args.hide_undetected,
        test_counts: args.show_test_counts,
        filenames: args.show_filenames,
    };
    print!("{}", report::render_region_tags(&report, &options));
    Ok(())
}

fn run_list_source_files(args: ListSourceFilesArgs, config: &DriftConfig) -> Result<()> {
    let analysis = analyze(&args.path, config)?;
    let filter = args.tested.as_domain();
    let files = source_files(&analysis, filter);
    log::debug!("{} file(s) match --tested {filter}", files.len());

    for file in files {
        println!("{file}");
    }
    Ok(())
}

fn run_validate_overrides(args: RootArgs, config: &DriftConfig) -> Result<()> {
    let problems = validate_overrides(&args.path, config)
        .with_context(|| format!("Failed to load override files under {}", args.path.display()))?;

    if problems.is_empty() {
        println!("All override files are valid");
        return Ok(());
    }

    print!("{}", report::render_problems(&problems));
    bail!("{} override problem(s) found", problems.len());
}

fn run_inject_snippet_mapping(args: RootArgs, config: &DriftConfig) -> Result<()> {
    let mut xml = String::new();
    io::stdin()
        .read_to_string(&mut xml)
        .context("Failed to read xUnit report from stdin")?;

    let analysis = analyze(&args.path, config)?;
    let annotated = inject_snippet_mapping(&xml, &analysis)?;
    println!("{annotated}");
    Ok(())
}

fn run_wrap_test(args: WrapTestArgs) -> Result<()> {
    let outcome = wrap_test_file(&args.path, &args.filter, &args.tags)
        .with_context(|| format!("Failed to wrap test in {}", args.path.display()))?;
    println!("{}", report::describe_wrap(&outcome));

    if let WrapOutcome::Wrapped(_) = outcome {
        log::info!("Updated {}", args.path.display());
    }
    Ok(())
}
