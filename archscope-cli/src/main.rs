use anyhow::{Context, Result};
use archscope_core::headless::HeadlessRunner;
use archscope_core::{report_architecture_to_stderr, Overrides, ProgramImage, Settings};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tabled::{Table, Tabled};

/// Binary architecture reporter and analysis project manager
#[derive(Parser)]
#[command(
    name = "archscope",
    about = "Report the architecture of binaries and manage analysis projects",
    version,
    author
)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Folder holding all projects [env: ARCHSCOPE_HOME, default: ~/.archscope]
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Project to work in [default: defproj]
    #[arg(long, global = true)]
    project: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the architecture of a binary to stderr
    Arch {
        /// Path to binary file
        path: PathBuf,
    },
    /// Import a binary into the project
    Import { path: PathBuf },
    /// Print the architecture recorded for an imported binary
    Report {
        /// Name of the binary inside the project
        name: String,
    },
    /// List projects and their files
    List {
        #[arg(long)]
        json: bool,
    },
    /// Create or delete projects
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Analyze a binary with the headless analyzer, then run a script over it if given
    Headless {
        /// Analyzer installation folder [env: GHIDRA_HOME]
        #[arg(long)]
        analyzer_home: Option<PathBuf>,
        /// Analysis timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
        binary: PathBuf,
        script: Option<PathBuf>,
        script_arguments: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    Create { name: String },
    Delete { name: String },
}

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Files")]
    files: String,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let mut overrides = Overrides {
        project_root: cli.project_root,
        project: cli.project,
        ..Overrides::default()
    };
    if let Command::Headless {
        analyzer_home,
        timeout,
        ..
    } = &cli.command
    {
        overrides.analyzer_home = analyzer_home.clone();
        overrides.timeout_secs = *timeout;
    }
    // Only commands that touch projects or the analyzer need settings.
    let settings = || Settings::resolve(overrides.clone());

    match cli.command {
        Command::Arch { path } => {
            let image = ProgramImage::open(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            report_architecture_to_stderr(Some(&image))?;
        }

        Command::Import { path } => {
            let settings = settings()?;
            let store = settings.store()?;
            if !store.project_exists(&settings.project)? {
                store.create_project(&settings.project)?;
            }
            println!("{} Analyzing {}", "[+]".green(), path.display());
            let image = store.import(&settings.project, &path)?;
            println!("{} {} imported into {}", "[+]".green(), image.name, settings.project);
        }

        Command::Report { name } => {
            let settings = settings()?;
            let store = settings.store()?;
            let image = store.load(&settings.project, &name)?;
            report_architecture_to_stderr(Some(&image))?;
        }

        Command::List { json } => {
            let store = settings()?.store()?;
            let projects = store.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&projects)?);
            } else if projects.is_empty() {
                println!("No projects in {}", store.root().display());
            } else {
                let rows = projects.into_iter().map(|p| ProjectRow {
                    project: p.project,
                    files: p.files.join(" "),
                });
                println!("{}", Table::new(rows));
            }
        }

        Command::Project { action } => {
            let store = settings()?.store()?;
            match action {
                ProjectAction::Create { name } => {
                    store.create_project(&name)?;
                    println!("{} created project {}", "[+]".green(), name);
                }
                ProjectAction::Delete { name } => {
                    store.delete_project(&name)?;
                    println!("{} deleted project {}", "[+]".green(), name);
                }
            }
        }

        Command::Headless {
            binary,
            script,
            script_arguments,
            ..
        } => {
            let settings = settings()?;
            let store = settings.store()?;
            let runner = HeadlessRunner::new(settings.analyzer_home()?, settings.headless);
            let output = match script {
                Some(script) => {
                    println!("{} Running script {}", "[+]".green(), script.display());
                    runner.run_script(
                        &store,
                        &settings.project,
                        &binary,
                        &script,
                        &script_arguments,
                    )?
                }
                None => {
                    if !store.project_exists(&settings.project)? {
                        store.create_project(&settings.project)?;
                    }
                    println!("{} Analyzing {}", "[+]".green(), binary.display());
                    runner.analyze_file(&store, &settings.project, &binary)?
                }
            };
            print!("{}", output.stdout);
            eprint!("{}", output.stderr);
            if !output.status.success() {
                anyhow::bail!("analyzer exited with {}", output.status);
            }
        }
    }

    Ok(())
}
