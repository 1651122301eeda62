//! `wd`: headless access to wire diagrams.
//!
//! Inspects and lints diagram files, lists module templates, and places
//! module instances without a GUI host.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use wd_core::codec::decode_scene;
use wd_core::config::EditorConfig;
use wd_core::files::load_diagram;
use wd_core::lint::{LintSeverity, LintTarget, lint_scene};
use wd_core::model::SceneGraph;
use wd_core::store::{FsModuleStore, ModuleStore};
use wd_editor::{Canvas, EditError};

/// Inspect, lint and edit wire diagrams from the command line
#[derive(Parser, Debug)]
#[command(name = "wd", version)]
#[command(about = "Inspect, lint and edit wire diagrams", long_about = None)]
struct Cli {
    /// Editor configuration file (config.json layout)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print entity counts, module instances and view metadata
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Report structural issues; exits non-zero when warnings are found
    Lint {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Manage module templates
    Modules {
        #[command(subcommand)]
        action: ModulesCommand,
    },
    /// Place a module instance into a diagram and save it
    Place {
        #[arg(value_name = "DIAGRAM")]
        diagram: PathBuf,

        /// Template id
        #[arg(short, long)]
        module: String,

        /// Module directory
        #[arg(short, long, default_value = "modules")]
        dir: PathBuf,

        /// Output file (defaults to overwriting DIAGRAM)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ModulesCommand {
    /// List templates sorted by name
    List {
        #[arg(short, long, default_value = "modules")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &cli.config {
        Some(path) => EditorConfig::load(path),
        None => EditorConfig::default(),
    };
    match run(cli.command, config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: EditorConfig) -> Result<ExitCode, EditError> {
    match command {
        Command::Inspect { file } => {
            let mut canvas = Canvas::new(config);
            canvas.load_from(&file)?;
            inspect(&file, &canvas);
            Ok(ExitCode::SUCCESS)
        }
        Command::Lint { file } => {
            let (scene, _) = decode_scene(&load_diagram(&file)?, &config)?;
            Ok(lint(&scene))
        }
        Command::Modules {
            action: ModulesCommand::List { dir },
        } => {
            let store = FsModuleStore::new(dir)?;
            let modules = store.list();
            if modules.is_empty() {
                println!("no modules in {}", store.dir().display());
            }
            for m in modules {
                println!("{}  {}", m.id, m.name);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Place {
            diagram,
            module,
            dir,
            output,
        } => {
            let store = FsModuleStore::new(dir)?;
            let mut canvas = Canvas::new(config);
            canvas.load_from(&diagram)?;
            let instance = canvas.load_module(&module, &store)?;
            let path = canvas.save_to(output.unwrap_or(diagram))?;
            println!("placed {instance} into {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn inspect(file: &Path, canvas: &Canvas) {
    let scene = canvas.scene();
    println!("{}", file.display());
    println!("  nodes:       {}", scene.node_count());
    println!("  connections: {}", scene.connection_count());
    println!("  images:      {}", scene.image_count());

    let instances = scene.instance_ids();
    if !instances.is_empty() {
        println!("  module instances:");
        for id in instances {
            let members = scene.instance_members(id);
            println!(
                "    {id} ({} nodes, {} images)",
                members.nodes.len(),
                members.images.len()
            );
        }
    }

    let meta = canvas.metadata();
    println!(
        "  grid: {} (size {}, snap {})",
        if meta.grid_enabled { "on" } else { "off" },
        meta.grid_size,
        if meta.snap_to_grid { "on" } else { "off" }
    );
    println!(
        "  view: zoom {:.2}, pan ({}, {})",
        meta.zoom_level, meta.pan_offset.x, meta.pan_offset.y
    );
}

fn lint(scene: &SceneGraph) -> ExitCode {
    let diags = lint_scene(scene);
    for d in &diags {
        let severity = match d.severity {
            LintSeverity::Warning => "warning",
            LintSeverity::Info => "info",
        };
        let target = match d.target {
            LintTarget::Node(id) => match scene.node(id) {
                Some(node) => format!("node '{}'", node.name),
                None => format!("node {id}"),
            },
            LintTarget::Connection(id) => format!("connection {id}"),
        };
        println!("{severity}[{}] {target}: {}", d.rule, d.message);
    }
    let warnings = diags
        .iter()
        .filter(|d| d.severity == LintSeverity::Warning)
        .count();
    println!("{} diagnostics, {warnings} warnings", diags.len());
    if warnings > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
