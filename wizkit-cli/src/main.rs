//! wizkit CLI - Declarative configuration wizards in the terminal
//!
//! Usage:
//!   wizkit run <wizard.toml>       Walk through a wizard and write the settings
//!   wizkit validate <wizard.toml>  Check a definition and print its steps
//!   wizkit init                    Create a template wizard.toml

mod host;
mod lookup;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use wizkit_common::chain;
use wizkit_common::config::{generate_template, WizardDefinition};
use wizkit_common::form::{build_form_chain, FormSettings};
use wizkit_common::session::{AdminSession, InMemorySession};
use wizkit_runtime::{Wizard, WizardEvent, WizardState};

#[derive(Parser)]
#[command(name = "wizkit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "wizkit - Declarative configuration wizards")]
struct Cli {
    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    silent: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a wizard interactively
    Run {
        /// Path to the wizard definition
        definition: PathBuf,

        /// Initial settings (JSON object of strings)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Where to write the result (.json or .toml); printed if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Registry of existing entities (JSON: { "<kind>": ["name", ...] })
        #[arg(long)]
        existing: Option<PathBuf>,

        /// Show the settings without allowing edits
        #[arg(long)]
        read_only: bool,

        /// The settings describe a new entity rather than an existing one
        #[arg(long)]
        new: bool,

        /// Milliseconds before a slow lookup shows a spinner
        #[arg(long, default_value_t = 500)]
        lookup_delay_ms: u64,
    },

    /// Validate a wizard definition
    Validate {
        /// Path to the wizard definition
        definition: PathBuf,
    },

    /// Create a template wizard definition
    Init {
        /// Output path
        #[arg(short, long, default_value = "wizard.toml")]
        output: PathBuf,

        /// Accept the default title without prompts
        #[arg(short, long)]
        yes: bool,
    },
}

// Console helper for output control
pub(crate) struct Console {
    silent: bool,
    verbose: bool,
}

impl Console {
    fn new(silent: bool, verbose: bool) -> Self {
        Self { silent, verbose }
    }

    pub(crate) fn log(&self, msg: impl std::fmt::Display) {
        if !self.silent {
            println!("{}", msg);
        }
    }

    pub(crate) fn verbose(&self, msg: impl std::fmt::Display) {
        if self.verbose && !self.silent {
            println!("  {}", msg);
        }
    }

    pub(crate) fn success(&self, msg: impl std::fmt::Display) {
        if !self.silent {
            println!("✅ {}", msg);
        }
    }

    pub(crate) fn warn(&self, msg: impl std::fmt::Display) {
        if !self.silent {
            eprintln!("⚠️  {}", msg);
        }
    }

    pub(crate) fn error(&self, msg: impl std::fmt::Display) {
        eprintln!("❌ {}", msg); // Always print errors
    }
}

fn log_level(verbose: bool, silent: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else if silent {
        Level::ERROR
    } else {
        Level::INFO
    }
}

fn init_logging(cli: &Cli) {
    let _ = FmtSubscriber::builder()
        .with_max_level(log_level(cli.verbose, cli.silent))
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let console = Console::new(cli.silent, cli.verbose);

    let result = match cli.command {
        Commands::Run {
            definition,
            settings,
            output,
            existing,
            read_only,
            new,
            lookup_delay_ms,
        } => cmd_run(
            RunOptions {
                definition,
                settings,
                output,
                existing,
                read_only,
                new,
                lookup_delay: Duration::from_millis(lookup_delay_ms),
            },
            &console,
        ),
        Commands::Validate { definition } => cmd_validate(&definition, &console),
        Commands::Init { output, yes } => cmd_init(&output, yes, &console),
    };

    if let Err(e) = result {
        console.error(format!("{e:#}"));
        std::process::exit(1);
    }
}

struct RunOptions {
    definition: PathBuf,
    settings: Option<PathBuf>,
    output: Option<PathBuf>,
    existing: Option<PathBuf>,
    read_only: bool,
    new: bool,
    lookup_delay: Duration,
}

/// Load a definition and check it, with the path in any error
fn load_definition(path: &Path) -> Result<WizardDefinition> {
    let definition = WizardDefinition::from_file(path)?;
    definition
        .validate()
        .with_context(|| format!("Invalid wizard definition: {}", path.display()))?;
    Ok(definition)
}

/// Run a wizard and write the resulting settings
fn cmd_run(options: RunOptions, console: &Console) -> Result<()> {
    let mut definition = load_definition(&options.definition)?;
    if options.read_only {
        definition.wizard.read_only = true;
    }

    let settings = match &options.settings {
        Some(path) => FormSettings::from_json_file(path)?,
        None => FormSettings::new(),
    };
    let registry = match &options.existing {
        Some(path) => InMemorySession::from_file(path)?,
        None => InMemorySession::new(),
    };
    let session: Rc<dyn AdminSession> =
        Rc::new(lookup::BackgroundSession::new(registry, options.lookup_delay, console.silent)?);

    let form = build_form_chain(&definition, Some(session))?;
    let mut wizard = Wizard::new(definition.wizard.title.clone(), form.head.clone(), settings)
        .accept_new_provider(options.new);
    wizard.add_listener(|event| {
        if let WizardEvent::SelectionChanged { from, to } = event {
            tracing::debug!(from = ?from, to = %to, "selection changed");
        }
    });

    console.log(format!("🧭 {}", wizard.title()));
    if let Some(description) = &definition.wizard.description {
        console.log(format!("   {description}"));
    }

    wizard.start()?;
    match host::drive(&mut wizard, &form, console)? {
        WizardState::Finished => {}
        _ => {
            console.log("Cancelled. No settings were written.");
            return Ok(());
        }
    }

    let settings = wizard.into_settings();
    match &options.output {
        Some(path) => {
            host::write_settings(path, &settings)?;
            console.success(format!("Settings written to {}", path.display()));
        }
        None => {
            console.success("Wizard finished");
            for line in host::masked_summary(&settings, definition.fields()) {
                console.log(format!("   {line}"));
            }
        }
    }

    Ok(())
}

/// Validate a definition and print its chain
fn cmd_validate(path: &Path, console: &Console) -> Result<()> {
    let definition = load_definition(path)?;
    let form = build_form_chain(&definition, None)?;

    console.success(format!("{} is valid", path.display()));
    console.log(format!("   Title: {}", definition.wizard.title));
    for (i, step) in definition.steps.iter().enumerate() {
        console.log(format!("   {}. {} ({} fields)", i + 1, step.label, step.fields.len()));
        for field in &step.fields {
            console.verbose(format!(
                "     {}{}{}",
                field.key,
                if field.required { " [required]" } else { "" },
                if field.secret { " [secret]" } else { "" },
            ));
        }
    }
    console.verbose(format!("Chain: {}", chain::labels(&form.head).join(" -> ")));

    Ok(())
}

/// Write a template definition
fn cmd_init(output: &Path, accept_defaults: bool, console: &Console) -> Result<()> {
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }

    let title: String = if accept_defaults {
        "New JMS Connection".to_string()
    } else {
        Input::new()
            .with_prompt("title")
            .default("New JMS Connection".to_string())
            .interact_text()?
    };

    let contents = generate_template(&title);
    WizardDefinition::from_str(&contents)?.validate()?;

    if !accept_defaults {
        println!("\n📄 About to create {}:\n", output.display());
        println!("{}", contents);

        let confirm = Confirm::new()
            .with_prompt("Create this file?")
            .default(true)
            .interact()?;

        if !confirm {
            console.log("Cancelled.");
            return Ok(());
        }
    }

    std::fs::write(output, &contents)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    console.success(format!("Created {}", output.display()));
    console.log("\nNext steps:");
    console.log("  1. Edit the steps and fields");
    console.log(format!("  2. Run: wizkit run {}", output.display()));

    Ok(())
}
