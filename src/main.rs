//! toolgate CLI entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use toolgate::config::{self, ApiKeys, Config};
use toolgate::gateway::Integration;
use toolgate::ui;

#[derive(Parser)]
#[command(name = "toolgate")]
#[command(about = "Credentialed tool gateway for conversational agents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration and create the credentials directory
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// List the built-in agents
    Agents,

    /// Show the tools an agent exposes
    Tools {
        /// Agent name
        agent: String,

        /// Print the full agent manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Invoke one tool of an agent and print the structured result
    Invoke {
        /// Agent name
        agent: String,

        /// Tool name
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Authorize an integration (drive or gmail) in the browser
    Login {
        integration: Integration,
    },

    /// Remove the stored credential of an integration
    Logout {
        integration: Integration,
    },

    /// Show configuration, credential and API key status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => run_init(force)?,

        Commands::Agents => {
            ui::print_header("agents");
            for info in toolgate::agent::AGENTS {
                println!("  {:<24} {}", info.name, info.description);
            }
        }

        Commands::Tools { agent, json } => {
            let config = config::load()?;
            let shell = toolgate::agent::build(&agent, &config, &ApiKeys::from_env())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&shell.manifest())?);
            } else {
                ui::print_header(shell.name());
                println!("  model: {}\n", shell.model());
                for def in shell.tool_definitions() {
                    ui::print_step(&format!("{}: {}", def.name, def.description));
                }
                for toolset in shell.toolsets() {
                    let toolgate::agent::ToolsetSpec::Stdio { command, args, .. } = toolset;
                    ui::print_step(&format!("tool server: {} {}", command, args.join(" ")));
                }
            }
        }

        Commands::Invoke { agent, tool, args } => {
            let args: serde_json::Value = serde_json::from_str(&args)
                .context("--args must be valid JSON")?;
            let config = config::load()?;
            let shell = toolgate::agent::build(&agent, &config, &ApiKeys::from_env())?;

            let outcome = shell.invoke(&tool, args).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Login { integration } => run_login(integration).await?,

        Commands::Logout { integration } => {
            let config = config::load()?;
            integration.credential_store(&config).delete()?;
            ui::print_success(&format!("Signed out of {}", integration.name()));
        }

        Commands::Status => run_status()?,
    }

    Ok(())
}

fn run_init(force: bool) -> Result<()> {
    let path = config::config_path();
    ui::print_header("init");

    if path.exists() && !force {
        ui::print_warning(&format!("Config already exists at {} (use --force to overwrite)", path.display()));
    } else {
        config::save(&Config::default())?;
        ui::print_success(&format!("Wrote {}", path.display()));
    }

    let config = config::load()?;
    std::fs::create_dir_all(&config.credentials_dir)
        .with_context(|| format!("creating {}", config.credentials_dir.display()))?;

    println!("\nNext steps:");
    println!("  1. Put your OAuth client secrets at {}", config.client_secrets_path().display());
    println!("  2. Export WEATHER_API_KEY, GOOGLE_API_KEY, ELEVENLABS_API_KEY, BRAVE_API_KEY as needed");
    println!("  3. Authorize Google access: toolgate login drive / toolgate login gmail");
    Ok(())
}

async fn run_login(integration: Integration) -> Result<()> {
    let config = config::load()?;
    let auth = integration.authenticator(&config)?;

    ui::print_header(&format!("login {}", integration.name()));
    if auth.has_valid_credentials().unwrap_or(false) {
        ui::print_step("A stored credential exists; refreshing if needed");
    } else {
        ui::print_step("Opening the browser for authorization");
    }

    if let Err(e) = auth.ensure_credential(auth.scopes()).await {
        ui::print_error(&e.to_string());
        return Err(e.into());
    }
    ui::print_success(&format!("Credentials saved to {}", auth.store().path().display()));
    Ok(())
}

fn run_status() -> Result<()> {
    let config = config::load()?;
    let keys = ApiKeys::from_env();
    let set = |k: &Option<String>| k.as_ref().map(|_| "✓");

    ui::print_header("status");
    let config_path = config::config_path();
    ui::print_field("Config", config_path.exists().then(|| config_path.to_str()).flatten());
    ui::print_field("Model", Some(config.model.as_str()));

    let secrets = config.client_secrets_path();
    ui::print_field("OAuth client secrets", secrets.exists().then(|| secrets.to_str()).flatten());

    for integration in [Integration::Drive, Integration::Gmail] {
        let state = match integration.credential_store(&config).load() {
            Ok(Some(c)) if !c.is_expired() => Some("✓"),
            Ok(Some(c)) if c.can_refresh() => Some("expired (refreshable)"),
            Ok(Some(_)) => Some("expired (run login)"),
            Ok(None) => None,
            Err(e) => {
                ui::print_warning(&e.to_string());
                Some("corrupt (will re-authorize)")
            }
        };
        ui::print_field(&format!("{} credentials", integration.name()), state);
    }

    ui::print_field("WEATHER_API_KEY", set(&keys.weather));
    ui::print_field("GOOGLE_API_KEY", set(&keys.google));
    ui::print_field("ELEVENLABS_API_KEY", set(&keys.elevenlabs));
    ui::print_field("BRAVE_API_KEY", set(&keys.brave));
    Ok(())
}
