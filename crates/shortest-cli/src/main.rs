use anyhow::Result;
use clap::Parser;
use shortest_config::ConfigLoader;
use tracing_subscriber::EnvFilter;

mod commands;

/// Shortest - declarative end-to-end tests.
///
/// Discovers test files, runs their suites one file at a time and prints a
/// summary. Exits with status 0 only when every test passed.
///
/// EXAMPLES:
///     shortest                             Run every discovered test file
///     shortest app/login.test.toml         Run a single file
///     shortest "auth/**"                   Run files matching a glob
///     shortest --headless --target URL     Run headless against URL
///     shortest --github-code               Print a GitHub 2FA code
///
/// ENVIRONMENT VARIABLES:
///     SHORTEST_HEADLESS     Same as --headless
///     SHORTEST_BASE_URL     Default for --target
///     SHORTEST_TIMEOUT_MS   Per-test timeout
///     GITHUB_TOTP_SECRET    Default for --secret
///
/// Variables may also be set in .env or .env.local in the working directory.
///     NO_COLOR              Set to disable colored output
///     RUST_LOG              Log filter (overrides --debug-ai)
#[derive(Parser, Debug)]
#[command(name = "shortest")]
#[command(version)]
struct Cli {
    /// Test file to run, or a filter (substring or glob) over discovered files
    test_pattern: Option<String>,

    /// Run without a visible browser window
    #[arg(long)]
    headless: bool,

    /// Base URL of the application under test
    #[arg(long, value_name = "URL")]
    target: Option<String>,

    /// Verbose output: debug logs and every status transition
    #[arg(long)]
    debug_ai: bool,

    /// Print a GitHub 2FA code and exit
    #[arg(long)]
    github_code: bool,

    /// Base32 TOTP secret for --github-code
    #[arg(long, value_name = "KEY")]
    secret: Option<String>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Ignore the error when a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug_ai);

    if cli.no_color || std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    let cwd = std::env::current_dir()?;
    let loaded = ConfigLoader::new().load_from_directory(&cwd);

    // A broken config only matters when tests are about to run
    if cli.github_code {
        if let Err(e) = &loaded {
            tracing::warn!(error = %e, "configuration ignored for --github-code");
        }
        let secret = cli
            .secret
            .or_else(|| std::env::var("GITHUB_TOTP_SECRET").ok().filter(|s| !s.is_empty()))
            .or_else(|| loaded.ok().and_then(|c| c.github_totp_secret().map(str::to_string)));
        return commands::totp::run(secret.as_deref());
    }

    let config = loaded?;
    tracing::debug!(path = ?config.config_path, base_url = config.base_url(), "configuration loaded");

    let args = commands::test::TestArgs {
        pattern: cli.test_pattern,
        headless: cli.headless || config.headless(),
        target: cli.target.unwrap_or_else(|| config.base_url().to_string()),
        verbose: cli.debug_ai,
        dir: config.test_dir(),
        file_pattern: config.test_pattern().to_string(),
        timeout: config.timeout(),
    };

    if !commands::test::run(args)? {
        std::process::exit(1);
    }
    Ok(())
}
