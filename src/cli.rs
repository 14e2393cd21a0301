use clap::{Parser, Subcommand};

fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    // If there's a git tag at HEAD, use just the tag (release build)
    if let Some(tag) = option_env!("OCTO_GIT_TAG") {
        return tag;
    }

    // Not on a tag - include commit hash and branch (dev build)
    let commit = option_env!("OCTO_GIT_COMMIT").unwrap_or("unknown");
    let branch = option_env!("OCTO_GIT_BRANCH").unwrap_or("unknown");

    // Leaked once at startup for clap's 'static requirement
    let version = format!("v{}-{} ({})", BASE_VERSION, commit, branch);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "octo")]
#[command(about = "Create a new Octo skeleton application")]
#[command(version = get_version(), propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new Octo skeleton application
    #[command(
        after_help = "Examples:\n  octo new blog\n  octo new blog --dev\n  octo new          (installs into the current directory)"
    )]
    New {
        /// Directory to create, relative to the current one (defaults to the current directory)
        name: Option<String>,
        /// Installs the latest "development" release
        #[arg(long)]
        dev: bool,
        /// Never attach the terminal to composer, always stream its output
        #[arg(long)]
        no_tty: bool,
    },

    /// Manage octo's configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show the current version
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a configuration setting
    Get {
        /// Key to get (if omitted, shows all settings)
        key: Option<String>,
    },
    /// Set a configuration setting
    Set {
        /// Key and value (e.g., 'php-binary=/usr/bin/php8.3' or 'php-binary /usr/bin/php8.3')
        #[arg(trailing_var_arg = true, required = true)]
        args: Vec<String>,
    },
    /// Reset a configuration setting to its default
    Unset {
        /// Key to unset (e.g., 'stable-url')
        key: String,
    },
    /// Show full configuration
    Show {
        /// Output format (json, yaml)
        #[arg(long, default_value = "json")]
        format: String,
    },
}
