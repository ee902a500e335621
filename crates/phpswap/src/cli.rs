use clap::{Parser, Subcommand, ValueEnum};

use phpswap_backend::PhpVersion;

/// Switch between Homebrew PHP versions.
#[derive(Debug, Parser)]
#[command(name = "phpswap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log debug output to the terminal as well as the log file
    #[arg(long, global = true)]
    pub debug: bool,

    /// Print every external command as it completes
    #[arg(long, global = true)]
    pub show_commands: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List detected PHP versions
    List,

    /// Show the linked PHP version
    Current,

    /// Show what is known about one version
    Info {
        #[arg(value_name = "VERSION")]
        php: PhpVersion,
    },

    /// Link a different PHP version
    Switch(SwitchArgs),

    /// Unlink everything and reset php, nginx and dnsmasq
    Repair,

    /// Restart or stop the local web stack
    Services {
        #[arg(value_enum)]
        action: ServiceCommand,
    },

    /// List, enable or disable extensions in php.ini
    Ext {
        #[command(subcommand)]
        action: ExtCommand,
    },

    /// Open a configuration file or folder
    Open(OpenArgs),

    /// Print the settings file location and contents, creating it if missing
    Settings,
}

#[derive(Debug, Clone, clap::Args)]
pub struct SwitchArgs {
    #[arg(value_name = "VERSION")]
    pub php: PhpVersion,

    /// Let Laravel Valet do the switch
    #[arg(long, conflicts_with = "internal")]
    pub valet: bool,

    /// Use the built-in unlink/link switcher
    #[arg(long)]
    pub internal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceCommand {
    RestartPhp,
    RestartNginx,
    RestartDnsmasq,
    StopAll,
}

#[derive(Debug, Subcommand)]
pub enum ExtCommand {
    List {
        /// Version whose php.ini to read (default: the linked one)
        #[arg(long = "php", value_name = "VERSION")]
        php: Option<PhpVersion>,
    },
    Enable {
        name: String,
        #[arg(long = "php", value_name = "VERSION")]
        php: Option<PhpVersion>,
    },
    Disable {
        name: String,
        #[arg(long = "php", value_name = "VERSION")]
        php: Option<PhpVersion>,
    },
}

#[derive(Debug, Clone, clap::Args)]
pub struct OpenArgs {
    #[arg(value_enum)]
    pub target: OpenTarget,

    /// Version for `ini` (default: the linked one)
    #[arg(long = "php", value_name = "VERSION")]
    pub php: Option<PhpVersion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OpenTarget {
    Config,
    Ini,
    Composer,
    Valet,
}
