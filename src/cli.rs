use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "inviteflow",
    about = "End-to-end invitation and activation harness for the construction platform",
    version
)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a scratch project and invite the standard user set, writing
    /// the invited-emails fixture
    Provision {
        /// Account to provision under, overriding the configured one
        #[arg(long)]
        account: Option<String>,
    },

    /// Activate every account in the fixture through the registration flow
    Activate {
        /// Fixture file, overriding the environment-derived path
        #[arg(long)]
        fixture: Option<String>,

        /// Process at most this many accounts
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Activate only the first fixture account, for debugging one flow
    Single {
        /// Fixture file, overriding the environment-derived path
        #[arg(long)]
        fixture: Option<String>,
    },

    /// Delete every message from the hosted mailbox server
    PurgeMailbox,
}
