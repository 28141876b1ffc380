use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ballot",
    about = "Weighted voting ledger with transitive delegation",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Ballot state file
    #[arg(
        long,
        global = true,
        env = "BALLOT_STATE",
        default_value = "ballot-state.json"
    )]
    pub state: PathBuf,

    /// Identity making the call: an 0x address or an account name
    #[arg(long = "as", global = true, env = "BALLOT_CALLER", value_name = "IDENTITY")]
    pub caller: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a ballot; the caller becomes its administrator
    Deploy(DeployArgs),
    /// Give a participant the right to vote (administrator only)
    GiveRight(TargetArgs),
    /// Vote for a proposal, numbered from 1
    Vote(VoteArgs),
    /// Delegate your vote to another participant
    Delegate(TargetArgs),
    /// Show the leading proposal
    Winner,
    /// List proposals and their vote counts
    Proposals,
    /// Show a participant's record
    Voter(VoterArgs),
    /// Show the journal of accepted calls
    History(HistoryArgs),
    /// Replay the journal and check tally invariants
    Verify,
    /// Print the address of the calling identity
    Whoami(WhoamiArgs),
    /// Serve the ballot over HTTP
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct DeployArgs {
    /// Proposal labels, at most 32 bytes each
    #[arg(required = true)]
    pub labels: Vec<String>,
    /// Replace an existing ballot state file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct TargetArgs {
    pub target: String,
}

#[derive(Args)]
pub struct VoteArgs {
    pub proposal: usize,
}

#[derive(Args)]
pub struct VoterArgs {
    pub identity: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct WhoamiArgs {
    /// Mint a fresh random identity instead
    #[arg(long)]
    pub new: bool,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Server configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}
