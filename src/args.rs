use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Operator tooling for Fjalingo quiz progress.
///
/// Database and logging settings are read from the environment (or `.env`).
#[derive(Parser, Debug)]
#[command(name = "fjalingo", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a finished quiz for a user
    SubmitQuiz {
        #[arg(short, long)]
        user: Uuid,

        #[arg(short, long, default_value_t = 0)]
        score: i64,

        #[arg(short, long)]
        total: i64,

        #[arg(short, long)]
        correct: i64,
    },

    /// Create the zeroed stats row for a new account
    InitStats {
        #[arg(short, long)]
        user: Uuid,
    },

    /// Print a user's leaderboard rank (null when unranked)
    Rank {
        #[arg(short, long)]
        user: Uuid,
    },

    /// Print the top of the leaderboard
    Leaderboard {
        /// Number of entries; LEADERBOARD_LIMIT when omitted
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Print stats, rank and achievements of a user
    Profile {
        #[arg(short, long)]
        user: Uuid,
    },
}
