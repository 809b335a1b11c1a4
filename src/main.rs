use clap::Parser;
use serde::Serialize;
use thiserror::Error;

use fjalingo_progress::db::prelude::{Db, DbError, QuizSubmission, SubmissionError, UserId};
use fjalingo_progress::profile::ProfileService;
use fjalingo_progress::progress::{ProgressError, StatsEngine};
use fjalingo_progress::ranking::RankingService;
use fjalingo_progress::util::env::{Config, EnvErr};
use fjalingo_progress::util::telemetry;

mod args;

use args::{Cli, Command};

#[derive(Debug, Error)]
enum RunnerErr {
    #[error(transparent)]
    Env(#[from] EnvErr),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Std(#[from] Box<dyn std::error::Error>),
}

type Result<T> = core::result::Result<T, RunnerErr>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let telemetry_registry = telemetry::Telemetry::new(&config)?.register();

    let db = Db::connect(&config).await?;
    let result = run(cli.command, &config, &db).await;

    if let Err(e) = &result {
        tracing::error!(error = %e, "command failed");
    }

    db.close().await;
    telemetry_registry.shutdown();
    result
}

async fn run(command: Command, config: &Config, db: &Db) -> Result<()> {
    match command {
        Command::SubmitQuiz {
            user,
            score,
            total,
            correct,
        } => {
            let submission = QuizSubmission::new(score, total, correct)?;
            let outcome = StatsEngine::new(db.store())
                .submit_quiz(&UserId::from(user), &submission)
                .await?;
            print_json(&outcome)
        }
        Command::InitStats { user } => {
            let created = StatsEngine::new(db.store())
                .init_stats(&UserId::from(user))
                .await?;
            print_json(&serde_json::json!({ "created": created }))
        }
        Command::Rank { user } => {
            let rank = RankingService::new(db.store())
                .user_rank(&UserId::from(user))
                .await?;
            print_json(&serde_json::json!({ "rank": rank }))
        }
        Command::Leaderboard { limit } => {
            let limit = limit.unwrap_or(config.leaderboard_limit);
            let board = RankingService::new(db.store()).leaderboard(limit).await?;
            print_json(&board)
        }
        Command::Profile { user } => {
            let summary = ProfileService::new(db.store())
                .progress(&UserId::from(user))
                .await?;
            print_json(&summary)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
