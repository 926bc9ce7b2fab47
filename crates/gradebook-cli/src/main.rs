//! gradebook CLI — view rosters, enter scores and save them.

use std::path::PathBuf;
use std::process;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "gradebook",
    version,
    about = "School gradebook: rosters, grade entry and pass/fail"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active grading policy
    Policy {
        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Render the roster for a classroom, subject and term
    Roster {
        /// Classroom id (defaults to the first one available)
        #[arg(long)]
        classroom: Option<i64>,

        /// Subject (defaults to the first one available)
        #[arg(long)]
        subject: Option<String>,

        /// Term number (defaults to the current term)
        #[arg(long)]
        term: Option<u8>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Enter scores for one student and save the roster
    Grade {
        /// Classroom id
        #[arg(long)]
        classroom: Option<i64>,

        /// Subject
        #[arg(long)]
        subject: Option<String>,

        /// Term number
        #[arg(long)]
        term: Option<u8>,

        /// Student id
        #[arg(long)]
        student: i64,

        /// First component score (empty clears it)
        #[arg(long)]
        c1: Option<String>,

        /// Second component score (empty clears it)
        #[arg(long)]
        c2: Option<String>,

        /// Recovery score (empty clears it)
        #[arg(long)]
        recovery: Option<String>,

        /// Date recorded with the grades (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter gradebook.toml
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gradebook=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Policy { format, config } => commands::policy::execute(format, config).await,
        Commands::Roster {
            classroom,
            subject,
            term,
            format,
            config,
        } => {
            let target = commands::Target {
                classroom,
                subject,
                term,
            };
            commands::roster::execute(target, format, config).await
        }
        Commands::Grade {
            classroom,
            subject,
            term,
            student,
            c1,
            c2,
            recovery,
            date,
            config,
        } => {
            let target = commands::Target {
                classroom,
                subject,
                term,
            };
            let scores = commands::grade::ScoreArgs { c1, c2, recovery };
            commands::grade::execute(target, student, scores, date, config).await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
