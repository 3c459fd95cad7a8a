use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vd_core::catalog;
use vd_core::{Category, Login, Registration};

mod app;
mod auth;
mod config;
mod store;

use app::App;
use config::Config;

#[derive(Parser)]
#[command(name = "vd", about = "Virgin Detector — photo analysis and daily streaks")]
struct Cli {
    /// Treat this date as today (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,
    /// Seed the random source (overrides VD_SEED)
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// State file path (overrides VD_STATE_PATH)
    #[arg(long, global = true)]
    state: Option<PathBuf>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate age and reveal the verdict for a photo's detected faces
    Analyze {
        /// JSON file with one face record or a list of them
        faces: PathBuf,
    },
    /// Daily check-in for a streak category
    CheckIn {
        /// "virgin" or "nofap"
        category: Category,
        /// Faces detected in the check-in selfie
        #[arg(short, long)]
        faces: PathBuf,
    },
    /// Reset a streak to zero
    Reset {
        category: Category,
    },
    /// Show both streaks and their milestones
    Streak,
    /// Show a random fact for a category
    Fact {
        category: Category,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        /// Date of birth (YYYY-MM-DD)
        #[arg(short, long)]
        dob: NaiveDate,
        /// Accept the terms and conditions
        #[arg(long)]
        accept_terms: bool,
    },
    /// Sign in to an existing account
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Show the signed-in profile
    Profile,
    /// Change the date of birth on the profile
    SetDob {
        dob: NaiveDate,
    },
    /// Sign out; the account and its streaks stay stored
    Logout,
    /// List collectible cards, or show one
    Collection {
        id: Option<String>,
    },
    /// List shop items
    Shop,
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(path) = cli.state {
        config.state_path = path;
    }
    let today = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let mut app = App::new(config, today).context("failed to open state")?;
    let json = cli.json;

    match cli.command {
        Commands::Analyze { faces } => {
            let faces = app::read_faces(&faces)?;
            let report = app.analyze(&faces)?;
            emit(json, &report, |r| {
                println!("Estimated age: {}", r.analysis.age);
                if r.analysis.glasses {
                    println!("Glasses detected (age adjusted)");
                }
                println!(
                    "{} ({}% confidence)",
                    r.analysis.verdict.status, r.analysis.verdict.confidence
                );
                if let Some(title) = &r.title {
                    println!("\n{}\n{}", title.title, title.description);
                }
            })?;
        }
        Commands::CheckIn { category, faces } => {
            let faces = app::read_faces(&faces)?;
            let report = app.check_in(category, &faces)?;
            emit(json, &report, |r| {
                if r.advanced {
                    println!("{} streak: {} days", r.category.label(), r.count);
                } else {
                    println!(
                        "Already checked in today. {} streak: {} days",
                        r.category.label(),
                        r.count
                    );
                }
                for m in &r.newly_achieved {
                    println!("New Achievement Unlocked: {} ({} days)", m.reward, m.threshold_days);
                }
                println!("{}", r.progress_message);
            })?;
        }
        Commands::Reset { category } => {
            let survived = app.reset(category)?;
            emit(json, &serde_json::json!({ "category": category, "survived": survived }), |_| {
                println!("You survived {survived} days. {} streak reset.", category.label());
            })?;
        }
        Commands::Streak => {
            let tracks = app.streaks()?;
            emit(json, &tracks, |tracks| {
                for t in tracks {
                    println!("{}: {} days", t.category.label(), t.count);
                    println!("  {}", t.progress_message);
                    if !t.achieved.is_empty() {
                        println!("  Earned: {}", t.achieved.join(", "));
                    }
                    for m in &t.milestones {
                        let mark = if m.achieved { "✓" } else { " " };
                        println!("  [{mark}] {:>4} days  {}", m.threshold_days, m.reward);
                    }
                }
            })?;
        }
        Commands::Fact { category } => {
            let report = app.daily_fact(category);
            emit(json, &report, |r| match r.fact {
                Some(fact) => println!("{fact}"),
                None => println!("No facts for {}", r.category.label()),
            })?;
        }
        Commands::Register {
            email,
            password,
            confirm_password,
            dob,
            accept_terms,
        } => {
            let profile = app.register(Registration {
                email,
                password,
                confirm_password,
                date_of_birth: dob,
                accepted_terms: accept_terms,
            })?;
            emit(json, &profile, |p| println!("Registered {}", p.email))?;
        }
        Commands::Login { email, password } => {
            let profile = app.login(Login { email, password })?;
            emit(json, &profile, |p| println!("Welcome back, {}", p.email))?;
        }
        Commands::Profile => {
            let profile = app.profile()?;
            emit(json, &profile, |p| {
                println!("Email:         {}", p.email);
                println!("Date of birth: {}", p.date_of_birth);
                println!("Member since:  {}", p.created_at.date_naive());
            })?;
        }
        Commands::SetDob { dob } => {
            let profile = app.set_date_of_birth(dob)?;
            emit(json, &profile, |p| {
                println!("Date of birth updated to {}", p.date_of_birth)
            })?;
        }
        Commands::Logout => {
            let report = app.logout()?;
            emit(json, &report, |r| println!("Logged out {}", r.logged_out))?;
        }
        Commands::Collection { id } => {
            let cat = catalog::catalog();
            match id {
                Some(id) => {
                    let card = cat
                        .find_card(&id)
                        .with_context(|| format!("no card with id {id}"))?;
                    emit(json, card, |c| {
                        println!("{}", c.export_text());
                        println!("\n{}", c.saved_message());
                    })?;
                }
                None => emit(json, &cat.cards, |cards| {
                    for c in cards {
                        println!("#{} {} — {} days ({})", c.id, c.status, c.streak_days, c.category.label());
                    }
                })?,
            }
        }
        Commands::Shop => {
            let items = &catalog::catalog().shop;
            emit(json, items, |items| {
                for item in items {
                    println!("{}  [{}]", item.title, item.price);
                    println!("  {}", item.description);
                    println!("  -> {}", item.action_label());
                }
            })?;
        }
    }

    tracing::debug!(today = %app.today(), "done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login() {
        let cli = Cli::try_parse_from(["vd", "--json", "login", "-e", "a@b.c", "-p", "pw"]).unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Login { ref email, ref password } if email == "a@b.c" && password == "pw"
        ));
        assert!(Cli::try_parse_from(["vd", "login", "-e", "a@b.c"]).is_err());
    }

    #[test]
    fn test_json_flag_is_global() {
        let cli = Cli::try_parse_from(["vd", "fact", "nofap", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Fact { category: Category::NoFap }));
        let cli = Cli::try_parse_from(["vd", "logout", "--json"]).unwrap();
        assert!(cli.json && matches!(cli.command, Commands::Logout));
    }
}
