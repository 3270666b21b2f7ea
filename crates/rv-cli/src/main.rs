//! # rv — RANGEVIEW operator CLI
//!
//! Thin wrapper around the rv-hub REST API.
//!
//! - `rv events --definition 1 [--instance 2 [--run 3]]` — list events.
//! - `rv commands --sandbox <id>` — list console commands.
//! - `rv delete-events --instance 2 [--run 3]` — drop event indices.
//! - `rv delete-commands --pool 4` — drop command indices.
//! - `rv stats-time --run 9 --phases 1,2,3` — per-phase time statistics.
//!
//! The hub address comes from `RV_BASE_URL` (default
//! `http://127.0.0.1:3000`).

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rv", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List training events by definition / instance / run scope.
    Events {
        #[arg(long)]
        definition: i64,
        #[arg(long)]
        instance: Option<i64>,
        #[arg(long)]
        run: Option<i64>,
        /// LINEAR or ADAPTIVE.
        #[arg(long, default_value = "LINEAR")]
        training_type: String,
    },

    /// List console commands by pool / sandbox / access-token scope.
    Commands {
        #[arg(long)]
        pool: Option<i64>,
        #[arg(long)]
        sandbox: Option<String>,
        #[arg(long)]
        access_token: Option<String>,
        #[arg(long)]
        user: Option<i64>,
    },

    /// Delete event indices of an instance (or one run).
    DeleteEvents {
        #[arg(long)]
        instance: i64,
        #[arg(long)]
        run: Option<i64>,
        #[arg(long, default_value = "LINEAR")]
        training_type: String,
    },

    /// Delete command indices by pool / sandbox / access-token scope.
    DeleteCommands {
        #[arg(long)]
        pool: Option<i64>,
        #[arg(long)]
        sandbox: Option<String>,
        #[arg(long)]
        access_token: Option<String>,
        #[arg(long)]
        user: Option<i64>,
    },

    /// Per-phase time statistics of an adaptive run.
    StatsTime {
        #[arg(long)]
        run: i64,
        /// Comma-separated phase ids.
        #[arg(long)]
        phases: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");

    rt.block_on(async_main(cli.command));
}

async fn async_main(cmd: Commands) {
    let client = reqwest::Client::new();
    let base_url =
        std::env::var("RV_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

    match cmd {
        Commands::Events {
            definition,
            instance,
            run,
            training_type,
        } => {
            let mut url = format!(
                "{}/training-platform-events/training-definitions/{}",
                base_url, definition
            );
            if let Some(instance) = instance {
                url.push_str(&format!("/training-instances/{}", instance));
                if let Some(run) = run {
                    url.push_str(&format!("/training-runs/{}", run));
                }
            }
            url.push_str(&format!("?trainingType={}", training_type));
            get_and_print(&client, &url).await;
        }

        Commands::Commands {
            pool,
            sandbox,
            access_token,
            user,
        } => match command_scope_path(pool, sandbox, access_token, user) {
            Some(path) => {
                let url = format!("{}/training-platform-commands{}", base_url, path);
                get_and_print(&client, &url).await;
            }
            None => {
                eprintln!("Error: one of --pool, --sandbox or --access-token is required");
                std::process::exit(2);
            }
        },

        Commands::DeleteEvents {
            instance,
            run,
            training_type,
        } => {
            let mut url = format!(
                "{}/training-platform-events/training-instances/{}",
                base_url, instance
            );
            if let Some(run) = run {
                url.push_str(&format!("/training-runs/{}", run));
            }
            url.push_str(&format!("?trainingType={}", training_type));
            delete_and_print(&client, &url).await;
        }

        Commands::DeleteCommands {
            pool,
            sandbox,
            access_token,
            user,
        } => match command_scope_path(pool, sandbox, access_token, user) {
            Some(path) => {
                let url = format!("{}/training-platform-commands{}", base_url, path);
                delete_and_print(&client, &url).await;
            }
            None => {
                eprintln!("Error: one of --pool, --sandbox or --access-token is required");
                std::process::exit(2);
            }
        },

        Commands::StatsTime { run, phases } => {
            let url = format!(
                "{}/training-statistics/training-runs/{}/phases/events/time?phaseIds={}",
                base_url, run, phases
            );
            get_and_print(&client, &url).await;
        }
    }
}

fn command_scope_path(
    pool: Option<i64>,
    sandbox: Option<String>,
    access_token: Option<String>,
    user: Option<i64>,
) -> Option<String> {
    if let Some(pool) = pool {
        return Some(format!("/pools/{}", pool));
    }
    if let Some(sandbox) = sandbox {
        return Some(format!("/sandboxes/{}", sandbox));
    }
    if let Some(token) = access_token {
        return Some(match user {
            Some(user) => format!("/access-tokens/{}/users/{}", token, user),
            None => format!("/access-tokens/{}", token),
        });
    }
    None
}

async fn get_and_print(client: &reqwest::Client, url: &str) {
    match client.get(url).send().await {
        Ok(resp) => print_response(resp).await,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn delete_and_print(client: &reqwest::Client, url: &str) {
    match client.delete(url).send().await {
        Ok(resp) => {
            println!("{}", resp.status());
            if let Ok(body) = resp.json::<serde_json::Value>().await {
                println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn print_response(resp: reqwest::Response) {
    let status = resp.status();
    match resp.json::<serde_json::Value>().await {
        Ok(json) => println!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_default()
        ),
        Err(_) => eprintln!("Error: non-JSON response ({})", status),
    }
}
