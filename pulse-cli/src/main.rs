//! pulse-cli — terminal frontend for the Pulse persuasion analytics API
//!
//! # Subcommands
//! - `status`              — show server health and version
//! - `summary [--json]`    — headline counts and quick insights
//! - `trajectory [--json]` — conversion trajectory ranking
//! - `ask <prompt>`        — one-shot chat; prints the streamed answer

use std::io::{BufRead, BufReader, Write};

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8710";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "pulse-cli",
    version,
    about = "Pulse persuasion analytics — terminal frontend"
)]
struct Cli {
    /// Pulse HTTP server URL (overrides PULSE_HTTP_URL env var)
    #[arg(long, env = "PULSE_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show Pulse server status
    Status,

    /// Show headline counts and quick insights
    Summary {
        /// Output the raw JSON body
        #[arg(long)]
        json: bool,
    },

    /// Show the conversion trajectory ranking
    Trajectory {
        /// Output the raw JSON body
        #[arg(long)]
        json: bool,
    },

    /// Ask the dashboard assistant a question
    Ask {
        /// Prompt text
        prompt: String,
    },
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    summary: OutcomeSummary,
    insights: QuickInsights,
}

#[derive(Debug, Deserialize)]
struct OutcomeSummary {
    total: usize,
    real_count: usize,
    fact_count: usize,
    vaccinated_count: usize,
    avg_attitude: f64,
}

#[derive(Debug, Deserialize)]
struct QuickInsights {
    most_persuadable: Option<PersonaImprovement>,
    least_persuadable: Option<PersonaImprovement>,
    conversion_rate_pct: f64,
}

#[derive(Debug, Deserialize)]
struct PersonaImprovement {
    name: String,
    improvement_pct: f64,
}

#[derive(Debug, Deserialize)]
struct TrajectoryResponse {
    trajectory: Vec<ConversionDelta>,
}

#[derive(Debug, Deserialize)]
struct ConversionDelta {
    name: String,
    start_rating: f64,
    end_rating: f64,
    absolute_change: f64,
    direction: String,
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client() -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()?)
}

fn get_json(server: &str, path: &str) -> serde_json::Value {
    let url = format!("{}{}", server, path);
    let resp = match client().and_then(|c| Ok(c.get(&url).send()?)) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("pulse-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("pulse-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }

    match resp.json() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("pulse-cli: failed to parse response: {}", e);
            std::process::exit(1);
        }
    }
}

fn do_status(server: &str) {
    let health = get_json(server, "/health");
    let version = get_json(server, "/version");
    println!(
        "Pulse server {} — {} ({})",
        version["version"].as_str().unwrap_or("?"),
        health["status"].as_str().unwrap_or("?"),
        health["detail"].as_str().unwrap_or("")
    );
}

fn do_summary(server: &str, json: bool) -> anyhow::Result<()> {
    let body = get_json(server, "/analytics/summary");
    if json {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let parsed: SummaryResponse = serde_json::from_value(body)?;
    println!("Responses:   {}", parsed.summary.total);
    println!("Real:        {}", parsed.summary.real_count);
    println!("Factual:     {}", parsed.summary.fact_count);
    println!("Vaccinated:  {}", parsed.summary.vaccinated_count);
    println!("Avg score:   {:.2}", parsed.summary.avg_attitude);
    println!("Conversion:  {:.0}%", parsed.insights.conversion_rate_pct);
    if let Some(most) = parsed.insights.most_persuadable {
        println!(
            "Most persuadable:  {} ({:+.1}%)",
            most.name, most.improvement_pct
        );
    }
    if let Some(least) = parsed.insights.least_persuadable {
        println!(
            "Least persuadable: {} ({:+.1}%)",
            least.name, least.improvement_pct
        );
    }
    Ok(())
}

fn do_trajectory(server: &str, json: bool) -> anyhow::Result<()> {
    let body = get_json(server, "/analytics/trajectory");
    if json {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let parsed: TrajectoryResponse = serde_json::from_value(body)?;
    for (rank, d) in parsed.trajectory.iter().enumerate() {
        println!(
            "{:>2}. {:<12} {:>5.1}% -> {:>5.1}%  |Δ| {:.1}%  ({})",
            rank + 1,
            d.name,
            d.start_rating * 100.0,
            d.end_rating * 100.0,
            d.absolute_change * 100.0,
            d.direction
        );
    }
    Ok(())
}

/// Stream the assistant's answer, printing SSE data frames as they arrive.
fn do_ask(server: &str, prompt: &str) -> anyhow::Result<()> {
    let url = format!("{}/chat", server);
    let body = serde_json::json!({
        "messages": [{ "role": "user", "content": prompt }],
    });

    let resp = match client()?.post(&url).json(&body).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("pulse-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("pulse-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }

    let mut stdout = std::io::stdout();
    let reader = BufReader::new(resp);
    for line in reader.lines() {
        let line = line?;
        if let Some(data) = line.strip_prefix("data:") {
            print!("{}", data.trim_start());
            stdout.flush()?;
        }
    }
    println!();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Status => do_status(&cli.server),
        Commands::Summary { json } => do_summary(&cli.server, json)?,
        Commands::Trajectory { json } => do_trajectory(&cli.server, json)?,
        Commands::Ask { prompt } => do_ask(&cli.server, &prompt)?,
    }
    Ok(())
}
