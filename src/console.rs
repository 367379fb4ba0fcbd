//! Colorful console output for benchmark runs.

use std::time::{Duration, Instant};

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;

use crate::analysis::ScoreExplanation;
use crate::score::HardSoftScore;

/// Banner printed when a benchmark starts.
pub fn print_banner() {
    let banner = r#"
  ____  _                   _
 |  _ \| | __ _ _ __  _ __ (_)_ __   __ _
 | |_) | |/ _` | '_ \| '_ \| | '_ \ / _` |
 |  __/| | (_| | | | | | | | | | | | (_| |
 |_|   |_|\__,_|_| |_|_| |_|_|_| |_|\__, |
                                    |___/
"#;
    println!("{}", banner.cyan().bold());
    println!(
        "  {} {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black(),
        "Planning Core".bright_cyan()
    );
}

fn prefix(component: &str) -> String {
    format!(
        "{} {} {}",
        timestamp().bright_black(),
        "INFO".bright_green(),
        format!("[{}]", component).bright_cyan()
    )
}

/// Prints the size of a routing problem.
pub fn print_routing_problem(vehicles: usize, visits: usize, locations: usize) {
    println!(
        "{} Problem: vehicles ({}), visits ({}), locations ({})",
        prefix("Routing"),
        vehicles.to_formatted_string(&Locale::en).bright_yellow(),
        visits.to_formatted_string(&Locale::en).bright_yellow(),
        locations.to_formatted_string(&Locale::en).bright_yellow()
    );
}

/// Prints the size of a scheduling problem.
pub fn print_scheduling_problem(employees: usize, shifts: usize) {
    println!(
        "{} Problem: employees ({}), shifts ({})",
        prefix("Scheduling"),
        employees.to_formatted_string(&Locale::en).bright_yellow(),
        shifts.to_formatted_string(&Locale::en).bright_yellow()
    );
}

/// Prints per-constraint scores of an explanation, skipping zero ones.
pub fn print_explanation(component: &str, explanation: &ScoreExplanation) {
    println!(
        "{} Score ({}), matches ({})",
        prefix(component),
        format_score(explanation.score),
        explanation
            .total_match_count()
            .to_formatted_string(&Locale::en)
            .white()
    );
    for analysis in explanation.non_zero_constraints() {
        println!(
            "    {} {:<40} {:>8} {}",
            "→".bright_blue(),
            analysis.name,
            analysis.match_count().to_formatted_string(&Locale::en).white(),
            format_score(analysis.score)
        );
    }
}

/// Prints the closing summary box of a benchmark.
pub fn print_benchmark_ended(total_duration: Duration, total_moves: u64, final_score: HardSoftScore, verified: bool) {
    let speed = moves_per_second(total_moves, total_duration);

    println!(
        "{} Benchmark ended: time spent ({}), score ({}), move speed ({}/sec)",
        prefix("Bench"),
        format_duration(total_duration).yellow(),
        format_score(final_score),
        speed.to_formatted_string(&Locale::en).bright_magenta().bold()
    );

    // 60 chars wide, 56 char content area
    println!();
    println!("{}", "╔══════════════════════════════════════════════════════════╗".bright_cyan());

    let status_text = if verified {
        "✓ INCREMENTAL SCORE VERIFIED"
    } else {
        "✗ SCORE MISMATCH (incremental != from scratch)"
    };
    let status_colored = if verified {
        status_text.bright_green().bold().to_string()
    } else {
        status_text.bright_red().bold().to_string()
    };
    let status_padding = 56usize.saturating_sub(status_text.chars().count());
    let left_pad = status_padding / 2;
    let right_pad = status_padding - left_pad;
    println!(
        "{}{}{}{}{}",
        "║".bright_cyan(),
        " ".repeat(left_pad),
        status_colored,
        " ".repeat(right_pad),
        "║".bright_cyan()
    );

    println!("{}", "╠══════════════════════════════════════════════════════════╣".bright_cyan());

    let rows = [
        ("Final Score:", final_score.to_string()),
        ("Feasible:", final_score.is_feasible().to_string()),
        ("Elapsed:", format!("{:.2}s", total_duration.as_secs_f64())),
        ("Moves:", total_moves.to_formatted_string(&Locale::en)),
        ("Move Speed:", format!("{}/sec", speed.to_formatted_string(&Locale::en))),
    ];
    for (label, value) in rows {
        println!("{}  {:<18}{:>36}  {}", "║".bright_cyan(), label, value, "║".bright_cyan());
    }

    println!("{}", "╚══════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}

fn moves_per_second(moves: u64, elapsed: Duration) -> u64 {
    if elapsed.as_secs_f64() > 0.0 {
        (moves as f64 / elapsed.as_secs_f64()) as u64
    } else {
        0
    }
}

fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        let mins = total_ms / 60_000;
        let secs = (total_ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}

/// Colors the hard part red when broken and the soft part by sign.
fn format_score(score: HardSoftScore) -> String {
    let hard = format!("{}hard", score.hard());
    let soft = format!("{}soft", score.soft());

    let hard = if score.hard() < 0 {
        hard.bright_red().to_string()
    } else {
        hard.bright_green().to_string()
    };
    let soft = match score.soft() {
        s if s < 0 => soft.yellow().to_string(),
        s if s > 0 => soft.bright_green().to_string(),
        _ => soft.white().to_string(),
    };
    format!("{}/{}", hard, soft)
}

fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| format!("{}.{:03}", d.as_secs(), d.subsec_millis()))
        .unwrap_or_else(|_| "0.000".to_string())
}

/// Tracks the duration and move count of one benchmark phase.
pub struct PhaseTimer {
    start: Instant,
    phase_name: String,
    moves: u64,
}

impl PhaseTimer {
    pub fn start(phase_name: impl Into<String>) -> Self {
        let phase_name = phase_name.into();
        println!("{} {} started", prefix(&phase_name), phase_name.white().bold());
        Self {
            start: Instant::now(),
            phase_name,
            moves: 0,
        }
    }

    pub fn record_moves(&mut self, count: u64) {
        self.moves += count;
    }

    pub fn moves(&self) -> u64 {
        self.moves
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Prints the phase summary and returns `(elapsed, moves)`.
    pub fn finish(self, score: HardSoftScore) -> (Duration, u64) {
        let elapsed = self.start.elapsed();
        println!(
            "{} {} ended: time spent ({}), score ({}), move speed ({}/sec), moves ({})",
            prefix(&self.phase_name),
            self.phase_name.white().bold(),
            format_duration(elapsed).yellow(),
            format_score(score),
            moves_per_second(self.moves, elapsed)
                .to_formatted_string(&Locale::en)
                .bright_magenta()
                .bold(),
            self.moves.to_formatted_string(&Locale::en).white()
        );
        (elapsed, self.moves)
    }
}
