use clap::Parser;
use maze_chase_rust_server::autopilot::Autopilot;
use maze_chase_rust_server::constants::{DEFAULT_STARTING_LIVES, TICK_MS, TICK_RATE};
use maze_chase_rust_server::engine::{GameEngine, GameEngineOptions};
use maze_chase_rust_server::levels::LevelTable;
use maze_chase_rust_server::maze::Maze;
use maze_chase_rust_server::types::{RuntimeEvent, Snapshot};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    runs: Option<u32>,
    #[arg(long)]
    level: Option<u32>,
    #[arg(long)]
    lives: Option<i32>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    minutes: Option<u32>,
    /// JSON level table replacing the classic one.
    #[arg(long)]
    levels: Option<PathBuf>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    level: u32,
    lives: i32,
    minutes: u32,
    seed: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    #[serde(rename = "startLevel")]
    start_level: u32,
    minutes: u32,
    outcome: String,
    #[serde(rename = "finalScore")]
    final_score: i32,
    #[serde(rename = "levelReached")]
    level_reached: u32,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(rename = "pelletsEaten")]
    pellets_eaten: u32,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: u32,
    #[serde(rename = "fruitsEaten")]
    fruits_eaten: u32,
    #[serde(rename = "livesLost")]
    lives_lost: u32,
    #[serde(rename = "frightWindows")]
    fright_windows: u32,
    #[serde(rename = "levelsCleared")]
    levels_cleared: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageScore")]
    average_score: i64,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

/// Values carried from one tick to the next to catch regressions.
#[derive(Clone, Copy, Debug)]
struct Watermarks {
    level: u32,
    lives: i32,
    pellets_remaining: u32,
    score: i32,
}

impl Watermarks {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            level: snapshot.level,
            lives: snapshot.lives,
            pellets_remaining: snapshot.pellets_remaining,
            score: snapshot.score,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(seed_hint, run_started_at_ms));

    let level_table = match load_level_table(cli.levels.as_deref()) {
        Ok(table) => table,
        Err(error) => {
            emit_log(
                "error",
                "level_table_load_failed",
                &run_id,
                None,
                None,
                None,
                json!({
                    "path": cli.levels.as_ref().map(|path| path.to_string_lossy().to_string()),
                    "error": error,
                }),
            );
            std::process::exit(2);
        }
    };

    let maze = Maze::classic();
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "level": scenario.level,
                "lives": scenario.lives,
                "minutes": scenario.minutes,
            }),
        );
        let scenario_run = run_scenario(&scenario, &level_table, &maze);

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &run_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *outcome_counts
            .entry(scenario_run.result.outcome.clone())
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.finished_tick),
            json!({
                "outcome": scenario_run.result.outcome,
                "finalScore": scenario_run.result.final_score,
                "levelReached": scenario_run.result.level_reached,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => {
                emit_log(
                    "error",
                    "result_serialize_failed",
                    &run_id,
                    Some(&scenario.name),
                    Some(scenario.seed),
                    None,
                    json!({ "error": error.to_string() }),
                );
                std::process::exit(2);
            }
        }
        scenario_results.push(scenario_run.result);
    }

    let run_finished_at_ms = now_ms();
    let summary = build_run_summary(
        run_id.clone(),
        run_started_at_ms,
        run_finished_at_ms,
        scenario_results,
        outcome_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &run_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &run_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageScore": summary.average_score,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn load_level_table(path: Option<&Path>) -> Result<LevelTable, String> {
    match path {
        Some(path) => LevelTable::load(path).map_err(|error| error.to_string()),
        None => Ok(LevelTable::classic()),
    }
}

fn run_scenario(scenario: &Scenario, level_table: &LevelTable, maze: &Maze) -> ScenarioRunResult {
    let mut engine = GameEngine::new(GameEngineOptions {
        seed: scenario.seed,
        start_level: scenario.level,
        starting_lives: scenario.lives,
        level_table: level_table.clone(),
        ..GameEngineOptions::default()
    });
    let mut autopilot = Autopilot::new(scenario.seed ^ 0x5eed);

    let tick_limit = scenario.minutes as u64 * 60 * TICK_RATE as u64;
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut fright_windows = 0;
    let mut levels_cleared = 0;
    let mut last_tick = 0u64;
    let mut watermarks = Watermarks::from_snapshot(&engine.build_snapshot(false));

    while !engine.is_ended() {
        let dir = autopilot.decide(&engine);
        engine.receive_input(dir);
        engine.step(TICK_MS);
        let snapshot = engine.build_snapshot(true);
        last_tick = snapshot.tick;

        let mut messages = collect_snapshot_anomalies(&snapshot, maze, &watermarks);
        for event in &snapshot.events {
            match event {
                RuntimeEvent::FrightStarted { .. } => fright_windows += 1,
                RuntimeEvent::LevelComplete { .. } => levels_cleared += 1,
                RuntimeEvent::Anomaly { message } => messages.push(message.clone()),
                _ => {}
            }
        }
        for message in messages {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        watermarks = Watermarks::from_snapshot(&snapshot);

        if snapshot.tick >= tick_limit {
            break;
        }
    }

    let summary = engine.build_summary();
    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            start_level: scenario.level,
            minutes: scenario.minutes,
            outcome: if summary.ended {
                "game_over".to_string()
            } else {
                "time_limit".to_string()
            },
            final_score: summary.final_score,
            level_reached: summary.level_reached,
            duration_ms: summary.duration_ms,
            pellets_eaten: summary.pellets_eaten,
            ghosts_eaten: summary.ghosts_eaten,
            fruits_eaten: summary.fruits_eaten,
            lives_lost: summary.lives_lost,
            fright_windows,
            levels_cleared,
            anomalies,
        },
        anomaly_records,
        finished_tick: last_tick,
    }
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, maze: &Maze, before: &Watermarks) -> Vec<String> {
    let mut anomalies = Vec::new();

    let player = &snapshot.player;
    if player.tile != maze.tile_at(player.x, player.y) {
        anomalies.push(format!(
            "player tile ({},{}) disagrees with pixel position ({:.3},{:.3})",
            player.tile.x, player.tile.y, player.x, player.y
        ));
    }
    for ghost in &snapshot.ghosts {
        if ghost.tile != maze.tile_at(ghost.x, ghost.y) {
            anomalies.push(format!(
                "{:?} tile ({},{}) disagrees with pixel position ({:.3},{:.3})",
                ghost.role, ghost.tile.x, ghost.tile.y, ghost.x, ghost.y
            ));
        }
    }

    if snapshot.level == before.level && snapshot.pellets_remaining > before.pellets_remaining {
        anomalies.push(format!(
            "pellets increased within level {}: {} -> {}",
            snapshot.level, before.pellets_remaining, snapshot.pellets_remaining
        ));
    }
    if snapshot.lives <= before.lives && snapshot.score < before.score {
        anomalies.push(format!(
            "score decreased within a life: {} -> {}",
            before.score, snapshot.score
        ));
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(now_ms));
    let level = cli.level.unwrap_or(1).clamp(1, 255);
    let lives = cli.lives.unwrap_or(DEFAULT_STARTING_LIVES).clamp(0, 99);
    let minutes = cli.minutes.unwrap_or(3).clamp(1, 60);

    if cli.single || cli.runs.is_some() || cli.level.is_some() {
        let runs = if cli.single {
            1
        } else {
            cli.runs.unwrap_or(1).clamp(1, 1_000)
        };
        return (0..runs)
            .map(|idx| Scenario {
                name: format!("custom-level{level}-{}", idx + 1),
                level,
                lives,
                minutes,
                seed: seed.wrapping_add(idx),
            })
            .collect();
    }

    vec![
        Scenario {
            name: "quick-check-level1".to_string(),
            level: 1,
            lives,
            minutes: 2,
            seed,
        },
        Scenario {
            name: "late-level-check".to_string(),
            level: 5,
            lives,
            minutes: 2,
            seed: seed.wrapping_add(1),
        },
    ]
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_run_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let total_score: i64 = scenarios.iter().map(|s| s.final_score as i64).sum();
    let average_score = if scenario_count == 0 {
        0
    } else {
        total_score / scenario_count as i64
    };
    RunSummary {
        run_id,
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_score,
        outcome_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    run_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    if let Ok(line) = serde_json::to_string(&log_line) {
        eprintln!("{line}");
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_scenario_result(outcome: &str, final_score: i32) -> ScenarioResultLine {
        ScenarioResultLine {
            scenario: "test".to_string(),
            seed: 42,
            start_level: 1,
            minutes: 1,
            outcome: outcome.to_string(),
            final_score,
            level_reached: 1,
            duration_ms: 60_000,
            pellets_eaten: 0,
            ghosts_eaten: 0,
            fruits_eaten: 0,
            lives_lost: 0,
            fright_windows: 0,
            levels_cleared: 0,
            anomalies: Vec::new(),
        }
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("simulate").chain(args.iter().copied()))
    }

    #[test]
    fn default_run_id_contains_seed_and_timestamp() {
        assert_eq!(default_run_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_calculates_average_score() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            1,
            2,
            vec![
                make_scenario_result("game_over", 3_000),
                make_scenario_result("time_limit", 5_000),
            ],
            BTreeMap::from([
                ("game_over".to_string(), 1usize),
                ("time_limit".to_string(), 1usize),
            ]),
            1,
        );
        assert_eq!(summary.average_score, 4_000);
        assert_eq!(summary.scenario_count, 2);
    }

    #[test]
    fn runs_flag_expands_consecutive_seeds() {
        let scenarios = resolve_scenarios(&cli(&["--runs", "3", "--seed", "10", "--level", "4"]));
        let seeds: Vec<u32> = scenarios.iter().map(|s| s.seed).collect();
        assert_eq!(seeds, vec![10, 11, 12]);
        assert!(scenarios.iter().all(|s| s.level == 4));
    }

    #[test]
    fn default_scenarios_cover_two_levels() {
        let scenarios = resolve_scenarios(&cli(&["--seed", "7"]));
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].level, 1);
        assert_eq!(scenarios[1].seed, 8);
    }

    #[test]
    fn missing_level_file_is_reported() {
        let target = std::env::temp_dir()
            .join(format!("maze-chase-missing-{}", now_ms()))
            .join("levels.json");
        assert!(load_level_table(Some(&target)).is_err());
        assert!(load_level_table(None).is_ok());
    }

    #[test]
    fn short_scenario_runs_clean() {
        let scenario = Scenario {
            name: "unit".to_string(),
            level: 1,
            lives: 3,
            minutes: 1,
            seed: 3,
        };
        let run = run_scenario(&scenario, &LevelTable::classic(), &Maze::classic());
        assert!(run.result.anomalies.is_empty(), "{:?}", run.result.anomalies);
        assert!(run.result.pellets_eaten > 0);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("maze-chase-missing-{}", now_ms()))
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            1,
            2,
            vec![make_scenario_result("game_over", 100)],
            BTreeMap::from([("game_over".to_string(), 1usize)]),
            0,
        );
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(&mut anomalies, &mut records, &mut seen, 10, "same".to_string());
        push_anomaly(&mut anomalies, &mut records, &mut seen, 11, "same".to_string());
        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
    }
}
