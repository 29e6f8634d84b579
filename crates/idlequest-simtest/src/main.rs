//! IdleQuest Headless Simulation Harness
//!
//! Validates content and engine behaviour end to end without a frontend.
//! Runs entirely in-process: no rendering, no real clock.
//!
//! Usage:
//!   cargo run -p idlequest-simtest
//!   cargo run -p idlequest-simtest -- --verbose
//!   RUST_LOG=debug cargo run -p idlequest-simtest

use idlequest_core::config::GameConfig;
use idlequest_core::engine::{Advanced, IdleEngine};
use idlequest_core::events::GameEvent;
use idlequest_core::persistence::{MemoryStore, SaveFormat, SaveSlot};
use idlequest_core::systems::{ActionFilter, OfflineCatchup, TickOutcome};
use serde::Deserialize;

// ── Content (same JSON a frontend ships) ────────────────────────────────
const CONTENT_JSON: &str = include_str!("../../../data/starter_content.json");

const SEED: u64 = 0x1d1e;
const TICK_MS: u64 = 100;

/// One step of a scripted play session.
#[derive(Debug, Deserialize)]
#[serde(tag = "do", rename_all = "snake_case")]
enum Step {
    Start { action: String },
    Stop,
    Wait { ms: u64 },
    Unlock { action: String },
}

const SESSION_JSON: &str = r#"[
    { "do": "start", "action": "beg" },
    { "do": "wait", "ms": 30000 },
    { "do": "stop" },
    { "do": "start", "action": "pickpocket" },
    { "do": "wait", "ms": 90000 },
    { "do": "unlock", "action": "read_scroll" },
    { "do": "wait", "ms": 600000 },
    { "do": "stop" },
    { "do": "start", "action": "train" },
    { "do": "wait", "ms": 120000 }
]"#;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== IdleQuest Simulation Harness ===\n");

    let config = match GameConfig::from_json_str(CONTENT_JSON) {
        Ok(config) => config,
        Err(e) => {
            println!("  ✗ content_parse: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();

    // 1. Content validation
    results.extend(validate_content(&config, verbose));

    // 2. Live play sweep
    results.extend(validate_live_play(&config, verbose));

    // 3. Scripted session
    results.extend(validate_scripted_session(&config, verbose));

    // 4. Offline catch-up
    results.extend(validate_offline(&config, verbose));

    // 5. Save round trips
    results.extend(validate_persistence(&config, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn bounded(engine: &IdleEngine) -> bool {
    engine
        .state()
        .resources
        .values()
        .all(|r| r.current >= 0.0 && r.current <= r.max)
}

// ── 1. Content ──────────────────────────────────────────────────────────

fn validate_content(config: &GameConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Content ---");
    let mut results = Vec::new();

    results.push(check(
        "content_matches_builtin",
        *config == GameConfig::starter(),
        "data/starter_content.json mirrors GameConfig::starter()",
    ));

    let catalog = config.catalog();
    let rest = catalog.list(ActionFilter::Rest);
    results.push(check(
        "content_has_rest",
        catalog.rest_action().is_some() && !rest.is_empty(),
        format!("{} rest action(s)", rest.len()),
    ));

    let unlocked = catalog.list(ActionFilter::Unlocked);
    results.push(check(
        "content_startable_actions",
        unlocked.len() >= 2,
        format!(
            "{} of {} actions unlocked at start",
            unlocked.len(),
            catalog.list(ActionFilter::All).len()
        ),
    ));

    let stats = config.resources.iter().filter(|r| r.is_stat()).count();
    results.push(check(
        "content_has_stats",
        stats > 0,
        format!("{} stat resource(s)", stats),
    ));

    if verbose {
        for action in catalog.list(ActionFilter::All) {
            println!(
                "    {:<12} {:>5.1}s  costs={} rewards={}",
                action.id,
                action.duration_secs,
                action.costs.len(),
                action.rewards.len()
            );
        }
    }

    results
}

// ── 2. Live play ────────────────────────────────────────────────────────

fn validate_live_play(config: &GameConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Live Play ---");
    let mut results = Vec::new();

    let mut engine = IdleEngine::seeded(config.clone(), 0, SEED);
    let started = engine.start("beg").is_ok();
    results.push(check("live_start_beg", started, "beg starts on a new game"));

    let mut in_bounds = true;
    let mut completions = 0usize;
    let mut rest_switches = 0usize;
    let mut resumes = 0usize;
    // One simulated hour at the scheduler cadence
    for _ in 0..(3_600_000 / TICK_MS) {
        if let TickOutcome::Completed(done) = engine.tick(TICK_MS as f64 / 1000.0) {
            completions += done.len();
        }
        in_bounds &= bounded(&engine);
        for event in engine.drain_events() {
            match event {
                GameEvent::RestSwitchEngaged { .. } => rest_switches += 1,
                GameEvent::RestSwitchResolved { resumed: Some(_) } => resumes += 1,
                _ => {}
            }
        }
    }

    results.push(check(
        "live_resources_bounded",
        in_bounds,
        "0 <= current <= max after every tick",
    ));
    results.push(check(
        "live_completions",
        completions > 100,
        format!("{} completions in one hour", completions),
    ));
    results.push(check(
        "live_rest_cycle",
        rest_switches > 0 && resumes > 0,
        format!("{} rest switch(es), {} resume(s)", rest_switches, resumes),
    ));
    results.push(check(
        "live_clock",
        engine.state().clock_ms == 3_600_000,
        format!("clock at {} ms", engine.state().clock_ms),
    ));

    if verbose {
        for (id, resource) in &engine.state().resources {
            println!("    {:<10} {:>6.1}/{:<6.1}", id, resource.current, resource.max);
        }
        println!("    begging xp {:.1}", engine.skills().xp("begging"));
    }

    results
}

// ── 3. Scripted session ─────────────────────────────────────────────────

fn validate_scripted_session(config: &GameConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Scripted Session ---");
    let mut results = Vec::new();

    let steps: Vec<Step> = match serde_json::from_str(SESSION_JSON) {
        Ok(steps) => steps,
        Err(e) => {
            results.push(check("session_parse", false, format!("JSON parse error: {}", e)));
            return results;
        }
    };

    let mut engine = IdleEngine::seeded(config.clone(), 0, SEED);
    let mut in_bounds = true;
    let mut catchups = 0usize;
    for step in &steps {
        match step {
            Step::Start { action } => {
                if let Err(e) = engine.start(action) {
                    log::info!("session: start '{}' refused: {}", action, e);
                }
            }
            Step::Stop => {
                engine.stop();
            }
            Step::Unlock { action } => {
                engine.unlock_action(action);
            }
            Step::Wait { ms } => {
                // The host polls once per second; a long wait models a sleeping tab
                if *ms >= config.engine.catchup_threshold_ms * 5 {
                    if let Advanced::CaughtUp(_) = engine.advance(*ms) {
                        catchups += 1;
                    }
                } else {
                    for _ in 0..(*ms / 1000) {
                        engine.advance(1000);
                        in_bounds &= bounded(&engine);
                    }
                }
            }
        }
        in_bounds &= bounded(&engine);
        engine.drain_events();
    }

    results.push(check(
        "session_resources_bounded",
        in_bounds,
        format!("{} steps replayed", steps.len()),
    ));
    results.push(check(
        "session_caught_up",
        catchups == 1,
        format!("{} bulk catch-up(s)", catchups),
    ));
    results.push(check(
        "session_unlocked_scroll",
        engine.state().catalog.is_unlocked("read_scroll"),
        "read_scroll unlocked mid-session",
    ));
    let worked = ["beg", "pickpocket", "rest"]
        .iter()
        .all(|id| engine.state().completion_count(id) > 0);
    results.push(check(
        "session_progress",
        worked,
        format!(
            "beg={} pickpocket={} rest={} train={}",
            engine.state().completion_count("beg"),
            engine.state().completion_count("pickpocket"),
            engine.state().completion_count("rest"),
            engine.state().completion_count("train")
        ),
    ));

    if verbose {
        for entry in engine.log().entries() {
            println!("    [{:>8}] {:?}: {}", entry.timestamp_ms, entry.kind, entry.message);
        }
    }

    results
}

// ── 4. Offline catch-up ─────────────────────────────────────────────────

fn validate_offline(config: &GameConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Offline Catch-up ---");
    let mut results = Vec::new();
    let catchup = OfflineCatchup::new(config.offline.clone());

    let mut engine = IdleEngine::seeded(config.clone(), 0, SEED);
    let _ = engine.start("rest");
    engine.tick(5.0);
    let snapshot = engine.snapshot(5_000);
    let (after, report) = catchup.run(&snapshot, 20_000);
    results.push(check(
        "offline_half_rest",
        report.completions.get("rest") == Some(&2)
            && (after.state.progress("rest") - 0.5).abs() < 1e-9,
        format!(
            "{} completion(s), progress {:.2}",
            report.total_completions(),
            after.state.progress("rest")
        ),
    ));

    let mut engine = IdleEngine::seeded(config.clone(), 0, SEED);
    let _ = engine.start("beg");
    let snapshot = engine.snapshot(0);
    let first = catchup.apply(&snapshot, 8 * 3_600_000);
    let second = catchup.apply(&snapshot, 8 * 3_600_000);
    results.push(check(
        "offline_repeatable",
        first == second,
        "same snapshot and gap give the same result",
    ));
    results.push(check(
        "offline_bounded",
        first
            .state
            .resources
            .values()
            .all(|r| r.current >= 0.0 && r.current <= r.max),
        "resources in range after 8h away",
    ));

    let (_, long) = catchup.run(&snapshot, 48 * 3_600_000);
    results.push(check(
        "offline_clamped",
        long.replayed_ms == config.offline.max_catchup_ms,
        format!("{} ms of 48h replayed", long.replayed_ms),
    ));

    if verbose {
        let (_, report) = catchup.run(&snapshot, 8 * 3_600_000);
        println!("    {}", report.describe());
    }

    results
}

// ── 5. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(config: &GameConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let mut engine = IdleEngine::seeded(config.clone(), 0, SEED);
    let _ = engine.start("pickpocket");
    engine.tick(13.0);

    for format in [SaveFormat::Json, SaveFormat::Binary] {
        let mut slot = SaveSlot::new(MemoryStore::new(), format);
        let saved = engine.save(&mut slot, 13_000);
        let size = slot.store().bytes().map(|b| b.len()).unwrap_or(0);
        let restored = slot.load(config);
        results.push(check(
            &format!("save_roundtrip_{:?}", format).to_lowercase(),
            saved && restored.as_ref().map(|s| &s.state) == Some(engine.state()),
            format!("{} bytes", size),
        ));
        if verbose {
            println!("    {:?} save: {} bytes", format, size);
        }
    }

    let damaged = SaveSlot::new(MemoryStore::with_bytes(&b"{\"resources\": 7}"[..]), SaveFormat::Json);
    let mut fresh = IdleEngine::seeded(config.clone(), 0, SEED);
    let loaded = fresh.load(&damaged, 1_000).is_some();
    let repaired = fresh
        .drain_events()
        .iter()
        .any(|e| matches!(e, GameEvent::StateRepaired { .. }));
    results.push(check(
        "save_repair",
        loaded && repaired && bounded(&fresh),
        "damaged save loads as a repaired game",
    ));

    results
}
