use anyhow::{anyhow, Result};
use dolly_fly::controller::FlightVariant;
use dolly_fly::events::{FlightEvent, ReportLog, Severity};
use dolly_fly::rig::RigHandle;
use dolly_fly::scene::{ObjectData, Scene};
use dolly_fly::session::{
    ChannelSet, FlightSession, HostContext, KeyframeRecorder, ManualTickSource,
};
use dolly_fly::settings::FlySettings;
use dolly_fly::BoneId;
use serde_json::json;
use std::env;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    match run() {
        Ok(result) => {
            if result.summary.errors > 0 || (result.fail_on_warn && result.summary.warnings > 0) {
                process::exit(2);
            }
        }
        Err(err) => {
            eprintln!("flight_check error: {err:?}");
            process::exit(1);
        }
    }
}

#[derive(Default)]
struct RunSummary {
    checked: usize,
    warnings: usize,
    errors: usize,
}

struct RunResult {
    summary: RunSummary,
    fail_on_warn: bool,
}

struct CliOptions {
    fail_on_warn: bool,
    report_stats: bool,
    simulate: bool,
    show_help: bool,
    targets: Vec<String>,
}

fn run() -> Result<RunResult> {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = parse_cli_args(&args)?;
    if options.show_help {
        print_usage();
        return Ok(RunResult { summary: RunSummary::default(), fail_on_warn: options.fail_on_warn });
    }
    if options.targets.is_empty() {
        return Err(anyhow!("no scene files provided"));
    }
    let mut summary = RunSummary::default();
    for target in &options.targets {
        let path = PathBuf::from(target);
        summary.checked += 1;
        let mut reports = ReportLog::default();
        check_scene(&path, options.simulate, &mut reports);
        let mut clean = true;
        for report in reports.reports() {
            match report.severity {
                Severity::Warning => {
                    summary.warnings += 1;
                    clean = false;
                }
                Severity::Error => {
                    summary.errors += 1;
                    clean = false;
                }
                Severity::Info => {}
            }
            println!("{} - {report}", path.display());
            if options.report_stats {
                let json_value = json!({
                    "severity": report.severity.to_string(),
                    "path": path.display().to_string(),
                    "message": report.message,
                });
                println!("{json_value}");
            }
        }
        if clean {
            println!("OK {}", path.display());
        }
    }
    println!(
        "Checked {} scenes ({} warnings, {} errors)",
        summary.checked, summary.warnings, summary.errors
    );
    if options.report_stats {
        let json_value = json!({
            "summary": {
                "checked": summary.checked,
                "warnings": summary.warnings,
                "errors": summary.errors,
            }
        });
        println!("{json_value}");
    }
    Ok(RunResult { summary, fail_on_warn: options.fail_on_warn })
}

fn print_usage() {
    eprintln!(
        "Flight Check

Usage:
  flight_check [--fail-on-warn] [--simulate] <scene.json> [<scene.json>...]

Each scene file is loaded and every camera object is checked for a usable
dolly rig. With --simulate a short scripted flight is run over each valid
rig to confirm the session machinery works end to end. Use --fail-on-warn
to treat warnings as errors (exit code 2).
"
    );
}

fn parse_cli_args(args: &[String]) -> Result<CliOptions> {
    let mut options = CliOptions {
        fail_on_warn: false,
        report_stats: false,
        simulate: false,
        show_help: false,
        targets: Vec::new(),
    };
    for arg in args {
        match arg.as_str() {
            "--fail-on-warn" => options.fail_on_warn = true,
            "--report-stats" => options.report_stats = true,
            "--simulate" => options.simulate = true,
            "--help" | "-h" => options.show_help = true,
            _ if arg.starts_with("--") => {
                return Err(anyhow!("unknown flag '{arg}'"));
            }
            _ => options.targets.push(arg.clone()),
        }
    }
    Ok(options)
}

fn check_scene(path: &PathBuf, simulate: bool, reports: &mut ReportLog) {
    let mut scene = match Scene::load(path) {
        Ok(scene) => scene,
        Err(err) => {
            reports.error(format!("failed to load scene: {err:#}"));
            return;
        }
    };
    let cameras: Vec<_> = scene
        .iter_objects()
        .filter(|(_, object)| matches!(object.data, ObjectData::Camera))
        .map(|(id, object)| (id, object.name.clone()))
        .collect();
    if cameras.is_empty() {
        reports.warning("scene contains no camera objects");
        return;
    }
    for (id, name) in cameras {
        match RigHandle::resolve(&scene, id) {
            Ok(_) => {
                reports.info(format!("camera '{name}' has a usable dolly rig"));
                if simulate {
                    simulate_flight(&mut scene, id, &name, reports);
                }
            }
            Err(err) => {
                reports.warning(format!("camera '{name}': {err}"));
            }
        }
    }
}

#[derive(Default)]
struct CountingRecorder {
    inserted: usize,
}

impl KeyframeRecorder for CountingRecorder {
    fn insert_keyframe(&mut self, _bone: BoneId, _channels: ChannelSet, _frame: i32) {
        self.inserted += 1;
    }
}

/// Scripted flight: fly forward a few ticks, orbit, key a frame, accept.
fn simulate_flight(
    scene: &mut Scene,
    camera: dolly_fly::ObjectId,
    name: &str,
    reports: &mut ReportLog,
) {
    let mut settings = FlySettings::default();
    let mut recorder = CountingRecorder::default();
    let mut ticks = ManualTickSource::default();
    let mut session_reports = ReportLog::default();
    let mut host = HostContext {
        scene,
        settings: &mut settings,
        recorder: &mut recorder,
        ticks: &mut ticks,
        reports: &mut session_reports,
    };
    let mut session = match FlightSession::begin(&mut host, camera, FlightVariant::Dolly) {
        Ok(session) => session,
        Err(err) => {
            reports.error(format!("camera '{name}': simulation failed to start: {err}"));
            return;
        }
    };
    let script = [
        FlightEvent::key("w", true),
        FlightEvent::tick(),
        FlightEvent::tick(),
        FlightEvent::tick(),
        FlightEvent::key("w", false),
        FlightEvent::MouseMove { x: 0.0, y: 0.0 },
        FlightEvent::MouseMove { x: 40.0, y: -20.0 },
        FlightEvent::Wheel { up: true },
        FlightEvent::key("i", true),
        FlightEvent::key("i", false),
        FlightEvent::Accept,
    ];
    for event in script {
        if let Err(err) = session.handle_event(&mut host, event) {
            reports.error(format!("camera '{name}': simulation event failed: {err}"));
            return;
        }
    }
    if recorder.inserted == 0 {
        reports.warning(format!("camera '{name}': simulation recorded no keyframes"));
    } else {
        reports.info(format!(
            "camera '{name}': simulation ok ({} keyframe inserts)",
            recorder.inserted
        ));
    }
}
