use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use serde::Serialize;

use skylens_core::snapshot::RunRecord;
use skylens_core::{
    ContextSnapshot, Engine, FieldConfig, Frame, Gauges, HeadStats, HorizontalCoord, LensKernel,
    TickReport,
};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// TOML or JSON config file. Defaults apply when omitted.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    #[arg(long, default_value_t = 120)]
    pub ticks: u32,

    /// Simulated milliseconds per tick (the engine caps a tick at 100 ms).
    #[arg(long = "dt-ms", default_value_t = 16, value_parser = clap::value_parser!(u64).range(1..))]
    pub dt_ms: u64,

    /// Starting seed (default 42).
    #[arg(long)]
    pub seed: Option<u32>,

    /// `planetary` or `horizontal` (aliases `planet`, `sky`).
    #[arg(long, value_parser = parse_frame)]
    pub frame: Option<Frame>,

    /// Number of reseed steps applied before the first tick.
    #[arg(long, default_value_t = 0)]
    pub reseed: u32,

    #[arg(long = "lens-radius")]
    pub lens_radius: Option<f64>,

    /// Score with the long-tailed lens kernel.
    #[arg(long = "long-tailed")]
    pub long_tailed: bool,

    /// Let the director steer the sky lens.
    #[arg(long)]
    pub director: bool,

    /// Emit one JSON object per tick followed by a summary line.
    #[arg(long)]
    pub jsonl: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            config: None,
            ticks: 120,
            dt_ms: 16,
            seed: None,
            frame: None,
            reseed: 0,
            lens_radius: None,
            long_tailed: false,
            director: false,
            jsonl: false,
        }
    }
}

fn parse_frame(raw: &str) -> std::result::Result<Frame, String> {
    Frame::parse(raw).ok_or_else(|| format!("unknown frame `{raw}` (expected planetary or horizontal)"))
}

/// Compact per-tick line; the full per-point score vector is left out.
#[derive(Debug, Clone, Serialize)]
pub struct TickLine {
    pub tick: u64,
    pub temperature: f64,
    pub head: HeadStats,
    pub gauges: Gauges,
    pub lens_intensity: f64,
    pub lens_hits: usize,
    pub director_target: Option<HorizontalCoord>,
    pub lens_moved: bool,
}

impl From<&TickReport> for TickLine {
    fn from(report: &TickReport) -> Self {
        Self {
            tick: report.tick,
            temperature: report.temperature,
            head: report.head,
            gauges: report.gauges,
            lens_intensity: report.lens.intensity,
            lens_hits: report.lens.scores.iter().filter(|&&s| s > 0.0).count(),
            director_target: report.director_target,
            lens_moved: report.lens_moved,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub snapshot: ContextSnapshot,
    pub lens_intensity: f64,
    pub lens_metric: f64,
    pub records: Vec<RunRecord>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputLine<'a> {
    Tick(&'a TickLine),
    Summary(&'a RunSummary),
}

/// Build the engine described by `args`, before any tick.
pub fn prepare_engine(args: &RunArgs) -> Result<Engine> {
    let config = match &args.config {
        Some(path) => FieldConfig::from_path(path)?,
        None => FieldConfig::default(),
    };
    let mut engine = match args.seed {
        Some(seed) => Engine::with_seed(config, seed),
        None => Engine::new(config),
    };
    if let Some(frame) = args.frame {
        engine.set_frame(frame);
    }
    for _ in 0..args.reseed {
        engine.reseed();
    }
    if let Some(radius) = args.lens_radius {
        if !radius.is_finite() {
            return Err(CliError::invalid(format!("lens radius must be finite, got {radius}")));
        }
        engine.set_lens_radius(radius);
    }
    if args.long_tailed {
        engine.set_lens_kernel(LensKernel::LongTailed);
    }
    engine.set_director_enabled(args.director);
    Ok(engine)
}

pub fn run_session(args: &RunArgs, out: &mut dyn Write) -> Result<RunSummary> {
    let mut engine = prepare_engine(args)?;
    tracing::info!(
        target: "skylens.cli",
        ticks = args.ticks,
        dt_ms = args.dt_ms,
        seed = engine.seed(),
        frame = engine.frame().as_str(),
        points = engine.field().len(),
        "session started"
    );

    let dt = Duration::from_millis(args.dt_ms);
    let mut lens_intensity = 0.0;
    for _ in 0..args.ticks {
        let report = engine.tick(dt);
        lens_intensity = report.lens.intensity;
        if args.jsonl {
            let line = TickLine::from(&report);
            serde_json::to_writer(&mut *out, &OutputLine::Tick(&line))?;
            writeln!(out)?;
        }
    }

    let summary = RunSummary {
        snapshot: engine.snapshot(),
        lens_intensity,
        lens_metric: engine.lens_metric(),
        records: engine.run_log().iter().cloned().collect(),
    };
    if args.jsonl {
        serde_json::to_writer(&mut *out, &OutputLine::Summary(&summary))?;
    } else {
        serde_json::to_writer_pretty(&mut *out, &summary)?;
    }
    writeln!(out)?;

    tracing::info!(
        target: "skylens.cli",
        temperature = summary.snapshot.temperature,
        gauge_g = summary.snapshot.gauges.g,
        gauge_v = summary.snapshot.gauges.v,
        lens_metric = summary.lens_metric,
        "session finished"
    );
    Ok(summary)
}
