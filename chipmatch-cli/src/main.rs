use clap::Parser;
use chipmatch::bank::TemplateSource;
use chipmatch::image::io::load_gray_image;
use chipmatch::model::{TemplateId, ViaDirection};
use chipmatch::search::RegularGrid;
use chipmatch::{
    detect_vias, run_template_match, run_wire_match, CandidateSource, GridConfig, GridMode,
    MatchCandidate, Orientation, OrientationMode, Rect, RunContext, TemplateMatchConfig,
    ViaMatchConfig, WireMatchConfig, WirePolyline,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "chipmatch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum DetectorConfig {
    #[default]
    Gates,
    Vias,
    Wires,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum OrientationConfig {
    #[default]
    Any,
    Normal,
    FlipLeftRight,
    FlipUpDown,
    FlipBoth,
}

impl From<OrientationConfig> for OrientationMode {
    fn from(value: OrientationConfig) -> Self {
        match value {
            OrientationConfig::Any => OrientationMode::Any,
            OrientationConfig::Normal => OrientationMode::Normal,
            OrientationConfig::FlipLeftRight => OrientationMode::FlipLeftRight,
            OrientationConfig::FlipUpDown => OrientationMode::FlipUpDown,
            OrientationConfig::FlipBoth => OrientationMode::FlipBoth,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum GridModeConfig {
    #[default]
    Default,
    AlongGridRows,
    AlongGridColumns,
}

impl From<GridModeConfig> for GridMode {
    fn from(value: GridModeConfig) -> Self {
        match value {
            GridModeConfig::Default => GridMode::Default,
            GridModeConfig::AlongGridRows => GridMode::AlongGridRows,
            GridModeConfig::AlongGridColumns => GridMode::AlongGridColumns,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ViaDirectionConfig {
    #[default]
    Up,
    Down,
}

impl From<ViaDirectionConfig> for ViaDirection {
    fn from(value: ViaDirectionConfig) -> Self {
        match value {
            ViaDirectionConfig::Up => ViaDirection::Up,
            ViaDirectionConfig::Down => ViaDirection::Down,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GateConfigJson {
    scale_down: f32,
    climb_threshold: f32,
    detect_threshold: f32,
    max_step: usize,
    orientation: OrientationConfig,
    grid_mode: GridModeConfig,
    max_results: usize,
    min_var_i: f32,
    parallel: bool,
}

impl Default for GateConfigJson {
    fn default() -> Self {
        let cfg = TemplateMatchConfig::default();
        Self {
            scale_down: cfg.scale_down,
            climb_threshold: cfg.climb_threshold,
            detect_threshold: cfg.detect_threshold,
            max_step: cfg.max_step,
            orientation: OrientationConfig::Any,
            grid_mode: GridModeConfig::Default,
            max_results: cfg.max_results,
            min_var_i: cfg.min_var_i,
            parallel: cfg.parallel,
        }
    }
}

impl From<&GateConfigJson> for TemplateMatchConfig {
    fn from(value: &GateConfigJson) -> Self {
        Self {
            scale_down: value.scale_down,
            climb_threshold: value.climb_threshold,
            detect_threshold: value.detect_threshold,
            max_step: value.max_step,
            orientation: value.orientation.into(),
            grid_mode: value.grid_mode.into(),
            max_results: value.max_results,
            min_var_i: value.min_var_i,
            parallel: value.parallel,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct GridLinesJson {
    offset: f32,
    spacing: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GridJson {
    rows: Option<GridLinesJson>,
    columns: Option<GridLinesJson>,
}

impl From<&GridJson> for GridConfig {
    fn from(value: &GridJson) -> Self {
        let lines = |g: GridLinesJson| RegularGrid::new(g.offset, g.spacing);
        Self {
            rows: value.rows.map(lines),
            columns: value.columns.map(lines),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ViaConfigJson {
    direction: ViaDirectionConfig,
    diameter: f32,
    scale_down: f32,
    climb_threshold: f32,
    detect_threshold: f32,
    max_step: usize,
    max_count: usize,
    min_var_i: f32,
}

impl Default for ViaConfigJson {
    fn default() -> Self {
        let cfg = ViaMatchConfig::default();
        Self {
            direction: ViaDirectionConfig::Up,
            diameter: cfg.diameter,
            scale_down: cfg.scale_down,
            climb_threshold: cfg.climb_threshold,
            detect_threshold: cfg.detect_threshold,
            max_step: cfg.max_step,
            max_count: cfg.max_count,
            min_var_i: cfg.min_var_i,
        }
    }
}

impl From<&ViaConfigJson> for ViaMatchConfig {
    fn from(value: &ViaConfigJson) -> Self {
        Self {
            direction: value.direction.into(),
            diameter: value.diameter,
            scale_down: value.scale_down,
            climb_threshold: value.climb_threshold,
            detect_threshold: value.detect_threshold,
            max_step: value.max_step,
            max_count: value.max_count,
            min_var_i: value.min_var_i,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct WireConfigJson {
    scale_down: f32,
    median_width: usize,
    gaussian_sigma: f32,
    min_edge_magnitude: f32,
    diameter: f32,
    diameter_tolerance: f32,
    min_length: f32,
    simplify_tolerance: f32,
}

impl Default for WireConfigJson {
    fn default() -> Self {
        let cfg = WireMatchConfig::default();
        Self {
            scale_down: cfg.scale_down,
            median_width: cfg.median_width,
            gaussian_sigma: cfg.gaussian_sigma,
            min_edge_magnitude: cfg.min_edge_magnitude,
            diameter: cfg.diameter,
            diameter_tolerance: cfg.diameter_tolerance,
            min_length: cfg.min_length,
            simplify_tolerance: cfg.simplify_tolerance,
        }
    }
}

impl From<&WireConfigJson> for WireMatchConfig {
    fn from(value: &WireConfigJson) -> Self {
        Self {
            scale_down: value.scale_down,
            median_width: value.median_width,
            gaussian_sigma: value.gaussian_sigma,
            min_edge_magnitude: value.min_edge_magnitude,
            diameter: value.diameter,
            diameter_tolerance: value.diameter_tolerance,
            min_length: value.min_length,
            simplify_tolerance: value.simplify_tolerance,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct RegionJson {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    detector: DetectorConfig,
    image_path: String,
    region: Option<RegionJson>,
    output_path: Option<String>,
    templates: Vec<String>,
    gates: GateConfigJson,
    grid: GridJson,
    vias: ViaConfigJson,
    wires: WireConfigJson,
}

#[derive(Debug, Serialize)]
struct CandidateRecord {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    score: f32,
    orientation: &'static str,
    template: Option<String>,
}

fn orientation_name(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::Undefined => "undefined",
        Orientation::Normal => "normal",
        Orientation::FlipLeftRight => "flip_left_right",
        Orientation::FlipUpDown => "flip_up_down",
        Orientation::FlipBoth => "flip_both",
    }
}

fn candidate_record(candidate: &MatchCandidate, templates: &[String]) -> CandidateRecord {
    let template = match candidate.source {
        CandidateSource::Template(id) => templates.get(id.0 as usize).cloned(),
        CandidateSource::Via(_) => None,
    };
    CandidateRecord {
        x: candidate.x,
        y: candidate.y,
        width: candidate.width,
        height: candidate.height,
        score: candidate.score,
        orientation: orientation_name(candidate.orientation),
        template,
    }
}

#[derive(Debug, Serialize)]
struct WireRecord {
    points: Vec<[f32; 2]>,
    diameter: f32,
}

impl From<WirePolyline> for WireRecord {
    fn from(value: WirePolyline) -> Self {
        Self {
            points: value.points,
            diameter: value.diameter,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Items {
    Candidates(Vec<CandidateRecord>),
    Wires(Vec<WireRecord>),
}

#[derive(Debug, Serialize)]
struct Output {
    cancelled: bool,
    count: usize,
    items: Items,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("chipmatch=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.image_path.is_empty() {
        return Err("image_path must be set in the config".into());
    }

    let image = load_gray_image(&config.image_path)?;
    let region = config.region.map_or(Rect::full(image.width(), image.height()), |r| {
        Rect::new(r.x, r.y, r.width, r.height)
    });
    let ctx = RunContext::new();

    let output = match config.detector {
        DetectorConfig::Gates => {
            if config.templates.is_empty() {
                return Err("templates must list at least one template image".into());
            }
            let bitmaps = config
                .templates
                .iter()
                .map(load_gray_image)
                .collect::<Result<Vec<_>, _>>()?;
            let sources: Vec<TemplateSource<'_>> = bitmaps
                .iter()
                .enumerate()
                .map(|(idx, img)| TemplateSource {
                    source: CandidateSource::Template(TemplateId(idx as u64)),
                    image: img.view(),
                })
                .collect();
            let found = run_template_match(
                image.view(),
                region,
                &sources,
                &(&config.gates).into(),
                &(&config.grid).into(),
                &ctx,
            )?;
            let records: Vec<_> = found
                .items
                .iter()
                .map(|c| candidate_record(c, &config.templates))
                .collect();
            Output {
                cancelled: found.cancelled,
                count: records.len(),
                items: Items::Candidates(records),
            }
        }
        DetectorConfig::Vias => {
            let found = detect_vias(image.view(), region, &(&config.vias).into(), &ctx)?;
            let records: Vec<_> = found
                .items
                .iter()
                .map(|c| candidate_record(c, &config.templates))
                .collect();
            Output {
                cancelled: found.cancelled,
                count: records.len(),
                items: Items::Candidates(records),
            }
        }
        DetectorConfig::Wires => {
            let found = run_wire_match(image.view(), region, &(&config.wires).into(), &ctx)?;
            let records: Vec<WireRecord> = found.items.into_iter().map(WireRecord::from).collect();
            Output {
                cancelled: found.cancelled,
                count: records.len(),
                items: Items::Wires(records),
            }
        }
    };

    let json = serde_json::to_string_pretty(&output)?;
    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
