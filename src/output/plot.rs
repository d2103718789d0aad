// src/output/plot.rs
use std::{
    fmt::Display,
    fs,
    ops::Range,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{anyhow, Context, Result};
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use tracing::{debug, info, instrument};

use crate::config::PlotConfig;
use crate::process::ResultRow;

const FONT_FAMILY: &str = "sans-serif";
const LINE_COLOR: RGBColor = RGBColor(139, 0, 0);
const BAND_COLOR: RGBColor = RGBColor(128, 128, 128);

static SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// The explicit font if given, else the first system font that exists.
pub fn find_font(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => SYSTEM_FONTS
            .iter()
            .map(|p| PathBuf::from(*p))
            .find(|p| p.is_file()),
    }
}

/// Font file currently registered under [`FONT_FAMILY`].
static REGISTERED_FONT: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Register the chart font unless the same file is already registered.
/// Returns whether a registration happened.
fn load_font(explicit: Option<&Path>) -> Result<bool> {
    let path = find_font(explicit).ok_or_else(|| {
        anyhow!("no usable TrueType font found; pass --font <path to .ttf>")
    })?;
    let mut registered = REGISTERED_FONT.lock().unwrap_or_else(|e| e.into_inner());
    if registered.as_deref() == Some(path.as_path()) {
        return Ok(false);
    }

    let bytes = fs::read(&path).with_context(|| format!("reading font {}", path.display()))?;
    // plotters keeps registered fonts for the life of the process
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    register_font(FONT_FAMILY, FontStyle::Normal, bytes)
        .map_err(|_| anyhow!("{} is not a valid font", path.display()))?;
    debug!(font = %path.display(), "font registered");
    *registered = Some(path);
    Ok(true)
}

/// Create the parent directory of `path` if it has one.
fn prepare_destination(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    Ok(())
}

fn draw_err<E: Display>(e: E) -> anyhow::Error {
    anyhow!("drawing chart failed: {}", e)
}

/// Contiguous runs of years that have a ratio; missing years split the line.
pub fn line_segments(rows: &[ResultRow]) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for row in rows {
        match row.ratio_pct {
            Some(r) => current.push((row.year as f64, r)),
            None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn x_range(rows: &[ResultRow]) -> Range<f64> {
    let first = rows.first().map(|r| r.year as f64);
    let last = rows.last().map(|r| r.year as f64);
    match (first, last) {
        (Some(a), Some(b)) if b > a => a..b,
        (Some(a), _) => (a - 1.0)..(a + 1.0),
        _ => 0.0..1.0,
    }
}

fn y_range(rows: &[ResultRow]) -> Range<f64> {
    let values = rows.iter().filter_map(|r| r.ratio_pct);
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() {
        return 0.0..100.0;
    }
    let pad = ((hi - lo) * 0.05).max(1.0);
    (lo - pad)..(hi + pad)
}

/// Render the ratio series as a PNG line chart with shaded bands.
#[instrument(level = "info", skip(rows, cfg), fields(path = %path.display()))]
pub fn plot_ratio(rows: &[ResultRow], path: &Path, cfg: &PlotConfig) -> Result<()> {
    prepare_destination(path)?;
    load_font(cfg.font.as_deref())?;

    let xs = x_range(rows);
    let ys = y_range(rows);
    let root = BitMapBackend::new(path, cfg.pixel_size()).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;
    let area = root.titled(&cfg.title, (FONT_FAMILY, 40)).map_err(draw_err)?;

    let mut chart = ChartBuilder::on(&area)
        .caption(&cfg.subtitle, (FONT_FAMILY, 28))
        .margin(30)
        .x_label_area_size(80)
        .y_label_area_size(100)
        .build_cartesian_2d(xs.clone(), ys.clone())
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_desc(cfg.x_label.as_str())
        .y_desc(cfg.y_label.as_str())
        .label_style((FONT_FAMILY, 24))
        .axis_desc_style((FONT_FAMILY, 28))
        .bold_line_style(BLACK.mix(0.3))
        .light_line_style(BLACK.mix(0.08))
        .x_label_formatter(&|x| format!("{:.0}", x))
        .draw()
        .map_err(draw_err)?;

    let bands = cfg.bands.iter().filter_map(|&(from, to)| {
        let x0 = (from as f64).max(xs.start);
        let x1 = (to as f64).min(xs.end);
        (x0 < x1).then(|| {
            Rectangle::new(
                [(x0, ys.start), (x1, ys.end)],
                BAND_COLOR.mix(0.2).filled(),
            )
        })
    });
    chart.draw_series(bands).map_err(draw_err)?;

    for segment in line_segments(rows) {
        chart
            .draw_series(LineSeries::new(segment, LINE_COLOR.stroke_width(2)))
            .map_err(draw_err)?;
    }

    root.present().map_err(draw_err)?;
    info!("chart written");
    Ok(())
}
