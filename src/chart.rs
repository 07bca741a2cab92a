use std::fmt::Write as _;
use std::path::PathBuf;

use tracing::debug;

use crate::errors::{Error, Result};
use crate::models::UserLabel;
use crate::series::{ProgressView, format_percent};

/// Which dataset shape the live chart is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartMode {
    /// Completion percentage per day, one line per user.
    TimeSeries,
    /// One bar per user with the latest snapshot value.
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickUnit {
    Day,
    Week,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    /// Timeframes longer than this switch the x axis to weekly ticks.
    pub weekly_tick_threshold_days: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            weekly_tick_threshold_days: 31,
            width: 600,
            height: 260,
        }
    }
}

/// Everything a backend needs to draw one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub mode: ChartMode,
    pub tick_unit: TickUnit,
    pub width: u32,
    pub height: u32,
    pub axis_labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub stroke: &'static str,
    pub fill: &'static str,
    pub points: Vec<Option<f64>>,
}

/// Identifies one mounted chart instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartHandle {
    pub id: u64,
}

pub trait ChartBackend {
    fn mount(&mut self, spec: &ChartSpec) -> Result<ChartHandle>;
    fn dispose(&mut self, handle: &ChartHandle);
}

/// Owns at most one live chart. Every render disposes the previous
/// instance before mounting the next, so repeated timeframe changes
/// can never stack instances.
pub struct ChartController<B: ChartBackend> {
    backend: B,
    config: ChartConfig,
    live: Option<ChartHandle>,
    mode: Option<ChartMode>,
}

impl<B: ChartBackend> ChartController<B> {
    pub fn new(backend: B, config: ChartConfig) -> Self {
        Self {
            backend,
            config,
            live: None,
            mode: None,
        }
    }

    pub fn render(&mut self, view: &ProgressView, mode: ChartMode) -> Result<&ChartHandle> {
        let spec = self.spec_for(view, mode);
        if let Some(previous) = self.live.take() {
            self.backend.dispose(&previous);
        }
        let handle = self.backend.mount(&spec)?;
        self.mode = Some(mode);
        debug!(id = handle.id, ?mode, "chart mounted");
        Ok(self.live.insert(handle))
    }

    pub fn teardown(&mut self) {
        if let Some(handle) = self.live.take() {
            self.backend.dispose(&handle);
        }
        self.mode = None;
    }

    pub fn is_rendered(&self) -> bool {
        self.live.is_some()
    }

    pub fn mode(&self) -> Option<ChartMode> {
        self.mode
    }

    pub fn tick_unit(&self, timeframe_days: u32) -> TickUnit {
        if timeframe_days > self.config.weekly_tick_threshold_days {
            TickUnit::Week
        } else {
            TickUnit::Day
        }
    }

    fn spec_for(&self, view: &ProgressView, mode: ChartMode) -> ChartSpec {
        let tick_unit = self.tick_unit(view.timeframe_days);
        let (axis_labels, datasets) = match mode {
            ChartMode::TimeSeries => {
                let labels = view
                    .axis
                    .iter()
                    .map(|date| date.format("%b %-d").to_string())
                    .collect();
                let datasets = view
                    .series
                    .iter()
                    .map(|series| Dataset {
                        label: dataset_label(series.label),
                        stroke: stroke_color(series.label),
                        fill: fill_color(series.label),
                        points: series.values.clone(),
                    })
                    .collect();
                (labels, datasets)
            }
            ChartMode::Snapshot => {
                let labels = view
                    .snapshots
                    .iter()
                    .map(|(label, _)| label.as_str().to_string())
                    .collect();
                let datasets = view
                    .snapshots
                    .iter()
                    .map(|(label, snapshot)| Dataset {
                        label: dataset_label(*label),
                        stroke: stroke_color(*label),
                        fill: fill_color(*label),
                        points: vec![Some(snapshot.completion_percentage)],
                    })
                    .collect();
                (labels, datasets)
            }
        };

        ChartSpec {
            mode,
            tick_unit,
            width: self.config.width,
            height: self.config.height,
            axis_labels,
            datasets,
        }
    }
}

fn dataset_label(label: UserLabel) -> String {
    format!("{}'s Progress", label.as_str())
}

/// Colors are keyed to user identity and never change across renders.
fn stroke_color(label: UserLabel) -> &'static str {
    match label {
        UserLabel::G => "rgba(72, 187, 120, 1)",
        UserLabel::A => "rgba(66, 153, 225, 1)",
    }
}

fn fill_color(label: UserLabel) -> &'static str {
    match label {
        UserLabel::G => "rgba(72, 187, 120, 0.2)",
        UserLabel::A => "rgba(66, 153, 225, 0.2)",
    }
}

/// Writes each mounted chart as an SVG file at a fixed target path.
/// Mounting without a target is the missing-mount-point failure.
pub struct SvgBackend {
    target: Option<PathBuf>,
    next_id: u64,
}

impl SvgBackend {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: Some(target.into()),
            next_id: 1,
        }
    }

    pub fn unmounted() -> Self {
        Self {
            target: None,
            next_id: 1,
        }
    }
}

impl ChartBackend for SvgBackend {
    fn mount(&mut self, spec: &ChartSpec) -> Result<ChartHandle> {
        let Some(target) = self.target.as_ref() else {
            return Err(Error::render("no chart mount point configured"));
        };
        let svg = render_svg(spec);
        std::fs::write(target, svg)
            .map_err(|err| Error::render(format!("write {}: {err}", target.display())))?;
        let handle = ChartHandle { id: self.next_id };
        self.next_id += 1;
        Ok(handle)
    }

    fn dispose(&mut self, _handle: &ChartHandle) {
        // The target file is simply overwritten by the next mount.
    }
}

const PADDING_X: f64 = 44.0;
const PADDING_Y: f64 = 34.0;
const TOP: f64 = 24.0;
const Y_TICKS: u32 = 4;

/// Percentage scale is fixed to 0..100 so renders are comparable
/// across timeframes.
pub fn render_svg(spec: &ChartSpec) -> String {
    let width = f64::from(spec.width);
    let height = f64::from(spec.height);
    let y = |value: f64| height - PADDING_Y - value / 100.0 * (height - TOP - PADDING_Y);

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {} {}\" role=\"img\">\n",
        spec.width, spec.height
    );

    let mut legend_x = PADDING_X;
    for dataset in &spec.datasets {
        let _ = write!(
            svg,
            "<rect x=\"{legend_x:.2}\" y=\"6\" width=\"10\" height=\"10\" fill=\"{}\"/>\n",
            dataset.stroke
        );
        let _ = write!(
            svg,
            "<text class=\"chart-label\" x=\"{:.2}\" y=\"15\">{}</text>\n",
            legend_x + 14.0,
            dataset.label
        );
        legend_x += 120.0;
    }

    for tick in 0..=Y_TICKS {
        let value = f64::from(tick) * 100.0 / f64::from(Y_TICKS);
        let y_pos = y(value);
        let _ = write!(
            svg,
            "<line class=\"chart-grid\" x1=\"{PADDING_X}\" y1=\"{y_pos:.2}\" x2=\"{:.2}\" y2=\"{y_pos:.2}\"/>\n",
            width - PADDING_X
        );
        let _ = write!(
            svg,
            "<text class=\"chart-label\" x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\">{}%</text>\n",
            PADDING_X - 10.0,
            y_pos + 4.0,
            value as u32
        );
    }

    match spec.mode {
        ChartMode::TimeSeries => render_lines(&mut svg, spec, width, &y),
        ChartMode::Snapshot => render_bars(&mut svg, spec, width, height, &y),
    }

    let count = spec.axis_labels.len();
    let x_step = if count > 1 {
        (width - PADDING_X * 2.0) / (count as f64 - 1.0)
    } else {
        0.0
    };
    let label_every = match spec.tick_unit {
        TickUnit::Day if count > 8 => 2,
        TickUnit::Day => 1,
        TickUnit::Week => 7,
    };
    for (index, label) in spec.axis_labels.iter().enumerate() {
        if index % label_every != 0 {
            continue;
        }
        let x = PADDING_X + index as f64 * x_step;
        let _ = write!(
            svg,
            "<text class=\"chart-label\" x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"middle\">{label}</text>\n",
            height - PADDING_Y + 18.0
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn render_lines(svg: &mut String, spec: &ChartSpec, width: f64, y: &dyn Fn(f64) -> f64) {
    let count = spec.axis_labels.len();
    let x_step = if count > 1 {
        (width - PADDING_X * 2.0) / (count as f64 - 1.0)
    } else {
        0.0
    };
    let x = |index: usize| PADDING_X + index as f64 * x_step;

    for dataset in &spec.datasets {
        let mut path = String::new();
        let mut in_segment = false;
        for (index, value) in dataset.points.iter().enumerate() {
            match value {
                Some(value) => {
                    let command = if in_segment { 'L' } else { 'M' };
                    let _ = write!(path, "{command} {:.2} {:.2} ", x(index), y(*value));
                    in_segment = true;
                }
                // A gap breaks the line rather than plotting 0.
                None => in_segment = false,
            }
        }
        let _ = write!(
            svg,
            "<path fill=\"none\" stroke=\"{}\" stroke-width=\"3\" d=\"{}\"/>\n",
            dataset.stroke,
            path.trim_end()
        );
        for (index, value) in dataset.points.iter().enumerate() {
            let Some(value) = value else { continue };
            let _ = write!(
                svg,
                "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"4\" fill=\"white\" stroke=\"{}\" stroke-width=\"2\">\
                 <title>{}: {}%</title></circle>\n",
                x(index),
                y(*value),
                dataset.stroke,
                dataset.label,
                format_percent(*value)
            );
        }
    }
}

fn render_bars(
    svg: &mut String,
    spec: &ChartSpec,
    width: f64,
    height: f64,
    y: &dyn Fn(f64) -> f64,
) {
    let count = spec.datasets.len().max(1);
    let slot = (width - PADDING_X * 2.0) / count as f64;
    let bar_width = slot * 0.5;

    for (index, dataset) in spec.datasets.iter().enumerate() {
        let value = dataset.points.first().copied().flatten().unwrap_or(0.0);
        let x = PADDING_X + slot * (index as f64 + 0.5) - bar_width / 2.0;
        let top = y(value);
        let _ = write!(
            svg,
            "<rect x=\"{x:.2}\" y=\"{top:.2}\" width=\"{bar_width:.2}\" height=\"{:.2}\" \
             fill=\"{}\" stroke=\"{}\" stroke-width=\"2\">\
             <title>{}: {}%</title></rect>\n",
            (height - PADDING_Y - top).max(0.0),
            dataset.fill,
            dataset.stroke,
            dataset.label,
            format_percent(value)
        );
    }
}
