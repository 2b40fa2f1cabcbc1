use std::cell::Cell;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::time::{Duration as StdDuration, Instant};

use chrono::{Datelike, Duration, TimeZone};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine, Points};
use serde::{Deserialize, Serialize};

use crate::domain::{DAY_MS, Reading, local_datetime};
use crate::store::RecordStore;
use crate::window::{TimeWindow, WindowRange};

const Y_FLOOR: f64 = 40.0;
const Y_MIN_CEILING: f64 = 80.0;
const Y_MAX_CEILING: f64 = 250.0;
const Y_HEADROOM: f64 = 10.0;
const Y_GUTTER: f64 = 5.0;
const X_LABEL_ROWS: f64 = 1.0;
const LABEL_GAP: f64 = 1.0;
const DAY_SHADE: Color = Color::Rgb(30, 32, 38);

pub const NO_DATA_MESSAGE: &str = "No readings yet";
pub const NO_WINDOW_DATA_MESSAGE: &str = "No readings in this window";
pub const CHART_UNAVAILABLE_MESSAGE: &str = "Chart unavailable";

/// A clinical threshold shaded from `value` up to the next threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceBand {
    pub value: u16,
    pub color: String,
    pub label: String,
}

pub fn default_reference_bands() -> Vec<ReferenceBand> {
    [
        (120, "yellow", "Elevated"),
        (130, "light_red", "Stage 1"),
        (140, "red", "Stage 2"),
        (180, "magenta", "Crisis"),
    ]
    .into_iter()
    .map(|(value, color, label)| ReferenceBand {
        value,
        color: color.to_string(),
        label: label.to_string(),
    })
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartPoint {
    pub ts: i64,
    pub systolic: Option<u16>,
    pub diastolic: Option<u16>,
    pub heart_rate: Option<u16>,
}

impl ChartPoint {
    fn value(&self, series: Series) -> Option<u16> {
        match series {
            Series::Systolic => self.systolic,
            Series::Diastolic => self.diastolic,
            Series::HeartRate => self.heart_rate,
        }
    }

    fn max_value(&self) -> Option<u16> {
        [self.systolic, self.diastolic, self.heart_rate]
            .into_iter()
            .flatten()
            .max()
    }
}

/// Plot-ready points sorted by time. Readings without any vital are skipped.
pub fn chart_points(readings: &[Reading]) -> Vec<ChartPoint> {
    let mut points = readings
        .iter()
        .filter(|reading| reading.timestamp > 0 && reading.has_vitals())
        .map(|reading| ChartPoint {
            ts: reading.timestamp,
            systolic: reading.systolic,
            diastolic: reading.diastolic,
            heart_rate: reading.heart_rate,
        })
        .collect::<Vec<_>>();
    points.sort_by_key(|point| point.ts);
    points
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Systolic,
    Diastolic,
    HeartRate,
}

impl Series {
    pub const ALL: [Series; 3] = [Series::Systolic, Series::Diastolic, Series::HeartRate];

    pub fn label(self) -> &'static str {
        match self {
            Series::Systolic => "SYS",
            Series::Diastolic => "DIA",
            Series::HeartRate => "HR",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Series::Systolic => Color::LightRed,
            Series::Diastolic => Color::LightBlue,
            Series::HeartRate => Color::LightGreen,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartError {
    EmptySurface { width: f64, height: f64 },
    BadPixelRatio(f64),
}

impl Display for ChartError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartError::EmptySurface { width, height } => {
                write!(f, "chart surface too small ({width}x{height})")
            }
            ChartError::BadPixelRatio(ratio) => write!(f, "invalid pixel ratio {ratio}"),
        }
    }
}

impl std::error::Error for ChartError {}

/// Drawing surface size. Geometry stays in css units (terminal cells);
/// the backing store holds `ceil(css * pixel_ratio)` dots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMetrics {
    pub css_width: f64,
    pub css_height: f64,
    pub pixel_ratio: f64,
    pub backing_width: u32,
    pub backing_height: u32,
}

impl SurfaceMetrics {
    pub fn new(css_width: f64, css_height: f64, pixel_ratio: f64) -> Result<Self, ChartError> {
        if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
            return Err(ChartError::BadPixelRatio(pixel_ratio));
        }
        if css_width < Y_GUTTER + 2.0 || css_height < X_LABEL_ROWS + 2.0 {
            return Err(ChartError::EmptySurface {
                width: css_width,
                height: css_height,
            });
        }

        Ok(Self {
            css_width,
            css_height,
            pixel_ratio,
            backing_width: (css_width * pixel_ratio).ceil() as u32,
            backing_height: (css_height * pixel_ratio).ceil() as u32,
        })
    }

    pub fn for_area(area: Rect, pixel_ratio: f64) -> Result<Self, ChartError> {
        Self::new(f64::from(area.width), f64::from(area.height), pixel_ratio)
    }

    pub fn scale(&self) -> f64 {
        self.pixel_ratio
    }

    /// Rounds a css coordinate onto the backing dot grid.
    pub fn snap(&self, value: f64) -> f64 {
        (value * self.scale()).round() / self.scale()
    }

    fn plot_left(&self) -> f64 {
        Y_GUTTER
    }

    pub fn plot_width(&self) -> f64 {
        self.plot_right() - self.plot_left()
    }

    fn plot_right(&self) -> f64 {
        self.css_width - 1.0
    }

    fn plot_top(&self) -> f64 {
        0.0
    }

    fn plot_bottom(&self) -> f64 {
        self.css_height - X_LABEL_ROWS
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YBound {
    pub min: f64,
    pub max: f64,
}

pub fn nice_ceil_10(value: f64) -> f64 {
    (value / 10.0).ceil() * 10.0
}

pub fn y_bound(points: &[ChartPoint]) -> YBound {
    let observed = points
        .iter()
        .filter_map(ChartPoint::max_value)
        .max()
        .map(f64::from)
        .unwrap_or(0.0);
    let ceiling = nice_ceil_10((observed + Y_HEADROOM).min(Y_MAX_CEILING));
    YBound {
        min: Y_FLOOR,
        max: ceiling.max(Y_MIN_CEILING),
    }
}

pub fn tick_step(bound: YBound) -> u16 {
    if bound.max - bound.min <= 100.0 { 10 } else { 20 }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandRect {
    pub y_top: f64,
    pub y_bottom: f64,
    pub color: Color,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayBand {
    pub x_start: f64,
    pub x_end: f64,
    pub shaded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisLabel {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

impl AxisLabel {
    fn width(&self) -> f64 {
        self.text.chars().count() as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub series: Series,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartScene {
    pub metrics: SurfaceMetrics,
    pub range: Option<WindowRange>,
    pub bound: YBound,
    pub day_bands: Vec<DayBand>,
    pub reference_bands: Vec<BandRect>,
    pub grid: Vec<AxisLabel>,
    pub x_labels: Vec<AxisLabel>,
    pub series: Vec<Polyline>,
    pub message: Option<String>,
}

impl ChartScene {
    fn empty(metrics: SurfaceMetrics, bound: YBound, message: &str) -> Self {
        Self {
            metrics,
            range: None,
            bound,
            day_bands: Vec::new(),
            reference_bands: Vec::new(),
            grid: Vec::new(),
            x_labels: Vec::new(),
            series: Vec::new(),
            message: Some(message.to_string()),
        }
    }
}

struct Projection {
    metrics: SurfaceMetrics,
    range: WindowRange,
    bound: YBound,
}

impl Projection {
    fn x(&self, ts: i64) -> f64 {
        let left = self.metrics.plot_left();
        let width = self.metrics.plot_right() - left;
        let span = self.range.span();
        let x = if span <= 0 {
            left + width / 2.0
        } else {
            left + (ts - self.range.start) as f64 / span as f64 * width
        };
        self.metrics.snap(x)
    }

    fn y(&self, value: f64) -> f64 {
        let top = self.metrics.plot_top();
        let height = self.metrics.plot_bottom() - top;
        let clamped = value.clamp(self.bound.min, self.bound.max);
        let y = top + (self.bound.max - clamped) / (self.bound.max - self.bound.min) * height;
        self.metrics.snap(y)
    }
}

/// Lays out everything the chart draws for the current window.
pub fn build_scene(
    points: &[ChartPoint],
    window: &mut TimeWindow,
    bands: &[ReferenceBand],
    metrics: SurfaceMetrics,
) -> ChartScene {
    let Some(range) = window.compute_window(points.iter().map(|point| point.ts)) else {
        return ChartScene::empty(metrics, y_bound(&[]), NO_DATA_MESSAGE);
    };

    let visible = points
        .iter()
        .filter(|point| range.contains(point.ts))
        .copied()
        .collect::<Vec<_>>();
    let bound = y_bound(&visible);
    if visible.is_empty() {
        let mut scene = ChartScene::empty(metrics, bound, NO_WINDOW_DATA_MESSAGE);
        scene.range = Some(range);
        return scene;
    }

    let projection = Projection {
        metrics,
        range,
        bound,
    };

    ChartScene {
        metrics,
        range: Some(range),
        bound,
        day_bands: day_bands(&projection),
        reference_bands: reference_bands(&projection, bands),
        grid: grid_labels(&projection),
        x_labels: x_labels(&projection),
        series: series_lines(&projection, &visible),
        message: None,
    }
}

fn day_bands(projection: &Projection) -> Vec<DayBand> {
    let range = projection.range;
    let Some(start) = local_datetime(range.start) else {
        return Vec::new();
    };

    let mut bands = Vec::new();
    let mut day = start.date_naive();
    loop {
        let Some(midnight) = day
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| start.timezone().from_local_datetime(&naive).earliest())
        else {
            break;
        };
        let day_start = midnight.timestamp_millis().max(range.start);
        if day_start > range.end {
            break;
        }
        let day_end = (midnight + Duration::days(1))
            .timestamp_millis()
            .min(range.end);

        bands.push(DayBand {
            x_start: projection.x(day_start),
            x_end: projection.x(day_end),
            shaded: day.num_days_from_ce() % 2 == 1,
        });

        let Some(next) = day.succ_opt() else {
            break;
        };
        day = next;
        if bands.len() > (range.span() / DAY_MS) as usize + 2 {
            break;
        }
    }
    bands
}

fn reference_bands(projection: &Projection, bands: &[ReferenceBand]) -> Vec<BandRect> {
    let bound = projection.bound;
    let mut ordered = bands.to_vec();
    ordered.sort_by_key(|band| band.value);

    let mut rects = Vec::new();
    for (index, band) in ordered.iter().enumerate() {
        let low = f64::from(band.value);
        if bound.max < low {
            continue;
        }
        let high = ordered
            .get(index + 1)
            .map(|next| f64::from(next.value))
            .unwrap_or(bound.max)
            .min(bound.max);
        // A threshold sitting exactly on bound.max keeps a zero-height band so its label still shows.
        if high < low.max(bound.min) {
            continue;
        }
        rects.push(BandRect {
            y_top: projection.y(high),
            y_bottom: projection.y(low.max(bound.min)),
            color: color_from_name(&band.color).unwrap_or(Color::DarkGray),
            label: band.label.clone(),
        });
    }
    rects
}

fn grid_labels(projection: &Projection) -> Vec<AxisLabel> {
    let bound = projection.bound;
    let step = f64::from(tick_step(bound));
    let mut labels = Vec::new();
    let mut value = bound.min;
    while value <= bound.max {
        labels.push(AxisLabel {
            x: 0.0,
            y: projection.y(value),
            text: format!("{value:>3.0}"),
        });
        value += step;
    }
    labels
}

fn x_labels(projection: &Projection) -> Vec<AxisLabel> {
    let metrics = projection.metrics;
    let range = projection.range;
    let y = metrics.css_height - 1.0;
    let format = if range.span() < 2 * DAY_MS {
        "%b %d %H:%M"
    } else {
        "%b %d"
    };
    let text_for = |ts: i64| {
        local_datetime(ts)
            .map(|datetime| datetime.format(format).to_string())
            .unwrap_or_default()
    };

    let start = AxisLabel {
        x: metrics.plot_left(),
        y,
        text: text_for(range.start),
    };
    let mut end = AxisLabel {
        x: 0.0,
        y,
        text: text_for(range.end),
    };
    end.x = (metrics.plot_right() + 1.0 - end.width()).max(0.0);
    let mut mid = AxisLabel {
        x: 0.0,
        y,
        text: text_for(range.start + range.span() / 2),
    };
    mid.x = (metrics.plot_left() + metrics.plot_right()) / 2.0 - mid.width() / 2.0;

    let mut labels = vec![start.clone()];
    let collides_left = mid.x < start.x + start.width() + LABEL_GAP;
    let collides_right = mid.x + mid.width() + LABEL_GAP > end.x;
    if !collides_left && !collides_right {
        labels.push(mid);
    }
    if end.x >= start.x + start.width() + LABEL_GAP {
        labels.push(end);
    }
    labels
}

fn series_lines(projection: &Projection, visible: &[ChartPoint]) -> Vec<Polyline> {
    let mut lines = Vec::new();
    for series in Series::ALL {
        let mut current = Vec::new();
        for point in visible {
            match point.value(series) {
                Some(value) => current.push((projection.x(point.ts), projection.y(f64::from(value)))),
                None => {
                    if !current.is_empty() {
                        lines.push(Polyline {
                            series,
                            points: std::mem::take(&mut current),
                        });
                    }
                }
            }
        }
        if !current.is_empty() {
            lines.push(Polyline {
                series,
                points: current,
            });
        }
    }
    lines
}

/// Busy flag shared by renders; a render that finds it set is dropped.
#[derive(Debug, Clone, Default)]
pub struct RenderGate {
    busy: Rc<Cell<bool>>,
}

impl RenderGate {
    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    pub fn try_begin(&self, loading: &LoadingIndicator) -> Option<RenderPass> {
        if self.busy.replace(true) {
            return None;
        }
        Some(RenderPass {
            busy: Rc::clone(&self.busy),
            loading: loading.clone(),
        })
    }
}

/// Clears the busy flag and the loading indicator when dropped, including on unwind.
pub struct RenderPass {
    busy: Rc<Cell<bool>>,
    loading: LoadingIndicator,
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        self.busy.set(false);
        self.loading.hide();
    }
}

#[derive(Debug, Clone)]
pub struct LoadingIndicator {
    shown_since: Rc<Cell<Option<Instant>>>,
    watchdog: StdDuration,
}

impl LoadingIndicator {
    pub fn new(watchdog: StdDuration) -> Self {
        Self {
            shown_since: Rc::new(Cell::new(None)),
            watchdog,
        }
    }

    pub fn show(&self, now: Instant) {
        self.shown_since.set(Some(now));
    }

    pub fn hide(&self) {
        self.shown_since.set(None);
    }

    pub fn is_visible(&self) -> bool {
        self.shown_since.get().is_some()
    }

    /// Forces the indicator off once it has been up longer than the watchdog.
    pub fn tick(&self, now: Instant) -> bool {
        match self.shown_since.get() {
            Some(since) if now.saturating_duration_since(since) >= self.watchdog => {
                log::warn!("chart loading indicator forced off after {:?}", self.watchdog);
                self.hide();
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Drawn,
    Skipped,
    Failed(ChartError),
}

pub struct ChartRenderer {
    pub window: TimeWindow,
    bands: Vec<ReferenceBand>,
    pixel_ratio: f64,
    gate: RenderGate,
    loading: LoadingIndicator,
    scene: Option<ChartScene>,
    failure: Option<ChartError>,
}

impl ChartRenderer {
    pub fn new(
        window: TimeWindow,
        bands: Vec<ReferenceBand>,
        pixel_ratio: f64,
        watchdog: StdDuration,
    ) -> Self {
        Self {
            window,
            bands,
            pixel_ratio,
            gate: RenderGate::default(),
            loading: LoadingIndicator::new(watchdog),
            scene: None,
            failure: None,
        }
    }

    #[cfg(test)]
    pub fn gate(&self) -> &RenderGate {
        &self.gate
    }

    pub fn loading(&self) -> &LoadingIndicator {
        &self.loading
    }

    pub fn scene(&self) -> Option<&ChartScene> {
        self.scene.as_ref()
    }

    pub fn failure(&self) -> Option<&ChartError> {
        self.failure.as_ref()
    }

    /// Raises the loading indicator ahead of the next `render`. Repeat requests keep the first time.
    pub fn request_render(&self, now: Instant) {
        if !self.loading.is_visible() {
            self.loading.show(now);
        }
    }

    pub fn render_requested(&self) -> bool {
        self.loading.is_visible()
    }

    pub fn render(&mut self, store: &mut RecordStore, area: Rect) -> RenderOutcome {
        let Some(_pass) = self.gate.try_begin(&self.loading) else {
            return RenderOutcome::Skipped;
        };

        let metrics = match SurfaceMetrics::for_area(area, self.pixel_ratio) {
            Ok(metrics) => metrics,
            Err(err) => {
                log::warn!("chart render skipped: {err}");
                self.scene = None;
                self.failure = Some(err.clone());
                return RenderOutcome::Failed(err);
            }
        };

        log::trace!(
            "chart surface {}x{} dots",
            metrics.backing_width,
            metrics.backing_height
        );
        let points = chart_points(&store.get_all());
        self.scene = Some(build_scene(&points, &mut self.window, &self.bands, metrics));
        self.failure = None;
        RenderOutcome::Drawn
    }
}

pub fn draw_chart(frame: &mut Frame, area: Rect, scene: &ChartScene) {
    let metrics = scene.metrics;
    let plot_left = metrics.plot_left();
    let plot_bottom = metrics.plot_bottom();

    let buffer = frame.buffer_mut();
    for row in 0..area.height {
        for col in 0..area.width {
            let x = f64::from(col) + 0.5;
            let y = f64::from(row) + 0.5;
            if x < plot_left || y > plot_bottom {
                continue;
            }

            let band = scene
                .reference_bands
                .iter()
                .find(|band| y >= band.y_top && y < band.y_bottom)
                .map(|band| dim(band.color));
            let day = scene
                .day_bands
                .iter()
                .find(|day| day.shaded && x >= day.x_start && x < day.x_end)
                .map(|_| DAY_SHADE);
            if let Some(color) = band.or(day) {
                buffer[(area.x + col, area.y + row)].set_bg(color);
            }
        }
    }

    let height = metrics.css_height;
    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([0.0, metrics.css_width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for label in &scene.grid {
                ctx.draw(&CanvasLine {
                    x1: plot_left,
                    y1: height - label.y,
                    x2: metrics.plot_right(),
                    y2: height - label.y,
                    color: Color::DarkGray,
                });
            }
            ctx.layer();

            for line in &scene.series {
                let color = line.series.color();
                if line.points.len() == 1 {
                    let (x, y) = line.points[0];
                    ctx.draw(&Points {
                        coords: &[(x, height - y)],
                        color,
                    });
                    continue;
                }
                for pair in line.points.windows(2) {
                    ctx.draw(&CanvasLine {
                        x1: pair[0].0,
                        y1: height - pair[0].1,
                        x2: pair[1].0,
                        y2: height - pair[1].1,
                        color,
                    });
                }
            }
            ctx.layer();

            for label in &scene.grid {
                ctx.print(
                    label.x,
                    height - label.y,
                    Line::styled(label.text.clone(), Style::default().fg(Color::Gray)),
                );
            }
            for band in &scene.reference_bands {
                ctx.print(
                    plot_left + 1.0,
                    height - band.y_top - 0.5,
                    Line::styled(band.label.clone(), Style::default().fg(band.color)),
                );
            }
            for label in &scene.x_labels {
                ctx.print(
                    label.x,
                    height - label.y,
                    Line::styled(label.text.clone(), Style::default().fg(Color::Gray)),
                );
            }
            if let Some(message) = &scene.message {
                let x = (metrics.css_width - message.chars().count() as f64) / 2.0;
                ctx.print(
                    x.max(0.0),
                    height / 2.0,
                    Line::styled(
                        message.clone(),
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    ),
                );
            }
        });
    frame.render_widget(canvas, area);
}

pub fn legend_line() -> Line<'static> {
    let mut spans = Vec::new();
    for series in Series::ALL {
        spans.push(Span::styled(
            format!("── {} ", series.label()),
            Style::default().fg(series.color()),
        ));
    }
    Line::from(spans)
}

pub fn color_from_name(color_name: &str) -> Option<Color> {
    if let Some(hex) = color_name.strip_prefix('#') {
        if hex.len() == 6 {
            let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
            return Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?));
        }
        return None;
    }

    match color_name {
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "gray" => Some(Color::Gray),
        "dark_gray" => Some(Color::DarkGray),
        "light_red" => Some(Color::LightRed),
        "light_green" => Some(Color::LightGreen),
        "light_yellow" => Some(Color::LightYellow),
        "light_blue" => Some(Color::LightBlue),
        "light_magenta" => Some(Color::LightMagenta),
        "light_cyan" => Some(Color::LightCyan),
        "white" => Some(Color::White),
        _ => None,
    }
}

fn dim(color: Color) -> Color {
    match color {
        Color::Rgb(red, green, blue) => Color::Rgb(red / 4, green / 4, blue / 4),
        Color::Yellow | Color::LightYellow => Color::Rgb(52, 48, 18),
        Color::Red | Color::LightRed => Color::Rgb(58, 24, 24),
        Color::Magenta | Color::LightMagenta => Color::Rgb(52, 22, 52),
        Color::Green | Color::LightGreen => Color::Rgb(20, 48, 24),
        Color::Blue | Color::LightBlue => Color::Rgb(20, 28, 58),
        Color::Cyan | Color::LightCyan => Color::Rgb(18, 46, 50),
        _ => Color::Rgb(36, 36, 36),
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration as StdDuration, Instant};

    use ratatui::layout::Rect;

    use crate::domain::{DAY_MS, Reading};
    use crate::storage::MemoryBackend;
    use crate::store::RecordStore;
    use crate::window::TimeWindow;

    use super::{
        ChartPoint, ChartRenderer, LoadingIndicator, NO_DATA_MESSAGE, NO_WINDOW_DATA_MESSAGE,
        RenderGate, RenderOutcome, Series, SurfaceMetrics, YBound, build_scene, chart_points,
        default_reference_bands, nice_ceil_10, tick_step, y_bound,
    };

    const T0: i64 = 1_767_225_600_000;

    fn point(ts: i64, systolic: Option<u16>, diastolic: Option<u16>, heart_rate: Option<u16>) -> ChartPoint {
        ChartPoint {
            ts,
            systolic,
            diastolic,
            heart_rate,
        }
    }

    fn metrics() -> SurfaceMetrics {
        SurfaceMetrics::new(80.0, 20.0, 2.0).expect("surface should be valid")
    }

    #[test]
    fn backing_surface_rounds_up() {
        let metrics = SurfaceMetrics::new(41.0, 13.0, 1.5).expect("surface should be valid");
        assert_eq!(metrics.backing_width, 62);
        assert_eq!(metrics.backing_height, 20);
        assert!(SurfaceMetrics::new(0.0, 10.0, 2.0).is_err());
        assert!(SurfaceMetrics::new(40.0, 10.0, 0.0).is_err());
    }

    #[test]
    fn y_bound_has_floor_and_ceiling() {
        assert_eq!(y_bound(&[]), YBound { min: 40.0, max: 80.0 });
        assert_eq!(
            y_bound(&[point(T0, Some(132), Some(84), Some(74))]),
            YBound { min: 40.0, max: 150.0 }
        );
        assert_eq!(
            y_bound(&[point(T0, Some(290), Some(150), None)]),
            YBound { min: 40.0, max: 250.0 }
        );
        assert_eq!(nice_ceil_10(141.0), 150.0);
        assert_eq!(tick_step(YBound { min: 40.0, max: 140.0 }), 10);
        assert_eq!(tick_step(YBound { min: 40.0, max: 150.0 }), 20);
    }

    #[test]
    fn chart_points_skip_readings_without_vitals_and_sort() {
        let mut notes_only = Reading::vitals(T0 + 10, None, None, None);
        notes_only.notes = "slept badly".to_string();
        let readings = vec![
            Reading::vitals(T0 + 20, None, None, Some(70)),
            notes_only,
            Reading::vitals(T0, Some(120), Some(80), None),
        ];
        let points = chart_points(&readings);
        assert_eq!(points.iter().map(|point| point.ts).collect::<Vec<_>>(), vec![T0, T0 + 20]);
    }

    #[test]
    fn reference_bands_up_to_and_including_bound() {
        let points = [point(T0, Some(128), Some(84), None), point(T0 + DAY_MS, Some(125), Some(80), None)];
        let mut window = TimeWindow::new(7);
        let scene = build_scene(&points, &mut window, &default_reference_bands(), metrics());
        assert_eq!(scene.bound.max, 140.0);
        let labels = scene
            .reference_bands
            .iter()
            .map(|band| band.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["Elevated", "Stage 1", "Stage 2"]);

        let top = &scene.reference_bands[2];
        assert_eq!(top.y_top, top.y_bottom);
        assert!(scene.reference_bands[1].y_bottom > scene.reference_bands[1].y_top);
        assert!(scene.reference_bands.iter().all(|band| band.label != "Crisis"));
    }

    #[test]
    fn series_break_at_missing_values() {
        let points = [
            point(T0, Some(120), Some(80), Some(60)),
            point(T0 + DAY_MS, None, None, Some(62)),
            point(T0 + 2 * DAY_MS, Some(124), Some(82), Some(64)),
        ];
        let mut window = TimeWindow::new(7);
        let scene = build_scene(&points, &mut window, &[], metrics());

        let count = |series: Series| scene.series.iter().filter(|line| line.series == series).count();
        assert_eq!(count(Series::Systolic), 2);
        assert_eq!(count(Series::Diastolic), 2);
        assert_eq!(count(Series::HeartRate), 1);
        let heart = scene
            .series
            .iter()
            .find(|line| line.series == Series::HeartRate)
            .expect("heart rate line");
        assert_eq!(heart.points.len(), 3);
    }

    #[test]
    fn empty_states_have_distinct_messages() {
        let mut window = TimeWindow::new(1);
        let scene = build_scene(&[], &mut window, &[], metrics());
        assert_eq!(scene.message.as_deref(), Some(NO_DATA_MESSAGE));

        let points = [
            point(T0, Some(120), Some(80), None),
            point(T0 + 10 * DAY_MS, Some(120), Some(80), None),
        ];
        let mut window = TimeWindow::new(2);
        build_scene(&points, &mut window, &[], metrics());
        window.pan_by(-5 * DAY_MS);
        let scene = build_scene(&points, &mut window, &[], metrics());
        assert_eq!(scene.message.as_deref(), Some(NO_WINDOW_DATA_MESSAGE));
    }

    #[test]
    fn middle_label_is_dropped_when_crowded() {
        let points = [point(T0, Some(120), Some(80), None), point(T0 + 3 * DAY_MS, Some(120), Some(80), None)];
        let mut window = TimeWindow::new(7);
        let wide = build_scene(&points, &mut window, &[], metrics());
        assert_eq!(wide.x_labels.len(), 3);

        let narrow_metrics = SurfaceMetrics::new(24.0, 10.0, 2.0).expect("surface should be valid");
        let narrow = build_scene(&points, &mut window, &[], narrow_metrics);
        assert_eq!(narrow.x_labels.len(), 2);
    }

    #[test]
    fn nested_render_is_skipped_and_loading_clears() {
        let loading = LoadingIndicator::new(StdDuration::from_secs(5));
        let gate = RenderGate::default();
        let pass = gate.try_begin(&loading).expect("first render should start");
        loading.show(Instant::now());
        assert!(gate.try_begin(&loading).is_none());
        drop(pass);
        assert!(!gate.is_busy());
        assert!(!loading.is_visible());
    }

    #[test]
    fn watchdog_forces_loading_off() {
        let loading = LoadingIndicator::new(StdDuration::from_millis(100));
        let start = Instant::now();
        loading.show(start);
        assert!(!loading.tick(start + StdDuration::from_millis(50)));
        assert!(loading.is_visible());
        assert!(loading.tick(start + StdDuration::from_millis(150)));
        assert!(!loading.is_visible());
    }

    #[test]
    fn repeated_render_requests_keep_the_first_deadline() {
        let renderer = ChartRenderer::new(
            TimeWindow::new(7),
            default_reference_bands(),
            2.0,
            StdDuration::from_millis(100),
        );
        let start = Instant::now();
        renderer.request_render(start);
        renderer.request_render(start + StdDuration::from_millis(80));
        assert!(renderer.loading().tick(start + StdDuration::from_millis(120)));
        assert!(!renderer.render_requested());
    }

    #[test]
    fn renderer_reads_store_and_clears_loading() {
        let mut store = RecordStore::new(Box::new(MemoryBackend::default()));
        store
            .add(Reading::vitals(T0, Some(132), Some(84), Some(74)))
            .expect("add should succeed");
        let mut renderer = ChartRenderer::new(
            TimeWindow::new(7),
            default_reference_bands(),
            2.0,
            StdDuration::from_secs(3),
        );

        let area = Rect::new(0, 0, 60, 16);
        let busy = renderer
            .gate()
            .clone()
            .try_begin(renderer.loading())
            .expect("gate should open");
        assert_eq!(renderer.render(&mut store, area), RenderOutcome::Skipped);
        drop(busy);

        renderer.request_render(Instant::now());
        assert!(renderer.render_requested());
        assert_eq!(renderer.render(&mut store, area), RenderOutcome::Drawn);
        assert!(!renderer.render_requested());
        let scene = renderer.scene().expect("scene should be built");
        assert!(scene.message.is_none());

        let outcome = renderer.render(&mut store, Rect::new(0, 0, 2, 2));
        assert!(matches!(outcome, RenderOutcome::Failed(_)));
        assert!(!renderer.loading().is_visible());
        assert!(renderer.failure().is_some());
    }
}
