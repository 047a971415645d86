//! Live training curves
//!
//! [`Animator`] keeps an append-only history of `(x, y)` points per series and
//! hands a [`Frame`] of that history to a [`PlotSink`] after every update.
//! Sinks decide how a frame is shown (log lines, an SVG file rewritten in
//! place, nothing at all); each render replaces the previously shown frame.

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct AnimatorConfig {
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub title: Option<String>,
    pub xlim: Option<(f64, f64)>,
    pub ylim: Option<(f64, f64)>,
    /// One entry per series; an empty legend means a single unnamed series
    pub legend: Vec<String>,
}

impl AnimatorConfig {
    pub fn with_legend<S: Into<String>>(legend: impl IntoIterator<Item = S>) -> Self {
        Self {
            legend: legend.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn num_series(&self) -> usize {
        self.legend.len().max(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        Some((*self.x.last()?, *self.y.last()?))
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}

/// Everything a sink needs to draw one frame
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub config: &'a AnimatorConfig,
    pub series: &'a [Series],
}

impl Frame<'_> {
    pub fn label(&self, idx: usize) -> String {
        self.config
            .legend
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("series {idx}"))
    }

    /// Axis ranges: explicit limits when configured, otherwise fitted to the data.
    ///
    /// A zero-width range is widened by half a unit on each side.
    pub fn bounds(&self) -> ((f64, f64), (f64, f64)) {
        let xs = self.series.iter().flat_map(|s| s.x.iter().copied());
        let ys = self.series.iter().flat_map(|s| s.y.iter().copied());
        let x = self.config.xlim.map_or_else(|| autoscale(xs, 0.0), widen);
        let y = self.config.ylim.map_or_else(|| autoscale(ys, 0.05), widen);
        (x, y)
    }
}

fn widen((lo, hi): (f64, f64)) -> (f64, f64) {
    if lo < hi {
        (lo, hi)
    } else {
        (lo - 0.5, lo + 0.5)
    }
}

fn autoscale(values: impl Iterator<Item = f64>, margin: f64) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return (0.0, 1.0);
    }
    if lo == hi {
        return widen((lo, hi));
    }
    let pad = (hi - lo) * margin;
    (lo - pad, hi + pad)
}

/// Display side of the animator
pub trait PlotSink {
    fn render(&mut self, frame: &Frame<'_>) -> Result<()>;
}

impl<T: PlotSink + ?Sized> PlotSink for Box<T> {
    fn render(&mut self, frame: &Frame<'_>) -> Result<()> {
        (**self).render(frame)
    }
}

/// Discards every frame
#[derive(Debug, Default)]
pub struct NullSink;

impl PlotSink for NullSink {
    fn render(&mut self, _frame: &Frame<'_>) -> Result<()> {
        Ok(())
    }
}

/// Logs the newest point of every series
#[derive(Debug, Default)]
pub struct LogSink;

impl PlotSink for LogSink {
    fn render(&mut self, frame: &Frame<'_>) -> Result<()> {
        let latest: Vec<String> = frame
            .series
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.last().map(|(x, y)| format!("{}={:.4} @ {}", frame.label(i), y, x)))
            .collect();
        let title = frame.config.title.as_deref().unwrap_or("curves");
        log::info!("📈 {}: {}", title, latest.join(", "));
        Ok(())
    }
}

/// Keeps track of what was rendered
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub frames: usize,
    pub last_counts: Vec<usize>,
}

impl PlotSink for RecordingSink {
    fn render(&mut self, frame: &Frame<'_>) -> Result<()> {
        self.frames += 1;
        self.last_counts = frame.series.iter().map(Series::len).collect();
        Ok(())
    }
}

/// Draws every series into one SVG file, rewritten on each frame
#[cfg(feature = "plots")]
#[derive(Debug)]
pub struct SvgSink {
    path: std::path::PathBuf,
    size: (u32, u32),
}

#[cfg(feature = "plots")]
impl SvgSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            size: (640, 480),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }
}

#[cfg(feature = "plots")]
impl PlotSink for SvgSink {
    fn render(&mut self, frame: &Frame<'_>) -> Result<()> {
        use plotters::prelude::*;

        fn plot_err(e: impl std::fmt::Display) -> Error {
            Error::Plot(e.to_string())
        }

        let root = SVGBackend::new(&self.path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;

        let ((x_lo, x_hi), (y_lo, y_hi)) = frame.bounds();
        let mut builder = ChartBuilder::on(&root);
        builder.margin(20).x_label_area_size(40).y_label_area_size(50);
        if let Some(title) = &frame.config.title {
            builder.caption(title, ("sans-serif", 22));
        }
        let mut chart = builder
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
            .map_err(plot_err)?;

        let mut mesh = chart.configure_mesh();
        if let Some(xlabel) = &frame.config.xlabel {
            mesh.x_desc(xlabel);
        }
        if let Some(ylabel) = &frame.config.ylabel {
            mesh.y_desc(ylabel);
        }
        mesh.draw().map_err(plot_err)?;

        for (i, series) in frame.series.iter().enumerate() {
            let style = Palette99::pick(i).stroke_width(2);
            chart
                .draw_series(LineSeries::new(series.points(), style))
                .map_err(plot_err)?
                .label(frame.label(i))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }

        if !frame.config.legend.is_empty() {
            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(plot_err)?;
        }

        root.present().map_err(plot_err)?;
        Ok(())
    }
}

/// Incremental multi-series line plot
pub struct Animator<S = Box<dyn PlotSink>> {
    config: AnimatorConfig,
    series: Vec<Series>,
    sink: S,
}

impl<S: PlotSink> Animator<S> {
    pub fn new(config: AnimatorConfig, sink: S) -> Self {
        let series = vec![Series::default(); config.num_series()];
        Self {
            config,
            series,
            sink,
        }
    }

    /// Append `(x, ys[i])` to every series whose value is present, then redraw.
    pub fn add(&mut self, x: f64, ys: &[Option<f64>]) -> Result<()> {
        if ys.len() != self.series.len() {
            return Err(Error::ArityMismatch {
                expected: self.series.len(),
                actual: ys.len(),
            });
        }
        for (series, y) in self.series.iter_mut().zip(ys) {
            if let Some(y) = y {
                series.x.push(x);
                series.y.push(*y);
            }
        }

        let frame = Frame {
            config: &self.config,
            series: &self.series,
        };
        self.sink.render(&frame)
    }

    pub fn config(&self) -> &AnimatorConfig {
        &self.config
    }

    pub fn num_series(&self) -> usize {
        self.series.len()
    }

    pub fn series(&self, idx: usize) -> Option<&Series> {
        self.series.get(idx)
    }

    pub fn point_count(&self, idx: usize) -> usize {
        self.series.get(idx).map_or(0, Series::len)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Dump every recorded point as `series,x,y` rows
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = Writer::from_writer(file);
        writer.write_record(["series", "x", "y"])?;
        for (i, series) in self.series.iter().enumerate() {
            let label = Frame {
                config: &self.config,
                series: &self.series,
            }
            .label(i);
            for (x, y) in series.points() {
                writer.write_record([label.clone(), x.to_string(), y.to_string()])?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn animator(legend: &[&str]) -> Animator<RecordingSink> {
        Animator::new(AnimatorConfig::with_legend(legend.iter().copied()), RecordingSink::default())
    }

    #[test]
    fn test_series_count_follows_legend() {
        assert_eq!(animator(&["train loss", "train acc", "test acc"]).num_series(), 3);
        assert_eq!(animator(&[]).num_series(), 1);
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let mut plot = animator(&["train", "valid"]);
        plot.add(1.0, &[Some(0.9), None]).unwrap();
        plot.add(2.0, &[Some(0.7), Some(0.5)]).unwrap();
        plot.add(3.0, &[None, None]).unwrap();

        assert_eq!(plot.point_count(0), 2);
        assert_eq!(plot.point_count(1), 1);
        assert_eq!(plot.series(1).unwrap().last(), Some((2.0, 0.5)));
        assert_eq!(plot.sink().frames, 3);
        assert_eq!(plot.sink().last_counts, vec![2, 1]);
    }

    #[test]
    fn test_wrong_arity_is_rejected() {
        let mut plot = animator(&["a", "b"]);
        let result = plot.add(0.0, &[Some(1.0)]);

        assert_matches!(result, Err(Error::ArityMismatch { expected: 2, actual: 1 }));
        assert_eq!(plot.point_count(0), 0);
        assert_eq!(plot.sink().frames, 0);
    }

    #[test]
    fn test_history_only_grows() {
        let mut plot = animator(&["a", "b"]);
        let mut previous = vec![0, 0];
        for step in 0..20 {
            let b = if step % 3 == 0 { None } else { Some(step as f64) };
            plot.add(step as f64, &[Some(1.0 / (step + 1) as f64), b]).unwrap();
            let counts = vec![plot.point_count(0), plot.point_count(1)];
            assert!(counts.iter().zip(&previous).all(|(now, before)| now >= before));
            previous = counts;
        }
        assert_eq!(previous, vec![20, 13]);
    }

    #[test]
    fn test_bounds_autoscale_and_limits() {
        let config = AnimatorConfig::with_legend(["a"]);
        let series = vec![Series {
            x: vec![1.0, 3.0],
            y: vec![0.0, 1.0],
        }];
        let frame = Frame {
            config: &config,
            series: &series,
        };
        let ((x_lo, x_hi), (y_lo, y_hi)) = frame.bounds();
        assert_eq!((x_lo, x_hi), (1.0, 3.0));
        assert!(y_lo < 0.0 && y_hi > 1.0);

        let limited = AnimatorConfig {
            xlim: Some((0.0, 10.0)),
            ylim: Some((0.0, 1.0)),
            ..config.clone()
        };
        let frame = Frame {
            config: &limited,
            series: &series,
        };
        assert_eq!(frame.bounds(), ((0.0, 10.0), (0.0, 1.0)));
    }

    #[test]
    fn test_degenerate_limits_are_widened() {
        let config = AnimatorConfig {
            xlim: Some((1.0, 1.0)),
            ..AnimatorConfig::with_legend(["a"])
        };
        let series = vec![Series {
            x: vec![1.0],
            y: vec![0.3],
        }];
        let frame = Frame {
            config: &config,
            series: &series,
        };
        let ((x_lo, x_hi), (y_lo, y_hi)) = frame.bounds();
        assert_eq!((x_lo, x_hi), (0.5, 1.5));
        assert!(y_lo < 0.3 && 0.3 < y_hi);
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curves.csv");
        let mut plot = Animator::new(AnimatorConfig::with_legend(["loss", "acc"]), NullSink);
        plot.add(1.0, &[Some(0.5), Some(0.25)]).unwrap();
        plot.add(2.0, &[Some(0.4), None]).unwrap();

        plot.write_csv(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["series,x,y", "loss,1,0.5", "loss,2,0.4", "acc,1,0.25"]);
    }

    #[test]
    fn test_config_is_kept() {
        let config = AnimatorConfig {
            title: Some("loss".to_string()),
            ..AnimatorConfig::with_legend(["train"])
        };
        let plot = Animator::new(config, NullSink);
        assert_eq!(plot.config().title.as_deref(), Some("loss"));
        assert_eq!(plot.config().legend, vec!["train".to_string()]);
    }

    #[cfg(feature = "plots")]
    #[test]
    fn test_svg_sink_rewrites_file_each_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curves.svg");
        let config = AnimatorConfig {
            xlabel: Some("epoch".to_string()),
            title: Some("training".to_string()),
            ..AnimatorConfig::with_legend(["train loss", "valid acc"])
        };
        let mut plot = Animator::new(config, SvgSink::new(&path).with_size(320, 240));

        plot.add(1.0, &[Some(0.7), None]).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        for epoch in 2..6 {
            plot.add(epoch as f64, &[Some(0.7 / epoch as f64), Some(0.1 * epoch as f64)])
                .unwrap();
        }
        let last = std::fs::read_to_string(&path).unwrap();

        assert!(first.contains("<svg"));
        assert!(first.contains("width=\"320\""));
        assert_ne!(first.len(), last.len());
        assert!(last.contains("train loss"));
        assert!(last.contains("valid acc"));
        assert_eq!(last.matches("<svg").count(), 1);
    }

    #[test]
    fn test_boxed_sink() {
        let sink: Box<dyn PlotSink> = Box::new(LogSink);
        let mut plot: Animator = Animator::new(AnimatorConfig::default(), sink);
        plot.add(0.0, &[Some(1.0)]).unwrap();
        assert_eq!(plot.point_count(0), 1);
    }
}
