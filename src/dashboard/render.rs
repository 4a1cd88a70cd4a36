use tracing::debug;

use crate::{
    dashboard::views::{LapTimeView, TelemetryView, TyreStrategyView, TyreUsageView},
    models::chart::{AxisValue, ChartPanel, ChartType, Figure, Series},
};

const HISTOGRAM_BINS: usize = 40;

/// A derived view that knows how to describe itself as a chart.
pub trait ChartView {
    fn is_empty(&self) -> bool;
    fn empty_message(&self) -> String;
    fn figure(&self) -> Figure;
}

/// Never fails: an empty view becomes a placeholder message.
pub fn render(view: &impl ChartView) -> ChartPanel {
    if view.is_empty() {
        let message = view.empty_message();
        debug!(%message, "Rendering placeholder for empty view");
        return ChartPanel::placeholder(message);
    }
    ChartPanel::Chart(view.figure())
}

impl ChartView for LapTimeView {
    fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn empty_message(&self) -> String {
        "No lap times available for this session.".into()
    }

    fn figure(&self) -> Figure {
        let mut series: Vec<Series> = Vec::new();
        for point in &self.points {
            if series.last().map_or(true, |s| s.name != point.driver) {
                series.push(
                    Series::new(point.driver.clone())
                        .with_colour(self.colours.get(&point.driver).cloned()),
                );
            }
            if let Some(current) = series.last_mut() {
                current.x.push(AxisValue::Number(point.lap_number as f64));
                current.y.push(AxisValue::Number(point.lap_time.as_secs_f64()));
            }
        }

        Figure {
            chart_type: ChartType::Line,
            title: "Lap Times".into(),
            x_label: "Lap".into(),
            y_label: "Lap time (s)".into(),
            series,
        }
    }
}

/// Lap-time distribution over all drivers.
pub struct LapTimeDistribution<'a>(pub &'a LapTimeView);

impl ChartView for LapTimeDistribution<'_> {
    fn is_empty(&self) -> bool {
        self.0.points.is_empty()
    }

    fn empty_message(&self) -> String {
        "No lap times to plot a distribution.".into()
    }

    fn figure(&self) -> Figure {
        let seconds: Vec<f64> = self.0.points.iter().map(|p| p.lap_time.as_secs_f64()).collect();
        let (min, max) = seconds
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), s| (lo.min(*s), hi.max(*s)));
        let width = ((max - min) / HISTOGRAM_BINS as f64).max(f64::EPSILON);

        let mut counts = vec![0usize; HISTOGRAM_BINS];
        for s in &seconds {
            let bin = (((s - min) / width) as usize).min(HISTOGRAM_BINS - 1);
            counts[bin] += 1;
        }

        let mut series = Series::new("Laps");
        for (i, count) in counts.into_iter().enumerate() {
            series.x.push(AxisValue::Number(min + width * (i as f64 + 0.5)));
            series.y.push(AxisValue::Number(count as f64));
        }

        Figure {
            chart_type: ChartType::Histogram,
            title: "Lap Time Distribution".into(),
            x_label: "Lap time (s)".into(),
            y_label: "Laps".into(),
            series: vec![series],
        }
    }
}

impl ChartView for TyreStrategyView {
    fn is_empty(&self) -> bool {
        self.stints.values().all(|s| s.is_empty())
    }

    fn empty_message(&self) -> String {
        "No tyre data available for this session.".into()
    }

    /// One bar series per compound; each stint is a segment offset by its
    /// first lap.
    fn figure(&self) -> Figure {
        let mut series: Vec<Series> = Vec::new();
        for (driver, stints) in &self.stints {
            for stint in stints {
                let idx = match series.iter().position(|s| s.name == stint.compound.as_str()) {
                    Some(idx) => idx,
                    None => {
                        let mut s = Series::new(stint.compound.as_str())
                            .with_colour(Some(stint.compound.colour().to_string()));
                        s.base = Some(Vec::new());
                        series.push(s);
                        series.len() - 1
                    }
                };
                let current = &mut series[idx];
                current.x.push(AxisValue::Number(stint.laps() as f64));
                current.y.push(AxisValue::Label(driver.clone()));
                if let Some(base) = current.base.as_mut() {
                    base.push(stint.first_lap as f64 - 1.0);
                }
            }
        }

        Figure {
            chart_type: ChartType::StackedBar,
            title: "Tyre Strategy".into(),
            x_label: "Lap".into(),
            y_label: "Driver".into(),
            series,
        }
    }
}

impl ChartView for TyreUsageView {
    fn is_empty(&self) -> bool {
        self.laps_per_compound.is_empty()
    }

    fn empty_message(&self) -> String {
        "No tyre compounds recorded.".into()
    }

    fn figure(&self) -> Figure {
        let mut series = Series::new("Tyre Usage");
        for (compound, count) in &self.laps_per_compound {
            series.x.push(AxisValue::Label(compound.as_str().to_string()));
            series.y.push(AxisValue::Number(*count as f64));
        }

        Figure {
            chart_type: ChartType::Pie,
            title: "Tyre Usage".into(),
            x_label: "Compound".into(),
            y_label: "Laps".into(),
            series: vec![series],
        }
    }
}

impl ChartView for TelemetryView {
    fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn empty_message(&self) -> String {
        "No fastest lap telemetry recorded for this session.".into()
    }

    fn figure(&self) -> Figure {
        let mut series = Series::new("Speed");
        for sample in &self.samples {
            series.x.push(AxisValue::Number(sample.distance));
            series.y.push(AxisValue::Number(sample.speed));
        }

        Figure {
            chart_type: ChartType::Line,
            title: format!("Speed Trace ({})", self.label),
            x_label: "Distance (m)".into(),
            y_label: "Speed (kph)".into(),
            series: vec![series],
        }
    }
}

/// Track outline from the fastest lap's positions, coloured by speed.
pub struct TrackMap<'a>(pub &'a TelemetryView);

impl ChartView for TrackMap<'_> {
    fn is_empty(&self) -> bool {
        !self.0.samples.iter().any(|s| s.x.is_some() && s.y.is_some())
    }

    fn empty_message(&self) -> String {
        "No position data recorded for the fastest lap.".into()
    }

    fn figure(&self) -> Figure {
        let mut series = Series::new("Track");
        let mut speeds = Vec::new();
        for sample in &self.0.samples {
            if let (Some(x), Some(y)) = (sample.x, sample.y) {
                series.x.push(AxisValue::Number(x));
                series.y.push(AxisValue::Number(y));
                speeds.push(sample.speed);
            }
        }
        series.colour_values = Some(speeds);

        Figure {
            chart_type: ChartType::Scatter,
            title: format!("Track Map ({})", self.0.label),
            x_label: "X".into(),
            y_label: "Y".into(),
            series: vec![series],
        }
    }
}
