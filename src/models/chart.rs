use serde::Serialize;

use crate::models::race::EventSummary;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Line,
    Histogram,
    StackedBar,
    Pie,
    Scatter,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AxisValue {
    Number(f64),
    Label(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
    pub x: Vec<AxisValue>,
    pub y: Vec<AxisValue>,
    /// Bar start offsets for stacked bars.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<Vec<f64>>,
    /// Per-point colour scale values for scatter plots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colour_values: Option<Vec<f64>>,
}

impl Series {
    pub fn new(name: impl Into<String>) -> Self {
        Series {
            name: name.into(),
            colour: None,
            x: Vec::new(),
            y: Vec::new(),
            base: None,
            colour_values: None,
        }
    }

    pub fn with_colour(mut self, colour: Option<String>) -> Self {
        self.colour = colour;
        self
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Chart description handed to the page; the page maps it onto Plotly traces.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Figure {
    pub chart_type: ChartType,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartPanel {
    Chart(Figure),
    Placeholder { message: String },
}

impl ChartPanel {
    pub fn placeholder(message: impl Into<String>) -> Self {
        ChartPanel::Placeholder {
            message: message.into(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ChartPanel::Placeholder { .. })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FastestLapSummary {
    pub driver: String,
    pub lap_number: u32,
    pub lap_time: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct DashboardResponse {
    pub title: String,
    pub session_key: u32,
    pub meeting_name: String,
    pub drivers: Vec<String>,
    pub fastest_lap: Option<FastestLapSummary>,
    pub lap_times: ChartPanel,
    pub lap_time_distribution: ChartPanel,
    pub tyre_strategy: ChartPanel,
    pub tyre_usage: ChartPanel,
    pub speed_trace: ChartPanel,
    pub track_map: ChartPanel,
}

#[derive(Clone, Debug, Serialize)]
pub struct SeasonsResponse {
    pub seasons: Vec<i32>,
    pub session_types: Vec<&'static str>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EventsResponse {
    pub season: i32,
    pub events: Vec<EventSummary>,
}
