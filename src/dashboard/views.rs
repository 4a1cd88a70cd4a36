//! Pure derivations from a loaded session. Every view here is computed from the
//! `SessionData` passed in and nothing else.

use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use serde::Serialize;

use crate::models::{
    session::{Compound, LapRecord, SessionData},
    telemetry::{RawTelemetry, TelemetrySample},
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LapTimePoint {
    pub driver: String,
    pub lap_number: u32,
    pub lap_time: Duration,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LapTimeView {
    pub points: Vec<LapTimePoint>,
    /// Team colour per driver, for chart series.
    pub colours: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Stint {
    pub compound: Compound,
    pub first_lap: u32,
    pub last_lap: u32,
}

impl Stint {
    pub fn laps(&self) -> u32 {
        self.last_lap - self.first_lap + 1
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TyreStrategyView {
    pub stints: BTreeMap<String, Vec<Stint>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TyreUsageView {
    pub laps_per_compound: Vec<(Compound, usize)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TelemetryView {
    pub label: String,
    pub samples: Vec<TelemetrySample>,
}

/// Valid laps as (driver, lap, time), ordered by driver then lap number.
pub fn derive_lap_time_view(session: &SessionData) -> LapTimeView {
    let mut points: Vec<LapTimePoint> = session
        .valid_laps()
        .filter_map(|lap| {
            Some(LapTimePoint {
                driver: lap.driver.clone(),
                lap_number: lap.lap_number,
                lap_time: lap.lap_time?,
            })
        })
        .collect();
    points.sort_by(|a, b| (&a.driver, a.lap_number).cmp(&(&b.driver, b.lap_number)));

    let colours = points
        .iter()
        .filter_map(|p| Some((p.driver.clone(), session.team_colour(&p.driver)?)))
        .collect();

    LapTimeView { points, colours }
}

/// Groups each driver's valid laps into stints. A stint breaks when the
/// compound or tyre set changes, or when the lap numbers stop being
/// consecutive, so the stints of a driver cover exactly their valid laps.
pub fn derive_tyre_strategy_view(session: &SessionData) -> TyreStrategyView {
    let mut by_driver: BTreeMap<String, Vec<&LapRecord>> = BTreeMap::new();
    for lap in session.valid_laps() {
        by_driver.entry(lap.driver.clone()).or_default().push(lap);
    }

    let stints = by_driver
        .into_iter()
        .map(|(driver, mut laps)| {
            laps.sort_by_key(|l| l.lap_number);

            let mut stints: Vec<Stint> = Vec::new();
            let mut last_set = None;
            for lap in laps {
                let continues = last_set == lap.stint_number
                    && stints.last().is_some_and(|s| {
                        s.compound == lap.compound && s.last_lap + 1 == lap.lap_number
                    });

                if continues {
                    if let Some(stint) = stints.last_mut() {
                        stint.last_lap = lap.lap_number;
                    }
                } else {
                    stints.push(Stint {
                        compound: lap.compound,
                        first_lap: lap.lap_number,
                        last_lap: lap.lap_number,
                    });
                }
                last_set = lap.stint_number;
            }
            (driver, stints)
        })
        .collect();

    TyreStrategyView { stints }
}

/// Lap count per compound over every lap with a known compound, most used first.
pub fn derive_tyre_usage_view(session: &SessionData) -> TyreUsageView {
    let mut counts: HashMap<Compound, usize> = HashMap::new();
    for lap in session.laps.iter().filter(|l| l.compound != Compound::Unknown) {
        *counts.entry(lap.compound).or_default() += 1;
    }

    let mut laps_per_compound: Vec<(Compound, usize)> = counts.into_iter().collect();
    laps_per_compound.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    TyreUsageView { laps_per_compound }
}

/// Fastest valid lap, optionally restricted to one driver. Ties go to the lap
/// that started first, then to the lower car number.
pub fn fastest_lap<'a>(session: &'a SessionData, driver: Option<&str>) -> Option<&'a LapRecord> {
    session
        .valid_laps()
        .filter(|lap| driver.map_or(true, |d| lap.driver.eq_ignore_ascii_case(d)))
        .filter(|lap| lap.lap_time.is_some())
        .min_by(|a, b| {
            a.lap_time
                .cmp(&b.lap_time)
                .then_with(|| match (a.date_start, b.date_start) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then(a.driver_number.cmp(&b.driver_number))
        })
}

/// Turns raw car/position channels into distance-indexed samples. Distance is
/// integrated from speed (trapezoidal), positions are joined by nearest
/// timestamp. The result is ordered by non-decreasing distance.
pub fn build_telemetry_trace(raw: RawTelemetry) -> Vec<TelemetrySample> {
    let mut car = raw.car;
    car.sort_by_key(|c| c.date);

    let mut positions = raw.positions;
    positions.sort_by_key(|p| p.date);

    let mut samples = Vec::with_capacity(car.len());
    let mut distance = 0.0_f64;
    let mut previous: Option<(chrono::DateTime<chrono::Utc>, f64)> = None;

    for point in car {
        let speed = if point.speed.is_finite() { point.speed.max(0.0) } else { 0.0 };

        if let Some((prev_date, prev_speed)) = previous {
            let dt = (point.date - prev_date).num_microseconds().unwrap_or(0) as f64 / 1e6;
            distance += (prev_speed + speed) / 2.0 / 3.6 * dt.max(0.0);
        }
        previous = Some((point.date, speed));

        let nearest = if positions.is_empty() {
            None
        } else {
            let idx = positions.partition_point(|p| p.date < point.date);
            let candidates = [idx.checked_sub(1), Some(idx).filter(|i| *i < positions.len())];
            candidates
                .into_iter()
                .flatten()
                .min_by_key(|i| (positions[*i].date - point.date).abs())
                .map(|i| &positions[i])
        };

        samples.push(TelemetrySample {
            distance,
            speed,
            timestamp: point.date,
            x: nearest.map(|p| p.x),
            y: nearest.map(|p| p.y),
        });
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        session::{SessionSelector, SessionType},
        telemetry::{CarDataPoint, LocationPoint},
    };
    use chrono::{DateTime, TimeDelta, Utc};

    fn lap(driver: &str, number: u32, seconds: Option<f64>, compound: Compound, set: u32) -> LapRecord {
        LapRecord {
            driver: driver.into(),
            driver_number: if driver == "VER" { 1 } else { 16 },
            lap_number: number,
            lap_time: seconds.map(Duration::from_secs_f64),
            compound,
            stint_number: Some(set),
            is_valid: seconds.is_some(),
            is_pit_out_lap: false,
            date_start: None,
        }
    }

    fn session(laps: Vec<LapRecord>) -> SessionData {
        SessionData {
            selector: SessionSelector {
                season: 2023,
                event: "Monza".into(),
                session_type: SessionType::Race,
            },
            session_key: 9161,
            meeting_name: "Italian Grand Prix".into(),
            drivers: vec![],
            laps,
        }
    }

    fn at(ms: i64) -> DateTime<Utc> {
        "2023-09-03T13:00:00Z".parse::<DateTime<Utc>>().unwrap() + TimeDelta::milliseconds(ms)
    }

    #[test]
    fn lap_time_view_drops_invalid_laps() {
        let data = session(vec![
            lap("VER", 2, Some(86.1), Compound::Medium, 1),
            lap("LEC", 1, None, Compound::Medium, 1),
            lap("LEC", 2, Some(86.4), Compound::Medium, 1),
            lap("VER", 1, None, Compound::Medium, 1),
        ]);
        let view = derive_lap_time_view(&data);

        assert_eq!(view.points.len(), 2);
        assert_eq!(view.points[0].driver, "LEC");
        assert_eq!(view.points[1].driver, "VER");
        assert!(view.points.iter().all(|p| p.lap_number == 2));
    }

    #[test]
    fn stints_cover_valid_laps_without_gaps_or_overlaps() {
        let mut laps = Vec::new();
        for n in 1..=20 {
            let (compound, set) = if n <= 8 { (Compound::Medium, 1) } else { (Compound::Hard, 2) };
            let time = if n == 1 || n == 14 { None } else { Some(85.0) };
            laps.push(lap("VER", n, time, compound, set));
        }
        let data = session(laps);
        let view = derive_tyre_strategy_view(&data);
        let stints = &view.stints["VER"];

        assert_eq!(
            stints,
            &vec![
                Stint { compound: Compound::Medium, first_lap: 2, last_lap: 8 },
                Stint { compound: Compound::Hard, first_lap: 9, last_lap: 13 },
                Stint { compound: Compound::Hard, first_lap: 15, last_lap: 20 },
            ]
        );

        let covered: Vec<u32> = stints.iter().flat_map(|s| s.first_lap..=s.last_lap).collect();
        let valid: Vec<u32> = data.valid_laps().map(|l| l.lap_number).collect();
        assert_eq!(covered, valid);
    }

    #[test]
    fn new_set_of_same_compound_starts_new_stint() {
        let data = session(vec![
            lap("LEC", 1, Some(90.0), Compound::Hard, 1),
            lap("LEC", 2, Some(90.0), Compound::Hard, 1),
            lap("LEC", 3, Some(90.0), Compound::Hard, 2),
        ]);
        let stints = &derive_tyre_strategy_view(&data).stints["LEC"];
        assert_eq!(stints.len(), 2);
        assert_eq!(stints[1].laps(), 1);
    }

    #[test]
    fn tyre_usage_counts_known_compounds() {
        let data = session(vec![
            lap("VER", 1, None, Compound::Soft, 1),
            lap("VER", 2, Some(80.0), Compound::Medium, 2),
            lap("VER", 3, Some(80.0), Compound::Medium, 2),
            lap("VER", 4, Some(80.0), Compound::Unknown, 3),
        ]);
        let usage = derive_tyre_usage_view(&data);
        assert_eq!(
            usage.laps_per_compound,
            vec![(Compound::Medium, 2), (Compound::Soft, 1)]
        );
    }

    #[test]
    fn fastest_lap_across_drivers_and_per_driver() {
        let data = session(vec![
            lap("VER", 10, Some(85.2), Compound::Hard, 2),
            lap("LEC", 11, Some(84.9), Compound::Hard, 2),
            lap("LEC", 12, None, Compound::Hard, 2),
            lap("VER", 11, Some(85.0), Compound::Hard, 2),
        ]);
        let overall = fastest_lap(&data, None).unwrap();
        assert_eq!((overall.driver.as_str(), overall.lap_number), ("LEC", 11));

        let ver = fastest_lap(&data, Some("ver")).unwrap();
        assert_eq!(ver.lap_number, 11);

        assert!(fastest_lap(&data, Some("HAM")).is_none());
    }

    #[test]
    fn no_fastest_lap_when_all_laps_invalid() {
        let data = session(vec![lap("VER", 1, None, Compound::Soft, 1)]);
        assert!(fastest_lap(&data, None).is_none());
    }

    #[test]
    fn fastest_lap_tie_goes_to_earlier_lap() {
        let mut first = lap("LEC", 20, Some(84.0), Compound::Soft, 3);
        first.date_start = Some(at(0));
        let mut second = lap("VER", 20, Some(84.0), Compound::Soft, 3);
        second.date_start = Some(at(500));
        let data = session(vec![second, first]);
        assert_eq!(fastest_lap(&data, None).unwrap().driver, "LEC");
    }

    #[test]
    fn telemetry_trace_is_ordered_by_distance() {
        let car = [(400, 300.0), (0, 180.0), (200, 360.0), (600, -5.0)]
            .into_iter()
            .map(|(ms, speed)| CarDataPoint {
                date: at(ms),
                driver_number: 16,
                speed,
                throttle: None,
                brake: None,
                n_gear: None,
                rpm: None,
                drs: None,
            })
            .collect();
        let positions = vec![
            LocationPoint { date: at(10), x: 1.0, y: 2.0 },
            LocationPoint { date: at(390), x: 5.0, y: 6.0 },
        ];

        let samples = build_telemetry_trace(RawTelemetry { car, positions });

        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].distance, 0.0);
        assert!(samples.windows(2).all(|w| w[0].distance <= w[1].distance));
        // 0.2s at an average of 270 km/h
        assert!((samples[1].distance - 15.0).abs() < 1e-9);
        assert_eq!(samples[0].x, Some(1.0));
        assert_eq!(samples[2].y, Some(6.0));
        assert_eq!(samples[3].speed, 0.0);
    }

    #[test]
    fn telemetry_without_positions_has_no_coordinates() {
        let car = vec![CarDataPoint {
            date: at(0),
            driver_number: 1,
            speed: 100.0,
            throttle: None,
            brake: None,
            n_gear: None,
            rpm: None,
            drs: None,
        }];
        let samples = build_telemetry_trace(RawTelemetry { car, positions: vec![] });
        assert_eq!(samples[0].x, None);
    }
}
