use chrono::{Datelike, Utc};

use crate::models::{race::EventSummary, session::SessionType};

pub const FIRST_SUPPORTED_SEASON: i32 = 2018;
/// Earlier seasons are served from Jolpica.
pub const FIRST_OPENF1_SEASON: i32 = 2023;

pub fn current_season() -> i32 {
    Utc::now().year()
}

pub fn supported_seasons(current: i32) -> Vec<i32> {
    (FIRST_SUPPORTED_SEASON..=current).collect()
}

pub fn is_supported_season(season: i32, current: i32) -> bool {
    (FIRST_SUPPORTED_SEASON..=current).contains(&season)
}

/// OpenF1 `session_name` values for each session type. Sprint weekends renamed
/// their qualifying format twice, so only the race itself is matched for Sprint.
pub fn provider_session_name(session_type: SessionType) -> &'static str {
    match session_type {
        SessionType::FP1 => "Practice 1",
        SessionType::FP2 => "Practice 2",
        SessionType::FP3 => "Practice 3",
        SessionType::Qualifying => "Qualifying",
        SessionType::Sprint => "Sprint",
        SessionType::Race => "Race",
    }
}

pub fn map_session_name(external: &str) -> Option<SessionType> {
    match external {
        "Practice 1" => Some(SessionType::FP1),
        "Practice 2" => Some(SessionType::FP2),
        "Practice 3" => Some(SessionType::FP3),
        "Qualifying" => Some(SessionType::Qualifying),
        "Sprint" => Some(SessionType::Sprint),
        "Race" => Some(SessionType::Race),
        _ => None,
    }
}

/// Finds the event a user typed or picked. A number is a round; otherwise an
/// exact (case-insensitive) match on any name wins over a substring match.
pub fn match_event<'a>(events: &'a [EventSummary], query: &str) -> Option<&'a EventSummary> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    if let Ok(round) = query.parse::<u32>() {
        return events.iter().find(|e| e.round == round);
    }

    let names = |e: &'a EventSummary| {
        [&e.name, &e.location, &e.country, &e.circuit]
            .into_iter()
            .map(|n| n.to_lowercase())
    };

    events
        .iter()
        .find(|e| names(*e).any(|n| n == query))
        .or_else(|| events.iter().find(|e| names(*e).any(|n| n.contains(&query))))
}

/// Formats a lap time the way timing screens do, e.g. `1:21.046`.
pub fn format_lap_time(seconds: f64) -> String {
    let millis = (seconds * 1000.0).round() as u64;
    let minutes = millis / 60_000;
    let rest = millis % 60_000;
    format!("{}:{:02}.{:03}", minutes, rest / 1000, rest % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(round: u32, name: &str, location: &str, country: &str, circuit: &str) -> EventSummary {
        EventSummary {
            round,
            meeting_key: 1200 + round,
            name: name.into(),
            location: location.into(),
            country: country.into(),
            circuit: circuit.into(),
            date_start: None,
        }
    }

    fn schedule() -> Vec<EventSummary> {
        vec![
            event(1, "Bahrain Grand Prix", "Sakhir", "Bahrain", "Sakhir"),
            event(6, "Emilia Romagna Grand Prix", "Imola", "Italy", "Imola"),
            event(15, "Italian Grand Prix", "Monza", "Italy", "Monza"),
        ]
    }

    #[test]
    fn season_range() {
        assert_eq!(supported_seasons(2020), vec![2018, 2019, 2020]);
        assert!(is_supported_season(2018, 2025));
        assert!(!is_supported_season(2017, 2025));
        assert!(!is_supported_season(2030, 2025));
    }

    #[test]
    fn session_names_map_both_ways() {
        for session_type in SessionType::ALL {
            assert_eq!(
                map_session_name(provider_session_name(session_type)),
                Some(session_type)
            );
        }
        assert_eq!(map_session_name("Sprint Qualifying"), None);
    }

    #[test]
    fn matches_event_by_location_name_or_round() {
        let events = schedule();
        assert_eq!(match_event(&events, "Monza").unwrap().round, 15);
        assert_eq!(match_event(&events, "italian grand prix").unwrap().round, 15);
        assert_eq!(match_event(&events, "6").unwrap().name, "Emilia Romagna Grand Prix");
        assert!(match_event(&events, "Monaco").is_none());
        assert!(match_event(&events, "").is_none());
    }

    #[test]
    fn exact_match_beats_substring() {
        let events = vec![
            event(1, "Monza Historic", "Monza Park", "Italy", "Monza Park"),
            event(2, "Italian Grand Prix", "Monza", "Italy", "Monza"),
        ];
        assert_eq!(match_event(&events, "monza").unwrap().round, 2);
        assert_eq!(match_event(&events, "historic").unwrap().round, 1);
    }

    #[test]
    fn lap_times_format_like_timing_screens() {
        assert_eq!(format_lap_time(81.046), "1:21.046");
        assert_eq!(format_lap_time(59.9994), "0:59.999");
        assert_eq!(format_lap_time(120.0), "2:00.000");
    }
}
