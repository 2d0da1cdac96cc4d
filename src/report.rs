//! Report assembly: derived metrics and the final payload

use crate::enrichment::RouteContext;
use crate::geospatial::GeospatialData;
use crate::models::{Place, RouteReport};

/// Builds the `/route_info` payload from the collected data
pub struct ReportAssembler {
    calories_per_km: f64,
}

impl ReportAssembler {
    #[must_use]
    pub fn new(calories_per_km: f64) -> Self {
        Self { calories_per_km }
    }

    /// Rough energy estimate for riding `distance_km`
    #[must_use]
    pub fn calories_burned(&self, distance_km: f64) -> u64 {
        (distance_km * self.calories_per_km).round().max(0.0) as u64
    }

    /// Newlines become `<br>` so the text can be embedded in HTML as is
    #[must_use]
    pub fn format_summary(text: &str) -> String {
        text.replace('\n', "<br>")
    }

    #[must_use]
    pub fn assemble(
        &self,
        start: &Place,
        end: &Place,
        geo: &GeospatialData,
        context: RouteContext,
        summary: &str,
    ) -> RouteReport {
        RouteReport {
            start: start.to_string(),
            end: end.to_string(),
            elevation: geo.average_elevation().trunc() as i64,
            weather: context.weather,
            traffic: context.traffic,
            roadworks: context.roadworks,
            calories_burned: self.calories_burned(geo.distance_km()),
            response: Self::format_summary(summary),
        }
    }
}

impl Default for ReportAssembler {
    fn default() -> Self {
        Self::new(50.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geospatial::{Directions, ElevationProfile};
    use crate::models::Coordinates;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(0.0, 0)]
    #[case(1.0, 50)]
    #[case(12.345, 617)]
    #[case(12.355, 618)]
    #[case(0.009, 0)]
    fn test_calories_are_rounded(#[case] distance_km: f64, #[case] expected: u64) {
        assert_eq!(ReportAssembler::default().calories_burned(distance_km), expected);
    }

    #[test]
    fn test_summary_newlines_become_breaks() {
        assert_eq!(
            ReportAssembler::format_summary("Line one\nLine two\n\nDone"),
            "Line one<br>Line two<br><br>Done"
        );
    }

    #[test]
    fn test_assemble_payload() {
        let directions = Directions::from_value(json!({
            "routes": [{"legs": [{"distance": {"value": 4200}, "steps": []}]}]
        }))
        .unwrap();
        let geo = GeospatialData {
            directions,
            places: Vec::new(),
            start: Coordinates::new(-33.86, 151.2),
            end: Coordinates::new(-33.89, 151.27),
            elevation: ElevationProfile {
                raw: json!({}),
                samples: vec![10.0, 21.0, 30.0],
            },
        };
        let context = RouteContext {
            weather: json!({"main": {"temp": 293.1}}),
            traffic: json!({"resourceSets": []}),
            roadworks: json!({"features": []}),
        };
        let start = Place::parse("start", "Circular Quay").unwrap();
        let end = Place::parse("end", "Bondi").unwrap();

        let report = ReportAssembler::default().assemble(&start, &end, &geo, context, "Nice\nride");

        assert_eq!(report.start, "Circular Quay");
        assert_eq!(report.end, "Bondi");
        assert_eq!(report.elevation, 20);
        assert_eq!(report.calories_burned, 210);
        assert_eq!(report.response, "Nice<br>ride");
        assert_eq!(report.weather["main"]["temp"], 293.1);
    }
}
