//! Distances between rooms, either from their coordinates or from explicit travel times.
use std::fmt::Display;
use std::fmt::Formatter;
use std::str::FromStr;

use log::warn;

use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::containers::HashMap;

/// The model of the earth used to compute the distance between two coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ellipsoid {
    /// Euclidean metric where one unit equals ten meters.
    Legacy,
    Wgs84,
    Grs80,
    Airy1830,
    Intl1924,
    Clarke1880,
    Grs67,
}

impl Ellipsoid {
    /// The semi-major axis, the semi-minor axis and the flattening.
    fn parameters(self) -> (f64, f64, f64) {
        match self {
            Ellipsoid::Legacy => (0.0, 0.0, 0.0),
            Ellipsoid::Wgs84 => (6378137.0, 6356752.3142, 1.0 / 298.257223563),
            Ellipsoid::Grs80 => (6378137.0, 6356752.3141, 1.0 / 298.257222101),
            Ellipsoid::Airy1830 => (6377563.396, 6356256.909, 1.0 / 299.3249646),
            Ellipsoid::Intl1924 => (6378388.0, 6356911.946, 1.0 / 297.0),
            Ellipsoid::Clarke1880 => (6378249.145, 6356514.86955, 1.0 / 293.465),
            Ellipsoid::Grs67 => (6378160.0, 6356774.719, 1.0 / 298.25),
        }
    }
}

impl FromStr for Ellipsoid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LEGACY" => Ok(Ellipsoid::Legacy),
            "WGS84" => Ok(Ellipsoid::Wgs84),
            "GRS80" => Ok(Ellipsoid::Grs80),
            "AIRY1830" => Ok(Ellipsoid::Airy1830),
            "INTL1924" => Ok(Ellipsoid::Intl1924),
            "CLARKE1880" => Ok(Ellipsoid::Clarke1880),
            "GRS67" => Ok(Ellipsoid::Grs67),
            other => Err(other.to_owned()),
        }
    }
}

impl Display for Ellipsoid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Ellipsoid::Legacy => "Euclidean metric (1 unit equals to 10 meters)",
            Ellipsoid::Wgs84 => "WGS-84 (GPS)",
            Ellipsoid::Grs80 => "GRS-80",
            Ellipsoid::Airy1830 => "Airy (1830)",
            Ellipsoid::Intl1924 => "Int'l 1924",
            Ellipsoid::Clarke1880 => "Clarke (1880)",
            Ellipsoid::Grs67 => "GRS-67",
        };
        write!(f, "{name}")
    }
}

/// Computes distances (in meters, or coordinate units for the legacy metric) and travel times (in
/// minutes) between rooms, and holds the limits used to classify instructor travel.
#[derive(Clone, Debug)]
pub struct DistanceMetric {
    ellipsoid: Ellipsoid,
    /// Distance travelled in a minute.
    speed: f64,
    instructor_no_preference_limit: f64,
    instructor_discouraged_limit: f64,
    instructor_prohibited_limit: f64,
    instructor_long_travel_in_minutes: f64,
    /// Distance used when one of the rooms has no coordinates.
    null_distance: f64,
    max_travel_time: i32,
    compute_distance_conflicts_between_non_btb_classes: bool,
    /// Travel times keyed by the ordered pair of room ids.
    travel_times: HashMap<(u64, u64), i32>,
}

impl Default for DistanceMetric {
    fn default() -> Self {
        DistanceMetric::new(Ellipsoid::Wgs84)
    }
}

impl DistanceMetric {
    pub fn new(ellipsoid: Ellipsoid) -> DistanceMetric {
        let legacy = ellipsoid == Ellipsoid::Legacy;
        DistanceMetric {
            ellipsoid,
            speed: if legacy { 100.0 / 15.0 } else { 1000.0 / 15.0 },
            instructor_no_preference_limit: 0.0,
            instructor_discouraged_limit: if legacy { 5.0 } else { 50.0 },
            instructor_prohibited_limit: if legacy { 20.0 } else { 200.0 },
            instructor_long_travel_in_minutes: 30.0,
            null_distance: if legacy { 1000.0 } else { 10000.0 },
            max_travel_time: 60,
            compute_distance_conflicts_between_non_btb_classes: false,
            travel_times: HashMap::default(),
        }
    }

    pub fn from_properties(properties: &Properties) -> Result<DistanceMetric, PropertyError> {
        let name = properties.get_string("Distances.Ellipsoid", "LEGACY");
        let ellipsoid = name.parse::<Ellipsoid>().unwrap_or_else(|unknown| {
            warn!("Unknown ellipsoid '{unknown}', using WGS-84 instead");
            Ellipsoid::Wgs84
        });

        let mut metric = DistanceMetric::new(ellipsoid);
        let student_distance_limit = properties.get_f64("Student.DistanceLimit", 1000.0 / 15.0)?;
        if ellipsoid == Ellipsoid::Legacy {
            metric.speed = student_distance_limit / 10.0;
        } else {
            metric.speed = properties.get_f64("Distances.Speed", student_distance_limit)?;
        }
        metric.instructor_no_preference_limit = properties.get_f64(
            "Instructor.NoPreferenceLimit",
            metric.instructor_no_preference_limit,
        )?;
        metric.instructor_discouraged_limit = properties.get_f64(
            "Instructor.DiscouragedLimit",
            metric.instructor_discouraged_limit,
        )?;
        metric.instructor_prohibited_limit = properties.get_f64(
            "Instructor.ProhibitedLimit",
            metric.instructor_prohibited_limit,
        )?;
        metric.null_distance = properties.get_f64("Distances.NullDistance", metric.null_distance)?;
        metric.max_travel_time = properties.get_i32("Distances.MaxTravelDistanceInMinutes", 60)?;
        metric.compute_distance_conflicts_between_non_btb_classes = properties.get_bool(
            "Distances.ComputeDistanceConflictsBetweenNonBTBClasses",
            false,
        )?;
        metric.instructor_long_travel_in_minutes =
            properties.get_f64("Instructor.InstructorLongTravelInMinutes", 30.0)?;
        Ok(metric)
    }

    pub fn ellipsoid(&self) -> Ellipsoid {
        self.ellipsoid
    }

    pub fn is_legacy(&self) -> bool {
        self.ellipsoid == Ellipsoid::Legacy
    }

    pub fn with_compute_distance_conflicts_between_non_btb_classes(mut self, value: bool) -> Self {
        self.compute_distance_conflicts_between_non_btb_classes = value;
        self
    }

    /// Whether distance conflicts are also computed between classes which are not back-to-back.
    pub fn compute_distance_conflicts_between_non_btb_classes(&self) -> bool {
        self.compute_distance_conflicts_between_non_btb_classes
    }

    pub fn instructor_no_preference_limit(&self) -> f64 {
        self.instructor_no_preference_limit
    }

    pub fn instructor_discouraged_limit(&self) -> f64 {
        self.instructor_discouraged_limit
    }

    pub fn instructor_prohibited_limit(&self) -> f64 {
        self.instructor_prohibited_limit
    }

    pub fn instructor_long_travel_in_minutes(&self) -> f64 {
        self.instructor_long_travel_in_minutes
    }

    pub fn max_travel_distance_in_minutes(&self) -> i32 {
        self.max_travel_time
    }

    pub fn minutes_to_meters(&self, minutes: i32) -> f64 {
        self.speed * minutes as f64
    }

    /// Sets the travel time between two rooms, overriding the distance of their coordinates;
    /// [`None`] removes the override.
    pub fn set_travel_time(&mut self, room1: u64, room2: u64, minutes: Option<i32>) {
        let key = (room1.min(room2), room1.max(room2));
        match minutes {
            Some(minutes) => {
                let _ = self.travel_times.insert(key, minutes);
            }
            None => {
                let _ = self.travel_times.remove(&key);
            }
        }
    }

    pub fn travel_time(&self, room1: u64, room2: u64) -> Option<i32> {
        self.travel_times
            .get(&(room1.min(room2), room1.max(room2)))
            .copied()
    }

    pub fn distance_in_minutes(
        &self,
        room1: u64,
        coordinates1: Option<(f64, f64)>,
        room2: u64,
        coordinates2: Option<(f64, f64)>,
    ) -> i32 {
        if let Some(minutes) = self.travel_time(room1, room2) {
            return minutes;
        }
        match (coordinates1, coordinates2) {
            (Some(first), Some(second)) => {
                let minutes = (self.coordinate_distance(first, second) / self.speed).round();
                (self.max_travel_time as f64).min(minutes) as i32
            }
            _ => self.max_travel_time,
        }
    }

    pub fn distance_in_meters(
        &self,
        room1: u64,
        coordinates1: Option<(f64, f64)>,
        room2: u64,
        coordinates2: Option<(f64, f64)>,
    ) -> f64 {
        if let Some(minutes) = self.travel_time(room1, room2) {
            return self.minutes_to_meters(minutes);
        }
        match (coordinates1, coordinates2) {
            (Some(first), Some(second)) => self.coordinate_distance(first, second),
            _ => self.null_distance,
        }
    }

    /// The distance between two coordinates; for an ellipsoid these are a latitude and a
    /// longitude in degrees.
    pub fn coordinate_distance(&self, first: (f64, f64), second: (f64, f64)) -> f64 {
        if first == second {
            return 0.0;
        }
        if self.ellipsoid == Ellipsoid::Legacy {
            if first.0 < 0.0 || first.1 < 0.0 || second.0 < 0.0 || second.1 < 0.0 {
                return self.null_distance;
            }
            let dx = first.0 - second.0;
            let dy = first.1 - second.1;
            return (dx * dx + dy * dy).sqrt();
        }
        vincenty(self.ellipsoid.parameters(), first, second)
    }
}

/// Vincenty's inverse formula; [`f64::NAN`] when the iteration does not converge.
fn vincenty((a, b, f): (f64, f64, f64), first: (f64, f64), second: (f64, f64)) -> f64 {
    let (lat1, lon1) = (first.0.to_radians(), first.1.to_radians());
    let (lat2, lon2) = (second.0.to_radians(), second.1.to_radians());

    let l = lon2 - lon1;
    let u1 = ((1.0 - f) * lat1.tan()).atan();
    let u2 = ((1.0 - f) * lat2.tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    let mut iterations_left = 100;
    loop {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            // co-incident points
            return 0.0;
        }
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        let mut cos_2_sigma_m = cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha;
        if cos_2_sigma_m.is_nan() {
            // equatorial line
            cos_2_sigma_m = 0.0;
        }
        let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
        let previous_lambda = lambda;
        lambda = l
            + (1.0 - c)
                * f
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2_sigma_m
                            + c * cos_sigma * (-1.0 + 2.0 * cos_2_sigma_m * cos_2_sigma_m)));

        iterations_left -= 1;
        if (lambda - previous_lambda).abs() <= 1e-12 {
            let u_sq = cos_sq_alpha * (a * a - b * b) / (b * b);
            let big_a =
                1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = big_b
                * sin_sigma
                * (cos_2_sigma_m
                    + big_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2_sigma_m * cos_2_sigma_m)
                            - big_b / 6.0
                                * cos_2_sigma_m
                                * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                                * (-3.0 + 4.0 * cos_2_sigma_m * cos_2_sigma_m)));
            return b * big_a * (sigma - delta_sigma);
        }
        if iterations_left == 0 {
            return f64::NAN;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_distance_is_euclidean_in_units() {
        let metric = DistanceMetric::new(Ellipsoid::Legacy);

        assert_eq!(metric.coordinate_distance((0.0, 0.0), (3.0, 4.0)), 5.0);
        assert_eq!(metric.distance_in_meters(1, Some((0.0, 0.0)), 2, None), 1000.0);
        // 5 units at 100/15 units a minute
        assert_eq!(
            metric.distance_in_minutes(1, Some((0.0, 0.0)), 2, Some((3.0, 4.0))),
            1
        );
    }

    #[test]
    fn wgs84_distance_matches_reference() {
        let metric = DistanceMetric::new(Ellipsoid::Wgs84);

        let prague_to_zlin =
            metric.coordinate_distance((50.087661, 14.420535), (49.226736, 17.668856));
        assert!((prague_to_zlin / 1000.0 - 253.3).abs() < 0.1, "{prague_to_zlin}");
        assert_eq!(metric.coordinate_distance((1.0, 1.0), (1.0, 1.0)), 0.0);
    }

    #[test]
    fn travel_times_override_coordinates() {
        let mut metric = DistanceMetric::new(Ellipsoid::Legacy);
        metric.set_travel_time(7, 3, Some(4));

        assert_eq!(metric.distance_in_minutes(3, None, 7, None), 4);
        assert_eq!(metric.distance_in_meters(3, None, 7, None), 4.0 * 100.0 / 15.0);

        metric.set_travel_time(3, 7, None);
        assert_eq!(metric.distance_in_minutes(3, None, 7, None), 60);
    }

    #[test]
    fn properties_select_limits() {
        let properties = Properties::default()
            .set("Distances.Ellipsoid", "WGS84")
            .set("Instructor.ProhibitedLimit", 150);
        let metric = DistanceMetric::from_properties(&properties).unwrap();

        assert_eq!(metric.ellipsoid(), Ellipsoid::Wgs84);
        assert_eq!(metric.instructor_discouraged_limit(), 50.0);
        assert_eq!(metric.instructor_prohibited_limit(), 150.0);

        let legacy = DistanceMetric::from_properties(&Properties::default()).unwrap();
        assert!(legacy.is_legacy());
        assert_eq!(legacy.instructor_prohibited_limit(), 20.0);
    }
}
