use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("latitude {0} must be between -90 and 90 degrees")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} must be between -180 and 180 degrees")]
    LongitudeOutOfRange(f64),
}

/// A WGS84 point as captured by the device and stored on a report.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        let coordinates = Self {
            latitude,
            longitude,
        };
        coordinates.validate()?;
        Ok(coordinates)
    }

    pub fn validate(&self) -> Result<(), CoordinateError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }

    /// Address shown when no geocoding provider could name the place.
    pub fn fallback_label(&self) -> String {
        format!(
            "Location: {:.6}, {:.6}",
            positive_zero(self.latitude),
            positive_zero(self.longitude)
        )
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

fn positive_zero(value: f64) -> f64 {
    // -0.0 + 0.0 == +0.0
    value + 0.0
}

#[cfg(test)]
mod tests {
    use super::{CoordinateError, Coordinates};

    #[test]
    fn fallback_label_uses_six_decimal_places() {
        let coordinates = Coordinates::new(11.5594, 124.395).expect("valid coordinates");
        assert_eq!(
            coordinates.fallback_label(),
            "Location: 11.559400, 124.395000"
        );
    }

    #[test]
    fn fallback_label_keeps_sign_of_negative_coordinates() {
        let coordinates = Coordinates::new(-33.8688, -151.2093).expect("valid coordinates");
        assert_eq!(
            coordinates.fallback_label(),
            "Location: -33.868800, -151.209300"
        );
    }

    #[test]
    fn fallback_label_never_prints_negative_zero() {
        let coordinates = Coordinates::new(-0.0, 0.0).expect("valid coordinates");
        assert_eq!(coordinates.fallback_label(), "Location: 0.000000, 0.000000");
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert_eq!(
            Coordinates::new(90.5, 0.0),
            Err(CoordinateError::LatitudeOutOfRange(90.5))
        );
        assert_eq!(
            Coordinates::new(0.0, -180.01),
            Err(CoordinateError::LongitudeOutOfRange(-180.01))
        );
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }
}
