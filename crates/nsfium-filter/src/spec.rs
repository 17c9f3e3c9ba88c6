use std::str::FromStr;

use crate::FilterError;

/// Highest order accepted by the parser.
pub const MAX_ORDER: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Lowpass,
    Highpass,
}

/// Mapping from the analog prototype to the z-plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Bilinear transform with the corner frequency prewarped.
    Bilinear,
    /// Matched-Z: every s-plane pole maps through `z = exp(sT)`.
    MatchedZ,
}

/// A parsed filter description.
///
/// Grammar: `<Lp|Hp>Bu[Z]<order>/<corner Hz>`, for example `LpBuZ2/8000`
/// (2nd order Butterworth lowpass at 8 kHz, matched-Z) or `HpBu1/20`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub response: Response,
    pub transform: Transform,
    pub order: u32,
    pub corner_hz: f64,
}

impl FromStr for FilterSpec {
    type Err = FilterError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let syntax = |reason| FilterError::Syntax {
            spec: spec.to_owned(),
            reason,
        };

        let trimmed = spec.trim();
        let (response, rest) = if let Some(rest) = trimmed.strip_prefix("Lp") {
            (Response::Lowpass, rest)
        } else if let Some(rest) = trimmed.strip_prefix("Hp") {
            (Response::Highpass, rest)
        } else {
            return Err(syntax("expected `Lp` or `Hp`"));
        };

        let Some(rest) = rest.strip_prefix("Bu") else {
            let family: String = rest.chars().take_while(|c| c.is_alphabetic()).collect();
            return Err(FilterError::UnsupportedFamily(family));
        };

        let (transform, rest) = match rest.strip_prefix('Z') {
            Some(rest) => (Transform::MatchedZ, rest),
            None => (Transform::Bilinear, rest),
        };

        let (order, corner) = rest
            .split_once('/')
            .ok_or_else(|| syntax("missing `/` between order and frequency"))?;
        let order: u32 = order
            .parse()
            .map_err(|_| syntax("order is not an integer"))?;
        if order == 0 || order > MAX_ORDER {
            return Err(FilterError::InvalidOrder(order));
        }
        let corner_hz: f64 = corner
            .parse()
            .map_err(|_| syntax("frequency is not a number"))?;

        Ok(Self {
            response,
            transform,
            order,
            corner_hz,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_matched_z_lowpass() {
        let spec: FilterSpec = "LpBuZ2/8000".parse().unwrap();
        assert_eq!(spec.response, Response::Lowpass);
        assert_eq!(spec.transform, Transform::MatchedZ);
        assert_eq!(spec.order, 2);
        assert_eq!(spec.corner_hz, 8000.0);
    }

    #[test]
    fn parses_bilinear_highpass_with_fractional_corner() {
        let spec: FilterSpec = "HpBu3/37.5".parse().unwrap();
        assert_eq!(spec.response, Response::Highpass);
        assert_eq!(spec.transform, Transform::Bilinear);
        assert_eq!(spec.order, 3);
        assert_eq!(spec.corner_hz, 37.5);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            "BpBu2/100".parse::<FilterSpec>(),
            Err(FilterError::Syntax { .. })
        ));
        assert_eq!(
            "LpCh2/100".parse::<FilterSpec>(),
            Err(FilterError::UnsupportedFamily("Ch".into()))
        );
        assert_eq!(
            "LpBu0/100".parse::<FilterSpec>(),
            Err(FilterError::InvalidOrder(0))
        );
        assert_eq!(
            "LpBu11/100".parse::<FilterSpec>(),
            Err(FilterError::InvalidOrder(11))
        );
        assert!(matches!(
            "LpBu2".parse::<FilterSpec>(),
            Err(FilterError::Syntax { .. })
        ));
        assert!(matches!(
            "LpBu2/fast".parse::<FilterSpec>(),
            Err(FilterError::Syntax { .. })
        ));
    }
}
