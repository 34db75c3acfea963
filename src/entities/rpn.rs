//! Risk Priority Number calculation shared by mechanisms and causes

use thiserror::Error;

/// Lowest valid severity/occurrence/detection rating
pub const MIN_RATING: i32 = 1;
/// Highest valid severity/occurrence/detection rating
pub const MAX_RATING: i32 = 10;

/// A rating outside 1-10
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{name} rating must be between 1 and 10, got {value}")]
pub struct RatingError {
    pub name: &'static str,
    pub value: i32,
}

/// Check one rating
pub fn check_rating(name: &'static str, value: i32) -> Result<i32, RatingError> {
    if (MIN_RATING..=MAX_RATING).contains(&value) {
        Ok(value)
    } else {
        Err(RatingError { name, value })
    }
}

/// Entities carrying occurrence/detection ratings and derived RPNs
pub trait RpnInputs {
    fn occurrence(&self) -> (i32, i32);
    fn detection(&self) -> (i32, i32);
    fn store_rpn(&mut self, rpn: i32, rpn_new: i32);

    /// Compute (RPN, RPN new) for the given severities without storing them
    fn compute_rpn(&self, severity: i32, severity_new: i32) -> Result<(i32, i32), RatingError> {
        let (occurrence, occurrence_new) = self.occurrence();
        let (detection, detection_new) = self.detection();

        let rpn = check_rating("severity", severity)?
            * check_rating("occurrence", occurrence)?
            * check_rating("detection", detection)?;
        let rpn_new = check_rating("new severity", severity_new)?
            * check_rating("new occurrence", occurrence_new)?
            * check_rating("new detection", detection_new)?;

        Ok((rpn, rpn_new))
    }

    /// RPN = S x O x D, RPN new = S' x O' x D'
    fn calculate_rpn(&mut self, severity: i32, severity_new: i32) -> Result<(i32, i32), RatingError> {
        let (rpn, rpn_new) = self.compute_rpn(severity, severity_new)?;
        self.store_rpn(rpn, rpn_new);
        Ok((rpn, rpn_new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ratings {
        o: (i32, i32),
        d: (i32, i32),
        stored: Option<(i32, i32)>,
    }

    impl RpnInputs for Ratings {
        fn occurrence(&self) -> (i32, i32) {
            self.o
        }

        fn detection(&self) -> (i32, i32) {
            self.d
        }

        fn store_rpn(&mut self, rpn: i32, rpn_new: i32) {
            self.stored = Some((rpn, rpn_new));
        }
    }

    #[test]
    fn test_calculate_rpn_stores_both_values() {
        let mut r = Ratings { o: (7, 5), d: (4, 3), stored: None };
        assert_eq!(r.calculate_rpn(7, 4), Ok((196, 60)));
        assert_eq!(r.stored, Some((196, 60)));
    }

    #[test]
    fn test_zero_rating_rejected_without_storing() {
        let mut r = Ratings { o: (0, 5), d: (4, 3), stored: None };
        let err = r.calculate_rpn(7, 4).unwrap_err();
        assert_eq!(err, RatingError { name: "occurrence", value: 0 });
        assert!(r.stored.is_none());
    }

    #[test]
    fn test_check_rating_bounds() {
        assert!(check_rating("severity", 1).is_ok());
        assert!(check_rating("severity", 10).is_ok());
        assert!(check_rating("severity", 11).is_err());
    }
}
