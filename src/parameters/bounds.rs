//! Numeric bounds for parameter values
//!
//! Bounds come from a setting's evaluated `min_expr`/`max_expr`. A missing side is
//! held as an infinity.

/// Lower and upper limit for a numeric parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum allowed value
    pub min: f64,

    /// Maximum allowed value
    pub max: f64,
}

impl Bounds {
    /// Create bounds from both limits
    ///
    /// No ordering is enforced: expressions may legitimately produce `min > max`,
    /// in which case [`clamp`](Self::clamp) lets the upper bound win.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Build bounds from optional limits, treating `None` as unbounded
    ///
    /// # Examples
    ///
    /// ```
    /// use param_resolver::parameters::Bounds;
    ///
    /// let bounds = Bounds::from_limits(Some(0.0), None);
    /// assert_eq!(bounds.clamp(-3.0), 0.0);
    /// assert_eq!(bounds.clamp(1e9), 1e9);
    /// ```
    pub fn from_limits(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min: min.unwrap_or(f64::NEG_INFINITY),
            max: max.unwrap_or(f64::INFINITY),
        }
    }

    /// Whether either side carries a finite limit
    pub fn is_bounded(&self) -> bool {
        self.min.is_finite() || self.max.is_finite()
    }

    /// Clamp `value` into the bounds
    ///
    /// Applies the lower limit first, then the upper one. NaN stays NaN.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return value;
        }

        let mut clamped = value;
        if clamped < self.min {
            clamped = self.min;
        }
        if clamped > self.max {
            clamped = self.max;
        }
        clamped
    }
}
