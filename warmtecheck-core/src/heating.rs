/// Outdoor temperature (°C) at or above which no heating is needed.
pub const HEATING_BASELINE_C: f64 = 20.0;

/// Degree deficit below the heating baseline, or zero when it is warm enough.
///
/// Non-finite inputs are outside the defined domain; the result for NaN or
/// infinities is whatever the arithmetic yields.
pub fn heating_index(temp_c: f64) -> f64 {
    (HEATING_BASELINE_C - temp_c).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_at_or_above_baseline() {
        for temp in [20.0, 21.5, 100.0] {
            assert_eq!(heating_index(temp), 0.0, "temp {temp}");
        }
    }

    #[test]
    fn deficit_below_baseline() {
        for (temp, expected) in [(19.9, 0.1), (10.0, 10.0), (0.0, 20.0), (-5.0, 25.0)] {
            let got = heating_index(temp);
            assert!((got - expected).abs() < 1e-9, "temp {temp}: got {got}, want {expected}");
        }
        assert_eq!(heating_index(-5.0), 25.0);
    }

    #[test]
    fn monotonically_non_increasing() {
        let mut previous = f64::INFINITY;
        let mut temp = -40.0;
        while temp <= 45.0 {
            let index = heating_index(temp);
            assert!(index <= previous, "index rose at {temp}");
            assert!(index >= 0.0);
            previous = index;
            temp += 0.25;
        }
    }
}
