use rand::Rng;

/// Presentation confidence drawn uniformly from `[lo, hi)`.
///
/// Not derived from any model output. Forecast, pattern and savings reports
/// carry it so dashboards have a value to render; do not use it for
/// decisions.
pub fn cosmetic_confidence(lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return lo;
    }
    rand::thread_rng().gen_range(lo..hi)
}
