//! Shared numeric formatting: times and byte sizes to 2 decimals, percentages
//! to 1. Centralized here so every emitter agrees.

pub(crate) fn fmt2(value: f64) -> String {
    format!("{value:.2}")
}

pub(crate) fn fmt1(value: f64) -> String {
    format!("{value:.1}")
}
