use std::cmp::Ordering;

/// Safe comparison of floating point numbers, handling NaN values
pub fn safe_float_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Index of the largest value, first one wins on ties. `None` for an empty slice.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some((_, current)) if safe_float_cmp(value, current) != Ordering::Greater => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}
