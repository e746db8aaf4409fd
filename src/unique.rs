//! Slice deduplication that keeps the first occurrence of every element.

use std::collections::HashSet;
use std::hash::Hash;

/// Remove duplicates, keeping first-seen order
pub fn unique<T: Eq + Hash + Clone>(input: &[T]) -> Vec<T> {
    let mut seen = HashSet::with_capacity(input.len());
    let mut out = Vec::with_capacity(input.len());

    for val in input {
        if seen.insert(val) {
            out.push(val.clone());
        }
    }
    out
}

/// Floats are not `Hash`, so they are keyed on their bit pattern.
/// `0.0` and `-0.0` are distinct; identical NaNs collapse.
fn unique_by_bits<T: Copy, K: Eq + Hash>(input: &[T], key: impl Fn(T) -> K) -> Vec<T> {
    let mut seen = HashSet::with_capacity(input.len());
    let mut out = Vec::with_capacity(input.len());

    for &val in input {
        if seen.insert(key(val)) {
            out.push(val);
        }
    }
    out
}

pub fn strings<S: AsRef<str>>(input: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(input.len());
    let mut out = Vec::with_capacity(input.len());

    for val in input {
        let val = val.as_ref();
        if seen.insert(val) {
            out.push(val.to_string());
        }
    }
    out
}

pub fn ints(input: &[isize]) -> Vec<isize> {
    unique(input)
}

pub fn int32s(input: &[i32]) -> Vec<i32> {
    unique(input)
}

pub fn int64s(input: &[i64]) -> Vec<i64> {
    unique(input)
}

pub fn uints(input: &[usize]) -> Vec<usize> {
    unique(input)
}

pub fn uint32s(input: &[u32]) -> Vec<u32> {
    unique(input)
}

pub fn uint64s(input: &[u64]) -> Vec<u64> {
    unique(input)
}

pub fn float32s(input: &[f32]) -> Vec<f32> {
    f32s(input)
}

pub fn float64s(input: &[f64]) -> Vec<f64> {
    f64s(input)
}

pub fn f32s(input: &[f32]) -> Vec<f32> {
    unique_by_bits(input, f32::to_bits)
}

pub fn f64s(input: &[f64]) -> Vec<f64> {
    unique_by_bits(input, f64::to_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings() {
        let input = ["foo", "bar", "foo", "baz", "bar", "zap", "foo"];
        assert_eq!(strings(&input), vec!["foo", "bar", "baz", "zap"]);
    }

    #[test]
    fn test_ints() {
        assert_eq!(ints(&[1, 2, 3, 1, 2, 3, 4, 1]), vec![1, 2, 3, 4]);
        assert_eq!(int32s(&[-1, 5, -1, 5, 0]), vec![-1, 5, 0]);
        assert_eq!(int64s(&[i64::MAX, 1, i64::MAX]), vec![i64::MAX, 1]);
    }

    #[test]
    fn test_uints() {
        assert_eq!(uints(&[3, 3, 3]), vec![3]);
        assert_eq!(uint32s(&[9, 8, 9, 7]), vec![9, 8, 7]);
        assert_eq!(uint64s(&[]), Vec::<u64>::new());
    }

    #[test]
    fn test_floats() {
        let input = [1.2, 2.2, 3.3, 1.2, 2.2, 3.1, 3.3, 1.2];
        assert_eq!(float64s(&input), vec![1.2, 2.2, 3.3, 3.1]);

        let input: [f32; 5] = [0.5, 0.25, 0.5, 0.125, 0.25];
        assert_eq!(float32s(&input), vec![0.5, 0.25, 0.125]);
    }

    #[test]
    fn test_float_bit_patterns() {
        let out = f64s(&[0.0, -0.0, f64::NAN, f64::NAN]);
        assert_eq!(out.len(), 3);
        assert!(out[2].is_nan());
    }

    #[test]
    fn test_generic_owned_values() {
        let input = vec![String::from("a"), String::from("b"), String::from("a")];
        assert_eq!(unique(&input), vec!["a".to_string(), "b".to_string()]);
    }
}
