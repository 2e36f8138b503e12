//! Edit-distance text similarity.
//!
//! Consecutive OCR passes over the same caption rarely agree exactly; a
//! letter or two flickers from frame to frame. [`similarity`] turns the
//! Levenshtein distance into a score in `[0, 1]` that the segmenter
//! compares against a threshold.

/// Levenshtein distance between `a` and `b`, counted in Unicode scalar
/// values with unit cost for substitution, insertion and deletion.
///
/// Uses a single-row dynamic-programming table.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // row[j] holds the distance between a[..i] and b[..j].
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, &a_char) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;

        for (j, &b_char) in b.iter().enumerate() {
            let substitution = diagonal + usize::from(a_char != b_char);
            let deletion = row[j + 1] + 1;
            let insertion = row[j] + 1;

            diagonal = row[j + 1];
            row[j + 1] = substitution.min(deletion).min(insertion);
        }
    }

    row[b.len()]
}

/// Normalised similarity `1 - distance / max(len(a), len(b))`.
///
/// Two empty strings are identical (`1.0`). The score is symmetric and
/// always within `[0, 1]`.
///
/// # Example
///
/// ```
/// assert_eq!(burnsub::similarity("HELLO", "HELLO"), 1.0);
/// assert_eq!(burnsub::similarity("HELLO", "HELL0"), 0.8);
/// ```
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}
