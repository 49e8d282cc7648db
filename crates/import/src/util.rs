/// Largest case-folded edit distance at which two vendor names still count as
/// the same vendor.
pub const MAX_VENDOR_EDIT_DISTANCE: usize = 1;

/// Levenshtein edit distance over Unicode scalar values, using the two-row
/// O(min(m,n)) space algorithm.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    let (m, n) = (a.len(), b.len());

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    // Iterate the longer string so each row is sized by the shorter one.
    let (a, b, m, n) = if m >= n { (a, b, m, n) } else { (b, a, n, m) };

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Vendor names match when their lower-cased forms are at most one edit apart.
/// Symmetric but not transitive: only ever compare pairs.
pub fn vendor_names_similar(a: &str, b: &str) -> bool {
    levenshtein_distance(&a.to_lowercase(), &b.to_lowercase()) <= MAX_VENDOR_EDIT_DISTANCE
}
