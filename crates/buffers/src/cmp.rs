//! Byte slice comparison utilities.

use std::cmp::Ordering;

/// Compares two byte slices for equality.
///
/// # Example
///
/// ```
/// use packbuf_buffers::equal;
///
/// assert!(equal(&[1, 2, 3], &[1, 2, 3]));
/// assert!(!equal(&[1, 2, 3], &[1, 2, 4]));
/// assert!(!equal(&[1, 2], &[1, 2, 3]));
/// ```
pub fn equal(a: &[u8], b: &[u8]) -> bool {
    a == b
}

/// Compares two byte slices lexicographically by byte values; on a common
/// prefix the shorter slice orders first.
///
/// # Example
///
/// ```
/// use std::cmp::Ordering;
/// use packbuf_buffers::compare;
///
/// assert_eq!(compare(&[1, 2], &[1, 2, 3]), Ordering::Less);
/// assert_eq!(compare(&[1, 3], &[1, 2, 3]), Ordering::Greater);
/// assert_eq!(compare(&[1, 2, 3], &[1, 2, 3]), Ordering::Equal);
/// ```
pub fn compare(a: &[u8], b: &[u8]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match x.cmp(y) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// Three-way comparison as `-1`, `0` or `1`.
pub fn compare_sign(a: &[u8], b: &[u8]) -> i32 {
    match compare(a, b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}
