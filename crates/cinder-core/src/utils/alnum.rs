//! Natural alphanumeric comparison.
//!
//! Embedded digit runs compare numerically instead of lexically, so
//! `2.10` orders above `2.9` and `rc10` above `rc2`. Used for version
//! release tags and for stable ordering of candidate lists.

use std::cmp::Ordering;

/// Compare two strings treating digit runs as numbers
pub fn compare(a: &str, b: &str) -> Ordering {
    compare_impl(a, b, true)
}

/// Case-insensitive variant of [`compare`]
pub fn compare_ci(a: &str, b: &str) -> Ordering {
    compare_impl(a, b, false)
}

fn compare_impl(a: &str, b: &str, case_sensitive: bool) -> Ordering {
    let ab = a.as_bytes();
    let bb = b.as_bytes();
    let mut i = 0;
    let mut j = 0;
    while i < ab.len() && j < bb.len() {
        if ab[i].is_ascii_digit() && bb[j].is_ascii_digit() {
            let ai = digit_run_end(ab, i);
            let bj = digit_run_end(bb, j);
            let na = trim_leading_zeros(&a[i..ai]);
            let nb = trim_leading_zeros(&b[j..bj]);
            // equal-length decimal strings compare numerically when
            // compared lexically
            let ord = na.len().cmp(&nb.len()).then_with(|| na.cmp(nb));
            if ord != Ordering::Equal {
                return ord;
            }
            i = ai;
            j = bj;
        } else {
            let (ca, cb) = if case_sensitive {
                (ab[i], bb[j])
            } else {
                (ab[i].to_ascii_lowercase(), bb[j].to_ascii_lowercase())
            };
            match ca.cmp(&cb) {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                ord => return ord,
            }
        }
    }
    (ab.len() - i).cmp(&(bb.len() - j))
}

fn digit_run_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    end
}

fn trim_leading_zeros(run: &str) -> &str {
    run.trim_start_matches('0')
}
