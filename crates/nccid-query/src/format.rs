// SPDX-License-Identifier: Apache-2.0

/// `1234567` -> `"1,234,567"`.
#[must_use]
pub fn numformat(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `count (pp.p%)` with the share taken against `total`. Caller guarantees
/// `total > 0`.
#[must_use]
pub fn count_with_share(count: u64, total: u64) -> String {
    format!(
        "{} ({:.1}%)",
        numformat(count),
        count as f64 / total as f64 * 100.0
    )
}

/// Whole-number percentage, ties to even.
#[must_use]
pub fn rounded_percent(part: u64, whole: u64) -> i64 {
    (part as f64 / whole as f64 * 100.0).round_ties_even() as i64
}
