/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Integer helpers for cycle sizing: GCD and overflow-checked LCM.

use super::HyperperiodError;

/// Iterative Euclidean GCD.  `gcd(0, x) == x`.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Checked LCM of two non-zero values.
///
/// Divides before multiplying (`a / gcd(a, b) * b`); the multiplication is
/// still checked and reported as [`HyperperiodError::Overflow`].
pub fn lcm(a: u64, b: u64) -> Result<u64, HyperperiodError> {
    if a == 0 || b == 0 {
        return Err(HyperperiodError::NoValidPeriods);
    }
    (a / gcd(a, b))
        .checked_mul(b)
        .ok_or(HyperperiodError::Overflow { a, b })
}

/// Fold an iterator of cycle lengths into their common LCM.
///
/// An empty iterator yields [`HyperperiodError::NoValidPeriods`].
pub fn lcm_all<I>(lengths: I) -> Result<u64, HyperperiodError>
where
    I: IntoIterator<Item = u64>,
{
    let mut iter = lengths.into_iter();
    let first = iter.next().ok_or(HyperperiodError::NoValidPeriods)?;
    if first == 0 {
        return Err(HyperperiodError::NoValidPeriods);
    }
    iter.try_fold(first, lcm)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
