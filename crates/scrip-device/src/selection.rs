//! Check selection: which unspent checks fund a payment, and for how much
//! each.
//!
//! The primary strategy rescales the usable face values by their gcd and
//! runs a shortest-combination dynamic program over exact totals near the
//! draft value, scoring each candidate by overpayment plus a per-check
//! penalty. When no usable combination exists (say, only oversized checks
//! remain), a greedy descending pass covers the value with at most one
//! over-covering check and then sheds any check made redundant by the
//! overshoot.

use std::collections::{BTreeMap, VecDeque};

use scrip_core::{Check, Money};

/// Unspent checks in FIFO buckets keyed by face value. The sorted keys are
/// what the dynamic program runs over.
pub(crate) type CheckBuckets = BTreeMap<Money, VecDeque<Check>>;

/// Pick checks covering exactly `value`, removing them from `unspent`.
///
/// Precondition (checked by the caller): `value` is positive and no larger
/// than the total face value in `unspent`.
pub(crate) fn plan_payment(
    unspent: &mut CheckBuckets,
    value: Money,
    max_overcharge: f64,
    check_punishment: f64,
) -> Vec<(Check, Money)> {
    shortest_combination(unspent, value, max_overcharge, check_punishment)
        .unwrap_or_else(|| descending_fallback(unspent, value))
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

// ── Primary strategy ──────────────────────────────────────────────────────────

/// Dynamic program over exact totals in gcd units.
///
/// Returns `None` when no candidate face values exist or no combination
/// lands in the tolerated window, in which case the fallback takes over.
fn shortest_combination(
    unspent: &mut CheckBuckets,
    value: Money,
    max_overcharge: f64,
    check_punishment: f64,
) -> Option<Vec<(Check, Money)>> {
    // Checks at or beyond the spending estimate would never be chosen.
    let max_spending = (value as f64 + value as f64 * max_overcharge).ceil() as u64;
    let mut faces: Vec<u64> = Vec::new();
    let mut counts: Vec<u32> = Vec::new();
    for (&face, queue) in unspent.iter() {
        if !queue.is_empty() && (face as u64) < max_spending {
            faces.push(face as u64);
            counts.push(queue.len() as u32);
        }
    }
    if faces.is_empty() {
        return None;
    }

    // If every face value is a multiple of g, totals that are not are a
    // waste of table space: work in units of g.
    let unit = faces.iter().copied().fold(0, gcd);
    let units: Vec<u64> = faces.iter().map(|face| face / unit).collect();
    let target = (value as u64).div_ceil(unit);
    let smallest = units[0] as f64;
    let largest = *units.last().expect("units is non-empty") as f64;
    let cap = (target as f64 + (target as f64 * max_overcharge).max(smallest).min(largest)).ceil()
        as usize;

    // table[t]: shortest sequence of face indices summing to t units, with
    // the per-face counts still available after using it. Ties keep the
    // first sequence found.
    let mut table: Vec<Option<(Vec<usize>, Vec<u32>)>> = vec![None; cap + 1];
    for (j, &v) in units.iter().enumerate() {
        let v = v as usize;
        if v <= cap {
            let mut left = counts.clone();
            left[j] -= 1;
            table[v] = Some((vec![j], left));
        }
    }
    for t in units[0] as usize..=cap {
        for (j, &v) in units.iter().enumerate() {
            let v = v as usize;
            if t < v {
                continue;
            }
            let Some((prev_seq, prev_left)) = table[t - v].clone() else {
                continue;
            };
            if prev_left[j] == 0 {
                continue;
            }
            let better = match &table[t] {
                None => true,
                Some((seq, _)) => seq.len() > prev_seq.len() + 1,
            };
            if better {
                let mut seq = prev_seq;
                seq.push(j);
                let mut left = prev_left;
                left[j] -= 1;
                table[t] = Some((seq, left));
            }
        }
    }

    // Score every reachable total at or above the target; lowest score
    // wins, first found on ties.
    let mut best: Option<(f64, Vec<usize>)> = None;
    for t in target as usize..=cap {
        let Some((seq, _)) = &table[t] else { continue };
        let score =
            (t as u64 * unit - value as u64) as f64 + seq.len() as f64 * check_punishment;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, seq.clone()));
        }
    }
    let (_, seq) = best?;

    // Pop the oldest check of each chosen face value.
    let mut remaining = value;
    let mut entries = Vec::with_capacity(seq.len());
    for j in seq {
        let face = (units[j] * unit) as Money;
        let check = unspent
            .get_mut(&face)
            .and_then(VecDeque::pop_front)
            .expect("every chosen face value has an unspent check");
        let amount = remaining.min(check.value);
        remaining -= amount;
        entries.push((check, amount));
    }
    unspent.retain(|_, queue| !queue.is_empty());
    Some(entries)
}

// ── Fallback strategy ─────────────────────────────────────────────────────────

/// Greedy cover for the cases the dynamic program rejects: consume face
/// values in descending order up to the rounded remainder, over-cover any
/// shortfall with the smallest sufficient check, then shed checks made
/// redundant by the overshoot.
fn descending_fallback(unspent: &mut CheckBuckets, value: Money) -> Vec<(Check, Money)> {
    let faces_desc: Vec<u64> = unspent
        .iter()
        .filter(|(_, queue)| !queue.is_empty())
        .map(|(&face, _)| face as u64)
        .rev()
        .collect();
    let unit = faces_desc.iter().copied().fold(0, gcd);

    let mut remaining = value as u64;
    let mut pseudo_remaining = unit * remaining.div_ceil(unit);
    let mut entries: Vec<(Check, u64)> = Vec::new();

    for &face in &faces_desc {
        while remaining > 0 && face <= pseudo_remaining {
            let Some(check) = unspent.get_mut(&(face as Money)).and_then(VecDeque::pop_front)
            else {
                break;
            };
            let amount = (check.value as u64).min(remaining);
            remaining -= amount;
            pseudo_remaining -= amount;
            entries.push((check, amount));
        }
        if remaining == 0 {
            break;
        }
    }

    if remaining > 0 {
        // Over-cover with the smallest check worth at least the remainder,
        // drawing exactly the remainder from it.
        let face = unspent
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(&face, _)| face)
            .find(|&face| face as u64 >= remaining)
            .expect("a covering check exists whenever the total face value suffices");
        let check = unspent
            .get_mut(&face)
            .and_then(VecDeque::pop_front)
            .expect("the covering face value has an unspent check");
        entries.push((check, remaining));
    }

    // Walk the picks newest-first and drop any check whose face value fits
    // inside the current overpayment, folding its face into the first
    // retained entry and returning it to the unspent pool.
    entries.reverse();
    loop {
        let overpay: u64 =
            entries.iter().map(|(check, _)| check.value as u64).sum::<u64>() - value as u64;
        let Some(pos) = entries
            .iter()
            .position(|(check, _)| (check.value as u64) <= overpay)
        else {
            break;
        };
        let (check, _) = entries.remove(pos);
        entries[0].1 += check.value as u64;
        unspent.entry(check.value).or_default().push_back(check);
    }

    unspent.retain(|_, queue| !queue.is_empty());
    entries
        .into_iter()
        .map(|(check, amount)| (check, amount as Money))
        .collect()
}
