use std::cmp::Ordering;

/// Compare two version strings segment by segment.
///
/// Segments are split on `.`, `-` and `_`; a leading `v` is ignored. When
/// both segments are numeric they compare as integers, otherwise as plain
/// strings. A shorter version is padded: trailing numeric segments of the
/// longer side compare against zero (`1.2` == `1.2.0`), while a trailing
/// non-numeric segment makes the longer side greater (`1.2.beta` > `1.2`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts = segments(a);
    let b_parts = segments(b);

    let mut idx = 0;
    while idx < a_parts.len() && idx < b_parts.len() {
        let cmp = compare_segment(a_parts[idx], b_parts[idx]);
        if cmp != Ordering::Equal {
            return cmp;
        }
        idx += 1;
    }

    if a_parts.len() == b_parts.len() {
        return Ordering::Equal;
    }

    let a_is_longer = a_parts.len() > idx;
    let rest = if a_is_longer {
        &a_parts[idx..]
    } else {
        &b_parts[idx..]
    };

    for part in rest {
        let cmp = match part.parse::<u64>() {
            Ok(n) => n.cmp(&0),
            Err(_) => Ordering::Greater,
        };
        if cmp != Ordering::Equal {
            return if a_is_longer { cmp } else { cmp.reverse() };
        }
    }

    Ordering::Equal
}

/// Compare a candidate version against the installed one, skipping past
/// known-broken installs.
///
/// When the installed plugin is flagged broken and the plain comparison does
/// not already favor the candidate, the result is forced to `Greater` so the
/// denylisted release is replaced even by an equal or older candidate.
pub fn compare_skip_broken(candidate: &str, installed: &str, installed_broken: bool) -> Ordering {
    let ordering = compare_versions(candidate, installed);
    if installed_broken && ordering != Ordering::Greater {
        return Ordering::Greater;
    }
    ordering
}

pub(crate) fn segments(version: &str) -> Vec<&str> {
    version
        .trim_start_matches('v')
        .split(|c: char| c == '.' || c == '-' || c == '_')
        .collect()
}

pub(crate) fn compare_segment(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a_num), Ok(b_num)) => a_num.cmp(&b_num),
        _ => a.cmp(b),
    }
}
