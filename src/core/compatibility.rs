use crate::core::version::{compare_segment, compare_versions, segments};
use std::cmp::Ordering;

/// Check whether a host build number falls inside a plugin's declared
/// `[since_build, until_build]` range. Missing bounds are open; an
/// `until_build` ending in `*` ("251.*") accepts every build sharing the
/// numeric prefix.
pub fn is_build_compatible(build: &str, since: Option<&str>, until: Option<&str>) -> bool {
    if let Some(since) = since {
        if compare_versions(build, since) == Ordering::Less {
            return false;
        }
    }

    if let Some(until) = until {
        if !within_until(build, until) {
            return false;
        }
    }

    true
}

fn within_until(build: &str, until: &str) -> bool {
    let prefix = match until.strip_suffix('*') {
        Some(prefix) => prefix.trim_end_matches('.'),
        None => return compare_versions(build, until) != Ordering::Greater,
    };

    if prefix.is_empty() {
        return true;
    }

    let bound = segments(prefix);
    let have = segments(build);

    for (i, bound_seg) in bound.iter().enumerate() {
        let have_seg = have.get(i).copied().unwrap_or("0");
        match compare_segment(have_seg, bound_seg) {
            Ordering::Less => return true,
            Ordering::Greater => return false,
            Ordering::Equal => {}
        }
    }

    // The build shares the whole prefix; the wildcard covers the rest.
    true
}
