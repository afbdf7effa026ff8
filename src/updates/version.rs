use std::cmp::Ordering;

/// Numeric, dot-separated comparison. Missing components count as zero so
/// `1.2` equals `1.2.0`; a leading `v` and any `-pre`/`+build` suffix are
/// ignored.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let left = components(left);
    let right = components(right);

    for index in 0..left.len().max(right.len()) {
        let a = left.get(index).copied().unwrap_or(0);
        let b = right.get(index).copied().unwrap_or(0);
        match a.cmp(&b) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_versions(candidate, current) == Ordering::Greater
}

fn components(version: &str) -> Vec<u64> {
    let version = version
        .trim()
        .trim_start_matches(|c| c == 'v' || c == 'V');
    let core = version
        .split(|c| c == '-' || c == '+')
        .next()
        .unwrap_or_default();

    core.split('.')
        .map(|part| part.trim().parse::<u64>().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_components_are_zero() {
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare_versions("2", "2.0.0.0"), Ordering::Equal);
    }

    #[test]
    fn test_components_compare_numerically() {
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("0.9.9", "0.10.0"), Ordering::Less);
        assert!(is_newer("1.0.1", "1.0"));
        assert!(!is_newer("1.0.0", "1.0"));
    }

    #[test]
    fn test_prefix_and_suffix_are_ignored() {
        assert_eq!(compare_versions("v1.4.0", "1.4"), Ordering::Equal);
        assert_eq!(compare_versions("1.4.0-beta.2", "1.4.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.x", "1.0"), Ordering::Equal);
    }
}
