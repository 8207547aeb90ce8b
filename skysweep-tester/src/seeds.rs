use anyhow::{Result, bail};

/// Split a comma-separated CLI list, dropping empty segments.
#[must_use]
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Resolve CLI seed tokens into canonical numeric seeds.
///
/// Supports literal integers and `N..M` inclusive ranges.
///
/// # Errors
///
/// Returns an error for unparsable tokens or an empty resolution.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds: Vec<u64> = Vec::new();
    for token in tokens {
        if let Some((start, end)) = token.split_once("..") {
            let start: u64 = start.trim().parse()?;
            let end: u64 = end.trim().parse()?;
            if end < start {
                bail!("seed range {token} runs backwards");
            }
            seeds.extend(start..=end);
            continue;
        }
        if let Ok(value) = token.parse::<u64>() {
            seeds.push(value);
            continue;
        }
        bail!("unrecognized seed token: {token}");
    }
    if seeds.is_empty() {
        bail!("no seeds resolved");
    }
    seeds.sort_unstable();
    seeds.dedup();
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims_csv() {
        assert_eq!(split_csv("a, b,,c"), ["a", "b", "c"]);
        assert!(split_csv("").is_empty());
    }

    #[test]
    fn resolves_literals_and_ranges() {
        let seeds = resolve_seed_inputs(&split_csv("7,1337,3..5")).unwrap();
        assert_eq!(seeds, [3, 4, 5, 7, 1337]);
    }

    #[test]
    fn rejects_junk_and_backward_ranges() {
        assert!(resolve_seed_inputs(&split_csv("oops")).is_err());
        assert!(resolve_seed_inputs(&split_csv("9..3")).is_err());
        assert!(resolve_seed_inputs(&[]).is_err());
    }
}
