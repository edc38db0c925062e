//! npm flavoured semver ranges.
//!
//! A range is a union (`||`) of comparator sets; a comparator set is a
//! whitespace separated intersection of comparators. Sugar (caret, tilde,
//! x-ranges, hyphen ranges and partial versions) is desugared at parse time
//! into the five primitive operators plus the unconstrained [`Comparator::Any`].

use crate::error::{RegistryError, RegistryResult};
use crate::version::padding::parse_strict;
use semver::{BuildMetadata, Prerelease, Version};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Lte,
    Eq,
    Gte,
    Gt,
}

impl Operator {
    pub fn from_symbol(symbol: &str) -> RegistryResult<Self> {
        match symbol {
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Lte),
            "" | "=" => Ok(Operator::Eq),
            ">=" => Ok(Operator::Gte),
            ">" => Ok(Operator::Gt),
            other => Err(RegistryError::UnsupportedOperator(other.to_string())),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Eq => "=",
            Operator::Gte => ">=",
            Operator::Gt => ">",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Operator::Lt => ordering == Ordering::Less,
            Operator::Lte => ordering != Ordering::Greater,
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Gte => ordering != Ordering::Less,
            Operator::Gt => ordering == Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparator {
    /// Matches every version (`*`, `x`, empty range).
    Any,
    Bound { operator: Operator, version: Version },
}

impl Comparator {
    fn bound(operator: Operator, version: Version) -> Self {
        Comparator::Bound { operator, version }
    }

    pub fn test(&self, version: &Version) -> bool {
        match self {
            Comparator::Any => true,
            Comparator::Bound {
                operator,
                version: bound,
            } => operator.accepts(precedence(version, bound)),
        }
    }
}

/// Semver precedence: release triple, then prerelease. Build metadata is ignored.
pub fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    raw: String,
    set: Vec<Vec<Comparator>>,
}

impl Range {
    pub fn parse(raw: &str) -> RegistryResult<Self> {
        let mut set = Vec::new();
        for part in raw.split("||") {
            set.push(parse_comparator_set(part.trim()).map_err(|e| match e {
                RegistryError::UnsupportedOperator(_) => e,
                _ => RegistryError::Unprocessable(format!("invalid range: {raw}")),
            })?);
        }
        Ok(Self {
            raw: raw.to_string(),
            set,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn comparator_sets(&self) -> &[Vec<Comparator>] {
        &self.set
    }

    pub fn satisfies(&self, version: &Version) -> bool {
        self.set.iter().any(|comparators| test_set(comparators, version))
    }

    /// Highest version (by semver precedence) in `versions` that satisfies the range.
    pub fn max_satisfying<'a, I>(&self, versions: I) -> Option<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        versions
            .into_iter()
            .filter_map(|raw| parse_strict(raw).map(|parsed| (raw, parsed)))
            .filter(|(_, parsed)| self.satisfies(parsed))
            .max_by(|(_, a), (_, b)| precedence(a, b))
            .map(|(raw, _)| raw.to_string())
    }
}

fn test_set(comparators: &[Comparator], version: &Version) -> bool {
    if !comparators.iter().all(|c| c.test(version)) {
        return false;
    }
    if version.pre.is_empty() {
        return true;
    }
    // A prerelease only matches when the set names a prerelease of the same release triple.
    comparators.iter().any(|c| match c {
        Comparator::Bound { version: bound, .. } => {
            !bound.pre.is_empty()
                && bound.major == version.major
                && bound.minor == version.minor
                && bound.patch == version.patch
        }
        Comparator::Any => false,
    })
}

#[derive(Debug, Default)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Option<Prerelease>,
}

impl Partial {
    fn filled(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            pre: self.pre.clone().unwrap_or(Prerelease::EMPTY),
            build: BuildMetadata::EMPTY,
        }
    }
}

fn release(major: u64, minor: u64, patch: u64) -> Version {
    Version::new(major, minor, patch)
}

fn parse_partial(text: &str) -> RegistryResult<Partial> {
    let invalid = || RegistryError::Unprocessable(format!("invalid version: {text}"));
    let text = text.strip_prefix('=').unwrap_or(text);
    let text = text.strip_prefix('v').unwrap_or(text);
    if text.is_empty() {
        return Ok(Partial::default());
    }

    let core_and_pre = text.split_once('+').map_or(text, |(core, _build)| core);
    let (core, pre) = match core_and_pre.split_once('-') {
        Some((core, pre)) => (core, Some(Prerelease::new(pre).map_err(|_| invalid())?)),
        None => (core_and_pre, None),
    };

    let mut numbers = [None; 3];
    let mut wildcard = false;
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 {
        return Err(invalid());
    }
    for (slot, part) in numbers.iter_mut().zip(parts.iter()) {
        if wildcard || matches!(*part, "x" | "X" | "*") {
            wildcard = true;
            continue;
        }
        if part.is_empty()
            || !part.chars().all(|c| c.is_ascii_digit())
            || (part.len() > 1 && part.starts_with('0'))
        {
            return Err(invalid());
        }
        *slot = Some(part.parse::<u64>().map_err(|_| invalid())?);
    }

    let partial = Partial {
        major: numbers[0],
        minor: numbers[1],
        patch: numbers[2],
        pre,
    };
    if partial.pre.is_some() && partial.patch.is_none() {
        return Err(invalid());
    }
    Ok(partial)
}

fn parse_comparator_set(text: &str) -> RegistryResult<Vec<Comparator>> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(vec![Comparator::Any]);
    }

    if tokens.len() == 3 && tokens[1] == "-" {
        return hyphen(&parse_partial(tokens[0])?, &parse_partial(tokens[2])?);
    }

    // Re-attach operators written with a space before the version (`>= 1.2.3`).
    let mut merged: Vec<String> = Vec::new();
    let mut pending = String::new();
    for token in tokens {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending.push_str(token);
            continue;
        }
        merged.push(format!("{pending}{token}"));
        pending.clear();
    }
    if !pending.is_empty() {
        return Err(RegistryError::Unprocessable(format!("dangling operator in {text}")));
    }

    let mut comparators = Vec::new();
    for token in merged {
        comparators.extend(parse_primitive(&token)?);
    }
    Ok(comparators)
}

fn parse_primitive(token: &str) -> RegistryResult<Vec<Comparator>> {
    let split = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^'))
        .unwrap_or(token.len());
    let (symbol, rest) = token.split_at(split);
    let partial = parse_partial(rest)?;
    match symbol {
        "^" => caret(&partial),
        "~" | "~>" => tilde(&partial),
        other => xrange(Operator::from_symbol(other)?, &partial),
    }
}

/// `n + 1`, failing for components already at `u64::MAX`
fn next(n: u64) -> RegistryResult<u64> {
    n.checked_add(1)
        .ok_or_else(|| RegistryError::Unprocessable(format!("version component {n} has no successor")))
}

fn caret(p: &Partial) -> RegistryResult<Vec<Comparator>> {
    let Some(major) = p.major else {
        return Ok(vec![Comparator::Any]);
    };
    let lower = Comparator::bound(Operator::Gte, p.filled());
    let upper = match (p.minor, p.patch) {
        (None, _) => release(next(major)?, 0, 0),
        (Some(_), _) if major > 0 => release(next(major)?, 0, 0),
        (Some(minor), None) => release(0, next(minor)?, 0),
        (Some(minor), Some(_)) if minor > 0 => release(0, next(minor)?, 0),
        (Some(_), Some(patch)) => release(0, 0, next(patch)?),
    };
    Ok(vec![lower, Comparator::bound(Operator::Lt, upper)])
}

fn tilde(p: &Partial) -> RegistryResult<Vec<Comparator>> {
    let Some(major) = p.major else {
        return Ok(vec![Comparator::Any]);
    };
    let upper = match p.minor {
        None => release(next(major)?, 0, 0),
        Some(minor) => release(major, next(minor)?, 0),
    };
    Ok(vec![
        Comparator::bound(Operator::Gte, p.filled()),
        Comparator::bound(Operator::Lt, upper),
    ])
}

fn xrange(operator: Operator, p: &Partial) -> RegistryResult<Vec<Comparator>> {
    let Some(major) = p.major else {
        return Ok(match operator {
            // Nothing is below or above "any version".
            Operator::Lt | Operator::Gt => vec![Comparator::bound(
                Operator::Lt,
                Version {
                    pre: Prerelease::new("0").unwrap_or(Prerelease::EMPTY),
                    ..release(0, 0, 0)
                },
            )],
            _ => vec![Comparator::Any],
        });
    };

    if p.patch.is_some() {
        return Ok(vec![Comparator::bound(operator, p.filled())]);
    }

    // Next release outside the partial: `1` -> 2.0.0, `1.2` -> 1.3.0.
    let upper = match p.minor {
        None => release(next(major)?, 0, 0),
        Some(minor) => release(major, next(minor)?, 0),
    };
    Ok(match operator {
        Operator::Eq => vec![
            Comparator::bound(Operator::Gte, p.filled()),
            Comparator::bound(Operator::Lt, upper),
        ],
        Operator::Gt => vec![Comparator::bound(Operator::Gte, upper)],
        Operator::Lte => vec![Comparator::bound(Operator::Lt, upper)],
        Operator::Gte | Operator::Lt => vec![Comparator::bound(operator, p.filled())],
    })
}

fn hyphen(from: &Partial, to: &Partial) -> RegistryResult<Vec<Comparator>> {
    let mut comparators = Vec::new();
    if from.major.is_some() {
        comparators.push(Comparator::bound(Operator::Gte, from.filled()));
    }
    if let Some(major) = to.major {
        let upper = match (to.minor, to.patch) {
            (None, _) => Comparator::bound(Operator::Lt, release(next(major)?, 0, 0)),
            (Some(minor), None) => Comparator::bound(Operator::Lt, release(major, next(minor)?, 0)),
            (Some(_), Some(_)) => Comparator::bound(Operator::Lte, to.filled()),
        };
        comparators.push(upper);
    }
    if comparators.is_empty() {
        comparators.push(Comparator::Any);
    }
    Ok(comparators)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    fn bounds(range: &str) -> Vec<Vec<String>> {
        Range::parse(range)
            .unwrap()
            .comparator_sets()
            .iter()
            .map(|set| {
                set.iter()
                    .map(|c| match c {
                        Comparator::Any => "*".to_string(),
                        Comparator::Bound { operator, version } => {
                            format!("{}{}", operator.symbol(), version)
                        }
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_caret_desugaring() {
        assert_eq!(bounds("^1.2.3"), vec![vec![">=1.2.3", "<2.0.0"]]);
        assert_eq!(bounds("^0.5.0"), vec![vec![">=0.5.0", "<0.6.0"]]);
        assert_eq!(bounds("^0.0.3"), vec![vec![">=0.0.3", "<0.0.4"]]);
        assert_eq!(bounds("^0.0"), vec![vec![">=0.0.0", "<0.1.0"]]);
        assert_eq!(bounds("^1"), vec![vec![">=1.0.0", "<2.0.0"]]);
    }

    #[test]
    fn test_tilde_and_xranges() {
        assert_eq!(bounds("~1.2.3"), vec![vec![">=1.2.3", "<1.3.0"]]);
        assert_eq!(bounds("~1"), vec![vec![">=1.0.0", "<2.0.0"]]);
        assert_eq!(bounds("1.x"), vec![vec![">=1.0.0", "<2.0.0"]]);
        assert_eq!(bounds("1.2.*"), vec![vec![">=1.2.0", "<1.3.0"]]);
        assert_eq!(bounds("*"), vec![vec!["*"]]);
        assert_eq!(bounds(""), vec![vec!["*"]]);
        assert_eq!(bounds(">1.2"), vec![vec![">=1.3.0"]]);
        assert_eq!(bounds("<=1"), vec![vec!["<2.0.0"]]);
    }

    #[test]
    fn test_union_and_spaced_operators() {
        assert_eq!(
            bounds(">= 1.0.0 < 2.0.0 || 3.0.0"),
            vec![vec![">=1.0.0", "<2.0.0"], vec!["=3.0.0"]]
        );
        assert_eq!(bounds("1.0.0 - 2.0"), vec![vec![">=1.0.0", "<2.1.0"]]);
        assert_eq!(bounds("1.0.0 - 2.0.0"), vec![vec![">=1.0.0", "<=2.0.0"]]);
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(matches!(
            Range::parse("latest"),
            Err(RegistryError::Unprocessable(_))
        ));
        assert!(matches!(
            Range::parse("==1.0.0"),
            Err(RegistryError::UnsupportedOperator(_))
        ));
        assert!(Range::parse("1.2.3.4").is_err());
        assert!(Range::parse(">=").is_err());
    }

    #[test]
    fn test_upper_bound_overflow_is_rejected() {
        let max = u64::MAX;
        for range in [
            format!("^{max}.0.0"),
            format!("^0.{max}.0"),
            format!("^0.0.{max}"),
            format!("~1.{max}"),
            format!("{max}.x"),
            format!("<={max}"),
            format!("1.0.0 - {max}"),
        ] {
            assert!(
                matches!(Range::parse(&range), Err(RegistryError::Unprocessable(_))),
                "range {range}"
            );
        }
        // exact bounds need no successor
        assert!(Range::parse(&format!(">={max}.0.0")).is_ok());
        assert!(Range::parse(&format!("1.0.0 - {max}.0.0")).is_ok());
    }

    #[test]
    fn test_prerelease_needs_same_tuple() {
        let range = Range::parse(">=1.0.0-beta.1 <2.0.0").unwrap();
        assert!(range.satisfies(&v("1.0.0-beta.2")));
        assert!(range.satisfies(&v("1.5.0")));
        assert!(!range.satisfies(&v("1.5.0-beta.1")));

        let caret = Range::parse("^1.0.0").unwrap();
        assert!(!caret.satisfies(&v("1.1.0-alpha")));
        assert!(!Range::parse("*").unwrap().satisfies(&v("1.0.0-rc.1")));
    }

    #[test]
    fn test_max_satisfying_uses_semver_precedence() {
        let range = Range::parse("^0.5.0 || 0.6.0-alpha.5").unwrap();
        let versions = ["0.5.0", "0.5.9", "0.6.0-alpha.5", "0.6.0-alpha.10", "0.6.0"];
        assert_eq!(
            range.max_satisfying(versions.iter().copied()),
            Some("0.6.0-alpha.5".to_string())
        );

        let range = Range::parse(">=1.0.0-alpha.2 <=1.0.0-alpha.10").unwrap();
        let versions = ["1.0.0-alpha.9", "1.0.0-alpha.10", "1.0.0-alpha.2"];
        assert_eq!(
            range.max_satisfying(versions.iter().copied()),
            Some("1.0.0-alpha.10".to_string())
        );
        assert_eq!(Range::parse("^9.0.0").unwrap().max_satisfying(versions.iter().copied()), None);
    }

    #[test]
    fn test_build_metadata_does_not_affect_precedence() {
        assert_eq!(precedence(&v("1.0.0+a"), &v("1.0.0+b")), Ordering::Equal);
        assert_eq!(precedence(&v("1.0.0-rc.1"), &v("1.0.0")), Ordering::Less);
    }
}
