//! Compiles a semver range into a boolean condition over the
//! `padding_version` / `is_pre_release` columns of `package_versions`.

use crate::error::RegistryResult;
use crate::version::padding::{ANY_VERSION, PaddingSemVer};
use crate::version::range::{Comparator, Operator, Range};

/// Condition tree mirroring the SQL `WHERE` clause it is rendered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Or(Vec<Condition>),
    And(Vec<Condition>),
    /// `is_pre_release <= n`; 0 excludes prereleases, 1 admits them.
    IsPreReleaseLte(u8),
    PaddingVersion(Operator, String),
}

#[derive(Debug, Clone)]
pub struct SqlRange {
    range: Range,
    condition: Condition,
    contain_pre_release: bool,
}

impl SqlRange {
    pub fn new(raw: &str) -> RegistryResult<Self> {
        Self::from_range(Range::parse(raw)?)
    }

    pub fn from_range(range: Range) -> RegistryResult<Self> {
        let mut contain_pre_release = false;
        let mut groups = Vec::with_capacity(range.comparator_sets().len());
        for comparators in range.comparator_sets() {
            let mut group = Vec::with_capacity(comparators.len());
            for comparator in comparators {
                let condition = match comparator {
                    Comparator::Any => Condition::And(vec![
                        Condition::IsPreReleaseLte(0),
                        Condition::PaddingVersion(Operator::Gte, ANY_VERSION.to_string()),
                    ]),
                    Comparator::Bound { operator, version } => {
                        let encoded = PaddingSemVer::from_version(version)?;
                        let allows_pre_release = encoded.is_pre_release();
                        contain_pre_release |= allows_pre_release;
                        Condition::And(vec![
                            Condition::IsPreReleaseLte(u8::from(allows_pre_release)),
                            Condition::PaddingVersion(
                                *operator,
                                encoded.padding_version().to_string(),
                            ),
                        ])
                    }
                };
                group.push(condition);
            }
            groups.push(Condition::And(group));
        }

        Ok(Self {
            range,
            condition: Condition::Or(groups),
            contain_pre_release,
        })
    }

    pub fn range(&self) -> &Range {
        &self.range
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// True when some comparator names a prerelease; `ORDER BY padding_version`
    /// cannot pick the maximum for such ranges.
    pub fn contain_pre_release(&self) -> bool {
        self.contain_pre_release
    }
}
