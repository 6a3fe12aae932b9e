//! Benchmark parameter grid: `(batch count, batch size)` pairs in the compact
//! `<count>x<size>` text form, e.g. `"1x100000 10x10000"`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::BenchError;

pub const DEFAULT_PARAMETERS: &str =
    "1x100000 10x10000 100x1000 1x1000000 10x100000 100x10000 1000x1000";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub batch_count: usize,
    pub batch_size: usize,
}

impl Parameter {
    pub fn new(batch_count: usize, batch_size: usize) -> Self {
        Self {
            batch_count,
            batch_size,
        }
    }

    /// Rows of the whole trial. Saturates for pairs that were never parsed;
    /// parsed pairs are guaranteed to fit.
    pub fn total_rows(&self) -> usize {
        self.batch_count.saturating_mul(self.batch_size)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.batch_count, self.batch_size)
    }
}

impl FromStr for Parameter {
    type Err = BenchError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = token.split('x').collect();
        let &[count, size] = parts.as_slice() else {
            return Err(BenchError::Format(token.to_string()));
        };
        let parse = |s: &str| {
            s.parse::<usize>().map_err(|source| BenchError::FormatInt {
                token: token.to_string(),
                source,
            })
        };
        let (batch_count, batch_size) = (parse(count)?, parse(size)?);
        if batch_count.checked_mul(batch_size).is_none() {
            return Err(BenchError::Format(token.to_string()));
        }
        Ok(Self::new(batch_count, batch_size))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterSet(pub Vec<Parameter>);

impl ParameterSet {
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Groups parameters with the same total row count, ascending by that
    /// count. Members of a group keep their original relative order.
    pub fn group_by_total_rows(&self) -> Vec<ParameterSet> {
        let mut groups: BTreeMap<usize, Vec<Parameter>> = BTreeMap::new();
        for prm in &self.0 {
            groups.entry(prm.total_rows()).or_default().push(*prm);
        }
        groups.into_values().map(ParameterSet).collect()
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, prm) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{prm}")?;
        }
        Ok(())
    }
}

impl FromStr for ParameterSet {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(BenchError::Format(s.to_string()));
        }
        s.split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(ParameterSet)
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(prms: &[(usize, usize)]) -> ParameterSet {
        ParameterSet(prms.iter().map(|&(c, s)| Parameter::new(c, s)).collect())
    }

    #[test]
    fn parses_default_grid() {
        let prms: ParameterSet = DEFAULT_PARAMETERS.parse().unwrap();
        assert_eq!(prms.len(), 7);
        assert_eq!(prms.0[0], Parameter::new(1, 100_000));
        assert_eq!(prms.0[6], Parameter::new(1000, 1000));
        assert_eq!(prms.to_string(), DEFAULT_PARAMETERS);
    }

    #[test]
    fn format_round_trips() {
        for text in ["1x100000 10x10000", "0x0", "7x3 7x3 2x9"] {
            let prms: ParameterSet = text.parse().unwrap();
            assert_eq!(prms.to_string(), text);
        }
    }

    #[test]
    fn rejects_malformed_tokens() {
        for text in ["1x", "x5", "abc", "1-5", "1x2x3", "-1x5", "", "1x5 2y6"] {
            let err = text.parse::<ParameterSet>().unwrap_err();
            assert!(
                matches!(err, BenchError::Format(_) | BenchError::FormatInt { .. }),
                "{text:?}: unexpected {err:?}"
            );
        }
    }

    #[test]
    fn rejects_overflowing_totals() {
        let err = "10000000000x10000000000 1x5".parse::<ParameterSet>().unwrap_err();
        assert!(matches!(err, BenchError::Format(ref t) if t == "10000000000x10000000000"));

        let max = format!("{}x1", usize::MAX);
        assert_eq!(max.parse::<Parameter>().unwrap().total_rows(), usize::MAX);
        assert_eq!(Parameter::new(usize::MAX, 2).total_rows(), usize::MAX);
    }

    #[test]
    fn groups_colliding_totals_in_order() {
        let groups = set(&[(1, 100_000), (10, 10_000), (2, 50_000)]).group_by_total_rows();
        assert_eq!(groups, vec![set(&[(1, 100_000), (10, 10_000), (2, 50_000)])]);
    }

    #[test]
    fn groups_sorted_by_total() {
        let prms: ParameterSet = DEFAULT_PARAMETERS.parse().unwrap();
        let groups = prms.group_by_total_rows();
        assert_eq!(
            groups,
            vec![
                set(&[(1, 100_000), (10, 10_000), (100, 1000)]),
                set(&[(1, 1_000_000), (10, 100_000), (100, 10_000), (1000, 1000)]),
            ]
        );
    }
}
