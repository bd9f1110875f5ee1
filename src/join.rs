use crate::types::{JoinedValue, RegionId, StatRecord};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Resolves `id` against `stats` by linear scan; the first matching record wins.
pub fn join(id: RegionId, stats: &[StatRecord]) -> JoinedValue<'_> {
    stats
        .iter()
        .find(|record| record.fips == id)
        .map(JoinedValue::from_record)
        .unwrap_or_else(|| JoinedValue::unmatched(id))
}

/// Statistic records keyed by FIPS code, built once per dataset load.
///
/// Lookups return exactly what [`join`] returns over the same records,
/// including first-wins resolution of duplicate codes.
#[derive(Debug, Clone, Default)]
pub struct StatIndex {
    records: Vec<StatRecord>,
    by_id: HashMap<RegionId, usize>,
    duplicates: usize,
}

impl StatIndex {
    pub fn new(records: Vec<StatRecord>) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        let mut duplicates = 0;

        for (i, record) in records.iter().enumerate() {
            if by_id.contains_key(&record.fips) {
                debug!("Duplicate statistic for FIPS {}, keeping the first", record.fips);
                duplicates += 1;
            } else {
                by_id.insert(record.fips, i);
            }
        }

        if duplicates > 0 {
            warn!("{} duplicate FIPS codes in statistics; first occurrence kept", duplicates);
        }

        StatIndex {
            records,
            by_id,
            duplicates,
        }
    }

    pub fn join(&self, id: RegionId) -> JoinedValue<'_> {
        self.get(id)
            .map(JoinedValue::from_record)
            .unwrap_or_else(|| JoinedValue::unmatched(id))
    }

    pub fn get(&self, id: RegionId) -> Option<&StatRecord> {
        self.by_id.get(&id).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[StatRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Largest statistic, or `None` for an empty dataset.
    pub fn max_value(&self) -> Option<f64> {
        self.records
            .iter()
            .map(|r| r.bachelors_or_higher)
            .filter(|v| !v.is_nan())
            .fold(None, |max, v| Some(max.map_or(v, |m: f64| m.max(v))))
    }
}
