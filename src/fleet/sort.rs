//! Ordering and partitioning of the record list.
//!
//! The engine never touches the record list itself; it returns the visible
//! order as indices into it.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::ProfileRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Name,
    Browser,
    Version,
    Group,
    CreatedAt,
}

impl SortColumn {
    pub fn label(self) -> &'static str {
        match self {
            SortColumn::Name => "Name",
            SortColumn::Browser => "Browser",
            SortColumn::Version => "Version",
            SortColumn::Group => "Group",
            SortColumn::CreatedAt => "Created",
        }
    }

    fn next(self) -> Self {
        match self {
            SortColumn::Name => SortColumn::Browser,
            SortColumn::Browser => SortColumn::Version,
            SortColumn::Version => SortColumn::Group,
            SortColumn::Group => SortColumn::CreatedAt,
            SortColumn::CreatedAt => SortColumn::Name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Asc => "▲",
            SortDirection::Desc => "▼",
        }
    }
}

/// Active sort: one column, one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            column: SortColumn::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl SortSpec {
    pub fn new(column: SortColumn, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    pub fn cycle_column(&mut self) {
        self.column = self.column.next();
    }

    pub fn toggle_direction(&mut self) {
        self.direction = match self.direction {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        };
    }

    fn compare(&self, a: &ProfileRecord, b: &ProfileRecord) -> Ordering {
        let cmp = match self.column {
            SortColumn::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortColumn::Browser => a.browser.cmp(&b.browser),
            SortColumn::Version => a.version.cmp(&b.version),
            SortColumn::Group => a.group_id.cmp(&b.group_id),
            SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        apply_direction(cmp, self.direction)
    }
}

fn apply_direction(cmp: Ordering, dir: SortDirection) -> Ordering {
    if dir == SortDirection::Desc {
        cmp.reverse()
    } else {
        cmp
    }
}

/// Named views over the record list, split on the remote-link field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    #[default]
    All,
    /// Not linked to the remote directory.
    Local,
    /// Linked to the remote directory.
    Linked,
}

impl Partition {
    pub fn all() -> &'static [Partition] {
        &[Partition::All, Partition::Local, Partition::Linked]
    }

    pub fn label(self) -> &'static str {
        match self {
            Partition::All => "All",
            Partition::Local => "Local",
            Partition::Linked => "Linked",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Partition::All => 0,
            Partition::Local => 1,
            Partition::Linked => 2,
        }
    }

    pub fn matches(self, record: &ProfileRecord) -> bool {
        match self {
            Partition::All => true,
            Partition::Local => !record.is_linked(),
            Partition::Linked => record.is_linked(),
        }
    }
}

fn matches_text(record: &ProfileRecord, needle: &str) -> bool {
    record.name.to_lowercase().contains(needle)
        || record.tags.iter().any(|t| t.to_lowercase().contains(needle))
        || record
            .group_id
            .as_deref()
            .is_some_and(|g| g.to_lowercase().contains(needle))
}

/// Indices into `records` for the active partition and text filter, sorted by
/// `spec`. Ties keep registry order: the sort is stable and always starts
/// from the registry order, so switching columns never inherits the previous
/// column's ordering.
pub fn visible_order(
    records: &[ProfileRecord],
    partition: Partition,
    filter_text: &str,
    spec: SortSpec,
) -> Vec<usize> {
    let needle = filter_text.trim().to_lowercase();
    let mut order: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| partition.matches(r))
        .filter(|(_, r)| needle.is_empty() || matches_text(r, &needle))
        .map(|(i, _)| i)
        .collect();
    order.sort_by(|&a, &b| spec.compare(&records[a], &records[b]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, name: &str, browser: &str, created_at: u64) -> ProfileRecord {
        ProfileRecord::new(id, name, browser, created_at)
    }

    fn ids(records: &[ProfileRecord], order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| records[i].id.to_string()).collect()
    }

    #[test]
    fn default_is_created_desc() {
        let records = vec![rec("a", "a", "x", 1), rec("b", "b", "x", 3), rec("c", "c", "x", 2)];
        let order = visible_order(&records, Partition::All, "", SortSpec::default());
        assert_eq!(ids(&records, &order), vec!["b", "c", "a"]);
    }

    #[test]
    fn equal_keys_keep_registry_order() {
        let records = vec![
            rec("a", "a", "wayfern", 1),
            rec("b", "b", "camoufox", 1),
            rec("c", "c", "wayfern", 1),
            rec("d", "d", "camoufox", 1),
        ];
        let spec = SortSpec::new(SortColumn::Browser, SortDirection::Asc);
        let order = visible_order(&records, Partition::All, "", spec);
        assert_eq!(ids(&records, &order), vec!["b", "d", "a", "c"]);

        // Descending reverses keys but not the tie-break.
        let spec = SortSpec::new(SortColumn::Browser, SortDirection::Desc);
        let order = visible_order(&records, Partition::All, "", spec);
        assert_eq!(ids(&records, &order), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn changing_column_resets_tie_break() {
        let records = vec![
            rec("a", "same", "wayfern", 2),
            rec("b", "same", "camoufox", 1),
        ];
        let by_browser = SortSpec::new(SortColumn::Browser, SortDirection::Asc);
        assert_eq!(
            ids(&records, &visible_order(&records, Partition::All, "", by_browser)),
            vec!["b", "a"]
        );
        let by_name = SortSpec::new(SortColumn::Name, SortDirection::Asc);
        assert_eq!(
            ids(&records, &visible_order(&records, Partition::All, "", by_name)),
            vec!["a", "b"]
        );
    }

    #[test]
    fn name_sort_ignores_case() {
        let records = vec![rec("a", "beta", "x", 0), rec("b", "Alpha", "x", 0)];
        let spec = SortSpec::new(SortColumn::Name, SortDirection::Asc);
        let order = visible_order(&records, Partition::All, "", spec);
        assert_eq!(ids(&records, &order), vec!["b", "a"]);
    }

    #[test]
    fn partitions_split_on_remote_link() {
        let mut linked = rec("l", "l", "x", 0);
        linked.remote_id = Some("17".to_string());
        let mut blank = rec("b", "b", "x", 0);
        blank.remote_id = Some(String::new());
        let local = rec("n", "n", "x", 0);
        let records = vec![linked, blank, local];
        let spec = SortSpec::new(SortColumn::Name, SortDirection::Asc);

        assert_eq!(visible_order(&records, Partition::All, "", spec).len(), 3);
        assert_eq!(
            ids(&records, &visible_order(&records, Partition::Local, "", spec)),
            vec!["b", "n"]
        );
        assert_eq!(
            ids(&records, &visible_order(&records, Partition::Linked, "", spec)),
            vec!["l"]
        );
    }

    #[test]
    fn text_filter_matches_name_tag_group() {
        let mut tagged = rec("t", "plain", "x", 0);
        tagged.tags = vec!["Shopping".to_string()];
        let mut grouped = rec("g", "other", "x", 0);
        grouped.group_id = Some("shop-team".to_string());
        let named = rec("n", "my SHOP", "x", 0);
        let miss = rec("m", "unrelated", "x", 0);
        let records = vec![tagged, grouped, named, miss];
        let spec = SortSpec::new(SortColumn::Name, SortDirection::Asc);
        let order = visible_order(&records, Partition::All, "  shop ", spec);
        assert_eq!(ids(&records, &order), vec!["n", "g", "t"]);
    }

    #[test]
    fn cycle_column_visits_all() {
        let mut spec = SortSpec::default();
        let start = spec.column;
        let mut seen = vec![start];
        loop {
            spec.cycle_column();
            if spec.column == start {
                break;
            }
            seen.push(spec.column);
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn toggle_direction_flips() {
        let mut spec = SortSpec::default();
        spec.toggle_direction();
        assert_eq!(spec.direction, SortDirection::Asc);
        spec.toggle_direction();
        assert_eq!(spec.direction, SortDirection::Desc);
    }

    #[test]
    fn sort_spec_serde_shape() {
        let spec = SortSpec::new(SortColumn::CreatedAt, SortDirection::Desc);
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(json, r#"{"column":"created_at","direction":"desc"}"#);
    }
}
