//! Two-way binding between the externally owned selected-id list and the
//! per-row selection map.
//!
//! Inbound and outbound sync are two separate equality-gated steps, each with
//! its own "last seen" sentinel. Neither step fires when the other side
//! already holds the same set, which is what keeps them from feeding each
//! other.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::models::ProfileId;

#[derive(Debug, Default)]
pub struct SelectionReconciler {
    rows: BTreeMap<ProfileId, bool>,
    /// External list as of the last inbound sync or outbound write. The
    /// external owner starts out empty.
    observed_external: HashSet<ProfileId>,
    /// Set most recently written to (or read from) the external owner.
    pushed: HashSet<ProfileId>,
    /// Internal map changed since the last outbound sync.
    dirty: bool,
    show_affordances: bool,
    rebuilds: usize,
}

impl SelectionReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// External -> internal. Rebuilds the row map only when the external
    /// list holds a different set than last observed. Returns whether a
    /// rebuild happened.
    pub fn sync_inbound(&mut self, external: &[ProfileId]) -> bool {
        let incoming: HashSet<ProfileId> = external.iter().cloned().collect();
        if self.observed_external == incoming {
            return false;
        }
        self.rows = incoming.iter().map(|id| (id.clone(), true)).collect();
        self.pushed = incoming.clone();
        self.observed_external = incoming;
        self.dirty = false;
        self.rebuilds += 1;
        self.refresh_affordances();
        debug!(selected = self.pushed.len(), "selection rebuilt from external list");
        true
    }

    /// Internal -> external. Returns the list to hand to the external owner,
    /// or `None` when the selected set equals what was last pushed. Ids the
    /// external list already held keep their position; new ids are appended.
    pub fn sync_outbound(&mut self, current_external: &[ProfileId]) -> Option<Vec<ProfileId>> {
        if !std::mem::take(&mut self.dirty) {
            return None;
        }
        let selected = self.selected_set();
        if selected == self.pushed {
            return None;
        }
        let mut next: Vec<ProfileId> = current_external
            .iter()
            .filter(|id| selected.contains(*id))
            .cloned()
            .collect();
        let kept: HashSet<&ProfileId> = next.iter().collect();
        let added: Vec<ProfileId> = self
            .rows
            .iter()
            .filter(|(id, &on)| on && !kept.contains(id))
            .map(|(id, _)| id.clone())
            .collect();
        next.extend(added);

        self.observed_external = selected.clone();
        self.pushed = selected;
        Some(next)
    }

    /// Flip one row. Turning a row on requires it to be selectable; turning
    /// it off is always allowed. Returns whether the row changed.
    pub fn toggle(&mut self, id: &ProfileId, selectable: bool) -> bool {
        if self.is_selected(id) {
            self.rows.insert(id.clone(), false);
        } else if selectable {
            self.rows.insert(id.clone(), true);
        } else {
            return false;
        }
        self.dirty = true;
        self.refresh_affordances();
        true
    }

    /// Add every given id. Callers pass only selectable ids; rows already
    /// selected stay selected. Returns how many rows were added.
    pub fn select_all<'a>(&mut self, selectable: impl IntoIterator<Item = &'a ProfileId>) -> usize {
        let mut added = 0;
        for id in selectable {
            if !self.is_selected(id) {
                self.rows.insert(id.clone(), true);
                added += 1;
            }
        }
        if added > 0 {
            self.dirty = true;
            self.refresh_affordances();
        }
        added
    }

    pub fn clear(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.rows.clear();
        self.dirty = true;
        self.refresh_affordances();
        true
    }

    pub fn is_selected(&self, id: &ProfileId) -> bool {
        self.rows.get(id).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.rows.values().filter(|&&on| on).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Selected ids in id order.
    pub fn selected(&self) -> Vec<ProfileId> {
        self.rows
            .iter()
            .filter(|(_, &on)| on)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn show_affordances(&self) -> bool {
        self.show_affordances
    }

    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    fn selected_set(&self) -> HashSet<ProfileId> {
        self.rows
            .iter()
            .filter(|(_, &on)| on)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn refresh_affordances(&mut self) {
        self.show_affordances = !self.is_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<ProfileId> {
        list.iter().map(|s| ProfileId::from(*s)).collect()
    }

    fn id(s: &str) -> ProfileId {
        ProfileId::from(s)
    }

    #[test]
    fn reordered_external_list_is_not_churn() {
        let mut sel = SelectionReconciler::new();
        assert!(sel.sync_inbound(&ids(&["A", "B"])));
        assert_eq!(sel.sync_outbound(&ids(&["A", "B"])), None);
        assert!(!sel.sync_inbound(&ids(&["B", "A"])));
        assert_eq!(sel.sync_outbound(&ids(&["B", "A"])), None);
        assert_eq!(sel.rebuilds(), 1);
        assert!(sel.is_selected(&id("A")));
        assert!(sel.is_selected(&id("B")));
    }

    #[test]
    fn inbound_rebuilds_from_scratch() {
        let mut sel = SelectionReconciler::new();
        sel.toggle(&id("X"), true);
        assert!(sel.sync_inbound(&ids(&["A"])));
        assert!(!sel.is_selected(&id("X")));
        assert_eq!(sel.selected(), ids(&["A"]));
    }

    #[test]
    fn toggle_pushes_outward_once() {
        let mut sel = SelectionReconciler::new();
        sel.sync_inbound(&ids(&["A"]));
        assert!(sel.toggle(&id("B"), true));
        let pushed = sel.sync_outbound(&ids(&["A"])).unwrap();
        assert_eq!(pushed, ids(&["A", "B"]));
        // The write-back seen again from outside does not rebuild.
        assert!(!sel.sync_inbound(&pushed));
        assert_eq!(sel.sync_outbound(&pushed), None);
        assert_eq!(sel.rebuilds(), 1);
    }

    #[test]
    fn outbound_keeps_external_order() {
        let mut sel = SelectionReconciler::new();
        sel.sync_inbound(&ids(&["C", "A", "B"]));
        sel.toggle(&id("A"), true);
        sel.toggle(&id("D"), true);
        let pushed = sel.sync_outbound(&ids(&["C", "A", "B"])).unwrap();
        assert_eq!(pushed, ids(&["C", "B", "D"]));
    }

    #[test]
    fn toggle_back_to_same_set_pushes_nothing() {
        let mut sel = SelectionReconciler::new();
        sel.sync_inbound(&ids(&["A"]));
        sel.toggle(&id("B"), true);
        sel.toggle(&id("B"), true);
        assert_eq!(sel.sync_outbound(&ids(&["A"])), None);
    }

    #[test]
    fn unselectable_row_cannot_enter_but_can_leave() {
        let mut sel = SelectionReconciler::new();
        assert!(!sel.toggle(&id("busy"), false));
        assert!(!sel.is_selected(&id("busy")));

        sel.toggle(&id("A"), true);
        // A became busy after being selected; user may still drop it.
        assert!(sel.toggle(&id("A"), false));
        assert!(!sel.is_selected(&id("A")));
    }

    #[test]
    fn select_all_only_adds() {
        let mut sel = SelectionReconciler::new();
        sel.toggle(&id("running"), true);
        let eligible = ids(&["a", "b"]);
        assert_eq!(sel.select_all(&eligible), 2);
        assert_eq!(sel.select_all(&eligible), 0);
        assert!(sel.is_selected(&id("running")));
        assert_eq!(sel.len(), 3);
    }

    #[test]
    fn affordances_follow_emptiness() {
        let mut sel = SelectionReconciler::new();
        assert!(!sel.show_affordances());
        sel.toggle(&id("A"), true);
        assert!(sel.show_affordances());
        sel.toggle(&id("B"), true);
        sel.toggle(&id("A"), true);
        assert!(sel.show_affordances());
        sel.toggle(&id("B"), true);
        assert!(!sel.show_affordances());

        sel.sync_inbound(&ids(&["C"]));
        assert!(sel.show_affordances());
        sel.clear();
        assert!(!sel.show_affordances());
    }

    #[test]
    fn clear_pushes_empty_list() {
        let mut sel = SelectionReconciler::new();
        sel.sync_inbound(&ids(&["A", "B"]));
        assert!(sel.clear());
        assert_eq!(sel.sync_outbound(&ids(&["A", "B"])), Some(Vec::new()));
        assert!(!sel.clear());
        // External owner now holds the empty list.
        assert!(!sel.sync_inbound(&[]));
    }

    #[test]
    fn external_change_after_push_is_picked_up() {
        let mut sel = SelectionReconciler::new();
        sel.toggle(&id("A"), true);
        let pushed = sel.sync_outbound(&[]).unwrap();
        assert_eq!(pushed, ids(&["A"]));
        assert!(sel.sync_inbound(&ids(&["A", "Z"])));
        assert!(sel.is_selected(&id("Z")));
        assert_eq!(sel.rebuilds(), 1);
    }
}
