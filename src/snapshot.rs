//! Snapshots are the representative time steps of each year's dispatch.
use crate::id::define_id_type;
use crate::units::Hours;
use indexmap::IndexMap;

define_id_type! {SnapshotID}

/// The snapshots of a model, in order, with the hours each one represents
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshots(IndexMap<SnapshotID, Hours>);

impl Snapshots {
    /// Iterate over snapshot IDs and weights in order
    pub fn iter(&self) -> impl Iterator<Item = (&SnapshotID, Hours)> {
        self.0.iter().map(|(id, weight)| (id, *weight))
    }

    /// The weights of the snapshots, in order
    pub fn weights(&self) -> impl Iterator<Item = Hours> + '_ {
        self.0.values().copied()
    }

    /// The position of a snapshot in the ordering
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.0.get_index_of(id)
    }

    /// Number of snapshots
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no snapshots
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total hours represented by all snapshots
    pub fn total_hours(&self) -> Hours {
        self.weights().sum()
    }
}

impl FromIterator<(SnapshotID, Hours)> for Snapshots {
    fn from_iter<T: IntoIterator<Item = (SnapshotID, Hours)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshots() {
        let snapshots: Snapshots = [("peak".into(), Hours(1000.0)), ("base".into(), Hours(7760.0))]
            .into_iter()
            .collect();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots.index_of("base"), Some(1));
        assert_eq!(snapshots.index_of("night"), None);
        assert_eq!(snapshots.total_hours(), Hours(8760.0));
    }
}
