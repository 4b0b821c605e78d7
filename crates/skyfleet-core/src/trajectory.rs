//! Per-object position histories.
//!
//! A [`Trajectory`] is stored as slots indexed by snapshot hour: slot `h`
//! holds the position reported `h` hours ago. Slots are written by snapshot
//! index, never by arrival order, so concurrent ingestion and failed hours
//! cannot shift samples in time.
//!
//! The [`TrajectoryStore`] is built once by the ingestor and is read-only
//! afterwards.

use std::collections::BTreeMap;

use serde::Serialize;

use skyfleet_types::{ObjectKey, Position, Snapshot};

use crate::error::{Error, Result};

/// An object's hourly position history, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trajectory {
    slots: Vec<Option<Position>>,
}

impl Trajectory {
    /// Create an empty trajectory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trajectory with every slot populated, index 0 first.
    pub fn from_positions(positions: impl IntoIterator<Item = Position>) -> Self {
        Self {
            slots: positions.into_iter().map(Some).collect(),
        }
    }

    /// Create a trajectory from explicit slots. Trailing empty slots are dropped.
    pub fn from_slots(slots: Vec<Option<Position>>) -> Self {
        let mut trajectory = Self { slots };
        trajectory.trim();
        trajectory
    }

    fn trim(&mut self) {
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
    }

    /// Record the position contributed by snapshot `index`.
    pub(crate) fn record(&mut self, index: usize, position: Position) {
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(position);
    }

    /// Populated length: highest recorded slot + 1.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no position was ever recorded.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots that actually hold a position.
    pub fn recorded(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// The position at `index`, if one was recorded.
    pub fn get(&self, index: usize) -> Option<&Position> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// The position at `index`.
    ///
    /// Fails with [`Error::IndexOutOfRange`] beyond the populated length and
    /// with [`Error::MissingSample`] for a slot whose snapshot never arrived.
    pub fn position_at(&self, index: usize) -> Result<Position> {
        match self.slots.get(index) {
            Some(Some(position)) => Ok(*position),
            Some(None) => Err(Error::MissingSample { index }),
            None => Err(Error::IndexOutOfRange {
                index,
                len: self.slots.len(),
            }),
        }
    }

    /// The most recent recorded sample and its slot index.
    pub fn latest(&self) -> Option<(usize, Position)> {
        self.samples().next()
    }

    /// Recorded samples as `(slot index, position)`, most recent first.
    pub fn samples(&self) -> impl Iterator<Item = (usize, Position)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|p| (i, p)))
    }
}

/// Mapping from object identity to its trajectory.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryStore {
    trajectories: BTreeMap<ObjectKey, Trajectory>,
}

impl TrajectoryStore {
    /// Create an empty store (no snapshot has succeeded yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold settled snapshots into a store.
    ///
    /// Each `(hour, snapshot)` pair writes slot `hour` of every object the
    /// snapshot lists, so the result does not depend on iteration order.
    pub fn from_snapshots<'a, I>(snapshots: I) -> Self
    where
        I: IntoIterator<Item = (u8, &'a Snapshot)>,
    {
        snapshots
            .into_iter()
            .fold(Self::new(), |mut store, (hour, snapshot)| {
                store.merge(hour, snapshot);
                store
            })
    }

    fn merge(&mut self, hour: u8, snapshot: &Snapshot) {
        for (key, position) in snapshot.iter() {
            self.trajectories
                .entry(key)
                .or_default()
                .record(usize::from(hour), *position);
        }
    }

    /// The trajectory for `key`, absent for keys no snapshot listed.
    pub fn get(&self, key: ObjectKey) -> Option<&Trajectory> {
        self.trajectories.get(&key)
    }

    /// The position of `key` at trajectory `index`.
    pub fn position_at(&self, key: ObjectKey, index: usize) -> Result<Position> {
        self.get(key)
            .ok_or(Error::UnknownKey(key))?
            .position_at(index)
    }

    /// Whether `key` appears in any snapshot.
    pub fn contains(&self, key: ObjectKey) -> bool {
        self.trajectories.contains_key(&key)
    }

    /// Number of tracked objects.
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    /// Whether no snapshot has contributed anything.
    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Tracked keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.trajectories.keys().copied()
    }

    /// Iterate `(key, trajectory)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectKey, &Trajectory)> {
        self.trajectories.iter().map(|(k, t)| (*k, t))
    }

    /// Last-known position of every object, for the marker collaborator.
    pub fn latest_positions(&self) -> Vec<(ObjectKey, Position)> {
        self.iter()
            .filter_map(|(key, t)| t.latest().map(|(_, p)| (key, p)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(points: &[(f64, f64)]) -> Snapshot {
        Snapshot {
            positions: points.iter().map(|&(lat, lng)| Position::new(lat, lng)).collect(),
        }
    }

    #[test]
    fn test_trajectory_position_at() {
        let t = Trajectory::from_slots(vec![
            Some(Position::new(1.0, 1.0)),
            None,
            Some(Position::new(3.0, 3.0)),
        ]);

        assert_eq!(t.len(), 3);
        assert_eq!(t.recorded(), 2);
        assert_eq!(t.position_at(0).unwrap(), Position::new(1.0, 1.0));
        assert!(matches!(t.position_at(1), Err(Error::MissingSample { index: 1 })));
        assert!(matches!(
            t.position_at(3),
            Err(Error::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_trajectory_trims_trailing_gaps() {
        let t = Trajectory::from_slots(vec![Some(Position::new(1.0, 1.0)), None, None]);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_trajectory_latest_skips_missing_current_hour() {
        let t = Trajectory::from_slots(vec![None, Some(Position::new(2.0, 2.0))]);
        assert_eq!(t.latest(), Some((1, Position::new(2.0, 2.0))));
    }

    #[test]
    fn test_empty_trajectory() {
        let t = Trajectory::new();
        assert!(t.is_empty());
        assert!(t.latest().is_none());
        assert!(matches!(
            t.position_at(0),
            Err(Error::IndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_store_from_snapshots_slots_by_hour() {
        let now = snapshot(&[(10.0, 20.0), (30.0, 40.0)]);
        let two_hours_ago = snapshot(&[(11.0, 21.0), (31.0, 41.0)]);

        // Arrival order is deliberately reversed
        let store = TrajectoryStore::from_snapshots([(2, &two_hours_ago), (0, &now)]);

        assert_eq!(store.len(), 2);
        let t = store.get(ObjectKey::new(1)).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.position_at(0).unwrap(), Position::new(30.0, 40.0));
        assert!(matches!(t.position_at(1), Err(Error::MissingSample { .. })));
        assert_eq!(t.position_at(2).unwrap(), Position::new(31.0, 41.0));
    }

    #[test]
    fn test_store_order_independent() {
        let a = snapshot(&[(1.0, 1.0)]);
        let b = snapshot(&[(2.0, 2.0)]);
        let c = snapshot(&[(3.0, 3.0)]);

        let forward = TrajectoryStore::from_snapshots([(0, &a), (1, &b), (2, &c)]);
        let shuffled = TrajectoryStore::from_snapshots([(2, &c), (0, &a), (1, &b)]);

        assert_eq!(
            forward.get(ObjectKey::new(0)),
            shuffled.get(ObjectKey::new(0))
        );
    }

    #[test]
    fn test_store_unknown_key() {
        let store = TrajectoryStore::from_snapshots([(0, &snapshot(&[(1.0, 1.0)]))]);
        assert!(store.get(ObjectKey::new(5)).is_none());
        assert!(matches!(
            store.position_at(ObjectKey::new(5), 0),
            Err(Error::UnknownKey(_))
        ));
    }

    #[test]
    fn test_empty_store() {
        let store = TrajectoryStore::new();
        assert!(store.is_empty());
        assert!(store.get(ObjectKey::new(0)).is_none());
        assert!(store.latest_positions().is_empty());
    }

    #[test]
    fn test_latest_positions() {
        let now = snapshot(&[(10.0, 20.0), (30.0, 40.0)]);
        let earlier = snapshot(&[(11.0, 21.0), (31.0, 41.0), (50.0, 60.0)]);
        let store = TrajectoryStore::from_snapshots([(0, &now), (1, &earlier)]);

        let latest = store.latest_positions();
        assert_eq!(
            latest,
            vec![
                (ObjectKey::new(0), Position::new(10.0, 20.0)),
                (ObjectKey::new(1), Position::new(30.0, 40.0)),
                // only present an hour ago
                (ObjectKey::new(2), Position::new(50.0, 60.0)),
            ]
        );
    }
}
