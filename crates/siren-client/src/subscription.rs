//! Location-derived interest regions and their subscription deltas.

use std::collections::BTreeSet;

use siren_types::GeoPoint;

/// Topic prefix for geocell subscriptions on the wire.
const TOPIC_PREFIX: &str = "geo:";

/// The subscribe/unsubscribe lists produced by one location change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionDelta {
    pub subscribe: Vec<String>,
    pub unsubscribe: Vec<String>,
}

/// The set of region topics this client is interested in: the geocell
/// containing the device plus its 8 neighbors.
#[derive(Debug, Default)]
pub struct InterestSet {
    current: BTreeSet<String>,
}

impl InterestSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current topics, for a full resubscribe after reconnect.
    pub fn topics(&self) -> Vec<String> {
        self.current.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Recompute the interest set for a new location (`None` clears it) and
    /// return the delta against the previous set, or `None` when nothing
    /// changed — repeated calls from within one cell cause no traffic.
    ///
    /// The owned set is replaced even when the caller cannot deliver the
    /// delta (e.g. disconnected): the next call still diffs correctly, and
    /// the connection's reopen handler reissues the full set.
    pub fn rebuild(
        &mut self,
        location: Option<GeoPoint>,
        precision: usize,
    ) -> Option<SubscriptionDelta> {
        let next: BTreeSet<String> = match location {
            Some(point) => siren_geo::covering_of(point, precision)
                .into_iter()
                .map(|cell| format!("{TOPIC_PREFIX}{cell}"))
                .collect(),
            None => BTreeSet::new(),
        };

        if next == self.current {
            return None;
        }

        let delta = SubscriptionDelta {
            subscribe: next.difference(&self.current).cloned().collect(),
            unsubscribe: self.current.difference(&next).cloned().collect(),
        };
        self.current = next;
        Some(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRECISION: usize = 6;

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint { lat, lng }
    }

    #[test]
    fn first_location_subscribes_the_full_covering() {
        let mut set = InterestSet::new();
        let delta = set.rebuild(Some(point(57.64911, 10.40744)), PRECISION).unwrap();

        assert_eq!(delta.subscribe.len(), 9);
        assert!(delta.unsubscribe.is_empty());
        assert!(delta.subscribe.iter().all(|t| t.starts_with("geo:")));
        assert_eq!(set.topics().len(), 9);
    }

    #[test]
    fn same_cell_movement_causes_no_traffic() {
        let mut set = InterestSet::new();
        set.rebuild(Some(point(57.64911, 10.40744)), PRECISION).unwrap();

        // A few meters away, same precision-6 cell.
        assert!(set.rebuild(Some(point(57.64915, 10.40749)), PRECISION).is_none());
        assert!(set.rebuild(Some(point(57.64911, 10.40744)), PRECISION).is_none());
    }

    #[test]
    fn lateral_cell_crossing_diffs_exactly_the_edge_columns() {
        let mut set = InterestSet::new();
        let origin = point(57.64911, 10.40744);
        let first = set.rebuild(Some(origin), PRECISION).unwrap();

        // Move to the center of the west neighbor (index 3 in NW,N,NE,W,E,...
        // row-major order): the two coverings share a 2x3 block of cells.
        let center = siren_geo::cell_of(origin, PRECISION);
        let west = &siren_geo::neighbors_of(&center).unwrap()[3];
        let delta = set
            .rebuild(Some(siren_geo::cell_center(west).unwrap()), PRECISION)
            .unwrap();

        assert_eq!(delta.subscribe.len(), 3);
        assert_eq!(delta.unsubscribe.len(), 3);
        for topic in &delta.subscribe {
            assert!(!first.subscribe.contains(topic));
        }
        for topic in &delta.unsubscribe {
            assert!(first.subscribe.contains(topic));
            assert!(!delta.subscribe.contains(topic));
        }
        assert_eq!(set.topics().len(), 9);
    }

    #[test]
    fn none_location_unsubscribes_everything() {
        let mut set = InterestSet::new();
        set.rebuild(Some(point(42.605, -5.603)), PRECISION).unwrap();

        let delta = set.rebuild(None, PRECISION).unwrap();
        assert!(delta.subscribe.is_empty());
        assert_eq!(delta.unsubscribe.len(), 9);
        assert!(set.is_empty());

        // Already empty: clearing again changes nothing.
        assert!(set.rebuild(None, PRECISION).is_none());
    }

    #[test]
    fn set_is_replaced_even_when_the_delta_is_dropped() {
        let mut set = InterestSet::new();
        // Caller drops this delta (e.g. disconnected) — the set must still
        // advance so the next diff is computed against reality.
        let _ = set.rebuild(Some(point(42.605, -5.603)), PRECISION);
        assert_eq!(set.topics().len(), 9);
        assert!(set.rebuild(Some(point(42.605, -5.603)), PRECISION).is_none());
    }
}
