//! Spatial and temporal extent aggregation.

use stac_common::{BoundingBox, TimeRange};
use stac_protocol::{Collection, Extent, Item};

use crate::records::ObservationRecord;

/// Anything with a footprint and a time span.
pub trait Spatiotemporal {
    fn spatial_bounds(&self) -> Option<BoundingBox>;

    fn temporal_bounds(&self) -> Option<TimeRange>;
}

impl Spatiotemporal for ObservationRecord {
    fn spatial_bounds(&self) -> Option<BoundingBox> {
        self.bounding_box()
    }

    fn temporal_bounds(&self) -> Option<TimeRange> {
        Some(self.time_range())
    }
}

impl Spatiotemporal for Item {
    fn spatial_bounds(&self) -> Option<BoundingBox> {
        Some(self.bounding_box())
    }

    fn temporal_bounds(&self) -> Option<TimeRange> {
        self.time_range()
    }
}

impl<T: Spatiotemporal + ?Sized> Spatiotemporal for &T {
    fn spatial_bounds(&self) -> Option<BoundingBox> {
        (**self).spatial_bounds()
    }

    fn temporal_bounds(&self) -> Option<TimeRange> {
        (**self).temporal_bounds()
    }
}

/// Union bounding box and `[earliest start, latest end]` of `values`.
///
/// Returns `None` when no value has a footprint or no value has a time
/// span (in particular for empty input).
pub fn aggregate<I>(values: I) -> Option<Extent>
where
    I: IntoIterator,
    I::Item: Spatiotemporal,
{
    let mut bbox: Option<BoundingBox> = None;
    let mut range: Option<TimeRange> = None;

    for value in values {
        if let Some(b) = value.spatial_bounds() {
            bbox = Some(match bbox {
                Some(acc) => acc.union(&b),
                None => b,
            });
        }
        if let Some(r) = value.temporal_bounds() {
            range = Some(match range {
                Some(acc) => acc.union(&r),
                None => r,
            });
        }
    }

    Some(Extent::new(bbox?, range?))
}

/// Recompute a collection's extent from all the items it contains.
pub fn recompute(collection: &Collection) -> Option<Extent> {
    aggregate(collection.all_items())
}
