//! Path accumulation and map-view bookkeeping

use shared::{GeoBounds, Position};

/// Append-only sequence of positions for one session
#[derive(Debug, Default)]
pub struct PathTracker {
    points: Vec<Position>,
}

impl PathTracker {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn push(&mut self, position: Position) {
        self.points.push(position);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Region spanning the whole path so far; None while empty
    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::from_points(&self.points)
    }

    /// The connected line a renderer would draw, in arrival order
    pub fn polyline(&self) -> &[Position] {
        &self.points
    }
}

/// View state for whatever renders the map
///
/// Fitting the view to the path happens exactly once per session: the first
/// computed bounds move the center and latch. After that a user pan is final
/// and incoming samples never drag the view back.
#[derive(Debug)]
pub struct MapView {
    center: Position,
    auto_center_done: bool,
}

impl MapView {
    pub fn new(center: Position) -> Self {
        Self {
            center,
            auto_center_done: false,
        }
    }

    /// Centers on the given bounds once; later calls are no-ops
    pub fn apply_bounds(&mut self, bounds: GeoBounds) {
        if self.auto_center_done {
            return;
        }
        self.center = bounds.center();
        self.auto_center_done = true;
    }

    /// User-driven pan
    pub fn pan_to(&mut self, position: Position) {
        self.center = position;
    }

    pub fn center(&self) -> Position {
        self.center
    }

    pub fn auto_centered(&self) -> bool {
        self.auto_center_done
    }
}

/// Binds the accumulated path to the view it feeds
pub struct Tracker {
    path: PathTracker,
    view: MapView,
}

impl Tracker {
    pub fn new(initial_center: Position) -> Self {
        Self {
            path: PathTracker::new(),
            view: MapView::new(initial_center),
        }
    }

    /// Appends a sample, recomputes bounds over the full path and refreshes
    /// the view (which only moves on the first sample)
    pub fn record(&mut self, position: Position) {
        self.path.push(position);
        if let Some(bounds) = self.path.bounds() {
            self.view.apply_bounds(bounds);
        }
    }

    pub fn path_len(&self) -> usize {
        self.path.len()
    }

    pub fn polyline(&self) -> &[Position] {
        self.path.polyline()
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        self.path.bounds()
    }

    pub fn center(&self) -> Position {
        self.view.center()
    }

    pub fn pan_to(&mut self, position: Position) {
        self.view.pan_to(position);
    }

    pub fn auto_centered(&self) -> bool {
        self.view.auto_centered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::DEFAULT_POSITION;

    #[test]
    fn test_empty_path_has_no_bounds() {
        let path = PathTracker::new();
        assert!(path.is_empty());
        assert!(path.bounds().is_none());
    }

    #[test]
    fn test_polyline_preserves_arrival_order() {
        let mut path = PathTracker::new();
        path.push(Position::new(1.0, 1.0));
        path.push(Position::new(2.0, 2.0));
        path.push(Position::new(1.5, 1.5));

        let polyline = path.polyline();
        assert_eq!(polyline.len(), 3);
        assert_eq!(polyline[0], Position::new(1.0, 1.0));
        assert_eq!(polyline[2], Position::new(1.5, 1.5));
    }

    #[test]
    fn test_bounds_grow_with_the_path() {
        let mut path = PathTracker::new();
        path.push(Position::new(10.0, 20.0));
        path.push(Position::new(12.0, 18.0));

        let bounds = path.bounds().unwrap();
        assert_eq!(bounds.min_latitude, 10.0);
        assert_eq!(bounds.max_latitude, 12.0);
        assert_eq!(bounds.min_longitude, 18.0);
        assert_eq!(bounds.max_longitude, 20.0);
    }

    #[test]
    fn test_view_centers_exactly_once() {
        let mut view = MapView::new(DEFAULT_POSITION);
        assert!(!view.auto_centered());

        let mut bounds = GeoBounds::from_point(Position::new(10.0, 20.0));
        bounds.extend(Position::new(14.0, 24.0));
        view.apply_bounds(bounds);

        assert!(view.auto_centered());
        assert_approx_eq!(view.center().latitude, 12.0);

        // A second fit must not move the view
        view.apply_bounds(GeoBounds::from_point(Position::new(50.0, 50.0)));
        assert_approx_eq!(view.center().latitude, 12.0);
    }

    #[test]
    fn test_first_recorded_sample_centers_the_view() {
        let mut tracker = Tracker::new(DEFAULT_POSITION);
        tracker.record(Position::new(10.0, 20.0));

        assert!(tracker.auto_centered());
        assert_approx_eq!(tracker.center().latitude, 10.0);
        assert_approx_eq!(tracker.center().longitude, 20.0);
    }

    #[test]
    fn test_user_pan_is_never_overridden() {
        let mut tracker = Tracker::new(DEFAULT_POSITION);

        for i in 0..5 {
            tracker.record(Position::new(10.0 + i as f64, 20.0 + i as f64));
        }

        tracker.pan_to(Position::new(99.0, 99.0));
        tracker.record(Position::new(15.0, 25.0));

        assert_eq!(tracker.path_len(), 6);
        assert_approx_eq!(tracker.center().latitude, 99.0);
        assert_approx_eq!(tracker.center().longitude, 99.0);
    }

    #[test]
    fn test_tracker_bounds_cover_every_sample() {
        let mut tracker = Tracker::new(DEFAULT_POSITION);
        tracker.record(Position::new(1.0, 1.0));
        tracker.record(Position::new(3.0, 5.0));
        tracker.record(Position::new(2.0, 0.5));

        let bounds = tracker.bounds().unwrap();
        for point in tracker.polyline() {
            assert!(bounds.contains(*point));
        }
    }
}
