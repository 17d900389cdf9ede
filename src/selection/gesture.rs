//! Pointer gestures on a map surface
//!
//! Gestures arrive one at a time from the surface and are turned into
//! selection transitions through a `SurfaceProjection`.

use tracing::debug;

use super::ModeSelection;
use crate::geo::{Direction, ScreenPoint, SurfaceProjection};

/// A raw pointer event on the map surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Confirmed single tap
    Tap(ScreenPoint),
    /// Pointer down
    Press(ScreenPoint),
    /// Pointer moved while down
    Move(ScreenPoint),
    /// Pointer up
    Release(ScreenPoint),
    /// Press held in place
    LongPress(ScreenPoint),
}

/// What a gesture did to the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Not handled; the surface may pan or zoom instead
    Ignored,
    /// A new point was placed (and, on press, a drag started from it)
    PointPlaced,
    /// A direction drag started from the existing point
    DragStarted,
    /// Live bearing while dragging
    DirectionPreview(Direction),
    /// Direction fixed on release
    DirectionSet(Direction),
    /// Drag ended without a direction
    DragCancelled,
    /// Selection cleared
    Cleared,
}

/// Apply one gesture to a mode's selection
pub fn apply_gesture<S>(
    selection: &mut ModeSelection<S::Point>,
    surface: &S,
    gesture: Gesture,
) -> GestureOutcome
where
    S: SurfaceProjection,
{
    match gesture {
        Gesture::Tap(screen) => match surface.to_content(screen) {
            Some(point) if !selection.is_dragging() => {
                selection.place_point(point);
                GestureOutcome::PointPlaced
            }
            _ => GestureOutcome::Ignored,
        },

        Gesture::Press(screen) => {
            if let Some(marker) = selection.point() {
                if surface.is_near_marker(marker, screen) {
                    // Point is set, so this cannot fail
                    return match selection.begin_drag() {
                        Ok(()) => GestureOutcome::DragStarted,
                        Err(_) => GestureOutcome::Ignored,
                    };
                }
            }

            if !surface.places_point_on_press() {
                return GestureOutcome::Ignored;
            }

            match surface.to_content(screen) {
                Some(point) => {
                    selection.place_point(point);
                    match selection.begin_drag() {
                        Ok(()) => GestureOutcome::PointPlaced,
                        Err(_) => GestureOutcome::Ignored,
                    }
                }
                None => GestureOutcome::Ignored,
            }
        }

        Gesture::Move(screen) => {
            if !selection.is_dragging() {
                return GestureOutcome::Ignored;
            }
            match surface
                .to_content(screen)
                .map(|target| selection.drag_to(target))
            {
                Some(Ok(bearing)) => GestureOutcome::DirectionPreview(bearing),
                _ => GestureOutcome::Ignored,
            }
        }

        Gesture::Release(screen) => {
            if !selection.is_dragging() {
                return GestureOutcome::Ignored;
            }
            let Some(target) = surface.to_content(screen) else {
                debug!("drag released off the surface");
                selection.cancel_drag();
                return GestureOutcome::DragCancelled;
            };
            match selection.release(target) {
                Ok(Some(bearing)) => GestureOutcome::DirectionSet(bearing),
                Ok(None) | Err(_) => GestureOutcome::DragCancelled,
            }
        }

        Gesture::LongPress(_) => {
            selection.clear();
            GestureOutcome::Cleared
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{FantasyPoint, GeoPoint, ImageTransform, WebMercatorView};
    use crate::selection::SelectionPhase;

    fn image_surface() -> ImageTransform {
        ImageTransform::identity(1000.0, 1000.0)
    }

    fn screen(x: f64, y: f64) -> ScreenPoint {
        ScreenPoint::new(x, y)
    }

    #[test]
    fn test_fantasy_press_drag_release() {
        let surface = image_surface();
        let mut sel = ModeSelection::<FantasyPoint>::default();

        assert_eq!(
            apply_gesture(&mut sel, &surface, Gesture::Press(screen(500.0, 500.0))),
            GestureOutcome::PointPlaced
        );
        assert!(sel.is_dragging());

        let preview = apply_gesture(&mut sel, &surface, Gesture::Move(screen(800.0, 500.0)));
        assert_eq!(
            preview,
            GestureOutcome::DirectionPreview(Direction::new(90).unwrap())
        );

        let set = apply_gesture(&mut sel, &surface, Gesture::Release(screen(500.0, 100.0)));
        assert_eq!(set, GestureOutcome::DirectionSet(Direction::NORTH));
        assert_eq!(sel.phase(), SelectionPhase::DirectionSet);
    }

    #[test]
    fn test_fantasy_tap_without_drag_sets_no_direction() {
        let surface = image_surface();
        let mut sel = ModeSelection::<FantasyPoint>::default();
        apply_gesture(&mut sel, &surface, Gesture::Press(screen(200.0, 200.0)));
        let outcome = apply_gesture(&mut sel, &surface, Gesture::Release(screen(200.0, 200.0)));
        assert_eq!(outcome, GestureOutcome::DragCancelled);
        assert_eq!(sel.phase(), SelectionPhase::PointSet);
    }

    #[test]
    fn test_press_near_marker_redrags_from_marker() {
        let surface = image_surface();
        let mut sel = ModeSelection::<FantasyPoint>::default();
        sel.place_point(FantasyPoint::new(0.5, 0.5).unwrap());
        sel.set_direction(Direction::new(90).unwrap()).unwrap();

        assert_eq!(
            apply_gesture(&mut sel, &surface, Gesture::Press(screen(520.0, 510.0))),
            GestureOutcome::DragStarted
        );
        // Point unchanged and earlier direction kept until release
        assert_eq!(sel.point(), Some(FantasyPoint::new(0.5, 0.5).unwrap()));
        assert_eq!(sel.direction(), Some(Direction::new(90).unwrap()));

        let set = apply_gesture(&mut sel, &surface, Gesture::Release(screen(500.0, 900.0)));
        assert_eq!(set, GestureOutcome::DirectionSet(Direction::new(180).unwrap()));
    }

    #[test]
    fn test_release_off_image_cancels() {
        let surface = image_surface();
        let mut sel = ModeSelection::<FantasyPoint>::default();
        apply_gesture(&mut sel, &surface, Gesture::Press(screen(500.0, 500.0)));
        let outcome = apply_gesture(&mut sel, &surface, Gesture::Release(screen(-50.0, 500.0)));
        assert_eq!(outcome, GestureOutcome::DragCancelled);
        assert!(sel.direction().is_none());
    }

    #[test]
    fn test_real_world_press_away_from_marker_pans() {
        let center = GeoPoint::new(37.7749, -122.4194).unwrap();
        let surface = WebMercatorView::new(center, 16.0, 800.0, 800.0);
        let mut sel = ModeSelection::<GeoPoint>::default();

        // No marker yet: press is left to the map
        assert_eq!(
            apply_gesture(&mut sel, &surface, Gesture::Press(screen(400.0, 400.0))),
            GestureOutcome::Ignored
        );

        assert_eq!(
            apply_gesture(&mut sel, &surface, Gesture::Tap(screen(400.0, 400.0))),
            GestureOutcome::PointPlaced
        );
        assert!(!sel.is_dragging());

        // Far from the marker: still a pan
        assert_eq!(
            apply_gesture(&mut sel, &surface, Gesture::Press(screen(100.0, 100.0))),
            GestureOutcome::Ignored
        );

        assert_eq!(
            apply_gesture(&mut sel, &surface, Gesture::Press(screen(400.0, 400.0))),
            GestureOutcome::DragStarted
        );
        let outcome = apply_gesture(&mut sel, &surface, Gesture::Release(screen(100.0, 400.0)));
        assert_eq!(
            outcome,
            GestureOutcome::DirectionSet(Direction::new(270).unwrap())
        );
    }

    #[test]
    fn test_long_press_clears() {
        let surface = image_surface();
        let mut sel = ModeSelection::<FantasyPoint>::default();
        apply_gesture(&mut sel, &surface, Gesture::Press(screen(500.0, 500.0)));
        apply_gesture(&mut sel, &surface, Gesture::Release(screen(600.0, 500.0)));
        assert_eq!(
            apply_gesture(&mut sel, &surface, Gesture::LongPress(screen(10.0, 10.0))),
            GestureOutcome::Cleared
        );
        assert_eq!(sel.phase(), SelectionPhase::Empty);
    }

    #[test]
    fn test_move_without_drag_is_ignored() {
        let surface = image_surface();
        let mut sel = ModeSelection::<FantasyPoint>::default();
        assert_eq!(
            apply_gesture(&mut sel, &surface, Gesture::Move(screen(1.0, 1.0))),
            GestureOutcome::Ignored
        );
    }
}
