use crate::types::*;

/// Longest pointer interaction still treated as a tap.
pub const TAP_MAX_DURATION_MS: f64 = 250.0;
/// Largest net movement on either axis still treated as a tap.
pub const TAP_MOVEMENT_TOLERANCE_PX: f64 = 10.0;
/// Minimum vertical travel for a strum.
pub const STRUM_MIN_DISTANCE_PX: f64 = 50.0;
/// Minimum horizontal travel for a slide.
pub const SLIDE_MIN_DISTANCE_PX: f64 = 40.0;

pub const UNKNOWN_GESTURE_DETAIL: &str =
    "Gesture not recognized: try a quick tap, a vertical strum, or a horizontal slide";

/// Classify one completed pointer interaction.
///
/// Strict priority: Tap, then Strum (vertical dominant), then Slide
/// (horizontal), else Unknown. Motion too small for any of them
/// (e.g. a short diagonal drag) lands in Unknown by construction.
pub fn classify(motion: &MotionSample) -> GestureEvent {
    let abs_dx = motion.dx.abs();
    let abs_dy = motion.dy.abs();

    if motion.duration_ms <= TAP_MAX_DURATION_MS
        && abs_dx <= TAP_MOVEMENT_TOLERANCE_PX
        && abs_dy <= TAP_MOVEMENT_TOLERANCE_PX
    {
        return GestureEvent::Tap {
            position: motion.end,
            normalized: motion.normalized_end,
            duration_ms: motion.duration_ms,
        };
    }

    if abs_dy > abs_dx && abs_dy >= STRUM_MIN_DISTANCE_PX {
        return GestureEvent::Strum {
            direction: if motion.dy > 0.0 {
                StrumDirection::Down
            } else {
                StrumDirection::Up
            },
            distance_px: abs_dy,
            speed: motion.vy.abs(),
        };
    }

    if abs_dx >= SLIDE_MIN_DISTANCE_PX {
        return GestureEvent::Slide {
            direction: if motion.dx > 0.0 {
                SlideDirection::Right
            } else {
                SlideDirection::Left
            },
            distance_px: abs_dx,
            speed: motion.vx.abs(),
        };
    }

    GestureEvent::Unknown {
        detail: UNKNOWN_GESTURE_DETAIL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motion(duration_ms: f64, dx: f64, dy: f64) -> MotionSample {
        let (vx, vy) = if duration_ms > 0.0 {
            (dx / duration_ms, dy / duration_ms)
        } else {
            (0.0, 0.0)
        };
        MotionSample {
            duration_ms,
            dx,
            dy,
            vx,
            vy,
            end: Point::new(200.0, 120.0),
            normalized_end: Some(Point::new(0.5, 0.5)),
        }
    }

    #[test]
    fn test_short_still_press_is_tap() {
        for &d in &[0.0, 40.0, 120.0, TAP_MAX_DURATION_MS] {
            for &(dx, dy) in &[(0.0, 0.0), (10.0, -10.0), (-7.5, 3.0)] {
                match classify(&motion(d, dx, dy)) {
                    GestureEvent::Tap { position, duration_ms, normalized } => {
                        assert_eq!(position, Point::new(200.0, 120.0));
                        assert_eq!(duration_ms, d);
                        assert_eq!(normalized, Some(Point::new(0.5, 0.5)));
                    }
                    other => panic!("expected tap for d={} dx={} dy={}, got {:?}", d, dx, dy, other),
                }
            }
        }
    }

    #[test]
    fn test_vertical_drag_is_strum() {
        let g = classify(&motion(300.0, 5.0, 150.0));
        assert_eq!(
            g,
            GestureEvent::Strum {
                direction: StrumDirection::Down,
                distance_px: 150.0,
                speed: 0.5
            }
        );
        match classify(&motion(200.0, -3.0, -80.0)) {
            GestureEvent::Strum { direction, .. } => assert_eq!(direction, StrumDirection::Up),
            other => panic!("expected strum, got {:?}", other),
        }
    }

    #[test]
    fn test_horizontal_drag_is_slide() {
        match classify(&motion(400.0, 120.0, 10.0)) {
            GestureEvent::Slide { direction, distance_px, speed } => {
                assert_eq!(direction, SlideDirection::Right);
                assert_eq!(distance_px, 120.0);
                assert!((speed - 0.3).abs() < 1e-9);
            }
            other => panic!("expected slide, got {:?}", other),
        }
        match classify(&motion(400.0, -45.0, 0.0)) {
            GestureEvent::Slide { direction, .. } => assert_eq!(direction, SlideDirection::Left),
            other => panic!("expected slide, got {:?}", other),
        }
    }

    #[test]
    fn test_slow_press_without_travel_is_unknown() {
        // Held too long for a tap, too short for anything else
        let g = classify(&motion(900.0, 2.0, 2.0));
        assert!(matches!(g, GestureEvent::Unknown { .. }));
    }

    #[test]
    fn test_short_diagonal_is_unknown() {
        for &(dx, dy) in &[(30.0, 30.0), (-35.0, 20.0), (20.0, -45.0)] {
            let g = classify(&motion(300.0, dx, dy));
            match g {
                GestureEvent::Unknown { detail } => assert_eq!(detail, UNKNOWN_GESTURE_DETAIL),
                other => panic!("expected unknown for dx={} dy={}, got {:?}", dx, dy, other),
            }
        }
    }

    #[test]
    fn test_vertical_dominance_falls_through_to_slide() {
        // dy dominates but is short of a strum; dx still long enough to slide
        match classify(&motion(300.0, 42.0, 48.0)) {
            GestureEvent::Slide { direction, .. } => assert_eq!(direction, SlideDirection::Right),
            other => panic!("expected slide, got {:?}", other),
        }
    }
}
