//! Pointer-to-simulation coordinate mapping.
//!
//! Pointer positions arrive in device pixels with y growing downward. Drops
//! are addressed in [-1, 1]^2 normalized space with y growing upward. On a
//! non-square viewport one axis is rescaled by the grid aspect so that a drop
//! placed under the pointer stays visually circular.

/// Maps a pointer position in device pixels to a drop center in [-1, 1]^2.
///
/// `grid_ratio` is the width:height aspect of the rendered grid. For a ratio
/// >= 1 the y component is divided by it, otherwise the x component is.
pub fn pointer_to_drop_center(
    pointer_x: f32,
    pointer_y: f32,
    viewport_width: f32,
    viewport_height: f32,
    grid_ratio: f32,
) -> [f32; 2] {
    let mut x = (pointer_x / viewport_width) * 2.0 - 1.0;
    let mut y = (1.0 - pointer_y / viewport_height) * 2.0 - 1.0;

    if grid_ratio >= 1.0 {
        y /= grid_ratio;
    } else {
        x /= grid_ratio;
    }

    [x, y]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_center_maps_to_origin() {
        let [x, y] = pointer_to_drop_center(400.0, 300.0, 800.0, 600.0, 1.0);
        assert!(x.abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn screen_y_is_flipped() {
        // Top of the screen is +1 in drop space.
        let [_, y] = pointer_to_drop_center(0.0, 0.0, 800.0, 600.0, 1.0);
        assert!((y - 1.0).abs() < 1e-6);

        let [_, y] = pointer_to_drop_center(0.0, 600.0, 800.0, 600.0, 1.0);
        assert!((y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn wide_grid_compresses_y() {
        let [x, y] = pointer_to_drop_center(800.0, 0.0, 800.0, 400.0, 2.0);
        assert!((x - 1.0).abs() < 1e-6);
        assert!((y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn tall_grid_expands_x() {
        let [x, y] = pointer_to_drop_center(800.0, 0.0, 800.0, 400.0, 0.5);
        assert!((x - 2.0).abs() < 1e-6);
        assert!((y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn square_corner_round_trip() {
        let [x, y] = pointer_to_drop_center(0.0, 600.0, 800.0, 600.0, 1.0);
        assert!((x + 1.0).abs() < 1e-6);
        assert!((y + 1.0).abs() < 1e-6);
    }
}
