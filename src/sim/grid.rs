// Grid storage and wall boundary handling

use crate::ScalarField;

/// Classifies a field for boundary enforcement. A velocity component must
/// vanish at the walls perpendicular to its direction, so its ghost cells
/// there hold the negated interior edge; scalar fields are mirrored.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FieldKind {
    Scalar,
    VelocityX,
    VelocityY,
}

/// Allocate a zeroed (n + 2) x (n + 2) buffer: an n x n simulated interior
/// plus the one-cell ghost border read by the finite-difference stencils.
pub fn alloc_field(n: usize) -> ScalarField {
    ScalarField::zeros(n + 2, n + 2)
}

/// Reset a buffer to a constant in place, ghost border included.
pub fn fill(field: &mut ScalarField, value: f32) {
    field.fill(value);
}

/// Fill the ghost border from the adjacent interior edge.
///
/// `VelocityX` is negated on the left/right ghost columns and `VelocityY` on
/// the top/bottom ghost rows; every other edge is a straight mirror. Ghost
/// corners take the average of their two edge-ghost neighbors. Must run after
/// any pass that a later pass reads across the border.
pub fn set_boundaries(kind: FieldKind, field: &mut ScalarField, n: usize) {
    let edge = n + 1;
    let flip_x = if kind == FieldKind::VelocityX { -1.0 } else { 1.0 };
    let flip_y = if kind == FieldKind::VelocityY { -1.0 } else { 1.0 };

    for i in 1..=n {
        field[(0, i)] = flip_x * field[(1, i)];
        field[(edge, i)] = flip_x * field[(n, i)];
        field[(i, 0)] = flip_y * field[(i, 1)];
        field[(i, edge)] = flip_y * field[(i, n)];
    }

    field[(0, 0)] = 0.5 * (field[(1, 0)] + field[(0, 1)]);
    field[(0, edge)] = 0.5 * (field[(1, edge)] + field[(0, n)]);
    field[(edge, 0)] = 0.5 * (field[(n, 0)] + field[(edge, 1)]);
    field[(edge, edge)] = 0.5 * (field[(n, edge)] + field[(edge, n)]);
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: usize = 4;

    fn padded_field() -> ScalarField {
        ScalarField::from_fn(N + 2, N + 2, |x, y| (x * 10 + y) as f32 + 1.0)
    }

    #[test]
    fn scalar_boundaries_mirror_interior_edges() {
        let mut field = padded_field();

        set_boundaries(FieldKind::Scalar, &mut field, N);

        for i in 1..=N {
            assert_eq!(field[(0, i)], field[(1, i)]);
            assert_eq!(field[(N + 1, i)], field[(N, i)]);
            assert_eq!(field[(i, 0)], field[(i, 1)]);
            assert_eq!(field[(i, N + 1)], field[(i, N)]);
        }
    }

    #[test]
    fn horizontal_velocity_flips_at_side_walls_only() {
        let mut field = padded_field();

        set_boundaries(FieldKind::VelocityX, &mut field, N);

        for i in 1..=N {
            assert_eq!(field[(0, i)], -field[(1, i)]);
            assert_eq!(field[(N + 1, i)], -field[(N, i)]);
            assert_eq!(field[(i, 0)], field[(i, 1)]);
            assert_eq!(field[(i, N + 1)], field[(i, N)]);
        }
    }

    #[test]
    fn vertical_velocity_flips_at_top_and_bottom_only() {
        let mut field = padded_field();

        set_boundaries(FieldKind::VelocityY, &mut field, N);

        for i in 1..=N {
            assert_eq!(field[(i, 0)], -field[(i, 1)]);
            assert_eq!(field[(i, N + 1)], -field[(i, N)]);
            assert_eq!(field[(0, i)], field[(1, i)]);
            assert_eq!(field[(N + 1, i)], field[(N, i)]);
        }
    }

    #[test]
    fn corners_average_their_adjacent_ghost_cells() {
        let mut field = padded_field();

        set_boundaries(FieldKind::Scalar, &mut field, N);

        let edge = N + 1;
        assert_eq!(field[(0, 0)], 0.5 * (field[(1, 0)] + field[(0, 1)]));
        assert_eq!(field[(0, edge)], 0.5 * (field[(1, edge)] + field[(0, N)]));
        assert_eq!(field[(edge, 0)], 0.5 * (field[(N, 0)] + field[(edge, 1)]));
        assert_eq!(
            field[(edge, edge)],
            0.5 * (field[(N, edge)] + field[(edge, N)])
        );
    }
}
