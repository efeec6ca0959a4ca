//! Iso-contour extraction by marching squares.
//!
//! Coordinates are in pixel units with `x` along columns and `y` along
//! rows, pixel centres at integer positions. Each grid cell spanned by four
//! neighbouring pixel centres contributes zero, one or two segments per
//! level. Cells touching a non-finite value contribute nothing.

use ndarray::ArrayView2;

/// A single straight contour piece.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: (f64, f64),
    pub end: (f64, f64),
}

/// Segments making up the contour at one level.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourLine {
    pub level: f64,
    pub segments: Vec<Segment>,
}

/// Trace every level in `levels` over `data`.
pub fn contour_lines(data: &ArrayView2<f64>, levels: &[f64]) -> Vec<ContourLine> {
    levels
        .iter()
        .map(|&level| ContourLine {
            level,
            segments: contour_segments(data, level),
        })
        .collect()
}

/// Marching-squares segments of `data` at `level`.
///
/// A corner is "inside" when its value is `>= level`. Saddle cells are
/// resolved with the mean of the four corners.
pub fn contour_segments(data: &ArrayView2<f64>, level: f64) -> Vec<Segment> {
    let (rows, cols) = data.dim();
    let mut segments = Vec::new();
    if rows < 2 || cols < 2 || !level.is_finite() {
        return segments;
    }

    for r in 0..rows - 1 {
        for c in 0..cols - 1 {
            // Corners clockwise from top-left in array order
            let v = [
                data[[r, c]],
                data[[r, c + 1]],
                data[[r + 1, c + 1]],
                data[[r + 1, c]],
            ];
            if v.iter().any(|x| !x.is_finite()) {
                continue;
            }

            let case = v
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &x)| acc | (u8::from(x >= level) << i));

            let edge = |e: usize| edge_point(e, r, c, &v, level);
            let mut push = |a: usize, b: usize| {
                segments.push(Segment {
                    start: edge(a),
                    end: edge(b),
                })
            };

            match case {
                0 | 15 => {}
                1 | 14 => push(3, 0),
                2 | 13 => push(0, 1),
                3 | 12 => push(3, 1),
                4 | 11 => push(1, 2),
                6 | 9 => push(0, 2),
                7 | 8 => push(2, 3),
                5 => {
                    if centre_inside(&v, level) {
                        push(0, 1);
                        push(2, 3);
                    } else {
                        push(3, 0);
                        push(1, 2);
                    }
                }
                10 => {
                    if centre_inside(&v, level) {
                        push(3, 0);
                        push(1, 2);
                    } else {
                        push(0, 1);
                        push(2, 3);
                    }
                }
                _ => unreachable!("four corners give at most 15"),
            }
        }
    }
    segments
}

fn centre_inside(v: &[f64; 4], level: f64) -> bool {
    v.iter().sum::<f64>() / 4.0 >= level
}

/// Interpolated crossing on edge `e` of the cell at `(r, c)`.
///
/// Edges: 0 top (v0-v1), 1 right (v1-v2), 2 bottom (v2-v3), 3 left (v3-v0).
fn edge_point(e: usize, r: usize, c: usize, v: &[f64; 4], level: f64) -> (f64, f64) {
    let corner = |i: usize| -> (f64, f64) {
        let (dr, dc) = [(0, 0), (0, 1), (1, 1), (1, 0)][i];
        ((c + dc) as f64, (r + dr) as f64)
    };
    let (a, b) = (e, (e + 1) % 4);
    let (pa, pb) = (corner(a), corner(b));
    let t = if v[b] == v[a] {
        0.5
    } else {
        ((level - v[a]) / (v[b] - v[a])).clamp(0.0, 1.0)
    };
    (pa.0 + t * (pb.0 - pa.0), pa.1 + t * (pb.1 - pa.1))
}
