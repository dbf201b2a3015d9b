//! End-to-end SDF conversion scenarios.

use mapkern::sdfield::{convert_dist_to_pixel, Converter};

fn fill(conv: &mut Converter, width: i32, height: i32, f: impl Fn(i32, i32) -> u8) {
    let coverage = conv.coverage_mut();
    for y in 0..height {
        for x in 0..width {
            coverage[(x + y * width) as usize] = f(x, y);
        }
    }
}

const SIZE_TABLE: [(i32, i32); 5] = [(1, 1), (10, 1), (1, 10), (10, 10), (16, 16)];

#[test]
fn white_images_are_at_most_the_zero_distance_value() {
    let zero_dist = convert_dist_to_pixel(0.0);

    for sdf_ext in 0..=5 {
        for (width, height) in SIZE_TABLE {
            let mut conv = Converter::new(width, height, sdf_ext);
            fill(&mut conv, width, height, |_, _| 255);
            conv.build_sdf();

            for cy in 0..height {
                for cx in 0..width {
                    let pixel = conv.sdf_pixel(cx + sdf_ext, cy + sdf_ext);
                    assert!(
                        pixel <= zero_dist,
                        "({cx}, {cy}) ext {sdf_ext}: {pixel} > {zero_dist}"
                    );
                }
            }
        }
    }
}

#[test]
fn black_images_saturate_everywhere() {
    for sdf_ext in 0..=5 {
        for (width, height) in SIZE_TABLE {
            let mut conv = Converter::new(width, height, sdf_ext);
            fill(&mut conv, width, height, |_, _| 0);
            conv.build_sdf();

            let (out_w, out_h) = conv.sdf_size();
            for y in 0..out_h {
                for x in 0..out_w {
                    assert_eq!(conv.sdf_pixel(x, y), 255, "({x}, {y}) ext {sdf_ext}");
                }
            }
        }
    }
}

#[test]
fn single_white_pixel_field_is_radially_consistent() {
    let mut conv = Converter::new(1, 1, 3);
    fill(&mut conv, 1, 1, |_, _| 255);
    conv.build_sdf();

    // Center pixel is on the shape.
    assert!(conv.sdf_pixel(3, 3) <= convert_dist_to_pixel(0.0));

    // A corner of the 7x7 output sees the white pixel's boundary square at
    // distance sqrt(2.5^2 + 2.5^2).
    let expected = convert_dist_to_pixel((2.5f32 * 2.5 * 2.0).sqrt());
    for (x, y) in [(0, 0), (6, 0), (0, 6), (6, 6)] {
        let pixel = conv.sdf_pixel(x, y);
        assert!(
            (pixel as i32 - expected as i32).abs() <= 1,
            "corner ({x}, {y}): {pixel} vs {expected}"
        );
    }

    // Distance grows monotonically along the axis away from the center.
    for x in 3..6 {
        assert!(conv.sdf_pixel(x + 1, 3) >= conv.sdf_pixel(x, 3));
    }
}

#[test]
fn slash_images_build_cleanly() {
    // Diagonal edge: full coverage below, half on, empty above.
    for sdf_ext in 0..=5 {
        for size in 1..20 {
            let mut conv = Converter::new(size, size, sdf_ext);
            fill(&mut conv, size, size, |x, y| {
                if x == y {
                    127
                } else if x > y {
                    255
                } else {
                    0
                }
            });
            let out = conv.build_sdf();
            assert_eq!(
                out.len(),
                conv.sdf_pitch() * (size + 2 * sdf_ext) as usize
            );
        }
    }
}

#[test]
fn rebuilding_the_same_coverage_is_deterministic() {
    let mut conv = Converter::new(8, 8, 2);
    fill(&mut conv, 8, 8, |x, y| {
        ((x * 37 + y * 91) % 256) as u8
    });

    let first = conv.build_sdf().to_vec();
    let second = conv.build_sdf().to_vec();
    assert_eq!(first, second);
}

#[test]
fn signed_side_ordering_across_an_edge() {
    // Left half solid, right half empty: values increase left to right.
    let mut conv = Converter::new(8, 8, 1);
    fill(&mut conv, 8, 8, |x, _| if x < 4 { 255 } else { 0 });
    conv.build_sdf();

    // From the deepest interior column rightward the distance only grows.
    let row = 4 + 1;
    for x in 3..10 {
        assert!(conv.sdf_pixel(x, row) >= conv.sdf_pixel(x - 1, row));
    }
    // Deep inside is below the zero level, deep outside above it.
    let zero_dist = convert_dist_to_pixel(0.0);
    assert!(conv.sdf_pixel(2, row) < zero_dist);
    assert!(conv.sdf_pixel(9, row) > zero_dist);
}

#[test]
fn output_rows_are_bottom_up() {
    // Solid top row only: in the stored buffer the small distances must be
    // in the *last* rows (row 0 is the bottom of the image).
    let mut conv = Converter::new(4, 4, 0);
    fill(&mut conv, 4, 4, |_, y| if y == 0 { 255 } else { 0 });

    let pitch = conv.sdf_pitch();
    let data = conv.build_sdf();

    let first_stored_row = data[0]; // image bottom: far from the shape
    let last_stored_row = data[3 * pitch]; // image top: on the shape
    assert!(last_stored_row < first_stored_row);
}
