//! Closed-form conversions between the device color spaces.
//!
//! These are the conversions PostScript uses when no color management is involved, for
//! example for `currentrgbcolor` or when no ICC profile is available.

/// Convert a gray level to RGB.
#[inline]
pub fn gray_to_rgb(gray: f32) -> [f32; 3] {
    [gray, gray, gray]
}

/// Convert RGB to a gray level, using the NTSC luminance weights.
#[inline]
pub fn rgb_to_gray([r, g, b]: [f32; 3]) -> f32 {
    (0.3 * r + 0.59 * g + 0.11 * b).clamp(0.0, 1.0)
}

/// Convert a gray level to CMYK. Only the black component is used.
#[inline]
pub fn gray_to_cmyk(gray: f32) -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0 - gray]
}

/// Convert CMYK to a gray level.
#[inline]
pub fn cmyk_to_gray([c, m, y, k]: [f32; 4]) -> f32 {
    1.0 - (0.3 * c + 0.59 * m + 0.11 * y + k).min(1.0)
}

/// Convert CMYK to RGB.
#[inline]
pub fn cmyk_to_rgb([c, m, y, k]: [f32; 4]) -> [f32; 3] {
    [
        1.0 - (c + k).min(1.0),
        1.0 - (m + k).min(1.0),
        1.0 - (y + k).min(1.0),
    ]
}

/// Convert RGB to CMYK, using the identity for black generation and undercolor removal.
#[inline]
pub fn rgb_to_cmyk(rgb: [f32; 3]) -> [f32; 4] {
    rgb_to_cmyk_with(rgb, |k| k, |k| k)
}

/// Convert RGB to CMYK.
///
/// `black_generation` maps the common gray component `min(c, m, y)` to the black component,
/// `undercolor_removal` maps it to the amount that is removed from cyan, magenta and yellow.
pub fn rgb_to_cmyk_with(
    [r, g, b]: [f32; 3],
    black_generation: impl Fn(f32) -> f32,
    undercolor_removal: impl Fn(f32) -> f32,
) -> [f32; 4] {
    let c = 1.0 - r;
    let m = 1.0 - g;
    let y = 1.0 - b;
    let k = c.min(m).min(y);

    let black = black_generation(k).clamp(0.0, 1.0);
    let ucr = undercolor_removal(k).clamp(-1.0, 1.0);

    [
        (c - ucr).clamp(0.0, 1.0),
        (m - ucr).clamp(0.0, 1.0),
        (y - ucr).clamp(0.0, 1.0),
        black,
    ]
}

/// Convert HSB (hue, saturation, brightness) to RGB using the hexcone model.
pub fn hsb_to_rgb([h, s, v]: [f32; 3]) -> [f32; 3] {
    if s <= 0.0 {
        return [v, v, v];
    }

    let h6 = h.clamp(0.0, 1.0) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;

    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match sector as u32 % 6 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

/// Convert RGB to HSB (hue, saturation, brightness).
pub fn rgb_to_hsb([r, g, b]: [f32; 3]) -> [f32; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { delta / max } else { 0.0 };

    let h = if delta <= 0.0 {
        0.0
    } else {
        let h = if r == max {
            (g - b) / delta
        } else if g == max {
            2.0 + (b - r) / delta
        } else {
            4.0 + (r - g) / delta
        } / 6.0;

        if h < 0.0 { h + 1.0 } else { h }
    };

    [h, s, max]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f32], b: &[f32]) {
        for (a1, b1) in a.iter().zip(b) {
            assert!((a1 - b1).abs() < 1e-5, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn gray_round_trip() {
        for g in [0.0, 0.5, 1.0] {
            assert_eq!(rgb_to_gray(gray_to_rgb(g)), g);
        }
    }

    #[test]
    fn achromatic_hsb() {
        for b in [0.0, 0.2, 0.5, 0.9, 1.0] {
            for h in [0.0, 0.3, 0.99] {
                assert_eq!(hsb_to_rgb([h, 0.0, b]), [b, b, b]);
            }
        }
    }

    #[test]
    fn black_hsb() {
        for h in [0.0, 0.1, 0.5, 0.75, 1.0] {
            for s in [0.0, 0.5, 1.0] {
                assert_eq!(hsb_to_rgb([h, s, 0.0]), [0.0, 0.0, 0.0]);
            }
        }
    }

    #[test]
    fn hsb_sectors() {
        assert_close(&hsb_to_rgb([0.0, 1.0, 1.0]), &[1.0, 0.0, 0.0]);
        assert_close(&hsb_to_rgb([1.0 / 3.0, 1.0, 1.0]), &[0.0, 1.0, 0.0]);
        assert_close(&hsb_to_rgb([2.0 / 3.0, 1.0, 1.0]), &[0.0, 0.0, 1.0]);
        assert_close(&hsb_to_rgb([1.0, 1.0, 1.0]), &[1.0, 0.0, 0.0]);
        assert_close(&hsb_to_rgb([1.0 / 12.0, 1.0, 1.0]), &[1.0, 0.5, 0.0]);
    }

    #[test]
    fn hsb_round_trip() {
        for rgb in [[0.2, 0.4, 0.6], [0.9, 0.1, 0.3], [0.5, 0.5, 0.1]] {
            assert_close(&hsb_to_rgb(rgb_to_hsb(rgb)), &rgb);
        }
    }

    #[test]
    fn cmyk_extremes() {
        assert_eq!(cmyk_to_rgb([0.0, 0.0, 0.0, 0.0]), [1.0, 1.0, 1.0]);
        assert_eq!(cmyk_to_rgb([0.0, 0.0, 0.0, 1.0]), [0.0, 0.0, 0.0]);
        assert_eq!(cmyk_to_rgb([0.8, 0.0, 0.0, 0.5]), [0.0, 0.5, 0.5]);
    }

    #[test]
    fn rgb_cmyk_round_trip() {
        let rgb = [0.2, 0.5, 0.7];
        let cmyk = rgb_to_cmyk(rgb);

        assert_close(&cmyk, &[0.5, 0.2, 0.0, 0.3]);
        assert_close(&cmyk_to_rgb(cmyk), &rgb);
    }

    #[test]
    fn custom_black_generation() {
        // No black generation and no undercolor removal.
        let cmyk = rgb_to_cmyk_with([0.2, 0.5, 0.7], |_| 0.0, |_| 0.0);

        assert_close(&cmyk, &[0.8, 0.5, 0.3, 0.0]);
    }

    #[test]
    fn gray_cmyk() {
        assert_eq!(gray_to_cmyk(0.25), [0.0, 0.0, 0.0, 0.75]);
        assert_close(&[cmyk_to_gray([0.0, 0.0, 0.0, 0.75])], &[0.25]);
        assert_eq!(cmyk_to_gray([1.0, 1.0, 1.0, 1.0]), 0.0);
    }
}
