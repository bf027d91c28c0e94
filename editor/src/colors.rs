/// Formats RGB components in `[0, 1]` as `#rrggbb`.
pub fn rgb_to_hex(r: f64, g: f64, b: f64) -> String {
    let digits = |n: f64| (255.0 * n).round().clamp(0.0, 255.0) as u8;
    format!("#{:02x}{:02x}{:02x}", digits(r), digits(g), digits(b))
}

/// Converts a colour given as hue, saturation and lightness, all in `[0, 1]`, to `#rrggbb`.
pub fn hsl_to_hex(h: f64, s: f64, l: f64) -> String {
    if s == 0.0 {
        return rgb_to_hex(l, l, l);
    }
    let var2 = if l < 0.5 {
        l * (1.0 + s)
    } else {
        (l + s) - (s * l)
    };
    let var1 = 2.0 * l - var2;
    let hue_to_rgb = |mut hue: f64| {
        if hue < 0.0 {
            hue += 1.0;
        }
        if hue > 1.0 {
            hue -= 1.0;
        }
        if 6.0 * hue < 1.0 {
            var1 + (var2 - var1) * 6.0 * hue
        } else if 2.0 * hue < 1.0 {
            var2
        } else if 3.0 * hue < 2.0 {
            var1 + (var2 - var1) * 6.0 * (2.0 / 3.0 - hue)
        } else {
            var1
        }
    };
    rgb_to_hex(
        hue_to_rgb(h + 1.0 / 3.0),
        hue_to_rgb(h),
        hue_to_rgb(h - 1.0 / 3.0),
    )
}

/// A stable hue in `[0, 1)` for a user name, so a user keeps the same colour everywhere.
pub fn hue_from_name(name: &str) -> f64 {
    let mut a: u32 = 1;
    for unit in name.encode_utf16() {
        a = 17 * (a + u32::from(unit)) % 360;
    }
    f64::from(a) / 360.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_hex() {
        assert_eq!(rgb_to_hex(1.0, 0.0, 0.0), "#ff0000");
        assert_eq!(rgb_to_hex(0.5, 0.5, 0.5), "#808080");
    }

    #[test]
    fn test_hsl_to_hex() {
        assert_eq!(hsl_to_hex(0.0, 1.0, 0.5), "#ff0000");
        assert_eq!(hsl_to_hex(0.7, 0.0, 0.5), "#808080");
    }

    #[test]
    fn test_hue_from_name() {
        assert_eq!(hue_from_name("Tim"), 163.0 / 360.0);
        assert_eq!(hue_from_name(""), 1.0 / 360.0);
        assert_eq!(hsl_to_hex(hue_from_name("Tim"), 0.75, 0.5), "#20dfa9");
        assert_eq!(hsl_to_hex(hue_from_name("Tim"), 0.5, 0.9), "#d9f2eb");
    }
}
