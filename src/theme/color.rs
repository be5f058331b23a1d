/// A parsed theme color in straight (non-premultiplied) normalized RGBA.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorDef {
    /// Red channel, `0..=1`.
    pub r: f64,
    /// Green channel, `0..=1`.
    pub g: f64,
    /// Blue channel, `0..=1`.
    pub b: f64,
    /// Alpha channel, `0..=1`.
    pub a: f64,
}

impl ColorDef {
    pub(crate) fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Lowercase `#rrggbb` form (alpha dropped).
    pub fn to_hex(self) -> String {
        fn to_u8(x: f64) -> u8 {
            (x.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        format!(
            "#{:02x}{:02x}{:02x}",
            to_u8(self.r),
            to_u8(self.g),
            to_u8(self.b)
        )
    }
}

/// Parse one of the recognized color syntaxes: `#rgb`, `#rrggbb`, `rgb(..)`, `rgba(..)`,
/// `hsl(..)`, `hsla(..)`.
pub fn parse_color(s: &str) -> Result<ColorDef, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }

    let lower = s.to_ascii_lowercase();
    let (func, args) = lower
        .split_once('(')
        .ok_or_else(|| format!("unrecognized color '{s}'"))?;
    let args = args
        .strip_suffix(')')
        .ok_or_else(|| format!("missing ')' in color '{s}'"))?;
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();

    match (func.trim(), parts.len()) {
        ("rgb", 3) => Ok(ColorDef::rgba(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            1.0,
        )),
        ("rgba", 4) => Ok(ColorDef::rgba(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            alpha(parts[3])?,
        )),
        ("hsl", 3) => Ok(hsla_to_rgba(
            hue(parts[0])?,
            percent(parts[1])?,
            percent(parts[2])?,
            1.0,
        )),
        ("hsla", 4) => Ok(hsla_to_rgba(
            hue(parts[0])?,
            percent(parts[1])?,
            percent(parts[2])?,
            alpha(parts[3])?,
        )),
        (f @ ("rgb" | "rgba" | "hsl" | "hsla"), n) => {
            let expected = if f.ends_with('a') { 4 } else { 3 };
            Err(format!("{f}() expects {expected} components, got {n}"))
        }
        _ => Err(format!("unrecognized color '{s}'")),
    }
}

fn parse_hex(s: &str) -> Result<ColorDef, String> {
    fn nibble(c: u8) -> Result<u8, String> {
        (c as char)
            .to_digit(16)
            .map(|d| d as u8)
            .ok_or_else(|| format!("invalid hex digit '{}'", c as char))
    }

    let b = s.as_bytes();
    let (r, g, bl) = match b.len() {
        3 => {
            let r = nibble(b[0])?;
            let g = nibble(b[1])?;
            let bl = nibble(b[2])?;
            (r * 17, g * 17, bl * 17)
        }
        6 => (
            nibble(b[0])? * 16 + nibble(b[1])?,
            nibble(b[2])? * 16 + nibble(b[3])?,
            nibble(b[4])? * 16 + nibble(b[5])?,
        ),
        _ => return Err("hex color must be #RGB or #RRGGBB".to_owned()),
    };

    Ok(ColorDef::rgba(
        f64::from(r) / 255.0,
        f64::from(g) / 255.0,
        f64::from(bl) / 255.0,
        1.0,
    ))
}

fn number(s: &str) -> Result<f64, String> {
    let v: f64 = s
        .parse()
        .map_err(|_| format!("invalid color component '{s}'"))?;
    if !v.is_finite() {
        return Err(format!("invalid color component '{s}'"));
    }
    Ok(v)
}

/// `0..=255` or `0%..=100%`, normalized to `0..=1`.
fn channel(s: &str) -> Result<f64, String> {
    let v = match s.strip_suffix('%') {
        Some(p) => number(p.trim())? / 100.0,
        None => number(s)? / 255.0,
    };
    if !(0.0..=1.0).contains(&v) {
        return Err(format!("color channel '{s}' out of range"));
    }
    Ok(v)
}

fn alpha(s: &str) -> Result<f64, String> {
    let v = match s.strip_suffix('%') {
        Some(p) => number(p.trim())? / 100.0,
        None => number(s)?,
    };
    if !(0.0..=1.0).contains(&v) {
        return Err(format!("alpha '{s}' out of range"));
    }
    Ok(v)
}

fn percent(s: &str) -> Result<f64, String> {
    let p = s
        .strip_suffix('%')
        .ok_or_else(|| format!("expected percentage, got '{s}'"))?;
    let v = number(p.trim())? / 100.0;
    if !(0.0..=1.0).contains(&v) {
        return Err(format!("percentage '{s}' out of range"));
    }
    Ok(v)
}

fn hue(s: &str) -> Result<f64, String> {
    number(s.strip_suffix("deg").unwrap_or(s).trim())
}

fn hsla_to_rgba(h: f64, s: f64, l: f64, a: f64) -> ColorDef {
    let h = (h % 360.0 + 360.0) % 360.0 / 360.0;
    if s == 0.0 {
        return ColorDef::rgba(l, l, l, a);
    }

    fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            return p + (q - p) * 6.0 * t;
        }
        if t < 1.0 / 2.0 {
            return q;
        }
        if t < 2.0 / 3.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;

    ColorDef::rgba(
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
        a,
    )
}

#[cfg(test)]
#[path = "../../tests/unit/theme/color.rs"]
mod tests;
