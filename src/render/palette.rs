/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const WHITE: Rgb = Rgb(255, 255, 255);
pub const BLACK: Rgb = Rgb(0, 0, 0);
pub const LIGHT_BLUE: Rgb = Rgb(173, 216, 230);
pub const VIOLET: Rgb = Rgb(238, 130, 238);
pub const INDIGO: Rgb = Rgb(75, 0, 130);
pub const RED: Rgb = Rgb(255, 0, 0);

impl Rgb {
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(
            mix(self.0, other.0),
            mix(self.1, other.1),
            mix(self.2, other.2),
        )
    }

    /// Relative luminance in 0..=1 (Rec. 709 weights, no gamma).
    pub fn luminance(self) -> f64 {
        (0.2126 * self.0 as f64 + 0.7152 * self.1 as f64 + 0.0722 * self.2 as f64) / 255.0
    }

    /// Black or white, whichever reads better on top of `self`.
    pub fn contrasting_text(self) -> Rgb {
        if self.luminance() > 0.5 {
            BLACK
        } else {
            WHITE
        }
    }
}

/// Piecewise-linear interpolation over `(position, colour)` stops sorted by position.
pub fn sample_stops(stops: &[(f64, Rgb)], t: f64) -> Rgb {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let Some(&(_, first)) = stops.first() else {
        return BLACK;
    };
    for pair in stops.windows(2) {
        let (p0, c0) = pair[0];
        let (p1, c1) = pair[1];
        if t <= p1 {
            let span = p1 - p0;
            let local = if span > 0.0 { (t - p0) / span } else { 1.0 };
            return c0.lerp(c1, local);
        }
    }
    stops.last().map(|&(_, c)| c).unwrap_or(first)
}

const COOLWARM: [(f64, Rgb); 5] = [
    (0.0, Rgb(59, 76, 192)),
    (0.25, Rgb(141, 175, 253)),
    (0.5, Rgb(221, 220, 220)),
    (0.75, Rgb(244, 153, 122)),
    (1.0, Rgb(180, 4, 38)),
];

/// Diverging blue → light grey → red scale.
pub fn coolwarm(t: f64) -> Rgb {
    sample_stops(&COOLWARM, t)
}

/// Rainbow scale: violet at 0, red at 1.
pub fn rainbow(t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let r = (2.0 * t - 1.0).abs();
    let g = (std::f64::consts::PI * t).sin();
    let b = (std::f64::consts::FRAC_PI_2 * t).cos();
    let to_u8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb(to_u8(r), to_u8(g), to_u8(b))
}

/// `n` colours running along the rainbow from red (first) to violet (last).
pub fn rainbow_descending(n: usize) -> Vec<Rgb> {
    match n {
        0 => Vec::new(),
        1 => vec![rainbow(1.0)],
        _ => (0..n)
            .map(|i| rainbow(1.0 - i as f64 / (n - 1) as f64))
            .collect(),
    }
}
