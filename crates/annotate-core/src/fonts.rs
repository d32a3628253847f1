//! Standard-14 font metrics for measuring and placing committed text
//!
//! Widths are the Adobe AFM advance widths (1/1000 em) for the printable
//! ASCII range. Oblique and italic faces use the metrics of their upright
//! face. Characters outside ASCII fall back to the face's average width.

/// Metrics of one standard font face
#[derive(Debug)]
pub struct FontMetrics {
    pub name: &'static str,
    /// Advance widths for codes 0x20..=0x7E
    ascii_widths: [u16; 95],
    /// Width used for everything outside printable ASCII
    fallback_width: u16,
    pub ascent: f64,
}

impl FontMetrics {
    pub fn byte_width(&self, byte: u8) -> f64 {
        match byte {
            0x20..=0x7E => self.ascii_widths[(byte - 0x20) as usize] as f64,
            _ => self.fallback_width as f64,
        }
    }

    /// Width in points of WinAnsi-encoded text at `size`
    pub fn encoded_width(&self, encoded: &[u8], size: f64) -> f64 {
        encoded.iter().map(|b| self.byte_width(*b)).sum::<f64>() * size / 1000.0
    }

    /// Distance from the top of the line box down to the baseline
    pub fn ascent_pt(&self, size: f64) -> f64 {
        self.ascent * size / 1000.0
    }
}

#[rustfmt::skip]
static HELVETICA: FontMetrics = FontMetrics {
    name: "Helvetica",
    ascii_widths: [
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
        1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
        667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
        333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
        556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
    ],
    fallback_width: 556,
    ascent: 718.0,
};

#[rustfmt::skip]
static HELVETICA_BOLD: FontMetrics = FontMetrics {
    name: "Helvetica-Bold",
    ascii_widths: [
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
        975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
        667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
        333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
        611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
    ],
    fallback_width: 611,
    ascent: 718.0,
};

#[rustfmt::skip]
static TIMES_ROMAN: FontMetrics = FontMetrics {
    name: "Times-Roman",
    ascii_widths: [
        250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
        500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
        921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
        556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
        333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
        500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
    ],
    fallback_width: 500,
    ascent: 683.0,
};

#[rustfmt::skip]
static TIMES_BOLD: FontMetrics = FontMetrics {
    name: "Times-Bold",
    ascii_widths: [
        250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
        500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
        930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
        611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
        333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
        556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
    ],
    fallback_width: 556,
    ascent: 676.0,
};

static COURIER: FontMetrics = FontMetrics {
    name: "Courier",
    ascii_widths: [600; 95],
    fallback_width: 600,
    ascent: 629.0,
};

/// Look up metrics for a standard font name. Unknown names measure as Helvetica.
pub fn metrics(font_name: &str) -> &'static FontMetrics {
    let bold = font_name.contains("Bold");
    if font_name.starts_with("Times") {
        if bold {
            &TIMES_BOLD
        } else {
            &TIMES_ROMAN
        }
    } else if font_name.starts_with("Courier") {
        &COURIER
    } else if bold {
        &HELVETICA_BOLD
    } else {
        &HELVETICA
    }
}

/// Map a Unicode scalar to its WinAnsi (Windows-1252) code
pub fn unicode_to_win_ansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..0x7F).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }

    // 0x80..0x9F differ from Latin-1
    match cp {
        0x20AC => Some(0x80),
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85),
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        _ => None,
    }
}

/// Encode a single line of text as WinAnsi. Returns the first character that
/// has no WinAnsi code (control characters included).
pub fn encode_win_ansi(text: &str) -> Result<Vec<u8>, char> {
    text.chars()
        .map(|ch| unicode_to_win_ansi(ch).ok_or(ch))
        .collect()
}
