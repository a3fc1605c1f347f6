//! Minimal PDF 1.4 writer: A4 pages, Helvetica text cells with word wrapping,
//! automatic page breaks, and filled vector shapes for charts.
//! Page coordinates are millimetres from the top-left corner.

use std::fmt::Write as _;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
/// Points per millimetre
const K: f32 = 72.0 / 25.4;
const MARGIN: f32 = 10.0;
const CELL_PAD: f32 = 1.0;

// Helvetica advance widths (1/1000 em) for ASCII 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Latin-1 bytes for a PDF string literal; unmappable characters become `?`.
fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        let b = if (c as u32) < 256 { c as u32 as u8 } else { b'?' };
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            b'\r' | b'\n' | b'\t' => out.push(b' '),
            _ => out.push(b),
        }
    }
    out
}

pub struct PdfDocument {
    pages: Vec<Vec<u8>>,
    x: f32,
    y: f32,
    bold: bool,
    font_size: f32,
    auto_break_margin: f32,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            x: MARGIN,
            y: MARGIN,
            bold: false,
            font_size: 12.0,
            auto_break_margin: 15.0,
        }
    }

    pub fn set_auto_page_break(&mut self, margin: f32) {
        self.auto_break_margin = margin;
    }

    pub fn add_page(&mut self) {
        self.pages.push(Vec::new());
        self.x = MARGIN;
        self.y = MARGIN;
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn set_font(&mut self, bold: bool, size: f32) {
        self.bold = bold;
        self.font_size = size;
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    /// Width of the printable area
    pub fn content_width(&self) -> f32 {
        PAGE_W - 2.0 * MARGIN
    }

    fn emit(&mut self, op: &[u8]) {
        if self.pages.is_empty() {
            self.add_page();
        }
        if let Some(page) = self.pages.last_mut() {
            page.extend_from_slice(op);
        }
    }

    fn emit_str(&mut self, op: &str) {
        self.emit(op.as_bytes());
    }

    /// Text width in millimetres for the current font
    pub fn text_width(&self, text: &str) -> f32 {
        let units: u32 = text
            .chars()
            .map(|c| {
                let i = c as u32;
                if (32..=126).contains(&i) {
                    u32::from(HELVETICA_WIDTHS[(i - 32) as usize])
                } else {
                    556
                }
            })
            .sum();
        let scale = if self.bold { 1.07 } else { 1.0 };
        units as f32 * scale * self.font_size / 1000.0 / K
    }

    fn page_break_if_needed(&mut self, h: f32) {
        if self.y + h > PAGE_H - self.auto_break_margin {
            let x = self.x;
            self.add_page();
            self.x = x;
        }
    }

    /// Draw text with its baseline at (x, y).
    pub fn text_at(&mut self, x: f32, y: f32, text: &str) {
        self.text_rotated(x, y, 0.0, text);
    }

    /// Draw text rotated counter-clockwise by `degrees` around its baseline start.
    pub fn text_rotated(&mut self, x: f32, y: f32, degrees: f32, text: &str) {
        let font = if self.bold { "F2" } else { "F1" };
        let (s, c) = degrees.to_radians().sin_cos();
        let mut op = String::new();
        let _ = write!(
            op,
            "BT /{font} {:.2} Tf {:.4} {:.4} {:.4} {:.4} {:.2} {:.2} Tm (",
            self.font_size,
            c,
            s,
            -s,
            c,
            x * K,
            (PAGE_H - y) * K
        );
        let mut bytes = op.into_bytes();
        bytes.extend(encode_text(text));
        bytes.extend_from_slice(b") Tj ET\n");
        self.emit(&bytes);
    }

    /// One line cell at the cursor. `w == 0` extends to the right margin.
    /// With `ln` the cursor moves to the start of the next line.
    pub fn cell(&mut self, w: f32, h: f32, text: &str, align: Align, ln: bool) {
        self.page_break_if_needed(h);
        let w = if w <= 0.0 { PAGE_W - MARGIN - self.x } else { w };
        if !text.is_empty() {
            let tw = self.text_width(text);
            let dx = match align {
                Align::Left => CELL_PAD,
                Align::Center => (w - tw) / 2.0,
            };
            let baseline = self.y + 0.5 * h + 0.3 * self.font_size / K;
            self.text_at(self.x + dx, baseline, text);
        }
        if ln {
            self.x = MARGIN;
            self.y += h;
        } else {
            self.x += w;
        }
    }

    /// Word-wrapped paragraph; the cursor ends at the start of the next line.
    pub fn multi_cell(&mut self, w: f32, h: f32, text: &str) {
        let w = if w <= 0.0 { PAGE_W - MARGIN - self.x } else { w };
        let max = w - 2.0 * CELL_PAD;
        for paragraph in text.split('\n') {
            for line in self.wrap(paragraph, max) {
                self.cell(w, h, &line, Align::Left, true);
            }
        }
    }

    fn wrap(&self, text: &str, max: f32) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();
        for word in text.split(' ') {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if self.text_width(&candidate) <= max {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            // Hard-break words wider than the cell.
            let mut piece = String::new();
            for ch in word.chars() {
                piece.push(ch);
                if self.text_width(&piece) > max && piece.chars().count() > 1 {
                    piece.pop();
                    lines.push(std::mem::take(&mut piece));
                    piece.push(ch);
                }
            }
            current = piece;
        }
        lines.push(current);
        lines
    }

    pub fn ln(&mut self, h: f32) {
        self.x = MARGIN;
        self.y += h;
    }

    /// Move the cursor to an absolute vertical position at the left margin.
    pub fn set_y(&mut self, y: f32) {
        self.x = MARGIN;
        self.y = y;
    }

    /// Start a new page when less than `h` remains on the current one.
    pub fn ensure_space(&mut self, h: f32) {
        self.page_break_if_needed(h);
    }

    pub fn set_fill_color(&mut self, c: Rgb) {
        self.emit_str(&format!(
            "{:.3} {:.3} {:.3} rg\n",
            f32::from(c.0) / 255.0,
            f32::from(c.1) / 255.0,
            f32::from(c.2) / 255.0
        ));
    }

    pub fn set_draw_color(&mut self, c: Rgb) {
        self.emit_str(&format!(
            "{:.3} {:.3} {:.3} RG\n",
            f32::from(c.0) / 255.0,
            f32::from(c.1) / 255.0,
            f32::from(c.2) / 255.0
        ));
    }

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, fill: bool) {
        let op = if fill { "B" } else { "S" };
        self.emit_str(&format!(
            "{:.2} {:.2} {:.2} {:.2} re {op}\n",
            x * K,
            (PAGE_H - y - h) * K,
            w * K,
            h * K
        ));
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.emit_str(&format!(
            "{:.2} {:.2} m {:.2} {:.2} l S\n",
            x1 * K,
            (PAGE_H - y1) * K,
            x2 * K,
            (PAGE_H - y2) * K
        ));
    }

    /// Filled pie wedge centred at (cx, cy) with radius r, from `start` to
    /// `end` degrees counter-clockwise (0° = 3 o'clock).
    pub fn wedge(&mut self, cx: f32, cy: f32, r: f32, start: f32, end: f32) {
        let (cx, cy, r) = (cx * K, (PAGE_H - cy) * K, r * K);
        let point = |deg: f32| {
            let (s, c) = deg.to_radians().sin_cos();
            (cx + r * c, cy + r * s)
        };
        let mut op = String::new();
        let (sx, sy) = point(start);
        let _ = write!(op, "{cx:.2} {cy:.2} m {sx:.2} {sy:.2} l ");
        let sweep = end - start;
        let segments = (sweep.abs() / 90.0).ceil().max(1.0) as usize;
        let step = sweep / segments as f32;
        for i in 0..segments {
            let a0 = start + step * i as f32;
            let a1 = a0 + step;
            let kappa = 4.0 / 3.0 * ((a1 - a0).to_radians() / 4.0).tan();
            let (s0, c0) = a0.to_radians().sin_cos();
            let (s1, c1) = a1.to_radians().sin_cos();
            let (x0, y0) = (cx + r * c0, cy + r * s0);
            let (x3, y3) = (cx + r * c1, cy + r * s1);
            let (x1, y1) = (x0 - kappa * r * s0, y0 + kappa * r * c0);
            let (x2, y2) = (x3 + kappa * r * s1, y3 - kappa * r * c1);
            let _ = write!(op, "{x1:.2} {y1:.2} {x2:.2} {y2:.2} {x3:.2} {y3:.2} c ");
        }
        op.push_str("h B\n");
        self.emit_str(&op);
    }

    /// Serialize the document.
    pub fn output(&self) -> Vec<u8> {
        let mut pages = self.pages.clone();
        if pages.is_empty() {
            pages.push(Vec::new());
        }
        let n = pages.len();
        // 1 catalog, 2 page tree, 3-4 fonts, then (page, content) pairs.
        let mut objects: Vec<Vec<u8>> = Vec::with_capacity(4 + 2 * n);
        objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
        let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 5 + 2 * i)).collect();
        objects.push(format!("<< /Type /Pages /Kids [{}] /Count {n} >>", kids.join(" ")).into_bytes());
        objects.push(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec());
        objects.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>".to_vec(),
        );
        for (i, content) in pages.iter().enumerate() {
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                     /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                    PAGE_W * K,
                    PAGE_H * K,
                    6 + 2 * i
                )
                .into_bytes(),
            );
            let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
            stream.extend_from_slice(content);
            stream.extend_from_slice(b"\nendstream");
            objects.push(stream);
        }

        let mut out = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }
        let xref = out.len();
        let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for off in offsets {
            let _ = writeln!(table, "{off:010} 00000 n ");
        }
        let _ = write!(
            table,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        );
        out.extend_from_slice(table.as_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn document_structure() {
        let mut pdf = PdfDocument::new();
        pdf.add_page();
        pdf.set_font(true, 16.0);
        pdf.cell(0.0, 10.0, "Title (draft)", Align::Center, true);
        let out = pdf.output();
        assert!(out.starts_with(b"%PDF-1.4"));
        assert!(out.ends_with(b"%%EOF\n"));
        assert!(contains(&out, b"(Title \\(draft\\)) Tj"));
        assert!(contains(&out, b"/Count 1"));
    }

    #[test]
    fn latin1_and_fallback() {
        assert_eq!(encode_text("café"), b"caf\xe9".to_vec());
        assert_eq!(encode_text("→"), b"?".to_vec());
    }

    #[test]
    fn long_text_breaks_pages() {
        let mut pdf = PdfDocument::new();
        pdf.set_auto_page_break(15.0);
        pdf.add_page();
        pdf.set_font(false, 8.0);
        for i in 0..200 {
            pdf.multi_cell(0.0, 4.0, &format!("Entry {i}: some log line"));
        }
        assert!(pdf.page_count() >= 3);
    }

    #[test]
    fn wraps_on_words() {
        let mut pdf = PdfDocument::new();
        pdf.set_font(false, 10.0);
        let lines = pdf.wrap("alpha beta alpha beta", pdf.text_width("alpha beta") + 0.1);
        assert_eq!(lines, vec!["alpha beta", "alpha beta"]);
    }
}
