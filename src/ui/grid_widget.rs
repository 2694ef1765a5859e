//! Paints a `GridFrame` into a ratatui buffer.
//!
//! Pinned cells are drawn in their own layer at the left edge; unpinned
//! cells are clipped so they never paint underneath it.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

use crate::config::config::IconConfig;
use crate::ui::cell_renderer::{display_width, CellAlign};
use crate::ui::frame::GridFrame;

const SEPARATOR: &str = "│";
const PINNED_SEPARATOR: &str = "┃";
const ELLIPSIS: char = '…';

pub struct GridWidget<'a> {
    frame: &'a GridFrame,
    icons: &'a IconConfig,
}

impl<'a> GridWidget<'a> {
    pub fn new(frame: &'a GridFrame, icons: &'a IconConfig) -> Self {
        Self { frame, icons }
    }
}

fn char_width(ch: char) -> u16 {
    let mut buf = [0u8; 4];
    display_width(ch.encode_utf8(&mut buf))
}

/// Pad or truncate `text` to exactly `width` terminal columns
pub fn fit_text(text: &str, width: u16, align: CellAlign) -> String {
    let text_width = display_width(text);
    if text_width > width {
        if width == 0 {
            return String::new();
        }
        let mut out = String::new();
        let mut used = 0;
        for ch in text.chars() {
            let w = char_width(ch);
            if used + w > width - 1 {
                break;
            }
            out.push(ch);
            used += w;
        }
        out.push(ELLIPSIS);
        used += 1;
        out.push_str(&" ".repeat(usize::from(width.saturating_sub(used))));
        return out;
    }

    let pad = usize::from(width - text_width);
    match align {
        CellAlign::Left => format!("{}{}", text, " ".repeat(pad)),
        CellAlign::Right => format!("{}{}", " ".repeat(pad), text),
        CellAlign::Center => {
            let left = pad / 2;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(pad - left))
        }
    }
}

/// Horizontal clip range in absolute buffer columns
#[derive(Clone, Copy)]
struct Clip {
    start: i32,
    end: i32,
}

fn paint(
    buf: &mut Buffer,
    y: u16,
    x: i32,
    width: u16,
    clip: Clip,
    text: &str,
    align: CellAlign,
    style: Style,
) {
    let start = x.max(clip.start);
    let end = (x + i32::from(width)).min(clip.end);
    if start >= end {
        return;
    }
    let (Ok(start_x), Ok(span)) = (u16::try_from(start), u16::try_from(end - start)) else {
        return;
    };
    buf.set_style(Rect::new(start_x, y, span, 1), style);

    let mut col = x;
    let mut visible = String::new();
    for ch in fit_text(text, width, align).chars() {
        let w = i32::from(char_width(ch));
        if col >= start && col + w <= end {
            visible.push(ch);
        }
        col += w;
    }
    buf.set_stringn(start_x, y, &visible, usize::from(span), style);
}

fn paint_separator(buf: &mut Buffer, area: Rect, x: i32, y: u16, clip: Clip, symbol: &str) {
    if x < clip.start || x >= clip.end {
        return;
    }
    if let Ok(x) = u16::try_from(x) {
        if x < area.right() {
            buf.set_string(x, y, symbol, Style::default().fg(Color::DarkGray));
        }
    }
}

impl Widget for GridWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let frame = self.frame;
        let left = i32::from(area.x);
        let full = Clip {
            start: left,
            end: i32::from(area.right()),
        };
        let scrolled = Clip {
            start: left + i32::from(frame.pinned_edge),
            end: full.end,
        };
        let header_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);

        // header
        for row in 0..frame.header_height.min(area.height) {
            let y = area.y + row;
            if row > 0 {
                buf.set_style(Rect::new(area.x, y, area.width, 1), header_style);
                continue;
            }
            if frame.gutter_width > 0 {
                paint(buf, y, left, frame.gutter_width, full, "#", CellAlign::Right, header_style);
            }
            for cell in &frame.header {
                let clip = if cell.pinned { full } else { scrolled };
                let style = if cell.hovered {
                    header_style.add_modifier(Modifier::UNDERLINED)
                } else {
                    header_style
                };
                let x = left + cell.x;
                paint(buf, y, x, cell.width, clip, &cell.label(self.icons), CellAlign::Left, style);
                paint_separator(buf, area, x + i32::from(cell.width), y, clip, SEPARATOR);
            }
            if frame.pinned_edge > frame.gutter_width {
                paint_separator(buf, area, left + i32::from(frame.pinned_edge) - 1, y, full, PINNED_SEPARATOR);
            }
        }

        let body_top = area.y + frame.header_height.min(area.height);
        let body = Rect::new(area.x, body_top, area.width, area.bottom() - body_top);
        if body.height == 0 {
            return;
        }

        if let Some(message) = frame.message() {
            let y = body.y + body.height / 2;
            paint(
                buf,
                y,
                left,
                area.width,
                full,
                message,
                CellAlign::Center,
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        for row in &frame.rows {
            for line in 0..frame.row_height {
                let y = i32::from(body.y) + row.y + i32::from(line);
                if y < i32::from(body.y) || y >= i32::from(body.bottom()) {
                    continue;
                }
                let Ok(y) = u16::try_from(y) else {
                    continue;
                };
                // only the first line of a taller row carries text
                let first = line == 0;

                if frame.gutter_width > 0 {
                    let number = if first {
                        (row.position + 1).to_string()
                    } else {
                        String::new()
                    };
                    paint(
                        buf,
                        y,
                        left,
                        frame.gutter_width - 1,
                        full,
                        &number,
                        CellAlign::Right,
                        Style::default().fg(Color::DarkGray),
                    );
                }
                for cell in &row.cells {
                    let clip = if cell.pinned { full } else { scrolled };
                    let x = left + cell.x;
                    let text = if first { cell.cell.text.as_str() } else { "" };
                    paint(buf, y, x, cell.width, clip, text, cell.cell.align, cell.cell.style);
                    paint_separator(buf, area, x + i32::from(cell.width), y, clip, SEPARATOR);
                }
                if frame.pinned_edge > frame.gutter_width {
                    paint_separator(buf, area, left + i32::from(frame.pinned_edge) - 1, y, full, PINNED_SEPARATOR);
                }
            }
        }
    }
}
