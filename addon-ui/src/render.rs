//! Per-page tile rendering: walk the element table and fill one 128-byte
//! page of the panel.

use pageblit::{blit_glyph, blit_text, invert_span, PageBuf, VClip};

use crate::api::{ElementKind, ScreenRole};
use crate::config::{CULL_X, CURSOR_MARKER_OFFSET, FOCUS_MIN_INVERT_WIDTH, PANEL_HEIGHT};
use crate::layout::{effective_window, layout_element};
use crate::model::Model;
use crate::nav;
use crate::tree;

/// Fill one page. This is the tile callback the transfer engine drives; it
/// must not touch anything but the model and the buffer.
pub fn fill_page(m: &Model, page: u8, buf: &mut PageBuf) {
    let page_top = page as i16 * 8;
    let panel = VClip::panel(PANEL_HEIGHT);

    // an active overlay owns the panel: only its text, pinned
    if m.overlay_active() {
        let ov = m.overlay.screen;
        for id in 0..m.element_count() {
            if m.kind(id) == Some(ElementKind::Text) && tree::is_descendant_of(m, id, ov) {
                let (x, y) = m.arena.pos(id);
                let text = m.arena.text(id).unwrap_or(b"");
                blit_text(buf, page_top, x as i16, y as i16, text, panel);
            }
        }
        return;
    }

    for id in 0..m.element_count() {
        let kind = match m.kind(id) {
            Some(k) => k,
            None => continue,
        };
        if !nav::is_visible(m, id) {
            continue;
        }
        if let Some(root) = tree::element_root_screen(m, id) {
            if m.arena.screen_role(root) == ScreenRole::FullOverlay {
                continue;
            }
        }
        match kind {
            ElementKind::Text => {
                let pk = m.kind(m.parent(id));
                // lists draw their own rows, barrels their selected option
                if pk == Some(ElementKind::List) || pk == Some(ElementKind::Barrel) {
                    continue;
                }
                draw_text(m, id, page_top, buf, panel);
            }
            ElementKind::List => draw_list(m, id, page_top, buf),
            ElementKind::Barrel => draw_barrel(m, id, page_top, buf, panel),
            _ => {}
        }
    }
}

/// A focused trigger has no pixels of its own; its text child carries the
/// highlight instead.
fn label_focused(m: &Model, text: u8) -> bool {
    if m.focus == text {
        return true;
    }
    let p = m.parent(text);
    m.focus == p && m.kind(p) == Some(ElementKind::Trigger)
}

fn draw_text(m: &Model, id: u8, page_top: i16, buf: &mut PageBuf, panel: VClip) {
    let (gx, gy) = layout_element(m, id);
    if gx.abs() > CULL_X {
        return;
    }
    let text = m.arena.text(id).unwrap_or(b"");
    let w = blit_text(buf, page_top, gx, gy, text, panel);
    if label_focused(m, id) && !m.slide.active {
        invert_span(buf, page_top, gx, gy, w.max(FOCUS_MIN_INVERT_WIDTH), panel);
    }
}

fn draw_list(m: &Model, id: u8, page_top: i16, buf: &mut PageBuf) {
    let (lx, ly) = layout_element(m, id);
    if lx.abs() > CULL_X {
        return;
    }
    let s = m.list_state_of(id);
    let window = effective_window(m, id) as i16;
    let rows = tree::list_row_count(m, id) as i16;
    let top = s.top_index as i16;
    let pix = s.anim_pix as i16;

    // rows clip against the list viewport as well as the panel
    let clip = VClip { y0: ly.max(0), y1: (ly + window * 8).min(PANEL_HEIGHT) };

    let (first, last) = if s.anim_active {
        if s.anim_dir < 0 { (top - 1, top + window - 1) } else { (top, top + window) }
    } else {
        (top, top + window - 1)
    };

    for r in first..=last {
        if r < 0 || r >= rows {
            continue;
        }
        let ry = if !s.anim_active {
            ly + (r - top) * 8
        } else if s.anim_dir > 0 {
            ly + (r - top) * 8 - pix
        } else if r == top - 1 {
            // the incoming row enters from above
            ly - 8 + pix
        } else {
            ly + (r - top) * 8 + pix
        };

        let text_id = match tree::list_child_by_index(m, id, r as u8) {
            Some(t) => t,
            None => continue,
        };
        let rx = layout_element(m, text_id).0;
        let bytes = m.arena.text(text_id).unwrap_or(b"");
        blit_text(buf, page_top, rx, ry, bytes, clip);

        let at_cursor =
            r == s.cursor as i16 || (s.anim_active && r == s.pending_cursor as i16);
        if at_cursor {
            blit_glyph(buf, page_top, rx - CURSOR_MARKER_OFFSET, ry, b'>', clip);
        }
    }
}

fn draw_barrel(m: &Model, id: u8, page_top: i16, buf: &mut PageBuf, panel: VClip) {
    let (gx, gy) = layout_element(m, id);
    if gx.abs() > CULL_X {
        return;
    }
    let s = m.barrel_state_of(id);

    let mut fallback = [0u8; 4];
    let bytes: &[u8] = match tree::barrel_option(m, id, s.value) {
        Some(t) => m.arena.text(t).unwrap_or(b""),
        None => {
            let v = s.value.rem_euclid(100) as u8;
            fallback = [b'[', b'0' + v / 10, b'0' + v % 10, b']'];
            &fallback
        }
    };
    let w = blit_text(buf, page_top, gx, gy, bytes, panel);

    if m.slide.active {
        return;
    }
    let mut invert = false;
    if m.focus == id {
        // a steady highlight when selected, blinking while editing
        invert = !s.editing() || m.blink_bright();
    } else {
        // the inline barrel of the cursor row highlights with the row
        let row_text = m.parent(id);
        if m.kind(row_text) == Some(ElementKind::Text) {
            if let Some(list) = tree::element_parent_list(m, id) {
                let ls = m.list_state_of(list);
                if m.focus == list
                    && !ls.anim_active
                    && tree::list_row_index(m, list, row_text) == Some(ls.cursor)
                {
                    invert = true;
                }
            }
        }
    }
    if invert {
        invert_span(buf, page_top, gx, gy, w, panel);
    }
}
