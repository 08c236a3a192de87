//! Coordinate mapping from element space onto the panel.

use crate::api::ScreenRole;
use crate::config::{MAX_LIST_ROWS, PANEL_HEIGHT, PANEL_WIDTH};
use crate::model::Model;
use crate::tree;

/// Panel position of an element.
///
/// Base-screen content lives on a horizontal strip, one panel width per
/// ordinal, shifted by the scroll base; while a slide runs, both
/// participating screens pick up the animation offset. Overlay-owned
/// elements are pinned to the panel.
pub fn layout_element(m: &Model, id: u8) -> (i16, i16) {
    let (x, y) = m.arena.pos(id);
    let mut gx = x as i16;
    let gy = y as i16;

    let screen = match tree::element_root_screen(m, id) {
        Some(s) => s,
        None => return (gx, gy),
    };
    if m.arena.screen_role(screen) == ScreenRole::FullOverlay {
        return (gx, gy);
    }

    let ord = tree::find_screen_ordinal_by_id(m, screen).unwrap_or(m.active_ordinal);
    gx += ord as i16 * PANEL_WIDTH - m.scroll_x;
    if m.slide.active && (ord == m.slide.from || ord == m.slide.to) {
        gx -= m.slide.dir as i16 * m.slide.offset_px;
    }
    (gx, gy)
}

/// Rows a list can actually show: its configured window, bounded by the
/// panel-height ceiling and by the pixels below its own top edge.
pub fn effective_window(m: &Model, list: u8) -> u8 {
    let visible = m.list_state_of(list).visible_rows;
    let (_, y) = m.arena.pos(list);
    let below = ((PANEL_HEIGHT - y as i16) / 8).max(0) as u8;
    visible.min(MAX_LIST_ROWS).min(below).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::apply;

    fn two_screens() -> Model {
        let mut m = Model::new();
        for d in [
            br#"{"t":"h","n":6}"#.as_ref(),
            br#"{"t":"s"}"#.as_ref(),
            br#"{"t":"t","p":0,"x":10,"y":4,"tx":"a"}"#.as_ref(),
            br#"{"t":"s"}"#.as_ref(),
            br#"{"t":"t","p":2,"x":10,"y":4,"tx":"b"}"#.as_ref(),
            br#"{"t":"s","ov":1}"#.as_ref(),
            br#"{"t":"t","p":4,"x":30,"y":12,"tx":"ov"}"#.as_ref(),
        ] {
            apply(&mut m, d).unwrap();
        }
        m
    }

    #[test]
    fn strip_offsets_by_ordinal() {
        let mut m = two_screens();
        assert_eq!(layout_element(&m, 1), (10, 4));
        // second screen sits one panel to the right
        assert_eq!(layout_element(&m, 3), (10 + 128, 4));
        m.active_ordinal = 1;
        m.snap_scroll_to(1);
        assert_eq!(layout_element(&m, 1), (10 - 128, 4));
        assert_eq!(layout_element(&m, 3), (10, 4));
    }

    #[test]
    fn slide_offsets_both_participants() {
        let mut m = two_screens();
        m.slide.active = true;
        m.slide.from = 0;
        m.slide.to = 1;
        m.slide.dir = 1;
        m.slide.offset_px = 40;
        m.active_ordinal = 1;
        // scroll base still on the outgoing screen
        assert_eq!(layout_element(&m, 1), (10 - 40, 4));
        assert_eq!(layout_element(&m, 3), (10 + 128 - 40, 4));
    }

    #[test]
    fn overlay_elements_are_pinned() {
        let mut m = two_screens();
        m.active_ordinal = 1;
        m.snap_scroll_to(1);
        assert_eq!(layout_element(&m, 5), (30, 12));
    }

    #[test]
    #[cfg(not(feature = "panel-64"))]
    fn window_is_clamped_by_panel_and_position() {
        let mut m = Model::new();
        for d in [
            br#"{"t":"h","n":4}"#.as_ref(),
            br#"{"t":"s"}"#.as_ref(),
            br#"{"t":"l","p":0,"x":8,"y":0,"r":6}"#.as_ref(),
            br#"{"t":"l","p":0,"x":8,"y":16,"r":6}"#.as_ref(),
            br#"{"t":"l","p":0,"x":8,"y":30,"r":2}"#.as_ref(),
        ] {
            apply(&mut m, d).unwrap();
        }
        // 32-px panel: only four rows fit below y=0
        assert_eq!(effective_window(&m, 1), 4);
        assert_eq!(effective_window(&m, 2), 2);
        // squeezed to zero rows below y=30, clamped up to one
        assert_eq!(effective_window(&m, 3), 1);
    }
}
