//! The input state machine: six logical buttons against the current focus
//! and navigation context.
//!
//! Only release events reach this module; press edges are debounced away by
//! the button scanner or the host. Every path that changes anything visible
//! raises the model's render request.

use addon_proto::Button;

use crate::api::{ElementKind, NO_ELEMENT};
use crate::config::SCREEN_ANIM_PIXELS_PER_FRAME;
use crate::layout::effective_window;
use crate::model::{Model, NavContext};
use crate::nav;
use crate::tree;

/// Dispatch one button release.
pub fn on_button_release(m: &mut Model, btn: Button) {
    // a running screen slide swallows everything
    if m.slide.active {
        return;
    }
    // a masking overlay lets only OK through
    if m.overlay_active() && m.overlay.mask_input && btn != Button::Ok {
        return;
    }

    match btn {
        Button::Up => on_vertical(m, -1),
        Button::Down => on_vertical(m, 1),
        Button::Ok => on_ok(m),
        Button::Back => on_back(m),
        Button::Left => on_horizontal(m, -1),
        Button::Right => on_horizontal(m, 1),
    }
}

fn focus_kind(m: &Model) -> Option<ElementKind> {
    if m.focus == NO_ELEMENT { None } else { m.kind(m.focus) }
}

fn on_vertical(m: &mut Model, delta: i8) {
    match focus_kind(m) {
        Some(ElementKind::List) => list_move(m, m.focus, delta),
        Some(ElementKind::Barrel) => {
            let id = m.focus;
            if m.barrel_state_of(id).editing() {
                barrel_step(m, id, delta);
            } else if delta > 0 {
                nav::focus_next(m);
                m.render_req = true;
            } else {
                nav::focus_prev(m);
                m.render_req = true;
            }
        }
        _ => {
            if delta > 0 {
                nav::focus_next(m);
            } else {
                nav::focus_prev(m);
            }
            m.render_req = true;
        }
    }
}

/// Move the list cursor, kicking off a row-scroll animation when it would
/// leave the window.
fn list_move(m: &mut Model, list: u8, delta: i8) {
    let rows = tree::list_row_count(m, list);
    if rows == 0 {
        return;
    }
    let s = m.list_state_of(list);
    if s.anim_active {
        // one scroll at a time; the release is dropped
        return;
    }
    let cursor = s.cursor as i16 + delta as i16;
    if cursor < 0 || cursor >= rows as i16 {
        return;
    }
    let cursor = cursor as u8;
    let window = effective_window(m, list);
    m.update_list_state(list, |s| {
        if cursor < s.top_index {
            s.anim_active = true;
            s.anim_dir = -1;
            s.anim_pix = 0;
            s.pending_top = s.top_index - 1;
            s.pending_cursor = cursor;
        } else if cursor as i16 >= s.top_index as i16 + window as i16 {
            s.anim_active = true;
            s.anim_dir = 1;
            s.anim_pix = 0;
            s.pending_top = s.top_index + 1;
            s.pending_cursor = cursor;
        } else {
            s.cursor = cursor;
        }
    });
    m.render_req = true;
}

/// Step an editing barrel, wrapping over its option count.
fn barrel_step(m: &mut Model, barrel: u8, delta: i8) {
    let count = tree::barrel_option_count(m, barrel) as i16;
    if count == 0 {
        return;
    }
    m.update_barrel_state(barrel, |b| {
        b.value = (b.value + delta as i16).rem_euclid(count);
    });
    m.render_req = true;
}

fn on_ok(m: &mut Model) {
    match focus_kind(m) {
        None => {
            nav::focus_next(m);
            m.render_req = true;
        }
        Some(ElementKind::Trigger) => {
            let id = m.focus;
            m.update_trigger_state(id, |t| t.version = t.version.wrapping_add(1));
            m.note_dirty(id);
            m.render_req = true;
        }
        Some(ElementKind::Barrel) => {
            let id = m.focus;
            if m.barrel_state_of(id).editing() {
                barrel_commit(m, id);
            } else {
                barrel_begin_edit(m, id);
            }
        }
        Some(ElementKind::List) => list_activate(m, m.focus),
        _ => {}
    }
}

fn barrel_begin_edit(m: &mut Model, barrel: u8) {
    m.update_barrel_state(barrel, |b| {
        b.aux = 0x80 | (b.value as u8 & 0x7F);
    });
    m.blink_frame = 0;
    m.render_req = true;
}

fn barrel_commit(m: &mut Model, barrel: u8) {
    m.update_barrel_state(barrel, |b| {
        b.aux = b.value as u8 & 0x7F;
    });
    m.note_dirty(barrel);
    if let Some(list) = tree::element_parent_list(m, barrel) {
        m.focus = list;
    }
    m.render_req = true;
}

fn barrel_cancel(m: &mut Model, barrel: u8) {
    m.update_barrel_state(barrel, |b| {
        b.value = (b.aux & 0x7F) as i16;
        b.aux &= 0x7F;
    });
    m.render_req = true;
}

/// OK on a list acts on the cursor row: enter its barrel, descend into its
/// nested list, or open its local screen.
fn list_activate(m: &mut Model, list: u8) {
    let row = match tree::list_child_by_index(m, list, m.list_state_of(list).cursor) {
        Some(r) => r,
        None => return,
    };
    if let Some(barrel) = tree::text_inline_barrel(m, row) {
        m.focus = barrel;
        if !m.barrel_state_of(barrel).editing() {
            barrel_begin_edit(m, barrel);
        } else {
            barrel_commit(m, barrel);
        }
    } else if let Some(child) = tree::first_child_of_kind(m, row, ElementKind::List) {
        nav::push_list(m, list, child);
    } else if let Some(screen) = tree::first_child_of_kind(m, row, ElementKind::Screen) {
        nav::push_local_screen(m, list, screen);
    }
}

fn on_back(m: &mut Model) {
    match focus_kind(m) {
        Some(ElementKind::Barrel) => {
            let id = m.focus;
            if m.barrel_state_of(id).editing() {
                barrel_cancel(m, id);
            }
            refocus_parent_list_with_row(m, id);
        }
        Some(ElementKind::List) => {
            let on_top = m
                .nav
                .last()
                .map(|f| f.ctx == NavContext::NestedList && f.target == m.focus)
                .unwrap_or(false);
            if on_top {
                nav::pop(m);
            } else {
                back_default(m);
            }
        }
        _ => {
            if let Some(list) =
                (m.focus != NO_ELEMENT).then(|| tree::element_parent_list(m, m.focus)).flatten()
            {
                m.focus = list;
                m.render_req = true;
            } else {
                back_default(m);
            }
        }
    }
}

fn back_default(m: &mut Model) {
    if !m.nav.is_empty() {
        nav::pop(m);
    } else {
        nav::focus_first(m);
        m.render_req = true;
    }
}

/// Focus the list owning `id`, pulling the owning row back into view.
fn refocus_parent_list_with_row(m: &mut Model, id: u8) {
    let list = match tree::element_parent_list(m, id) {
        Some(l) => l,
        None => return,
    };
    let row_text = m.parent(id);
    let window = effective_window(m, list);
    if let Some(row) = tree::list_row_index(m, list, row_text) {
        m.update_list_state(list, |s| {
            s.cursor = row;
            if row < s.top_index {
                s.top_index = row;
            } else if row as i16 >= s.top_index as i16 + window as i16 {
                s.top_index = row + 1 - window;
            }
        });
    }
    m.focus = list;
    m.render_req = true;
}

fn on_horizontal(m: &mut Model, dir: i8) {
    // horizontal motion only exists at the screen strip level
    if !m.nav.is_empty() {
        return;
    }
    start_slide(m, dir);
}

/// Begin a slide toward the neighbor ordinal; clamped at the strip ends.
pub fn start_slide(m: &mut Model, dir: i8) {
    let count = tree::base_screen_count(m);
    if count == 0 {
        return;
    }
    let target = m.active_ordinal as i16 + dir as i16;
    if target < 0 || target >= count as i16 {
        return;
    }
    slide_to(m, target as u8);
}

/// Slide to an arbitrary ordinal; the target becomes active immediately so
/// visibility tracks the incoming screen.
pub fn slide_to(m: &mut Model, target: u8) {
    if target == m.active_ordinal {
        return;
    }
    m.slide.active = true;
    m.slide.from = m.active_ordinal;
    m.slide.to = target;
    m.slide.dir = if target > m.active_ordinal { 1 } else { -1 };
    m.slide.offset_px = 0;
    m.active_ordinal = target;
    m.render_req = true;
}

/// One animation frame of the screen slide.
pub fn slide_frame(m: &mut Model) {
    if !m.slide.active {
        return;
    }
    m.slide.offset_px += SCREEN_ANIM_PIXELS_PER_FRAME * m.slide.dir.abs() as i16;
    m.render_req = true;
    if m.slide.offset_px >= 128 {
        m.slide.active = false;
        m.slide.offset_px = 0;
        let ord = m.slide.to;
        m.snap_scroll_to(ord);
        nav::focus_first(m);
    }
}
