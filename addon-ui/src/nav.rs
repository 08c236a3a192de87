//! Focus traversal, the visibility predicate, and the navigation stack.

use crate::api::{ElementKind, NO_ELEMENT};
use crate::model::{Model, NavContext, NavFrame};
use crate::tree;

/// Whether `id` participates in focus traversal and rendering right now.
///
/// The rules compose:
/// - at depth zero, the element must sit under the screen mapped to the
///   active ordinal (or under the outgoing screen while a slide runs);
/// - inside a navigation context, only the context target's subtree exists;
/// - a local screen's content is dead unless that screen is on the stack;
/// - a nested list (one whose grandparent is again a list) is dead until it
///   has been entered.
pub fn is_visible(m: &Model, id: u8) -> bool {
    if id >= m.element_count() {
        return false;
    }

    match m.nav.last() {
        None => {
            let mut ok = match tree::find_screen_id_by_ordinal(m, m.active_ordinal) {
                Some(screen) => tree::is_under(m, id, screen),
                None => false,
            };
            if !ok && m.slide.active {
                if let Some(out) = tree::find_screen_id_by_ordinal(m, m.slide.from) {
                    ok = tree::is_under(m, id, out);
                }
            }
            if !ok {
                return false;
            }
        }
        Some(frame) => {
            if !tree::is_under(m, id, frame.target) {
                return false;
            }
        }
    }

    // local screens only exist while pushed
    if let Some(root) = tree::element_root_screen(m, id) {
        if m.parent(root) != NO_ELEMENT && !stack_has(m, NavContext::LocalScreen, root) {
            return false;
        }
    }

    // nested lists only exist once entered
    let mut at = id;
    let mut guard = m.element_count();
    loop {
        if m.kind(at) == Some(ElementKind::List) {
            let gp = m.parent(m.parent(at));
            if gp != NO_ELEMENT
                && m.kind(gp) == Some(ElementKind::List)
                && !stack_has(m, NavContext::NestedList, at)
            {
                return false;
            }
        }
        at = m.parent(at);
        if at == NO_ELEMENT || guard == 0 {
            break;
        }
        guard -= 1;
    }

    true
}

fn stack_has(m: &Model, ctx: NavContext, target: u8) -> bool {
    m.nav.iter().any(|f| f.ctx == ctx && f.target == target)
}

fn focusable_visible(m: &Model, id: u8) -> bool {
    m.kind(id).map(|k| k.focusable()).unwrap_or(false) && is_visible(m, id)
}

/// Advance focus in creation order, wrapping; sentinel when nothing fits.
pub fn focus_next(m: &mut Model) {
    let n = m.element_count() as usize;
    if n == 0 {
        m.focus = NO_ELEMENT;
        return;
    }
    let start = if m.focus == NO_ELEMENT { 0 } else { (m.focus as usize + 1) % n };
    for step in 0..n {
        let id = ((start + step) % n) as u8;
        if focusable_visible(m, id) {
            m.focus = id;
            return;
        }
    }
    m.focus = NO_ELEMENT;
}

/// Retreat focus in creation order, wrapping.
pub fn focus_prev(m: &mut Model) {
    let n = m.element_count() as usize;
    if n == 0 {
        m.focus = NO_ELEMENT;
        return;
    }
    let start =
        if m.focus == NO_ELEMENT || m.focus == 0 { n - 1 } else { m.focus as usize - 1 };
    for step in 0..n {
        let id = ((n + start - step) % n) as u8;
        if focusable_visible(m, id) {
            m.focus = id;
            return;
        }
    }
    m.focus = NO_ELEMENT;
}

/// Land focus on the first visible focusable element, or the sentinel.
pub fn focus_first(m: &mut Model) {
    m.focus = NO_ELEMENT;
    for id in 0..m.element_count() {
        if focusable_visible(m, id) {
            m.focus = id;
            return;
        }
    }
}

/// Enter a nested list: snapshot the world, zero the child's cursor, and
/// focus it. A full stack drops the request on the floor.
pub fn push_list(m: &mut Model, parent_list: u8, target: u8) {
    let frame = make_frame(m, NavContext::NestedList, parent_list, target);
    if m.nav.push(frame).is_err() {
        log::warn!("nav stack full, list {} not entered", target);
        return;
    }
    m.update_list_state(target, |s| {
        s.cursor = 0;
        s.top_index = 0;
        s.anim_active = false;
    });
    m.focus = target;
    m.render_req = true;
}

/// Enter a local screen hanging off a list row.
pub fn push_local_screen(m: &mut Model, parent_list: u8, screen: u8) {
    let frame = make_frame(m, NavContext::LocalScreen, parent_list, screen);
    if m.nav.push(frame).is_err() {
        log::warn!("nav stack full, screen {} not entered", screen);
        return;
    }
    if let Some(ord) = tree::find_screen_ordinal_by_id(m, screen) {
        m.active_ordinal = ord;
        m.snap_scroll_to(ord);
    }
    focus_first(m);
    if m.focus == NO_ELEMENT {
        m.focus = parent_list;
    }
    m.render_req = true;
}

fn make_frame(m: &Model, ctx: NavContext, return_list: u8, target: u8) -> NavFrame {
    let s = m.list_state_of(return_list);
    NavFrame {
        ctx,
        target,
        return_list,
        saved_cursor: s.cursor,
        saved_top: s.top_index,
        saved_focus: m.focus,
        saved_ordinal: m.active_ordinal,
    }
}

/// Leave the top context, restoring exactly what the matching push saved.
pub fn pop(m: &mut Model) {
    let frame = match m.nav.pop() {
        Some(f) => f,
        None => return,
    };
    m.update_list_state(frame.return_list, |s| {
        s.cursor = frame.saved_cursor;
        s.top_index = frame.saved_top;
        s.anim_active = false;
    });
    if frame.ctx == NavContext::LocalScreen {
        m.active_ordinal = frame.saved_ordinal;
        m.snap_scroll_to(frame.saved_ordinal);
    }
    m.focus = frame.saved_focus;
    m.render_req = true;
}
