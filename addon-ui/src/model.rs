//! The in-RAM UI model: arena, node lists, and every piece of runtime state
//! the renderer and input machine share.

use addon_proto::DIRTY_NONE;
use heapless::Vec;

use crate::api::{ElementKind, NO_ELEMENT};
use crate::arena::Arena;
use crate::config::{EDIT_BLINK_PERIOD_FRAMES, NAV_STACK_DEPTH, PANEL_WIDTH};
use crate::nodes::{self, BarrelState, ListState, NodeLists, TriggerState};

/// Horizontal screen-change animation. `from`/`to` are base screen ordinals;
/// `dir` is +1 moving toward higher ordinals. While active, the scroll base
/// stays on the outgoing screen and `offset_px` ramps 0..128.
#[derive(Debug, Copy, Clone, Default)]
pub struct SlideAnim {
    pub active: bool,
    pub from: u8,
    pub to: u8,
    pub dir: i8,
    pub offset_px: i16,
}

/// Overlay presentation state; `screen` is NO_ELEMENT when nothing is up.
#[derive(Debug, Copy, Clone)]
pub struct OverlayState {
    pub screen: u8,
    pub expires_at: u32,
    pub mask_input: bool,
    pub saved_focus: u8,
}

impl Default for OverlayState {
    fn default() -> Self {
        OverlayState { screen: NO_ELEMENT, expires_at: 0, mask_input: false, saved_focus: NO_ELEMENT }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NavContext {
    NestedList,
    LocalScreen,
}

/// One navigation stack entry: where we went, and everything needed to put
/// the world back on pop.
#[derive(Debug, Copy, Clone)]
pub struct NavFrame {
    pub ctx: NavContext,
    pub target: u8,
    pub return_list: u8,
    pub saved_cursor: u8,
    pub saved_top: u8,
    pub saved_focus: u8,
    pub saved_ordinal: u8,
}

pub struct Model {
    pub arena: Arena,
    pub nodes: NodeLists,
    pub initialized: bool,
    pub active_ordinal: u8,
    pub scroll_x: i16,
    pub slide: SlideAnim,
    pub focus: u8,
    pub nav: Vec<NavFrame, NAV_STACK_DEPTH>,
    pub overlay: OverlayState,
    pub blink_frame: u8,
    pub dirty: bool,
    pub dirty_id: u8,
    pub render_req: bool,
}

impl Model {
    pub fn new() -> Model {
        Model {
            arena: Arena::new(),
            nodes: NodeLists::default(),
            initialized: false,
            active_ordinal: 0,
            scroll_x: 0,
            slide: SlideAnim::default(),
            focus: NO_ELEMENT,
            nav: Vec::new(),
            overlay: OverlayState::default(),
            blink_frame: 0,
            dirty: false,
            dirty_id: DIRTY_NONE,
            render_req: false,
        }
    }

    /// Full wipe, the HEAD semantics: arena, nodes, and every bit of
    /// navigation and presentation state.
    pub fn reset(&mut self) {
        self.arena.reset();
        self.nodes.reset();
        self.initialized = false;
        self.active_ordinal = 0;
        self.scroll_x = 0;
        self.slide = SlideAnim::default();
        self.focus = NO_ELEMENT;
        self.nav.clear();
        self.overlay = OverlayState::default();
        self.blink_frame = 0;
        self.dirty = false;
        self.dirty_id = DIRTY_NONE;
        self.render_req = false;
    }

    /// Record a runtime change for the host; last writer wins.
    pub fn note_dirty(&mut self, id: u8) {
        self.dirty = true;
        self.dirty_id = id;
    }

    /// Status read: report and clear in one step.
    pub fn take_dirty(&mut self) -> (bool, u8) {
        let out = (self.dirty, if self.dirty { self.dirty_id } else { DIRTY_NONE });
        self.dirty = false;
        self.dirty_id = DIRTY_NONE;
        out
    }

    pub fn overlay_active(&self) -> bool { self.overlay.screen != NO_ELEMENT }

    /// Whether the barrel edit highlight is in its bright phase.
    pub fn blink_bright(&self) -> bool { self.blink_frame < EDIT_BLINK_PERIOD_FRAMES / 2 }

    pub fn kind(&self, id: u8) -> Option<ElementKind> { self.arena.kind(id) }

    pub fn parent(&self, id: u8) -> u8 { self.arena.parent(id) }

    pub fn element_count(&self) -> u8 { self.arena.element_count() }

    /// Snap the horizontal scroll base onto an ordinal.
    pub fn snap_scroll_to(&mut self, ordinal: u8) {
        self.scroll_x = ordinal as i16 * PANEL_WIDTH;
    }

    // -- node state conveniences; absent nodes read as defaults ------------

    pub fn list_state_of(&self, id: u8) -> ListState {
        match self.nodes.list(&self.arena, id) {
            Some(off) => nodes::list_state(&self.arena, off),
            None => {
                let mut s = ListState::default();
                s.visible_rows = 4;
                s
            }
        }
    }

    pub fn update_list_state(&mut self, id: u8, f: impl FnOnce(&mut ListState)) {
        if let Some(off) = self.nodes.list_or_add(&mut self.arena, id) {
            let mut s = nodes::list_state(&self.arena, off);
            f(&mut s);
            nodes::put_list_state(&mut self.arena, off, &s);
        }
    }

    pub fn barrel_state_of(&self, id: u8) -> BarrelState {
        match self.nodes.barrel(&self.arena, id) {
            Some(off) => nodes::barrel_state(&self.arena, off),
            None => BarrelState::default(),
        }
    }

    pub fn update_barrel_state(&mut self, id: u8, f: impl FnOnce(&mut BarrelState)) {
        if let Some(off) = self.nodes.barrel_or_add(&mut self.arena, id) {
            let mut s = nodes::barrel_state(&self.arena, off);
            f(&mut s);
            nodes::put_barrel_state(&mut self.arena, off, &s);
        }
    }

    pub fn trigger_state_of(&self, id: u8) -> TriggerState {
        match self.nodes.trigger(&self.arena, id) {
            Some(off) => nodes::trigger_state(&self.arena, off),
            None => TriggerState::default(),
        }
    }

    pub fn update_trigger_state(&mut self, id: u8, f: impl FnOnce(&mut TriggerState)) {
        if let Some(off) = self.nodes.trigger_or_add(&mut self.arena, id) {
            let mut s = nodes::trigger_state(&self.arena, off);
            f(&mut s);
            nodes::put_trigger_state(&mut self.arena, off, &s);
        }
    }

    /// Any barrel currently in edit mode.
    pub fn editing_barrel(&self) -> Option<u8> {
        for off in self.nodes.barrel_offsets(&self.arena) {
            if nodes::barrel_state(&self.arena, off).editing() {
                return Some(nodes::node_element_id(&self.arena, off));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirty_is_last_writer_wins() {
        let mut m = Model::new();
        m.note_dirty(3);
        m.note_dirty(7);
        assert_eq!(m.take_dirty(), (true, 7));
        assert_eq!(m.take_dirty(), (false, DIRTY_NONE));
    }

    #[test]
    fn absent_nodes_read_as_defaults() {
        let m = Model::new();
        assert_eq!(m.list_state_of(0).visible_rows, 4);
        assert_eq!(m.barrel_state_of(0).value, 0);
        assert_eq!(m.trigger_state_of(0).version, 0);
    }

    #[test]
    fn reset_clears_presentation_state() {
        let mut m = Model::new();
        m.arena.reserve_element_storage(2).unwrap();
        m.focus = 1;
        m.active_ordinal = 2;
        m.scroll_x = 256;
        m.note_dirty(0);
        m.initialized = true;
        m.reset();
        assert_eq!(m.focus, NO_ELEMENT);
        assert_eq!(m.active_ordinal, 0);
        assert_eq!(m.scroll_x, 0);
        assert!(!m.initialized);
        assert_eq!(m.arena.capacity(), 0);
        assert_eq!(m.take_dirty(), (false, DIRTY_NONE));
    }
}
