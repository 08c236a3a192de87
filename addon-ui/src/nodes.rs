//! Runtime-mutable state nodes, tail-allocated in the arena.
//!
//! Each element kind with runtime state keeps a singly linked list of nodes,
//! rooted at a u16 offset (0 = nil, valid because offset 0 is always element
//! meta). Nodes are packed little-endian records read and written through
//! the arena's byte accessors; they are tiny, so copy-out/copy-in is the
//! access pattern everywhere.

use crate::arena::Arena;
use crate::config::ARENA_BYTES;

const LIST_NODE_SIZE: usize = 12;
const BARREL_NODE_SIZE: usize = 6;
const TRIGGER_NODE_SIZE: usize = 4;

/// List runtime state. `anim_dir` is +1 scrolling down, -1 scrolling up,
/// 0 idle; while a scroll runs, `pending_*` hold the post-animation values.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ListState {
    pub cursor: u8,
    pub top_index: u8,
    pub visible_rows: u8,
    pub anim_active: bool,
    pub anim_dir: i8,
    pub anim_pix: u8,
    pub pending_top: u8,
    pub pending_cursor: u8,
    pub last_text_child: u8,
}

/// Barrel runtime state. Bit 7 of `aux` is the edit flag; the low seven
/// bits snapshot the selection at edit entry (or the last committed value).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BarrelState {
    pub aux: u8,
    pub value: i16,
}

impl BarrelState {
    pub fn editing(&self) -> bool { self.aux & 0x80 != 0 }

    pub fn snapshot(&self) -> u8 { self.aux & 0x7F }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TriggerState {
    pub version: u8,
}

/// Heads of the three node lists.
#[derive(Debug, Copy, Clone, Default)]
pub struct NodeLists {
    list_head: u16,
    barrel_head: u16,
    trigger_head: u16,
}

fn find(arena: &Arena, head: u16, id: u8) -> Option<u16> {
    let mut off = head;
    // a walk longer than the arena could hold is a corrupt list
    let mut guard = ARENA_BYTES / TRIGGER_NODE_SIZE;
    while off != 0 && guard > 0 {
        if arena.u8_at(off + 2) == id {
            return Some(off);
        }
        off = arena.u16_at(off);
        guard -= 1;
    }
    None
}

fn push(arena: &mut Arena, head: &mut u16, size: usize, id: u8) -> Option<u16> {
    let off = arena.alloc_tail(size)?;
    arena.set_u16_at(off, *head);
    arena.set_u8_at(off + 2, id);
    *head = off;
    Some(off)
}

impl NodeLists {
    pub fn reset(&mut self) {
        self.list_head = 0;
        self.barrel_head = 0;
        self.trigger_head = 0;
    }

    pub fn list(&self, arena: &Arena, id: u8) -> Option<u16> { find(arena, self.list_head, id) }

    /// Find or tail-allocate; None means the arena is full, which callers
    /// treat as "element keeps default state".
    pub fn list_or_add(&mut self, arena: &mut Arena, id: u8) -> Option<u16> {
        if let Some(off) = find(arena, self.list_head, id) {
            return Some(off);
        }
        let off = push(arena, &mut self.list_head, LIST_NODE_SIZE, id)?;
        let mut s = ListState::default();
        s.visible_rows = 4;
        put_list_state(arena, off, &s);
        Some(off)
    }

    pub fn barrel(&self, arena: &Arena, id: u8) -> Option<u16> { find(arena, self.barrel_head, id) }

    pub fn barrel_or_add(&mut self, arena: &mut Arena, id: u8) -> Option<u16> {
        if let Some(off) = find(arena, self.barrel_head, id) {
            return Some(off);
        }
        push(arena, &mut self.barrel_head, BARREL_NODE_SIZE, id)
    }

    pub fn trigger(&self, arena: &Arena, id: u8) -> Option<u16> { find(arena, self.trigger_head, id) }

    pub fn trigger_or_add(&mut self, arena: &mut Arena, id: u8) -> Option<u16> {
        if let Some(off) = find(arena, self.trigger_head, id) {
            return Some(off);
        }
        push(arena, &mut self.trigger_head, TRIGGER_NODE_SIZE, id)
    }

    /// Offsets of every list node, for the animation sweep.
    pub fn list_offsets<'a>(&self, arena: &'a Arena) -> NodeIter<'a> {
        NodeIter { arena, off: self.list_head }
    }

    pub fn barrel_offsets<'a>(&self, arena: &'a Arena) -> NodeIter<'a> {
        NodeIter { arena, off: self.barrel_head }
    }
}

pub struct NodeIter<'a> {
    arena: &'a Arena,
    off: u16,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.off == 0 {
            return None;
        }
        let here = self.off;
        self.off = self.arena.u16_at(here);
        Some(here)
    }
}

pub fn node_element_id(arena: &Arena, off: u16) -> u8 { arena.u8_at(off + 2) }

pub fn list_state(arena: &Arena, off: u16) -> ListState {
    ListState {
        cursor: arena.u8_at(off + 3),
        top_index: arena.u8_at(off + 4),
        visible_rows: arena.u8_at(off + 5),
        anim_active: arena.u8_at(off + 6) != 0,
        anim_dir: arena.u8_at(off + 7) as i8,
        anim_pix: arena.u8_at(off + 8),
        pending_top: arena.u8_at(off + 9),
        pending_cursor: arena.u8_at(off + 10),
        last_text_child: arena.u8_at(off + 11),
    }
}

pub fn put_list_state(arena: &mut Arena, off: u16, s: &ListState) {
    arena.set_u8_at(off + 3, s.cursor);
    arena.set_u8_at(off + 4, s.top_index);
    arena.set_u8_at(off + 5, s.visible_rows);
    arena.set_u8_at(off + 6, s.anim_active as u8);
    arena.set_u8_at(off + 7, s.anim_dir as u8);
    arena.set_u8_at(off + 8, s.anim_pix);
    arena.set_u8_at(off + 9, s.pending_top);
    arena.set_u8_at(off + 10, s.pending_cursor);
    arena.set_u8_at(off + 11, s.last_text_child);
}

pub fn barrel_state(arena: &Arena, off: u16) -> BarrelState {
    BarrelState { aux: arena.u8_at(off + 3), value: arena.u16_at(off + 4) as i16 }
}

pub fn put_barrel_state(arena: &mut Arena, off: u16, s: &BarrelState) {
    arena.set_u8_at(off + 3, s.aux);
    arena.set_u16_at(off + 4, s.value as u16);
}

pub fn trigger_state(arena: &Arena, off: u16) -> TriggerState {
    TriggerState { version: arena.u8_at(off + 3) }
}

pub fn put_trigger_state(arena: &mut Arena, off: u16, s: &TriggerState) {
    arena.set_u8_at(off + 3, s.version);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ElementKind, NO_ELEMENT};

    fn arena_with(n: u8) -> Arena {
        let mut a = Arena::new();
        a.reserve_element_storage(n).unwrap();
        for _ in 0..n {
            a.add_element(NO_ELEMENT, ElementKind::List, 0, 0).unwrap();
        }
        a
    }

    #[test]
    fn get_or_add_returns_stable_offset() {
        let mut a = arena_with(3);
        let mut n = NodeLists::default();
        let off = n.list_or_add(&mut a, 1).unwrap();
        assert_eq!(n.list_or_add(&mut a, 1), Some(off));
        assert_eq!(n.list(&a, 1), Some(off));
        assert_eq!(n.list(&a, 2), None);
    }

    #[test]
    fn list_defaults() {
        let mut a = arena_with(1);
        let mut n = NodeLists::default();
        let off = n.list_or_add(&mut a, 0).unwrap();
        let s = list_state(&a, off);
        assert_eq!(s.visible_rows, 4);
        assert_eq!(s.cursor, 0);
        assert!(!s.anim_active);
    }

    #[test]
    fn barrel_round_trip() {
        let mut a = arena_with(1);
        let mut n = NodeLists::default();
        let off = n.barrel_or_add(&mut a, 0).unwrap();
        let mut s = barrel_state(&a, off);
        assert_eq!(s, BarrelState::default());
        s.value = -2;
        s.aux = 0x85;
        put_barrel_state(&mut a, off, &s);
        let back = barrel_state(&a, off);
        assert_eq!(back.value, -2);
        assert!(back.editing());
        assert_eq!(back.snapshot(), 5);
    }

    #[test]
    fn lists_are_independent() {
        let mut a = arena_with(2);
        let mut n = NodeLists::default();
        n.list_or_add(&mut a, 0).unwrap();
        n.barrel_or_add(&mut a, 0).unwrap();
        n.trigger_or_add(&mut a, 1).unwrap();
        assert!(n.list(&a, 0).is_some());
        assert!(n.barrel(&a, 0).is_some());
        assert!(n.trigger(&a, 1).is_some());
        assert!(n.trigger(&a, 0).is_none());
        assert_eq!(n.list_offsets(&a).count(), 1);
    }

    #[test]
    fn alloc_failure_is_silent() {
        let mut a = arena_with(1);
        // exhaust the free span
        while a.alloc_tail(8).is_some() {}
        let mut n = NodeLists::default();
        assert_eq!(n.list_or_add(&mut a, 0), None);
    }
}
