//! The shared arena: one static byte buffer holding everything the UI owns.
//!
//! Layout, low addresses first:
//!
//! ```text
//! [ element meta, N x (parent, kind) ]
//! [ pos_x, N bytes ][ pos_y, N bytes ]
//! [ attribute entries, append-only ]
//! v            free             ^
//! [ runtime nodes, tail allocated ]
//! ```
//!
//! The head grows upward and only during provisioning; the tail grows
//! downward and holds the linked runtime nodes. Nothing is ever reclaimed
//! short of a full reset, so u16 offsets into the buffer are stable handles
//! for the life of the provisioned UI.

use crate::api::{ElementKind, ScreenRole, UiError, UiResult, NO_ELEMENT};
use crate::config::{ARENA_BYTES, TEXT_CAP_MAX};
use num_traits::FromPrimitive;

/// Attribute tag: fixed-capacity text payload.
pub const TAG_TEXT: u8 = 1;
/// Attribute tag: screen role byte.
pub const TAG_SCREEN_ROLE: u8 = 2;

pub struct Arena {
    buf: [u8; ARENA_BYTES],
    head_used: usize,
    tail_used: usize,
    attr_base: usize,
    capacity: u8,
    element_count: u8,
    committed: bool,
}

impl Arena {
    pub const fn new() -> Arena {
        Arena {
            buf: [0; ARENA_BYTES],
            head_used: 0,
            tail_used: 0,
            attr_base: 0,
            capacity: 0,
            element_count: 0,
            committed: false,
        }
    }

    /// Forget everything; offsets handed out before this are dead.
    pub fn reset(&mut self) {
        self.head_used = 0;
        self.tail_used = 0;
        self.attr_base = 0;
        self.capacity = 0;
        self.element_count = 0;
        self.committed = false;
    }

    pub fn capacity(&self) -> u8 { self.capacity }

    pub fn element_count(&self) -> u8 { self.element_count }

    pub fn committed(&self) -> bool { self.committed }

    pub fn set_committed(&mut self) { self.committed = true; }

    pub fn head_used(&self) -> usize { self.head_used }

    pub fn tail_used(&self) -> usize { self.tail_used }

    /// Bytes still free between head and tail.
    pub fn free_bytes(&self) -> usize { ARENA_BYTES - self.head_used - self.tail_used }

    /// Partition the head for `n` element slots. Called exactly once per
    /// provisioning cycle, by the header descriptor.
    pub fn reserve_element_storage(&mut self, n: u8) -> UiResult<()> {
        if self.capacity != 0 {
            return Err(UiError::BadState);
        }
        if n == 0 {
            return Err(UiError::Range);
        }
        let tables = n as usize * 4;
        if tables + self.tail_used > ARENA_BYTES {
            return Err(UiError::NoSpace);
        }
        self.buf[..tables].iter_mut().for_each(|b| *b = 0);
        self.capacity = n;
        self.head_used = tables;
        self.attr_base = tables;
        Ok(())
    }

    /// Append one element slot; position and type land together.
    pub fn add_element(&mut self, parent: u8, kind: ElementKind, x: u8, y: u8) -> UiResult<u8> {
        if self.capacity == 0 || self.committed {
            return Err(UiError::BadState);
        }
        if self.element_count >= self.capacity {
            return Err(UiError::NoSpace);
        }
        let id = self.element_count;
        let n = self.capacity as usize;
        self.buf[id as usize * 2] = parent;
        self.buf[id as usize * 2 + 1] = kind as u8;
        self.buf[n * 2 + id as usize] = x;
        self.buf[n * 3 + id as usize] = y;
        self.element_count = id + 1;
        Ok(id)
    }

    pub fn parent(&self, id: u8) -> u8 {
        if id >= self.element_count {
            return NO_ELEMENT;
        }
        self.buf[id as usize * 2]
    }

    pub fn kind(&self, id: u8) -> Option<ElementKind> {
        if id >= self.element_count {
            return None;
        }
        ElementKind::from_u8(self.buf[id as usize * 2 + 1])
    }

    pub fn pos(&self, id: u8) -> (u8, u8) {
        if id >= self.element_count {
            return (0, 0);
        }
        let n = self.capacity as usize;
        (self.buf[n * 2 + id as usize], self.buf[n * 3 + id as usize])
    }

    pub fn set_pos_y(&mut self, id: u8, y: u8) {
        if id < self.element_count {
            let n = self.capacity as usize;
            self.buf[n * 3 + id as usize] = y;
        }
    }

    /// Room left for one more head append of `need` bytes.
    pub fn head_room(&self) -> usize { ARENA_BYTES - self.head_used - self.tail_used }

    /// Append a raw attribute entry `{tag, id} ++ body`. With `len_prefixed`
    /// the body length is written first so the scanner can step over it.
    pub fn append_attr(&mut self, tag: u8, id: u8, len_prefixed: bool, body: &[u8]) -> UiResult<usize> {
        if self.capacity == 0 || self.committed {
            return Err(UiError::BadState);
        }
        if id >= self.capacity {
            return Err(UiError::Range);
        }
        let need = 2 + body.len() + if len_prefixed { 1 } else { 0 };
        if self.head_used + need + self.tail_used > ARENA_BYTES {
            return Err(UiError::NoSpace);
        }
        let at = self.head_used;
        let mut wr = at;
        self.buf[wr] = tag;
        self.buf[wr + 1] = id;
        wr += 2;
        if len_prefixed {
            self.buf[wr] = body.len() as u8;
            wr += 1;
        }
        self.buf[wr..wr + body.len()].copy_from_slice(body);
        self.head_used = wr + body.len();
        Ok(at)
    }

    /// Forward scan for the first entry matching `(tag, id)`. Entry sizes
    /// are a function of the tag, so the scan can step without an index.
    pub fn find_attr(&self, tag: u8, id: u8) -> Option<usize> {
        let mut at = self.attr_base;
        while at + 2 <= self.head_used {
            let etag = self.buf[at];
            let eid = self.buf[at + 1];
            let size = match etag {
                TAG_TEXT => 3 + self.buf.get(at + 2).copied().unwrap_or(0) as usize,
                TAG_SCREEN_ROLE => 3,
                _ => return None, // scan is lost, nothing after this is typed
            };
            if etag == tag && eid == id {
                return Some(at);
            }
            at += size;
        }
        None
    }

    /// Create the text attribute for `id` with a fixed allocation of
    /// `cap + 1` bytes; writes `min(len, cap)` characters and a terminator.
    pub fn store_text_with_cap(&mut self, id: u8, text: &[u8], cap: u8) -> UiResult<()> {
        if cap > TEXT_CAP_MAX {
            return Err(UiError::Range);
        }
        let mut body = [0u8; TEXT_CAP_MAX as usize + 1];
        let alloc = cap as usize + 1;
        let wrote = text.len().min(cap as usize);
        body[..wrote].copy_from_slice(&text[..wrote]);
        body[wrote] = 0;
        self.append_attr(TAG_TEXT, id, true, &body[..alloc])?;
        Ok(())
    }

    /// Rewrite a text attribute in place; the allocation never changes, so
    /// an oversized update truncates.
    pub fn update_text(&mut self, id: u8, text: &[u8]) -> UiResult<()> {
        let at = self.find_attr(TAG_TEXT, id).ok_or(UiError::UnknownId)?;
        let alloc = self.buf[at + 2] as usize;
        let cap = alloc - 1;
        let wrote = text.len().min(cap);
        self.buf[at + 3..at + 3 + wrote].copy_from_slice(&text[..wrote]);
        self.buf[at + 3 + wrote] = 0;
        Ok(())
    }

    /// Current text content, up to the terminator.
    pub fn text(&self, id: u8) -> Option<&[u8]> {
        let at = self.find_attr(TAG_TEXT, id)?;
        let alloc = self.buf[at + 2] as usize;
        let data = &self.buf[at + 3..at + 3 + alloc];
        let len = data.iter().position(|&b| b == 0).unwrap_or(alloc);
        Some(&data[..len])
    }

    /// Allocated capacity of a text attribute, excluding the terminator.
    pub fn text_cap(&self, id: u8) -> Option<u8> {
        let at = self.find_attr(TAG_TEXT, id)?;
        Some(self.buf[at + 2] - 1)
    }

    pub fn set_screen_role(&mut self, id: u8, role: ScreenRole) -> UiResult<()> {
        self.append_attr(TAG_SCREEN_ROLE, id, false, &[role as u8])?;
        Ok(())
    }

    pub fn screen_role(&self, id: u8) -> ScreenRole {
        match self.find_attr(TAG_SCREEN_ROLE, id) {
            Some(at) => ScreenRole::from_u8(self.buf[at + 2]).unwrap_or(ScreenRole::None),
            None => ScreenRole::None,
        }
    }

    /// Carve `size` bytes off the tail, 2-aligned; the offset doubles as a
    /// weak reference valid until the next reset. None on exhaustion.
    pub fn alloc_tail(&mut self, size: usize) -> Option<u16> {
        let size = (size + 1) & !1;
        if self.head_used + self.tail_used + size > ARENA_BYTES {
            return None;
        }
        self.tail_used += size;
        let off = ARENA_BYTES - self.tail_used;
        self.buf[off..off + size].iter_mut().for_each(|b| *b = 0);
        Some(off as u16)
    }

    pub fn u8_at(&self, off: u16) -> u8 { self.buf[off as usize] }

    pub fn set_u8_at(&mut self, off: u16, v: u8) { self.buf[off as usize] = v; }

    pub fn u16_at(&self, off: u16) -> u16 {
        u16::from_le_bytes([self.buf[off as usize], self.buf[off as usize + 1]])
    }

    pub fn set_u16_at(&mut self, off: u16, v: u16) {
        self.buf[off as usize..off as usize + 2].copy_from_slice(&v.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_partitions_head() {
        let mut a = Arena::new();
        a.reserve_element_storage(10).unwrap();
        assert_eq!(a.head_used(), 40);
        assert_eq!(a.capacity(), 10);
        // double reservation is a state error
        assert_eq!(a.reserve_element_storage(5), Err(UiError::BadState));
    }

    #[test]
    fn reserve_rejects_bad_counts() {
        let mut a = Arena::new();
        assert_eq!(a.reserve_element_storage(0), Err(UiError::Range));
        // 255 elements want 1020 table bytes, more than the arena holds
        assert_eq!(a.reserve_element_storage(255), Err(UiError::NoSpace));
    }

    #[test]
    fn elements_append_in_order() {
        let mut a = Arena::new();
        a.reserve_element_storage(2).unwrap();
        let s = a.add_element(NO_ELEMENT, ElementKind::Screen, 0, 0).unwrap();
        let t = a.add_element(s, ElementKind::Text, 5, 9).unwrap();
        assert_eq!((s, t), (0, 1));
        assert_eq!(a.parent(t), 0);
        assert_eq!(a.kind(t), Some(ElementKind::Text));
        assert_eq!(a.pos(t), (5, 9));
        assert_eq!(
            a.add_element(NO_ELEMENT, ElementKind::Screen, 0, 0),
            Err(UiError::NoSpace)
        );
    }

    #[test]
    fn text_allocation_is_fixed() {
        let mut a = Arena::new();
        a.reserve_element_storage(2).unwrap();
        a.add_element(NO_ELEMENT, ElementKind::Screen, 0, 0).unwrap();
        let t = a.add_element(0, ElementKind::Text, 0, 0).unwrap();
        a.store_text_with_cap(t, b"hello world", 5).unwrap();
        assert_eq!(a.text(t).unwrap(), b"hello");
        assert_eq!(a.text_cap(t), Some(5));

        let head = a.head_used();
        a.update_text(t, b"hi").unwrap();
        assert_eq!(a.text(t).unwrap(), b"hi");
        a.update_text(t, b"overflowing update").unwrap();
        assert_eq!(a.text(t).unwrap(), b"overf");
        // no update grows the allocation
        assert_eq!(a.head_used(), head);
        assert_eq!(a.text_cap(t), Some(5));
    }

    #[test]
    fn zero_cap_text_is_just_a_terminator() {
        let mut a = Arena::new();
        a.reserve_element_storage(1).unwrap();
        let t = a.add_element(NO_ELEMENT, ElementKind::Text, 0, 0).unwrap();
        a.store_text_with_cap(t, b"x", 0).unwrap();
        assert_eq!(a.text(t).unwrap(), b"");
    }

    #[test]
    fn attrs_refuse_after_commit() {
        let mut a = Arena::new();
        a.reserve_element_storage(1).unwrap();
        let t = a.add_element(NO_ELEMENT, ElementKind::Text, 0, 0).unwrap();
        a.set_committed();
        assert_eq!(a.store_text_with_cap(t, b"x", 4), Err(UiError::BadState));
    }

    #[test]
    fn attr_scan_finds_mixed_entries() {
        let mut a = Arena::new();
        a.reserve_element_storage(3).unwrap();
        let s = a.add_element(NO_ELEMENT, ElementKind::Screen, 0, 0).unwrap();
        let t0 = a.add_element(s, ElementKind::Text, 0, 0).unwrap();
        let t1 = a.add_element(s, ElementKind::Text, 0, 8).unwrap();
        a.set_screen_role(s, ScreenRole::FullOverlay).unwrap();
        a.store_text_with_cap(t0, b"one", 4).unwrap();
        a.store_text_with_cap(t1, b"two", 4).unwrap();
        assert_eq!(a.screen_role(s), ScreenRole::FullOverlay);
        assert_eq!(a.text(t1).unwrap(), b"two");
        assert_eq!(a.text(t0).unwrap(), b"one");
        assert_eq!(a.find_attr(TAG_TEXT, s), None);
    }

    #[test]
    fn head_and_tail_collide_cleanly() {
        let mut a = Arena::new();
        a.reserve_element_storage(1).unwrap();
        let t = a.add_element(NO_ELEMENT, ElementKind::Text, 0, 0).unwrap();
        // eat the tail down to almost nothing
        let mut allocs = 0;
        while a.alloc_tail(8).is_some() {
            allocs += 1;
        }
        assert!(allocs > 0);
        assert!(a.free_bytes() < 8);
        let r = a.store_text_with_cap(t, b"does not fit anymore", 20);
        assert_eq!(r, Err(UiError::NoSpace));
        // the failed append consumed nothing
        assert!(a.head_used() + a.tail_used() <= ARENA_BYTES);
    }

    #[test]
    fn tail_allocs_are_aligned_and_zeroed() {
        let mut a = Arena::new();
        a.reserve_element_storage(1).unwrap();
        let off = a.alloc_tail(5).unwrap();
        assert_eq!(off % 2, 0);
        assert_eq!(a.u16_at(off), 0);
        a.set_u16_at(off, 0xBEEF);
        assert_eq!(a.u16_at(off), 0xBEEF);
        let off2 = a.alloc_tail(4).unwrap();
        assert!(off2 < off);
    }

    #[test]
    fn reset_clears_everything() {
        let mut a = Arena::new();
        a.reserve_element_storage(4).unwrap();
        a.add_element(NO_ELEMENT, ElementKind::Screen, 0, 0).unwrap();
        a.alloc_tail(8).unwrap();
        a.set_committed();
        a.reset();
        assert_eq!(a.capacity(), 0);
        assert_eq!(a.element_count(), 0);
        assert_eq!(a.head_used(), 0);
        assert_eq!(a.tail_used(), 0);
        assert!(!a.committed());
    }
}
