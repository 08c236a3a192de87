//! Structure queries over the element tables.
//!
//! Everything here is a linear sweep over ids 0..N or a parent climb bounded
//! by N. Parents always have lower ids than their children, so a well-formed
//! tree terminates naturally; the bound only matters for defense against a
//! corrupted table.

use crate::api::{ElementKind, ScreenRole, NO_ELEMENT};
use crate::model::Model;

/// Number of text rows under a list, in creation order.
pub fn list_row_count(m: &Model, list: u8) -> u8 {
    let mut count = 0;
    for id in 0..m.element_count() {
        if m.parent(id) == list && m.kind(id) == Some(ElementKind::Text) {
            count += 1;
        }
    }
    count
}

/// The `row`-th text child of a list.
pub fn list_child_by_index(m: &Model, list: u8, row: u8) -> Option<u8> {
    let mut seen = 0;
    for id in 0..m.element_count() {
        if m.parent(id) == list && m.kind(id) == Some(ElementKind::Text) {
            if seen == row {
                return Some(id);
            }
            seen += 1;
        }
    }
    None
}

/// Which row a text child occupies within its list.
pub fn list_row_index(m: &Model, list: u8, text: u8) -> Option<u8> {
    let mut seen = 0;
    for id in 0..m.element_count() {
        if m.parent(id) == list && m.kind(id) == Some(ElementKind::Text) {
            if id == text {
                return Some(seen);
            }
            seen += 1;
        }
    }
    None
}

/// First barrel child of a text row, if any.
pub fn text_inline_barrel(m: &Model, text: u8) -> Option<u8> {
    first_child_of_kind(m, text, ElementKind::Barrel)
}

/// First child of `parent` with the given kind.
pub fn first_child_of_kind(m: &Model, parent: u8, kind: ElementKind) -> Option<u8> {
    for id in 0..m.element_count() {
        if m.parent(id) == parent && m.kind(id) == Some(kind) {
            return Some(id);
        }
    }
    None
}

/// The `index`-th text child of a barrel; these are the selectable options.
pub fn barrel_option(m: &Model, barrel: u8, index: i16) -> Option<u8> {
    if index < 0 || index > u8::MAX as i16 {
        return None;
    }
    list_child_by_index(m, barrel, index as u8)
}

/// How many options a barrel carries.
pub fn barrel_option_count(m: &Model, barrel: u8) -> u8 {
    let mut count = 0;
    for id in 0..m.element_count() {
        if m.parent(id) == barrel && m.kind(id) == Some(ElementKind::Text) {
            count += 1;
        }
    }
    count
}

/// Base screens are parentless, non-overlay screens; they form the ordinal
/// sequence in declaration order.
pub fn base_screen_count(m: &Model) -> u8 {
    let mut count = 0;
    for id in 0..m.element_count() {
        if is_base_screen(m, id) {
            count += 1;
        }
    }
    count
}

fn is_base_screen(m: &Model, id: u8) -> bool {
    m.kind(id) == Some(ElementKind::Screen)
        && m.parent(id) == NO_ELEMENT
        && m.arena.screen_role(id) == ScreenRole::None
}

pub fn find_screen_id_by_ordinal(m: &Model, ordinal: u8) -> Option<u8> {
    let mut seen = 0;
    for id in 0..m.element_count() {
        if is_base_screen(m, id) {
            if seen == ordinal {
                return Some(id);
            }
            seen += 1;
        }
    }
    None
}

pub fn find_screen_ordinal_by_id(m: &Model, screen: u8) -> Option<u8> {
    let mut seen = 0;
    for id in 0..m.element_count() {
        if is_base_screen(m, id) {
            if id == screen {
                return Some(seen);
            }
            seen += 1;
        }
    }
    None
}

/// Nearest list ancestor, climbing at most N links.
pub fn element_parent_list(m: &Model, id: u8) -> Option<u8> {
    let mut at = m.parent(id);
    let mut guard = m.element_count();
    while at != NO_ELEMENT && guard > 0 {
        if m.kind(at) == Some(ElementKind::List) {
            return Some(at);
        }
        at = m.parent(at);
        guard -= 1;
    }
    None
}

/// Nearest screen ancestor; a screen is its own root.
pub fn element_root_screen(m: &Model, id: u8) -> Option<u8> {
    let mut at = id;
    let mut guard = m.element_count();
    loop {
        if m.kind(at) == Some(ElementKind::Screen) {
            return Some(at);
        }
        at = m.parent(at);
        if at == NO_ELEMENT || guard == 0 {
            return None;
        }
        guard -= 1;
    }
}

/// Strict ancestry test, bounded by N.
pub fn is_descendant_of(m: &Model, id: u8, ancestor: u8) -> bool {
    let mut at = m.parent(id);
    let mut guard = m.element_count();
    while at != NO_ELEMENT && guard > 0 {
        if at == ancestor {
            return true;
        }
        at = m.parent(at);
        guard -= 1;
    }
    false
}

/// Self-inclusive ancestry, the form visibility checks want.
pub fn is_under(m: &Model, id: u8, ancestor: u8) -> bool {
    id == ancestor || is_descendant_of(m, id, ancestor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::NO_ELEMENT;

    /// screen 0 -> list 1 -> texts 2,3,4; text 3 carries barrel 5 with
    /// option texts 6,7; overlay screen 8
    fn sample() -> Model {
        let mut m = Model::new();
        m.arena.reserve_element_storage(9).unwrap();
        m.arena.add_element(NO_ELEMENT, ElementKind::Screen, 0, 0).unwrap();
        m.arena.add_element(0, ElementKind::List, 8, 0).unwrap();
        m.arena.add_element(1, ElementKind::Text, 8, 0).unwrap();
        m.arena.add_element(1, ElementKind::Text, 8, 8).unwrap();
        m.arena.add_element(1, ElementKind::Text, 8, 16).unwrap();
        m.arena.add_element(3, ElementKind::Barrel, 80, 8).unwrap();
        m.arena.add_element(5, ElementKind::Text, 0, 0).unwrap();
        m.arena.add_element(5, ElementKind::Text, 0, 0).unwrap();
        m.arena.add_element(NO_ELEMENT, ElementKind::Screen, 0, 0).unwrap();
        m.arena.set_screen_role(8, ScreenRole::FullOverlay).unwrap();
        m
    }

    #[test]
    fn rows_and_indices() {
        let m = sample();
        assert_eq!(list_row_count(&m, 1), 3);
        assert_eq!(list_child_by_index(&m, 1, 0), Some(2));
        assert_eq!(list_child_by_index(&m, 1, 2), Some(4));
        assert_eq!(list_child_by_index(&m, 1, 3), None);
        assert_eq!(list_row_index(&m, 1, 3), Some(1));
        assert_eq!(list_row_index(&m, 1, 5), None);
    }

    #[test]
    fn barrel_lookups() {
        let m = sample();
        assert_eq!(text_inline_barrel(&m, 3), Some(5));
        assert_eq!(text_inline_barrel(&m, 2), None);
        assert_eq!(barrel_option_count(&m, 5), 2);
        assert_eq!(barrel_option(&m, 5, 1), Some(7));
        assert_eq!(barrel_option(&m, 5, 2), None);
        assert_eq!(barrel_option(&m, 5, -1), None);
    }

    #[test]
    fn ordinals_skip_overlays() {
        let m = sample();
        assert_eq!(base_screen_count(&m), 1);
        assert_eq!(find_screen_id_by_ordinal(&m, 0), Some(0));
        assert_eq!(find_screen_id_by_ordinal(&m, 1), None);
        assert_eq!(find_screen_ordinal_by_id(&m, 0), Some(0));
        assert_eq!(find_screen_ordinal_by_id(&m, 8), None);
    }

    #[test]
    fn climbs() {
        let m = sample();
        assert_eq!(element_parent_list(&m, 5), Some(1));
        assert_eq!(element_parent_list(&m, 6), Some(1));
        assert_eq!(element_parent_list(&m, 0), None);
        assert_eq!(element_root_screen(&m, 7), Some(0));
        assert_eq!(element_root_screen(&m, 0), Some(0));
        assert!(is_descendant_of(&m, 7, 0));
        assert!(is_descendant_of(&m, 5, 1));
        assert!(!is_descendant_of(&m, 2, 3));
        assert!(!is_descendant_of(&m, 0, 0));
        assert!(is_under(&m, 0, 0));
    }
}
