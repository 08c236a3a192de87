//! Provisioning and update descriptor parser.
//!
//! One descriptor is a single self-delimited ASCII object resembling JSON:
//! `{"t":"l","p":0,"x":8,"y":0,"r":3}`. Keys arrive in any order, values may
//! be bare or quoted integers, and unknown keys are skipped, so extraction
//! works by scanning for `"key"` spans rather than by walking a grammar.

use crate::api::{ElementKind, ScreenRole, UiError, UiResult, NO_ELEMENT};
use crate::config::TEXT_CAP_MAX;
use crate::model::Model;
use crate::tree;

/// Longest string value a descriptor can carry.
const VALUE_MAX: usize = TEXT_CAP_MAX as usize;

fn is_ws(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b'\r' || b == b'\n'
}

/// Index just past `"key":`, whitespace skipped, or None.
fn find_value(buf: &[u8], key: &str) -> Option<usize> {
    let k = key.as_bytes();
    let mut at = 0;
    while at + k.len() + 2 <= buf.len() {
        if buf[at] == b'"'
            && buf[at + 1..at + 1 + k.len()] == *k
            && buf.get(at + 1 + k.len()) == Some(&b'"')
        {
            let mut v = at + k.len() + 2;
            while v < buf.len() && is_ws(buf[v]) {
                v += 1;
            }
            if buf.get(v) != Some(&b':') {
                // a quoted value that happens to look like the key
                at += 1;
                continue;
            }
            v += 1;
            while v < buf.len() && is_ws(buf[v]) {
                v += 1;
            }
            return Some(v);
        }
        at += 1;
    }
    None
}

/// Integer value for `key`; tolerates quoting and a leading minus.
pub fn extract_int(buf: &[u8], key: &str) -> Option<i32> {
    let mut at = find_value(buf, key)?;
    let quoted = buf.get(at) == Some(&b'"');
    if quoted {
        at += 1;
    }
    let neg = buf.get(at) == Some(&b'-');
    if neg {
        at += 1;
    }
    let mut val: i32 = 0;
    let mut digits = 0;
    while let Some(&b) = buf.get(at) {
        if !b.is_ascii_digit() {
            break;
        }
        val = val.saturating_mul(10).saturating_add((b - b'0') as i32);
        digits += 1;
        at += 1;
    }
    if digits == 0 {
        return None;
    }
    Some(if neg { -val } else { val })
}

/// String value for `key`, copied into `out`; returns the length. Values
/// longer than `out` are truncated.
pub fn extract_str(buf: &[u8], key: &str, out: &mut [u8]) -> Option<usize> {
    let at = find_value(buf, key)?;
    if buf.get(at) != Some(&b'"') {
        return None;
    }
    let mut rd = at + 1;
    let mut wr = 0;
    while let Some(&b) = buf.get(rd) {
        if b == b'"' {
            return Some(wr);
        }
        if wr < out.len() {
            out[wr] = b;
            wr += 1;
        }
        rd += 1;
    }
    None // unterminated
}

fn object_body(buf: &[u8]) -> UiResult<&[u8]> {
    let mut lo = 0;
    let mut hi = buf.len();
    while lo < hi && is_ws(buf[lo]) {
        lo += 1;
    }
    while hi > lo && is_ws(buf[hi - 1]) {
        hi -= 1;
    }
    if hi - lo < 2 || buf[lo] != b'{' || buf[hi - 1] != b'}' {
        return Err(UiError::ParseFail);
    }
    Ok(&buf[lo..hi])
}

/// Apply one descriptor to the model: create an element, or update one by
/// id when `e` is present. Header descriptors reserve the element tables
/// and must come first.
pub fn apply(m: &mut Model, raw: &[u8]) -> UiResult<()> {
    let buf = object_body(raw)?;

    if let Some(e) = extract_int(buf, "e") {
        // updates are descriptors too: nothing is accepted before the header
        if m.arena.capacity() == 0 {
            return Err(UiError::BadState);
        }
        return apply_update(m, buf, e);
    }

    let mut token = [0u8; 4];
    let tlen = extract_str(buf, "t", &mut token).ok_or(UiError::ParseFail)?;
    if tlen != 1 {
        return Err(UiError::ParseFail);
    }

    if token[0] == b'h' {
        let n = extract_int(buf, "n").ok_or(UiError::ParseFail)?;
        if n < 1 || n > 255 {
            return Err(UiError::Range);
        }
        return m.arena.reserve_element_storage(n as u8);
    }

    // everything else needs the header's reservation in place
    if m.arena.capacity() == 0 {
        return Err(UiError::BadState);
    }

    match token[0] {
        b's' => create_screen(m, buf),
        b'l' => create_list(m, buf),
        b't' => create_text(m, buf),
        b'b' => create_barrel(m, buf),
        b'i' => create_trigger(m, buf),
        _ => Err(UiError::ParseFail),
    }
}

fn apply_update(m: &mut Model, buf: &[u8], e: i32) -> UiResult<()> {
    if e < 0 || e >= m.element_count() as i32 {
        return Err(UiError::UnknownId);
    }
    let id = e as u8;
    let kind = m.kind(id).ok_or(UiError::Internal)?;

    // a `t` that disagrees with the element's actual kind is a stale
    // descriptor; drop it without complaint
    let mut token = [0u8; 4];
    if let Some(1) = extract_str(buf, "t", &mut token) {
        let expect = match kind {
            ElementKind::Screen => b's',
            ElementKind::List => b'l',
            ElementKind::Text => b't',
            ElementKind::Barrel => b'b',
            ElementKind::Trigger => b'i',
        };
        if token[0] != expect {
            log::debug!("update kind mismatch on id {}, ignored", id);
            return Ok(());
        }
    }

    match kind {
        ElementKind::Text => {
            let mut s = [0u8; VALUE_MAX];
            if let Some(len) = extract_str(buf, "tx", &mut s) {
                m.arena.update_text(id, &s[..len.min(VALUE_MAX)])?;
                m.note_dirty(id);
                m.render_req = true;
            }
            Ok(())
        }
        ElementKind::Barrel => {
            if let Some(v) = extract_int(buf, "v") {
                m.update_barrel_state(id, |b| b.value = v as i16);
                m.note_dirty(id);
                m.render_req = true;
            }
            Ok(())
        }
        // triggers and structure elements have nothing updatable
        _ => Ok(()),
    }
}

/// Children declared with a list as parent hang off the most recent row.
/// Element 0 can never be a row (parents precede children), so zero doubles
/// as "no row yet".
fn resolve_parent(m: &Model, p: u8) -> u8 {
    if m.kind(p) == Some(ElementKind::List) {
        let last = m.list_state_of(p).last_text_child;
        if last != 0 {
            return last;
        }
    }
    p
}

fn parent_key(buf: &[u8]) -> u8 {
    match extract_int(buf, "p") {
        Some(p) if p >= 0 && p < 255 => p as u8,
        _ => NO_ELEMENT,
    }
}

/// Parents must already exist; ids only ever reference earlier elements.
fn checked_parent(m: &Model, p: u8) -> UiResult<u8> {
    if p != NO_ELEMENT && p >= m.element_count() {
        return Err(UiError::UnknownId);
    }
    Ok(p)
}

fn xy(buf: &[u8]) -> (u8, u8) {
    let x = extract_int(buf, "x").unwrap_or(0).clamp(0, 255) as u8;
    let y = extract_int(buf, "y").unwrap_or(0).clamp(0, 255) as u8;
    (x, y)
}

fn create_screen(m: &mut Model, buf: &[u8]) -> UiResult<()> {
    let p = checked_parent(m, parent_key(buf))?;
    let p = if p == NO_ELEMENT { p } else { resolve_parent(m, p) };
    let overlay = extract_int(buf, "ov").unwrap_or(0) == 1;
    if overlay && m.arena.head_room() < 3 {
        return Err(UiError::NoSpace);
    }
    let id = m.arena.add_element(p, ElementKind::Screen, 0, 0)?;
    if overlay {
        m.arena.set_screen_role(id, ScreenRole::FullOverlay)?;
    }
    Ok(())
}

fn create_list(m: &mut Model, buf: &[u8]) -> UiResult<()> {
    let p = resolve_parent(m, checked_parent(m, parent_key(buf))?);
    let (x, y) = xy(buf);
    // `sy` is a host-side scroll hint, deliberately ignored here
    let rows = extract_int(buf, "r").unwrap_or(4).clamp(1, 6) as u8;
    let id = m.arena.add_element(p, ElementKind::List, x, y)?;
    m.update_list_state(id, |s| s.visible_rows = rows);
    Ok(())
}

fn create_text(m: &mut Model, buf: &[u8]) -> UiResult<()> {
    let p = checked_parent(m, parent_key(buf))?;
    let (x, mut y) = xy(buf);

    let mut s = [0u8; VALUE_MAX];
    let len = extract_str(buf, "tx", &mut s).unwrap_or(0).min(VALUE_MAX);
    let cap = match extract_int(buf, "c") {
        Some(c) if c > 0 => {
            if c > TEXT_CAP_MAX as i32 {
                return Err(UiError::Range);
            }
            c as u8
        }
        // zero or absent: allocate exactly what the initial text needs
        _ => len as u8,
    };

    let row_of = if m.kind(p) == Some(ElementKind::List) { Some(p) } else { None };
    if let Some(list) = row_of {
        y = tree::list_row_count(m, list).saturating_mul(8);
    }

    // make sure the text attribute will land before creating the slot, so a
    // full arena does not leave a half-made element behind
    if m.arena.head_room() < 3 + cap as usize + 1 {
        return Err(UiError::NoSpace);
    }
    let id = m.arena.add_element(p, ElementKind::Text, x, y)?;
    m.arena.store_text_with_cap(id, &s[..len], cap)?;
    if let Some(list) = row_of {
        m.update_list_state(list, |ls| ls.last_text_child = id);
    }
    Ok(())
}

fn create_barrel(m: &mut Model, buf: &[u8]) -> UiResult<()> {
    let p = resolve_parent(m, checked_parent(m, parent_key(buf))?);
    let (x, y) = xy(buf);
    let v = extract_int(buf, "v").unwrap_or(0);
    let id = m.arena.add_element(p, ElementKind::Barrel, x, y)?;
    m.update_barrel_state(id, |b| b.value = v as i16);
    Ok(())
}

fn create_trigger(m: &mut Model, buf: &[u8]) -> UiResult<()> {
    // triggers attach where declared; only s/b/l children follow a list's
    // most recent row
    let p = checked_parent(m, parent_key(buf))?;
    let (x, y) = xy(buf);
    let id = m.arena.add_element(p, ElementKind::Trigger, x, y)?;
    m.update_trigger_state(id, |_| {});
    Ok(())
}
