//! Serial framing and command dispatch.
//!
//! The RX half runs byte-at-a-time from interrupt context through
//! [`SharedRx`]; the main loop drains completed frames, decodes the
//! stuffing, and executes commands against the model. Responses go out
//! through the single-shot TX DMA, with a one-deep queue for the case where
//! the previous response is still draining.

use core::cell::RefCell;

use addon_proto::{
    cobs, Button, JsonFlags, Opcode, OverlayFlags, RetCode, StatusFlags, CAPABILITIES,
    DIRTY_NONE, EVENT_RELEASE, MAX_FRAME_PAYLOAD, OVERLAY_DEFAULT_MS, PROTOCOL_VERSION, SYNC0,
    SYNC1,
};
use critical_section::Mutex;
use heapless::Vec;
use num_traits::FromPrimitive;

use crate::api::{ElementKind, ScreenRole, UiError, UiResult};
use crate::config::TX_QUEUE_BYTES;
use crate::descriptor;
use crate::input;
use crate::model::Model;
use crate::nav;
use crate::tree;

/// Raw (unstuffed) response bytes, result code first.
pub type Response = Vec<u8, 60>;
/// A complete framed transmission.
pub type TxFrame = Vec<u8, TX_QUEUE_BYTES>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RxState {
    Sync0,
    Sync1,
    Len,
    Payload,
}

/// The byte-level receive state machine. Lives behind [`SharedRx`]; nothing
/// here may block or allocate.
struct RxFraming {
    state: RxState,
    buf: Vec<u8, MAX_FRAME_PAYLOAD>,
    expect: u8,
    frame_ready: bool,
    overrun: bool,
    progress: u32,
}

impl RxFraming {
    const fn new() -> RxFraming {
        RxFraming {
            state: RxState::Sync0,
            buf: Vec::new(),
            expect: 0,
            frame_ready: false,
            overrun: false,
            progress: 0,
        }
    }

    fn push(&mut self, byte: u8) {
        self.progress = self.progress.wrapping_add(1);
        if self.frame_ready {
            // single frame buffer; anything arriving before service is an
            // overrun
            self.overrun = true;
            return;
        }
        match self.state {
            RxState::Sync0 => {
                if byte == SYNC0 {
                    self.state = RxState::Sync1;
                }
            }
            RxState::Sync1 => {
                self.state = if byte == SYNC1 { RxState::Len } else { RxState::Sync0 };
            }
            RxState::Len => {
                if byte == 0 || byte as usize > MAX_FRAME_PAYLOAD {
                    self.state = RxState::Sync0;
                } else {
                    self.expect = byte;
                    self.buf.clear();
                    self.state = RxState::Payload;
                }
            }
            RxState::Payload => {
                // capacity equals the length bound, so push cannot fail
                self.buf.push(byte).ok();
                if self.buf.len() == self.expect as usize {
                    self.frame_ready = true;
                    self.state = RxState::Sync0;
                }
            }
        }
    }

    fn drop_partial(&mut self) {
        self.state = RxState::Sync0;
        self.buf.clear();
    }

    fn reset(&mut self) {
        self.drop_partial();
        self.frame_ready = false;
        self.overrun = false;
    }
}

/// Interrupt/main shared framing cell. The ISR owns `on_byte` and
/// `note_overrun`; everything else is main-loop side.
pub struct SharedRx {
    inner: Mutex<RefCell<RxFraming>>,
}

impl SharedRx {
    pub const fn new() -> SharedRx {
        SharedRx { inner: Mutex::new(RefCell::new(RxFraming::new())) }
    }

    /// Feed one received byte; interrupt context.
    pub fn on_byte(&self, byte: u8) {
        critical_section::with(|cs| self.inner.borrow(cs).borrow_mut().push(byte));
    }

    /// Hardware overrun flag from the ISR.
    pub fn note_overrun(&self) {
        critical_section::with(|cs| self.inner.borrow(cs).borrow_mut().overrun = true);
    }

    /// Copy out a completed frame's stuffed payload, if one is pending.
    pub fn take_frame(&self, out: &mut [u8; MAX_FRAME_PAYLOAD]) -> Option<usize> {
        critical_section::with(|cs| {
            let mut rx = self.inner.borrow(cs).borrow_mut();
            if rx.overrun {
                rx.reset();
                log::warn!("rx overrun, frame dropped");
                return None;
            }
            if !rx.frame_ready {
                return None;
            }
            let len = rx.buf.len();
            out[..len].copy_from_slice(&rx.buf);
            rx.frame_ready = false;
            rx.buf.clear();
            Some(len)
        })
    }

    /// Total bytes ever pushed; the watchdog watches this for stalls.
    pub fn progress(&self) -> u32 {
        critical_section::with(|cs| self.inner.borrow(cs).borrow().progress)
    }

    pub fn mid_frame(&self) -> bool {
        critical_section::with(|cs| {
            let rx = self.inner.borrow(cs).borrow();
            rx.state != RxState::Sync0 && !rx.frame_ready
        })
    }

    /// Watchdog expiry: abandon a stalled partial frame.
    pub fn drop_partial(&self) {
        critical_section::with(|cs| self.inner.borrow(cs).borrow_mut().drop_partial());
    }
}

/// One-deep response queue for when the TX DMA is still draining.
pub struct TxQueue {
    slot: Option<TxFrame>,
}

impl TxQueue {
    pub const fn new() -> TxQueue { TxQueue { slot: None } }

    pub fn put(&mut self, frame: TxFrame) -> UiResult<()> {
        if self.slot.is_some() {
            return Err(UiError::BadState);
        }
        self.slot = Some(frame);
        Ok(())
    }

    pub fn take(&mut self) -> Option<TxFrame> { self.slot.take() }

    pub fn is_empty(&self) -> bool { self.slot.is_none() }
}

/// Wrap raw response bytes in sync, length, and stuffing.
pub fn frame_response(raw: &[u8]) -> TxFrame {
    let mut out = TxFrame::new();
    let mut stuffed = [0u8; MAX_FRAME_PAYLOAD];
    // raw responses are far below the stuffing limit
    let n = cobs::encode(raw, &mut stuffed).unwrap_or(0);
    out.push(SYNC0).ok();
    out.push(SYNC1).ok();
    out.push(n as u8).ok();
    out.extend_from_slice(&stuffed[..n]).ok();
    out
}

/// What a serviced command asks the main loop to do next.
pub enum Action {
    Reply(Response),
    /// `goto_standby`: no response, drain TX and power down.
    Standby,
    /// Malformed stuffing; drop without a response.
    Drop,
}

fn rc_only(rc: RetCode) -> Response {
    let mut r = Response::new();
    r.push(rc as u8).ok();
    r
}

fn err_reply(e: UiError) -> Action { Action::Reply(rc_only(e.ret_code())) }

/// Decode one stuffed frame payload and execute it.
pub fn service_frame(m: &mut Model, now_ms: u32, stuffed: &[u8]) -> Action {
    let mut raw = [0u8; MAX_FRAME_PAYLOAD];
    let len = match cobs::decode(stuffed, &mut raw) {
        Ok(n) => n,
        Err(_) => {
            log::debug!("undecodable frame, {} stuffed bytes", stuffed.len());
            return Action::Drop;
        }
    };
    if len == 0 {
        return Action::Drop;
    }
    execute(m, now_ms, raw[0], &raw[1..len])
}

/// The command table.
pub fn execute(m: &mut Model, now_ms: u32, cmd: u8, payload: &[u8]) -> Action {
    let op = match Opcode::from_u8(cmd) {
        Some(op) => op,
        None => {
            log::debug!("unknown command {:#04x}", cmd);
            return err_reply(UiError::Internal);
        }
    };
    match op {
        Opcode::Ping => {
            let mut r = rc_only(RetCode::Ok);
            r.push(PROTOCOL_VERSION).ok();
            r.push(CAPABILITIES as u8).ok();
            r.push((CAPABILITIES >> 8) as u8).ok();
            Action::Reply(r)
        }
        Opcode::Json => cmd_json(m, payload),
        Opcode::JsonAbort => Action::Reply(rc_only(RetCode::Ok)),
        Opcode::SetActiveScreen => cmd_set_active(m, payload),
        Opcode::GetStatus => cmd_get_status(m),
        Opcode::ScrollToScreen => cmd_scroll_to(m, payload),
        Opcode::GetElementState => cmd_element_state(m, payload),
        Opcode::ShowOverlay => cmd_show_overlay(m, now_ms, payload),
        Opcode::InputEvent => cmd_input_event(m, payload),
        Opcode::GotoStandby => Action::Standby,
    }
}

fn cmd_json(m: &mut Model, payload: &[u8]) -> Action {
    if payload.is_empty() {
        return err_reply(UiError::BadLen);
    }
    let flags = JsonFlags::from_bits_truncate(payload[0]);
    let body = &payload[1..];

    if flags.contains(JsonFlags::HEAD) {
        m.reset();
    }

    let rc = if body.is_empty() {
        Ok(())
    } else {
        descriptor::apply(m, body)
    };

    // COMMIT applies even when this particular descriptor was bad, so one
    // mistyped field cannot hold the whole surface offline
    if flags.contains(JsonFlags::COMMIT) {
        m.arena.set_committed();
        m.initialized = true;
        if m.focus == crate::api::NO_ELEMENT {
            nav::focus_first(m);
        }
        m.render_req = true;
    }

    match rc {
        Ok(()) => Action::Reply(rc_only(RetCode::Ok)),
        Err(e) => err_reply(e),
    }
}

fn cmd_set_active(m: &mut Model, payload: &[u8]) -> Action {
    if payload.len() != 1 {
        return err_reply(UiError::BadLen);
    }
    let sord = payload[0];
    if sord >= tree::base_screen_count(m) {
        return err_reply(UiError::Range);
    }
    m.nav.clear();
    m.slide.active = false;
    m.active_ordinal = sord;
    m.snap_scroll_to(sord);
    nav::focus_first(m);
    m.render_req = true;
    Action::Reply(rc_only(RetCode::Ok))
}

fn cmd_get_status(m: &mut Model) -> Action {
    let (dirty, dirty_id) = m.take_dirty();
    let mut flags = StatusFlags::empty();
    if m.initialized {
        flags |= StatusFlags::INITIALIZED;
    }
    if dirty {
        flags |= StatusFlags::DIRTY;
    }
    if m.overlay_active() {
        flags |= StatusFlags::OVERLAY;
    }
    let mut r = rc_only(RetCode::Ok);
    r.push(flags.bits()).ok();
    r.push(m.element_count()).ok();
    r.push(tree::base_screen_count(m)).ok();
    r.push(m.active_ordinal).ok();
    r.push(PROTOCOL_VERSION).ok();
    r.push(if dirty { dirty_id } else { DIRTY_NONE }).ok();
    r.extend_from_slice(&[0, 0, 0]).ok();
    Action::Reply(r)
}

fn cmd_scroll_to(m: &mut Model, payload: &[u8]) -> Action {
    match payload.len() {
        1 => {
            let sord = payload[0];
            if sord >= tree::base_screen_count(m) {
                return err_reply(UiError::Range);
            }
            m.nav.clear();
            input::slide_to(m, sord);
            Action::Reply(rc_only(RetCode::Ok))
        }
        3 => {
            // explicit scroll base plus ordinal, no animation
            let off = u16::from_le_bytes([payload[0], payload[1]]);
            let sord = payload[2];
            if sord >= tree::base_screen_count(m) {
                return err_reply(UiError::Range);
            }
            m.nav.clear();
            m.slide.active = false;
            m.scroll_x = off as i16;
            m.active_ordinal = sord;
            nav::focus_first(m);
            m.render_req = true;
            Action::Reply(rc_only(RetCode::Ok))
        }
        _ => err_reply(UiError::BadLen),
    }
}

fn cmd_element_state(m: &mut Model, payload: &[u8]) -> Action {
    if payload.len() != 1 {
        return err_reply(UiError::BadLen);
    }
    let id = payload[0];
    let kind = match m.kind(id) {
        Some(k) => k,
        None => return err_reply(UiError::UnknownId),
    };
    let mut r = rc_only(RetCode::Ok);
    r.push(kind as u8).ok();
    match kind {
        ElementKind::Text => {
            let text = m.arena.text(id).unwrap_or(b"");
            r.push(text.len() as u8).ok();
            r.extend_from_slice(text).ok();
        }
        ElementKind::Barrel => {
            let v = m.barrel_state_of(id).value as u16;
            r.push(v as u8).ok();
            r.push((v >> 8) as u8).ok();
        }
        ElementKind::Trigger => {
            r.push(m.trigger_state_of(id).version).ok();
        }
        _ => {
            r.push(0xFF).ok();
        }
    }
    Action::Reply(r)
}

fn cmd_show_overlay(m: &mut Model, now_ms: u32, payload: &[u8]) -> Action {
    let (sid, dur, flags) = match payload.len() {
        1 => (payload[0], OVERLAY_DEFAULT_MS, OverlayFlags::empty()),
        4 => (
            payload[0],
            u16::from_le_bytes([payload[1], payload[2]]),
            OverlayFlags::from_bits_truncate(payload[3]),
        ),
        _ => return err_reply(UiError::BadLen),
    };
    if m.kind(sid).is_none() {
        return err_reply(UiError::UnknownId);
    }
    if m.kind(sid) != Some(ElementKind::Screen)
        || m.arena.screen_role(sid) != ScreenRole::FullOverlay
    {
        return err_reply(UiError::Range);
    }
    m.overlay.screen = sid;
    m.overlay.expires_at = now_ms.wrapping_add(dur as u32);
    m.overlay.mask_input = flags.contains(OverlayFlags::MASK_INPUT);
    m.overlay.saved_focus = m.focus;
    m.render_req = true;
    Action::Reply(rc_only(RetCode::Ok))
}

fn cmd_input_event(m: &mut Model, payload: &[u8]) -> Action {
    if payload.len() != 2 {
        return err_reply(UiError::BadLen);
    }
    let btn = match Button::from_u8(payload[0]) {
        Some(b) => b,
        None => return err_reply(UiError::Range),
    };
    if payload[1] == EVENT_RELEASE {
        input::on_button_release(m, btn);
    }
    Action::Reply(rc_only(RetCode::Ok))
}
