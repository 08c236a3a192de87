#![cfg_attr(target_os = "none", no_std)]

//! Display-slave UI firmware core.
//!
//! A host provisions a UI as a stream of descriptor objects over a framed
//! serial link; this crate parses them into an arena-backed element model,
//! renders the active screen page by page through a cooperative DMA engine,
//! and feeds button events back into focus, navigation, and edit state.
//!
//! Everything hardware-shaped sits behind the traits in [`backend`]; the
//! [`UiSlave`] struct owns the model and runs the fixed main-loop tick:
//! transfer engine, deferred RX/TX, animations, buttons, standby, render
//! start.

pub mod api;
pub mod arena;
pub mod backend;
pub mod config;
pub mod descriptor;
pub mod input;
pub mod layout;
pub mod model;
pub mod nav;
pub mod nodes;
pub mod proto;
pub mod render;
pub mod tree;

use addon_proto::{cobs, Button, MAX_FRAME_PAYLOAD, SYNC0, SYNC1};
use num_traits::FromPrimitive;

use backend::{ButtonPort, DisplayLink, HostIrq, HostLink, PANEL_OFF, PANEL_ON};
use backend::engine::PageEngine;
use config::{EDIT_BLINK_PERIOD_FRAMES, FRAME_MS, LIST_ANIM_PIXELS_PER_FRAME, RX_WATCHDOG_MS};
use model::Model;
use proto::{Action, SharedRx, TxQueue};

pub struct UiSlave<D, H, B, I>
where
    D: DisplayLink,
    H: HostLink,
    B: ButtonPort,
    I: HostIrq,
{
    pub model: Model,
    pub engine: PageEngine,
    pub display: D,
    pub host: H,
    pub buttons: B,
    pub irq: I,
    pub rx: SharedRx,
    tx_queue: TxQueue,
    now_ms: u32,
    rx_progress: u32,
    rx_last_change: u32,
    last_button_mask: u8,
    standby_req: bool,
    in_standby: bool,
}

impl<D, H, B, I> UiSlave<D, H, B, I>
where
    D: DisplayLink,
    H: HostLink,
    B: ButtonPort,
    I: HostIrq,
{
    pub fn new(display: D, host: H, buttons: B, irq: I) -> Self {
        UiSlave {
            model: Model::new(),
            engine: PageEngine::new(),
            display,
            host,
            buttons,
            irq,
            rx: SharedRx::new(),
            tx_queue: TxQueue::new(),
            now_ms: 0,
            rx_progress: 0,
            rx_last_change: 0,
            last_button_mask: 0,
            standby_req: false,
            in_standby: false,
        }
    }

    pub fn now_ms(&self) -> u32 { self.now_ms }

    pub fn in_standby(&self) -> bool { self.in_standby }

    /// One millisecond of the main loop.
    pub fn tick(&mut self) {
        self.now_ms = self.now_ms.wrapping_add(1);
        if self.in_standby {
            return;
        }

        // 1. advance the page transfer engine one stage
        let model = &self.model;
        self.engine.advance(&mut self.display, |page, buf| render::fill_page(model, page, buf));

        // 2. deferred RX decode/dispatch and queued TX
        self.service_deferred();

        // 3. animations, on the frame divider
        if self.now_ms % FRAME_MS == 0 {
            self.animate();
        }

        // 4. local buttons
        self.poll_buttons();

        // 5. standby entry
        self.handle_standby();

        // 6. start or coalesce a requested render
        if self.model.render_req && !self.in_standby {
            self.model.render_req = false;
            self.engine.start_or_request();
        }

        // 7. mirror the dirty flag onto the notify line
        self.irq.set_asserted(self.model.dirty);
    }

    pub fn run_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.tick();
        }
    }

    /// Wake edge from the host; leaves standby and repaints.
    pub fn wake(&mut self) {
        if !self.in_standby {
            return;
        }
        self.in_standby = false;
        self.display.write_cmd_burst(&[PANEL_ON]);
        self.model.render_req = true;
    }

    /// Frame and feed one raw command through the RX path, as the host
    /// would put it on the wire.
    pub fn feed_frame(&self, raw: &[u8]) {
        let mut stuffed = [0u8; MAX_FRAME_PAYLOAD];
        let n = match cobs::encode(raw, &mut stuffed) {
            Ok(n) => n,
            Err(_) => return,
        };
        for b in [SYNC0, SYNC1, n as u8] {
            self.rx.on_byte(b);
        }
        for &b in &stuffed[..n] {
            self.rx.on_byte(b);
        }
    }

    fn service_deferred(&mut self) {
        // inter-byte watchdog on partial frames
        let prog = self.rx.progress();
        if prog != self.rx_progress {
            self.rx_progress = prog;
            self.rx_last_change = self.now_ms;
        } else if self.rx.mid_frame()
            && self.now_ms.wrapping_sub(self.rx_last_change) >= RX_WATCHDOG_MS
        {
            log::debug!("rx watchdog, partial frame dropped");
            self.rx.drop_partial();
            self.rx_last_change = self.now_ms;
        }

        // a queued response goes out as soon as the DMA frees up
        if !self.tx_queue.is_empty() && !self.host.tx_busy() {
            if let Some(frame) = self.tx_queue.take() {
                self.host.start_tx(&frame);
            }
        }

        let mut stuffed = [0u8; MAX_FRAME_PAYLOAD];
        if let Some(n) = self.rx.take_frame(&mut stuffed) {
            match proto::service_frame(&mut self.model, self.now_ms, &stuffed[..n]) {
                Action::Reply(raw) => self.send_response(&raw),
                Action::Standby => self.standby_req = true,
                Action::Drop => {}
            }
        }
    }

    fn send_response(&mut self, raw: &[u8]) {
        let frame = proto::frame_response(raw);
        if !self.host.tx_busy() && self.host.start_tx(&frame) {
            return;
        }
        if self.tx_queue.put(frame).is_err() {
            // one-deep queue already holds a response
            log::warn!("tx queue full, response dropped");
        }
    }

    fn animate(&mut self) {
        input::slide_frame(&mut self.model);

        // list scroll ramps
        for id in 0..self.model.element_count() {
            if self.model.kind(id) != Some(api::ElementKind::List) {
                continue;
            }
            if !self.model.list_state_of(id).anim_active {
                continue;
            }
            self.model.update_list_state(id, |s| {
                s.anim_pix += LIST_ANIM_PIXELS_PER_FRAME;
                if s.anim_pix >= 8 {
                    s.top_index = s.pending_top;
                    s.cursor = s.pending_cursor;
                    s.anim_active = false;
                    s.anim_dir = 0;
                    s.anim_pix = 0;
                }
            });
            self.model.render_req = true;
        }

        // edit blink phase
        if self.model.editing_barrel().is_some() {
            let was = self.model.blink_bright();
            self.model.blink_frame = (self.model.blink_frame + 1) % EDIT_BLINK_PERIOD_FRAMES;
            if self.model.blink_bright() != was {
                self.model.render_req = true;
            }
        } else {
            self.model.blink_frame = 0;
        }

        // overlay countdown
        if self.model.overlay_active() {
            let remain = self.model.overlay.expires_at.wrapping_sub(self.now_ms) as i32;
            if remain <= 0 {
                self.model.focus = self.model.overlay.saved_focus;
                self.model.overlay = model::OverlayState::default();
                self.model.render_req = true;
            }
        }
    }

    fn poll_buttons(&mut self) {
        let mask = self.buttons.sample();
        let released = self.last_button_mask & !mask;
        self.last_button_mask = mask;
        if released == 0 {
            return;
        }
        for i in 0..6u8 {
            if released & (1 << i) != 0 {
                if let Some(btn) = Button::from_u8(i) {
                    input::on_button_release(&mut self.model, btn);
                }
            }
        }
    }

    fn handle_standby(&mut self) {
        if !self.standby_req {
            return;
        }
        // drain all transmit paths before cutting power
        if self.host.tx_busy() || !self.tx_queue.is_empty() || self.engine.busy() {
            return;
        }
        self.display.write_cmd_burst(&[PANEL_OFF]);
        self.in_standby = true;
        self.standby_req = false;
        log::info!("standby entered");
    }
}
