//! Wire-level robustness: framing recovery, the inter-byte watchdog, local
//! button edges, and the host notify line.

use addon_proto::{Button, JsonFlags, Opcode, RetCode, EVENT_RELEASE};
use addon_ui::backend::hosted::{HostedButtons, HostedDisplay, HostedHostLink, HostedIrq};
use addon_ui::UiSlave;

type Slave = UiSlave<HostedDisplay, HostedHostLink, HostedButtons, HostedIrq>;

fn fresh() -> Slave {
    Slave::new(HostedDisplay::new(), HostedHostLink::new(), HostedButtons::new(), HostedIrq::new())
}

fn json(s: &mut Slave, flags: JsonFlags, body: &str) {
    let mut raw = vec![Opcode::Json as u8, flags.bits()];
    raw.extend_from_slice(body.as_bytes());
    s.feed_frame(&raw);
    s.run_ms(2);
}

fn trigger_world(s: &mut Slave) {
    json(s, JsonFlags::HEAD, r#"{"t":"h","n":2}"#);
    json(s, JsonFlags::empty(), r#"{"t":"s"}"#);
    json(s, JsonFlags::COMMIT, r#"{"t":"i","p":0,"x":0,"y":0}"#);
    s.run_ms(50);
    s.host.sent.clear();
}

#[test]
fn noise_before_sync_is_ignored() {
    let mut s = fresh();
    for b in [0x00, 0xA5, 0x13, 0xFF, 0x5A] {
        s.rx.on_byte(b);
    }
    // a clean ping still gets through afterwards
    s.feed_frame(&[Opcode::Ping as u8]);
    s.run_ms(2);
    assert_eq!(s.host.sent.len(), 1);
}

#[test]
fn watchdog_abandons_stalled_partials() {
    let mut s = fresh();
    // sync + length, then silence
    for b in [0xA5, 0x5A, 0x05, 0x01] {
        s.rx.on_byte(b);
    }
    s.run_ms(250);
    // the partial is gone; a fresh ping is parsed from a clean slate
    s.feed_frame(&[Opcode::Ping as u8]);
    s.run_ms(2);
    assert_eq!(s.host.sent.len(), 1);
    assert_eq!(s.host.sent[0][3..], [0x05, 0x00, 0x01, 0x00, 0x00]);
}

#[test]
fn unserviced_traffic_is_dropped_as_overrun() {
    let mut s = fresh();
    // complete ping frame, not yet serviced...
    for b in [0xA5, 0x5A, 0x02, 0x02, 0x00] {
        s.rx.on_byte(b);
    }
    // ...and more bytes pile on before the main loop runs
    s.rx.on_byte(0xA5);
    s.run_ms(2);
    assert!(s.host.sent.is_empty());
    // recovery: the next full frame is handled
    s.feed_frame(&[Opcode::Ping as u8]);
    s.run_ms(2);
    assert_eq!(s.host.sent.len(), 1);
}

#[test]
fn hardware_overrun_resets_framing() {
    let mut s = fresh();
    for b in [0xA5, 0x5A, 0x04] {
        s.rx.on_byte(b);
    }
    s.rx.note_overrun();
    s.run_ms(2);
    s.feed_frame(&[Opcode::Ping as u8]);
    s.run_ms(2);
    assert_eq!(s.host.sent.len(), 1);
}

#[test]
fn local_buttons_act_on_release_edges() {
    let mut s = fresh();
    trigger_world(&mut s);
    assert_eq!(s.model.focus, 1);

    s.buttons.mask = 1 << Button::Ok as u8;
    s.run_ms(5); // held: nothing happens
    assert_eq!(s.model.trigger_state_of(1).version, 0);

    s.buttons.mask = 0;
    s.run_ms(5); // release edge fires
    assert_eq!(s.model.trigger_state_of(1).version, 1);

    // a press with no release yet does nothing more
    s.buttons.mask = 1 << Button::Ok as u8;
    s.run_ms(5);
    assert_eq!(s.model.trigger_state_of(1).version, 1);
}

#[test]
fn notify_line_follows_dirty_state() {
    let mut s = fresh();
    trigger_world(&mut s);

    assert!(!s.irq.level);
    s.feed_frame(&[Opcode::InputEvent as u8, Button::Ok as u8, EVENT_RELEASE]);
    s.run_ms(2);
    assert!(s.irq.level);
    assert_eq!(s.irq.rises, 1);

    s.feed_frame(&[Opcode::GetStatus as u8]);
    s.run_ms(2);
    assert!(!s.irq.level);

    // another change raises it again
    s.feed_frame(&[Opcode::InputEvent as u8, Button::Ok as u8, EVENT_RELEASE]);
    s.run_ms(2);
    assert!(s.irq.level);
    assert_eq!(s.irq.rises, 2);
}

#[test]
fn json_abort_is_an_accepted_no_op() {
    let mut s = fresh();
    trigger_world(&mut s);
    s.feed_frame(&[Opcode::JsonAbort as u8]);
    s.run_ms(2);
    assert_eq!(s.host.sent.len(), 1);
    let frame = &s.host.sent[0];
    assert_eq!(frame[3..], [0x02, RetCode::Ok as u8]);
    // state untouched
    assert_eq!(s.model.element_count(), 2);
    assert!(s.model.initialized);
}

#[test]
fn wrong_payload_sizes_answer_bad_len() {
    let mut s = fresh();
    trigger_world(&mut s);
    for raw in [
        vec![Opcode::SetActiveScreen as u8],
        vec![Opcode::SetActiveScreen as u8, 0, 0],
        vec![Opcode::GetElementState as u8],
        vec![Opcode::InputEvent as u8, 2],
        vec![Opcode::ShowOverlay as u8, 0, 0],
        vec![Opcode::Json as u8],
    ] {
        s.host.sent.clear();
        s.feed_frame(&raw);
        s.run_ms(2);
        assert_eq!(s.host.sent.len(), 1, "no reply for {:?}", raw);
        assert_eq!(s.host.sent[0][4], RetCode::BadLen as u8, "cmd {:?}", raw);
    }
}

#[test]
fn head_reset_wipes_everything() {
    let mut s = fresh();
    trigger_world(&mut s);
    s.feed_frame(&[Opcode::InputEvent as u8, Button::Ok as u8, EVENT_RELEASE]);
    s.run_ms(2);
    assert!(s.model.dirty);

    json(&mut s, JsonFlags::HEAD, r#"{"t":"h","n":4}"#);
    assert_eq!(s.model.element_count(), 0);
    assert!(!s.model.initialized);
    assert!(!s.model.dirty);
    assert_eq!(s.model.focus, addon_ui::api::NO_ELEMENT);
    // the fresh world provisions cleanly
    json(&mut s, JsonFlags::empty(), r#"{"t":"s"}"#);
    json(&mut s, JsonFlags::COMMIT, r#"{"t":"t","p":0,"x":0,"y":0,"tx":"new"}"#);
    assert_eq!(s.model.element_count(), 2);
    assert!(s.model.initialized);
}
