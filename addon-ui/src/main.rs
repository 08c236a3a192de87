//! Hosted demo: provision a small UI over the loopback wire path, poke at
//! it with button events, and print the virtual panel.
//!
//! This drives the exact firmware tick against the capture backends, so
//! what it prints is what the OLED would show.

use addon_proto::{Button, JsonFlags, Opcode, EVENT_RELEASE};
use addon_ui::backend::hosted::{HostedButtons, HostedDisplay, HostedHostLink, HostedIrq};
use addon_ui::UiSlave;

type Slave = UiSlave<HostedDisplay, HostedHostLink, HostedButtons, HostedIrq>;

fn json(slave: &mut Slave, flags: JsonFlags, body: &str) {
    let mut raw = vec![Opcode::Json as u8, flags.bits()];
    raw.extend_from_slice(body.as_bytes());
    slave.feed_frame(&raw);
    slave.run_ms(2);
}

fn press(slave: &mut Slave, btn: Button) {
    slave.feed_frame(&[Opcode::InputEvent as u8, btn as u8, EVENT_RELEASE]);
    // let the event land and the animations play out
    slave.run_ms(300);
}

fn main() {
    env_logger::init();
    let mut slave = Slave::new(
        HostedDisplay::new(),
        HostedHostLink::new(),
        HostedButtons::new(),
        HostedIrq::new(),
    );

    json(&mut slave, JsonFlags::HEAD, r#"{"t":"h","n":12}"#);
    json(&mut slave, JsonFlags::empty(), r#"{"t":"s"}"#);
    json(&mut slave, JsonFlags::empty(), r#"{"t":"l","p":0,"x":10,"y":0,"r":3}"#);
    json(&mut slave, JsonFlags::empty(), r#"{"t":"t","p":1,"x":10,"tx":"volume"}"#);
    json(&mut slave, JsonFlags::empty(), r#"{"t":"b","p":1,"x":60,"y":0}"#);
    json(&mut slave, JsonFlags::empty(), r#"{"t":"t","p":3,"x":0,"y":0,"tx":"low"}"#);
    json(&mut slave, JsonFlags::empty(), r#"{"t":"t","p":3,"x":0,"y":0,"tx":"high"}"#);
    json(&mut slave, JsonFlags::empty(), r#"{"t":"t","p":1,"x":10,"tx":"input"}"#);
    json(&mut slave, JsonFlags::empty(), r#"{"t":"t","p":1,"x":10,"tx":"reset"}"#);
    json(&mut slave, JsonFlags::empty(), r#"{"t":"t","p":1,"x":10,"tx":"about"}"#);
    json(&mut slave, JsonFlags::COMMIT, r#"{"t":"s"}"#);

    slave.run_ms(100);
    println!("after provisioning:\n{}", slave.display.ascii());

    press(&mut slave, Button::Down);
    press(&mut slave, Button::Down);
    press(&mut slave, Button::Down);
    println!("after three cursor moves:\n{}", slave.display.ascii());

    press(&mut slave, Button::Right);
    println!("after sliding to screen 1:\n{}", slave.display.ascii());
}
