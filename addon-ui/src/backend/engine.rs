//! The cooperative page transfer engine.
//!
//! One frame is the panel's pages streamed in order; each page goes through
//! address setup, a tile build into the shared buffer, and a chunked DMA
//! stream. `advance` performs at most one stage transition per call and
//! backs off whenever the bus is still draining, so the main loop stays
//! responsive at any bus speed.
//!
//! Rerender requests arriving mid-frame collapse into a single flag; when
//! the last page lands the engine restarts at page zero with whatever state
//! the model holds by then. At most one extra frame ever results.

use pageblit::PageBuf;

use super::DisplayLink;
use crate::api::{UiError, UiResult};
use crate::config::PANEL_PAGES;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Stage {
    Idle,
    Addr,
    Build,
    StreamStart,
    Streaming,
}

pub struct PageEngine {
    stage: Stage,
    page: u8,
    rerender: bool,
    buf: PageBuf,
}

impl PageEngine {
    pub const fn new() -> PageEngine {
        PageEngine { stage: Stage::Idle, page: 0, rerender: false, buf: [0; 128] }
    }

    /// Start a frame; the engine must be idle.
    pub fn begin(&mut self) -> UiResult<()> {
        if self.stage != Stage::Idle {
            return Err(UiError::BadState);
        }
        self.page = 0;
        self.rerender = false;
        self.stage = Stage::Addr;
        Ok(())
    }

    /// Note that the frame being streamed is already stale.
    pub fn request_rerender(&mut self) {
        if self.stage != Stage::Idle {
            self.rerender = true;
        }
    }

    /// Start if idle, otherwise coalesce into the pending rerender.
    pub fn start_or_request(&mut self) {
        if self.begin().is_err() {
            self.rerender = true;
        }
    }

    pub fn busy(&self) -> bool { self.stage != Stage::Idle }

    pub fn dma_xfer_active<L: DisplayLink>(&self, link: &L) -> bool { link.tx_busy() }

    /// Drive one stage. `render` fills the shared buffer for a page and is
    /// only invoked during the build stage.
    pub fn advance<L: DisplayLink>(&mut self, link: &mut L, render: impl FnOnce(u8, &mut PageBuf)) {
        match self.stage {
            Stage::Idle => {}
            Stage::Addr => {
                if link.tx_busy() {
                    return;
                }
                // full column range, single page window
                let p = self.page;
                link.write_cmd_burst(&[0x21, 0, 127, 0x22, p, p]);
                self.stage = Stage::Build;
            }
            Stage::Build => {
                self.buf.iter_mut().for_each(|b| *b = 0);
                render(self.page, &mut self.buf);
                self.stage = Stage::StreamStart;
            }
            Stage::StreamStart => {
                if link.tx_busy() {
                    return;
                }
                link.write_data_burst(&self.buf);
                self.stage = Stage::Streaming;
            }
            Stage::Streaming => {
                if link.tx_busy() {
                    return;
                }
                self.page += 1;
                if self.page < PANEL_PAGES {
                    self.stage = Stage::Addr;
                } else if self.rerender {
                    log::trace!("frame restart, coalesced rerender");
                    self.rerender = false;
                    self.page = 0;
                    self.stage = Stage::Addr;
                } else {
                    self.stage = Stage::Idle;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::hosted::HostedDisplay;
    use crate::config::PANEL_PAGES;

    fn run_to_idle(e: &mut PageEngine, link: &mut HostedDisplay, frames: &mut u32) {
        let mut guard = 10_000;
        let mut page0_builds = 0;
        while e.busy() && guard > 0 {
            e.advance(link, |page, buf| {
                if page == 0 {
                    page0_builds += 1;
                }
                buf[0] = page + 1;
            });
            guard -= 1;
        }
        assert!(guard > 0, "engine wedged");
        *frames = page0_builds;
    }

    #[test]
    fn one_frame_streams_every_page() {
        let mut link = HostedDisplay::new();
        let mut e = PageEngine::new();
        e.begin().unwrap();
        assert!(e.busy());
        let mut frames = 0;
        run_to_idle(&mut e, &mut link, &mut frames);
        assert_eq!(frames, 1);
        assert_eq!(link.data_bursts(), PANEL_PAGES as usize);
        // each page got its own address window
        assert_eq!(link.cmd_bursts(), PANEL_PAGES as usize);
        for p in 0..PANEL_PAGES {
            assert_eq!(link.panel_byte(p, 0), p + 1);
        }
    }

    #[test]
    fn begin_while_busy_is_a_state_error() {
        let mut e = PageEngine::new();
        e.begin().unwrap();
        assert_eq!(e.begin(), Err(UiError::BadState));
    }

    #[test]
    fn rerender_requests_coalesce_to_one_extra_frame() {
        let mut link = HostedDisplay::new();
        let mut e = PageEngine::new();
        e.begin().unwrap();
        // pile up requests while the first frame is in flight
        e.request_rerender();
        e.start_or_request();
        e.request_rerender();
        let mut frames = 0;
        run_to_idle(&mut e, &mut link, &mut frames);
        assert_eq!(frames, 2);
    }

    #[test]
    fn rerender_after_idle_does_nothing() {
        let mut e = PageEngine::new();
        e.request_rerender();
        assert!(!e.busy());
        let mut link = HostedDisplay::new();
        e.advance(&mut link, |_, _| panic!("no build while idle"));
    }

    #[test]
    fn engine_backs_off_while_bus_busy() {
        let mut link = HostedDisplay::new();
        link.set_burst_latency(3);
        let mut e = PageEngine::new();
        e.begin().unwrap();
        // addr stage issues one burst, then the stream start must wait
        e.advance(&mut link, |_, _| {});
        e.advance(&mut link, |_, buf| buf[5] = 0xAA);
        let before = link.data_bursts();
        e.advance(&mut link, |_, _| {}); // stream-start blocked by latency
        assert_eq!(link.data_bursts(), before);
        while link.tx_busy() {}
        e.advance(&mut link, |_, _| {});
        assert_eq!(link.data_bursts(), before + 1);
    }
}
