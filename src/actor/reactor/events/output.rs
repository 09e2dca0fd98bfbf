use std::time::Instant;

use tracing::{debug, trace};

use crate::actor::reactor::{Reactor, Request};
use crate::model::output::{OutputId, OutputInfo};
use crate::sys::geometry::Rect;

pub struct OutputEventHandler;

impl OutputEventHandler {
    pub fn handle_new_output(reactor: &mut Reactor, info: OutputInfo) -> OutputId {
        reactor.create_output(info)
    }

    pub fn handle_output_destroyed(reactor: &mut Reactor, output: OutputId) {
        reactor.destroy_output(output);
    }

    pub fn handle_output_layout_changed(reactor: &mut Reactor, boxes: Vec<(OutputId, Rect)>) {
        for (output, layout_box) in boxes {
            if reactor.output_manager.is_fallback(output) {
                continue;
            }
            reactor.set_layout_box(output, layout_box);
        }
        reactor.update_outputs_state();
    }

    pub fn handle_usable_area_changed(reactor: &mut Reactor, output: OutputId, area: Rect) {
        reactor.set_usable_area(output, area);
    }

    pub fn handle_frame(reactor: &mut Reactor, output: OutputId, needs_frame: bool, now: Instant) {
        match reactor.frame(output, needs_frame, now) {
            Ok(true) => reactor.send(Request::Present { output }),
            Ok(false) => trace!(?output, needs_frame, "frame held back"),
            Err(err) => debug!(?output, %err, "Received Frame for unknown output - ignoring"),
        }
    }
}
