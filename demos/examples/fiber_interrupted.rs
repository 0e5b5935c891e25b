// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interrupted rendering.
//!
//! Drives a render three units of work at a time, showing that the host tree stays empty until
//! the single commit at the end. Then replaces a click handler and fires the event to show that
//! only the new handler is live.
//!
//! Run:
//! - `cargo run -p understory_demos --example fiber_interrupted`

use std::cell::Cell;
use std::rc::Rc;

use understory_fiber::adapters::memory::{HostNodeId, MemoryHost};
use understory_fiber::{Element, Engine, Handler, StepBudget, WorkStatus};

fn counter(label: &str, on_click: &Handler) -> Element {
    Element::builder("section")
        .child(
            Element::builder("button")
                .prop("onClick", on_click.clone())
                .text(label)
                .build()
                .unwrap(),
        )
        .children((1..=3).map(|i| format!("line {i}")))
        .build()
        .unwrap()
}

fn drive(engine: &mut Engine<MemoryHost>, container: HostNodeId) {
    let mut slot = 0;
    loop {
        let next = engine.next_unit_of_work();
        let status = engine.on_idle(&StepBudget::new(3)).unwrap();
        slot += 1;
        println!(
            "  slot {slot}: started at {:?}, status {:?}, attached children {}",
            next,
            status,
            engine.host().children(container).len()
        );
        if status == WorkStatus::Idle {
            break;
        }
    }
}

fn main() {
    let mut host = MemoryHost::new();
    let container = host.create_container();
    let mut engine = Engine::new(host);

    let clicks = Rc::new(Cell::new(0_u32));
    let first = {
        let clicks = Rc::clone(&clicks);
        Handler::new(move |_| clicks.set(clicks.get() + 1))
    };
    let second = {
        let clicks = Rc::clone(&clicks);
        Handler::new(move |_| clicks.set(clicks.get() + 100))
    };

    println!("== First render ==");
    engine.schedule_render(counter("+1", &first), container);
    drive(&mut engine, container);
    println!("  {}", engine.host().snapshot(container));

    let section = engine.host().children(container)[0];
    let button = engine.host().children(section)[0];
    engine.host().dispatch(button, "click", &());
    println!("  clicks after one press: {}", clicks.get());

    println!("== Handler swap ==");
    engine.host_mut().clear_ops();
    engine.schedule_render(counter("+100", &second), container);
    drive(&mut engine, container);
    for op in engine.host().ops() {
        println!("  {:?}", op);
    }
    engine.host().dispatch(button, "click", &());
    println!("  clicks after second press: {}", clicks.get());
}
