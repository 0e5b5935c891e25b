// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fiber basics.
//!
//! Renders a small tree into an in-memory host with a wall-clock deadline, then renders a
//! changed tree and prints the host calls the second commit made.
//!
//! Run:
//! - `cargo run -p understory_demos --example fiber_basics`

use std::time::Duration;

use understory_fiber::adapters::memory::MemoryHost;
use understory_fiber::{Element, ElementError, Engine, InstantDeadline, WorkStatus};

fn app(heading: &str, with_footer: bool) -> Result<Element, ElementError> {
    let mut div = Element::builder("div")
        .prop("id", "foo")
        .child(Element::builder("h1").text(heading).build()?)
        .child(
            Element::builder("a")
                .text("This is a paragraph with a ")
                .child(Element::builder("span").text("span element").build()?)
                .build()?,
        );
    if with_footer {
        div = div.child(Element::builder("b").build()?);
    }
    div.build()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut host = MemoryHost::new();
    let container = host.create_container();
    let mut engine = Engine::new(host);

    engine.schedule_render(app("My own tree", true)?, container);
    let mut slots = 0;
    while engine.on_idle(&InstantDeadline::new(Duration::from_millis(16)))? != WorkStatus::Idle {
        slots += 1;
    }
    println!("== First render ({} extra slots) ==", slots);
    println!("  {}", engine.host().snapshot(container));

    engine.host_mut().clear_ops();
    engine.schedule_render(app("Updated heading", false)?, container);
    engine.run_work_unit(&InstantDeadline::new(Duration::from_millis(16)))?;
    let report = engine.commit()?;

    println!("== Second render ==");
    println!("  {}", engine.host().snapshot(container));
    println!(
        "  placements={} updates={} deletions={} patches={} edits={:?}",
        report.placements, report.updates, report.deletions, report.patches, report.edits
    );
    for op in engine.host().ops() {
        println!("  {:?}", op);
    }
    Ok(())
}
