//! Replay a scenario through the hook installed in a simulated host.

use std::{
    io::Write,
    sync::{Arc, Weak},
};

use keybinds::{Handle, InputKeyParams, KeyHook, Keybinds};
use logging::Capture;
use tracing::{debug, info};

use crate::{
    error::Result,
    scenario::{BindingSpec, Scenario, Step},
    sim::{SimCallable, SimHost, SimRuntime},
};

/// Outcome counts for a replay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Key events delivered.
    pub events: usize,
    /// Events answered by the hook.
    pub handled: usize,
    /// Events that reached the host's own handler.
    pub forwarded: usize,
}

/// Register one binding, recording its handle where its callable can find it.
fn bind(kb: &Arc<Keybinds<SimRuntime>>, spec: &BindingSpec) -> Handle {
    let weak: Weak<_> = Arc::downgrade(kb);
    let (callable, slot) = SimCallable::new(spec.action.clone(), weak);
    let handle = kb.register(spec.key, spec.on, callable);
    // The slot is fresh, so this cannot fail.
    let _ignored = slot.set(handle);
    handle
}

/// Print captured warnings and errors under the line that caused them.
fn flush_logs(out: &mut impl Write, capture: &Capture) -> Result<()> {
    for log in capture.drain() {
        writeln!(out, "    ! {} {log}", log.level)?;
    }
    Ok(())
}

/// Run `scenario`, writing one line per step to `out`.
///
/// `capture` should be fed by the active subscriber; its warnings and errors
/// are interleaved with the output.
pub fn run(scenario: &Scenario, out: &mut impl Write, capture: &Capture) -> Result<Summary> {
    let signature = scenario.hook.pattern()?;
    let host = SimHost::new(
        &signature,
        scenario.host.signature_present,
        scenario.host.original_return,
    );
    host.set_in_menu(scenario.host.in_menu);

    let kb = Arc::new(Keybinds::new(SimRuntime::default(), host.menu_guard()));
    let hook = KeyHook::new(kb.clone(), scenario.hook.clone());
    match hook.install(&host, &host) {
        Ok(()) => writeln!(out, "hook {} -> {:?}", scenario.hook.name, hook.state())?,
        Err(e) => writeln!(out, "hook {} -> not installed ({e})", scenario.hook.name)?,
    }
    flush_logs(out, capture)?;

    for spec in &scenario.bindings {
        let handle = bind(&kb, spec);
        writeln!(out, "bind {} {} -> {handle}", spec.key, filter_label(spec))?;
    }

    let mut summary = Summary::default();
    for step in &scenario.steps {
        match step {
            Step::Key { key, kind } => {
                let before = host.handler_calls();
                let ret = host.input_key(&InputKeyParams::new(*key, *kind));
                summary.events += 1;
                if host.handler_calls() > before {
                    summary.forwarded += 1;
                    writeln!(out, "{key} {kind} -> forwarded({ret})")?;
                } else {
                    summary.handled += 1;
                    writeln!(out, "{key} {kind} -> handled")?;
                }
            }
            Step::Menu(on) => {
                host.set_in_menu(*on);
                writeln!(out, "menu {}", if *on { "open" } else { "closed" })?;
            }
            Step::Bind(spec) => {
                let handle = bind(&kb, spec);
                writeln!(out, "bind {} {} -> {handle}", spec.key, filter_label(spec))?;
            }
            Step::Unbind(raw) => {
                kb.deregister_raw(*raw);
                writeln!(out, "unbind {raw}")?;
            }
            Step::UnbindKey(key) => {
                kb.deregister_all_for_key(*key);
                writeln!(out, "unbind {key} *")?;
            }
            Step::UnbindAll => {
                kb.deregister_all();
                writeln!(out, "unbind *")?;
            }
        }
        flush_logs(out, capture)?;
    }

    debug!(bindings = kb.len(), calls = kb.runtime().calls(), "replay_finished");
    info!(
        events = summary.events,
        handled = summary.handled,
        forwarded = summary.forwarded,
        "replay_summary"
    );
    Ok(summary)
}

/// Event filter as printed in `bind` lines.
fn filter_label(spec: &BindingSpec) -> String {
    match spec.on {
        Some(kind) => kind.to_spec(),
        None => "*".to_string(),
    }
}
