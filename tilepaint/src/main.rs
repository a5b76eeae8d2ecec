#![warn(clippy::pedantic)]

pub mod console;
pub mod functions;
pub mod global;

use tilepaint_core::state::Document;
use tilepaint_core::tools::{PointerEvent, ToolKind};
use tilepaint_core::util::Size;
use tilepaint_core::workspace::Workspace;

use anyhow::Result as AnyResult;

const DEFAULT_DIMENSION: u32 = 512;

/// Parse a `WIDTHxHEIGHT` argument.
fn parse_size(arg: &str) -> AnyResult<Size> {
    let (width, height) = arg
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow::anyhow!("expected WIDTHxHEIGHT, got {arg:?}"))?;
    Ok(Size::new(width.trim().parse()?, height.trim().parse()?))
}

/// Drag the pointer from `from` to `to` in a few steps.
fn drag(workspace: &mut Workspace, from: (i32, i32), to: (i32, i32)) -> AnyResult<()> {
    const STEPS: i32 = 8;
    workspace.pointer_down(PointerEvent::at(from.0, from.1))?;
    for step in 1..=STEPS {
        let x = from.0 + (to.0 - from.0) * step / STEPS;
        let y = from.1 + (to.1 - from.1) * step / STEPS;
        workspace.pointer_move(PointerEvent::at(x, y))?;
    }
    workspace.pointer_up(PointerEvent::at(to.0, to.1))?;
    Ok(())
}

fn log_history(workspace: &Workspace) {
    let history = workspace.history();
    log::info!(
        "History: undo [{}], redo [{}]",
        history.undo_names().collect::<Vec<_>>().join(", "),
        history.redo_names().collect::<Vec<_>>().join(", "),
    );
}

fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Debug);
    }

    let user_settings = global::settings::UserSettings::get();
    if user_settings.did_fail_to_load() {
        // Write out the defaults so there's a file to edit.
        if let Err(e) = user_settings.save() {
            log::warn!("Failed to save settings:\n{e:?}");
        }
    }
    let mut settings = user_settings.settings.clone();
    settings.default_tool.get_or_insert(ToolKind::Brush);

    // Args: optional document size, then optional cancellation deadline for long functions in
    // milliseconds.
    let mut args = std::env::args().skip(1);
    let size = args
        .next()
        .map(|arg| parse_size(&arg))
        .transpose()?
        .unwrap_or(Size::new(DEFAULT_DIMENSION, DEFAULT_DIMENSION));
    let deadline = args
        .next()
        .map(|arg| arg.parse().map(std::time::Duration::from_millis))
        .transpose()?;

    let mut workspace = Workspace::new(settings);
    let mut reporter = console::ConsoleReporter::default();
    workspace.set_document(Some(Document::with_layers(size, 2)?))?;
    workspace.pointer_enter()?;

    // Scripted session, exercising each tool and a function.
    drag(&mut workspace, (10, 10), (100, 60))?;
    workspace.set_tool(Some(ToolKind::Rectangle))?;
    drag(&mut workspace, (20, 20), (80, 90))?;
    workspace.set_tool(Some(ToolKind::Eraser))?;
    drag(&mut workspace, (0, 30), (120, 30))?;

    let outcome = workspace.perform_action(&mut functions::NewLayer { name: None }, &mut reporter)?;
    log::info!("New Layer: {outcome}");
    workspace.set_tool(Some(ToolKind::Brush))?;
    drag(&mut workspace, (5, 5), (5, 120))?;

    let mut progress = console::ConsoleProgress::new("Invert Colors", deadline);
    let outcome = workspace.execute_function(&mut functions::Invert, &mut progress, &mut reporter)?;
    log::info!("Invert Colors: {outcome}");
    log_history(&workspace);

    workspace.undo()?;
    workspace.undo()?;
    workspace.redo()?;
    log_history(&workspace);
    workspace.pointer_leave()?;

    // Swap in a fresh document, handing back the edited one.
    let edited = workspace.set_document(Some(Document::with_layers(size, 1)?))?;
    if let Some(edited) = edited {
        log::info!(
            "{} has {} layers, {}",
            edited.id(),
            edited.len(),
            if edited.dirty { "modified" } else { "unmodified" }
        );
    }
    if reporter.shown() > 0 {
        log::warn!("{} errors were reported during the session", reporter.shown());
    }
    Ok(())
}
