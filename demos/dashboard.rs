//! Dashboard Example - three panels on a live terminal
//!
//! Demonstrates:
//! - Tab / click focus
//! - Typing into the focused panel
//! - Arrow keys moving the focused panel (region change -> redraw)
//! - Terminal resize
//!
//! Run with: cargo run --example dashboard
//! Quit with Ctrl+C. Set RUST_LOG=debug and redirect stderr to see the log.

use std::sync::Arc;
use std::sync::mpsc;

use tessera::state::input::{InputSource, InputThread};
use tessera::state::keyboard::Key;
use tessera::symbols::Panel;
use tessera::{Coord, LayoutManager, Rect, Rgba, Symbol, TerminalConfig, TerminalSink};

fn main() -> tessera::Result<()> {
    env_logger::init();

    let config = TerminalConfig::default();
    let mut sink = TerminalSink::stdout(config.clone())?;
    sink.enter()?;
    let (width, height) = (sink.width() as i16, sink.height() as i16);
    let manager = LayoutManager::new(sink);

    let background = Arc::new(
        Panel::new("background", Rect::new(0, 0, width - 1, height - 1))
            .with_title("tessera - Tab cycles focus, arrows move, Ctrl+C quits")
            .with_colors(Rgba::GRAY, Rgba::BLACK)
            .focusable(false),
    );
    let cpu = Arc::new(
        Panel::new("cpu", Rect::from_size(Coord::new(2, 2), 24, 6))
            .with_title("cpu")
            .with_colors(Rgba::WHITE, Rgba::BLUE),
    );
    let memory = Arc::new(
        Panel::new("memory", Rect::from_size(Coord::new(14, 5), 24, 6))
            .with_title("memory")
            .with_colors(Rgba::BLACK, Rgba::GREEN)
            .with_focus_background(Rgba::YELLOW),
    );

    {
        let _buffer = manager.begin_buffer();
        manager.add(background.clone())?;
        manager.add(cpu.clone())?;
        manager.add(memory.clone())?;
        manager.set_active(true);
    }

    let source = Arc::new(InputSource::new());
    manager.attach(&source);

    // Arrow keys nudge whichever panel has focus.
    {
        let manager = manager.clone();
        source.key_pressed().subscribe_fn(move |event| {
            let delta = match event.key {
                Key::Up => Coord::new(0, -1),
                Key::Down => Coord::new(0, 1),
                Key::Left => Coord::new(-1, 0),
                Key::Right => Coord::new(1, 0),
                _ => return,
            };
            if let Some(focused) = manager.focused() {
                focused.region().translate(delta);
            }
        });
    }

    {
        let manager = manager.clone();
        let background = background.clone();
        source.resized().subscribe_fn(move |&(w, h)| {
            let _buffer = manager.begin_buffer();
            manager.with_sink(|sink| sink.resize(w, h));
            background
                .region()
                .set_bottom_right(Coord::new(w as i16 - 1, h as i16 - 1));
            manager.draw();
        });
    }

    let (exit_tx, exit_rx) = mpsc::channel();
    source.exit_accepted().subscribe_fn(move |_| {
        let _ = exit_tx.send(());
    });

    let mut input = InputThread::spawn(Arc::clone(&source), &config)?;
    let _ = exit_rx.recv();

    input.shutdown()?;
    manager.dispose()?;
    manager.with_sink(|sink| sink.leave())?;
    Ok(())
}
