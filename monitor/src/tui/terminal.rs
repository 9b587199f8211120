//! Inline terminal setup and RAII restoration.
//!
//! The bar lives in an inline viewport at the bottom of the shell rather
//! than in an alternate screen, so log lines and earlier output stay visible
//! above it. [`InlineTui`] hides the cursor on creation and restores it on
//! drop.
//!
//! # Cleanup Behavior
//!
//! The cursor is restored in three scenarios:
//!
//! 1. **Normal drop**: When [`InlineTui`] goes out of scope
//! 2. **Explicit restore**: By calling [`InlineTui::restore()`]
//! 3. **Panic hook**: Via [`install_panic_hook()`]
//!
//! The [`Drop`] implementation ignores errors during cleanup to avoid
//! panicking while unwinding.

use std::io::{self, Stdout};
use std::panic;

use crossterm::{
    cursor::{Hide, Show},
    execute,
};
use ratatui::{backend::CrosstermBackend, Terminal, TerminalOptions, Viewport};

/// Installs a panic hook that shows the cursor before the panic message.
///
/// Call once at startup, before creating an [`InlineTui`].
pub fn install_panic_hook() {
    let previous_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        // Best effort: the terminal may be in a bad state.
        let _ = execute!(io::stdout(), Show);
        previous_hook(panic_info);
    }));
}

/// A ratatui terminal drawing into an inline viewport of fixed height.
pub struct InlineTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Set once the cursor has been restored, to avoid double cleanup.
    restored: bool,
}

impl std::fmt::Debug for InlineTui {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineTui")
            .field("restored", &self.restored)
            .finish_non_exhaustive()
    }
}

impl InlineTui {
    /// Reserves `height` rows below the cursor and hides the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be initialized.
    pub fn new(height: u16) -> io::Result<Self> {
        let mut stdout = io::stdout();
        execute!(stdout, Hide)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = match Terminal::with_options(
            backend,
            TerminalOptions {
                viewport: Viewport::Inline(height),
            },
        ) {
            Ok(t) => t,
            Err(e) => {
                let _ = execute!(io::stdout(), Show);
                return Err(e);
            }
        };

        Ok(Self {
            terminal,
            restored: false,
        })
    }

    /// Draws a frame into the inline viewport.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn draw<F>(&mut self, f: F) -> io::Result<()>
    where
        F: FnOnce(&mut ratatui::Frame),
    {
        self.terminal.draw(f)?;
        Ok(())
    }

    /// Shows the cursor again and moves below the viewport.
    ///
    /// Later draws are not supported. The [`Drop`] implementation skips
    /// cleanup if this has been called.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the terminal fails.
    pub fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;

        execute!(io::stdout(), Show)?;
        println!();
        Ok(())
    }
}

impl Drop for InlineTui {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        let _ = execute!(io::stdout(), Show);
    }
}
