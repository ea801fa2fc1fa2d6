//! Debugger application state and logic.

use crate::{Machine, MachineConfig};
use std::collections::{BTreeSet, VecDeque};

/// How many OUT values the history panel keeps.
const OUT_HISTORY: usize = 64;

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub machine: Machine,
    /// Layout the machine was created with.
    pub config: MachineConfig,
    /// Original program for reset.
    pub program: Vec<u8>,
    /// Breakpoints (by address).
    pub breakpoints: BTreeSet<u8>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset, in 16-byte rows.
    pub mem_scroll: usize,
    /// Values latched into OUT, newest last.
    pub out_history: VecDeque<u8>,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(config: MachineConfig, program: Vec<u8>) -> Result<Self, crate::MachineError> {
        let machine = Machine::with_program(&config, &program)?;

        Ok(Self {
            machine,
            config,
            program,
            breakpoints: BTreeSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
            out_history: VecDeque::new(),
        })
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        let pc = self.machine.regs.pc;

        match self.machine.step() {
            Ok(instr) => {
                self.status = format!("PC={:02x}: {}", pc, instr);
                if instr == crate::Instruction::Out {
                    self.record_out(self.machine.output());
                }
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    fn record_out(&mut self, value: u8) {
        if self.out_history.len() == OUT_HISTORY {
            self.out_history.pop_front();
        }
        self.out_history.push_back(value);
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if self.machine.is_halted() {
            self.running = false;
            self.status = format!("Halted after {} cycles", self.machine.cycles);
            return;
        }

        self.step();

        // Check for breakpoint on the instruction about to run
        let pc = self.machine.regs.pc;
        if self.running && self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={:02x}", pc);
        }
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.machine.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:02x}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:02x}", pc);
        }
    }

    /// Reset the machine and reload the program.
    pub fn reset(&mut self) {
        match Machine::with_program(&self.config, &self.program) {
            Ok(machine) => {
                self.machine = machine;
                self.status = "Reset. Ready.".into();
            }
            Err(e) => self.status = format!("Error: {}", e),
        }
        self.out_history.clear();
        self.running = false;
    }

    /// Number of 16-byte rows in the memory view.
    pub fn memory_rows(&self) -> usize {
        self.machine.mem.len().div_ceil(16)
    }

    /// Scroll the memory grid up one row.
    pub fn scroll_up(&mut self) {
        self.mem_scroll = self.mem_scroll.saturating_sub(1);
    }

    /// Scroll the memory grid down one row.
    pub fn scroll_down(&mut self) {
        if self.mem_scroll + 1 < self.memory_rows() {
            self.mem_scroll += 1;
        }
    }
}

/// Run the debugger with a program.
pub fn run_debugger(config: MachineConfig, program: Vec<u8>) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Create app before touching the terminal so a bad config is reported plainly
    let mut app = DebuggerApp::new(config, program)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        // Handle input
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_up(),
                        KeyCode::Down => app.scroll_down(),
                        _ => {}
                    }
                }
            }
        }

        // Tick for continuous running
        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
