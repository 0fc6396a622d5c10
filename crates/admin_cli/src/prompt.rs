//! Hidden password entry on the controlling terminal.

use std::{
    error::Error,
    io::{Stderr, Write},
};

use crossterm::{
    QueueableCommand, cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    style::Print,
    terminal,
};

type PromptResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

const ATTEMPTS: usize = 3;

/// What a key press does to the line being typed.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Push(char),
    Pop,
    Submit,
    Abort,
    Ignore,
}

fn step(key: &KeyEvent) -> Step {
    if key.kind == KeyEventKind::Release {
        return Step::Ignore;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => Step::Submit,
        KeyCode::Esc => Step::Abort,
        KeyCode::Char('c' | 'd') if ctrl => Step::Abort,
        KeyCode::Backspace => Step::Pop,
        KeyCode::Char(ch) if !ctrl => Step::Push(ch),
        _ => Step::Ignore,
    }
}

/// Leaves raw mode on every exit path.
struct RawMode;

impl RawMode {
    fn enable() -> PromptResult<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn say(out: &mut Stderr, text: &str) -> PromptResult<()> {
    out.queue(Print(text))?;
    out.flush()?;
    Ok(())
}

/// Reads one line without echoing it; every character shows as `*`.
fn read_hidden(label: &str) -> PromptResult<String> {
    let _raw = RawMode::enable()?;
    let mut out = std::io::stderr();
    say(&mut out, label)?;

    let mut line = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        match step(&key) {
            Step::Push(ch) => {
                line.push(ch);
                say(&mut out, "*")?;
            }
            Step::Pop => {
                if line.pop().is_some() {
                    out.queue(cursor::MoveLeft(1))?;
                    say(&mut out, " ")?;
                    out.queue(cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            Step::Submit => {
                say(&mut out, "\r\n")?;
                return Ok(line);
            }
            Step::Abort => {
                say(&mut out, "\r\n")?;
                return Err("password entry cancelled".into());
            }
            Step::Ignore => {}
        }
    }
}

/// Asks for a new password and its confirmation.
pub fn new_password() -> PromptResult<String> {
    for _ in 0..ATTEMPTS {
        let password = read_hidden("New password: ")?;
        if password.is_empty() {
            eprintln!("The password cannot be empty.");
            continue;
        }
        if read_hidden("Repeat password: ")? == password {
            return Ok(password);
        }
        eprintln!("The passwords differ.");
    }
    Err(format!("no matching password after {ATTEMPTS} attempts").into())
}
