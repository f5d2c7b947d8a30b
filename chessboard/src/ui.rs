//! Terminal play screen: board, game info and a command prompt.

use std::io;
use std::time::Duration;

use chess::{format_square, PieceColor, PieceKind};
use cozy_chess::Square;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use session::{SessionError, SessionEvent, SessionHandle, SessionSnapshot};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::input::{parse_input, parse_promotion, Input, HELP};
use crate::view;

struct App {
    session: SessionHandle,
    events: broadcast::Receiver<SessionEvent>,
    snapshot: SessionSnapshot,
    status: Option<String>,
    input: String,
    flipped: bool,
    /// Move waiting for a promotion piece.
    pending_promotion: Option<(Square, Square)>,
    quit: bool,
}

pub async fn run_play(session: SessionHandle) -> anyhow::Result<()> {
    let (snapshot, events) = session.subscribe().await?;
    let mut app = App {
        flipped: view::default_flip(snapshot.mode),
        session,
        events,
        snapshot,
        status: None,
        input: String::new(),
        pending_promotion: None,
        quit: false,
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_ui_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_ui_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    while !app.quit {
        app.drain_events();
        terminal.draw(|f| draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Esc => break,
                    KeyCode::Char(c) => app.input.push(c),
                    KeyCode::Backspace => {
                        app.input.pop();
                    }
                    KeyCode::Enter => {
                        let line = std::mem::take(&mut app.input);
                        if !line.trim().is_empty() {
                            app.handle_line(&line).await;
                        }
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

impl App {
    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::StateChanged(snapshot)) => self.snapshot = snapshot,
                Ok(SessionEvent::Analysis(update)) => {
                    if update.ply == self.snapshot.move_count {
                        self.snapshot.analysis = Some(update);
                    }
                }
                Ok(SessionEvent::Error(message)) => self.status = Some(message),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "UI lagged behind session events");
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => {
                    self.status = Some("Session closed".to_string());
                    self.quit = true;
                    break;
                }
            }
        }
    }

    async fn handle_line(&mut self, line: &str) {
        if let Some((from, to)) = self.pending_promotion.take() {
            match parse_promotion(line) {
                Ok(piece) => self.submit(from, to, Some(piece)).await,
                Err(e) => {
                    self.status = Some(format!("{} (q, r, b or n)", e));
                    self.pending_promotion = Some((from, to));
                }
            }
            return;
        }

        let input = match parse_input(line) {
            Ok(input) => input,
            Err(e) => {
                self.status = Some(e.to_string());
                return;
            }
        };

        tracing::debug!(?input, "Prompt command");
        match input {
            Input::Move {
                from,
                to,
                promotion,
            } => self.submit(from, to, promotion).await,
            Input::Undo => {
                let result = self.session.undo().await;
                self.apply(result, "Undone");
            }
            Input::NewGame => {
                let result = self.session.new_game(None).await;
                self.apply_new(result, "New game");
            }
            Input::ToggleAnalysis => {
                let enabled = !self.snapshot.analysis_on;
                let result = self.session.set_analysis(enabled).await;
                let message = if !enabled {
                    "Analysis off"
                } else if self.snapshot.engine_available {
                    "Analysis on"
                } else {
                    "Analysis on (no engine running)"
                };
                self.apply(result, message);
            }
            Input::Flip => self.flipped = !self.flipped,
            Input::Put(piece) => {
                self.edit(piece.square, Some((piece.kind, piece.color)))
                    .await
            }
            Input::Clear(square) => self.edit(square, None).await,
            Input::LoadFen(fen) => {
                let result = self.session.load_fen(fen).await;
                self.apply_new(result, "Position loaded");
            }
            Input::LoadPgn(path) => match std::fs::read_to_string(&path) {
                Ok(pgn) => {
                    let result = self.session.load_pgn(pgn).await;
                    self.apply_new(result, "Game loaded");
                }
                Err(e) => self.status = Some(format!("Cannot read {}: {}", path.display(), e)),
            },
            Input::SavePgn(path) => {
                self.status = Some(match self.session.export_pgn().await {
                    Ok(pgn) => match std::fs::write(&path, pgn) {
                        Ok(()) => format!("Saved to {}", path.display()),
                        Err(e) => format!("Cannot write {}: {}", path.display(), e),
                    },
                    Err(e) => e.to_string(),
                });
            }
            Input::Quit => self.quit = true,
        }
    }

    /// Board editor: rewrite one square of the current position and load it.
    async fn edit(&mut self, square: Square, piece: Option<(PieceKind, PieceColor)>) {
        match chess::edit_square(&self.snapshot.fen, square, piece) {
            Ok(fen) => {
                let result = self.session.load_fen(fen).await;
                self.apply_new(result, "Position edited");
            }
            Err(e) => self.status = Some(format!("Cannot edit {}: {}", format_square(square), e)),
        }
    }

    async fn submit(&mut self, from: Square, to: Square, promotion: Option<PieceKind>) {
        match self.session.submit_move(from, to, promotion).await {
            Err(SessionError::PromotionRequired) => {
                self.pending_promotion = Some((from, to));
                self.status = Some("Promote to? (q, r, b or n)".to_string());
            }
            result => self.apply(result, ""),
        }
    }

    fn apply(&mut self, result: Result<SessionSnapshot, SessionError>, message: &str) {
        match result {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                self.status = (!message.is_empty()).then(|| message.to_string());
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    /// Like [`apply`](Self::apply), re-orienting the board for the new game.
    fn apply_new(&mut self, result: Result<SessionSnapshot, SessionError>, message: &str) {
        if let Ok(snapshot) = &result {
            self.flipped = view::default_flip(snapshot.mode);
        }
        self.apply(result, message);
    }
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(f.area());

    let title = Paragraph::new("Chessboard")
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(20)])
        .split(chunks[1]);

    let board = Paragraph::new(board_lines(&app.snapshot, app.flipped))
        .block(Block::default().borders(Borders::ALL).title("Board"));
    f.render_widget(board, body[0]);

    let info = Paragraph::new(info_lines(&app.snapshot))
        .block(Block::default().borders(Borders::ALL).title("Game Info"));
    f.render_widget(info, body[1]);

    let status_text = app
        .status
        .clone()
        .unwrap_or_else(|| view::status_text(&app.snapshot));
    let status = Paragraph::new(status_text)
        .style(Style::default().fg(Color::Green))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[2]);

    let prompt = if app.pending_promotion.is_some() {
        "promote"
    } else {
        ""
    };
    let help = Paragraph::new(vec![
        Line::from(HELP),
        Line::from(format!("{}> {}", prompt, app.input)),
    ])
    .block(Block::default().borders(Borders::ALL).title("Input"));
    f.render_widget(help, chunks[3]);
}

fn board_lines(snapshot: &SessionSnapshot, flipped: bool) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = view::board_rows(snapshot, flipped)
        .into_iter()
        .map(|row| {
            let mut spans = vec![Span::raw(format!("{} ", row.label))];
            for cell in row.cells {
                let bg = match (cell.last_move, cell.dark) {
                    (true, _) => Color::Yellow,
                    (false, true) => Color::DarkGray,
                    (false, false) => Color::Gray,
                };
                let fg = if cell.glyph.is_ascii_uppercase() {
                    Color::White
                } else {
                    Color::Black
                };
                spans.push(Span::styled(
                    format!(" {} ", cell.glyph),
                    Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
                ));
            }
            Line::from(spans)
        })
        .collect();
    lines.push(Line::from(format!(
        "   {}",
        view::file_labels(flipped).replace(' ', "  ")
    )));
    lines
}

fn info_lines(snapshot: &SessionSnapshot) -> Vec<Line<'static>> {
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::Yellow));
    let mut lines = vec![
        Line::from(vec![
            label("Mode: "),
            Span::raw(format!("{:?} ({})", snapshot.mode, snapshot.difficulty)),
        ]),
        Line::from(vec![label("FEN: "), Span::raw(snapshot.fen.clone())]),
        Line::from(vec![
            label("Engine: "),
            Span::raw(match (snapshot.engine_available, snapshot.engine_thinking) {
                (false, _) => "not running",
                (true, true) => "thinking",
                (true, false) => "ready",
            }),
        ]),
    ];
    if let Some(clock) = view::clock_text(snapshot) {
        lines.push(Line::from(vec![label("Clock: "), Span::raw(clock)]));
    }
    if let Some(opening) = &snapshot.opening {
        lines.push(Line::from(vec![label("Opening: "), Span::raw(opening.clone())]));
    }
    if snapshot.analysis_on {
        let eval = view::eval_text(snapshot).unwrap_or_else(|| "waiting…".to_string());
        lines.push(Line::from(vec![label("Eval: "), Span::raw(eval)]));
    }
    lines.push(Line::from(label("Moves:")));
    let moves = view::move_list(snapshot);
    let skip = moves.len().saturating_sub(8);
    lines.extend(moves.into_iter().skip(skip).map(Line::from));
    lines
}
