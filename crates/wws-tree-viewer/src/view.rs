//! Full-screen terminal view of the swarm discussion tree.
//!
//! The tree is redrawn from the shared poll state on every frame; a new
//! forest fully replaces the previous one. Until the first successful
//! fetch only a loading message is shown.
//!
//! Launch with `wws-tree-viewer view`.

use std::collections::HashMap;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame, Terminal,
};

use wws_discussion::label::{truncate_to_width, NodeLabel, LABEL_HEIGHT, LABEL_WIDTH};
use wws_discussion::RenderForest;

use crate::config::ViewerConfig;
use crate::layout::{layout, Orientation, PlacedNode, TreeGeometry};
use crate::poller::{PollPhase, Poller, PollerHandle, SharedTreeState};
use crate::source::TreeSource;

const REDRAW_INTERVAL: Duration = Duration::from_millis(100); // ~10fps
const PAN_STEP: (i32, i32) = (4, 2);
const LOADING_MESSAGE: &str = "Loading discussion tree...";

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Refresh,
    Quit,
}

/// View state: pan offset plus the last forest copied out of the poll state.
pub struct TreeView {
    state: SharedTreeState,
    source_label: String,
    geometry: TreeGeometry,
    pan: (i32, i32),
    phase: PollPhase,
    generation: u64,
    forest: Option<RenderForest>,
    last_refresh: Option<DateTime<Utc>>,
}

impl TreeView {
    pub fn new(source_label: String, state: SharedTreeState) -> Self {
        Self {
            state,
            source_label,
            geometry: TreeGeometry::default(),
            pan: (0, 0),
            phase: PollPhase::Idle,
            generation: 0,
            forest: None,
            last_refresh: None,
        }
    }

    /// Pull the latest poll state. The forest is only cloned when a new
    /// refresh has landed.
    pub async fn sync(&mut self) {
        let st = self.state.read().await;
        self.phase = st.phase;
        if st.generation != self.generation {
            self.generation = st.generation;
            self.forest = st.forest.clone();
            self.last_refresh = st.last_refresh;
        }
    }

    pub fn pan(&self) -> (i32, i32) {
        self.pan
    }

    /// Render the full layout.
    pub fn render(&self, frame: &mut Frame) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Status bar
                Constraint::Min(6),    // Tree
                Constraint::Length(1), // Key hints
            ])
            .split(frame.area());

        self.render_status_bar(frame, outer[0]);
        self.render_tree(frame, outer[1]);
        self.render_hints(frame, outer[2]);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" 🧠 Swarm Discussion Tree ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let nodes = self
            .forest
            .as_ref()
            .map(|f| f.iter().map(|n| n.node_count()).sum::<usize>())
            .unwrap_or(0);
        let refreshed = self
            .last_refresh
            .map(|ts| ts.format("%H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        let (phase, phase_color) = match self.phase {
            PollPhase::Idle => ("idle", Color::Green),
            PollPhase::Fetching => ("fetching", Color::Yellow),
        };

        let status_line = Line::from(vec![
            Span::styled("  Source: ", Style::default().fg(Color::Gray)),
            Span::styled(self.source_label.as_str(), Style::default().fg(Color::White)),
            Span::styled("  |  Nodes: ", Style::default().fg(Color::Gray)),
            Span::styled(nodes.to_string(), Style::default().fg(Color::Magenta)),
            Span::styled("  |  Last refresh: ", Style::default().fg(Color::Gray)),
            Span::styled(refreshed, Style::default().fg(Color::LightCyan)),
            Span::styled("  |  ", Style::default().fg(Color::Gray)),
            Span::styled(phase, Style::default().fg(phase_color)),
        ]);

        frame.render_widget(Paragraph::new(status_line).block(block), area);
    }

    fn render_tree(&self, frame: &mut Frame, area: Rect) {
        let Some(forest) = self.forest.as_ref() else {
            let text = vec![
                Line::from(""),
                Line::from(Span::styled(
                    LOADING_MESSAGE,
                    Style::default().fg(Color::DarkGray),
                )),
            ];
            frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), area);
            return;
        };

        let placed = layout(forest, &self.geometry);
        frame.render_widget(
            TreeCanvas {
                placed: &placed,
                orientation: self.geometry.orientation,
                pan: self.pan,
            },
            area,
        );
    }

    fn render_hints(&self, frame: &mut Frame, area: Rect) {
        let hints = Line::from(Span::styled(
            "  ←↑↓→/hjkl pan  |  0 reset  |  r refresh  |  q quit",
            Style::default().fg(Color::DarkGray),
        ));
        frame.render_widget(Paragraph::new(hints), area);
    }

    /// Handle keyboard input.
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> KeyAction {
        match (code, modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => return KeyAction::Quit,
            (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => return KeyAction::Quit,
            (KeyCode::Char('r'), _) => return KeyAction::Refresh,
            (KeyCode::Left, _) | (KeyCode::Char('h'), _) => self.pan.0 += PAN_STEP.0,
            (KeyCode::Right, _) | (KeyCode::Char('l'), _) => self.pan.0 -= PAN_STEP.0,
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => self.pan.1 += PAN_STEP.1,
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => self.pan.1 -= PAN_STEP.1,
            (KeyCode::Char('0'), _) | (KeyCode::Home, _) => self.pan = (0, 0),
            _ => {}
        }
        KeyAction::None
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        poller: &PollerHandle,
    ) -> Result<(), anyhow::Error> {
        let mut redraw = tokio::time::interval(REDRAW_INTERVAL);
        let mut events = EventStream::new();

        loop {
            self.sync().await;
            terminal.draw(|frame| self.render(frame))?;

            tokio::select! {
                _ = redraw.tick() => {}
                maybe_event = events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code, key.modifiers) {
                            KeyAction::Quit => break,
                            KeyAction::Refresh => poller.refresh_now(),
                            KeyAction::None => {}
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
            }
        }

        Ok(())
    }
}

/// Draws edges and label boxes of a laid-out forest.
pub struct TreeCanvas<'a> {
    pub placed: &'a [PlacedNode<'a>],
    pub orientation: Orientation,
    pub pan: (i32, i32),
}

impl Widget for TreeCanvas<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut edges = EdgeGrid::default();
        for child in self.placed {
            if let Some(parent) = child.parent.and_then(|i| self.placed.get(i)) {
                edges.connect(parent, child, self.orientation);
            }
        }

        for (&(x, y), &dirs) in &edges.cells {
            if let Some(pos) = self.to_screen(area, x, y) {
                if let Some(cell) = buf.cell_mut(pos) {
                    cell.set_symbol(edge_symbol(dirs))
                        .set_style(Style::default().fg(Color::DarkGray));
                }
            }
        }

        for placed in self.placed {
            self.draw_label(area, buf, placed);
        }
    }
}

impl TreeCanvas<'_> {
    fn to_screen(&self, area: Rect, x: i32, y: i32) -> Option<(u16, u16)> {
        let sx = area.x as i32 + x + self.pan.0;
        let sy = area.y as i32 + y + self.pan.1;
        let inside = sx >= area.left() as i32
            && sx < area.right() as i32
            && sy >= area.top() as i32
            && sy < area.bottom() as i32;
        inside.then_some((sx as u16, sy as u16))
    }

    /// Render the label into a scratch buffer, then copy the visible part.
    fn draw_label(&self, area: Rect, buf: &mut Buffer, placed: &PlacedNode) {
        let left = placed.x - (LABEL_WIDTH / 2) as i32;
        let top = placed.y - (LABEL_HEIGHT / 2) as i32;

        let mut scratch = Buffer::empty(Rect::new(0, 0, LABEL_WIDTH, LABEL_HEIGHT));
        label_widget(&NodeLabel::for_node(placed.node)).render(scratch.area, &mut scratch);

        for dy in 0..LABEL_HEIGHT {
            for dx in 0..LABEL_WIDTH {
                let Some(pos) = self.to_screen(area, left + dx as i32, top + dy as i32) else {
                    continue;
                };
                if let (Some(src), Some(dst)) = (scratch.cell((dx, dy)), buf.cell_mut(pos)) {
                    *dst = src.clone();
                }
            }
        }
    }
}

fn label_widget(label: &NodeLabel) -> Paragraph<'static> {
    let inner = LABEL_WIDTH.saturating_sub(2) as usize;
    let text = vec![
        Line::from(Span::styled(
            truncate_to_width(&label.name, inner),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            truncate_to_width(&label.author_line, inner),
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(
            truncate_to_width(&label.date_line, inner),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Gray)),
    )
}

const UP: u8 = 1;
const DOWN: u8 = 2;
const LEFT: u8 = 4;
const RIGHT: u8 = 8;

/// Connector cells keyed by canvas position, with the directions each
/// cell links to. Shared junctions merge into tee characters.
#[derive(Default)]
struct EdgeGrid {
    cells: HashMap<(i32, i32), u8>,
}

impl EdgeGrid {
    /// Elbow connector from the parent's box edge to the child's.
    fn connect(&mut self, parent: &PlacedNode, child: &PlacedNode, orientation: Orientation) {
        let half_w = (LABEL_WIDTH / 2) as i32;
        let half_h = (LABEL_HEIGHT / 2) as i32;
        match orientation {
            Orientation::Vertical => {
                let start = (parent.x, parent.y + half_h + 1);
                let end = (child.x, child.y - half_h - 1);
                let mid = (parent.y + child.y) / 2;
                self.path(&[start, (parent.x, mid), (child.x, mid), end], UP, DOWN);
            }
            Orientation::Horizontal => {
                let start = (parent.x + half_w, parent.y);
                let end = (child.x - half_w - 1, child.y);
                let mid = (start.0 + end.0) / 2;
                self.path(&[start, (mid, parent.y), (mid, child.y), end], LEFT, RIGHT);
            }
        }
    }

    fn path(&mut self, points: &[(i32, i32)], head: u8, tail: u8) {
        let Some(&first) = points.first() else {
            return;
        };
        *self.cells.entry(first).or_default() |= head;

        let mut cur = first;
        for &target in &points[1..] {
            while cur != target {
                let (next, out, back) = step_toward(cur, target);
                *self.cells.entry(cur).or_default() |= out;
                *self.cells.entry(next).or_default() |= back;
                cur = next;
            }
        }
        *self.cells.entry(cur).or_default() |= tail;
    }
}

fn step_toward(from: (i32, i32), to: (i32, i32)) -> ((i32, i32), u8, u8) {
    if from.0 < to.0 {
        ((from.0 + 1, from.1), RIGHT, LEFT)
    } else if from.0 > to.0 {
        ((from.0 - 1, from.1), LEFT, RIGHT)
    } else if from.1 < to.1 {
        ((from.0, from.1 + 1), DOWN, UP)
    } else {
        ((from.0, from.1 - 1), UP, DOWN)
    }
}

fn edge_symbol(dirs: u8) -> &'static str {
    match dirs {
        d if d == UP | DOWN | LEFT | RIGHT => "┼",
        d if d == UP | DOWN | RIGHT => "├",
        d if d == UP | DOWN | LEFT => "┤",
        d if d == DOWN | LEFT | RIGHT => "┬",
        d if d == UP | LEFT | RIGHT => "┴",
        d if d == DOWN | RIGHT => "┌",
        d if d == DOWN | LEFT => "┐",
        d if d == UP | RIGHT => "└",
        d if d == UP | LEFT => "┘",
        d if d & (LEFT | RIGHT) != 0 && d & (UP | DOWN) == 0 => "─",
        _ => "│",
    }
}

/// Set up the terminal for TUI rendering.
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

type PanicHook = Box<dyn Fn(&std::panic::PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Panic hook that restores the terminal before handing over to the hook
/// it replaced. Dropping it reinstates that previous hook.
struct TerminalPanicHook {
    previous: Option<Arc<PanicHook>>,
}

impl TerminalPanicHook {
    fn install() -> Self {
        let previous = Arc::new(std::panic::take_hook());
        let chained = previous.clone();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            (*chained)(panic_info);
        }));
        Self {
            previous: Some(previous),
        }
    }
}

impl Drop for TerminalPanicHook {
    fn drop(&mut self) {
        // Hooks cannot be swapped from a panicking thread.
        if std::thread::panicking() {
            return;
        }
        // Dropping our hook releases its reference to the previous one.
        drop(std::panic::take_hook());
        if let Some(previous) = self.previous.take() {
            if let Ok(hook) = Arc::try_unwrap(previous) {
                std::panic::set_hook(hook);
            }
        }
    }
}

/// Run the tree viewer until the user quits.
///
/// Polling starts before the first frame and is shut down when the view is
/// torn down, so no fetch is issued after exit.
pub async fn run_tree_view<S: TreeSource>(
    source: S,
    config: &ViewerConfig,
) -> Result<(), anyhow::Error> {
    use std::io::IsTerminal;
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        return Err(anyhow::anyhow!("Tree viewer requires a terminal (TTY)."));
    }

    let _panic_hook = TerminalPanicHook::install();

    let state = SharedTreeState::default();
    let mut view = TreeView::new(source.describe(), state.clone());
    let poller = Poller::new(source, config.poll_interval, state).spawn();

    let mut terminal = setup_terminal()?;
    let result = view.event_loop(&mut terminal, &poller).await;

    poller.shutdown().await;
    restore_terminal(&mut terminal)?;
    result
}
