use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use mathfield_config::Config;
use mathfield_engine::{
    BlockId, BlockKind, Direction, Document, Editor, EditorOptions, Event as EditorEvent, Patch,
    SyntaxRole,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use std::{
    collections::VecDeque,
    env,
    fs::File,
    io::{Stdout, stdout},
    path::PathBuf,
    process,
};

const MAX_MESSAGES: usize = 8;

struct App {
    editor: Editor,
    messages: VecDeque<String>,
}

impl App {
    fn new(options: EditorOptions, initial: Option<&str>) -> Self {
        let mut app = Self {
            editor: Editor::new(options),
            messages: VecDeque::new(),
        };
        if let Some(text) = initial {
            let patch = app.editor.insert_text(text);
            app.record(patch);
        }
        let patch = app.editor.focus();
        app.record(patch);
        app
    }

    /// Keep a short log of what the last commands reported.
    fn record(&mut self, patch: Patch) {
        for event in patch.events {
            let message = match event {
                EditorEvent::Change(_) => format!("changed (v{})", patch.version),
                EditorEvent::CursorLeave(direction) => format!("cursor left field {direction:?}"),
                EditorEvent::DeleteOutOf(direction) => format!("delete out of field {direction:?}"),
                EditorEvent::Notice(notice) => notice,
            };
            self.messages.push_front(message);
        }
        self.messages.truncate(MAX_MESSAGES);
    }

    /// Returns false when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let editor = &mut self.editor;

        let patch = match key.code {
            KeyCode::Esc => return false,
            KeyCode::Char('a') if ctrl => editor.select_all(),
            KeyCode::Char('z') if ctrl => editor.undo(),
            KeyCode::Char('y') if ctrl => editor.redo(),
            KeyCode::Char('r') if ctrl => editor.insert_block(BlockKind::Radical, None),
            KeyCode::Char('t') if ctrl => editor.insert_block(BlockKind::Integral, None),
            KeyCode::Char('d') if ctrl => editor.insert_block(BlockKind::Derivative, None),
            KeyCode::Char('g') if ctrl => editor.insert_block(BlockKind::Matrix, Some("2x2")),
            KeyCode::Char(c) if !ctrl => editor.insert_text(&c.to_string()),
            KeyCode::Backspace => editor.backspace(),
            KeyCode::Delete => editor.delete(),
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down => {
                let direction = match key.code {
                    KeyCode::Left => Direction::Left,
                    KeyCode::Right => Direction::Right,
                    KeyCode::Up => Direction::Up,
                    _ => Direction::Down,
                };
                if shift {
                    editor.expand_selection(direction)
                } else {
                    editor.move_cursor(direction)
                }
            }
            _ => return true,
        };
        self.record(patch);
        true
    }
}

fn init_logging(config: Option<&Config>) {
    let log_path = config
        .and_then(|config| config.log_path.clone())
        .unwrap_or_else(|| env::temp_dir().join("mathfield.log"));

    // The terminal belongs to the UI, so logs go to a file.
    match File::create(&log_path) {
        Ok(file) => {
            env_logger::Builder::from_default_env()
                .filter_level(log::LevelFilter::Info)
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
            log::info!("mathfield starting up, logging to {}", log_path.display());
        }
        Err(e) => {
            eprintln!("Warning: could not open log file {}: {e}", log_path.display());
        }
    }
}

fn editor_options(config: Option<Config>) -> EditorOptions {
    let mut options = EditorOptions::default();
    if let Some(config) = config {
        if let Some(functions) = config.known_functions {
            options.known_functions = functions;
        }
        if let Some(limit) = config.history_limit {
            options.history_limit = limit;
        }
        if let Some(smart) = config.smart_fraction {
            options.smart_fraction = smart;
        }
    }
    options
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config_path: PathBuf = Config::config_path();

    let initial = match args.len() {
        1 => None,
        2 => Some(args[1].clone()),
        _ => {
            eprintln!("Usage: {} [expression]", args[0]);
            process::exit(1);
        }
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            eprintln!("Fix or remove {}", config_path.display());
            process::exit(1);
        }
    };
    init_logging(config.as_ref());

    let mut app = App::new(editor_options(config), initial.as_deref());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }
    println!("{}", app.editor.to_calchub());

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()?
            && !app.handle_key(key)
        {
            return Ok(());
        }
    }
}

fn role_style(role: Option<SyntaxRole>) -> Style {
    let color = match role {
        Some(SyntaxRole::Number) => Color::Cyan,
        Some(SyntaxRole::Variable) => Color::White,
        Some(SyntaxRole::Constant) => Color::Magenta,
        Some(SyntaxRole::Operator) => Color::Yellow,
        Some(SyntaxRole::Function) => Color::Green,
        Some(SyntaxRole::Bracket) | Some(SyntaxRole::Structure) | None => Color::Gray,
    };
    Style::default().fg(color)
}

/// The linear text, coloured by each character's syntax role.
fn calchub_line(editor: &Editor) -> Line<'static> {
    let linear = editor.linear();
    let spans: Vec<Span> = linear
        .text()
        .chars()
        .zip(linear.source())
        .map(|(c, source)| {
            let role = (*source).and_then(|id| editor.decoration(id));
            Span::styled(c.to_string(), role_style(role))
        })
        .collect();
    Line::from(spans)
}

fn tree_lines(doc: &Document, id: BlockId, depth: usize, lines: &mut Vec<ListItem<'static>>) {
    let indent = "  ".repeat(depth);
    let label = match (doc.kind(id), doc.data(id)) {
        (Some(kind), Some(data)) => format!("{indent}{kind} {data:?} #{}", id.0),
        (Some(kind), None) => format!("{indent}{kind} #{}", id.0),
        (None, _) => format!("{indent}? #{}", id.0),
    };
    lines.push(ListItem::new(label));

    let Some(config) = doc.config(id) else {
        return;
    };
    for (slot, child) in doc.children(id).iter().enumerate() {
        let name = config.name(slot).unwrap_or("?");
        let Some(start) = child else {
            lines.push(ListItem::new(format!("{indent}  {name}: -")));
            continue;
        };
        lines.push(ListItem::new(format!("{indent}  {name}:")));
        for block in doc.chain_blocks(Some(*start)) {
            tree_lines(doc, block, depth + 2, lines);
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(5),
        Constraint::Length(2),
    ])
    .margin(1)
    .split(f.area());
    let columns = Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[2]);

    let editor = &app.editor;

    let display = Paragraph::new(editor.render_display())
        .block(Block::default().borders(Borders::ALL).title("Field"))
        .wrap(Wrap { trim: false });
    f.render_widget(display, rows[0]);

    let title = match (editor.decorations().error(), editor.cursor_offset()) {
        (Some(error), _) => format!("Calchub (parse error: {error})"),
        (None, Some(offset)) => format!("Calchub (cursor at {offset})"),
        (None, None) => "Calchub".to_string(),
    };
    let calchub = Paragraph::new(calchub_line(editor))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(calchub, rows[1]);

    let doc = editor.document();
    let mut items = Vec::new();
    tree_lines(doc, doc.root(), 0, &mut items);
    let tree = List::new(items).block(Block::default().borders(Borders::ALL).title("Blocks"));
    f.render_widget(tree, columns[0]);

    let messages: Vec<ListItem> = app
        .messages
        .iter()
        .map(|message| ListItem::new(message.clone()))
        .collect();
    let events = List::new(messages).block(Block::default().borders(Borders::ALL).title("Events"));
    f.render_widget(events, columns[1]);

    let help_text = Line::from(vec![
        Span::raw("Esc: Quit | "),
        Span::raw("Shift+←→↑↓: Select | "),
        Span::raw("^Z/^Y: Undo/Redo | "),
        Span::raw("^R √ | ^T ∫ | ^D d/dx | ^G matrix"),
    ])
    .style(Style::default().add_modifier(Modifier::DIM));
    f.render_widget(Paragraph::new(help_text), rows[3]);
}
