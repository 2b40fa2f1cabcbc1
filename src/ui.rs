use std::error::Error;
use std::io;
use std::sync::mpsc::Receiver;
use std::time::{Duration as StdDuration, Instant};

use crossterm::event::{
	self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyCode, KeyEventKind, MouseButton,
	MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use crate::carousel::{Overlay, Panel, PanelNavigator, PanelTrack, SwipeGesture};
use crate::chart::{
	CHART_UNAVAILABLE_MESSAGE, ChartRenderer, RenderOutcome, draw_chart, legend_line,
};
use crate::config::AppConfig;
use crate::domain::{DAY_MS, Mood, Reading, SYMPTOM_CATALOG, VitalField, format_timestamp, now_ms};
use crate::form::{FormSession, FormStep, SessionMode};
use crate::store::{Persistence, RecordStore, StoreEvent};
use crate::window::TimeWindow;

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);
const IDLE_POLL: StdDuration = StdDuration::from_millis(250);
const ANIMATION_POLL: StdDuration = StdDuration::from_millis(16);
const DISTRESS_STEP: i16 = 5;
const AVERAGE_DAYS: i64 = 7;
const SETTINGS_WINDOW_DAYS: [u32; 5] = [1, 3, 7, 10, 14];

pub fn run_dashboard(store: &mut RecordStore, config: &AppConfig) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	stdout.execute(EnableMouseCapture)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, store, config);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	store: &mut RecordStore,
	config: &AppConfig,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::new(store, config);

	loop {
		let now = Instant::now();
		app.drain_store_events();
		app.chart.loading().tick(now);
		app.track.settle(now);
		terminal.draw(|frame| draw_dashboard(frame, &mut app, store, now))?;

		let timeout = if app.track.is_animating(Instant::now()) || app.chart.loading().is_visible() {
			ANIMATION_POLL
		} else {
			IDLE_POLL
		};
		if !event::poll(timeout)? {
			continue;
		}

		match event::read()? {
			CEvent::Key(key) => {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match &app.mode {
					InputMode::Form(_) => handle_form_key(&mut app, key.code, store),
					InputMode::Settings(_) => handle_settings_key(&mut app, key.code),
					InputMode::ConfirmClear => handle_confirm_key(&mut app, key.code, store),
					InputMode::Normal => handle_normal_key(&mut app, key.code, store),
				};

				if should_quit {
					break;
				}
			}
			CEvent::Mouse(mouse) => handle_mouse(&mut app, mouse),
			CEvent::Resize(_, _) => app.chart_dirty = true,
			_ => {}
		}
	}

	Ok(())
}

fn draw_dashboard(frame: &mut Frame, app: &mut App, store: &mut RecordStore, now: Instant) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(1), Constraint::Min(10), Constraint::Length(4)])
		.split(frame.area());

	app.body_area = layout[1];

	let offset = app.track.offset_at(now);
	for (panel, area) in panel_slots(layout[1], app.track.current(), offset) {
		let focused = panel == app.track.current();
		match panel {
			Panel::Home => render_home_panel(frame, area, store, focused),
			Panel::Charts => render_charts_panel(frame, area, app, store, now, focused),
			Panel::Log => render_log_panel(frame, area, app, store, focused),
		}
	}
	// After the panels, so a render requested this frame shows in the header.
	render_header(frame, layout[0], app);

	render_footer(frame, layout[2], app, store);

	match &app.mode {
		InputMode::Normal => {}
		InputMode::Form(form) => render_form_popup(frame, form),
		InputMode::Settings(select) => render_settings_popup(frame, select, app, store),
		InputMode::ConfirmClear => render_confirm_popup(frame, store),
	}
}

/// Where each visible panel lands while the track is offset by `offset`
/// viewport widths. Panels are clipped to the body rather than scrolled.
fn panel_slots(body: Rect, current: Panel, offset: f64) -> Vec<(Panel, Rect)> {
	let shift = (offset.clamp(-1.0, 1.0) * f64::from(body.width)).round() as i32;
	if shift == 0 {
		return vec![(current, body)];
	}

	let width = i32::from(body.width);
	let slot = |panel: Panel, left: i32| -> Option<(Panel, Rect)> {
		let start = left.max(0);
		let end = (left + width).min(width);
		if end <= start {
			return None;
		}
		Some((
			panel,
			Rect::new(body.x + start as u16, body.y, (end - start) as u16, body.height),
		))
	};

	let neighbor = if shift > 0 {
		slot(current.prev(), shift - width)
	} else {
		slot(current.next(), shift + width)
	};
	neighbor.into_iter().chain(slot(current, shift)).collect()
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
	let mut spans = Vec::new();
	for panel in Panel::ALL {
		let style = if panel == app.track.current() {
			Style::default()
				.fg(FOCUSED_PANEL_BORDER_COLOR)
				.add_modifier(Modifier::BOLD)
		} else {
			Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
		};
		spans.push(Span::styled(format!(" {} ", panel.title()), style));
	}
	if app.chart.loading().is_visible() {
		spans.push(Span::styled("  rendering...", Style::default().fg(Color::Cyan)));
	}
	frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_home_panel(frame: &mut Frame, area: Rect, store: &mut RecordStore, focused: bool) {
	let readings = store.get_all();
	let mut lines = Vec::new();

	match readings.last() {
		Some(latest) => {
			lines.push(Line::from(Span::styled(
				"Latest reading",
				Style::default().add_modifier(Modifier::BOLD),
			)));
			lines.push(Line::from(format!("  {}", format_timestamp(latest.timestamp))));
			lines.push(Line::from(format!(
				"  BP {}  |  HR {}",
				latest.blood_pressure_label(),
				latest.heart_rate_label()
			)));
			if let Some(mood) = latest.mood {
				lines.push(Line::from(format!("  Mood: {}", mood.label())));
			}
			if let Some(distress) = latest.distress_final {
				lines.push(Line::from(format!("  Distress: {distress}/100")));
			}
			if !latest.symptoms.is_empty() {
				lines.push(Line::from(format!("  Symptoms: {}", symptom_labels(latest))));
			}
			if !latest.notes.is_empty() {
				lines.push(Line::from(format!("  Notes: {}", latest.notes)));
			}
		}
		None => lines.push(Line::from("No readings yet. Press a to add one.")),
	}

	lines.push(Line::from(""));
	let averages = Averages::since(&readings, now_ms() - AVERAGE_DAYS * DAY_MS);
	lines.push(Line::from(Span::styled(
		format!("Last {AVERAGE_DAYS} days"),
		Style::default().add_modifier(Modifier::BOLD),
	)));
	lines.push(Line::from(format!("  Readings: {}", averages.count)));
	lines.push(Line::from(format!(
		"  Avg BP {}/{}  |  Avg HR {}",
		average_text(averages.systolic),
		average_text(averages.diastolic),
		average_text(averages.heart_rate)
	)));

	let panel = Paragraph::new(lines).block(
		Block::default()
			.borders(Borders::ALL)
			.border_style(border_style(focused))
			.title(Panel::Home.title()),
	);
	frame.render_widget(panel, area);
}

fn render_charts_panel(
	frame: &mut Frame,
	area: Rect,
	app: &mut App,
	store: &mut RecordStore,
	now: Instant,
	focused: bool,
) {
	let title = format!("{} ({} days)", Panel::Charts.title(), app.chart.window.days());
	let block = Block::default()
		.borders(Borders::ALL)
		.border_style(border_style(focused))
		.title(title);
	let inner = block.inner(area);
	frame.render_widget(block, area);

	let sections = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(1), Constraint::Min(1)])
		.split(inner);
	frame.render_widget(Paragraph::new(legend_line()), sections[0]);

	let chart_area = sections[1];
	if focused {
		app.chart_area = chart_area;
	}
	// New data shows "rendering..." for a frame first; a moved or resized area redraws at once.
	if app.chart_dirty && !app.chart.render_requested() {
		app.chart.request_render(now);
	} else if app.chart_dirty || app.rendered_area != chart_area {
		match app.chart.render(store, chart_area) {
			RenderOutcome::Drawn | RenderOutcome::Failed(_) => {
				app.chart_dirty = false;
				app.rendered_area = chart_area;
			}
			RenderOutcome::Skipped => {}
		}
	}

	match app.chart.scene() {
		Some(scene) => draw_chart(frame, chart_area, scene),
		None if app.chart.render_requested() => {}
		None => {
			let text = match app.chart.failure() {
				Some(err) => format!("{CHART_UNAVAILABLE_MESSAGE}: {err}"),
				None => CHART_UNAVAILABLE_MESSAGE.to_string(),
			};
			let placeholder = Paragraph::new(Line::styled(text, Style::default().fg(Color::Yellow)));
			frame.render_widget(placeholder, chart_area);
		}
	}
}

fn render_log_panel(frame: &mut Frame, area: Rect, app: &mut App, store: &mut RecordStore, focused: bool) {
	let readings = store.get_all();
	app.log_index = app.log_index.min(readings.len().saturating_sub(1));

	let items = if readings.is_empty() {
		vec![ListItem::new("(no readings)")]
	} else {
		readings
			.iter()
			.rev()
			.map(|reading| ListItem::new(log_row_line(reading)))
			.collect::<Vec<_>>()
	};

	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.border_style(border_style(focused))
				.title(format!("{} ({})", Panel::Log.title(), readings.len())),
		)
		.highlight_symbol(">> ")
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR));

	let mut state = ListState::default();
	if !readings.is_empty() {
		state.select(Some(app.log_index));
	}
	frame.render_stateful_widget(list, area, &mut state);
}

fn log_row_line(reading: &Reading) -> Line<'static> {
	let mut spans = vec![
		Span::styled(
			format_timestamp(reading.timestamp),
			Style::default().fg(Color::Gray),
		),
		Span::raw("  "),
		Span::styled(
			format!("{:>7}", reading.blood_pressure_label()),
			Style::default().fg(Color::LightRed),
		),
		Span::raw("  "),
		Span::styled(
			format!("{:>7}", reading.heart_rate_label()),
			Style::default().fg(Color::LightCyan),
		),
	];
	if let Some(mood) = reading.mood {
		spans.push(Span::raw(format!("  {}", mood.label())));
	}
	if let Some(distress) = reading.distress_final {
		spans.push(Span::styled(
			format!("  distress {distress}"),
			Style::default().fg(Color::Magenta),
		));
	}
	if !reading.medications.is_empty() {
		spans.push(Span::styled(
			format!("  meds {}", reading.medications.len()),
			Style::default().fg(Color::Green),
		));
	}
	if !reading.notes.is_empty() {
		spans.push(Span::styled(
			format!("  {}", reading.notes),
			Style::default().fg(Color::DarkGray),
		));
	}
	Line::from(spans)
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App, store: &RecordStore) {
	let storage = match store.persistence() {
		Persistence::Durable => String::new(),
		Persistence::MemoryOnly { reason } => format!(" | not saving: {reason}"),
	};

	let footer_lines = match &app.mode {
		InputMode::Normal => vec![
			Line::from("left/right or swipe change panel | a add | s settings | q quit"),
			Line::from(match app.track.current() {
				Panel::Home => "1/2/3 jump to panel",
				Panel::Charts => "+/- zoom | [ ] pan | g latest | drag inside chart to pan",
				Panel::Log => "j/k move | e edit | d delete",
			}),
			Line::from(format!("{}{storage}", app.status)),
		],
		InputMode::Form(form) => vec![
			Line::from(form_hint(form)),
			Line::from("Enter save + next | Shift-Tab back | Esc close"),
			Line::from(format!("{}{storage}", app.status)),
		],
		InputMode::Settings(_) => vec![
			Line::from("j/k or arrows move | Enter choose | Esc close"),
			Line::from(format!("{}{storage}", app.status)),
		],
		InputMode::ConfirmClear => vec![
			Line::from("y delete everything | any other key cancels"),
			Line::from(format!("{}{storage}", app.status)),
		],
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn form_hint(form: &FormState) -> &'static str {
	match form.session.step() {
		FormStep::Vitals => "digits type | Tab/arrows switch field | blank systolic and diastolic skip blood pressure",
		FormStep::Symptoms => "j/k move | space toggle | +/- adjust distress | r reset distress",
		FormStep::Mood => "j/k move | space choose | x clear",
		FormStep::MedicationsNotes => "Tab switch field | Enter on medication adds it | Backspace on empty removes last",
		FormStep::Summary => "Enter finish",
	}
}

fn render_form_popup(frame: &mut Frame, form: &FormState) {
	let area = centered_rect(70, 75, frame.area());
	frame.render_widget(Clear, area);

	let session = &form.session;
	let mode = match session.mode() {
		SessionMode::Add => "Add reading",
		SessionMode::Edit => "Edit reading",
	};
	let position = FormStep::ALL
		.iter()
		.position(|step| *step == session.step())
		.map(|index| index + 1)
		.unwrap_or(1);
	let title = format!(
		"{mode} | step {position}/{}: {}",
		FormStep::ALL.len(),
		session.step().title()
	);

	let lines = match session.step() {
		FormStep::Vitals => vitals_lines(form),
		FormStep::Symptoms => symptom_lines(form),
		FormStep::Mood => mood_lines(form),
		FormStep::MedicationsNotes => medication_lines(form),
		FormStep::Summary => summary_lines(session),
	};

	let popup = Paragraph::new(lines).block(
		Block::default()
			.borders(Borders::ALL)
			.border_style(border_style(true))
			.title(title),
	);
	frame.render_widget(popup, area);
}

fn field_line(label: &str, value: &str, suffix: &str, selected: bool) -> Line<'static> {
	let style = if selected {
		Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD)
	} else {
		Style::default()
	};
	let cursor = if selected { "_" } else { "" };
	Line::from(vec![
		Span::raw(format!("{}{label:<12}", if selected { ">> " } else { "   " })),
		Span::styled(format!("[{value}{cursor}]"), style),
		Span::styled(format!(" {suffix}"), Style::default().fg(Color::DarkGray)),
	])
}

fn vitals_lines(form: &FormState) -> Vec<Line<'static>> {
	let session = &form.session;
	let fields = [
		(VitalField::Systolic, &session.systolic_input, "mmHg"),
		(VitalField::Diastolic, &session.diastolic_input, "mmHg"),
		(VitalField::HeartRate, &session.heart_rate_input, "bpm"),
	];
	fields
		.iter()
		.enumerate()
		.map(|(index, (field, value, unit))| {
			let (min, max) = field.range();
			field_line(
				field.label(),
				value,
				&format!("{unit} ({min}-{max})"),
				form.field == index,
			)
		})
		.collect()
}

fn symptom_lines(form: &FormState) -> Vec<Line<'static>> {
	let session = &form.session;
	let mut lines = SYMPTOM_CATALOG
		.iter()
		.enumerate()
		.map(|(index, symptom)| {
			let checked = if session.symptoms().contains(symptom.tag) { "x" } else { " " };
			let text = format!(
				"{}[{checked}] {}",
				if form.cursor == index { ">> " } else { "   " },
				symptom.label
			);
			if form.cursor == index {
				Line::styled(text, Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR))
			} else {
				Line::from(text)
			}
		})
		.collect::<Vec<_>>();

	lines.push(Line::from(""));
	let computed = session
		.distress_computed()
		.map(|value| value.to_string())
		.unwrap_or_else(|| "-".to_string());
	let final_value = session
		.distress_final()
		.map(|value| value.to_string())
		.unwrap_or_else(|| "-".to_string());
	lines.push(Line::from(format!(
		"Distress: computed {computed} | final {final_value}{}",
		if session.distress_overridden() { " (adjusted)" } else { "" }
	)));
	lines
}

fn mood_lines(form: &FormState) -> Vec<Line<'static>> {
	Mood::ALL
		.iter()
		.enumerate()
		.map(|(index, mood)| {
			let chosen = if form.session.mood == Some(*mood) { "(*)" } else { "( )" };
			let text = format!(
				"{}{chosen} {}",
				if form.cursor == index { ">> " } else { "   " },
				mood.label()
			);
			if form.cursor == index {
				Line::styled(text, Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR))
			} else {
				Line::from(text)
			}
		})
		.collect()
}

fn medication_lines(form: &FormState) -> Vec<Line<'static>> {
	let session = &form.session;
	let mut lines = vec![Line::from("Medications taken:")];
	if session.medications().is_empty() {
		lines.push(Line::styled("   (none)", Style::default().fg(Color::DarkGray)));
	}
	for medication in session.medications() {
		lines.push(Line::from(format!(
			"   {} at {}",
			medication.name,
			format_timestamp(medication.at_timestamp)
		)));
	}
	lines.push(Line::from(""));
	lines.push(field_line("medication", &form.medication_input, "Enter adds", form.field == 0));
	lines.push(field_line("notes", &session.notes, "", form.field == 1));
	lines
}

fn summary_lines(session: &FormSession) -> Vec<Line<'static>> {
	let preview = session.preview();
	let mut lines = vec![
		Line::from(format!("Blood pressure: {}", preview.blood_pressure_label())),
		Line::from(format!("Heart rate:     {}", preview.heart_rate_label())),
		Line::from(format!(
			"Symptoms:       {}",
			if preview.symptoms.is_empty() {
				"none".to_string()
			} else {
				symptom_labels(&preview)
			}
		)),
		Line::from(format!(
			"Distress:       {}",
			preview
				.distress_final
				.map(|value| format!("{value}/100"))
				.unwrap_or_else(|| "-".to_string())
		)),
		Line::from(format!(
			"Mood:           {}",
			preview.mood.map(Mood::label).unwrap_or("-")
		)),
		Line::from(format!("Medications:    {}", preview.medications.len())),
		Line::from(format!("Notes:          {}", preview.notes)),
	];
	if let Some(timestamp) = session.saved_timestamp() {
		lines.push(Line::from(""));
		lines.push(Line::styled(
			format!("Saved as {}", format_timestamp(timestamp)),
			Style::default().fg(Color::Green),
		));
	}
	lines
}

fn render_settings_popup(frame: &mut Frame, select: &SelectState, app: &App, store: &RecordStore) {
	let area = centered_rect(50, 50, frame.area());
	frame.render_widget(Clear, area);

	let sections = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Min(3), Constraint::Length(4)])
		.split(area);

	let items = select
		.options
		.iter()
		.map(|option| {
			let style = if option.action == SettingsAction::SetDays(app.chart.window.days()) {
				Style::default().fg(Color::Green)
			} else if option.action == SettingsAction::ClearAll {
				Style::default().fg(Color::Red)
			} else {
				Style::default()
			};
			ListItem::new(option.label.clone()).style(style)
		})
		.collect::<Vec<_>>();
	let list = List::new(items)
		.block(Block::default().borders(Borders::ALL).title(select.title.clone()))
		.highlight_symbol(">> ")
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR));
	let mut state = ListState::default();
	state.select(Some(select.selected));
	frame.render_stateful_widget(list, sections[0], &mut state);

	let persistence = match store.persistence() {
		Persistence::Durable => "saving to disk".to_string(),
		Persistence::MemoryOnly { reason } => format!("memory only ({reason})"),
	};
	let info = Paragraph::new(vec![
		Line::from(format!("Storage: {}", store.backend_name())),
		Line::from(persistence),
	])
	.block(Block::default().borders(Borders::ALL).title("Storage"));
	frame.render_widget(info, sections[1]);
}

fn render_confirm_popup(frame: &mut Frame, store: &RecordStore) {
	let area = centered_rect(40, 20, frame.area());
	frame.render_widget(Clear, area);
	let popup = Paragraph::new(vec![
		Line::from(format!("Delete all {} readings?", store.len())),
		Line::from("This cannot be undone."),
		Line::styled("y confirm | n cancel", Style::default().fg(Color::DarkGray)),
	])
	.block(
		Block::default()
			.borders(Borders::ALL)
			.border_style(Style::default().fg(Color::Red))
			.title("Clear readings"),
	);
	frame.render_widget(popup, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(area);
	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(popup_layout[1])[1]
}

fn handle_normal_key(app: &mut App, code: KeyCode, store: &mut RecordStore) -> bool {
	match code {
		KeyCode::Char('q') | KeyCode::Esc => return true,
		KeyCode::Left | KeyCode::Char('h') => {
			let target = app.track.current().prev();
			app.track.go(target, true);
		}
		KeyCode::Right | KeyCode::Char('l') => {
			let target = app.track.current().next();
			app.track.go(target, true);
		}
		KeyCode::Char(digit @ '1'..='3') => {
			let index = digit as usize - '1' as usize;
			app.track.go(Panel::ALL[index], true);
		}
		KeyCode::Char('a') => app.open_form(FormSession::new_add(), Overlay::Add),
		KeyCode::Char('s') => app.open_settings(),
		_ => match app.track.current() {
			Panel::Home => {}
			Panel::Charts => handle_chart_key(app, code),
			Panel::Log => handle_log_key(app, code, store),
		},
	}

	false
}

fn handle_chart_key(app: &mut App, code: KeyCode) {
	let window = &mut app.chart.window;
	let changed = match code {
		KeyCode::Char('+') | KeyCode::Char('=') => window.zoom_in(),
		KeyCode::Char('-') => window.zoom_out(),
		KeyCode::Char('[') => {
			window.pan_by(-window.span_ms() / 4);
			true
		}
		KeyCode::Char(']') => {
			window.pan_by(window.span_ms() / 4);
			true
		}
		KeyCode::Char('g') | KeyCode::End => {
			window.jump_to_latest();
			true
		}
		_ => false,
	};
	if changed {
		app.chart_dirty = true;
		app.status = format!("Showing {} days", app.chart.window.days());
	}
}

fn handle_log_key(app: &mut App, code: KeyCode, store: &mut RecordStore) {
	let readings = store.get_all();
	let selected = readings.iter().rev().nth(app.log_index).cloned();

	match code {
		KeyCode::Up | KeyCode::Char('k') => app.log_index = app.log_index.saturating_sub(1),
		KeyCode::Down | KeyCode::Char('j') => {
			app.log_index = (app.log_index + 1).min(readings.len().saturating_sub(1));
		}
		KeyCode::Char('e') | KeyCode::Enter => match selected {
			Some(reading) => app.open_form(FormSession::edit(&reading), Overlay::Edit),
			None => app.status = "Nothing to edit".to_string(),
		},
		KeyCode::Char('d') => match selected {
			Some(reading) => match store.remove(reading.timestamp) {
				Ok(removed) => {
					app.status = format!("Deleted reading from {}", format_timestamp(removed.timestamp));
				}
				Err(err) => app.status = format!("error: {err}"),
			},
			None => app.status = "Nothing to delete".to_string(),
		},
		_ => {}
	}
}

fn handle_form_key(app: &mut App, code: KeyCode, store: &mut RecordStore) -> bool {
	let InputMode::Form(form) = &mut app.mode else {
		return false;
	};
	let step = form.session.step();

	match code {
		KeyCode::Esc => {
			let saved = form.session.saved_timestamp();
			app.close_overlay();
			app.status = match saved {
				Some(timestamp) => format!("Form closed; reading {} kept", format_timestamp(timestamp)),
				None => "Form closed".to_string(),
			};
		}
		KeyCode::BackTab => {
			form.session.back();
			form.reset_focus();
		}
		KeyCode::Tab => {
			form.field = (form.field + 1) % form.field_count();
		}
		KeyCode::Enter => {
			if step == FormStep::MedicationsNotes && form.field == 0 && !form.medication_input.trim().is_empty() {
				let name = std::mem::take(&mut form.medication_input);
				if !form.session.add_medication(&name) {
					app.status = format!("{} already listed; time updated", name.trim());
				}
				return false;
			}

			if step == FormStep::Summary {
				let result = form.session.save_step(store);
				let saved = form.session.saved_timestamp();
				match result {
					Ok(_) => {
						app.close_overlay();
						app.status = match saved {
							Some(timestamp) => format!("Saved reading {}", format_timestamp(timestamp)),
							None => "Nothing entered; no reading saved".to_string(),
						};
					}
					Err(err) => app.status = format!("error: {err}"),
				}
				return false;
			}

			match form.session.advance(store) {
				Ok(_) => {
					form.reset_focus();
					app.status = format!("Step: {}", form.session.step().title());
				}
				Err(err) => app.status = format!("error: {err}"),
			}
		}
		_ => match step {
			FormStep::Vitals => handle_vitals_key(form, code),
			FormStep::Symptoms => handle_symptoms_key(form, code),
			FormStep::Mood => handle_mood_key(form, code),
			FormStep::MedicationsNotes => handle_medication_key(form, code),
			FormStep::Summary => {}
		},
	}

	false
}

fn handle_vitals_key(form: &mut FormState, code: KeyCode) {
	match code {
		KeyCode::Up => form.field = form.field.saturating_sub(1),
		KeyCode::Down => form.field = (form.field + 1).min(2),
		KeyCode::Char(digit) if digit.is_ascii_digit() => {
			let input = form.vital_input_mut();
			if input.len() < 3 {
				input.push(digit);
			}
		}
		KeyCode::Backspace => {
			form.vital_input_mut().pop();
		}
		_ => {}
	}
}

fn handle_symptoms_key(form: &mut FormState, code: KeyCode) {
	match code {
		KeyCode::Up | KeyCode::Char('k') => form.cursor = form.cursor.saturating_sub(1),
		KeyCode::Down | KeyCode::Char('j') => {
			form.cursor = (form.cursor + 1).min(SYMPTOM_CATALOG.len() - 1);
		}
		KeyCode::Char(' ') => {
			if let Some(symptom) = SYMPTOM_CATALOG.get(form.cursor) {
				form.session.toggle_symptom(symptom.tag);
			}
		}
		KeyCode::Char('+') | KeyCode::Char('=') => form.session.adjust_distress(DISTRESS_STEP),
		KeyCode::Char('-') => form.session.adjust_distress(-DISTRESS_STEP),
		KeyCode::Char('r') => form.session.reset_distress(),
		_ => {}
	}
}

fn handle_mood_key(form: &mut FormState, code: KeyCode) {
	match code {
		KeyCode::Up | KeyCode::Char('k') => form.cursor = form.cursor.saturating_sub(1),
		KeyCode::Down | KeyCode::Char('j') => form.cursor = (form.cursor + 1).min(Mood::ALL.len() - 1),
		KeyCode::Char(' ') => {
			let mood = Mood::ALL.get(form.cursor).copied();
			form.session.mood = if form.session.mood == mood { None } else { mood };
		}
		KeyCode::Char('x') | KeyCode::Backspace => form.session.mood = None,
		_ => {}
	}
}

fn handle_medication_key(form: &mut FormState, code: KeyCode) {
	match (code, form.field) {
		(KeyCode::Char(value), 0) => form.medication_input.push(value),
		(KeyCode::Char(value), _) => form.session.notes.push(value),
		(KeyCode::Backspace, 0) => {
			if form.medication_input.pop().is_none() {
				form.session.remove_last_medication();
			}
		}
		(KeyCode::Backspace, _) => {
			form.session.notes.pop();
		}
		(KeyCode::Up, _) => form.field = 0,
		(KeyCode::Down, _) => form.field = 1,
		_ => {}
	}
}

fn handle_settings_key(app: &mut App, code: KeyCode) -> bool {
	match code {
		KeyCode::Esc | KeyCode::Char('s') => {
			app.close_overlay();
			app.status = "Settings closed".to_string();
		}
		KeyCode::Up | KeyCode::Char('k') => {
			if let InputMode::Settings(select) = &mut app.mode {
				select.move_selection(-1);
			}
		}
		KeyCode::Down | KeyCode::Char('j') => {
			if let InputMode::Settings(select) = &mut app.mode {
				select.move_selection(1);
			}
		}
		KeyCode::Enter => {
			let action = match &app.mode {
				InputMode::Settings(select) => select.selected_option().map(|option| option.action),
				_ => None,
			};
			match action {
				Some(SettingsAction::SetDays(days)) => {
					app.chart.window.set_days(days);
					app.chart_dirty = true;
					app.status = format!("Chart window set to {days} days");
				}
				Some(SettingsAction::ClearAll) => {
					app.mode = InputMode::ConfirmClear;
				}
				None => {}
			}
		}
		_ => {}
	}

	false
}

fn handle_confirm_key(app: &mut App, code: KeyCode, store: &mut RecordStore) -> bool {
	if code == KeyCode::Char('y') {
		store.clear();
		app.log_index = 0;
		app.status = "All readings deleted".to_string();
	} else {
		app.status = "Clear cancelled".to_string();
	}
	app.close_overlay();
	false
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
	if !matches!(app.mode, InputMode::Normal) {
		app.gesture.abort(&mut app.track);
		app.chart_drag = None;
		if matches!(mouse.kind, MouseEventKind::Up(_)) {
			app.pointers = app.pointers.saturating_sub(1);
		}
		return;
	}

	let at = (f64::from(mouse.column), f64::from(mouse.row));
	let width = f64::from(app.body_area.width);
	match mouse.kind {
		MouseEventKind::Down(MouseButton::Left) => {
			app.pointers = 1;
			let in_chart = app.track.current() == Panel::Charts && contains(app.chart_area, mouse.column, mouse.row);
			app.chart_drag = in_chart.then_some(mouse.column);
			app.gesture.touch_start(1, at, in_chart, &mut app.track);
		}
		MouseEventKind::Down(_) => {
			app.pointers += 1;
			if app.pointers > 1 {
				app.gesture.touch_start(app.pointers, at, false, &mut app.track);
			}
		}
		MouseEventKind::Drag(MouseButton::Left) => {
			if let Some(last_column) = app.chart_drag {
				pan_chart_by_cells(app, i32::from(mouse.column) - i32::from(last_column));
				app.chart_drag = Some(mouse.column);
			}
			app.gesture.touch_move(app.pointers, at, width, &mut app.track);
		}
		MouseEventKind::Up(MouseButton::Left) => {
			app.pointers = 0;
			app.chart_drag = None;
			app.gesture.touch_end(at, width, &mut app.track);
		}
		MouseEventKind::Up(_) => {
			app.pointers = app.pointers.saturating_sub(1);
		}
		MouseEventKind::ScrollUp if contains(app.chart_area, mouse.column, mouse.row) => {
			handle_chart_key(app, KeyCode::Char('+'));
		}
		MouseEventKind::ScrollDown if contains(app.chart_area, mouse.column, mouse.row) => {
			handle_chart_key(app, KeyCode::Char('-'));
		}
		_ => {}
	}
}

/// Dragging right reveals earlier readings.
fn pan_chart_by_cells(app: &mut App, dx: i32) {
	if dx == 0 {
		return;
	}
	let Some(scene) = app.chart.scene() else {
		return;
	};
	let Some(range) = scene.range else {
		return;
	};
	let plot_width = scene.metrics.plot_width();
	if plot_width <= 0.0 {
		return;
	}

	let ms_per_cell = range.span() as f64 / plot_width;
	app.chart.window.pan_by(-(f64::from(dx) * ms_per_cell).round() as i64);
	app.chart_dirty = true;
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
	column >= area.x && column < area.x + area.width && row >= area.y && row < area.y + area.height
}

fn build_settings_select() -> SelectState {
	let mut options = SETTINGS_WINDOW_DAYS
		.iter()
		.map(|days| SelectOption::new(format!("Chart window: {days} days"), SettingsAction::SetDays(*days)))
		.collect::<Vec<_>>();
	options.push(SelectOption::new("Clear all readings", SettingsAction::ClearAll));
	SelectState::new("Settings", options)
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default()
			.fg(FOCUSED_PANEL_BORDER_COLOR)
			.add_modifier(Modifier::BOLD)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

fn symptom_labels(reading: &Reading) -> String {
	reading
		.symptoms
		.iter()
		.map(|tag| {
			crate::domain::symptom(tag)
				.map(|symptom| symptom.label.to_string())
				.unwrap_or_else(|| tag.clone())
		})
		.collect::<Vec<_>>()
		.join(", ")
}

fn average_text(value: Option<f64>) -> String {
	value
		.map(|value| format!("{value:.0}"))
		.unwrap_or_else(|| "--".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Averages {
	count: usize,
	systolic: Option<f64>,
	diastolic: Option<f64>,
	heart_rate: Option<f64>,
}

impl Averages {
	fn since(readings: &[Reading], since_ms: i64) -> Self {
		let recent = readings
			.iter()
			.filter(|reading| reading.timestamp >= since_ms)
			.collect::<Vec<_>>();
		let mean = |pick: fn(&Reading) -> Option<u16>| -> Option<f64> {
			let values = recent.iter().filter_map(|reading| pick(reading)).collect::<Vec<_>>();
			if values.is_empty() {
				None
			} else {
				Some(values.iter().map(|value| f64::from(*value)).sum::<f64>() / values.len() as f64)
			}
		};

		Self {
			count: recent.len(),
			systolic: mean(|reading| reading.systolic),
			diastolic: mean(|reading| reading.diastolic),
			heart_rate: mean(|reading| reading.heart_rate),
		}
	}
}

#[derive(Debug, Clone)]
struct FormState {
	session: FormSession,
	field: usize,
	cursor: usize,
	medication_input: String,
}

impl FormState {
	fn new(session: FormSession) -> Self {
		Self {
			session,
			field: 0,
			cursor: 0,
			medication_input: String::new(),
		}
	}

	fn field_count(&self) -> usize {
		match self.session.step() {
			FormStep::Vitals => 3,
			FormStep::MedicationsNotes => 2,
			FormStep::Symptoms | FormStep::Mood | FormStep::Summary => 1,
		}
	}

	fn reset_focus(&mut self) {
		self.field = 0;
		self.cursor = match (self.session.step(), self.session.mood) {
			(FormStep::Mood, Some(mood)) => Mood::ALL.iter().position(|item| *item == mood).unwrap_or(0),
			_ => 0,
		};
	}

	fn vital_input_mut(&mut self) -> &mut String {
		match self.field {
			0 => &mut self.session.systolic_input,
			1 => &mut self.session.diastolic_input,
			_ => &mut self.session.heart_rate_input,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingsAction {
	SetDays(u32),
	ClearAll,
}

#[derive(Debug, Clone)]
struct SelectState {
	title: String,
	options: Vec<SelectOption>,
	selected: usize,
}

impl SelectState {
	fn new(title: impl Into<String>, options: Vec<SelectOption>) -> Self {
		Self {
			title: title.into(),
			options,
			selected: 0,
		}
	}

	fn move_selection(&mut self, delta: i32) {
		if self.options.is_empty() {
			self.selected = 0;
			return;
		}

		if delta > 0 {
			self.selected = (self.selected + delta as usize).min(self.options.len() - 1);
		} else {
			self.selected = self.selected.saturating_sub(delta.unsigned_abs() as usize);
		}
	}

	fn selected_option(&self) -> Option<&SelectOption> {
		self.options.get(self.selected)
	}
}

#[derive(Debug, Clone)]
struct SelectOption {
	label: String,
	action: SettingsAction,
}

impl SelectOption {
	fn new(label: impl Into<String>, action: SettingsAction) -> Self {
		Self {
			label: label.into(),
			action,
		}
	}
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Form(FormState),
	Settings(SelectState),
	ConfirmClear,
}

struct App {
	track: PanelTrack,
	gesture: SwipeGesture,
	chart: ChartRenderer,
	events: Receiver<StoreEvent>,
	chart_dirty: bool,
	rendered_area: Rect,
	chart_area: Rect,
	body_area: Rect,
	chart_drag: Option<u16>,
	pointers: usize,
	log_index: usize,
	mode: InputMode,
	status: String,
}

impl App {
	fn new(store: &mut RecordStore, config: &AppConfig) -> Self {
		let chart = ChartRenderer::new(
			TimeWindow::new(config.chart.default_days),
			config.chart.thresholds.clone(),
			config.chart.pixel_ratio,
			StdDuration::from_millis(config.chart.watchdog_ms),
		);
		Self {
			track: PanelTrack::new(&config.gesture),
			gesture: SwipeGesture::new(config.gesture),
			chart,
			events: store.subscribe(),
			chart_dirty: true,
			rendered_area: Rect::default(),
			chart_area: Rect::default(),
			body_area: Rect::default(),
			chart_drag: None,
			pointers: 0,
			log_index: 0,
			mode: InputMode::Normal,
			status: "Ready".to_string(),
		}
	}

	fn drain_store_events(&mut self) {
		while let Ok(event) = self.events.try_recv() {
			log::debug!("store event: {event:?}");
			if event == StoreEvent::Cleared {
				self.log_index = 0;
			}
			self.chart_dirty = true;
		}
	}

	fn open_form(&mut self, session: FormSession, overlay: Overlay) {
		self.gesture.abort(&mut self.track);
		self.track.open_overlay(overlay);
		self.mode = InputMode::Form(FormState::new(session));
		self.status = match overlay {
			Overlay::Edit => "Editing reading".to_string(),
			Overlay::Add | Overlay::Settings => "New reading".to_string(),
		};
	}

	fn open_settings(&mut self) {
		self.gesture.abort(&mut self.track);
		self.track.open_overlay(Overlay::Settings);
		self.mode = InputMode::Settings(build_settings_select());
	}

	fn close_overlay(&mut self) {
		self.track.close_overlay();
		self.mode = InputMode::Normal;
	}
}

#[cfg(test)]
mod tests {
	use std::time::{Duration, Instant};

	use crossterm::event::{KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
	use ratatui::Terminal;
	use ratatui::backend::TestBackend;
	use ratatui::layout::Rect;

	use crate::carousel::{GestureState, Overlay, Panel};
	use crate::chart::CHART_UNAVAILABLE_MESSAGE;
	use crate::config::AppConfig;
	use crate::domain::{DAY_MS, Reading, now_ms};
	use crate::form::FormStep;
	use crate::storage::MemoryBackend;
	use crate::store::RecordStore;

	use super::{
		App, Averages, InputMode, SettingsAction, build_settings_select, draw_dashboard, handle_confirm_key,
		handle_form_key, handle_mouse, handle_normal_key, handle_settings_key, panel_slots,
	};

	fn setup() -> (App, RecordStore) {
		let mut store = RecordStore::new(Box::new(MemoryBackend::default()));
		store.initialize().expect("memory backend should load");
		let app = App::new(&mut store, &AppConfig::default());
		(app, store)
	}

	fn type_keys(app: &mut App, store: &mut RecordStore, keys: &[KeyCode]) {
		for key in keys {
			handle_form_key(app, *key, store);
		}
	}

	#[test]
	fn settled_track_fills_the_body() {
		let body = Rect::new(0, 1, 80, 20);
		assert_eq!(panel_slots(body, Panel::Charts, 0.0), vec![(Panel::Charts, body)]);
	}

	#[test]
	fn dragging_reveals_the_neighbor_panel() {
		let body = Rect::new(0, 1, 80, 20);

		let slots = panel_slots(body, Panel::Home, 0.25);
		assert_eq!(slots.len(), 2);
		assert_eq!(slots[0], (Panel::Log, Rect::new(0, 1, 20, 20)));
		assert_eq!(slots[1], (Panel::Home, Rect::new(20, 1, 60, 20)));

		let slots = panel_slots(body, Panel::Home, -0.5);
		assert_eq!(slots[0], (Panel::Charts, Rect::new(40, 1, 40, 20)));
		assert_eq!(slots[1], (Panel::Home, Rect::new(0, 1, 40, 20)));
	}

	#[test]
	fn averages_skip_missing_vitals_and_old_readings() {
		let readings = vec![
			Reading::vitals(0, Some(180), Some(110), Some(100)),
			Reading::vitals(10 * DAY_MS, Some(120), Some(80), None),
			Reading::vitals(11 * DAY_MS, Some(130), Some(90), Some(70)),
		];
		let averages = Averages::since(&readings, 5 * DAY_MS);
		assert_eq!(averages.count, 2);
		assert_eq!(averages.systolic, Some(125.0));
		assert_eq!(averages.diastolic, Some(85.0));
		assert_eq!(averages.heart_rate, Some(70.0));
		assert_eq!(Averages::since(&readings, 20 * DAY_MS).systolic, None);
	}

	#[test]
	fn add_form_creates_then_patches_one_reading() {
		let (mut app, mut store) = setup();
		handle_normal_key(&mut app, KeyCode::Char('a'), &mut store);
		assert_eq!(app.track.overlay(), Some(Overlay::Add));

		type_keys(
			&mut app,
			&mut store,
			&[
				KeyCode::Char('1'),
				KeyCode::Char('3'),
				KeyCode::Char('2'),
				KeyCode::Tab,
				KeyCode::Char('8'),
				KeyCode::Char('4'),
				KeyCode::Tab,
				KeyCode::Char('7'),
				KeyCode::Char('4'),
				KeyCode::Enter,
			],
		);
		assert_eq!(store.len(), 1);

		type_keys(&mut app, &mut store, &[KeyCode::Char(' '), KeyCode::Enter]);
		type_keys(&mut app, &mut store, &[KeyCode::Enter]);
		type_keys(
			&mut app,
			&mut store,
			&[KeyCode::Char('A'), KeyCode::Enter, KeyCode::Tab, KeyCode::Char('o'), KeyCode::Char('k'), KeyCode::Enter],
		);
		match &app.mode {
			InputMode::Form(form) => assert_eq!(form.session.step(), FormStep::Summary),
			_ => panic!("form should still be open"),
		}
		type_keys(&mut app, &mut store, &[KeyCode::Enter]);

		assert!(matches!(app.mode, InputMode::Normal));
		assert_eq!(app.track.overlay(), None);
		let readings = store.get_all();
		assert_eq!(readings.len(), 1);
		let reading = &readings[0];
		assert_eq!(reading.blood_pressure_label(), "132/84");
		assert_eq!(reading.heart_rate, Some(74));
		assert!(reading.symptoms.contains("headache"));
		assert_eq!(reading.medications.len(), 1);
		assert_eq!(reading.notes, "ok");
	}

	#[test]
	fn one_sided_blood_pressure_keeps_the_form_on_vitals() {
		let (mut app, mut store) = setup();
		handle_normal_key(&mut app, KeyCode::Char('a'), &mut store);
		type_keys(&mut app, &mut store, &[KeyCode::Char('9'), KeyCode::Char('0'), KeyCode::Enter]);

		assert_eq!(store.len(), 0);
		assert!(app.status.starts_with("error:"));
		match &app.mode {
			InputMode::Form(form) => assert_eq!(form.session.step(), FormStep::Vitals),
			_ => panic!("form should still be open"),
		}
	}

	#[test]
	fn settings_change_window_and_confirm_clear() {
		let (mut app, mut store) = setup();
		store
			.add(Reading::vitals(DAY_MS, Some(120), Some(80), Some(60)))
			.expect("valid reading should be added");

		handle_normal_key(&mut app, KeyCode::Char('s'), &mut store);
		assert_eq!(app.track.overlay(), Some(Overlay::Settings));
		handle_settings_key(&mut app, KeyCode::Enter);
		assert_eq!(app.chart.window.days(), 1);

		let clear_index = build_settings_select()
			.options
			.iter()
			.position(|option| option.action == SettingsAction::ClearAll)
			.expect("settings should offer clear");
		for _ in 0..clear_index {
			handle_settings_key(&mut app, KeyCode::Down);
		}
		handle_settings_key(&mut app, KeyCode::Enter);
		assert!(matches!(app.mode, InputMode::ConfirmClear));

		handle_confirm_key(&mut app, KeyCode::Char('y'), &mut store);
		assert_eq!(store.len(), 0);
		assert!(matches!(app.mode, InputMode::Normal));
		assert_eq!(app.track.overlay(), None);
	}

	#[test]
	fn opening_settings_mid_drag_drops_the_swipe() {
		let (mut app, mut store) = setup();
		app.body_area = Rect::new(0, 1, 100, 20);
		let mouse = |kind, column| MouseEvent {
			kind,
			column,
			row: 10,
			modifiers: KeyModifiers::NONE,
		};

		handle_mouse(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 80));
		handle_mouse(&mut app, mouse(MouseEventKind::Drag(MouseButton::Left), 50));
		assert!(matches!(app.gesture.state(), GestureState::DraggingHorizontal { .. }));

		handle_normal_key(&mut app, KeyCode::Char('s'), &mut store);
		assert_eq!(app.gesture.state(), GestureState::Idle);
		handle_mouse(&mut app, mouse(MouseEventKind::Up(MouseButton::Left), 50));
		handle_settings_key(&mut app, KeyCode::Esc);

		assert_eq!(app.gesture.state(), GestureState::Idle);
		assert_eq!(app.track.current(), Panel::Home);
		assert_eq!(app.track.offset_at(Instant::now() + Duration::from_secs(1)), 0.0);
		assert_eq!(app.pointers, 0);

		handle_mouse(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 80));
		assert_eq!(app.gesture.state(), GestureState::Tracking { origin: (80.0, 10.0) });
	}

	#[test]
	fn chart_shows_rendering_for_one_frame_before_drawing() {
		let (mut app, mut store) = setup();
		store
			.add(Reading::vitals(now_ms() - DAY_MS, Some(128), Some(82), Some(70)))
			.expect("add should succeed");
		handle_normal_key(&mut app, KeyCode::Right, &mut store);
		assert_eq!(app.track.current(), Panel::Charts);
		let later = Instant::now() + Duration::from_secs(1);
		app.track.settle(later);

		let mut terminal = Terminal::new(TestBackend::new(100, 30)).expect("test terminal should open");
		terminal
			.draw(|frame| draw_dashboard(frame, &mut app, &mut store, later))
			.expect("first frame should draw");
		assert!(app.chart.render_requested());
		assert!(app.chart_dirty);
		assert!(buffer_text(&terminal).contains("rendering..."));
		assert!(!buffer_text(&terminal).contains(CHART_UNAVAILABLE_MESSAGE));

		terminal
			.draw(|frame| draw_dashboard(frame, &mut app, &mut store, later))
			.expect("second frame should draw");
		assert!(!app.chart.render_requested());
		assert!(!app.chart_dirty);
		assert!(app.chart.scene().is_some());
		assert!(!buffer_text(&terminal).contains("rendering..."));
	}

	fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
		let buffer = terminal.backend().buffer();
		buffer.content().iter().map(|cell| cell.symbol()).collect()
	}

	#[test]
	fn arrow_keys_rotate_panels() {
		let (mut app, mut store) = setup();
		handle_normal_key(&mut app, KeyCode::Left, &mut store);
		assert_eq!(app.track.current(), Panel::Log);
		handle_normal_key(&mut app, KeyCode::Right, &mut store);
		handle_normal_key(&mut app, KeyCode::Right, &mut store);
		assert_eq!(app.track.current(), Panel::Charts);
		assert!(handle_normal_key(&mut app, KeyCode::Char('q'), &mut store));
	}
}
