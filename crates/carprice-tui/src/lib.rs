// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use carprice_app::{
    AppCommand, AppEvent, AppState, ControllerPhase, DatasetIndex, DatasetStatus, FormField,
    PredictionRequest, PredictionResponse, RequestId, SubmissionResult,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const CHOICE_WINDOW: usize = 2;
const TITLE: &str = "Car Price Predictor";
const SUBTITLE: &str = "Get instant price estimates for used cars";

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    DatasetLoaded(Result<DatasetIndex, String>),
    Prediction {
        request_id: RequestId,
        outcome: Result<PredictionResponse, String>,
    },
}

/// Backend seam for the form: where the dataset comes from and how a
/// prediction is obtained. The `spawn_*` defaults run synchronously; real
/// runtimes move the work onto a thread and post the outcome on `tx`.
pub trait PredictionRuntime {
    fn load_dataset(&mut self) -> Result<DatasetIndex>;
    fn predict(&mut self, request: &PredictionRequest) -> Result<PredictionResponse>;
    fn spawn_dataset_load(&mut self, tx: Sender<InternalEvent>) -> Result<()> {
        let outcome = self.load_dataset().map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::DatasetLoaded(outcome))
            .map_err(|_| anyhow!("dataset event channel closed"))?;
        Ok(())
    }
    fn spawn_prediction(
        &mut self,
        request_id: RequestId,
        request: &PredictionRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let outcome = self.predict(request).map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::Prediction {
            request_id,
            outcome,
        })
        .map_err(|_| anyhow!("prediction event channel closed"))?;
        Ok(())
    }
    fn cancel_prediction(&mut self, _request_id: RequestId) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewData {
    focus: FormField,
    status_token: u64,
}

impl Default for ViewData {
    fn default() -> Self {
        Self {
            focus: FormField::Company,
            status_token: 0,
        }
    }
}

pub fn run_app<R: PredictionRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    if let Err(error) = runtime.spawn_dataset_load(internal_tx.clone()) {
        apply(
            state,
            &mut view_data,
            &internal_tx,
            AppCommand::DatasetFailed(format!("{error:#}")),
        );
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(true) => {}
            Ok(false) => continue,
            Err(error) => {
                result = Err(error);
                break;
            }
        }
        match event::read().context("read event") {
            Ok(Event::Key(key)) => {
                if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                    break;
                }
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        let command = match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                AppCommand::ClearStatus
            }
            InternalEvent::ClearStatus { .. } => continue,
            InternalEvent::DatasetLoaded(Ok(index)) => AppCommand::DatasetLoaded(index),
            InternalEvent::DatasetLoaded(Err(error)) => AppCommand::DatasetFailed(error),
            InternalEvent::Prediction {
                request_id,
                outcome: Ok(response),
            } => AppCommand::PredictionReceived {
                request_id,
                response,
            },
            InternalEvent::Prediction {
                request_id,
                outcome: Err(error),
            } => AppCommand::PredictionFailed { request_id, error },
        };
        apply(state, view_data, tx, command);
    }
}

/// Dispatches `command` and arms the auto-clear timer for any status it sets.
fn apply(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) -> Vec<AppEvent> {
    let events = state.dispatch(command);
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
    events
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    apply(
        state,
        view_data,
        internal_tx,
        AppCommand::SetStatus(message.into()),
    );
}

fn handle_key_event<R: PredictionRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
    {
        cancel_prediction(state, runtime, view_data, internal_tx);
        return false;
    }

    match key.code {
        KeyCode::Enter => submit_form(state, runtime, view_data, internal_tx),
        KeyCode::Tab | KeyCode::Down => move_focus(state, view_data, internal_tx, 1),
        KeyCode::BackTab | KeyCode::Up => move_focus(state, view_data, internal_tx, -1),
        KeyCode::Right => cycle_choice(state, view_data, internal_tx, 1),
        KeyCode::Left => cycle_choice(state, view_data, internal_tx, -1),
        KeyCode::Home => select_edge(state, view_data, internal_tx, false),
        KeyCode::End => select_edge(state, view_data, internal_tx, true),
        KeyCode::Backspace | KeyCode::Delete => erase(state, view_data, internal_tx),
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            type_char(state, view_data, internal_tx, ch);
        }
        _ => {}
    }
    false
}

fn move_focus(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) {
    let fields = FormField::ALL;
    let current = fields
        .iter()
        .position(|field| *field == view_data.focus)
        .unwrap_or(0) as isize;
    let len = fields.len() as isize;
    let next = (current + delta).rem_euclid(len) as usize;
    view_data.focus = fields[next];
    let status = format_field_status(view_data.focus);
    emit_status(state, view_data, internal_tx, status);
}

fn format_field_status(field: FormField) -> String {
    let index = FormField::ALL
        .iter()
        .position(|candidate| *candidate == field)
        .unwrap_or(0);
    format!(
        "field {} ({}/{})",
        field.label().to_ascii_lowercase(),
        index + 1,
        FormField::ALL.len()
    )
}

fn owned_options(state: &AppState, field: FormField) -> Vec<String> {
    state
        .options(field)
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Returns the options for the focused select, or reports why there are none.
fn focused_options(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) -> Option<Vec<String>> {
    let field = view_data.focus;
    if !field.is_select() {
        return None;
    }
    if !state.field_enabled(field) {
        emit_status(
            state,
            view_data,
            internal_tx,
            "choose a company before picking a model",
        );
        return None;
    }
    let options = owned_options(state, field);
    if options.is_empty() {
        let reason = match state.dataset {
            DatasetStatus::Loading => "dataset still loading",
            DatasetStatus::Failed(_) => "dataset unavailable; no choices",
            DatasetStatus::Ready(_) => "no choices available",
        };
        emit_status(state, view_data, internal_tx, reason);
        return None;
    }
    Some(options)
}

fn cycle_choice(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) {
    let Some(options) = focused_options(state, view_data, internal_tx) else {
        return;
    };
    let field = view_data.focus;
    let len = options.len() as isize;
    let next = match options
        .iter()
        .position(|option| option == state.form.get(field))
    {
        Some(current) => (current as isize + delta).rem_euclid(len) as usize,
        None if delta < 0 => options.len() - 1,
        None => 0,
    };
    choose(state, view_data, internal_tx, field, &options[next]);
}

fn select_edge(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    last: bool,
) {
    let Some(options) = focused_options(state, view_data, internal_tx) else {
        return;
    };
    let value = if last {
        options.last()
    } else {
        options.first()
    };
    if let Some(value) = value {
        let field = view_data.focus;
        choose(state, view_data, internal_tx, field, value);
    }
}

// Jumps to the next option whose first letter matches, wrapping around.
fn jump_to_initial(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    initial: char,
) {
    let Some(options) = focused_options(state, view_data, internal_tx) else {
        return;
    };
    let field = view_data.focus;
    let start = options
        .iter()
        .position(|option| option == state.form.get(field))
        .map_or(0, |current| current + 1);
    let needle = initial.to_lowercase().collect::<String>();
    let found = (0..options.len())
        .map(|offset| (start + offset) % options.len())
        .find(|index| options[*index].to_lowercase().starts_with(&needle));
    match found {
        Some(index) => choose(state, view_data, internal_tx, field, &options[index]),
        None => emit_status(
            state,
            view_data,
            internal_tx,
            format!("no {} starting with {initial:?}", field.label().to_ascii_lowercase()),
        ),
    }
}

fn choose(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    field: FormField,
    value: &str,
) {
    apply(
        state,
        view_data,
        internal_tx,
        AppCommand::SetField(field, value.to_owned()),
    );
}

fn type_char(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    ch: char,
) {
    let field = view_data.focus;
    if field.is_select() {
        if ch.is_alphanumeric() {
            jump_to_initial(state, view_data, internal_tx, ch);
        }
        return;
    }
    if !ch.is_ascii_digit() {
        emit_status(state, view_data, internal_tx, "kilometers accept digits only");
        return;
    }
    let mut value = state.form.get(field).to_owned();
    value.push(ch);
    choose(state, view_data, internal_tx, field, &value);
}

fn erase(state: &mut AppState, view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>) {
    let field = view_data.focus;
    let mut value = state.form.get(field).to_owned();
    if field.is_select() {
        value.clear();
    } else {
        value.pop();
    }
    choose(state, view_data, internal_tx, field, &value);
}

fn submit_form<R: PredictionRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let events = apply(state, view_data, internal_tx, AppCommand::Submit);
    for event in events {
        match event {
            AppEvent::PredictionRequested {
                request_id,
                request,
            } => {
                if let Err(error) =
                    runtime.spawn_prediction(request_id, &request, internal_tx.clone())
                {
                    apply(
                        state,
                        view_data,
                        internal_tx,
                        AppCommand::PredictionFailed {
                            request_id,
                            error: format!("{error:#}"),
                        },
                    );
                }
            }
            AppEvent::ValidationFailed(_) => {
                if let Some(field) = first_missing_field(state) {
                    view_data.focus = field;
                }
            }
            _ => {}
        }
    }
}

fn first_missing_field(state: &AppState) -> Option<FormField> {
    FormField::ALL
        .into_iter()
        .find(|field| state.form.get(*field).trim().is_empty())
}

fn cancel_prediction<R: PredictionRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let in_flight = state.in_flight();
    apply(state, view_data, internal_tx, AppCommand::CancelPrediction);
    if let Some(request_id) = in_flight
        && let Err(error) = runtime.cancel_prediction(request_id)
    {
        tracing::warn!(request_id = request_id.get(), %error, "cancel prediction failed");
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(7),
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let header = Paragraph::new(render_header_text(state))
        .block(Block::default().title(TITLE).borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    let form = Paragraph::new(render_form_text(state, view_data))
        .block(Block::default().title("details").borders(Borders::ALL));
    frame.render_widget(form, layout[1]);

    let choices = Paragraph::new(render_choices_text(state, view_data))
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .title(view_data.focus.label())
                .borders(Borders::ALL),
        );
    frame.render_widget(choices, layout[2]);

    let result_style = match &state.phase {
        ControllerPhase::Success(_) | ControllerPhase::Message(_) => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        ControllerPhase::LowPriceWarning | ControllerPhase::Error(_) => {
            Style::default().fg(Color::Red)
        }
        ControllerPhase::Idle | ControllerPhase::Loading(_) => Style::default(),
    };
    let result = Paragraph::new(render_result_text(state))
        .style(result_style)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("estimate").borders(Borders::ALL));
    frame.render_widget(result, layout[3]);

    let status = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status, layout[4]);
}

fn render_header_text(state: &AppState) -> String {
    let dataset = match &state.dataset {
        DatasetStatus::Loading => "loading dataset...".to_owned(),
        DatasetStatus::Ready(index) => format!(
            "{} listings, {} brands",
            index.rows().len(),
            index.companies().len()
        ),
        DatasetStatus::Failed(error) => format!("dataset unavailable: {error}"),
    };
    format!("{SUBTITLE} | {dataset}")
}

fn render_form_text(state: &AppState, view_data: &ViewData) -> String {
    FormField::ALL
        .iter()
        .map(|field| {
            let marker = if *field == view_data.focus { ">" } else { " " };
            let value = state.form.get(*field);
            let shown = if !state.field_enabled(*field) {
                "(choose a company first)".to_owned()
            } else if value.is_empty() {
                format!("<{}>", field.placeholder())
            } else {
                value.to_owned()
            };
            format!("{marker} {:<18} {shown}", field.label())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_choices_text(state: &AppState, view_data: &ViewData) -> String {
    let field = view_data.focus;
    if !field.is_select() {
        return "type digits | backspace deletes | enter predicts".to_owned();
    }
    if !state.field_enabled(field) {
        return "choose a company first".to_owned();
    }
    let options = state.options(field);
    if options.is_empty() {
        return "no choices".to_owned();
    }

    let current = state.form.get(field);
    let selected = options.iter().position(|option| *option == current);
    let center = selected.unwrap_or(0);
    let start = center.saturating_sub(CHOICE_WINDOW);
    let end = (center + CHOICE_WINDOW + 1).min(options.len());
    let window = options[start..end]
        .iter()
        .enumerate()
        .map(|(offset, option)| {
            if Some(start + offset) == selected {
                format!("[{option}]")
            } else {
                (*option).to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" | ");
    let position = selected.map_or_else(|| "-".to_owned(), |index| (index + 1).to_string());
    let before = if start > 0 { "< " } else { "" };
    let after = if end < options.len() { " >" } else { "" };
    format!("{before}{window}{after} ({position}/{})", options.len())
}

fn render_result_text(state: &AppState) -> String {
    if state.phase.is_loading() {
        return "Calculating...".to_owned();
    }
    match state.phase.result() {
        None => "fill in every field and press enter".to_owned(),
        Some(SubmissionResult::Error(error)) => format!("! {error}"),
        Some(result) => format!("Estimated Price\n{}", result.text()),
    }
}

fn status_text(state: &AppState) -> String {
    let mode = if state.phase.is_loading() {
        "BUSY"
    } else {
        "READY"
    };
    let default = "tab/shift+tab field | left/right choose | a-z jump | enter predict | esc cancel | ctrl+q quit";
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {default}"),
        None => format!("{mode} | {default}"),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        InternalEvent, PredictionRuntime, ViewData, format_field_status, handle_key_event,
        process_internal_events, render_choices_text, render_form_text, render_header_text,
        render_result_text, status_text,
    };
    use anyhow::{Result, anyhow};
    use carprice_app::{
        AppState, ControllerPhase, DatasetIndex, FormField, PredictionRequest, PredictionResponse,
        RequestId,
    };
    use carprice_testkit::sample_csv;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::collections::VecDeque;
    use std::sync::mpsc;

    #[derive(Debug, Default)]
    struct TestRuntime {
        dataset_error: Option<String>,
        responses: VecDeque<Result<PredictionResponse, String>>,
        requests: Vec<PredictionRequest>,
        defer: bool,
        deferred: Vec<RequestId>,
        canceled: Vec<RequestId>,
    }

    impl PredictionRuntime for TestRuntime {
        fn load_dataset(&mut self) -> Result<DatasetIndex> {
            match &self.dataset_error {
                Some(error) => Err(anyhow!("{error}")),
                None => DatasetIndex::parse(sample_csv()),
            }
        }

        fn predict(&mut self, request: &PredictionRequest) -> Result<PredictionResponse> {
            self.requests.push(request.clone());
            match self.responses.pop_front() {
                Some(Ok(response)) => Ok(response),
                Some(Err(error)) => Err(anyhow!("{error}")),
                None => Err(anyhow!("no scripted response")),
            }
        }

        fn spawn_prediction(
            &mut self,
            request_id: RequestId,
            request: &PredictionRequest,
            tx: mpsc::Sender<InternalEvent>,
        ) -> Result<()> {
            if self.defer {
                self.requests.push(request.clone());
                self.deferred.push(request_id);
                return Ok(());
            }
            let outcome = self.predict(request).map_err(|error| error.to_string());
            tx.send(InternalEvent::Prediction {
                request_id,
                outcome,
            })
            .map_err(|_| anyhow!("channel closed"))?;
            Ok(())
        }

        fn cancel_prediction(&mut self, request_id: RequestId) -> Result<()> {
            self.canceled.push(request_id);
            Ok(())
        }
    }

    struct Harness {
        state: AppState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: mpsc::Sender<InternalEvent>,
        rx: mpsc::Receiver<InternalEvent>,
    }

    impl Harness {
        fn new(runtime: TestRuntime) -> Self {
            let (tx, rx) = mpsc::channel();
            let mut harness = Self {
                state: AppState::default(),
                runtime,
                view_data: ViewData::default(),
                tx,
                rx,
            };
            harness
                .runtime
                .spawn_dataset_load(harness.tx.clone())
                .expect("dataset load should post an event");
            harness.pump();
            harness
        }

        fn pump(&mut self) {
            process_internal_events(&mut self.state, &mut self.view_data, &self.tx, &self.rx);
        }

        fn press(&mut self, code: KeyCode) -> bool {
            self.press_with(code, KeyModifiers::NONE)
        }

        fn press_with(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
            let quit = handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                KeyEvent::new(code, modifiers),
            );
            self.pump();
            quit
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.press(KeyCode::Char(ch));
            }
        }

        fn fill_form(&mut self) {
            self.type_text("h");
            self.press(KeyCode::Tab);
            self.press(KeyCode::Right);
            self.press(KeyCode::Tab);
            self.press(KeyCode::Home);
            self.press(KeyCode::Tab);
            self.type_text("p");
            self.press(KeyCode::Tab);
            self.type_text("40000");
        }
    }

    #[test]
    fn dataset_loads_into_header_and_choices() {
        let harness = Harness::new(TestRuntime::default());
        assert!(render_header_text(&harness.state).contains("11 listings, 6 brands"));
        assert_eq!(
            render_choices_text(&harness.state, &harness.view_data),
            "Ford | Honda | Hyundai > (-/6)"
        );
    }

    #[test]
    fn dataset_failure_is_surfaced() {
        let harness = Harness::new(TestRuntime {
            dataset_error: Some("connection refused".to_owned()),
            ..TestRuntime::default()
        });
        assert!(render_header_text(&harness.state).contains("dataset unavailable"));
        assert_eq!(
            render_choices_text(&harness.state, &harness.view_data),
            "no choices"
        );
    }

    #[test]
    fn arrows_cycle_company_and_wrap() {
        let mut harness = Harness::new(TestRuntime::default());
        harness.press(KeyCode::Right);
        assert_eq!(harness.state.form.company, "Ford");
        harness.press(KeyCode::Left);
        assert_eq!(harness.state.form.company, "Toyota");
        harness.press(KeyCode::Right);
        assert_eq!(harness.state.form.company, "Ford");
    }

    #[test]
    fn letters_jump_between_matching_options() {
        let mut harness = Harness::new(TestRuntime::default());
        harness.type_text("h");
        assert_eq!(harness.state.form.company, "Honda");
        harness.type_text("h");
        assert_eq!(harness.state.form.company, "Hyundai");
        harness.type_text("h");
        assert_eq!(harness.state.form.company, "Honda");
    }

    #[test]
    fn model_choices_follow_company() {
        let mut harness = Harness::new(TestRuntime::default());
        harness.press(KeyCode::Tab);
        harness.press(KeyCode::Right);
        assert_eq!(harness.state.form.name, "");
        assert!(
            render_form_text(&harness.state, &harness.view_data)
                .contains("(choose a company first)")
        );

        harness.press(KeyCode::BackTab);
        harness.type_text("h");
        harness.press(KeyCode::Tab);
        harness.press(KeyCode::Right);
        assert_eq!(harness.state.form.name, "Honda City");
        assert_eq!(
            render_choices_text(&harness.state, &harness.view_data),
            "[Honda City] | Honda Amaze (1/2)"
        );

        harness.press(KeyCode::BackTab);
        harness.type_text("m");
        assert_eq!(harness.state.form.company, "Mahindra");
        assert_eq!(harness.state.form.name, "");
    }

    #[test]
    fn kilometers_accept_digits_and_backspace() {
        let mut harness = Harness::new(TestRuntime::default());
        harness.press(KeyCode::BackTab);
        assert_eq!(harness.view_data.focus, FormField::KmsDriven);
        harness.type_text("12a5");
        assert_eq!(harness.state.form.kms_driven, "125");
        harness.press(KeyCode::Backspace);
        assert_eq!(harness.state.form.kms_driven, "12");
    }

    #[test]
    fn enter_submits_and_renders_price() {
        let mut harness = Harness::new(TestRuntime {
            responses: VecDeque::from([Ok(PredictionResponse::price(450_000.0))]),
            ..TestRuntime::default()
        });
        harness.fill_form();
        harness.press(KeyCode::Enter);

        assert_eq!(harness.runtime.requests.len(), 1);
        let request = &harness.runtime.requests[0];
        assert_eq!(request.company, "Honda");
        assert_eq!(request.name, "Honda City");
        assert_eq!(request.year, 2019.0);
        assert_eq!(request.fuel_type, "Petrol");
        assert_eq!(request.kms_driven, 40_000.0);
        assert_eq!(
            render_result_text(&harness.state),
            "Estimated Price\nPredicted Price: ₹450000"
        );
    }

    #[test]
    fn low_price_and_failures_render_as_errors() {
        let mut harness = Harness::new(TestRuntime {
            responses: VecDeque::from([
                Ok(PredictionResponse::price(-50.0)),
                Ok(PredictionResponse::default()),
                Err("connection refused".to_owned()),
                Ok(PredictionResponse::message("no data")),
            ]),
            ..TestRuntime::default()
        });
        harness.fill_form();

        harness.press(KeyCode::Enter);
        assert_eq!(
            render_result_text(&harness.state),
            "! Predicted price is very low."
        );

        harness.press(KeyCode::Enter);
        assert_eq!(render_result_text(&harness.state), "! Prediction failed.");

        harness.press(KeyCode::Enter);
        assert_eq!(
            render_result_text(&harness.state),
            "! Could not connect to prediction server."
        );

        harness.press(KeyCode::Enter);
        assert_eq!(
            render_result_text(&harness.state),
            "Estimated Price\nno data"
        );
    }

    #[test]
    fn incomplete_form_focuses_first_missing_field() {
        let mut harness = Harness::new(TestRuntime::default());
        harness.type_text("h");
        harness.press(KeyCode::Enter);
        assert!(harness.runtime.requests.is_empty());
        assert_eq!(harness.view_data.focus, FormField::Name);
        assert!(status_text(&harness.state).contains("car model is required"));
    }

    #[test]
    fn second_enter_while_in_flight_is_rejected() {
        let mut harness = Harness::new(TestRuntime {
            defer: true,
            ..TestRuntime::default()
        });
        harness.fill_form();
        harness.press(KeyCode::Enter);
        harness.press(KeyCode::Enter);
        assert_eq!(harness.runtime.requests.len(), 1);
        assert_eq!(render_result_text(&harness.state), "Calculating...");
        assert!(status_text(&harness.state).starts_with("BUSY"));
    }

    #[test]
    fn esc_cancels_and_late_reply_is_ignored() {
        let mut harness = Harness::new(TestRuntime {
            defer: true,
            ..TestRuntime::default()
        });
        harness.fill_form();
        harness.press(KeyCode::Enter);
        let first = harness.runtime.deferred[0];

        harness.press(KeyCode::Esc);
        assert_eq!(harness.runtime.canceled, vec![first]);
        assert_eq!(harness.state.phase, ControllerPhase::Idle);

        harness.press(KeyCode::Enter);
        let second = harness.runtime.deferred[1];
        harness
            .tx
            .send(InternalEvent::Prediction {
                request_id: first,
                outcome: Ok(PredictionResponse::price(1.0)),
            })
            .expect("send stale reply");
        harness.pump();
        assert_eq!(harness.state.phase, ControllerPhase::Loading(second));

        harness
            .tx
            .send(InternalEvent::Prediction {
                request_id: second,
                outcome: Ok(PredictionResponse::price(2.0)),
            })
            .expect("send fresh reply");
        harness.pump();
        assert_eq!(
            harness.state.phase,
            ControllerPhase::Success("2".to_owned())
        );
    }

    #[test]
    fn stale_status_clear_tokens_are_ignored() {
        let mut harness = Harness::new(TestRuntime::default());
        harness.press(KeyCode::Tab);
        let token = harness.view_data.status_token;
        harness
            .tx
            .send(InternalEvent::ClearStatus { token: token - 1 })
            .expect("send stale clear");
        harness.pump();
        assert!(harness.state.status_line.is_some());

        harness
            .tx
            .send(InternalEvent::ClearStatus { token })
            .expect("send clear");
        harness.pump();
        assert!(harness.state.status_line.is_none());
    }

    #[test]
    fn ctrl_q_quits() {
        let mut harness = Harness::new(TestRuntime::default());
        assert!(!harness.press(KeyCode::Char('q')));
        assert!(harness.press_with(KeyCode::Char('q'), KeyModifiers::CONTROL));
    }

    #[test]
    fn field_status_reports_position() {
        assert_eq!(format_field_status(FormField::Year), "field year (3/5)");
    }
}
