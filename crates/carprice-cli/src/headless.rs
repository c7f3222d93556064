// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use carprice_app::{AppCommand, AppEvent, AppState, FormField};
use carprice_tui::PredictionRuntime;
use std::io::Write;

/// Field values supplied on the command line for a one-shot prediction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlessQuery {
    pub company: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub kms: Option<String>,
    pub fuel: Option<String>,
}

impl HeadlessQuery {
    pub fn is_requested(&self) -> bool {
        self.fields().iter().any(|(_, value)| value.is_some())
    }

    pub fn slot(&mut self, field: FormField) -> &mut Option<String> {
        match field {
            FormField::Company => &mut self.company,
            FormField::Name => &mut self.model,
            FormField::Year => &mut self.year,
            FormField::FuelType => &mut self.fuel,
            FormField::KmsDriven => &mut self.kms,
        }
    }

    fn fields(&self) -> [(FormField, Option<&str>); 5] {
        [
            (FormField::Company, self.company.as_deref()),
            (FormField::Name, self.model.as_deref()),
            (FormField::Year, self.year.as_deref()),
            (FormField::FuelType, self.fuel.as_deref()),
            (FormField::KmsDriven, self.kms.as_deref()),
        ]
    }
}

/// Runs the form once without a terminal UI and writes the rendered result.
/// Returns `false` when the outcome is an error display.
pub fn run<R: PredictionRuntime>(
    runtime: &mut R,
    query: &HeadlessQuery,
    out: &mut impl Write,
) -> Result<bool> {
    let mut state = AppState::default();
    match runtime.load_dataset() {
        Ok(index) => {
            state.dispatch(AppCommand::DatasetLoaded(index));
        }
        Err(error) => {
            tracing::warn!(error = %format!("{error:#}"), "dataset unavailable; choices are not checked");
            state.dispatch(AppCommand::DatasetFailed(format!("{error:#}")));
        }
    }

    for (field, value) in query.fields() {
        let Some(value) = value else {
            continue;
        };
        let value = value.trim();
        check_choice(&state, field, value)?;
        state.dispatch(AppCommand::SetField(field, value.to_owned()));
    }

    for event in state.dispatch(AppCommand::Submit) {
        match event {
            AppEvent::ValidationFailed(message) => bail!("{message}"),
            AppEvent::PredictionRequested {
                request_id,
                request,
            } => {
                let command = match runtime.predict(&request) {
                    Ok(response) => AppCommand::PredictionReceived {
                        request_id,
                        response,
                    },
                    Err(error) => AppCommand::PredictionFailed {
                        request_id,
                        error: format!("{error:#}"),
                    },
                };
                state.dispatch(command);
            }
            _ => {}
        }
    }

    let Some(result) = state.phase.result() else {
        bail!("prediction did not complete");
    };
    writeln!(out, "{}", result.text()).context("write prediction result")?;
    Ok(!result.is_error())
}

// Only values the form could have offered are accepted once the dataset is in.
fn check_choice(state: &AppState, field: FormField, value: &str) -> Result<()> {
    if !field.is_select() || state.index().is_none() || value.is_empty() {
        return Ok(());
    }
    let options = state.options(field);
    if options.contains(&value) {
        return Ok(());
    }
    let flag = match field {
        FormField::Company => "--company",
        FormField::Name => "--model",
        FormField::Year => "--year",
        FormField::FuelType => "--fuel",
        FormField::KmsDriven => "--kms",
    };
    if options.is_empty() {
        bail!(
            "no {} choices available for {flag} {value:?} -- pick a company with listings",
            field.label().to_ascii_lowercase()
        );
    }
    bail!(
        "unknown {} {value:?} -- {flag} accepts one of: {}",
        field.label().to_ascii_lowercase(),
        options.join(", ")
    )
}
