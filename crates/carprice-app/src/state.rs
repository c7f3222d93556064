// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    CONNECTION_FAILED, DatasetIndex, FormField, FormState, LOW_PRICE_WARNING, PREDICTION_FAILED,
    PredictionRequest, PredictionResponse, RequestId, SubmissionResult, display_value, is_truthy,
    numeric_value,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DatasetStatus {
    #[default]
    Loading,
    Ready(DatasetIndex),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ControllerPhase {
    #[default]
    Idle,
    Loading(RequestId),
    /// Amount text as the service sent it.
    Success(String),
    LowPriceWarning,
    Message(String),
    Error(String),
}

impl ControllerPhase {
    pub fn from_response(response: &PredictionResponse) -> Self {
        if let Some(price) = &response.predicted_price {
            if numeric_value(price) < 0.0 {
                return Self::LowPriceWarning;
            }
            return Self::Success(display_value(price));
        }
        if let Some(message) = response.message.as_ref().filter(|value| is_truthy(value)) {
            return Self::Message(display_value(message));
        }
        match response.error.as_ref().filter(|value| is_truthy(value)) {
            Some(error) => Self::Error(display_value(error)),
            None => Self::Error(PREDICTION_FAILED.to_owned()),
        }
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }

    pub fn result(&self) -> Option<SubmissionResult> {
        match self {
            Self::Idle | Self::Loading(_) => None,
            Self::Success(amount) => Some(SubmissionResult::Price(amount.clone())),
            Self::LowPriceWarning => Some(SubmissionResult::Error(LOW_PRICE_WARNING.to_owned())),
            Self::Message(message) => Some(SubmissionResult::Message(message.clone())),
            Self::Error(error) => Some(SubmissionResult::Error(error.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub form: FormState,
    pub dataset: DatasetStatus,
    pub phase: ControllerPhase,
    pub status_line: Option<String>,
    last_request_id: RequestId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    DatasetLoaded(DatasetIndex),
    DatasetFailed(String),
    SetField(FormField, String),
    Submit,
    PredictionReceived {
        request_id: RequestId,
        response: PredictionResponse,
    },
    PredictionFailed {
        request_id: RequestId,
        error: String,
    },
    CancelPrediction,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    DatasetReady { rows: usize, companies: usize },
    DatasetUnavailable(String),
    FieldChanged(FormField),
    FieldCleared(FormField),
    ValidationFailed(String),
    SubmitRejected,
    PredictionRequested {
        request_id: RequestId,
        request: PredictionRequest,
    },
    PhaseChanged(ControllerPhase),
    StaleResponseDiscarded(RequestId),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::DatasetLoaded(index) => {
                let rows = index.rows().len();
                let companies = index.companies().len();
                self.dataset = DatasetStatus::Ready(index);
                vec![
                    AppEvent::DatasetReady { rows, companies },
                    self.set_status(format!("dataset loaded: {rows} listings")),
                ]
            }
            AppCommand::DatasetFailed(error) => {
                self.dataset = DatasetStatus::Failed(error.clone());
                vec![
                    AppEvent::DatasetUnavailable(error.clone()),
                    self.set_status(format!("dataset load failed: {error}")),
                ]
            }
            AppCommand::SetField(field, value) => self.set_field(field, value),
            AppCommand::Submit => self.submit(),
            AppCommand::PredictionReceived {
                request_id,
                response,
            } => self.finish(request_id, ControllerPhase::from_response(&response)),
            AppCommand::PredictionFailed { request_id, error } => {
                if self.in_flight() == Some(request_id) {
                    tracing::warn!(
                        request_id = request_id.get(),
                        %error,
                        "prediction transport failed"
                    );
                }
                self.finish(request_id, ControllerPhase::Error(CONNECTION_FAILED.to_owned()))
            }
            AppCommand::CancelPrediction => {
                if !self.phase.is_loading() {
                    return vec![self.set_status("no prediction in flight")];
                }
                self.phase = ControllerPhase::Idle;
                vec![
                    AppEvent::PhaseChanged(ControllerPhase::Idle),
                    self.set_status("prediction canceled"),
                ]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        match self.phase {
            ControllerPhase::Loading(request_id) => Some(request_id),
            _ => None,
        }
    }

    pub fn index(&self) -> Option<&DatasetIndex> {
        match &self.dataset {
            DatasetStatus::Ready(index) => Some(index),
            DatasetStatus::Loading | DatasetStatus::Failed(_) => None,
        }
    }

    /// Selectable values for `field` given the current form. Empty for free text.
    pub fn options(&self, field: FormField) -> Vec<&str> {
        let Some(index) = self.index() else {
            return Vec::new();
        };
        match field {
            FormField::Company => index.companies().iter().map(String::as_str).collect(),
            FormField::Name => index.models_for(&self.form.company),
            FormField::Year => index.years().iter().map(String::as_str).collect(),
            FormField::FuelType => index.fuel_types().iter().map(String::as_str).collect(),
            FormField::KmsDriven => Vec::new(),
        }
    }

    pub fn field_enabled(&self, field: FormField) -> bool {
        field != FormField::Name || !self.form.company.is_empty()
    }

    fn set_field(&mut self, field: FormField, value: String) -> Vec<AppEvent> {
        if !value.is_empty() && !self.field_enabled(field) {
            return vec![self.set_status("choose a company before picking a model")];
        }

        if field == FormField::Company {
            if self.form.company == value {
                return Vec::new();
            }
            self.form.company = value;
            let mut events = vec![AppEvent::FieldChanged(FormField::Company)];
            if !self.form.name.is_empty() {
                self.form.name.clear();
                events.push(AppEvent::FieldCleared(FormField::Name));
            }
            return events;
        }

        let slot = self.form.slot(field);
        if *slot == value {
            return Vec::new();
        }
        *slot = value;
        vec![AppEvent::FieldChanged(field)]
    }

    fn submit(&mut self) -> Vec<AppEvent> {
        if self.phase.is_loading() {
            return vec![
                AppEvent::SubmitRejected,
                self.set_status("prediction already in flight; press esc to cancel it"),
            ];
        }

        let request = match self.form.to_request() {
            Ok(request) => request,
            Err(error) => {
                let message = error.to_string();
                return vec![
                    AppEvent::ValidationFailed(message.clone()),
                    self.set_status(message),
                ];
            }
        };

        let request_id = self.last_request_id.next();
        self.last_request_id = request_id;
        self.phase = ControllerPhase::Loading(request_id);
        tracing::info!(
            request_id = request_id.get(),
            company = %request.company,
            name = %request.name,
            "prediction requested"
        );
        vec![
            AppEvent::PhaseChanged(self.phase.clone()),
            AppEvent::PredictionRequested {
                request_id,
                request,
            },
        ]
    }

    fn finish(&mut self, request_id: RequestId, phase: ControllerPhase) -> Vec<AppEvent> {
        if self.in_flight() != Some(request_id) {
            tracing::debug!(request_id = request_id.get(), "discarding stale prediction reply");
            return vec![AppEvent::StaleResponseDiscarded(request_id)];
        }
        self.phase = phase;
        vec![AppEvent::PhaseChanged(self.phase.clone())]
    }

    fn set_status(&mut self, message: impl Into<String>) -> AppEvent {
        let message = message.into();
        self.status_line = Some(message.clone());
        AppEvent::StatusUpdated(message)
    }
}
