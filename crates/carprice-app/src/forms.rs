// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::PredictionRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Company,
    Name,
    Year,
    FuelType,
    KmsDriven,
}

impl FormField {
    pub const ALL: [Self; 5] = [
        Self::Company,
        Self::Name,
        Self::Year,
        Self::FuelType,
        Self::KmsDriven,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Company => "Company",
            Self::Name => "Car Model",
            Self::Year => "Year",
            Self::FuelType => "Fuel Type",
            Self::KmsDriven => "Kilometers Driven",
        }
    }

    /// Key used for this field in the prediction payload.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Name => "name",
            Self::Year => "year",
            Self::FuelType => "fuel_type",
            Self::KmsDriven => "kms_driven",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "company" => Some(Self::Company),
            "name" => Some(Self::Name),
            "year" => Some(Self::Year),
            "fuel_type" => Some(Self::FuelType),
            "kms_driven" => Some(Self::KmsDriven),
            _ => None,
        }
    }

    pub const fn placeholder(self) -> &'static str {
        match self {
            Self::Company => "Choose brand",
            Self::Name => "Select model",
            Self::Year => "Select year",
            Self::FuelType => "Choose fuel",
            Self::KmsDriven => "Enter total kilometers",
        }
    }

    pub const fn is_select(self) -> bool {
        !matches!(self, Self::KmsDriven)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormState {
    pub company: String,
    pub name: String,
    pub year: String,
    pub kms_driven: String,
    pub fuel_type: String,
}

impl FormState {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Company => &self.company,
            FormField::Name => &self.name,
            FormField::Year => &self.year,
            FormField::FuelType => &self.fuel_type,
            FormField::KmsDriven => &self.kms_driven,
        }
    }

    pub(crate) fn slot(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Company => &mut self.company,
            FormField::Name => &mut self.name,
            FormField::Year => &mut self.year,
            FormField::FuelType => &mut self.fuel_type,
            FormField::KmsDriven => &mut self.kms_driven,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.company.trim().is_empty() {
            bail!("company is required -- choose a brand and retry");
        }
        if self.name.trim().is_empty() {
            bail!("car model is required -- choose a model and retry");
        }
        if self.year.trim().is_empty() {
            bail!("year is required -- choose a year and retry");
        }
        if self.fuel_type.trim().is_empty() {
            bail!("fuel type is required -- choose a fuel type and retry");
        }
        let kms = self.kms_driven.trim();
        if kms.is_empty() {
            bail!("kilometers driven is required -- enter a distance and retry");
        }
        let Some(value) = kms.parse::<f64>().ok().filter(|value| value.is_finite()) else {
            bail!("kilometers driven must be a number, got {kms:?}");
        };
        if value < 0.0 {
            bail!("kilometers driven cannot be negative");
        }
        if value.fract() != 0.0 {
            bail!("kilometers driven must be a whole number");
        }
        Ok(())
    }

    pub fn to_request(&self) -> Result<PredictionRequest> {
        self.validate()?;
        Ok(PredictionRequest {
            name: self.name.clone(),
            company: self.company.clone(),
            year: coerce_number(&self.year),
            kms_driven: coerce_number(&self.kms_driven),
            fuel_type: self.fuel_type.clone(),
        })
    }
}

/// Numeric coercion for form text: blank is zero, anything unparseable is NaN.
pub fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => f64::NAN,
    }
}
