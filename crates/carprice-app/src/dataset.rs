// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Rows with fewer columns than this are skipped rather than rejected.
pub const MIN_COLUMNS: usize = 7;

const NAME_COLUMN: usize = 1;
const COMPANY_COLUMN: usize = 2;
const YEAR_COLUMN: usize = 3;
const FUEL_TYPE_COLUMN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRow {
    pub name: String,
    pub company: String,
    pub year: String,
    pub fuel_type: String,
}

impl DatasetRow {
    fn from_record(record: &StringRecord) -> Option<Self> {
        if record.len() < MIN_COLUMNS {
            return None;
        }
        let field = |index: usize| record.get(index).unwrap_or_default().trim().to_owned();
        Some(Self {
            name: field(NAME_COLUMN),
            company: field(COMPANY_COLUMN),
            year: field(YEAR_COLUMN),
            fuel_type: field(FUEL_TYPE_COLUMN),
        })
    }
}

/// Lookup tables derived from one pass over the dataset.
///
/// Companies and fuel types are ascending; years are numerically descending.
/// Models are kept as the source-ordered association list and filtered per
/// company on demand.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatasetIndex {
    rows: Vec<DatasetRow>,
    companies: Vec<String>,
    years: Vec<String>,
    fuel_types: Vec<String>,
    skipped: usize,
}

impl DatasetIndex {
    pub fn parse(text: &str) -> Result<Self> {
        let (rows, skipped) = read_rows(text)?;
        let mut index = Self::from_rows(rows);
        index.skipped = skipped;
        tracing::debug!(
            rows = index.rows.len(),
            skipped,
            companies = index.companies.len(),
            "indexed dataset"
        );
        Ok(index)
    }

    pub fn from_rows(rows: Vec<DatasetRow>) -> Self {
        let mut companies = BTreeSet::new();
        let mut years = BTreeSet::new();
        let mut fuel_types = BTreeSet::new();
        for row in &rows {
            if !row.company.is_empty() {
                companies.insert(row.company.clone());
            }
            if !row.year.is_empty() {
                years.insert(row.year.clone());
            }
            if !row.fuel_type.is_empty() {
                fuel_types.insert(row.fuel_type.clone());
            }
        }

        let mut years: Vec<String> = years.into_iter().collect();
        years.sort_by(|left, right| compare_years_descending(left, right));

        Self {
            rows,
            companies: companies.into_iter().collect(),
            years,
            fuel_types: fuel_types.into_iter().collect(),
            skipped: 0,
        }
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn companies(&self) -> &[String] {
        &self.companies
    }

    pub fn years(&self) -> &[String] {
        &self.years
    }

    pub fn fuel_types(&self) -> &[String] {
        &self.fuel_types
    }

    /// Number of data lines dropped for having too few columns.
    pub fn skipped_rows(&self) -> usize {
        self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Model names for `company` in source order, first occurrence only.
    pub fn models_for(&self, company: &str) -> Vec<&str> {
        if company.is_empty() {
            return Vec::new();
        }
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .filter(|row| row.company == company && !row.name.is_empty())
            .filter(|row| seen.insert(row.name.as_str()))
            .map(|row| row.name.as_str())
            .collect()
    }
}

pub fn parse_rows(text: &str) -> Result<Vec<DatasetRow>> {
    read_rows(text).map(|(rows, _)| rows)
}

fn read_rows(text: &str) -> Result<(Vec<DatasetRow>, usize)> {
    // Embedded commas are not escaped in the source data, so quoting stays off
    // and every comma is a column boundary.
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut skipped = 0;
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("read dataset line {}", line + 2))?;
        match DatasetRow::from_record(&record) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }
    Ok((rows, skipped))
}

fn numeric_year(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|year| year.is_finite())
}

fn compare_years_descending(left: &str, right: &str) -> Ordering {
    match (numeric_year(left), numeric_year(right)) {
        (Some(left_year), Some(right_year)) => right_year
            .partial_cmp(&left_year)
            .unwrap_or(Ordering::Equal)
            .then_with(|| left.cmp(right)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => left.cmp(right),
    }
}
