// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Header of the cleaned listings export the client consumes.
pub const HEADER: &str = "Unnamed: 0,name,company,year,Price,kms_driven,fuel_type";

const CATALOG: [(&str, &[&str]); 8] = [
    (
        "Maruti",
        &[
            "Maruti Suzuki Swift",
            "Maruti Suzuki Alto",
            "Maruti Suzuki Wagon",
            "Maruti Suzuki Dzire",
            "Maruti Suzuki Ertiga",
        ],
    ),
    (
        "Hyundai",
        &["Hyundai i20 Sportz", "Hyundai Verna Fluidic", "Hyundai Creta 1.6"],
    ),
    ("Honda", &["Honda City", "Honda Amaze", "Honda Jazz"]),
    ("Toyota", &["Toyota Innova 2.5", "Toyota Corolla Altis", "Toyota Etios Liva"]),
    ("Mahindra", &["Mahindra Scorpio S10", "Mahindra XUV500 W8", "Mahindra Bolero DI"]),
    ("Tata", &["Tata Indica V2", "Tata Nano Cx", "Tata Zest XM"]),
    ("Ford", &["Ford EcoSport Titanium", "Ford Figo Duratorq"]),
    ("Renault", &["Renault Kwid RXT", "Renault Duster 110"]),
];

const FUEL_TYPES: [&str; 3] = ["Petrol", "Diesel", "LPG"];

const MIN_YEAR: i32 = 1995;
const MAX_YEAR: i32 = 2019;

const SAMPLE_CSV: &str = "\
Unnamed: 0,name,company,year,Price,kms_driven,fuel_type
0,Hyundai Santro Xing,Hyundai,2007,80000,45000,Petrol
1,Mahindra Jeep CL550,Mahindra,2006,425000,40,Diesel
2,Hyundai Grand i10,Hyundai,2014,325000,28000,Petrol
3,Ford EcoSport Titanium,Ford,2014,575000,36000,Diesel
4,Ford Figo,Ford,2012,175000,41000,Diesel
5,Maruti Suzuki Swift,Maruti,2019,300000,12000,Petrol
6,Honda City,Honda,2015,500000,40000,Petrol
7,Honda Amaze,Honda,2016,430000,32000,Diesel
8,Toyota Innova 2.5,Toyota,2011,650000,90000,Diesel
9,Maruti Suzuki Alto,Maruti,2010,110000,60000,LPG
10,Honda City,Honda,2013,390000,55000,Petrol
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub name: String,
    pub company: String,
    pub year: i32,
    pub price: i64,
    pub kms_driven: i64,
    pub fuel_type: String,
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of plausible used-car listings.
#[derive(Debug, Clone)]
pub struct CarFaker {
    rng: DeterministicRng,
}

impl CarFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn listing(&mut self) -> Listing {
        let (company, models) = CATALOG[self.rng.int_n(CATALOG.len())];
        let name = models[self.rng.int_n(models.len())];
        let year = self.int_range(i64::from(MIN_YEAR), i64::from(MAX_YEAR)) as i32;
        let age = i64::from(MAX_YEAR - year);
        Listing {
            name: name.to_owned(),
            company: company.to_owned(),
            year,
            price: self.int_range(60_000, 1_500_000) / (age + 1),
            kms_driven: self.int_range(0, 20_000) * (age + 1),
            fuel_type: FUEL_TYPES[self.rng.int_n(FUEL_TYPES.len())].to_owned(),
        }
    }

    pub fn listings(&mut self, count: usize) -> Vec<Listing> {
        (0..count).map(|_| self.listing()).collect()
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }
}

pub fn to_csv(listings: &[Listing]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for (index, listing) in listings.iter().enumerate() {
        let _ = writeln!(
            out,
            "{index},{},{},{},{},{},{}",
            listing.name,
            listing.company,
            listing.year,
            listing.price,
            listing.kms_driven,
            listing.fuel_type,
        );
    }
    out
}

/// Small hand-written dataset with a repeated model and every fuel type.
pub fn sample_csv() -> &'static str {
    SAMPLE_CSV
}

pub fn companies() -> Vec<&'static str> {
    CATALOG.iter().map(|(company, _)| *company).collect()
}

pub fn fuel_types() -> &'static [&'static str] {
    &FUEL_TYPES
}

pub fn temp_dataset(text: &str) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("Cleaned_Car.csv");
    std::fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
    Ok((dir, path))
}
