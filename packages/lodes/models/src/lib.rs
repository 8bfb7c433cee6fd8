#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! LODES Workplace Area Characteristics (WAC) types.
//!
//! A WAC row counts jobs located in one Census block, broken down by
//! earnings, worker age, and NAICS sector. Blocks nest inside Block
//! Groups: the first 12 digits of a 15-digit block identifier are its
//! Block Group GEOID.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Length of a Census block identifier (state + county + tract + block).
pub const BLOCK_ID_LEN: usize = 15;

/// Length of the Block Group prefix of a block identifier.
pub const BLOCK_GROUP_ID_LEN: usize = 12;

/// Monthly earnings band of a job.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
pub enum EarningsBand {
    /// $1,250/month or less (`CE01`).
    E1,
    /// $1,251 to $3,333/month (`CE02`).
    E2,
    /// More than $3,333/month (`CE03`).
    E3,
}

/// Age band of the worker holding a job.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
pub enum AgeBand {
    /// 29 or younger (`CA01`).
    A1,
    /// 30 to 54 (`CA02`).
    A2,
    /// 55 or older (`CA03`).
    A3,
}

/// Two-digit NAICS sector of a job, in WAC column order (`CNS01`..`CNS20`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
pub enum Sector {
    /// Agriculture, forestry, fishing and hunting.
    #[serde(rename = "NAICS11")]
    #[strum(serialize = "NAICS11")]
    Agriculture,
    /// Mining, quarrying, and oil and gas extraction.
    #[serde(rename = "NAICS21")]
    #[strum(serialize = "NAICS21")]
    Mining,
    /// Utilities.
    #[serde(rename = "NAICS22")]
    #[strum(serialize = "NAICS22")]
    Utilities,
    /// Construction.
    #[serde(rename = "NAICS23")]
    #[strum(serialize = "NAICS23")]
    Construction,
    /// Manufacturing.
    #[serde(rename = "NAICS31_33")]
    #[strum(serialize = "NAICS31_33")]
    Manufacturing,
    /// Wholesale trade.
    #[serde(rename = "NAICS42")]
    #[strum(serialize = "NAICS42")]
    WholesaleTrade,
    /// Retail trade.
    #[serde(rename = "NAICS44_45")]
    #[strum(serialize = "NAICS44_45")]
    RetailTrade,
    /// Transportation and warehousing.
    #[serde(rename = "NAICS48_49")]
    #[strum(serialize = "NAICS48_49")]
    Transportation,
    /// Information.
    #[serde(rename = "NAICS51")]
    #[strum(serialize = "NAICS51")]
    Information,
    /// Finance and insurance.
    #[serde(rename = "NAICS52")]
    #[strum(serialize = "NAICS52")]
    Finance,
    /// Real estate and rental and leasing.
    #[serde(rename = "NAICS53")]
    #[strum(serialize = "NAICS53")]
    RealEstate,
    /// Professional, scientific, and technical services.
    #[serde(rename = "NAICS54")]
    #[strum(serialize = "NAICS54")]
    ProfessionalServices,
    /// Management of companies and enterprises.
    #[serde(rename = "NAICS55")]
    #[strum(serialize = "NAICS55")]
    Management,
    /// Administrative and support and waste management.
    #[serde(rename = "NAICS56")]
    #[strum(serialize = "NAICS56")]
    AdministrativeSupport,
    /// Educational services.
    #[serde(rename = "NAICS61")]
    #[strum(serialize = "NAICS61")]
    Education,
    /// Health care and social assistance.
    #[serde(rename = "NAICS62")]
    #[strum(serialize = "NAICS62")]
    HealthCare,
    /// Arts, entertainment, and recreation.
    #[serde(rename = "NAICS71")]
    #[strum(serialize = "NAICS71")]
    Arts,
    /// Accommodation and food services.
    #[serde(rename = "NAICS72")]
    #[strum(serialize = "NAICS72")]
    AccommodationFood,
    /// Other services (except public administration).
    #[serde(rename = "NAICS81")]
    #[strum(serialize = "NAICS81")]
    OtherServices,
    /// Public administration.
    #[serde(rename = "NAICS92")]
    #[strum(serialize = "NAICS92")]
    PublicAdministration,
}

/// Jobs located in a single Census block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// 15-digit Census block identifier (`w_geocode`).
    pub block_id: String,
    /// Total jobs (`C000`).
    pub total_jobs: u64,
    /// Jobs by earnings band.
    pub earnings: BTreeMap<EarningsBand, u64>,
    /// Jobs by worker age band.
    pub ages: BTreeMap<AgeBand, u64>,
    /// Jobs by NAICS sector.
    pub sectors: BTreeMap<Sector, u64>,
}

impl JobRecord {
    /// The Block Group GEOID this block belongs to, if the identifier is
    /// a well-formed 15-digit block id.
    #[must_use]
    pub fn block_group(&self) -> Option<&str> {
        if self.block_id.len() == BLOCK_ID_LEN && self.block_id.bytes().all(|b| b.is_ascii_digit())
        {
            Some(&self.block_id[..BLOCK_GROUP_ID_LEN])
        } else {
            None
        }
    }
}

/// Job counts summed over a set of blocks.
///
/// Every band and sector key is always present so consumers never have
/// to distinguish a missing key from zero jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTotals {
    /// Total jobs.
    pub total_jobs: u64,
    /// Jobs by earnings band.
    pub earnings_bands: BTreeMap<EarningsBand, u64>,
    /// Jobs by worker age band.
    pub age_bands: BTreeMap<AgeBand, u64>,
    /// Jobs by NAICS sector.
    pub by_sector: BTreeMap<Sector, u64>,
}

impl JobTotals {
    /// Totals with every key present and zero.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            total_jobs: 0,
            earnings_bands: EarningsBand::iter().map(|band| (band, 0)).collect(),
            age_bands: AgeBand::iter().map(|band| (band, 0)).collect(),
            by_sector: Sector::iter().map(|sector| (sector, 0)).collect(),
        }
    }

    /// Adds one record's counts into these totals.
    pub fn add(&mut self, record: &JobRecord) {
        self.total_jobs += record.total_jobs;
        for (band, count) in &record.earnings {
            *self.earnings_bands.entry(*band).or_insert(0) += count;
        }
        for (band, count) in &record.ages {
            *self.age_bands.entry(*band).or_insert(0) += count;
        }
        for (sector, count) in &record.sectors {
            *self.by_sector.entry(*sector).or_insert(0) += count;
        }
    }
}

impl Default for JobTotals {
    fn default() -> Self {
        Self::zero()
    }
}
