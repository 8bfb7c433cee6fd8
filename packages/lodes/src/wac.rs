//! LODES8 Workplace Area Characteristics CSV parsing.
//!
//! WAC files are published per state and year as gzipped CSV with one
//! row per block. Only the job count columns are read; race, ethnicity,
//! education and firm columns are ignored.

use std::collections::BTreeMap;
use std::io::Read;

use grid_stats_lodes_models::{AgeBand, BLOCK_ID_LEN, EarningsBand, JobRecord, Sector};
use serde::Deserialize;

use crate::LodesError;

/// File name of the all-jobs (`S000`, `JT00`) WAC file for a state and year.
#[must_use]
pub fn wac_file_name(state_abbr: &str, year: u16) -> String {
    format!(
        "{}_wac_S000_JT00_{year}.csv.gz",
        state_abbr.to_ascii_lowercase()
    )
}

#[derive(Debug, Deserialize)]
struct WacRow {
    w_geocode: String,
    #[serde(rename = "C000")]
    c000: u64,
    #[serde(rename = "CA01")]
    ca01: u64,
    #[serde(rename = "CA02")]
    ca02: u64,
    #[serde(rename = "CA03")]
    ca03: u64,
    #[serde(rename = "CE01")]
    ce01: u64,
    #[serde(rename = "CE02")]
    ce02: u64,
    #[serde(rename = "CE03")]
    ce03: u64,
    #[serde(rename = "CNS01")]
    cns01: u64,
    #[serde(rename = "CNS02")]
    cns02: u64,
    #[serde(rename = "CNS03")]
    cns03: u64,
    #[serde(rename = "CNS04")]
    cns04: u64,
    #[serde(rename = "CNS05")]
    cns05: u64,
    #[serde(rename = "CNS06")]
    cns06: u64,
    #[serde(rename = "CNS07")]
    cns07: u64,
    #[serde(rename = "CNS08")]
    cns08: u64,
    #[serde(rename = "CNS09")]
    cns09: u64,
    #[serde(rename = "CNS10")]
    cns10: u64,
    #[serde(rename = "CNS11")]
    cns11: u64,
    #[serde(rename = "CNS12")]
    cns12: u64,
    #[serde(rename = "CNS13")]
    cns13: u64,
    #[serde(rename = "CNS14")]
    cns14: u64,
    #[serde(rename = "CNS15")]
    cns15: u64,
    #[serde(rename = "CNS16")]
    cns16: u64,
    #[serde(rename = "CNS17")]
    cns17: u64,
    #[serde(rename = "CNS18")]
    cns18: u64,
    #[serde(rename = "CNS19")]
    cns19: u64,
    #[serde(rename = "CNS20")]
    cns20: u64,
}

impl WacRow {
    fn into_record(self) -> Result<JobRecord, LodesError> {
        let block_id = normalize_block_id(&self.w_geocode)?;

        let sectors = [
            (Sector::Agriculture, self.cns01),
            (Sector::Mining, self.cns02),
            (Sector::Utilities, self.cns03),
            (Sector::Construction, self.cns04),
            (Sector::Manufacturing, self.cns05),
            (Sector::WholesaleTrade, self.cns06),
            (Sector::RetailTrade, self.cns07),
            (Sector::Transportation, self.cns08),
            (Sector::Information, self.cns09),
            (Sector::Finance, self.cns10),
            (Sector::RealEstate, self.cns11),
            (Sector::ProfessionalServices, self.cns12),
            (Sector::Management, self.cns13),
            (Sector::AdministrativeSupport, self.cns14),
            (Sector::Education, self.cns15),
            (Sector::HealthCare, self.cns16),
            (Sector::Arts, self.cns17),
            (Sector::AccommodationFood, self.cns18),
            (Sector::OtherServices, self.cns19),
            (Sector::PublicAdministration, self.cns20),
        ];

        Ok(JobRecord {
            block_id,
            total_jobs: self.c000,
            earnings: BTreeMap::from([
                (EarningsBand::E1, self.ce01),
                (EarningsBand::E2, self.ce02),
                (EarningsBand::E3, self.ce03),
            ]),
            ages: BTreeMap::from([
                (AgeBand::A1, self.ca01),
                (AgeBand::A2, self.ca02),
                (AgeBand::A3, self.ca03),
            ]),
            sectors: BTreeMap::from(sectors),
        })
    }
}

/// Restores leading zeros stripped by spreadsheet round-trips.
fn normalize_block_id(raw: &str) -> Result<String, LodesError> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.len() > BLOCK_ID_LEN
        || !trimmed.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(LodesError::InvalidBlockId {
            block_id: raw.to_string(),
        });
    }
    Ok(format!("{trimmed:0>BLOCK_ID_LEN$}"))
}

/// Parses WAC CSV rows from any `Read` source.
///
/// Malformed rows are skipped; I/O failures abort the parse.
///
/// # Errors
///
/// Returns [`LodesError::Csv`] if the underlying reader fails.
pub fn parse_wac(reader: impl Read) -> Result<Vec<JobRecord>, LodesError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let mut records = Vec::new();
    let mut skipped = 0u64;

    for result in csv_reader.deserialize::<WacRow>() {
        let row = match result {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                log::trace!("  skipping malformed WAC row: {e}");
                skipped += 1;
                continue;
            }
        };

        match row.into_record() {
            Ok(record) => records.push(record),
            Err(e) => {
                log::trace!("  skipping WAC row: {e}");
                skipped += 1;
            }
        }
    }

    log::info!(
        "Parsed {} WAC records ({skipped} skipped)",
        records.len()
    );

    Ok(records)
}

/// Parses a gzipped WAC file, as distributed by LODES.
///
/// # Errors
///
/// Returns an error if decompression or reading fails.
pub fn parse_wac_gz(reader: impl Read) -> Result<Vec<JobRecord>, LodesError> {
    parse_wac(flate2::read::GzDecoder::new(reader))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "w_geocode,C000,CA01,CA02,CA03,CE01,CE02,CE03,\
CNS01,CNS02,CNS03,CNS04,CNS05,CNS06,CNS07,CNS08,CNS09,CNS10,\
CNS11,CNS12,CNS13,CNS14,CNS15,CNS16,CNS17,CNS18,CNS19,CNS20,CR01,createdate";

    fn sample() -> String {
        format!(
            "{HEADER}\n\
250250101011000,12,3,7,2,2,4,6,1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,11,0,0,0,0,12,20230823\n\
10010201001000,5,1,3,1,1,1,3,0,5,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,5,20230823\n\
badrow,x,y\n"
        )
    }

    #[test]
    fn parses_rows_and_skips_malformed() {
        let records = parse_wac(sample().as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.block_id, "250250101011000");
        assert_eq!(first.total_jobs, 12);
        assert_eq!(first.earnings[&EarningsBand::E3], 6);
        assert_eq!(first.ages[&AgeBand::A2], 7);
        assert_eq!(first.sectors[&Sector::Agriculture], 1);
        assert_eq!(first.sectors[&Sector::HealthCare], 11);
    }

    #[test]
    fn pads_short_block_ids() {
        let records = parse_wac(sample().as_bytes()).unwrap();
        assert_eq!(records[1].block_id, "010010201001000");
        assert_eq!(records[1].block_group(), Some("010010201001"));
        assert_eq!(records[1].sectors[&Sector::Mining], 5);
    }

    #[test]
    fn parses_gzipped_input() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(sample().as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let records = parse_wac_gz(compressed.as_slice()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn rejects_non_numeric_block_ids() {
        assert!(normalize_block_id("25025A").is_err());
        assert!(normalize_block_id("").is_err());
        assert!(normalize_block_id("1234567890123456").is_err());
        assert_eq!(normalize_block_id(" 42 ").unwrap(), "000000000000042");
    }

    #[test]
    fn file_names() {
        assert_eq!(wac_file_name("MA", 2022), "ma_wac_S000_JT00_2022.csv.gz");
        assert_eq!(wac_file_name("ri", 2021), "ri_wac_S000_JT00_2021.csv.gz");
    }
}
