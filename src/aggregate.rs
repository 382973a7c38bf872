//! Derived summaries over the ledger: grouped arithmetic means and the
//! flat-file exports downstream reporting reads.
//!
//! Everything here is a pure function of the ledger contents: re-running
//! produces identical files. Null values are skipped, and a grouping key
//! with no valid values produces no output row at all.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::database_ops::db::Db;
use crate::database_ops::ledger::{scan_daily_temperatures, scan_movies, CityDay, MovieRecord};
use crate::normalization::year::truncate_year;

/// Mean temperature per (city, year), skipping days without a reading.
pub fn yearly_means(rows: &[CityDay]) -> BTreeMap<(String, i32), f64> {
    rows.iter()
        .filter_map(|row| {
            let year = truncate_year(&row.date)?;
            let value = row.temperature_c?;
            Some(((row.city.clone(), year), value))
        })
        .into_group_map()
        .into_iter()
        .map(|(key, values)| {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            (key, mean)
        })
        .collect()
}

/// Mean box office per release year; movies missing either field are skipped.
pub fn box_office_by_year(movies: &[MovieRecord]) -> BTreeMap<i32, f64> {
    movies
        .iter()
        .filter_map(|movie| Some((movie.year?, movie.box_office? as f64)))
        .into_group_map()
        .into_iter()
        .map(|(year, values)| {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            (year, mean)
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct AggregateReport {
    pub temperature_groups: usize,
    pub box_office_years: usize,
    pub movies_exported: usize,
}

impl AggregateReport {
    pub fn print_summary(&self, out_dir: &Path) {
        println!(
            "[aggregate] summaries written temperature_groups={} box_office_years={} movies_exported={} dir={}",
            self.temperature_groups,
            self.box_office_years,
            self.movies_exported,
            out_dir.display(),
        );
    }
}

/// Read the whole ledger and write every summary file under `out_dir`.
pub async fn run_aggregate(db: &Db, out_dir: &Path) -> Result<AggregateReport> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output dir {}", out_dir.display()))?;

    let days = scan_daily_temperatures(db).await?;
    let means = yearly_means(&days);
    write_temperature_csv(&out_dir.join("yearly_temperature_means.csv"), &means)?;

    let movies = scan_movies(db).await?;
    let by_year = box_office_by_year(&movies);
    write_box_office_csv(&out_dir.join("box_office_by_year.csv"), &by_year)?;
    write_movies_export(&out_dir.join("movies_export.csv"), &movies)?;
    write_text_report(&out_dir.join("analysis_results.txt"), &means, &by_year)?;

    Ok(AggregateReport {
        temperature_groups: means.len(),
        box_office_years: by_year.len(),
        movies_exported: movies.len(),
    })
}

fn write_temperature_csv(path: &Path, means: &BTreeMap<(String, i32), f64>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    writer.write_record(["city", "year", "avg_temp_c"])?;
    for ((city, year), mean) in means {
        writer.write_record([city.clone(), year.to_string(), format!("{mean:.2}")])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_box_office_csv(path: &Path, by_year: &BTreeMap<i32, f64>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    writer.write_record(["year", "avg_box_office_usd"])?;
    for (year, mean) in by_year {
        writer.write_record([year.to_string(), format!("{mean:.2}")])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_movies_export(path: &Path, movies: &[MovieRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    writer.write_record(["Title", "Box Office", "Genres", "Year"])?;
    for movie in movies {
        writer.write_record([
            movie.title.clone(),
            movie.box_office.map(|v| v.to_string()).unwrap_or_default(),
            movie.genres.clone().unwrap_or_default(),
            movie.year.map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Human-readable report: a "City:" block per city with one "year: value °C"
/// line each, then the box-office section. Downstream scripts grep these
/// lines, so the shape is part of the contract.
fn write_text_report(
    path: &Path,
    means: &BTreeMap<(String, i32), f64>,
    by_year: &BTreeMap<i32, f64>,
) -> Result<()> {
    let mut out = String::new();
    let mut current_city: Option<&str> = None;
    for ((city, year), mean) in means {
        if current_city != Some(city.as_str()) {
            out.push_str(&format!("City: {city}\n"));
            current_city = Some(city.as_str());
        }
        out.push_str(&format!("{year}: {mean:.2} °C\n"));
    }
    out.push_str("\nAverage box office by year\n");
    for (year, mean) in by_year {
        out.push_str(&format!("{year}: ${mean:.2}\n"));
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
