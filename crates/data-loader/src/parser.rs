//! Parsers for MovieLens rating and movie files.
//!
//! Two layouts are understood, chosen by file extension:
//! - `.dat` (MovieLens 1M): `userId::movieId::rating::timestamp` and
//!   `movieId::title::genres`, Latin-1 encoded, no header
//! - anything else is read as CSV with a header row:
//!   `userId,movieId,rating,timestamp` and `movieId,title,genres`
//!   (titles may be quoted and contain commas)
//!
//! Rows that cannot be parsed are dropped, never fatal. Each parser returns
//! the number of dropped rows next to the accepted records so callers can
//! surface it.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Label MovieLens uses for movies without any genre
const NO_GENRES_LABEL: &str = "(no genres listed)";

/// Records accepted from one file plus the count of rows that were dropped.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub dropped: usize,
}

impl<T> Parsed<T> {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            dropped: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Csv,
    Dat,
}

fn detect_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("dat") => FileFormat::Dat,
        _ => FileFormat::Csv,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Helper function to read a file with ISO-8859-1 encoding (Latin-1)
///
/// The MovieLens 1M dataset uses ISO-8859-1 encoding, not UTF-8. Every byte
/// maps directly to the Unicode code point of the same value.
fn read_lines_latin1(path: &Path) -> Result<Vec<String>> {
    let mut file = File::open(path).map_err(|_| DataLoadError::FileNotFound {
        path: path.display().to_string(),
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let content: String = bytes.iter().map(|&b| b as char).collect();

    Ok(content.lines().map(|s| s.to_string()).collect())
}

/// Run `parse_row` over every data row of `path`, dropping rows it rejects.
fn parse_rows<T>(
    path: &Path,
    parse_row: impl Fn(&[&str]) -> Result<T>,
) -> Result<Parsed<T>> {
    let file = file_name(path);
    let mut parsed = Parsed::new();

    match detect_format(path) {
        FileFormat::Dat => {
            for (idx, line) in read_lines_latin1(path)?.iter().enumerate() {
                let line_trimmed = line.trim();
                if line_trimmed.is_empty() {
                    continue;
                }
                let fields: Vec<&str> = line_trimmed.split("::").collect();
                match parse_row(&fields) {
                    Ok(record) => parsed.records.push(record),
                    Err(e) => {
                        debug!("Dropping line {} of {}: {}", idx + 1, file, e);
                        parsed.dropped += 1;
                    }
                }
            }
        }
        FileFormat::Csv => {
            if !path.exists() {
                return Err(DataLoadError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .from_path(path)
                .map_err(|source| DataLoadError::CsvError {
                    file: file.clone(),
                    source,
                })?;

            for (idx, record) in reader.records().enumerate() {
                let record = match record {
                    Ok(record) => record,
                    Err(source) if source.is_io_error() => {
                        return Err(DataLoadError::CsvError { file, source });
                    }
                    Err(e) => {
                        debug!("Dropping record {} of {}: {}", idx + 1, file, e);
                        parsed.dropped += 1;
                        continue;
                    }
                };
                let fields: Vec<&str> = record.iter().collect();
                match parse_row(&fields) {
                    Ok(record) => parsed.records.push(record),
                    Err(e) => {
                        debug!("Dropping record {} of {}: {}", idx + 1, file, e);
                        parsed.dropped += 1;
                    }
                }
            }
        }
    }

    if parsed.dropped > 0 {
        warn!(
            "Dropped {} malformed rows from {} ({} accepted)",
            parsed.dropped,
            file,
            parsed.records.len()
        );
    }
    Ok(parsed)
}

fn expect_fields(fields: &[&str], expected: usize) -> Result<()> {
    if fields.len() != expected {
        return Err(DataLoadError::InvalidValue {
            field: "field count".to_string(),
            value: format!("expected {} but found {}", expected, fields.len()),
        });
    }
    Ok(())
}

fn parse_field<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| DataLoadError::InvalidValue {
        field: name.to_string(),
        value: raw.to_string(),
    })
}

/// Parse one rating row; rejects values outside the declared scale
fn parse_rating_row(fields: &[&str], scale: RatingScale) -> Result<Rating> {
    expect_fields(fields, 4)?;
    let rating = Rating {
        user_id: parse_field("userId", fields[0])?,
        movie_id: parse_field("movieId", fields[1])?,
        rating: parse_field("rating", fields[2])?,
        timestamp: parse_field("timestamp", fields[3])?,
    };
    if !scale.contains(rating.rating) {
        return Err(DataLoadError::InvalidValue {
            field: "rating".to_string(),
            value: rating.rating.to_string(),
        });
    }
    Ok(rating)
}

/// Parse one movie row
fn parse_movie_row(fields: &[&str]) -> Result<Movie> {
    expect_fields(fields, 3)?;
    let title = fields[1].trim();
    if title.is_empty() {
        return Err(DataLoadError::InvalidValue {
            field: "title".to_string(),
            value: String::new(),
        });
    }
    Ok(Movie {
        id: parse_field("movieId", fields[0])?,
        title: title.to_string(),
        year: extract_year_from_title(title),
        genres: parse_genres(fields[2]),
    })
}

/// Parse a ratings file
///
/// Format: userId, movieId, rating, timestamp
pub fn parse_ratings(path: &Path, scale: RatingScale) -> Result<Parsed<Rating>> {
    parse_rows(path, |fields| parse_rating_row(fields, scale))
}

/// Parse a movies file
///
/// Format: movieId, title, genres
///
/// The title often includes year in parentheses: "Toy Story (1995)"
/// Genres are pipe-separated: "Animation|Children's|Comedy"
pub fn parse_movies(path: &Path) -> Result<Parsed<Movie>> {
    parse_rows(path, parse_movie_row)
}

/// Extract year from movie title
///
/// Example: "Toy Story (1995)" -> Some(1995)
///          "Movie Title" -> None
fn extract_year_from_title(title: &str) -> Option<u16> {
    let start = title.rfind('(')?;
    let end = title.rfind(')')?;
    if start < end {
        let year_str = &title[start + 1..end];
        if let Ok(year) = year_str.trim().parse::<u16>() {
            return Some(year);
        }
    }
    None
}

/// Parse pipe-separated genres into a label set
///
/// Example: "Action|Adventure|Sci-Fi" -> {"Action", "Adventure", "Sci-Fi"}
fn parse_genres(s: &str) -> BTreeSet<String> {
    s.split('|')
        .map(str::trim)
        .filter(|label| !label.is_empty() && *label != NO_GENRES_LABEL)
        .map(str::to_string)
        .collect()
}
