use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{
    AgeGroup, Education, Field, Gender, Income, Race, Respondent, SurveyDataset,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a survey file could not be turned into a [`SurveyDataset`].
///
/// Rows are numbered from 1 (first data row after any header).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Structural problem with the file layout.
    #[error("{0}")]
    Format(String),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: missing value for '{column}'")]
    MissingValue { row: usize, column: &'static str },

    #[error("row {row}: '{value}' is not a valid {column}")]
    InvalidCell {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error(
        "row {row}: '{value}' is not a recognised {field} (expected one of: {})",
        field.labels().join(", ")
    )]
    InvalidCategory {
        row: usize,
        field: Field,
        value: String,
    },

    #[error("duplicate id {id} (rows {first_row} and {row})")]
    DuplicateId {
        id: i64,
        first_row: usize,
        row: usize,
    },
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a survey dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row naming the seven survey columns (recommended)
/// * `.json`    – `[{ "id": 1, "gender": "Female", ... }, ...]`
/// * `.parquet` – one column per survey field
///
/// Loading is all-or-nothing: the first bad row aborts the load.
pub fn load_file(path: &Path) -> Result<SurveyDataset, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Schema columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Id,
    Category(Field),
    Support,
}

impl Column {
    const ALL: [Column; 7] = [
        Column::Id,
        Column::Category(Field::AgeGroup),
        Column::Category(Field::Gender),
        Column::Category(Field::Race),
        Column::Category(Field::Education),
        Column::Category(Field::Income),
        Column::Support,
    ];

    fn name(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Category(field) => field.name(),
            Column::Support => "supports_policy",
        }
    }

    /// Alternate header name. Older exports call the support column
    /// `policy_support`.
    fn alias(self) -> Option<&'static str> {
        match self {
            Column::Support => Some("policy_support"),
            _ => None,
        }
    }

    fn accepts(self, header: &str) -> bool {
        header == self.name() || self.alias() == Some(header)
    }

    /// Position in [`Column::ALL`].
    fn slot(self) -> usize {
        match self {
            Column::Id => 0,
            Column::Category(Field::AgeGroup) => 1,
            Column::Category(Field::Gender) => 2,
            Column::Category(Field::Race) => 3,
            Column::Category(Field::Education) => 4,
            Column::Category(Field::Income) => 5,
            Column::Support => 6,
        }
    }
}

/// Source index of every schema column, by [`Column::slot`].
struct ColumnLayout([usize; 7]);

impl ColumnLayout {
    fn resolve<'a, I>(headers: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut indices: [Option<usize>; 7] = [None; 7];
        for (i, header) in headers.into_iter().enumerate() {
            for column in Column::ALL {
                if !column.accepts(header) {
                    continue;
                }
                let slot = &mut indices[column.slot()];
                if let Some(first) = *slot {
                    return Err(LoadError::Format(format!(
                        "ambiguous header: '{header}' (column {}) repeats '{}' (column {})",
                        i + 1,
                        column.name(),
                        first + 1
                    )));
                }
                *slot = Some(i);
            }
        }

        let mut resolved = [0usize; 7];
        for column in Column::ALL {
            resolved[column.slot()] = indices[column.slot()]
                .ok_or(LoadError::MissingColumn(column.name()))?;
        }
        Ok(ColumnLayout(resolved))
    }

    fn index(&self, column: Column) -> usize {
        self.0[column.slot()]
    }
}

// ---------------------------------------------------------------------------
// Row parsing shared by all formats
// ---------------------------------------------------------------------------

/// Build one respondent from a cell accessor. `cell` yields the raw text for
/// each schema column.
fn parse_respondent<F, S>(row: usize, cell: F) -> Result<Respondent, LoadError>
where
    F: Fn(Column) -> Result<S, LoadError>,
    S: AsRef<str>,
{
    let id_text = cell(Column::Id)?;
    let id = id_text
        .as_ref()
        .parse::<i64>()
        .map_err(|_| LoadError::InvalidCell {
            row,
            column: Column::Id.name(),
            value: id_text.as_ref().to_string(),
        })?;

    let support_text = cell(Column::Support)?;
    let supports_policy =
        parse_bool(support_text.as_ref()).ok_or_else(|| LoadError::InvalidCell {
            row,
            column: Column::Support.name(),
            value: support_text.as_ref().to_string(),
        })?;

    Ok(Respondent {
        id,
        age_group: categorical(row, Field::AgeGroup, &cell, AgeGroup::from_label)?,
        gender: categorical(row, Field::Gender, &cell, Gender::from_label)?,
        race: categorical(row, Field::Race, &cell, Race::from_label)?,
        education: categorical(row, Field::Education, &cell, Education::from_label)?,
        income: categorical(row, Field::Income, &cell, Income::from_label)?,
        supports_policy,
    })
}

fn categorical<T, F, S>(
    row: usize,
    field: Field,
    cell: &F,
    from_label: fn(&str) -> Option<T>,
) -> Result<T, LoadError>
where
    F: Fn(Column) -> Result<S, LoadError>,
    S: AsRef<str>,
{
    let raw = cell(Column::Category(field))?;
    from_label(raw.as_ref()).ok_or_else(|| LoadError::InvalidCategory {
        row,
        field,
        value: raw.as_ref().to_string(),
    })
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one respondent per row.
/// Surrounding whitespace is trimmed; extra columns are ignored.
fn load_csv(path: &Path) -> Result<SurveyDataset, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    let layout = ColumnLayout::resolve(headers.iter())?;

    let mut respondents = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row = i + 1;
        let respondent = parse_respondent(row, |column| {
            Ok(record.get(layout.index(column)).unwrap_or(""))
        })?;
        respondents.push(respondent);
    }

    log::debug!("parsed {} CSV rows from {}", respondents.len(), path.display());
    SurveyDataset::from_respondents(respondents)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "id": 1, "age_group": "18-29", "gender": "Female", "race": "Asian",
///     "education": "Graduate", "income": "60-100k", "supports_policy": true },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<SurveyDataset, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let records = root
        .as_array()
        .ok_or_else(|| LoadError::Format("expected top-level JSON array".into()))?;

    let mut respondents = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let row = i + 1;
        let obj = rec
            .as_object()
            .ok_or_else(|| LoadError::Format(format!("row {row} is not a JSON object")))?;

        let respondent = parse_respondent(row, |column| {
            let value = obj
                .get(column.name())
                .or_else(|| column.alias().and_then(|alias| obj.get(alias)));
            match value {
                None | Some(JsonValue::Null) => Err(LoadError::MissingValue {
                    row,
                    column: column.name(),
                }),
                Some(v) => Ok(json_to_text(v)),
            }
        })?;
        respondents.push(respondent);
    }

    SurveyDataset::from_respondents(respondents)
}

fn json_to_text(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one column per survey field.
///
/// Categorical columns may be Utf8, LargeUtf8 or dictionary-encoded strings;
/// `id` any integer type; `supports_policy` Boolean or 0/1 integers.
fn load_parquet(path: &Path) -> Result<SurveyDataset, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    // A file without row groups yields no batches; check the schema itself.
    let layout = ColumnLayout::resolve(
        builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().as_str()),
    )?;
    let reader = builder.build()?;

    let mut respondents = Vec::new();
    let mut row = 0usize;

    for batch_result in reader {
        let batch = batch_result?;

        let columns: Vec<ArrayRef> = Column::ALL
            .iter()
            .map(|c| batch.column(layout.index(*c)).clone())
            .collect();

        for batch_row in 0..batch.num_rows() {
            row += 1;
            let respondent = parse_respondent(row, |column| {
                let array = &columns[column.slot()];
                if array.is_null(batch_row) {
                    return Err(LoadError::MissingValue {
                        row,
                        column: column.name(),
                    });
                }
                Ok(array_value_to_string(array.as_ref(), batch_row)?)
            })?;
            respondents.push(respondent);
        }
    }

    SurveyDataset::from_respondents(respondents)
}
