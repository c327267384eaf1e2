use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field as ArrowField, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

use policy_survey::data::loader::load_file;
use policy_survey::data::model::{AgeGroup, Education, Gender, Income, Race, Respondent};

/// Write a synthetic policy-survey dataset.
#[derive(Debug, Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// Number of respondents.
    #[arg(long, default_value_t = 2000)]
    rows: usize,

    /// PRNG seed; the same seed always yields the same file.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output file (`.csv` or `.parquet`).
    #[arg(long, default_value = "data/policy_survey_data.csv")]
    output: PathBuf,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Draw from `values` with the given relative weights.
    fn weighted<T: Copy>(&mut self, values: &[T], weights: &[f64]) -> T {
        let total: f64 = weights.iter().sum();
        let mut target = self.next_f64() * total;
        for (v, w) in values.iter().zip(weights) {
            if target < *w {
                return *v;
            }
            target -= w;
        }
        values[values.len() - 1]
    }
}

// Rough US adult population shares, in each enum's declaration order.
const AGE_WEIGHTS: [f64; 4] = [0.21, 0.26, 0.33, 0.20];
const GENDER_WEIGHTS: [f64; 3] = [0.48, 0.50, 0.02];
const RACE_WEIGHTS: [f64; 5] = [0.60, 0.13, 0.18, 0.06, 0.03];
const EDUCATION_WEIGHTS: [f64; 4] = [0.37, 0.26, 0.23, 0.14];
const INCOME_WEIGHTS: [f64; 5] = [0.22, 0.24, 0.25, 0.16, 0.13];

/// Log-odds of support for a respondent profile.
fn support_logit(age: AgeGroup, gender: Gender, race: Race, education: Education, income: Income) -> f64 {
    let age = match age {
        AgeGroup::From18To29 => 0.6,
        AgeGroup::From30To44 => 0.3,
        AgeGroup::From45To64 => -0.1,
        AgeGroup::Over65 => -0.4,
    };
    let gender = match gender {
        Gender::Male => -0.2,
        Gender::Female => 0.2,
        Gender::NonBinary => 0.5,
    };
    let race = match race {
        Race::White => -0.1,
        Race::Black => 0.4,
        Race::Hispanic => 0.3,
        Race::Asian => 0.1,
        Race::Other => 0.0,
    };
    let education = match education {
        Education::HighSchoolOrLess => -0.2,
        Education::SomeCollege => 0.0,
        Education::Bachelors => 0.2,
        Education::Graduate => 0.4,
    };
    let income = match income {
        Income::Under30k => 0.3,
        Income::From30kTo60k => 0.1,
        Income::From60kTo100k => 0.0,
        Income::From100kTo150k => -0.1,
        Income::Over150k => -0.3,
    };
    -0.1 + age + gender + race + education + income
}

fn generate(rows: usize, seed: u64) -> Vec<Respondent> {
    let mut rng = SimpleRng::new(seed);
    (0..rows)
        .map(|i| {
            let age_group = rng.weighted(AgeGroup::ALL, &AGE_WEIGHTS);
            let gender = rng.weighted(Gender::ALL, &GENDER_WEIGHTS);
            let race = rng.weighted(Race::ALL, &RACE_WEIGHTS);
            let education = rng.weighted(Education::ALL, &EDUCATION_WEIGHTS);
            let income = rng.weighted(Income::ALL, &INCOME_WEIGHTS);
            let p = 1.0 / (1.0 + (-support_logit(age_group, gender, race, education, income)).exp());
            Respondent {
                id: i as i64 + 1,
                age_group,
                gender,
                race,
                education,
                income,
                supports_policy: rng.next_f64() < p,
            }
        })
        .collect()
}

/// Column order of `Respondent`'s serde fields.
const CSV_HEADER: [&str; 7] = [
    "id",
    "age_group",
    "gender",
    "race",
    "education",
    "income",
    "supports_policy",
];

fn write_csv(path: &Path, respondents: &[Respondent]) -> Result<()> {
    // Header written by hand: `serialize` only emits one alongside the first row.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .context("creating CSV")?;
    writer.write_record(CSV_HEADER).context("writing CSV header")?;
    for r in respondents {
        writer.serialize(r).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_parquet(path: &Path, respondents: &[Respondent]) -> Result<()> {
    let labels = |f: fn(&Respondent) -> &'static str| -> ArrayRef {
        Arc::new(StringArray::from(respondents.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        ArrowField::new("id", DataType::Int64, false),
        ArrowField::new("age_group", DataType::Utf8, false),
        ArrowField::new("gender", DataType::Utf8, false),
        ArrowField::new("race", DataType::Utf8, false),
        ArrowField::new("education", DataType::Utf8, false),
        ArrowField::new("income", DataType::Utf8, false),
        ArrowField::new("supports_policy", DataType::Boolean, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(respondents.iter().map(|r| r.id))),
            labels(|r| r.age_group.label()),
            labels(|r| r.gender.label()),
            labels(|r| r.race.label()),
            labels(|r| r.education.label()),
            labels(|r| r.income.label()),
            Arc::new(BooleanArray::from(
                respondents.iter().map(|r| r.supports_policy).collect::<Vec<_>>(),
            )),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(dir) = args.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let respondents = generate(args.rows, args.seed);

    let is_parquet = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        write_parquet(&args.output, &respondents)?;
    } else {
        write_csv(&args.output, &respondents)?;
    }

    // The server must be able to load whatever we write.
    let check = load_file(&args.output)
        .with_context(|| format!("re-reading {}", args.output.display()))?;
    let supporters = respondents.iter().filter(|r| r.supports_policy).count();

    println!(
        "Wrote {} respondents ({:.1}% support) to {}",
        check.len(),
        100.0 * supporters as f64 / respondents.len().max(1) as f64,
        args.output.display()
    );
    Ok(())
}
