use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, ListBuilder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use starnet_select::columns;

const STARS: usize = 5000;
const LOCATIONS: [&str; 4] = ["4102", "4240", "5093", "apogee_n"];

/// Deterministic splitmix64 stream, so the same seed always writes the same survey.
struct SurveyRng(u64);

impl SurveyRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * f64::EPSILON / 2.0
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.unit()
    }

    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let r = (-2.0 * self.unit().max(f64::MIN_POSITIVE).ln()).sqrt();
        let theta = std::f64::consts::TAU * self.unit();
        mean + std_dev * r * theta.cos()
    }

    fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }
}

/// A 2MASS-style designation from sky coordinates.
fn designation(rng: &mut SurveyRng) -> String {
    let ra = rng.uniform(0.0, 24.0);
    let dec = rng.uniform(-30.0, 90.0);
    let (h, m, s) = sexagesimal(ra);
    let (d, dm, ds) = sexagesimal(dec.abs());
    let sign = if dec < 0.0 { '-' } else { '+' };
    format!("2M{h:02}{m:02}{:04}{sign}{d:02}{dm:02}{:03}", (s * 100.0) as u32, (ds * 10.0) as u32)
}

fn sexagesimal(v: f64) -> (u32, u32, f64) {
    let whole = v.trunc();
    let minutes = (v - whole) * 60.0;
    let seconds = (minutes - minutes.trunc()) * 60.0;
    (whole as u32, minutes.trunc() as u32, seconds)
}

fn main() -> Result<()> {
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_survey.parquet".to_string());

    let mut rng = SurveyRng(42);

    let mut ids = ListBuilder::new(StringBuilder::new());
    let mut teff = Vec::with_capacity(STARS);
    let mut logg = Vec::with_capacity(STARS);
    let mut fe_h = Vec::with_capacity(STARS);
    let mut alpha_m = Vec::with_capacity(STARS);
    let mut c_fe = Vec::with_capacity(STARS);
    let mut n_fe = Vec::with_capacity(STARS);
    let mut snr = Vec::with_capacity(STARS);
    let mut star_flag = Vec::with_capacity(STARS);
    let mut aspcap_flag = Vec::with_capacity(STARS);
    let mut vscatter = Vec::with_capacity(STARS);

    let mut previous = String::new();
    for i in 0..STARS {
        // Some stars are observed from several fields and repeat their ID.
        let id = if i > 0 && rng.chance(0.02) {
            previous.clone()
        } else {
            designation(&mut rng)
        };
        ids.values().append_value(&id);
        ids.values()
            .append_value(LOCATIONS[(rng.next_u64() % LOCATIONS.len() as u64) as usize]);
        ids.append(true);
        previous = id;

        let t = rng.gauss(4800.0, 600.0);
        teff.push(t);
        // -9999 marks stars without a derived surface gravity.
        logg.push(if rng.chance(0.03) {
            -9999.0
        } else {
            (t - 3500.0) / 600.0 + rng.gauss(0.0, 0.3)
        });

        let metal = |rng: &mut SurveyRng, mean: f64, sd: f64| {
            if rng.chance(0.02) {
                -9999.0
            } else {
                rng.gauss(mean, sd)
            }
        };
        fe_h.push(metal(&mut rng, -0.2, 0.35));
        alpha_m.push(metal(&mut rng, 0.1, 0.1));
        c_fe.push(metal(&mut rng, 0.0, 0.15));
        n_fe.push(metal(&mut rng, 0.2, 0.2));

        snr.push(rng.uniform(20.0, 600.0));
        star_flag.push(if rng.chance(0.08) { 1i64 << (rng.next_u64() % 24) } else { 0 });
        aspcap_flag.push(if rng.chance(0.1) { 1i64 << (rng.next_u64() % 32) } else { 0 });
        vscatter.push(rng.gauss(0.0, 0.5).abs());
    }

    let item = Arc::new(Field::new("item", DataType::Utf8, true));
    let float = |name: &str| Field::new(name, DataType::Float64, false);
    let int = |name: &str| Field::new(name, DataType::Int64, false);

    let schema = Arc::new(Schema::new(vec![
        Field::new(columns::IDS, DataType::List(item), false),
        float(columns::TEFF),
        float(columns::FE_H),
        float(columns::ALPHA_M),
        float(columns::C_FE),
        float(columns::N_FE),
        float(columns::STACKED_SNR),
        float(columns::LOGG),
        int(columns::STAR_FLAG),
        int(columns::ASPCAP_FLAG),
        float(columns::VSCATTER),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(ids.finish()),
            Arc::new(Float64Array::from(teff)),
            Arc::new(Float64Array::from(fe_h)),
            Arc::new(Float64Array::from(alpha_m)),
            Arc::new(Float64Array::from(c_fe)),
            Arc::new(Float64Array::from(n_fe)),
            Arc::new(Float64Array::from(snr)),
            Arc::new(Float64Array::from(logg)),
            Arc::new(Int64Array::from(star_flag)),
            Arc::new(Int64Array::from(aspcap_flag)),
            Arc::new(Float64Array::from(vscatter)),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(&output_path)
        .with_context(|| format!("creating {output_path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;

    println!("Wrote {STARS} stars to {output_path}");
    Ok(())
}
