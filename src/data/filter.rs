use std::collections::BTreeMap;
use std::fmt;

use crate::config::{QualityCuts, SurveyConfig};
use crate::error::{Result, SelectError};

use super::columns;
use super::model::{ColumnData, ResultBundle};
use super::source::DataSource;

// ---------------------------------------------------------------------------
// Filter stages and observers
// ---------------------------------------------------------------------------

/// A group of cuts after which the surviving count is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Flags, velocity scatter, surface gravity and temperature.
    Main,
    /// Minimum combined S/N, only applied for high-S/N selections.
    HighSnr,
    /// Range cut on one abundance label.
    Metal(&'static str),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Main => write!(f, "main"),
            Stage::HighSnr => write!(f, "snr"),
            Stage::Metal(name) => write!(f, "{name}"),
        }
    }
}

/// Receives progress while a selection runs. Purely informational.
pub trait FilterObserver {
    /// Called once all columns are loaded.
    fn on_loaded(&mut self, _stars: usize, _distinct_ids: usize) {}

    /// Called after each stage with the number of stars still selected.
    fn on_stage(&mut self, stage: Stage, surviving: usize);
}

impl<F: FnMut(Stage, usize)> FilterObserver for F {
    fn on_stage(&mut self, stage: Stage, surviving: usize) {
        self(stage, surviving)
    }
}

/// Writes every event to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl FilterObserver for LogObserver {
    fn on_loaded(&mut self, stars: usize, distinct_ids: usize) {
        log::info!("Obtained data for {distinct_ids} stars ({stars} rows).");
    }

    fn on_stage(&mut self, stage: Stage, surviving: usize) {
        log::info!("{stage} flags {surviving}");
    }
}

/// Records every event, for callers that want the counts as data.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StageCounts {
    pub stars: usize,
    pub distinct_ids: usize,
    pub stages: Vec<(Stage, usize)>,
}

impl FilterObserver for StageCounts {
    fn on_loaded(&mut self, stars: usize, distinct_ids: usize) {
        self.stars = stars;
        self.distinct_ids = distinct_ids;
    }

    fn on_stage(&mut self, stage: Stage, surviving: usize) {
        self.stages.push((stage, surviving));
    }
}

// ---------------------------------------------------------------------------
// Star selection
// ---------------------------------------------------------------------------

/// Selects the stars whose labels and quality flags pass the configured cuts.
#[derive(Debug, Clone, Default)]
pub struct StarSelector {
    config: SurveyConfig,
}

impl StarSelector {
    pub fn new(config: SurveyConfig) -> Result<Self> {
        config.cuts.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    pub fn cuts(&self) -> &QualityCuts {
        &self.config.cuts
    }

    /// Run the selection, logging progress through [`LogObserver`].
    pub fn get<S: DataSource + ?Sized>(&self, source: &S, only_high_snr: bool) -> Result<ResultBundle> {
        self.get_observed(source, only_high_snr, &mut LogObserver)
    }

    /// Run the selection, reporting progress to `observer`.
    ///
    /// Loads `IDs` (first component) and every column of
    /// [`columns::columns`] in full, then keeps the rows where all of these
    /// hold:
    ///
    /// * `aspcap_flag == 0` and `star_flag == 0`
    /// * `VSCATTER < vscatter_max`
    /// * `LOGG != logg_sentinel`
    /// * `teff_min < TEFF < teff_max`
    /// * `stacked_snr >= snr_min`, when `only_high_snr`
    /// * `metal_min < x < metal_max` for each of FE_H, ALPHA_M, C_FE, N_FE
    pub fn get_observed<S, O>(&self, source: &S, only_high_snr: bool, observer: &mut O) -> Result<ResultBundle>
    where
        S: DataSource + ?Sized,
        O: FilterObserver + ?Sized,
    {
        log::debug!("Dataset keys in source: {:?}", source.column_names());

        let ids = source.read(columns::IDS)?;
        if !matches!(ids, ColumnData::Rows(_)) {
            log::warn!("'{}' is one-dimensional, using it as the identifier column", columns::IDS);
        }
        let ids = ids.sub_column(0);
        let n = ids.len();

        let mut loaded = BTreeMap::new();
        for name in columns::columns() {
            let data = source.read(name)?;
            if data.len() != n {
                return Err(SelectError::ShapeMismatch {
                    column: name.to_string(),
                    expected: n,
                    found: data.len(),
                });
            }
            loaded.insert(name.to_string(), data);
        }

        let mut bundle = ResultBundle {
            ids,
            columns: loaded,
            indices: Vec::new(),
        };
        observer.on_loaded(n, bundle.distinct_ids());

        let numeric = |name: &str| -> Result<Vec<f64>> {
            bundle
                .columns
                .get(name)
                .ok_or_else(|| SelectError::MissingColumn(name.to_string()))?
                .to_f64(name)
        };
        let cuts = &self.config.cuts;

        let aspcap_flag = numeric(columns::ASPCAP_FLAG)?;
        let star_flag = numeric(columns::STAR_FLAG)?;
        let vscatter = numeric(columns::VSCATTER)?;
        let logg = numeric(columns::LOGG)?;
        let teff = numeric(columns::TEFF)?;

        let mut mask: Vec<bool> = (0..n)
            .map(|i| {
                aspcap_flag[i] == 0.0
                    && star_flag[i] == 0.0
                    && vscatter[i] < cuts.vscatter_max
                    && logg[i] != cuts.logg_sentinel
                    && teff[i] > cuts.teff_min
                    && teff[i] < cuts.teff_max
            })
            .collect();
        observer.on_stage(Stage::Main, count(&mask));

        if only_high_snr {
            let snr = numeric(columns::STACKED_SNR)?;
            restrict(&mut mask, &snr, |v| v >= cuts.snr_min);
            observer.on_stage(Stage::HighSnr, count(&mask));
        }

        for metal in columns::METALS {
            let values = numeric(metal)?;
            restrict(&mut mask, &values, |v| v > cuts.metal_min && v < cuts.metal_max);
            observer.on_stage(Stage::Metal(metal), count(&mask));
        }

        bundle.indices = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect();
        Ok(bundle)
    }
}

/// AND `predicate(values[i])` into `mask[i]`.
fn restrict(mask: &mut [bool], values: &[f64], predicate: impl Fn(f64) -> bool) {
    for (keep, &v) in mask.iter_mut().zip(values) {
        *keep = *keep && predicate(v);
    }
}

fn count(mask: &[bool]) -> usize {
    mask.iter().filter(|&&keep| keep).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Value;
    use crate::data::source::MemorySource;

    /// One star's worth of selection columns.
    #[derive(Clone, Copy)]
    struct Star {
        teff: f64,
        fe_h: f64,
        alpha_m: f64,
        c_fe: f64,
        n_fe: f64,
        snr: f64,
        logg: f64,
        star_flag: i64,
        aspcap_flag: i64,
        vscatter: f64,
    }

    const GOOD: Star = Star {
        teff: 4500.0,
        fe_h: 0.0,
        alpha_m: 0.0,
        c_fe: 0.0,
        n_fe: 0.0,
        snr: 250.0,
        logg: 2.5,
        star_flag: 0,
        aspcap_flag: 0,
        vscatter: 0.1,
    };

    fn source(stars: &[Star]) -> MemorySource {
        let f = |get: fn(&Star) -> f64| ColumnData::Float(stars.iter().map(get).collect());
        let ids = stars
            .iter()
            .enumerate()
            .map(|(i, _)| vec![Value::String(format!("2M{i:08}")), Value::Integer(4102)])
            .collect();

        MemorySource::new()
            .with(columns::IDS, ColumnData::Rows(ids))
            .with(columns::TEFF, f(|s| s.teff))
            .with(columns::FE_H, f(|s| s.fe_h))
            .with(columns::ALPHA_M, f(|s| s.alpha_m))
            .with(columns::C_FE, f(|s| s.c_fe))
            .with(columns::N_FE, f(|s| s.n_fe))
            .with(columns::STACKED_SNR, f(|s| s.snr))
            .with(columns::LOGG, f(|s| s.logg))
            .with(
                columns::STAR_FLAG,
                ColumnData::Integer(stars.iter().map(|s| s.star_flag).collect()),
            )
            .with(
                columns::ASPCAP_FLAG,
                ColumnData::Integer(stars.iter().map(|s| s.aspcap_flag).collect()),
            )
            .with(columns::VSCATTER, f(|s| s.vscatter))
    }

    fn scenario() -> Vec<Star> {
        vec![
            GOOD,
            Star { star_flag: 1, ..GOOD },
            Star { teff: 6000.0, ..GOOD },
        ]
    }

    fn selected(stars: &[Star], only_high_snr: bool) -> Vec<usize> {
        StarSelector::default()
            .get(&source(stars), only_high_snr)
            .unwrap()
            .indices
    }

    #[test]
    fn scenario_keeps_only_clean_star() {
        assert_eq!(selected(&scenario(), false), vec![0]);
    }

    #[test]
    fn scenario_high_snr_drops_faint_star() {
        let mut stars = scenario();
        stars[0].snr = 150.0;
        assert_eq!(selected(&stars, true), Vec::<usize>::new());
        assert_eq!(selected(&stars, false), vec![0]);
    }

    #[test]
    fn temperature_bounds_are_exclusive() {
        let stars = [
            Star { teff: 4000.0, ..GOOD },
            Star { teff: 5500.0, ..GOOD },
            Star { teff: 4000.5, ..GOOD },
            Star { teff: 5499.5, ..GOOD },
        ];
        assert_eq!(selected(&stars, false), vec![2, 3]);
    }

    #[test]
    fn vscatter_and_logg_sentinel_are_excluded() {
        let stars = [
            Star { vscatter: 1.0, ..GOOD },
            Star { vscatter: 0.999, ..GOOD },
            Star { logg: -9999.0, ..GOOD },
        ];
        assert_eq!(selected(&stars, false), vec![1]);
    }

    #[test]
    fn snr_threshold_is_inclusive() {
        let stars = [Star { snr: 200.0, ..GOOD }, Star { snr: 199.9, ..GOOD }];
        assert_eq!(selected(&stars, true), vec![0]);
    }

    #[test]
    fn metal_ranges_are_exclusive() {
        let stars = [
            Star { fe_h: -3.0, ..GOOD },
            Star { alpha_m: 10.0, ..GOOD },
            Star { c_fe: -2.99, ..GOOD },
            Star { n_fe: 9.99, ..GOOD },
            Star { n_fe: -9999.0, ..GOOD },
        ];
        assert_eq!(selected(&stars, false), vec![2, 3]);
    }

    #[test]
    fn flags_must_be_zero() {
        let stars = [
            Star { aspcap_flag: 4, ..GOOD },
            Star { star_flag: 1 << 9, ..GOOD },
            GOOD,
        ];
        assert_eq!(selected(&stars, false), vec![2]);
    }

    #[test]
    fn nan_labels_fail_range_cuts() {
        let stars = [
            Star { teff: f64::NAN, ..GOOD },
            Star { fe_h: f64::NAN, ..GOOD },
            Star { vscatter: f64::NAN, ..GOOD },
            GOOD,
        ];
        assert_eq!(selected(&stars, false), vec![3]);
    }

    #[test]
    fn bundle_holds_unfiltered_columns() {
        let bundle = StarSelector::default().get(&source(&scenario()), false).unwrap();
        assert_eq!(bundle.len(), 3);
        assert_eq!(bundle.ids[0], Value::String("2M00000000".into()));
        assert_eq!(bundle.columns.len(), 10);
        assert_eq!(
            bundle.column(columns::TEFF),
            Some(&ColumnData::Float(vec![4500.0, 4500.0, 6000.0]))
        );
        assert_eq!(bundle.labels().unwrap(), vec![vec![4500.0, 0.0, 0.0, 0.0, 0.0]]);
    }

    #[test]
    fn indices_are_strictly_increasing_and_in_range() {
        let stars: Vec<Star> = (0..200)
            .map(|i| Star {
                teff: 3800.0 + 10.0 * i as f64,
                fe_h: -4.0 + 0.07 * i as f64,
                snr: i as f64 * 2.0,
                vscatter: (i % 7) as f64 * 0.3,
                star_flag: (i % 11 == 0) as i64,
                ..GOOD
            })
            .collect();
        for high in [false, true] {
            let indices = selected(&stars, high);
            assert!(indices.len() <= stars.len());
            assert!(indices.iter().all(|&i| i < stars.len()));
            assert!(indices.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn selection_is_idempotent_and_high_snr_is_monotone() {
        let stars: Vec<Star> = (0..50)
            .map(|i| Star {
                snr: 100.0 + 5.0 * i as f64,
                c_fe: if i % 5 == 0 { 12.0 } else { 0.1 },
                ..GOOD
            })
            .collect();
        let src = source(&stars);
        let selector = StarSelector::default();

        let first = selector.get(&src, false).unwrap();
        let second = selector.get(&src, false).unwrap();
        assert_eq!(first, second);

        let high = selector.get(&src, true).unwrap();
        assert!(high.selected_count() <= first.selected_count());
        assert!(high.indices.iter().all(|i| first.indices.contains(i)));
    }

    #[test]
    fn missing_column_is_reported() {
        let full = source(&scenario());
        let pruned: MemorySource = full
            .column_names()
            .into_iter()
            .filter(|name| name != columns::VSCATTER)
            .map(|name| {
                let data = full.read(&name).unwrap();
                (name, data)
            })
            .collect();
        assert_eq!(
            StarSelector::default().get(&pruned, false),
            Err(SelectError::MissingColumn("VSCATTER".into()))
        );
    }

    #[test]
    fn csv_with_plain_ids_column_selects() {
        use std::io::Write;

        let mut tmp = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(tmp, "IDs,TEFF,FE_H,ALPHA_M,C_FE,N_FE,stacked_snr,LOGG,star_flag,aspcap_flag,VSCATTER").unwrap();
        writeln!(tmp, "2M001,4500,0.0,0.0,0.0,0.0,250,2.5,0,0,0.1").unwrap();
        writeln!(tmp, "2M002,4500,0.0,0.0,0.0,0.0,250,2.5,1,0,0.1").unwrap();
        writeln!(tmp, "2M001,6000,0.0,0.0,0.0,0.0,250,2.5,0,0,0.1").unwrap();

        let src = crate::loader::load_file(tmp.path()).unwrap();
        assert_eq!(src.get(columns::IDS).map(ColumnData::kind), Some("text"));

        let bundle = StarSelector::default().get(&src, true).unwrap();
        assert_eq!(bundle.indices, vec![0]);
        assert_eq!(bundle.distinct_ids(), 2);
        assert_eq!(bundle.selected_ids().unwrap(), vec![&Value::String("2M001".into())]);
    }

    #[test]
    fn missing_ids_is_reported() {
        let src = MemorySource::new().with(columns::TEFF, ColumnData::Float(vec![4500.0]));
        assert_eq!(
            StarSelector::default().get(&src, false),
            Err(SelectError::MissingColumn("IDs".into()))
        );
    }

    #[test]
    fn length_mismatch_is_reported() {
        let mut src = source(&scenario());
        src.insert(columns::LOGG, ColumnData::Float(vec![2.5; 2]));
        assert_eq!(
            StarSelector::default().get(&src, false),
            Err(SelectError::ShapeMismatch {
                column: "LOGG".into(),
                expected: 3,
                found: 2,
            })
        );
    }

    #[test]
    fn text_filter_column_is_rejected() {
        let mut src = source(&scenario());
        src.insert(
            columns::VSCATTER,
            ColumnData::Text(vec!["a".into(), "b".into(), "c".into()]),
        );
        assert!(matches!(
            StarSelector::default().get(&src, false),
            Err(SelectError::NotNumeric { .. })
        ));
    }

    #[test]
    fn observer_sees_every_stage() {
        let mut counts = StageCounts::default();
        StarSelector::default()
            .get_observed(&source(&scenario()), true, &mut counts)
            .unwrap();

        assert_eq!(counts.stars, 3);
        assert_eq!(counts.distinct_ids, 3);
        assert_eq!(
            counts.stages,
            vec![
                (Stage::Main, 1),
                (Stage::HighSnr, 1),
                (Stage::Metal("FE_H"), 1),
                (Stage::Metal("ALPHA_M"), 1),
                (Stage::Metal("C_FE"), 1),
                (Stage::Metal("N_FE"), 1),
            ]
        );
    }

    #[test]
    fn snr_stage_is_skipped_when_disabled() {
        let mut seen = Vec::new();
        let mut record = |stage: Stage, _: usize| seen.push(stage.to_string());
        StarSelector::default()
            .get_observed(&source(&scenario()), false, &mut record)
            .unwrap();
        assert_eq!(seen, vec!["main", "FE_H", "ALPHA_M", "C_FE", "N_FE"]);
    }

    #[test]
    fn custom_cuts_are_applied() {
        let config = SurveyConfig {
            cuts: QualityCuts {
                teff_max: 4400.0,
                ..QualityCuts::default()
            },
            ..SurveyConfig::default()
        };
        let selector = StarSelector::new(config).unwrap();
        let bundle = selector.get(&source(&scenario()), false).unwrap();
        assert!(bundle.indices.is_empty());
    }

    #[test]
    fn invalid_cuts_are_rejected() {
        let config = SurveyConfig {
            cuts: QualityCuts {
                metal_min: 11.0,
                ..QualityCuts::default()
            },
            ..SurveyConfig::default()
        };
        assert!(StarSelector::new(config).is_err());
    }
}
